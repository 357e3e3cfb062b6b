//! Scroll-driven tweens.
//!
//! A [`ScrubbedTween`] interpolates a single value between `from` and `to`.
//! Its progress is not a function of time but of document scroll: a
//! [`ScrollTrigger`] maps the scroll offset onto `[0, 1]` between a start and
//! an end position, each written as `"<element edge> <viewport edge>"`
//! (`"top bottom"` fires when the element's top meets the viewport bottom).

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::DirectorError;

/// Position along an element or the viewport.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Edge {
    Top,
    Center,
    Bottom,
    /// Fraction of the extent, 0.0 at the top.
    Fraction(f32),
    Pixels(f32),
}

impl Edge {
    /// Offset from the top of something `extent` pixels tall.
    pub fn offset(self, extent: f32) -> f32 {
        match self {
            Edge::Top => 0.0,
            Edge::Center => extent * 0.5,
            Edge::Bottom => extent,
            Edge::Fraction(fraction) => extent * fraction,
            Edge::Pixels(pixels) => pixels,
        }
    }
}

impl FromStr for Edge {
    type Err = DirectorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || DirectorError::InvalidConfig(format!("unknown trigger edge {s:?}"));
        match s {
            "top" => Ok(Edge::Top),
            "center" => Ok(Edge::Center),
            "bottom" => Ok(Edge::Bottom),
            _ => {
                if let Some(percent) = s.strip_suffix('%') {
                    let value = percent.parse::<f32>().map_err(|_| invalid())?;
                    Ok(Edge::Fraction(value / 100.0))
                } else {
                    let pixels = s.strip_suffix("px").unwrap_or(s);
                    pixels.parse::<f32>().map(Edge::Pixels).map_err(|_| invalid())
                }
            }
        }
    }
}

/// Pairing of an element edge with a viewport edge.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TriggerPosition {
    pub element: Edge,
    pub viewport: Edge,
}

impl FromStr for TriggerPosition {
    type Err = DirectorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split_whitespace();
        let (Some(element), Some(viewport), None) = (parts.next(), parts.next(), parts.next())
        else {
            return Err(DirectorError::InvalidConfig(format!(
                "trigger position {s:?} must be \"<element edge> <viewport edge>\""
            )));
        };
        Ok(Self {
            element: element.parse()?,
            viewport: viewport.parse()?,
        })
    }
}

/// Vertical extent of the trigger element in document coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ElementBounds {
    pub top: f32,
    pub height: f32,
}

/// Scroll offset of the document and the height of the viewport showing it.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ScrollState {
    pub scroll_y: f32,
    pub viewport_height: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScrollTrigger {
    pub start: TriggerPosition,
    pub end: TriggerPosition,
}

impl ScrollTrigger {
    pub fn new(start: TriggerPosition, end: TriggerPosition) -> Self {
        Self { start, end }
    }

    /// Scroll offsets at which the trigger starts and ends.
    pub fn range(&self, element: ElementBounds, viewport_height: f32) -> (f32, f32) {
        let at = |position: TriggerPosition| {
            element.top + position.element.offset(element.height)
                - position.viewport.offset(viewport_height)
        };
        (at(self.start), at(self.end))
    }

    /// Progress through the trigger range, clamped to `[0, 1]`.
    pub fn progress(&self, element: ElementBounds, scroll: ScrollState) -> f32 {
        let (start, end) = self.range(element, scroll.viewport_height);
        let span = end - start;
        if span.abs() <= f32::EPSILON {
            return if scroll.scroll_y >= end { 1.0 } else { 0.0 };
        }
        ((scroll.scroll_y - start) / span).clamp(0.0, 1.0)
    }
}

/// Easing curves, named as in the animation library the effect was built on.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Ease {
    Linear,
    PowerIn(u8),
    PowerOut(u8),
    PowerInOut(u8),
    SineIn,
    SineOut,
    SineInOut,
}

impl Ease {
    pub fn apply(self, t: f32) -> f32 {
        use std::f32::consts::FRAC_PI_2;
        let t = t.clamp(0.0, 1.0);
        match self {
            Ease::Linear => t,
            Ease::PowerIn(n) => t.powi(n as i32 + 1),
            Ease::PowerOut(n) => 1.0 - (1.0 - t).powi(n as i32 + 1),
            Ease::PowerInOut(n) => {
                let exponent = n as i32 + 1;
                if t < 0.5 {
                    (2.0 * t).powi(exponent) * 0.5
                } else {
                    1.0 - (2.0 * (1.0 - t)).powi(exponent) * 0.5
                }
            }
            Ease::SineIn => 1.0 - (t * FRAC_PI_2).cos(),
            Ease::SineOut => (t * FRAC_PI_2).sin(),
            Ease::SineInOut => -0.5 * ((std::f32::consts::PI * t).cos() - 1.0),
        }
    }
}

impl Default for Ease {
    fn default() -> Self {
        Ease::PowerOut(1)
    }
}

impl FromStr for Ease {
    type Err = DirectorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || DirectorError::InvalidConfig(format!("unknown ease {s:?}"));
        match s {
            "none" | "linear" | "power0" | "power0.out" => return Ok(Ease::Linear),
            "sine" | "sine.out" => return Ok(Ease::SineOut),
            "sine.in" => return Ok(Ease::SineIn),
            "sine.inOut" => return Ok(Ease::SineInOut),
            _ => {}
        }
        let rest = s.strip_prefix("power").ok_or_else(invalid)?;
        let (power, kind) = rest.split_once('.').unwrap_or((rest, "out"));
        let power = power.parse::<u8>().map_err(|_| invalid())?;
        if !(1..=4).contains(&power) {
            return Err(invalid());
        }
        match (kind, power) {
            ("out", n) => Ok(Ease::PowerOut(n)),
            ("in", n) => Ok(Ease::PowerIn(n)),
            ("inOut", n) => Ok(Ease::PowerInOut(n)),
            _ => Err(invalid()),
        }
    }
}

/// How a tween follows its trigger progress.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(try_from = "ScrubValue", into = "ScrubValue")]
pub enum Scrub {
    /// Value tracks the scroll position exactly.
    #[default]
    Immediate,
    /// Value catches up with the scroll position over roughly `seconds`.
    Smoothed { seconds: f32 },
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum ScrubValue {
    Flag(bool),
    Seconds(f32),
}

impl TryFrom<ScrubValue> for Scrub {
    type Error = DirectorError;

    fn try_from(value: ScrubValue) -> Result<Self, Self::Error> {
        match value {
            ScrubValue::Flag(true) => Ok(Scrub::Immediate),
            ScrubValue::Seconds(seconds) if seconds <= 0.0 => Ok(Scrub::Immediate),
            ScrubValue::Seconds(seconds) => Ok(Scrub::Smoothed { seconds }),
            ScrubValue::Flag(false) => Err(DirectorError::InvalidConfig(
                "only scroll-scrubbed tweens are supported (scrub must not be false)".into(),
            )),
        }
    }
}

impl From<Scrub> for ScrubValue {
    fn from(scrub: Scrub) -> Self {
        match scrub {
            Scrub::Immediate => ScrubValue::Flag(true),
            Scrub::Smoothed { seconds } => ScrubValue::Seconds(seconds),
        }
    }
}

/// A `from -> to` tween scrubbed by a scroll trigger.
#[derive(Debug, Clone, PartialEq)]
pub struct ScrubbedTween {
    pub from: f32,
    pub to: f32,
    pub ease: Ease,
    pub trigger: ScrollTrigger,
    pub scrub: Scrub,
    progress: f32,
    target_progress: f32,
}

impl ScrubbedTween {
    pub fn new(from: f32, to: f32, ease: Ease, trigger: ScrollTrigger, scrub: Scrub) -> Self {
        Self {
            from,
            to,
            ease,
            trigger,
            scrub,
            progress: 0.0,
            target_progress: 0.0,
        }
    }

    /// Recomputes the progress the tween should show for this scroll state.
    pub fn scroll_to(&mut self, element: ElementBounds, scroll: ScrollState) {
        self.target_progress = self.trigger.progress(element, scroll);
        if self.scrub == Scrub::Immediate {
            self.progress = self.target_progress;
        }
    }

    /// Advances a smoothed scrub towards its target.
    pub fn tick(&mut self, dt: f32) {
        if let Scrub::Smoothed { seconds } = self.scrub {
            let alpha = 1.0 - (-4.0 * dt.max(0.0) / seconds).exp();
            self.progress += (self.target_progress - self.progress) * alpha;
            if (self.target_progress - self.progress).abs() < 1e-4 {
                self.progress = self.target_progress;
            }
        }
    }

    pub fn progress(&self) -> f32 {
        self.progress
    }

    pub fn value(&self) -> f32 {
        self.value_at(self.progress)
    }

    pub fn value_at(&self, progress: f32) -> f32 {
        self.from + (self.to - self.from) * self.ease.apply(progress)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn default_trigger() -> ScrollTrigger {
        ScrollTrigger::new(
            "top bottom".parse().unwrap(),
            "top center".parse().unwrap(),
        )
    }

    #[test]
    fn parses_keywords_percentages_and_pixels() {
        let position: TriggerPosition = "top 80%".parse().unwrap();
        assert_eq!(position.element, Edge::Top);
        assert_eq!(position.viewport, Edge::Fraction(0.8));
        let position: TriggerPosition = "20px center".parse().unwrap();
        assert_eq!(position.element, Edge::Pixels(20.0));
        assert!("top".parse::<TriggerPosition>().is_err());
        assert!("top bottom extra".parse::<TriggerPosition>().is_err());
        assert!("left bottom".parse::<TriggerPosition>().is_err());
    }

    #[test]
    fn top_bottom_to_top_center_spans_half_a_viewport() {
        let element = ElementBounds {
            top: 1000.0,
            height: 800.0,
        };
        let (start, end) = default_trigger().range(element, 800.0);
        assert_eq!(start, 200.0);
        assert_eq!(end, 600.0);

        let at = |scroll_y| {
            default_trigger().progress(
                element,
                ScrollState {
                    scroll_y,
                    viewport_height: 800.0,
                },
            )
        };
        assert_eq!(at(0.0), 0.0);
        assert_eq!(at(200.0), 0.0);
        assert_eq!(at(400.0), 0.5);
        assert_eq!(at(600.0), 1.0);
        assert_eq!(at(5000.0), 1.0);
    }

    #[test]
    fn degenerate_range_is_a_step() {
        let trigger = ScrollTrigger::new(
            "top center".parse().unwrap(),
            "top center".parse().unwrap(),
        );
        let element = ElementBounds {
            top: 500.0,
            height: 100.0,
        };
        let state = |scroll_y| ScrollState {
            scroll_y,
            viewport_height: 400.0,
        };
        assert_eq!(trigger.progress(element, state(299.0)), 0.0);
        assert_eq!(trigger.progress(element, state(300.0)), 1.0);
    }

    #[test]
    fn eases_fix_endpoints_and_are_monotonic() {
        let eases = [
            "none",
            "power1.out",
            "power2.in",
            "power3.inOut",
            "power4",
            "sine.in",
            "sine.out",
            "sine.inOut",
        ];
        for name in eases {
            let ease: Ease = name.parse().unwrap();
            assert!(ease.apply(0.0).abs() < 1e-6, "{name} at 0");
            assert!((ease.apply(1.0) - 1.0).abs() < 1e-6, "{name} at 1");
            let mut last = 0.0;
            for step in 1..=100 {
                let value = ease.apply(step as f32 / 100.0);
                assert!(value + 1e-6 >= last, "{name} decreased at {step}");
                last = value;
            }
        }
        assert_eq!("power1.out".parse::<Ease>().unwrap(), Ease::default());
        assert!("power9.out".parse::<Ease>().is_err());
        assert!("bounce".parse::<Ease>().is_err());
    }

    #[test]
    fn tween_starts_at_from_and_follows_scroll() {
        let mut tween = ScrubbedTween::new(
            5.0,
            0.0,
            Ease::default(),
            default_trigger(),
            Scrub::Immediate,
        );
        assert_eq!(tween.value(), 5.0);
        let element = ElementBounds {
            top: 1000.0,
            height: 800.0,
        };
        tween.scroll_to(
            element,
            ScrollState {
                scroll_y: 600.0,
                viewport_height: 800.0,
            },
        );
        assert_eq!(tween.value(), 0.0);
        // power1.out at one half
        assert!((tween.value_at(0.5) - 1.25).abs() < 1e-6);
    }

    #[test]
    fn smoothed_scrub_converges_on_ticks() {
        let mut tween = ScrubbedTween::new(
            10.0,
            3.0,
            Ease::Linear,
            default_trigger(),
            Scrub::Smoothed { seconds: 0.5 },
        );
        let element = ElementBounds {
            top: 0.0,
            height: 100.0,
        };
        tween.scroll_to(
            element,
            ScrollState {
                scroll_y: 1000.0,
                viewport_height: 100.0,
            },
        );
        assert_eq!(tween.progress(), 0.0);
        tween.tick(0.1);
        let partial = tween.progress();
        assert!(partial > 0.0 && partial < 1.0);
        for _ in 0..100 {
            tween.tick(0.1);
        }
        assert_eq!(tween.value(), 3.0);
    }

    #[test]
    fn scrub_values_deserialize_like_the_js_option() {
        assert_eq!(serde_json::from_str::<Scrub>("true").unwrap(), Scrub::Immediate);
        assert_eq!(
            serde_json::from_str::<Scrub>("1.5").unwrap(),
            Scrub::Smoothed { seconds: 1.5 }
        );
        assert!(serde_json::from_str::<Scrub>("false").is_err());
    }
}
