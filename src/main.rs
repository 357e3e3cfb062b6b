#![cfg_attr(target_arch = "wasm32", allow(dead_code, unused_imports))]

use std::env;
use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};

#[cfg(not(target_arch = "wasm32"))]
use scroll_scene::AssetLoaders;
use scroll_scene::{
    AssetSource, DirectorConfig, HeadlessSurface, RenderSurface, SceneDirector, Viewport,
};

const DEFAULT_SIZE: Viewport = Viewport::new(1280, 720);
const HEADLESS_FRAME_TIME: f32 = 1.0 / 60.0;

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    env_logger::init();
    if let Err(err) = run() {
        eprintln!("Error: {err:?}");
        std::process::exit(1);
    }
}

#[cfg(target_arch = "wasm32")]
fn main() {}

#[cfg(not(target_arch = "wasm32"))]
fn run() -> Result<()> {
    let options = CliOptions::parse(env::args().skip(1))?;
    let config = options.load_config()?;

    if options.headless {
        return run_headless(config, &options);
    }
    match scroll_scene::app::run_windowed(config.clone(), options.size) {
        Ok(()) => Ok(()),
        Err(err) if err.downcast_ref::<scroll_scene::app::WindowInitError>().is_some() => {
            eprintln!(
                "{err}. Falling back to --headless mode (set DISPLAY or install X11 libs to enable rendering)."
            );
            run_headless(config, &options)
        }
        Err(err) => Err(err),
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn run_headless(config: DirectorConfig, options: &CliOptions) -> Result<()> {
    let font = AssetSource::parse(&config.text.font_url);
    let model = AssetSource::parse(&config.model.url);
    let surface = HeadlessSurface::new(options.size);
    let mut director = SceneDirector::new(config, surface, options.size)?;

    AssetLoaders::spawn(font, model, &director.inbox()).wait();
    director.on_scroll(options.scroll);
    for _ in 0..options.frames {
        director
            .frame(HEADLESS_FRAME_TIME)
            .context("headless frame failed")?;
    }

    print_summary(&director);
    Ok(())
}

fn print_summary(director: &SceneDirector<HeadlessSurface>) {
    let surface = director.surface();
    let size = surface.size();
    let stats = surface.last_frame();
    println!(
        "Rendered {} frame(s) at {}x{} with scroll {:.0}px",
        surface.frames(),
        size.width,
        size.height,
        director.scroll_y()
    );
    println!("Font: {}", director.font_status());
    println!("Model: {}", director.model_status());
    println!(
        "Scene has {} objects ({} draw calls, {} triangles)",
        stats.objects, stats.draw_calls, stats.triangles
    );
    let spot = director.scene().spotlight.position;
    println!("Spotlight at ({:.2}, {:.2}, {:.2})", spot.x, spot.y, spot.z);
    println!("Final object states:");
    for object in director.scene().objects() {
        let position = object.transform.position;
        println!(
            " - {} pos=({:.2}, {:.2}, {:.2})",
            object.name, position.x, position.y, position.z
        );
    }
}

const USAGE: &str = "Usage: scroll-scene [--config <file.json>] [--font <path>] [--model <path>] \
[--headless] [--frames <n>] [--scroll <px>] [--size <WxH>]";

#[derive(Debug, Clone, PartialEq)]
struct CliOptions {
    config: Option<PathBuf>,
    font: Option<String>,
    model: Option<String>,
    headless: bool,
    frames: u32,
    scroll: f32,
    size: Viewport,
}

impl Default for CliOptions {
    fn default() -> Self {
        Self {
            config: None,
            font: None,
            model: None,
            headless: false,
            frames: 1,
            scroll: 0.0,
            size: DEFAULT_SIZE,
        }
    }
}

impl CliOptions {
    fn parse(args: impl IntoIterator<Item = String>) -> Result<Self> {
        let mut options = Self::default();
        let mut args = args.into_iter();
        while let Some(arg) = args.next() {
            let mut value = |name: &str| {
                args.next()
                    .ok_or_else(|| anyhow!("{name} expects a value\n{USAGE}"))
            };
            match arg.as_str() {
                "--config" => options.config = Some(PathBuf::from(value("--config")?)),
                "--font" => options.font = Some(value("--font")?),
                "--model" => options.model = Some(value("--model")?),
                "--headless" => options.headless = true,
                "--frames" => {
                    let frames = value("--frames")?;
                    options.frames = frames
                        .parse()
                        .with_context(|| format!("invalid frame count {frames:?}"))?;
                }
                "--scroll" => {
                    let scroll = value("--scroll")?;
                    options.scroll = scroll
                        .parse::<f32>()
                        .ok()
                        .filter(|scroll| scroll.is_finite() && *scroll >= 0.0)
                        .ok_or_else(|| anyhow!("invalid scroll offset {scroll:?}"))?;
                }
                "--size" => options.size = parse_size(&value("--size")?)?,
                "--help" | "-h" => return Err(anyhow!("{USAGE}")),
                other => return Err(anyhow!("Unknown argument: {other}\n{USAGE}")),
            }
        }
        Ok(options)
    }

    fn load_config(&self) -> Result<DirectorConfig> {
        let mut config = match &self.config {
            Some(path) => DirectorConfig::load(path)?,
            None => DirectorConfig::default(),
        };
        if let Some(font) = &self.font {
            config.text.font_url = font.clone();
        }
        if let Some(model) = &self.model {
            config.model.url = model.clone();
        }
        Ok(config)
    }
}

fn parse_size(value: &str) -> Result<Viewport> {
    let invalid = || anyhow!("invalid size {value:?}, expected <width>x<height>");
    let (width, height) = value.split_once(['x', 'X']).ok_or_else(invalid)?;
    let width: u32 = width.trim().parse().map_err(|_| invalid())?;
    let height: u32 = height.trim().parse().map_err(|_| invalid())?;
    let size = Viewport::new(width, height);
    if size.is_empty() {
        return Err(invalid());
    }
    Ok(size)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<CliOptions> {
        CliOptions::parse(args.iter().map(|arg| arg.to_string()))
    }

    #[test]
    fn defaults_render_one_windowed_frame() {
        let options = parse(&[]).unwrap();
        assert_eq!(options, CliOptions::default());
        assert_eq!(options.size, Viewport::new(1280, 720));
    }

    #[test]
    fn parses_every_flag() {
        let options = parse(&[
            "--headless", "--frames", "3", "--scroll", "250", "--size", "800x600", "--font",
            "font.json", "--model", "model.glb",
        ])
        .unwrap();
        assert!(options.headless);
        assert_eq!(options.frames, 3);
        assert_eq!(options.scroll, 250.0);
        assert_eq!(options.size, Viewport::new(800, 600));
        let config = options.load_config().unwrap();
        assert_eq!(config.text.font_url, "font.json");
        assert_eq!(config.model.url, "model.glb");
    }

    #[test]
    fn rejects_bad_values() {
        assert!(parse(&["--size", "800"]).is_err());
        assert!(parse(&["--size", "0x600"]).is_err());
        assert!(parse(&["--scroll", "-5"]).is_err());
        assert!(parse(&["--frames"]).is_err());
        assert!(parse(&["--bogus"]).is_err());
    }
}
