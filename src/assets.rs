//! Font and model sources, and the inbox their loads complete into.
//!
//! Loads never touch the scene directly: each finished load is posted to an
//! [`AssetInbox`] and the director drains it at the start of a frame.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::AssetError;
use crate::font::Typeface;
use crate::model::LoadedModel;

/// Where an asset is read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssetSource {
    File(PathBuf),
    Url(String),
}

impl AssetSource {
    pub fn parse(location: &str) -> Self {
        let lower = location.to_ascii_lowercase();
        if lower.starts_with("http://") || lower.starts_with("https://") {
            AssetSource::Url(location.to_string())
        } else {
            AssetSource::File(PathBuf::from(location))
        }
    }

    /// Directory relative model buffers are resolved against.
    pub fn base_dir(&self) -> Option<&Path> {
        match self {
            AssetSource::File(path) => path.parent(),
            AssetSource::Url(_) => None,
        }
    }
}

impl fmt::Display for AssetSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssetSource::File(path) => write!(f, "{}", path.display()),
            AssetSource::Url(url) => f.write_str(url),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum AssetStatus {
    #[default]
    Pending,
    Loaded,
    Failed(String),
}

impl AssetStatus {
    pub fn is_failed(&self) -> bool {
        matches!(self, AssetStatus::Failed(_))
    }
}

impl fmt::Display for AssetStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssetStatus::Pending => f.write_str("pending"),
            AssetStatus::Loaded => f.write_str("loaded"),
            AssetStatus::Failed(reason) => write!(f, "failed ({reason})"),
        }
    }
}

/// A completed load.
#[derive(Debug)]
pub enum AssetEvent {
    Font(Result<Typeface, AssetError>),
    Model(Result<LoadedModel, AssetError>),
}

/// Completed loads waiting for the next frame.
#[derive(Debug, Clone, Default)]
pub struct AssetInbox {
    events: Arc<Mutex<Vec<AssetEvent>>>,
}

impl AssetInbox {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, event: AssetEvent) {
        self.events.lock().push(event);
    }

    pub fn drain(&self) -> Vec<AssetEvent> {
        std::mem::take(&mut *self.events.lock())
    }

    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }
}

pub fn decode_font(bytes: &[u8]) -> Result<Typeface, AssetError> {
    Typeface::from_slice(bytes)
}

pub fn decode_model(bytes: &[u8], source: &AssetSource) -> Result<LoadedModel, AssetError> {
    LoadedModel::from_slice_with_base(bytes, source.base_dir())
}

#[cfg(not(target_arch = "wasm32"))]
pub use native::{read_source, AssetLoaders};

#[cfg(not(target_arch = "wasm32"))]
mod native {
    use std::thread::{self, JoinHandle};

    use super::*;

    /// Reads a local file. Remote sources need a browser host.
    pub fn read_source(source: &AssetSource) -> Result<Vec<u8>, AssetError> {
        match source {
            AssetSource::File(path) => std::fs::read(path).map_err(|source| AssetError::Io {
                path: path.display().to_string(),
                source,
            }),
            AssetSource::Url(url) => Err(AssetError::UnsupportedSource(url.clone())),
        }
    }

    /// Background threads loading the font and the model.
    pub struct AssetLoaders {
        threads: Vec<JoinHandle<()>>,
    }

    impl AssetLoaders {
        /// Starts both loads; they complete independently, in any order.
        pub fn spawn(font: AssetSource, model: AssetSource, inbox: &AssetInbox) -> Self {
            let font_inbox = inbox.clone();
            let font_thread = thread::spawn(move || {
                log::debug!("loading font from {font}");
                let result = read_source(&font).and_then(|bytes| decode_font(&bytes));
                font_inbox.push(AssetEvent::Font(result));
            });

            let model_inbox = inbox.clone();
            let model_thread = thread::spawn(move || {
                log::debug!("loading model from {model}");
                let result = read_source(&model).and_then(|bytes| decode_model(&bytes, &model));
                model_inbox.push(AssetEvent::Model(result));
            });

            Self {
                threads: vec![font_thread, model_thread],
            }
        }

        /// Blocks until both loads have posted their result.
        pub fn wait(self) {
            for handle in self.threads {
                if handle.join().is_err() {
                    log::error!("asset loader thread panicked");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_locations_are_urls() {
        assert_eq!(
            AssetSource::parse("https://threejs.org/font.json"),
            AssetSource::Url("https://threejs.org/font.json".into())
        );
        assert_eq!(
            AssetSource::parse("path/to/your/cartoon_model.glb"),
            AssetSource::File(PathBuf::from("path/to/your/cartoon_model.glb"))
        );
        assert_eq!(
            AssetSource::parse("models/a.gltf").base_dir(),
            Some(Path::new("models"))
        );
    }

    #[test]
    fn inbox_drains_in_arrival_order() {
        let inbox = AssetInbox::new();
        let other = inbox.clone();
        other.push(AssetEvent::Model(Err(AssetError::Model("first".into()))));
        other.push(AssetEvent::Font(Err(AssetError::Font("second".into()))));
        let events = inbox.drain();
        assert_eq!(events.len(), 2);
        assert!(matches!(events[0], AssetEvent::Model(_)));
        assert!(inbox.is_empty());
    }

    #[cfg(not(target_arch = "wasm32"))]
    #[test]
    fn native_loaders_report_missing_and_remote_sources() {
        let inbox = AssetInbox::new();
        AssetLoaders::spawn(
            AssetSource::parse("https://example.com/font.json"),
            AssetSource::parse("definitely/missing/model.glb"),
            &inbox,
        )
        .wait();
        let events = inbox.drain();
        assert_eq!(events.len(), 2);
        for event in events {
            match event {
                AssetEvent::Font(result) => {
                    assert!(matches!(result, Err(AssetError::UnsupportedSource(_))))
                }
                AssetEvent::Model(result) => assert!(matches!(result, Err(AssetError::Io { .. }))),
            }
        }
    }
}
