//! A scroll-driven 3D scene: extruded text and a glTF character that slide
//! into place as the page scrolls, lit by a spotlight that follows the
//! pointer.
//!
//! [`SceneDirector`] owns the effect and is host independent. It draws into
//! any [`RenderSurface`]: the wgpu backed [`GpuRenderer`] used by the browser
//! and desktop hosts, or the [`HeadlessSurface`] used for scripted runs.

pub mod assets;
pub mod background;
pub mod camera;
pub mod config;
pub mod controls;
pub mod director;
pub mod error;
pub mod font;
pub mod geometry;
pub mod light;
pub mod model;
pub mod render;
pub mod scene;
pub mod shape;
pub mod text;
pub mod triangulate;
pub mod tween;
pub mod viewport;

#[cfg(not(target_arch = "wasm32"))]
pub mod app;
#[cfg(target_arch = "wasm32")]
pub mod web;

#[cfg(not(target_arch = "wasm32"))]
pub use assets::AssetLoaders;
pub use assets::{AssetEvent, AssetInbox, AssetSource, AssetStatus};
pub use config::DirectorConfig;
pub use director::{SceneDirector, CHARACTER_OBJECT, TEXT_OBJECT};
pub use error::{AssetError, DirectorError, RenderError};
pub use font::Typeface;
pub use model::LoadedModel;
pub use render::{FrameStats, GpuRenderer, HeadlessSurface, RenderSurface};
pub use scene::{Scene, SceneObject};
pub use viewport::Viewport;
