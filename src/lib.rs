//! # Slippy
//!
//! A tile-streaming and compositing engine for pannable, zoomable raster
//! maps.
//!
//! The crate owns the hard part of a slippy map: the per-tile loading state
//! machine, the bounded-concurrency priority scheduler, ancestor fallback for
//! tiles that are not ready yet, time-based fade-in, and the camera model
//! that drives all of it. Everything around that core stays with the
//! embedding application: GPU draw calls consume the [`compose::FramePlan`]
//! produced each frame, input wiring mutates the [`Camera`], and the
//! frame loop is driven through an injected [`map::FrameScheduler`].

pub mod animation;
pub mod compose;
pub mod core;
pub mod map;
pub mod prelude;
pub mod runtime;
pub mod tiles;

// Re-export public API
pub use crate::core::{
    camera::Camera,
    config::MapOptions,
    space::{Point, TileCoord, TileRange},
};

pub use crate::compose::{FramePlan, TileDraw};

pub use crate::map::{FrameOutput, FrameScheduler, Map};

pub use crate::tiles::{
    layer::{TileLayer, TileLayerOptions},
    source::{TemplateSource, TileSource},
    store::TileStore,
};

/// Result type used throughout the library
pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// Common error types
#[derive(Debug, thiserror::Error)]
pub enum MapError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid coordinates: {0}")]
    InvalidCoordinates(String),

    #[error("Layer error: {0}")]
    Layer(String),
}

/// Error type alias for convenience
pub type Error = MapError;
