//! Prelude module for common slippy types and traits
//!
//! Re-exports the most commonly used types for easy importing with
//! `use slippy::prelude::*;`

pub use crate::core::{
    camera::Camera,
    config::MapOptions,
    space::{Point, TileCoord, TileRange},
    transform::Affine,
};

pub use crate::animation::easing::{EasingFunction, Interpolation};

pub use crate::compose::{FramePlan, TileDraw};

pub use crate::map::{FrameOutput, FrameScheduler, Map};

pub use crate::runtime::{runtime, spawn, AsyncHandle, AsyncSpawner};

pub use crate::tiles::{
    cache::TileCache,
    fetcher::{FetchOutcome, HttpFetcher, TileFetcher},
    layer::{TileLayer, TileLayerOptions},
    queue::{Admission, TileQueue},
    source::{TemplateSource, TileSource},
    store::TileStore,
    tile::{Tile, TileState},
};

pub use crate::{Error as MapError, Result};

pub use std::{
    pin::Pin,
    sync::Arc,
    time::{Duration, Instant},
};

pub use fxhash::{FxHashMap as HashMap, FxHashSet as HashSet};

pub use futures::Future;
