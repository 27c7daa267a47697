//! Top-level frame orchestration
//!
//! [`Map`] ties the camera to its tile layers and runs the per-frame data
//! flow: advance the zoom animation, reprioritize schedulers when the camera
//! moved, apply fetch completions, and plan the draws for each layer. The
//! host's render loop is reached only through the injected
//! [`FrameScheduler`], so the engine carries no dependency on any particular
//! event loop.

use crate::compose::FramePlan;
use crate::core::camera::Camera;
use crate::core::config::MapOptions;
use crate::core::space::Point;
use crate::prelude::Instant;
use crate::tiles::layer::TileLayer;

/// External "request next frame" primitive
///
/// Invoked exactly when a frame reports that another one is needed.
pub trait FrameScheduler: Send {
    fn request_frame(&mut self);
}

/// Per-layer draw plans for one frame
#[derive(Debug, Default)]
pub struct FrameOutput {
    /// One plan per layer, in layer order; invisible layers yield empty plans
    pub plans: Vec<FramePlan>,
    /// True when another frame was requested
    pub animating: bool,
}

pub struct Map {
    camera: Camera,
    layers: Vec<TileLayer>,
    frame_scheduler: Option<Box<dyn FrameScheduler>>,
    background: [f32; 3],
}

impl Map {
    pub fn new(viewport: Point, options: MapOptions) -> Self {
        let mut camera = Camera::new(viewport, options.tile_size);
        camera.set_zoom_limits(options.min_zoom, options.max_zoom);
        Self {
            camera,
            layers: Vec::new(),
            frame_scheduler: None,
            background: options.background,
        }
    }

    /// Installs the host's frame driver
    pub fn with_frame_scheduler(mut self, scheduler: Box<dyn FrameScheduler>) -> Self {
        self.frame_scheduler = Some(scheduler);
        self
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn camera_mut(&mut self) -> &mut Camera {
        &mut self.camera
    }

    pub fn background(&self) -> [f32; 3] {
        self.background
    }

    /// Appends a layer; returns its index for later lookup
    pub fn add_layer(&mut self, layer: TileLayer) -> usize {
        self.layers.push(layer);
        self.layers.len() - 1
    }

    pub fn layer(&self, index: usize) -> Option<&TileLayer> {
        self.layers.get(index)
    }

    pub fn layer_mut(&mut self, index: usize) -> Option<&mut TileLayer> {
        self.layers.get_mut(index)
    }

    pub fn layers(&self) -> &[TileLayer] {
        &self.layers
    }

    /// Runs one frame of the engine
    ///
    /// Advances animations, reprioritizes pending fetches if the camera
    /// changed, applies completed fetches, and produces the draw plans. When
    /// the output reports `animating`, the installed frame scheduler has
    /// already been asked for the next frame; completions still in flight
    /// also keep the loop alive so they are composited when they land.
    pub fn render_frame(&mut self, now: Instant) -> FrameOutput {
        let mut animating = self.camera.update(now);

        if self.camera.take_dirty() {
            for layer in &mut self.layers {
                layer.reprioritize(&self.camera);
            }
        }

        let mut plans = Vec::with_capacity(self.layers.len());
        for layer in &mut self.layers {
            layer.pump(now);
            if !layer.is_visible() {
                plans.push(FramePlan::default());
                continue;
            }
            let plan = layer.compose(&mut self.camera, now);
            animating |= plan.animating;
            plans.push(plan);
        }

        for layer in &self.layers {
            animating |= layer.outstanding() > 0;
        }

        if animating {
            if let Some(scheduler) = self.frame_scheduler.as_mut() {
                scheduler.request_frame();
            }
        }

        FrameOutput { plans, animating }
    }
}
