use crate::animation::easing::{EasingFunction, Interpolation};
use crate::core::space::{Point, TileRange};
use crate::core::transform::Affine;
use std::time::{Duration, Instant};

/// An in-flight animated zoom change
#[derive(Debug, Clone, Copy)]
struct ZoomAnimation {
    from: f64,
    to: f64,
    started: Instant,
    period: Duration,
    easing: EasingFunction,
}

/// Manages the current view of the map: center, zoom, and rotation
///
/// The camera owns the map-space to screen-space transform pair and the
/// visible-tile computation derived from it. Every mutation goes through a
/// no-op guard and sets a dirty flag; downstream consumers (scheduler
/// priorities, draw matrices) are recomputed once per dirty transition, not
/// per mutation.
#[derive(Debug, Clone)]
pub struct Camera {
    /// View center in unit map space `[0,1)^2`
    center: Point,
    /// Continuous zoom level; the world spans `tile_size * 2^zoom` pixels
    zoom: f64,
    /// View rotation in radians, counter-clockwise
    rotation: f64,
    min_zoom: u8,
    max_zoom: u8,
    /// Viewport size in pixels
    viewport: Point,
    tile_size: u32,
    dirty: bool,
    freeze_depth: u32,
    frozen_dirty: bool,
    /// Lazily rebuilt `(map -> screen, screen -> map)` pair
    matrices: Option<(Affine, Affine)>,
    zoom_animation: Option<ZoomAnimation>,
}

impl Camera {
    pub fn new(viewport: Point, tile_size: u32) -> Self {
        Self {
            center: Point::new(0.5, 0.5),
            zoom: 0.0,
            rotation: 0.0,
            min_zoom: 0,
            max_zoom: 18,
            viewport,
            tile_size,
            dirty: true,
            freeze_depth: 0,
            frozen_dirty: false,
            matrices: None,
            zoom_animation: None,
        }
    }

    pub fn center(&self) -> Point {
        self.center
    }

    pub fn zoom(&self) -> f64 {
        self.zoom
    }

    pub fn rotation(&self) -> f64 {
        self.rotation
    }

    pub fn viewport_size(&self) -> Point {
        self.viewport
    }

    pub fn tile_size(&self) -> u32 {
        self.tile_size
    }

    pub fn zoom_limits(&self) -> (u8, u8) {
        (self.min_zoom, self.max_zoom)
    }

    /// Sets the center, clamped to unit map space; no-op if unchanged
    pub fn set_center(&mut self, center: Point) {
        let center = Point::new(center.x.clamp(0.0, 1.0), center.y.clamp(0.0, 1.0));
        if center == self.center {
            return;
        }
        self.center = center;
        self.mark_dirty();
    }

    /// Sets the zoom level, clamping to the configured range
    ///
    /// An explicit set cancels any running zoom animation.
    pub fn set_zoom(&mut self, zoom: f64) {
        self.zoom_animation = None;
        self.apply_zoom(zoom.clamp(self.min_zoom as f64, self.max_zoom as f64));
    }

    /// Sets the rotation in radians; no-op if unchanged
    pub fn set_rotation(&mut self, rotation: f64) {
        if rotation == self.rotation {
            return;
        }
        self.rotation = rotation;
        self.mark_dirty();
    }

    pub fn set_viewport_size(&mut self, size: Point) {
        if size == self.viewport {
            return;
        }
        self.viewport = size;
        self.mark_dirty();
    }

    pub fn set_zoom_limits(&mut self, min_zoom: u8, max_zoom: u8) {
        debug_assert!(min_zoom <= max_zoom);
        self.min_zoom = min_zoom;
        self.max_zoom = max_zoom;
        let clamped = self.zoom.clamp(min_zoom as f64, max_zoom as f64);
        if clamped != self.zoom {
            self.zoom = clamped;
            self.mark_dirty();
        }
    }

    /// Starts an animated zoom toward `target` over `period`
    ///
    /// A zero period applies the zoom immediately. The animation is advanced
    /// by [`Camera::update`] and terminates once the target is reached.
    pub fn zoom_to(&mut self, target: f64, period: Duration, easing: EasingFunction, now: Instant) {
        let target = target.clamp(self.min_zoom as f64, self.max_zoom as f64);
        if period.is_zero() || target == self.zoom {
            self.set_zoom(target);
            return;
        }
        self.zoom_animation = Some(ZoomAnimation {
            from: self.zoom,
            to: target,
            started: now,
            period,
            easing,
        });
    }

    /// Advances the zoom animation; returns true while one is still running
    pub fn update(&mut self, now: Instant) -> bool {
        let Some(anim) = self.zoom_animation else {
            return false;
        };
        let elapsed = now.saturating_duration_since(anim.started);
        let t = elapsed.as_secs_f64() / anim.period.as_secs_f64();
        if t >= 1.0 {
            self.apply_zoom(anim.to);
            self.zoom_animation = None;
            false
        } else {
            self.apply_zoom(Interpolation::ease(anim.from, anim.to, t, anim.easing));
            true
        }
    }

    pub fn is_animating(&self) -> bool {
        self.zoom_animation.is_some()
    }

    /// The integer pyramid level whose tile scale is closest to the
    /// continuous zoom, ties rounding up: 2.4 -> 2, 2.5 -> 3, 2.6 -> 3
    pub fn tile_zoom(&self) -> u8 {
        let level = (self.zoom + 0.5).floor();
        (level.clamp(self.min_zoom as f64, self.max_zoom as f64)) as u8
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Reads and clears the dirty flag; the caller is expected to recompute
    /// dependent state (priorities, draw matrices) when this returns true
    pub fn take_dirty(&mut self) -> bool {
        let dirty = self.dirty;
        self.dirty = false;
        dirty
    }

    /// Begins a mutation batch: dirty transitions are suppressed until the
    /// matching [`Camera::thaw`]
    pub fn freeze(&mut self) {
        self.freeze_depth += 1;
    }

    /// Ends a mutation batch; returns true if anything changed while frozen
    pub fn thaw(&mut self) -> bool {
        debug_assert!(self.freeze_depth > 0, "thaw without matching freeze");
        self.freeze_depth = self.freeze_depth.saturating_sub(1);
        if self.freeze_depth == 0 && self.frozen_dirty {
            self.frozen_dirty = false;
            self.dirty = true;
            true
        } else {
            false
        }
    }

    /// Transforms a point in unit map space to screen pixels
    pub fn map_to_screen(&mut self, point: Point) -> Point {
        self.matrices().0.apply(point)
    }

    /// Transforms a screen pixel position back into unit map space
    pub fn screen_to_map(&mut self, point: Point) -> Point {
        self.matrices().1.apply(point)
    }

    /// Computes the enclosing tile range for the current view at level `z`
    ///
    /// The four viewport corners are inverse-transformed into map space and
    /// the enclosing integer range is clamped to `[0, 2^z - 1]`. Called once
    /// per frame, not per tile.
    pub fn visible_range(&mut self, z: u8) -> TileRange {
        let to_map = self.matrices().1;
        let corners = [
            Point::new(0.0, 0.0),
            Point::new(self.viewport.x, 0.0),
            Point::new(0.0, self.viewport.y),
            Point::new(self.viewport.x, self.viewport.y),
        ];
        let mut min = Point::new(f64::INFINITY, f64::INFINITY);
        let mut max = Point::new(f64::NEG_INFINITY, f64::NEG_INFINITY);
        for corner in corners {
            let mapped = to_map.apply(corner);
            min.x = min.x.min(mapped.x);
            min.y = min.y.min(mapped.y);
            max.x = max.x.max(mapped.x);
            max.y = max.y.max(mapped.y);
        }

        let n = 2_f64.powi(z as i32);
        let max_index = n - 1.0;
        let tile_index = |v: f64| (v * n).floor().clamp(0.0, max_index) as u32;
        TileRange::new(
            z,
            tile_index(min.x),
            tile_index(min.y),
            tile_index(max.x),
            tile_index(max.y),
        )
    }

    fn apply_zoom(&mut self, zoom: f64) {
        if zoom == self.zoom {
            return;
        }
        self.zoom = zoom;
        self.mark_dirty();
    }

    fn mark_dirty(&mut self) {
        self.matrices = None;
        if self.freeze_depth > 0 {
            self.frozen_dirty = true;
        } else {
            self.dirty = true;
        }
    }

    fn matrices(&mut self) -> (Affine, Affine) {
        match self.matrices {
            Some(pair) => pair,
            None => {
                let pair = self.rebuild_matrices();
                self.matrices = Some(pair);
                pair
            }
        }
    }

    fn rebuild_matrices(&self) -> (Affine, Affine) {
        let scale = self.tile_size as f64 * 2_f64.powf(self.zoom);
        let to_screen = Affine::translation(self.viewport.x / 2.0, self.viewport.y / 2.0)
            .multiply(&Affine::rotation(self.rotation))
            .multiply(&Affine::scale(scale, scale))
            .multiply(&Affine::translation(-self.center.x, -self.center.y));
        let to_map = match to_screen.invert() {
            Some(inverse) => inverse,
            None => {
                debug_assert!(false, "camera transform must be invertible");
                Affine::identity()
            }
        };
        (to_screen, to_map)
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::new(Point::new(800.0, 600.0), 256)
    }
}
