use crate::animation::easing::EasingFunction;
use crate::core::space::TileCoord;
use crate::prelude::{Arc, Duration, Instant};

/// Lifecycle of a single tile
///
/// `Waiting -> Loading -> FadingIn -> Complete`, or `Loading -> Error`.
/// `Error` is terminal; a tile is never retried under the same identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TileState {
    /// Created but not yet admitted by the scheduler
    Waiting,
    /// Fetch admitted and in flight
    Loading,
    /// Pixel data ready, blend weight still below 1
    FadingIn,
    /// Fully opaque
    Complete,
    /// Fetch failed; permanently unavailable for direct rendering
    Error,
}

/// One raster tile, owned by exactly one [`crate::TileStore`] entry
#[derive(Debug)]
pub struct Tile {
    coord: TileCoord,
    data: Option<Arc<Vec<u8>>>,
    state: TileState,
    first_ready: Option<Instant>,
    first_used: Option<Instant>,
    last_used: Option<Instant>,
}

impl Tile {
    pub fn new(coord: TileCoord) -> Self {
        Self {
            coord,
            data: None,
            state: TileState::Waiting,
            first_ready: None,
            first_used: None,
            last_used: None,
        }
    }

    pub fn coord(&self) -> TileCoord {
        self.coord
    }

    pub fn state(&self) -> TileState {
        self.state
    }

    pub fn data(&self) -> Option<&Arc<Vec<u8>>> {
        self.data.as_ref()
    }

    /// A tile is ready once its pixel data can be drawn
    pub fn is_ready(&self) -> bool {
        matches!(self.state, TileState::FadingIn | TileState::Complete)
    }

    pub fn first_ready(&self) -> Option<Instant> {
        self.first_ready
    }

    pub fn last_used(&self) -> Option<Instant> {
        self.last_used
    }

    /// Records that this frame requested the tile
    pub fn touch(&mut self, now: Instant) {
        if self.first_used.is_none() {
            self.first_used = Some(now);
        }
        self.last_used = Some(now);
    }

    /// Scheduler admitted the fetch
    pub fn mark_loading(&mut self) {
        debug_assert_eq!(self.state, TileState::Waiting, "admission of a non-waiting tile");
        self.state = TileState::Loading;
    }

    /// Fetch completed successfully; `first_ready` is set exactly once
    pub fn mark_loaded(&mut self, data: Arc<Vec<u8>>, now: Instant) {
        debug_assert_eq!(self.state, TileState::Loading, "load completion for a tile not loading");
        self.data = Some(data);
        self.state = TileState::FadingIn;
        if self.first_ready.is_none() {
            self.first_ready = Some(now);
        }
    }

    /// Fetch failed; the tile stays in `Error` and is never retried
    pub fn mark_error(&mut self) {
        debug_assert_eq!(self.state, TileState::Loading, "error for a tile not loading");
        self.data = None;
        self.state = TileState::Error;
    }

    /// Blend weight for drawing the tile at `now`
    ///
    /// Monotonically non-decreasing for a fixed tile, reaching exactly 1 at
    /// `first_ready + period`, at which point the state advances to
    /// `Complete`. Non-ready tiles report 0.
    pub fn fade_alpha(&mut self, now: Instant, period: Duration, easing: EasingFunction) -> f32 {
        match self.state {
            TileState::Complete => 1.0,
            TileState::FadingIn => {
                let Some(first_ready) = self.first_ready else {
                    debug_assert!(false, "fading tile without a ready time");
                    return 0.0;
                };
                let elapsed = now.saturating_duration_since(first_ready);
                if elapsed >= period {
                    self.state = TileState::Complete;
                    1.0
                } else {
                    easing.apply(elapsed.as_secs_f64() / period.as_secs_f64()) as f32
                }
            }
            _ => 0.0,
        }
    }

    /// Drops the pixel data; called by the store on eviction
    pub(crate) fn release(&mut self) {
        self.data = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FADE: Duration = Duration::from_millis(100);

    fn loaded_tile(now: Instant) -> Tile {
        let mut tile = Tile::new(TileCoord::new(1, 2, 3));
        tile.mark_loading();
        tile.mark_loaded(Arc::new(vec![1, 2, 3]), now);
        tile
    }

    #[test]
    fn test_lifecycle_success_path() {
        let now = Instant::now();
        let mut tile = Tile::new(TileCoord::new(0, 0, 0));
        assert_eq!(tile.state(), TileState::Waiting);
        assert!(!tile.is_ready());

        tile.mark_loading();
        assert_eq!(tile.state(), TileState::Loading);

        tile.mark_loaded(Arc::new(vec![0xff]), now);
        assert_eq!(tile.state(), TileState::FadingIn);
        assert!(tile.is_ready());
        assert_eq!(tile.first_ready(), Some(now));
    }

    #[test]
    fn test_lifecycle_error_path() {
        let mut tile = Tile::new(TileCoord::new(0, 0, 1));
        tile.mark_loading();
        tile.mark_error();
        assert_eq!(tile.state(), TileState::Error);
        assert!(!tile.is_ready());
        assert!(tile.data().is_none());
    }

    #[test]
    fn test_fade_alpha_is_monotone_and_completes() {
        let start = Instant::now();
        let mut tile = loaded_tile(start);

        let mut last = -1.0_f32;
        for ms in [0_u64, 20, 50, 80, 99] {
            let alpha = tile.fade_alpha(start + Duration::from_millis(ms), FADE, EasingFunction::SmoothStep);
            assert!(alpha >= last);
            assert!(alpha < 1.0);
            assert_eq!(tile.state(), TileState::FadingIn);
            last = alpha;
        }

        let alpha = tile.fade_alpha(start + FADE, FADE, EasingFunction::SmoothStep);
        assert_eq!(alpha, 1.0);
        assert_eq!(tile.state(), TileState::Complete);

        // complete tiles stay opaque
        let alpha = tile.fade_alpha(start, FADE, EasingFunction::SmoothStep);
        assert_eq!(alpha, 1.0);
    }

    #[test]
    fn test_fade_alpha_zero_before_ready() {
        let now = Instant::now();
        let mut tile = Tile::new(TileCoord::new(0, 0, 0));
        assert_eq!(tile.fade_alpha(now, FADE, EasingFunction::SmoothStep), 0.0);
        tile.mark_loading();
        assert_eq!(tile.fade_alpha(now, FADE, EasingFunction::SmoothStep), 0.0);
    }

    #[test]
    fn test_touch_tracks_first_and_last_use() {
        let t0 = Instant::now();
        let t1 = t0 + Duration::from_millis(16);
        let mut tile = Tile::new(TileCoord::new(0, 0, 0));

        tile.touch(t0);
        tile.touch(t1);
        assert_eq!(tile.last_used(), Some(t1));

        // first_used is sticky
        let mut tile2 = Tile::new(TileCoord::new(0, 0, 0));
        tile2.touch(t0);
        let first = tile2.first_used;
        tile2.touch(t1);
        assert_eq!(tile2.first_used, first);
    }
}
