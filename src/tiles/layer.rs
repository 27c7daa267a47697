use crate::animation::easing::EasingFunction;
use crate::compose::{self, FramePlan};
use crate::core::camera::Camera;
use crate::core::space::TileCoord;
use crate::prelude::{Arc, Duration, Instant};
use crate::tiles::cache::TileCache;
use crate::tiles::fetcher::{FetchOutcome, HttpFetcher, TileFetcher};
use crate::tiles::queue::{Admission, TileQueue};
use crate::tiles::source::{TemplateSource, TileSource};
use crate::tiles::store::TileStore;
use crossbeam_channel::{unbounded, Receiver, Sender};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TileLayerOptions {
    pub min_zoom: u8,
    pub max_zoom: u8,
    pub visible: bool,
    /// Draw coarser ancestor tiles in place of tiles that are not ready
    pub interim_tiles: bool,
    /// Fade-in period for newly ready tiles
    pub fade_in_ms: u64,
    pub fade_easing: EasingFunction,
    /// Bound on concurrently in-flight tile fetches
    pub max_concurrent: usize,
    /// Capacity of the fetched-bytes cache, in tiles
    pub cache_capacity: usize,
}

impl Default for TileLayerOptions {
    fn default() -> Self {
        Self {
            min_zoom: 0,
            max_zoom: 18,
            visible: true,
            interim_tiles: true,
            fade_in_ms: 100,
            fade_easing: EasingFunction::SmoothStep,
            max_concurrent: 8,
            cache_capacity: 1024,
        }
    }
}

impl TileLayerOptions {
    pub fn fade_in(&self) -> Duration {
        Duration::from_millis(self.fade_in_ms)
    }
}

/// One raster tile layer: a store of tiles, the admission queue feeding it,
/// and the fetch pipeline that fills it
///
/// Fetch completions arrive as [`FetchOutcome`] values on a channel owned by
/// the layer and are applied by [`TileLayer::pump`]; nothing mutates layer
/// state from the fetch tasks themselves.
pub struct TileLayer {
    options: TileLayerOptions,
    source: Arc<dyn TileSource>,
    fetcher: Arc<dyn TileFetcher>,
    store: TileStore,
    queue: TileQueue,
    cache: TileCache,
    result_tx: Sender<FetchOutcome>,
    result_rx: Receiver<FetchOutcome>,
}

impl TileLayer {
    pub fn new(
        source: Arc<dyn TileSource>,
        fetcher: Arc<dyn TileFetcher>,
        options: TileLayerOptions,
    ) -> Self {
        let (result_tx, result_rx) = unbounded();
        let queue = TileQueue::new(options.max_concurrent);
        let cache = TileCache::new(options.cache_capacity);
        Self {
            options,
            source,
            fetcher,
            store: TileStore::new(),
            queue,
            cache,
            result_tx,
            result_rx,
        }
    }

    /// Layer fetching from the public OpenStreetMap servers
    pub fn openstreetmap(options: TileLayerOptions) -> Self {
        Self::new(
            Arc::new(TemplateSource::openstreetmap()),
            Arc::new(HttpFetcher),
            options,
        )
    }

    pub fn options(&self) -> &TileLayerOptions {
        &self.options
    }

    pub fn is_visible(&self) -> bool {
        self.options.visible
    }

    pub fn set_visible(&mut self, visible: bool) {
        self.options.visible = visible;
    }

    pub fn interim_tiles(&self) -> bool {
        self.options.interim_tiles
    }

    pub fn set_interim_tiles(&mut self, interim: bool) {
        self.options.interim_tiles = interim;
    }

    pub fn store(&self) -> &TileStore {
        &self.store
    }

    /// Release notifications for dropped tiles, for GPU resource cleanup
    pub fn released(&self) -> Receiver<TileCoord> {
        self.store.released()
    }

    /// Handle to the shared fetched-bytes cache
    pub fn cache(&self) -> TileCache {
        self.cache.clone()
    }

    /// Work not yet applied to the store: pending, in flight, or undrained
    pub fn outstanding(&self) -> usize {
        self.queue.pending_len() + self.queue.in_flight_len() + self.result_rx.len()
    }

    /// Admission policy for one coordinate under the current camera
    ///
    /// Tiles at the camera's tile zoom are prioritized by squared distance of
    /// their centroid to the view center. Coarser tiles are legitimate
    /// fallback candidates and admitted with a zoom-distance penalty; tiles
    /// deeper than the current level, or outside the layer's zoom bounds, can
    /// never serve the view and are rejected.
    fn admission(options: &TileLayerOptions, camera: &Camera, coord: TileCoord) -> Admission {
        if coord.z < options.min_zoom || coord.z > options.max_zoom {
            return Admission::Reject;
        }
        let tile_zoom = camera.tile_zoom();
        if coord.z > tile_zoom {
            return Admission::Reject;
        }
        let distance = coord.center().distance_squared(&camera.center());
        let zoom_gap = (tile_zoom - coord.z) as f64;
        Admission::Admit(zoom_gap + distance)
    }

    /// Recomputes every pending priority after a camera change
    ///
    /// Entries the policy now rejects are dropped from the store as well;
    /// in-flight fetches run to completion regardless.
    pub fn reprioritize(&mut self, camera: &Camera) {
        let options = self.options.clone();
        let dropped = self
            .queue
            .reprioritize(|coord| Self::admission(&options, camera, coord));
        for coord in dropped {
            self.store.drop_tile(coord);
        }
    }

    /// Applies queued fetch completions, then fills free admission slots
    ///
    /// Returns the number of completions applied by this call.
    pub fn pump(&mut self, now: Instant) -> usize {
        let mut completed = 0;
        while let Ok(outcome) = self.result_rx.try_recv() {
            self.queue.complete(outcome.coord);
            match outcome.data {
                Ok(bytes) => {
                    let bytes = Arc::new(bytes);
                    self.cache.insert(outcome.coord, bytes.clone());
                    // the tile may have been dropped while its fetch was in
                    // flight; the bytes stay cached either way
                    if let Some(tile) = self.store.get_mut(&outcome.coord) {
                        tile.mark_loaded(bytes, now);
                        log::debug!("tile {} loaded", outcome.coord.key());
                    }
                }
                Err(error) => {
                    log::warn!("tile {} failed to load: {}", outcome.coord.key(), error);
                    if let Some(tile) = self.store.get_mut(&outcome.coord) {
                        tile.mark_error();
                    }
                }
            }
            completed += 1;
        }
        self.admit_pending(now);
        completed
    }

    /// Plans the frame for this layer, registering and enqueueing any tiles
    /// the visible range needs that the store does not have yet
    pub fn compose(&mut self, camera: &mut Camera, now: Instant) -> FramePlan {
        let (mut plan, created) = compose::plan_frame(&mut self.store, camera, &self.options, now);
        for coord in created {
            let admission = Self::admission(&self.options, camera, coord);
            if !self.queue.enqueue(coord, admission) {
                self.store.drop_tile(coord);
            }
        }
        if self.admit_pending(now) > 0 {
            // completions served from the cache landed after the plan was
            // built; one more frame picks them up
            plan.animating = true;
        }
        plan
    }

    /// Starts fetches while slots are free; returns how many admissions
    /// completed synchronously from the byte cache
    fn admit_pending(&mut self, now: Instant) -> usize {
        let mut cache_hits = 0;
        loop {
            let admitted = self.queue.admit();
            if admitted.is_empty() {
                break;
            }
            for coord in admitted {
                let Some(tile) = self.store.get_mut(&coord) else {
                    debug_assert!(false, "admitted tile missing from store: {}", coord.key());
                    self.queue.complete(coord);
                    continue;
                };
                tile.mark_loading();

                if let Some(bytes) = self.cache.get(&coord) {
                    tile.mark_loaded(bytes, now);
                    self.queue.complete(coord);
                    cache_hits += 1;
                    continue;
                }

                let url = self.source.url(coord);
                let fetcher = self.fetcher.clone();
                let result_tx = self.result_tx.clone();
                log::debug!("fetching tile {} from {}", coord.key(), url);
                crate::runtime::spawn(async move {
                    let data = fetcher.fetch(&url).await;
                    let _ = result_tx.send(FetchOutcome { coord, data });
                });
            }
        }
        cache_hits
    }
}
