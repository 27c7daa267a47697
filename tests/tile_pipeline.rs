//! End-to-end tests of the tile streaming pipeline: store, scheduler,
//! fetchers, and compositor driven through the public `Map` API.

use slippy::{
    core::space::{Point, TileCoord},
    tiles::{
        fetcher::TileFetcher,
        layer::{TileLayer, TileLayerOptions},
        source::TemplateSource,
        tile::TileState,
    },
    Map, MapOptions,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Fetcher whose requests never complete; used where tiles must stay pending.
struct NeverFetcher;

#[async_trait::async_trait]
impl TileFetcher for NeverFetcher {
    async fn fetch(&self, _url: &str) -> slippy::Result<Vec<u8>> {
        futures::future::pending().await
    }
}

/// Fetcher that fails every request immediately.
struct FailingFetcher;

#[async_trait::async_trait]
impl TileFetcher for FailingFetcher {
    async fn fetch(&self, url: &str) -> slippy::Result<Vec<u8>> {
        Err(format!("synthetic failure for {}", url).into())
    }
}

/// Fetcher that records the high-water mark of concurrent requests.
struct CountingFetcher {
    current: Arc<AtomicUsize>,
    peak: Arc<AtomicUsize>,
}

#[async_trait::async_trait]
impl TileFetcher for CountingFetcher {
    async fn fetch(&self, _url: &str) -> slippy::Result<Vec<u8>> {
        let current = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(current, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(5)).await;
        self.current.fetch_sub(1, Ordering::SeqCst);
        Ok(vec![0xab])
    }
}

/// Fetcher that parks every request until the test opens the gate.
struct GatedFetcher {
    gate: Arc<tokio::sync::Semaphore>,
}

#[async_trait::async_trait]
impl TileFetcher for GatedFetcher {
    async fn fetch(&self, _url: &str) -> slippy::Result<Vec<u8>> {
        let permit = self.gate.acquire().await.map_err(|e| e.to_string())?;
        permit.forget();
        Ok(vec![0xcd])
    }
}

fn make_map(fetcher: Arc<dyn TileFetcher>, options: TileLayerOptions) -> (Map, usize) {
    let mut map = Map::new(Point::new(512.0, 512.0), MapOptions::default());
    let layer = TileLayer::new(
        Arc::new(TemplateSource::new("test://{z}/{x}/{y}")),
        fetcher,
        options,
    );
    let index = map.add_layer(layer);
    (map, index)
}

/// Drives frames with real time until the loop settles or the limit is hit.
async fn drive_until_settled(map: &mut Map, max_frames: usize) -> usize {
    for frame in 0..max_frames {
        let output = map.render_frame(Instant::now());
        if !output.animating {
            return frame + 1;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("frame loop did not settle within {} frames", max_frames);
}

#[test]
fn test_cache_warm_tiles_complete_without_network() {
    // with the byte cache pre-seeded nothing is spawned, so the whole state
    // machine runs synchronously
    let (mut map, index) = make_map(Arc::new(NeverFetcher), TileLayerOptions::default());
    let root = TileCoord::new(0, 0, 0);
    map.layer(index)
        .expect("layer registered")
        .cache()
        .insert(root, Arc::new(vec![1, 2, 3]));

    let start = Instant::now();

    // first frame creates and admits the tile; the cache completes it after
    // the plan was built
    let output = map.render_frame(start);
    assert!(output.plans[index].draws.is_empty());
    assert!(output.animating);

    // second frame draws it mid-fade
    let output = map.render_frame(start + Duration::from_millis(10));
    assert_eq!(output.plans[index].draws.len(), 1);
    let draw = &output.plans[index].draws[0];
    assert_eq!(draw.coord, root);
    assert!(!draw.interim);
    assert!(draw.alpha > 0.0 && draw.alpha < 1.0);
    assert!(output.animating);

    // past the fade period the tile is complete and the loop settles
    let output = map.render_frame(start + Duration::from_millis(250));
    assert_eq!(output.plans[index].draws[0].alpha, 1.0);
    assert!(!output.animating);

    let layer = map.layer(index).expect("layer registered");
    assert_eq!(
        layer.store().get(&root).map(|t| t.state()),
        Some(TileState::Complete)
    );
}

#[tokio::test]
async fn test_visible_tiles_drain_within_concurrency_bound() {
    let current = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));
    let fetcher = CountingFetcher {
        current: current.clone(),
        peak: peak.clone(),
    };
    let mut options = TileLayerOptions::default();
    options.max_concurrent = 4;
    let (mut map, index) = make_map(Arc::new(fetcher), options);

    // 3x3 visible tiles at zoom 2 for a 512px viewport
    map.camera_mut().set_zoom(2.0);
    drive_until_settled(&mut map, 400).await;

    assert!(peak.load(Ordering::SeqCst) <= 4, "concurrency bound exceeded");
    assert!(peak.load(Ordering::SeqCst) >= 1);

    let range = map.camera_mut().visible_range(2);
    let layer = map.layer(index).expect("layer registered");
    assert_eq!(layer.store().len(), 9);
    for coord in range.iter() {
        let state = layer.store().get(&coord).map(|t| t.state());
        assert_eq!(
            state,
            Some(TileState::Complete),
            "tile {} not complete",
            coord.key()
        );
    }
}

#[tokio::test]
async fn test_failed_tiles_degrade_to_interim_ancestor() {
    let (mut map, index) = make_map(Arc::new(FailingFetcher), TileLayerOptions::default());

    // warm the root tile through the cache so a fallback candidate exists
    map.layer(index)
        .expect("layer registered")
        .cache()
        .insert(TileCoord::new(0, 0, 0), Arc::new(vec![7]));
    drive_until_settled(&mut map, 400).await;

    // zoom in; every native tile fails and the root must stand in
    map.camera_mut().set_zoom(2.0);
    drive_until_settled(&mut map, 400).await;

    let output = map.render_frame(Instant::now());
    assert!(!output.animating, "failed tiles must not keep the loop alive");
    let draws = &output.plans[index].draws;
    assert_eq!(draws.len(), 1);
    assert!(draws[0].interim);
    assert_eq!(draws[0].coord, TileCoord::new(0, 0, 0));
    assert_eq!(draws[0].alpha, 1.0);

    let range = map.camera_mut().visible_range(2);
    let layer = map.layer(index).expect("layer registered");
    for coord in range.iter() {
        assert_eq!(
            layer.store().get(&coord).map(|t| t.state()),
            Some(TileState::Error),
            "tile {} should have failed",
            coord.key()
        );
    }
}

#[tokio::test]
async fn test_zoom_out_drops_pending_deeper_tiles_but_not_in_flight() {
    let mut options = TileLayerOptions::default();
    options.max_concurrent = 4;
    let (mut map, index) = make_map(Arc::new(NeverFetcher), options);
    let releases = map.layer(index).expect("layer registered").released();

    // 9 tiles wanted at zoom 2: four admitted, five left pending
    map.camera_mut().set_zoom(2.0);
    map.render_frame(Instant::now());
    assert_eq!(map.layer(index).expect("layer registered").outstanding(), 9);

    // zooming out makes the pending zoom-2 tiles unusable; they are dropped
    // while the in-flight four run on untouched
    map.camera_mut().set_zoom(1.0);
    map.render_frame(Instant::now());

    let dropped: Vec<TileCoord> = releases.try_iter().collect();
    assert_eq!(dropped.len(), 5);
    assert!(dropped.iter().all(|c| c.z == 2));

    let layer = map.layer(index).expect("layer registered");
    for coord in &dropped {
        assert!(layer.store().get(coord).is_none());
    }

    let loading = (0..4)
        .flat_map(|x| (0..4).map(move |y| TileCoord::new(x, y, 2)))
        .filter(|c| layer.store().get(c).map(|t| t.state()) == Some(TileState::Loading))
        .count();
    assert_eq!(loading, 4, "in-flight fetches must not be cancelled");

    // the zoom-1 view now waits on its own four tiles
    let waiting = (0..2)
        .flat_map(|x| (0..2).map(move |y| TileCoord::new(x, y, 1)))
        .filter(|c| layer.store().get(c).is_some())
        .count();
    assert_eq!(waiting, 4);
}

#[tokio::test]
async fn test_dropped_coordinate_is_resubmitted_under_a_fresh_identity() {
    let gate = Arc::new(tokio::sync::Semaphore::new(0));
    let mut options = TileLayerOptions::default();
    options.max_concurrent = 4;
    let (mut map, index) = make_map(
        Arc::new(GatedFetcher { gate: gate.clone() }),
        options,
    );

    // four zoom-2 fetches park on the gate, five stay pending
    map.camera_mut().set_zoom(2.0);
    map.render_frame(Instant::now());
    tokio::time::sleep(Duration::from_millis(10)).await;

    // zooming out drops the pending five
    map.camera_mut().set_zoom(0.0);
    map.render_frame(Instant::now());
    let released: Vec<TileCoord> = map
        .layer(index)
        .expect("layer registered")
        .released()
        .try_iter()
        .collect();
    assert_eq!(released.len(), 5);

    // seed the cache so the dropped coordinates complete instantly when the
    // view needs them again
    let cache = map.layer(index).expect("layer registered").cache();
    for coord in &released {
        cache.insert(*coord, Arc::new(vec![9]));
    }

    // open the gate and return to zoom 2; the dropped coordinates come back
    // as fresh tiles and complete from the byte cache
    gate.add_permits(64);
    map.camera_mut().set_zoom(2.0);
    drive_until_settled(&mut map, 400).await;

    let layer = map.layer(index).expect("layer registered");
    for coord in &released {
        assert_eq!(
            layer.store().get(coord).map(|t| t.state()),
            Some(TileState::Complete),
            "resubmitted tile {} did not complete",
            coord.key()
        );
    }
}
