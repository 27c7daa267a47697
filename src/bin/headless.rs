use slippy::{
    core::space::Point,
    tiles::{
        fetcher::TileFetcher,
        layer::{TileLayer, TileLayerOptions},
        source::TemplateSource,
    },
    Map, MapOptions,
};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Fetcher that fabricates an opaque tile after a short artificial latency,
/// so the demo runs without a network or a GPU.
struct SyntheticFetcher;

#[async_trait::async_trait]
impl TileFetcher for SyntheticFetcher {
    async fn fetch(&self, _url: &str) -> slippy::Result<Vec<u8>> {
        tokio::time::sleep(Duration::from_millis(30)).await;
        Ok(vec![0x7f; 256 * 256 * 4])
    }
}

/// Example of driving the engine headless: pan and zoom, watch tiles stream
/// in and fade, stop once the frame loop settles.
#[tokio::main]
async fn main() -> slippy::Result<()> {
    #[cfg(feature = "debug")]
    env_logger::init();

    let mut map = Map::new(Point::new(1024.0, 768.0), MapOptions::default());
    let layer = TileLayer::new(
        Arc::new(TemplateSource::new("synthetic://{z}/{x}/{y}")),
        Arc::new(SyntheticFetcher),
        TileLayerOptions::default(),
    );
    let layer_index = map.add_layer(layer);

    map.camera_mut().set_zoom(3.0);
    map.camera_mut().set_center(Point::new(0.45, 0.55));

    println!("slippy headless demo");
    println!("====================");

    let mut frame = 0_u32;
    loop {
        let output = map.render_frame(Instant::now());
        let plan = &output.plans[layer_index];
        let interim = plan.draws.iter().filter(|d| d.interim).count();
        println!(
            "frame {:>3}: {:>2} draws ({} interim), animating={}",
            frame,
            plan.draws.len(),
            interim,
            output.animating
        );

        frame += 1;
        if !output.animating || frame > 600 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(16)).await;
    }

    let layer = map.layer(layer_index).expect("layer registered above");
    println!(
        "settled after {} frames with {} tiles resident",
        frame,
        layer.store().len()
    );
    Ok(())
}
