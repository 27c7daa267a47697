//! Per-frame tile selection: exact tiles where ready, coarser ancestors as
//! interim stand-ins everywhere else, composited coarse-to-fine with fade-in
//! weights.

use crate::core::camera::Camera;
use crate::core::space::TileCoord;
use crate::prelude::{Arc, HashSet, Instant};
use crate::tiles::layer::TileLayerOptions;
use crate::tiles::store::TileStore;
use std::collections::BTreeMap;

/// One textured quad for the GPU collaborator to draw
#[derive(Debug, Clone)]
pub struct TileDraw {
    /// Coordinate of the tile being drawn (an ancestor for interim draws)
    pub coord: TileCoord,
    pub data: Arc<Vec<u8>>,
    /// Blend weight; interim draws are always fully opaque
    pub alpha: f32,
    /// True when this tile stands in for a descendant that is not ready
    pub interim: bool,
}

/// Draw list for one layer and one frame
///
/// Draws are ordered coarsest zoom first so native-resolution tiles occlude
/// their interim placeholders.
#[derive(Debug, Clone, Default)]
pub struct FramePlan {
    pub draws: Vec<TileDraw>,
    /// True while any tile is still fading in; the caller should schedule
    /// another frame
    pub animating: bool,
}

/// Builds the draw list for the visible range at the camera's tile zoom
///
/// Creates missing tiles in the store and returns their coordinates so the
/// layer can submit them for admission.
pub(crate) fn plan_frame(
    store: &mut TileStore,
    camera: &mut Camera,
    options: &TileLayerOptions,
    now: Instant,
) -> (FramePlan, Vec<TileCoord>) {
    let tile_zoom = camera.tile_zoom();
    if tile_zoom < options.min_zoom || tile_zoom > options.max_zoom {
        return (FramePlan::default(), Vec::new());
    }

    let range = camera.visible_range(tile_zoom);
    let fade = options.fade_in();
    let mut created = Vec::new();
    let mut buckets: BTreeMap<u8, Vec<TileDraw>> = BTreeMap::new();
    let mut chosen: HashSet<TileCoord> = HashSet::default();
    let mut animating = false;

    for coord in range.iter() {
        let (tile, was_created) = store.get_or_create(coord);
        tile.touch(now);
        if was_created {
            created.push(coord);
        }

        if tile.is_ready() {
            let alpha = tile.fade_alpha(now, fade, options.fade_easing);
            if alpha < 1.0 {
                animating = true;
            }
            if let Some(data) = tile.data() {
                let data = data.clone();
                if chosen.insert(coord) {
                    buckets.entry(coord.z).or_default().push(TileDraw {
                        coord,
                        data,
                        alpha,
                        interim: false,
                    });
                }
            }
            continue;
        }

        if !options.interim_tiles {
            continue;
        }

        // walk the ancestor chain for the nearest ready stand-in; levels
        // missing from the store are skipped, the layer's minimum zoom is
        // never passed
        let mut ancestor = coord.parent();
        while let Some(candidate) = ancestor {
            if candidate.z < options.min_zoom {
                break;
            }
            if let Some(tile) = store.get_mut(&candidate) {
                if tile.is_ready() {
                    tile.touch(now);
                    if let Some(data) = tile.data() {
                        let data = data.clone();
                        if chosen.insert(candidate) {
                            buckets.entry(candidate.z).or_default().push(TileDraw {
                                coord: candidate,
                                data,
                                alpha: 1.0,
                                interim: true,
                            });
                        }
                    }
                    break;
                }
            }
            ancestor = candidate.parent();
        }
    }

    let draws = buckets.into_values().flatten().collect();
    (
        FramePlan { draws, animating },
        created,
    )
}
