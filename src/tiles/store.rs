use crate::core::space::TileCoord;
use crate::prelude::HashMap;
use crate::tiles::tile::Tile;
use crossbeam_channel::{unbounded, Receiver, Sender};

/// Per-layer mapping from coordinate to its single live [`Tile`]
///
/// Every tile enters through [`TileStore::get_or_create`] and leaves through
/// [`TileStore::drop_tile`]; a removal is announced on the release channel so
/// the rendering collaborator can free any GPU resource bound to the
/// coordinate.
#[derive(Debug)]
pub struct TileStore {
    tiles: HashMap<TileCoord, Tile>,
    released_tx: Sender<TileCoord>,
    released_rx: Receiver<TileCoord>,
}

impl TileStore {
    pub fn new() -> Self {
        let (released_tx, released_rx) = unbounded();
        Self {
            tiles: HashMap::default(),
            released_tx,
            released_rx,
        }
    }

    /// Returns the tile for `coord`, creating a `Waiting` tile if absent
    ///
    /// The boolean is true when the tile was created by this call; the caller
    /// is responsible for submitting new tiles to the scheduler.
    pub fn get_or_create(&mut self, coord: TileCoord) -> (&mut Tile, bool) {
        debug_assert!(coord.is_valid(), "coordinate outside the pyramid: {}", coord.key());
        match self.tiles.entry(coord) {
            std::collections::hash_map::Entry::Occupied(entry) => (entry.into_mut(), false),
            std::collections::hash_map::Entry::Vacant(entry) => {
                (entry.insert(Tile::new(coord)), true)
            }
        }
    }

    pub fn get(&self, coord: &TileCoord) -> Option<&Tile> {
        self.tiles.get(coord)
    }

    pub fn get_mut(&mut self, coord: &TileCoord) -> Option<&mut Tile> {
        self.tiles.get_mut(coord)
    }

    pub fn contains(&self, coord: &TileCoord) -> bool {
        self.tiles.contains_key(coord)
    }

    /// Removes the tile, releases its pixel data, and emits a release event
    ///
    /// Returns false when no tile was registered for `coord`.
    pub fn drop_tile(&mut self, coord: TileCoord) -> bool {
        match self.tiles.remove(&coord) {
            Some(mut tile) => {
                tile.release();
                log::debug!("dropped tile {}", coord.key());
                let _ = self.released_tx.send(coord);
                true
            }
            None => false,
        }
    }

    /// Release notifications, one coordinate per dropped tile
    pub fn released(&self) -> Receiver<TileCoord> {
        self.released_rx.clone()
    }

    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }
}

impl Default for TileStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tiles::tile::TileState;
    use std::time::Instant;

    #[test]
    fn test_get_or_create_is_identity_stable() {
        let mut store = TileStore::new();
        let coord = TileCoord::new(1, 1, 1);
        let now = Instant::now();

        let (tile, created) = store.get_or_create(coord);
        assert!(created);
        tile.touch(now);
        let first_used = tile.last_used();

        let (tile, created) = store.get_or_create(coord);
        assert!(!created);
        assert_eq!(tile.last_used(), first_used);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_drop_emits_release_event() {
        let mut store = TileStore::new();
        let coord = TileCoord::new(2, 3, 4);
        let releases = store.released();

        store.get_or_create(coord);
        assert!(store.drop_tile(coord));
        assert!(!store.contains(&coord));
        assert_eq!(releases.try_recv(), Ok(coord));

        // second drop is a no-op
        assert!(!store.drop_tile(coord));
        assert!(releases.try_recv().is_err());
    }

    #[test]
    fn test_recreate_after_drop_gets_fresh_tile() {
        let mut store = TileStore::new();
        let coord = TileCoord::new(0, 0, 1);

        let (tile, _) = store.get_or_create(coord);
        tile.mark_loading();
        store.drop_tile(coord);

        let (tile, created) = store.get_or_create(coord);
        assert!(created);
        assert_eq!(tile.state(), TileState::Waiting);
    }
}
