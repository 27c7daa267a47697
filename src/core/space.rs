use serde::{Deserialize, Serialize};

/// Represents a point in unit map space or in screen pixels
///
/// Map space maps the whole world onto `[0,1)^2`; which space a `Point` is in
/// is determined by context.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn add(&self, other: &Point) -> Point {
        Point::new(self.x + other.x, self.y + other.y)
    }

    pub fn subtract(&self, other: &Point) -> Point {
        Point::new(self.x - other.x, self.y - other.y)
    }

    pub fn multiply(&self, scalar: f64) -> Point {
        Point::new(self.x * scalar, self.y * scalar)
    }

    pub fn distance_squared(&self, other: &Point) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx * dx + dy * dy
    }

    pub fn distance_to(&self, other: &Point) -> f64 {
        self.distance_squared(other).sqrt()
    }
}

impl Default for Point {
    fn default() -> Self {
        Self::new(0.0, 0.0)
    }
}

/// Quadtree address of one square raster cell in the tile pyramid
///
/// Invariant: `x` and `y` are in `[0, 2^z)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TileCoord {
    pub x: u32,
    pub y: u32,
    pub z: u8,
}

impl TileCoord {
    pub fn new(x: u32, y: u32, z: u8) -> Self {
        Self { x, y, z }
    }

    /// Checks that the coordinate lies inside the pyramid at its zoom level
    pub fn is_valid(&self) -> bool {
        if self.z >= 32 {
            return false;
        }
        let max_coord = 1_u32 << self.z;
        self.x < max_coord && self.y < max_coord
    }

    /// Gets the parent tile one zoom level up, or `None` at the pyramid root
    pub fn parent(&self) -> Option<TileCoord> {
        if self.z == 0 {
            None
        } else {
            Some(TileCoord::new(self.x / 2, self.y / 2, self.z - 1))
        }
    }

    /// Centroid of the tile in unit map space
    pub fn center(&self) -> Point {
        let n = 2_f64.powi(self.z as i32);
        Point::new((self.x as f64 + 0.5) / n, (self.y as f64 + 0.5) / n)
    }

    /// Canonical `"z/x/y"` key for map lookups and log output
    pub fn key(&self) -> String {
        format!("{}/{}/{}", self.z, self.x, self.y)
    }

    /// Deterministic hash used to balance requests across mirror endpoints
    ///
    /// Not the cache identity; lookups use structural equality via `Eq`/`Hash`.
    pub fn mirror_hash(&self) -> u64 {
        fxhash::hash64(&(self.x, self.y, self.z))
    }
}

/// Inclusive rectangle of tile coordinates at one zoom level
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileRange {
    pub z: u8,
    pub min_x: u32,
    pub min_y: u32,
    pub max_x: u32,
    pub max_y: u32,
}

impl TileRange {
    pub fn new(z: u8, min_x: u32, min_y: u32, max_x: u32, max_y: u32) -> Self {
        Self {
            z,
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    pub fn len(&self) -> usize {
        let width = (self.max_x - self.min_x + 1) as usize;
        let height = (self.max_y - self.min_y + 1) as usize;
        width * height
    }

    pub fn contains(&self, coord: &TileCoord) -> bool {
        coord.z == self.z
            && coord.x >= self.min_x
            && coord.x <= self.max_x
            && coord.y >= self.min_y
            && coord.y <= self.max_y
    }

    /// Iterates the range row by row
    pub fn iter(&self) -> impl Iterator<Item = TileCoord> + '_ {
        let z = self.z;
        let (min_x, max_x) = (self.min_x, self.max_x);
        (self.min_y..=self.max_y)
            .flat_map(move |y| (min_x..=max_x).map(move |x| TileCoord::new(x, y, z)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parent_chain_reaches_root() {
        let mut coord = TileCoord::new(91_121, 59_973, 18);
        for _ in 0..18 {
            coord = coord.parent().expect("parent below root");
        }
        assert_eq!(coord, TileCoord::new(0, 0, 0));
        assert!(coord.parent().is_none());
    }

    #[test]
    fn test_coord_validity() {
        assert!(TileCoord::new(0, 0, 0).is_valid());
        assert!(TileCoord::new(3, 1, 2).is_valid());
        assert!(!TileCoord::new(4, 0, 2).is_valid());
        assert!(!TileCoord::new(0, 4, 2).is_valid());
    }

    #[test]
    fn test_center_in_unit_space() {
        let root = TileCoord::new(0, 0, 0);
        assert_eq!(root.center(), Point::new(0.5, 0.5));

        let corner = TileCoord::new(0, 0, 2);
        assert_eq!(corner.center(), Point::new(0.125, 0.125));
    }

    #[test]
    fn test_key_format() {
        assert_eq!(TileCoord::new(5, 9, 4).key(), "4/5/9");
    }

    #[test]
    fn test_mirror_hash_is_deterministic() {
        let coord = TileCoord::new(12, 34, 7);
        assert_eq!(coord.mirror_hash(), coord.mirror_hash());
        assert_ne!(
            coord.mirror_hash(),
            TileCoord::new(13, 34, 7).mirror_hash()
        );
    }

    #[test]
    fn test_range_iteration() {
        let range = TileRange::new(3, 1, 2, 2, 3);
        let coords: Vec<_> = range.iter().collect();
        assert_eq!(coords.len(), range.len());
        assert_eq!(coords[0], TileCoord::new(1, 2, 3));
        assert_eq!(coords[3], TileCoord::new(2, 3, 3));
        assert!(coords.iter().all(|c| range.contains(c)));
    }
}
