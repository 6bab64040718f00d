//! World ↔ grid coordinate conversion.
//!
//! The world origin sits at the centre cell of every slice, so the mapping
//! depends on the slice's current side length and shifts when it grows.
//!
//! ```rust
//! use placefield_map::transform::CoordinateTransform;
//!
//! let tf = CoordinateTransform::new(1.0);
//! assert_eq!(tf.real_to_cell(2.0, 3.0, 1025), (514, 515));
//! assert_eq!(tf.cell_to_real(514, 515, 1025), (2.0, 3.0));
//! ```

/// Maps continuous `(x, z)` world coordinates onto discrete `(i, j)` cells.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoordinateTransform {
    /// Cells per world unit.
    resolution: f32,
}

impl CoordinateTransform {
    /// Create a transform with `resolution` cells per world unit.
    pub fn new(resolution: f32) -> Self {
        Self { resolution }
    }

    pub fn resolution(&self) -> f32 {
        self.resolution
    }

    /// Convert a world `(x, z)` into the cell of a slice with side `size`.
    ///
    /// The result is signed: anything outside `0..size` lies off the slice
    /// and needs growth before it can be written.  Half-cell ties round to
    /// the even cell.
    pub fn real_to_cell(&self, x: f32, z: f32, size: usize) -> (i64, i64) {
        let half = (size / 2) as f32;
        let i = (x * self.resolution + half).round_ties_even() as i64;
        let j = (z * self.resolution + half).round_ties_even() as i64;
        (i, j)
    }

    /// Convert cell `(i, j)` of a slice with side `size` back to world `(x, z)`.
    pub fn cell_to_real(&self, i: i64, j: i64, size: usize) -> (f32, f32) {
        let half = (size / 2) as i64;
        let x = (i - half) as f32 / self.resolution;
        let z = (j - half) as f32 / self.resolution;
        (x, z)
    }

    /// Height slice for a vertical coordinate.
    ///
    /// Every height currently collapses onto slice `0`.
    pub fn height_to_slice(&self, _y: f32) -> usize {
        0
    }
}

impl Default for CoordinateTransform {
    fn default() -> Self {
        Self::new(1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn origin_maps_to_centre() {
        let tf = CoordinateTransform::default();
        assert_eq!(tf.real_to_cell(0.0, 0.0, 11), (5, 5));
        assert_eq!(tf.real_to_cell(0.0, 0.0, 1025), (512, 512));
    }

    #[test]
    fn resolution_scales_cells() {
        let tf = CoordinateTransform::new(4.0);
        assert_eq!(tf.real_to_cell(1.0, -0.5, 11), (9, 3));
        assert_eq!(tf.cell_to_real(9, 3, 11), (1.0, -0.5));
    }

    #[test]
    fn rounds_to_nearest_cell() {
        let tf = CoordinateTransform::default();
        assert_eq!(tf.real_to_cell(0.4, -0.4, 11), (5, 5));
        assert_eq!(tf.real_to_cell(0.6, -0.6, 11), (6, 4));
    }

    #[test]
    fn half_cell_ties_round_to_even() {
        let tf = CoordinateTransform::default();
        assert_eq!(tf.real_to_cell(0.5, 2.5, 1025), (512, 514));
        assert_eq!(tf.real_to_cell(1.5, -0.5, 1025), (514, 512));
        assert_eq!(tf.real_to_cell(-1.5, 0.5, 11), (4, 6));
    }

    #[test]
    fn off_slice_points_are_negative_or_past_size() {
        let tf = CoordinateTransform::default();
        let (i, j) = tf.real_to_cell(-8.0, 8.0, 11);
        assert_eq!((i, j), (-3, 13));
    }

    #[test]
    fn roundtrip_on_cell_centres() {
        let tf = CoordinateTransform::new(2.0);
        for i in 0..21 {
            for j in [0, 7, 20] {
                let (x, z) = tf.cell_to_real(i, j, 21);
                assert_eq!(tf.real_to_cell(x, z, 21), (i, j));
            }
        }
    }

    #[test]
    fn every_height_is_slice_zero() {
        let tf = CoordinateTransform::default();
        assert_eq!(tf.height_to_slice(-3.0), 0);
        assert_eq!(tf.height_to_slice(12.5), 0);
    }
}
