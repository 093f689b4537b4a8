use bevy::prelude::*;

/// Smallest spacing the grid builder accepts, in logical pixels.
pub const MIN_SPACING: f32 = 1.0;

/// A fixed grid position holding a mutable orientation.
///
/// `x`/`y` never change after the grid is built. `current_angle` is owned by
/// the frame stepper and stays normalized to `(-π, π]`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GridCell {
    pub x: f32,
    pub y: f32,
    pub current_angle: f32,
}

impl GridCell {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y, current_angle: 0.0 }
    }
}

/// Ordered cell sequence for the current viewport.
///
/// Order only matters for deterministic iteration (rows outer, columns inner).
#[derive(Resource, Default, Debug)]
pub struct ArrowGrid {
    pub cells: Vec<GridCell>,
    pub columns: usize,
    pub rows: usize,
}

impl ArrowGrid {
    pub fn new(width: f32, height: f32, spacing: f32) -> Self {
        let mut grid = Self::default();
        grid.reset(width, height, spacing);
        grid
    }

    /// Discards every cell and rebuilds the grid for a new viewport.
    ///
    /// Cell identity is not kept: all angles restart at zero.
    pub fn reset(&mut self, width: f32, height: f32, spacing: f32) {
        self.cells.clear();
        let xs = axis_positions(width, spacing);
        let ys = axis_positions(height, spacing);
        self.columns = xs.len();
        self.rows = ys.len();
        self.cells.reserve(xs.len() * ys.len());
        for &y in &ys {
            for &x in &xs {
                self.cells.push(GridCell::new(x, y));
            }
        }
        debug!(
            "Grid rebuilt: {}x{} viewport, spacing {} -> {} cols x {} rows",
            width, height, spacing, self.columns, self.rows
        );
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

/// Cell centers along one axis: start at `spacing/2 + (extent mod spacing)/2`
/// and step by `spacing` while strictly inside the extent.
///
/// Spacing below [`MIN_SPACING`] (or non-finite) yields no positions.
pub fn axis_positions(extent: f32, spacing: f32) -> Vec<f32> {
    if !(spacing.is_finite() && spacing >= MIN_SPACING) {
        return Vec::new();
    }
    let extent = if extent.is_finite() { extent.max(0.0) } else { 0.0 };
    let start = spacing / 2.0 + (extent % spacing) / 2.0;

    // Positions are indexed, not accumulated, so rounding can't stall the walk.
    let count = (extent / spacing).floor() as usize;
    (0..count)
        .map(|i| start + i as f32 * spacing)
        .filter(|&p| p < extent)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_fit_is_ten_by_ten() {
        let grid = ArrowGrid::new(500.0, 500.0, 50.0);
        assert_eq!(grid.columns, 10);
        assert_eq!(grid.rows, 10);
        assert_eq!(grid.len(), 100);
        assert_eq!(grid.cells[0], GridCell::new(25.0, 25.0));
        assert_eq!(grid.cells[99], GridCell::new(475.0, 475.0));
    }

    #[test]
    fn test_remainder_is_split_evenly() {
        // 530 mod 50 = 30, so everything shifts right by 15.
        let xs = axis_positions(530.0, 50.0);
        assert_eq!(xs.len(), 10);
        assert_eq!(xs[0], 40.0);
        assert_eq!(*xs.last().unwrap(), 490.0);
        let left_margin = xs[0] - 25.0;
        let right_margin = 530.0 - xs.last().unwrap() - 25.0;
        assert_eq!(left_margin, right_margin);
    }

    #[test]
    fn test_column_count_matches_loop_bounds() {
        for width in [0.0_f32, 10.0, 49.0, 50.0, 51.0, 99.0, 100.0, 777.0, 1280.0] {
            let xs = axis_positions(width, 50.0);
            assert_eq!(xs.len(), (width / 50.0).floor() as usize, "width {width}");
            assert!(xs.iter().all(|&x| x < width));
        }
    }

    #[test]
    fn test_degenerate_viewports_are_empty() {
        assert!(ArrowGrid::new(0.0, 0.0, 50.0).is_empty());
        assert!(ArrowGrid::new(40.0, 500.0, 50.0).is_empty());
        assert!(ArrowGrid::new(500.0, 500.0, 0.0).is_empty());
        assert!(ArrowGrid::new(500.0, 500.0, -5.0).is_empty());
        assert!(ArrowGrid::new(f32::NAN, 500.0, 50.0).is_empty());
    }

    #[test]
    fn test_tiny_spacing_is_rejected() {
        assert!(axis_positions(1280.0, 5e-5).is_empty());
        assert!(axis_positions(1280.0, MIN_SPACING * 0.5).is_empty());
        assert!(ArrowGrid::new(1280.0, 720.0, 1e-6).is_empty());
    }

    #[test]
    fn test_minimum_spacing_fills_the_axis() {
        let xs = axis_positions(1280.0, MIN_SPACING);
        assert_eq!(xs.len(), 1280);
        assert_eq!(xs[0], 0.5);
        assert_eq!(*xs.last().unwrap(), 1279.5);
        assert!(xs.windows(2).all(|w| w[1] - w[0] == 1.0));
    }

    #[test]
    fn test_reset_zeroes_angles() {
        let mut grid = ArrowGrid::new(300.0, 300.0, 50.0);
        for cell in &mut grid.cells {
            cell.current_angle = 1.0;
        }
        grid.reset(400.0, 200.0, 50.0);
        assert_eq!(grid.columns, 8);
        assert_eq!(grid.rows, 4);
        assert!(grid.cells.iter().all(|c| c.current_angle == 0.0));
    }
}
