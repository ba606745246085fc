//! Wall compaction: turns a grid of solid tiles into rectangles.
//!
//! Each row is split into maximal horizontal runs. Scanning rows top to
//! bottom and runs left to right, an unclaimed run grows downward for as
//! long as the next row holds an unclaimed run with the same start and
//! width. Every run is claimed exactly once, so the rectangles never
//! overlap and their union is exactly the solid set.

/// A boolean solidity grid in tile units, row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SolidGrid {
    width: usize,
    height: usize,
    cells: Vec<bool>,
}

impl SolidGrid {
    /// An all-empty grid.
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            cells: vec![false; width * height],
        }
    }

    /// Builds a grid by evaluating `solid(x, y)` for every cell.
    pub fn from_fn(width: usize, height: usize, mut solid: impl FnMut(usize, usize) -> bool) -> Self {
        let mut cells = Vec::with_capacity(width * height);
        for y in 0..height {
            for x in 0..width {
                cells.push(solid(x, y));
            }
        }
        Self {
            width,
            height,
            cells,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn is_solid(&self, x: usize, y: usize) -> bool {
        x < self.width && y < self.height && self.cells[y * self.width + x]
    }

    pub fn set(&mut self, x: usize, y: usize, solid: bool) {
        if x < self.width && y < self.height {
            self.cells[y * self.width + x] = solid;
        }
    }

    pub fn solid_count(&self) -> usize {
        self.cells.iter().filter(|c| **c).count()
    }
}

/// A rectangle in tile units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TileRect {
    pub x: usize,
    pub y: usize,
    pub width: usize,
    pub height: usize,
}

#[derive(Debug, Clone, Copy)]
struct Run {
    start: usize,
    len: usize,
    claimed: bool,
}

fn row_runs(grid: &SolidGrid, y: usize) -> Vec<Run> {
    let mut runs = Vec::new();
    let mut x = 0;
    while x < grid.width {
        if !grid.is_solid(x, y) {
            x += 1;
            continue;
        }
        let start = x;
        while x < grid.width && grid.is_solid(x, y) {
            x += 1;
        }
        runs.push(Run {
            start,
            len: x - start,
            claimed: false,
        });
    }
    runs
}

/// Compacts the solid cells of `grid` into non-overlapping rectangles.
///
/// Output order is row-major by top-left corner, which makes it
/// deterministic for a given grid.
pub fn compact(grid: &SolidGrid) -> Vec<TileRect> {
    let mut rows: Vec<Vec<Run>> = (0..grid.height).map(|y| row_runs(grid, y)).collect();
    let mut rects = Vec::new();

    for y in 0..rows.len() {
        for i in 0..rows[y].len() {
            let run = rows[y][i];
            if run.claimed {
                continue;
            }
            rows[y][i].claimed = true;

            let mut height = 1;
            for below in rows.iter_mut().skip(y + 1) {
                // Runs within a row are disjoint, so at most one starts here.
                let Some(next) = below.iter_mut().find(|r| r.start == run.start) else {
                    break;
                };
                if next.len != run.len || next.claimed {
                    break;
                }
                next.claimed = true;
                height += 1;
            }

            rects.push(TileRect {
                x: run.start,
                y,
                width: run.len,
                height,
            });
        }
    }

    rects
}

/// Paints `rects` onto an empty grid. The inverse of [`compact`].
pub fn rasterize(rects: &[TileRect], width: usize, height: usize) -> SolidGrid {
    let mut grid = SolidGrid::new(width, height);
    for r in rects {
        for y in r.y..r.y + r.height {
            for x in r.x..r.x + r.width {
                grid.set(x, y, true);
            }
        }
    }
    grid
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid(rows: &[&str]) -> SolidGrid {
        let height = rows.len();
        let width = rows.first().map_or(0, |r| r.len());
        SolidGrid::from_fn(width, height, |x, y| rows[y].as_bytes()[x] == b'#')
    }

    #[test]
    fn test_compact_empty_grid_returns_nothing() {
        assert!(compact(&SolidGrid::new(4, 4)).is_empty());
    }

    #[test]
    fn test_compact_merges_identical_runs_vertically() {
        let g = grid(&["##..", "##..", "...."]);
        assert_eq!(
            compact(&g),
            vec![TileRect {
                x: 0,
                y: 0,
                width: 2,
                height: 2
            }]
        );
    }

    #[test]
    fn test_compact_stops_at_width_change() {
        let g = grid(&["###", "##.", "##."]);
        let rects = compact(&g);
        assert_eq!(rects.len(), 2);
        assert_eq!(
            rects[0],
            TileRect {
                x: 0,
                y: 0,
                width: 3,
                height: 1
            }
        );
        assert_eq!(
            rects[1],
            TileRect {
                x: 0,
                y: 1,
                width: 2,
                height: 2
            }
        );
    }

    #[test]
    fn test_compact_room_outline_rasterizes_back_exactly() {
        let g = grid(&[
            "##########",
            "#........#",
            "#..##....#",
            "#..##..#.#",
            "#......#.#",
            "##########",
        ]);
        let rects = compact(&g);
        assert_eq!(rasterize(&rects, g.width(), g.height()), g);
        let area: usize = rects.iter().map(|r| r.width * r.height).sum();
        assert_eq!(area, g.solid_count());
    }
}
