//! Overlapping square area partition of the play field.

use serde::{Deserialize, Serialize};

use crate::Rect;

/// One square area of the partition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Area {
    pub id: u32,
    pub bounds: Rect,
}

/// Squares of side `size` laid on a grid of stride `size / 2`, so every
/// interior point belongs to up to four areas. Ids are row-major from 0.
#[derive(Debug, Clone)]
pub struct AreaGrid {
    size: i32,
    stride: i32,
    columns: i32,
    rows: i32,
    areas: Vec<Area>,
}

impl AreaGrid {
    /// Covers a `world_width` × `world_height` field with areas of side
    /// `size` (clamped to at least 2 so the stride is never zero).
    pub fn cover(world_width: i32, world_height: i32, size: i32) -> Self {
        let size = size.max(2);
        let stride = size / 2;
        let columns = count_origins(world_width, stride);
        let rows = count_origins(world_height, stride);

        let mut areas = Vec::with_capacity((columns * rows) as usize);
        for row in 0..rows {
            for column in 0..columns {
                areas.push(Area {
                    id: (row * columns + column) as u32,
                    bounds: Rect::new(column * stride, row * stride, size, size),
                });
            }
        }

        Self {
            size,
            stride,
            columns,
            rows,
            areas,
        }
    }

    pub fn areas(&self) -> &[Area] {
        &self.areas
    }

    pub fn size(&self) -> i32 {
        self.size
    }

    /// Ids of every area whose square strictly overlaps `rect`, ascending.
    pub fn areas_overlapping(&self, rect: &Rect) -> Vec<u32> {
        let Some((c0, c1)) = self.index_span(rect.x, rect.width, self.columns) else {
            return Vec::new();
        };
        let Some((r0, r1)) = self.index_span(rect.y, rect.height, self.rows) else {
            return Vec::new();
        };

        let mut ids = Vec::with_capacity(((c1 - c0 + 1) * (r1 - r0 + 1)) as usize);
        for row in r0..=r1 {
            for column in c0..=c1 {
                ids.push((row * self.columns + column) as u32);
            }
        }
        ids
    }

    /// Range of grid indices `i` with `[i*stride, i*stride+size)` overlapping
    /// `[start, start+len)` on one axis.
    fn index_span(&self, start: i32, len: i32, count: i32) -> Option<(i32, i32)> {
        if len <= 0 || count == 0 {
            return None;
        }
        let first = ((start - self.size).div_euclid(self.stride) + 1).max(0);
        let last = (start + len - 1).div_euclid(self.stride).min(count - 1);
        (first <= last).then_some((first, last))
    }
}

fn count_origins(extent: i32, stride: i32) -> i32 {
    if extent <= 0 {
        return 0;
    }
    (extent + stride - 1) / stride
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cover_lays_half_overlapping_squares() {
        let grid = AreaGrid::cover(256, 128, 128);
        // stride 64 → 4 columns × 2 rows
        assert_eq!(grid.areas().len(), 8);
        assert_eq!(grid.areas()[1].bounds, Rect::new(64, 0, 128, 128));
        assert_eq!(grid.areas()[4].bounds, Rect::new(0, 64, 128, 128));
    }

    #[test]
    fn test_areas_overlapping_matches_brute_force() {
        let grid = AreaGrid::cover(640, 480, 160);
        let probes = [
            Rect::new(0, 0, 32, 32),
            Rect::new(70, 90, 10, 200),
            Rect::new(160, 160, 1, 1),
            Rect::new(600, 450, 64, 64),
            Rect::new(0, 0, 640, 480),
        ];
        for probe in probes {
            let expected: Vec<u32> = grid
                .areas()
                .iter()
                .filter(|a| a.bounds.intersects(&probe))
                .map(|a| a.id)
                .collect();
            assert_eq!(grid.areas_overlapping(&probe), expected, "probe {probe:?}");
        }
    }

    #[test]
    fn test_areas_overlapping_edge_touch_is_excluded() {
        let grid = AreaGrid::cover(256, 256, 128);
        // Area 0 spans [0,128); a rect starting at 128 only touches it.
        let ids = grid.areas_overlapping(&Rect::new(128, 0, 10, 10));
        assert!(!ids.contains(&0));
        assert!(ids.contains(&1));
    }
}
