use std::iter::FusedIterator;
use std::num::NonZeroU32;

use crate::geometry::{ScreenPoint, ScreenSize};

/// Half-open pixel rectangle, `min` inclusive, `max` exclusive.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ScreenBlock {
    pub min: ScreenPoint,
    pub max: ScreenPoint,
}

impl ScreenBlock {
    pub fn new(min: ScreenPoint, max: ScreenPoint) -> ScreenBlock {
        ScreenBlock { min, max }
    }

    pub fn from_size(size: ScreenSize) -> ScreenBlock {
        ScreenBlock {
            min: ScreenPoint::new(0, 0),
            max: ScreenPoint::new(size.x, size.y),
        }
    }

    pub fn width(&self) -> u32 {
        self.max.x.saturating_sub(self.min.x)
    }

    pub fn height(&self) -> u32 {
        self.max.y.saturating_sub(self.min.y)
    }

    pub fn area(&self) -> u32 {
        self.width() * self.height()
    }

    pub fn is_empty(&self) -> bool {
        self.area() == 0
    }

    /// Iterates over pixel coordinates inside the block in row-major order
    /// (x changes first, then y).
    pub fn internal_points(&self) -> InternalPoints {
        if self.is_empty() {
            InternalPoints::empty()
        } else {
            InternalPoints {
                min_x: self.min.x,
                max: self.max,
                cursor: self.min,
            }
        }
    }

    /// Splits the block into tiles of at most `tile_size` pixels per side,
    /// in row-major order. Tiles on the right and bottom edge may be clipped.
    /// Tiles are disjoint and together cover the block exactly.
    pub fn tiles(&self, tile_size: NonZeroU32) -> Vec<ScreenBlock> {
        let step = tile_size.get();
        let mut out = Vec::new();
        let mut y = self.min.y;
        while y < self.max.y {
            let y_end = self.max.y.min(y.saturating_add(step));
            let mut x = self.min.x;
            while x < self.max.x {
                let x_end = self.max.x.min(x.saturating_add(step));
                out.push(ScreenBlock::new(
                    ScreenPoint::new(x, y),
                    ScreenPoint::new(x_end, y_end),
                ));
                x = x_end;
            }
            y = y_end;
        }
        out
    }
}

#[derive(Copy, Clone, Debug)]
pub struct InternalPoints {
    min_x: u32,
    max: ScreenPoint,
    cursor: ScreenPoint,
}

impl InternalPoints {
    fn empty() -> InternalPoints {
        InternalPoints {
            min_x: 1,
            max: ScreenPoint::new(0, 0),
            cursor: ScreenPoint::new(0, 0),
        }
    }
}

impl Iterator for InternalPoints {
    type Item = ScreenPoint;

    fn next(&mut self) -> Option<ScreenPoint> {
        if self.cursor.y >= self.max.y {
            return None;
        }

        let ret = self.cursor;

        self.cursor.x += 1;
        if self.cursor.x >= self.max.x {
            self.cursor.x = self.min_x;
            self.cursor.y += 1;
        }

        Some(ret)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let len = self.len();
        (len, Some(len))
    }
}

impl ExactSizeIterator for InternalPoints {
    fn len(&self) -> usize {
        if self.cursor.y >= self.max.y {
            0
        } else {
            let current_row = (self.max.x - self.cursor.x) as usize;
            let whole_rows = (self.max.y - self.cursor.y - 1) as usize;
            current_row + whole_rows * (self.max.x - self.min_x) as usize
        }
    }
}

impl FusedIterator for InternalPoints {}
