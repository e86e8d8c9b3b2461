//! Grid coordinates for the crowd model.

use serde::{Deserialize, Serialize};

/// A cell on the crowd grid. `(0, 0)` is the residential corner.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub struct GridPos {
    /// Column, `0..width`.
    pub x: u32,
    /// Row, `0..height`.
    pub y: u32,
}

impl GridPos {
    /// Create a coordinate.
    pub const fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }

    /// Manhattan distance to another cell.
    pub const fn manhattan(self, other: Self) -> u32 {
        self.x.abs_diff(other.x).saturating_add(self.y.abs_diff(other.y))
    }
}

impl core::fmt::Display for GridPos {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manhattan_is_symmetric() {
        let a = GridPos::new(2, 9);
        let b = GridPos::new(7, 3);
        assert_eq!(a.manhattan(b), 11);
        assert_eq!(b.manhattan(a), 11);
        assert_eq!(a.manhattan(a), 0);
    }
}
