//! The city grid and its location map.
//!
//! The grid is a bounded `width x height` rectangle with `(0, 0)` in the
//! residential corner. A sparse map assigns food vendors and social spots;
//! every other cell is a street.
//!
//! # Invariants
//!
//! - Every assigned cell lies inside the grid.
//! - A cell has at most one location type; vendors are placed first and
//!   social spots never overwrite them.

use std::collections::{BTreeMap, BTreeSet};

use rand::Rng;
use worldsim_types::{GridPos, LocationType};

use crate::error::CrowdError;

/// Minimum number of food vendors on any grid.
pub const MIN_FOOD_VENDORS: u64 = 5;

/// One food vendor per this many cells beyond the minimum.
pub const CELLS_PER_FOOD_VENDOR: u64 = 200;

/// Minimum number of social spots on any grid.
pub const MIN_SOCIAL_SPOTS: u64 = 3;

/// One social spot per this many cells beyond the minimum.
pub const CELLS_PER_SOCIAL_SPOT: u64 = 500;

/// A bounded grid with typed locations.
#[derive(Debug, Clone)]
pub struct CityGrid {
    width: u32,
    height: u32,
    locations: BTreeMap<GridPos, LocationType>,
    /// Vendor cells in placement order; nearest-vendor ties resolve to the
    /// earliest placed.
    vendors: Vec<GridPos>,
}

impl CityGrid {
    /// Build a grid and place vendors and social spots using `rng`.
    pub fn generate(width: u32, height: u32, rng: &mut impl Rng) -> Result<Self, CrowdError> {
        if width == 0 || height == 0 {
            return Err(CrowdError::EmptyGrid { width, height });
        }

        let mut grid = Self {
            width,
            height,
            locations: BTreeMap::new(),
            vendors: Vec::new(),
        };

        let cells = grid.cell_count();
        let vendor_target = cells
            .checked_div(CELLS_PER_FOOD_VENDOR)
            .unwrap_or(0)
            .max(MIN_FOOD_VENDORS);
        let social_target = cells
            .checked_div(CELLS_PER_SOCIAL_SPOT)
            .unwrap_or(0)
            .max(MIN_SOCIAL_SPOTS);

        for pos in grid.draw_free_cells(vendor_target, rng) {
            grid.locations.insert(pos, LocationType::FoodVendor);
            grid.vendors.push(pos);
        }
        for pos in grid.draw_free_cells(social_target, rng) {
            grid.locations.insert(pos, LocationType::SocialSpot);
        }

        Ok(grid)
    }

    /// Grid width in cells.
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Grid height in cells.
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// Total number of cells.
    pub fn cell_count(&self) -> u64 {
        u64::from(self.width).saturating_mul(u64::from(self.height))
    }

    /// Whether `pos` lies on the grid.
    pub const fn contains(&self, pos: GridPos) -> bool {
        pos.x < self.width && pos.y < self.height
    }

    /// Location type of a cell; unassigned cells are streets.
    pub fn location_type(&self, pos: GridPos) -> LocationType {
        self.locations.get(&pos).copied().unwrap_or_default()
    }

    /// Every food vendor, in placement order.
    pub fn food_vendors(&self) -> &[GridPos] {
        &self.vendors
    }

    /// Number of cells of the given type.
    pub fn count_of(&self, kind: LocationType) -> usize {
        self.locations.values().filter(|k| **k == kind).count()
    }

    /// The vendor closest to `pos` by Manhattan distance.
    pub fn nearest_food_vendor(&self, pos: GridPos) -> Option<GridPos> {
        self.vendors
            .iter()
            .copied()
            .min_by_key(|vendor| vendor.manhattan(pos))
    }

    /// In-bounds cells of the 8-neighborhood of `pos`, excluding `pos`.
    pub fn neighbors(&self, pos: GridPos) -> Vec<GridPos> {
        let xs = [pos.x.checked_sub(1), Some(pos.x), pos.x.checked_add(1)];
        let ys = [pos.y.checked_sub(1), Some(pos.y), pos.y.checked_add(1)];

        let mut out = Vec::with_capacity(8);
        for x in xs.into_iter().flatten() {
            for y in ys.into_iter().flatten() {
                let candidate = GridPos::new(x, y);
                if candidate != pos && self.contains(candidate) {
                    out.push(candidate);
                }
            }
        }
        out
    }

    /// A uniformly random cell.
    pub fn random_cell(&self, rng: &mut impl Rng) -> GridPos {
        GridPos::new(
            rng.random_range(0..self.width),
            rng.random_range(0..self.height),
        )
    }

    /// A random cell in the residential quarter (`x <= width/4`,
    /// `y <= height/4`), clipped to the grid.
    pub fn random_residential_cell(&self, rng: &mut impl Rng) -> GridPos {
        let max_x = self.width.checked_div(4).unwrap_or(0).min(self.width.saturating_sub(1));
        let max_y = self
            .height
            .checked_div(4)
            .unwrap_or(0)
            .min(self.height.saturating_sub(1));
        GridPos::new(rng.random_range(0..=max_x), rng.random_range(0..=max_y))
    }

    /// Draw up to `target` distinct unassigned cells.
    fn draw_free_cells(&self, target: u64, rng: &mut impl Rng) -> Vec<GridPos> {
        let assigned = u64::try_from(self.locations.len()).unwrap_or(u64::MAX);
        let free = self.cell_count().saturating_sub(assigned);
        let target = target.min(free);
        let wanted = usize::try_from(target).unwrap_or(usize::MAX);

        // Rejection sampling needs a comfortable margin of free cells; small
        // grids are enumerated instead.
        if target.saturating_mul(2) > free {
            let mut candidates: Vec<GridPos> = (0..self.width)
                .flat_map(|x| (0..self.height).map(move |y| GridPos::new(x, y)))
                .filter(|pos| !self.locations.contains_key(pos))
                .collect();
            let mut picked = Vec::with_capacity(wanted);
            while picked.len() < wanted && !candidates.is_empty() {
                let index = rng.random_range(0..candidates.len());
                picked.push(candidates.swap_remove(index));
            }
            return picked;
        }

        let mut picked: Vec<GridPos> = Vec::with_capacity(wanted);
        let mut seen = BTreeSet::new();
        while picked.len() < wanted {
            let pos = self.random_cell(rng);
            if !self.locations.contains_key(&pos) && seen.insert(pos) {
                picked.push(pos);
            }
        }
        picked
    }
}

/// One step from `from` toward `to`, along x first and along y only once x
/// is aligned. Returns `from` when already there.
pub const fn step_toward(from: GridPos, to: GridPos) -> GridPos {
    if to.x > from.x {
        GridPos::new(from.x.saturating_add(1), from.y)
    } else if to.x < from.x {
        GridPos::new(from.x.saturating_sub(1), from.y)
    } else if to.y > from.y {
        GridPos::new(from.x, from.y.saturating_add(1))
    } else if to.y < from.y {
        GridPos::new(from.x, from.y.saturating_sub(1))
    } else {
        from
    }
}
