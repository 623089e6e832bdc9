use engine::{Rect, Vec2};
use rand::Rng;

use crate::config::WorldConfig;

use super::types::VenueKind;

pub const VENUE_INTERACTION_RADIUS: f32 = 80.0;

#[derive(Debug, Clone, PartialEq)]
pub struct Venue {
    pub kind: VenueKind,
    pub footprint: Rect,
}

impl Venue {
    pub fn center(&self) -> Vec2 {
        self.footprint.center()
    }
}

/// Static solid rectangles plus tagged venues. Built once, never mutated.
///
/// Occupancy queries go through a uniform grid of building indices; a query
/// only tests the buildings bucketed in the cells its rectangle touches.
#[derive(Debug, Clone)]
pub struct WorldGeometry {
    bounds: Rect,
    cell_size: f32,
    columns: usize,
    rows: usize,
    buildings: Vec<Rect>,
    venues: Vec<Venue>,
    cells: Vec<Vec<usize>>,
}

impl WorldGeometry {
    pub fn new(
        width: f32,
        height: f32,
        cell_size: f32,
        buildings: Vec<Rect>,
        venues: Vec<Venue>,
    ) -> Self {
        let cell_size = if cell_size.is_finite() && cell_size > 0.0 {
            cell_size
        } else {
            64.0
        };
        let columns = ((width / cell_size).ceil() as usize).max(1);
        let rows = ((height / cell_size).ceil() as usize).max(1);
        let mut geometry = Self {
            bounds: Rect::new(0.0, 0.0, width, height),
            cell_size,
            columns,
            rows,
            buildings,
            venues,
            cells: vec![Vec::new(); columns * rows],
        };
        for (index, building) in geometry.buildings.iter().enumerate() {
            let (col_min, col_max, row_min, row_max) = geometry.cell_range(building);
            for row in row_min..=row_max {
                for col in col_min..=col_max {
                    geometry.cells[row * columns + col].push(index);
                }
            }
        }
        geometry
    }

    /// A map with no buildings.
    pub fn open(width: f32, height: f32) -> Self {
        Self::new(width, height, 64.0, Vec::new(), Vec::new())
    }

    pub fn generate(config: &WorldConfig, rng: &mut impl Rng) -> Self {
        let tile = config.tile_size;
        let mut buildings = Vec::new();
        let mut venues = Vec::new();

        for tile_x in 0..config.map_width_tiles {
            for tile_y in 0..config.map_height_tiles {
                // Both draws happen for every tile so the layout is independent of the clearing.
                let is_building = rng.gen_bool(config.building_density);
                let venue_roll = rng.gen_range(1..=6u8);
                if !is_building {
                    continue;
                }
                let footprint = Rect::new(tile_x as f32 * tile, tile_y as f32 * tile, tile, tile);
                if footprint.center().distance(config.player_spawn) < config.spawn_clearing_radius
                {
                    continue;
                }
                buildings.push(footprint);
                if let Some(kind) = venue_kind_for_roll(venue_roll) {
                    venues.push(Venue { kind, footprint });
                }
            }
        }

        Self::new(
            config.width_units(),
            config.height_units(),
            tile,
            buildings,
            venues,
        )
    }

    pub fn bounds(&self) -> Rect {
        self.bounds
    }

    pub fn buildings(&self) -> &[Rect] {
        &self.buildings
    }

    pub fn venues(&self) -> &[Venue] {
        &self.venues
    }

    pub fn rect_blocked(&self, rect: &Rect) -> bool {
        let (col_min, col_max, row_min, row_max) = self.cell_range(rect);
        for row in row_min..=row_max {
            for col in col_min..=col_max {
                let hit = self.cells[row * self.columns + col]
                    .iter()
                    .any(|index| self.buildings[*index].intersects(rect));
                if hit {
                    return true;
                }
            }
        }
        false
    }

    pub fn point_blocked(&self, point: Vec2) -> bool {
        let probe = Rect::new(point.x, point.y, 0.0, 0.0);
        let (col, _, row, _) = self.cell_range(&probe);
        self.cells[row * self.columns + col]
            .iter()
            .any(|index| self.buildings[*index].contains_point(point))
    }

    /// Top-left position moved so a body of `size` lies inside the bounds.
    pub fn clamp_position(&self, position: Vec2, size: Vec2) -> Vec2 {
        let max_x = (self.bounds.right() - size.x).max(self.bounds.x);
        let max_y = (self.bounds.bottom() - size.y).max(self.bounds.y);
        Vec2::new(
            position.x.clamp(self.bounds.x, max_x),
            position.y.clamp(self.bounds.y, max_y),
        )
    }

    pub fn venue_near(&self, point: Vec2, radius: f32) -> Option<&Venue> {
        self.venues
            .iter()
            .map(|venue| (venue.center().distance(point), venue))
            .filter(|(distance, _)| *distance < radius)
            .min_by(|a, b| a.0.total_cmp(&b.0))
            .map(|(_, venue)| venue)
    }

    fn cell_range(&self, rect: &Rect) -> (usize, usize, usize, usize) {
        let col = |x: f32| ((x / self.cell_size).floor().max(0.0) as usize).min(self.columns - 1);
        let row = |y: f32| ((y / self.cell_size).floor().max(0.0) as usize).min(self.rows - 1);
        (col(rect.x), col(rect.right()), row(rect.y), row(rect.bottom()))
    }

    #[cfg(test)]
    pub(crate) fn rect_blocked_linear(&self, rect: &Rect) -> bool {
        self.buildings.iter().any(|building| building.intersects(rect))
    }
}

fn venue_kind_for_roll(roll: u8) -> Option<VenueKind> {
    match roll {
        2 => Some(VenueKind::CraftingLab),
        3 => Some(VenueKind::Club),
        4 => Some(VenueKind::WeaponShop),
        5 => Some(VenueKind::UpgradeShop),
        6 => Some(VenueKind::SafeHouse),
        _ => None,
    }
}
