use std::env;
use std::fs;
use std::path::PathBuf;

use engine::Vec2;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

pub const CONFIG_ENV_VAR: &str = "STREETS_CONFIG";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    pub world_seed: u64,
    /// Runtime randomness; drawn from entropy when absent.
    pub gameplay_seed: Option<u64>,
    pub world: WorldConfig,
    pub population: PopulationConfig,
    pub thresholds: WantedThresholds,
    pub win_goal: u32,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            world_seed: 42,
            gameplay_seed: None,
            world: WorldConfig::default(),
            population: PopulationConfig::default(),
            thresholds: WantedThresholds::default(),
            win_goal: 10_000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    pub map_width_tiles: u32,
    pub map_height_tiles: u32,
    pub tile_size: f32,
    pub building_density: f64,
    pub player_spawn: Vec2,
    /// No building is placed within this distance of the spawn point.
    pub spawn_clearing_radius: f32,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            map_width_tiles: 80,
            map_height_tiles: 80,
            tile_size: 64.0,
            building_density: 0.06,
            player_spawn: Vec2::new(200.0, 200.0),
            spawn_clearing_radius: 160.0,
        }
    }
}

impl WorldConfig {
    pub fn width_units(&self) -> f32 {
        self.map_width_tiles as f32 * self.tile_size
    }

    pub fn height_units(&self) -> f32 {
        self.map_height_tiles as f32 * self.tile_size
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PopulationConfig {
    pub initial_cops: u32,
    pub initial_civilians: u32,
    pub initial_dealers: u32,
    pub initial_vehicles: u32,
    pub initial_police_cars: u32,
    pub initial_crew: u32,
    pub gang_members_min: u32,
    pub gang_members_max: u32,
    pub min_cops_base: u32,
    pub min_cops_per_wanted: f32,
    pub min_civilians: u32,
    pub min_gang_members_per_gang: u32,
    pub min_vehicles: u32,
    pub min_dealers: u32,
    pub spawn_min_distance: f32,
    pub cop_spawn_min_distance: f32,
    pub cop_spawn_max_distance: f32,
    pub max_health_pickups: u32,
    pub health_pickup_chance: f64,
}

impl Default for PopulationConfig {
    fn default() -> Self {
        Self {
            initial_cops: 8,
            initial_civilians: 30,
            initial_dealers: 12,
            initial_vehicles: 15,
            initial_police_cars: 4,
            initial_crew: 2,
            gang_members_min: 6,
            gang_members_max: 10,
            min_cops_base: 5,
            min_cops_per_wanted: 2.0,
            min_civilians: 20,
            min_gang_members_per_gang: 3,
            min_vehicles: 8,
            min_dealers: 6,
            spawn_min_distance: 600.0,
            cop_spawn_min_distance: 800.0,
            cop_spawn_max_distance: 1200.0,
            max_health_pickups: 5,
            health_pickup_chance: 0.002,
        }
    }
}

impl PopulationConfig {
    /// No initial population and no top-ups.
    pub fn empty() -> Self {
        Self {
            initial_cops: 0,
            initial_civilians: 0,
            initial_dealers: 0,
            initial_vehicles: 0,
            initial_police_cars: 0,
            initial_crew: 0,
            gang_members_min: 0,
            gang_members_max: 0,
            min_cops_base: 0,
            min_cops_per_wanted: 0.0,
            min_civilians: 0,
            min_gang_members_per_gang: 0,
            min_vehicles: 0,
            min_dealers: 0,
            max_health_pickups: 0,
            health_pickup_chance: 0.0,
            ..Self::default()
        }
    }

    pub fn cop_floor(&self, wanted: f32) -> usize {
        (self.min_cops_base as f32 + wanted * self.min_cops_per_wanted).max(0.0) as usize
    }
}

/// Each wanted-level gate is tuned independently.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WantedThresholds {
    pub cop_engage: f32,
    pub cop_proximity: f32,
    pub cop_proximity_radius: f32,
    pub civilian_scare: f32,
    pub police_car_chase_on_foot: f32,
    pub police_car_chase_in_vehicle: f32,
    pub survive_mission: f32,
    pub cop_spawn_alert: f32,
    pub decay_per_tick: f32,
}

impl Default for WantedThresholds {
    fn default() -> Self {
        Self {
            cop_engage: 2.0,
            cop_proximity: 1.0,
            cop_proximity_radius: 200.0,
            civilian_scare: 1.0,
            police_car_chase_on_foot: 3.0,
            police_car_chase_in_vehicle: 2.0,
            survive_mission: 3.0,
            cop_spawn_alert: 2.0,
            decay_per_tick: 0.001,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{0}")]
    Parse(String),
    #[error("invalid config at {field}: {message}")]
    Invalid {
        field: &'static str,
        message: String,
    },
}

/// Reads the file named by `STREETS_CONFIG`, or returns defaults when unset.
pub fn load_config_from_env() -> Result<SimConfig, ConfigError> {
    let Some(raw_path) = env::var_os(CONFIG_ENV_VAR) else {
        return Ok(SimConfig::default());
    };
    let path = PathBuf::from(raw_path);
    let raw = fs::read_to_string(&path).map_err(|source| ConfigError::Read {
        path: path.clone(),
        source,
    })?;
    let config = parse_config_json(&raw)?;
    info!(path = %path.display(), world_seed = config.world_seed, "config_loaded");
    Ok(config)
}

pub fn parse_config_json(raw: &str) -> Result<SimConfig, ConfigError> {
    let mut deserializer = serde_json::Deserializer::from_str(raw);
    let config = match serde_path_to_error::deserialize::<_, SimConfig>(&mut deserializer) {
        Ok(config) => config,
        Err(error) => {
            let path = error.path().to_string();
            let source = error.into_inner();
            return Err(if path.is_empty() || path == "." {
                ConfigError::Parse(format!("parse config json: {source}"))
            } else {
                ConfigError::Parse(format!("parse config json at {path}: {source}"))
            });
        }
    };
    config.validate()?;
    Ok(config)
}

impl SimConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let world = &self.world;
        if world.map_width_tiles == 0 || world.map_height_tiles == 0 {
            return Err(invalid("world.map_*_tiles", "map must be at least one tile"));
        }
        if !(world.tile_size.is_finite() && world.tile_size > 0.0) {
            return Err(invalid(
                "world.tile_size",
                format!("expected positive number, got {}", world.tile_size),
            ));
        }
        if !(0.0..=1.0).contains(&world.building_density) {
            return Err(invalid(
                "world.building_density",
                format!("expected 0..=1, got {}", world.building_density),
            ));
        }
        let spawn = world.player_spawn;
        if !spawn.is_finite()
            || spawn.x < 0.0
            || spawn.y < 0.0
            || spawn.x > world.width_units()
            || spawn.y > world.height_units()
        {
            return Err(invalid(
                "world.player_spawn",
                format!("({}, {}) lies outside the map", spawn.x, spawn.y),
            ));
        }
        let population = &self.population;
        if population.gang_members_min > population.gang_members_max {
            return Err(invalid(
                "population.gang_members_min",
                "must not exceed gang_members_max",
            ));
        }
        if population.cop_spawn_min_distance > population.cop_spawn_max_distance {
            return Err(invalid(
                "population.cop_spawn_min_distance",
                "must not exceed cop_spawn_max_distance",
            ));
        }
        if !(0.0..=1.0).contains(&population.health_pickup_chance) {
            return Err(invalid(
                "population.health_pickup_chance",
                format!("expected 0..=1, got {}", population.health_pickup_chance),
            ));
        }
        if !(self.thresholds.decay_per_tick.is_finite() && self.thresholds.decay_per_tick >= 0.0)
        {
            return Err(invalid(
                "thresholds.decay_per_tick",
                "expected a non-negative number",
            ));
        }
        Ok(())
    }
}

fn invalid(field: &'static str, message: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        field,
        message: message.into(),
    }
}
