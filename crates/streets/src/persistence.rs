//! Save snapshot of the player's progress and its JSON file format.
//!
//! Only player-owned state is saved. The world itself is regenerated from
//! the config seed, so NPCs, vehicles and projectiles are never persisted.

use std::fmt::Display;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use engine::Vec2;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::sim::entities::{LifeState, Player, PlayerContext, ARMOR_CAP_PERCENT};
use crate::sim::types::{DrugKind, Weapon};

pub const SAVE_VERSION: u32 = 1;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedWeapons {
    pub pistol: bool,
    pub shotgun: bool,
    pub uzi: bool,
    pub rifle: bool,
    pub rocket_launcher: bool,
}

impl SavedWeapons {
    fn slot(&self, weapon: Weapon) -> bool {
        match weapon {
            Weapon::Pistol => self.pistol,
            Weapon::Shotgun => self.shotgun,
            Weapon::Uzi => self.uzi,
            Weapon::Rifle => self.rifle,
            Weapon::RocketLauncher => self.rocket_launcher,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedDrugs {
    pub crack: u32,
    pub weed: u32,
    pub meth: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaveSnapshot {
    pub save_version: u32,
    pub cash: u32,
    pub health: i32,
    pub max_health: i32,
    pub ammo: u32,
    pub rockets: u32,
    pub weapons: SavedWeapons,
    pub armor_percent: u32,
    pub damage_multiplier: f32,
    pub speed_bonus: f32,
    pub drugs: SavedDrugs,
    pub kills: u32,
    pub total_earned: u32,
    pub completed_missions: u32,
    pub position: Vec2,
}

impl SaveSnapshot {
    pub fn capture(player: &Player, completed_missions: u32) -> Self {
        let loadout = &player.loadout;
        Self {
            save_version: SAVE_VERSION,
            cash: player.cash,
            health: player.health(),
            max_health: player.max_health(),
            ammo: loadout.ammo,
            rockets: loadout.rockets,
            weapons: SavedWeapons {
                pistol: loadout.owns(Weapon::Pistol),
                shotgun: loadout.owns(Weapon::Shotgun),
                uzi: loadout.owns(Weapon::Uzi),
                rifle: loadout.owns(Weapon::Rifle),
                rocket_launcher: loadout.owns(Weapon::RocketLauncher),
            },
            armor_percent: player.armor_percent(),
            damage_multiplier: player.damage_multiplier,
            speed_bonus: player.speed_bonus,
            drugs: SavedDrugs {
                crack: player.drugs.count(DrugKind::Crack),
                weed: player.drugs.count(DrugKind::Weed),
                meth: player.drugs.count(DrugKind::Meth),
            },
            kills: player.stats.kills,
            total_earned: player.stats.total_earned,
            completed_missions,
            position: player.body.position,
        }
    }

    /// Overwrites the saved fields on `player` and puts them back on foot.
    /// Position is left to the caller, which clamps it to the current map.
    pub(crate) fn apply_to(&self, player: &mut Player) {
        player.cash = self.cash;
        player.set_max_health(self.max_health);
        player.set_health(self.health.max(1));
        player.loadout.ammo = self.ammo;
        player.loadout.rockets = self.rockets;
        for weapon in Weapon::ALL {
            player.loadout.set_owned(weapon, self.weapons.slot(weapon));
        }
        if !player.loadout.owns(player.loadout.selected) {
            player.loadout.cycle(1);
        }
        player.loadout.cooldown_ticks = 0;
        player.set_armor_percent(self.armor_percent);
        player.damage_multiplier = self.damage_multiplier;
        player.speed_bonus = self.speed_bonus;
        player.drugs.set(DrugKind::Crack, self.drugs.crack);
        player.drugs.set(DrugKind::Weed, self.drugs.weed);
        player.drugs.set(DrugKind::Meth, self.drugs.meth);
        player.stats.kills = self.kills;
        player.stats.total_earned = self.total_earned;
        player.stats.missions_completed = self.completed_missions;
        player.set_wanted(0.0);
        player.context = PlayerContext::FreeRoam;
        player.life = LifeState::Alive;
    }
}

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("read save '{}': {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("write save '{}': {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("encode save json: {0}")]
    Encode(#[source] serde_json::Error),
    #[error("{0}")]
    Decode(String),
    #[error("{0}")]
    Validation(String),
}

pub fn encode_snapshot(snapshot: &SaveSnapshot) -> Result<String, PersistenceError> {
    serde_json::to_string_pretty(snapshot).map_err(PersistenceError::Encode)
}

pub fn decode_snapshot(raw: &str) -> Result<SaveSnapshot, PersistenceError> {
    let mut deserializer = serde_json::Deserializer::from_str(raw);
    match serde_path_to_error::deserialize::<_, SaveSnapshot>(&mut deserializer) {
        Ok(snapshot) => Ok(snapshot),
        Err(error) => {
            let path = error.path().to_string();
            let source = error.into_inner();
            if path.is_empty() || path == "." {
                Err(PersistenceError::Decode(format!("parse save json: {source}")))
            } else {
                Err(PersistenceError::Decode(format!(
                    "parse save json at {path}: {source}"
                )))
            }
        }
    }
}

fn validation_err(path: &str, message: impl Into<String>) -> PersistenceError {
    PersistenceError::Validation(format!("validation failed at {path}: {}", message.into()))
}

fn expected_actual(path: &str, expected: impl Display, actual: impl Display) -> PersistenceError {
    validation_err(path, format!("expected {expected}, got {actual}"))
}

pub fn validate_snapshot(snapshot: &SaveSnapshot) -> Result<(), PersistenceError> {
    if snapshot.save_version != SAVE_VERSION {
        return Err(expected_actual(
            "save_version",
            SAVE_VERSION,
            snapshot.save_version,
        ));
    }
    if snapshot.max_health < 1 {
        return Err(expected_actual(
            "max_health",
            "positive number",
            snapshot.max_health,
        ));
    }
    if snapshot.health < 0 || snapshot.health > snapshot.max_health {
        return Err(expected_actual(
            "health",
            format!("0..={}", snapshot.max_health),
            snapshot.health,
        ));
    }
    if !snapshot.position.x.is_finite() {
        return Err(expected_actual(
            "position.x",
            "finite number",
            snapshot.position.x,
        ));
    }
    if !snapshot.position.y.is_finite() {
        return Err(expected_actual(
            "position.y",
            "finite number",
            snapshot.position.y,
        ));
    }
    if !(snapshot.damage_multiplier.is_finite() && snapshot.damage_multiplier > 0.0) {
        return Err(expected_actual(
            "damage_multiplier",
            "positive finite number",
            snapshot.damage_multiplier,
        ));
    }
    if !(snapshot.speed_bonus.is_finite() && snapshot.speed_bonus >= 0.0) {
        return Err(expected_actual(
            "speed_bonus",
            "non-negative finite number",
            snapshot.speed_bonus,
        ));
    }
    if snapshot.armor_percent > ARMOR_CAP_PERCENT {
        return Err(validation_err(
            "armor_percent",
            format!(
                "{} exceeds the {}% cap",
                snapshot.armor_percent,
                ARMOR_CAP_PERCENT
            ),
        ));
    }
    Ok(())
}

/// Writes through a sibling temp file so a crash never leaves a torn save.
pub fn write_snapshot(path: &Path, snapshot: &SaveSnapshot) -> Result<(), PersistenceError> {
    let json = encode_snapshot(snapshot)?;
    let write_error = |source| PersistenceError::Write {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(write_error)?;
    }
    let tmp_path = temp_path_for(path);
    fs::write(&tmp_path, json).map_err(write_error)?;
    if let Err(source) = fs::rename(&tmp_path, path) {
        let _ = fs::remove_file(&tmp_path);
        return Err(write_error(source));
    }
    info!(path = %path.display(), cash = snapshot.cash, "save_file_written");
    Ok(())
}

fn temp_path_for(path: &Path) -> PathBuf {
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("save.json");
    let tmp_name = format!("{file_name}.tmp");
    match path.parent() {
        Some(parent) => parent.join(tmp_name),
        None => PathBuf::from(tmp_name),
    }
}

pub fn read_snapshot(path: &Path) -> Result<SaveSnapshot, PersistenceError> {
    let raw = fs::read_to_string(path).map_err(|source| PersistenceError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let snapshot = decode_snapshot(&raw)?;
    validate_snapshot(&snapshot)?;
    Ok(snapshot)
}
