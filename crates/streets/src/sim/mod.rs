//! Fixed-step simulation core.
//!
//! One call to [`GameState::tick`] consumes one input snapshot and runs every
//! gameplay system once, in [`GAMEPLAY_SYSTEM_ORDER`]. Structural changes to
//! entity collections are deferred to the final `Cleanup` system, so a system
//! can remove entities while scanning them.

mod ai;
mod combat;
mod effects;
pub mod entities;
pub mod events;
pub mod geometry;
pub mod missions;
pub mod movement;
mod population;
mod rejection;
mod systems;
pub mod types;
mod vehicles;
pub mod venues;

#[cfg(test)]
mod tests;

use engine::{InputSnapshot, Simulation, TickControl};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{debug, info};

use crate::config::{ConfigError, SimConfig};
use crate::persistence::SaveSnapshot;

use entities::{EntityRegistry, LifeState, Player, PlayerContext};
use events::GameplayEventBus;
use geometry::WorldGeometry;
use missions::{MissionCounters, MissionKind, MissionOutcome, MissionTracker};

pub use rejection::ActionRejected;

pub const TICKS_PER_SECOND: u32 = 60;
pub const RESPAWN_TICKS: u32 = 180;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameplaySystemId {
    InputIntent,
    Movement,
    AI,
    CombatResolution,
    Population,
    Missions,
    Interaction,
    Effects,
    Cleanup,
}

impl GameplaySystemId {
    pub fn name(self) -> &'static str {
        match self {
            Self::InputIntent => "InputIntent",
            Self::Movement => "Movement",
            Self::AI => "AI",
            Self::CombatResolution => "CombatResolution",
            Self::Population => "Population",
            Self::Missions => "Missions",
            Self::Interaction => "Interaction",
            Self::Effects => "Effects",
            Self::Cleanup => "Cleanup",
        }
    }

    /// Open-world systems that pause while the player is inside a venue.
    pub fn suspended_inside(self) -> bool {
        matches!(self, Self::AI | Self::CombatResolution | Self::Population)
    }
}

pub const GAMEPLAY_SYSTEM_ORDER: [GameplaySystemId; 9] = [
    GameplaySystemId::InputIntent,
    GameplaySystemId::Movement,
    GameplaySystemId::AI,
    GameplaySystemId::CombatResolution,
    GameplaySystemId::Population,
    GameplaySystemId::Missions,
    GameplaySystemId::Interaction,
    GameplaySystemId::Effects,
    GameplaySystemId::Cleanup,
];

/// Disjoint mutable view of the state handed to each system.
pub(crate) struct SimContext<'a> {
    pub(crate) config: &'a SimConfig,
    pub(crate) geometry: &'a WorldGeometry,
    pub(crate) player: &'a mut Player,
    pub(crate) entities: &'a mut EntityRegistry,
    pub(crate) events: &'a mut GameplayEventBus,
    pub(crate) rng: &'a mut StdRng,
    pub(crate) save_slot: &'a mut Option<SaveSnapshot>,
    pub(crate) completed_missions: u32,
}

pub struct GameState {
    pub(crate) config: SimConfig,
    pub(crate) geometry: WorldGeometry,
    pub(crate) player: Player,
    pub(crate) entities: EntityRegistry,
    pub(crate) missions: MissionTracker,
    pub(crate) events: GameplayEventBus,
    pub(crate) rng: StdRng,
    pub(crate) save_slot: Option<SaveSnapshot>,
    tick_count: u64,
    game_won: bool,
    last_tick_order: Vec<GameplaySystemId>,
}

impl GameState {
    /// Generates the world from `config.world_seed` and populates it.
    pub fn new(config: SimConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let mut world_rng = StdRng::seed_from_u64(config.world_seed);
        let geometry = WorldGeometry::generate(&config.world, &mut world_rng);
        let mut state = Self::assemble(config, geometry);
        state.populate(&mut world_rng);
        info!(
            world_seed = state.config.world_seed,
            buildings = state.geometry.buildings().len(),
            venues = state.geometry.venues().len(),
            entity_count = state.entities.entity_count(),
            "world_generated"
        );
        Ok(state)
    }

    /// Uses caller-supplied geometry; initial population still follows
    /// `config.population`.
    pub fn with_geometry(config: SimConfig, geometry: WorldGeometry) -> Result<Self, ConfigError> {
        config.validate()?;
        let mut world_rng = StdRng::seed_from_u64(config.world_seed);
        let mut state = Self::assemble(config, geometry);
        state.populate(&mut world_rng);
        Ok(state)
    }

    fn assemble(config: SimConfig, geometry: WorldGeometry) -> Self {
        let rng = match config.gameplay_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let player = Player::new(config.world.player_spawn);
        let missions = MissionTracker::new(config.thresholds.survive_mission);
        Self {
            config,
            geometry,
            player,
            entities: EntityRegistry::new(),
            missions,
            events: GameplayEventBus::default(),
            rng,
            save_slot: None,
            tick_count: 0,
            game_won: false,
            last_tick_order: Vec::with_capacity(GAMEPLAY_SYSTEM_ORDER.len()),
        }
    }

    fn populate(&mut self, world_rng: &mut StdRng) {
        population::populate_initial(
            &self.config,
            &self.geometry,
            &mut self.entities,
            self.player.center(),
            world_rng,
        );
        self.entities.apply_pending();
    }

    pub(crate) fn context(&mut self) -> SimContext<'_> {
        SimContext {
            config: &self.config,
            geometry: &self.geometry,
            player: &mut self.player,
            entities: &mut self.entities,
            events: &mut self.events,
            rng: &mut self.rng,
            save_slot: &mut self.save_slot,
            completed_missions: self.missions.completed_count(),
        }
    }

    pub fn tick(&mut self, input: &InputSnapshot) {
        self.events.clear_current_tick();
        self.last_tick_order.clear();
        for system_id in GAMEPLAY_SYSTEM_ORDER {
            if system_id.suspended_inside() && self.player.is_inside() {
                continue;
            }
            self.last_tick_order.push(system_id);
            self.run_system(system_id, input);
        }
        self.events.finish_tick_rollover();
        self.tick_count = self.tick_count.saturating_add(1);
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn geometry(&self) -> &WorldGeometry {
        &self.geometry
    }

    pub fn player(&self) -> &Player {
        &self.player
    }

    pub fn entities(&self) -> &EntityRegistry {
        &self.entities
    }

    pub fn missions(&self) -> &MissionTracker {
        &self.missions
    }

    pub fn events(&self) -> &GameplayEventBus {
        &self.events
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    pub fn game_won(&self) -> bool {
        self.game_won
    }

    /// Latest snapshot written at a safe house, if any.
    pub fn save_slot(&self) -> Option<&SaveSnapshot> {
        self.save_slot.as_ref()
    }

    pub fn last_tick_order(&self) -> &[GameplaySystemId] {
        &self.last_tick_order
    }

    pub fn mission_counters(&self) -> MissionCounters {
        let stats = &self.player.stats;
        MissionCounters {
            kills: stats.kills,
            gang_kills: stats.gang_kills,
            total_earned: stats.total_earned,
            drugs_sold: stats.drugs_sold,
            crew_count: u32::try_from(self.entities.crew.live_count()).unwrap_or(u32::MAX),
            vehicles_stolen: stats.vehicles_stolen,
            vehicles_destroyed: stats.vehicles_destroyed,
            wanted: self.player.wanted(),
        }
    }

    pub fn start_mission(&mut self, index: usize) -> Result<MissionKind, ActionRejected> {
        if !self.player.is_alive() {
            return Err(ActionRejected::PlayerDown);
        }
        let counters = self.mission_counters();
        let mission = self.missions.start(index, &counters)?;
        let kind = mission.kind;
        info!(
            kind = ?kind,
            target = mission.target,
            reward = mission.reward,
            difficulty = mission.difficulty,
            "mission_started"
        );
        self.events.emit(events::GameplayEvent::MissionStarted { kind });
        Ok(kind)
    }

    pub fn abandon_mission(&mut self) -> Result<MissionKind, ActionRejected> {
        let kind = self.missions.abandon()?;
        self.apply_mission_outcome(MissionOutcome::Abandoned { kind });
        Ok(kind)
    }

    pub(crate) fn apply_mission_outcome(&mut self, outcome: MissionOutcome) {
        match outcome {
            MissionOutcome::Completed { kind, reward } => {
                self.player.earn(reward);
                self.player.stats.missions_completed =
                    self.player.stats.missions_completed.saturating_add(1);
                info!(
                    kind = ?kind,
                    reward,
                    completed = self.missions.completed_count(),
                    "mission_completed"
                );
                self.events
                    .emit(events::GameplayEvent::MissionCompleted { kind, reward });
            }
            MissionOutcome::Failed { kind } => {
                info!(kind = ?kind, "mission_failed");
                self.events.emit(events::GameplayEvent::MissionFailed { kind });
            }
            MissionOutcome::Abandoned { kind } => {
                info!(kind = ?kind, "mission_abandoned");
                self.events
                    .emit(events::GameplayEvent::MissionAbandoned { kind });
            }
        }
    }

    pub(crate) fn check_win_condition(&mut self) {
        if self.game_won || self.player.stats.total_earned < self.config.win_goal {
            return;
        }
        self.game_won = true;
        info!(
            total_earned = self.player.stats.total_earned,
            win_goal = self.config.win_goal,
            tick = self.tick_count,
            "game_won"
        );
        self.events.emit(events::GameplayEvent::GameWon);
    }

    pub(crate) fn respawn_player(&mut self) {
        let spawn = self.config.world.player_spawn;
        let player = &mut self.player;
        player.life = LifeState::Alive;
        player.restore_full_health();
        player.set_wanted(0.0);
        player.context = PlayerContext::FreeRoam;
        player.body.position = self.geometry.clamp_position(spawn, player.body.size);
        info!(x = spawn.x, y = spawn.y, "player_respawned");
        self.events.emit(events::GameplayEvent::PlayerRespawned);
    }

    pub fn capture_snapshot(&self) -> SaveSnapshot {
        SaveSnapshot::capture(&self.player, self.missions.completed_count())
    }

    /// Applies a validated snapshot. NPCs, vehicles and missions in progress
    /// are not part of a save and keep their current state.
    pub fn restore_snapshot(&mut self, snapshot: &SaveSnapshot) {
        if let Some(vehicle_id) = self.player.vehicle_id() {
            if let Some(vehicle) = self.entities.vehicles.get_mut(vehicle_id) {
                vehicle.driver = None;
            }
        }
        snapshot.apply_to(&mut self.player);
        let size = self.player.body.size;
        self.player.body.position = self.geometry.clamp_position(snapshot.position, size);
        self.missions.set_completed_count(snapshot.completed_missions);
        debug!(
            cash = snapshot.cash,
            completed_missions = snapshot.completed_missions,
            "snapshot_restored"
        );
    }
}

impl Simulation for GameState {
    fn update(&mut self, input: &InputSnapshot) -> TickControl {
        if input.quit_requested() {
            return TickControl::Quit;
        }
        self.tick(input);
        TickControl::Continue
    }

    fn entity_count(&self) -> usize {
        self.entities.entity_count()
    }
}

pub(crate) fn note_rejection<T>(action: &'static str, result: Result<T, ActionRejected>) {
    if let Err(reason) = result {
        debug!(action, reason = %reason, "action_rejected");
    }
}
