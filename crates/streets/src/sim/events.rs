use engine::{EntityId, Vec2};

use super::missions::MissionKind;
use super::types::{Gang, VenueKind, Weapon};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GameplayEvent {
    ShotFired {
        weapon: Weapon,
    },
    CopKilled {
        cop_id: EntityId,
        reward: u32,
    },
    GangMemberKilled {
        member_id: EntityId,
        gang: Gang,
        by_player: bool,
        reward: u32,
    },
    CivilianKilled {
        civilian_id: EntityId,
        reward: u32,
    },
    PlayerDamaged {
        amount: i32,
    },
    PlayerDowned,
    PlayerRespawned,
    ExplosionDetonated {
        position: Vec2,
    },
    VehicleEntered {
        vehicle_id: EntityId,
    },
    VehicleExited {
        vehicle_id: EntityId,
    },
    VehicleDestroyed {
        vehicle_id: EntityId,
    },
    VenueEntered {
        kind: VenueKind,
    },
    VendorOpened {
        dealer_id: EntityId,
    },
    VenueExited,
    DrugTraded {
        dealer_id: EntityId,
        bought: bool,
        price: u32,
    },
    ItemPurchased {
        price: u32,
    },
    CrewRecruited {
        crew_id: EntityId,
    },
    MissionStarted {
        kind: MissionKind,
    },
    MissionCompleted {
        kind: MissionKind,
        reward: u32,
    },
    MissionFailed {
        kind: MissionKind,
    },
    MissionAbandoned {
        kind: MissionKind,
    },
    SaveWritten,
    GameWon,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameplayEventKind {
    ShotFired,
    Kill,
    PlayerDamaged,
    PlayerLife,
    Explosion,
    Vehicle,
    Venue,
    Trade,
    Mission,
    Save,
    GameWon,
}

impl GameplayEvent {
    pub fn kind(self) -> GameplayEventKind {
        match self {
            Self::ShotFired { .. } => GameplayEventKind::ShotFired,
            Self::CopKilled { .. }
            | Self::GangMemberKilled { .. }
            | Self::CivilianKilled { .. } => GameplayEventKind::Kill,
            Self::PlayerDamaged { .. } => GameplayEventKind::PlayerDamaged,
            Self::PlayerDowned | Self::PlayerRespawned => GameplayEventKind::PlayerLife,
            Self::ExplosionDetonated { .. } => GameplayEventKind::Explosion,
            Self::VehicleEntered { .. }
            | Self::VehicleExited { .. }
            | Self::VehicleDestroyed { .. } => GameplayEventKind::Vehicle,
            Self::VenueEntered { .. }
            | Self::VendorOpened { .. }
            | Self::VenueExited
            | Self::CrewRecruited { .. } => GameplayEventKind::Venue,
            Self::DrugTraded { .. } | Self::ItemPurchased { .. } => GameplayEventKind::Trade,
            Self::MissionStarted { .. }
            | Self::MissionCompleted { .. }
            | Self::MissionFailed { .. }
            | Self::MissionAbandoned { .. } => GameplayEventKind::Mission,
            Self::SaveWritten => GameplayEventKind::Save,
            Self::GameWon => GameplayEventKind::GameWon,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GameplayEventCounts {
    pub total: u32,
    pub shots_fired: u32,
    pub kills: u32,
    pub player_damaged: u32,
    pub player_life: u32,
    pub explosions: u32,
    pub vehicle: u32,
    pub venue: u32,
    pub trades: u32,
    pub missions: u32,
    pub saves: u32,
    pub game_won: u32,
}

impl GameplayEventCounts {
    fn record(&mut self, kind: GameplayEventKind) {
        self.total = self.total.saturating_add(1);
        let slot = match kind {
            GameplayEventKind::ShotFired => &mut self.shots_fired,
            GameplayEventKind::Kill => &mut self.kills,
            GameplayEventKind::PlayerDamaged => &mut self.player_damaged,
            GameplayEventKind::PlayerLife => &mut self.player_life,
            GameplayEventKind::Explosion => &mut self.explosions,
            GameplayEventKind::Vehicle => &mut self.vehicle,
            GameplayEventKind::Venue => &mut self.venue,
            GameplayEventKind::Trade => &mut self.trades,
            GameplayEventKind::Mission => &mut self.missions,
            GameplayEventKind::Save => &mut self.saves,
            GameplayEventKind::GameWon => &mut self.game_won,
        };
        *slot = slot.saturating_add(1);
    }
}

/// Events raised during the tick in progress, plus the finished previous tick
/// for the presentation layer to read.
#[derive(Debug, Default)]
pub struct GameplayEventBus {
    current_tick_events: Vec<GameplayEvent>,
    last_tick_events: Vec<GameplayEvent>,
    last_tick_counts: GameplayEventCounts,
}

impl GameplayEventBus {
    pub(crate) fn clear_current_tick(&mut self) {
        self.current_tick_events.clear();
    }

    pub(crate) fn emit(&mut self, event: GameplayEvent) {
        self.current_tick_events.push(event);
    }

    pub fn iter_emitted_so_far(&self) -> impl Iterator<Item = &GameplayEvent> {
        self.current_tick_events.iter()
    }

    pub(crate) fn finish_tick_rollover(&mut self) {
        let mut counts = GameplayEventCounts::default();
        for event in &self.current_tick_events {
            counts.record(event.kind());
        }
        self.last_tick_counts = counts;
        std::mem::swap(&mut self.last_tick_events, &mut self.current_tick_events);
        self.current_tick_events.clear();
    }

    pub fn last_tick_events(&self) -> &[GameplayEvent] {
        &self.last_tick_events
    }

    pub fn last_tick_counts(&self) -> GameplayEventCounts {
        self.last_tick_counts
    }
}
