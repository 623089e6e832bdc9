use thiserror::Error;

use super::types::Weapon;

/// Why a player action was turned into a no-op.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ActionRejected {
    #[error("player is down")]
    PlayerDown,
    #[error("player is already inside a venue")]
    AlreadyInside,
    #[error("player is already driving")]
    AlreadyDriving,
    #[error("player is not inside a venue")]
    NotInside,
    #[error("player is not driving")]
    NotDriving,
    #[error("no venue or vendor within reach")]
    NothingToEnter,
    #[error("no unoccupied vehicle within reach")]
    NoVehicleNearby,
    #[error("no exit position is clear of buildings")]
    NoClearExit,
    #[error("weapon is cooling down")]
    WeaponCoolingDown,
    #[error("{0:?} is not owned")]
    WeaponNotOwned(Weapon),
    #[error("out of ammunition")]
    OutOfAmmo,
    #[error("not enough cash: need {needed}, have {available}")]
    InsufficientCash { needed: u32, available: u32 },
    #[error("vendor is out of stock")]
    VendorOutOfStock,
    #[error("vendor cannot cover the price")]
    VendorOutOfCash,
    #[error("vendor is gone")]
    VendorGone,
    #[error("nothing to sell")]
    NothingToSell,
    #[error("item is already owned")]
    AlreadyOwned,
    #[error("upgrade is already at its cap")]
    UpgradeCapped,
    #[error("health is already full")]
    HealthFull,
    #[error("a mission is already active")]
    MissionAlreadyActive,
    #[error("no mission is active")]
    NoActiveMission,
    #[error("no mission offered at index {0}")]
    NoSuchMission(usize),
    #[error("missions are cooling down for {0} more ticks")]
    MissionCooldown(u32),
    #[error("action does not apply in the current context")]
    WrongContext,
}
