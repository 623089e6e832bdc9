use serde::{Deserialize, Serialize};

pub const WANTED_MAX: f32 = 5.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Gang {
    Red,
    Blue,
    Green,
}

impl Gang {
    pub const ALL: [Gang; 3] = [Gang::Red, Gang::Blue, Gang::Green];

    pub const fn index(self) -> usize {
        match self {
            Gang::Red => 0,
            Gang::Blue => 1,
            Gang::Green => 2,
        }
    }
}

/// Owner of a projectile. Damage never applies within the same faction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Faction {
    Player,
    Police,
    Gang(Gang),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Weapon {
    Pistol,
    Shotgun,
    Uzi,
    Rifle,
    RocketLauncher,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeaponProfile {
    pub spread: f32,
    pub pellets: u32,
    pub cooldown_ticks: u32,
    pub damage_bonus: i32,
}

impl Weapon {
    pub const ALL: [Weapon; 5] = [
        Weapon::Pistol,
        Weapon::Shotgun,
        Weapon::Uzi,
        Weapon::Rifle,
        Weapon::RocketLauncher,
    ];

    pub const fn index(self) -> usize {
        match self {
            Weapon::Pistol => 0,
            Weapon::Shotgun => 1,
            Weapon::Uzi => 2,
            Weapon::Rifle => 3,
            Weapon::RocketLauncher => 4,
        }
    }

    /// Slots are 1-based, matching the number row.
    pub fn from_slot(slot: u8) -> Option<Weapon> {
        Weapon::ALL.get(usize::from(slot).checked_sub(1)?).copied()
    }

    pub const fn profile(self) -> WeaponProfile {
        match self {
            Weapon::Pistol => WeaponProfile {
                spread: 0.1,
                pellets: 1,
                cooldown_ticks: 12,
                damage_bonus: 0,
            },
            Weapon::Shotgun => WeaponProfile {
                spread: 0.25,
                pellets: 5,
                cooldown_ticks: 30,
                damage_bonus: 0,
            },
            Weapon::Uzi => WeaponProfile {
                spread: 0.15,
                pellets: 1,
                cooldown_ticks: 5,
                damage_bonus: 0,
            },
            Weapon::Rifle => WeaponProfile {
                spread: 0.02,
                pellets: 1,
                cooldown_ticks: 20,
                damage_bonus: 25,
            },
            Weapon::RocketLauncher => WeaponProfile {
                spread: 0.0,
                pellets: 1,
                cooldown_ticks: 60,
                damage_bonus: 0,
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DrugKind {
    Crack,
    Weed,
    Meth,
}

impl DrugKind {
    pub const ALL: [DrugKind; 3] = [DrugKind::Crack, DrugKind::Weed, DrugKind::Meth];

    pub const fn index(self) -> usize {
        match self {
            DrugKind::Crack => 0,
            DrugKind::Weed => 1,
            DrugKind::Meth => 2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VenueKind {
    CraftingLab,
    Club,
    WeaponShop,
    UpgradeShop,
    SafeHouse,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VehicleKind {
    Car,
    Sports,
    Truck,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VehicleStats {
    pub width: f32,
    pub height: f32,
    pub max_speed: f32,
    pub health: i32,
}

impl VehicleKind {
    pub const ALL: [VehicleKind; 3] = [VehicleKind::Car, VehicleKind::Sports, VehicleKind::Truck];

    pub const fn stats(self) -> VehicleStats {
        match self {
            VehicleKind::Car => VehicleStats {
                width: 80.0,
                height: 45.0,
                max_speed: 14.0,
                health: 150,
            },
            VehicleKind::Sports => VehicleStats {
                width: 85.0,
                height: 40.0,
                max_speed: 20.0,
                health: 100,
            },
            VehicleKind::Truck => VehicleStats {
                width: 100.0,
                height: 55.0,
                max_speed: 10.0,
                health: 250,
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::Up,
        Direction::Down,
        Direction::Left,
        Direction::Right,
    ];
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weapon_slots_are_one_based() {
        assert_eq!(Weapon::from_slot(1), Some(Weapon::Pistol));
        assert_eq!(Weapon::from_slot(5), Some(Weapon::RocketLauncher));
        assert_eq!(Weapon::from_slot(0), None);
        assert_eq!(Weapon::from_slot(6), None);
    }

    #[test]
    fn indices_match_declaration_order() {
        for (position, weapon) in Weapon::ALL.iter().enumerate() {
            assert_eq!(weapon.index(), position);
        }
        for (position, gang) in Gang::ALL.iter().enumerate() {
            assert_eq!(gang.index(), position);
        }
        for (position, drug) in DrugKind::ALL.iter().enumerate() {
            assert_eq!(drug.index(), position);
        }
    }
}
