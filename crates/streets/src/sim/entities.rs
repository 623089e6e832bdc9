use engine::{EntityId, EntityIdAllocator, EntityStore, Vec2};

use super::movement::Body;
use super::types::{DrugKind, Faction, Gang, VehicleKind, Weapon, WANTED_MAX};
use super::venues::InteractionContext;

pub const PLAYER_SIZE: Vec2 = Vec2::new(40.0, 60.0);
pub const COP_SIZE: Vec2 = Vec2::new(40.0, 60.0);
pub const CIVILIAN_SIZE: Vec2 = Vec2::new(35.0, 55.0);
pub const GANG_MEMBER_SIZE: Vec2 = Vec2::new(38.0, 58.0);
pub const DEALER_SIZE: Vec2 = Vec2::new(38.0, 58.0);
pub const CREW_SIZE: Vec2 = Vec2::new(38.0, 58.0);
pub const POLICE_CAR_SIZE: Vec2 = Vec2::new(90.0, 50.0);

pub const PLAYER_BASE_SPEED: f32 = 8.0;
pub const PLAYER_START_HEALTH: i32 = 100;
pub const PLAYER_START_CASH: u32 = 1000;
pub const PLAYER_START_AMMO: u32 = 50;
pub const COP_HEALTH: i32 = 80;
pub const GANG_MEMBER_HEALTH: i32 = 60;
pub const POLICE_CAR_HEALTH: i32 = 200;
pub const ARMOR_CAP_PERCENT: u32 = 80;
pub const REPUTATION_LIMIT: i32 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifeState {
    Alive,
    Down { respawn_ticks: u32 },
}

/// Exactly one of these holds at a time.
#[derive(Debug, Clone, PartialEq)]
pub enum PlayerContext {
    FreeRoam,
    InVehicle { vehicle_id: EntityId },
    Inside(VenueVisit),
}

#[derive(Debug, Clone, PartialEq)]
pub struct VenueVisit {
    pub entry_position: Vec2,
    pub interaction: InteractionContext,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Loadout {
    owned: [bool; 5],
    pub selected: Weapon,
    pub ammo: u32,
    pub rockets: u32,
    pub cooldown_ticks: u32,
}

impl Loadout {
    pub fn starting() -> Self {
        let mut owned = [false; 5];
        owned[Weapon::Pistol.index()] = true;
        Self {
            owned,
            selected: Weapon::Pistol,
            ammo: PLAYER_START_AMMO,
            rockets: 0,
            cooldown_ticks: 0,
        }
    }

    pub fn owns(&self, weapon: Weapon) -> bool {
        self.owned[weapon.index()]
    }

    pub fn grant(&mut self, weapon: Weapon) {
        self.owned[weapon.index()] = true;
    }

    pub fn set_owned(&mut self, weapon: Weapon, owned: bool) {
        self.owned[weapon.index()] = owned;
    }

    pub fn select(&mut self, weapon: Weapon) -> bool {
        if !self.owns(weapon) {
            return false;
        }
        self.selected = weapon;
        true
    }

    /// Steps through owned weapons, wrapping. `step` is +1 or -1.
    pub fn cycle(&mut self, step: isize) {
        let count = Weapon::ALL.len() as isize;
        let mut index = self.selected.index() as isize;
        for _ in 0..count {
            index = (index + step).rem_euclid(count);
            let candidate = Weapon::ALL[index as usize];
            if self.owns(candidate) {
                self.selected = candidate;
                return;
            }
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrugInventory {
    counts: [u32; 3],
}

impl DrugInventory {
    pub fn count(&self, kind: DrugKind) -> u32 {
        self.counts[kind.index()]
    }

    pub fn add(&mut self, kind: DrugKind, amount: u32) {
        let slot = &mut self.counts[kind.index()];
        *slot = slot.saturating_add(amount);
    }

    pub fn take_one(&mut self, kind: DrugKind) -> bool {
        let slot = &mut self.counts[kind.index()];
        if *slot == 0 {
            return false;
        }
        *slot -= 1;
        true
    }

    pub fn set(&mut self, kind: DrugKind, amount: u32) {
        self.counts[kind.index()] = amount;
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LifetimeStats {
    pub kills: u32,
    pub gang_kills: u32,
    pub total_earned: u32,
    pub missions_completed: u32,
    pub vehicles_stolen: u32,
    pub vehicles_destroyed: u32,
    pub drugs_sold: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Player {
    pub body: Body,
    pub facing: f32,
    pub speed_bonus: f32,
    health: i32,
    max_health: i32,
    pub cash: u32,
    wanted: f32,
    pub loadout: Loadout,
    armor_percent: u32,
    pub damage_multiplier: f32,
    gang_reputation: [i32; 3],
    pub drugs: DrugInventory,
    pub stats: LifetimeStats,
    pub context: PlayerContext,
    pub life: LifeState,
    pub damage_flash_ticks: u32,
    pub screen_shake_ticks: u32,
}

impl Player {
    pub fn new(spawn: Vec2) -> Self {
        Self {
            body: Body::new(spawn, PLAYER_SIZE),
            facing: 0.0,
            speed_bonus: 0.0,
            health: PLAYER_START_HEALTH,
            max_health: PLAYER_START_HEALTH,
            cash: PLAYER_START_CASH,
            wanted: 0.0,
            loadout: Loadout::starting(),
            armor_percent: 0,
            damage_multiplier: 1.0,
            gang_reputation: [0; 3],
            drugs: DrugInventory::default(),
            stats: LifetimeStats::default(),
            context: PlayerContext::FreeRoam,
            life: LifeState::Alive,
            damage_flash_ticks: 0,
            screen_shake_ticks: 0,
        }
    }

    pub fn center(&self) -> Vec2 {
        self.body.center()
    }

    pub fn speed(&self) -> f32 {
        PLAYER_BASE_SPEED + self.speed_bonus
    }

    pub fn health(&self) -> i32 {
        self.health
    }

    pub fn max_health(&self) -> i32 {
        self.max_health
    }

    pub fn wanted(&self) -> f32 {
        self.wanted
    }

    pub fn armor_percent(&self) -> u32 {
        self.armor_percent
    }

    pub fn armor_fraction(&self) -> f32 {
        self.armor_percent as f32 / 100.0
    }

    pub fn reputation(&self, gang: Gang) -> i32 {
        self.gang_reputation[gang.index()]
    }

    pub fn is_alive(&self) -> bool {
        self.life == LifeState::Alive
    }

    pub fn is_inside(&self) -> bool {
        matches!(self.context, PlayerContext::Inside(_))
    }

    pub fn vehicle_id(&self) -> Option<EntityId> {
        match self.context {
            PlayerContext::InVehicle { vehicle_id } => Some(vehicle_id),
            _ => None,
        }
    }

    /// Alive and out in the street, where NPCs and projectiles can reach.
    pub fn is_targetable(&self) -> bool {
        self.is_alive() && !self.is_inside()
    }

    pub fn interaction(&self) -> Option<&InteractionContext> {
        match &self.context {
            PlayerContext::Inside(visit) => Some(&visit.interaction),
            _ => None,
        }
    }

    pub fn add_wanted(&mut self, delta: f32) {
        self.set_wanted(self.wanted + delta);
    }

    pub fn set_wanted(&mut self, value: f32) {
        self.wanted = if value.is_finite() {
            value.clamp(0.0, WANTED_MAX)
        } else {
            0.0
        };
    }

    pub fn set_health(&mut self, value: i32) {
        self.health = value.clamp(0, self.max_health);
    }

    pub fn heal(&mut self, amount: i32) {
        self.set_health(self.health.saturating_add(amount));
    }

    pub fn restore_full_health(&mut self) {
        self.health = self.max_health;
    }

    /// Raises the cap and heals by the same amount.
    pub fn raise_max_health(&mut self, amount: i32) {
        self.max_health = self.max_health.saturating_add(amount).max(1);
        self.heal(amount);
    }

    pub fn set_max_health(&mut self, value: i32) {
        self.max_health = value.max(1);
        self.health = self.health.clamp(0, self.max_health);
    }

    /// Returns the damage actually applied.
    pub fn apply_damage(&mut self, amount: i32) -> i32 {
        let before = self.health;
        self.set_health(self.health.saturating_sub(amount.max(0)));
        before - self.health
    }

    pub fn set_armor_percent(&mut self, value: u32) {
        self.armor_percent = value.min(ARMOR_CAP_PERCENT);
    }

    pub fn adjust_reputation(&mut self, gang: Gang, delta: i32) {
        let slot = &mut self.gang_reputation[gang.index()];
        *slot = slot
            .saturating_add(delta)
            .clamp(-REPUTATION_LIMIT, REPUTATION_LIMIT);
    }

    /// Income that counts toward lifetime earnings.
    pub fn earn(&mut self, amount: u32) {
        self.cash = self.cash.saturating_add(amount);
        self.stats.total_earned = self.stats.total_earned.saturating_add(amount);
    }

    pub fn spend(&mut self, amount: u32) -> bool {
        if self.cash < amount {
            return false;
        }
        self.cash -= amount;
        true
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Cop {
    pub body: Body,
    pub health: i32,
    pub alert: bool,
    pub shoot_timer: i32,
    pub patrol_heading: f32,
}

impl Cop {
    pub fn new(position: Vec2, patrol_heading: f32, alert: bool) -> Self {
        Self {
            body: Body::new(position, COP_SIZE),
            health: COP_HEALTH,
            alert,
            shoot_timer: 0,
            patrol_heading,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GangMember {
    pub body: Body,
    pub gang: Gang,
    pub health: i32,
    pub alert: bool,
    pub shoot_timer: i32,
    pub patrol_heading: f32,
}

impl GangMember {
    pub fn new(position: Vec2, gang: Gang, patrol_heading: f32) -> Self {
        Self {
            body: Body::new(position, GANG_MEMBER_SIZE),
            gang,
            health: GANG_MEMBER_HEALTH,
            alert: false,
            shoot_timer: 0,
            patrol_heading,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Civilian {
    pub body: Body,
    pub scared: bool,
    pub scared_ticks: u32,
    pub heading: f32,
    pub wander_ticks: u32,
}

impl Civilian {
    pub fn new(position: Vec2, heading: f32, wander_ticks: u32) -> Self {
        Self {
            body: Body::new(position, CIVILIAN_SIZE),
            scared: false,
            scared_ticks: 0,
            heading,
            wander_ticks,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CrewMember {
    pub body: Body,
    pub income_ticks: u32,
}

impl CrewMember {
    pub fn new(position: Vec2) -> Self {
        Self {
            body: Body::new(position, CREW_SIZE),
            income_ticks: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Dealer {
    pub body: Body,
    pub stock: u32,
    pub stock_cap: u32,
    pub buy_price: u32,
    pub sell_price: u32,
    pub cash: u32,
    pub restock_ticks: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Vehicle {
    pub body: Body,
    pub kind: VehicleKind,
    pub heading: f32,
    pub velocity: f32,
    pub max_speed: f32,
    pub health: i32,
    pub driver: Option<EntityId>,
}

impl Vehicle {
    pub fn new(position: Vec2, kind: VehicleKind, heading: f32) -> Self {
        let stats = kind.stats();
        Self {
            body: Body::new(position, Vec2::new(stats.width, stats.height)),
            kind,
            heading,
            velocity: 0.0,
            max_speed: stats.max_speed,
            health: stats.health,
            driver: None,
        }
    }

    pub fn occupied(&self) -> bool {
        self.driver.is_some()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PoliceCar {
    pub body: Body,
    pub heading: f32,
    pub velocity: f32,
    pub chasing: bool,
    pub health: i32,
}

impl PoliceCar {
    pub fn new(position: Vec2, heading: f32) -> Self {
        Self {
            body: Body::new(position, POLICE_CAR_SIZE),
            heading,
            velocity: 0.0,
            chasing: false,
            health: POLICE_CAR_HEALTH,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectileKind {
    Bullet,
    Rocket,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Projectile {
    pub kind: ProjectileKind,
    pub position: Vec2,
    pub velocity: Vec2,
    pub ttl_ticks: u32,
    pub owner: Faction,
    pub damage_bonus: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParticleKind {
    Spark,
    Explosion,
    Smoke,
    Shell,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Particle {
    pub kind: ParticleKind,
    pub position: Vec2,
    pub velocity: Vec2,
    pub ttl_ticks: u32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BloodSplat {
    pub position: Vec2,
    pub velocity: Vec2,
    pub ttl_ticks: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FloatingText {
    pub text: String,
    pub position: Vec2,
    pub ttl_ticks: u32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HealthPickup {
    pub position: Vec2,
    pub amount: i32,
}

/// Every simulated actor and ephemeral object, one deferred store per kind.
#[derive(Debug, Clone)]
pub struct EntityRegistry {
    pub ids: EntityIdAllocator,
    pub player_id: EntityId,
    pub cops: EntityStore<Cop>,
    pub gang_members: EntityStore<GangMember>,
    pub civilians: EntityStore<Civilian>,
    pub crew: EntityStore<CrewMember>,
    pub dealers: EntityStore<Dealer>,
    pub vehicles: EntityStore<Vehicle>,
    pub police_cars: EntityStore<PoliceCar>,
    pub projectiles: EntityStore<Projectile>,
    pub particles: EntityStore<Particle>,
    pub blood: EntityStore<BloodSplat>,
    pub floating_texts: EntityStore<FloatingText>,
    pub pickups: EntityStore<HealthPickup>,
}

impl Default for EntityRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl EntityRegistry {
    pub fn new() -> Self {
        let mut ids = EntityIdAllocator::default();
        let player_id = ids.allocate();
        Self {
            ids,
            player_id,
            cops: EntityStore::new(),
            gang_members: EntityStore::new(),
            civilians: EntityStore::new(),
            crew: EntityStore::new(),
            dealers: EntityStore::new(),
            vehicles: EntityStore::new(),
            police_cars: EntityStore::new(),
            projectiles: EntityStore::new(),
            particles: EntityStore::new(),
            blood: EntityStore::new(),
            floating_texts: EntityStore::new(),
            pickups: EntityStore::new(),
        }
    }

    pub fn apply_pending(&mut self) {
        self.cops.apply_pending();
        self.gang_members.apply_pending();
        self.civilians.apply_pending();
        self.crew.apply_pending();
        self.dealers.apply_pending();
        self.vehicles.apply_pending();
        self.police_cars.apply_pending();
        self.projectiles.apply_pending();
        self.particles.apply_pending();
        self.blood.apply_pending();
        self.floating_texts.apply_pending();
        self.pickups.apply_pending();
    }

    /// Applied entities across every store, plus the player.
    pub fn entity_count(&self) -> usize {
        1 + self.cops.len()
            + self.gang_members.len()
            + self.civilians.len()
            + self.crew.len()
            + self.dealers.len()
            + self.vehicles.len()
            + self.police_cars.len()
            + self.projectiles.len()
            + self.particles.len()
            + self.blood.len()
            + self.floating_texts.len()
            + self.pickups.len()
    }

    pub fn gang_member_count(&self, gang: Gang) -> usize {
        let applied = self
            .gang_members
            .iter_live()
            .filter(|(_, member)| member.gang == gang)
            .count();
        let pending = self
            .gang_members
            .pending_spawns()
            .filter(|(_, member)| member.gang == gang)
            .count();
        applied + pending
    }
}
