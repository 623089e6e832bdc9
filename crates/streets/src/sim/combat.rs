//! Ranged fire, melee, projectile resolution, explosions and the death side
//! effects shared by all of them.
//!
//! Every kill goes through one of the `kill_*` functions, which only apply
//! rewards when their `despawn` actually queued the removal. A second hit on
//! an entity already removed this tick is therefore a no-op.

use engine::{EntityId, Rect, Vec2};
use rand::Rng;
use tracing::{debug, info};

use super::effects::{spawn_blood, spawn_particles, spawn_text};
use super::entities::{
    EntityRegistry, LifeState, ParticleKind, Projectile, ProjectileKind, PlayerContext,
};
use super::events::GameplayEvent;
use super::rejection::ActionRejected;
use super::types::{Faction, Gang, Weapon};
use super::vehicles::eject_player;
use super::{SimContext, RESPAWN_TICKS};

pub const BULLET_SPEED: f32 = 22.0;
pub const BULLET_TTL_TICKS: u32 = 50;
pub const ROCKET_SPEED: f32 = 12.0;
pub const ROCKET_TTL_TICKS: u32 = 120;
pub const PLAYER_BULLET_DAMAGE: i32 = 35;
pub const COP_BULLET_DAMAGE: f32 = 25.0;
pub const GANG_BULLET_DAMAGE_TO_PLAYER: f32 = 20.0;
pub const GANG_BULLET_DAMAGE_TO_GANG: i32 = 25;
pub const MELEE_RADIUS: f32 = 80.0;
pub const MELEE_DAMAGE: i32 = 35;
pub const AUTO_AIM_RANGE: f32 = 400.0;
pub const EXPLOSION_RADIUS: f32 = 150.0;
pub const EXPLOSION_DAMAGE: f32 = 100.0;

const MELEE_WANTED: f32 = 0.3;
const SHOT_WANTED: f32 = 0.2;
const ROCKET_WANTED: f32 = 0.5;
const COP_KILL_WANTED: f32 = 1.0;
const CIVILIAN_KILL_WANTED: f32 = 0.5;
const ROCKET_ACTOR_FUSE: f32 = 40.0;
const ROCKET_VEHICLE_FUSE: f32 = 50.0;
const BULLET_HALF: f32 = 4.0;
const ROCKET_HALF: f32 = 5.0;
const COP_HITBOX: Vec2 = Vec2::new(25.0, 35.0);
const GANG_HITBOX: Vec2 = Vec2::new(22.0, 32.0);
const CIVILIAN_HITBOX: Vec2 = Vec2::new(20.0, 30.0);
const PLAYER_HITBOX: Vec2 = Vec2::new(25.0, 35.0);
const FEAR_RADIUS: f32 = 200.0;
pub(crate) const SCARED_TICKS: u32 = 180;
const GANG_HIT_REPUTATION: i32 = -10;
const SCREEN_SHAKE_TICKS: u32 = 20;
const DAMAGE_FLASH_TICKS: u32 = 10;

pub(crate) fn spawn_projectile(
    entities: &mut EntityRegistry,
    kind: ProjectileKind,
    origin: Vec2,
    heading: f32,
    owner: Faction,
    damage_bonus: i32,
) -> EntityId {
    let (speed, ttl_ticks) = match kind {
        ProjectileKind::Bullet => (BULLET_SPEED, BULLET_TTL_TICKS),
        ProjectileKind::Rocket => (ROCKET_SPEED, ROCKET_TTL_TICKS),
    };
    entities.projectiles.spawn(
        &mut entities.ids,
        Projectile {
            kind,
            position: origin,
            velocity: Vec2::from_angle(heading) * speed,
            ttl_ticks,
            owner,
            damage_bonus,
        },
    )
}

fn auto_aim(ctx: &SimContext<'_>, origin: Vec2, aim: Option<Vec2>) -> f32 {
    let nearest_cop = ctx
        .entities
        .cops
        .iter_live()
        .map(|(_, cop)| cop.body.center())
        .map(|center| (center, center.distance(origin)))
        .filter(|(_, distance)| *distance < AUTO_AIM_RANGE)
        .min_by(|a, b| a.1.total_cmp(&b.1));
    if let Some((target, _)) = nearest_cop {
        return origin.angle_to(target);
    }
    match aim.filter(|direction| direction.is_finite() && direction.length() > 0.0) {
        Some(direction) => direction.y.atan2(direction.x),
        None => ctx.player.facing,
    }
}

pub(crate) fn fire(ctx: &mut SimContext<'_>, aim: Option<Vec2>) -> Result<(), ActionRejected> {
    if !ctx.player.is_alive() {
        return Err(ActionRejected::PlayerDown);
    }
    if ctx.player.is_inside() {
        return Err(ActionRejected::WrongContext);
    }
    let loadout = &ctx.player.loadout;
    let weapon = loadout.selected;
    if loadout.cooldown_ticks > 0 {
        return Err(ActionRejected::WeaponCoolingDown);
    }
    if !loadout.owns(weapon) {
        return Err(ActionRejected::WeaponNotOwned(weapon));
    }
    let is_rocket = weapon == Weapon::RocketLauncher;
    let rounds = if is_rocket { loadout.rockets } else { loadout.ammo };
    if rounds == 0 {
        return Err(ActionRejected::OutOfAmmo);
    }

    let origin = ctx.player.center();
    let angle = auto_aim(ctx, origin, aim);
    let profile = weapon.profile();
    let kind = if is_rocket {
        ProjectileKind::Rocket
    } else {
        ProjectileKind::Bullet
    };
    for _ in 0..profile.pellets {
        let spread = if profile.spread > 0.0 {
            ctx.rng.gen_range(-profile.spread..=profile.spread)
        } else {
            0.0
        };
        spawn_projectile(
            ctx.entities,
            kind,
            origin,
            angle + spread,
            Faction::Player,
            profile.damage_bonus,
        );
    }

    let player = &mut *ctx.player;
    player.facing = angle;
    player.loadout.cooldown_ticks = profile.cooldown_ticks;
    if is_rocket {
        player.loadout.rockets -= 1;
        player.add_wanted(ROCKET_WANTED);
    } else {
        player.loadout.ammo -= 1;
        player.add_wanted(SHOT_WANTED);
        spawn_particles(ctx.entities, ctx.rng, ParticleKind::Shell, origin, 1);
    }
    ctx.events.emit(GameplayEvent::ShotFired { weapon });
    Ok(())
}

pub(crate) fn melee(ctx: &mut SimContext<'_>) -> Result<(), ActionRejected> {
    if !ctx.player.is_alive() {
        return Err(ActionRejected::PlayerDown);
    }
    match ctx.player.context {
        PlayerContext::FreeRoam => {}
        PlayerContext::InVehicle { .. } => return Err(ActionRejected::AlreadyDriving),
        PlayerContext::Inside(_) => return Err(ActionRejected::AlreadyInside),
    }
    ctx.player.add_wanted(MELEE_WANTED);

    let center = ctx.player.center();
    let cops = ids_within(
        ctx.entities
            .cops
            .iter_live()
            .map(|(id, cop)| (id, cop.body.center())),
        center,
        MELEE_RADIUS,
    );
    let civilians = ids_within(
        ctx.entities
            .civilians
            .iter_live()
            .map(|(id, civilian)| (id, civilian.body.center())),
        center,
        MELEE_RADIUS,
    );
    debug!(cops = cops.len(), civilians = civilians.len(), "melee_swing");
    for id in cops {
        damage_cop(ctx, id, MELEE_DAMAGE);
    }
    for id in civilians {
        kill_civilian(ctx, id);
    }
    Ok(())
}

fn ids_within(
    candidates: impl Iterator<Item = (EntityId, Vec2)>,
    center: Vec2,
    radius: f32,
) -> Vec<EntityId> {
    candidates
        .filter(|(_, position)| position.distance(center) < radius)
        .map(|(id, _)| id)
        .collect()
}

fn first_hit(
    candidates: impl Iterator<Item = (EntityId, Vec2)>,
    half_extents: Vec2,
    point: Vec2,
) -> Option<EntityId> {
    candidates
        .filter(|(_, center)| Rect::from_center(*center, half_extents).contains_point(point))
        .map(|(id, _)| id)
        .next()
}

pub(crate) fn damage_player(ctx: &mut SimContext<'_>, amount: i32) {
    if !ctx.player.is_targetable() {
        return;
    }
    let applied = ctx.player.apply_damage(amount);
    if applied > 0 {
        ctx.player.damage_flash_ticks = DAMAGE_FLASH_TICKS;
        ctx.events.emit(GameplayEvent::PlayerDamaged { amount: applied });
        let at = ctx.player.center();
        spawn_blood(ctx.entities, ctx.rng, at, 3);
    }
    if ctx.player.health() > 0 {
        return;
    }
    if let Some(vehicle_id) = ctx.player.vehicle_id() {
        eject_player(ctx, vehicle_id);
    }
    ctx.player.life = LifeState::Down {
        respawn_ticks: RESPAWN_TICKS,
    };
    ctx.events.emit(GameplayEvent::PlayerDowned);
    info!(
        wanted = ctx.player.wanted(),
        respawn_ticks = RESPAWN_TICKS,
        "player_downed"
    );
}

/// Returns true when the hit was lethal.
pub(crate) fn damage_cop(ctx: &mut SimContext<'_>, id: EntityId, amount: i32) -> bool {
    let Some(cop) = ctx.entities.cops.get_mut(id) else {
        return false;
    };
    cop.health -= amount;
    cop.alert = true;
    let lethal = cop.health <= 0;
    let at = cop.body.center();
    spawn_blood(ctx.entities, ctx.rng, at, 4);
    if lethal {
        kill_cop(ctx, id);
    }
    lethal
}

pub(crate) fn kill_cop(ctx: &mut SimContext<'_>, id: EntityId) {
    let Some(at) = ctx.entities.cops.get(id).map(|cop| cop.body.center()) else {
        return;
    };
    if !ctx.entities.cops.despawn(id) {
        return;
    }
    let reward = ctx.rng.gen_range(20..=50);
    ctx.player.earn(reward);
    ctx.player.add_wanted(COP_KILL_WANTED);
    ctx.player.stats.kills = ctx.player.stats.kills.saturating_add(1);
    spawn_text(ctx.entities, format!("+${reward}"), at);
    ctx.events.emit(GameplayEvent::CopKilled { cop_id: id, reward });
    info!(cop = id.0, reward, wanted = ctx.player.wanted(), "cop_killed");
}

pub(crate) fn damage_gang_member(
    ctx: &mut SimContext<'_>,
    id: EntityId,
    amount: i32,
    by_player: bool,
) -> bool {
    let Some(member) = ctx.entities.gang_members.get_mut(id) else {
        return false;
    };
    member.health -= amount;
    member.alert = true;
    let lethal = member.health <= 0;
    let at = member.body.center();
    spawn_blood(ctx.entities, ctx.rng, at, 4);
    if lethal {
        kill_gang_member(ctx, id, by_player);
    }
    lethal
}

pub(crate) fn kill_gang_member(ctx: &mut SimContext<'_>, id: EntityId, by_player: bool) {
    let Some((gang, at)) = ctx
        .entities
        .gang_members
        .get(id)
        .map(|member| (member.gang, member.body.center()))
    else {
        return;
    };
    if !ctx.entities.gang_members.despawn(id) {
        return;
    }
    let reward = if by_player {
        let reward = ctx.rng.gen_range(30..=80);
        ctx.player.earn(reward);
        ctx.player.stats.gang_kills = ctx.player.stats.gang_kills.saturating_add(1);
        spawn_text(ctx.entities, format!("+${reward}"), at);
        reward
    } else {
        0
    };
    ctx.events.emit(GameplayEvent::GangMemberKilled {
        member_id: id,
        gang,
        by_player,
        reward,
    });
    info!(member = id.0, gang = ?gang, by_player, reward, "gang_member_killed");
}

/// Civilians die to any hit. Never counted as a kill, and the cash they
/// drop is not lifetime earnings.
pub(crate) fn kill_civilian(ctx: &mut SimContext<'_>, id: EntityId) {
    let Some(at) = ctx.entities.civilians.get(id).map(|civilian| civilian.body.center()) else {
        return;
    };
    if !ctx.entities.civilians.despawn(id) {
        return;
    }
    let reward = ctx.rng.gen_range(5..=30);
    ctx.player.cash = ctx.player.cash.saturating_add(reward);
    ctx.player.add_wanted(CIVILIAN_KILL_WANTED);
    scare_civilians_near(ctx.entities, at, FEAR_RADIUS);
    spawn_blood(ctx.entities, ctx.rng, at, 6);
    spawn_text(ctx.entities, format!("+${reward}"), at);
    ctx.events.emit(GameplayEvent::CivilianKilled {
        civilian_id: id,
        reward,
    });
    info!(civilian = id.0, reward, "civilian_killed");
}

pub(crate) fn scare_civilians_near(entities: &mut EntityRegistry, at: Vec2, radius: f32) {
    for (_, civilian) in entities.civilians.iter_mut() {
        if civilian.body.center().distance(at) < radius {
            civilian.scared = true;
            civilian.scared_ticks = SCARED_TICKS;
        }
    }
}

fn damage_vehicle(ctx: &mut SimContext<'_>, id: EntityId, amount: i32) {
    let Some(vehicle) = ctx.entities.vehicles.get_mut(id) else {
        return;
    };
    vehicle.health -= amount;
    if vehicle.health > 0 {
        return;
    }
    let at = vehicle.body.center();
    if !ctx.entities.vehicles.despawn(id) {
        return;
    }
    eject_player(ctx, id);
    ctx.player.stats.vehicles_destroyed = ctx.player.stats.vehicles_destroyed.saturating_add(1);
    spawn_particles(ctx.entities, ctx.rng, ParticleKind::Smoke, at, 10);
    ctx.events.emit(GameplayEvent::VehicleDestroyed { vehicle_id: id });
    info!(vehicle = id.0, "vehicle_destroyed");
}

fn damage_police_car(ctx: &mut SimContext<'_>, id: EntityId, amount: i32) {
    let Some(car) = ctx.entities.police_cars.get_mut(id) else {
        return;
    };
    car.health -= amount;
    if car.health > 0 {
        return;
    }
    let at = car.body.center();
    if !ctx.entities.police_cars.despawn(id) {
        return;
    }
    ctx.player.stats.vehicles_destroyed = ctx.player.stats.vehicles_destroyed.saturating_add(1);
    spawn_particles(ctx.entities, ctx.rng, ParticleKind::Smoke, at, 10);
    ctx.events.emit(GameplayEvent::VehicleDestroyed { vehicle_id: id });
    info!(police_car = id.0, "police_car_destroyed");
}

fn falloff(distance: f32) -> i32 {
    (EXPLOSION_DAMAGE * (1.0 - distance / EXPLOSION_RADIUS)) as i32
}

fn within_blast(
    candidates: impl Iterator<Item = (EntityId, Vec2)>,
    at: Vec2,
) -> Vec<(EntityId, i32)> {
    candidates
        .map(|(id, center)| (id, center.distance(at)))
        .filter(|(_, distance)| *distance < EXPLOSION_RADIUS)
        .map(|(id, distance)| (id, falloff(distance)))
        .collect()
}

/// Area damage with linear falloff; kills and destructions follow the same
/// rules as direct hits.
pub(crate) fn explode(ctx: &mut SimContext<'_>, at: Vec2) {
    ctx.events.emit(GameplayEvent::ExplosionDetonated { position: at });
    info!(x = at.x, y = at.y, "explosion");
    ctx.player.screen_shake_ticks = SCREEN_SHAKE_TICKS;

    let entities = &*ctx.entities;
    let cops = within_blast(entities.cops.iter_live().map(|(id, e)| (id, e.body.center())), at);
    let members = within_blast(
        entities
            .gang_members
            .iter_live()
            .map(|(id, e)| (id, e.body.center())),
        at,
    );
    let civilians = within_blast(
        entities
            .civilians
            .iter_live()
            .map(|(id, e)| (id, e.body.center())),
        at,
    );
    let vehicles = within_blast(
        entities
            .vehicles
            .iter_live()
            .map(|(id, e)| (id, e.body.center())),
        at,
    );
    let police_cars = within_blast(
        entities
            .police_cars
            .iter_live()
            .map(|(id, e)| (id, e.body.center())),
        at,
    );

    for (id, damage) in cops {
        damage_cop(ctx, id, damage);
    }
    for (id, damage) in members {
        damage_gang_member(ctx, id, damage, true);
    }
    for (id, _) in civilians {
        kill_civilian(ctx, id);
    }
    for (id, damage) in vehicles {
        damage_vehicle(ctx, id, damage);
    }
    for (id, damage) in police_cars {
        damage_police_car(ctx, id, damage);
    }

    let distance = ctx.player.center().distance(at);
    if distance < EXPLOSION_RADIUS {
        let damage = falloff(distance) as f32 * (1.0 - ctx.player.armor_fraction());
        damage_player(ctx, damage as i32);
    }

    spawn_particles(ctx.entities, ctx.rng, ParticleKind::Explosion, at, 30);
    spawn_particles(ctx.entities, ctx.rng, ParticleKind::Smoke, at, 15);
}

/// CombatResolution: integrates every applied projectile and resolves at
/// most one hit per projectile.
pub(crate) fn update_projectiles(ctx: &mut SimContext<'_>) {
    for id in ctx.entities.projectiles.ids() {
        if !ctx.entities.projectiles.is_live(id) {
            continue;
        }
        let Some(projectile) = ctx.entities.projectiles.get_mut(id) else {
            continue;
        };
        projectile.position += projectile.velocity;
        projectile.ttl_ticks = projectile.ttl_ticks.saturating_sub(1);
        let projectile = *projectile;
        match projectile.kind {
            ProjectileKind::Bullet => resolve_bullet(ctx, id, projectile),
            ProjectileKind::Rocket => resolve_rocket(ctx, id, projectile),
        }
    }
}

fn hits_world(ctx: &SimContext<'_>, position: Vec2, half: f32) -> bool {
    !ctx.geometry.bounds().contains_point(position)
        || ctx.geometry.rect_blocked(&Rect::new(
            position.x - half,
            position.y - half,
            half * 2.0,
            half * 2.0,
        ))
}

fn resolve_bullet(ctx: &mut SimContext<'_>, id: EntityId, projectile: Projectile) {
    if hits_world(ctx, projectile.position, BULLET_HALF) {
        ctx.entities.projectiles.despawn(id);
        spawn_particles(ctx.entities, ctx.rng, ParticleKind::Spark, projectile.position, 3);
        return;
    }
    let hit = match projectile.owner {
        Faction::Player => player_bullet_hit(ctx, &projectile),
        Faction::Police => police_bullet_hit(ctx, &projectile),
        Faction::Gang(gang) => gang_bullet_hit(ctx, &projectile, gang),
    };
    if hit || projectile.ttl_ticks == 0 {
        ctx.entities.projectiles.despawn(id);
    }
}

fn player_bullet_hit(ctx: &mut SimContext<'_>, projectile: &Projectile) -> bool {
    let damage = ((PLAYER_BULLET_DAMAGE + projectile.damage_bonus) as f32
        * ctx.player.damage_multiplier) as i32;
    let point = projectile.position;

    let cop = first_hit(
        ctx.entities.cops.iter_live().map(|(id, e)| (id, e.body.center())),
        COP_HITBOX,
        point,
    );
    if let Some(id) = cop {
        damage_cop(ctx, id, damage);
        return true;
    }

    let member = ctx
        .entities
        .gang_members
        .iter_live()
        .find(|(_, e)| Rect::from_center(e.body.center(), GANG_HITBOX).contains_point(point))
        .map(|(id, e)| (id, e.gang));
    if let Some((id, gang)) = member {
        ctx.player.adjust_reputation(gang, GANG_HIT_REPUTATION);
        damage_gang_member(ctx, id, damage, true);
        return true;
    }

    let civilian = first_hit(
        ctx.entities
            .civilians
            .iter_live()
            .map(|(id, e)| (id, e.body.center())),
        CIVILIAN_HITBOX,
        point,
    );
    if let Some(id) = civilian {
        kill_civilian(ctx, id);
        return true;
    }
    false
}

fn hits_player(ctx: &SimContext<'_>, point: Vec2) -> bool {
    ctx.player.is_targetable()
        && Rect::from_center(ctx.player.center(), PLAYER_HITBOX).contains_point(point)
}

fn armored(ctx: &SimContext<'_>, base: f32) -> i32 {
    (base * (1.0 - ctx.player.armor_fraction())) as i32
}

fn police_bullet_hit(ctx: &mut SimContext<'_>, projectile: &Projectile) -> bool {
    if !hits_player(ctx, projectile.position) {
        return false;
    }
    let damage = armored(ctx, COP_BULLET_DAMAGE);
    damage_player(ctx, damage);
    true
}

/// Gang fire only lands on the player or on members of other gangs.
fn gang_bullet_hit(ctx: &mut SimContext<'_>, projectile: &Projectile, shooter: Gang) -> bool {
    if hits_player(ctx, projectile.position) {
        let damage = armored(ctx, GANG_BULLET_DAMAGE_TO_PLAYER);
        damage_player(ctx, damage);
        return true;
    }
    let rival = first_hit(
        ctx.entities
            .gang_members
            .iter_live()
            .filter(|(_, e)| e.gang != shooter)
            .map(|(id, e)| (id, e.body.center())),
        GANG_HITBOX,
        projectile.position,
    );
    if let Some(id) = rival {
        damage_gang_member(ctx, id, GANG_BULLET_DAMAGE_TO_GANG, false);
        return true;
    }
    false
}

fn resolve_rocket(ctx: &mut SimContext<'_>, id: EntityId, projectile: Projectile) {
    let at = projectile.position;
    let driven = ctx.player.vehicle_id();
    let entities = &*ctx.entities;
    let near_actor = entities
        .cops
        .iter_live()
        .any(|(_, e)| e.body.center().distance(at) < ROCKET_ACTOR_FUSE)
        || entities
            .gang_members
            .iter_live()
            .any(|(_, e)| e.body.center().distance(at) < ROCKET_ACTOR_FUSE);
    let near_vehicle = entities
        .vehicles
        .iter_live()
        .filter(|(vehicle_id, _)| Some(*vehicle_id) != driven)
        .any(|(_, e)| e.body.center().distance(at) < ROCKET_VEHICLE_FUSE)
        || entities
            .police_cars
            .iter_live()
            .any(|(_, e)| e.body.center().distance(at) < ROCKET_VEHICLE_FUSE);

    if projectile.ttl_ticks == 0 || near_actor || near_vehicle || hits_world(ctx, at, ROCKET_HALF)
    {
        if ctx.entities.projectiles.despawn(id) {
            explode(ctx, at);
        }
        return;
    }
    spawn_particles(ctx.entities, ctx.rng, ParticleKind::Smoke, at, 1);
}
