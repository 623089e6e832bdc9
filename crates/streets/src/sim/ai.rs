//! Per-tick behavior of cops, civilians, gang members, police cars and crew.
//!
//! Each controller flips between a passive state (patrol or wander) and an
//! engaged state (chase or flee). Shots decided during a pass are collected
//! and spawned after it, so no store is mutated while it is being scanned.

use std::f32::consts::{PI, TAU};

use engine::{EntityId, Vec2};
use rand::Rng;
use tracing::debug;

use super::combat::{scare_civilians_near, spawn_projectile, SCARED_TICKS};
use super::entities::ProjectileKind;
use super::movement::{move_along_heading, move_away, move_toward, try_translate};
use super::types::{Faction, Gang};
use super::SimContext;

pub const COP_GIVE_UP_RADIUS: f32 = 800.0;
pub const COP_CHASE_RADIUS: f32 = 500.0;
pub const COP_FIRE_RANGE: f32 = 350.0;
const COP_FIRE_COOLDOWN: i32 = 90;
const COP_SPEED: f32 = 1.8;
const COP_PURSUIT_SPEED: f32 = 2.8;
const COP_PURSUIT_WANTED: f32 = 4.0;
const COP_BREAK_CHANCE: f64 = 0.1;
const COP_AIM_ERROR: f32 = 0.25;
const COP_AIM_ERROR_PER_WANTED: f32 = 0.03;
const PATROL_TURN: f32 = 0.015;
const PATROL_SPEED: f32 = 1.0;

pub const CIVILIAN_SCARE_RADIUS: f32 = 300.0;
const FEAR_SPREAD_RADIUS: f32 = 200.0;
const FLEE_SPEED: f32 = 4.0;
const WANDER_SPEED: f32 = 1.0;

pub const GANG_TARGET_RADIUS: f32 = 400.0;
pub const GANG_ENGAGE_RADIUS: f32 = 350.0;
const GANG_FIRE_RANGE: f32 = 300.0;
const GANG_FIRE_COOLDOWN: i32 = 45;
const GANG_SPEED: f32 = 2.0;
const GANG_AIM_ERROR: f32 = 0.15;
pub const GANG_HOSTILITY_REPUTATION: i32 = -30;

const POLICE_CAR_TOP_SPEED: f32 = 12.0;
const POLICE_CAR_ACCELERATION: f32 = 0.2;
const POLICE_CAR_TURN_BLEND: f32 = 0.05;
const POLICE_CAR_DRAG: f32 = 0.98;
const POLICE_CAR_CIRCLE: f32 = 0.01;
const POLICE_CAR_BOUNCE: f32 = -0.3;

const CREW_FOLLOW_DISTANCE: f32 = 100.0;
const CREW_SPEED: f32 = 4.0;
const CREW_INCOME: u32 = 15;
const CREW_INCOME_TICKS: u32 = 300;

pub(crate) fn update(ctx: &mut SimContext<'_>) {
    update_cops(ctx);
    update_civilians(ctx);
    update_gang_members(ctx);
    update_police_cars(ctx);
    update_crew(ctx);
}

/// Signed smallest rotation from `from` to `to`, in `[-PI, PI)`.
fn angle_delta(from: f32, to: f32) -> f32 {
    (to - from + PI).rem_euclid(TAU) - PI
}

fn cop_aim_error(wanted: f32) -> f32 {
    (COP_AIM_ERROR - COP_AIM_ERROR_PER_WANTED * wanted).max(0.0)
}

fn player_target(ctx: &SimContext<'_>) -> Option<Vec2> {
    ctx.player
        .is_targetable()
        .then(|| ctx.player.center())
}

fn update_cops(ctx: &mut SimContext<'_>) {
    let target = player_target(ctx);
    let wanted = ctx.player.wanted();
    let thresholds = &ctx.config.thresholds;
    let live: Vec<EntityId> = ctx.entities.cops.iter_live().map(|(id, _)| id).collect();
    let mut shots = Vec::new();

    for id in live {
        let Some(cop) = ctx.entities.cops.get_mut(id) else {
            continue;
        };
        let center = cop.body.center();

        if let Some(player) = target {
            let distance = center.distance(player);
            if distance > COP_GIVE_UP_RADIUS {
                cop.alert = false;
            } else if wanted >= thresholds.cop_engage
                || (distance < thresholds.cop_proximity_radius
                    && wanted >= thresholds.cop_proximity)
            {
                cop.alert = true;
            }

            // Alert cops beyond chase range patrol, and their fire timer holds.
            if cop.alert && distance < COP_CHASE_RADIUS {
                let mut speed = if wanted >= COP_PURSUIT_WANTED {
                    COP_PURSUIT_SPEED
                } else {
                    COP_SPEED
                };
                if ctx.rng.gen_bool(COP_BREAK_CHANCE) {
                    speed *= 0.5;
                }
                move_toward(ctx.geometry, &mut cop.body, player, speed);
                cop.shoot_timer += 1;
                if cop.shoot_timer > COP_FIRE_COOLDOWN && distance < COP_FIRE_RANGE {
                    let error = cop_aim_error(wanted);
                    let heading = center.angle_to(player) + ctx.rng.gen_range(-error..=error);
                    shots.push((center, heading));
                    cop.shoot_timer = ctx.rng.gen_range(-30..=0);
                }
                continue;
            }
        }

        cop.patrol_heading += PATROL_TURN;
        let outcome = move_along_heading(
            ctx.geometry,
            &mut cop.body,
            cop.patrol_heading,
            PATROL_SPEED,
        );
        if outcome.blocked() {
            cop.patrol_heading += ctx.rng.gen_range(1.0..3.0);
        }
    }

    if !shots.is_empty() {
        debug!(shots = shots.len(), "cops_fired");
    }
    for (origin, heading) in shots {
        spawn_projectile(
            ctx.entities,
            ProjectileKind::Bullet,
            origin,
            heading,
            Faction::Police,
            0,
        );
    }
}

fn update_civilians(ctx: &mut SimContext<'_>) {
    let threat = player_target(ctx);
    let scares = ctx.player.wanted() >= ctx.config.thresholds.civilian_scare;
    let live: Vec<EntityId> = ctx.entities.civilians.iter_live().map(|(id, _)| id).collect();
    let mut newly_scared = Vec::new();

    for id in live {
        let Some(civilian) = ctx.entities.civilians.get_mut(id) else {
            continue;
        };
        let center = civilian.body.center();
        if let Some(player) = threat.filter(|_| scares) {
            if center.distance(player) < CIVILIAN_SCARE_RADIUS {
                if !civilian.scared {
                    newly_scared.push(center);
                }
                civilian.scared = true;
                civilian.scared_ticks = SCARED_TICKS;
            }
        }

        if civilian.scared {
            if let Some(player) = threat {
                move_away(ctx.geometry, &mut civilian.body, player, FLEE_SPEED);
            }
            civilian.scared_ticks = civilian.scared_ticks.saturating_sub(1);
            if civilian.scared_ticks == 0 {
                civilian.scared = false;
            }
            continue;
        }

        civilian.wander_ticks = civilian.wander_ticks.saturating_sub(1);
        if civilian.wander_ticks == 0 {
            civilian.heading = ctx.rng.gen_range(0.0..TAU);
            civilian.wander_ticks = ctx.rng.gen_range(60..=180);
        }
        let outcome = move_along_heading(
            ctx.geometry,
            &mut civilian.body,
            civilian.heading,
            WANDER_SPEED,
        );
        if outcome.blocked() {
            civilian.wander_ticks = 1;
        }
    }

    for at in newly_scared {
        scare_civilians_near(ctx.entities, at, FEAR_SPREAD_RADIUS);
    }
}

fn update_gang_members(ctx: &mut SimContext<'_>) {
    let player = player_target(ctx);
    let snapshot: Vec<(EntityId, Gang, Vec2)> = ctx
        .entities
        .gang_members
        .iter_live()
        .map(|(id, member)| (id, member.gang, member.body.center()))
        .collect();
    let mut shots = Vec::new();

    for &(id, gang, center) in &snapshot {
        let hostile_player =
            player.filter(|_| ctx.player.reputation(gang) < GANG_HOSTILITY_REPUTATION);
        let target = snapshot
            .iter()
            .filter(|(_, other, _)| *other != gang)
            .map(|(_, _, position)| *position)
            .chain(hostile_player)
            .map(|position| (position, position.distance(center)))
            .filter(|(_, distance)| *distance < GANG_TARGET_RADIUS)
            .min_by(|a, b| a.1.total_cmp(&b.1));

        let Some(member) = ctx.entities.gang_members.get_mut(id) else {
            continue;
        };
        member.shoot_timer += 1;

        match target.filter(|(_, distance)| *distance < GANG_ENGAGE_RADIUS) {
            Some((position, distance)) => {
                member.alert = true;
                move_toward(ctx.geometry, &mut member.body, position, GANG_SPEED);
                if member.shoot_timer > GANG_FIRE_COOLDOWN && distance < GANG_FIRE_RANGE {
                    let heading = center.angle_to(position)
                        + ctx.rng.gen_range(-GANG_AIM_ERROR..=GANG_AIM_ERROR);
                    shots.push((center, heading, gang));
                    member.shoot_timer = 0;
                }
            }
            None => {
                member.alert = false;
                member.patrol_heading += ctx.rng.gen_range(-0.05..0.05);
                let outcome = move_along_heading(
                    ctx.geometry,
                    &mut member.body,
                    member.patrol_heading,
                    PATROL_SPEED,
                );
                if outcome.blocked() {
                    member.patrol_heading += PI;
                }
            }
        }
    }

    for (origin, heading, gang) in shots {
        spawn_projectile(
            ctx.entities,
            ProjectileKind::Bullet,
            origin,
            heading,
            Faction::Gang(gang),
            0,
        );
    }
}

fn update_police_cars(ctx: &mut SimContext<'_>) {
    let thresholds = &ctx.config.thresholds;
    let wanted = ctx.player.wanted();
    let driving = ctx.player.vehicle_id().is_some();
    let chase_threshold = if driving {
        thresholds.police_car_chase_in_vehicle
    } else {
        thresholds.police_car_chase_on_foot
    };
    let target = player_target(ctx).filter(|_| wanted >= chase_threshold);
    let live: Vec<EntityId> = ctx.entities.police_cars.iter_live().map(|(id, _)| id).collect();

    for id in live {
        let Some(car) = ctx.entities.police_cars.get_mut(id) else {
            continue;
        };
        car.chasing = target.is_some();
        match target {
            Some(player) => {
                let desired = car.body.center().angle_to(player);
                car.heading += angle_delta(car.heading, desired) * POLICE_CAR_TURN_BLEND;
                car.velocity = (car.velocity + POLICE_CAR_ACCELERATION).min(POLICE_CAR_TOP_SPEED);
            }
            None => {
                car.velocity *= POLICE_CAR_DRAG;
                car.heading += POLICE_CAR_CIRCLE;
            }
        }
        let delta = Vec2::from_angle(car.heading) * car.velocity;
        if !try_translate(ctx.geometry, &mut car.body, delta) {
            car.velocity *= POLICE_CAR_BOUNCE;
        }
    }
}

/// Crew trail the player and pay out on a fixed interval. The payout is
/// plain cash; it does not count toward lifetime earnings.
fn update_crew(ctx: &mut SimContext<'_>) {
    let leader = ctx.player.center();
    let mut income = 0u32;
    for (_, member) in ctx.entities.crew.iter_mut() {
        if member.body.center().distance(leader) > CREW_FOLLOW_DISTANCE {
            move_toward(ctx.geometry, &mut member.body, leader, CREW_SPEED);
        }
        member.income_ticks += 1;
        if member.income_ticks >= CREW_INCOME_TICKS {
            member.income_ticks = 0;
            income = income.saturating_add(CREW_INCOME);
        }
    }
    if income > 0 {
        ctx.player.cash = ctx.player.cash.saturating_add(income);
        debug!(income, "crew_income");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn angle_delta_takes_the_short_way_round() {
        assert!((angle_delta(0.1, -0.1) + 0.2).abs() < 1e-5);
        assert!((angle_delta(3.0, -3.0) - (TAU - 6.0)).abs() < 1e-4);
        assert!(angle_delta(0.0, 0.0).abs() < 1e-6);
    }

    #[test]
    fn aim_error_shrinks_with_wanted_level() {
        assert!((cop_aim_error(0.0) - 0.25).abs() < 1e-6);
        assert!((cop_aim_error(5.0) - 0.10).abs() < 1e-6);
        assert!(cop_aim_error(2.0) > cop_aim_error(3.0));
    }
}
