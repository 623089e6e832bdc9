//! Initial world population and the per-tick floors that keep the streets
//! stocked: cops scale with the wanted level, everything else has a fixed
//! minimum. At most one entity of each kind spawns per tick.

use std::f32::consts::TAU;

use engine::{Rect, Vec2};
use rand::Rng;
use tracing::{debug, info};

use crate::config::SimConfig;

use super::effects::spawn_text;
use super::entities::{
    Civilian, Cop, CrewMember, Dealer, EntityRegistry, GangMember, HealthPickup, PoliceCar,
    Vehicle, CIVILIAN_SIZE, COP_SIZE, CREW_SIZE, DEALER_SIZE, GANG_MEMBER_SIZE, POLICE_CAR_SIZE,
};
use super::geometry::WorldGeometry;
use super::types::{Gang, VehicleKind};
use super::SimContext;

const SPAWN_ATTEMPTS: u32 = 50;
const TERRITORY_INSET: f32 = 100.0;
const RESTOCK_TICKS: u32 = 1800;
const PICKUP_RADIUS: f32 = 40.0;
const CREW_SPAWN_OFFSET: f32 = 70.0;

/// Gang home areas: red to the north-west, blue to the north-east, green in
/// the south-middle.
pub fn territory(gang: Gang, width: f32, height: f32) -> Rect {
    let third = width / 3.0;
    let half = height / 2.0;
    match gang {
        Gang::Red => Rect::new(0.0, 0.0, third, half),
        Gang::Blue => Rect::new(2.0 * third, 0.0, third, half),
        Gang::Green => Rect::new(third, half, third, half),
    }
}

fn inset(rect: Rect, by: f32) -> Rect {
    if rect.w <= by * 2.0 || rect.h <= by * 2.0 {
        return rect;
    }
    Rect::new(rect.x + by, rect.y + by, rect.w - by * 2.0, rect.h - by * 2.0)
}

fn span(rng: &mut impl Rng, low: f32, high: f32) -> f32 {
    if high > low {
        rng.gen_range(low..high)
    } else {
        low
    }
}

fn fits(geometry: &WorldGeometry, position: Vec2, size: Vec2) -> bool {
    let rect = Rect::from_position_size(position, size);
    geometry.bounds().contains_rect(&rect) && !geometry.rect_blocked(&rect)
}

/// Random top-left position inside `area` whose body is clear of buildings
/// and whose center passes `accept`.
fn random_clear_position(
    geometry: &WorldGeometry,
    size: Vec2,
    area: Rect,
    rng: &mut impl Rng,
    accept: impl Fn(Vec2) -> bool,
) -> Option<Vec2> {
    (0..SPAWN_ATTEMPTS).find_map(|_| {
        let position = Vec2::new(
            span(rng, area.x, area.right() - size.x),
            span(rng, area.y, area.bottom() - size.y),
        );
        (fits(geometry, position, size) && accept(position + size * 0.5)).then_some(position)
    })
}

/// Random position on a ring around `center`.
fn ring_position(
    geometry: &WorldGeometry,
    size: Vec2,
    center: Vec2,
    min_distance: f32,
    max_distance: f32,
    rng: &mut impl Rng,
) -> Option<Vec2> {
    (0..SPAWN_ATTEMPTS).find_map(|_| {
        let angle = rng.gen_range(0.0..TAU);
        let distance = if max_distance > min_distance {
            rng.gen_range(min_distance..=max_distance)
        } else {
            min_distance
        };
        let position = center + Vec2::from_angle(angle) * distance - size * 0.5;
        fits(geometry, position, size).then_some(position)
    })
}

fn new_dealer(position: Vec2, rng: &mut impl Rng) -> Dealer {
    let stock = rng.gen_range(5..=15);
    Dealer {
        body: super::movement::Body::new(position, DEALER_SIZE),
        stock,
        stock_cap: stock,
        buy_price: rng.gen_range(30..=60),
        sell_price: rng.gen_range(80..=150),
        cash: rng.gen_range(200..=500),
        restock_ticks: 0,
    }
}

fn random_vehicle(position: Vec2, rng: &mut impl Rng) -> Vehicle {
    let kind = VehicleKind::ALL[rng.gen_range(0..VehicleKind::ALL.len())];
    Vehicle::new(position, kind, rng.gen_range(0.0..TAU))
}

pub(crate) fn populate_initial(
    config: &SimConfig,
    geometry: &WorldGeometry,
    entities: &mut EntityRegistry,
    player_center: Vec2,
    rng: &mut impl Rng,
) {
    let population = &config.population;
    let bounds = geometry.bounds();
    let away = |center: Vec2| center.distance(player_center) >= population.spawn_min_distance;
    let anywhere = |_: Vec2| true;

    for _ in 0..population.initial_cops {
        if let Some(position) = random_clear_position(geometry, COP_SIZE, bounds, rng, away) {
            let heading = rng.gen_range(0.0..TAU);
            entities.cops.spawn(&mut entities.ids, Cop::new(position, heading, false));
        }
    }
    for _ in 0..population.initial_civilians {
        if let Some(position) =
            random_clear_position(geometry, CIVILIAN_SIZE, bounds, rng, anywhere)
        {
            let heading = rng.gen_range(0.0..TAU);
            let wander = rng.gen_range(60..=180);
            entities
                .civilians
                .spawn(&mut entities.ids, Civilian::new(position, heading, wander));
        }
    }
    for _ in 0..population.initial_dealers {
        if let Some(position) =
            random_clear_position(geometry, DEALER_SIZE, bounds, rng, anywhere)
        {
            let dealer = new_dealer(position, rng);
            entities.dealers.spawn(&mut entities.ids, dealer);
        }
    }
    for _ in 0..population.initial_vehicles {
        let size = Vec2::new(100.0, 55.0);
        if let Some(position) = random_clear_position(geometry, size, bounds, rng, anywhere) {
            let vehicle = random_vehicle(position, rng);
            entities.vehicles.spawn(&mut entities.ids, vehicle);
        }
    }
    for _ in 0..population.initial_police_cars {
        if let Some(position) =
            random_clear_position(geometry, POLICE_CAR_SIZE, bounds, rng, away)
        {
            let heading = rng.gen_range(0.0..TAU);
            entities
                .police_cars
                .spawn(&mut entities.ids, PoliceCar::new(position, heading));
        }
    }
    for gang in Gang::ALL {
        let area = inset(territory(gang, bounds.w, bounds.h), TERRITORY_INSET);
        let count = rng.gen_range(population.gang_members_min..=population.gang_members_max);
        for _ in 0..count {
            if let Some(position) =
                random_clear_position(geometry, GANG_MEMBER_SIZE, area, rng, anywhere)
            {
                let heading = rng.gen_range(0.0..TAU);
                entities
                    .gang_members
                    .spawn(&mut entities.ids, GangMember::new(position, gang, heading));
            }
        }
    }
    for index in 0..population.initial_crew {
        let offset = CREW_SPAWN_OFFSET * (index as f32 + 1.0);
        let candidates = [
            Vec2::new(offset, 0.0),
            Vec2::new(-offset, 0.0),
            Vec2::new(0.0, offset),
            Vec2::new(0.0, -offset),
        ]
        .map(|delta| player_center + delta - CREW_SIZE * 0.5);
        if let Some(position) =
            super::movement::first_clear_position(geometry, CREW_SIZE, candidates)
        {
            entities.crew.spawn(&mut entities.ids, CrewMember::new(position));
        }
    }

    info!(
        cops = entities.cops.live_count(),
        civilians = entities.civilians.live_count(),
        dealers = entities.dealers.live_count(),
        vehicles = entities.vehicles.live_count(),
        police_cars = entities.police_cars.live_count(),
        gang_members = entities.gang_members.live_count(),
        crew = entities.crew.live_count(),
        "population_seeded"
    );
}

/// Population system: floors, dealer restock and health pickups.
pub(crate) fn update(ctx: &mut SimContext<'_>) {
    maintain_floors(ctx);
    restock_dealers(ctx);
    maybe_spawn_pickup(ctx);
    collect_pickups(ctx);
}

fn maintain_floors(ctx: &mut SimContext<'_>) {
    let population = &ctx.config.population;
    let geometry = ctx.geometry;
    let bounds = geometry.bounds();
    let player_center = ctx.player.center();
    let wanted = ctx.player.wanted();
    let min_distance = population.spawn_min_distance;
    let away = |center: Vec2| center.distance(player_center) >= min_distance;
    let entities = &mut *ctx.entities;
    let rng = &mut *ctx.rng;

    if entities.cops.live_count() < population.cop_floor(wanted) {
        let spawned = ring_position(
            geometry,
            COP_SIZE,
            player_center,
            population.cop_spawn_min_distance,
            population.cop_spawn_max_distance,
            rng,
        );
        if let Some(position) = spawned {
            let alert = wanted >= ctx.config.thresholds.cop_spawn_alert;
            let heading = rng.gen_range(0.0..TAU);
            let id = entities.cops.spawn(&mut entities.ids, Cop::new(position, heading, alert));
            debug!(cop = id.0, alert, wanted, "cop_reinforcement");
        }
    }

    if entities.civilians.live_count() < population.min_civilians as usize {
        if let Some(position) = random_clear_position(geometry, CIVILIAN_SIZE, bounds, rng, away) {
            let heading = rng.gen_range(0.0..TAU);
            let wander = rng.gen_range(60..=180);
            entities
                .civilians
                .spawn(&mut entities.ids, Civilian::new(position, heading, wander));
        }
    }

    for gang in Gang::ALL {
        if entities.gang_member_count(gang) >= population.min_gang_members_per_gang as usize {
            continue;
        }
        let area = inset(territory(gang, bounds.w, bounds.h), TERRITORY_INSET);
        if let Some(position) = random_clear_position(geometry, GANG_MEMBER_SIZE, area, rng, away) {
            let heading = rng.gen_range(0.0..TAU);
            entities
                .gang_members
                .spawn(&mut entities.ids, GangMember::new(position, gang, heading));
            debug!(gang = ?gang, "gang_reinforcement");
        }
    }

    if entities.vehicles.live_count() < population.min_vehicles as usize {
        if let Some(position) =
            random_clear_position(geometry, Vec2::new(100.0, 55.0), bounds, rng, away)
        {
            let vehicle = random_vehicle(position, rng);
            entities.vehicles.spawn(&mut entities.ids, vehicle);
        }
    }

    if entities.dealers.live_count() < population.min_dealers as usize {
        if let Some(position) = random_clear_position(geometry, DEALER_SIZE, bounds, rng, away) {
            let dealer = new_dealer(position, rng);
            entities.dealers.spawn(&mut entities.ids, dealer);
        }
    }
}

fn restock_dealers(ctx: &mut SimContext<'_>) {
    for (_, dealer) in ctx.entities.dealers.iter_mut() {
        dealer.restock_ticks += 1;
        if dealer.restock_ticks < RESTOCK_TICKS {
            continue;
        }
        dealer.restock_ticks = 0;
        if dealer.stock < dealer.stock_cap {
            dealer.stock += 1;
        }
    }
}

fn maybe_spawn_pickup(ctx: &mut SimContext<'_>) {
    let population = &ctx.config.population;
    if ctx.entities.pickups.live_count() >= population.max_health_pickups as usize {
        return;
    }
    if !ctx.rng.gen_bool(population.health_pickup_chance) {
        return;
    }
    let bounds = ctx.geometry.bounds();
    let point = Vec2::new(2.0, 2.0);
    if let Some(position) = random_clear_position(ctx.geometry, point, bounds, ctx.rng, |_| true) {
        let amount = ctx.rng.gen_range(20..=40);
        let entities = &mut *ctx.entities;
        entities.pickups.spawn(
            &mut entities.ids,
            HealthPickup {
                position: position + point * 0.5,
                amount,
            },
        );
    }
}

fn collect_pickups(ctx: &mut SimContext<'_>) {
    if !ctx.player.is_targetable() || ctx.player.health() >= ctx.player.max_health() {
        return;
    }
    let center = ctx.player.center();
    let reachable = ctx
        .entities
        .pickups
        .iter_live()
        .find(|(_, pickup)| pickup.position.distance(center) < PICKUP_RADIUS)
        .map(|(id, pickup)| (id, pickup.amount, pickup.position));
    let Some((id, amount, at)) = reachable else {
        return;
    };
    if ctx.entities.pickups.despawn(id) {
        ctx.player.heal(amount);
        spawn_text(ctx.entities, format!("+{amount} HP"), at);
        debug!(amount, health = ctx.player.health(), "pickup_collected");
    }
}
