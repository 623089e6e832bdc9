use engine::{EntityId, InputAction, InputSnapshot, Vec2};
use tracing::info;

use super::effects::spawn_particles;
use super::entities::{ParticleKind, PlayerContext};
use super::events::GameplayEvent;
use super::geometry::WorldGeometry;
use super::movement::{first_clear_position, try_translate, Body};
use super::rejection::ActionRejected;
use super::SimContext;

pub const VEHICLE_ENTER_RADIUS: f32 = 80.0;
const ACCELERATION: f32 = 0.3;
const BRAKING: f32 = 0.5;
const REVERSE_FRACTION: f32 = 0.5;
const FRICTION: f32 = 0.97;
const TURN_RATE: f32 = 0.04;
const MIN_TURN_SPEED: f32 = 0.5;
const BOUNCE: f32 = -0.5;
const STEAL_WANTED: f32 = 0.5;
const EXIT_GAP: f32 = 20.0;

pub(crate) fn enter(ctx: &mut SimContext<'_>) -> Result<EntityId, ActionRejected> {
    if !ctx.player.is_alive() {
        return Err(ActionRejected::PlayerDown);
    }
    match ctx.player.context {
        PlayerContext::InVehicle { .. } => return Err(ActionRejected::AlreadyDriving),
        PlayerContext::Inside(_) => return Err(ActionRejected::AlreadyInside),
        PlayerContext::FreeRoam => {}
    }

    let center = ctx.player.center();
    let vehicle_id = ctx
        .entities
        .vehicles
        .iter_live()
        .filter(|(_, vehicle)| !vehicle.occupied())
        .map(|(id, vehicle)| (id, vehicle.body.center().distance(center)))
        .filter(|(_, distance)| *distance < VEHICLE_ENTER_RADIUS)
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(id, _)| id)
        .ok_or(ActionRejected::NoVehicleNearby)?;

    let player_id = ctx.entities.player_id;
    let Some(vehicle) = ctx.entities.vehicles.get_mut(vehicle_id) else {
        return Err(ActionRejected::NoVehicleNearby);
    };
    vehicle.driver = Some(player_id);
    vehicle.velocity = 0.0;
    let vehicle_center = vehicle.body.center();
    let kind = vehicle.kind;

    ctx.player.context = PlayerContext::InVehicle { vehicle_id };
    ctx.player.body.set_center(vehicle_center);
    ctx.player.stats.vehicles_stolen = ctx.player.stats.vehicles_stolen.saturating_add(1);
    ctx.player.add_wanted(STEAL_WANTED);
    ctx.events.emit(GameplayEvent::VehicleEntered { vehicle_id });
    info!(vehicle = vehicle_id.0, kind = ?kind, "vehicle_entered");
    Ok(vehicle_id)
}

/// Candidate spots for a body of `size` next to a vehicle: right, left, above, below.
fn exit_position(geometry: &WorldGeometry, vehicle: &Body, size: Vec2) -> Option<Vec2> {
    let rect = vehicle.rect();
    let center = vehicle.center();
    let beside_y = center.y - size.y * 0.5;
    let beside_x = center.x - size.x * 0.5;
    first_clear_position(
        geometry,
        size,
        [
            Vec2::new(rect.right() + EXIT_GAP, beside_y),
            Vec2::new(rect.x - EXIT_GAP - size.x, beside_y),
            Vec2::new(beside_x, rect.y - EXIT_GAP - size.y),
            Vec2::new(beside_x, rect.bottom() + EXIT_GAP),
        ],
    )
}

pub(crate) fn exit(ctx: &mut SimContext<'_>) -> Result<(), ActionRejected> {
    let vehicle_id = ctx.player.vehicle_id().ok_or(ActionRejected::NotDriving)?;
    let size = ctx.player.body.size;
    if let Some(vehicle) = ctx.entities.vehicles.get_mut(vehicle_id) {
        let position =
            exit_position(ctx.geometry, &vehicle.body, size).ok_or(ActionRejected::NoClearExit)?;
        vehicle.driver = None;
        vehicle.velocity = 0.0;
        ctx.player.body.position = position;
    }
    ctx.player.context = PlayerContext::FreeRoam;
    ctx.events.emit(GameplayEvent::VehicleExited { vehicle_id });
    info!(vehicle = vehicle_id.0, "vehicle_exited");
    Ok(())
}

/// Forced exit when the driver goes down or the vehicle is destroyed. Falls
/// back to the driver's current spot when every side is blocked.
pub(crate) fn eject_player(ctx: &mut SimContext<'_>, vehicle_id: EntityId) {
    if ctx.player.vehicle_id() != Some(vehicle_id) {
        return;
    }
    let size = ctx.player.body.size;
    let mut position = ctx.geometry.clamp_position(ctx.player.body.position, size);
    if let Some(vehicle) = ctx.entities.vehicles.get_mut(vehicle_id) {
        vehicle.driver = None;
        vehicle.velocity = 0.0;
        if let Some(beside) = exit_position(ctx.geometry, &vehicle.body, size) {
            position = beside;
        }
    }
    ctx.player.body.position = position;
    ctx.player.context = PlayerContext::FreeRoam;
    ctx.events.emit(GameplayEvent::VehicleExited { vehicle_id });
    info!(vehicle = vehicle_id.0, "vehicle_ejected");
}

fn axis(input: &InputSnapshot, negative: InputAction, positive: InputAction) -> f32 {
    let mut value = 0.0;
    if input.is_down(positive) {
        value += 1.0;
    }
    if input.is_down(negative) {
        value -= 1.0;
    }
    value
}

pub(crate) fn drive(ctx: &mut SimContext<'_>, input: &InputSnapshot) {
    let Some(vehicle_id) = ctx.player.vehicle_id() else {
        return;
    };
    let Some(vehicle) = ctx.entities.vehicles.get_mut(vehicle_id) else {
        ctx.player.context = PlayerContext::FreeRoam;
        return;
    };

    let throttle = axis(input, InputAction::MoveDown, InputAction::MoveUp);
    let steer = axis(input, InputAction::MoveLeft, InputAction::MoveRight);
    let max_speed = vehicle.max_speed;

    if throttle > 0.0 {
        vehicle.velocity = (vehicle.velocity + ACCELERATION).min(max_speed);
    } else if throttle < 0.0 {
        vehicle.velocity = (vehicle.velocity - BRAKING).max(-max_speed * REVERSE_FRACTION);
    } else {
        vehicle.velocity *= FRICTION;
    }
    if vehicle.velocity.abs() > MIN_TURN_SPEED {
        vehicle.heading += steer * TURN_RATE * (vehicle.velocity / max_speed);
    }

    let delta = Vec2::from_angle(vehicle.heading) * vehicle.velocity;
    let bounced = !try_translate(ctx.geometry, &mut vehicle.body, delta);
    if bounced {
        vehicle.velocity *= BOUNCE;
    }
    let center = vehicle.body.center();
    let heading = vehicle.heading;

    if bounced {
        spawn_particles(ctx.entities, ctx.rng, ParticleKind::Spark, center, 3);
    }
    ctx.player.body.set_center(center);
    ctx.player.facing = heading;
}
