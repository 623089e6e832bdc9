use engine::{Rect, Vec2};

use super::geometry::WorldGeometry;

/// Axis-aligned body anchored at its top-left corner.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Body {
    pub position: Vec2,
    pub size: Vec2,
}

impl Body {
    pub const fn new(position: Vec2, size: Vec2) -> Self {
        Self { position, size }
    }

    pub fn centered_at(center: Vec2, size: Vec2) -> Self {
        Self::new(center - size * 0.5, size)
    }

    pub fn rect(&self) -> Rect {
        Rect::from_position_size(self.position, self.size)
    }

    pub fn center(&self) -> Vec2 {
        self.position + self.size * 0.5
    }

    pub fn set_center(&mut self, center: Vec2) {
        self.position = center - self.size * 0.5;
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MoveOutcome {
    pub blocked_x: bool,
    pub blocked_y: bool,
}

impl MoveOutcome {
    pub fn blocked(self) -> bool {
        self.blocked_x || self.blocked_y
    }
}

/// Applies `delta` one axis at a time so a body slides along walls.
///
/// Each candidate position is clamped to the world bounds before the
/// geometry test, so an accepted position is always in bounds and never
/// overlaps a building.
pub fn move_with_collision(geometry: &WorldGeometry, body: &mut Body, delta: Vec2) -> MoveOutcome {
    let mut outcome = MoveOutcome::default();

    if delta.x != 0.0 {
        let candidate = geometry.clamp_position(body.position + Vec2::new(delta.x, 0.0), body.size);
        if geometry.rect_blocked(&Rect::from_position_size(candidate, body.size)) {
            outcome.blocked_x = true;
        } else {
            body.position = candidate;
        }
    }

    if delta.y != 0.0 {
        let candidate = geometry.clamp_position(body.position + Vec2::new(0.0, delta.y), body.size);
        if geometry.rect_blocked(&Rect::from_position_size(candidate, body.size)) {
            outcome.blocked_y = true;
        } else {
            body.position = candidate;
        }
    }

    outcome
}

pub fn move_toward(
    geometry: &WorldGeometry,
    body: &mut Body,
    target: Vec2,
    speed: f32,
) -> MoveOutcome {
    let direction = (target - body.center()).normalized_or_zero();
    move_with_collision(geometry, body, direction * speed)
}

pub fn move_away(
    geometry: &WorldGeometry,
    body: &mut Body,
    threat: Vec2,
    speed: f32,
) -> MoveOutcome {
    let direction = (body.center() - threat).normalized_or_zero();
    move_with_collision(geometry, body, direction * speed)
}

pub fn move_along_heading(
    geometry: &WorldGeometry,
    body: &mut Body,
    heading: f32,
    speed: f32,
) -> MoveOutcome {
    move_with_collision(geometry, body, Vec2::from_angle(heading) * speed)
}

/// Whole-body move used by vehicles: either the full step lands or nothing moves.
pub fn try_translate(geometry: &WorldGeometry, body: &mut Body, delta: Vec2) -> bool {
    let candidate = geometry.clamp_position(body.position + delta, body.size);
    if geometry.rect_blocked(&Rect::from_position_size(candidate, body.size)) {
        return false;
    }
    body.position = candidate;
    true
}

/// First candidate position for a body of `size` that is in bounds and clear.
pub fn first_clear_position(
    geometry: &WorldGeometry,
    size: Vec2,
    candidates: impl IntoIterator<Item = Vec2>,
) -> Option<Vec2> {
    candidates.into_iter().find(|candidate| {
        let rect = Rect::from_position_size(*candidate, size);
        geometry.bounds().contains_rect(&rect) && !geometry.rect_blocked(&rect)
    })
}
