use std::ops::{Add, AddAssign, Mul, Sub, SubAssign};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };

    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn from_angle(radians: f32) -> Self {
        Self {
            x: radians.cos(),
            y: radians.sin(),
        }
    }

    pub fn length(self) -> f32 {
        self.x.hypot(self.y)
    }

    pub fn distance(self, other: Vec2) -> f32 {
        (other - self).length()
    }

    pub fn angle_to(self, other: Vec2) -> f32 {
        let delta = other - self;
        delta.y.atan2(delta.x)
    }

    pub fn normalized_or_zero(self) -> Vec2 {
        let length = self.length();
        if length <= f32::EPSILON || !length.is_finite() {
            Vec2::ZERO
        } else {
            Vec2 {
                x: self.x / length,
                y: self.y / length,
            }
        }
    }

    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

impl Add for Vec2 {
    type Output = Vec2;

    fn add(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl AddAssign for Vec2 {
    fn add_assign(&mut self, rhs: Vec2) {
        self.x += rhs.x;
        self.y += rhs.y;
    }
}

impl Sub for Vec2 {
    type Output = Vec2;

    fn sub(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl SubAssign for Vec2 {
    fn sub_assign(&mut self, rhs: Vec2) {
        self.x -= rhs.x;
        self.y -= rhs.y;
    }
}

impl Mul<f32> for Vec2 {
    type Output = Vec2;

    fn mul(self, rhs: f32) -> Vec2 {
        Vec2::new(self.x * rhs, self.y * rhs)
    }
}

/// Axis-aligned rectangle anchored at its top-left corner.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl Rect {
    pub const fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self { x, y, w, h }
    }

    pub fn from_position_size(position: Vec2, size: Vec2) -> Self {
        Self::new(position.x, position.y, size.x, size.y)
    }

    pub fn from_center(center: Vec2, half_extents: Vec2) -> Self {
        Self::new(
            center.x - half_extents.x,
            center.y - half_extents.y,
            half_extents.x * 2.0,
            half_extents.y * 2.0,
        )
    }

    pub fn right(&self) -> f32 {
        self.x + self.w
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.h
    }

    pub fn center(&self) -> Vec2 {
        Vec2::new(self.x + self.w * 0.5, self.y + self.h * 0.5)
    }

    /// Touching edges do not count as an overlap.
    pub fn intersects(&self, other: &Rect) -> bool {
        self.x < other.right()
            && other.x < self.right()
            && self.y < other.bottom()
            && other.y < self.bottom()
    }

    pub fn contains_point(&self, point: Vec2) -> bool {
        point.x >= self.x && point.x < self.right() && point.y >= self.y && point.y < self.bottom()
    }

    pub fn contains_rect(&self, other: &Rect) -> bool {
        other.x >= self.x
            && other.y >= self.y
            && other.right() <= self.right()
            && other.bottom() <= self.bottom()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId(pub u64);

#[derive(Debug, Default, Clone)]
pub struct EntityIdAllocator {
    next: u64,
}

impl EntityIdAllocator {
    pub fn allocate(&mut self) -> EntityId {
        let id = EntityId(self.next);
        self.next = self.next.saturating_add(1);
        id
    }
}

#[derive(Debug, Clone)]
struct StoredEntity<T> {
    id: EntityId,
    value: T,
}

/// Homogeneous entity collection with deferred structural changes.
///
/// `spawn` and `despawn` only queue work; `apply_pending` is the single safe
/// point where the live list changes. That keeps iteration stable while
/// systems remove entities mid-pass, and makes a second despawn of the same
/// id a no-op.
#[derive(Debug, Clone)]
pub struct EntityStore<T> {
    entities: Vec<StoredEntity<T>>,
    pending_spawns: Vec<StoredEntity<T>>,
    pending_despawns: Vec<EntityId>,
}

impl<T> Default for EntityStore<T> {
    fn default() -> Self {
        Self {
            entities: Vec::new(),
            pending_spawns: Vec::new(),
            pending_despawns: Vec::new(),
        }
    }
}

impl<T> EntityStore<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn spawn(&mut self, allocator: &mut EntityIdAllocator, value: T) -> EntityId {
        let id = allocator.allocate();
        self.pending_spawns.push(StoredEntity { id, value });
        id
    }

    /// Returns false when the id is unknown or already queued for removal.
    pub fn despawn(&mut self, id: EntityId) -> bool {
        if self.pending_despawns.contains(&id) {
            return false;
        }
        let exists_now = self.entities.iter().any(|entity| entity.id == id);
        let pending_spawn = self.pending_spawns.iter().any(|entity| entity.id == id);
        if !exists_now && !pending_spawn {
            return false;
        }
        self.pending_despawns.push(id);
        true
    }

    /// Applied and not queued for removal.
    pub fn is_live(&self, id: EntityId) -> bool {
        !self.pending_despawns.contains(&id) && self.entities.iter().any(|entity| entity.id == id)
    }

    pub fn apply_pending(&mut self) {
        if !self.pending_despawns.is_empty() {
            self.pending_despawns.sort();
            self.pending_despawns.dedup();
            let pending = &self.pending_despawns;
            self.entities
                .retain(|entity| pending.binary_search(&entity.id).is_err());
            self.pending_spawns
                .retain(|entity| pending.binary_search(&entity.id).is_err());
            self.pending_despawns.clear();
        }

        self.entities.append(&mut self.pending_spawns);
    }

    pub fn clear(&mut self) {
        self.entities.clear();
        self.pending_spawns.clear();
        self.pending_despawns.clear();
    }

    /// Applied entities, including ones queued for removal this tick.
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Population as it will stand after the next `apply_pending`.
    pub fn live_count(&self) -> usize {
        let removed_applied = self
            .entities
            .iter()
            .filter(|entity| self.pending_despawns.contains(&entity.id))
            .count();
        let removed_pending = self
            .pending_spawns
            .iter()
            .filter(|entity| self.pending_despawns.contains(&entity.id))
            .count();
        self.entities.len() - removed_applied + self.pending_spawns.len() - removed_pending
    }

    pub fn get(&self, id: EntityId) -> Option<&T> {
        self.entities
            .iter()
            .find(|entity| entity.id == id)
            .map(|entity| &entity.value)
    }

    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut T> {
        self.entities
            .iter_mut()
            .find(|entity| entity.id == id)
            .map(|entity| &mut entity.value)
    }

    /// Snapshot of applied ids, in spawn order.
    pub fn ids(&self) -> Vec<EntityId> {
        self.entities.iter().map(|entity| entity.id).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (EntityId, &T)> {
        self.entities.iter().map(|entity| (entity.id, &entity.value))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (EntityId, &mut T)> {
        self.entities
            .iter_mut()
            .map(|entity| (entity.id, &mut entity.value))
    }

    /// Applied entities that are not queued for removal.
    pub fn iter_live(&self) -> impl Iterator<Item = (EntityId, &T)> {
        let pending = &self.pending_despawns;
        self.entities
            .iter()
            .filter(move |entity| !pending.contains(&entity.id))
            .map(|entity| (entity.id, &entity.value))
    }

    pub fn pending_spawns(&self) -> impl Iterator<Item = (EntityId, &T)> {
        self.pending_spawns
            .iter()
            .map(|entity| (entity.id, &entity.value))
    }
}
