use engine::Vec2;
use rand::Rng;

use super::entities::{BloodSplat, EntityRegistry, FloatingText, Particle, ParticleKind};
use super::SimContext;

const FLOATING_TEXT_TICKS: u32 = 60;
const FLOATING_TEXT_RISE: f32 = 1.0;
const BLOOD_DRAG: f32 = 0.9;

impl ParticleKind {
    /// Vertical acceleration per tick; smoke drifts up, debris falls.
    fn gravity(self) -> f32 {
        match self {
            ParticleKind::Smoke => -0.05,
            ParticleKind::Shell => 0.2,
            ParticleKind::Spark | ParticleKind::Explosion => 0.3,
        }
    }

    fn launch(self, rng: &mut impl Rng) -> (f32, u32) {
        match self {
            ParticleKind::Spark => (rng.gen_range(2.0..5.0), rng.gen_range(10..=20)),
            ParticleKind::Explosion => (rng.gen_range(2.0..8.0), rng.gen_range(30..=50)),
            ParticleKind::Smoke => (rng.gen_range(0.5..2.0), rng.gen_range(60..=90)),
            ParticleKind::Shell => (rng.gen_range(1.0..3.0), 30),
        }
    }
}

pub(crate) fn spawn_particles(
    entities: &mut EntityRegistry,
    rng: &mut impl Rng,
    kind: ParticleKind,
    at: Vec2,
    count: u32,
) {
    for _ in 0..count {
        let (speed, ttl_ticks) = kind.launch(rng);
        let heading = rng.gen_range(0.0..std::f32::consts::TAU);
        entities.particles.spawn(
            &mut entities.ids,
            Particle {
                kind,
                position: at,
                velocity: Vec2::from_angle(heading) * speed,
                ttl_ticks,
            },
        );
    }
}

pub(crate) fn spawn_blood(entities: &mut EntityRegistry, rng: &mut impl Rng, at: Vec2, count: u32) {
    for _ in 0..count {
        let velocity = Vec2::new(rng.gen_range(-2.0..2.0), rng.gen_range(-2.0..2.0));
        entities.blood.spawn(
            &mut entities.ids,
            BloodSplat {
                position: at,
                velocity,
                ttl_ticks: rng.gen_range(120..=240),
            },
        );
    }
}

pub(crate) fn spawn_text(entities: &mut EntityRegistry, text: String, at: Vec2) {
    entities.floating_texts.spawn(
        &mut entities.ids,
        FloatingText {
            text,
            position: at,
            ttl_ticks: FLOATING_TEXT_TICKS,
        },
    );
}

/// Ages cosmetic objects and the player's short timers.
pub(crate) fn update(ctx: &mut SimContext<'_>) {
    let entities = &mut *ctx.entities;

    let mut expired = Vec::new();
    for (id, particle) in entities.particles.iter_mut() {
        particle.position += particle.velocity;
        particle.velocity.y += particle.kind.gravity();
        particle.ttl_ticks = particle.ttl_ticks.saturating_sub(1);
        if particle.ttl_ticks == 0 {
            expired.push(id);
        }
    }
    for id in expired.drain(..) {
        entities.particles.despawn(id);
    }

    for (id, splat) in entities.blood.iter_mut() {
        splat.position += splat.velocity;
        splat.velocity = splat.velocity * BLOOD_DRAG;
        splat.ttl_ticks = splat.ttl_ticks.saturating_sub(1);
        if splat.ttl_ticks == 0 {
            expired.push(id);
        }
    }
    for id in expired.drain(..) {
        entities.blood.despawn(id);
    }

    for (id, text) in entities.floating_texts.iter_mut() {
        text.position.y -= FLOATING_TEXT_RISE;
        text.ttl_ticks = text.ttl_ticks.saturating_sub(1);
        if text.ttl_ticks == 0 {
            expired.push(id);
        }
    }
    for id in expired.drain(..) {
        entities.floating_texts.despawn(id);
    }

    let player = &mut *ctx.player;
    player.loadout.cooldown_ticks = player.loadout.cooldown_ticks.saturating_sub(1);
    player.damage_flash_ticks = player.damage_flash_ticks.saturating_sub(1);
    player.screen_shake_ticks = player.screen_shake_ticks.saturating_sub(1);
    if player.is_alive() {
        player.add_wanted(-ctx.config.thresholds.decay_per_tick);
    }
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;

    #[test]
    fn particles_expire_after_their_lifetime() {
        let mut entities = EntityRegistry::new();
        let mut rng = StdRng::seed_from_u64(1);
        spawn_particles(&mut entities, &mut rng, ParticleKind::Spark, Vec2::ZERO, 4);
        entities.apply_pending();
        assert_eq!(entities.particles.len(), 4);
        assert!(entities
            .particles
            .iter()
            .all(|(_, particle)| (10..=20).contains(&particle.ttl_ticks)));
    }

    #[test]
    fn smoke_rises_and_sparks_fall() {
        assert!(ParticleKind::Smoke.gravity() < 0.0);
        assert!(ParticleKind::Spark.gravity() > 0.0);
        assert!(ParticleKind::Shell.gravity() < ParticleKind::Explosion.gravity());
    }
}
