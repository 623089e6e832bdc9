use engine::{InputAction, InputSnapshot, Vec2};

use super::entities::{LifeState, PlayerContext};
use super::movement::move_with_collision;
use super::rejection::ActionRejected;
use super::types::Weapon;
use super::{ai, combat, effects, note_rejection, population, vehicles, venues};
use super::{GameState, GameplaySystemId, SimContext};

impl GameState {
    pub(super) fn run_system(&mut self, system_id: GameplaySystemId, input: &InputSnapshot) {
        match system_id {
            GameplaySystemId::InputIntent => self.input_intent(input),
            GameplaySystemId::Movement => move_player(&mut self.context(), input),
            GameplaySystemId::AI => ai::update(&mut self.context()),
            GameplaySystemId::CombatResolution => combat::update_projectiles(&mut self.context()),
            GameplaySystemId::Population => population::update(&mut self.context()),
            GameplaySystemId::Missions => self.update_missions(),
            GameplaySystemId::Interaction => venues::update(&mut self.context()),
            GameplaySystemId::Effects => effects::update(&mut self.context()),
            GameplaySystemId::Cleanup => self.entities.apply_pending(),
        }
    }

    fn input_intent(&mut self, input: &InputSnapshot) {
        if let LifeState::Down { respawn_ticks } = self.player.life {
            let remaining = respawn_ticks.saturating_sub(1);
            if remaining == 0 {
                self.respawn_player();
            } else {
                self.player.life = LifeState::Down {
                    respawn_ticks: remaining,
                };
            }
            return;
        }

        if let Some(index) = input.mission_choice() {
            note_rejection("start_mission", self.start_mission(index));
        }
        if input.was_pressed(InputAction::AbandonMission) {
            note_rejection("abandon_mission", self.abandon_mission());
        }

        let mut ctx = self.context();
        if ctx.player.is_inside() {
            venues::handle_input(&mut ctx, input);
            return;
        }
        street_input(&mut ctx, input);
    }

    fn update_missions(&mut self) {
        let counters = self.mission_counters();
        if let Some(outcome) = self.missions.update(&counters) {
            self.apply_mission_outcome(outcome);
        }
        self.check_win_condition();
    }
}

fn select_weapon(ctx: &mut SimContext<'_>, slot: u8) -> Result<(), ActionRejected> {
    let weapon = Weapon::from_slot(slot).ok_or(ActionRejected::WrongContext)?;
    if ctx.player.loadout.select(weapon) {
        Ok(())
    } else {
        Err(ActionRejected::WeaponNotOwned(weapon))
    }
}

fn street_input(ctx: &mut SimContext<'_>, input: &InputSnapshot) {
    if let Some(slot) = input.weapon_slot() {
        note_rejection("select_weapon", select_weapon(ctx, slot));
    }
    if input.was_pressed(InputAction::NextWeapon) {
        ctx.player.loadout.cycle(1);
    }
    if input.was_pressed(InputAction::PrevWeapon) {
        ctx.player.loadout.cycle(-1);
    }

    if input.was_pressed(InputAction::Interact) {
        note_rejection("enter_venue", venues::enter(ctx));
    } else if input.was_pressed(InputAction::ToggleVehicle) {
        if ctx.player.vehicle_id().is_some() {
            note_rejection("exit_vehicle", vehicles::exit(ctx));
        } else {
            note_rejection("enter_vehicle", vehicles::enter(ctx));
        }
    }
    if ctx.player.is_inside() {
        return;
    }

    if input.was_pressed(InputAction::Melee) {
        note_rejection("melee", combat::melee(ctx));
    }
    if input.is_down(InputAction::Fire) {
        match combat::fire(ctx, input.aim_direction()) {
            Err(ActionRejected::WeaponCoolingDown) => {}
            result => note_rejection("fire", result),
        }
    }
}

fn move_player(ctx: &mut SimContext<'_>, input: &InputSnapshot) {
    if !ctx.player.is_alive() {
        return;
    }
    match ctx.player.context {
        PlayerContext::FreeRoam => {
            let direction = input.movement_vector();
            if direction == Vec2::ZERO {
                return;
            }
            let speed = ctx.player.speed();
            move_with_collision(ctx.geometry, &mut ctx.player.body, direction * speed);
            ctx.player.facing = direction.y.atan2(direction.x);
        }
        PlayerContext::InVehicle { .. } => vehicles::drive(ctx, input),
        PlayerContext::Inside(_) => {}
    }
}
