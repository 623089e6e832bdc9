use super::Vec2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputAction {
    MoveUp,
    MoveDown,
    MoveLeft,
    MoveRight,
    Fire,
    Melee,
    Interact,
    ToggleVehicle,
    Confirm,
    Cancel,
    MenuUp,
    MenuDown,
    NextWeapon,
    PrevWeapon,
    AbandonMission,
    Quit,
}

const ACTION_COUNT: usize = 16;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct ActionStates {
    down: [bool; ACTION_COUNT],
}

impl ActionStates {
    pub(crate) fn set(&mut self, action: InputAction, is_down: bool) {
        self.down[action.index()] = is_down;
    }

    pub(crate) fn is_down(&self, action: InputAction) -> bool {
        self.down[action.index()]
    }
}

impl InputAction {
    pub const ALL: [InputAction; ACTION_COUNT] = [
        InputAction::MoveUp,
        InputAction::MoveDown,
        InputAction::MoveLeft,
        InputAction::MoveRight,
        InputAction::Fire,
        InputAction::Melee,
        InputAction::Interact,
        InputAction::ToggleVehicle,
        InputAction::Confirm,
        InputAction::Cancel,
        InputAction::MenuUp,
        InputAction::MenuDown,
        InputAction::NextWeapon,
        InputAction::PrevWeapon,
        InputAction::AbandonMission,
        InputAction::Quit,
    ];

    const fn index(self) -> usize {
        match self {
            InputAction::MoveUp => 0,
            InputAction::MoveDown => 1,
            InputAction::MoveLeft => 2,
            InputAction::MoveRight => 3,
            InputAction::Fire => 4,
            InputAction::Melee => 5,
            InputAction::Interact => 6,
            InputAction::ToggleVehicle => 7,
            InputAction::Confirm => 8,
            InputAction::Cancel => 9,
            InputAction::MenuUp => 10,
            InputAction::MenuDown => 11,
            InputAction::NextWeapon => 12,
            InputAction::PrevWeapon => 13,
            InputAction::AbandonMission => 14,
            InputAction::Quit => 15,
        }
    }
}

/// Per-tick input intent. `held` mirrors the current key state, `pressed`
/// carries edges that fired since the previous tick and must not repeat.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct InputSnapshot {
    quit_requested: bool,
    held: ActionStates,
    pressed: ActionStates,
    aim_direction: Option<Vec2>,
    weapon_slot: Option<u8>,
    mission_choice: Option<usize>,
}

impl InputSnapshot {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn quit_requested(&self) -> bool {
        self.quit_requested || self.held.is_down(InputAction::Quit)
    }

    pub fn is_down(&self, action: InputAction) -> bool {
        self.held.is_down(action)
    }

    pub fn was_pressed(&self, action: InputAction) -> bool {
        self.pressed.is_down(action)
    }

    pub fn aim_direction(&self) -> Option<Vec2> {
        self.aim_direction
    }

    pub fn weapon_slot(&self) -> Option<u8> {
        self.weapon_slot
    }

    pub fn mission_choice(&self) -> Option<usize> {
        self.mission_choice
    }

    /// Unit-length walking direction from the held move actions, zero when idle.
    pub fn movement_vector(&self) -> Vec2 {
        let mut x = 0.0;
        let mut y = 0.0;
        if self.is_down(InputAction::MoveLeft) {
            x -= 1.0;
        }
        if self.is_down(InputAction::MoveRight) {
            x += 1.0;
        }
        if self.is_down(InputAction::MoveUp) {
            y -= 1.0;
        }
        if self.is_down(InputAction::MoveDown) {
            y += 1.0;
        }
        Vec2 { x, y }.normalized_or_zero()
    }

    pub fn with_quit_requested(mut self, quit_requested: bool) -> Self {
        self.quit_requested = quit_requested;
        self
    }

    pub fn with_action_down(mut self, action: InputAction, is_down: bool) -> Self {
        self.held.set(action, is_down);
        self
    }

    pub fn with_action_pressed(mut self, action: InputAction) -> Self {
        self.pressed.set(action, true);
        self
    }

    pub fn with_aim_direction(mut self, aim_direction: Option<Vec2>) -> Self {
        self.aim_direction = aim_direction;
        self
    }

    pub fn with_weapon_slot(mut self, weapon_slot: Option<u8>) -> Self {
        self.weapon_slot = weapon_slot;
        self
    }

    pub fn with_mission_choice(mut self, mission_choice: Option<usize>) -> Self {
        self.mission_choice = mission_choice;
        self
    }
}
