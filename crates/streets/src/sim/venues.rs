//! Bounded interaction contexts the player can be inside of: the crafting
//! and rhythm minigames, a street dealer's trade menu, and the shop menus.
//!
//! While the player is inside, open-world AI, combat and population are
//! suspended; only input and the per-tick minigame clocks advance here.

use engine::{EntityId, InputAction, InputSnapshot, Vec2};
use rand::Rng;
use tracing::{debug, info};

use crate::persistence::SaveSnapshot;

use super::entities::{CrewMember, Player, PlayerContext, VenueVisit, CREW_SIZE};
use super::events::GameplayEvent;
use super::geometry::VENUE_INTERACTION_RADIUS;
use super::movement::first_clear_position;
use super::rejection::ActionRejected;
use super::types::{Direction, DrugKind, VenueKind, Weapon};
use super::{note_rejection, SimContext};

pub const CRAFT_STAGES: u32 = 3;
pub const CRAFT_BATCH: u32 = 3;
const CRAFT_START_ZONE: f32 = 0.15;
const CRAFT_START_SPEED: f32 = 0.012;
const CRAFT_MIN_ZONE: f32 = 0.08;
const CRAFT_ZONE_SHRINK: f32 = 0.02;
const CRAFT_SPEED_STEP: f32 = 0.004;

pub const RHYTHM_SEQUENCE_LEN: usize = 8;
pub const RHYTHM_KEY_WINDOW_TICKS: u32 = 120;
pub const RHYTHM_BASE_TARGET: u32 = 400;
pub const RHYTHM_TARGET_PER_CREW: u32 = 100;
const RHYTHM_POINTS_PER_COMBO: u32 = 50;
const RHYTHM_COMBO_CAP: u32 = 10;
const RECRUIT_BASE_CASH: u32 = 100;
const RECRUIT_CASH_PER_COMBO: u32 = 10;

const SAFE_HOUSE_HEAL_PRICE: u32 = 200;
const SAFE_HOUSE_WANTED_RELIEF: f32 = 2.0;
const VENDOR_MENU_LEN: usize = 2;
const SAFE_HOUSE_MENU_LEN: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShopItem {
    Weapon { weapon: Weapon, price: u32, ammo: u32 },
    Ammo { price: u32, amount: u32 },
    Rockets { price: u32, amount: u32 },
}

pub const WEAPON_SHOP_ITEMS: [ShopItem; 7] = [
    ShopItem::Weapon { weapon: Weapon::Pistol, price: 200, ammo: 30 },
    ShopItem::Weapon { weapon: Weapon::Shotgun, price: 500, ammo: 20 },
    ShopItem::Weapon { weapon: Weapon::Uzi, price: 800, ammo: 50 },
    ShopItem::Weapon { weapon: Weapon::Rifle, price: 1200, ammo: 15 },
    ShopItem::Weapon { weapon: Weapon::RocketLauncher, price: 2000, ammo: 3 },
    ShopItem::Ammo { price: 100, amount: 30 },
    ShopItem::Rockets { price: 300, amount: 3 },
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upgrade {
    MaxHealth,
    Speed,
    Armor,
    Damage,
}

impl Upgrade {
    pub const ALL: [Upgrade; 4] = [
        Upgrade::MaxHealth,
        Upgrade::Speed,
        Upgrade::Armor,
        Upgrade::Damage,
    ];

    pub const fn price(self) -> u32 {
        match self {
            Upgrade::MaxHealth => 500,
            Upgrade::Speed => 400,
            Upgrade::Armor => 600,
            Upgrade::Damage => 800,
        }
    }
}

/// Wrapping cursor over a fixed-length menu.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MenuState {
    pub selection: usize,
}

impl MenuState {
    pub fn move_up(&mut self, len: usize) {
        if len == 0 {
            return;
        }
        self.selection = (self.selection + len - 1) % len;
    }

    pub fn move_down(&mut self, len: usize) {
        if len == 0 {
            return;
        }
        self.selection = (self.selection + 1) % len;
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CraftAttempt {
    Advanced { stage: u32 },
    Finished,
    Missed,
}

/// Indicator sweeping 0..1; stopping it inside `target ± zone / 2` clears a stage.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CraftingState {
    pub stage: u32,
    pub bar: f32,
    pub target: f32,
    pub zone: f32,
    pub speed: f32,
}

impl CraftingState {
    pub fn new(rng: &mut impl Rng) -> Self {
        Self {
            stage: 0,
            bar: 0.0,
            target: rng.gen_range(0.3..0.7),
            zone: CRAFT_START_ZONE,
            speed: CRAFT_START_SPEED,
        }
    }

    pub fn advance(&mut self) {
        self.bar += self.speed;
        if self.bar > 1.0 {
            self.bar -= 1.0;
        }
    }

    pub fn in_zone(&self) -> bool {
        (self.bar - self.target).abs() < self.zone / 2.0
    }

    pub fn attempt(&mut self, rng: &mut impl Rng) -> CraftAttempt {
        if !self.in_zone() {
            *self = Self::new(rng);
            return CraftAttempt::Missed;
        }
        self.stage += 1;
        if self.stage >= CRAFT_STAGES {
            return CraftAttempt::Finished;
        }
        self.bar = 0.0;
        self.target = rng.gen_range(0.2..0.8);
        self.zone = (self.zone - CRAFT_ZONE_SHRINK).max(CRAFT_MIN_ZONE);
        self.speed += CRAFT_SPEED_STEP;
        CraftAttempt::Advanced { stage: self.stage }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RhythmStep {
    Hit { points: u32 },
    Wrong,
    Completed { score: u32, combo: u32, success: bool },
}

#[derive(Debug, Clone, PartialEq)]
pub struct RhythmState {
    pub sequence: Vec<Direction>,
    pub index: usize,
    pub timer_ticks: u32,
    pub score: u32,
    pub combo: u32,
    pub target: u32,
}

impl RhythmState {
    pub fn new(rng: &mut impl Rng, crew_count: usize) -> Self {
        let crew = u32::try_from(crew_count).unwrap_or(u32::MAX);
        Self {
            sequence: (0..RHYTHM_SEQUENCE_LEN)
                .map(|_| Direction::ALL[rng.gen_range(0..Direction::ALL.len())])
                .collect(),
            index: 0,
            timer_ticks: RHYTHM_KEY_WINDOW_TICKS,
            score: 0,
            combo: 0,
            target: RHYTHM_BASE_TARGET.saturating_add(RHYTHM_TARGET_PER_CREW.saturating_mul(crew)),
        }
    }

    pub fn expected(&self) -> Option<Direction> {
        self.sequence.get(self.index).copied()
    }

    /// Counts down the key window. On timeout the combo breaks and the window
    /// re-arms; the sequence position is kept.
    pub fn tick(&mut self) -> bool {
        self.timer_ticks = self.timer_ticks.saturating_sub(1);
        if self.timer_ticks > 0 {
            return false;
        }
        self.combo = 0;
        self.timer_ticks = RHYTHM_KEY_WINDOW_TICKS;
        true
    }

    pub fn press(&mut self, direction: Direction) -> RhythmStep {
        if self.expected() != Some(direction) {
            self.combo = 0;
            self.timer_ticks = RHYTHM_KEY_WINDOW_TICKS;
            return RhythmStep::Wrong;
        }
        self.combo += 1;
        let points = RHYTHM_POINTS_PER_COMBO * self.combo.min(RHYTHM_COMBO_CAP);
        self.score = self.score.saturating_add(points);
        self.index += 1;
        self.timer_ticks = RHYTHM_KEY_WINDOW_TICKS;
        if self.index < self.sequence.len() {
            return RhythmStep::Hit { points };
        }
        RhythmStep::Completed {
            score: self.score,
            combo: self.combo,
            success: self.score >= self.target,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VendorState {
    pub dealer_id: EntityId,
    pub menu: MenuState,
}

#[derive(Debug, Clone, PartialEq)]
pub enum InteractionContext {
    Crafting(CraftingState),
    Rhythm(RhythmState),
    Vendor(VendorState),
    WeaponShop(MenuState),
    UpgradeShop(MenuState),
    SafeHouse(MenuState),
}

impl InteractionContext {
    fn menu_mut(&mut self) -> Option<(&mut MenuState, usize)> {
        match self {
            Self::Vendor(vendor) => Some((&mut vendor.menu, VENDOR_MENU_LEN)),
            Self::WeaponShop(menu) => Some((menu, WEAPON_SHOP_ITEMS.len())),
            Self::UpgradeShop(menu) => Some((menu, Upgrade::ALL.len())),
            Self::SafeHouse(menu) => Some((menu, SAFE_HOUSE_MENU_LEN)),
            Self::Crafting(_) | Self::Rhythm(_) => None,
        }
    }
}

fn interaction_mut(player: &mut Player) -> Result<&mut InteractionContext, ActionRejected> {
    match &mut player.context {
        PlayerContext::Inside(visit) => Ok(&mut visit.interaction),
        _ => Err(ActionRejected::NotInside),
    }
}

/// Enters the nearest dealer within reach, else the nearest tagged venue.
pub(crate) fn enter(ctx: &mut SimContext<'_>) -> Result<(), ActionRejected> {
    match ctx.player.context {
        PlayerContext::Inside(_) => return Err(ActionRejected::AlreadyInside),
        PlayerContext::InVehicle { .. } => return Err(ActionRejected::AlreadyDriving),
        PlayerContext::FreeRoam => {}
    }
    let center = ctx.player.center();

    let dealer = ctx
        .entities
        .dealers
        .iter_live()
        .map(|(id, dealer)| (id, dealer.body.center().distance(center)))
        .filter(|(_, distance)| *distance < VENUE_INTERACTION_RADIUS)
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(id, _)| id);

    let interaction = if let Some(dealer_id) = dealer {
        ctx.events.emit(GameplayEvent::VendorOpened { dealer_id });
        info!(dealer = dealer_id.0, "vendor_opened");
        InteractionContext::Vendor(VendorState {
            dealer_id,
            menu: MenuState::default(),
        })
    } else {
        let kind = ctx
            .geometry
            .venue_near(center, VENUE_INTERACTION_RADIUS)
            .map(|venue| venue.kind)
            .ok_or(ActionRejected::NothingToEnter)?;
        let interaction = match kind {
            VenueKind::CraftingLab => InteractionContext::Crafting(CraftingState::new(ctx.rng)),
            VenueKind::Club => {
                let crew = ctx.entities.crew.live_count();
                InteractionContext::Rhythm(RhythmState::new(ctx.rng, crew))
            }
            VenueKind::WeaponShop => InteractionContext::WeaponShop(MenuState::default()),
            VenueKind::UpgradeShop => InteractionContext::UpgradeShop(MenuState::default()),
            VenueKind::SafeHouse => InteractionContext::SafeHouse(MenuState::default()),
        };
        ctx.events.emit(GameplayEvent::VenueEntered { kind });
        info!(kind = ?kind, "venue_entered");
        interaction
    };

    ctx.player.context = PlayerContext::Inside(VenueVisit {
        entry_position: ctx.player.body.position,
        interaction,
    });
    Ok(())
}

pub(crate) fn exit(ctx: &mut SimContext<'_>) -> Result<(), ActionRejected> {
    let PlayerContext::Inside(visit) = &ctx.player.context else {
        return Err(ActionRejected::NotInside);
    };
    let entry_position = visit.entry_position;
    ctx.player.body.position = entry_position;
    ctx.player.context = PlayerContext::FreeRoam;
    ctx.events.emit(GameplayEvent::VenueExited);
    info!(x = entry_position.x, y = entry_position.y, "venue_exited");
    Ok(())
}

/// Routes one tick of input while the player is inside.
pub(crate) fn handle_input(ctx: &mut SimContext<'_>, input: &InputSnapshot) {
    if input.was_pressed(InputAction::Cancel) {
        note_rejection("exit_venue", exit(ctx));
        return;
    }

    if matches!(ctx.player.interaction(), Some(InteractionContext::Rhythm(_))) {
        for (action, direction) in [
            (InputAction::MoveUp, Direction::Up),
            (InputAction::MoveDown, Direction::Down),
            (InputAction::MoveLeft, Direction::Left),
            (InputAction::MoveRight, Direction::Right),
        ] {
            if input.was_pressed(action) {
                note_rejection("rhythm_key", press_rhythm(ctx, direction));
            }
        }
        return;
    }

    if let Some((menu, len)) = interaction_mut(ctx.player)
        .ok()
        .and_then(InteractionContext::menu_mut)
    {
        if input.was_pressed(InputAction::MenuUp) {
            menu.move_up(len);
        }
        if input.was_pressed(InputAction::MenuDown) {
            menu.move_down(len);
        }
    }

    if input.was_pressed(InputAction::Confirm) {
        note_rejection("confirm", confirm(ctx));
    }
}

/// Per-tick clocks of the active minigame.
pub(crate) fn update(ctx: &mut SimContext<'_>) {
    let Ok(interaction) = interaction_mut(ctx.player) else {
        return;
    };
    match interaction {
        InteractionContext::Crafting(state) => state.advance(),
        InteractionContext::Rhythm(state) => {
            if state.tick() {
                debug!(index = state.index, "rhythm_timeout");
            }
        }
        InteractionContext::Vendor(vendor) => {
            let dealer_id = vendor.dealer_id;
            if !ctx.entities.dealers.is_live(dealer_id) {
                debug!(dealer = dealer_id.0, "vendor_gone");
                note_rejection("exit_venue", exit(ctx));
            }
        }
        InteractionContext::WeaponShop(_)
        | InteractionContext::UpgradeShop(_)
        | InteractionContext::SafeHouse(_) => {}
    }
}

enum Confirmed {
    Craft(CraftAttempt),
    Trade { dealer_id: EntityId, buying: bool },
    Shop(ShopItem),
    Upgrade(Upgrade),
    SafeHouse(usize),
}

pub(crate) fn confirm(ctx: &mut SimContext<'_>) -> Result<(), ActionRejected> {
    let confirmed = match interaction_mut(ctx.player)? {
        InteractionContext::Crafting(state) => Confirmed::Craft(state.attempt(ctx.rng)),
        InteractionContext::Vendor(vendor) => Confirmed::Trade {
            dealer_id: vendor.dealer_id,
            buying: vendor.menu.selection == 0,
        },
        InteractionContext::WeaponShop(menu) => Confirmed::Shop(
            *WEAPON_SHOP_ITEMS
                .get(menu.selection)
                .ok_or(ActionRejected::WrongContext)?,
        ),
        InteractionContext::UpgradeShop(menu) => Confirmed::Upgrade(
            *Upgrade::ALL
                .get(menu.selection)
                .ok_or(ActionRejected::WrongContext)?,
        ),
        InteractionContext::SafeHouse(menu) => Confirmed::SafeHouse(menu.selection),
        InteractionContext::Rhythm(_) => return Err(ActionRejected::WrongContext),
    };

    match confirmed {
        Confirmed::Craft(CraftAttempt::Advanced { stage }) => {
            debug!(stage, "craft_stage_cleared");
            Ok(())
        }
        Confirmed::Craft(CraftAttempt::Missed) => {
            debug!("craft_missed");
            Ok(())
        }
        Confirmed::Craft(CraftAttempt::Finished) => {
            ctx.player.drugs.add(DrugKind::Crack, CRAFT_BATCH);
            info!(amount = CRAFT_BATCH, "craft_finished");
            exit(ctx)
        }
        Confirmed::Trade { dealer_id, buying } => trade(ctx, dealer_id, buying),
        Confirmed::Shop(item) => buy_item(ctx.player, item).map(|price| {
            ctx.events.emit(GameplayEvent::ItemPurchased { price });
            info!(item = ?item, price, "item_purchased");
        }),
        Confirmed::Upgrade(upgrade) => buy_upgrade(ctx.player, upgrade).map(|price| {
            ctx.events.emit(GameplayEvent::ItemPurchased { price });
            info!(upgrade = ?upgrade, price, "upgrade_purchased");
        }),
        Confirmed::SafeHouse(0) => {
            *ctx.save_slot = Some(SaveSnapshot::capture(ctx.player, ctx.completed_missions));
            ctx.events.emit(GameplayEvent::SaveWritten);
            info!(cash = ctx.player.cash, "save_written");
            Ok(())
        }
        Confirmed::SafeHouse(_) => {
            if ctx.player.health() >= ctx.player.max_health() {
                return Err(ActionRejected::HealthFull);
            }
            pay(ctx.player, SAFE_HOUSE_HEAL_PRICE)?;
            ctx.player.restore_full_health();
            ctx.player.add_wanted(-SAFE_HOUSE_WANTED_RELIEF);
            ctx.events.emit(GameplayEvent::ItemPurchased {
                price: SAFE_HOUSE_HEAL_PRICE,
            });
            info!(price = SAFE_HOUSE_HEAL_PRICE, "safe_house_heal");
            Ok(())
        }
    }
}

fn pay(player: &mut Player, price: u32) -> Result<(), ActionRejected> {
    if player.spend(price) {
        Ok(())
    } else {
        Err(ActionRejected::InsufficientCash {
            needed: price,
            available: player.cash,
        })
    }
}

fn buy_item(player: &mut Player, item: ShopItem) -> Result<u32, ActionRejected> {
    match item {
        ShopItem::Weapon { weapon, price, ammo } => {
            if player.loadout.owns(weapon) {
                return Err(ActionRejected::AlreadyOwned);
            }
            pay(player, price)?;
            player.loadout.grant(weapon);
            if weapon == Weapon::RocketLauncher {
                player.loadout.rockets = player.loadout.rockets.saturating_add(ammo);
            } else {
                player.loadout.ammo = player.loadout.ammo.saturating_add(ammo);
            }
            Ok(price)
        }
        ShopItem::Ammo { price, amount } => {
            pay(player, price)?;
            player.loadout.ammo = player.loadout.ammo.saturating_add(amount);
            Ok(price)
        }
        ShopItem::Rockets { price, amount } => {
            pay(player, price)?;
            player.loadout.rockets = player.loadout.rockets.saturating_add(amount);
            Ok(price)
        }
    }
}

fn buy_upgrade(player: &mut Player, upgrade: Upgrade) -> Result<u32, ActionRejected> {
    if upgrade == Upgrade::Armor && player.armor_percent() >= super::entities::ARMOR_CAP_PERCENT {
        return Err(ActionRejected::UpgradeCapped);
    }
    let price = upgrade.price();
    pay(player, price)?;
    match upgrade {
        Upgrade::MaxHealth => player.raise_max_health(25),
        Upgrade::Speed => player.speed_bonus += 1.0,
        Upgrade::Armor => player.set_armor_percent(player.armor_percent() + 10),
        Upgrade::Damage => player.damage_multiplier += 0.2,
    }
    Ok(price)
}

/// Both balances move together or not at all.
fn trade(
    ctx: &mut SimContext<'_>,
    dealer_id: EntityId,
    buying: bool,
) -> Result<(), ActionRejected> {
    let dealer = ctx
        .entities
        .dealers
        .get_mut(dealer_id)
        .ok_or(ActionRejected::VendorGone)?;
    let player = &mut *ctx.player;

    let price = if buying {
        if dealer.stock == 0 {
            return Err(ActionRejected::VendorOutOfStock);
        }
        let price = dealer.buy_price;
        pay(player, price)?;
        dealer.stock -= 1;
        dealer.cash = dealer.cash.saturating_add(price);
        player.drugs.add(DrugKind::Crack, 1);
        price
    } else {
        if player.drugs.count(DrugKind::Crack) == 0 {
            return Err(ActionRejected::NothingToSell);
        }
        let price = dealer.sell_price;
        if dealer.cash < price {
            return Err(ActionRejected::VendorOutOfCash);
        }
        player.drugs.take_one(DrugKind::Crack);
        dealer.cash -= price;
        dealer.stock = dealer.stock.saturating_add(1);
        player.earn(price);
        player.stats.drugs_sold = player.stats.drugs_sold.saturating_add(1);
        price
    };

    ctx.events.emit(GameplayEvent::DrugTraded {
        dealer_id,
        bought: buying,
        price,
    });
    info!(dealer = dealer_id.0, bought = buying, price, "drug_traded");
    Ok(())
}

fn press_rhythm(ctx: &mut SimContext<'_>, direction: Direction) -> Result<(), ActionRejected> {
    let InteractionContext::Rhythm(state) = interaction_mut(ctx.player)? else {
        return Err(ActionRejected::WrongContext);
    };
    let step = state.press(direction);
    let RhythmStep::Completed { score, combo, success } = step else {
        debug!(step = ?step, "rhythm_key");
        return Ok(());
    };

    if success {
        let cash = RECRUIT_BASE_CASH.saturating_add(RECRUIT_CASH_PER_COMBO.saturating_mul(combo));
        ctx.player.earn(cash);
        let crew_id = spawn_recruit(ctx);
        ctx.events.emit(GameplayEvent::CrewRecruited { crew_id });
        info!(score, combo, cash, crew = crew_id.0, "crew_recruited");
    } else {
        info!(score, combo, "rhythm_failed");
    }

    let crew_count = ctx.entities.crew.live_count();
    let fresh = RhythmState::new(ctx.rng, crew_count);
    if let Ok(InteractionContext::Rhythm(state)) = interaction_mut(ctx.player) {
        *state = fresh;
    }
    Ok(())
}

fn spawn_recruit(ctx: &mut SimContext<'_>) -> EntityId {
    let origin = ctx.player.body.position;
    let position = first_clear_position(
        ctx.geometry,
        CREW_SIZE,
        [
            origin + Vec2::new(60.0, 0.0),
            origin + Vec2::new(-60.0, 0.0),
            origin + Vec2::new(0.0, 70.0),
            origin + Vec2::new(0.0, -70.0),
        ],
    )
    .unwrap_or(origin);
    let entities = &mut *ctx.entities;
    entities.crew.spawn(&mut entities.ids, CrewMember::new(position))
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;

    #[test]
    fn menus_wrap_in_both_directions() {
        let mut menu = MenuState::default();
        menu.move_up(4);
        assert_eq!(menu.selection, 3);
        menu.move_down(4);
        assert_eq!(menu.selection, 0);
        menu.move_down(0);
        assert_eq!(menu.selection, 0);
    }

    #[test]
    fn crafting_three_hits_finish_and_each_stage_tightens() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut state = CraftingState::new(&mut rng);

        for expected_stage in 1..CRAFT_STAGES {
            state.bar = state.target;
            let zone_before = state.zone;
            let speed_before = state.speed;
            assert_eq!(state.attempt(&mut rng), CraftAttempt::Advanced { stage: expected_stage });
            assert!(state.zone < zone_before);
            assert!(state.speed > speed_before);
            assert!((0.2..0.8).contains(&state.target));
        }
        state.bar = state.target;
        assert_eq!(state.attempt(&mut rng), CraftAttempt::Finished);
    }

    #[test]
    fn crafting_miss_resets_to_defaults() {
        let mut rng = StdRng::seed_from_u64(8);
        let mut state = CraftingState::new(&mut rng);
        state.bar = state.target;
        state.attempt(&mut rng);
        state.bar = state.target + 0.5;

        assert_eq!(state.attempt(&mut rng), CraftAttempt::Missed);
        assert_eq!(state.stage, 0);
        assert_eq!(state.bar, 0.0);
        assert_eq!(state.zone, CRAFT_START_ZONE);
        assert_eq!(state.speed, CRAFT_START_SPEED);
    }

    #[test]
    fn crafting_bar_wraps_past_one() {
        let mut rng = StdRng::seed_from_u64(9);
        let mut state = CraftingState::new(&mut rng);
        state.bar = 0.995;
        state.advance();
        assert!(state.bar >= 0.0 && state.bar < 0.1);
    }

    #[test]
    fn rhythm_perfect_run_scores_capped_combo_sum() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut state = RhythmState::new(&mut rng, 0);
        let sequence = state.sequence.clone();

        let mut last = RhythmStep::Wrong;
        for direction in sequence {
            last = state.press(direction);
        }

        let expected: u32 = (1..=RHYTHM_SEQUENCE_LEN as u32).map(|combo| 50 * combo.min(10)).sum();
        assert_eq!(
            last,
            RhythmStep::Completed {
                score: expected,
                combo: RHYTHM_SEQUENCE_LEN as u32,
                success: true,
            }
        );
    }

    #[test]
    fn rhythm_wrong_key_breaks_combo_but_keeps_position() {
        let mut rng = StdRng::seed_from_u64(4);
        let mut state = RhythmState::new(&mut rng, 2);
        assert_eq!(state.target, 600);

        let first = state.sequence[0];
        state.press(first);
        let wrong = Direction::ALL
            .into_iter()
            .find(|direction| Some(*direction) != state.expected())
            .unwrap();

        assert_eq!(state.press(wrong), RhythmStep::Wrong);
        assert_eq!(state.combo, 0);
        assert_eq!(state.index, 1);
        assert_eq!(state.score, 50);
    }

    #[test]
    fn rhythm_timeout_rearms_window_and_breaks_combo() {
        let mut rng = StdRng::seed_from_u64(5);
        let mut state = RhythmState::new(&mut rng, 0);
        let first = state.sequence[0];
        state.press(first);

        let mut timed_out = false;
        for _ in 0..RHYTHM_KEY_WINDOW_TICKS {
            timed_out |= state.tick();
        }
        assert!(timed_out);
        assert_eq!(state.combo, 0);
        assert_eq!(state.index, 1);
        assert_eq!(state.timer_ticks, RHYTHM_KEY_WINDOW_TICKS);
    }

    #[test]
    fn weapon_already_owned_is_not_sold_twice() {
        let mut player = Player::new(Vec2::ZERO);
        let pistol = WEAPON_SHOP_ITEMS[0];
        assert_eq!(buy_item(&mut player, pistol), Err(ActionRejected::AlreadyOwned));
        assert_eq!(player.cash, 1000);

        assert_eq!(
            buy_item(&mut player, WEAPON_SHOP_ITEMS[4]),
            Err(ActionRejected::InsufficientCash {
                needed: 2000,
                available: 1000,
            })
        );
        assert_eq!(buy_item(&mut player, WEAPON_SHOP_ITEMS[1]), Ok(500));
        assert!(player.loadout.owns(Weapon::Shotgun));
        assert_eq!(player.loadout.ammo, 70);
    }

    #[test]
    fn armor_upgrade_stops_at_cap() {
        let mut player = Player::new(Vec2::ZERO);
        player.cash = 10_000;
        for _ in 0..8 {
            buy_upgrade(&mut player, Upgrade::Armor).unwrap();
        }
        assert_eq!(player.armor_percent(), 80);
        assert_eq!(buy_upgrade(&mut player, Upgrade::Armor), Err(ActionRejected::UpgradeCapped));
        assert_eq!(player.cash, 10_000 - 8 * 600);
    }
}
