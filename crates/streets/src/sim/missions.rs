use super::rejection::ActionRejected;

pub const MAX_DIFFICULTY: u32 = 5;
pub const COMPLETION_COOLDOWN_TICKS: u32 = 300;
pub const FAILURE_COOLDOWN_TICKS: u32 = 180;
const TICKS_PER_SECOND: u32 = 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MissionKind {
    KillCops,
    EarnMoney,
    SellDrugs,
    SurviveWanted,
    KillGangs,
    RecruitCrew,
    StealVehicles,
    DestroyVehicles,
    Rampage,
}

impl MissionKind {
    /// Candidate kinds offered at a difficulty tier, in menu order.
    pub fn offered_at(difficulty: u32) -> Vec<MissionKind> {
        let mut kinds = vec![
            MissionKind::KillCops,
            MissionKind::EarnMoney,
            MissionKind::SellDrugs,
        ];
        if difficulty >= 2 {
            kinds.extend([MissionKind::SurviveWanted, MissionKind::KillGangs]);
        }
        if difficulty >= 3 {
            kinds.extend([MissionKind::RecruitCrew, MissionKind::StealVehicles]);
        }
        if difficulty >= 4 {
            kinds.extend([MissionKind::DestroyVehicles, MissionKind::Rampage]);
        }
        kinds
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Mission {
    pub kind: MissionKind,
    pub difficulty: u32,
    /// Units depend on the kind: kills, cash, seconds survived.
    pub target: u32,
    pub reward: u32,
    pub time_limit_ticks: Option<u32>,
}

impl Mission {
    pub fn new(kind: MissionKind, difficulty: u32) -> Self {
        let d = difficulty.clamp(1, MAX_DIFFICULTY);
        let (target, reward, time_limit_ticks) = match kind {
            MissionKind::KillCops => (3 + 2 * d, 200 + 150 * d, None),
            MissionKind::EarnMoney => (500 + 300 * d, 150 + 100 * d, None),
            MissionKind::SellDrugs => (3 + 2 * d, 200 + 150 * d, None),
            MissionKind::SurviveWanted => (20 + 10 * d, 300 + 250 * d, None),
            MissionKind::KillGangs => (4 + 2 * d, 300 + 200 * d, None),
            MissionKind::RecruitCrew => (2 + d, 250 + 200 * d, None),
            MissionKind::StealVehicles => (2 + d, 250 + 150 * d, None),
            MissionKind::DestroyVehicles => (1 + d, 400 + 250 * d, None),
            MissionKind::Rampage => (
                5 + 3 * d,
                500 + 300 * d,
                Some((30 + 15 * d) * TICKS_PER_SECOND),
            ),
        };
        Self {
            kind,
            difficulty: d,
            target,
            reward,
            time_limit_ticks,
        }
    }

    pub fn description(&self) -> String {
        match self.kind {
            MissionKind::KillCops => format!("Kill {} cops", self.target),
            MissionKind::EarnMoney => format!("Earn ${}", self.target),
            MissionKind::SellDrugs => format!("Sell {} drugs", self.target),
            MissionKind::SurviveWanted => {
                format!("Survive {} seconds with heavy heat", self.target)
            }
            MissionKind::KillGangs => format!("Kill {} gang members", self.target),
            MissionKind::RecruitCrew => format!("Recruit {} crew members", self.target),
            MissionKind::StealVehicles => format!("Steal {} vehicles", self.target),
            MissionKind::DestroyVehicles => format!("Destroy {} vehicles", self.target),
            MissionKind::Rampage => format!(
                "Rampage: {} kills in {} seconds",
                self.target,
                self.time_limit_ticks.unwrap_or(0) / TICKS_PER_SECOND
            ),
        }
    }
}

/// Live counters a mission measures itself against, sampled once per tick.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MissionCounters {
    pub kills: u32,
    pub gang_kills: u32,
    pub total_earned: u32,
    pub drugs_sold: u32,
    pub crew_count: u32,
    pub vehicles_stolen: u32,
    pub vehicles_destroyed: u32,
    pub wanted: f32,
}

impl MissionCounters {
    fn cumulative_for(&self, kind: MissionKind) -> u32 {
        match kind {
            MissionKind::KillCops => self.kills,
            MissionKind::EarnMoney => self.total_earned,
            MissionKind::SellDrugs => self.drugs_sold,
            MissionKind::KillGangs => self.gang_kills,
            MissionKind::RecruitCrew => self.crew_count,
            MissionKind::StealVehicles => self.vehicles_stolen,
            MissionKind::DestroyVehicles => self.vehicles_destroyed,
            MissionKind::Rampage => self.kills.saturating_add(self.gang_kills),
            MissionKind::SurviveWanted => 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ActiveMission {
    pub mission: Mission,
    baseline: u32,
    progress: u32,
    /// Survive: consecutive ticks above the threshold. Rampage: ticks elapsed.
    timer_ticks: u32,
}

impl ActiveMission {
    pub fn progress(&self) -> u32 {
        self.progress
    }

    pub fn baseline(&self) -> u32 {
        self.baseline
    }

    pub fn remaining_ticks(&self) -> Option<u32> {
        self.mission
            .time_limit_ticks
            .map(|limit| limit.saturating_sub(self.timer_ticks))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissionOutcome {
    Completed { kind: MissionKind, reward: u32 },
    Failed { kind: MissionKind },
    Abandoned { kind: MissionKind },
}

#[derive(Debug, Clone, PartialEq)]
pub struct MissionTracker {
    candidates: Vec<Mission>,
    active: Option<ActiveMission>,
    cooldown_ticks: u32,
    completed: u32,
    regenerate_after_cooldown: bool,
    survive_wanted_threshold: f32,
}

impl MissionTracker {
    pub fn new(survive_wanted_threshold: f32) -> Self {
        let mut tracker = Self {
            candidates: Vec::new(),
            active: None,
            cooldown_ticks: 0,
            completed: 0,
            regenerate_after_cooldown: false,
            survive_wanted_threshold,
        };
        tracker.generate_candidates();
        tracker
    }

    pub fn difficulty(&self) -> u32 {
        (1 + self.completed / 3).min(MAX_DIFFICULTY)
    }

    pub fn candidates(&self) -> &[Mission] {
        &self.candidates
    }

    pub fn active(&self) -> Option<&ActiveMission> {
        self.active.as_ref()
    }

    pub fn cooldown_ticks(&self) -> u32 {
        self.cooldown_ticks
    }

    pub fn completed_count(&self) -> u32 {
        self.completed
    }

    /// Used when restoring a save; resets the offer to match the new tier.
    pub fn set_completed_count(&mut self, completed: u32) {
        self.completed = completed;
        self.active = None;
        self.cooldown_ticks = 0;
        self.regenerate_after_cooldown = false;
        self.generate_candidates();
    }

    pub fn generate_candidates(&mut self) {
        let difficulty = self.difficulty();
        self.candidates = MissionKind::offered_at(difficulty)
            .into_iter()
            .map(|kind| Mission::new(kind, difficulty))
            .collect();
    }

    pub fn start(
        &mut self,
        index: usize,
        counters: &MissionCounters,
    ) -> Result<&Mission, ActionRejected> {
        if self.active.is_some() {
            return Err(ActionRejected::MissionAlreadyActive);
        }
        if self.cooldown_ticks > 0 {
            return Err(ActionRejected::MissionCooldown(self.cooldown_ticks));
        }
        let mission = self
            .candidates
            .get(index)
            .cloned()
            .ok_or(ActionRejected::NoSuchMission(index))?;
        let baseline = counters.cumulative_for(mission.kind);
        let active = self.active.insert(ActiveMission {
            mission,
            baseline,
            progress: 0,
            timer_ticks: 0,
        });
        Ok(&active.mission)
    }

    pub fn abandon(&mut self) -> Result<MissionKind, ActionRejected> {
        let active = self.active.take().ok_or(ActionRejected::NoActiveMission)?;
        self.cooldown_ticks = FAILURE_COOLDOWN_TICKS;
        self.regenerate_after_cooldown = false;
        self.generate_candidates();
        Ok(active.mission.kind)
    }

    /// Advances cooldowns and the active mission by one tick. The caller pays
    /// out a `Completed` reward.
    pub fn update(&mut self, counters: &MissionCounters) -> Option<MissionOutcome> {
        if self.cooldown_ticks > 0 {
            self.cooldown_ticks -= 1;
            if self.cooldown_ticks == 0 && self.regenerate_after_cooldown {
                self.regenerate_after_cooldown = false;
                self.generate_candidates();
            }
        }

        let active = self.active.as_mut()?;
        let mission = &active.mission;
        let mut failed = false;
        match mission.kind {
            MissionKind::SurviveWanted => {
                if counters.wanted >= self.survive_wanted_threshold {
                    active.timer_ticks = active.timer_ticks.saturating_add(1);
                } else {
                    active.timer_ticks = 0;
                }
                active.progress = active.timer_ticks / TICKS_PER_SECOND;
            }
            MissionKind::Rampage => {
                active.timer_ticks = active.timer_ticks.saturating_add(1);
                active.progress = counters
                    .cumulative_for(mission.kind)
                    .saturating_sub(active.baseline);
                let expired = mission
                    .time_limit_ticks
                    .is_some_and(|limit| active.timer_ticks >= limit);
                failed = expired && active.progress < mission.target;
            }
            kind => {
                let current = counters
                    .cumulative_for(kind)
                    .saturating_sub(active.baseline);
                active.progress = active.progress.max(current);
            }
        }

        if active.progress >= active.mission.target {
            let kind = active.mission.kind;
            let reward = active.mission.reward;
            self.active = None;
            self.completed = self.completed.saturating_add(1);
            self.cooldown_ticks = COMPLETION_COOLDOWN_TICKS;
            self.candidates.clear();
            self.regenerate_after_cooldown = true;
            return Some(MissionOutcome::Completed { kind, reward });
        }

        if failed {
            let kind = active.mission.kind;
            self.active = None;
            self.cooldown_ticks = FAILURE_COOLDOWN_TICKS;
            self.regenerate_after_cooldown = false;
            self.generate_candidates();
            return Some(MissionOutcome::Failed { kind });
        }

        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tracker() -> MissionTracker {
        MissionTracker::new(3.0)
    }

    fn index_of(tracker: &MissionTracker, kind: MissionKind) -> usize {
        tracker
            .candidates()
            .iter()
            .position(|mission| mission.kind == kind)
            .expect("kind offered")
    }

    #[test]
    fn difficulty_one_offers_three_basic_kinds() {
        let tracker = tracker();
        let kinds = tracker
            .candidates()
            .iter()
            .map(|mission| mission.kind)
            .collect::<Vec<_>>();
        assert_eq!(
            kinds,
            vec![
                MissionKind::KillCops,
                MissionKind::EarnMoney,
                MissionKind::SellDrugs
            ]
        );
        assert_eq!(tracker.candidates()[0].target, 5);
        assert_eq!(tracker.candidates()[0].reward, 350);
    }

    #[test]
    fn difficulty_scales_and_caps() {
        let mut tracker = tracker();
        tracker.set_completed_count(9);
        assert_eq!(tracker.difficulty(), 4);
        assert_eq!(tracker.candidates().len(), 9);
        tracker.set_completed_count(60);
        assert_eq!(tracker.difficulty(), MAX_DIFFICULTY);
    }

    #[test]
    fn second_start_is_rejected_while_active() {
        let mut tracker = tracker();
        let counters = MissionCounters::default();
        tracker.start(0, &counters).expect("first start");

        assert_eq!(
            tracker.start(1, &counters),
            Err(ActionRejected::MissionAlreadyActive)
        );
        assert_eq!(
            tracker.active().map(|active| active.mission.kind),
            Some(MissionKind::KillCops)
        );
    }

    #[test]
    fn invalid_index_is_rejected() {
        let mut tracker = tracker();
        assert_eq!(
            tracker.start(42, &MissionCounters::default()),
            Err(ActionRejected::NoSuchMission(42))
        );
        assert!(tracker.active().is_none());
    }

    #[test]
    fn cumulative_progress_is_counter_minus_baseline() {
        let mut tracker = tracker();
        let mut counters = MissionCounters {
            kills: 7,
            ..MissionCounters::default()
        };
        tracker.start(0, &counters).expect("start");

        for expected in 0..5 {
            counters.kills = 7 + expected;
            assert_eq!(tracker.update(&counters), None);
            assert_eq!(tracker.active().expect("active").progress(), expected);
        }

        counters.kills = 12;
        assert_eq!(
            tracker.update(&counters),
            Some(MissionOutcome::Completed {
                kind: MissionKind::KillCops,
                reward: 350
            })
        );
        assert_eq!(tracker.completed_count(), 1);
        assert!(tracker.active().is_none());
    }

    #[test]
    fn completion_cooldown_blocks_starts_then_regenerates() {
        let mut tracker = tracker();
        let mut counters = MissionCounters::default();
        tracker.start(0, &counters).expect("start");
        counters.kills = 5;
        assert!(matches!(
            tracker.update(&counters),
            Some(MissionOutcome::Completed { .. })
        ));
        assert!(tracker.candidates().is_empty());
        assert!(matches!(
            tracker.start(0, &counters),
            Err(ActionRejected::MissionCooldown(_))
        ));

        for _ in 0..COMPLETION_COOLDOWN_TICKS {
            tracker.update(&counters);
        }
        assert_eq!(tracker.cooldown_ticks(), 0);
        assert_eq!(tracker.candidates().len(), 3);
        assert!(tracker.start(0, &counters).is_ok());
    }

    #[test]
    fn abandon_sets_short_cooldown_and_regenerates_now() {
        let mut tracker = tracker();
        tracker
            .start(1, &MissionCounters::default())
            .expect("start");

        assert_eq!(tracker.abandon(), Ok(MissionKind::EarnMoney));
        assert_eq!(tracker.cooldown_ticks(), FAILURE_COOLDOWN_TICKS);
        assert_eq!(tracker.candidates().len(), 3);
        assert_eq!(tracker.abandon(), Err(ActionRejected::NoActiveMission));
    }

    #[test]
    fn survive_progress_resets_when_heat_drops() {
        let mut tracker = tracker();
        tracker.set_completed_count(3);
        let index = index_of(&tracker, MissionKind::SurviveWanted);
        let mut counters = MissionCounters {
            wanted: 3.5,
            ..MissionCounters::default()
        };
        tracker.start(index, &counters).expect("start");

        for _ in 0..120 {
            tracker.update(&counters);
        }
        assert_eq!(tracker.active().expect("active").progress(), 2);

        counters.wanted = 1.0;
        tracker.update(&counters);
        assert_eq!(tracker.active().expect("active").progress(), 0);
    }

    #[test]
    fn rampage_fails_when_time_runs_out() {
        let mut tracker = tracker();
        tracker.set_completed_count(9);
        let index = index_of(&tracker, MissionKind::Rampage);
        let mut counters = MissionCounters::default();
        let mission = tracker.start(index, &counters).expect("start").clone();
        let limit = mission.time_limit_ticks.expect("timed");
        assert_eq!(mission.target, 17);

        counters.kills = 10;
        let mut outcome = None;
        for _ in 0..limit {
            outcome = tracker.update(&counters);
            if outcome.is_some() {
                break;
            }
        }

        assert_eq!(
            outcome,
            Some(MissionOutcome::Failed {
                kind: MissionKind::Rampage
            })
        );
        assert_eq!(tracker.completed_count(), 9);
        assert_eq!(tracker.cooldown_ticks(), FAILURE_COOLDOWN_TICKS);
    }

    #[test]
    fn rampage_counts_cop_and_gang_kills() {
        let mut tracker = tracker();
        tracker.set_completed_count(9);
        let index = index_of(&tracker, MissionKind::Rampage);
        let mut counters = MissionCounters {
            kills: 4,
            gang_kills: 2,
            ..MissionCounters::default()
        };
        tracker.start(index, &counters).expect("start");

        counters.kills = 14;
        counters.gang_kills = 9;
        assert!(matches!(
            tracker.update(&counters),
            Some(MissionOutcome::Completed {
                kind: MissionKind::Rampage,
                ..
            })
        ));
    }
}
