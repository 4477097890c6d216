//! Headless host shell
//!
//! Owns the run-level bookkeeping the simulation leaves to its host: score,
//! player level, experience threshold and the upgrade offer on level-up.

use std::sync::Arc;

use rand::SeedableRng;
use rand_pcg::Pcg32;

use crate::renderer::Frame;
use crate::settings::Settings;
use crate::sim::{
    self, Camera, GamePhase, SimEvent, TickInput, TickOutcome, WorldState, apply_weapon_upgrade,
};
use crate::tuning::{Content, UpgradeDef, UpgradeKind, select_random_upgrades};

/// Experience needed for the first level-up
pub const FIRST_LEVEL_EXPERIENCE: u32 = 100;

/// Threshold growth per level
pub const LEVEL_GROWTH: f64 = 1.2;

pub struct Session {
    pub world: WorldState,
    settings: Settings,
    content: Arc<Content>,
    /// Draws upgrade offers; kept apart from the world RNG
    offer_rng: Pcg32,
    pub score: u64,
    pub level: u32,
    pub experience: u32,
    pub experience_to_next: u32,
    /// Upgrade ids taken this run, in order
    pub taken: Vec<String>,
    /// Upgrade ids currently offered
    pub offer: Vec<String>,
    /// Level-ups still waiting for an offer
    queued_level_ups: u32,
}

impl Session {
    /// A session sitting at the menu
    pub fn new(settings: Settings, content: Arc<Content>) -> Self {
        let seed = settings.seed.unwrap_or_else(rand::random);
        let mut world = Self::fresh_world(seed, &settings, &content);
        world.phase = GamePhase::Menu;
        Self {
            world,
            offer_rng: Pcg32::seed_from_u64(seed.rotate_left(17)),
            settings,
            content,
            score: 0,
            level: 1,
            experience: 0,
            experience_to_next: FIRST_LEVEL_EXPERIENCE,
            taken: Vec::new(),
            offer: Vec::new(),
            queued_level_ups: 0,
        }
    }

    fn fresh_world(seed: u64, settings: &Settings, content: &Arc<Content>) -> WorldState {
        let mut world = WorldState::new(seed, Arc::clone(content));
        world.camera = Camera::from_settings(&settings.camera);
        world.effects = sim::state::Effects::new(settings.max_effects());
        world.aura_timing = settings.aura_timing;
        world
    }

    /// Start (or restart) a run, keeping the seed
    pub fn start(&mut self, now_ms: f64) {
        let seed = self.world.seed;
        self.world = Self::fresh_world(seed, &self.settings, &self.content);
        self.offer_rng = Pcg32::seed_from_u64(seed.rotate_left(17));
        self.score = 0;
        self.level = 1;
        self.experience = 0;
        self.experience_to_next = FIRST_LEVEL_EXPERIENCE;
        self.taken.clear();
        self.offer.clear();
        self.queued_level_ups = 0;

        if let Some(stage) = self.content.stage(1) {
            self.world
                .stages
                .show_message(stage.message.clone(), now_ms, crate::consts::STAGE_MESSAGE_MS);
        }
        log::info!("Run started (seed {seed})");
    }

    pub fn phase(&self) -> GamePhase {
        self.world.phase
    }

    pub fn seed(&self) -> u64 {
        self.world.seed
    }

    /// Whether the run is paused on an upgrade offer
    pub fn awaiting_choice(&self) -> bool {
        !self.offer.is_empty()
    }

    /// Run one frame and fold its outcome into the session.
    ///
    /// A pause toggle is ignored while an upgrade offer is open.
    pub fn tick(&mut self, input: &TickInput, dt_ms: f64, now_ms: f64) -> TickOutcome {
        let outcome = if self.awaiting_choice() {
            TickOutcome::default()
        } else {
            sim::tick(&mut self.world, input, dt_ms, now_ms)
        };
        self.apply_outcome(&outcome);
        outcome
    }

    fn apply_outcome(&mut self, outcome: &TickOutcome) {
        self.score += outcome.score_delta;
        self.experience += outcome.experience_delta;

        for event in &outcome.events {
            match event {
                SimEvent::StageChanged { message, .. } => log::debug!("Banner: {message}"),
                SimEvent::GameOver => log::info!(
                    "Final score {} at level {} ({} upgrades)",
                    self.score,
                    self.level,
                    self.taken.len()
                ),
                _ => {}
            }
        }

        while self.experience >= self.experience_to_next {
            self.experience -= self.experience_to_next;
            self.level += 1;
            self.experience_to_next =
                (self.experience_to_next as f64 * LEVEL_GROWTH).floor() as u32;
            self.queued_level_ups += 1;
            log::info!("Level up! Now level {}", self.level);
        }

        if self.world.phase == GamePhase::Playing {
            self.open_offer();
        }
    }

    /// Pause on a fresh upgrade offer if a level-up is waiting
    fn open_offer(&mut self) {
        while self.queued_level_ups > 0 && self.offer.is_empty() {
            self.queued_level_ups -= 1;
            let world = &self.world;
            let available = self
                .content
                .available_upgrades(|token| world.player.weapon_level(token));
            self.offer = select_random_upgrades(
                &available,
                self.settings.upgrade_choices,
                self.level,
                &mut self.offer_rng,
            )
            .into_iter()
            .map(|u| u.id.clone())
            .collect();
        }
        if !self.offer.is_empty() {
            self.world.phase = GamePhase::Paused;
        }
    }

    /// Definitions of the upgrades on offer
    pub fn offered(&self) -> Vec<&UpgradeDef> {
        self.offer
            .iter()
            .filter_map(|id| self.content.upgrade(id))
            .collect()
    }

    /// Take one of the offered upgrades and resume play.
    ///
    /// Returns false (and changes nothing) if `id` is not on offer.
    pub fn choose_upgrade(&mut self, id: &str) -> bool {
        if !self.offer.iter().any(|offered| offered == id) {
            return false;
        }
        let Some(upgrade) = self.content.upgrade(id).cloned() else {
            return false;
        };

        for modifier in &upgrade.modifiers {
            self.world.stats.apply_modifier(modifier);
        }
        if upgrade.kind == UpgradeKind::Weapon {
            apply_weapon_upgrade(&mut self.world, &upgrade.id);
        }
        log::debug!("Took upgrade {} ({})", upgrade.name, upgrade.id);

        self.taken.push(upgrade.id);
        self.offer.clear();
        self.world.phase = GamePhase::Playing;
        self.open_offer();
        true
    }

    /// Read-only view for a renderer
    pub fn frame(&self) -> Frame<'_> {
        Frame::new(&self.world, self.settings.viewport)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::Viewport;

    fn session() -> Session {
        let settings = Settings {
            seed: Some(99),
            ..Default::default()
        };
        let mut session = Session::new(settings, Arc::new(Content::default()));
        session.start(0.0);
        session
    }

    fn outcome_with_experience(experience: u32) -> TickOutcome {
        TickOutcome {
            experience_delta: experience,
            ..Default::default()
        }
    }

    #[test]
    fn test_new_session_waits_in_menu() {
        let session = Session::new(Settings::default(), Arc::new(Content::default()));
        assert_eq!(session.phase(), GamePhase::Menu);
    }

    #[test]
    fn test_start_shows_first_stage() {
        let session = session();
        assert_eq!(session.phase(), GamePhase::Playing);
        assert_eq!(
            session.world.stages.message.as_ref().map(|m| m.text.as_str()),
            Some("Stage 1: The Forest of Shadows")
        );
    }

    #[test]
    fn test_level_threshold_grows_and_carries_surplus() {
        let mut session = session();
        session.apply_outcome(&outcome_with_experience(130));
        assert_eq!(session.level, 2);
        assert_eq!(session.experience, 30);
        assert_eq!(session.experience_to_next, 120);
        assert_eq!(session.phase(), GamePhase::Paused);
        assert_eq!(session.offer.len(), 3);
    }

    #[test]
    fn test_choose_upgrade_resumes() {
        let mut session = session();
        session.apply_outcome(&outcome_with_experience(100));
        let pick = session.offer[0].clone();
        assert!(!session.choose_upgrade("not-offered"));
        assert!(session.choose_upgrade(&pick));
        assert_eq!(session.phase(), GamePhase::Playing);
        assert_eq!(session.taken, vec![pick]);
        assert!(!session.awaiting_choice());
    }

    #[test]
    fn test_double_level_up_offers_twice() {
        let mut session = session();
        // 100 then 120
        session.apply_outcome(&outcome_with_experience(220));
        assert_eq!(session.level, 3);
        let first = session.offer[0].clone();
        session.choose_upgrade(&first);
        assert!(session.awaiting_choice());
        assert_eq!(session.phase(), GamePhase::Paused);
        let second = session.offer[0].clone();
        session.choose_upgrade(&second);
        assert_eq!(session.phase(), GamePhase::Playing);
    }

    #[test]
    fn test_ticks_are_held_while_choosing() {
        let mut session = session();
        session.apply_outcome(&outcome_with_experience(100));
        let input = TickInput {
            viewport: Some(Viewport::default()),
            pause: true,
            ..Default::default()
        };
        session.tick(&input, 16.0, 16.0);
        assert_eq!(session.phase(), GamePhase::Paused);
        assert_eq!(session.world.elapsed_ms, 0.0);
    }

    #[test]
    fn test_score_accumulates() {
        let mut session = session();
        session.apply_outcome(&TickOutcome {
            score_delta: 25,
            ..Default::default()
        });
        session.apply_outcome(&TickOutcome {
            score_delta: 10,
            ..Default::default()
        });
        assert_eq!(session.score, 35);
    }
}
