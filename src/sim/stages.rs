//! Stage progression, boss triggers and the on-screen stage message

use std::sync::Arc;

use rand::Rng;
use serde::{Deserialize, Serialize};

use super::camera::Viewport;
use super::enemies::spawn_boss;
use super::state::WorldState;
use super::tick::{SimEvent, TickOutcome};
use crate::consts::STAGE_MESSAGE_MS;

/// Banner text with its expiry time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageMessage {
    pub text: String,
    pub expires_at_ms: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageTracker {
    /// 1-based stage number, only ever increases
    pub stage: usize,
    pub message: Option<StageMessage>,
    /// When the next recurring boss of an endless stage is due
    pub next_boss_due_ms: Option<f64>,
}

impl Default for StageTracker {
    fn default() -> Self {
        Self {
            stage: 1,
            message: None,
            next_boss_due_ms: None,
        }
    }
}

impl StageTracker {
    /// Show a banner, replacing whatever banner was up
    pub fn show_message(&mut self, text: impl Into<String>, now_ms: f64, duration_ms: f64) {
        self.message = Some(StageMessage {
            text: text.into(),
            expires_at_ms: now_ms + duration_ms,
        });
    }

    /// Clear the banner once its time is up. Returns true if it was cleared.
    pub fn expire_message(&mut self, now_ms: f64) -> bool {
        if self
            .message
            .as_ref()
            .is_some_and(|m| now_ms >= m.expires_at_ms)
        {
            self.message = None;
            return true;
        }
        false
    }
}

/// First multiple of `interval` at or after `from`
fn first_multiple_at_or_after(from: f64, interval: f64) -> f64 {
    (from / interval).ceil() * interval
}

/// Advance to the next stage once its time has come and run boss triggers.
///
/// Stage N ends at `duration * N` of total play time. Leaving a stage that
/// declares a boss spawns that boss. The endless stage spawns its boss
/// again every `boss_interval_ms`.
pub fn update_stages(
    world: &mut WorldState,
    viewport: Viewport,
    now_ms: f64,
    outcome: &mut TickOutcome,
) {
    let content = Arc::clone(&world.content);
    let number = world.stages.stage;
    let Some(current) = content.stage(number) else {
        return;
    };

    if let (Some(duration), Some(next)) = (current.duration_ms, content.stage(number + 1)) {
        if world.elapsed_ms >= duration * number as f64 {
            world.stages.stage = number + 1;
            world.stages.show_message(next.message.clone(), now_ms, STAGE_MESSAGE_MS);
            world.background_seed = world.rng.random();
            log::info!(
                "Stage {} -> {} ({}) at {:.1}s",
                number,
                number + 1,
                next.name,
                world.elapsed_ms / 1000.0
            );
            outcome.events.push(SimEvent::StageChanged {
                stage: number + 1,
                name: next.name.clone(),
                message: next.message.clone(),
            });

            if let Some(boss) = &current.boss {
                spawn_boss(world, boss, viewport, now_ms, outcome);
            }
            return;
        }
    }

    if let (Some(boss), Some(interval)) = (&current.boss, current.boss_interval_ms) {
        if !current.is_endless() || interval <= 0.0 {
            return;
        }
        let elapsed = world.elapsed_ms;
        let due = *world
            .stages
            .next_boss_due_ms
            .get_or_insert_with(|| first_multiple_at_or_after(elapsed, interval));
        if elapsed >= due {
            spawn_boss(world, boss, viewport, now_ms, outcome);
            // One boss per due time, even after a long stall
            let mut next_due = due + interval;
            while next_due <= elapsed {
                next_due += interval;
            }
            world.stages.next_boss_due_ms = Some(next_due);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tuning::Content;

    fn world() -> WorldState {
        WorldState::new(3, Arc::new(Content::default()))
    }

    fn bosses(world: &WorldState) -> usize {
        world.enemies.iter().filter(|e| e.is_boss).count()
    }

    #[test]
    fn test_message_replace_and_expire() {
        let mut tracker = StageTracker::default();
        tracker.show_message("first", 0.0, 3000.0);
        tracker.show_message("second", 1000.0, 3000.0);
        assert!(!tracker.expire_message(3500.0));
        assert_eq!(tracker.message.as_ref().map(|m| m.text.as_str()), Some("second"));
        assert!(tracker.expire_message(4000.0));
        assert!(tracker.message.is_none());
    }

    #[test]
    fn test_no_transition_before_duration() {
        let mut world = world();
        world.elapsed_ms = 119_999.0;
        let mut outcome = TickOutcome::default();
        update_stages(&mut world, Viewport::default(), 0.0, &mut outcome);
        assert_eq!(world.stages.stage, 1);
        assert!(outcome.events.is_empty());
    }

    #[test]
    fn test_transition_redraws_background() {
        let mut world = world();
        let before = world.background_seed;
        world.elapsed_ms = 120_000.0;
        let mut outcome = TickOutcome::default();
        update_stages(&mut world, Viewport::default(), 0.0, &mut outcome);
        assert_eq!(world.stages.stage, 2);
        assert_ne!(world.background_seed, before);
        assert!(world.stages.message.is_some());
    }

    #[test]
    fn test_endless_boss_due_times() {
        let content = Content::default();
        let endless = content.stages.len();
        let mut world = WorldState::new(3, Arc::new(content));
        world.stages.stage = endless;
        world.elapsed_ms = 610_000.0;

        let mut outcome = TickOutcome::default();
        update_stages(&mut world, Viewport::default(), 0.0, &mut outcome);
        assert_eq!(world.stages.next_boss_due_ms, Some(660_000.0));
        assert_eq!(bosses(&world), 0);

        world.elapsed_ms = 660_000.0;
        update_stages(&mut world, Viewport::default(), 0.0, &mut outcome);
        assert_eq!(bosses(&world), 1);
        assert_eq!(world.stages.next_boss_due_ms, Some(720_000.0));

        // A long stall spawns one boss and skips the missed slots
        world.elapsed_ms = 900_000.0;
        update_stages(&mut world, Viewport::default(), 0.0, &mut outcome);
        assert_eq!(bosses(&world), 2);
        assert_eq!(world.stages.next_boss_due_ms, Some(960_000.0));
    }

    #[test]
    fn test_first_multiple() {
        assert_eq!(first_multiple_at_or_after(600_000.0, 60_000.0), 600_000.0);
        assert_eq!(first_multiple_at_or_after(600_001.0, 60_000.0), 660_000.0);
    }
}
