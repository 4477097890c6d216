//! Per-frame simulation tick
//!
//! Advances the world by one host frame in a fixed order and reports what
//! happened as a list of events for the host to apply.

use glam::Vec2;

use super::camera::{Viewport, ZoomCommand};
use super::enemies::{spawn_enemies, update_enemies, update_gems};
use super::player::{
    MovementKeys, Vitals, animate_player, regenerate, resolve_vitals, update_player_position,
};
use super::stages::update_stages;
use super::state::{GamePhase, WorldState};
use super::weapons::{run_deferred, update_weapons};
use crate::direction_to;

/// Input for a single tick
#[derive(Debug, Clone, Default)]
pub struct TickInput {
    /// Movement keys held this frame
    pub movement: MovementKeys,
    /// Discrete zoom request (keys, wheel, buttons)
    pub zoom: Option<ZoomCommand>,
    /// Pause toggle
    pub pause: bool,
    /// Current host window; `None` skips the frame
    pub viewport: Option<Viewport>,
    /// Demo mode - steer away from enemies instead of reading `movement`
    pub autopilot: bool,
}

/// Something the host may want to react to
#[derive(Debug, Clone, PartialEq)]
pub enum SimEvent {
    EnemyKilled {
        id: u32,
        kind: String,
        experience: u32,
        boss: bool,
    },
    PlayerDamaged {
        amount: f32,
    },
    /// A hit was avoided by dash chance
    PlayerDodged,
    GemCollected {
        value: u32,
    },
    Revived {
        revives_left: u32,
    },
    GameOver,
    StageChanged {
        stage: usize,
        name: String,
        message: String,
    },
    BossSpawned {
        id: u32,
        name: String,
    },
    /// The stage banner timed out
    MessageCleared,
}

/// Result of one tick
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickOutcome {
    pub events: Vec<SimEvent>,
    /// Score earned from kills
    pub score_delta: u64,
    /// Experience picked up from gems
    pub experience_delta: u32,
    /// The frame was dropped (no viewport)
    pub skipped: bool,
}

impl TickOutcome {
    pub fn kills(&self) -> usize {
        self.events
            .iter()
            .filter(|e| matches!(e, SimEvent::EnemyKilled { .. }))
            .count()
    }

    pub fn is_game_over(&self) -> bool {
        self.events.contains(&SimEvent::GameOver)
    }

    /// New stage number, if the stage advanced
    pub fn stage_changed(&self) -> Option<usize> {
        self.events.iter().find_map(|e| match e {
            SimEvent::StageChanged { stage, .. } => Some(*stage),
            _ => None,
        })
    }
}

/// Advance the world by one frame.
///
/// `dt_ms` advances play time (stage clock, spawn ramp, regeneration).
/// `now_ms` is the host clock used for cooldowns, status effects, messages
/// and deferred effects.
pub fn tick(world: &mut WorldState, input: &TickInput, dt_ms: f64, now_ms: f64) -> TickOutcome {
    let mut outcome = TickOutcome::default();

    // Handle pause toggle
    if input.pause {
        match world.phase {
            GamePhase::Playing => {
                world.phase = GamePhase::Paused;
                return outcome;
            }
            GamePhase::Paused => world.phase = GamePhase::Playing,
            _ => {}
        }
    }

    if world.phase != GamePhase::Playing {
        return outcome;
    }

    let Some(viewport) = input.viewport else {
        log::trace!("No viewport, skipping tick {}", world.tick_count);
        outcome.skipped = true;
        return outcome;
    };

    world.elapsed_ms += dt_ms;
    world.tick_count += 1;

    if let Some(command) = input.zoom {
        world.camera.apply(command);
    }
    world.camera.update_zoom();

    regenerate(&mut world.stats, dt_ms);
    if !settle(world, now_ms, &mut outcome) {
        return outcome;
    }

    let keys = if input.autopilot {
        autopilot_keys(world)
    } else {
        input.movement
    };
    update_player_position(&mut world.player, &world.stats, keys);
    animate_player(&mut world.player, dt_ms);

    update_stages(world, viewport, now_ms, &mut outcome);
    update_weapons(world, dt_ms, now_ms, &mut outcome);
    while let Some(event) = world.scheduler.pop_due(now_ms) {
        run_deferred(world, event, now_ms, &mut outcome);
    }

    spawn_enemies(world, viewport);
    update_enemies(world, viewport, now_ms, &mut outcome);
    if !settle(world, now_ms, &mut outcome) {
        world.sweep();
        return outcome;
    }
    update_gems(world, &mut outcome);

    world.effects.advance();
    if world.stages.expire_message(now_ms) {
        outcome.events.push(SimEvent::MessageCleared);
    }

    world.sweep();
    outcome
}

/// Run the revive-or-death check; false means the rest of the tick is skipped
fn settle(world: &mut WorldState, now_ms: f64, outcome: &mut TickOutcome) -> bool {
    match resolve_vitals(world, now_ms) {
        Vitals::Alive => true,
        Vitals::Revived => {
            outcome.events.push(SimEvent::Revived {
                revives_left: world.stats.revive_count,
            });
            false
        }
        Vitals::Dead => {
            outcome.events.push(SimEvent::GameOver);
            false
        }
    }
}

/// Distance at which the autopilot starts backing away from an enemy
const AUTOPILOT_DANGER: f32 = 250.0;

/// Demo steering: flee nearby enemies, otherwise drift toward the nearest gem
fn autopilot_keys(world: &WorldState) -> MovementKeys {
    let pos = world.player.pos;

    let mut push = Vec2::ZERO;
    for enemy in world.enemies.iter().filter(|e| !e.is_dead) {
        let (away, distance) = direction_to(enemy.pos, pos);
        if distance < AUTOPILOT_DANGER {
            let weight = if enemy.is_boss { 2.0 } else { 1.0 };
            push += away * (AUTOPILOT_DANGER - distance) / AUTOPILOT_DANGER * weight;
        }
    }

    if push.length_squared() < 1e-4 {
        if let Some(gem) = world
            .gems
            .iter()
            .min_by(|a, b| a.pos.distance_squared(pos).total_cmp(&b.pos.distance_squared(pos)))
        {
            push = direction_to(pos, gem.pos).0;
        }
    }

    let dir = push.normalize_or_zero();
    // sin(22.5°): keeps straight lines from picking up a diagonal
    const AXIS: f32 = 0.38;
    MovementKeys {
        up: dir.y < -AXIS,
        down: dir.y > AXIS,
        left: dir.x < -AXIS,
        right: dir.x > AXIS,
    }
}
