//! Enemy spawning, movement, attacks and experience gem pickup

use std::f32::consts::TAU;
use std::sync::Arc;

use glam::Vec2;
use rand::Rng;

use super::camera::Viewport;
use super::player::damage_player;
use super::state::{Direction, Enemy, EnemyBehavior, WorldState, colors};
use super::tick::{SimEvent, TickOutcome};
use super::weapons::tick_frost;
use crate::consts::*;
use crate::tuning::{BossDescriptor, EnemyArchetype};
use crate::{angle_to_vec, direction_to};

/// Per-tick spawn probability for a stage spawn rate after `elapsed_ms` of play
pub fn spawn_chance(spawn_rate: f64, elapsed_ms: f64) -> f64 {
    (spawn_rate * (1.0 + elapsed_ms / SPAWN_RAMP_MS) / SPAWN_DAMP).min(SPAWN_CHANCE_CAP)
}

/// Roll for one new enemy of the current stage on a ring just outside view
pub fn spawn_enemies(world: &mut WorldState, viewport: Viewport) -> Option<u32> {
    let content = Arc::clone(&world.content);
    let stage = content.stage(world.stages.stage)?;

    if world.rng.random::<f64>() >= spawn_chance(stage.spawn_rate, world.elapsed_ms) {
        return None;
    }

    let pool: Vec<&EnemyArchetype> = stage
        .enemy_types
        .iter()
        .filter_map(|kind| content.archetype(kind))
        .collect();
    if pool.is_empty() {
        log::warn!("Stage {} has no known enemy archetypes", stage.name);
        return None;
    }
    let archetype = pool[world.rng.random_range(0..pool.len())];

    let visible = world.camera.visible_size(viewport);
    let distance = visible.x.max(visible.y) * SPAWN_RING_FACTOR;
    let angle = world.rng.random::<f32>() * TAU;
    let pos = world.player.pos + angle_to_vec(angle) * distance;

    let id = world.next_entity_id();
    let mut enemy = Enemy::from_archetype(id, archetype, pos);
    enemy.speed *= 0.8 + world.rng.random::<f32>() * 0.4;
    enemy.health *= 0.9 + world.rng.random::<f32>() * 0.2;
    enemy.max_health = enemy.health;

    world.enemies.push(enemy);
    Some(id)
}

/// Bring a stage boss in above the top of the visible area and announce it
pub fn spawn_boss(
    world: &mut WorldState,
    boss: &BossDescriptor,
    viewport: Viewport,
    now_ms: f64,
    outcome: &mut TickOutcome,
) -> Option<u32> {
    let content = Arc::clone(&world.content);
    let Some(archetype) = content.archetype(&boss.archetype) else {
        log::warn!(
            "Boss {} uses unknown archetype {:?}, not spawned",
            boss.name,
            boss.archetype
        );
        return None;
    };

    let visible = world.camera.visible_size(viewport);
    let pos = Vec2::new(
        world.player.pos.x,
        world.player.pos.y - visible.y / 2.0 - BOSS_SPAWN_MARGIN,
    );

    let id = world.next_entity_id();
    let mut enemy = Enemy::from_archetype(id, archetype, pos);
    enemy.health = boss.health.unwrap_or(archetype.health * 3.0);
    enemy.max_health = enemy.health;
    enemy.is_boss = true;
    enemy.name = Some(boss.name.clone());
    world.enemies.push(enemy);

    world
        .stages
        .show_message(format!("{} has appeared!", boss.name), now_ms, STAGE_MESSAGE_MS);
    world.effects.ring(pos, colors::STAGE, archetype.width);
    world
        .effects
        .burst(&mut world.rng, pos, 20, archetype.width, colors::STAGE, (3.0, 4.0), (40, 20));

    log::info!(
        "Boss {} spawned ({:.0} hp)",
        boss.name,
        boss.health.unwrap_or(archetype.health * 3.0)
    );
    outcome.events.push(SimEvent::BossSpawned {
        id,
        name: boss.name.clone(),
    });
    Some(id)
}

/// Advance one enemy toward the player.
///
/// Returns the damage it deals to the player this tick, if any. Exploders
/// mark themselves dead when they go off.
fn step_enemy(enemy: &mut Enemy, player_pos: Vec2, scale: f32, now_ms: f64) -> Option<f32> {
    tick_frost(enemy, now_ms);
    animate_enemy(enemy);
    if enemy
        .hit_flash
        .is_some_and(|flash| now_ms - flash.started_ms >= flash.duration_ms)
    {
        enemy.hit_flash = None;
    }

    let (heading, distance) = direction_to(enemy.pos, player_pos);

    if enemy.behavior == EnemyBehavior::Exploder && distance < EXPLODE_DISTANCE * scale {
        enemy.is_dead = true;
        return Some(enemy.damage);
    }

    let mut dealt = None;
    if distance < CONTACT_DISTANCE * scale && enemy.can_attack(now_ms) {
        enemy.last_attack_ms = Some(now_ms);
        dealt = Some(enemy.damage);
    }

    if let EnemyBehavior::Ranged { range } = enemy.behavior {
        if distance < range * scale {
            if enemy.can_attack(now_ms) {
                enemy.last_attack_ms = Some(now_ms);
                dealt = Some(enemy.damage);
            }
            // Holds position while in range
            return dealt;
        }
    }

    if distance > 0.0 {
        let step = heading * enemy.speed;
        enemy.pos += step;
        enemy.direction = Direction::from_motion(step);
    }
    dealt
}

fn animate_enemy(enemy: &mut Enemy) {
    enemy.frame_count += 1;
    if enemy.frame_count >= enemy.frame_delay {
        enemy.frame_count = 0;
        enemy.animation_frame = (enemy.animation_frame + 1) % enemy.animation_frames;
    }
}

/// Move every live enemy, apply their attacks and drop the dead ones
pub fn update_enemies(
    world: &mut WorldState,
    viewport: Viewport,
    now_ms: f64,
    outcome: &mut TickOutcome,
) {
    let scale = viewport.scale();
    let player_pos = world.player.pos;

    for index in 0..world.enemies.len() {
        let enemy = &mut world.enemies[index];
        if enemy.is_dead {
            continue;
        }
        if let Some(amount) = step_enemy(enemy, player_pos, scale, now_ms) {
            hurt_player(world, amount, outcome);
            // The rest of the horde waits for the revive-or-death check
            if world.stats.health <= 0.0 {
                break;
            }
        }
    }

    world.enemies.retain(|e| !e.is_dead);
}

fn hurt_player(world: &mut WorldState, amount: f32, outcome: &mut TickOutcome) {
    match damage_player(&mut world.stats, amount, &mut world.rng) {
        Some(taken) => {
            let pos = world.player.pos - Vec2::new(0.0, 20.0);
            world.effects.text(pos, taken, false, true);
            outcome.events.push(SimEvent::PlayerDamaged { amount: taken });
        }
        None => outcome.events.push(SimEvent::PlayerDodged),
    }
}

/// Pull gems inside the magnet radius toward the player and collect the close ones
pub fn update_gems(world: &mut WorldState, outcome: &mut TickOutcome) {
    let magnet = GEM_MAGNET_RADIUS * world.stats.magnet_radius;
    let player_pos = world.player.pos;

    for gem in &mut world.gems {
        if gem.collected {
            continue;
        }
        let (heading, distance) = direction_to(gem.pos, player_pos);
        if distance < GEM_COLLECT_RADIUS {
            gem.collected = true;
            outcome.experience_delta += gem.value;
            outcome.events.push(SimEvent::GemCollected { value: gem.value });
        } else if distance < magnet {
            gem.pos += heading * (5.0 * (1.0 - distance / magnet) + 2.0);
        }
    }

    world.gems.retain(|g| !g.collected);
}
