//! Weapons, projectiles and hit resolution
//!
//! Wand and axe fire projectiles that live in their weapon. Fire, frost and
//! lightning act on enemies directly. Every source of damage funnels into
//! [`damage_enemy`], which is the only place an enemy can die from a hit.

use std::f32::consts::{PI, TAU};

use glam::Vec2;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::schedule::Deferred;
use super::state::{
    EffectKind, Enemy, ExperienceGem, FrostEffect, HitFlash, PlayerStats, VisualEffect, WorldState,
    colors,
};
use super::tick::{SimEvent, TickOutcome};
use crate::angle_to_vec;
use crate::consts::REFERENCE_FRAME_MS;
use crate::settings::AuraTiming;

pub const WAND_SPEED: f32 = 6.5;
pub const WAND_SPREAD: f32 = PI / 8.0;
pub const AXE_SPEED: f32 = 3.0;
pub const AXE_SPIN: f32 = 0.2;
pub const AXE_WAVE_DELAY_MS: f64 = 500.0;
pub const FROST_SHARD_DELAY_MS: f64 = 300.0;
pub const LIGHTNING_STAGGER_MS: f64 = 150.0;
pub const FROST_SHARD_COUNT: u32 = 3;
pub const FROST_SHARD_SPEED: f32 = 2.5;

/// Weapon type with its per-type parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WeaponKind {
    Wand,
    Axe,
    /// Damage aura around the player
    Fire { radius: f32 },
    /// Periodic slowing burst
    Frost { radius: f32, duration_ms: f64 },
    /// Strikes random enemies
    Lightning { target_count: u32 },
}

impl WeaponKind {
    /// Default parameters for a weapon named in an upgrade id
    pub fn from_token(token: &str) -> Option<Self> {
        Some(match token {
            "wand" => WeaponKind::Wand,
            "axe" => WeaponKind::Axe,
            "fire" => WeaponKind::Fire { radius: 50.0 },
            "frost" => WeaponKind::Frost {
                radius: 80.0,
                duration_ms: 2000.0,
            },
            "lightning" => WeaponKind::Lightning { target_count: 3 },
            _ => return None,
        })
    }

    pub fn token(&self) -> &'static str {
        match self {
            WeaponKind::Wand => "wand",
            WeaponKind::Axe => "axe",
            WeaponKind::Fire { .. } => "fire",
            WeaponKind::Frost { .. } => "frost",
            WeaponKind::Lightning { .. } => "lightning",
        }
    }

    pub fn base_cooldown_ms(&self) -> f64 {
        match self {
            WeaponKind::Wand => 1000.0,
            WeaponKind::Axe => 2000.0,
            WeaponKind::Fire { .. } => 500.0,
            WeaponKind::Frost { .. } => 3000.0,
            WeaponKind::Lightning { .. } => 2500.0,
        }
    }

    pub fn color(&self) -> [f32; 4] {
        match self {
            WeaponKind::Wand => colors::WAND,
            WeaponKind::Axe => colors::AXE,
            WeaponKind::Fire { .. } => colors::FLAME,
            WeaponKind::Frost { .. } => colors::FROST,
            WeaponKind::Lightning { .. } => colors::LIGHTNING,
        }
    }
}

/// Status effect carried by a projectile and applied on hit
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StatusEffect {
    Frost { duration_ms: f64 },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Projectile {
    pub pos: Vec2,
    pub vel: Vec2,
    pub damage: f32,
    /// Radius (wand) or half-extent (axe) used for hits
    pub radius: f32,
    pub traveled: f32,
    pub max_distance: f32,
    /// Spin angle, axes only
    pub rotation: Option<f32>,
    /// Keeps flying after a hit
    pub piercing: bool,
    pub status: Option<StatusEffect>,
}

impl Projectile {
    fn wand(origin: Vec2, angle: f32, profile: &FireProfile) -> Self {
        Self {
            pos: origin,
            vel: angle_to_vec(angle) * WAND_SPEED,
            damage: profile.damage,
            radius: profile.radius,
            traveled: 0.0,
            max_distance: profile.range,
            rotation: None,
            piercing: false,
            status: None,
        }
    }

    fn axe(origin: Vec2, angle: f32, profile: &FireProfile) -> Self {
        Self {
            pos: origin,
            vel: angle_to_vec(angle) * AXE_SPEED,
            damage: profile.damage,
            radius: profile.radius,
            traveled: 0.0,
            max_distance: profile.range,
            rotation: Some(0.0),
            piercing: true,
            status: None,
        }
    }

    fn shard(origin: Vec2, angle: f32, damage: f32, area: f32, duration_ms: f64) -> Self {
        Self {
            pos: origin,
            vel: angle_to_vec(angle) * FROST_SHARD_SPEED,
            damage,
            radius: 4.0 * area,
            traveled: 0.0,
            max_distance: 60.0 * area,
            rotation: None,
            piercing: false,
            status: Some(StatusEffect::Frost { duration_ms }),
        }
    }
}

/// Numbers for one firing, derived from weapon level and player stats
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FireProfile {
    /// Projectiles (wand, axe) or targets (lightning)
    pub count: u32,
    pub damage: f32,
    /// Hit radius for projectiles, effect radius for aura and nova
    pub radius: f32,
    /// Maximum travel distance for projectiles
    pub range: f32,
}

/// A weapon owned by the player; one per kind
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Weapon {
    pub id: u32,
    #[serde(flatten)]
    pub kind: WeaponKind,
    pub level: u8,
    pub cooldown_ms: f64,
    /// `None` until the first shot, so a new weapon fires immediately
    #[serde(default)]
    pub last_fired_ms: Option<f64>,
    #[serde(default)]
    pub projectiles: Vec<Projectile>,
}

impl Weapon {
    pub fn new(id: u32, kind: WeaponKind, level: u8) -> Self {
        Self {
            id,
            kind,
            level: level.max(1),
            cooldown_ms: kind.base_cooldown_ms(),
            last_fired_ms: None,
            projectiles: Vec::new(),
        }
    }

    /// Base cooldown scaled by the player's multiplier (lower fires faster)
    pub fn effective_cooldown_ms(&self, stats: &PlayerStats) -> f64 {
        self.cooldown_ms * stats.cooldown as f64
    }

    pub fn is_ready(&self, now_ms: f64, stats: &PlayerStats) -> bool {
        self.last_fired_ms
            .is_none_or(|last| now_ms - last >= self.effective_cooldown_ms(stats))
    }

    pub fn profile(&self, stats: &PlayerStats) -> FireProfile {
        let level = self.level;
        match self.kind {
            WeaponKind::Wand => FireProfile {
                count: level as u32,
                damage: stats.damage,
                radius: 5.0 * stats.area,
                range: 350.0 * stats.area,
            },
            WeaponKind::Axe => FireProfile {
                count: level as u32 + 1,
                damage: stats.damage * 1.5 * if level >= 3 { 1.3 } else { 1.0 },
                radius: 5.0 * stats.area,
                range: 200.0 * stats.area * if level >= 2 { 1.2 } else { 1.0 },
            },
            WeaponKind::Fire { radius } => FireProfile {
                count: 0,
                damage: stats.damage * 0.2 * by_level(level, 1.0, 1.5, 2.0),
                radius: radius * stats.area * by_level(level, 1.0, 1.2, 1.5),
                range: 0.0,
            },
            WeaponKind::Frost { radius, .. } => FireProfile {
                count: 0,
                damage: stats.damage * if level >= 2 { 1.2 } else { 0.8 },
                radius: radius * stats.area * if level >= 2 { 1.3 } else { 1.0 },
                range: 0.0,
            },
            WeaponKind::Lightning { target_count } => FireProfile {
                count: target_count,
                damage: stats.damage * 1.5,
                radius: 0.0,
                range: 0.0,
            },
        }
    }

    /// Wand fan centered on `facing`
    pub fn wand_volley(&self, origin: Vec2, facing: f32, stats: &PlayerStats) -> Vec<Projectile> {
        let profile = self.profile(stats);
        let center = (profile.count as f32 - 1.0) / 2.0;
        (0..profile.count)
            .map(|i| Projectile::wand(origin, facing + WAND_SPREAD * (i as f32 - center), &profile))
            .collect()
    }

    /// Axes spread evenly around `base_angle`
    pub fn axe_volley(
        &self,
        origin: Vec2,
        base_angle: f32,
        stats: &PlayerStats,
    ) -> Vec<Projectile> {
        let profile = self.profile(stats);
        let step = TAU / profile.count as f32;
        (0..profile.count)
            .map(|i| Projectile::axe(origin, base_angle + step * i as f32, &profile))
            .collect()
    }

    /// Ice shards flung outward from a frozen enemy, evenly spaced from
    /// `first_angle`. Each one slows what it hits.
    pub fn shard_volley(
        &self,
        center: Vec2,
        spread: f32,
        first_angle: f32,
        stats: &PlayerStats,
    ) -> Vec<Projectile> {
        let damage = self.profile(stats).damage * 0.25;
        let duration_ms = self.frost_duration_ms(stats);
        let step = TAU / FROST_SHARD_COUNT as f32;
        (0..FROST_SHARD_COUNT)
            .map(|i| {
                let angle = first_angle + step * i as f32;
                let origin = center + angle_to_vec(angle) * spread;
                Projectile::shard(origin, angle, damage, stats.area, duration_ms)
            })
            .collect()
    }

    /// Per-tick chance that the fire aura burns an enemy in range
    pub fn aura_chance(&self) -> f64 {
        if self.level >= 3 { 0.1 } else { 0.05 }
    }

    /// Burn chance for one tick of `dt_ms`
    pub fn aura_roll_chance(&self, timing: AuraTiming, dt_ms: f64) -> f64 {
        match timing {
            AuraTiming::PerTick => self.aura_chance(),
            AuraTiming::FrameRateIndependent => {
                1.0 - (1.0 - self.aura_chance()).powf(dt_ms / REFERENCE_FRAME_MS)
            }
        }
    }

    /// Slow duration of a frost nova
    pub fn frost_duration_ms(&self, stats: &PlayerStats) -> f64 {
        match self.kind {
            WeaponKind::Frost { duration_ms, .. } => {
                duration_ms * if self.level >= 2 { 1.5 } else { 1.0 } * stats.duration as f64
            }
            _ => 0.0,
        }
    }
}

fn by_level(level: u8, one: f32, two: f32, three: f32) -> f32 {
    match level {
        0 | 1 => one,
        2 => two,
        _ => three,
    }
}

/// Roll a critical hit, returning whether it crit and the damage multiplier
pub fn roll_critical<R: Rng>(stats: &PlayerStats, rng: &mut R) -> (bool, f32) {
    if rng.random::<f32>() < stats.crit_probability() {
        (true, stats.crit_multiplier())
    } else {
        (false, 1.0)
    }
}

/// Slow an enemy, or refresh an existing slow without stacking it
pub fn apply_frost(enemy: &mut Enemy, now_ms: f64, duration_ms: f64) {
    match &mut enemy.frost {
        Some(frost) => {
            frost.started_ms = now_ms;
            frost.duration_ms = duration_ms;
        }
        None => {
            enemy.frost = Some(FrostEffect {
                original_speed: enemy.speed,
                started_ms: now_ms,
                duration_ms,
            });
            enemy.speed *= FrostEffect::SPEED_FACTOR;
        }
    }
}

/// Lift an expired slow, restoring the speed it replaced
pub fn tick_frost(enemy: &mut Enemy, now_ms: f64) {
    if let Some(frost) = enemy.frost {
        if frost.expired(now_ms) {
            enemy.speed = frost.original_speed;
            enemy.frost = None;
        }
    }
}

/// Apply `damage` to the enemy at `index`.
///
/// Returns true only on the hit that kills it; hits on an already dead
/// enemy do nothing. A kill drops a gem at the enemy's position, awards
/// its experience value as score and reports `EnemyKilled`.
pub fn damage_enemy(
    world: &mut WorldState,
    index: usize,
    damage: f32,
    critical: bool,
    now_ms: f64,
    outcome: &mut TickOutcome,
) -> bool {
    let Some(enemy) = world.enemies.get_mut(index) else {
        return false;
    };
    if enemy.is_dead {
        return false;
    }

    enemy.health -= damage;
    enemy.hit_flash = Some(HitFlash {
        started_ms: now_ms,
        duration_ms: if critical { 300.0 } else { 150.0 },
        critical,
    });
    let text_pos = enemy.pos - Vec2::new(0.0, enemy.size.y / 2.0);
    world.effects.text(text_pos, damage.floor(), critical, false);

    if enemy.health > 0.0 {
        return false;
    }

    enemy.is_dead = true;
    let pos = enemy.pos;
    let id = enemy.id;
    let value = enemy.experience_value;
    let is_boss = enemy.is_boss;
    let half_width = enemy.half_width();
    let kind = enemy.kind.clone();
    if let Some(name) = &enemy.name {
        log::info!("{name} defeated");
    }

    let particles = if is_boss { 30 } else { 10 };
    world
        .effects
        .burst(&mut world.rng, pos, particles, half_width, colors::DEATH, (3.0, 5.0), (20, 20));

    let gem_size = if is_boss { 20.0 } else { 15.0 };
    world.gems.push(ExperienceGem {
        pos,
        value,
        size: gem_size,
        collected: false,
    });
    let drop_chance = world.stats.drop_chance;
    if drop_chance > 0.0 && world.rng.random::<f32>() * 100.0 < drop_chance {
        let offset = angle_to_vec(world.rng.random::<f32>() * TAU) * 10.0;
        world.gems.push(ExperienceGem {
            pos: pos + offset,
            value,
            size: gem_size,
            collected: false,
        });
    }

    outcome.score_delta += value as u64;
    outcome.events.push(SimEvent::EnemyKilled {
        id,
        kind,
        experience: value,
        boss: is_boss,
    });
    true
}

/// Fire every ready weapon, run the fire aura and move projectiles
pub fn update_weapons(world: &mut WorldState, dt_ms: f64, now_ms: f64, outcome: &mut TickOutcome) {
    let mut weapons = std::mem::take(&mut world.player.weapons);

    for weapon in &mut weapons {
        if weapon.is_ready(now_ms, &world.stats) {
            weapon.last_fired_ms = Some(now_ms);
            fire(world, weapon, now_ms, outcome);
        }
        if let WeaponKind::Fire { .. } = weapon.kind {
            burn(world, weapon, dt_ms, now_ms, outcome);
        }
        advance_projectiles(world, weapon, now_ms, outcome);
    }

    world.player.weapons = weapons;
}

fn fire(world: &mut WorldState, weapon: &mut Weapon, now_ms: f64, outcome: &mut TickOutcome) {
    let origin = world.player.pos;
    match weapon.kind {
        WeaponKind::Wand => {
            let facing = world.player.direction.angle();
            let volley = weapon.wand_volley(origin, facing, &world.stats);
            log::debug!("Wand L{} fired {} bolts", weapon.level, volley.len());
            weapon.projectiles.extend(volley);
        }
        WeaponKind::Axe => {
            let base_angle = world.rng.random::<f32>() * TAU;
            let volley = weapon.axe_volley(origin, base_angle, &world.stats);
            log::debug!("Axe L{} threw {} axes", weapon.level, volley.len());
            if weapon.level >= 3 {
                world.scheduler.schedule(
                    now_ms + AXE_WAVE_DELAY_MS,
                    Deferred::AxeWave {
                        weapon_id: weapon.id,
                        base_angle,
                        count: volley.len() as u32,
                    },
                );
            }
            weapon.projectiles.extend(volley);
        }
        // The aura burns every tick; its cooldown only paces logging
        WeaponKind::Fire { .. } => {}
        WeaponKind::Frost { .. } => frost_nova(world, weapon, now_ms, outcome),
        WeaponKind::Lightning { .. } => lightning(world, weapon, now_ms),
    }
}

fn burn(
    world: &mut WorldState,
    weapon: &Weapon,
    dt_ms: f64,
    now_ms: f64,
    outcome: &mut TickOutcome,
) {
    let profile = weapon.profile(&world.stats);
    let chance = weapon.aura_roll_chance(world.aura_timing, dt_ms);
    let center = world.player.pos;

    for index in 0..world.enemies.len() {
        let enemy = &world.enemies[index];
        if enemy.is_dead || enemy.pos.distance(center) >= profile.radius + enemy.half_width() {
            continue;
        }
        if world.rng.random::<f64>() >= chance {
            continue;
        }

        damage_enemy(world, index, profile.damage, false, now_ms, outcome);

        if world.rng.random::<f32>() < 0.2 {
            let rng = &mut world.rng;
            let angle = rng.random::<f32>() * TAU;
            let pos = center + angle_to_vec(angle) * rng.random::<f32>() * profile.radius * 0.8;
            let hot = weapon.level >= 3 && rng.random::<f32>() < 0.3;
            let heading = -PI / 2.0 + rng.random::<f32>() * 0.5 - 0.25;
            let speed = 0.5 + rng.random::<f32>();
            let size = 3.0 + rng.random::<f32>() * 5.0;
            let duration = rng.random_range(10..=20);
            world.effects.push(VisualEffect {
                pos,
                vel: angle_to_vec(heading) * speed,
                kind: EffectKind::Flame,
                color: if hot { colors::FLAME_HOT } else { colors::FLAME },
                size,
                frame: 0,
                duration,
            });
        }
    }
}

fn frost_nova(world: &mut WorldState, weapon: &Weapon, now_ms: f64, outcome: &mut TickOutcome) {
    let profile = weapon.profile(&world.stats);
    let duration_ms = weapon.frost_duration_ms(&world.stats);
    let center = world.player.pos;
    log::debug!("Frost nova L{} radius {:.0}", weapon.level, profile.radius);

    world
        .effects
        .burst(&mut world.rng, center, 20, profile.radius, colors::FROST, (4.0, 5.0), (30, 20));
    world.effects.ring(center, colors::FROST, profile.radius);

    for index in 0..world.enemies.len() {
        let enemy = &world.enemies[index];
        if enemy.is_dead || enemy.pos.distance(center) >= profile.radius + enemy.half_width() {
            continue;
        }

        let (critical, multiplier) = roll_critical(&world.stats, &mut world.rng);
        damage_enemy(world, index, profile.damage * multiplier, critical, now_ms, outcome);

        let enemy = &mut world.enemies[index];
        if enemy.is_dead {
            continue;
        }
        apply_frost(enemy, now_ms, duration_ms);
        let (pos, id, half_width) = (enemy.pos, enemy.id, enemy.half_width());
        world
            .effects
            .burst(&mut world.rng, pos, 5, half_width, colors::FROST, (2.0, 3.0), (20, 20));
        if weapon.level >= 2 {
            world.scheduler.schedule(
                now_ms + FROST_SHARD_DELAY_MS,
                Deferred::FrostShards {
                    weapon_id: weapon.id,
                    enemy: id,
                },
            );
        }
    }
}

fn lightning(world: &mut WorldState, weapon: &Weapon, now_ms: f64) {
    let profile = weapon.profile(&world.stats);
    let mut candidates: Vec<u32> = world
        .enemies
        .iter()
        .filter(|e| !e.is_dead)
        .map(|e| e.id)
        .collect();
    if candidates.is_empty() {
        return;
    }

    let picks = (profile.count as usize).min(candidates.len());
    let mut targets = Vec::with_capacity(picks);
    for _ in 0..picks {
        let pick = world.rng.random_range(0..candidates.len());
        targets.push(candidates.swap_remove(pick));
    }
    log::debug!("Lightning striking {} targets", targets.len());

    for (index, &target) in targets.iter().enumerate() {
        let (critical, multiplier) = roll_critical(&world.stats, &mut world.rng);
        world.scheduler.schedule(
            now_ms + LIGHTNING_STAGGER_MS * index as f64,
            Deferred::LightningStrike {
                target,
                damage: profile.damage * multiplier,
                critical,
                next: targets.get(index + 1).copied(),
            },
        );
    }
}

fn advance_projectiles(
    world: &mut WorldState,
    weapon: &mut Weapon,
    now_ms: f64,
    outcome: &mut TickOutcome,
) {
    if weapon.projectiles.is_empty() {
        return;
    }
    let color = weapon.kind.color();
    let mut projectiles = std::mem::take(&mut weapon.projectiles);

    projectiles.retain_mut(|projectile| {
        projectile.pos += projectile.vel;
        projectile.traveled += projectile.vel.length();
        if let Some(rotation) = &mut projectile.rotation {
            *rotation += AXE_SPIN;
        }

        let mut spent = false;
        for index in 0..world.enemies.len() {
            let enemy = &world.enemies[index];
            if enemy.is_dead
                || enemy.pos.distance(projectile.pos) >= projectile.radius + enemy.half_width()
            {
                continue;
            }

            let (critical, multiplier) = roll_critical(&world.stats, &mut world.rng);
            world.effects.ring(projectile.pos, color, projectile.radius);
            if let Some(StatusEffect::Frost { duration_ms }) = projectile.status {
                let enemy = &mut world.enemies[index];
                apply_frost(enemy, now_ms, duration_ms);
                let (pos, spread) = (enemy.pos, enemy.size.x * 0.6);
                world
                    .effects
                    .burst(&mut world.rng, pos, 8, spread, colors::FROST, (3.0, 4.0), (40, 20));
            }
            damage_enemy(world, index, projectile.damage * multiplier, critical, now_ms, outcome);

            if !projectile.piercing {
                spent = true;
                break;
            }
        }

        !spent && projectile.traveled < projectile.max_distance
    });

    weapon.projectiles = projectiles;
}

/// Run a deferred sub-effect whose time has come.
///
/// The target is looked up again by id; if it is gone the entry does nothing.
pub fn run_deferred(
    world: &mut WorldState,
    event: Deferred,
    now_ms: f64,
    outcome: &mut TickOutcome,
) {
    match event {
        Deferred::AxeWave {
            weapon_id,
            base_angle,
            count,
        } => {
            let origin = world.player.pos;
            let offset = PI / count.max(1) as f32;
            let volley = match world.player.weapon(weapon_id) {
                Some(weapon) if weapon.kind == WeaponKind::Axe => {
                    weapon.axe_volley(origin, base_angle + offset, &world.stats)
                }
                _ => {
                    log::trace!("Axe wave for missing weapon {weapon_id} dropped");
                    return;
                }
            };
            if let Some(weapon) = world.player.weapon_mut(weapon_id) {
                weapon.projectiles.extend(volley);
            }
        }
        Deferred::LightningStrike {
            target,
            damage,
            critical,
            next,
        } => {
            let Some(index) = world
                .enemies
                .iter()
                .position(|e| e.id == target && !e.is_dead)
            else {
                return;
            };
            let (pos, width) = (world.enemies[index].pos, world.enemies[index].size.x);

            for i in 0..10 {
                let jitter = (world.rng.random::<f32>() - 0.5) * 10.0;
                let size = 3.0 + world.rng.random::<f32>() * 3.0;
                let duration = world.rng.random_range(10..=15);
                world.effects.push(VisualEffect {
                    pos: pos + Vec2::new(jitter, -300.0 + i as f32 * 30.0),
                    vel: Vec2::ZERO,
                    kind: EffectKind::Particle,
                    color: colors::BOLT,
                    size,
                    frame: 0,
                    duration,
                });
            }
            world.effects.ring(pos, colors::LIGHTNING, width);
            world
                .effects
                .burst(&mut world.rng, pos, 15, width, colors::LIGHTNING, (2.0, 4.0), (20, 10));

            damage_enemy(world, index, damage, critical, now_ms, outcome);

            if let Some(next_pos) = next.and_then(|id| world.enemy(id)).map(|e| e.pos) {
                chain(world, pos, next_pos);
            }
        }
        Deferred::FrostShards { weapon_id, enemy } => {
            let Some(target) = world.enemy(enemy).filter(|e| !e.is_dead) else {
                return;
            };
            let (pos, width) = (target.pos, target.size.x);
            let first_angle = world.rng.random::<f32>() * TAU;
            let shards = match world.player.weapon(weapon_id) {
                Some(weapon) if matches!(weapon.kind, WeaponKind::Frost { .. }) => {
                    weapon.shard_volley(pos, width * 1.5, first_angle, &world.stats)
                }
                _ => {
                    log::trace!("Frost shards for missing weapon {weapon_id} dropped");
                    return;
                }
            };

            for shard in &shards {
                let size = 5.0 + world.rng.random::<f32>() * 3.0;
                let duration = world.rng.random_range(60..=90);
                world.effects.push(VisualEffect {
                    pos: shard.pos,
                    vel: Vec2::ZERO,
                    kind: EffectKind::Particle,
                    color: colors::ICE_SHARD,
                    size,
                    frame: 0,
                    duration,
                });
            }
            if let Some(weapon) = world.player.weapon_mut(weapon_id) {
                weapon.projectiles.extend(shards);
            }
        }
    }
}

/// Jagged segment particles between two strike points
fn chain(world: &mut WorldState, from: Vec2, to: Vec2) {
    let segments = (from.distance(to) / 20.0).ceil() as u32;
    for i in 0..segments {
        let along = from.lerp(to, i as f32 / segments as f32);
        let jitter = Vec2::new(
            (world.rng.random::<f32>() - 0.5) * 15.0,
            (world.rng.random::<f32>() - 0.5) * 15.0,
        );
        let size = 3.0 + world.rng.random::<f32>() * 2.0;
        let duration = world.rng.random_range(10..=15);
        world.effects.push(VisualEffect {
            pos: along + jitter,
            vel: Vec2::ZERO,
            kind: EffectKind::Particle,
            color: colors::BOLT,
            size,
            frame: 0,
            duration,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tuning::Content;
    use std::sync::Arc;

    fn world() -> WorldState {
        WorldState::new(11, Arc::new(Content::default()))
    }

    fn enemy_at(world: &mut WorldState, kind: &str, pos: Vec2) -> usize {
        let archetype = world.content.archetype(kind).expect("archetype").clone();
        let id = world.next_entity_id();
        world.enemies.push(Enemy::from_archetype(id, &archetype, pos));
        world.enemies.len() - 1
    }

    #[test]
    fn test_wand_level_one_single_bolt() {
        let world = world();
        let wand = &world.player.weapons[0];
        let volley = wand.wand_volley(world.player.pos, 0.0, &world.stats);
        assert_eq!(volley.len(), 1);
        assert_eq!(volley[0].damage, 18.0);
        assert!((volley[0].max_distance - 420.0).abs() < 1e-3);
        assert!(!volley[0].piercing);
    }

    #[test]
    fn test_wand_fan_is_centered() {
        let world = world();
        let wand = Weapon::new(1, WeaponKind::Wand, 3);
        let volley = wand.wand_volley(Vec2::ZERO, 0.0, &world.stats);
        assert_eq!(volley.len(), 3);
        assert!(volley[1].vel.y.abs() < 1e-5);
        assert!((volley[0].vel.y + volley[2].vel.y).abs() < 1e-5);
    }

    #[test]
    fn test_axe_profile_by_level() {
        let stats = PlayerStats::default();
        let l1 = Weapon::new(1, WeaponKind::Axe, 1).profile(&stats);
        let l3 = Weapon::new(1, WeaponKind::Axe, 3).profile(&stats);
        assert_eq!(l1.count, 2);
        assert!((l1.damage - 27.0).abs() < 1e-4);
        assert!((l1.range - 240.0).abs() < 1e-3);
        assert_eq!(l3.count, 4);
        assert!((l3.damage - 35.1).abs() < 1e-3);
        assert!((l3.range - 288.0).abs() < 1e-3);
    }

    #[test]
    fn test_weapon_serde_keeps_fire_formulas() {
        let stats = PlayerStats::default();
        let axe = Weapon::new(4, WeaponKind::Axe, 2);
        let json = serde_json::to_string(&axe).expect("serialize");
        assert!(json.contains("\"type\":\"axe\""));
        let back: Weapon = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, axe);
        assert_eq!(
            back.axe_volley(Vec2::ZERO, 1.0, &stats),
            axe.axe_volley(Vec2::ZERO, 1.0, &stats)
        );
    }

    #[test]
    fn test_kill_happens_once() {
        let mut world = world();
        let index = enemy_at(&mut world, "ghost", Vec2::new(100.0, 100.0));
        let mut outcome = TickOutcome::default();

        assert!(damage_enemy(&mut world, index, 20.0, false, 0.0, &mut outcome));
        assert!(!damage_enemy(&mut world, index, 20.0, false, 0.0, &mut outcome));

        assert!(world.enemies[index].is_dead);
        assert_eq!(world.gems.len(), 1);
        assert_eq!(world.gems[0].value, 15);
        assert_eq!(world.gems[0].pos, Vec2::new(100.0, 100.0));
        assert_eq!(outcome.score_delta, 15);
        assert_eq!(outcome.kills(), 1);
    }

    #[test]
    fn test_drop_chance_doubles_gems() {
        let mut world = world();
        world.stats.drop_chance = 100.0;
        let index = enemy_at(&mut world, "ghost", Vec2::ZERO);
        let mut outcome = TickOutcome::default();
        damage_enemy(&mut world, index, 100.0, false, 0.0, &mut outcome);
        assert_eq!(world.gems.len(), 2);
        assert_eq!(outcome.score_delta, 15);
    }

    #[test]
    fn test_frost_refreshes_without_stacking() {
        let mut world = world();
        let index = enemy_at(&mut world, "ghost", Vec2::ZERO);
        let enemy = &mut world.enemies[index];
        apply_frost(enemy, 0.0, 2000.0);
        apply_frost(enemy, 1000.0, 2000.0);
        assert!((enemy.speed - 0.75).abs() < 1e-6);

        tick_frost(enemy, 2500.0);
        assert!(enemy.frost.is_some());
        tick_frost(enemy, 3001.0);
        assert!(enemy.frost.is_none());
        assert_eq!(enemy.speed, 1.5);
    }

    #[test]
    fn test_lightning_without_enemies_is_noop() {
        let mut world = world();
        let bolt = Weapon::new(9, WeaponKind::Lightning { target_count: 3 }, 1);
        lightning(&mut world, &bolt, 0.0);
        assert!(world.scheduler.is_empty());
    }

    #[test]
    fn test_lightning_picks_distinct_targets() {
        let mut world = world();
        for i in 0..5 {
            enemy_at(&mut world, "tank", Vec2::new(i as f32 * 50.0, 0.0));
        }
        let bolt = Weapon::new(9, WeaponKind::Lightning { target_count: 3 }, 1);
        lightning(&mut world, &bolt, 0.0);
        assert_eq!(world.scheduler.len(), 3);

        let mut targets = Vec::new();
        let mut outcome = TickOutcome::default();
        while let Some(event) = world.scheduler.pop_due(1000.0) {
            if let Deferred::LightningStrike { target, .. } = &event {
                targets.push(*target);
            }
            run_deferred(&mut world, event, 1000.0, &mut outcome);
        }
        targets.sort_unstable();
        targets.dedup();
        assert_eq!(targets.len(), 3);
        let hurt = world.enemies.iter().filter(|e| e.health < e.max_health).count();
        assert_eq!(hurt, 3);
    }

    #[test]
    fn test_axe_wave_dropped_when_weapon_gone() {
        let mut world = world();
        let mut outcome = TickOutcome::default();
        world.player.weapons.clear();
        run_deferred(
            &mut world,
            Deferred::AxeWave {
                weapon_id: 42,
                base_angle: 0.0,
                count: 4,
            },
            500.0,
            &mut outcome,
        );
        assert!(world.player.weapons.is_empty());
        assert!(outcome.events.is_empty());
    }

    #[test]
    fn test_level_three_axe_schedules_second_wave() {
        let mut world = world();
        let id = world.next_entity_id();
        world.player.weapons = vec![Weapon::new(id, WeaponKind::Axe, 3)];
        let mut outcome = TickOutcome::default();
        update_weapons(&mut world, 16.0, 0.0, &mut outcome);
        assert_eq!(world.player.weapons[0].projectiles.len(), 4);
        assert_eq!(world.scheduler.len(), 1);

        let event = world.scheduler.pop_due(500.0).expect("wave due");
        run_deferred(&mut world, event, 500.0, &mut outcome);
        assert_eq!(world.player.weapons[0].projectiles.len(), 8);
    }

    #[test]
    fn test_wand_bolt_despawns_on_hit() {
        let mut world = world();
        // Facing down from the start position
        let pos = world.player.pos + Vec2::new(0.0, 30.0);
        let index = enemy_at(&mut world, "tank", pos);
        let mut outcome = TickOutcome::default();
        for tick in 0..10 {
            update_weapons(&mut world, 16.0, 16.0 * tick as f64, &mut outcome);
        }
        assert!(world.enemies[index].health < world.enemies[index].max_health);
        assert!(world.player.weapons[0].projectiles.is_empty());
    }

    /// Plain numbers: unit area and no crits
    fn steady_world() -> WorldState {
        let mut world = world();
        world.stats.area = 1.0;
        world.stats.crit_chance = Some(0.0);
        world
    }

    fn sturdy_tank(world: &mut WorldState, pos: Vec2) -> usize {
        let index = enemy_at(world, "tank", pos);
        world.enemies[index].health = 10_000.0;
        world.enemies[index].max_health = 10_000.0;
        index
    }

    #[test]
    fn test_aura_reaches_exactly_its_radius() {
        for (level, radius, damage) in [(1, 50.0, 3.6), (2, 60.0, 5.4), (3, 75.0, 7.2)] {
            let mut world = steady_world();
            let center = world.player.pos;
            // Tanks are 40 wide, so the edge is 20 past the center
            let inside = sturdy_tank(&mut world, center + Vec2::new(radius + 19.0, 0.0));
            let outside = sturdy_tank(&mut world, center - Vec2::new(radius + 21.0, 0.0));
            let fire = Weapon::new(99, WeaponKind::Fire { radius: 50.0 }, level);
            assert!((fire.profile(&world.stats).radius - radius).abs() < 1e-4);

            let mut outcome = TickOutcome::default();
            for tick in 0..400 {
                burn(&mut world, &fire, 16.0, 16.0 * tick as f64, &mut outcome);
            }

            let lost = world.enemies[inside].max_health - world.enemies[inside].health;
            let hits = lost / damage;
            assert!(hits >= 1.0, "level {level} never burned");
            assert!((hits - hits.round()).abs() < 1e-2, "level {level} lost {lost}");
            assert_eq!(world.enemies[outside].health, world.enemies[outside].max_health);
        }
    }

    #[test]
    fn test_aura_roll_chance_by_timing() {
        let low = Weapon::new(1, WeaponKind::Fire { radius: 50.0 }, 1);
        let high = Weapon::new(1, WeaponKind::Fire { radius: 50.0 }, 3);

        assert_eq!(low.aura_roll_chance(AuraTiming::PerTick, 16.0), 0.05);
        assert_eq!(low.aura_roll_chance(AuraTiming::PerTick, 33.0), 0.05);
        assert_eq!(high.aura_roll_chance(AuraTiming::PerTick, 16.0), 0.1);

        let one = low.aura_roll_chance(AuraTiming::FrameRateIndependent, REFERENCE_FRAME_MS);
        let two = low.aura_roll_chance(AuraTiming::FrameRateIndependent, 2.0 * REFERENCE_FRAME_MS);
        assert!((one - 0.05).abs() < 1e-9);
        assert!((two - (1.0 - 0.95 * 0.95)).abs() < 1e-9);
        let faster = high.aura_roll_chance(AuraTiming::FrameRateIndependent, REFERENCE_FRAME_MS);
        assert!((faster - 0.1).abs() < 1e-9);
    }

    #[test]
    fn test_frame_rate_independent_aura_burns_at_any_step() {
        let mut world = steady_world();
        world.aura_timing = AuraTiming::FrameRateIndependent;
        let center = world.player.pos;
        let target = sturdy_tank(&mut world, center + Vec2::new(30.0, 0.0));
        let fire = Weapon::new(99, WeaponKind::Fire { radius: 50.0 }, 1);

        let mut outcome = TickOutcome::default();
        for tick in 0..100 {
            burn(&mut world, &fire, 64.0, 64.0 * tick as f64, &mut outcome);
        }
        let hits = (world.enemies[target].max_health - world.enemies[target].health) / 3.6;
        assert!(hits >= 1.0);
        assert!((hits - hits.round()).abs() < 1e-2);
    }

    #[test]
    fn test_nova_hits_and_slows_everything_in_radius() {
        let mut world = steady_world();
        let center = world.player.pos;
        let kind = WeaponKind::Frost {
            radius: 80.0,
            duration_ms: 2000.0,
        };
        let frost = Weapon::new(99, kind, 1);
        let near: Vec<usize> = [0.0_f32, 2.0, 4.0]
            .iter()
            .map(|angle| enemy_at(&mut world, "tank", center + angle_to_vec(*angle) * 99.0))
            .collect();
        let far = enemy_at(&mut world, "tank", center + Vec2::new(0.0, 101.0));
        let mut outcome = TickOutcome::default();

        frost_nova(&mut world, &frost, 1000.0, &mut outcome);

        for index in near {
            let enemy = &world.enemies[index];
            assert!((enemy.health - (120.0 - 14.4)).abs() < 1e-3);
            assert!((enemy.speed - 0.8 * FrostEffect::SPEED_FACTOR).abs() < 1e-6);
            let slow = enemy.frost.expect("slowed");
            assert_eq!(slow.duration_ms, 2000.0);
            assert_eq!(slow.started_ms, 1000.0);
            assert_eq!(slow.original_speed, 0.8);
        }
        let untouched = &world.enemies[far];
        assert_eq!(untouched.health, 120.0);
        assert_eq!(untouched.speed, 0.8);
        assert!(untouched.frost.is_none());
        assert!(world.scheduler.is_empty());
    }

    #[test]
    fn test_level_two_nova_shards_slow_what_they_hit() {
        let mut world = steady_world();
        let id = world.next_entity_id();
        let kind = WeaponKind::Frost {
            radius: 80.0,
            duration_ms: 2000.0,
        };
        world.player.weapons = vec![Weapon::new(id, kind, 2)];
        let pos = world.player.pos + Vec2::new(50.0, 0.0);
        let frozen = enemy_at(&mut world, "tank", pos);
        let mut outcome = TickOutcome::default();

        update_weapons(&mut world, 16.0, 0.0, &mut outcome);
        assert!((world.enemies[frozen].health - (120.0 - 21.6)).abs() < 1e-3);
        assert_eq!(world.enemies[frozen].frost.map(|f| f.duration_ms), Some(3000.0));
        assert_eq!(world.scheduler.len(), 1);

        assert!(world.scheduler.pop_due(299.0).is_none());
        let event = world.scheduler.pop_due(300.0).expect("shards due");
        run_deferred(&mut world, event, 300.0, &mut outcome);

        let shards = world.player.weapons[0].projectiles.clone();
        assert_eq!(shards.len(), FROST_SHARD_COUNT as usize);
        for shard in &shards {
            assert_eq!(shard.status, Some(StatusEffect::Frost { duration_ms: 3000.0 }));
            assert!((shard.damage - 5.4).abs() < 1e-4);
            assert!(!shard.piercing);
        }

        // A ghost right in the path of the first shard
        let heading = shards[0].vel.normalize();
        let bystander = enemy_at(&mut world, "ghost", shards[0].pos + heading * 20.0);
        update_weapons(&mut world, 16.0, 316.0, &mut outcome);

        let ghost = &world.enemies[bystander];
        assert!((ghost.health - (15.0 - 5.4)).abs() < 1e-4);
        assert_eq!(ghost.speed, 0.75);
        assert_eq!(ghost.frost.map(|f| (f.started_ms, f.duration_ms)), Some((316.0, 3000.0)));
        assert_eq!(world.player.weapons[0].projectiles.len(), shards.len() - 1);
    }

    #[test]
    fn test_frost_shards_need_their_weapon_and_target() {
        let mut world = steady_world();
        let index = enemy_at(&mut world, "tank", Vec2::ZERO);
        let enemy = world.enemies[index].id;
        let mut outcome = TickOutcome::default();

        let orphaned = Deferred::FrostShards {
            weapon_id: 42,
            enemy,
        };
        run_deferred(&mut world, orphaned, 300.0, &mut outcome);
        assert!(world.player.weapons.iter().all(|w| w.projectiles.is_empty()));

        let id = world.next_entity_id();
        let kind = WeaponKind::Frost {
            radius: 80.0,
            duration_ms: 2000.0,
        };
        world.player.weapons.push(Weapon::new(id, kind, 2));
        world.enemies[index].is_dead = true;
        let late = Deferred::FrostShards {
            weapon_id: id,
            enemy,
        };
        run_deferred(&mut world, late, 300.0, &mut outcome);
        assert!(world.player.weapons.iter().all(|w| w.projectiles.is_empty()));
    }

    #[test]
    fn test_cooldown_scales_with_multiplier() {
        let stats = PlayerStats::default();
        let mut wand = Weapon::new(1, WeaponKind::Wand, 1);
        assert!(wand.is_ready(0.0, &stats));
        wand.last_fired_ms = Some(0.0);
        assert!(!wand.is_ready(799.0, &stats));
        assert!(wand.is_ready(801.0, &stats));
    }
}
