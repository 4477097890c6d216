//! World state and core simulation types
//!
//! Everything the tick mutates lives in [`WorldState`]. The renderer reads it
//! between ticks and never writes to it.

use std::sync::Arc;

use glam::Vec2;
use rand::SeedableRng;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::camera::Camera;
use super::schedule::Scheduler;
use super::stages::StageTracker;
use super::weapons::{Weapon, WeaponKind};
use crate::consts::*;
use crate::settings::AuraTiming;
use crate::tuning::{Content, EnemyArchetype};

/// Current phase of play
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GamePhase {
    /// Title screen, nothing simulates
    Menu,
    /// Active gameplay
    Playing,
    /// Paused by the player or while an upgrade is being chosen
    Paused,
    /// Run ended
    GameOver,
}

/// Facing direction for players and enemies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Direction {
    Up,
    #[default]
    Down,
    Left,
    Right,
}

impl Direction {
    /// Angle in radians (screen space, +y is down)
    pub fn angle(self) -> f32 {
        use std::f32::consts::{FRAC_PI_2, PI};
        match self {
            Direction::Right => 0.0,
            Direction::Down => FRAC_PI_2,
            Direction::Left => PI,
            Direction::Up => -FRAC_PI_2,
        }
    }

    /// Facing from the dominant axis of a movement vector
    pub fn from_motion(v: Vec2) -> Self {
        if v.x.abs() > v.y.abs() {
            if v.x > 0.0 { Direction::Right } else { Direction::Left }
        } else if v.y > 0.0 {
            Direction::Down
        } else {
            Direction::Up
        }
    }
}

/// Mutable player stat block
///
/// Multipliers (`damage`, `area`, `cooldown`, `duration`, `magnet_radius`)
/// start at 1.0 unless the run baseline says otherwise; percentages are in
/// whole percent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerStats {
    pub health: f32,
    pub max_health: f32,
    pub speed: f32,
    pub damage: f32,
    pub area: f32,
    /// Lower fires faster
    pub cooldown: f32,
    /// Effect duration multiplier
    pub duration: f32,
    pub magnet_radius: f32,
    /// Percent of max health regenerated per second per point
    pub regeneration: f32,
    pub armor: f32,
    /// `None` falls back to 10%
    pub crit_chance: Option<f32>,
    /// `None` falls back to 200%
    pub crit_damage: Option<f32>,
    pub drop_chance: f32,
    pub dash_chance: f32,
    pub revive_count: u32,
}

impl Default for PlayerStats {
    fn default() -> Self {
        Self {
            health: BASE_HEALTH,
            max_health: BASE_HEALTH,
            speed: BASE_SPEED,
            damage: BASE_DAMAGE,
            area: BASE_AREA,
            cooldown: BASE_COOLDOWN,
            duration: 1.0,
            magnet_radius: 1.0,
            regeneration: BASE_REGENERATION,
            armor: 0.0,
            crit_chance: None,
            crit_damage: None,
            drop_chance: 0.0,
            dash_chance: 0.0,
            revive_count: 0,
        }
    }
}

impl PlayerStats {
    /// Crit chance as a probability in [0, 1]
    pub fn crit_probability(&self) -> f32 {
        (self.crit_chance.unwrap_or(DEFAULT_CRIT_CHANCE) / 100.0).clamp(0.0, 1.0)
    }

    /// Damage multiplier applied on a critical hit
    pub fn crit_multiplier(&self) -> f32 {
        self.crit_damage.unwrap_or(DEFAULT_CRIT_DAMAGE) / 100.0
    }
}

/// The player character
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Player {
    /// Center position in world space
    pub pos: Vec2,
    pub size: Vec2,
    pub direction: Direction,
    pub is_moving: bool,
    pub weapons: Vec<Weapon>,
    /// Ticks since the last animation frame change
    pub frame_count: u32,
    pub current_frame: u32,
    /// Continuous walk-cycle phase for the renderer
    pub walk_phase: f32,
}

impl Player {
    /// A fresh player holding a level 1 wand
    pub fn new(wand_id: u32) -> Self {
        Self {
            pos: Vec2::new(PLAYER_START_X, PLAYER_START_Y),
            size: Vec2::splat(PLAYER_SIZE),
            direction: Direction::Down,
            is_moving: false,
            weapons: vec![Weapon::new(wand_id, WeaponKind::Wand, 1)],
            frame_count: 0,
            current_frame: 0,
            walk_phase: 0.0,
        }
    }

    pub fn weapon(&self, id: u32) -> Option<&Weapon> {
        self.weapons.iter().find(|w| w.id == id)
    }

    pub fn weapon_mut(&mut self, id: u32) -> Option<&mut Weapon> {
        self.weapons.iter_mut().find(|w| w.id == id)
    }

    /// Level of the owned weapon with this token, if any
    pub fn weapon_level(&self, token: &str) -> Option<u8> {
        self.weapons
            .iter()
            .find(|w| w.kind.token() == token)
            .map(|w| w.level)
    }
}

/// Timed speed reduction on an enemy
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FrostEffect {
    /// Speed before the slow, restored exactly on expiry
    pub original_speed: f32,
    pub started_ms: f64,
    pub duration_ms: f64,
}

impl FrostEffect {
    pub const SPEED_FACTOR: f32 = 0.5;

    pub fn expired(&self, now_ms: f64) -> bool {
        now_ms - self.started_ms > self.duration_ms
    }
}

/// Brief flash after an enemy takes damage
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HitFlash {
    pub started_ms: f64,
    pub duration_ms: f64,
    pub critical: bool,
}

/// How an enemy approaches and attacks
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum EnemyBehavior {
    /// Walks straight at the player
    Chaser,
    /// Stops inside `range` and attacks from there
    Ranged { range: f32 },
    /// Detonates on contact
    Exploder,
}

impl EnemyBehavior {
    pub fn for_archetype(archetype: &EnemyArchetype) -> Self {
        if archetype.explodes_on_contact {
            EnemyBehavior::Exploder
        } else if archetype.kind == "ranged" || archetype.attack_range.is_some() {
            EnemyBehavior::Ranged {
                range: archetype.attack_range.unwrap_or(DEFAULT_ATTACK_RANGE),
            }
        } else {
            EnemyBehavior::Chaser
        }
    }
}

/// A live enemy
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Enemy {
    pub id: u32,
    /// Archetype name
    pub kind: String,
    /// Center position in world space
    pub pos: Vec2,
    pub size: Vec2,
    pub health: f32,
    /// Health at spawn, for health bars
    pub max_health: f32,
    pub speed: f32,
    pub damage: f32,
    pub experience_value: u32,
    pub color: String,
    pub behavior: EnemyBehavior,
    pub attack_cooldown_ms: f64,
    pub last_attack_ms: Option<f64>,
    pub is_dead: bool,
    pub is_boss: bool,
    pub name: Option<String>,
    pub direction: Direction,
    pub animation_frame: u32,
    pub frame_count: u32,
    pub frame_delay: u32,
    pub animation_frames: u32,
    pub frost: Option<FrostEffect>,
    pub hit_flash: Option<HitFlash>,
}

impl Enemy {
    /// Stamp an enemy from its archetype at `pos`
    pub fn from_archetype(id: u32, archetype: &EnemyArchetype, pos: Vec2) -> Self {
        Self {
            id,
            kind: archetype.kind.clone(),
            pos,
            size: Vec2::new(archetype.width, archetype.height),
            health: archetype.health,
            max_health: archetype.health,
            speed: archetype.speed,
            damage: archetype.damage,
            experience_value: archetype.experience_value,
            color: archetype.color.clone(),
            behavior: EnemyBehavior::for_archetype(archetype),
            attack_cooldown_ms: archetype
                .attack_cooldown_ms
                .unwrap_or(DEFAULT_ATTACK_COOLDOWN_MS),
            last_attack_ms: None,
            is_dead: false,
            is_boss: false,
            name: None,
            direction: Direction::Down,
            animation_frame: 0,
            frame_count: 0,
            frame_delay: archetype.animation_speed.max(1),
            animation_frames: archetype.animation_frames.max(1),
            frost: None,
            hit_flash: None,
        }
    }

    #[inline]
    pub fn half_width(&self) -> f32 {
        self.size.x / 2.0
    }

    /// Whether the attack cooldown has elapsed
    pub fn can_attack(&self, now_ms: f64) -> bool {
        self.last_attack_ms
            .is_none_or(|last| now_ms - last > self.attack_cooldown_ms)
    }
}

/// Experience dropped by a defeated enemy
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExperienceGem {
    pub pos: Vec2,
    pub value: u32,
    pub size: f32,
    pub collected: bool,
}

/// Colors for transient effects (RGBA)
pub mod colors {
    pub const DEATH: [f32; 4] = [1.0, 0.0, 0.0, 0.7];
    pub const WAND: [f32; 4] = [0.0, 0.78, 1.0, 0.7];
    pub const AXE: [f32; 4] = [1.0, 0.39, 0.0, 0.7];
    pub const FROST: [f32; 4] = [0.39, 0.78, 1.0, 0.7];
    pub const ICE_SHARD: [f32; 4] = [0.59, 0.94, 1.0, 0.7];
    pub const LIGHTNING: [f32; 4] = [0.71, 0.39, 1.0, 0.7];
    pub const BOLT: [f32; 4] = [0.71, 0.71, 1.0, 0.8];
    pub const FLAME: [f32; 4] = [1.0, 0.39, 0.0, 0.8];
    pub const FLAME_HOT: [f32; 4] = [1.0, 1.0, 0.39, 0.8];
    pub const GEM: [f32; 4] = [0.0, 1.0, 1.0, 1.0];
    pub const REVIVE: [f32; 4] = [1.0, 0.84, 0.0, 0.8];
    pub const STAGE: [f32; 4] = [1.0, 1.0, 1.0, 0.7];
    pub const DAMAGE_TEXT: [f32; 4] = [1.0, 1.0, 0.0, 1.0];
    pub const CRIT_TEXT: [f32; 4] = [1.0, 0.0, 0.0, 1.0];
}

/// Shape of a transient visual effect
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EffectKind {
    Particle,
    /// Expanding ring at an impact point
    Hit,
    /// Rising flame (moves each frame)
    Flame,
}

/// Visual-only effect descriptor, lives for `duration` frames
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VisualEffect {
    pub pos: Vec2,
    pub vel: Vec2,
    pub kind: EffectKind,
    pub color: [f32; 4],
    pub size: f32,
    pub frame: u32,
    pub duration: u32,
}

/// Floating damage number
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DamageText {
    pub pos: Vec2,
    pub value: f32,
    pub critical: bool,
    /// Damage taken by the player rather than dealt
    pub on_player: bool,
    pub frame: u32,
    pub duration: u32,
}

/// Transient visual effects, capped so they never dominate a frame
#[derive(Debug, Clone, Default)]
pub struct Effects {
    pub visuals: Vec<VisualEffect>,
    pub texts: Vec<DamageText>,
    pub cap: usize,
}

impl Effects {
    pub fn new(cap: usize) -> Self {
        Self {
            visuals: Vec::new(),
            texts: Vec::new(),
            cap,
        }
    }

    pub fn push(&mut self, effect: VisualEffect) {
        if self.visuals.len() < self.cap {
            self.visuals.push(effect);
        }
    }

    pub fn text(&mut self, pos: Vec2, value: f32, critical: bool, on_player: bool) {
        if self.texts.len() < self.cap {
            self.texts.push(DamageText {
                pos,
                value,
                critical,
                on_player,
                frame: 0,
                duration: if on_player { 30 } else { 40 },
            });
        }
    }

    /// Single hit ring
    pub fn ring(&mut self, pos: Vec2, color: [f32; 4], size: f32) {
        self.push(VisualEffect {
            pos,
            vel: Vec2::ZERO,
            kind: EffectKind::Hit,
            color,
            size,
            frame: 0,
            duration: 15,
        });
    }

    /// Scatter `count` particles within `spread` of `center`
    pub fn burst<R: rand::Rng>(
        &mut self,
        rng: &mut R,
        center: Vec2,
        count: usize,
        spread: f32,
        color: [f32; 4],
        size: (f32, f32),
        duration: (u32, u32),
    ) {
        for _ in 0..count {
            if self.visuals.len() >= self.cap {
                break;
            }
            let angle = rng.random::<f32>() * std::f32::consts::TAU;
            let dist = rng.random::<f32>() * spread;
            self.visuals.push(VisualEffect {
                pos: center + crate::angle_to_vec(angle) * dist,
                vel: Vec2::ZERO,
                kind: EffectKind::Particle,
                color,
                size: size.0 + rng.random::<f32>() * size.1,
                frame: 0,
                duration: duration.0 + rng.random_range(0..=duration.1),
            });
        }
    }

    /// Advance every effect one frame and drop the expired ones
    pub fn advance(&mut self) {
        for effect in &mut self.visuals {
            effect.pos += effect.vel;
            effect.frame += 1;
        }
        self.visuals.retain(|e| e.frame < e.duration);

        for text in &mut self.texts {
            text.frame += 1;
        }
        self.texts.retain(|t| t.frame < t.duration);
    }
}

/// Complete simulation state
#[derive(Debug, Clone)]
pub struct WorldState {
    /// Run seed for reproducibility
    pub seed: u64,
    pub rng: Pcg32,
    pub content: Arc<Content>,
    pub phase: GamePhase,
    pub player: Player,
    pub stats: PlayerStats,
    /// Live enemies; none of them is dead once a tick returns
    pub enemies: Vec<Enemy>,
    pub gems: Vec<ExperienceGem>,
    pub effects: Effects,
    pub camera: Camera,
    pub stages: StageTracker,
    pub scheduler: Scheduler,
    /// Total play time (ms), drives stage progression and spawn ramp
    pub elapsed_ms: f64,
    pub tick_count: u64,
    /// Seed for the decorative background, redrawn on every stage change
    pub background_seed: u64,
    pub aura_timing: AuraTiming,
    /// Next entity ID
    next_id: u32,
}

impl WorldState {
    /// Create a new run with the given seed and content tables
    pub fn new(seed: u64, content: Arc<Content>) -> Self {
        let mut rng = Pcg32::seed_from_u64(seed);
        let background_seed = rand::Rng::random(&mut rng);
        let mut state = Self {
            seed,
            rng,
            content,
            phase: GamePhase::Playing,
            player: Player::new(0),
            stats: PlayerStats::default(),
            enemies: Vec::new(),
            gems: Vec::new(),
            effects: Effects::new(crate::QualityPreset::default().max_effects()),
            camera: Camera::default(),
            stages: StageTracker::default(),
            scheduler: Scheduler::default(),
            elapsed_ms: 0.0,
            tick_count: 0,
            background_seed,
            aura_timing: AuraTiming::default(),
            next_id: 1,
        };

        let wand_id = state.next_entity_id();
        state.player = Player::new(wand_id);
        state
    }

    /// Allocate a new entity ID
    pub fn next_entity_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    pub fn enemy(&self, id: u32) -> Option<&Enemy> {
        self.enemies.iter().find(|e| e.id == id)
    }

    pub fn enemy_mut(&mut self, id: u32) -> Option<&mut Enemy> {
        self.enemies.iter_mut().find(|e| e.id == id)
    }

    /// Drop dead enemies and collected gems
    pub fn sweep(&mut self) {
        self.enemies.retain(|e| !e.is_dead);
        self.gems.retain(|g| !g.collected);
    }
}
