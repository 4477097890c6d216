//! Real-time simulation module
//!
//! All gameplay logic lives here. This module is pure:
//! - One tick per host frame, driven by `tick()`
//! - Seeded RNG owned by the world
//! - Deferred effects go through the world's scheduler, never a timer
//! - No rendering or platform dependencies

pub mod camera;
pub mod enemies;
pub mod player;
pub mod schedule;
pub mod stages;
pub mod state;
pub mod tick;
pub mod weapons;

pub use camera::{Camera, Viewport, ZoomCommand};
pub use player::{MovementKeys, UpgradeId, UpgradeIdError, apply_weapon_upgrade};
pub use schedule::{Deferred, Scheduler};
pub use stages::{StageMessage, StageTracker};
pub use state::{
    Direction, Enemy, EnemyBehavior, ExperienceGem, FrostEffect, GamePhase, Player, PlayerStats,
    WorldState,
};
pub use tick::{SimEvent, TickInput, TickOutcome, tick};
pub use weapons::{Projectile, StatusEffect, Weapon, WeaponKind};
