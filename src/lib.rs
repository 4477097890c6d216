//! Arcane Survivors - a real-time arcade survival game core
//!
//! Core modules:
//! - `sim`: Simulation core (movement, weapons, enemies, stages, camera)
//! - `tuning`: Data-driven content tables (enemy archetypes, stages, upgrades)
//! - `session`: Headless host shell (score, levels, upgrade choices)
//! - `settings`: Runtime configuration
//! - `renderer`: Contract between the simulation and whatever draws it

pub mod renderer;
pub mod session;
pub mod settings;
pub mod sim;
pub mod tuning;

pub use session::Session;
pub use settings::{AuraTiming, QualityPreset, Settings};

use glam::Vec2;

/// Game configuration constants
pub mod consts {
    /// Resolution the gameplay distances were tuned for
    pub const DESIGN_WIDTH: f32 = 800.0;
    pub const DESIGN_HEIGHT: f32 = 600.0;

    /// Reference frame length used to convert per-tick probabilities (60 Hz)
    pub const REFERENCE_FRAME_MS: f64 = 1000.0 / 60.0;

    /// Player defaults
    pub const PLAYER_START_X: f32 = 400.0;
    pub const PLAYER_START_Y: f32 = 300.0;
    pub const PLAYER_SIZE: f32 = 40.0;
    pub const PLAYER_FRAME_DELAY: u32 = 8;

    /// Baseline stats at the start of a run
    pub const BASE_HEALTH: f32 = 150.0;
    pub const BASE_SPEED: f32 = 3.5;
    pub const BASE_DAMAGE: f32 = 18.0;
    pub const BASE_AREA: f32 = 1.2;
    pub const BASE_COOLDOWN: f32 = 0.8;
    pub const BASE_REGENERATION: f32 = 1.0;

    /// Critical hits when the player has no crit modifiers
    pub const DEFAULT_CRIT_CHANCE: f32 = 10.0;
    pub const DEFAULT_CRIT_DAMAGE: f32 = 200.0;

    /// Fraction of max health restored by a revive charge
    pub const REVIVE_HEALTH_FRACTION: f32 = 0.2;
    /// Armor never reduces damage by more than this percentage
    pub const MAX_ARMOR: f32 = 75.0;

    /// Experience gem pickup
    pub const GEM_MAGNET_RADIUS: f32 = 120.0;
    pub const GEM_COLLECT_RADIUS: f32 = 20.0;

    /// Enemy contact thresholds at design resolution
    pub const CONTACT_DISTANCE: f32 = 20.0;
    pub const EXPLODE_DISTANCE: f32 = 40.0;
    pub const DEFAULT_ATTACK_RANGE: f32 = 150.0;
    pub const DEFAULT_ATTACK_COOLDOWN_MS: f64 = 1000.0;

    /// Spawn rate ramp: rate * (1 + elapsed / RAMP) / DAMP, capped
    pub const SPAWN_RAMP_MS: f64 = 180_000.0;
    pub const SPAWN_DAMP: f64 = 5.0;
    pub const SPAWN_CHANCE_CAP: f64 = 0.4;
    /// Spawn ring radius as a fraction of the larger visible dimension
    pub const SPAWN_RING_FACTOR: f32 = 0.6;

    /// How long stage and boss banners stay up
    pub const STAGE_MESSAGE_MS: f64 = 3000.0;
    pub const REVIVE_MESSAGE_MS: f64 = 2000.0;
    /// Bosses enter this far above the top edge of the visible area
    pub const BOSS_SPAWN_MARGIN: f32 = 150.0;
}

/// Unit vector for an angle in radians
#[inline]
pub fn angle_to_vec(angle: f32) -> Vec2 {
    Vec2::new(angle.cos(), angle.sin())
}

/// Direction and distance from `from` to `to`.
///
/// The direction is zero when the points coincide, so callers never divide
/// by a zero length.
#[inline]
pub fn direction_to(from: Vec2, to: Vec2) -> (Vec2, f32) {
    let delta = to - from;
    let distance = delta.length();
    if distance > 0.0 {
        (delta / distance, distance)
    } else {
        (Vec2::ZERO, 0.0)
    }
}

/// Ratio between the viewport and the design resolution (smaller axis wins)
#[inline]
pub fn scale_factor(width: f32, height: f32) -> f32 {
    (width / consts::DESIGN_WIDTH).min(height / consts::DESIGN_HEIGHT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direction_to_zero_length() {
        let (dir, dist) = direction_to(Vec2::new(5.0, 5.0), Vec2::new(5.0, 5.0));
        assert_eq!(dir, Vec2::ZERO);
        assert_eq!(dist, 0.0);
    }

    #[test]
    fn test_direction_to_unit() {
        let (dir, dist) = direction_to(Vec2::ZERO, Vec2::new(3.0, 4.0));
        assert!((dist - 5.0).abs() < 1e-6);
        assert!((dir.length() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_scale_factor_uses_smaller_axis() {
        assert!((scale_factor(800.0, 600.0) - 1.0).abs() < 1e-6);
        assert!((scale_factor(1600.0, 600.0) - 1.0).abs() < 1e-6);
        assert!((scale_factor(400.0, 600.0) - 0.5).abs() < 1e-6);
    }
}
