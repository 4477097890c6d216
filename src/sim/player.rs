//! Player movement, stats, upgrades and revive-or-death resolution

use glam::Vec2;
use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::state::{Direction, GamePhase, Player, PlayerStats, WorldState, colors};
use super::weapons::{Weapon, WeaponKind};
use crate::consts::*;
use crate::tuning::{Stat, StatModifier, UpgradeKind};

/// Movement keys currently held (WASD or arrows, already mapped by the host)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovementKeys {
    pub up: bool,
    pub down: bool,
    pub left: bool,
    pub right: bool,
}

/// Move the player one tick and return the applied delta.
///
/// Diagonal movement is normalized so it is no faster than orthogonal
/// movement. The world is unbounded, so the position is never clamped.
pub fn update_player_position(
    player: &mut Player,
    stats: &PlayerStats,
    keys: MovementKeys,
) -> Vec2 {
    let mut delta = Vec2::ZERO;

    if keys.up {
        delta.y -= stats.speed;
        player.direction = Direction::Up;
    }
    if keys.down {
        delta.y += stats.speed;
        player.direction = Direction::Down;
    }
    if keys.left {
        delta.x -= stats.speed;
        player.direction = Direction::Left;
    }
    if keys.right {
        delta.x += stats.speed;
        player.direction = Direction::Right;
    }

    if delta.x != 0.0 && delta.y != 0.0 {
        delta *= std::f32::consts::FRAC_1_SQRT_2;
    }

    player.pos += delta;
    player.is_moving = delta != Vec2::ZERO;
    delta
}

/// Advance the walk cycle
pub fn animate_player(player: &mut Player, dt_ms: f64) {
    if !player.is_moving {
        player.current_frame = 0;
        player.frame_count = 0;
        return;
    }

    player.frame_count += 1;
    if player.frame_count >= PLAYER_FRAME_DELAY {
        player.frame_count = 0;
        player.current_frame = (player.current_frame + 1) % 4;
    }
    player.walk_phase += (dt_ms / 50.0) as f32;
}

/// Why an upgrade identifier could not be applied
#[derive(Debug, Error, PartialEq, Eq)]
pub enum UpgradeIdError {
    #[error("empty upgrade id")]
    Empty,
    #[error("upgrade id {0:?} does not start with a weapon name")]
    MissingToken(String),
    #[error("upgrade id {0:?} has characters after its level")]
    TrailingCharacters(String),
    #[error("upgrade id {0:?} has a level outside 1..=255")]
    LevelOutOfRange(String),
    #[error("no weapon is called {0:?}")]
    UnknownWeapon(String),
    #[error("no upgrade is called {0:?}")]
    UnknownUpgrade(String),
    #[error("upgrade {0:?} is not a weapon")]
    NotAWeapon(String),
}

/// A parsed upgrade identifier: letters followed by an optional level
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpgradeId {
    pub token: String,
    /// 1 when the identifier has no numeric suffix
    pub level: u8,
}

impl UpgradeId {
    pub fn parse(id: &str) -> Result<Self, UpgradeIdError> {
        if id.is_empty() {
            return Err(UpgradeIdError::Empty);
        }

        let split = id
            .find(|c: char| !c.is_ascii_alphabetic())
            .unwrap_or(id.len());
        if split == 0 {
            return Err(UpgradeIdError::MissingToken(id.to_string()));
        }

        let (token, digits) = id.split_at(split);
        if digits.is_empty() {
            return Ok(Self {
                token: token.to_string(),
                level: 1,
            });
        }
        if !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(UpgradeIdError::TrailingCharacters(id.to_string()));
        }

        match digits.parse::<u8>() {
            Ok(level) if level > 0 => Ok(Self {
                token: token.to_string(),
                level,
            }),
            _ => Err(UpgradeIdError::LevelOutOfRange(id.to_string())),
        }
    }
}

/// Add or re-level a weapon from an upgrade id such as `axe` or `wand2`.
///
/// An owned weapon has its level overwritten, so applying the same id twice
/// changes nothing the second time. The id must be a weapon upgrade in the
/// loaded content; anything else is ignored. Returns whether the player's
/// weapons changed shape.
pub fn apply_weapon_upgrade(world: &mut WorldState, upgrade_id: &str) -> bool {
    match try_weapon_upgrade(world, upgrade_id) {
        Ok(()) => true,
        Err(err) => {
            log::debug!("Ignoring weapon upgrade {upgrade_id:?}: {err}");
            false
        }
    }
}

fn try_weapon_upgrade(world: &mut WorldState, upgrade_id: &str) -> Result<(), UpgradeIdError> {
    match world.content.upgrade(upgrade_id).map(|u| u.kind) {
        Some(UpgradeKind::Weapon) => {}
        Some(UpgradeKind::Passive) => {
            return Err(UpgradeIdError::NotAWeapon(upgrade_id.to_string()));
        }
        None => return Err(UpgradeIdError::UnknownUpgrade(upgrade_id.to_string())),
    }
    let id = UpgradeId::parse(upgrade_id)?;
    let kind = WeaponKind::from_token(&id.token)
        .ok_or_else(|| UpgradeIdError::UnknownWeapon(id.token.clone()))?;

    if let Some(weapon) = world
        .player
        .weapons
        .iter_mut()
        .find(|w| w.kind.token() == id.token)
    {
        log::debug!("{} level {} -> {}", id.token, weapon.level, id.level);
        weapon.level = id.level;
        return Ok(());
    }

    let weapon_id = world.next_entity_id();
    log::debug!("New weapon {} at level {}", id.token, id.level);
    world.player.weapons.push(Weapon::new(weapon_id, kind, id.level));
    Ok(())
}

impl PlayerStats {
    fn stat_mut(&mut self, stat: Stat) -> &mut f32 {
        match stat {
            Stat::Speed => &mut self.speed,
            Stat::Damage => &mut self.damage,
            Stat::Area => &mut self.area,
            Stat::Cooldown => &mut self.cooldown,
            Stat::Duration => &mut self.duration,
            Stat::MagnetRadius => &mut self.magnet_radius,
            Stat::Regeneration => &mut self.regeneration,
            Stat::Armor => &mut self.armor,
            Stat::DropChance => &mut self.drop_chance,
            Stat::DashChance => &mut self.dash_chance,
            Stat::CritChance => self.crit_chance.get_or_insert(DEFAULT_CRIT_CHANCE),
            Stat::CritDamage => self.crit_damage.get_or_insert(DEFAULT_CRIT_DAMAGE),
        }
    }

    /// Apply one passive upgrade effect
    pub fn apply_modifier(&mut self, modifier: &StatModifier) {
        match *modifier {
            StatModifier::Multiply { stat, factor } => *self.stat_mut(stat) *= factor,
            // Unset crit chance accumulates from zero, not from the fallback
            StatModifier::Add {
                stat: Stat::CritChance,
                amount,
            } => *self.crit_chance.get_or_insert(0.0) += amount,
            StatModifier::Add { stat, amount } => *self.stat_mut(stat) += amount,
            StatModifier::AddMaxHealth { amount } => {
                self.max_health += amount;
                self.health = self.max_health;
            }
            StatModifier::Heal { amount } => {
                self.health = (self.health + amount).min(self.max_health);
            }
            StatModifier::GrantRevive => self.revive_count += 1,
        }
    }

    /// Fraction of incoming damage that gets through armor
    pub fn armor_factor(&self) -> f32 {
        1.0 - self.armor.clamp(0.0, MAX_ARMOR) / 100.0
    }
}

/// Heal `regeneration` percent of max health per second, never past the maximum
pub fn regenerate(stats: &mut PlayerStats, dt_ms: f64) {
    if stats.regeneration <= 0.0 || stats.health <= 0.0 || stats.health >= stats.max_health {
        return;
    }
    let amount = stats.regeneration * stats.max_health * 0.01 * (dt_ms / 1000.0) as f32;
    stats.health = (stats.health + amount).min(stats.max_health);
}

/// Subtract an incoming hit from the player's health.
///
/// Returns the damage actually taken, or `None` when the hit was dodged.
/// Health may drop to or below zero; [`resolve_vitals`] settles that.
pub fn damage_player<R: Rng>(stats: &mut PlayerStats, amount: f32, rng: &mut R) -> Option<f32> {
    if stats.dash_chance > 0.0 && rng.random::<f32>() * 100.0 < stats.dash_chance {
        return None;
    }
    let taken = amount * stats.armor_factor();
    stats.health -= taken;
    Some(taken)
}

/// Result of the revive-or-death check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Vitals {
    Alive,
    /// A revive charge was spent this tick
    Revived,
    /// No charges left, the run is over
    Dead,
}

/// Settle a non-positive health value: spend a revive charge or end the run
pub fn resolve_vitals(world: &mut WorldState, now_ms: f64) -> Vitals {
    if world.stats.health > 0.0 {
        return Vitals::Alive;
    }

    if world.stats.revive_count > 0 {
        world.stats.health = (world.stats.max_health * REVIVE_HEALTH_FRACTION).ceil();
        world.stats.revive_count -= 1;
        world
            .stages
            .show_message("Revived!", now_ms, REVIVE_MESSAGE_MS);
        let pos = world.player.pos;
        world
            .effects
            .burst(&mut world.rng, pos, 30, 50.0, colors::REVIVE, (2.0, 4.0), (40, 20));
        log::info!(
            "Player revived at {} health, {} charges left",
            world.stats.health,
            world.stats.revive_count
        );
        Vitals::Revived
    } else {
        world.phase = GamePhase::GameOver;
        log::info!("Game over at {:.1}s", world.elapsed_ms / 1000.0);
        Vitals::Dead
    }
}
