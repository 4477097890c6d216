//! Data-driven game content
//!
//! Enemy archetypes, the stage schedule and upgrade definitions. The
//! simulation only reads these tables; a JSON document with the same shape
//! as [`Content::default`] can replace the built-in set.

use std::path::Path;

use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::sim::player::UpgradeId;

/// Errors raised while loading or validating content tables
#[derive(Debug, Error)]
pub enum ContentError {
    #[error("failed to read content: {0}")]
    Io(#[from] std::io::Error),

    #[error("content JSON is invalid: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("content declares no stages")]
    NoStages,

    #[error("stage '{stage}' spawns unknown enemy archetype '{archetype}'")]
    UnknownEnemy { stage: String, archetype: String },

    #[error("stage '{stage}' declares a boss of unknown archetype '{archetype}'")]
    UnknownBoss { stage: String, archetype: String },

    #[error("stage '{stage}' has no duration but is not the final stage")]
    UnboundedStage { stage: String },
}

fn default_animation_frames() -> u32 {
    4
}

fn default_animation_speed() -> u32 {
    10
}

/// Static enemy template from which live enemies are stamped
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnemyArchetype {
    #[serde(rename = "type")]
    pub kind: String,
    pub health: f32,
    pub speed: f32,
    pub damage: f32,
    pub width: f32,
    pub height: f32,
    pub color: String,
    #[serde(default)]
    pub experience_value: u32,
    /// Cooldown between attacks (contact or ranged), 1000ms when absent
    #[serde(default)]
    pub attack_cooldown_ms: Option<f64>,
    /// Ranged archetypes stop at this distance and attack instead of closing in.
    /// The `ranged` archetype falls back to 150 when this is absent.
    #[serde(default)]
    pub attack_range: Option<f32>,
    /// Deals its damage once on contact and dies
    #[serde(default)]
    pub explodes_on_contact: bool,
    #[serde(default = "default_animation_frames")]
    pub animation_frames: u32,
    #[serde(default = "default_animation_speed")]
    pub animation_speed: u32,
}

impl EnemyArchetype {
    #[allow(clippy::too_many_arguments)]
    fn new(
        kind: &str,
        health: f32,
        speed: f32,
        damage: f32,
        (width, height): (f32, f32),
        color: &str,
        experience_value: u32,
        animation_speed: u32,
    ) -> Self {
        Self {
            kind: kind.to_string(),
            health,
            speed,
            damage,
            width,
            height,
            color: color.to_string(),
            experience_value,
            attack_cooldown_ms: None,
            attack_range: None,
            explodes_on_contact: false,
            animation_frames: default_animation_frames(),
            animation_speed,
        }
    }
}

/// Boss declared by a stage
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BossDescriptor {
    /// Archetype the boss is stamped from
    pub archetype: String,
    pub name: String,
    /// Overrides the archetype health (archetype health x3 when absent)
    #[serde(default)]
    pub health: Option<f32>,
}

/// One timed phase of a run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageConfig {
    pub name: String,
    pub message: String,
    /// `None` marks the endless final stage
    pub duration_ms: Option<f64>,
    pub enemy_types: Vec<String>,
    pub spawn_rate: f64,
    #[serde(default)]
    pub boss: Option<BossDescriptor>,
    /// Recurring boss interval while this stage lasts (endless stage)
    #[serde(default)]
    pub boss_interval_ms: Option<f64>,
}

impl StageConfig {
    pub fn is_endless(&self) -> bool {
        self.duration_ms.is_none()
    }
}

/// Stats an upgrade can touch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stat {
    Speed,
    Damage,
    Area,
    Cooldown,
    Duration,
    MagnetRadius,
    Regeneration,
    Armor,
    CritChance,
    CritDamage,
    DropChance,
    DashChance,
}

/// A single stat mutation performed when an upgrade is chosen
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum StatModifier {
    Multiply { stat: Stat, factor: f32 },
    Add { stat: Stat, amount: f32 },
    /// Raise max health and heal to the new maximum
    AddMaxHealth { amount: f32 },
    /// Heal, clamped to max health
    Heal { amount: f32 },
    GrantRevive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpgradeKind {
    Weapon,
    Passive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rarity {
    Common,
    Uncommon,
    Rare,
    Epic,
}

impl Rarity {
    pub const ALL: [Rarity; 4] = [Rarity::Common, Rarity::Uncommon, Rarity::Rare, Rarity::Epic];
}

/// A player-chosen upgrade
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpgradeDef {
    pub id: String,
    pub name: String,
    pub description: String,
    pub kind: UpgradeKind,
    pub rarity: Rarity,
    #[serde(default)]
    pub modifiers: Vec<StatModifier>,
}

impl UpgradeDef {
    fn new(
        id: &str,
        name: &str,
        description: &str,
        kind: UpgradeKind,
        rarity: Rarity,
        modifiers: Vec<StatModifier>,
    ) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            description: description.to_string(),
            kind,
            rarity,
            modifiers,
        }
    }
}

/// Rarity weights (percent) for a given player level
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RarityWeights {
    pub common: f32,
    pub uncommon: f32,
    pub rare: f32,
    pub epic: f32,
}

impl RarityWeights {
    pub fn for_level(level: u32) -> Self {
        let l = level as f32;
        Self {
            common: (70.0 - l * 3.0).max(30.0),
            uncommon: (20.0 + l * 1.5).min(40.0),
            rare: (9.0 + l).min(25.0),
            epic: (1.0 + l * 0.5).min(5.0),
        }
    }

    fn weight(&self, rarity: Rarity) -> f32 {
        match rarity {
            Rarity::Common => self.common,
            Rarity::Uncommon => self.uncommon,
            Rarity::Rare => self.rare,
            Rarity::Epic => self.epic,
        }
    }

    /// Pick a rarity from a roll in [0, 100). Rolls past the total land on `None`.
    pub fn pick(&self, roll: f32) -> Option<Rarity> {
        let mut cumulative = 0.0;
        for rarity in Rarity::ALL {
            cumulative += self.weight(rarity);
            if roll <= cumulative {
                return Some(rarity);
            }
        }
        None
    }
}

/// The complete set of content tables
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Content {
    pub enemies: Vec<EnemyArchetype>,
    pub stages: Vec<StageConfig>,
    pub upgrades: Vec<UpgradeDef>,
}

impl Content {
    /// Parse and validate a JSON content document
    pub fn from_json(json: &str) -> Result<Self, ContentError> {
        let content: Content = serde_json::from_str(json)?;
        content.validate()?;
        Ok(content)
    }

    /// Load and validate content from a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ContentError> {
        let json = std::fs::read_to_string(path.as_ref())?;
        let content = Self::from_json(&json)?;
        log::info!(
            "Loaded content from {} ({} enemies, {} stages, {} upgrades)",
            path.as_ref().display(),
            content.enemies.len(),
            content.stages.len(),
            content.upgrades.len()
        );
        Ok(content)
    }

    /// Check cross-references between the tables
    pub fn validate(&self) -> Result<(), ContentError> {
        if self.stages.is_empty() {
            return Err(ContentError::NoStages);
        }
        let last = self.stages.len() - 1;
        for (i, stage) in self.stages.iter().enumerate() {
            if stage.is_endless() && i != last {
                return Err(ContentError::UnboundedStage {
                    stage: stage.name.clone(),
                });
            }
            if let Some(missing) = stage
                .enemy_types
                .iter()
                .find(|kind| self.archetype(kind).is_none())
            {
                return Err(ContentError::UnknownEnemy {
                    stage: stage.name.clone(),
                    archetype: missing.clone(),
                });
            }
            if let Some(boss) = &stage.boss {
                if self.archetype(&boss.archetype).is_none() {
                    return Err(ContentError::UnknownBoss {
                        stage: stage.name.clone(),
                        archetype: boss.archetype.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    pub fn archetype(&self, kind: &str) -> Option<&EnemyArchetype> {
        self.enemies.iter().find(|e| e.kind == kind)
    }

    /// Stage config by 1-based stage number
    pub fn stage(&self, number: usize) -> Option<&StageConfig> {
        number.checked_sub(1).and_then(|i| self.stages.get(i))
    }

    pub fn upgrade(&self, id: &str) -> Option<&UpgradeDef> {
        self.upgrades.iter().find(|u| u.id == id)
    }

    /// Upgrades that may be offered right now.
    ///
    /// A weapon upgrade of tier N is offered only while the player holds that
    /// weapon at tier N-1 (tier 1 means the weapon is not owned yet). Passives
    /// are always available.
    pub fn available_upgrades<F>(&self, owned_level: F) -> Vec<&UpgradeDef>
    where
        F: Fn(&str) -> Option<u8>,
    {
        self.upgrades
            .iter()
            .filter(|upgrade| match upgrade.kind {
                UpgradeKind::Passive => true,
                UpgradeKind::Weapon => match UpgradeId::parse(&upgrade.id) {
                    Ok(id) => {
                        let current = owned_level(&id.token).unwrap_or(0);
                        current.checked_add(1) == Some(id.level)
                    }
                    Err(_) => false,
                },
            })
            .collect()
    }
}

/// Pick up to `count` distinct upgrades, weighting rarities by player level.
///
/// When the rolled rarity has nothing left in the pool, any remaining
/// upgrade may be picked instead.
pub fn select_random_upgrades<'a, R: Rng>(
    available: &[&'a UpgradeDef],
    count: usize,
    level: u32,
    rng: &mut R,
) -> Vec<&'a UpgradeDef> {
    let weights = RarityWeights::for_level(level);
    let mut remaining: Vec<&'a UpgradeDef> = available.to_vec();
    let mut picked = Vec::with_capacity(count);

    while picked.len() < count && !remaining.is_empty() {
        let roll = rng.random::<f32>() * 100.0;
        let rarity = weights.pick(roll);
        let pool: Vec<usize> = remaining
            .iter()
            .enumerate()
            .filter(|(_, u)| Some(u.rarity) == rarity)
            .map(|(i, _)| i)
            .collect();

        let index = if pool.is_empty() {
            rng.random_range(0..remaining.len())
        } else {
            pool[rng.random_range(0..pool.len())]
        };
        picked.push(remaining.remove(index));
    }

    picked
}

impl Default for Content {
    fn default() -> Self {
        Self {
            enemies: default_enemies(),
            stages: default_stages(),
            upgrades: default_upgrades(),
        }
    }
}

fn default_enemies() -> Vec<EnemyArchetype> {
    let mut ranged = EnemyArchetype::new("ranged", 40.0, 1.0, 3.0, (28.0, 28.0), "blue", 15, 10);
    ranged.attack_cooldown_ms = Some(2000.0);
    ranged.attack_range = Some(200.0);

    let mut exploder =
        EnemyArchetype::new("exploder", 20.0, 1.5, 20.0, (30.0, 30.0), "orange", 12, 10);
    exploder.explodes_on_contact = true;

    vec![
        EnemyArchetype::new("zombie", 30.0, 1.0, 10.0, (35.0, 45.0), "#5cb85c", 10, 12),
        EnemyArchetype::new("ghost", 15.0, 1.5, 5.0, (30.0, 40.0), "#d9d9d9", 15, 16),
        EnemyArchetype::new("skeleton", 20.0, 1.2, 8.0, (32.0, 42.0), "#f0ad4e", 12, 14),
        EnemyArchetype::new("basic", 50.0, 1.2, 5.0, (30.0, 30.0), "green", 10, 10),
        EnemyArchetype::new("fast", 30.0, 2.5, 4.0, (25.0, 25.0), "yellow", 8, 10),
        EnemyArchetype::new("tank", 120.0, 0.8, 8.0, (40.0, 40.0), "darkred", 25, 10),
        ranged,
        exploder,
        EnemyArchetype::new("boss", 500.0, 1.0, 20.0, (100.0, 100.0), "#FF0000", 100, 8),
    ]
}

fn stage(
    name: &str,
    message: &str,
    duration_ms: Option<f64>,
    enemy_types: &[&str],
    spawn_rate: f64,
    boss: Option<(&str, f32)>,
) -> StageConfig {
    StageConfig {
        name: name.to_string(),
        message: message.to_string(),
        duration_ms,
        enemy_types: enemy_types.iter().map(|s| s.to_string()).collect(),
        spawn_rate,
        boss: boss.map(|(name, health)| BossDescriptor {
            archetype: "boss".to_string(),
            name: name.to_string(),
            health: Some(health),
        }),
        boss_interval_ms: None,
    }
}

fn default_stages() -> Vec<StageConfig> {
    const STAGE_MS: Option<f64> = Some(120_000.0);

    let mut endless = stage(
        "Endless",
        "Final Stage: Endless Nightmare",
        None,
        &["zombie", "skeleton", "ghost", "boss"],
        0.035,
        Some(("Nightmare Lord", 3000.0)),
    );
    endless.boss_interval_ms = Some(60_000.0);

    vec![
        stage(
            "The Beginning",
            "Stage 1: The Forest of Shadows",
            STAGE_MS,
            &["ghost"],
            0.1,
            Some(("Bone Colossus", 1000.0)),
        ),
        stage(
            "The Caverns",
            "Stage 2: The Forgotten Caverns",
            STAGE_MS,
            &["zombie", "skeleton"],
            0.015,
            None,
        ),
        stage(
            "The Catacombs",
            "Stage 3: Ancient Catacombs",
            STAGE_MS,
            &["zombie", "skeleton", "ghost"],
            0.02,
            Some(("Bone Colossus", 1000.0)),
        ),
        stage(
            "The Abyss",
            "Stage 4: The Endless Abyss",
            STAGE_MS,
            &["skeleton", "ghost"],
            0.025,
            None,
        ),
        stage(
            "The Void",
            "Stage 5: The Void of Souls",
            STAGE_MS,
            &["ghost", "boss"],
            0.03,
            Some(("Void Harbinger", 2000.0)),
        ),
        endless,
    ]
}

fn default_upgrades() -> Vec<UpgradeDef> {
    use Rarity::*;
    use StatModifier::*;
    use UpgradeKind::*;

    let mul = |stat, factor| Multiply { stat, factor };
    let add = |stat, amount| Add { stat, amount };

    vec![
        UpgradeDef::new(
            "wand2",
            "Magic Wand II",
            "Fires two magical projectiles with increased damage.",
            Weapon,
            Common,
            vec![mul(Stat::Damage, 1.1)],
        ),
        UpgradeDef::new(
            "wand3",
            "Magic Wand III",
            "Fires three projectiles in a wider arc.",
            Weapon,
            Rare,
            vec![mul(Stat::Damage, 1.15)],
        ),
        UpgradeDef::new(
            "axe",
            "Throwing Axe",
            "Throws spinning axes in every direction.",
            Weapon,
            Common,
            vec![],
        ),
        UpgradeDef::new(
            "axe2",
            "Throwing Axe II",
            "Throws more axes with extended reach.",
            Weapon,
            Uncommon,
            vec![mul(Stat::Damage, 1.1)],
        ),
        UpgradeDef::new(
            "axe3",
            "Throwing Axe III",
            "Throws a second flurry of sharper axes.",
            Weapon,
            Rare,
            vec![mul(Stat::Damage, 1.15), mul(Stat::Area, 1.05)],
        ),
        UpgradeDef::new(
            "fire",
            "Fire Aura",
            "A ring of flames burns nearby enemies.",
            Weapon,
            Uncommon,
            vec![],
        ),
        UpgradeDef::new(
            "fire2",
            "Fire Aura II",
            "Wider, hotter flames.",
            Weapon,
            Rare,
            vec![mul(Stat::Area, 1.05), mul(Stat::Damage, 1.05)],
        ),
        UpgradeDef::new(
            "fire3",
            "Fire Aura III",
            "A raging inferno that burns more often.",
            Weapon,
            Epic,
            vec![mul(Stat::Area, 1.1), mul(Stat::Damage, 1.15)],
        ),
        UpgradeDef::new(
            "frost",
            "Frost Nova",
            "Periodic burst of ice that slows and damages.",
            Weapon,
            Uncommon,
            vec![],
        ),
        UpgradeDef::new(
            "frost2",
            "Frost Nova II",
            "Longer freeze and lingering ice shards.",
            Weapon,
            Rare,
            vec![mul(Stat::Area, 1.05), mul(Stat::Cooldown, 0.95)],
        ),
        UpgradeDef::new(
            "lightning",
            "Lightning Strike",
            "Bolts strike random enemies and chain between them.",
            Weapon,
            Rare,
            vec![],
        ),
        UpgradeDef::new(
            "health",
            "Max Health Up",
            "+20 max health and a full heal.",
            Passive,
            Common,
            vec![AddMaxHealth { amount: 20.0 }],
        ),
        UpgradeDef::new(
            "health2",
            "Max Health Up II",
            "+30 max health and a full heal.",
            Passive,
            Uncommon,
            vec![AddMaxHealth { amount: 30.0 }],
        ),
        UpgradeDef::new(
            "regeneration",
            "Health Regeneration",
            "Slowly regenerates health over time.",
            Passive,
            Rare,
            vec![add(Stat::Regeneration, 1.0), Heal { amount: 20.0 }],
        ),
        UpgradeDef::new(
            "armor",
            "Arcane Armor",
            "Reduces damage taken by 10%.",
            Passive,
            Uncommon,
            vec![add(Stat::Armor, 10.0)],
        ),
        UpgradeDef::new(
            "speed",
            "Movement Speed Up",
            "+10% movement speed.",
            Passive,
            Common,
            vec![mul(Stat::Speed, 1.1)],
        ),
        UpgradeDef::new(
            "speed2",
            "Movement Speed Up II",
            "+15% movement speed.",
            Passive,
            Uncommon,
            vec![mul(Stat::Speed, 1.15)],
        ),
        UpgradeDef::new(
            "dash",
            "Arcane Dash",
            "20% chance to dash through an incoming hit.",
            Passive,
            Rare,
            vec![add(Stat::DashChance, 20.0), mul(Stat::Speed, 1.05)],
        ),
        UpgradeDef::new(
            "damage",
            "Damage Up",
            "+15% damage.",
            Passive,
            Common,
            vec![mul(Stat::Damage, 1.15)],
        ),
        UpgradeDef::new(
            "damage2",
            "Damage Up II",
            "+20% damage.",
            Passive,
            Uncommon,
            vec![mul(Stat::Damage, 1.2)],
        ),
        UpgradeDef::new(
            "critical",
            "Critical Strike",
            "+10% chance to deal double damage.",
            Passive,
            Rare,
            vec![add(Stat::CritChance, 10.0), add(Stat::CritDamage, 0.0)],
        ),
        UpgradeDef::new(
            "area",
            "Area Up",
            "+10% attack area.",
            Passive,
            Common,
            vec![mul(Stat::Area, 1.1)],
        ),
        UpgradeDef::new(
            "area2",
            "Area Up II",
            "+15% attack area.",
            Passive,
            Uncommon,
            vec![mul(Stat::Area, 1.15)],
        ),
        UpgradeDef::new(
            "cooldown",
            "Cooldown Reduction",
            "Weapons fire 10% faster.",
            Passive,
            Common,
            vec![mul(Stat::Cooldown, 0.9)],
        ),
        UpgradeDef::new(
            "cooldown2",
            "Cooldown Reduction II",
            "Weapons fire 15% faster.",
            Passive,
            Uncommon,
            vec![mul(Stat::Cooldown, 0.85)],
        ),
        UpgradeDef::new(
            "duration",
            "Duration Up",
            "Weapon effects last 20% longer.",
            Passive,
            Uncommon,
            vec![mul(Stat::Duration, 1.2)],
        ),
        UpgradeDef::new(
            "magnet",
            "Experience Magnet",
            "+25% gem pickup radius.",
            Passive,
            Common,
            vec![mul(Stat::MagnetRadius, 1.25)],
        ),
        UpgradeDef::new(
            "luck",
            "Fortune Charm",
            "+15% chance of a bonus gem.",
            Passive,
            Uncommon,
            vec![add(Stat::DropChance, 15.0)],
        ),
        UpgradeDef::new(
            "heal",
            "Healing Potion",
            "Restores 30 health.",
            Passive,
            Common,
            vec![Heal { amount: 30.0 }],
        ),
        UpgradeDef::new(
            "revive",
            "Second Chance",
            "Survive a killing blow once with 20% health.",
            Passive,
            Epic,
            vec![GrantRevive],
        ),
    ]
}
