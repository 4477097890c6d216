//! Rendering contract
//!
//! The simulation never draws. After a tick completes the host hands a
//! [`Frame`] to a [`Renderer`]; the frame is a read-only view of the world
//! with the camera transform applied.

use glam::Vec2;

use crate::sim::state::{Direction, EffectKind, WorldState, colors};
use crate::sim::Viewport;

/// Maximum sprites emitted per frame
pub const MAX_SPRITES: usize = 4096;

/// World-space margin kept around the visible area when culling
const CULL_MARGIN: f32 = 64.0;

/// Anything that can draw a frame
pub trait Renderer {
    fn render(&mut self, frame: &Frame<'_>);

    /// Host window changed size
    fn resize(&mut self, _viewport: Viewport) {}
}

/// What a sprite depicts
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SpriteKind<'a> {
    Player {
        direction: Direction,
        frame: u32,
        walk_phase: f32,
    },
    Enemy {
        archetype: &'a str,
        boss: bool,
        frame: u32,
        frozen: bool,
        flashing: bool,
        /// Remaining health as a fraction
        health: f32,
    },
    Projectile {
        rotation: Option<f32>,
    },
    Gem,
    Effect(EffectKind),
    DamageText {
        value: f32,
        critical: bool,
        on_player: bool,
    },
}

/// One drawable in screen space
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sprite<'a> {
    pub kind: SpriteKind<'a>,
    /// Center in screen pixels
    pub pos: Vec2,
    /// Size in screen pixels
    pub size: Vec2,
    pub color: [f32; 4],
}

/// Read-only view of the world for one frame
pub struct Frame<'a> {
    world: &'a WorldState,
    pub viewport: Viewport,
}

impl<'a> Frame<'a> {
    pub fn new(world: &'a WorldState, viewport: Viewport) -> Self {
        Self { world, viewport }
    }

    pub fn world(&self) -> &'a WorldState {
        self.world
    }

    /// World point to screen pixels, camera centered on the player
    pub fn to_screen(&self, world: Vec2) -> Vec2 {
        self.world
            .camera
            .world_to_screen(world, self.world.player.pos, self.viewport)
    }

    /// World length to screen pixels
    pub fn scale(&self, length: f32) -> f32 {
        length * self.world.camera.zoom
    }

    /// Whether a world point (with radius) is near enough the view to draw
    pub fn is_visible(&self, pos: Vec2, radius: f32) -> bool {
        let half =
            self.world.camera.visible_size(self.viewport) / 2.0 + Vec2::splat(CULL_MARGIN + radius);
        let offset = (pos - self.world.player.pos).abs();
        offset.x <= half.x && offset.y <= half.y
    }

    fn sprite(&self, kind: SpriteKind<'a>, pos: Vec2, size: Vec2, color: [f32; 4]) -> Sprite<'a> {
        Sprite {
            kind,
            pos: self.to_screen(pos),
            size: size * self.world.camera.zoom,
            color,
        }
    }

    /// Everything visible, back to front: gems, enemies, projectiles,
    /// player, effects, damage texts
    pub fn sprites(&self) -> Vec<Sprite<'a>> {
        let world = self.world;
        let mut out = Vec::new();

        for gem in world.gems.iter().filter(|g| self.is_visible(g.pos, g.size)) {
            out.push(self.sprite(SpriteKind::Gem, gem.pos, Vec2::splat(gem.size), colors::GEM));
        }

        for enemy in world.enemies.iter().filter(|e| self.is_visible(e.pos, e.size.max_element())) {
            let kind = SpriteKind::Enemy {
                archetype: &enemy.kind,
                boss: enemy.is_boss,
                frame: enemy.animation_frame,
                frozen: enemy.frost.is_some(),
                flashing: enemy.hit_flash.is_some(),
                health: (enemy.health / enemy.max_health).clamp(0.0, 1.0),
            };
            out.push(self.sprite(kind, enemy.pos, enemy.size, [1.0; 4]));
        }

        for weapon in &world.player.weapons {
            let color = weapon.kind.color();
            let visible = weapon
                .projectiles
                .iter()
                .filter(|p| self.is_visible(p.pos, p.radius));
            for projectile in visible {
                let kind = SpriteKind::Projectile {
                    rotation: projectile.rotation,
                };
                let size = Vec2::splat(projectile.radius * 2.0);
                out.push(self.sprite(kind, projectile.pos, size, color));
            }
        }

        let player = &world.player;
        let kind = SpriteKind::Player {
            direction: player.direction,
            frame: player.current_frame,
            walk_phase: player.walk_phase,
        };
        out.push(self.sprite(kind, player.pos, player.size, [1.0; 4]));

        for effect in world.effects.visuals.iter().filter(|e| self.is_visible(e.pos, e.size)) {
            let mut color = effect.color;
            color[3] *= 1.0 - effect.frame as f32 / effect.duration.max(1) as f32;
            let size = Vec2::splat(effect.size);
            out.push(self.sprite(SpriteKind::Effect(effect.kind), effect.pos, size, color));
        }

        for text in &world.effects.texts {
            let rise = Vec2::new(0.0, -(text.frame as f32));
            let color = if text.critical {
                colors::CRIT_TEXT
            } else {
                colors::DAMAGE_TEXT
            };
            let kind = SpriteKind::DamageText {
                value: text.value,
                critical: text.critical,
                on_player: text.on_player,
            };
            out.push(self.sprite(kind, text.pos + rise, Vec2::splat(16.0), color));
        }

        out.truncate(MAX_SPRITES);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::state::Enemy;
    use crate::tuning::Content;
    use std::sync::Arc;

    #[test]
    fn test_player_is_screen_center() {
        let world = WorldState::new(1, Arc::new(Content::default()));
        let frame = Frame::new(&world, Viewport::new(1000.0, 500.0));
        assert_eq!(frame.to_screen(world.player.pos), Vec2::new(500.0, 250.0));
    }

    #[test]
    fn test_far_enemies_are_culled() {
        let mut world = WorldState::new(1, Arc::new(Content::default()));
        let archetype = world.content.archetype("ghost").expect("ghost").clone();
        let origin = world.player.pos;
        let near = world.next_entity_id();
        world.enemies.push(Enemy::from_archetype(near, &archetype, origin + Vec2::new(100.0, 0.0)));
        let far = world.next_entity_id();
        world.enemies.push(Enemy::from_archetype(far, &archetype, origin + Vec2::new(5000.0, 0.0)));

        let frame = Frame::new(&world, Viewport::default());
        let enemies = frame
            .sprites()
            .iter()
            .filter(|s| matches!(s.kind, SpriteKind::Enemy { .. }))
            .count();
        assert_eq!(enemies, 1);
    }

    #[test]
    fn test_sizes_follow_zoom() {
        let world = WorldState::new(1, Arc::new(Content::default()));
        let frame = Frame::new(&world, Viewport::default());
        let player = frame
            .sprites()
            .into_iter()
            .find(|s| matches!(s.kind, SpriteKind::Player { .. }))
            .expect("player sprite");
        assert!((player.size.x - 40.0 * 0.65).abs() < 1e-4);
    }
}
