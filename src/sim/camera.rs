//! Player-centered camera with eased zoom

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::settings::CameraSettings;

/// Host window size in pixels
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
}

impl Viewport {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    pub fn size(&self) -> Vec2 {
        Vec2::new(self.width, self.height)
    }

    /// Distance scale relative to the design resolution
    pub fn scale(&self) -> f32 {
        crate::scale_factor(self.width, self.height)
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(crate::consts::DESIGN_WIDTH, crate::consts::DESIGN_HEIGHT)
    }
}

/// Discrete zoom request from the host
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ZoomCommand {
    In,
    Out,
    Reset,
    /// Mouse wheel; positive delta zooms out
    Wheel(f32),
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Camera {
    pub zoom: f32,
    pub target_zoom: f32,
    pub min_zoom: f32,
    pub max_zoom: f32,
    /// Fraction of the remaining distance closed per update
    pub zoom_speed: f32,
    /// Zoom restored by `reset`
    pub default_zoom: f32,
}

impl Camera {
    /// Step for keyboard zoom
    pub const KEY_STEP: f32 = 0.1;
    /// Step per wheel notch
    pub const WHEEL_STEP: f32 = 0.05;
    /// Snap threshold for zoom easing
    const SNAP: f32 = 0.001;

    pub fn from_settings(settings: &CameraSettings) -> Self {
        let min_zoom = settings.min_zoom.min(settings.max_zoom);
        let max_zoom = settings.max_zoom.max(settings.min_zoom);
        let zoom = settings.default_zoom.clamp(min_zoom, max_zoom);
        Self {
            zoom,
            target_zoom: zoom,
            min_zoom,
            max_zoom,
            zoom_speed: settings.zoom_speed.clamp(0.0, 1.0),
            default_zoom: zoom,
        }
    }

    /// Ease `zoom` toward `target_zoom`, snapping once close enough
    pub fn update_zoom(&mut self) {
        let diff = self.target_zoom - self.zoom;
        if diff.abs() > Self::SNAP {
            self.zoom += diff * self.zoom_speed;
        } else {
            self.zoom = self.target_zoom;
        }
    }

    /// Request a new zoom level, clamped to the allowed range
    pub fn set_target_zoom(&mut self, zoom: f32) {
        self.target_zoom = zoom.clamp(self.min_zoom, self.max_zoom);
    }

    pub fn apply(&mut self, command: ZoomCommand) {
        match command {
            ZoomCommand::In => self.set_target_zoom(self.target_zoom + Self::KEY_STEP),
            ZoomCommand::Out => self.set_target_zoom(self.target_zoom - Self::KEY_STEP),
            ZoomCommand::Reset => self.set_target_zoom(self.default_zoom),
            ZoomCommand::Wheel(delta) => {
                let step = if delta > 0.0 {
                    -Self::WHEEL_STEP
                } else {
                    Self::WHEEL_STEP
                };
                self.set_target_zoom(self.target_zoom + step);
            }
        }
    }

    /// World-space extent currently visible
    pub fn visible_size(&self, viewport: Viewport) -> Vec2 {
        viewport.size() / self.zoom
    }

    /// Map a world point to screen pixels for a camera centered on `center`
    pub fn world_to_screen(&self, world: Vec2, center: Vec2, viewport: Viewport) -> Vec2 {
        (world - center) * self.zoom + viewport.size() / 2.0
    }

    /// Inverse of [`Camera::world_to_screen`]
    pub fn screen_to_world(&self, screen: Vec2, center: Vec2, viewport: Viewport) -> Vec2 {
        (screen - viewport.size() / 2.0) / self.zoom + center
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::from_settings(&CameraSettings::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let camera = Camera::default();
        assert!((camera.zoom - 0.65).abs() < 1e-6);
        assert!((camera.min_zoom - 0.4).abs() < 1e-6);
        assert!((camera.max_zoom - 1.5).abs() < 1e-6);
    }

    #[test]
    fn test_zoom_eases_then_snaps() {
        let mut camera = Camera::default();
        camera.set_target_zoom(1.0);
        camera.update_zoom();
        // 0.65 + 0.35 * 0.05
        assert!((camera.zoom - 0.6675).abs() < 1e-5);
        for _ in 0..500 {
            camera.update_zoom();
        }
        assert_eq!(camera.zoom, 1.0);
    }

    #[test]
    fn test_target_is_clamped() {
        let mut camera = Camera::default();
        camera.set_target_zoom(10.0);
        assert!((camera.target_zoom - 1.5).abs() < 1e-6);
        camera.set_target_zoom(0.0);
        assert!((camera.target_zoom - 0.4).abs() < 1e-6);
    }

    #[test]
    fn test_commands() {
        let mut camera = Camera::default();
        camera.apply(ZoomCommand::In);
        assert!((camera.target_zoom - 0.75).abs() < 1e-5);
        camera.apply(ZoomCommand::Wheel(1.0));
        assert!((camera.target_zoom - 0.70).abs() < 1e-5);
        camera.apply(ZoomCommand::Wheel(-1.0));
        camera.apply(ZoomCommand::Out);
        camera.apply(ZoomCommand::Out);
        assert!((camera.target_zoom - 0.55).abs() < 1e-5);
        camera.apply(ZoomCommand::Reset);
        assert!((camera.target_zoom - 0.65).abs() < 1e-6);
    }

    #[test]
    fn test_screen_mapping_round_trip() {
        let camera = Camera::default();
        let viewport = Viewport::new(1024.0, 768.0);
        let center = Vec2::new(400.0, 300.0);
        // The camera centre lands in the middle of the screen
        assert_eq!(
            camera.world_to_screen(center, center, viewport),
            Vec2::new(512.0, 384.0)
        );
        let world = Vec2::new(123.0, -45.0);
        let screen = camera.world_to_screen(world, center, viewport);
        let back = camera.screen_to_world(screen, center, viewport);
        assert!((back - world).length() < 1e-3);
    }

    #[test]
    fn test_visible_size_grows_when_zoomed_out() {
        let camera = Camera::default();
        let visible = camera.visible_size(Viewport::default());
        assert!(visible.x > 800.0 && visible.y > 600.0);
    }
}
