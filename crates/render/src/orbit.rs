//! Circular motion of entities around the origin.

use crate::scene::Scene;
use glam::Vec3;
use serde::{Deserialize, Serialize};

/// One entity moving on a circle in the XZ plane.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Orbiter {
    /// Index into [`Scene::entities`].
    pub entity: usize,
    pub radius: f32,
    /// Multiplies the shared angle, so higher values orbit faster.
    pub angular_multiplier: f32,
    /// Yaw added per second, in radians.
    #[serde(default)]
    pub spin: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrbitSettings {
    pub degrees_per_second: f32,
    pub orbiters: Vec<Orbiter>,
}

impl Default for OrbitSettings {
    fn default() -> Self {
        let orbiter = |entity: usize, radius, spin| Orbiter {
            entity,
            radius,
            angular_multiplier: entity as f32,
            spin,
        };
        Self {
            degrees_per_second: 20.0,
            orbiters: vec![
                orbiter(1, 15.0, -0.25),
                orbiter(2, 40.0, 0.0),
                orbiter(3, 60.0, 0.0),
                orbiter(4, 75.0, 0.0),
            ],
        }
    }
}

/// Advances a shared angle and places every orbiter from it.
#[derive(Debug, Clone, PartialEq)]
pub struct OrbitSystem {
    settings: OrbitSettings,
    /// Degrees, in `[0, 360)` after each update.
    angle: f32,
    paused: bool,
}

impl OrbitSystem {
    pub fn new(settings: OrbitSettings) -> Self {
        Self {
            settings,
            angle: 0.0,
            paused: false,
        }
    }

    pub fn angle(&self) -> f32 {
        self.angle
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn set_paused(&mut self, paused: bool) {
        self.paused = paused;
    }

    pub fn toggle_paused(&mut self) {
        self.paused = !self.paused;
    }

    pub fn settings(&self) -> &OrbitSettings {
        &self.settings
    }

    /// Position of an orbiter at the given angle in degrees.
    pub fn orbit_position(orbiter: &Orbiter, angle: f32) -> Vec3 {
        let theta = (angle * orbiter.angular_multiplier).to_radians();
        Vec3::new(theta.sin() * orbiter.radius, 0.0, theta.cos() * orbiter.radius)
    }

    /// Place orbiters at the current angle, then advance it. Does nothing
    /// while paused. Orbiters naming a missing entity are skipped.
    pub fn update(&mut self, scene: &mut Scene, dt: f32) {
        if self.paused {
            return;
        }
        for orbiter in &self.settings.orbiters {
            let Some(entity) = scene.entity_mut(orbiter.entity) else {
                continue;
            };
            if orbiter.spin != 0.0 {
                entity.transform.rotate(Vec3::new(0.0, orbiter.spin * dt, 0.0));
            }
            entity
                .transform
                .set_position(Self::orbit_position(orbiter, self.angle));
        }
        self.angle = (self.angle + self.settings.degrees_per_second * dt).rem_euclid(360.0);
    }
}
