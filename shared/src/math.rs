//! Minimal 3D vector math for a grounded simulation.
//!
//! Units live in full 3D space but move and measure distance on the ground
//! plane (x/z); the y axis is height and is deliberately ignored by arrival
//! checks and movement direction.

use serde::{Deserialize, Serialize};
use std::ops::{Add, Mul, Neg, Sub};

/// A point or displacement in world space. Positive y is up.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// Returns the full 3D magnitude of the vector.
    pub fn magnitude(&self) -> f32 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }

    /// Returns the magnitude of the ground-plane projection.
    pub fn ground_magnitude(&self) -> f32 {
        (self.x * self.x + self.z * self.z).sqrt()
    }

    /// Planar distance to `other`, ignoring height difference.
    pub fn ground_distance_to(&self, other: &Vec3) -> f32 {
        (*other - *self).ground_magnitude()
    }

    /// Projects onto the ground plane and normalizes. The zero vector
    /// normalizes to zero rather than NaN.
    pub fn ground_normalized(&self) -> Vec3 {
        let flat = Vec3::new(self.x, 0.0, self.z);
        let mag = flat.ground_magnitude();
        if mag == 0.0 {
            Vec3::default()
        } else {
            Vec3::new(flat.x / mag, 0.0, flat.z / mag)
        }
    }

    /// Scales the vector down to `max` length if it is longer, preserving
    /// direction. Shorter vectors are returned unchanged.
    pub fn clamped_to(&self, max: f32) -> Vec3 {
        let mag = self.magnitude();
        if mag > max && mag > 0.0 {
            *self * (max / mag)
        } else {
            *self
        }
    }
}

impl Add for Vec3 {
    type Output = Vec3;

    fn add(self, rhs: Vec3) -> Vec3 {
        Vec3::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl Sub for Vec3 {
    type Output = Vec3;

    fn sub(self, rhs: Vec3) -> Vec3 {
        Vec3::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl Mul<f32> for Vec3 {
    type Output = Vec3;

    fn mul(self, rhs: f32) -> Vec3 {
        Vec3::new(self.x * rhs, self.y * rhs, self.z * rhs)
    }
}

impl Neg for Vec3 {
    type Output = Vec3;

    fn neg(self) -> Vec3 {
        Vec3::new(-self.x, -self.y, -self.z)
    }
}
