//! Unit quaternions for orientation.

use crate::Vec3;
use std::fmt;
use std::ops::Mul;

/// A quaternion in `(w, x, y, z)` layout.
///
/// Orientation quaternions are kept normalized by construction;
/// [`Quat::normalized`] is available after long integration chains.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Quat {
    /// Scalar part.
    pub w: f64,
    /// Vector part, x.
    pub x: f64,
    /// Vector part, y.
    pub y: f64,
    /// Vector part, z.
    pub z: f64,
}

impl Quat {
    /// The identity rotation.
    pub const IDENTITY: Self = Self {
        w: 1.0,
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };

    /// Construct from components without normalizing.
    #[must_use]
    pub fn new(w: f64, x: f64, y: f64, z: f64) -> Self {
        Self { w, x, y, z }
    }

    /// Rotation of `angle` radians around `axis` (need not be unit length).
    #[must_use]
    pub fn from_axis_angle(axis: Vec3, angle: f64) -> Self {
        let len = axis.length();
        if len == 0.0 {
            return Self::IDENTITY;
        }
        let (s, c) = (angle * 0.5).sin_cos();
        let k = s / len;
        Self::new(c, axis.x * k, axis.y * k, axis.z * k)
    }

    /// Conjugate; for unit quaternions this is the inverse rotation.
    #[must_use]
    pub fn conjugate(self) -> Self {
        Self::new(self.w, -self.x, -self.y, -self.z)
    }

    /// Quaternion dot product.
    #[must_use]
    pub fn dot(self, rhs: Self) -> f64 {
        self.w * rhs.w + self.x * rhs.x + self.y * rhs.y + self.z * rhs.z
    }

    /// Renormalize to unit length. Identity if the norm underflows.
    #[must_use]
    pub fn normalized(self) -> Self {
        let n = self.dot(self).sqrt();
        if n <= f64::EPSILON {
            return Self::IDENTITY;
        }
        Self::new(self.w / n, self.x / n, self.y / n, self.z / n)
    }

    /// Rotate a vector by this quaternion.
    #[must_use]
    pub fn rotate(self, v: Vec3) -> Vec3 {
        // q v q* expanded via the rotation-through-cross-product form.
        let u = Vec3::new(self.x, self.y, self.z);
        let t = u.cross(v).scaled(2.0);
        v + t.scaled(self.w) + u.cross(t)
    }

    /// Spherical linear interpolation: `self` at `t = 0`, `target` at `t = 1`.
    ///
    /// Takes the shorter arc; falls back to normalized lerp when the
    /// quaternions are nearly parallel.
    #[must_use]
    pub fn slerp(self, target: Self, t: f64) -> Self {
        let mut cos = self.dot(target);
        let mut end = target;
        if cos < 0.0 {
            cos = -cos;
            end = Self::new(-end.w, -end.x, -end.y, -end.z);
        }
        if cos > 0.9995 {
            return Self::new(
                self.w + (end.w - self.w) * t,
                self.x + (end.x - self.x) * t,
                self.y + (end.y - self.y) * t,
                self.z + (end.z - self.z) * t,
            )
            .normalized();
        }
        let theta = cos.clamp(-1.0, 1.0).acos();
        let sin_theta = theta.sin();
        let a = ((1.0 - t) * theta).sin() / sin_theta;
        let b = (t * theta).sin() / sin_theta;
        Self::new(
            self.w * a + end.w * b,
            self.x * a + end.x * b,
            self.y * a + end.y * b,
            self.z * a + end.z * b,
        )
    }

    /// Whether every component is within `tol` of `rhs`, up to sign
    /// (q and -q encode the same rotation).
    #[must_use]
    pub fn approx_eq(self, rhs: Self, tol: f64) -> bool {
        let direct = (self.w - rhs.w).abs() <= tol
            && (self.x - rhs.x).abs() <= tol
            && (self.y - rhs.y).abs() <= tol
            && (self.z - rhs.z).abs() <= tol;
        let negated = (self.w + rhs.w).abs() <= tol
            && (self.x + rhs.x).abs() <= tol
            && (self.y + rhs.y).abs() <= tol
            && (self.z + rhs.z).abs() <= tol;
        direct || negated
    }
}

impl Default for Quat {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Mul for Quat {
    type Output = Self;
    fn mul(self, r: Self) -> Self {
        Self::new(
            self.w * r.w - self.x * r.x - self.y * r.y - self.z * r.z,
            self.w * r.x + self.x * r.w + self.y * r.z - self.z * r.y,
            self.w * r.y - self.x * r.z + self.y * r.w + self.z * r.x,
            self.w * r.z + self.x * r.y - self.y * r.x + self.z * r.w,
        )
    }
}

impl fmt::Display for Quat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}; {}, {}, {})", self.w, self.x, self.y, self.z)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::FRAC_PI_2;

    #[test]
    fn rotate_quarter_turn_about_z() {
        let q = Quat::from_axis_angle(Vec3::new(0.0, 0.0, 1.0), FRAC_PI_2);
        let v = q.rotate(Vec3::new(1.0, 0.0, 0.0));
        assert!(v.approx_eq(Vec3::new(0.0, 1.0, 0.0), 1e-12));
    }

    #[test]
    fn conjugate_inverts_rotation() {
        let q = Quat::from_axis_angle(Vec3::new(1.0, 2.0, -0.5), 0.73);
        let v = Vec3::new(0.3, -4.0, 2.5);
        assert!(q.conjugate().rotate(q.rotate(v)).approx_eq(v, 1e-12));
    }

    #[test]
    fn slerp_endpoints_and_midpoint() {
        let a = Quat::IDENTITY;
        let b = Quat::from_axis_angle(Vec3::new(0.0, 0.0, 1.0), FRAC_PI_2);
        assert!(a.slerp(b, 0.0).approx_eq(a, 1e-12));
        assert!(a.slerp(b, 1.0).approx_eq(b, 1e-12));
        let mid = a.slerp(b, 0.5);
        let expected = Quat::from_axis_angle(Vec3::new(0.0, 0.0, 1.0), FRAC_PI_2 / 2.0);
        assert!(mid.approx_eq(expected, 1e-9));
    }

    #[test]
    fn composition_order() {
        let yaw = Quat::from_axis_angle(Vec3::new(0.0, 0.0, 1.0), 0.4);
        let pitch = Quat::from_axis_angle(Vec3::new(0.0, 1.0, 0.0), -0.2);
        let v = Vec3::new(1.0, 0.5, -0.3);
        let composed = (yaw * pitch).rotate(v);
        let sequential = yaw.rotate(pitch.rotate(v));
        assert!(composed.approx_eq(sequential, 1e-12));
    }
}
