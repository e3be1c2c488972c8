//! Angle, rotation and stall math shared by every force stage.
//!
//! Rotations here are bearing-style: a positive heading rotation turns
//! the vector clockwise when viewed from above, matching compass
//! headings. This is deliberate and does not match the right-handed
//! convention of off-the-shelf rotation types, which is why these are
//! written out by component.

use nalgebra::Vector3;
use std::f64::consts::PI;

/// Wrap a radian value into [0, 2*PI).
pub fn sanitize_radians(mut r: f64) -> f64 {
    while r < 0.0 {
        r += 2.0 * PI;
    }
    while r >= 2.0 * PI {
        r -= 2.0 * PI;
    }
    r
}

/// Wrap a degree value into [0, 360).
pub fn sanitize_degrees(mut d: f64) -> f64 {
    while d < 0.0 {
        d += 360.0;
    }
    while d >= 360.0 {
        d -= 360.0;
    }
    d
}

/// Convert radians to sanitized degrees.
pub fn radians_to_degrees(r: f64) -> f64 {
    sanitize_degrees(r * (180.0 / PI))
}

/// Convert degrees to sanitized radians.
pub fn degrees_to_radians(d: f64) -> f64 {
    sanitize_radians(d * (PI / 180.0))
}

/// Signed shortest angular difference `a2 - a1`, in (-PI, PI].
pub fn delta_radians(a1: f64, a2: f64) -> f64 {
    let theta = sanitize_radians(a2) - sanitize_radians(a1);
    if theta < -PI {
        theta + 2.0 * PI
    } else if theta > PI {
        theta - 2.0 * PI
    } else {
        theta
    }
}

/// 2D hypotenuse.
#[inline]
pub fn hypot2(dx: f64, dy: f64) -> f64 {
    (dx * dx + dy * dy).sqrt()
}

/// 3D hypotenuse.
#[inline]
pub fn hypot3(dx: f64, dy: f64, dz: f64) -> f64 {
    (dx * dx + dy * dy + dz * dz).sqrt()
}

/// Rotate the 2D vector (i, j) by `theta` about the axis orthogonal to
/// its plane. Positive theta rotates in the bearing sense.
#[inline]
pub fn ortho_rotate_2d(theta: f64, i: f64, j: f64) -> (f64, f64) {
    let (sin_theta, cos_theta) = theta.sin_cos();
    (i * cos_theta + j * sin_theta, j * cos_theta - i * sin_theta)
}

/// Rotate a vector about the vertical (z) axis by a heading angle.
#[inline]
pub fn rotate_heading(v: Vector3<f64>, theta: f64) -> Vector3<f64> {
    let (sin_theta, cos_theta) = theta.sin_cos();
    Vector3::new(
        v.x * cos_theta + v.y * sin_theta,
        v.y * cos_theta - v.x * sin_theta,
        v.z,
    )
}

/// Rotate a vector about the lateral (x) axis by a pitch angle.
#[inline]
pub fn rotate_pitch(v: Vector3<f64>, theta: f64) -> Vector3<f64> {
    let (sin_theta, cos_theta) = theta.sin_cos();
    Vector3::new(
        v.x,
        v.y * cos_theta + v.z * sin_theta,
        v.z * cos_theta - v.y * sin_theta,
    )
}

/// Rotate a vector about the longitudinal (y) axis by a bank angle.
#[inline]
pub fn rotate_bank(v: Vector3<f64>, theta: f64) -> Vector3<f64> {
    let (sin_theta, cos_theta) = theta.sin_cos();
    Vector3::new(
        v.x * cos_theta - v.z * sin_theta,
        v.y,
        v.z * cos_theta + v.x * sin_theta,
    )
}

/// Aerodynamic lift-loss coefficient in [0, 1].
///
/// 1.0 at or below zero speed, 0.0 at or above the stall speed, linear
/// in between. This single formula anchors all stall behavior.
pub fn stall_coeff(current_speed: f64, stall_speed: f64) -> f64 {
    if current_speed > stall_speed || stall_speed <= 0.0 {
        0.0
    } else if current_speed <= 0.0 {
        1.0
    } else {
        1.0 - current_speed / stall_speed
    }
}

/// Effective speed to feed into [`stall_coeff`] given the longitudinal
/// and vertical airspeed components and the current pitch.
///
/// Vertical speed only counts when the nose is pointed somewhere it is
/// aerodynamically meaningful; falling fast while level on the horizon
/// must not read as flying speed.
pub fn speed_for_stall(vel_y: f64, vel_z: f64, pitch: f64) -> f64 {
    let sin_pitch = pitch.sin();
    let mut meaningful_z = 0.0;

    // Climbing counts when pitched up hard; sinking counts unless the
    // nose is pitched up hard.
    if sin_pitch < -0.2 && vel_z > 0.0 {
        meaningful_z += vel_z;
    } else if sin_pitch > -0.2 && vel_z < 0.0 {
        meaningful_z += vel_z;
    }

    hypot2(vel_y, meaningful_z)
}
