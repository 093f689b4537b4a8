//! Angle and opacity math for the arrow field.
//!
//! Everything here is plain `f32` arithmetic with no ECS dependency, so the
//! frame stepper and the tests share exactly the same formulas.

use std::f32::consts::{PI, TAU};

/// Wraps any finite angle into `(-π, π]`.
///
/// Angles already in range come back bit-for-bit unchanged. An exact `-π`
/// is folded onto `π` to keep the half-open interval. Non-finite input
/// yields NaN.
#[inline]
pub fn normalize_angle(angle: f32) -> f32 {
    if angle > -PI && angle <= PI {
        return angle;
    }
    let wrapped = (angle + PI).rem_euclid(TAU) - PI;
    if wrapped <= -PI {
        PI
    } else {
        wrapped
    }
}

/// Direction from `from` toward `to`, in radians, y-down screen space.
///
/// `atan2(0, 0)` is 0, so a pointer sitting exactly on a cell is well defined.
#[inline]
pub fn target_angle(from_x: f32, from_y: f32, to_x: f32, to_y: f32) -> f32 {
    (to_y - from_y).atan2(to_x - from_x)
}

/// Shortest signed rotation from `current` to `target`.
#[inline]
pub fn shortest_delta(current: f32, target: f32) -> f32 {
    normalize_angle(target - current)
}

/// Moves `current` a fraction `smoothing` of the shortest way toward `target`.
///
/// Exponential approach: every gap closes by the same fraction per tick.
#[inline]
pub fn step_angle(current: f32, target: f32, smoothing: f32) -> f32 {
    normalize_angle(current + shortest_delta(current, target) * smoothing)
}

/// Maps a pointer distance to an opacity inside the fade window.
///
/// Full `max_opacity` up to `fade_start`, `min_opacity` from `fade_end` on,
/// linear in between. The result is clamped to the span between the two
/// opacities, whichever order they come in.
pub fn fade_opacity(
    distance: f32,
    fade_start: f32,
    fade_end: f32,
    min_opacity: f32,
    max_opacity: f32,
) -> f32 {
    let opacity = if distance <= fade_start {
        max_opacity
    } else if distance >= fade_end {
        min_opacity
    } else {
        let progress = (distance - fade_start) / (fade_end - fade_start);
        max_opacity - (max_opacity - min_opacity) * progress
    };
    let lo = min_opacity.min(max_opacity);
    let hi = min_opacity.max(max_opacity);
    // max/min rather than clamp: NaN bounds must not panic.
    opacity.max(lo).min(hi)
}
