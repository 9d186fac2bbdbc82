//! Easing functions.
//!
//! All of them map `0.0` to `0.0` and `1.0` to `1.0`, which the scheduler
//! relies on to deliver an exact final factor on the stopping update.
//! Formulas follow the usual easings.net / Penner definitions.

use std::f32::consts::PI;

/// Easing function applied to the normalized elapsed time.
pub type Easing = fn(f32) -> f32;

pub fn linear(t: f32) -> f32 {
    t
}

/// Jumps to 1 at the very end.
pub fn step(t: f32) -> f32 {
    if t < 1.0 { 0.0 } else { 1.0 }
}

pub fn smoothstep(t: f32) -> f32 {
    t * t * (3.0 - 2.0 * t)
}

pub fn smootherstep(t: f32) -> f32 {
    t * t * t * (t * (t * 6.0 - 15.0) + 10.0)
}

pub fn quadratic_in(t: f32) -> f32 {
    t * t
}

pub fn quadratic_out(t: f32) -> f32 {
    -t * (t - 2.0)
}

pub fn quadratic_in_out(t: f32) -> f32 {
    if t < 0.5 {
        2.0 * t * t
    } else {
        1.0 - (-2.0 * t + 2.0).powi(2) / 2.0
    }
}

pub fn cubic_in(t: f32) -> f32 {
    t * t * t
}

pub fn cubic_out(t: f32) -> f32 {
    let inv = t - 1.0;
    inv * inv * inv + 1.0
}

pub fn cubic_in_out(t: f32) -> f32 {
    if t < 0.5 {
        4.0 * t * t * t
    } else {
        1.0 - (-2.0 * t + 2.0).powi(3) / 2.0
    }
}

pub fn quartic_in(t: f32) -> f32 {
    t * t * t * t
}

pub fn quartic_out(t: f32) -> f32 {
    1.0 - (1.0 - t).powi(4)
}

pub fn sine_in(t: f32) -> f32 {
    if t >= 1.0 {
        return 1.0;
    }
    1.0 - (t * PI / 2.0).cos()
}

pub fn sine_out(t: f32) -> f32 {
    (t * PI / 2.0).sin().min(1.0)
}

pub fn sine_in_out(t: f32) -> f32 {
    if t >= 1.0 {
        return 1.0;
    }
    -((PI * t).cos() - 1.0) / 2.0
}

pub fn exponential_in(t: f32) -> f32 {
    if t <= 0.0 { 0.0 } else { 2.0f32.powf(10.0 * t - 10.0) }
}

pub fn exponential_out(t: f32) -> f32 {
    if t >= 1.0 { 1.0 } else { 1.0 - 2.0f32.powf(-10.0 * t) }
}

pub fn circular_in(t: f32) -> f32 {
    1.0 - (1.0 - t * t).max(0.0).sqrt()
}

pub fn circular_out(t: f32) -> f32 {
    (1.0 - (t - 1.0) * (t - 1.0)).max(0.0).sqrt()
}

/// Overshoots slightly past 1 before settling.
pub fn back_out(t: f32) -> f32 {
    const C1: f32 = 1.70158;
    const C3: f32 = C1 + 1.0;
    if t >= 1.0 {
        return 1.0;
    }
    1.0 + C3 * (t - 1.0).powi(3) + C1 * (t - 1.0).powi(2)
}

pub fn bounce_out(t: f32) -> f32 {
    const N1: f32 = 7.5625;
    const D1: f32 = 2.75;
    if t >= 1.0 {
        1.0
    } else if t < 1.0 / D1 {
        N1 * t * t
    } else if t < 2.0 / D1 {
        let t = t - 1.5 / D1;
        N1 * t * t + 0.75
    } else if t < 2.5 / D1 {
        let t = t - 2.25 / D1;
        N1 * t * t + 0.9375
    } else {
        let t = t - 2.625 / D1;
        N1 * t * t + 0.984375
    }
}
