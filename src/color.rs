//! RGB to HSV conversion for colour bulbs.
//!
//! Bulbs take colour as an `hhssvv` byte triple. The conversion is the usual
//! branchless shader formulation built from `step` and `mix`, so black and grey
//! inputs fall out of the same arithmetic as saturated ones.

const EPSILON: f32 = 1e-10;

#[inline]
fn as_float(n: u8) -> f32 {
    n as f32 * (1.0 / 255.0)
}

#[inline]
fn as_byte(n: f32) -> u8 {
    if n <= 0.0 {
        0
    } else if n >= 1.0 {
        255
    } else {
        (n * 256.0).floor() as u8
    }
}

/// 0.0 when `x < edge`, 1.0 otherwise.
#[inline]
fn step(edge: f32, x: f32) -> f32 {
    if x < edge { 0.0 } else { 1.0 }
}

#[inline]
fn mix(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

/// Converts an RGB byte triple into the bulb's native HSV byte triple.
pub fn rgb_to_hsv(r: u8, g: u8, b: u8) -> (u8, u8, u8) {
    let (r, g, b) = (as_float(r), as_float(g), as_float(b));

    let s = step(b, g);
    let px = mix(b, g, s);
    let py = mix(g, b, s);
    let pz = mix(-1.0, 0.0, s);
    let pw = mix(2.0 / 3.0, -1.0 / 3.0, s);

    let s = step(px, r);
    let qx = mix(px, r, s);
    let qz = mix(pw, pz, s);
    let qw = mix(r, px, s);

    let d = qx - qw.min(py);
    let h = (qz + (qw - py) / (6.0 * d + EPSILON)).abs();
    let s = d / (qx + EPSILON);

    (as_byte(h), as_byte(s), as_byte(qx))
}
