//! Colored noise generation.
//!
//! Gaussian white noise is shaped in the time domain: pink through
//! Kellet's filter bank, brown through a leaky integrator, blue and
//! violet as first differences of pink and white.

use alloc::vec::Vec;
use core::f64::consts::PI;

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use crate::NoiseColor;

/// Leak applied to the brown-noise integrator to keep it bounded.
const BROWN_LEAK: f64 = 0.998;

/// Generate `n` samples of colored noise (not normalized).
pub(crate) fn colored_noise(color: NoiseColor, n: usize, seed: u64) -> Vec<f64> {
    let white = gaussian(n, seed);
    let mut out = match color {
        NoiseColor::White => white,
        NoiseColor::Pink => pink(&white),
        NoiseColor::Brown => brown(&white),
        NoiseColor::Blue => difference(&pink(&white)),
        NoiseColor::Violet => difference(&white),
    };
    remove_mean(&mut out);
    out
}

fn gaussian(n: usize, seed: u64) -> Vec<f64> {
    let mut rng = SmallRng::seed_from_u64(seed);
    (0..n)
        .map(|_| {
            // Box-Muller; u1 in (0, 1] keeps the log finite
            let u1 = 1.0 - rng.gen::<f64>();
            let u2 = rng.gen::<f64>();
            libm::sqrt(-2.0 * libm::log(u1)) * libm::cos(2.0 * PI * u2)
        })
        .collect()
}

fn pink(white: &[f64]) -> Vec<f64> {
    let mut b = [0.0f64; 7];
    white
        .iter()
        .map(|&w| {
            b[0] = 0.99886 * b[0] + w * 0.055_517_9;
            b[1] = 0.99332 * b[1] + w * 0.075_075_9;
            b[2] = 0.96900 * b[2] + w * 0.153_852_0;
            b[3] = 0.86650 * b[3] + w * 0.310_485_6;
            b[4] = 0.55000 * b[4] + w * 0.532_952_2;
            b[5] = -0.7616 * b[5] - w * 0.016_898_0;
            let out = b.iter().sum::<f64>() + w * 0.5362;
            b[6] = w * 0.115_926;
            out
        })
        .collect()
}

fn brown(white: &[f64]) -> Vec<f64> {
    let mut acc = 0.0;
    white
        .iter()
        .map(|&w| {
            acc = BROWN_LEAK * acc + w;
            acc
        })
        .collect()
}

fn difference(x: &[f64]) -> Vec<f64> {
    let mut prev = 0.0;
    x.iter()
        .map(|&v| {
            let d = v - prev;
            prev = v;
            d
        })
        .collect()
}

fn remove_mean(x: &mut [f64]) {
    if x.is_empty() {
        return;
    }
    let mean = x.iter().sum::<f64>() / x.len() as f64;
    for v in x.iter_mut() {
        *v -= mean;
    }
}
