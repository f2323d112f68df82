//! Continuous signal patterns.
//!
//! A signal has no event structure of its own: querying it yields a single
//! wholeless event whose value is the waveform sampled at the arc's start.
//! `segment` (or any structure-imposing combinator) turns it discrete.

use crate::pattern::{Hap, Pattern};

/// Continuous pattern from a waveform function of cycle time.
pub fn signal<T: Clone + Send + Sync + 'static>(
    f: impl Fn(f64) -> T + Send + Sync + 'static,
) -> Pattern<T> {
    Pattern::new(move |state| {
        if state.span.is_empty() {
            Vec::new()
        } else {
            vec![Hap::new(None, state.span, f(state.span.begin.to_float()))]
        }
    })
}

/// Unipolar sine: `0.5` at the cycle start, `1.0` at a quarter cycle.
pub fn sine() -> Pattern<f64> {
    signal(|t| ((t * std::f64::consts::TAU).sin() + 1.0) / 2.0)
}

/// Unipolar cosine: `1.0` at the cycle start.
pub fn cosine() -> Pattern<f64> {
    signal(|t| ((t * std::f64::consts::TAU).cos() + 1.0) / 2.0)
}

/// Rising sawtooth from 0 to 1 over each cycle.
pub fn saw() -> Pattern<f64> {
    signal(|t| t.rem_euclid(1.0))
}

/// Falling sawtooth from 1 to 0 over each cycle.
pub fn isaw() -> Pattern<f64> {
    signal(|t| 1.0 - t.rem_euclid(1.0))
}

/// Triangle: rises over the first half cycle, falls over the second.
pub fn tri() -> Pattern<f64> {
    signal(|t| {
        let phase = t.rem_euclid(1.0);
        if phase < 0.5 {
            phase * 2.0
        } else {
            2.0 - phase * 2.0
        }
    })
}

/// Square: 0 for the first half cycle, 1 for the second.
pub fn square() -> Pattern<f64> {
    signal(|t| if t.rem_euclid(1.0) < 0.5 { 0.0 } else { 1.0 })
}

/// The indices `0..n` as one cycle of equal steps; the usual feed for
/// selectors and `bite`.
pub fn run(n: usize) -> Pattern<f64> {
    Pattern::fastcat((0..n).map(|i| Pattern::pure(i as f64)).collect())
}

impl Pattern<f64> {
    /// Linearly remap from `[0, 1]` to `[lo, hi]`.
    pub fn range(self, lo: f64, hi: f64) -> Self {
        self.fmap(move |v| v * (hi - lo) + lo)
    }
}
