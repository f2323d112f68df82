//! Deterministic pseudo-randomness.
//!
//! There is no RNG cursor anywhere: every draw is a pure hash of
//! `(seed, position, salt)`, so queries are referentially transparent and
//! querying `[a, b)` equals querying `[a, m)` then `[m, b)`.

use crate::pattern::{Fraction, Hap, Pattern};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Per-combinator salts keep independent random streams from correlating.
pub(crate) mod salt {
    pub const SIGNAL: u32 = 0x5EED_0001;
    pub const DEGRADE: u32 = 0x5EED_0002;
    pub const RANDCAT: u32 = 0x5EED_0003;
}

/// Uniform draw in `[0, 1)` as a pure function of position. The same
/// `(seed, time, salt)` triple always returns the same value.
pub fn rand_at(seed: u32, time: Fraction, salt: u32) -> f64 {
    let mixed = (seed as u64)
        .wrapping_mul(2654435761)
        .wrapping_add((time.numerator as u64) ^ (time.denominator as u64).rotate_left(32))
        .wrapping_add((salt as u64).wrapping_mul(0x9E37_79B9));
    StdRng::seed_from_u64(mixed).gen::<f64>()
}

/// Continuous uniform signal in `[0, 1)`.
pub fn rand() -> Pattern<f64> {
    Pattern::new(|state| {
        if state.span.is_empty() {
            Vec::new()
        } else {
            vec![Hap::new(
                None,
                state.span,
                rand_at(state.seed, state.span.begin, salt::SIGNAL),
            )]
        }
    })
}

/// Continuous uniform signal in `[-1, 1)`.
pub fn rand2() -> Pattern<f64> {
    rand().fmap(|v| v * 2.0 - 1.0)
}

/// Continuous coin flip at threshold one half.
pub fn brand() -> Pattern<bool> {
    brand_by(0.5)
}

/// Continuous boolean signal, true with probability `probability`.
pub fn brand_by(probability: f64) -> Pattern<bool> {
    rand().fmap(move |v| v < probability)
}

/// Continuous uniform integers in `[0, n)`, as floats.
pub fn irand(n: usize) -> Pattern<f64> {
    let n = n.max(1) as f64;
    rand().fmap(move |v| (v * n).floor())
}

/// Each cycle plays one of the given patterns, chosen uniformly at random.
pub fn randcat<T: Clone + Send + Sync + 'static>(patterns: Vec<Pattern<T>>) -> Pattern<T> {
    if patterns.is_empty() {
        return Pattern::silence();
    }
    let n = patterns.len();
    Pattern::new(move |state| {
        let draw = rand_at(state.seed, state.span.begin.sam(), salt::RANDCAT);
        let index = ((draw * n as f64).floor() as usize).min(n - 1);
        patterns[index].query(state)
    })
    .split_queries()
}

/// Pick a value per cycle, uniformly at random.
pub fn choose<T: Clone + Send + Sync + 'static>(values: Vec<T>) -> Pattern<T> {
    randcat(values.into_iter().map(Pattern::pure).collect())
}

impl<T: Clone + Send + Sync + 'static> Pattern<T> {
    /// Drop each event with probability `probability`. An event survives
    /// when its positional draw is at or above the threshold.
    pub fn degrade_by(self, probability: f64) -> Self {
        self.wrap(move |pat, state| {
            pat.query(state)
                .into_iter()
                .filter(|hap| {
                    rand_at(state.seed, hap.whole_or_part().begin, salt::DEGRADE) >= probability
                })
                .collect()
        })
    }

    pub fn degrade(self) -> Self {
        self.degrade_by(0.5)
    }

    /// Keep each event with probability `probability`: `undegrade_by(1.0)`
    /// keeps everything, `undegrade_by(0.0)` removes everything. Shares the
    /// degrade stream, so `degrade_by(x)` and `undegrade_by(x)` under one
    /// seed partition the events between them.
    pub fn undegrade_by(self, probability: f64) -> Self {
        self.wrap(move |pat, state| {
            pat.query(state)
                .into_iter()
                .filter(|hap| {
                    rand_at(state.seed, hap.whole_or_part().begin, salt::DEGRADE) < probability
                })
                .collect()
        })
    }

    pub fn undegrade(self) -> Self {
        self.undegrade_by(0.5)
    }

    /// Apply `f` to roughly `probability` of the events, passing the rest
    /// through untouched.
    pub fn sometimes_by(
        self,
        probability: f64,
        f: impl FnOnce(Pattern<T>) -> Pattern<T>,
    ) -> Self {
        let untouched = self.clone().degrade_by(probability);
        let transformed = f(self.undegrade_by(probability));
        Pattern::stack(vec![untouched, transformed])
    }

    pub fn sometimes(self, f: impl FnOnce(Pattern<T>) -> Pattern<T>) -> Self {
        self.sometimes_by(0.5, f)
    }

    pub fn often(self, f: impl FnOnce(Pattern<T>) -> Pattern<T>) -> Self {
        self.sometimes_by(0.75, f)
    }

    pub fn rarely(self, f: impl FnOnce(Pattern<T>) -> Pattern<T>) -> Self {
        self.sometimes_by(0.25, f)
    }

    pub fn almost_always(self, f: impl FnOnce(Pattern<T>) -> Pattern<T>) -> Self {
        self.sometimes_by(0.9, f)
    }

    pub fn almost_never(self, f: impl FnOnce(Pattern<T>) -> Pattern<T>) -> Self {
        self.sometimes_by(0.1, f)
    }

    pub fn always(self, f: impl FnOnce(Pattern<T>) -> Pattern<T>) -> Self {
        self.sometimes_by(1.0, f)
    }

    pub fn never(self, f: impl FnOnce(Pattern<T>) -> Pattern<T>) -> Self {
        self.sometimes_by(0.0, f)
    }
}
