//! Joins flatten a pattern of patterns into a flat pattern, and the
//! applicative helpers lift pointwise functions over two patterns.
//!
//! The five join flavors differ in whose event boundaries drive the output;
//! selector combinators and control patterns are all built on them.

use crate::pattern::{Fraction, Hap, Pattern};
use crate::voice::{
    value_add, value_and, value_div, value_eq, value_gt, value_gte, value_lt, value_lte,
    value_mod, value_mul, value_ne, value_or, value_pow, value_sub, Value,
};

impl<T: Clone + Send + Sync + 'static> Pattern<T> {
    /// Structure from `self`: for each of our events, sample `other` over
    /// the event's whole and keep our whole, intersecting parts.
    pub fn app_left<U: Clone + Send + Sync + 'static, R: Clone + Send + Sync + 'static>(
        &self,
        other: &Pattern<U>,
        f: impl Fn(&T, &U) -> R + Send + Sync + 'static,
    ) -> Pattern<R> {
        let left = self.clone();
        let right = other.clone();
        Pattern::new(move |state| {
            left.query(state)
                .into_iter()
                .flat_map(|lhap| {
                    let sample = state.with_span(lhap.whole_or_part());
                    right
                        .query(&sample)
                        .into_iter()
                        .filter_map(|rhap| {
                            let part = lhap.part.sect(&rhap.part)?;
                            Some(Hap::new(lhap.whole, part, f(&lhap.value, &rhap.value)))
                        })
                        .collect::<Vec<_>>()
                })
                .collect()
        })
    }

    /// Structure from both sides: events are the pairwise intersections.
    pub fn app_both<U: Clone + Send + Sync + 'static, R: Clone + Send + Sync + 'static>(
        &self,
        other: &Pattern<U>,
        f: impl Fn(&T, &U) -> R + Send + Sync + 'static,
    ) -> Pattern<R> {
        let left = self.clone();
        let right = other.clone();
        Pattern::new(move |state| {
            left.query(state)
                .into_iter()
                .flat_map(|lhap| {
                    right
                        .query(&state.with_span(lhap.part))
                        .into_iter()
                        .filter_map(|rhap| {
                            let part = lhap.part.sect(&rhap.part)?;
                            let whole = match (lhap.whole, rhap.whole) {
                                (Some(a), Some(b)) => a.sect(&b),
                                _ => None,
                            };
                            Some(Hap::new(whole, part, f(&lhap.value, &rhap.value)))
                        })
                        .collect::<Vec<_>>()
                })
                .collect()
        })
    }
}

impl<T: Clone + Send + Sync + 'static> Pattern<Pattern<T>> {
    /// Timing from the inner patterns: each outer event opens a window and
    /// the inner events inside it come through unchanged.
    pub fn inner_join(self) -> Pattern<T> {
        Pattern::new(move |state| {
            self.query(state)
                .into_iter()
                .flat_map(|outer| outer.value.query(&state.with_span(outer.part)))
                .collect()
        })
    }

    /// Timing from the outer pattern: inner events are clipped to the outer
    /// event's span and adopt its whole. A single-event inner degenerates
    /// to sampling the inner value at the outer onset.
    pub fn outer_join(self) -> Pattern<T> {
        Pattern::new(move |state| {
            self.query(state)
                .into_iter()
                .flat_map(|outer| {
                    let sample = state.with_span(outer.whole_or_part());
                    outer
                        .value
                        .query(&sample)
                        .into_iter()
                        .filter_map(|inner| {
                            let part = inner.part.sect(&outer.part)?;
                            Some(Hap::new(outer.whole, part, inner.value))
                        })
                        .collect::<Vec<_>>()
                })
                .collect()
        })
    }

    /// Pointwise intersection of outer and inner structure.
    pub fn mix_join(self) -> Pattern<T> {
        Pattern::new(move |state| {
            self.query(state)
                .into_iter()
                .flat_map(|outer| {
                    outer
                        .value
                        .query(&state.with_span(outer.part))
                        .into_iter()
                        .filter_map(|inner| {
                            let part = inner.part.sect(&outer.part)?;
                            let whole = match (outer.whole, inner.whole) {
                                (Some(a), Some(b)) => a.sect(&b),
                                _ => None,
                            };
                            Some(Hap::new(whole, part, inner.value))
                        })
                        .collect::<Vec<_>>()
                })
                .collect()
        })
    }

    /// The inner pattern's time origin is moved to each outer event's
    /// onset, so its phase restarts there.
    pub fn reset_join(self) -> Pattern<T> {
        Pattern::new(move |state| {
            self.query(state)
                .into_iter()
                .flat_map(|outer| {
                    let onset = outer.whole_or_part().begin;
                    outer
                        .value
                        .clone()
                        .late_frac(onset)
                        .query(&state.with_span(outer.part))
                })
                .collect()
        })
    }

    /// The inner pattern's unit cycle is squeezed onto each outer event's
    /// whole.
    pub fn squeeze_join(self) -> Pattern<T> {
        Pattern::new(move |state| {
            self.query(state)
                .into_iter()
                .flat_map(|outer| {
                    let target = outer.whole_or_part();
                    let duration = target.duration();
                    if duration <= Fraction::zero() {
                        return Vec::new();
                    }
                    outer
                        .value
                        .clone()
                        .fast_frac(Fraction::one() / duration)
                        .late_frac(target.begin)
                        .query(&state.with_span(outer.part))
                })
                .collect()
        })
    }
}

// ============= Binary operator algebra =============

macro_rules! value_ops {
    ($($name:ident => $func:path),* $(,)?) => {
        impl Pattern<Value> {
            $(
                pub fn $name(self, other: Pattern<Value>) -> Pattern<Value> {
                    self.app_both(&other, |a, b| $func(a, b))
                }
            )*
        }
    };
}

value_ops!(
    add => value_add,
    sub => value_sub,
    mul => value_mul,
    div => value_div,
    modulo => value_mod,
    pow => value_pow,
    eq => value_eq,
    ne => value_ne,
    lt => value_lt,
    lte => value_lte,
    gt => value_gt,
    gte => value_gte,
    and => value_and,
    or => value_or,
);

impl Pattern<f64> {
    pub fn add(self, other: Pattern<f64>) -> Pattern<f64> {
        self.app_both(&other, |a, b| a + b)
    }

    pub fn sub(self, other: Pattern<f64>) -> Pattern<f64> {
        self.app_both(&other, |a, b| a - b)
    }

    pub fn mul(self, other: Pattern<f64>) -> Pattern<f64> {
        self.app_both(&other, |a, b| a * b)
    }

    pub fn div(self, other: Pattern<f64>) -> Pattern<f64> {
        self.app_both(&other, |a, b| if *b != 0.0 { a / b } else { *a })
    }
}
