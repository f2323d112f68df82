//! Selector combinators: resolve a lookup (indexed list or string-keyed
//! map) through a selector pattern, then flatten with the join flavor the
//! operator prescribes.

use crate::pattern::Pattern;
use crate::voice::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Round half to even: `0.2 -> 0`, `1.5 -> 2`, `2.8 -> 3`, `2.5 -> 2`.
pub(crate) fn round_half_even(v: f64) -> i64 {
    let floor = v.floor();
    let diff = v - floor;
    if (diff - 0.5).abs() < f64::EPSILON {
        let f = floor as i64;
        if f % 2 == 0 {
            f
        } else {
            f + 1
        }
    } else {
        v.round() as i64
    }
}

/// What a selector indexes into: a positional list or a keyed map of
/// patterns.
#[derive(Clone)]
pub enum Lookup<T: Clone + Send + Sync> {
    List(Vec<Pattern<T>>),
    Map(HashMap<String, Pattern<T>>),
}

impl<T: Clone + Send + Sync + 'static> Lookup<T> {
    /// Resolve one selector value. Out-of-range list indices clamp or wrap
    /// according to `wrap`; unknown map keys resolve to silence.
    fn resolve(&self, selector: &Value, wrap: bool) -> Pattern<T> {
        match self {
            Lookup::List(items) => {
                if items.is_empty() {
                    return Pattern::silence();
                }
                let n = items.len() as i64;
                match selector.as_num() {
                    Some(num) => {
                        let idx = round_half_even(num);
                        let idx = if wrap {
                            idx.rem_euclid(n)
                        } else {
                            idx.clamp(0, n - 1)
                        };
                        items[idx as usize].clone()
                    }
                    None => {
                        debug!(selector = %selector, "non-numeric selector for list lookup");
                        Pattern::silence()
                    }
                }
            }
            Lookup::Map(map) => {
                let key = selector.to_string();
                match map.get(&key) {
                    Some(pattern) => pattern.clone(),
                    None => {
                        debug!(key = %key, "unknown key in map lookup");
                        Pattern::silence()
                    }
                }
            }
        }
    }
}

impl<T: Clone + Send + Sync> From<Vec<Pattern<T>>> for Lookup<T> {
    fn from(items: Vec<Pattern<T>>) -> Self {
        Lookup::List(items)
    }
}

impl<T: Clone + Send + Sync> From<HashMap<String, Pattern<T>>> for Lookup<T> {
    fn from(map: HashMap<String, Pattern<T>>) -> Self {
        Lookup::Map(map)
    }
}

impl<T: Clone + Send + Sync> From<Vec<(&str, Pattern<T>)>> for Lookup<T> {
    fn from(pairs: Vec<(&str, Pattern<T>)>) -> Self {
        Lookup::Map(
            pairs
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect(),
        )
    }
}

/// Anything usable as a selector pattern.
pub trait IntoSelector {
    fn into_selector(self) -> Pattern<Value>;
}

impl IntoSelector for Pattern<Value> {
    fn into_selector(self) -> Pattern<Value> {
        self
    }
}

impl IntoSelector for Pattern<f64> {
    fn into_selector(self) -> Pattern<Value> {
        self.fmap(Value::from)
    }
}

impl IntoSelector for Pattern<String> {
    fn into_selector(self) -> Pattern<Value> {
        self.fmap(Value::from)
    }
}

enum JoinKind {
    Inner,
    Outer,
    Reset,
    Squeeze,
}

fn select_with<T: Clone + Send + Sync + 'static>(
    lookup: Lookup<T>,
    selector: Pattern<Value>,
    wrap: bool,
    join: JoinKind,
) -> Pattern<T> {
    let chosen = selector.fmap(move |v| lookup.resolve(&v, wrap));
    match join {
        JoinKind::Inner => chosen.inner_join(),
        JoinKind::Outer => chosen.outer_join(),
        JoinKind::Reset => chosen.reset_join(),
        JoinKind::Squeeze => chosen.squeeze_join(),
    }
}

/// Select with clamped indices; the chosen pattern keeps its own timing.
pub fn pick<T: Clone + Send + Sync + 'static>(
    lookup: impl Into<Lookup<T>>,
    selector: impl IntoSelector,
) -> Pattern<T> {
    select_with(lookup.into(), selector.into_selector(), false, JoinKind::Inner)
}

/// Select with positive-modulo indices; inner timing.
pub fn pickmod<T: Clone + Send + Sync + 'static>(
    lookup: impl Into<Lookup<T>>,
    selector: impl IntoSelector,
) -> Pattern<T> {
    select_with(lookup.into(), selector.into_selector(), true, JoinKind::Inner)
}

/// Clamped select with the selector's structure: chosen events are clipped
/// to the selector event's span.
pub fn pick_out<T: Clone + Send + Sync + 'static>(
    lookup: impl Into<Lookup<T>>,
    selector: impl IntoSelector,
) -> Pattern<T> {
    select_with(lookup.into(), selector.into_selector(), false, JoinKind::Outer)
}

pub fn pickmod_out<T: Clone + Send + Sync + 'static>(
    lookup: impl Into<Lookup<T>>,
    selector: impl IntoSelector,
) -> Pattern<T> {
    select_with(lookup.into(), selector.into_selector(), true, JoinKind::Outer)
}

/// Clamped select restarting the chosen pattern's phase at each selector
/// onset.
pub fn pick_reset<T: Clone + Send + Sync + 'static>(
    lookup: impl Into<Lookup<T>>,
    selector: impl IntoSelector,
) -> Pattern<T> {
    select_with(lookup.into(), selector.into_selector(), false, JoinKind::Reset)
}

pub fn pickmod_reset<T: Clone + Send + Sync + 'static>(
    lookup: impl Into<Lookup<T>>,
    selector: impl IntoSelector,
) -> Pattern<T> {
    select_with(lookup.into(), selector.into_selector(), true, JoinKind::Reset)
}

/// Squeeze the chosen pattern's cycle into each selector event.
pub fn inhabit<T: Clone + Send + Sync + 'static>(
    lookup: impl Into<Lookup<T>>,
    selector: impl IntoSelector,
) -> Pattern<T> {
    select_with(lookup.into(), selector.into_selector(), true, JoinKind::Squeeze)
}

/// Alias for `inhabit`.
pub fn pick_squeeze<T: Clone + Send + Sync + 'static>(
    lookup: impl Into<Lookup<T>>,
    selector: impl IntoSelector,
) -> Pattern<T> {
    inhabit(lookup, selector)
}

/// Pick a pattern transformation per selector event and apply it to the
/// given pattern; indices clamp.
pub fn pick_f<T: Clone + Send + Sync + 'static>(
    selector: Pattern<f64>,
    pattern: Pattern<T>,
    funcs: Vec<Arc<dyn Fn(Pattern<T>) -> Pattern<T> + Send + Sync>>,
) -> Pattern<T> {
    pick_f_impl(selector, pattern, funcs, false)
}

/// `pick_f` with positive-modulo indices.
pub fn pickmod_f<T: Clone + Send + Sync + 'static>(
    selector: Pattern<f64>,
    pattern: Pattern<T>,
    funcs: Vec<Arc<dyn Fn(Pattern<T>) -> Pattern<T> + Send + Sync>>,
) -> Pattern<T> {
    pick_f_impl(selector, pattern, funcs, true)
}

fn pick_f_impl<T: Clone + Send + Sync + 'static>(
    selector: Pattern<f64>,
    pattern: Pattern<T>,
    funcs: Vec<Arc<dyn Fn(Pattern<T>) -> Pattern<T> + Send + Sync>>,
    wrap: bool,
) -> Pattern<T> {
    if funcs.is_empty() {
        return Pattern::silence();
    }
    let n = funcs.len() as i64;
    selector
        .fmap(move |v| {
            let idx = round_half_even(v);
            let idx = if wrap {
                idx.rem_euclid(n)
            } else {
                idx.clamp(0, n - 1)
            };
            funcs[idx as usize](pattern.clone())
        })
        .inner_join()
}

/// Map selector values in `[-1, 1]` to a choice of two patterns: at or
/// below zero picks the first.
pub fn choose2<T: Clone + Send + Sync + 'static>(
    selector: Pattern<f64>,
    first: Pattern<T>,
    second: Pattern<T>,
) -> Pattern<T> {
    selector
        .fmap(move |v| {
            if v <= 0.0 {
                first.clone()
            } else {
                second.clone()
            }
        })
        .inner_join()
}
