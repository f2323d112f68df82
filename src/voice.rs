//! Voice data: the payload record events carry out of the engine.
//!
//! Every field is optional; combinators fill in what they know and the
//! right-biased `merge` resolves overlaps. The engine never interprets the
//! record musically beyond the merge rules here.

use serde::{Deserialize, Serialize};

/// A dynamically typed pattern value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Text(String),
    Num(f64),
    Bool(bool),
}

impl Value {
    /// Numeric view, promoting digit strings.
    pub fn as_num(&self) -> Option<f64> {
        match self {
            Value::Num(n) => Some(*n),
            Value::Text(s) => s.trim().parse::<f64>().ok(),
            Value::Bool(_) => None,
        }
    }

    /// JS-style truthiness: non-zero number or non-empty string.
    pub fn truthy(&self) -> bool {
        match self {
            Value::Num(n) => *n != 0.0,
            Value::Text(s) => !s.is_empty(),
            Value::Bool(b) => *b,
        }
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Num(n)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Num(n as f64)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Text(s) => write!(f, "{s}"),
            Value::Num(n) => write!(f, "{n}"),
            Value::Bool(b) => write!(f, "{b}"),
        }
    }
}

// Pointwise value operators used by the binary operator algebra. Non-numeric
// operands make arithmetic a per-event no-op that returns the left value.

fn num_op(a: &Value, b: &Value, f: impl Fn(f64, f64) -> f64) -> Value {
    match (a.as_num(), b.as_num()) {
        (Some(x), Some(y)) => Value::Num(f(x, y)),
        _ => a.clone(),
    }
}

fn cmp_op(a: &Value, b: &Value, f: impl Fn(f64, f64) -> bool) -> Value {
    match (a.as_num(), b.as_num()) {
        (Some(x), Some(y)) => Value::Bool(f(x, y)),
        _ => a.clone(),
    }
}

pub fn value_add(a: &Value, b: &Value) -> Value {
    num_op(a, b, |x, y| x + y)
}

pub fn value_sub(a: &Value, b: &Value) -> Value {
    num_op(a, b, |x, y| x - y)
}

pub fn value_mul(a: &Value, b: &Value) -> Value {
    num_op(a, b, |x, y| x * y)
}

pub fn value_div(a: &Value, b: &Value) -> Value {
    match (a.as_num(), b.as_num()) {
        (Some(x), Some(y)) if y != 0.0 => Value::Num(x / y),
        _ => a.clone(),
    }
}

pub fn value_mod(a: &Value, b: &Value) -> Value {
    match (a.as_num(), b.as_num()) {
        (Some(x), Some(y)) if y != 0.0 => Value::Num(x.rem_euclid(y)),
        _ => a.clone(),
    }
}

pub fn value_pow(a: &Value, b: &Value) -> Value {
    num_op(a, b, f64::powf)
}

pub fn value_eq(a: &Value, b: &Value) -> Value {
    match (a.as_num(), b.as_num()) {
        (Some(x), Some(y)) => Value::Bool(x == y),
        _ => Value::Bool(a == b),
    }
}

pub fn value_ne(a: &Value, b: &Value) -> Value {
    match value_eq(a, b) {
        Value::Bool(b) => Value::Bool(!b),
        v => v,
    }
}

pub fn value_lt(a: &Value, b: &Value) -> Value {
    cmp_op(a, b, |x, y| x < y)
}

pub fn value_lte(a: &Value, b: &Value) -> Value {
    cmp_op(a, b, |x, y| x <= y)
}

pub fn value_gt(a: &Value, b: &Value) -> Value {
    cmp_op(a, b, |x, y| x > y)
}

pub fn value_gte(a: &Value, b: &Value) -> Value {
    cmp_op(a, b, |x, y| x >= y)
}

/// Right operand if the left is truthy, mirroring JS `&&`.
pub fn value_and(a: &Value, b: &Value) -> Value {
    if a.truthy() {
        b.clone()
    } else {
        a.clone()
    }
}

/// Left operand if truthy, otherwise the right, mirroring JS `||`.
pub fn value_or(a: &Value, b: &Value) -> Value {
    if a.truthy() {
        a.clone()
    } else {
        b.clone()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FilterKind {
    LowPass,
    HighPass,
    BandPass,
    Notch,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterEnvelope {
    pub attack: f64,
    pub decay: f64,
    pub sustain: f64,
    pub release: f64,
}

/// One entry of the ordered filter chain; index 0 is the first filter added.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterDef {
    pub kind: FilterKind,
    pub cutoff_hz: f64,
    pub q: f64,
    pub envelope: Option<FilterEnvelope>,
}

/// The event payload. Unset fields are `None`; consumers treat the record
/// as a sparse parameter update.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VoiceData {
    pub sound: Option<String>,
    pub sound_index: Option<i32>,
    pub note: Option<Value>,
    pub value: Option<Value>,
    pub gain: Option<f64>,
    pub pan: Option<f64>,
    pub speed: Option<f64>,
    pub cutoff: Option<f64>,
    pub resonance: Option<f64>,
    pub hcutoff: Option<f64>,
    pub hresonance: Option<f64>,
    pub bandf: Option<f64>,
    pub bandq: Option<f64>,
    pub notchf: Option<f64>,
    pub room: Option<f64>,
    pub room_size: Option<f64>,
    pub delay: Option<f64>,
    pub delay_time: Option<f64>,
    pub delay_feedback: Option<f64>,
    pub distort: Option<f64>,
    pub crush: Option<f64>,
    pub coarse: Option<f64>,
    pub orbit: Option<i32>,
    pub density: Option<f64>,
    pub decay: Option<f64>,
    pub bpdecay: Option<f64>,
    pub bpattack: Option<f64>,
    pub lpsustain: Option<f64>,
    pub hpsustain: Option<f64>,
    pub nfattack: Option<f64>,
    pub nfrelease: Option<f64>,
    pub p_attack: Option<f64>,
    pub p_decay: Option<f64>,
    pub p_release: Option<f64>,
    pub p_env: Option<f64>,
    pub p_curve: Option<f64>,
    pub p_anchor: Option<f64>,
    pub fmh: Option<f64>,
    pub fm_attack: Option<f64>,
    pub fm_decay: Option<f64>,
    pub fm_sustain: Option<f64>,
    pub fm_env: Option<f64>,
    pub freq_spread: Option<f64>,
    pub chord: Option<String>,
    pub begin: Option<f64>,
    pub end: Option<f64>,
    #[serde(rename = "loop")]
    pub loop_: Option<f64>,
    pub loop_begin: Option<f64>,
    pub loop_end: Option<f64>,
    pub tremolo_sync: Option<f64>,
    pub tremolo_depth: Option<f64>,
    pub tremolo_skew: Option<f64>,
    pub tremolo_phase: Option<f64>,
    pub tremolo_shape: Option<String>,
    pub phaser: Option<f64>,
    pub phaser_depth: Option<f64>,
    pub phaser_center: Option<f64>,
    pub phaser_sweep: Option<f64>,
    pub filters: Vec<FilterDef>,
    pub scale: Option<String>,
}

impl VoiceData {
    /// Right-biased merge: the later record's fields win where present,
    /// earlier values survive everywhere else. Filters merge by class:
    /// a later filter of a class already in the chain updates it in place,
    /// a new class is appended, preserving insertion order.
    pub fn merge(&self, later: &VoiceData) -> VoiceData {
        let mut out = later.clone();
        macro_rules! keep_earlier {
            ($($field:ident),* $(,)?) => {
                $( if out.$field.is_none() { out.$field = self.$field.clone(); } )*
            };
        }
        keep_earlier!(
            sound,
            sound_index,
            note,
            value,
            gain,
            pan,
            speed,
            cutoff,
            resonance,
            hcutoff,
            hresonance,
            bandf,
            bandq,
            notchf,
            room,
            room_size,
            delay,
            delay_time,
            delay_feedback,
            distort,
            crush,
            coarse,
            orbit,
            density,
            decay,
            bpdecay,
            bpattack,
            lpsustain,
            hpsustain,
            nfattack,
            nfrelease,
            p_attack,
            p_decay,
            p_release,
            p_env,
            p_curve,
            p_anchor,
            fmh,
            fm_attack,
            fm_decay,
            fm_sustain,
            fm_env,
            freq_spread,
            chord,
            begin,
            end,
            loop_,
            loop_begin,
            loop_end,
            tremolo_sync,
            tremolo_depth,
            tremolo_skew,
            tremolo_phase,
            tremolo_shape,
            phaser,
            phaser_depth,
            phaser_center,
            phaser_sweep,
            scale,
        );
        out.filters = merge_filters(&self.filters, &later.filters);
        out
    }

    /// Update or append a filter of the given class, keeping chain order.
    pub fn upsert_filter(&mut self, filter: FilterDef) {
        match self.filters.iter_mut().find(|f| f.kind == filter.kind) {
            Some(existing) => *existing = filter,
            None => self.filters.push(filter),
        }
    }
}

fn merge_filters(earlier: &[FilterDef], later: &[FilterDef]) -> Vec<FilterDef> {
    let mut out = earlier.to_vec();
    for filter in later {
        match out.iter_mut().find(|f| f.kind == filter.kind) {
            // The latest cutoff and q update the existing filter of that
            // class; its envelope stays.
            Some(existing) => {
                existing.cutoff_hz = filter.cutoff_hz;
                existing.q = filter.q;
            }
            None => out.push(filter.clone()),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_numeric_promotion() {
        assert_eq!(Value::from("12").as_num(), Some(12.0));
        assert_eq!(Value::from("bd").as_num(), None);
        assert_eq!(Value::Num(3.5).as_num(), Some(3.5));
    }

    #[test]
    fn test_value_truthiness() {
        assert!(Value::Num(1.0).truthy());
        assert!(!Value::Num(0.0).truthy());
        assert!(Value::from("x").truthy());
        assert!(!Value::from("").truthy());
    }

    #[test]
    fn test_arithmetic_no_op_on_text() {
        let a = Value::from("bd");
        let b = Value::Num(2.0);
        assert_eq!(value_add(&a, &b), a);
        assert_eq!(value_add(&Value::Num(1.0), &Value::Num(2.0)), Value::Num(3.0));
    }

    #[test]
    fn test_and_or_mirror_js() {
        let one = Value::Num(1.0);
        let zero = Value::Num(0.0);
        let two = Value::Num(2.0);
        assert_eq!(value_and(&one, &two), two);
        assert_eq!(value_and(&zero, &two), zero);
        assert_eq!(value_or(&one, &two), one);
        assert_eq!(value_or(&zero, &two), two);
    }

    #[test]
    fn test_merge_right_bias() {
        let mut a = VoiceData::default();
        a.sound = Some("bd".into());
        a.gain = Some(0.8);
        let mut b = VoiceData::default();
        b.gain = Some(1.0);
        b.pan = Some(0.5);
        let merged = a.merge(&b);
        assert_eq!(merged.sound.as_deref(), Some("bd"));
        assert_eq!(merged.gain, Some(1.0));
        assert_eq!(merged.pan, Some(0.5));
    }

    #[test]
    fn test_merge_filters_updates_class_in_place() {
        let envelope = FilterEnvelope {
            attack: 0.01,
            decay: 0.2,
            sustain: 0.5,
            release: 0.3,
        };
        let lp = FilterDef {
            kind: FilterKind::LowPass,
            cutoff_hz: 800.0,
            q: 1.0,
            envelope: Some(envelope),
        };
        let hp = FilterDef {
            kind: FilterKind::HighPass,
            cutoff_hz: 200.0,
            q: 1.0,
            envelope: None,
        };
        let mut a = VoiceData::default();
        a.filters = vec![lp.clone()];
        let mut b = VoiceData::default();
        b.filters = vec![
            FilterDef {
                cutoff_hz: 400.0,
                q: 3.0,
                envelope: None,
                ..lp.clone()
            },
            hp.clone(),
        ];
        let merged = a.merge(&b);
        assert_eq!(merged.filters.len(), 2);
        assert_eq!(merged.filters[0].kind, FilterKind::LowPass);
        assert_eq!(merged.filters[0].cutoff_hz, 400.0);
        assert_eq!(merged.filters[0].q, 3.0);
        // Only cutoff and q update in place; the earlier envelope stays.
        assert_eq!(merged.filters[0].envelope, Some(envelope));
        assert_eq!(merged.filters[1].kind, FilterKind::HighPass);
    }

    #[test]
    fn test_upsert_filter_replaces_class_keeps_order() {
        let lp = FilterDef {
            kind: FilterKind::LowPass,
            cutoff_hz: 800.0,
            q: 1.0,
            envelope: None,
        };
        let hp = FilterDef {
            kind: FilterKind::HighPass,
            cutoff_hz: 200.0,
            q: 1.0,
            envelope: None,
        };
        let mut data = VoiceData::default();
        data.upsert_filter(lp.clone());
        data.upsert_filter(hp.clone());
        assert_eq!(data.filters.len(), 2);
        data.upsert_filter(FilterDef {
            cutoff_hz: 400.0,
            q: 2.0,
            ..lp
        });
        assert_eq!(data.filters.len(), 2);
        assert_eq!(data.filters[0].kind, FilterKind::LowPass);
        assert_eq!(data.filters[0].cutoff_hz, 400.0);
        assert_eq!(data.filters[0].q, 2.0);
        assert_eq!(data.filters[1].kind, FilterKind::HighPass);
    }

    #[test]
    fn test_voice_data_serialises_camel_case() {
        let mut data = VoiceData::default();
        data.delay_time = Some(0.125);
        data.sound_index = Some(1);
        let json = serde_json::to_string(&data).unwrap();
        assert!(json.contains("\"delayTime\":0.125"));
        assert!(json.contains("\"soundIndex\":1"));
    }
}
