//! Control-parameter helpers: constructors that lift plain values into
//! voice-data patterns, and fluent methods that merge parameter patterns
//! into an existing voice pattern.
//!
//! Merging uses intersection structure on both sides, so
//! `s("bd").delay_time("0.125 0.25")` yields two half-cycle events.

use crate::pattern::Pattern;
use crate::voice::{FilterDef, FilterKind, Value, VoiceData};

const DEFAULT_FILTER_Q: f64 = 1.0;

/// Anything usable as a token pattern: a literal token string or a
/// ready-made pattern.
pub trait IntoStringPattern {
    fn into_string_pattern(self) -> Pattern<String>;
}

impl IntoStringPattern for &str {
    fn into_string_pattern(self) -> Pattern<String> {
        Pattern::from_string(self)
    }
}

impl IntoStringPattern for Pattern<String> {
    fn into_string_pattern(self) -> Pattern<String> {
        self
    }
}

/// Anything usable as a numeric control: a literal, a numeric pattern, or
/// a token string of numbers.
pub trait IntoNumPattern {
    fn into_num_pattern(self) -> Pattern<f64>;
}

impl IntoNumPattern for f64 {
    fn into_num_pattern(self) -> Pattern<f64> {
        Pattern::pure(self)
    }
}

impl IntoNumPattern for Pattern<f64> {
    fn into_num_pattern(self) -> Pattern<f64> {
        self
    }
}

impl IntoNumPattern for &str {
    fn into_num_pattern(self) -> Pattern<f64> {
        Pattern::from_string(self)
            .fmap(|tok| tok.parse::<f64>().ok())
            .filter_haps(|hap| hap.value.is_some())
            .fmap(|v| v.unwrap_or(0.0))
    }
}

/// Split `"bd:1"` into name and sample index.
fn parse_sound_token(token: &str) -> (String, Option<i32>) {
    match token.split_once(':') {
        Some((name, index)) => match index.parse::<i32>() {
            Ok(i) => (name.to_string(), Some(i)),
            Err(_) => (token.to_string(), None),
        },
        None => (token.to_string(), None),
    }
}

/// Sound-name pattern; colon notation selects the sample index.
pub fn sound(names: impl IntoStringPattern) -> Pattern<VoiceData> {
    names.into_string_pattern().fmap(|token| {
        let (name, index) = parse_sound_token(&token);
        VoiceData {
            sound: Some(name),
            sound_index: index,
            ..Default::default()
        }
    })
}

/// Short alias for `sound`.
pub fn s(names: impl IntoStringPattern) -> Pattern<VoiceData> {
    sound(names)
}

/// Note pattern; numeric tokens become numbers, the rest stay text.
pub fn note(notes: impl IntoStringPattern) -> Pattern<VoiceData> {
    notes.into_string_pattern().fmap(|token| {
        let value = match token.parse::<f64>() {
            Ok(n) => Value::Num(n),
            Err(_) => Value::Text(token),
        };
        VoiceData {
            note: Some(value),
            ..Default::default()
        }
    })
}

/// Raw value pattern, the operand of the binary operator algebra.
pub fn val(values: impl IntoNumPattern) -> Pattern<VoiceData> {
    values.into_num_pattern().fmap(|v| VoiceData {
        value: Some(Value::Num(v)),
        ..Default::default()
    })
}

macro_rules! numeric_controls {
    ($(($name:ident, $field:ident)),* $(,)?) => {
        $(
            pub fn $name(values: impl IntoNumPattern) -> Pattern<VoiceData> {
                values.into_num_pattern().fmap(|v| VoiceData {
                    $field: Some(v),
                    ..Default::default()
                })
            }
        )*

        impl Pattern<VoiceData> {
            $(
                pub fn $name(self, values: impl IntoNumPattern) -> Pattern<VoiceData> {
                    let ctrl = values.into_num_pattern().fmap(|v| VoiceData {
                        $field: Some(v),
                        ..Default::default()
                    });
                    self.with_ctrl(ctrl)
                }
            )*
        }
    };
}

numeric_controls!(
    (gain, gain),
    (pan, pan),
    (speed, speed),
    (room, room),
    (room_size, room_size),
    (delay, delay),
    (delay_time, delay_time),
    (delay_feedback, delay_feedback),
    (distort, distort),
    (crush, crush),
    (coarse, coarse),
    (density, density),
    (decay, decay),
    (bpdecay, bpdecay),
    (bpattack, bpattack),
    (lpsustain, lpsustain),
    (hpsustain, hpsustain),
    (nfattack, nfattack),
    (nfrelease, nfrelease),
    (p_attack, p_attack),
    (p_decay, p_decay),
    (p_release, p_release),
    (p_env, p_env),
    (p_curve, p_curve),
    (p_anchor, p_anchor),
    (fmh, fmh),
    (fm_attack, fm_attack),
    (fm_decay, fm_decay),
    (fm_sustain, fm_sustain),
    (fm_env, fm_env),
    (freq_spread, freq_spread),
    (begin, begin),
    (end, end),
    (loop_amount, loop_),
    (loop_begin, loop_begin),
    (loop_end, loop_end),
    (tremolo_sync, tremolo_sync),
    (tremolo_depth, tremolo_depth),
    (tremolo_skew, tremolo_skew),
    (tremolo_phase, tremolo_phase),
    (phaser, phaser),
    (phaser_depth, phaser_depth),
    (phaser_center, phaser_center),
    (phaser_sweep, phaser_sweep),
);

fn upsert_filter_cutoff(data: &mut VoiceData, kind: FilterKind, cutoff_hz: f64) {
    match data.filters.iter_mut().find(|f| f.kind == kind) {
        Some(filter) => filter.cutoff_hz = cutoff_hz,
        None => data.filters.push(FilterDef {
            kind,
            cutoff_hz,
            q: data.resonance.unwrap_or(DEFAULT_FILTER_Q),
            envelope: None,
        }),
    }
}

fn set_filter_q(data: &mut VoiceData, kind: FilterKind, q: f64) {
    for filter in data.filters.iter_mut().filter(|f| f.kind == kind) {
        filter.q = q;
    }
}

impl Pattern<VoiceData> {
    /// Merge a control pattern into this one, intersecting structure and
    /// merging payloads right-biased.
    pub fn with_ctrl(self, ctrl: Pattern<VoiceData>) -> Pattern<VoiceData> {
        self.app_both(&ctrl, |a, b| a.merge(b))
    }

    /// Transform the payload of every event.
    pub fn data_transform(
        self,
        f: impl Fn(VoiceData) -> VoiceData + Send + Sync + 'static,
    ) -> Pattern<VoiceData> {
        self.fmap(f)
    }

    /// Set or replace the sound name; an index-less token keeps a
    /// previously parsed sample index.
    pub fn sound(self, names: impl IntoStringPattern) -> Pattern<VoiceData> {
        self.with_ctrl(sound(names))
    }

    pub fn s(self, names: impl IntoStringPattern) -> Pattern<VoiceData> {
        self.sound(names)
    }

    pub fn note(self, notes: impl IntoStringPattern) -> Pattern<VoiceData> {
        self.with_ctrl(note(notes))
    }

    /// Sample index selection.
    pub fn n(self, values: impl IntoNumPattern) -> Pattern<VoiceData> {
        let ctrl = values.into_num_pattern().fmap(|v| VoiceData {
            sound_index: Some(v.round() as i32),
            ..Default::default()
        });
        self.with_ctrl(ctrl)
    }

    /// Output bus selection.
    pub fn orbit(self, values: impl IntoNumPattern) -> Pattern<VoiceData> {
        let ctrl = values.into_num_pattern().fmap(|v| VoiceData {
            orbit: Some(v.round() as i32),
            ..Default::default()
        });
        self.with_ctrl(ctrl)
    }

    pub fn tremolo_shape(self, shapes: impl IntoStringPattern) -> Pattern<VoiceData> {
        let ctrl = shapes.into_string_pattern().fmap(|shape| VoiceData {
            tremolo_shape: Some(shape),
            ..Default::default()
        });
        self.with_ctrl(ctrl)
    }

    // ============= Filter chain controls =============
    //
    // Filter-introducing controls update an existing filter of their class
    // in place, or append a new one picking up the current resonance.

    pub fn cutoff(self, values: impl IntoNumPattern) -> Pattern<VoiceData> {
        self.filter_control(values, FilterKind::LowPass, |data, v| data.cutoff = Some(v))
    }

    pub fn hcutoff(self, values: impl IntoNumPattern) -> Pattern<VoiceData> {
        self.filter_control(values, FilterKind::HighPass, |data, v| data.hcutoff = Some(v))
    }

    pub fn bandf(self, values: impl IntoNumPattern) -> Pattern<VoiceData> {
        self.filter_control(values, FilterKind::BandPass, |data, v| data.bandf = Some(v))
    }

    pub fn notchf(self, values: impl IntoNumPattern) -> Pattern<VoiceData> {
        self.filter_control(values, FilterKind::Notch, |data, v| data.notchf = Some(v))
    }

    fn filter_control(
        self,
        values: impl IntoNumPattern,
        kind: FilterKind,
        set_field: impl Fn(&mut VoiceData, f64) + Send + Sync + 'static,
    ) -> Pattern<VoiceData> {
        self.app_both(&values.into_num_pattern(), move |data, v| {
            let mut out = data.clone();
            set_field(&mut out, *v);
            upsert_filter_cutoff(&mut out, kind, *v);
            out
        })
    }

    /// Resonance updates every filter currently in the chain; filters
    /// added afterwards pick the value up too.
    pub fn resonance(self, values: impl IntoNumPattern) -> Pattern<VoiceData> {
        self.app_both(&values.into_num_pattern(), |data, q| {
            let mut out = data.clone();
            out.resonance = Some(*q);
            for filter in out.filters.iter_mut() {
                filter.q = *q;
            }
            out
        })
    }

    pub fn hresonance(self, values: impl IntoNumPattern) -> Pattern<VoiceData> {
        self.app_both(&values.into_num_pattern(), |data, q| {
            let mut out = data.clone();
            out.hresonance = Some(*q);
            set_filter_q(&mut out, FilterKind::HighPass, *q);
            out
        })
    }

    pub fn bandq(self, values: impl IntoNumPattern) -> Pattern<VoiceData> {
        self.app_both(&values.into_num_pattern(), |data, q| {
            let mut out = data.clone();
            out.bandq = Some(*q);
            set_filter_q(&mut out, FilterKind::BandPass, *q);
            out
        })
    }

    // ============= Playback =============

    /// Speed the pattern up and boost sample playback speed by the same
    /// factor.
    pub fn hurry(self, factor: f64) -> Pattern<VoiceData> {
        self.fast(factor).data_transform(move |mut data| {
            data.speed = Some(data.speed.unwrap_or(1.0) * factor);
            data
        })
    }
}

macro_rules! voice_value_ops {
    ($($name:ident => $func:path),* $(,)?) => {
        impl Pattern<VoiceData> {
            $(
                pub fn $name(self, other: Pattern<VoiceData>) -> Pattern<VoiceData> {
                    self.app_both(&other, |a, b| {
                        let mut out = a.merge(b);
                        out.value = match (&a.value, &b.value) {
                            (Some(x), Some(y)) => Some($func(x, y)),
                            (Some(x), None) => Some(x.clone()),
                            (None, Some(y)) => Some(y.clone()),
                            (None, None) => None,
                        };
                        out
                    })
                }
            )*
        }
    };
}

voice_value_ops!(
    add => crate::voice::value_add,
    sub => crate::voice::value_sub,
    mul => crate::voice::value_mul,
    div => crate::voice::value_div,
    modulo => crate::voice::value_mod,
    pow => crate::voice::value_pow,
    eq => crate::voice::value_eq,
    ne => crate::voice::value_ne,
    lt => crate::voice::value_lt,
    lte => crate::voice::value_lte,
    gt => crate::voice::value_gt,
    gte => crate::voice::value_gte,
    and => crate::voice::value_and,
    or => crate::voice::value_or,
);
