//! Core pattern representation: rational time, events and the query algebra.
//!
//! A pattern is a pure function from a half-open time interval to a finite
//! list of events. Everything else in the crate is built by wrapping and
//! composing these query functions.

use std::sync::Arc;

/// Exact rational time value. All event boundaries and time-axis arithmetic
/// go through this type; floats are converted once at the API boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fraction {
    pub numerator: i64,
    pub denominator: i64,
}

fn gcd(a: i128, b: i128) -> i128 {
    if b == 0 {
        a.abs()
    } else {
        gcd(b, a % b)
    }
}

/// Canonicalise a rational built from wide intermediates.
fn make(n: i128, d: i128) -> Fraction {
    debug_assert!(d != 0, "fraction with zero denominator");
    let g = gcd(n, d);
    let (n, d) = if g == 0 { (0, 1) } else { (n / g, d / g) };
    let sign = d.signum();
    Fraction {
        numerator: (n * sign) as i64,
        denominator: (d * sign) as i64,
    }
}

impl Fraction {
    pub fn new(numerator: i64, denominator: i64) -> Self {
        make(numerator as i128, denominator as i128)
    }

    pub fn from_integer(n: i64) -> Self {
        Self {
            numerator: n,
            denominator: 1,
        }
    }

    pub fn zero() -> Self {
        Self::from_integer(0)
    }

    pub fn one() -> Self {
        Self::from_integer(1)
    }

    /// Convert a float to the nearest small exact fraction using a bounded
    /// continued-fraction expansion, so that API inputs like `1.0 / 3.0`
    /// land on `1/3` rather than a truncated decimal.
    pub fn from_float(f: f64) -> Self {
        const MAX_DENOMINATOR: i64 = 1_000_000;
        if !f.is_finite() {
            return Self::zero();
        }
        let negative = f < 0.0;
        let mut x = f.abs();
        let (mut h0, mut h1) = (0i64, 1i64);
        let (mut k0, mut k1) = (1i64, 0i64);
        for _ in 0..64 {
            let a = x.floor();
            if a > i64::MAX as f64 {
                break;
            }
            let a_int = a as i64;
            let h2 = match a_int.checked_mul(h1).and_then(|v| v.checked_add(h0)) {
                Some(v) => v,
                None => break,
            };
            let k2 = match a_int.checked_mul(k1).and_then(|v| v.checked_add(k0)) {
                Some(v) => v,
                None => break,
            };
            if k2 > MAX_DENOMINATOR {
                break;
            }
            h0 = h1;
            h1 = h2;
            k0 = k1;
            k1 = k2;
            let frac = x - a;
            if frac < 1e-12 {
                break;
            }
            x = 1.0 / frac;
        }
        if k1 == 0 {
            return Self::zero();
        }
        make(if negative { -(h1 as i128) } else { h1 as i128 }, k1 as i128)
    }

    pub fn to_float(&self) -> f64 {
        self.numerator as f64 / self.denominator as f64
    }

    pub fn is_zero(&self) -> bool {
        self.numerator == 0
    }

    /// Largest integer not greater than the fraction.
    pub fn floor(&self) -> i64 {
        self.numerator.div_euclid(self.denominator)
    }

    pub fn ceil(&self) -> i64 {
        -((-*self).floor())
    }

    /// Start of the cycle containing this time.
    pub fn sam(&self) -> Fraction {
        Fraction::from_integer(self.floor())
    }

    pub fn next_sam(&self) -> Fraction {
        self.sam() + Fraction::one()
    }

    /// Position within the containing cycle, in `[0, 1)`.
    pub fn cycle_pos(&self) -> Fraction {
        *self - self.sam()
    }

    pub fn abs(&self) -> Fraction {
        Fraction {
            numerator: self.numerator.abs(),
            denominator: self.denominator,
        }
    }

    pub fn min(self, other: Self) -> Self {
        if self <= other {
            self
        } else {
            other
        }
    }

    pub fn max(self, other: Self) -> Self {
        if self >= other {
            self
        } else {
            other
        }
    }

    /// Euclidean remainder; the result has the sign of `modulus`.
    pub fn mod_frac(self, modulus: Fraction) -> Fraction {
        let q = Fraction::from_integer((self / modulus).floor());
        self - modulus * q
    }
}

impl std::ops::Add for Fraction {
    type Output = Self;
    fn add(self, other: Self) -> Self {
        make(
            self.numerator as i128 * other.denominator as i128
                + other.numerator as i128 * self.denominator as i128,
            self.denominator as i128 * other.denominator as i128,
        )
    }
}

impl std::ops::Sub for Fraction {
    type Output = Self;
    fn sub(self, other: Self) -> Self {
        make(
            self.numerator as i128 * other.denominator as i128
                - other.numerator as i128 * self.denominator as i128,
            self.denominator as i128 * other.denominator as i128,
        )
    }
}

impl std::ops::Mul for Fraction {
    type Output = Self;
    fn mul(self, other: Self) -> Self {
        make(
            self.numerator as i128 * other.numerator as i128,
            self.denominator as i128 * other.denominator as i128,
        )
    }
}

impl std::ops::Div for Fraction {
    type Output = Self;
    fn div(self, other: Self) -> Self {
        make(
            self.numerator as i128 * other.denominator as i128,
            self.denominator as i128 * other.numerator as i128,
        )
    }
}

impl std::ops::Neg for Fraction {
    type Output = Self;
    fn neg(self) -> Self {
        Fraction {
            numerator: -self.numerator,
            denominator: self.denominator,
        }
    }
}

impl std::cmp::PartialOrd for Fraction {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl std::cmp::Ord for Fraction {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        let lhs = self.numerator as i128 * other.denominator as i128;
        let rhs = other.numerator as i128 * self.denominator as i128;
        lhs.cmp(&rhs)
    }
}

impl std::fmt::Display for Fraction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.denominator == 1 {
            write!(f, "{}", self.numerator)
        } else {
            write!(f, "{}/{}", self.numerator, self.denominator)
        }
    }
}

/// Half-open time interval `[begin, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeSpan {
    pub begin: Fraction,
    pub end: Fraction,
}

impl TimeSpan {
    pub fn new(begin: Fraction, end: Fraction) -> Self {
        Self { begin, end }
    }

    pub fn duration(&self) -> Fraction {
        self.end - self.begin
    }

    pub fn is_empty(&self) -> bool {
        self.begin >= self.end
    }

    /// Non-empty intersection with another span, if any.
    pub fn sect(&self, other: &TimeSpan) -> Option<TimeSpan> {
        let begin = self.begin.max(other.begin);
        let end = self.end.min(other.end);
        if begin < end {
            Some(TimeSpan::new(begin, end))
        } else {
            None
        }
    }

    pub fn contains(&self, t: Fraction) -> bool {
        self.begin <= t && t < self.end
    }

    pub fn with_time(&self, f: impl Fn(Fraction) -> Fraction) -> TimeSpan {
        TimeSpan::new(f(self.begin), f(self.end))
    }

    /// Split the span at cycle boundaries. An empty span yields nothing.
    pub fn span_cycles(&self) -> Vec<TimeSpan> {
        let mut spans = Vec::new();
        if self.is_empty() {
            return spans;
        }
        let mut begin = self.begin;
        while begin < self.end {
            let end = begin.next_sam().min(self.end);
            spans.push(TimeSpan::new(begin, end));
            begin = end;
        }
        spans
    }
}

/// A timed event. `part` is the slice visible inside the query arc; `whole`
/// is the event's full extent, `None` for continuous-sampled values.
#[derive(Debug, Clone, PartialEq)]
pub struct Hap<T> {
    pub whole: Option<TimeSpan>,
    pub part: TimeSpan,
    pub value: T,
}

impl<T: Clone> Hap<T> {
    pub fn new(whole: Option<TimeSpan>, part: TimeSpan, value: T) -> Self {
        Self { whole, part, value }
    }

    /// True when this event carries a note attack rather than a clipped
    /// continuation slice.
    pub fn has_onset(&self) -> bool {
        match self.whole {
            Some(w) => w.begin == self.part.begin,
            None => false,
        }
    }

    /// The full extent if known, otherwise the visible part.
    pub fn whole_or_part(&self) -> TimeSpan {
        self.whole.unwrap_or(self.part)
    }

    pub fn with_value<U: Clone>(&self, f: impl FnOnce(&T) -> U) -> Hap<U> {
        Hap {
            whole: self.whole,
            part: self.part,
            value: f(&self.value),
        }
    }

    pub fn with_span(&self, f: impl Fn(TimeSpan) -> TimeSpan) -> Hap<T> {
        Hap {
            whole: self.whole.map(&f),
            part: f(self.part),
            value: self.value.clone(),
        }
    }
}

/// Query input: the arc to query plus the RNG seed threaded through the
/// pattern tree. Patterns hold no mutable state of their own.
#[derive(Debug, Clone, Copy)]
pub struct State {
    pub span: TimeSpan,
    pub seed: u32,
}

impl State {
    pub fn new(span: TimeSpan, seed: u32) -> Self {
        Self { span, seed }
    }

    pub fn with_span(&self, span: TimeSpan) -> State {
        State {
            span,
            seed: self.seed,
        }
    }
}

/// Core pattern type: a shareable query function plus non-temporal metadata.
///
/// `weight` is the proportional space the pattern claims inside `seq`;
/// `steps` is the logical per-cycle step count used by structure-aware
/// operators such as `take` and the chunk family.
pub struct Pattern<T: Clone + Send + Sync> {
    query: Arc<dyn Fn(&State) -> Vec<Hap<T>> + Send + Sync>,
    pub(crate) weight: Fraction,
    pub(crate) steps: Option<Fraction>,
}

impl<T: Clone + Send + Sync> std::fmt::Debug for Pattern<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pattern")
            .field("query", &"<closure>")
            .field("weight", &self.weight)
            .field("steps", &self.steps)
            .finish()
    }
}

impl<T: Clone + Send + Sync> Clone for Pattern<T> {
    fn clone(&self) -> Self {
        Self {
            query: self.query.clone(),
            weight: self.weight,
            steps: self.steps,
        }
    }
}

impl<T: Clone + Send + Sync + 'static> Pattern<T> {
    pub fn new(query: impl Fn(&State) -> Vec<Hap<T>> + Send + Sync + 'static) -> Self {
        Self {
            query: Arc::new(query),
            weight: Fraction::one(),
            steps: None,
        }
    }

    /// Query the pattern for events whose part intersects the state's span.
    pub fn query(&self, state: &State) -> Vec<Hap<T>> {
        (self.query)(state)
    }

    /// Primary entry point: query over `[begin, end)` given as floats,
    /// with the default seed. Events are ordered by part start.
    pub fn query_arc(&self, begin: f64, end: f64) -> Vec<Hap<T>> {
        self.query_arc_seeded(begin, end, 0)
    }

    pub fn query_arc_seeded(&self, begin: f64, end: f64, seed: u32) -> Vec<Hap<T>> {
        let span = TimeSpan::new(Fraction::from_float(begin), Fraction::from_float(end));
        let mut haps = self.query(&State::new(span, seed));
        haps.sort_by(|a, b| {
            a.part
                .begin
                .cmp(&b.part.begin)
                .then(a.part.end.cmp(&b.part.end))
        });
        haps
    }

    /// Fix the RNG seed for this subtree. Inner `seed` calls shadow outer
    /// ones.
    pub fn seed(self, seed: u32) -> Self {
        self.wrap(move |pat, state| {
            pat.query(&State {
                span: state.span,
                seed,
            })
        })
    }

    // ============= Metadata =============

    pub fn weight(&self) -> Fraction {
        self.weight
    }

    pub fn steps(&self) -> Option<Fraction> {
        self.steps
    }

    pub fn with_weight(mut self, weight: Fraction) -> Self {
        self.weight = weight;
        self
    }

    pub fn with_steps(mut self, steps: Option<Fraction>) -> Self {
        self.steps = steps;
        self
    }

    /// Build a derived pattern that preserves this pattern's metadata.
    pub(crate) fn wrap(
        self,
        f: impl Fn(&Pattern<T>, &State) -> Vec<Hap<T>> + Send + Sync + 'static,
    ) -> Pattern<T> {
        let weight = self.weight;
        let steps = self.steps;
        Pattern {
            query: Arc::new(move |state| f(&self, state)),
            weight,
            steps,
        }
    }

    // ============= Atomic constructors =============

    /// The empty pattern; identity of `stack`, unit of `cat`.
    pub fn silence() -> Self {
        Pattern::new(|_| Vec::new())
    }

    /// One event per cycle carrying `value`.
    pub fn pure(value: T) -> Self {
        Pattern::new(move |state| {
            state
                .span
                .span_cycles()
                .into_iter()
                .map(|part| {
                    let whole = TimeSpan::new(part.begin.sam(), part.begin.next_sam());
                    Hap::new(Some(whole), part, value.clone())
                })
                .collect()
        })
        .with_steps(Some(Fraction::one()))
    }

    /// A continuous signal holding one value: a single wholeless event
    /// covering any queried arc.
    pub fn steady(value: T) -> Self {
        Pattern::new(move |state| {
            if state.span.is_empty() {
                Vec::new()
            } else {
                vec![Hap::new(None, state.span, value.clone())]
            }
        })
    }

    /// Silence that claims `n` cycles of space inside `seq`.
    pub fn gap(n: f64) -> Self {
        let w = Fraction::from_float(n);
        Pattern::silence().with_weight(w).with_steps(Some(w))
    }

    // ============= Core transformations =============

    pub fn fmap<U: Clone + Send + Sync + 'static>(
        &self,
        f: impl Fn(T) -> U + Send + Sync + 'static,
    ) -> Pattern<U> {
        let pat = self.clone();
        let mut out = Pattern::new(move |state| {
            pat.query(state)
                .into_iter()
                .map(|hap| hap.with_value(|v| f(v.clone())))
                .collect()
        });
        out.weight = self.weight;
        out.steps = self.steps;
        out
    }

    pub fn filter_haps(self, pred: impl Fn(&Hap<T>) -> bool + Send + Sync + 'static) -> Self {
        self.wrap(move |pat, state| pat.query(state).into_iter().filter(|h| pred(h)).collect())
    }

    /// Keep events whose onset (whole-or-part begin) satisfies a predicate
    /// on time.
    pub fn play_when(self, pred: impl Fn(Fraction) -> bool + Send + Sync + 'static) -> Self {
        self.filter_haps(move |hap| pred(hap.whole_or_part().begin))
    }

    /// Transform the query span before querying.
    pub(crate) fn with_query_span(
        self,
        f: impl Fn(TimeSpan) -> TimeSpan + Send + Sync + 'static,
    ) -> Self {
        self.wrap(move |pat, state| pat.query(&state.with_span(f(state.span))))
    }

    pub(crate) fn with_query_time(
        self,
        f: impl Fn(Fraction) -> Fraction + Send + Sync + 'static,
    ) -> Self {
        self.with_query_span(move |span| span.with_time(&f))
    }

    /// Transform result event spans (both part and whole).
    pub(crate) fn with_hap_span(
        self,
        f: impl Fn(TimeSpan) -> TimeSpan + Send + Sync + 'static,
    ) -> Self {
        self.wrap(move |pat, state| {
            pat.query(state)
                .into_iter()
                .map(|hap| hap.with_span(&f))
                .collect()
        })
    }

    pub(crate) fn with_hap_time(
        self,
        f: impl Fn(Fraction) -> Fraction + Send + Sync + 'static,
    ) -> Self {
        self.with_hap_span(move |span| span.with_time(&f))
    }

    /// Rewrite the pattern so every query is performed cycle by cycle.
    /// Operators whose behaviour depends on the cycle number rely on this.
    pub(crate) fn split_queries(self) -> Self {
        self.wrap(move |pat, state| {
            state
                .span
                .span_cycles()
                .into_iter()
                .flat_map(|span| pat.query(&state.with_span(span)))
                .collect()
        })
    }

    // ============= Combinators =============

    /// Layer patterns; all events of all children.
    pub fn stack(patterns: Vec<Pattern<T>>) -> Pattern<T> {
        Pattern::new(move |state| patterns.iter().flat_map(|p| p.query(state)).collect())
    }

    pub fn overlay(self, other: Pattern<T>) -> Pattern<T> {
        Pattern::stack(vec![self, other])
    }

    /// Concatenate with explicit per-child durations, squeezed into a
    /// single cycle. The workhorse behind `seq` and `fastcat`.
    pub fn timecat(specs: Vec<(Fraction, Pattern<T>)>) -> Pattern<T> {
        let total: Fraction = specs
            .iter()
            .map(|(w, _)| *w)
            .fold(Fraction::zero(), |a, b| a + b);
        if specs.is_empty() || total <= Fraction::zero() {
            return Pattern::silence();
        }
        let mut layers = Vec::with_capacity(specs.len());
        let mut offset = Fraction::zero();
        for (w, pat) in specs {
            let begin = offset / total;
            let end = (offset + w) / total;
            layers.push(pat.compress_frac(begin, end));
            offset = offset + w;
        }
        Pattern::stack(layers).with_steps(Some(total))
    }

    /// Sequence children within one cycle, dividing it by each child's
    /// weight. `gap(n)` children claim `n` units of silence.
    pub fn seq(patterns: Vec<Pattern<T>>) -> Pattern<T> {
        let specs: Vec<(Fraction, Pattern<T>)> =
            patterns.into_iter().map(|p| (p.weight, p)).collect();
        Pattern::timecat(specs)
    }

    /// Sequence children within one cycle with uniform division,
    /// regardless of weight.
    pub fn fastcat(patterns: Vec<Pattern<T>>) -> Pattern<T> {
        let specs: Vec<(Fraction, Pattern<T>)> = patterns
            .into_iter()
            .map(|p| (Fraction::one(), p))
            .collect();
        Pattern::timecat(specs)
    }

    /// Elongated concatenation: each child occupies `weight` cycles on the
    /// global timeline (children are queried unshifted inside their
    /// blocks) and the arrangement loops every sum-of-weights cycles.
    pub fn cat(patterns: Vec<Pattern<T>>) -> Pattern<T> {
        if patterns.is_empty() {
            return Pattern::silence();
        }
        let weights: Vec<Fraction> = patterns
            .iter()
            .map(|p| p.weight.max(Fraction::zero()))
            .collect();
        let total: Fraction = weights.iter().fold(Fraction::zero(), |a, b| a + *b);
        if total <= Fraction::zero() {
            return Pattern::silence();
        }
        Pattern::new(move |state| {
            let mut haps = Vec::new();
            let mut rep = Fraction::from_integer((state.span.begin / total).floor()) * total;
            while rep < state.span.end {
                let mut offset = rep;
                for (pat, w) in patterns.iter().zip(weights.iter()) {
                    let block = TimeSpan::new(offset, offset + *w);
                    if let Some(span) = state.span.sect(&block) {
                        haps.extend(pat.query(&state.with_span(span)));
                    }
                    offset = offset + *w;
                }
                rep = rep + total;
            }
            haps
        })
    }

    pub fn append(self, other: Pattern<T>) -> Pattern<T> {
        Pattern::cat(vec![self, other])
    }

    /// Strict cycle-wise round-robin: cycle `c` plays child `c mod n`,
    /// shifted so each child progresses through its own cycles across
    /// repetitions.
    pub fn slowcat(patterns: Vec<Pattern<T>>) -> Pattern<T> {
        if patterns.is_empty() {
            return Pattern::silence();
        }
        let n = patterns.len() as i64;
        Pattern::new(move |state| {
            let cycle = state.span.begin.floor();
            let index = cycle.rem_euclid(n) as usize;
            let offset = Fraction::from_integer(cycle - cycle.div_euclid(n));
            let shifted = state.span.with_time(|t| t - offset);
            patterns[index]
                .query(&state.with_span(shifted))
                .into_iter()
                .map(|hap| hap.with_span(|span| span.with_time(|t| t + offset)))
                .collect()
        })
        .split_queries()
    }

    /// Weighted stretched concatenation: each element spans `n` cycles and
    /// the arrangement loops over the total.
    pub fn arrange(items: Vec<(f64, Pattern<T>)>) -> Pattern<T> {
        let children = items
            .into_iter()
            .map(|(n, p)| p.with_weight(Fraction::from_float(n)))
            .collect();
        Pattern::cat(children)
    }
}

impl Pattern<String> {
    /// Flat whitespace-separated token sequence; `~` is a rest. This is a
    /// constructor-level convenience, not the mini-notation parser.
    pub fn from_string(s: &str) -> Self {
        let parts: Vec<Option<String>> = s
            .split_whitespace()
            .map(|tok| {
                if tok == "~" {
                    None
                } else {
                    Some(tok.to_string())
                }
            })
            .collect();
        if parts.is_empty() {
            return Pattern::silence();
        }
        Pattern::fastcat(
            parts
                .into_iter()
                .map(|tok| match tok {
                    Some(value) => Pattern::pure(value),
                    None => Pattern::silence(),
                })
                .collect(),
        )
    }
}
