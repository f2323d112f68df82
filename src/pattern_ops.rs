//! Time transformations: speeding, slowing, shifting, reversing, zooming
//! and the other arc-level operators.
//!
//! Query-arc maps and result maps always come in exact inverse pairs so
//! endpoints stay on the rational grid.

use crate::pattern::{Fraction, Pattern, TimeSpan};

impl<T: Clone + Send + Sync + 'static> Pattern<T> {
    // ============= Speed =============

    /// Speed up by `factor`. Zero is silence; a negative factor plays the
    /// pattern reversed at `|factor|`.
    pub fn fast(self, factor: f64) -> Self {
        self.fast_frac(Fraction::from_float(factor))
    }

    pub(crate) fn fast_frac(self, factor: Fraction) -> Self {
        if factor.is_zero() {
            return Pattern::silence();
        }
        if factor < Fraction::zero() {
            return self.revv().fast_frac(-factor);
        }
        let steps = self.steps().map(|s| s * factor);
        self.with_query_time(move |t| t * factor)
            .with_hap_time(move |t| t / factor)
            .with_steps(steps)
    }

    /// Slow down by `factor`; `slow(k)` is `fast(1/k)`.
    pub fn slow(self, factor: f64) -> Self {
        self.slow_frac(Fraction::from_float(factor))
    }

    pub(crate) fn slow_frac(self, factor: Fraction) -> Self {
        if factor.is_zero() {
            return Pattern::silence();
        }
        self.fast_frac(Fraction::one() / factor)
    }

    // ============= Shift =============

    /// Shift earlier in time by `amount` cycles.
    pub fn early(self, amount: f64) -> Self {
        self.early_frac(Fraction::from_float(amount))
    }

    pub(crate) fn early_frac(self, amount: Fraction) -> Self {
        self.with_query_time(move |t| t + amount)
            .with_hap_time(move |t| t - amount)
    }

    /// Shift later in time by `amount` cycles; inverse of `early`.
    pub fn late(self, amount: f64) -> Self {
        self.late_frac(Fraction::from_float(amount))
    }

    pub(crate) fn late_frac(self, amount: Fraction) -> Self {
        self.early_frac(-amount)
    }

    // ============= Reversal =============

    /// Reverse each cycle in place: the query arc is reflected about the
    /// centre of every cycle it touches, and events are reflected back.
    pub fn rev(self) -> Self {
        self.wrap(move |pat, state| {
            let cycle = state.span.begin.sam();
            let pivot = cycle + cycle + Fraction::one();
            let reflected = TimeSpan::new(pivot - state.span.end, pivot - state.span.begin);
            pat.query(&state.with_span(reflected))
                .into_iter()
                .map(|hap| hap.with_span(|s| TimeSpan::new(pivot - s.end, pivot - s.begin)))
                .collect()
        })
        .split_queries()
    }

    /// Global reversal about time zero.
    pub fn revv(self) -> Self {
        self.with_query_span(|s| TimeSpan::new(-s.end, -s.begin))
            .with_hap_span(|s| TimeSpan::new(-s.end, -s.begin))
    }

    // ============= Windowing =============

    /// Play only the `[begin, end)` portion of every cycle, stretched to
    /// fill the whole cycle.
    pub fn zoom(self, begin: f64, end: f64) -> Self {
        self.zoom_frac(Fraction::from_float(begin), Fraction::from_float(end))
    }

    pub(crate) fn zoom_frac(self, begin: Fraction, end: Fraction) -> Self {
        let d = end - begin;
        if d <= Fraction::zero() {
            return Pattern::silence();
        }
        self.wrap(move |pat, state| {
            let cycle = state.span.begin.sam();
            let query = state
                .span
                .with_time(|t| cycle + begin + (t - cycle) * d);
            pat.query(&state.with_span(query))
                .into_iter()
                .map(|hap| hap.with_span(|s| s.with_time(|t| cycle + (t - cycle - begin) / d)))
                .collect()
        })
        .split_queries()
    }

    /// Squeeze the whole pattern into the `[begin, end)` portion of every
    /// cycle, leaving silence around it. Inverse of `zoom`.
    pub fn compress(self, begin: f64, end: f64) -> Self {
        self.compress_frac(Fraction::from_float(begin), Fraction::from_float(end))
    }

    pub(crate) fn compress_frac(self, begin: Fraction, end: Fraction) -> Self {
        if begin > end
            || begin < Fraction::zero()
            || end > Fraction::one()
            || begin == end
        {
            return Pattern::silence();
        }
        self.fast_gap_frac(Fraction::one() / (end - begin))
            .late_frac(begin)
    }

    /// Compress each cycle's content into its first `1/factor`, leaving the
    /// rest silent.
    pub fn fast_gap(self, factor: f64) -> Self {
        self.fast_gap_frac(Fraction::from_float(factor))
    }

    pub(crate) fn fast_gap_frac(self, factor: Fraction) -> Self {
        if factor <= Fraction::zero() {
            return Pattern::silence();
        }
        let factor = factor.max(Fraction::one());
        self.wrap(move |pat, state| {
            let cycle = state.span.begin.sam();
            let qb = cycle + ((state.span.begin - cycle) * factor).min(Fraction::one());
            let qe = cycle + ((state.span.end - cycle) * factor).min(Fraction::one());
            if qb >= qe {
                return Vec::new();
            }
            pat.query(&state.with_span(TimeSpan::new(qb, qe)))
                .into_iter()
                .map(|hap| {
                    hap.with_span(|s| {
                        let anchor = s.begin.sam();
                        s.with_time(|t| anchor + (t - anchor) / factor)
                    })
                })
                .collect()
        })
        .split_queries()
    }

    /// Play the first `fraction` of each cycle repeatedly, filling the
    /// cycle. A negative fraction lingers on the tail instead; zero is
    /// silence.
    pub fn linger(self, fraction: f64) -> Self {
        let t = Fraction::from_float(fraction);
        if t.is_zero() {
            return Pattern::silence();
        }
        if t < Fraction::zero() {
            let t = -t;
            return self
                .zoom_frac(Fraction::one() - t, Fraction::one())
                .fast_frac(Fraction::one() / t);
        }
        self.zoom_frac(Fraction::zero(), t)
            .fast_frac(Fraction::one() / t)
    }

    /// Repeat each underlying cycle `n` times: cycle `c` plays the source's
    /// cycle `floor(c / n)`.
    pub fn repeat_cycles(self, n: usize) -> Self {
        if n == 0 {
            return Pattern::silence();
        }
        let n = n as i64;
        self.wrap(move |pat, state| {
            let cycle = state.span.begin.floor();
            let shift = Fraction::from_integer(cycle - cycle.div_euclid(n));
            let span = state.span.with_time(|t| t - shift);
            pat.query(&state.with_span(span))
                .into_iter()
                .map(|hap| hap.with_span(|s| s.with_time(|t| t + shift)))
                .collect()
        })
        .split_queries()
    }

    // ============= Subdivision =============

    /// Split every event into `n` equal copies.
    pub fn ply(self, n: usize) -> Self {
        if n == 0 {
            return Pattern::silence();
        }
        let factor = Fraction::from_integer(n as i64);
        self.fmap(move |v| Pattern::pure(v).fast_frac(factor))
            .squeeze_join()
    }

    /// Like `ply`, with the copy index handed to the value function.
    pub fn ply_with(
        self,
        n: usize,
        f: impl Fn(T, usize) -> T + Send + Sync + 'static,
    ) -> Self {
        if n == 0 {
            return Pattern::silence();
        }
        self.fmap(move |v| {
            Pattern::fastcat((0..n).map(|i| Pattern::pure(f(v.clone(), i))).collect())
        })
        .squeeze_join()
    }

    /// Sample the pattern at `n` equally spaced points per cycle, emitting
    /// discrete events of duration `1/n`. Forces continuous signals into
    /// discrete structure.
    pub fn segment(self, n: usize) -> Self {
        if n == 0 {
            return Pattern::silence();
        }
        let mask = Pattern::pure(true).fast_frac(Fraction::from_integer(n as i64));
        self.struct_pattern(mask)
            .with_steps(Some(Fraction::from_integer(n as i64)))
    }

    /// Delay onsets that fall in the odd half of each `1/n` subdivision by
    /// `amount / (2n)`, wrapping at the cycle boundary.
    pub fn swing_by(self, amount: f64, n: usize) -> Self {
        if n == 0 {
            return self;
        }
        let grid = Fraction::from_integer(2 * n as i64);
        let shift = Fraction::from_float(amount) / grid;
        self.wrap(move |pat, state| {
            // Extend the query backwards so events swung into the arc are
            // still found, then clip back to the requested span.
            let extended = TimeSpan::new(state.span.begin - shift.abs(), state.span.end);
            pat.query(&state.with_span(extended))
                .into_iter()
                .filter_map(|hap| {
                    let onset = hap.whole_or_part().begin;
                    let slot = (onset.cycle_pos() * grid).floor();
                    let swung = if slot.rem_euclid(2) == 1 {
                        let mut moved = hap.with_span(|s| s.with_time(|t| t + shift));
                        if moved.whole_or_part().begin >= onset.next_sam() {
                            moved = moved
                                .with_span(|s| s.with_time(|t| t - Fraction::one()));
                        }
                        moved
                    } else {
                        hap
                    };
                    let part = swung.part.sect(&state.span)?;
                    Some(crate::pattern::Hap::new(swung.whole, part, swung.value))
                })
                .collect()
        })
    }

    /// `swing_by(1/3, n)`.
    pub fn swing(self, n: usize) -> Self {
        self.swing_by(1.0 / 3.0, n)
    }

    /// Keep the first `n` weighted steps of the cycle, scaled to fill it.
    /// Negative counts take from the end; a fractional final step is
    /// clipped.
    pub fn take(self, n: f64) -> Self {
        let t = Fraction::from_float(n);
        if t.is_zero() {
            return Pattern::silence();
        }
        let steps = match self.steps() {
            Some(s) if s > Fraction::zero() => s,
            _ => Fraction::one(),
        };
        let frac = (t.abs() / steps).min(Fraction::one());
        let kept = t.abs().min(steps);
        if t > Fraction::zero() {
            self.zoom_frac(Fraction::zero(), frac).with_steps(Some(kept))
        } else {
            self.zoom_frac(Fraction::one() - frac, Fraction::one())
                .with_steps(Some(kept))
        }
    }

    // ============= Superimposition =============

    /// Layer a transformed copy on top of the original.
    pub fn superimpose(
        self,
        f: impl FnOnce(Pattern<T>) -> Pattern<T>,
    ) -> Pattern<T> {
        let transformed = f(self.clone());
        Pattern::stack(vec![self, transformed])
    }

    /// Superimpose a copy shifted later by `t` and transformed by `f`.
    pub fn off(
        self,
        t: f64,
        f: impl FnOnce(Pattern<T>) -> Pattern<T>,
    ) -> Pattern<T> {
        let shifted = f(self.clone().late(t));
        Pattern::stack(vec![self, shifted])
    }

    // ============= Pattern-valued parameters =============

    /// `fast` with a control pattern for the factor, resolved per control
    /// event.
    pub fn fast_pat(self, factor: Pattern<f64>) -> Self {
        let pat = self;
        factor.fmap(move |k| pat.clone().fast(k)).inner_join()
    }

    pub fn slow_pat(self, factor: Pattern<f64>) -> Self {
        let pat = self;
        factor.fmap(move |k| pat.clone().slow(k)).inner_join()
    }

    pub fn early_pat(self, amount: Pattern<f64>) -> Self {
        let pat = self;
        amount.fmap(move |d| pat.clone().early(d)).inner_join()
    }

    pub fn late_pat(self, amount: Pattern<f64>) -> Self {
        let pat = self;
        amount.fmap(move |d| pat.clone().late(d)).inner_join()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pattern::{Fraction, Pattern};

    #[test]
    fn test_fast_divides_time() {
        let p = Pattern::from_string("a b").fast(2.0);
        let haps = p.query_arc(0.0, 1.0);
        assert_eq!(haps.len(), 4);
        assert_eq!(haps[0].part.begin, Fraction::new(0, 1));
        assert_eq!(haps[1].part.begin, Fraction::new(1, 4));
        assert_eq!(haps[2].part.begin, Fraction::new(1, 2));
        assert_eq!(haps[3].part.begin, Fraction::new(3, 4));
    }

    #[test]
    fn test_fast_slow_roundtrip() {
        let p = Pattern::from_string("a b c");
        let roundtrip = p.clone().fast(3.0).slow(3.0);
        assert_eq!(p.query_arc(0.0, 2.0), roundtrip.query_arc(0.0, 2.0));
    }

    #[test]
    fn test_fast_zero_is_silence() {
        let p = Pattern::pure(1).fast(0.0);
        assert!(p.query_arc(0.0, 4.0).is_empty());
    }

    #[test]
    fn test_early_late_roundtrip() {
        let p = Pattern::from_string("a b c d");
        let roundtrip = p.clone().early(0.25).late(0.25);
        assert_eq!(p.query_arc(0.0, 1.0), roundtrip.query_arc(0.0, 1.0));
    }

    #[test]
    fn test_late_shifts_events() {
        let p = Pattern::from_string("a b").late(0.25);
        let haps = p.query_arc(0.0, 1.0);
        // "b" moves to 3/4; "a" wraps in from the previous cycle, clipped.
        let begins: Vec<Fraction> = haps.iter().map(|h| h.part.begin).collect();
        assert!(begins.contains(&Fraction::new(1, 4)));
        assert!(begins.contains(&Fraction::new(3, 4)));
    }

    #[test]
    fn test_rev_reverses_cycle() {
        let p = Pattern::from_string("a b c").rev();
        let haps = p.query_arc(0.0, 1.0);
        let values: Vec<&str> = haps.iter().map(|h| h.value.as_str()).collect();
        assert_eq!(values, vec!["c", "b", "a"]);
        assert_eq!(haps[0].part.begin, Fraction::new(0, 1));
        assert_eq!(haps[2].part.end, Fraction::new(1, 1));
    }

    #[test]
    fn test_rev_rev_is_identity() {
        let p = Pattern::from_string("a b c d");
        let roundtrip = p.clone().rev().rev();
        assert_eq!(p.query_arc(0.0, 2.0), roundtrip.query_arc(0.0, 2.0));
    }

    #[test]
    fn test_zoom_stretches_window() {
        let p = Pattern::from_string("a b c d").zoom(0.25, 0.75);
        let haps = p.query_arc(0.0, 1.0);
        let values: Vec<&str> = haps.iter().map(|h| h.value.as_str()).collect();
        assert_eq!(values, vec!["b", "c"]);
        assert_eq!(haps[0].part, TimeSpan::new(Fraction::zero(), Fraction::new(1, 2)));
        assert_eq!(
            haps[1].part,
            TimeSpan::new(Fraction::new(1, 2), Fraction::one())
        );
    }

    #[test]
    fn test_zoom_empty_window_is_silence() {
        let p = Pattern::pure(1).zoom(0.5, 0.5);
        assert!(p.query_arc(0.0, 1.0).is_empty());
    }

    #[test]
    fn test_compress_confines_to_window() {
        let p = Pattern::from_string("a b").compress(0.25, 0.75);
        let haps = p.query_arc(0.0, 1.0);
        assert_eq!(haps.len(), 2);
        assert_eq!(
            haps[0].part,
            TimeSpan::new(Fraction::new(1, 4), Fraction::new(1, 2))
        );
        assert_eq!(
            haps[1].part,
            TimeSpan::new(Fraction::new(1, 2), Fraction::new(3, 4))
        );
    }

    #[test]
    fn test_compress_invalid_window_is_silence() {
        assert!(Pattern::pure(1).compress(0.75, 0.25).query_arc(0.0, 1.0).is_empty());
        assert!(Pattern::pure(1).compress(-0.5, 0.5).query_arc(0.0, 1.0).is_empty());
    }

    #[test]
    fn test_fast_gap_preserves_payload() {
        let p = Pattern::from_string("a b").fast_gap(2.0);
        let haps = p.query_arc(0.0, 1.0);
        assert_eq!(haps.len(), 2);
        assert_eq!(haps[0].part, TimeSpan::new(Fraction::zero(), Fraction::new(1, 4)));
        assert_eq!(
            haps[1].part,
            TimeSpan::new(Fraction::new(1, 4), Fraction::new(1, 2))
        );
        // Second half of the cycle is silent.
        assert!(p.query_arc(0.5, 1.0).is_empty());
    }

    #[test]
    fn test_linger_repeats_head() {
        let p = Pattern::from_string("a b c d").linger(0.25);
        let haps = p.query_arc(0.0, 1.0);
        assert_eq!(haps.len(), 4);
        assert!(haps.iter().all(|h| h.value == "a"));
        assert_eq!(haps[2].part.begin, Fraction::new(1, 2));
    }

    #[test]
    fn test_linger_zero_is_silence() {
        assert!(Pattern::pure(1).linger(0.0).query_arc(0.0, 1.0).is_empty());
    }

    #[test]
    fn test_repeat_cycles() {
        let p = Pattern::slowcat(vec![Pattern::pure("a"), Pattern::pure("b")]).repeat_cycles(2);
        let values: Vec<String> = p
            .query_arc(0.0, 4.0)
            .into_iter()
            .map(|h| h.value.to_string())
            .collect();
        assert_eq!(values, vec!["a", "a", "b", "b"]);
    }

    #[test]
    fn test_ply_splits_events() {
        let p = Pattern::from_string("a b").ply(3);
        let haps = p.query_arc(0.0, 1.0);
        assert_eq!(haps.len(), 6);
        assert_eq!(haps[0].part.duration(), Fraction::new(1, 6));
        assert!(haps.iter().all(|h| h.has_onset()));
    }

    #[test]
    fn test_ply_with_exposes_index() {
        let p = Pattern::pure(10).ply_with(4, |v, i| v + i as i32);
        let values: Vec<i32> = p.query_arc(0.0, 1.0).into_iter().map(|h| h.value).collect();
        assert_eq!(values, vec![10, 11, 12, 13]);
    }

    #[test]
    fn test_segment_discretises() {
        let p = Pattern::pure("x").segment(4);
        let haps = p.query_arc(0.0, 1.0);
        assert_eq!(haps.len(), 4);
        assert!(haps.iter().all(|h| h.part.duration() == Fraction::new(1, 4)));
        assert!(haps.iter().all(|h| h.has_onset()));
    }

    #[test]
    fn test_swing_by_shifts_offbeats() {
        let p = Pattern::from_string("a b c d").swing_by(0.5, 2);
        let haps = p.query_arc(0.0, 1.0);
        // Offbeats at 1/4 and 3/4 move by 0.5 / 4 = 1/8.
        let begins: Vec<Fraction> = haps.iter().map(|h| h.part.begin).collect();
        assert!(begins.contains(&Fraction::new(0, 1)));
        assert!(begins.contains(&Fraction::new(3, 8)));
        assert!(begins.contains(&Fraction::new(1, 2)));
        assert!(begins.contains(&Fraction::new(7, 8)));
    }

    #[test]
    fn test_take_keeps_leading_steps() {
        let p = Pattern::from_string("a b c d").take(2.0);
        let haps = p.query_arc(0.0, 1.0);
        let values: Vec<&str> = haps.iter().map(|h| h.value.as_str()).collect();
        assert_eq!(values, vec!["a", "b"]);
        assert_eq!(haps[0].part.duration(), Fraction::new(1, 2));
    }

    #[test]
    fn test_take_negative_keeps_tail() {
        let p = Pattern::from_string("a b c d").take(-2.0);
        let values: Vec<String> = p
            .query_arc(0.0, 1.0)
            .into_iter()
            .map(|h| h.value)
            .collect();
        assert_eq!(values, vec!["c", "d"]);
    }

    #[test]
    fn test_slow_pat_matches_scalar_slow() {
        let via_pattern = Pattern::pure("x")
            .slow_pat(Pattern::pure(2.0))
            .query_arc(0.0, 1.0);
        let direct = Pattern::pure("x").slow(2.0).query_arc(0.0, 1.0);
        assert_eq!(via_pattern, direct);
        assert_eq!(via_pattern.len(), 1);
        assert_eq!(
            via_pattern[0].whole,
            Some(TimeSpan::new(Fraction::zero(), Fraction::new(2, 1)))
        );
    }

    #[test]
    fn test_early_pat_matches_scalar_early() {
        let p = Pattern::from_string("a b c d");
        let via_pattern = p.clone().early_pat(Pattern::pure(0.25)).query_arc(0.0, 1.0);
        let direct = p.early(0.25).query_arc(0.0, 1.0);
        assert_eq!(via_pattern, direct);
        assert_eq!(via_pattern[0].value, "b");
    }

    #[test]
    fn test_late_pat_matches_scalar_late_and_inverts() {
        let p = Pattern::from_string("a b c d");
        let via_pattern = p.clone().late_pat(Pattern::pure(0.25)).query_arc(0.0, 1.0);
        let direct = p.clone().late(0.25).query_arc(0.0, 1.0);
        assert_eq!(via_pattern, direct);
        let roundtrip = p
            .clone()
            .early_pat(Pattern::pure(0.25))
            .late_pat(Pattern::pure(0.25));
        assert_eq!(p.query_arc(0.0, 1.0), roundtrip.query_arc(0.0, 1.0));
    }

    #[test]
    fn test_fast_pat_varies_per_event() {
        let factor = Pattern::fastcat(vec![Pattern::pure(1.0), Pattern::pure(2.0)]);
        let p = Pattern::pure("x").fast_pat(factor);
        let haps = p.query_arc(0.0, 1.0);
        // First half: one event at normal speed; second half: two halves of
        // the doubled pattern, one onset landing at 1/2.
        assert!(haps.len() >= 2);
        assert!(haps.iter().any(|h| h.part.begin == Fraction::new(1, 2)));
    }

    #[test]
    fn test_superimpose_layers() {
        let p = Pattern::pure(1).superimpose(|p| p.fast(2.0));
        assert_eq!(p.query_arc(0.0, 1.0).len(), 3);
    }

    #[test]
    fn test_off_shifts_copy() {
        let p = Pattern::from_string("a").off(0.25, |p| p);
        let haps = p.query_arc(0.0, 1.0);
        assert_eq!(haps.len(), 3);
    }
}
