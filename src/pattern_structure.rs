//! Structural combinators: imposing event skeletons, euclidean rhythms,
//! per-slice transforms and cycle-conditional rewrites.

use crate::pattern::{Fraction, Hap, Pattern, TimeSpan};
use std::sync::Arc;

/// Bjorklund's algorithm: distribute `pulses` onsets as evenly as possible
/// over `steps` slots. `(3, 8)` gives `X..X..X.`.
pub fn bjorklund(pulses: usize, steps: usize) -> Vec<bool> {
    if steps == 0 || pulses == 0 || pulses > steps {
        return vec![false; steps];
    }
    let mut a: Vec<Vec<bool>> = vec![vec![true]; pulses];
    let mut b: Vec<Vec<bool>> = vec![vec![false]; steps - pulses];
    while b.len() > 1 && !a.is_empty() {
        let n = a.len().min(b.len());
        let mut paired = Vec::with_capacity(n);
        for i in 0..n {
            let mut group = a[i].clone();
            group.extend_from_slice(&b[i]);
            paired.push(group);
        }
        let rest_a: Vec<Vec<bool>> = a[n..].to_vec();
        let rest_b: Vec<Vec<bool>> = b[n..].to_vec();
        a = paired;
        b = if !rest_a.is_empty() { rest_a } else { rest_b };
    }
    a.into_iter().chain(b).flatten().collect()
}

/// Boolean euclidean pulse pattern, one `steps`-grid per cycle. Invalid
/// parameters give silence.
pub fn euclid_bool(pulses: usize, steps: usize, rotation: i32) -> Pattern<bool> {
    if steps == 0 || pulses == 0 || pulses > steps {
        return Pattern::silence();
    }
    let mut ring = bjorklund(pulses, steps);
    let rot = rotation.rem_euclid(steps as i32) as usize;
    ring.rotate_left(rot);
    Pattern::fastcat(ring.into_iter().map(Pattern::pure).collect())
}

impl<T: Clone + Send + Sync + 'static> Pattern<T> {
    /// Rewrite the event skeleton to match a boolean mask: every truthy
    /// pulse becomes an output event whose value is sampled from this
    /// pattern over the pulse. Source events sharing one long pulse all
    /// adopt the pulse's whole, so only the first carries an onset.
    pub fn struct_pattern(self, mask: Pattern<bool>) -> Self {
        let steps = mask.steps();
        mask.filter_haps(|hap| hap.value)
            .app_left(&self, |_, v| v.clone())
            .with_steps(steps)
    }

    /// Keep only events whose part begins inside a truthy pulse of the
    /// mask.
    pub fn mask(self, mask: Pattern<bool>) -> Self {
        self.wrap(move |pat, state| {
            let pulses = mask.query(state);
            pat.query(state)
                .into_iter()
                .filter(|hap| {
                    pulses
                        .iter()
                        .any(|pulse| pulse.value && pulse.part.contains(hap.part.begin))
                })
                .collect()
        })
    }

    /// Structure this pattern with a euclidean rhythm.
    pub fn euclid(self, pulses: usize, steps: usize) -> Self {
        self.euclid_rot(pulses, steps, 0)
    }

    pub fn euclid_rot(self, pulses: usize, steps: usize, rotation: i32) -> Self {
        self.struct_pattern(euclid_bool(pulses, steps, rotation))
    }

    /// Euclidean structure where each event lasts until the next pulse,
    /// counting the wrap-around gap for the last one.
    pub fn euclid_legato(self, pulses: usize, steps: usize) -> Self {
        self.euclid_legato_rot(pulses, steps, 0)
    }

    pub fn euclid_legato_rot(self, pulses: usize, steps: usize, rotation: i32) -> Self {
        if steps == 0 || pulses == 0 || pulses > steps {
            return Pattern::silence();
        }
        let mut ring = bjorklund(pulses, steps);
        let rot = rotation.rem_euclid(steps as i32) as usize;
        ring.rotate_left(rot);
        let positions: Vec<usize> = ring
            .iter()
            .enumerate()
            .filter_map(|(i, &on)| if on { Some(i) } else { None })
            .collect();
        if positions.is_empty() {
            return Pattern::silence();
        }
        let steps_i = steps as i64;
        let mask = Pattern::new(move |state| {
            let mut haps = Vec::new();
            // Wholes can spill past the cycle boundary, so look at the
            // previous cycle's grid too.
            let cycle = state.span.begin.floor();
            for anchor in [cycle - 1, cycle] {
                let base = Fraction::from_integer(anchor);
                for (i, &k) in positions.iter().enumerate() {
                    let next = if i + 1 < positions.len() {
                        positions[i + 1]
                    } else {
                        positions[0] + steps
                    };
                    let whole = TimeSpan::new(
                        base + Fraction::new(k as i64, steps_i),
                        base + Fraction::new(next as i64, steps_i),
                    );
                    if let Some(part) = whole.sect(&state.span) {
                        haps.push(Hap::new(Some(whole), part, true));
                    }
                }
            }
            haps
        })
        .split_queries()
        .with_steps(Some(Fraction::from_integer(steps_i)));
        self.struct_pattern(mask)
    }

    /// Apply `f` only to events whose onset falls in the `[begin, end)`
    /// window of each cycle.
    pub fn within(
        self,
        begin: f64,
        end: f64,
        f: impl Fn(Pattern<T>) -> Pattern<T> + Send + Sync + 'static,
    ) -> Self {
        self.within_arc(
            Fraction::from_float(begin),
            Fraction::from_float(end),
            Arc::new(f),
        )
    }

    fn within_arc(
        self,
        begin: Fraction,
        end: Fraction,
        f: Arc<dyn Fn(Pattern<T>) -> Pattern<T> + Send + Sync>,
    ) -> Self {
        let transformed = f(self.clone());
        let inside = move |t: Fraction| {
            let pos = t.cycle_pos();
            pos >= begin && pos < end
        };
        let outside = inside.clone();
        Pattern::stack(vec![
            transformed.play_when(inside),
            self.play_when(move |t| !outside(t)),
        ])
    }

    /// Across `n` cycles, transform the `i`-th of `n` equal slices in cycle
    /// `i`, leaving the rest untouched. The source restarts with the
    /// round-robin each cycle.
    pub fn chunk(
        self,
        n: usize,
        f: impl Fn(Pattern<T>) -> Pattern<T> + Send + Sync + 'static,
    ) -> Self {
        self.chunk_impl(n, Arc::new(f), false, false)
    }

    /// `chunk` with the slice order reversed.
    pub fn chunk_back(
        self,
        n: usize,
        f: impl Fn(Pattern<T>) -> Pattern<T> + Send + Sync + 'static,
    ) -> Self {
        self.chunk_impl(n, Arc::new(f), true, false)
    }

    /// Like `chunk`, but the source advances on the global timeline instead
    /// of repeating; suited to sources with one event per slice.
    pub fn fast_chunk(
        self,
        n: usize,
        f: impl Fn(Pattern<T>) -> Pattern<T> + Send + Sync + 'static,
    ) -> Self {
        self.chunk_impl(n, Arc::new(f), false, true)
    }

    /// Alias for `fast_chunk`.
    pub fn chunk_into(
        self,
        n: usize,
        f: impl Fn(Pattern<T>) -> Pattern<T> + Send + Sync + 'static,
    ) -> Self {
        self.chunk_impl(n, Arc::new(f), false, true)
    }

    /// Alias for `chunk`.
    pub fn slow_chunk(
        self,
        n: usize,
        f: impl Fn(Pattern<T>) -> Pattern<T> + Send + Sync + 'static,
    ) -> Self {
        self.chunk_impl(n, Arc::new(f), false, false)
    }

    fn chunk_impl(
        self,
        n: usize,
        f: Arc<dyn Fn(Pattern<T>) -> Pattern<T> + Send + Sync>,
        back: bool,
        fast: bool,
    ) -> Self {
        if n == 0 {
            return self;
        }
        let step = Fraction::new(1, n as i64);
        let mut slices: Vec<Pattern<T>> = (0..n)
            .map(|i| {
                let begin = step * Fraction::from_integer(i as i64);
                let end = begin + step;
                self.clone().within_arc(begin, end, f.clone())
            })
            .collect();
        if back {
            slices.reverse();
        }
        if fast {
            Pattern::cat(slices)
        } else {
            Pattern::slowcat(slices)
        }
    }

    /// Slice the cycle into `n` equal pieces and play the pieces selected
    /// by the index pattern; indices wrap modulo `n`.
    pub fn bite(self, n: usize, indices: Pattern<f64>) -> Self {
        if n == 0 {
            return Pattern::silence();
        }
        let source = self;
        let n_i = n as i64;
        indices
            .fmap(move |i| {
                let idx = crate::pattern_select::round_half_even(i).rem_euclid(n_i);
                source
                    .clone()
                    .zoom_frac(Fraction::new(idx, n_i), Fraction::new(idx + 1, n_i))
            })
            .squeeze_join()
    }

    /// Two cycles: the source, then the source reversed.
    pub fn palindrome(self) -> Self {
        let forward = self.clone().with_weight(Fraction::one());
        let backward = self.rev().with_weight(Fraction::one());
        Pattern::cat(vec![forward, backward])
    }

    /// Even cycles play the source; odd cycles play it squeezed into half
    /// the cycle and pushed later by a quarter.
    pub fn brak(self) -> Self {
        let broken = Pattern::fastcat(vec![self.clone(), Pattern::silence()]).late(0.25);
        self.wrap(move |pat, state| {
            let cycle = state.span.begin.floor();
            if cycle.rem_euclid(2) == 1 {
                broken.query(state)
            } else {
                pat.query(state)
            }
        })
        .split_queries()
    }

    /// Apply `f` on the first of every `n` cycles; `first_of(1, f)` applies
    /// always.
    pub fn first_of(
        self,
        n: usize,
        f: impl Fn(Pattern<T>) -> Pattern<T> + Send + Sync + 'static,
    ) -> Self {
        if n == 0 {
            return self;
        }
        let transformed = f(self.clone());
        let n = n as i64;
        self.wrap(move |pat, state| {
            let cycle = state.span.begin.floor();
            if cycle.rem_euclid(n) == 0 {
                transformed.query(state)
            } else {
                pat.query(state)
            }
        })
        .split_queries()
    }

    /// Alias for `first_of`.
    pub fn every(
        self,
        n: usize,
        f: impl Fn(Pattern<T>) -> Pattern<T> + Send + Sync + 'static,
    ) -> Self {
        self.first_of(n, f)
    }

    /// Per event: when the condition pattern is truthy at the event's
    /// begin, the event is replaced by the transformed pattern queried over
    /// its part.
    pub fn when(
        self,
        condition: Pattern<bool>,
        f: impl Fn(Pattern<T>) -> Pattern<T> + Send + Sync + 'static,
    ) -> Self {
        let transformed = f(self.clone());
        self.wrap(move |pat, state| {
            let conditions = condition.query(state);
            pat.query(state)
                .into_iter()
                .flat_map(|hap| {
                    let truthy = conditions
                        .iter()
                        .any(|c| c.value && c.part.contains(hap.part.begin));
                    if truthy {
                        transformed.query(&state.with_span(hap.part))
                    } else {
                        vec![hap]
                    }
                })
                .collect()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bools(s: &str) -> Pattern<bool> {
        Pattern::fastcat(
            s.split_whitespace()
                .map(|tok| Pattern::pure(tok == "t"))
                .collect(),
        )
    }

    fn pat(s: &str) -> Pattern<String> {
        Pattern::from_string(s)
    }

    #[test]
    fn test_bjorklund_three_eight() {
        let ring = bjorklund(3, 8);
        let expected = [true, false, false, true, false, false, true, false];
        assert_eq!(ring, expected);
    }

    #[test]
    fn test_bjorklund_five_eight() {
        let ring = bjorklund(5, 8);
        let expected = [true, false, true, true, false, true, true, false];
        assert_eq!(ring, expected);
    }

    #[test]
    fn test_struct_samples_source_at_pulses() {
        let structured = pat("bd sn hh cp").struct_pattern(bools("t ~ t ~"));
        let haps = structured.query_arc(0.0, 1.0);
        assert_eq!(haps.len(), 2);
        assert_eq!(haps[0].value, "bd");
        assert_eq!(haps[0].part.begin, Fraction::zero());
        assert_eq!(haps[1].value, "hh");
        assert_eq!(haps[1].part.begin, Fraction::new(1, 2));
        assert!(haps.iter().all(|h| h.has_onset()));
    }

    #[test]
    fn test_struct_full_cycle_pulse_shares_whole() {
        let structured = pat("a b").struct_pattern(Pattern::pure(true));
        let haps = structured.query_arc(0.0, 1.0);
        assert_eq!(haps.len(), 2);
        let whole = TimeSpan::new(Fraction::zero(), Fraction::one());
        assert_eq!(haps[0].whole, Some(whole));
        assert_eq!(haps[1].whole, Some(whole));
        assert!(haps[0].has_onset());
        assert!(!haps[1].has_onset());
    }

    #[test]
    fn test_mask_filters_by_onset() {
        let masked = pat("a b c d").mask(bools("t ~"));
        let values: Vec<String> = masked
            .query_arc(0.0, 1.0)
            .into_iter()
            .map(|h| h.value)
            .collect();
        assert_eq!(values, vec!["a", "b"]);
    }

    #[test]
    fn test_euclid_three_eight_timing() {
        let p = pat("x").euclid(3, 8);
        let haps = p.query_arc(0.0, 1.0);
        assert_eq!(haps.len(), 3);
        assert_eq!(haps[0].part.begin, Fraction::zero());
        assert_eq!(haps[1].part.begin, Fraction::new(3, 8));
        assert_eq!(haps[2].part.begin, Fraction::new(6, 8));
        assert!(haps
            .iter()
            .all(|h| h.part.duration() == Fraction::new(1, 8)));
    }

    #[test]
    fn test_euclid_invalid_is_silence() {
        assert!(pat("x").euclid(9, 8).query_arc(0.0, 1.0).is_empty());
        assert!(pat("x").euclid(3, 0).query_arc(0.0, 1.0).is_empty());
        assert!(pat("x").euclid(0, 8).query_arc(0.0, 1.0).is_empty());
    }

    #[test]
    fn test_euclid_rotation_wraps_negative() {
        let p = pat("x").euclid_rot(3, 8, -1);
        let haps = p.query_arc(0.0, 1.0);
        assert_eq!(haps.len(), 3);
        // Rotating (3,8) left by -1 puts an onset on the last slot.
        assert_eq!(haps[2].part.begin, Fraction::new(7, 8));
    }

    #[test]
    fn test_euclid_legato_fills_gaps() {
        let p = pat("x").euclid_legato(3, 8);
        let haps = p.query_arc(0.0, 1.0);
        assert_eq!(haps.len(), 3);
        assert_eq!(haps[0].whole_or_part().duration(), Fraction::new(3, 8));
        assert_eq!(haps[1].whole_or_part().duration(), Fraction::new(3, 8));
        assert_eq!(haps[2].whole_or_part().duration(), Fraction::new(1, 4));
    }

    #[test]
    fn test_chunk_transforms_rotating_slice() {
        let p = pat("a b c d").chunk(4, |p| p.fast(2.0));
        // Cycle 0: the first quarter is doubled.
        let haps = p.query_arc(0.0, 1.0);
        let onsets: Vec<(String, Fraction)> = haps
            .iter()
            .filter(|h| h.has_onset())
            .map(|h| (h.value.clone(), h.part.begin))
            .collect();
        assert!(onsets.contains(&("a".to_string(), Fraction::zero())));
        assert!(onsets.contains(&("b".to_string(), Fraction::new(1, 8))));
        assert!(onsets.contains(&("b".to_string(), Fraction::new(1, 4))));
        assert!(onsets.contains(&("c".to_string(), Fraction::new(1, 2))));
        // Cycle 1: the second quarter is doubled instead; the sped-up copy
        // contributes c at 1/4 and d at 3/8 there.
        let haps = p.query_arc(1.0, 2.0);
        let onsets: Vec<(String, Fraction)> = haps
            .iter()
            .filter(|h| h.has_onset())
            .map(|h| (h.value.clone(), h.part.begin.cycle_pos()))
            .collect();
        assert!(onsets.contains(&("a".to_string(), Fraction::zero())));
        assert!(onsets.contains(&("c".to_string(), Fraction::new(1, 4))));
        assert!(onsets.contains(&("d".to_string(), Fraction::new(3, 8))));
        assert!(onsets.contains(&("c".to_string(), Fraction::new(1, 2))));
    }

    #[test]
    fn test_chunk_back_reverses_slice_order() {
        let p = pat("a b c d").chunk_back(4, |p| p.fast(2.0));
        // Cycle 0 transforms the last quarter.
        let haps = p.query_arc(0.0, 1.0);
        let onsets: Vec<(String, Fraction)> = haps
            .iter()
            .filter(|h| h.has_onset())
            .map(|h| (h.value.clone(), h.part.begin))
            .collect();
        assert!(onsets.contains(&("c".to_string(), Fraction::new(3, 4))));
        assert!(onsets.contains(&("d".to_string(), Fraction::new(7, 8))));
        assert!(onsets.contains(&("b".to_string(), Fraction::new(1, 4))));
    }

    #[test]
    fn test_slow_chunk_is_chunk() {
        let aliased = pat("a b c d")
            .slow_chunk(4, |p| p.fast(2.0))
            .query_arc(0.0, 4.0);
        let direct = pat("a b c d").chunk(4, |p| p.fast(2.0)).query_arc(0.0, 4.0);
        assert_eq!(aliased, direct);
    }

    #[test]
    fn test_chunk_into_is_fast_chunk() {
        let aliased = pat("a b c d")
            .chunk_into(4, |p| p.fast(2.0))
            .query_arc(0.0, 4.0);
        let direct = pat("a b c d")
            .fast_chunk(4, |p| p.fast(2.0))
            .query_arc(0.0, 4.0);
        assert_eq!(aliased, direct);
    }

    #[test]
    fn test_chunk_into_advances_the_source() {
        let source = Pattern::slowcat(vec![pat("a b"), pat("c d")]);
        // With an identity transform the only difference is whether the
        // source repeats its first cycle or keeps advancing.
        let repeating = source.clone().chunk(2, |p| p);
        let values: Vec<String> = repeating
            .query_arc(1.0, 2.0)
            .into_iter()
            .map(|h| h.value)
            .collect();
        assert_eq!(values, vec!["a", "b"]);
        let advancing = source.chunk_into(2, |p| p);
        let values: Vec<String> = advancing
            .query_arc(1.0, 2.0)
            .into_iter()
            .map(|h| h.value)
            .collect();
        assert_eq!(values, vec!["c", "d"]);
    }

    #[test]
    fn test_bite_selects_slices() {
        let source = pat("a b c d");
        let straight = source.clone().bite(2, Pattern::fastcat(vec![
            Pattern::pure(0.0),
            Pattern::pure(1.0),
        ]));
        let values: Vec<String> = straight
            .query_arc(0.0, 1.0)
            .into_iter()
            .map(|h| h.value)
            .collect();
        assert_eq!(values, vec!["a", "b", "c", "d"]);

        let swapped = source.bite(2, Pattern::fastcat(vec![
            Pattern::pure(1.0),
            Pattern::pure(0.0),
        ]));
        let values: Vec<String> = swapped
            .query_arc(0.0, 1.0)
            .into_iter()
            .map(|h| h.value)
            .collect();
        assert_eq!(values, vec!["c", "d", "a", "b"]);
    }

    #[test]
    fn test_bite_negative_index_wraps() {
        let p = pat("a b").bite(2, Pattern::pure(-1.0));
        let values: Vec<String> = p
            .query_arc(0.0, 1.0)
            .into_iter()
            .map(|h| h.value)
            .collect();
        assert_eq!(values, vec!["b"]);
    }

    #[test]
    fn test_palindrome_reverses_second_cycle() {
        let p = pat("a b c").palindrome();
        let forward: Vec<String> = p
            .query_arc(0.0, 1.0)
            .into_iter()
            .map(|h| h.value)
            .collect();
        assert_eq!(forward, vec!["a", "b", "c"]);
        let backward: Vec<String> = p
            .query_arc(1.0, 2.0)
            .into_iter()
            .map(|h| h.value)
            .collect();
        assert_eq!(backward, vec!["c", "b", "a"]);
    }

    #[test]
    fn test_palindrome_multi_cycle_source() {
        let source = Pattern::slowcat(vec![pat("a b"), pat("c d")]);
        let p = source.palindrome();
        // Cycle 1 is the reverse of the source's cycle 1, not cycle 0.
        let backward: Vec<String> = p
            .query_arc(1.0, 2.0)
            .into_iter()
            .map(|h| h.value)
            .collect();
        assert_eq!(backward, vec!["d", "c"]);
    }

    #[test]
    fn test_brak_alternates() {
        let p = pat("a b").brak();
        let even: Vec<Fraction> = p
            .query_arc(0.0, 1.0)
            .into_iter()
            .map(|h| h.part.begin)
            .collect();
        assert_eq!(even, vec![Fraction::zero(), Fraction::new(1, 2)]);
        let odd: Vec<Fraction> = p
            .query_arc(1.0, 2.0)
            .into_iter()
            .map(|h| h.part.begin.cycle_pos())
            .collect();
        assert_eq!(odd, vec![Fraction::new(1, 4), Fraction::new(1, 2)]);
    }

    #[test]
    fn test_first_of_applies_on_first_cycle() {
        let p = pat("a").first_of(2, |p| p.fast(2.0));
        assert_eq!(p.query_arc(0.0, 1.0).len(), 2);
        assert_eq!(p.query_arc(1.0, 2.0).len(), 1);
        let always = pat("a").first_of(1, |p| p.fast(2.0));
        assert_eq!(always.query_arc(0.0, 1.0).len(), 2);
    }

    #[test]
    fn test_when_replaces_matching_events() {
        let p = pat("a b").when(bools("t ~"), |p| p.fmap(|v| v.to_uppercase()));
        let values: Vec<String> = p
            .query_arc(0.0, 1.0)
            .into_iter()
            .map(|h| h.value)
            .collect();
        assert_eq!(values, vec!["A", "b"]);
    }
}
