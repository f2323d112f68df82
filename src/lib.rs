//! # Cyclone - a pattern engine for live coding
//!
//! Cyclone is a pure-Rust implementation of the TidalCycles/Strudel pattern
//! model. A pattern is a pure function from a half-open rational time
//! interval (an *arc*) to a finite list of timed events, each carrying a
//! voice-data payload. Patterns compose under a rich algebra: sequencing,
//! stacking, speed changes, time shifts, reversal, euclidean rhythms,
//! probabilistic thinning, selectors and arbitrary user transformations.
//!
//! The crate is the engine only: there is no scheduler, no audio and no
//! mini-notation parser here. Queries are synchronous, deterministic
//! (randomness is a pure hash of position and seed) and side-effect free,
//! and patterns are immutable values that are cheap to clone and safe to
//! share across threads.
//!
//! ## Quick start
//!
//! ```rust
//! use cyclone::controls::s;
//!
//! // Three sounds, one cycle, equal thirds.
//! let pattern = s("bd hh sn");
//! let events = pattern.query_arc(0.0, 1.0);
//! assert_eq!(events.len(), 3);
//! assert_eq!(events[0].value.sound.as_deref(), Some("bd"));
//! ```
//!
//! Time transformations compose fluently and invert exactly:
//!
//! ```rust
//! use cyclone::pattern::Pattern;
//!
//! let p = Pattern::from_string("a b c");
//! let there_and_back = p.clone().fast(3.0).slow(3.0);
//! assert_eq!(p.query_arc(0.0, 1.0), there_and_back.query_arc(0.0, 1.0));
//! ```
//!
//! Euclidean rhythms place onsets on the Bjorklund grid:
//!
//! ```rust
//! use cyclone::controls::note;
//!
//! let p = note("c d").euclid(3, 8);
//! let onsets = p.query_arc(0.0, 1.0);
//! assert_eq!(onsets.len(), 3);
//! ```
//!
//! Continuous signals become discrete through `segment`:
//!
//! ```rust
//! use cyclone::pattern_signal::sine;
//!
//! let samples = sine().segment(4).query_arc(0.0, 1.0);
//! assert_eq!(samples.len(), 4);
//! assert!((samples[0].value - 0.5).abs() < 1e-9);
//! assert!((samples[1].value - 1.0).abs() < 1e-9);
//! ```
//!
//! ## Module map
//!
//! - [`pattern`] - rational time, events, the `Pattern` type and atomic
//!   constructors (start here)
//! - [`pattern_ops`] - time transformations (`fast`, `rev`, `zoom`, ...)
//! - [`pattern_structure`] - structural combinators (`struct_pattern`,
//!   `euclid`, `chunk`, `bite`, ...)
//! - [`pattern_join`] - the five join flavors and the binary operator
//!   algebra
//! - [`pattern_rand`] - deterministic randomness (`degrade_by`,
//!   `sometimes_by`, `randcat`, ...)
//! - [`pattern_signal`] - continuous oscillators
//! - [`pattern_select`] - the `pick` selector family
//! - [`voice`] - the voice-data payload record and its merge rules
//! - [`controls`] - control-parameter constructors (`sound`, `gain`, ...)
//! - [`pattern_tonal`] - scale and chord resolution

pub mod controls;
pub mod pattern;
pub mod pattern_join;
pub mod pattern_ops;
pub mod pattern_rand;
pub mod pattern_select;
pub mod pattern_signal;
pub mod pattern_structure;
pub mod pattern_tonal;
pub mod voice;
