// Knob and statistics definitions. //

use crate::internal::Int;

/// Size of the knobs[] array. Only knobs[0..2] are currently used.
pub const KNOBS: usize = 20;

/// Number of output statistics. Only stats[0..7] are currently used.
pub const STATS: usize = 20;

/// Dense node knob and output statistic. As a knob, nodes with more than
/// `max(16, knobs[DENSE] * sqrt(n))` entries are ordered last.
pub const DENSE: usize = 0;

/// Aggressive element absorption knob, nonzero to enable.
pub const AGGRESSIVE: usize = 1;

/// Memory defragmentation count output statistic.
pub const DEFRAG_COUNT: usize = 2;

/// Zero OK, > 0 warning or notice, < 0 error.
pub const STATUS: usize = 3;

/// Order of the graph that was ordered.
pub const INFO1: usize = 4;

/// Number of off-diagonal entries in the graph.
pub const INFO2: usize = 5;

/// Largest element degree seen during elimination.
pub const INFO3: usize = 6;

/// Knob settings used when none are given.
pub fn default_knobs() -> [f64; KNOBS] {
    let mut knobs = [0.0; KNOBS];
    knobs[DENSE] = 10.0;
    knobs[AGGRESSIVE] = 1.0; // Default to aggressive absorption.
    knobs
}

/// A zeroed statistics array.
pub fn empty_stats() -> [Int; STATS] {
    [0; STATS]
}
