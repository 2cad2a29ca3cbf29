//! Sliding-window range search over any granularity.
//!
//! Windows are contiguous runs of units inside the query universe. Each window is compared
//! on its own aggregates, so a window crossing verse or chapter boundaries gets fresh counts,
//! sums and values rather than its parents'.

use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use std::ops::Range;

use crate::models::{Hit, Unit, MAX_RANGE_LENGTH};
use crate::number_query::{find_units, Evaluator, NumberQuery};

/// Split sorted indices into maximal runs of consecutive values.
pub fn contiguous_runs(indices: &[usize]) -> Vec<Range<usize>> {
    let mut runs: Vec<Range<usize>> = Vec::new();
    for &i in indices {
        match runs.last_mut() {
            Some(run) if run.end == i => run.end = i + 1,
            _ => runs.push(i..i + 1),
        }
    }
    runs
}

/// Start positions of the `length`-unit windows that fit inside `run`.
fn window_starts(run: &Range<usize>, length: usize) -> Range<usize> {
    if length == 0 || run.len() < length {
        return run.start..run.start;
    }
    run.start..run.end + 1 - length
}

/// Every window of `length` consecutive units inside the runs of `candidates`, stride one.
pub fn generate_windows(candidates: &[usize], length: usize) -> Vec<Range<usize>> {
    contiguous_runs(candidates)
        .iter()
        .flat_map(|run| window_starts(run, length))
        .map(|start| start..start + length)
        .collect()
}

/// Number of windows `generate_windows` would produce.
pub fn window_count(candidates: &[usize], length: usize) -> usize {
    contiguous_runs(candidates)
        .iter()
        .map(|run| window_starts(run, length).len())
        .sum()
}

/// Find runs of units whose aggregates satisfy `query`.
///
/// The window length comes from a literal `UnitCount` criterion or one on the unit's own count
/// field.
/// Length one delegates to the singular finder, an explicit length is used alone, and an
/// unspecified length tries every length up to `max_length` (never above 29).
pub fn find_ranges(
    evaluator: &Evaluator<'_>,
    query: &NumberQuery,
    unit: Unit,
    candidates: &[usize],
    max_length: usize,
    show_progress: bool,
) -> Vec<Hit> {
    let lengths: Vec<usize> = match query.window_length(unit) {
        Some(1) => return find_units(evaluator, query, unit, candidates),
        Some(length) => vec![length],
        None => (1..=max_length.min(MAX_RANGE_LENGTH)).collect(),
    };

    let runs = contiguous_runs(candidates);
    let total: usize = lengths
        .iter()
        .map(|&length| runs.iter().map(|run| window_starts(run, length).len()).sum::<usize>())
        .sum();

    if show_progress {
        eprintln!(
            "Evaluating {} {} windows (lengths {}..={})...",
            total,
            unit,
            lengths.first().copied().unwrap_or(0),
            lengths.last().copied().unwrap_or(0)
        );
    }

    let progress = if show_progress {
        let pb = ProgressBar::new(total as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({per_sec})")
                .map(|style| style.progress_chars("#>-"))
                .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );
        Some(pb)
    } else {
        None
    };

    // Windows are generated lazily per length and run
    let hits: Vec<Hit> = lengths
        .par_iter()
        .flat_map(|&length| {
            runs.par_iter().flat_map(move |run| {
                window_starts(run, length).into_par_iter().map(move |start| start..start + length)
            })
        })
        .filter_map(|window| {
            if let Some(ref pb) = progress {
                pb.inc(1);
            }
            evaluator.compare(query, unit, window.clone()).then(|| Hit {
                unit,
                range: window,
                phrases: Vec::new(),
            })
        })
        .collect();

    if let Some(pb) = progress {
        pb.finish_with_message("Done");
    }

    tracing::debug!(%unit, windows = total, hits = hits.len(), "range search");
    hits
}
