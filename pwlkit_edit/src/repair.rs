use pwlkit_rs::{Document, Point};

use crate::error::{PwlkitEditError, PwlkitEditResult};
use crate::TIME_EPSILON;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FindingKind {
    DuplicateTimestamp,
    TimeReversal,
}

/// One detected anomaly, produced fresh by each [`analyze`] pass. The index
/// range is inclusive and covers the whole offending run, predecessor
/// included for reversals.
#[derive(Clone, Debug, PartialEq)]
pub struct Finding {
    pub kind: FindingKind,
    pub index_range: (usize, usize),
    pub effective_times: Vec<f64>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DuplicateStrategy {
    LeaveAsIs,
    /// Redistribute the run symmetrically around its shared timestamp.
    Center,
    /// Anchor the first member, push the rest later.
    NudgeForward,
    /// Anchor the last member, pull the rest earlier.
    NudgeBack,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReversalStrategy {
    Keep,
    /// Stable-sort the minimal window enclosing each reversal.
    Sort,
    /// Remove backward-stepping points until none remain.
    Drop,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RepairConfig {
    pub duplicate_strategy: DuplicateStrategy,
    pub reversal_strategy: ReversalStrategy,
    pub max_slew_rate: f64,
    pub min_time_gap: f64,
}

impl Default for RepairConfig {
    fn default() -> Self {
        Self {
            duplicate_strategy: DuplicateStrategy::Center,
            reversal_strategy: ReversalStrategy::Sort,
            max_slew_rate: 1e6,
            min_time_gap: 1e-12,
        }
    }
}

/// Scan the document's effective times once and report every duplicate run
/// and time reversal. Never fails; an empty document yields no findings.
pub fn analyze(doc: &Document) -> Vec<Finding> {
    let times = doc.effective_times();
    let mut findings: Vec<Finding> = duplicate_runs(&times)
        .into_iter()
        .map(|range| finding(FindingKind::DuplicateTimestamp, range, &times))
        .collect();
    findings.extend(
        reversal_runs(&times)
            .into_iter()
            .map(|range| finding(FindingKind::TimeReversal, range, &times)),
    );
    findings.sort_by_key(|f| f.index_range.0);
    findings
}

/// Compute the repaired document without touching the input. Reversals are
/// resolved first since they change ordering; duplicate runs are then
/// re-scanned on the intermediate result. A final forward pass re-checks
/// every gap adjacent to a moved point against `min_time_gap` and the slew
/// bound, pushing later points later when the two collide.
///
/// The `findings` argument scopes `Sort`, whose windows must come from the
/// ordering being repaired. `Drop` and the duplicate phase re-scan the whole
/// document instead: removal and reordering invalidate the original indices,
/// and iterating the scan is what lets both run to a fixpoint.
pub fn preview(
    doc: &Document,
    findings: &[Finding],
    config: &RepairConfig,
) -> PwlkitEditResult<Document> {
    if config.min_time_gap <= 0.0 {
        return Err(PwlkitEditError::NonPositiveMinTimeGap(config.min_time_gap));
    }
    if config.max_slew_rate <= 0.0 {
        return Err(PwlkitEditError::NonPositiveMaxSlewRate(config.max_slew_rate));
    }

    let mut points: Vec<Point> = doc.points().to_vec();
    let mut times = doc.effective_times();
    // Which positions had their time, or their predecessor, disturbed. Only
    // these are re-derived at the end; everything else keeps its exact
    // stored time, so identity strategies really are identities.
    let mut changed = vec![false; times.len()];

    match config.reversal_strategy {
        ReversalStrategy::Keep => {}
        ReversalStrategy::Sort => {
            let windows = findings
                .iter()
                .filter(|f| f.kind == FindingKind::TimeReversal)
                .filter_map(|f| clamp_range(f.index_range, times.len()))
                .map(|range| expand_window(&times, range));
            for (start, end) in merge_windows(windows.collect()) {
                let mut order: Vec<usize> = (start..=end).collect();
                order.sort_by(|&a, &b| times[a].total_cmp(&times[b]));
                let sorted_points: Vec<Point> =
                    order.iter().map(|&i| points[i].clone()).collect();
                let sorted_times: Vec<f64> = order.iter().map(|&i| times[i]).collect();
                for (k, &time) in sorted_times.iter().enumerate() {
                    if time != times[start + k] {
                        changed[start + k] = true;
                    }
                }
                points.splice(start..=end, sorted_points);
                times.splice(start..=end, sorted_times);
            }
        }
        ReversalStrategy::Drop => loop {
            let offenders: Vec<usize> = (1..times.len())
                .filter(|&i| times[i] + TIME_EPSILON < times[i - 1])
                .collect();
            if offenders.is_empty() {
                break;
            }
            for &i in offenders.iter().rev() {
                points.remove(i);
                times.remove(i);
                changed.remove(i);
                // The survivor sliding into this slot has a new predecessor.
                if i < changed.len() {
                    changed[i] = true;
                }
            }
        },
    }

    let values: Vec<f64> = points.iter().map(|p| p.value()).collect();
    let mut moved = vec![false; points.len()];

    if config.duplicate_strategy != DuplicateStrategy::LeaveAsIs {
        for (start, end) in duplicate_runs(&times) {
            let max_step = (start..end)
                .map(|i| (values[i + 1] - values[i]).abs())
                .fold(0.0, f64::max);
            let spacing = config.min_time_gap.max(max_step / config.max_slew_rate);
            let span = spacing * (end - start) as f64;
            let origin = times[start];
            let first = match config.duplicate_strategy {
                DuplicateStrategy::Center => origin - span / 2.0,
                DuplicateStrategy::NudgeForward => origin,
                DuplicateStrategy::NudgeBack => origin - span,
                DuplicateStrategy::LeaveAsIs => unreachable!(),
            };
            for (k, i) in (start..=end).enumerate() {
                let t = first + spacing * k as f64;
                if t != times[i] {
                    times[i] = t;
                    moved[i] = true;
                    changed[i] = true;
                }
            }
        }
    }

    // Moved points may now crowd their neighbors; defer strictly forward.
    for i in 1..times.len() {
        if !(moved[i - 1] || moved[i]) {
            continue;
        }
        let needed = config
            .min_time_gap
            .max((values[i] - values[i - 1]).abs() / config.max_slew_rate);
        let floor = times[i - 1] + needed;
        if times[i] < floor {
            times[i] = floor;
            moved[i] = true;
            changed[i] = true;
        }
    }

    let mut candidate = Document::from_points(rebuild(points, &times, &changed));
    candidate.set_export_policy(doc.export_policy());
    Ok(candidate)
}

/// Atomically replace the document's points with the previewed candidate's.
pub fn apply(doc: &mut Document, candidate: Document) {
    doc.replace_points(candidate.into_points());
}

fn finding(kind: FindingKind, range: (usize, usize), times: &[f64]) -> Finding {
    Finding {
        kind,
        index_range: range,
        effective_times: times[range.0..=range.1].to_vec(),
    }
}

/// Maximal runs of two or more adjacent points with equal effective time.
fn duplicate_runs(times: &[f64]) -> Vec<(usize, usize)> {
    let mut runs = Vec::new();
    let mut start = None;
    for i in 1..times.len() {
        if (times[i] - times[i - 1]).abs() <= TIME_EPSILON {
            start.get_or_insert(i - 1);
        } else if let Some(s) = start.take() {
            runs.push((s, i - 1));
        }
    }
    if let Some(s) = start {
        runs.push((s, times.len() - 1));
    }
    runs
}

/// Maximal runs of consecutive backward steps, predecessor included.
fn reversal_runs(times: &[f64]) -> Vec<(usize, usize)> {
    let mut runs = Vec::new();
    let mut start = None;
    for i in 1..times.len() {
        if times[i] + TIME_EPSILON < times[i - 1] {
            start.get_or_insert(i - 1);
        } else if let Some(s) = start.take() {
            runs.push((s, i - 1));
        }
    }
    if let Some(s) = start {
        runs.push((s, times.len() - 1));
    }
    runs
}

fn clamp_range(range: (usize, usize), len: usize) -> Option<(usize, usize)> {
    if len == 0 || range.0 >= len {
        return None;
    }
    Some((range.0, range.1.min(len - 1)))
}

/// Grow a reversal window until sorting it alone restores global order:
/// predecessors above the window minimum and successors below the window
/// maximum are pulled in, to a fixpoint.
fn expand_window(times: &[f64], range: (usize, usize)) -> (usize, usize) {
    let (mut start, mut end) = range;
    loop {
        let window = &times[start..=end];
        let min = window.iter().copied().fold(f64::INFINITY, f64::min);
        let max = window.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let mut grew = false;
        if start > 0 && times[start - 1] > min {
            start -= 1;
            grew = true;
        }
        if end + 1 < times.len() && times[end + 1] < max {
            end += 1;
            grew = true;
        }
        if !grew {
            return (start, end);
        }
    }
}

fn merge_windows(mut windows: Vec<(usize, usize)>) -> Vec<(usize, usize)> {
    windows.sort_by_key(|w| w.0);
    let mut merged: Vec<(usize, usize)> = Vec::with_capacity(windows.len());
    for window in windows {
        match merged.last_mut() {
            Some(last) if window.0 <= last.1 + 1 => last.1 = last.1.max(window.1),
            _ => merged.push(window),
        }
    }
    merged
}

/// Re-derive the stored time of every point whose effective time, or whose
/// predecessor's, was disturbed by this repair. Everything else keeps its
/// exact stored time and cached text, so untouched regions stay
/// byte-identical on export and kept reversals keep their negative deltas.
fn rebuild(mut points: Vec<Point>, times: &[f64], changed: &[bool]) -> Vec<Point> {
    for (i, point) in points.iter_mut().enumerate() {
        if !(changed[i] || (i > 0 && changed[i - 1])) {
            continue;
        }
        let relative = i > 0 && point.time_is_relative();
        let stored = if relative {
            times[i] - times[i - 1]
        } else {
            times[i]
        };
        if stored != point.time() || relative != point.time_is_relative() {
            point.rebase(stored, relative);
        }
    }
    points
}

#[cfg(test)]
mod test {
    use super::{
        analyze, apply, preview, DuplicateStrategy, FindingKind, RepairConfig, ReversalStrategy,
    };
    use crate::error::PwlkitEditError;
    use pwlkit_rs::{parser, Document, Point};

    fn setup() -> Document {
        parser::parse("0 0\n1m 1\n1m 1\n2m 2\n").unwrap()
    }

    fn config(
        duplicate_strategy: DuplicateStrategy,
        reversal_strategy: ReversalStrategy,
    ) -> RepairConfig {
        RepairConfig {
            duplicate_strategy,
            reversal_strategy,
            max_slew_rate: 1e6,
            min_time_gap: 1e-4,
        }
    }

    fn assert_times_close(doc: &Document, expected: &[f64]) {
        let times = doc.effective_times();
        assert_eq!(times.len(), expected.len(), "{times:?} vs {expected:?}");
        for (a, b) in times.iter().zip(expected) {
            assert!((a - b).abs() <= 1e-12, "{times:?} vs {expected:?}");
        }
    }

    #[test]
    fn test_analyze_reports_duplicate_run() {
        let findings = analyze(&setup());
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].kind, FindingKind::DuplicateTimestamp);
        assert_eq!(findings[0].index_range, (1, 2));
        assert_eq!(findings[0].effective_times, vec![1e-3, 1e-3]);
    }

    #[test]
    fn test_analyze_reports_reversal_run() {
        let doc = parser::parse("0 0\n5m 1\n3m 2\n2m 3\n8m 4\n").unwrap();
        let findings = analyze(&doc);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].kind, FindingKind::TimeReversal);
        assert_eq!(findings[0].index_range, (1, 3));
    }

    #[test]
    fn test_analyze_empty_document() {
        assert!(analyze(&Document::new()).is_empty());
    }

    #[test]
    fn test_center_spreads_around_shared_timestamp() {
        let doc = setup();
        let findings = analyze(&doc);
        let cfg = config(DuplicateStrategy::Center, ReversalStrategy::Keep);
        let candidate = preview(&doc, &findings, &cfg).unwrap();
        assert_times_close(&candidate, &[0.0, 0.95e-3, 1.05e-3, 2e-3]);
        let values: Vec<f64> = candidate.points().iter().map(|p| p.value()).collect();
        assert_eq!(values, vec![0.0, 1.0, 1.0, 2.0]);
        // The input document is untouched.
        assert_eq!(doc.effective_times(), vec![0.0, 1e-3, 1e-3, 2e-3]);
        assert_eq!(parser::serialize(&doc), "0 0\n1m 1\n1m 1\n2m 2\n");
    }

    #[test]
    fn test_nudge_forward_and_back() {
        let doc = parser::parse("0 0\n1m 0\n1m 0\n").unwrap();
        let findings = analyze(&doc);
        let forward = config(DuplicateStrategy::NudgeForward, ReversalStrategy::Keep);
        let candidate = preview(&doc, &findings, &forward).unwrap();
        assert_times_close(&candidate, &[0.0, 1e-3, 1.1e-3]);

        let back = config(DuplicateStrategy::NudgeBack, ReversalStrategy::Keep);
        let candidate = preview(&doc, &findings, &back).unwrap();
        assert_times_close(&candidate, &[0.0, 0.9e-3, 1e-3]);
    }

    #[test]
    fn test_slew_bound_widens_spacing() {
        let doc = parser::parse("0 0\n1m 0\n1m 1\n").unwrap();
        let findings = analyze(&doc);
        let mut cfg = config(DuplicateStrategy::NudgeForward, ReversalStrategy::Keep);
        cfg.max_slew_rate = 1e3;
        // A 1 V step at 1 kV/s needs a full millisecond, well past min_time_gap.
        let candidate = preview(&doc, &findings, &cfg).unwrap();
        assert_times_close(&candidate, &[0.0, 1e-3, 2e-3]);
    }

    #[test]
    fn test_cascade_defers_later_points() {
        let doc = parser::parse("0 0\n1m 0\n1m 5\n1.05m 5\n").unwrap();
        let findings = analyze(&doc);
        let mut cfg = config(DuplicateStrategy::Center, ReversalStrategy::Keep);
        cfg.max_slew_rate = 1e4;
        let candidate = preview(&doc, &findings, &cfg).unwrap();
        // The spread run ends at 1.25m, so the untouched 1.05m point is
        // deferred to 1.35m rather than stepping backwards.
        assert_times_close(&candidate, &[0.0, 0.75e-3, 1.25e-3, 1.35e-3]);
    }

    #[test]
    fn test_sort_restores_order_in_minimal_window() {
        let doc = parser::parse("0 0\n5m 1\n6m 2\n1m 3\n2m 4\n8m 5\n").unwrap();
        let findings = analyze(&doc);
        let cfg = config(DuplicateStrategy::LeaveAsIs, ReversalStrategy::Sort);
        let candidate = preview(&doc, &findings, &cfg).unwrap();
        assert_times_close(&candidate, &[0.0, 1e-3, 2e-3, 5e-3, 6e-3, 8e-3]);
        let values: Vec<f64> = candidate.points().iter().map(|p| p.value()).collect();
        assert_eq!(values, vec![0.0, 3.0, 4.0, 1.0, 2.0, 5.0]);
    }

    #[test]
    fn test_drop_iterates_until_order_holds() {
        let doc = parser::parse("0 0\n9m 1\n3m 2\n8m 3\n").unwrap();
        let findings = analyze(&doc);
        let cfg = config(DuplicateStrategy::LeaveAsIs, ReversalStrategy::Drop);
        let candidate = preview(&doc, &findings, &cfg).unwrap();
        assert_times_close(&candidate, &[0.0, 9e-3]);
        let values: Vec<f64> = candidate.points().iter().map(|p| p.value()).collect();
        assert_eq!(values, vec![0.0, 1.0]);
    }

    #[test]
    fn test_identity_strategies_preserve_bytes() {
        let doc = setup();
        let findings = analyze(&doc);
        let cfg = config(DuplicateStrategy::LeaveAsIs, ReversalStrategy::Keep);
        let candidate = preview(&doc, &findings, &cfg).unwrap();
        assert_eq!(parser::serialize(&candidate), parser::serialize(&doc));
    }

    #[test]
    fn test_keep_preserves_negative_relative_delta() {
        let doc = Document::from_points(vec![
            Point::absolute(0.0, 0.0),
            Point::absolute(5e-3, 1.0),
            Point::relative(-3e-3, 2.0),
        ]);
        let findings = analyze(&doc);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].kind, FindingKind::TimeReversal);
        let cfg = config(DuplicateStrategy::LeaveAsIs, ReversalStrategy::Keep);
        let candidate = preview(&doc, &findings, &cfg).unwrap();
        // Keeping the reversal means keeping it: the backward segment and its
        // negative stored delta survive untouched.
        assert_eq!(candidate.effective_times(), vec![0.0, 5e-3, 2e-3]);
        assert_eq!(candidate.points()[2].time(), -3e-3);
        assert!(candidate.points()[2].time_is_relative());
        assert_eq!(candidate.points(), doc.points());
    }

    #[test]
    fn test_relative_deltas_are_rederived() {
        let doc = parser::parse("0 0\n+1m 1\n+0 1\n+1m 2\n").unwrap();
        let findings = analyze(&doc);
        let cfg = config(DuplicateStrategy::Center, ReversalStrategy::Keep);
        let candidate = preview(&doc, &findings, &cfg).unwrap();
        assert_times_close(&candidate, &[0.0, 0.95e-3, 1.05e-3, 2e-3]);
        for (i, point) in candidate.points().iter().enumerate() {
            assert_eq!(point.time_is_relative(), i > 0);
        }
        // The untouched first point keeps its exact bytes.
        assert!(parser::serialize(&candidate).starts_with("0 0\n"));
    }

    #[test]
    fn test_nonpositive_thresholds_are_rejected() {
        let doc = setup();
        let findings = analyze(&doc);
        let mut cfg = config(DuplicateStrategy::Center, ReversalStrategy::Keep);
        cfg.min_time_gap = 0.0;
        assert!(matches!(
            preview(&doc, &findings, &cfg),
            Err(PwlkitEditError::NonPositiveMinTimeGap(_))
        ));
        let mut cfg = config(DuplicateStrategy::Center, ReversalStrategy::Keep);
        cfg.max_slew_rate = -1.0;
        assert!(matches!(
            preview(&doc, &findings, &cfg),
            Err(PwlkitEditError::NonPositiveMaxSlewRate(_))
        ));
    }

    #[test]
    fn test_repair_resolves_all_findings() {
        let doc = parser::parse("0 0\n5m 1\n3m 2\n3m 2\n7m 3\n").unwrap();
        let findings = analyze(&doc);
        let cfg = config(DuplicateStrategy::Center, ReversalStrategy::Sort);
        let candidate = preview(&doc, &findings, &cfg).unwrap();
        assert!(analyze(&candidate).is_empty());
    }

    #[test]
    fn test_apply_replaces_points() {
        let mut doc = setup();
        let findings = analyze(&doc);
        let cfg = config(DuplicateStrategy::Center, ReversalStrategy::Keep);
        let candidate = preview(&doc, &findings, &cfg).unwrap();
        let expected = candidate.effective_times();
        apply(&mut doc, candidate);
        assert_eq!(doc.effective_times(), expected);
        assert!(analyze(&doc).is_empty());
    }
}
