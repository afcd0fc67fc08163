use pwlkit_rs::{scalar, Document};

use crate::error::{PwlkitEditError, PwlkitEditResult};
use crate::TIME_EPSILON;

/// Snap targets, scaled by powers of ten around the computed value.
const LADDER_MULTIPLIERS: [f64; 4] = [1.0, 2.0, 2.5, 5.0];

/// Assumed step when a single-point document gives no gap to mirror.
const FALLBACK_STEP: f64 = 1e-6;

/// Snapped candidates must clear the bounds by this fraction of the gap.
const BOUND_MARGIN: f64 = 0.01;

/// Which side of the anchor the new point goes on. `Above` lands between the
/// anchor and its predecessor, `Below` between the anchor and its successor.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    Above,
    Below,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct InsertionConfig {
    /// A gap wider than this multiple of the local average spacing counts as
    /// sparse.
    pub sparse_gap_ratio: f64,
    /// Where in a sparse gap the suggestion lands, as a fraction from the
    /// lower bound.
    pub sparse_fraction: f64,
}

impl Default for InsertionConfig {
    fn default() -> Self {
        Self {
            sparse_gap_ratio: 4.0,
            sparse_fraction: 0.25,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Suggestion {
    pub time: f64,
    pub value: f64,
    pub time_text: String,
    pub value_text: String,
}

/// Suggest a time and value for a point inserted next to `anchor`.
///
/// The time is the midpoint of the bounding gap (or, in a sparse region, a
/// fixed fraction into it), snapped to the nearest 1/2/2.5/5 ladder value that
/// stays strictly inside the bounds. The value is the linear interpolation at
/// the suggested time, snapped the same way without crossing either bounding
/// value. At a sequence edge the adjacent gap is mirrored outward.
///
/// `NoRoom(a, b)` means the bounding pair `a`/`b` shares an effective time;
/// repairing the duplicates opens the gap. The one exception is `Above` a
/// first point already at time zero, reported as `NoRoom(0, 0)`: the axis
/// itself is the bound there, and no repair can make room before it.
pub fn suggest(
    doc: &Document,
    anchor: usize,
    direction: Direction,
    config: &InsertionConfig,
) -> PwlkitEditResult<Suggestion> {
    let times = doc.effective_times();
    if anchor >= times.len() {
        return Err(PwlkitEditError::IndexOutOfBounds(anchor));
    }
    let values: Vec<f64> = doc.points().iter().map(|p| p.value()).collect();
    let interval = bounding_interval(&times, &values, anchor, direction)?;

    let gap = interval.hi_time - interval.lo_time;
    let mut target = interval.lo_time + gap * 0.5;
    if let Some(average) = interval
        .pair
        .and_then(|(a, b)| local_average_spacing(&times, a, b))
    {
        if gap > config.sparse_gap_ratio * average {
            target = interval.lo_time + gap * config.sparse_fraction;
        }
    }
    let time = snap_within(target, interval.lo_time, interval.hi_time).unwrap_or(target);

    let value = interpolate(&interval, time);
    let (value_lo, value_hi) = if interval.lo_value <= interval.hi_value {
        (interval.lo_value, interval.hi_value)
    } else {
        (interval.hi_value, interval.lo_value)
    };
    let value = snap_within(value, value_lo, value_hi).unwrap_or(value);

    Ok(Suggestion {
        time,
        value,
        time_text: scalar::format_preferred(time),
        value_text: scalar::format_preferred(value),
    })
}

struct Interval {
    lo_time: f64,
    hi_time: f64,
    lo_value: f64,
    hi_value: f64,
    /// Point indices bounding the gap, when both exist in the document.
    pair: Option<(usize, usize)>,
}

fn bounding_interval(
    times: &[f64],
    values: &[f64],
    anchor: usize,
    direction: Direction,
) -> PwlkitEditResult<Interval> {
    let last = times.len() - 1;
    match direction {
        Direction::Above if anchor == 0 => {
            let gap = leading_gap(times);
            let lo = (times[0] - gap).max(0.0);
            if times[0] - lo <= TIME_EPSILON {
                // First point sits at time zero; nothing fits before it.
                return Err(PwlkitEditError::NoRoom(0, 0));
            }
            Ok(Interval {
                lo_time: lo,
                hi_time: times[0],
                lo_value: values[0],
                hi_value: values[0],
                pair: None,
            })
        }
        Direction::Above => pair_interval(times, values, anchor - 1, anchor),
        Direction::Below if anchor == last => {
            let gap = trailing_gap(times);
            Ok(Interval {
                lo_time: times[last],
                hi_time: times[last] + gap,
                lo_value: values[last],
                hi_value: values[last],
                pair: None,
            })
        }
        Direction::Below => pair_interval(times, values, anchor, anchor + 1),
    }
}

fn pair_interval(
    times: &[f64],
    values: &[f64],
    a: usize,
    b: usize,
) -> PwlkitEditResult<Interval> {
    if times[b] - times[a] <= TIME_EPSILON {
        return Err(PwlkitEditError::NoRoom(a, b));
    }
    Ok(Interval {
        lo_time: times[a],
        hi_time: times[b],
        lo_value: values[a],
        hi_value: values[b],
        pair: Some((a, b)),
    })
}

fn leading_gap(times: &[f64]) -> f64 {
    match times.len() {
        0 | 1 => FALLBACK_STEP,
        _ => {
            let gap = times[1] - times[0];
            if gap > 0.0 {
                gap
            } else {
                FALLBACK_STEP
            }
        }
    }
}

fn trailing_gap(times: &[f64]) -> f64 {
    let n = times.len();
    if n < 2 {
        return FALLBACK_STEP;
    }
    let gap = times[n - 1] - times[n - 2];
    if gap > 0.0 {
        gap
    } else {
        FALLBACK_STEP
    }
}

/// Mean of the positive gaps immediately outside the bounding pair.
fn local_average_spacing(times: &[f64], a: usize, b: usize) -> Option<f64> {
    let mut sum = 0.0;
    let mut count = 0;
    if a > 0 {
        let gap = times[a] - times[a - 1];
        if gap > 0.0 {
            sum += gap;
            count += 1;
        }
    }
    if b + 1 < times.len() {
        let gap = times[b + 1] - times[b];
        if gap > 0.0 {
            sum += gap;
            count += 1;
        }
    }
    if count == 0 {
        None
    } else {
        Some(sum / count as f64)
    }
}

fn interpolate(interval: &Interval, time: f64) -> f64 {
    let span = interval.hi_time - interval.lo_time;
    if span <= 0.0 || interval.lo_value == interval.hi_value {
        return interval.lo_value;
    }
    let fraction = (time - interval.lo_time) / span;
    interval.lo_value + fraction * (interval.hi_value - interval.lo_value)
}

/// The ladder candidate closest to `target` that lies strictly inside
/// `(lo, hi)` with at least [`BOUND_MARGIN`] of the span to either bound.
fn snap_within(target: f64, lo: f64, hi: f64) -> Option<f64> {
    let span = hi - lo;
    if span <= 0.0 || target == 0.0 {
        return None;
    }
    let base_exp = target.abs().log10().floor() as i32;
    let mut best: Option<f64> = None;
    for offset in -1..=1 {
        let exp = base_exp + offset;
        for mult in LADDER_MULTIPLIERS {
            // One correctly-rounded decimal conversion, so candidates land on
            // the exact doubles their spellings denote.
            let candidate: f64 = format!("{mult}e{exp}").parse().unwrap_or(f64::NAN);
            let candidate = candidate * target.signum();
            if !candidate.is_finite() {
                continue;
            }
            if candidate <= lo || candidate >= hi {
                continue;
            }
            if (candidate - lo).min(hi - candidate) <= span * BOUND_MARGIN {
                continue;
            }
            let better = match best {
                Some(current) => (candidate - target).abs() < (current - target).abs(),
                None => true,
            };
            if better {
                best = Some(candidate);
            }
        }
    }
    best
}
