use std::fmt;

use pwlkit_rs::Point;

const TIME_MERGE_EPSILON: f64 = 1e-15;
const VALUE_MERGE_EPSILON: f64 = 1e-12;

/// How a generated waveform lands in a document.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ApplyMode {
    /// Swap out the document's points, starting at the spec's start time.
    #[default]
    Replace,
    /// Regenerate from the document's end time and extend.
    Append,
}

/// A constrained adjustment the generator had to make. Every clamp that
/// changes the output shape is reported; nothing is adjusted silently.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Warning {
    RiseEdgeLimited,
    FallEdgeLimited,
    RampFractionReduced,
    ResetEdgeLimited,
    ResetHoldCollapsed,
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Warning::RiseEdgeLimited => {
                "rising edge duration limited by the available low interval"
            }
            Warning::FallEdgeLimited => {
                "falling edge duration limited by the available high interval"
            }
            Warning::RampFractionReduced => "ramp fraction reduced to leave time for the reset edge",
            Warning::ResetEdgeLimited => {
                "reset edge duration limited by the available reset interval"
            }
            Warning::ResetHoldCollapsed => {
                "reset interval collapsed; waveform stays high until the cycle boundary"
            }
        };
        write!(f, "{text}")
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Generated {
    pub points: Vec<Point>,
    pub warnings: Vec<Warning>,
}

/// Collects `(time, value)` samples while keeping timestamps monotone. A
/// candidate time before the running maximum is clamped onto it; a sample
/// that duplicates the previous one is dropped. Same-time samples with
/// different values stay, forming step pairs.
#[derive(Debug, Default)]
pub(crate) struct SampleBuffer {
    samples: Vec<(f64, f64)>,
}

impl SampleBuffer {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&mut self, time: f64, value: f64) {
        let mut time = time;
        if let Some(&(last_time, last_value)) = self.samples.last() {
            if time < last_time {
                time = last_time;
            }
            if (time - last_time).abs() <= TIME_MERGE_EPSILON {
                time = last_time;
                if (value - last_value).abs() <= VALUE_MERGE_EPSILON {
                    return;
                }
            }
        }
        self.samples.push((time, value));
    }

    pub(crate) fn samples(&self) -> &[(f64, f64)] {
        &self.samples
    }
}

/// Convert monotone samples into points. With `prefer_relative`, every point
/// after the first stores the delta from its predecessor.
pub(crate) fn points_from_samples(samples: &[(f64, f64)], prefer_relative: bool) -> Vec<Point> {
    let mut points = Vec::with_capacity(samples.len());
    let mut previous = 0.0;
    for (index, &(time, value)) in samples.iter().enumerate() {
        if index == 0 || !prefer_relative {
            points.push(Point::absolute(time, value));
        } else {
            points.push(Point::relative((time - previous).max(0.0), value));
        }
        previous = time;
    }
    points
}
