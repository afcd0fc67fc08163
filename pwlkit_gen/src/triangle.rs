use pwlkit_rs::Document;

use crate::error::{PwlkitGenError, PwlkitGenResult};
use crate::generator::{points_from_samples, ApplyMode, Generated, SampleBuffer, Warning};

/// Parameter bundle for a triangle waveform. `symmetry` is the rising
/// fraction of the period and must be strictly inside (0, 1); a degenerate
/// zero-length ramp is a saw, not a triangle.
#[derive(Clone, Debug, PartialEq)]
pub struct TriangleSpec {
    low_level: f64,
    high_level: f64,
    period: f64,
    symmetry: f64,
    cycles: u32,
    start_time: f64,
    prefer_relative: bool,
    apply_mode: ApplyMode,
}

impl TriangleSpec {
    pub fn new(
        low_level: f64,
        high_level: f64,
        period: f64,
        symmetry: f64,
        cycles: u32,
    ) -> PwlkitGenResult<Self> {
        let spec = Self {
            low_level,
            high_level,
            period,
            symmetry,
            cycles,
            start_time: 0.0,
            prefer_relative: false,
            apply_mode: ApplyMode::default(),
        };
        spec.validate()?;
        Ok(spec)
    }

    pub fn with_start_time(mut self, start_time: f64) -> PwlkitGenResult<Self> {
        self.start_time = start_time;
        self.validate()?;
        Ok(self)
    }

    pub fn with_prefer_relative(mut self, prefer_relative: bool) -> Self {
        self.prefer_relative = prefer_relative;
        self
    }

    pub fn with_apply_mode(mut self, apply_mode: ApplyMode) -> Self {
        self.apply_mode = apply_mode;
        self
    }

    fn validate(&self) -> PwlkitGenResult<()> {
        if !(self.period > 0.0) {
            return Err(invalid("period must be positive"));
        }
        if !(self.symmetry > 0.0 && self.symmetry < 1.0) {
            return Err(invalid("symmetry must be strictly between 0 and 1"));
        }
        if self.cycles < 1 {
            return Err(invalid("cycles must be at least 1"));
        }
        if !(self.start_time >= 0.0) {
            return Err(invalid("start_time must be non-negative"));
        }
        Ok(())
    }
}

fn invalid(message: &str) -> PwlkitGenError {
    PwlkitGenError::InvalidParameter(message.to_string())
}

/// Generate the triangle waveform: two linear segments per cycle, rising for
/// `symmetry × period` and falling for the remainder.
pub fn generate(spec: &TriangleSpec) -> Generated {
    let low = spec.low_level;
    let high = spec.high_level;
    let rise = spec.period * spec.symmetry;

    let mut buf = SampleBuffer::new();
    buf.push(spec.start_time, low);

    for cycle in 0..spec.cycles {
        let cycle_start = spec.start_time + cycle as f64 * spec.period;
        buf.push(cycle_start, low);
        if high != low {
            buf.push(cycle_start + rise, high);
        }
        buf.push(cycle_start + spec.period, low);
    }

    Generated {
        points: points_from_samples(buf.samples(), spec.prefer_relative),
        warnings: Vec::new(),
    }
}

/// Land the generated waveform in `doc` per the spec's apply mode.
pub fn apply(doc: &mut Document, spec: &TriangleSpec) -> PwlkitGenResult<Vec<Warning>> {
    match spec.apply_mode {
        ApplyMode::Replace => {
            let generated = generate(spec);
            doc.replace_points(generated.points);
            Ok(generated.warnings)
        }
        ApplyMode::Append => {
            let spec = spec.clone().with_start_time(doc.end_time())?;
            let generated = generate(&spec);
            doc.extend_points(generated.points);
            Ok(generated.warnings)
        }
    }
}
