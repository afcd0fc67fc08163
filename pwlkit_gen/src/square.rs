use pwlkit_rs::Document;

use crate::error::{PwlkitGenError, PwlkitGenResult};
use crate::generator::{points_from_samples, ApplyMode, Generated, SampleBuffer, Warning};

/// Parameter bundle for a square waveform. Validated at construction, so
/// [`generate`] is infallible.
#[derive(Clone, Debug, PartialEq)]
pub struct SquareSpec {
    low_level: f64,
    high_level: f64,
    period: f64,
    duty: f64,
    cycles: u32,
    start_time: f64,
    edge_ppm: f64,
    start_high: bool,
    prefer_relative: bool,
    apply_mode: ApplyMode,
}

impl SquareSpec {
    pub fn new(
        low_level: f64,
        high_level: f64,
        period: f64,
        duty: f64,
        cycles: u32,
    ) -> PwlkitGenResult<Self> {
        let spec = Self {
            low_level,
            high_level,
            period,
            duty,
            cycles,
            start_time: 0.0,
            edge_ppm: 5.0,
            start_high: false,
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

    pub fn with_edge_ppm(mut self, edge_ppm: f64) -> PwlkitGenResult<Self> {
        self.edge_ppm = edge_ppm;
        self.validate()?;
        Ok(self)
    }

    pub fn with_start_high(mut self, start_high: bool) -> Self {
        self.start_high = start_high;
        self
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
        if !(self.duty > 0.0 && self.duty < 1.0) {
            return Err(invalid("duty must be strictly between 0 and 1"));
        }
        if self.cycles < 1 {
            return Err(invalid("cycles must be at least 1"));
        }
        if !(self.start_time >= 0.0) {
            return Err(invalid("start_time must be non-negative"));
        }
        if !(self.edge_ppm >= 0.0) {
            return Err(invalid("edge_ppm must be non-negative"));
        }
        Ok(())
    }
}

fn invalid(message: &str) -> PwlkitGenError {
    PwlkitGenError::InvalidParameter(message.to_string())
}

/// Generate the square waveform. Each cycle emits a plateau end and a ramp
/// end per stage; a zero-length edge collapses the ramp into a step pair at
/// the same timestamp.
pub fn generate(spec: &SquareSpec) -> Generated {
    let low = spec.low_level;
    let high = spec.high_level;
    let amplitude = high - low;

    let high_time = spec.period * spec.duty;
    let low_time = spec.period - high_time;
    let edge = spec.period * spec.edge_ppm * 1e-6;
    let (rise, fall) = if amplitude == 0.0 || edge == 0.0 {
        (0.0, 0.0)
    } else {
        (edge.min(low_time), edge.min(high_time))
    };
    let high_plateau = (high_time - fall).max(0.0);
    let low_plateau = (low_time - rise).max(0.0);

    let mut buf = SampleBuffer::new();
    let mut t = spec.start_time;
    let mut current = if spec.start_high { high } else { low };
    buf.push(t, current);

    for _ in 0..spec.cycles {
        if spec.start_high {
            (t, current) = stage(&mut buf, t, high_plateau, fall, current, high, low);
            (t, current) = stage(&mut buf, t, low_plateau, rise, current, low, high);
        } else {
            (t, current) = stage(&mut buf, t, low_plateau, rise, current, low, high);
            (t, current) = stage(&mut buf, t, high_plateau, fall, current, high, low);
        }
    }

    let mut warnings = Vec::new();
    if amplitude != 0.0 && edge > 0.0 {
        if low_time > 0.0 && edge > low_time + 1e-15 {
            warnings.push(Warning::RiseEdgeLimited);
        }
        if high_time > 0.0 && edge > high_time + 1e-15 {
            warnings.push(Warning::FallEdgeLimited);
        }
    }

    Generated {
        points: points_from_samples(buf.samples(), spec.prefer_relative),
        warnings,
    }
}

fn stage(
    buf: &mut SampleBuffer,
    start: f64,
    plateau: f64,
    ramp: f64,
    current: f64,
    plateau_value: f64,
    next_value: f64,
) -> (f64, f64) {
    let mut t = start;
    let mut current = current;
    if plateau > 0.0 {
        t += plateau;
        buf.push(t, plateau_value);
        current = plateau_value;
    }
    if next_value != current {
        t += ramp;
        buf.push(t, next_value);
        current = next_value;
    }
    (t, current)
}

/// Land the generated waveform in `doc` per the spec's apply mode.
pub fn apply(doc: &mut Document, spec: &SquareSpec) -> PwlkitGenResult<Vec<Warning>> {
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
