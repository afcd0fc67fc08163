use pwlkit_rs::Document;

use crate::error::{PwlkitGenError, PwlkitGenResult};
use crate::generator::{points_from_samples, ApplyMode, Generated, SampleBuffer, Warning};

/// Parameter bundle for a sawtooth waveform. `ramp_fraction` sets how much of
/// the period the rising ramp occupies; what remains is split into a
/// `reset_edge_ppm`-controlled drop and a flat low hold.
#[derive(Clone, Debug, PartialEq)]
pub struct SawSpec {
    low_level: f64,
    high_level: f64,
    period: f64,
    ramp_fraction: f64,
    cycles: u32,
    start_time: f64,
    reset_edge_ppm: f64,
    prefer_relative: bool,
    apply_mode: ApplyMode,
}

impl SawSpec {
    pub fn new(
        low_level: f64,
        high_level: f64,
        period: f64,
        ramp_fraction: f64,
        cycles: u32,
    ) -> PwlkitGenResult<Self> {
        let spec = Self {
            low_level,
            high_level,
            period,
            ramp_fraction,
            cycles,
            start_time: 0.0,
            reset_edge_ppm: 5.0,
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

    pub fn with_reset_edge_ppm(mut self, reset_edge_ppm: f64) -> PwlkitGenResult<Self> {
        self.reset_edge_ppm = reset_edge_ppm;
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
        if !(self.ramp_fraction >= 0.0 && self.ramp_fraction <= 1.0) {
            return Err(invalid("ramp_fraction must be between 0 and 1"));
        }
        if self.cycles < 1 {
            return Err(invalid("cycles must be at least 1"));
        }
        if !(self.start_time >= 0.0) {
            return Err(invalid("start_time must be non-negative"));
        }
        if !(self.reset_edge_ppm >= 0.0) {
            return Err(invalid("reset_edge_ppm must be non-negative"));
        }
        Ok(())
    }
}

fn invalid(message: &str) -> PwlkitGenError {
    PwlkitGenError::InvalidParameter(message.to_string())
}

/// Generate the sawtooth waveform. A full-period ramp leaves the reset to the
/// next cycle boundary, where it becomes a step pair.
pub fn generate(spec: &SawSpec) -> Generated {
    let low = spec.low_level;
    let high = spec.high_level;
    let amplitude = high - low;

    let edge_fraction = spec.reset_edge_ppm * 1e-6;
    let max_ramp_fraction = if edge_fraction > 0.0 && amplitude != 0.0 {
        (1.0 - edge_fraction).max(0.0)
    } else {
        1.0
    };
    let mut warnings = Vec::new();
    let ramp_fraction = if spec.ramp_fraction > max_ramp_fraction {
        if amplitude != 0.0 {
            warnings.push(Warning::RampFractionReduced);
        }
        max_ramp_fraction
    } else {
        spec.ramp_fraction
    };

    let ramp = spec.period * ramp_fraction;
    let reset_budget = (spec.period - ramp).max(0.0);
    let requested_edge = edge_fraction * spec.period;
    let effective_edge = if reset_budget > 0.0 && amplitude != 0.0 {
        requested_edge.min(reset_budget)
    } else {
        0.0
    };

    let mut buf = SampleBuffer::new();
    buf.push(spec.start_time, low);

    for cycle in 0..spec.cycles {
        let cycle_start = spec.start_time + cycle as f64 * spec.period;
        buf.push(cycle_start, low);
        if amplitude != 0.0 {
            buf.push(cycle_start + ramp, high);
        }
        if reset_budget > 0.0 {
            if amplitude != 0.0 {
                buf.push(cycle_start + ramp + effective_edge, low);
            }
            buf.push(cycle_start + spec.period, low);
        }
    }

    if amplitude != 0.0 {
        if reset_budget <= 0.0 {
            warnings.push(Warning::ResetHoldCollapsed);
        } else if edge_fraction > 0.0 && effective_edge + 1e-15 < requested_edge {
            warnings.push(Warning::ResetEdgeLimited);
        }
    }

    Generated {
        points: points_from_samples(buf.samples(), spec.prefer_relative),
        warnings,
    }
}

/// Land the generated waveform in `doc` per the spec's apply mode.
pub fn apply(doc: &mut Document, spec: &SawSpec) -> PwlkitGenResult<Vec<Warning>> {
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
