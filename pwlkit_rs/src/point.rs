use crate::scalar::{self, Notation};

/// One waveform sample. The stored `time` is either absolute or a delta from
/// the previous point's effective time, per `time_is_relative`. The exact
/// token text last parsed for each field is cached so untouched points
/// serialize byte-identically; every numeric write clears the cache while the
/// detected notation survives, so reformatting keeps the point's style.
#[derive(Clone, Debug, PartialEq)]
pub struct Point {
    time: f64,
    value: f64,
    time_is_relative: bool,
    time_text: Option<String>,
    value_text: Option<String>,
    time_notation: Notation,
    value_notation: Notation,
}

impl Point {
    pub fn absolute(time: f64, value: f64) -> Self {
        Self {
            time,
            value,
            time_is_relative: false,
            time_text: None,
            value_text: None,
            time_notation: Notation::SiPrefixed,
            value_notation: Notation::SiPrefixed,
        }
    }

    pub fn relative(delta: f64, value: f64) -> Self {
        Self {
            time: delta,
            time_is_relative: true,
            ..Self::absolute(0.0, value)
        }
    }

    #[allow(clippy::too_many_arguments)]
    pub(crate) fn from_parsed(
        time: f64,
        value: f64,
        time_is_relative: bool,
        time_text: String,
        value_text: String,
        time_notation: Notation,
        value_notation: Notation,
    ) -> Self {
        Self {
            time,
            value,
            time_is_relative,
            time_text: Some(time_text),
            value_text: Some(value_text),
            time_notation,
            value_notation,
        }
    }

    pub fn time(&self) -> f64 {
        self.time
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn time_is_relative(&self) -> bool {
        self.time_is_relative
    }

    pub fn time_text(&self) -> Option<&str> {
        self.time_text.as_deref()
    }

    pub fn value_text(&self) -> Option<&str> {
        self.value_text.as_deref()
    }

    pub fn time_notation(&self) -> Notation {
        self.time_notation
    }

    pub fn value_notation(&self) -> Notation {
        self.value_notation
    }

    pub fn set_time(&mut self, time: f64) {
        self.time = time;
        self.time_text = None;
    }

    pub fn set_value(&mut self, value: f64) {
        self.value = value;
        self.value_text = None;
    }

    /// Rewrite the stored time onto a new base, re-deriving the cached text
    /// through the codec in the point's existing notation.
    pub fn rebase(&mut self, time: f64, time_is_relative: bool) {
        self.time = time;
        self.time_is_relative = time_is_relative;
        let mut text = scalar::format(time, self.time_notation);
        if time_is_relative {
            text.insert(0, '+');
        }
        self.time_text = Some(text);
    }
}
