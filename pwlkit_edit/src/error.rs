use thiserror::Error;

pub type PwlkitEditResult<T> = Result<T, PwlkitEditError>;

#[derive(Clone, Debug, Error, PartialEq)]
pub enum PwlkitEditError {
    #[error("pwlkit_edit: no room between points {} and {}", _0, _1)]
    NoRoom(usize, usize),
    #[error("pwlkit_edit: point index {} out of bounds", _0)]
    IndexOutOfBounds(usize),
    #[error("pwlkit_edit: min_time_gap must be positive, got {}", _0)]
    NonPositiveMinTimeGap(f64),
    #[error("pwlkit_edit: max_slew_rate must be positive, got {}", _0)]
    NonPositiveMaxSlewRate(f64),
}
