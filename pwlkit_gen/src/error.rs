use thiserror::Error;

pub type PwlkitGenResult<T> = Result<T, PwlkitGenError>;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum PwlkitGenError {
    #[error("pwlkit_gen: invalid parameter: {}", _0)]
    InvalidParameter(String),
}
