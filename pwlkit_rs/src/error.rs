use thiserror::Error;

use crate::{parser, scalar};

pub type PwlkitResult<T> = Result<T, PwlkitError>;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum PwlkitError {
    #[error("pwlkit_rs: scalar: {}", _0)]
    Scalar(scalar::Error),
    #[error("pwlkit_rs: parser: {}", _0)]
    Parse(parser::Error),
    #[error("pwlkit_rs: point index {} out of bounds", _0)]
    IndexOutOfBounds(usize),
}
