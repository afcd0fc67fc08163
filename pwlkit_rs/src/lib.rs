pub mod document;
pub mod error;
pub mod parser;
pub mod point;
pub mod scalar;

pub use document::{Document, ExportPolicy};
pub use error::{PwlkitError, PwlkitResult};
pub use parser::{parse, serialize};
pub use point::Point;
pub use scalar::Notation;
