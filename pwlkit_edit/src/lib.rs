pub mod error;
pub mod insertion;
pub mod repair;

/// Two effective times closer than this are considered equal.
pub const TIME_EPSILON: f64 = 1e-15;

pub use error::{PwlkitEditError, PwlkitEditResult};
pub use insertion::{suggest, Direction, InsertionConfig, Suggestion};
pub use repair::{
    analyze, apply, preview, DuplicateStrategy, Finding, FindingKind, RepairConfig,
    ReversalStrategy,
};
