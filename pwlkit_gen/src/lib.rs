pub mod error;
pub mod generator;
pub mod saw;
pub mod square;
pub mod triangle;

pub use error::{PwlkitGenError, PwlkitGenResult};
pub use generator::{ApplyMode, Generated, Warning};
pub use saw::SawSpec;
pub use square::SquareSpec;
pub use triangle::TriangleSpec;
