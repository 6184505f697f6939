mod direction;
pub mod indices;

pub use direction::{Axis, Direction};
