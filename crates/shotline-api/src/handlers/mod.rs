//! Request handlers.

pub mod continuity;
pub mod health;

pub use continuity::*;
pub use health::*;
