//! HTTP endpoint handlers.

pub mod compute;
pub mod doc;
pub mod health;

pub use compute::compute;
pub use health::{health, metrics};
