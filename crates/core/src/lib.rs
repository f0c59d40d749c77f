pub mod config;
pub mod error;

pub use config::{ComplexityPolicy, ComputeConfig, Config, ServerConfig};
pub use error::*;
