//! `devlens.toml` loading and validation

mod devlens_toml;
mod error;

pub use devlens_toml::*;
pub use error::{ConfigError, Result};
