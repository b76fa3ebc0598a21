//! Logic modules: translate high-level user choices into concrete values.
//!
//! # Modules
//!
//! - `resolver` - merges the config file with interactive prompts
//! - `packages` - package sets and install command text

pub mod packages;
pub mod resolver;
