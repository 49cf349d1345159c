//! Application wiring for Faultline
//!
//! # Module Structure
//!
//! - `config`: Configuration structures
//! - `loader`: Configuration loading from files and environment
//! - `providers`: Provider resolution and assistant construction

pub mod config;
mod loader;
mod providers;

pub use config::AppConfig;
pub use loader::load_config;
pub use providers::{build_assistant, resolve_provider};
