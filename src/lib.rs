pub mod adapters;
pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use crate::config::CliConfig;

pub use crate::config::LauncherConfig;
pub use crate::core::launcher::{LaunchOptions, LaunchOutcome, Launcher};
pub use crate::core::registry::GeneratorRegistry;
pub use crate::utils::error::{LauncherError, Result};
