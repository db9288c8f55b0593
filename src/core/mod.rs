pub mod features;
pub mod ini;
pub mod installer;
pub mod json_settings;
pub mod launcher;
pub mod process;
pub mod registry;

pub use crate::domain::model::{LaunchContext, LaunchRequest, LaunchSpec};
pub use crate::domain::ports::{Desktop, Generator};
pub use crate::utils::error::Result;
