pub mod generators;
pub mod prompt;
