//! Small helpers shared by the CLI and the chef

pub mod logger;
pub mod text;
