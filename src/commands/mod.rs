//! Command implementations behind the stepmap binary.

pub mod analyze;

pub use analyze::{handle_analyze, AnalyzeConfig};
