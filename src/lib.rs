//! Static analysis of Go state machines built on a step-function framework.
//!
//! Source files are parsed into a small syntax tree, step functions are
//! recognized by their signatures, their bodies are traced symbolically to
//! find transitions, and the resulting graph is rendered as PlantUML.

pub mod analyzers;
pub mod cli;
pub mod commands;
pub mod config;
pub mod core;
pub mod io;
pub mod machine;

pub use crate::analyzers::{Frontend, GoFrontend};
pub use crate::config::StepmapConfig;
pub use crate::core::{Error, Result, SourceFile};
pub use crate::machine::{
    analyze_file, AnalysisOptions, MethodKind, StateMachineType, StepFunction, StepGraph,
    Transition,
};
