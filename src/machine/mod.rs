//! Step function analysis.
//!
//! Recognition decides which declarations are steps, the trace interpreter
//! extracts their transitions, and the graph collects steps per state machine
//! type and propagates migration handlers along transitions.

pub mod condition;
pub mod graph;
pub mod method;
pub mod recognizer;
pub mod state_update;
mod trace;
mod transition_builder;

pub use condition::{ConditionBuilder, DEFAULT_MAX_CONDITION_LEN};
pub use graph::{StateMachineType, StepGraph};
pub use method::{MethodKind, ResolvedTargets, StepFunction, Transition, STOP, UNKNOWN};
pub use recognizer::{
    analyze_file, find_context_arg, find_result_arg, framework_qualifier, recognize,
    AnalysisOptions, FileContext, DEFAULT_FRAMEWORK_PACKAGE,
};
pub use state_update::StateUpdate;
