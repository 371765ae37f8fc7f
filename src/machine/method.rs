//! Step functions and their transitions.

use std::collections::BTreeSet;

use super::condition::DEFAULT_MAX_CONDITION_LEN;

/// Destination of a transition that terminates the state machine.
pub const STOP: &str = "<stop>";
/// Destination of a transition no vocabulary rule could resolve.
pub const UNKNOWN: &str = "<unknown>";

/// Capability tier of a recognized function, ordered so that each tier
/// includes the ones before it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MethodKind {
    #[default]
    PlainStep,
    /// `GetInitStateFor` / `GetSubroutineInitState`
    Initializer,
    Construction,
    Initialization,
    Execution,
    Migration,
}

impl MethodKind {
    pub fn has_state_update(self) -> bool {
        self >= Self::Initialization
    }

    pub fn has_context_arg(self) -> bool {
        self >= Self::Construction
    }

    /// Kind bound by a framework context parameter type name.
    pub fn from_context_type(type_name: &str) -> Option<Self> {
        match type_name {
            "InitializationContext" => Some(Self::Initialization),
            "ExecutionContext" => Some(Self::Execution),
            "MigrationContext" => Some(Self::Migration),
            "ConstructionContext" => Some(Self::Construction),
            _ => None,
        }
    }
}

/// Targets of a transition resolved by name during propagation.
///
/// These are caches keyed by step name and are recomputed on every run.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ResolvedTargets {
    pub transition_to: Option<String>,
    pub hidden_prop_to: Option<String>,
    pub migration_to: Option<String>,
}

/// One exit edge of a step.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Transition {
    pub condition: String,
    pub operation: String,
    /// Empty for a repeat, [`STOP`] for termination.
    pub destination: String,
    pub migration: String,
    pub inherit_migration: bool,
    /// Step that receives this transition's settings after a subroutine returns.
    pub hidden_propagate: String,
    pub resolved: ResolvedTargets,
}

impl Transition {
    pub fn to(destination: impl Into<String>) -> Self {
        Self {
            destination: destination.into(),
            inherit_migration: true,
            ..Self::default()
        }
    }

    pub fn is_repeat(&self) -> bool {
        self.destination.is_empty()
    }

    pub fn is_stop(&self) -> bool {
        self.destination == STOP
    }
}

/// A recognized step function, initializer or synthesized substep.
#[derive(Clone, Debug, Default)]
pub struct StepFunction {
    pub receiver_type: String,
    pub receiver_name: Option<String>,
    pub name: String,
    pub kind: MethodKind,
    /// Name of the context parameter, empty when absent or unnamed.
    pub context_arg: String,
    pub update_arg: Option<String>,
    /// 1-based index of the state update result, 0 when none.
    pub update_index: usize,

    pub transitions: Vec<Transition>,
    /// Synthesized substeps, moved into the owning type on registration.
    pub sub_steps: Vec<StepFunction>,
    repeat_index: Option<usize>,

    pub usages: BTreeSet<String>,
    pub migrations: BTreeSet<String>,
    pub step_no: usize,
    pub duplicate: bool,
    pub is_subroutine: bool,
    pub(crate) dirty: bool,
}

impl StepFunction {
    pub fn new(receiver_type: impl Into<String>, name: impl Into<String>, kind: MethodKind) -> Self {
        Self {
            receiver_type: receiver_type.into(),
            name: name.into(),
            kind,
            ..Self::default()
        }
    }

    pub fn add_migration(&mut self, migration: &str) -> bool {
        if migration.is_empty() || self.migrations.contains(migration) {
            return false;
        }
        self.migrations.insert(migration.to_string());
        true
    }

    /// Adds every handler of `migrations`, returning whether anything was new.
    pub fn add_migrations(&mut self, migrations: &BTreeSet<String>) -> bool {
        let mut added = false;
        for migration in migrations {
            added |= self.add_migration(migration);
        }
        added
    }

    pub fn repeat_transition_index(&self) -> Option<usize> {
        self.repeat_index
    }

    pub fn add_transition(&mut self, transition: Transition) {
        self.add_transition_limited(transition, DEFAULT_MAX_CONDITION_LEN);
    }

    /// Appends a transition; repeats are folded into a single repeat transition.
    pub fn add_transition_limited(&mut self, transition: Transition, max_condition_len: usize) {
        if !transition.is_repeat() {
            self.transitions.push(transition);
            return;
        }

        self.add_migration(&transition.migration);

        let Some(index) = self.repeat_index else {
            self.repeat_index = Some(self.transitions.len());
            self.transitions.push(transition);
            return;
        };

        let repeat = &mut self.transitions[index];

        if !transition.condition.is_empty() {
            if repeat.condition.is_empty() {
                repeat.condition = transition.condition;
            } else if !repeat.condition.ends_with("...") {
                repeat.condition.push_str("\\n");
                repeat.condition.push_str(&transition.condition);
                if repeat.condition.len() >= max_condition_len {
                    repeat.condition.push_str("...");
                }
            }
        }

        if !transition.operation.is_empty() {
            if repeat.operation.is_empty() {
                repeat.operation = transition.operation;
            } else if !repeat.operation.contains(&transition.operation) {
                repeat.operation.push_str(", ");
                repeat.operation.push_str(&transition.operation);
            }
        }
    }
}
