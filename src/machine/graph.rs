//! State machine types and migration-handler propagation.

use super::method::{MethodKind, ResolvedTargets, StepFunction};
use std::collections::BTreeMap;

/// Steps sharing one receiver type.
#[derive(Clone, Debug, Default)]
pub struct StateMachineType {
    pub receiver_type: String,
    /// Output group, the input path without its extension.
    pub output: String,
    pub seq_no: usize,
    steps: BTreeMap<String, StepFunction>,
    pub has_decl_init: bool,
}

impl StateMachineType {
    pub fn new(receiver_type: impl Into<String>, output: impl Into<String>, seq_no: usize) -> Self {
        Self {
            receiver_type: receiver_type.into(),
            output: output.into(),
            seq_no,
            ..Self::default()
        }
    }

    /// Registers `step` and its substeps. The first registration of a name
    /// wins; a later one only flags it as duplicated.
    pub fn add_step(&mut self, mut step: StepFunction, add_untyped: bool) {
        if !add_untyped && step.kind == MethodKind::PlainStep {
            return;
        }

        if let Some(existing) = self.steps.get_mut(&step.name) {
            log::debug!(
                "Duplicate step {}.{} ignored",
                self.receiver_type,
                step.name
            );
            existing.duplicate = true;
            return;
        }

        step.step_no = 1 + self.steps.len();
        if step.kind == MethodKind::Initializer {
            self.has_decl_init = true;
        }

        let sub_steps = std::mem::take(&mut step.sub_steps);
        self.steps.insert(step.name.clone(), step);

        for sub in sub_steps {
            self.add_step(sub, true);
        }
    }

    pub fn find_step(&self, name: &str) -> Option<&StepFunction> {
        self.find_step_key(name).and_then(|key| self.steps.get(key))
    }

    /// Resolves `name` exactly, then by dropping leading dotted segments one
    /// at a time.
    pub fn find_step_key<'n>(&self, name: &'n str) -> Option<&'n str> {
        let mut candidate = name;
        while !candidate.is_empty() {
            if self.steps.contains_key(candidate) {
                return Some(candidate);
            }
            candidate = candidate.split_once('.')?.1;
        }
        None
    }

    /// Steps ordered by name.
    pub fn steps(&self) -> impl Iterator<Item = &StepFunction> {
        self.steps.values()
    }

    pub fn step(&self, name: &str) -> Option<&StepFunction> {
        self.steps.get(name)
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Whether `step` is where the machine starts: the dedicated initializer
    /// when there is one, otherwise any initialization step.
    pub fn is_initial(&self, step: &StepFunction) -> bool {
        let start = if self.has_decl_init {
            MethodKind::Initializer
        } else {
            MethodKind::Initialization
        };
        step.kind == start
    }

    /// Resolves transition targets and grows migration-handler sets to a
    /// fixed point. Handler sets only grow, so running it again is a no-op.
    pub fn propagate(&mut self) {
        let names: Vec<String> = self.steps.keys().cloned().collect();

        for step in self.steps.values_mut() {
            step.dirty = false;
        }

        for name in &names {
            let seeds = self.resolve_transitions(name);
            for (target, migration) in seeds {
                if let Some(step) = self.steps.get_mut(&target) {
                    if step.add_migration(&migration) {
                        step.dirty = true;
                    }
                }
            }
        }

        let mut passes = 0;
        loop {
            passes += 1;
            let mut changed = false;

            for name in &names {
                let Some(step) = self.steps.get_mut(name) else {
                    continue;
                };
                if !step.dirty {
                    continue;
                }
                step.dirty = false;

                let migrations = step.migrations.clone();
                let edges: Vec<(Option<String>, Option<String>)> = step
                    .transitions
                    .iter()
                    .map(|tr| {
                        let direct = tr
                            .resolved
                            .transition_to
                            .clone()
                            .filter(|_| tr.inherit_migration);
                        (direct, tr.resolved.hidden_prop_to.clone())
                    })
                    .collect();

                for target in edges.into_iter().flat_map(|(d, h)| d.into_iter().chain(h)) {
                    if let Some(to) = self.steps.get_mut(&target) {
                        if to.add_migrations(&migrations) {
                            to.dirty = true;
                            changed = true;
                        }
                    }
                }
            }

            if !changed {
                break;
            }
        }

        log::debug!(
            "Propagated migrations of {} in {} pass(es)",
            self.receiver_type,
            passes
        );
    }

    /// Recomputes the cached targets of every transition of `name`, returning
    /// the (step, handler) pairs seeded by explicit migrations.
    fn resolve_transitions(&mut self, name: &str) -> Vec<(String, String)> {
        let Some(step) = self.steps.get(name) else {
            return Vec::new();
        };

        let resolved: Vec<ResolvedTargets> = step
            .transitions
            .iter()
            .map(|tr| ResolvedTargets {
                transition_to: self.find_step_key(&tr.destination).map(str::to_string),
                hidden_prop_to: self.find_step_key(&tr.hidden_propagate).map(str::to_string),
                migration_to: self.find_step_key(&tr.migration).map(str::to_string),
            })
            .collect();

        let mut seeds = Vec::new();
        let Some(step) = self.steps.get_mut(name) else {
            return seeds;
        };
        for (tr, targets) in step.transitions.iter_mut().zip(resolved) {
            if !tr.migration.is_empty() {
                let reached = [
                    &targets.transition_to,
                    &targets.hidden_prop_to,
                    &targets.migration_to,
                ];
                for target in reached.into_iter().flatten() {
                    seeds.push((target.clone(), tr.migration.clone()));
                }
            }
            tr.resolved = targets;
        }
        seeds
    }
}

/// All state machine types found across the analyzed files.
#[derive(Clone, Debug, Default)]
pub struct StepGraph {
    types: BTreeMap<String, StateMachineType>,
}

impl StepGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a top-level step to the type of its receiver. Types keep the
    /// output group of the file they were first seen in.
    pub fn add_step(&mut self, output: &str, step: StepFunction) {
        let seq_no = self.types.len();
        self.types
            .entry(step.receiver_type.clone())
            .or_insert_with(|| StateMachineType::new(step.receiver_type.clone(), output, seq_no))
            .add_step(step, false);
    }

    pub fn add_steps(&mut self, output: &str, steps: impl IntoIterator<Item = StepFunction>) {
        for step in steps {
            self.add_step(output, step);
        }
    }

    pub fn get(&self, receiver_type: &str) -> Option<&StateMachineType> {
        self.types.get(receiver_type)
    }

    /// Types ordered by output group, then by receiver type.
    pub fn types(&self) -> Vec<&StateMachineType> {
        let mut types: Vec<_> = self.types.values().collect();
        types.sort_by(|a, b| {
            a.output
                .cmp(&b.output)
                .then_with(|| a.receiver_type.cmp(&b.receiver_type))
        });
        types
    }

    /// True when no type holds a registered step.
    pub fn is_empty(&self) -> bool {
        self.types.values().all(StateMachineType::is_empty)
    }

    pub fn propagate_all(&mut self) {
        for sm in self.types.values_mut() {
            sm.propagate();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::machine::Transition;

    fn step(name: &str, kind: MethodKind) -> StepFunction {
        StepFunction::new("SM", name, kind)
    }

    #[test]
    fn test_plain_steps_need_untyped_registration() {
        let mut sm = StateMachineType::new("SM", "out", 0);
        sm.add_step(step("helper", MethodKind::PlainStep), false);
        assert!(sm.is_empty());
        sm.add_step(step("helper", MethodKind::PlainStep), true);
        assert_eq!(sm.len(), 1);
    }

    #[test]
    fn test_substeps_are_registered_after_parent() {
        let mut parent = step("stepA", MethodKind::Execution);
        parent.sub_steps.push(step("stepA.1", MethodKind::PlainStep));

        let mut sm = StateMachineType::new("SM", "out", 0);
        sm.add_step(parent, false);

        assert_eq!(sm.step("stepA").unwrap().step_no, 1);
        assert_eq!(sm.step("stepA.1").unwrap().step_no, 2);
        assert!(sm.step("stepA").unwrap().sub_steps.is_empty());
    }

    #[test]
    fn test_find_step_strips_prefixes() {
        let mut sm = StateMachineType::new("SM", "out", 0);
        sm.add_step(step("B.2", MethodKind::Execution), false);
        assert_eq!(sm.find_step_key("A.B.2"), Some("B.2"));
        assert_eq!(sm.find_step_key("B.2"), Some("B.2"));
        assert_eq!(sm.find_step_key("C.3"), None);
        assert_eq!(sm.find_step_key(""), None);
    }

    #[test]
    fn test_initial_state_prefers_initializer() {
        let mut sm = StateMachineType::new("SM", "out", 0);
        sm.add_step(step("Init", MethodKind::Initialization), false);
        assert!(sm.is_initial(sm.step("Init").unwrap()));

        sm.add_step(step("GetInitStateFor", MethodKind::Initializer), false);
        assert!(sm.has_decl_init);
        assert!(!sm.is_initial(sm.step("Init").unwrap()));
        assert!(sm.is_initial(sm.step("GetInitStateFor").unwrap()));
    }

    #[test]
    fn test_explicit_migration_reaches_destination_and_handler() {
        let mut a = step("stepA", MethodKind::Execution);
        a.add_transition(Transition {
            migration: "migrateA".into(),
            ..Transition::to("stepB")
        });
        let mut sm = StateMachineType::new("SM", "out", 0);
        sm.add_step(a, false);
        sm.add_step(step("stepB", MethodKind::Execution), false);
        sm.add_step(step("migrateA", MethodKind::Migration), false);

        sm.propagate();

        assert!(sm.step("stepB").unwrap().migrations.contains("migrateA"));
        assert!(sm.step("migrateA").unwrap().migrations.contains("migrateA"));
        assert!(sm.step("stepA").unwrap().migrations.is_empty());
        let resolved = &sm.step("stepA").unwrap().transitions[0].resolved;
        assert_eq!(resolved.transition_to.as_deref(), Some("stepB"));
    }

    #[test]
    fn test_inheritance_stops_at_cleared_flag() {
        let mut a = step("stepA", MethodKind::Execution);
        a.add_transition(Transition::to("stepB"));
        let mut b = step("stepB", MethodKind::Execution);
        b.add_transition(Transition {
            inherit_migration: false,
            ..Transition::to("stepC")
        });

        let mut seed = step("seed", MethodKind::Execution);
        seed.add_transition(Transition {
            migration: "m".into(),
            ..Transition::to("stepA")
        });

        let mut sm = StateMachineType::new("SM", "out", 0);
        for s in [seed, a, b, step("stepC", MethodKind::Execution)] {
            sm.add_step(s, false);
        }
        sm.propagate();

        assert!(sm.step("stepB").unwrap().migrations.contains("m"));
        assert!(sm.step("stepC").unwrap().migrations.is_empty());
    }

    #[test]
    fn test_graph_orders_types_by_output() {
        let mut graph = StepGraph::new();
        graph.add_step("b", StepFunction::new("Alpha", "s1", MethodKind::Execution));
        graph.add_step("a", StepFunction::new("Zeta", "s1", MethodKind::Execution));
        let order: Vec<_> = graph.types().iter().map(|t| t.receiver_type.as_str()).collect();
        assert_eq!(order, vec!["Zeta", "Alpha"]);
        assert_eq!(graph.get("Alpha").unwrap().seq_no, 0);
        assert_eq!(graph.get("Zeta").unwrap().seq_no, 1);
    }
}
