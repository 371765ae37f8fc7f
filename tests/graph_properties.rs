use proptest::prelude::*;
use std::collections::BTreeSet;
use stepmap::machine::{MethodKind, StateMachineType, StepFunction, Transition};

const NAMES: [&str; 6] = ["stepA", "stepB", "stepC", "stepD", "stepE", "migrate"];

#[derive(Clone, Debug)]
struct Edge {
    from: usize,
    to: usize,
    inherit: bool,
    migration: Option<usize>,
}

fn edge() -> impl Strategy<Value = Edge> {
    (0..NAMES.len(), 0..NAMES.len(), any::<bool>(), prop::option::of(0..3usize)).prop_map(
        |(from, to, inherit, migration)| Edge {
            from,
            to,
            inherit,
            migration,
        },
    )
}

fn build(edges: &[Edge]) -> StateMachineType {
    let mut steps: Vec<StepFunction> = NAMES
        .iter()
        .map(|name| StepFunction::new("SM", *name, MethodKind::Execution))
        .collect();

    for e in edges {
        let mut tr = Transition::to(format!("s.{}", NAMES[e.to]));
        tr.inherit_migration = e.inherit;
        if let Some(m) = e.migration {
            tr.migration = format!("m{m}");
            tr.inherit_migration = false;
        }
        steps[e.from].add_transition(tr);
    }

    let mut sm = StateMachineType::new("SM", "out", 0);
    for step in steps {
        sm.add_step(step, false);
    }
    sm
}

fn snapshot(sm: &StateMachineType) -> Vec<(String, BTreeSet<String>)> {
    sm.steps()
        .map(|s| (s.name.clone(), s.migrations.clone()))
        .collect()
}

proptest! {
    #[test]
    fn propagation_is_idempotent(edges in prop::collection::vec(edge(), 0..20)) {
        let mut sm = build(&edges);
        sm.propagate();
        let first = snapshot(&sm);
        sm.propagate();
        prop_assert_eq!(first, snapshot(&sm));
    }

    #[test]
    fn propagation_only_grows_handler_sets(
        edges in prop::collection::vec(edge(), 0..20),
        seeded in prop::collection::vec((0..NAMES.len(), 0..3usize), 0..5),
    ) {
        let mut steps: Vec<StepFunction> = build(&edges).steps().cloned().collect();
        for (index, handler) in &seeded {
            if let Some(step) = steps.iter_mut().find(|s| s.name == NAMES[*index]) {
                step.add_migration(&format!("pre{handler}"));
            }
        }
        let mut sm = StateMachineType::new("SM", "out", 0);
        for step in steps {
            sm.add_step(step, false);
        }

        let before = snapshot(&sm);
        sm.propagate();
        for ((name, old), (_, new)) in before.iter().zip(snapshot(&sm)) {
            prop_assert!(old.is_subset(&new), "{} lost handlers", name);
        }
    }

    #[test]
    fn inheriting_edges_carry_every_handler(edges in prop::collection::vec(edge(), 0..20)) {
        let mut sm = build(&edges);
        sm.propagate();

        for step in sm.steps() {
            for tr in step.transitions.iter().filter(|t| t.inherit_migration) {
                let Some(target) = tr.resolved.transition_to.as_deref() else {
                    continue;
                };
                let target = sm.step(target).unwrap();
                prop_assert!(step.migrations.is_subset(&target.migrations));
            }
        }
    }

    #[test]
    fn explicit_migrations_reach_their_destination(edges in prop::collection::vec(edge(), 0..20)) {
        let mut sm = build(&edges);
        sm.propagate();

        for e in edges.iter().filter(|e| e.migration.is_some()) {
            let handler = format!("m{}", e.migration.unwrap_or_default());
            prop_assert!(sm.step(NAMES[e.to]).unwrap().migrations.contains(&handler));
        }
    }
}

#[test]
fn find_step_strips_receiver_qualifier() {
    let sm = build(&[]);
    assert_eq!(sm.find_step("s.stepA").map(|s| s.name.as_str()), Some("stepA"));
    assert_eq!(sm.find_step("x.y.stepB").map(|s| s.name.as_str()), Some("stepB"));
    assert!(sm.find_step("s.stepZ").is_none());
}

#[test]
fn duplicate_registration_keeps_first_step() {
    let mut first = StepFunction::new("SM", "stepA", MethodKind::Execution);
    first.add_transition(Transition::to("s.stepB"));
    let second = StepFunction::new("SM", "stepA", MethodKind::Execution);

    let mut sm = StateMachineType::new("SM", "out", 0);
    sm.add_step(first, false);
    sm.add_step(second, false);

    let kept = sm.step("stepA").unwrap();
    assert_eq!(sm.len(), 1);
    assert!(kept.duplicate);
    assert_eq!(kept.transitions.len(), 1);
}
