//! PlantUML state diagram rendering.
//!
//! Every state machine type becomes a set of `state` declarations aliased
//! `Txx_Syyy` (type sequence number, step number). Targets that do not
//! resolve to a known step get a fresh `Txx_Uyyy` node marked `UNKNOWN`.

use crate::machine::{MethodKind, StateMachineType, StepFunction, Transition};

/// Renders one `@startuml` document covering `types`.
///
/// Propagation is expected to have run already so that transition targets
/// are resolved.
pub fn render_document(types: &[&StateMachineType]) -> String {
    let mut writer = PlantUmlWriter::default();
    writer.line("@startuml");
    for sm in types {
        writer.write_type(sm);
    }
    writer.line("@enduml");
    writer.finish()
}

/// Groups types by output, keeping the order of `types`.
pub fn group_by_output<'a>(
    types: &[&'a StateMachineType],
) -> Vec<(&'a str, Vec<&'a StateMachineType>)> {
    let mut groups: Vec<(&'a str, Vec<&'a StateMachineType>)> = Vec::new();
    for &sm in types {
        match groups.last_mut() {
            Some((output, members)) if *output == sm.output => members.push(sm),
            _ => groups.push((sm.output.as_str(), vec![sm])),
        }
    }
    groups
}

#[derive(Default)]
pub struct PlantUmlWriter {
    out: String,
    unknown_id: usize,
}

impl PlantUmlWriter {
    pub fn finish(self) -> String {
        self.out
    }

    fn line(&mut self, text: impl AsRef<str>) {
        self.out.push_str(text.as_ref());
        self.out.push('\n');
    }

    pub fn write_type(&mut self, sm: &StateMachineType) {
        for step in sm.steps() {
            self.write_step(sm, step);
        }
    }

    fn write_step(&mut self, sm: &StateMachineType, step: &StepFunction) {
        let alias = step_alias(sm, step);

        if step.is_subroutine {
            self.line(format!("state {:?} as {alias} <<sdlreceive>>", step.name));
        } else {
            self.line(format!("state {:?} as {alias}", step.name));
            self.line(format!("{alias} : {}", sm.receiver_type));
        }
        if step.duplicate {
            self.line(format!("{alias} : DUPLICATE"));
        }
        if sm.is_initial(step) {
            self.line(format!("[*] --> {alias}"));
        }

        if step.kind == MethodKind::Execution {
            for migration in &step.migrations {
                let target = match sm.find_step(migration) {
                    Some(handler) => step_alias(sm, handler),
                    None => self.unknown_step(sm, migration),
                };
                self.connect(&alias, &target, "--[dotted]>", "");
            }
        }

        for tr in &step.transitions {
            self.write_transition(sm, &alias, tr);
        }
    }

    fn write_transition(&mut self, sm: &StateMachineType, from: &str, tr: &Transition) {
        let note = match (tr.condition.is_empty(), tr.operation.is_empty()) {
            (true, true) => String::new(),
            (true, false) => tr.operation.clone(),
            (false, _) => format!("{}\\n{}", tr.condition, tr.operation),
        };

        if tr.is_stop() {
            if note.is_empty() {
                self.line(format!("{from} -->[*]"));
            } else {
                self.line(format!("{from} -->[*] : {note}"));
            }
            return;
        }

        if tr.is_repeat() {
            if tr.operation.is_empty() {
                self.connect(from, from, "-->", &note);
            } else {
                self.jump(from, from, &note);
            }
            return;
        }

        let target = tr
            .resolved
            .transition_to
            .as_deref()
            .and_then(|key| sm.step(key));
        let to = match target {
            Some(step) => step_alias(sm, step),
            None => self.unknown_step(sm, &tr.destination),
        };

        let into_subroutine = target.is_some_and(|step| step.is_subroutine);
        if !tr.operation.is_empty() && !into_subroutine {
            self.jump(from, &to, &note);
        } else {
            self.connect(from, &to, "-->", &note);
        }
    }

    fn unknown_step(&mut self, sm: &StateMachineType, name: &str) -> String {
        self.unknown_id += 1;
        let alias = format!("T{:02}_U{:03}", sm.seq_no, self.unknown_id);
        if !name.is_empty() {
            self.line(format!("state {name:?} as {alias}"));
        }
        self.line(format!("{alias} : {}", sm.receiver_type));
        self.line(format!("{alias} : UNKNOWN"));
        alias
    }

    fn jump(&mut self, from: &str, to: &str, note: &str) {
        if note.is_empty() {
            self.connect(from, to, "-->", "");
        } else {
            self.connect(from, to, "--[dashed]>", note);
        }
    }

    fn connect(&mut self, from: &str, to: &str, arrow: &str, note: &str) {
        if note.is_empty() {
            self.line(format!("{from} {arrow} {to}"));
        } else {
            self.line(format!("{from} {arrow} {to} : {note}"));
        }
    }
}

fn step_alias(sm: &StateMachineType, step: &StepFunction) -> String {
    format!("T{:02}_S{:03}", sm.seq_no, step.step_no)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::machine::STOP;

    fn machine() -> StateMachineType {
        let mut init = StepFunction::new("SM", "Init", MethodKind::Initialization);
        init.add_transition(Transition {
            operation: "Jump".into(),
            ..Transition::to("stepA")
        });

        let mut a = StepFunction::new("SM", "stepA", MethodKind::Execution);
        a.add_transition(Transition {
            condition: "[done]".into(),
            inherit_migration: false,
            ..Transition::to(STOP)
        });
        a.add_transition(Transition::to("missing"));
        a.add_transition(Transition {
            operation: "Sleep".into(),
            ..Transition::to("")
        });

        let mut sm = StateMachineType::new("SM", "sm", 0);
        sm.add_step(init, false);
        sm.add_step(a, false);
        sm.propagate();
        sm
    }

    #[test]
    fn test_render_states_and_edges() {
        let sm = machine();
        let doc = render_document(&[&sm]);
        let lines: Vec<&str> = doc.lines().collect();

        assert_eq!(lines.first(), Some(&"@startuml"));
        assert_eq!(lines.last(), Some(&"@enduml"));
        assert!(lines.contains(&"state \"Init\" as T00_S001"));
        assert!(lines.contains(&"T00_S001 : SM"));
        assert!(lines.contains(&"[*] --> T00_S001"));
        assert!(lines.contains(&"T00_S001 --[dashed]> T00_S002 : Jump"));
        assert!(lines.contains(&"T00_S002 -->[*] : [done]\\n"));
        assert!(lines.contains(&"T00_S002 --[dashed]> T00_S002 : Sleep"));
    }

    #[test]
    fn test_unresolved_target_gets_unknown_node() {
        let sm = machine();
        let doc = render_document(&[&sm]);
        assert!(doc.contains("state \"missing\" as T00_U001\n"));
        assert!(doc.contains("T00_U001 : UNKNOWN\n"));
        assert!(doc.contains("T00_S002 --> T00_U001\n"));
    }

    #[test]
    fn test_subroutine_and_duplicate_markers() {
        let mut sub = StepFunction::new("SM", "stepA.Sub{}.1", MethodKind::PlainStep);
        sub.is_subroutine = true;
        let mut sm = StateMachineType::new("SM", "sm", 3);
        sm.add_step(StepFunction::new("SM", "stepA", MethodKind::Execution), false);
        sm.add_step(StepFunction::new("SM", "stepA", MethodKind::Execution), false);
        sm.add_step(sub, true);

        let doc = render_document(&[&sm]);
        assert!(doc.contains("T03_S001 : DUPLICATE\n"));
        assert!(doc.contains("state \"stepA.Sub{}.1\" as T03_S002 <<sdlreceive>>\n"));
        assert!(!doc.contains("T03_S002 : SM"));
    }

    #[test]
    fn test_group_by_output() {
        let a = StateMachineType::new("A", "x", 0);
        let b = StateMachineType::new("B", "x", 1);
        let c = StateMachineType::new("C", "y", 2);
        let groups = group_by_output(&[&a, &b, &c]);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].0, "x");
        assert_eq!(groups[0].1.len(), 2);
        assert_eq!(groups[1].0, "y");
    }
}
