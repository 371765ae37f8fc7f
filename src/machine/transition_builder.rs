//! Turns traced call chains into transitions.
//!
//! Framework calls are matched by the name of the outermost call in the chain
//! against a fixed vocabulary. Inline closures and composite literals passed
//! as arguments become synthesized substeps of the step being traced.

use super::condition::ConditionBuilder;
use super::method::{MethodKind, StepFunction, Transition, STOP, UNKNOWN};
use super::recognizer::find_context_arg;
use super::state_update::StateUpdate;
use super::trace::{trace_function_body, ExecTrace, TraceCx};
use crate::core::{Expr, ExprKind, Field, UnaryOp};

const THEN_REPEAT_OR_ELSE: &str = "<ThenRepeatOrElse>";

impl ExecTrace<'_> {
    pub(super) fn add_transition(&self, cx: &mut TraceCx<'_, '_>, update: &StateUpdate) {
        let mut transition = Transition::default();

        if let Some((conds, inverted)) = self.nearest_cond() {
            transition.condition = ConditionBuilder::new(cx.env.file, cx.env.max_condition_len)
                .build(conds, inverted);
        }

        match &self.defaults.migration {
            Some(migration) => {
                transition.migration = self.inline_func_expr(cx, migration, MethodKind::Execution);
            }
            None => transition.inherit_migration = true,
        }

        match cx.step.kind {
            MethodKind::Initializer | MethodKind::Construction => {
                transition.destination = update.full_name();
            }
            _ => {
                transition.operation = build_operation(update);
                if !self.add_context_op_transition(cx, update, &mut transition)
                    && transition.destination.is_empty()
                {
                    transition.destination = UNKNOWN.to_string();
                }
            }
        }

        cx.step
            .add_transition_limited(transition, cx.env.max_condition_len);
    }

    /// Applies the operation vocabulary. Returns `false` when the destination
    /// could not be resolved.
    fn add_context_op_transition(
        &self,
        cx: &mut TraceCx<'_, '_>,
        update: &StateUpdate,
        tr: &mut Transition,
    ) -> bool {
        let args = update.args.as_slice();

        match update.name.as_str() {
            "CallSubroutine" => return self.add_subroutine_call(cx, args, tr),
            "Error" | "Errorf" => {
                tr.operation = "Error".to_string();
                tr.destination = STOP.to_string();
                tr.inherit_migration = false;
                return true;
            }
            "Stop" => {
                tr.destination = STOP.to_string();
                tr.inherit_migration = false;
                return true;
            }
            "Replace" | "ReplaceWith" => {
                let kind = if update.name == "Replace" {
                    MethodKind::Construction
                } else {
                    MethodKind::PlainStep
                };
                tr.operation = "Replace".to_string();
                tr.inherit_migration = false;
                let Some(target) = args.first() else {
                    return false;
                };
                tr.destination = self.inline_func_expr(cx, target, kind);
                return !tr.destination.is_empty();
            }
            "ThenRepeatOrElse" => {
                tr.destination = THEN_REPEAT_OR_ELSE.to_string();
                return false;
            }
            "ThenRepeatOrJump" => {
                let Some(target) = args.first() else {
                    return false;
                };
                cx.step
                    .add_transition_limited(tr.clone(), cx.env.max_condition_len);
                tr.destination = self.inline_func_expr(cx, target, MethodKind::Execution);
                return !tr.destination.is_empty();
            }
            "ThenRepeatOrJumpExt" => {
                cx.step
                    .add_transition_limited(tr.clone(), cx.env.max_condition_len);
            }
            name if name.ends_with("Ext") || name.ends_with("Step") => {}
            name => {
                let Some(target) = args.first() else {
                    // repeat-like operations
                    return true;
                };
                if tr.operation.is_empty() && update.is_direct_context_call() {
                    tr.operation = name.to_string();
                }
                tr.destination = self.inline_func_expr(cx, target, MethodKind::Execution);
                return !tr.destination.is_empty();
            }
        }

        let Some(descriptor) = args.first() else {
            return false;
        };
        let (destination, migration) = self.slot_step_expr(cx, descriptor);
        tr.destination = destination;
        if !migration.is_empty() {
            tr.migration = migration;
            tr.inherit_migration = false;
        }
        !tr.destination.is_empty()
    }

    /// `CallSubroutine(sm, migrate, exit)`: this step runs `sm`, then `exit`.
    fn add_subroutine_call(
        &self,
        cx: &mut TraceCx<'_, '_>,
        args: &[Expr],
        tr: &mut Transition,
    ) -> bool {
        let [machine, migrate, exit] = args else {
            return false;
        };

        tr.operation = "CallSubroutine".to_string();
        let migration = self.inline_func_expr(cx, migrate, MethodKind::Migration);
        if !migration.is_empty() {
            tr.migration = migration;
            tr.inherit_migration = false;
        }

        tr.destination = format!(
            "{}.{}.{}",
            cx.step.name,
            subroutine_type_name(machine),
            cx.step.sub_steps.len() + 1
        );

        let mut sub = self.new_sub_step(cx, &tr.destination, None, MethodKind::PlainStep);
        sub.add_migration(&tr.migration);
        sub.is_subroutine = true;
        let index = cx.step.sub_steps.len();
        cx.step.sub_steps.push(sub);

        let exit_step = self.inline_func_expr(cx, exit, MethodKind::Execution);
        cx.step.sub_steps[index].add_transition(Transition {
            destination: exit_step.clone(),
            ..Transition::default()
        });

        // applied to the exit step once the subroutine returns, not to the caller
        tr.migration.clear();
        tr.hidden_propagate = exit_step;
        true
    }

    /// Reads `SlotStep{Transition: ..., Migration: ...}`.
    fn slot_step_expr(&self, cx: &mut TraceCx<'_, '_>, expr: &Expr) -> (String, String) {
        if let ExprKind::CompositeLit { ty, elements } = &expr.kind {
            let is_slot_step = ty
                .as_deref()
                .is_some_and(|ty| ty.selector_parts().1 == "SlotStep");
            if is_slot_step {
                let mut destination = String::new();
                let mut migration = String::new();
                for element in elements {
                    let ExprKind::KeyValue { key, value } = &element.kind else {
                        continue;
                    };
                    match key.selector_parts() {
                        ("", "Transition") => {
                            destination = self.inline_func_expr(cx, value, MethodKind::Execution)
                        }
                        ("", "Migration") => {
                            migration = self.inline_func_expr(cx, value, MethodKind::Migration)
                        }
                        _ => {}
                    }
                }
                return (destination, migration);
            }
        }

        let (_, name) = expr.selector_parts();
        (format!("DYNAMIC {name}"), String::new())
    }

    /// Names the step an argument refers to, synthesizing substeps for inline
    /// closures and in-place state machines. Returns an empty name for `nil`.
    pub(super) fn inline_func_expr(
        &self,
        cx: &mut TraceCx<'_, '_>,
        expr: &Expr,
        kind: MethodKind,
    ) -> String {
        match &expr.kind {
            ExprKind::Unary {
                op: UnaryOp::Addr,
                operand,
            } if !kind.has_state_update() => return self.inline_func_expr(cx, operand, kind),
            ExprKind::CompositeLit { ty, .. } if kind == MethodKind::PlainStep => {
                let name = composite_type_name(ty.as_deref());
                let mut marker = self.new_sub_step(cx, &name, None, kind);
                marker.is_subroutine = true;
                cx.step.sub_steps.push(marker);
                return name;
            }
            ExprKind::FuncLit(func) => {
                let name = format!("{}.{}", cx.step.name, cx.step.sub_steps.len() + 1);
                let mut sub = self.new_sub_step(cx, &name, Some(func.params.as_slice()), kind);
                trace_function_body(&mut sub, &func.body, cx.env);
                cx.step.sub_steps.push(sub);
                return name;
            }
            _ => {}
        }

        match expr.selector_parts() {
            ("", "nil") => String::new(),
            ("", name) => name.to_string(),
            (x, name) => format!("{x}.{name}"),
        }
    }

    fn new_sub_step(
        &self,
        cx: &TraceCx<'_, '_>,
        name: &str,
        params: Option<&[Field]>,
        kind: MethodKind,
    ) -> StepFunction {
        let mut sub = StepFunction::new(cx.step.receiver_type.clone(), name, kind);
        sub.receiver_name = cx.step.receiver_name.clone();

        if kind.has_context_arg() {
            if let Some((found, arg)) =
                params.and_then(|params| find_context_arg(params, &cx.env.framework))
            {
                if found == kind {
                    sub.context_arg = arg;
                }
            }
        }
        if kind.has_state_update() {
            sub.update_index = 1;
        }
        sub
    }
}

/// Label of a `Then*` chain such as `ctx.Sleep().ThenRepeat()`: the segment
/// before the `Then` call, qualified by its own parent when that is named.
fn build_operation(update: &StateUpdate) -> String {
    if !update.name.starts_with("Then") {
        return String::new();
    }
    let Some(op) = update.parent().filter(|p| p.has_name()) else {
        return String::new();
    };
    match op.parent() {
        Some(owner) if owner.has_name() => format!("{}.{}", owner.name, op.name),
        _ => op.name.clone(),
    }
}

fn composite_type_name(ty: Option<&Expr>) -> String {
    match ty.map(Expr::selector_parts) {
        Some((x, name)) if !x.is_empty() => format!("{x}.{name}{{}}"),
        Some((_, name)) => format!("{name}{{}}"),
        None => "{}".to_string(),
    }
}

/// `&MySubSM{...}` names the subroutine type `MySubSM{}`.
fn subroutine_type_name(expr: &Expr) -> String {
    match &expr.kind {
        ExprKind::Unary {
            op: UnaryOp::Addr,
            operand,
        } => subroutine_type_name(operand),
        ExprKind::CompositeLit { ty, .. } => composite_type_name(ty.as_deref()),
        _ => match expr.selector_parts() {
            ("", name) => name.to_string(),
            (x, name) => format!("{x}.{name}"),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Span;

    fn chain(names: &[&str]) -> std::rc::Rc<StateUpdate> {
        let mut su = StateUpdate::context_marker();
        for name in names {
            su = StateUpdate::child(&su, *name);
        }
        su
    }

    #[test]
    fn test_operation_from_then_chain() {
        let su = chain(&["Sleep", "ThenRepeat"]);
        assert_eq!(build_operation(&su), "Sleep");

        let owned = StateUpdate::child(
            &StateUpdate::child(&StateUpdate::root("s"), "adapter"),
            "PrepareAsync",
        );
        let su = StateUpdate::child(&owned, "ThenJump");
        assert_eq!(build_operation(&su), "adapter.PrepareAsync");
    }

    #[test]
    fn test_operation_requires_then_prefix() {
        assert_eq!(build_operation(&chain(&["Jump"])), "");
        assert_eq!(build_operation(&chain(&["ThenRepeat"])), "");
    }

    #[test]
    fn test_subroutine_type_name() {
        let lit = Expr::new(
            ExprKind::CompositeLit {
                ty: Some(Box::new(Expr::ident("MySubSM"))),
                elements: vec![],
            },
            Span::default(),
        );
        let addr = Expr::new(
            ExprKind::Unary {
                op: UnaryOp::Addr,
                operand: Box::new(lit),
            },
            Span::default(),
        );
        assert_eq!(subroutine_type_name(&addr), "MySubSM{}");
        assert_eq!(subroutine_type_name(&Expr::ident("sub")), "sub");
    }
}
