//! Symbolic trace interpreter for step bodies.
//!
//! A trace walks the statements of a step function and resolves every
//! qualifying `return` into a [`StateUpdate`] chain. Local names aliasing the
//! context argument (or values derived from it) live in scoped alias tables:
//! each nested block or branch gets a child scope that copies its inherited
//! table on first write, so sibling branches never see each other's bindings.

use super::method::StepFunction;
use super::recognizer::FileContext;
use super::state_update::StateUpdate;
use crate::core::{Decl, Expr, ExprKind, Stmt};
use std::collections::BTreeSet;
use std::rc::Rc;

type AliasMap = im::HashMap<String, Rc<StateUpdate>>;

/// Per-step state shared by all scopes of one trace.
pub(crate) struct TraceCx<'e, 's> {
    pub env: &'e FileContext<'e>,
    pub step: &'s mut StepFunction,
}

/// Defaults configured through the context argument, in effect for the
/// remainder of the enclosing block.
#[derive(Clone, Debug, Default)]
pub(crate) struct StepDefaults {
    pub migration: Option<Expr>,
    pub error_handler: Option<Expr>,
    pub step_flags: Option<Expr>,
}

enum Flow {
    Continue,
    Exit(Option<Rc<StateUpdate>>),
}

pub(crate) struct ExecTrace<'p> {
    parent: Option<&'p ExecTrace<'p>>,
    context_arg: &'p str,
    traced: Option<AliasMap>,
    pub(super) usages: BTreeSet<String>,
    conds: Vec<Expr>,
    inverted: bool,
    pub(super) defaults: StepDefaults,
}

/// Traces `body` and records its transitions, substeps and usages on `step`.
pub(crate) fn trace_function_body(step: &mut StepFunction, body: &[Stmt], env: &FileContext<'_>) {
    let context_arg = step.context_arg.clone();
    let mut root = ExecTrace::root(&context_arg);
    {
        let mut cx = TraceCx { env, step };
        root.parse_statements(&mut cx, body);
    }
    step.usages = root.usages;
    log::trace!(
        "Traced {}.{}: {} transition(s), {} substep(s)",
        step.receiver_type,
        step.name,
        step.transitions.len(),
        step.sub_steps.len()
    );
}

impl<'p> ExecTrace<'p> {
    pub(crate) fn root(context_arg: &'p str) -> Self {
        Self {
            parent: None,
            context_arg,
            traced: None,
            usages: BTreeSet::new(),
            conds: Vec::new(),
            inverted: false,
            defaults: StepDefaults::default(),
        }
    }

    fn spawn(&self) -> ExecTrace<'_> {
        ExecTrace {
            parent: Some(self),
            context_arg: self.context_arg,
            traced: None,
            usages: BTreeSet::new(),
            conds: Vec::new(),
            inverted: false,
            defaults: self.defaults.clone(),
        }
    }

    fn spawn_case(&self, conds: &[Expr]) -> ExecTrace<'_> {
        let mut et = self.spawn();
        et.conds = conds.to_vec();
        et
    }

    fn spawn_if(&self, cond: &Expr, inverted: bool) -> ExecTrace<'_> {
        let mut et = self.spawn();
        et.conds = vec![cond.clone()];
        et.inverted = inverted;
        et
    }

    /// Guard of the innermost conditional scope, with its polarity.
    pub(super) fn nearest_cond(&self) -> Option<(&[Expr], bool)> {
        if !self.conds.is_empty() {
            return Some((&self.conds, self.inverted));
        }
        self.parent.and_then(|p| p.nearest_cond())
    }

    fn is_traced(&self, name: &str) -> bool {
        match (&self.traced, self.parent) {
            (Some(map), _) => map.contains_key(name),
            (None, Some(parent)) => parent.is_traced(name),
            (None, None) => self.context_arg == name,
        }
    }

    fn get_traced(&self, name: &str) -> Option<Rc<StateUpdate>> {
        match (&self.traced, self.parent) {
            (Some(map), _) => map.get(name).cloned(),
            (None, Some(parent)) => parent.get_traced(name),
            (None, None) if !self.context_arg.is_empty() && self.context_arg == name => {
                Some(StateUpdate::context_marker())
            }
            (None, None) => None,
        }
    }

    fn copy_inherited(&self) -> AliasMap {
        match (&self.traced, self.parent) {
            (Some(map), _) => map.clone(),
            (None, Some(parent)) => parent.copy_inherited(),
            (None, None) if !self.context_arg.is_empty() => {
                AliasMap::unit(self.context_arg.to_string(), StateUpdate::context_marker())
            }
            (None, None) => AliasMap::new(),
        }
    }

    fn set_traced(&mut self, name: &str, value: Option<Rc<StateUpdate>>) {
        if self.traced.is_none() {
            if value.is_none() && !self.is_traced(name) {
                return;
            }
            self.traced = Some(self.copy_inherited());
        }
        let Some(map) = self.traced.as_mut() else {
            return;
        };
        match value {
            Some(value) => {
                map.insert(name.to_string(), value);
            }
            None => {
                map.remove(name);
            }
        }
    }

    /// Rebinds assigned names. Only values derived from the context argument
    /// are tracked; anything else clears the name. A single right-hand value
    /// is broadcast to every left-hand name.
    fn remap_names(&mut self, lhs: &[Option<&str>], rhs: &[Expr]) {
        if lhs.is_empty() {
            return;
        }
        let values: Vec<Option<Rc<StateUpdate>>> = rhs
            .iter()
            .map(|expr| self.expr_to_value(expr).filter(|v| v.is_context))
            .collect();

        for (i, name) in lhs.iter().copied().enumerate() {
            let Some(name) = name.filter(|n| *n != "_") else {
                continue;
            };
            let value = if values.len() == 1 {
                values[0].clone()
            } else {
                values.get(i).cloned().flatten()
            };
            self.set_traced(name, value);
        }
    }

    /// Traces `list` in a child scope and records the transition it ends with.
    pub(crate) fn parse_statements<'a>(
        &mut self,
        cx: &mut TraceCx<'_, '_>,
        list: impl IntoIterator<Item = &'a Stmt>,
    ) {
        let (result, usages, defaults) = {
            let mut et = self.spawn();
            let result = et.parse_list(cx, list);
            (result, et.usages, et.defaults)
        };

        self.usages.extend(usages);
        self.defaults = defaults;

        if let Some(update) = result {
            self.add_transition(cx, &update);
        }
    }

    fn parse_list<'a>(
        &mut self,
        cx: &mut TraceCx<'_, '_>,
        list: impl IntoIterator<Item = &'a Stmt>,
    ) -> Option<Rc<StateUpdate>> {
        for stmt in list {
            if let Flow::Exit(result) = self.parse_stmt(cx, stmt) {
                return result;
            }
        }
        None
    }

    fn parse_stmt(&mut self, cx: &mut TraceCx<'_, '_>, stmt: &Stmt) -> Flow {
        match stmt {
            Stmt::Labeled { stmt, .. } => return self.parse_stmt(cx, stmt),
            Stmt::Decl(decl) => self.parse_decl(decl),
            Stmt::Expr(expr) => self.parse_call_to_ctx(expr),
            Stmt::Assign { lhs, rhs } => {
                let names: Vec<Option<&str>> = lhs.iter().map(plain_name).collect();
                self.remap_names(&names, rhs);
            }
            Stmt::Return(results) => return Flow::Exit(self.parse_return(cx, results)),
            // control leaves through a path other traces cover
            Stmt::Branch(_) => return Flow::Exit(None),
            Stmt::Block(list) => self.parse_statements(cx, list),
            Stmt::If {
                cond,
                body,
                alternative,
            } => {
                if !body.is_empty() {
                    let mut branch = self.spawn_if(cond, false);
                    branch.parse_statements(cx, body);
                    let usages = branch.usages;
                    self.usages.extend(usages);
                }
                if let Some(alternative) = alternative {
                    let mut branch = self.spawn_if(cond, true);
                    branch.parse_statements(cx, std::iter::once(alternative.as_ref()));
                    let usages = branch.usages;
                    self.usages.extend(usages);
                }
            }
            Stmt::CaseClause { list, body } => {
                if !body.is_empty() {
                    let mut branch = self.spawn_case(list);
                    branch.parse_statements(cx, body);
                    let usages = branch.usages;
                    self.usages.extend(usages);
                }
            }
            Stmt::Switch { body }
            | Stmt::TypeSwitch { body }
            | Stmt::Select { body }
            | Stmt::For { body }
            | Stmt::Range { body } => self.parse_statements(cx, body),
            Stmt::CommClause { comm, body } => {
                self.parse_statements(cx, comm.as_deref().into_iter().chain(body.iter()));
            }
            Stmt::Defer(_) | Stmt::Go(_) | Stmt::Send { .. } | Stmt::IncDec(_) | Stmt::Empty => {}
        }
        Flow::Continue
    }

    fn parse_return(
        &mut self,
        cx: &mut TraceCx<'_, '_>,
        results: &[Expr],
    ) -> Option<Rc<StateUpdate>> {
        let index = cx.step.update_index;
        match results {
            // named results are not tracked
            [] => None,
            [first, ..] if index == 0 => self.expr_to_result(cx, first),
            _ if index > results.len() => None,
            _ => self.expr_to_result(cx, &results[index - 1]),
        }
    }

    fn parse_decl(&mut self, decl: &Decl) {
        match decl {
            Decl::Const(specs) => {
                for name in specs.iter().flat_map(|s| &s.names) {
                    self.set_traced(name, None);
                }
            }
            Decl::Var(specs) => {
                for spec in specs {
                    let names: Vec<Option<&str>> =
                        spec.names.iter().map(|n| Some(n.as_str())).collect();
                    self.remap_names(&names, &spec.values);
                }
            }
            Decl::Type(names) => {
                for name in names {
                    self.set_traced(name, None);
                }
            }
        }
    }

    fn expr_to_result(
        &self,
        cx: &mut TraceCx<'_, '_>,
        expr: &Expr,
    ) -> Option<Rc<StateUpdate>> {
        let kind = cx.step.kind;
        if kind.has_context_arg() && !kind.has_state_update() {
            let inner = match &expr.kind {
                ExprKind::Unary {
                    op: crate::core::UnaryOp::Addr,
                    operand,
                } => operand.as_ref(),
                _ => expr,
            };
            if matches!(inner.kind, ExprKind::CompositeLit { .. }) {
                let name = self.inline_func_expr(cx, inner, super::MethodKind::PlainStep);
                if !name.is_empty() {
                    return Some(StateUpdate::root(name));
                }
            }
        }
        self.expr_to_value(expr)
    }

    /// Resolves an expression into a call chain, following aliases.
    pub(super) fn expr_to_value(&self, expr: &Expr) -> Option<Rc<StateUpdate>> {
        match &expr.kind {
            ExprKind::Selector { operand, field } => self
                .expr_to_value(operand)
                .map(|parent| StateUpdate::child(&parent, field.as_str())),
            ExprKind::Call { function, args } => self
                .expr_to_value(function)
                .map(|call| call.with_call(args.clone())),
            ExprKind::Ident(name) => {
                Some(self.get_traced(name).unwrap_or_else(|| StateUpdate::root(name.as_str())))
            }
            _ => None,
        }
    }

    fn parse_call_to_ctx(&mut self, expr: &Expr) {
        let ExprKind::Call { function, args } = &expr.kind else {
            return;
        };
        let Some(call) = self.expr_to_value(function) else {
            return;
        };
        if !call.is_direct_context_call() {
            self.look_for_adapter_call(&call);
            return;
        }
        let [arg] = args.as_slice() else {
            return;
        };

        match call.name.as_str() {
            "SetDefaultMigration" => self.defaults.migration = Some(arg.clone()),
            "SetDefaultFlags" => self.defaults.step_flags = Some(arg.clone()),
            "SetDefaultErrorHandler" => self.defaults.error_handler = Some(arg.clone()),
            _ => {}
        }
        self.usages.insert(call.name.clone());
    }

    /// Records `x.PrepareY(ctx, ...).Start()` / `.Send()` adapter calls.
    fn look_for_adapter_call(&mut self, call: &StateUpdate) {
        if !call.args.is_empty() || !matches!(call.name.as_str(), "Start" | "Send") {
            return;
        }

        let prepare = call
            .ancestors()
            .take_while(|segment| segment.has_name())
            .find(|segment| segment.name.starts_with("Prepare"));

        if let Some(prepare) = prepare {
            if prepare.args.iter().any(|arg| self.is_context_arg(arg)) {
                let usage = format!("adapter:{}.{}", prepare.name, call.name);
                log::debug!("Adapter call {usage}");
                self.usages.insert(usage);
            }
        }
    }

    fn is_context_arg(&self, arg: &Expr) -> bool {
        self.expr_to_value(arg)
            .is_some_and(|value| value.is_context_marker())
    }
}

fn plain_name(expr: &Expr) -> Option<&str> {
    match &expr.kind {
        ExprKind::Ident(name) => Some(name.as_str()),
        _ => None,
    }
}
