//! Guard condition summaries for diagram edges.

use crate::core::{Expr, ExprKind, SourceFile, UnaryOp};

pub const DEFAULT_MAX_CONDITION_LEN: usize = 30;

/// Shortens guard expressions into short labels such as `[s.isReady()]`.
pub struct ConditionBuilder<'a> {
    file: &'a SourceFile,
    max_len: usize,
}

impl<'a> ConditionBuilder<'a> {
    pub fn new(file: &'a SourceFile, max_len: usize) -> Self {
        Self { file, max_len }
    }

    /// Label for a guard made of one or more alternatives (case lists).
    pub fn build(&self, conds: &[Expr], inverted: bool) -> String {
        let Some((first, rest)) = conds.split_first() else {
            return String::new();
        };
        let max_len = self.max_len as isize;

        let mut label = self.shorten_cond(first, max_len);
        for cond in rest {
            let remaining = max_len - label.len() as isize;
            if remaining > 3 {
                let part = self.shorten_cond(cond, remaining);
                if (part.len() as isize) < remaining + 3 {
                    label.push_str(&part);
                    continue;
                }
            }
            label.push_str("...");
            break;
        }

        let quoted = format!("{label:?}");
        let label = format!("[{}]", &quoted[1..quoted.len() - 1]);
        if inverted {
            format!("!{label}")
        } else {
            label
        }
    }

    fn shorten_cond(&self, cond: &Expr, max_len: isize) -> String {
        let short = shorten(cond, max_len);
        if !short.is_empty() {
            return short;
        }
        self.file.excerpt(cond.span, max_len.max(0) as usize)
    }
}

/// Structural summary of `expr` aiming at `max_len` characters.
pub fn shorten(expr: &Expr, max_len: isize) -> String {
    match &expr.kind {
        ExprKind::Selector { operand, field } => {
            let len = field.len() as isize;
            if len >= max_len {
                return format!("(...).{field}");
            }
            format!("{}.{field}", shorten(operand, max_len - len - 1))
        }
        ExprKind::Ident(name) => name.clone(),
        ExprKind::Call { function, .. } => format!("{}()", shorten(function, max_len - 2)),
        ExprKind::BasicLit(value) => value.clone(),
        ExprKind::FuncLit(_) => "func(){}".to_string(),
        ExprKind::CompositeLit { ty, .. } => {
            let ty = ty
                .as_deref()
                .map(|t| shorten(t, max_len - 2))
                .unwrap_or_default();
            format!("{ty}{{}}")
        }
        ExprKind::Paren(inner) => format!("({})", shorten(inner, max_len - 2)),
        ExprKind::Index { operand, .. } | ExprKind::Slice { operand } => {
            format!("{}[]", shorten(operand, max_len - 2))
        }
        ExprKind::TypeAssert { operand, .. } | ExprKind::Star(operand) => {
            shorten(operand, max_len)
        }
        ExprKind::Unary { op, operand } => match op {
            UnaryOp::Xor => format!("^{}", shorten(operand, max_len - 1)),
            UnaryOp::Not => format!("!{}", shorten(operand, max_len - 1)),
            _ => shorten(operand, max_len),
        },
        ExprKind::Binary { op, left, right } => {
            let tail = format!("{op}{}", shorten(right, max_len - 1 - op.len() as isize));
            if tail.len() as isize >= max_len {
                return format!("...{tail}");
            }
            format!("{}{tail}", shorten(left, max_len - tail.len() as isize))
        }
        ExprKind::KeyValue { .. } | ExprKind::Opaque => "(...)".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Span;
    use std::path::PathBuf;

    fn sel(x: &str, field: &str) -> Expr {
        Expr::new(
            ExprKind::Selector {
                operand: Box::new(Expr::ident(x)),
                field: field.into(),
            },
            Span::default(),
        )
    }

    fn call(function: Expr) -> Expr {
        Expr::new(
            ExprKind::Call {
                function: Box::new(function),
                args: vec![],
            },
            Span::default(),
        )
    }

    fn binary(op: &str, left: Expr, right: Expr) -> Expr {
        Expr::new(
            ExprKind::Binary {
                op: op.into(),
                left: Box::new(left),
                right: Box::new(right),
            },
            Span::default(),
        )
    }

    fn file() -> SourceFile {
        SourceFile {
            path: PathBuf::from("x.go"),
            source: String::new(),
            imports: vec![],
            decls: vec![],
        }
    }

    #[test]
    fn test_shorten_selector_call() {
        assert_eq!(shorten(&call(sel("s", "isReady")), 30), "s.isReady()");
    }

    #[test]
    fn test_shorten_long_selector() {
        let expr = sel("s", "aVeryLongFieldNameThatDoesNotFit");
        assert_eq!(shorten(&expr, 10), "(...).aVeryLongFieldNameThatDoesNotFit");
    }

    #[test]
    fn test_shorten_binary() {
        let expr = binary("!=", Expr::ident("err"), Expr::ident("nil"));
        assert_eq!(shorten(&expr, 30), "err!=nil");
    }

    #[test]
    fn test_shorten_binary_drops_left_when_too_long() {
        let expr = binary("&&", Expr::ident("a"), sel("s", "someLongCondition"));
        assert_eq!(shorten(&expr, 10), "...&&(...).someLongCondition");
    }

    #[test]
    fn test_build_single_and_inverted() {
        let f = file();
        let builder = ConditionBuilder::new(&f, DEFAULT_MAX_CONDITION_LEN);
        let cond = Expr::new(
            ExprKind::Unary {
                op: UnaryOp::Not,
                operand: Box::new(Expr::ident("done")),
            },
            Span::default(),
        );
        assert_eq!(builder.build(std::slice::from_ref(&cond), false), "[!done]");
        assert_eq!(builder.build(&[cond], true), "![!done]");
    }

    #[test]
    fn test_build_case_list() {
        let f = file();
        let builder = ConditionBuilder::new(&f, DEFAULT_MAX_CONDITION_LEN);
        let conds = vec![Expr::ident("stateA"), Expr::ident("stateB")];
        assert_eq!(builder.build(&conds, false), "[stateAstateB]");
    }

    #[test]
    fn test_build_case_list_truncates_when_budget_runs_out() {
        let f = file();
        let builder = ConditionBuilder::new(&f, 10);
        let conds = vec![Expr::ident("aaaaaaaa"), Expr::ident("b"), Expr::ident("c")];
        assert_eq!(builder.build(&conds, false), "[aaaaaaaa...]");
    }

    #[test]
    fn test_build_escapes_quotes() {
        let f = file();
        let builder = ConditionBuilder::new(&f, DEFAULT_MAX_CONDITION_LEN);
        let lit = Expr::new(ExprKind::BasicLit("\"x\"".into()), Span::default());
        assert_eq!(builder.build(&[lit], false), "[\\\"x\\\"]");
    }

    #[test]
    fn test_empty_summary_falls_back_to_excerpt() {
        let f = SourceFile {
            source: "if id == \"\" {".into(),
            ..file()
        };
        let builder = ConditionBuilder::new(&f, DEFAULT_MAX_CONDITION_LEN);
        let empty = Expr::new(ExprKind::Ident(String::new()), Span::new(3, 11));
        assert_eq!(builder.build(&[empty], false), "[id == \\\"\\\"]");
    }
}
