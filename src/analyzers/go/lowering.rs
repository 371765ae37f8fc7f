//! Lowering of the tree-sitter Go tree into [`crate::core::ast`].
//!
//! Only function and method declarations and imports are kept at file level.
//! Statements and expressions keep their byte spans so condition summaries can
//! fall back to source excerpts.

use super::parser::node_text;
use crate::core::{
    BranchKind, Decl, Expr, ExprKind, Field, FuncDecl, FuncLit, Import, SourceFile, Span, Stmt,
    UnaryOp, ValueSpec,
};
use std::path::Path;
use tree_sitter::{Node, Tree};

pub fn lower_file(tree: &Tree, source: &str, path: &Path) -> SourceFile {
    let lowering = Lowering { source };
    let mut imports = Vec::new();
    let mut decls = Vec::new();

    for child in named_children(tree.root_node()) {
        match child.kind() {
            "import_declaration" => lowering.collect_imports(child, &mut imports),
            "function_declaration" | "method_declaration" => decls.push(lowering.func_decl(child)),
            _ => {}
        }
    }

    SourceFile {
        path: path.to_path_buf(),
        source: source.to_string(),
        imports,
        decls,
    }
}

/// Named children without comments.
fn named_children(node: Node<'_>) -> Vec<Node<'_>> {
    let mut cursor = node.walk();
    node.named_children(&mut cursor)
        .filter(|child| child.kind() != "comment")
        .collect()
}

/// Named children that are not attached to a grammar field.
fn unfielded_children(node: Node<'_>) -> Vec<Node<'_>> {
    let mut out = Vec::new();
    let mut cursor = node.walk();
    if cursor.goto_first_child() {
        loop {
            let child = cursor.node();
            if child.is_named() && child.kind() != "comment" && cursor.field_name().is_none() {
                out.push(child);
            }
            if !cursor.goto_next_sibling() {
                break;
            }
        }
    }
    out
}

fn span_of(node: &Node) -> Span {
    Span::new(node.start_byte(), node.end_byte())
}

struct Lowering<'s> {
    source: &'s str,
}

impl<'s> Lowering<'s> {
    fn text(&self, node: &Node) -> String {
        node_text(node, self.source).to_string()
    }

    fn field_text(&self, node: &Node, field: &str) -> String {
        node.child_by_field_name(field)
            .map(|n| self.text(&n))
            .unwrap_or_default()
    }

    fn collect_imports(&self, node: Node<'_>, out: &mut Vec<Import>) {
        for child in named_children(node) {
            match child.kind() {
                "import_spec" => {
                    let path = self.field_text(&child, "path");
                    out.push(Import {
                        name: child.child_by_field_name("name").map(|n| self.text(&n)),
                        path: unquote(&path),
                    });
                }
                "import_spec_list" => self.collect_imports(child, out),
                _ => {}
            }
        }
    }

    fn func_decl(&self, node: Node<'_>) -> FuncDecl {
        FuncDecl {
            name: self.field_text(&node, "name"),
            receiver: node
                .child_by_field_name("receiver")
                .map(|n| self.fields(n)),
            params: node
                .child_by_field_name("parameters")
                .map(|n| self.fields(n))
                .unwrap_or_default(),
            results: self.results(&node),
            body: node.child_by_field_name("body").map(|n| self.statements(n)),
            span: span_of(&node),
        }
    }

    fn results(&self, node: &Node) -> Vec<Field> {
        match node.child_by_field_name("result") {
            Some(list) if list.kind() == "parameter_list" => self.fields(list),
            Some(ty) => vec![Field::new(Vec::new(), self.type_expr(ty))],
            None => Vec::new(),
        }
    }

    fn fields(&self, list: Node<'_>) -> Vec<Field> {
        named_children(list)
            .into_iter()
            .filter_map(|decl| {
                let variadic = match decl.kind() {
                    "parameter_declaration" => false,
                    "variadic_parameter_declaration" => true,
                    _ => return None,
                };
                let mut cursor = decl.walk();
                let names = decl
                    .children_by_field_name("name", &mut cursor)
                    .map(|n| self.text(&n))
                    .collect();
                let ty = decl
                    .child_by_field_name("type")
                    .map(|t| self.type_expr(t))
                    .unwrap_or_else(|| Expr::opaque(span_of(&decl)));
                Some(Field { names, ty, variadic })
            })
            .collect()
    }

    fn type_expr(&self, node: Node<'_>) -> Expr {
        let span = span_of(&node);
        let kind = match node.kind() {
            "type_identifier" | "identifier" | "package_identifier" => {
                ExprKind::Ident(self.text(&node))
            }
            "qualified_type" => ExprKind::Selector {
                operand: Box::new(Expr::new(
                    ExprKind::Ident(self.field_text(&node, "package")),
                    span,
                )),
                field: self.field_text(&node, "name"),
            },
            "pointer_type" => match named_children(node).into_iter().next() {
                Some(inner) => ExprKind::Star(Box::new(self.type_expr(inner))),
                None => ExprKind::Opaque,
            },
            "parenthesized_type" => match named_children(node).into_iter().next() {
                Some(inner) => ExprKind::Paren(Box::new(self.type_expr(inner))),
                None => ExprKind::Opaque,
            },
            "generic_type" => match node.child_by_field_name("type") {
                Some(base) => ExprKind::Index {
                    operand: Box::new(self.type_expr(base)),
                    index: Box::new(Expr::opaque(span)),
                },
                None => ExprKind::Opaque,
            },
            _ => ExprKind::Opaque,
        };
        Expr::new(kind, span)
    }

    /// Statements of a block or case body, flattening `statement_list` wrappers.
    fn statements(&self, node: Node<'_>) -> Vec<Stmt> {
        let mut out = Vec::new();
        for child in unfielded_children(node) {
            if child.kind() == "statement_list" {
                out.extend(self.statements(child));
            } else {
                out.push(self.stmt(child));
            }
        }
        out
    }

    fn field_statements(&self, node: &Node, field: &str) -> Vec<Stmt> {
        node.child_by_field_name(field)
            .map(|n| self.statements(n))
            .unwrap_or_default()
    }

    fn stmt(&self, node: Node<'_>) -> Stmt {
        match node.kind() {
            "block" => Stmt::Block(self.statements(node)),
            "expression_statement" => match named_children(node).into_iter().next() {
                Some(expr) => Stmt::Expr(self.expr(expr)),
                None => Stmt::Empty,
            },
            "short_var_declaration" | "assignment_statement" => Stmt::Assign {
                lhs: self.expr_list(node.child_by_field_name("left")),
                rhs: self.expr_list(node.child_by_field_name("right")),
            },
            "receive_statement" => {
                let right = self.expr_list(node.child_by_field_name("right"));
                match node.child_by_field_name("left") {
                    Some(left) => Stmt::Assign {
                        lhs: self.expr_list(Some(left)),
                        rhs: right,
                    },
                    None => right.into_iter().next().map_or(Stmt::Empty, Stmt::Expr),
                }
            }
            "send_statement" => Stmt::Send {
                channel: self.field_expr(&node, "channel"),
                value: self.field_expr(&node, "value"),
            },
            "inc_statement" | "dec_statement" => match named_children(node).into_iter().next() {
                Some(expr) => Stmt::IncDec(self.expr(expr)),
                None => Stmt::Empty,
            },
            "return_statement" => Stmt::Return(
                named_children(node)
                    .into_iter()
                    .next()
                    .map(|list| self.expr_list(Some(list)))
                    .unwrap_or_default(),
            ),
            "go_statement" => match named_children(node).into_iter().next() {
                Some(expr) => Stmt::Go(self.expr(expr)),
                None => Stmt::Empty,
            },
            "defer_statement" => match named_children(node).into_iter().next() {
                Some(expr) => Stmt::Defer(self.expr(expr)),
                None => Stmt::Empty,
            },
            "if_statement" => Stmt::If {
                cond: self.field_expr(&node, "condition"),
                body: self.field_statements(&node, "consequence"),
                alternative: node
                    .child_by_field_name("alternative")
                    .map(|alt| Box::new(self.stmt(alt))),
            },
            "for_statement" => {
                let body = self.field_statements(&node, "body");
                if named_children(node)
                    .iter()
                    .any(|c| c.kind() == "range_clause")
                {
                    Stmt::Range { body }
                } else {
                    Stmt::For { body }
                }
            }
            "expression_switch_statement" => Stmt::Switch {
                body: self.case_clauses(node),
            },
            "type_switch_statement" => Stmt::TypeSwitch {
                body: self.case_clauses(node),
            },
            "select_statement" => Stmt::Select {
                body: self.case_clauses(node),
            },
            "labeled_statement" => Stmt::Labeled {
                label: self.field_text(&node, "label"),
                stmt: Box::new(
                    unfielded_children(node)
                        .into_iter()
                        .next()
                        .map_or(Stmt::Empty, |s| self.stmt(s)),
                ),
            },
            "break_statement" => Stmt::Branch(BranchKind::Break),
            "continue_statement" => Stmt::Branch(BranchKind::Continue),
            "goto_statement" => Stmt::Branch(BranchKind::Goto),
            "fallthrough_statement" => Stmt::Branch(BranchKind::Fallthrough),
            "var_declaration" => Stmt::Decl(Decl::Var(self.value_specs(node, "var_spec"))),
            "const_declaration" => Stmt::Decl(Decl::Const(self.value_specs(node, "const_spec"))),
            "type_declaration" => Stmt::Decl(Decl::Type(self.type_names(node))),
            _ => Stmt::Empty,
        }
    }

    fn case_clauses(&self, node: Node<'_>) -> Vec<Stmt> {
        named_children(node)
            .into_iter()
            .filter_map(|clause| match clause.kind() {
                "expression_case" => Some(Stmt::CaseClause {
                    list: self.expr_list(clause.child_by_field_name("value")),
                    body: self.statements(clause),
                }),
                "type_case" => {
                    let mut cursor = clause.walk();
                    let list = clause
                        .children_by_field_name("type", &mut cursor)
                        .filter(|t| t.is_named())
                        .map(|t| self.type_expr(t))
                        .collect();
                    Some(Stmt::CaseClause {
                        list,
                        body: self.statements(clause),
                    })
                }
                "communication_case" => Some(Stmt::CommClause {
                    comm: clause
                        .child_by_field_name("communication")
                        .map(|c| Box::new(self.stmt(c))),
                    body: self.statements(clause),
                }),
                "default_case" if node.kind() == "select_statement" => Some(Stmt::CommClause {
                    comm: None,
                    body: self.statements(clause),
                }),
                "default_case" => Some(Stmt::CaseClause {
                    list: Vec::new(),
                    body: self.statements(clause),
                }),
                _ => None,
            })
            .collect()
    }

    fn value_specs(&self, node: Node<'_>, spec_kind: &str) -> Vec<ValueSpec> {
        let mut specs = Vec::new();
        for child in named_children(node) {
            if child.kind() == spec_kind {
                let mut cursor = child.walk();
                let names = child
                    .children_by_field_name("name", &mut cursor)
                    .map(|n| self.text(&n))
                    .collect();
                specs.push(ValueSpec {
                    names,
                    values: self.expr_list(child.child_by_field_name("value")),
                });
            } else if child.kind().ends_with("_spec_list") {
                specs.extend(self.value_specs(child, spec_kind));
            }
        }
        specs
    }

    fn type_names(&self, node: Node<'_>) -> Vec<String> {
        named_children(node)
            .into_iter()
            .filter(|c| matches!(c.kind(), "type_spec" | "type_alias"))
            .map(|c| self.field_text(&c, "name"))
            .collect()
    }

    fn expr_list(&self, node: Option<Node<'_>>) -> Vec<Expr> {
        match node {
            Some(list) if list.kind() == "expression_list" => named_children(list)
                .into_iter()
                .map(|e| self.expr(e))
                .collect(),
            Some(single) => vec![self.expr(single)],
            None => Vec::new(),
        }
    }

    fn field_expr(&self, node: &Node, field: &str) -> Expr {
        node.child_by_field_name(field)
            .map(|n| self.expr(n))
            .unwrap_or_else(|| Expr::opaque(span_of(node)))
    }

    fn first_named_expr(&self, node: Node<'_>) -> Expr {
        named_children(node)
            .into_iter()
            .next()
            .map(|inner| self.expr(inner))
            .unwrap_or_else(|| Expr::opaque(span_of(&node)))
    }

    fn expr(&self, node: Node<'_>) -> Expr {
        let span = span_of(&node);
        let kind = match node.kind() {
            "identifier" | "field_identifier" | "package_identifier" | "type_identifier"
            | "nil" | "true" | "false" | "iota" => ExprKind::Ident(self.text(&node)),
            "selector_expression" => ExprKind::Selector {
                operand: Box::new(self.field_expr(&node, "operand")),
                field: self.field_text(&node, "field"),
            },
            "call_expression" => ExprKind::Call {
                function: Box::new(self.field_expr(&node, "function")),
                args: node
                    .child_by_field_name("arguments")
                    .map(|args| self.arguments(args))
                    .unwrap_or_default(),
            },
            "type_conversion_expression" => ExprKind::Call {
                function: Box::new(
                    node.child_by_field_name("type")
                        .map(|t| self.type_expr(t))
                        .unwrap_or_else(|| Expr::opaque(span)),
                ),
                args: vec![self.field_expr(&node, "operand")],
            },
            "composite_literal" => ExprKind::CompositeLit {
                ty: node
                    .child_by_field_name("type")
                    .map(|t| Box::new(self.type_expr(t))),
                elements: node
                    .child_by_field_name("body")
                    .map(|body| self.literal_elements(body))
                    .unwrap_or_default(),
            },
            "literal_value" => ExprKind::CompositeLit {
                ty: None,
                elements: self.literal_elements(node),
            },
            "literal_element" | "variadic_argument" => return self.first_named_expr(node),
            "keyed_element" => {
                let parts = named_children(node);
                let key = node.child_by_field_name("key").or(parts.first().copied());
                let value = node.child_by_field_name("value").or(parts.get(1).copied());
                match (key, value) {
                    (Some(key), Some(value)) => ExprKind::KeyValue {
                        key: Box::new(self.expr(key)),
                        value: Box::new(self.expr(value)),
                    },
                    _ => ExprKind::Opaque,
                }
            }
            "unary_expression" => {
                let operand = Box::new(self.field_expr(&node, "operand"));
                let op = node
                    .child_by_field_name("operator")
                    .map(|o| o.kind().to_string())
                    .unwrap_or_default();
                if op == "*" {
                    ExprKind::Star(operand)
                } else {
                    match UnaryOp::from_token(&op) {
                        Some(op) => ExprKind::Unary { op, operand },
                        None => ExprKind::Opaque,
                    }
                }
            }
            "binary_expression" => ExprKind::Binary {
                op: node
                    .child_by_field_name("operator")
                    .map(|o| o.kind().to_string())
                    .unwrap_or_default(),
                left: Box::new(self.field_expr(&node, "left")),
                right: Box::new(self.field_expr(&node, "right")),
            },
            "parenthesized_expression" => ExprKind::Paren(Box::new(self.first_named_expr(node))),
            "index_expression" => ExprKind::Index {
                operand: Box::new(self.field_expr(&node, "operand")),
                index: Box::new(self.field_expr(&node, "index")),
            },
            "slice_expression" => ExprKind::Slice {
                operand: Box::new(self.field_expr(&node, "operand")),
            },
            "type_assertion_expression" => ExprKind::TypeAssert {
                operand: Box::new(self.field_expr(&node, "operand")),
                ty: node
                    .child_by_field_name("type")
                    .map(|t| Box::new(self.type_expr(t))),
            },
            "func_literal" => ExprKind::FuncLit(Box::new(FuncLit {
                params: node
                    .child_by_field_name("parameters")
                    .map(|p| self.fields(p))
                    .unwrap_or_default(),
                results: self.results(&node),
                body: self.field_statements(&node, "body"),
            })),
            "interpreted_string_literal" | "raw_string_literal" | "int_literal"
            | "float_literal" | "imaginary_literal" | "rune_literal" => {
                ExprKind::BasicLit(self.text(&node))
            }
            "qualified_type" | "pointer_type" | "generic_type" | "parenthesized_type" => {
                return self.type_expr(node)
            }
            _ => ExprKind::Opaque,
        };
        Expr::new(kind, span)
    }

    fn arguments(&self, node: Node<'_>) -> Vec<Expr> {
        named_children(node)
            .into_iter()
            .map(|arg| self.expr(arg))
            .collect()
    }

    fn literal_elements(&self, node: Node<'_>) -> Vec<Expr> {
        named_children(node)
            .into_iter()
            .map(|el| self.expr(el))
            .collect()
    }
}

fn unquote(literal: &str) -> String {
    let trimmed = literal.trim();
    if trimmed.len() >= 2 {
        trimmed[1..trimmed.len() - 1].to_string()
    } else {
        trimmed.to_string()
    }
}
