//! Symbolic values produced while tracing a step body.
//!
//! A value is a reverse-linked chain of selector and call segments. Chains
//! rooted at the context argument carry `is_context` on every segment.

use crate::core::Expr;
use std::rc::Rc;

#[derive(Clone, Debug, Default)]
pub struct StateUpdate {
    parent: Option<Rc<StateUpdate>>,
    pub name: String,
    /// Arguments of the call when this segment is an invocation.
    pub args: Vec<Expr>,
    pub is_context: bool,
    pub is_call: bool,
}

impl StateUpdate {
    /// The value every alias of the context argument resolves to.
    pub fn context_marker() -> Rc<Self> {
        Rc::new(Self {
            is_context: true,
            ..Self::default()
        })
    }

    /// A chain rooted at an ordinary identifier.
    pub fn root(name: impl Into<String>) -> Rc<Self> {
        Rc::new(Self {
            name: name.into(),
            ..Self::default()
        })
    }

    /// Selector segment `parent.name`.
    pub fn child(parent: &Rc<Self>, name: impl Into<String>) -> Rc<Self> {
        Rc::new(Self {
            parent: Some(Rc::clone(parent)),
            name: name.into(),
            is_context: parent.is_context,
            ..Self::default()
        })
    }

    /// The same segment turned into an invocation with `args`.
    pub fn with_call(&self, args: Vec<Expr>) -> Rc<Self> {
        Rc::new(Self {
            parent: self.parent.clone(),
            name: self.name.clone(),
            args,
            is_context: self.is_context,
            is_call: true,
        })
    }

    pub fn parent(&self) -> Option<&Rc<StateUpdate>> {
        self.parent.as_ref()
    }

    pub fn is_context_marker(&self) -> bool {
        self.is_context && self.parent.is_none() && self.name.is_empty() && !self.is_call
    }

    /// Whether this segment is invoked directly on the context argument.
    pub fn is_direct_context_call(&self) -> bool {
        self.parent.as_deref().is_some_and(StateUpdate::is_context_marker)
    }

    pub fn has_name(&self) -> bool {
        !self.name.is_empty()
    }

    /// Dotted name of the whole chain, root first.
    pub fn full_name(&self) -> String {
        match &self.parent {
            None => self.name.clone(),
            Some(parent) => format!("{}.{}", parent.full_name(), self.name),
        }
    }

    /// Segments from the parent of this one up to the root.
    pub fn ancestors(&self) -> impl Iterator<Item = &StateUpdate> {
        std::iter::successors(self.parent.as_deref(), |s| s.parent.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_flag_is_inherited() {
        let ctx = StateUpdate::context_marker();
        let jump = StateUpdate::child(&ctx, "Jump");
        assert!(jump.is_context);
        assert!(jump.is_direct_context_call());
        assert!(!jump.is_context_marker());

        let plain = StateUpdate::child(&StateUpdate::root("s"), "next");
        assert!(!plain.is_context);
        assert!(!plain.is_direct_context_call());
    }

    #[test]
    fn test_full_name() {
        let s = StateUpdate::root("s");
        let chain = StateUpdate::child(&StateUpdate::child(&s, "adapter"), "Send");
        assert_eq!(chain.full_name(), "s.adapter.Send");

        let ctx = StateUpdate::child(&StateUpdate::context_marker(), "Jump");
        assert_eq!(ctx.full_name(), ".Jump");
    }

    #[test]
    fn test_ancestors_walk_to_root() {
        let s = StateUpdate::root("s");
        let chain = StateUpdate::child(&StateUpdate::child(&s, "a"), "b");
        let names: Vec<_> = chain.ancestors().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["a", "s"]);
    }

    #[test]
    fn test_with_call_keeps_chain() {
        let ctx = StateUpdate::context_marker();
        let stop = StateUpdate::child(&ctx, "Stop").with_call(Vec::new());
        assert!(stop.is_call);
        assert!(stop.is_direct_context_call());
        assert_eq!(stop.name, "Stop");
    }
}
