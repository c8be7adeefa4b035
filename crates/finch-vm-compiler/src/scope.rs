//! Scope management for local variable resolution

/// Most locals a single function can hold, receiver slot included
pub const MAX_LOCALS: usize = u16::MAX as usize;

/// A local variable binding
#[derive(Debug, Clone)]
pub struct Local {
    /// Variable name; empty names can never be resolved
    pub name: String,
    /// Block depth the local was declared at
    pub depth: usize,
    /// Is this captured by a closure
    pub is_captured: bool,
}

/// Locals of one function, in stack slot order
///
/// A local's index in the list is its frame-relative stack slot, so locals
/// must be declared exactly when their value is on top of the stack.
#[derive(Debug, Default)]
pub struct ScopeChain {
    locals: Vec<Local>,
    depth: usize,
}

impl ScopeChain {
    /// Create a scope chain whose slot 0 holds the receiver under `receiver`
    pub fn new(receiver: &str) -> Self {
        Self {
            locals: vec![Local {
                name: receiver.to_string(),
                depth: 0,
                is_captured: false,
            }],
            depth: 0,
        }
    }

    /// Current block depth (0 = function top level)
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Number of live locals
    pub fn len(&self) -> usize {
        self.locals.len()
    }

    /// Whether there are no locals (never true once created)
    pub fn is_empty(&self) -> bool {
        self.locals.is_empty()
    }

    /// Enter a block
    pub fn enter(&mut self) {
        self.depth += 1;
    }

    /// Exit a block, returning the locals it declared innermost first
    pub fn exit(&mut self) -> Vec<Local> {
        let keep = self
            .locals
            .iter()
            .position(|l| l.depth >= self.depth)
            .unwrap_or(self.locals.len());
        let mut dropped = self.locals.split_off(keep);
        dropped.reverse();
        self.depth -= 1;
        dropped
    }

    /// Locals declared deeper than `depth`, innermost first, without removing them
    pub fn locals_deeper_than(&self, depth: usize) -> impl Iterator<Item = &Local> {
        self.locals.iter().rev().take_while(move |l| l.depth > depth)
    }

    /// Declare a local in the current block; returns its slot
    ///
    /// Returns `None` if the name is already declared in this block.
    pub fn declare(&mut self, name: &str) -> Option<u16> {
        let duplicate = self
            .locals
            .iter()
            .rev()
            .take_while(|l| l.depth == self.depth)
            .any(|l| !name.is_empty() && l.name == name);
        if duplicate {
            return None;
        }
        self.locals.push(Local {
            name: name.to_string(),
            depth: self.depth,
            is_captured: false,
        });
        Some((self.locals.len() - 1) as u16)
    }

    /// Resolve a name to a slot, innermost declaration first
    pub fn resolve(&self, name: &str) -> Option<u16> {
        if name.is_empty() {
            return None;
        }
        self.locals
            .iter()
            .rposition(|l| l.name == name)
            .map(|i| i as u16)
    }

    /// Mark the local in `slot` as captured by a closure
    pub fn mark_captured(&mut self, slot: u16) {
        if let Some(local) = self.locals.get_mut(slot as usize) {
            local.is_captured = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_declare_and_resolve() {
        let mut chain = ScopeChain::new("this");
        assert_eq!(chain.declare("x"), Some(1));
        assert_eq!(chain.declare("y"), Some(2));
        assert_eq!(chain.resolve("this"), Some(0));
        assert_eq!(chain.resolve("y"), Some(2));
        assert_eq!(chain.declare("x"), None);
    }

    #[test]
    fn test_nested_scopes() {
        let mut chain = ScopeChain::new("");
        chain.declare("x");

        chain.enter();
        assert_eq!(chain.declare("x"), Some(2));
        assert_eq!(chain.resolve("x"), Some(2));
        chain.declare("y");
        assert_eq!(chain.locals_deeper_than(0).count(), 2);

        let dropped = chain.exit();
        assert_eq!(dropped.len(), 2);
        assert_eq!(dropped[0].name, "y");

        // Shadowed binding is visible again
        assert_eq!(chain.resolve("x"), Some(1));
        assert_eq!(chain.resolve("y"), None);
    }

    #[test]
    fn test_unnamed_receiver_is_unresolvable() {
        let chain = ScopeChain::new("");
        assert_eq!(chain.resolve(""), None);
    }
}
