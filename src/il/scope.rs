//! Two-Phase Name Resolution
//!
//! A [`Scope`] is a namespace for one kind of item (variables, labels,
//! functions, ...). Names may be mentioned before they are defined: the first
//! mention allocates the referent's arena handle and records the name as
//! *pending*; a later definition promotes it to *bound*. Names still pending
//! once construction finishes were referenced but never defined, which is a
//! construction-time error for labels and functions.
//!
//! The handle type is generic so the same resolver serves every arena
//! (`VarId`, `LabelId`, `FunId`, `ExtId`).

use crate::common::span::Span;
use std::collections::HashMap;

/// A namespace mapping names to arena handles, with pending-reference
/// bookkeeping for use-before-definition.
#[derive(Clone, Debug, Default)]
pub struct Scope<Id> {
    bound: HashMap<String, Id>,
    pending: HashMap<String, (Id, Span)>,
}

impl<Id: Copy> Scope<Id> {
    pub fn new() -> Self {
        Scope {
            bound: HashMap::new(),
            pending: HashMap::new(),
        }
    }

    /// Look up a name, whether bound or still pending. Both map to the same
    /// handle, so references made before the definition stay valid.
    pub fn lookup(&self, name: &str) -> Option<Id> {
        self.bound
            .get(name)
            .or_else(|| self.pending.get(name).map(|(id, _)| id))
            .copied()
    }

    /// Whether `name` has been defined (not merely referenced)
    pub fn is_defined(&self, name: &str) -> bool {
        self.bound.contains_key(name)
    }

    /// Record a reference to a not-yet-defined name. The span is that of the
    /// first mention, kept for diagnostics if the name never gets defined.
    pub fn add_pending(&mut self, name: &str, id: Id, span: Span) {
        self.pending.entry(name.to_string()).or_insert((id, span));
    }

    /// Define a name with no prior references
    pub fn add_bound(&mut self, name: &str, id: Id) {
        debug_assert!(!self.bound.contains_key(name) && !self.pending.contains_key(name));
        self.bound.insert(name.to_string(), id);
    }

    /// Promote a pending name to bound, returning its handle. Called when a
    /// definition arrives for a name that was already referenced.
    pub fn promote(&mut self, name: &str) -> Option<Id> {
        let (id, _) = self.pending.remove(name)?;
        self.bound.insert(name.to_string(), id);
        Some(id)
    }

    /// Names that were referenced but never defined, with the span of the
    /// first reference
    pub fn pending(&self) -> impl Iterator<Item = (&str, Id, Span)> {
        self.pending
            .iter()
            .map(|(name, (id, span))| (name.as_str(), *id, *span))
    }

    /// Names that have been defined
    pub fn bound(&self) -> impl Iterator<Item = (&str, Id)> {
        self.bound.iter().map(|(name, id)| (name.as_str(), *id))
    }
}
