//! Why a component was selected.

use std::fmt;

/// The kind of event that contributed to a selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SelectionCause {
    Root,
    Requested,
    Constraint,
    Forced,
    ConflictResolution,
    SelectedByRule,
    CompositeBuild,
    ByAncestor,
    Rejection,
}

impl SelectionCause {
    pub fn default_description(self) -> &'static str {
        match self {
            SelectionCause::Root => "root",
            SelectionCause::Requested => "requested",
            SelectionCause::Constraint => "constraint",
            SelectionCause::Forced => "forced",
            SelectionCause::ConflictResolution => "conflict resolution",
            SelectionCause::SelectedByRule => "selected by rule",
            SelectionCause::CompositeBuild => "composite build substitution",
            SelectionCause::ByAncestor => "by ancestor",
            SelectionCause::Rejection => "rejection",
        }
    }
}

/// One cause, optionally with a custom description.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SelectionDescriptor {
    pub cause: SelectionCause,
    description: Option<String>,
}

impl SelectionDescriptor {
    pub fn new(cause: SelectionCause) -> Self {
        Self {
            cause,
            description: None,
        }
    }

    pub fn with_description(&self, description: impl Into<String>) -> Self {
        Self {
            cause: self.cause,
            description: Some(description.into()),
        }
    }

    pub fn has_custom_description(&self) -> bool {
        self.description.is_some()
    }

    pub fn description(&self) -> &str {
        self.description
            .as_deref()
            .unwrap_or_else(|| self.cause.default_description())
    }
}

impl fmt::Display for SelectionDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.description {
            Some(d) => write!(f, "{}: {d}", self.cause.default_description()),
            None => f.write_str(self.cause.default_description()),
        }
    }
}

/// The accumulated reasons for one selection, in the order they were added.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionReason {
    descriptors: Vec<SelectionDescriptor>,
}

impl SelectionReason {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn of(descriptors: &[SelectionDescriptor]) -> Self {
        let mut reason = Self::new();
        for d in descriptors {
            reason.add_cause(d.clone());
        }
        reason
    }

    /// Add a cause unless an identical one is already recorded.
    pub fn add_cause(&mut self, descriptor: SelectionDescriptor) {
        if !self.descriptors.contains(&descriptor) {
            self.descriptors.push(descriptor);
        }
    }

    pub fn descriptors(&self) -> &[SelectionDescriptor] {
        &self.descriptors
    }

    pub fn has_cause(&self, cause: SelectionCause) -> bool {
        self.descriptors.iter().any(|d| d.cause == cause)
    }

    pub fn is_forced(&self) -> bool {
        self.has_cause(SelectionCause::Forced)
    }

    pub fn is_conflict_resolution(&self) -> bool {
        self.has_cause(SelectionCause::ConflictResolution)
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }
}

impl fmt::Display for SelectionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, d) in self.descriptors.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{d}")?;
        }
        Ok(())
    }
}

/// `"s"` unless there is exactly one item.
pub(crate) fn plural_ending<T>(items: &[T]) -> &'static str {
    if items.len() == 1 {
        ""
    } else {
        "s"
    }
}
