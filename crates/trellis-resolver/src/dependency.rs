//! An incoming dependency request as seen by the selector layer.

use trellis_core::module::ComponentSelector;
use trellis_core::scenario::DependencyDecl;

use crate::reason::{SelectionCause, SelectionDescriptor};
use crate::result::ResolveFailure;

/// Opaque client module definition attached to a dependency.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClientModule {
    pub id: String,
}

/// One dependency request. Selectors compare these by identity
/// (`Rc::ptr_eq`), so each declaration should be wrapped once.
#[derive(Debug, Clone)]
pub struct DependencyState {
    pub requested: ComponentSelector,
    pub forced: bool,
    /// The request came from a lenient platform edge.
    pub lenient_platform: bool,
    pub from_lock: bool,
    pub changing: bool,
    pub constraint: bool,
    pub reason: Option<String>,
    pub client_module: Option<ClientModule>,
    /// A failure known before any resolution is attempted.
    pub failure: Option<ResolveFailure>,
}

impl DependencyState {
    pub fn new(requested: ComponentSelector) -> Self {
        Self {
            requested,
            forced: false,
            lenient_platform: false,
            from_lock: false,
            changing: false,
            constraint: false,
            reason: None,
            client_module: None,
            failure: None,
        }
    }

    pub fn from_decl(decl: &DependencyDecl) -> Self {
        Self {
            forced: decl.force,
            changing: decl.changing,
            constraint: decl.constraint,
            reason: decl.reason.clone(),
            client_module: decl.client_module.clone().map(|id| ClientModule { id }),
            ..Self::new(decl.selector())
        }
    }

    pub fn forced(mut self) -> Self {
        self.forced = true;
        self
    }

    pub fn lenient_platform(mut self) -> Self {
        self.lenient_platform = true;
        self
    }

    pub fn from_lock(mut self) -> Self {
        self.from_lock = true;
        self
    }

    pub fn constraint(mut self) -> Self {
        self.constraint = true;
        self
    }

    /// Forced, but not by a lenient platform edge.
    pub fn is_platform_forced(&self) -> bool {
        self.forced && !self.lenient_platform
    }

    /// Append this request's selection causes, skipping ones already present.
    pub fn add_selection_reasons(&self, reasons: &mut Vec<SelectionDescriptor>) {
        let cause = if self.constraint {
            SelectionCause::Constraint
        } else {
            SelectionCause::Requested
        };
        let mut descriptor = SelectionDescriptor::new(cause);
        if let Some(reason) = &self.reason {
            descriptor = descriptor.with_description(reason.clone());
        }
        push_unique(reasons, descriptor);
        if self.forced {
            push_unique(reasons, SelectionDescriptor::new(SelectionCause::Forced));
        }
    }
}

fn push_unique(reasons: &mut Vec<SelectionDescriptor>, descriptor: SelectionDescriptor) {
    if !reasons.contains(&descriptor) {
        reasons.push(descriptor);
    }
}
