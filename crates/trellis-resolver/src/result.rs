//! The outcome of turning a selector into a concrete component id.

use miette::Diagnostic;
use thiserror::Error;

use trellis_core::module::ComponentIdentifier;
use trellis_core::selector::{VersionRejects, VersionSelector};
use trellis_core::version::Version;

use crate::dependency::DependencyState;

/// A selector could not be resolved to any component.
#[derive(Debug, Clone, PartialEq, Eq, Error, Diagnostic)]
#[error("Could not resolve {selector}: {message}")]
pub struct ResolveFailure {
    pub selector: String,
    pub message: String,
}

impl ResolveFailure {
    pub fn new(selector: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            selector: selector.into(),
            message: message.into(),
        }
    }
}

/// Why a candidate version was skipped during resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectionKind {
    /// A `reject` entry somewhere in the graph matched it.
    BySelector,
    /// A component selection rule refused it.
    ByRule { reason: Option<String> },
    /// Its attributes did not match the consumer.
    ByAttributes { description: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedVersion {
    pub version: Version,
    pub kind: RejectionKind,
}

/// Result of a single id resolution.
///
/// `rejected` means an id was found but the global rejects refuse it; such a
/// result is final for its selector until the selector is released.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdResolveResult {
    outcome: Result<ComponentIdentifier, ResolveFailure>,
    rejected: bool,
    rejected_versions: Vec<RejectedVersion>,
    unmatched_versions: Vec<Version>,
}

impl IdResolveResult {
    pub fn resolved(id: ComponentIdentifier) -> Self {
        Self {
            outcome: Ok(id),
            rejected: false,
            rejected_versions: Vec::new(),
            unmatched_versions: Vec::new(),
        }
    }

    pub fn rejected(id: ComponentIdentifier) -> Self {
        Self {
            rejected: true,
            ..Self::resolved(id)
        }
    }

    pub fn failed(failure: ResolveFailure) -> Self {
        Self {
            outcome: Err(failure),
            rejected: false,
            rejected_versions: Vec::new(),
            unmatched_versions: Vec::new(),
        }
    }

    pub fn with_rejected_versions(mut self, rejected: Vec<RejectedVersion>) -> Self {
        self.rejected_versions = rejected;
        self
    }

    pub fn with_unmatched_versions(mut self, unmatched: Vec<Version>) -> Self {
        self.unmatched_versions = unmatched;
        self
    }

    pub fn id(&self) -> Option<&ComponentIdentifier> {
        self.outcome.as_ref().ok()
    }

    pub fn version(&self) -> Option<&Version> {
        self.id().map(ComponentIdentifier::version)
    }

    pub fn failure(&self) -> Option<&ResolveFailure> {
        self.outcome.as_ref().err()
    }

    pub fn is_failed(&self) -> bool {
        self.outcome.is_err()
    }

    pub fn is_rejected(&self) -> bool {
        self.rejected
    }

    pub fn rejected_versions(&self) -> &[RejectedVersion] {
        &self.rejected_versions
    }

    pub fn unmatched_versions(&self) -> &[Version] {
        &self.unmatched_versions
    }
}

/// Resolves one half (required or preferred) of a dependency's constraint.
pub trait ComponentIdResolver {
    /// `selector` is `None` for dependencies with no version opinion, such
    /// as project dependencies.
    fn resolve(
        &mut self,
        dependency: &DependencyState,
        selector: Option<&VersionSelector>,
        rejects: Option<&VersionRejects>,
    ) -> IdResolveResult;
}
