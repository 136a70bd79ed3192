use crate::resource::ChildKind;

#[derive(thiserror::Error, Debug)]
pub enum OwnershipError {
    #[error("owner {0} has no name or uid; cannot build a controller reference")]
    Unresolvable(String),
    #[error("already controlled by {kind} {name}")]
    AlreadyOwned { kind: String, name: String },
}

#[derive(thiserror::Error, Debug)]
pub enum BuildError {
    #[error("cluster {0} has no namespace")]
    MissingNamespace(String),
    #[error("object kind mismatch: expected {expected}, got {actual}")]
    KindMismatch { expected: ChildKind, actual: ChildKind },
    #[error("failed setting controller reference: {0}")]
    Ownership(#[from] OwnershipError),
}

#[derive(thiserror::Error, Debug)]
pub enum PlatformError {
    #[error("conflict on {0}")]
    Conflict(String),
    #[error("platform call cancelled")]
    Cancelled,
    /// Request refused as invalid or unauthorized; resending it unchanged
    /// fails the same way.
    #[error("rejected with {code} {reason}: {message}")]
    Rejected {
        code: u16,
        reason: String,
        message: String,
    },
    #[error(transparent)]
    Kube(#[from] kube::Error),
}

impl PlatformError {
    pub fn is_conflict(&self) -> bool {
        matches!(self, PlatformError::Conflict(_))
    }

    pub fn is_rejected(&self) -> bool {
        matches!(self, PlatformError::Rejected { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Network, timeout or cancellation; safe to re-run the pass.
    Transient,
    /// Optimistic-concurrency mismatch; expected under concurrent writers.
    Conflict,
    /// Needs operator intervention; requeued slowly.
    Fatal,
}

#[derive(thiserror::Error, Debug)]
pub enum ReconcileError {
    #[error("building {kind} for {cluster}: {source}")]
    Build {
        kind: ChildKind,
        cluster: String,
        #[source]
        source: BuildError,
    },
    #[error("{op} {target} failed: {source}")]
    Platform {
        op: &'static str,
        target: String,
        #[source]
        source: PlatformError,
    },
}

impl ReconcileError {
    pub fn severity(&self) -> Severity {
        match self {
            ReconcileError::Build { .. } => Severity::Fatal,
            ReconcileError::Platform { source, .. } if source.is_rejected() => {
                Severity::Fatal
            }
            ReconcileError::Platform { source, .. } if source.is_conflict() => {
                Severity::Conflict
            }
            ReconcileError::Platform { .. } => Severity::Transient,
        }
    }

    pub(crate) fn platform(
        op: &'static str,
        target: impl Into<String>,
    ) -> impl FnOnce(PlatformError) -> Self {
        let target = target.into();
        move |source| ReconcileError::Platform { op, target, source }
    }
}
