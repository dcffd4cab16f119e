use crate::entity::Entity;

/// Alias for `Result<T, EcsError>`.
pub type EcsResult<T> = Result<T, EcsError>;

/// Errors raised by the world and by collaborators running inside it.
#[derive(Debug, thiserror::Error)]
pub enum EcsError {
    /// An operation that needs an initialized world ran before `initialize()`.
    #[error("{operation} requires an initialized world; call World::initialize first")]
    NotInitialized {
        /// The operation that was attempted.
        operation: &'static str,
    },

    /// A required dependency could not be resolved while wiring a collaborator.
    #[error("unresolved {kind} dependency: {name}")]
    Unresolved {
        /// What was being resolved (system, manager, injectable).
        kind: &'static str,
        /// The type or registration name that was missing.
        name: String,
    },

    /// The entity id is not allocated (never created, or already recycled).
    #[error("entity is not allocated: {0}")]
    DeadEntity(Entity),

    /// `World::process` was called while a tick was already running.
    #[error("World::process called from inside a running tick")]
    ReentrantProcess,

    /// A failure reported by a system or manager.
    #[error("{0}")]
    Custom(String),

    /// One or more collaborators failed while the world was being disposed.
    #[error("{} collaborator(s) failed during dispose: {}", .0.len(), join_errors(.0))]
    Dispose(Vec<EcsError>),
}

impl EcsError {
    /// Build a [`EcsError::Custom`] from any message.
    pub fn custom(message: impl Into<String>) -> Self {
        Self::Custom(message.into())
    }
}

fn join_errors(errors: &[EcsError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dispose_error_lists_every_cause() {
        let err = EcsError::Dispose(vec![
            EcsError::custom("audio device busy"),
            EcsError::custom("socket closed"),
        ]);
        assert_eq!(
            err.to_string(),
            "2 collaborator(s) failed during dispose: audio device busy; socket closed"
        );
    }

    #[test]
    fn not_initialized_names_the_operation() {
        let err = EcsError::NotInitialized {
            operation: "World::inject",
        };
        assert!(err.to_string().starts_with("World::inject requires"));
    }
}
