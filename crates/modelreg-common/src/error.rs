//! Error types for the model registry operator
//!
//! Errors are structured with fields to aid debugging in production. Store
//! failures keep the underlying kube-rs error so callers can distinguish a
//! benign absence (404) or an optimistic-concurrency conflict (409) from a
//! genuine failure.

use thiserror::Error;

/// Main error type for model registry operations
#[derive(Debug, Error)]
pub enum Error {
    /// Kubernetes API error
    #[error("kubernetes error: {source}")]
    Kube {
        /// The underlying kube-rs error
        #[from]
        source: kube::Error,
    },

    /// A call to a Pod's model registry failed
    #[error("registry error [{operation}] for pod {pod}: {message}")]
    Registry {
        /// Name of the Pod hosting the registry
        pod: String,
        /// Registry operation that failed (push, delete, connect)
        operation: String,
        /// Description of what failed
        message: String,
    },

    /// Validation error for Model specs
    #[error("validation error for {model}: {message}")]
    Validation {
        /// Name of the Model with invalid configuration
        model: String,
        /// Description of what's invalid
        message: String,
    },

    /// Serialization/deserialization error
    #[error("serialization error: {message}")]
    Serialization {
        /// Description of what failed
        message: String,
        /// The resource kind being serialized (if known)
        kind: Option<String>,
    },

    /// Internal/operational error
    #[error("internal error [{context}]: {message}")]
    Internal {
        /// Description of what failed
        message: String,
        /// Context where the error occurred (e.g., "reconciler", "watcher")
        context: String,
    },
}

impl Error {
    /// Create a registry error for an operation against a Pod's registry
    pub fn registry(
        pod: impl Into<String>,
        operation: impl Into<String>,
        msg: impl Into<String>,
    ) -> Self {
        Self::Registry {
            pod: pod.into(),
            operation: operation.into(),
            message: msg.into(),
        }
    }

    /// Create a validation error with model context
    pub fn validation_for(model: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Validation {
            model: model.into(),
            message: msg.into(),
        }
    }

    /// Create a serialization error for a specific resource kind
    pub fn serialization_for_kind(kind: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Serialization {
            message: msg.into(),
            kind: Some(kind.into()),
        }
    }

    /// Create an internal error with explicit context
    pub fn internal_with_context(context: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Internal {
            message: msg.into(),
            context: context.into(),
        }
    }

    /// True when the API server reported the object as absent (HTTP 404)
    pub fn is_not_found(&self) -> bool {
        self.api_code() == Some(404)
    }

    /// True when an optimistic-concurrency write lost the race (HTTP 409)
    pub fn is_conflict(&self) -> bool {
        self.api_code() == Some(409)
    }

    /// Check if this error is retryable
    ///
    /// Validation and serialization errors need a spec fix. Conflicts are
    /// retried from a fresh read; other 4xx responses are not.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Kube { source } => match source {
                kube::Error::Api(ae) if ae.code == 409 => true,
                kube::Error::Api(ae) => !(400..500).contains(&ae.code),
                _ => true,
            },
            Error::Registry { .. } => true,
            Error::Validation { .. } => false,
            Error::Serialization { .. } => false,
            Error::Internal { .. } => true,
        }
    }

    /// Short machine-friendly label for metrics
    pub fn kind_label(&self) -> &'static str {
        match self {
            Error::Kube { .. } if self.is_conflict() => "conflict",
            Error::Kube { .. } => "kube",
            Error::Registry { .. } => "registry",
            Error::Validation { .. } => "validation",
            Error::Serialization { .. } => "serialization",
            Error::Internal { .. } => "internal",
        }
    }

    fn api_code(&self) -> Option<u16> {
        match self {
            Error::Kube {
                source: kube::Error::Api(ae),
            } => Some(ae.code),
            _ => None,
        }
    }
}
