//! Domain-specific error types for the workflow.
//!
//! Only a handful of failures are typed. Compile, static-analysis, test and
//! editor failures are deliberately not errors at all: they are folded into
//! diagnostic text and fed into the next retry round.

/// Errors that can occur while setting up or running a workflow.
#[derive(Debug, thiserror::Error)]
pub(crate) enum WorkflowError {
    /// Project detection did not yield exactly one candidate.
    #[error(
        "Expected exactly one project, detected {found}{}",
        format_candidates(.candidates)
    )]
    DetectionAmbiguity {
        found: usize,
        candidates: Vec<String>,
    },

    /// A configured command string is empty.
    #[error("The {label} command cannot be empty")]
    EmptyCommand { label: String },

    /// A configured command string could not be split into arguments.
    #[error("Failed to parse {label} command: {message}")]
    InvalidCommand { label: String, message: String },

    /// The generative service answered with something the caller cannot decode.
    #[error("Malformed response for {operation}: {message}")]
    MalformedResponse { operation: String, message: String },
}

fn format_candidates(candidates: &[String]) -> String {
    if candidates.is_empty() {
        String::new()
    } else {
        format!(" ({})", candidates.join(", "))
    }
}

impl WorkflowError {
    /// Creates a `DetectionAmbiguity` error from the candidate names.
    pub fn detection_ambiguity(candidates: Vec<String>) -> Self {
        Self::DetectionAmbiguity {
            found: candidates.len(),
            candidates,
        }
    }

    /// Creates an `EmptyCommand` error.
    pub fn empty_command(label: impl Into<String>) -> Self {
        Self::EmptyCommand {
            label: label.into(),
        }
    }

    /// Creates an `InvalidCommand` error.
    pub fn invalid_command(label: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidCommand {
            label: label.into(),
            message: message.into(),
        }
    }

    /// Creates a `MalformedResponse` error.
    pub fn malformed_response(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::MalformedResponse {
            operation: operation.into(),
            message: message.into(),
        }
    }

    /// Returns true if project detection was ambiguous.
    pub fn is_detection_ambiguity(&self) -> bool {
        matches!(self, Self::DetectionAmbiguity { .. })
    }

    /// Returns true if the generative service response could not be decoded.
    pub fn is_malformed_response(&self) -> bool {
        matches!(self, Self::MalformedResponse { .. })
    }
}
