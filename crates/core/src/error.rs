// Error taxonomy for the knitscript toolchain

use thiserror::Error;

/// Errors produced while locating or running the external compilers.
///
/// Every variant is terminal: none of these conditions resolve without
/// operator or caller intervention, so nothing is retried.
#[derive(Debug, Error)]
pub enum ToolchainError {
    /// A required external executable or script is not where the
    /// configuration says it should be.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The caller-supplied input is missing, unreadable, or has the
    /// wrong extension. The external compiler is never invoked.
    #[error("input error: {0}")]
    Input(String),

    /// The external compiler ran and rejected the input. The message
    /// carries the compiler's own diagnostic output verbatim.
    #[error("compilation failed: {0}")]
    Compilation(String),

    /// The external process could not be run to completion: spawn
    /// failure, crash, or timeout.
    #[error("execution error: {0}")]
    Execution(String),
}

impl ToolchainError {
    /// Stable label for logs and tool responses.
    pub fn kind(&self) -> &'static str {
        match self {
            ToolchainError::Configuration(_) => "configuration_error",
            ToolchainError::Input(_) => "input_error",
            ToolchainError::Compilation(_) => "compilation_error",
            ToolchainError::Execution(_) => "execution_error",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_labels() {
        assert_eq!(
            ToolchainError::Configuration("x".into()).kind(),
            "configuration_error"
        );
        assert_eq!(ToolchainError::Input("x".into()).kind(), "input_error");
        assert_eq!(
            ToolchainError::Compilation("x".into()).kind(),
            "compilation_error"
        );
        assert_eq!(
            ToolchainError::Execution("x".into()).kind(),
            "execution_error"
        );
    }

    #[test]
    fn test_compilation_message_is_verbatim() {
        let diagnostic = "line 3: unexpected token 'purl'";
        let err = ToolchainError::Compilation(diagnostic.to_string());
        assert!(err.to_string().contains(diagnostic));
    }
}
