use std::fmt;

use anyhow::Error;
use serde::Serialize;
use serde_json::Value;

/// Where a coded error came from; decides the process exit status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodedErrorKind {
    /// Malformed flag values (`--viewport`, `--progress`, ...).
    Usage,
    /// A scene manifest that fails to parse or validate.
    Manifest,
}

impl CodedErrorKind {
    pub fn exit_code(self) -> i32 {
        match self {
            Self::Usage => 2,
            Self::Manifest => 3,
        }
    }

    pub fn keyword(self) -> &'static str {
        match self {
            Self::Usage => "usage",
            Self::Manifest => "manifest",
        }
    }
}

/// Exit status for failures that carry no [`CodedError`].
pub const INTERNAL_EXIT_CODE: i32 = 1;

/// An error with a stable machine-readable code, surfaced by the CLI as a
/// JSON envelope when `--json` is set.
#[derive(Debug, Clone)]
pub struct CodedError {
    pub code: &'static str,
    pub message: String,
    pub details: Option<Value>,
    pub kind: CodedErrorKind,
}

impl CodedError {
    fn new(kind: CodedErrorKind, code: &'static str, message: String) -> Self {
        Self {
            code,
            message,
            details: None,
            kind,
        }
    }

    pub fn usage(code: &'static str, message: impl Into<String>) -> Self {
        Self::new(CodedErrorKind::Usage, code, message.into())
    }

    pub fn manifest(code: &'static str, message: impl Into<String>) -> Self {
        Self::new(CodedErrorKind::Manifest, code, message.into())
    }

    pub fn with_details(self, details: Value) -> Self {
        Self {
            details: Some(details),
            ..self
        }
    }

    pub fn exit_code(&self) -> i32 {
        self.kind.exit_code()
    }

    pub fn envelope(&self) -> ErrorEnvelope {
        ErrorEnvelope::failure(ErrorEnvelopeBody {
            code: self.code,
            kind: self.kind.keyword(),
            exit_code: self.exit_code(),
            message: self.message.clone(),
            details: self.details.clone(),
        })
    }
}

impl fmt::Display for CodedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for CodedError {}

/// `{"ok": false, "error": {...}}`, printed to stdout on failure. The body
/// repeats the process exit status so scripts need not track both.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorEnvelope {
    pub ok: bool,
    pub error: ErrorEnvelopeBody,
}

impl ErrorEnvelope {
    fn failure(error: ErrorEnvelopeBody) -> Self {
        Self { ok: false, error }
    }

    pub fn exit_code(&self) -> i32 {
        self.error.exit_code
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorEnvelopeBody {
    pub code: &'static str,
    /// `usage`, `manifest` or `internal`.
    pub kind: &'static str,
    pub exit_code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

/// First [`CodedError`] anywhere in the context chain.
pub fn find_coded_error(error: &Error) -> Option<&CodedError> {
    error
        .chain()
        .find_map(|cause| cause.downcast_ref::<CodedError>())
}

/// Envelope for any error; uncoded failures report `INTERNAL`.
pub fn envelope_for(error: &Error) -> ErrorEnvelope {
    find_coded_error(error).map_or_else(
        || {
            ErrorEnvelope::failure(ErrorEnvelopeBody {
                code: "INTERNAL",
                kind: "internal",
                exit_code: INTERNAL_EXIT_CODE,
                message: format!("{error:#}"),
                details: None,
            })
        },
        CodedError::envelope,
    )
}
