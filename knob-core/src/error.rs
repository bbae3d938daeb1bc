use std::fmt;

/// Which stage produced an [`AnalysisError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ErrorKind {
    /// A token matched the number grammar but did not parse
    Number,
    /// A structural pattern matched but its captures were unusable
    Pattern,
    /// Source info could not be attached to a live object
    Attach,
    /// A binding could not be built or applied
    Binding,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::Number => "number",
            ErrorKind::Pattern => "pattern",
            ErrorKind::Attach => "attach",
            ErrorKind::Binding => "binding",
        };
        f.write_str(name)
    }
}

/// A failure inside one scan, recorded instead of propagated
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AnalysisError {
    pub kind: ErrorKind,
    pub message: String,
    /// Byte offset the failure relates to, when known
    pub offset: Option<usize>,
}

impl AnalysisError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            offset: None,
        }
    }

    pub fn at(kind: ErrorKind, message: impl Into<String>, offset: usize) -> Self {
        Self {
            kind,
            message: message.into(),
            offset: Some(offset),
        }
    }
}

impl fmt::Display for AnalysisError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.offset {
            Some(offset) => write!(f, "{} error at {}: {}", self.kind, offset, self.message),
            None => write!(f, "{} error: {}", self.kind, self.message),
        }
    }
}

impl std::error::Error for AnalysisError {}
