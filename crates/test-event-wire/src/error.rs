use crate::registry::Kind;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum WireError {
    #[error("unexpected end of input")]
    UnexpectedEof,
    #[error("invalid presence flag: {0}")]
    InvalidPresenceFlag(u8),
    #[error("invalid boolean: {0}")]
    InvalidBoolean(u8),
    #[error("string field is not valid utf-8")]
    InvalidUtf8,
    #[error("invalid data: {0}")]
    InvalidData(&'static str),
    #[error("string of {len} bytes exceeds limit of {max}")]
    StringTooLong { len: usize, max: usize },
    #[error("nesting deeper than {0} levels")]
    NestingTooDeep(usize),
    #[error("{0} trailing bytes after frame")]
    TrailingBytes(usize),
    #[error("unknown record kind: {0}")]
    UnknownKind(u8),
    #[error("no codec registered for {0:?}")]
    Unregistered(Kind),
    #[error("record does not match codec registered for {0:?}")]
    KindMismatch(Kind),
}

impl WireError {
    /// Whether the error describes a corrupt or truncated frame, as opposed to
    /// a kind the registry does not know about.
    pub fn is_malformed(&self) -> bool {
        !matches!(
            self,
            WireError::UnknownKind(_) | WireError::Unregistered(_) | WireError::KindMismatch(_)
        )
    }
}

/// Raised when a failure value is assembled without its mandatory parts.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum FailureError {
    #[error("test failure constructed without a raw failure")]
    MissingRawFailure,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test_timeout::timeout]
    fn classifies_malformed_frames() {
        assert!(WireError::UnexpectedEof.is_malformed());
        assert!(WireError::InvalidPresenceFlag(7).is_malformed());
        assert!(WireError::TrailingBytes(3).is_malformed());
        assert!(!WireError::UnknownKind(200).is_malformed());
        assert!(!WireError::Unregistered(Kind::TestFailure).is_malformed());
    }
}
