//! Failure values that cross the worker boundary.
//!
//! Live error objects never travel. The producer renders them into text
//! ([`RawFailure`], [`FailureDetails`]) and the consumer only ever sees that
//! rendering.

mod codec;
mod external;

pub use codec::{ExternalFailureCodec, RawFailureCodec, TestFailureCodec};
pub use external::{build_causes, AssertionFailure, ExternalFailure, FrameworkFailure};

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt;

use crate::error::FailureError;

/// Structural summary of a failure, always safe to serialize.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FailureDetails {
    pub message: Option<String>,
    pub class_name: Option<String>,
    pub stacktrace: Option<String>,
    pub is_assertion_failure: bool,
    pub expected: Option<String>,
    pub actual: Option<String>,
}

/// Text rendering of a native error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedFailure {
    pub message: Option<String>,
    pub stacktrace: String,
}

/// Deepest cause chain captured from a live error. Matches the default
/// decode nesting limit, so anything built from an error can be read back.
pub const MAX_CAUSE_DEPTH: usize = crate::config::DEFAULT_MAX_NESTING_DEPTH;

/// Renders `error` and up to [`MAX_CAUSE_DEPTH`] links of its `source()`
/// chain into a message plus stack text.
pub fn render_failure(error: &(dyn Error + 'static)) -> RenderedFailure {
    let message = error.to_string();
    let mut stacktrace = message.clone();
    let mut current = distinct_source(error);
    let mut depth = 0;
    while let Some(cause) = current {
        if depth == MAX_CAUSE_DEPTH {
            break;
        }
        stacktrace.push_str("\nCaused by: ");
        stacktrace.push_str(&cause.to_string());
        current = distinct_source(cause);
        depth += 1;
    }
    RenderedFailure {
        message: non_empty(message),
        stacktrace,
    }
}

pub(crate) fn non_empty(text: String) -> Option<String> {
    (!text.is_empty()).then_some(text)
}

/// The error's cause, unless the error names itself as its own cause.
pub(crate) fn distinct_source<'a>(
    error: &'a (dyn Error + 'static),
) -> Option<&'a (dyn Error + 'static)> {
    let cause = error.source()?;
    let same = std::ptr::eq(
        cause as *const (dyn Error + 'static) as *const (),
        error as *const (dyn Error + 'static) as *const (),
    );
    (!same).then_some(cause)
}

/// Placeholder for a native failure: what survives of it after rendering.
///
/// The original error type is gone once this is built; `class_name` is only
/// known when the producer captured a concretely typed error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawFailure {
    pub class_name: Option<String>,
    pub message: Option<String>,
    pub stacktrace: String,
    pub cause: Option<Box<RawFailure>>,
}

impl RawFailure {
    /// Placeholder with only a message; the stack text repeats it.
    pub fn new(message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            class_name: None,
            stacktrace: message.clone(),
            message: Some(message),
            cause: None,
        }
    }

    pub fn with_cause(mut self, cause: RawFailure) -> Self {
        self.cause = Some(Box::new(cause));
        self
    }

    /// Renders `error` in full at the top level. Each cause keeps only its
    /// own line and the chain stops after [`MAX_CAUSE_DEPTH`] links.
    pub fn from_error(error: &(dyn Error + 'static)) -> Self {
        let rendered = render_failure(error);
        Self {
            class_name: None,
            message: rendered.message,
            stacktrace: rendered.stacktrace,
            cause: Self::cause_chain(error, MAX_CAUSE_DEPTH),
        }
    }

    fn cause_chain(error: &(dyn Error + 'static), depth: usize) -> Option<Box<RawFailure>> {
        if depth == 0 {
            return None;
        }
        let cause = distinct_source(error)?;
        let line = cause.to_string();
        Some(Box::new(Self {
            class_name: None,
            message: non_empty(line.clone()),
            stacktrace: line,
            cause: Self::cause_chain(cause, depth - 1),
        }))
    }

    /// Like [`RawFailure::from_error`], also recording the error's type name.
    pub fn capture<E: Error + 'static>(error: &E) -> Self {
        Self {
            class_name: Some(std::any::type_name::<E>().to_string()),
            ..Self::from_error(error)
        }
    }

    pub fn causes(&self) -> impl Iterator<Item = &RawFailure> {
        std::iter::successors(self.cause.as_deref(), |raw| raw.cause.as_deref())
    }

    /// Number of links below this failure.
    pub fn cause_depth(&self) -> usize {
        self.causes().count()
    }
}

impl fmt::Display for RawFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.message, &self.class_name) {
            (Some(message), _) => f.write_str(message),
            (None, Some(class_name)) => f.write_str(class_name),
            (None, None) => f.write_str("<no message>"),
        }
    }
}

impl Error for RawFailure {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.cause.as_deref().map(|cause| cause as &(dyn Error + 'static))
    }
}

/// A test failure as reported by the worker: the rendered raw failure plus
/// its structured details.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestFailure {
    raw_failure: RawFailure,
    details: FailureDetails,
}

impl TestFailure {
    pub fn new(raw_failure: RawFailure, details: FailureDetails) -> Self {
        Self {
            raw_failure,
            details,
        }
    }

    /// Fails immediately when the raw failure is missing.
    pub fn try_new(
        raw_failure: Option<RawFailure>,
        details: FailureDetails,
    ) -> Result<Self, FailureError> {
        let raw_failure = raw_failure.ok_or(FailureError::MissingRawFailure)?;
        Ok(Self::new(raw_failure, details))
    }

    /// Renders a native error into a failure that is not an assertion.
    pub fn from_error<E: Error + 'static>(error: &E) -> Self {
        Self::build(error, false, None, None)
    }

    pub fn assertion_from_error<E: Error + 'static>(
        error: &E,
        expected: Option<String>,
        actual: Option<String>,
    ) -> Self {
        Self::build(error, true, expected, actual)
    }

    fn build<E: Error + 'static>(
        error: &E,
        is_assertion_failure: bool,
        expected: Option<String>,
        actual: Option<String>,
    ) -> Self {
        let raw_failure = RawFailure::capture(error);
        let details = FailureDetails {
            message: raw_failure.message.clone(),
            class_name: raw_failure.class_name.clone(),
            stacktrace: Some(raw_failure.stacktrace.clone()),
            is_assertion_failure,
            expected,
            actual,
        };
        Self::new(raw_failure, details)
    }

    pub fn raw_failure(&self) -> &RawFailure {
        &self.raw_failure
    }

    pub fn details(&self) -> &FailureDetails {
        &self.details
    }

    pub fn into_parts(self) -> (RawFailure, FailureDetails) {
        (self.raw_failure, self.details)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    #[derive(Debug)]
    pub(crate) struct Chained {
        pub message: &'static str,
        pub cause: Option<Box<Chained>>,
    }

    impl Chained {
        pub fn leaf(message: &'static str) -> Self {
            Self {
                message,
                cause: None,
            }
        }

        pub fn wrapping(message: &'static str, cause: Chained) -> Self {
            Self {
                message,
                cause: Some(Box::new(cause)),
            }
        }
    }

    /// `levels` errors, each the `source()` of the one above it.
    pub(crate) fn deep_chain(levels: usize) -> Chained {
        let mut error = Chained::leaf("root cause");
        for _ in 1..levels {
            error = Chained::wrapping("wrapped", error);
        }
        error
    }

    impl fmt::Display for Chained {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str(self.message)
        }
    }

    impl Error for Chained {
        fn source(&self) -> Option<&(dyn Error + 'static)> {
            self.cause.as_deref().map(|c| c as &(dyn Error + 'static))
        }
    }

    /// Reports itself as its own cause.
    #[derive(Debug)]
    pub(crate) struct SelfCaused;

    impl fmt::Display for SelfCaused {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("loops back")
        }
    }

    impl Error for SelfCaused {
        fn source(&self) -> Option<&(dyn Error + 'static)> {
            Some(self)
        }
    }

    #[test_timeout::timeout]
    fn renders_cause_chain_into_stack_text() {
        let error = Chained::wrapping(
            "could not write report",
            Chained::wrapping("flush failed", Chained::leaf("disk full")),
        );
        let rendered = render_failure(&error);
        assert_eq!(rendered.message.as_deref(), Some("could not write report"));
        assert_eq!(
            rendered.stacktrace,
            "could not write report\nCaused by: flush failed\nCaused by: disk full"
        );
    }

    #[test_timeout::timeout]
    fn rendering_stops_at_self_reference() {
        let rendered = render_failure(&SelfCaused);
        assert_eq!(rendered.stacktrace, "loops back");
        assert!(RawFailure::from_error(&SelfCaused).cause.is_none());
    }

    #[test_timeout::timeout]
    fn capture_records_type_name_and_causes() {
        let error = Chained::wrapping("outer", Chained::leaf("inner"));
        let raw = RawFailure::capture(&error);
        assert!(raw.class_name.as_deref().unwrap().ends_with("Chained"));
        let causes: Vec<_> = raw.causes().map(|c| c.message.as_deref()).collect();
        assert_eq!(causes, vec![Some("inner")]);
        // only the top level knows its concrete type
        assert_eq!(raw.causes().next().unwrap().class_name, None);
    }

    #[test_timeout::timeout]
    fn causes_keep_only_their_own_line() {
        let error = Chained::wrapping(
            "could not write report",
            Chained::wrapping("flush failed", Chained::leaf("disk full")),
        );
        let raw = RawFailure::from_error(&error);
        assert_eq!(
            raw.stacktrace,
            "could not write report\nCaused by: flush failed\nCaused by: disk full"
        );
        let stacks: Vec<_> = raw.causes().map(|c| c.stacktrace.as_str()).collect();
        assert_eq!(stacks, vec!["flush failed", "disk full"]);
    }

    #[test_timeout::timeout]
    fn captured_chain_is_cut_at_max_depth() {
        let raw = RawFailure::from_error(&deep_chain(MAX_CAUSE_DEPTH + 6));
        assert_eq!(raw.cause_depth(), MAX_CAUSE_DEPTH);
        let rendered_causes = raw.stacktrace.matches("Caused by: ").count();
        assert_eq!(rendered_causes, MAX_CAUSE_DEPTH);
    }

    #[test_timeout::timeout]
    fn raw_failure_acts_as_error_chain() {
        let raw = RawFailure::new("boom").with_cause(RawFailure::new("root"));
        assert_eq!(raw.to_string(), "boom");
        assert_eq!(raw.source().map(|c| c.to_string()), Some("root".to_string()));
    }

    #[test_timeout::timeout]
    fn missing_raw_failure_is_rejected_at_construction() {
        let err = TestFailure::try_new(None, FailureDetails::default()).unwrap_err();
        assert_eq!(err, FailureError::MissingRawFailure);

        let ok = TestFailure::try_new(Some(RawFailure::new("boom")), FailureDetails::default());
        assert!(ok.is_ok());
    }

    #[test_timeout::timeout]
    fn assertion_failure_copies_rendering_into_details() {
        let error = Chained::leaf("expected 1 but was 2");
        let failure =
            TestFailure::assertion_from_error(&error, Some("1".into()), Some("2".into()));
        let details = failure.details();
        assert!(details.is_assertion_failure);
        assert_eq!(details.message.as_deref(), Some("expected 1 but was 2"));
        assert_eq!(details.expected.as_deref(), Some("1"));
        assert_eq!(details.actual.as_deref(), Some("2"));
        assert_eq!(details.class_name, failure.raw_failure().class_name);
    }
}
