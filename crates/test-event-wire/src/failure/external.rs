use serde::{Deserialize, Serialize};
use std::error::Error;

use super::{distinct_source, non_empty, RawFailure, TestFailure, MAX_CAUSE_DEPTH};

/// Protocol-facing failure: every field is plain text, and causes nest as
/// further [`ExternalFailure`] values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExternalFailure {
    Assertion(AssertionFailure),
    Framework(FrameworkFailure),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameworkFailure {
    pub message: Option<String>,
    pub description: Option<String>,
    pub causes: Vec<ExternalFailure>,
    pub stacktrace: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssertionFailure {
    pub message: Option<String>,
    pub description: Option<String>,
    pub causes: Vec<ExternalFailure>,
    pub stacktrace: Option<String>,
    pub expected: Option<String>,
    pub actual: Option<String>,
}

impl FrameworkFailure {
    /// Builds the failure from already-rendered text. The description is the
    /// stack text.
    pub fn new(
        message: Option<String>,
        stacktrace: Option<String>,
        causes: Vec<ExternalFailure>,
    ) -> Self {
        Self {
            message,
            description: stacktrace.clone(),
            causes,
            stacktrace,
        }
    }

    pub fn from_error(
        error: &(dyn Error + 'static),
        message: Option<String>,
        stacktrace: Option<String>,
    ) -> Self {
        Self::new(message, stacktrace, build_causes(error))
    }
}

impl AssertionFailure {
    pub fn new(
        message: Option<String>,
        stacktrace: Option<String>,
        expected: Option<String>,
        actual: Option<String>,
        causes: Vec<ExternalFailure>,
    ) -> Self {
        Self {
            message,
            description: stacktrace.clone(),
            causes,
            stacktrace,
            expected,
            actual,
        }
    }

    pub fn from_error(
        error: &(dyn Error + 'static),
        message: Option<String>,
        stacktrace: Option<String>,
        expected: Option<String>,
        actual: Option<String>,
    ) -> Self {
        Self::new(message, stacktrace, expected, actual, build_causes(error))
    }
}

/// Follows the single `source()` link of `error`, recursively, for at most
/// [`MAX_CAUSE_DEPTH`] levels. A cause that is the error itself ends the
/// chain. Each cause carries only its own line of text.
pub fn build_causes(error: &(dyn Error + 'static)) -> Vec<ExternalFailure> {
    causes_below(error, MAX_CAUSE_DEPTH)
}

fn causes_below(error: &(dyn Error + 'static), depth: usize) -> Vec<ExternalFailure> {
    let cause = match distinct_source(error) {
        Some(cause) if depth > 0 => cause,
        _ => return Vec::new(),
    };
    let line = cause.to_string();
    vec![ExternalFailure::framework(
        non_empty(line.clone()),
        Some(line),
        causes_below(cause, depth - 1),
    )]
}

impl ExternalFailure {
    pub fn framework(
        message: Option<String>,
        stacktrace: Option<String>,
        causes: Vec<ExternalFailure>,
    ) -> Self {
        ExternalFailure::Framework(FrameworkFailure::new(message, stacktrace, causes))
    }

    pub fn assertion(
        message: Option<String>,
        stacktrace: Option<String>,
        expected: Option<String>,
        actual: Option<String>,
        causes: Vec<ExternalFailure>,
    ) -> Self {
        ExternalFailure::Assertion(AssertionFailure::new(
            message, stacktrace, expected, actual, causes,
        ))
    }

    /// Converts a decoded worker failure into the protocol-facing shape,
    /// taking causes from the raw failure's chain.
    pub fn from_test_failure(failure: &TestFailure) -> Self {
        let details = failure.details();
        let causes = failure
            .raw_failure()
            .cause
            .as_deref()
            .map(|cause| vec![Self::from_raw(cause)])
            .unwrap_or_default();
        if details.is_assertion_failure {
            Self::assertion(
                details.message.clone(),
                details.stacktrace.clone(),
                details.expected.clone(),
                details.actual.clone(),
                causes,
            )
        } else {
            Self::framework(details.message.clone(), details.stacktrace.clone(), causes)
        }
    }

    fn from_raw(raw: &RawFailure) -> Self {
        let causes = raw
            .cause
            .as_deref()
            .map(|cause| vec![Self::from_raw(cause)])
            .unwrap_or_default();
        Self::framework(raw.message.clone(), Some(raw.stacktrace.clone()), causes)
    }

    pub fn message(&self) -> Option<&str> {
        match self {
            ExternalFailure::Assertion(f) => f.message.as_deref(),
            ExternalFailure::Framework(f) => f.message.as_deref(),
        }
    }

    pub fn description(&self) -> Option<&str> {
        match self {
            ExternalFailure::Assertion(f) => f.description.as_deref(),
            ExternalFailure::Framework(f) => f.description.as_deref(),
        }
    }

    pub fn stacktrace(&self) -> Option<&str> {
        match self {
            ExternalFailure::Assertion(f) => f.stacktrace.as_deref(),
            ExternalFailure::Framework(f) => f.stacktrace.as_deref(),
        }
    }

    pub fn causes(&self) -> &[ExternalFailure] {
        match self {
            ExternalFailure::Assertion(f) => &f.causes,
            ExternalFailure::Framework(f) => &f.causes,
        }
    }

    pub fn is_assertion(&self) -> bool {
        matches!(self, ExternalFailure::Assertion(_))
    }

    /// Levels of causes below this failure, following the deepest branch.
    pub fn cause_depth(&self) -> usize {
        self.causes()
            .iter()
            .map(|cause| 1 + cause.cause_depth())
            .max()
            .unwrap_or(0)
    }
}
