use crate::codec::{Codec, Nullable, StringCodec};
use crate::error::WireError;
use crate::wire::{self, Cursor};

use super::{
    AssertionFailure, ExternalFailure, FailureDetails, FrameworkFailure, RawFailure, TestFailure,
};

const EXTERNAL_FRAMEWORK: u8 = 0;
const EXTERNAL_ASSERTION: u8 = 1;

/// Writes the rendered placeholder of a native failure, cause chain included.
#[derive(Debug, Clone, Copy, Default)]
pub struct RawFailureCodec;

impl Codec<RawFailure> for RawFailureCodec {
    fn encode(&self, buf: &mut Vec<u8>, value: &RawFailure) -> Result<(), WireError> {
        wire::write_nullable_string(buf, value.class_name.as_deref())?;
        wire::write_nullable_string(buf, value.message.as_deref())?;
        wire::write_string(buf, &value.stacktrace)?;
        wire::write_bool(buf, value.cause.is_some());
        if let Some(cause) = &value.cause {
            self.encode(buf, cause)?;
        }
        Ok(())
    }

    fn decode(&self, cursor: &mut Cursor<'_>) -> Result<RawFailure, WireError> {
        let class_name = cursor.read_nullable_string()?;
        let message = cursor.read_nullable_string()?;
        let stacktrace = cursor.read_string()?;
        let cause = if cursor.read_presence()? {
            Some(Box::new(cursor.nested(|c| self.decode(c))?))
        } else {
            None
        };
        Ok(RawFailure {
            class_name,
            message,
            stacktrace,
            cause,
        })
    }
}

/// Raw failure first, then the details in fixed order; the assertion flag is
/// the only non-nullable detail.
#[derive(Debug, Clone, Copy, Default)]
pub struct TestFailureCodec;

impl Codec<TestFailure> for TestFailureCodec {
    fn encode(&self, buf: &mut Vec<u8>, value: &TestFailure) -> Result<(), WireError> {
        let strings = Nullable(StringCodec);
        let details = value.details();
        RawFailureCodec.encode(buf, value.raw_failure())?;
        strings.encode(buf, &details.message)?;
        strings.encode(buf, &details.class_name)?;
        strings.encode(buf, &details.stacktrace)?;
        wire::write_bool(buf, details.is_assertion_failure);
        strings.encode(buf, &details.expected)?;
        strings.encode(buf, &details.actual)
    }

    fn decode(&self, cursor: &mut Cursor<'_>) -> Result<TestFailure, WireError> {
        let strings = Nullable(StringCodec);
        let raw_failure = RawFailureCodec.decode(cursor)?;
        let message = strings.decode(cursor)?;
        let class_name = strings.decode(cursor)?;
        let stacktrace = strings.decode(cursor)?;
        let is_assertion_failure = cursor.read_bool()?;
        let expected = strings.decode(cursor)?;
        let actual = strings.decode(cursor)?;
        Ok(TestFailure::new(
            raw_failure,
            FailureDetails {
                message,
                class_name,
                stacktrace,
                is_assertion_failure,
                expected,
                actual,
            },
        ))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ExternalFailureCodec;

impl ExternalFailureCodec {
    fn encode_causes(
        &self,
        buf: &mut Vec<u8>,
        causes: &[ExternalFailure],
    ) -> Result<(), WireError> {
        let count = u32::try_from(causes.len())
            .map_err(|_| WireError::InvalidData("too many causes"))?;
        wire::write_var_u32(buf, count);
        for cause in causes {
            self.encode(buf, cause)?;
        }
        Ok(())
    }

    fn decode_causes(&self, cursor: &mut Cursor<'_>) -> Result<Vec<ExternalFailure>, WireError> {
        let count = cursor.read_var_u32()? as usize;
        // every cause takes at least one byte, so a larger count is corrupt
        if count > cursor.remaining() {
            return Err(WireError::UnexpectedEof);
        }
        let mut causes = Vec::with_capacity(count);
        for _ in 0..count {
            causes.push(cursor.nested(|c| self.decode(c))?);
        }
        Ok(causes)
    }
}

impl Codec<ExternalFailure> for ExternalFailureCodec {
    fn encode(&self, buf: &mut Vec<u8>, value: &ExternalFailure) -> Result<(), WireError> {
        match value {
            ExternalFailure::Framework(failure) => {
                wire::write_u8(buf, EXTERNAL_FRAMEWORK);
                wire::write_nullable_string(buf, failure.message.as_deref())?;
                wire::write_nullable_string(buf, failure.description.as_deref())?;
                wire::write_nullable_string(buf, failure.stacktrace.as_deref())?;
                self.encode_causes(buf, &failure.causes)
            }
            ExternalFailure::Assertion(failure) => {
                wire::write_u8(buf, EXTERNAL_ASSERTION);
                wire::write_nullable_string(buf, failure.message.as_deref())?;
                wire::write_nullable_string(buf, failure.description.as_deref())?;
                wire::write_nullable_string(buf, failure.stacktrace.as_deref())?;
                wire::write_nullable_string(buf, failure.expected.as_deref())?;
                wire::write_nullable_string(buf, failure.actual.as_deref())?;
                self.encode_causes(buf, &failure.causes)
            }
        }
    }

    fn decode(&self, cursor: &mut Cursor<'_>) -> Result<ExternalFailure, WireError> {
        match cursor.read_u8()? {
            EXTERNAL_FRAMEWORK => {
                let message = cursor.read_nullable_string()?;
                let description = cursor.read_nullable_string()?;
                let stacktrace = cursor.read_nullable_string()?;
                let causes = self.decode_causes(cursor)?;
                Ok(ExternalFailure::Framework(FrameworkFailure {
                    message,
                    description,
                    causes,
                    stacktrace,
                }))
            }
            EXTERNAL_ASSERTION => {
                let message = cursor.read_nullable_string()?;
                let description = cursor.read_nullable_string()?;
                let stacktrace = cursor.read_nullable_string()?;
                let expected = cursor.read_nullable_string()?;
                let actual = cursor.read_nullable_string()?;
                let causes = self.decode_causes(cursor)?;
                Ok(ExternalFailure::Assertion(AssertionFailure {
                    message,
                    description,
                    causes,
                    stacktrace,
                    expected,
                    actual,
                }))
            }
            _ => Err(WireError::InvalidData("unknown external failure variant")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WireConfig;
    use crate::failure::tests::Chained;

    fn round_trip<T, C: Codec<T>>(codec: C, value: &T) -> T {
        let mut buf = Vec::new();
        codec.encode(&mut buf, value).expect("encode");
        let mut cursor = Cursor::new(&buf);
        let decoded = codec.decode(&mut cursor).expect("decode");
        assert_eq!(cursor.remaining(), 0);
        decoded
    }

    #[test_timeout::timeout]
    fn assertion_failure_without_cause() {
        let failure = TestFailure::new(
            RawFailure::new("boom"),
            FailureDetails {
                message: Some("boom".into()),
                is_assertion_failure: true,
                expected: Some("1".into()),
                actual: Some("2".into()),
                ..FailureDetails::default()
            },
        );

        let decoded = round_trip(TestFailureCodec, &failure);
        assert_eq!(decoded, failure);
        assert!(decoded.details().is_assertion_failure);
        assert_eq!(decoded.details().expected.as_deref(), Some("1"));
        assert_eq!(decoded.details().actual.as_deref(), Some("2"));
        assert_eq!(decoded.raw_failure().message.as_deref(), Some("boom"));
        assert!(ExternalFailure::from_test_failure(&decoded).causes().is_empty());
    }

    #[test_timeout::timeout]
    fn captured_error_round_trips_with_placeholder() {
        let error = Chained::wrapping("fixture setup failed", Chained::leaf("port in use"));
        let failure = TestFailure::from_error(&error);

        let decoded = round_trip(TestFailureCodec, &failure);
        assert_eq!(decoded, failure);
        let raw = decoded.raw_failure();
        assert_eq!(raw.message.as_deref(), Some("fixture setup failed"));
        assert_eq!(raw.stacktrace, "fixture setup failed\nCaused by: port in use");
        assert_eq!(raw.causes().count(), 1);
        assert!(!decoded.details().is_assertion_failure);
    }

    #[test_timeout::timeout]
    fn details_are_written_in_fixed_order() {
        let failure = TestFailure::new(
            RawFailure {
                class_name: None,
                message: None,
                stacktrace: String::new(),
                cause: None,
            },
            FailureDetails {
                message: None,
                class_name: Some("E".into()),
                stacktrace: None,
                is_assertion_failure: true,
                expected: None,
                actual: Some("a".into()),
            },
        );
        let mut buf = Vec::new();
        TestFailureCodec.encode(&mut buf, &failure).unwrap();
        // raw: class, message, empty stack, no cause
        assert_eq!(&buf[..4], &[0, 0, 0, 0]);
        assert_eq!(&buf[4..], &[0, 1, 1, b'E', 0, 1, 0, 1, 1, b'a']);
    }

    #[test_timeout::timeout]
    fn external_failures_round_trip_with_nested_causes() {
        let failure = ExternalFailure::assertion(
            Some("values differ".into()),
            Some("values differ\nCaused by: parse error".into()),
            Some("[1, 2]".into()),
            None,
            vec![ExternalFailure::framework(
                Some("parse error".into()),
                None,
                vec![ExternalFailure::framework(None, None, Vec::new())],
            )],
        );
        assert_eq!(round_trip(ExternalFailureCodec, &failure), failure);
    }

    #[test_timeout::timeout]
    fn hostile_cause_nesting_is_cut_off() {
        let mut failure = ExternalFailure::framework(Some("leaf".into()), None, Vec::new());
        for _ in 0..5 {
            failure = ExternalFailure::framework(None, None, vec![failure]);
        }
        let mut buf = Vec::new();
        ExternalFailureCodec.encode(&mut buf, &failure).unwrap();

        let config = WireConfig {
            max_nesting_depth: 3,
            ..WireConfig::default()
        };
        let err = ExternalFailureCodec
            .decode(&mut Cursor::with_config(&buf, config))
            .unwrap_err();
        assert_eq!(err, WireError::NestingTooDeep(3));
    }

    #[test_timeout::timeout]
    fn absurd_cause_count_is_rejected() {
        let mut buf = vec![EXTERNAL_FRAMEWORK, 0, 0, 0];
        wire::write_var_u32(&mut buf, u32::MAX);
        let err = ExternalFailureCodec.decode(&mut Cursor::new(&buf)).unwrap_err();
        assert_eq!(err, WireError::UnexpectedEof);
    }

    #[test_timeout::timeout]
    fn unknown_external_variant_is_rejected() {
        let err = ExternalFailureCodec.decode(&mut Cursor::new(&[9])).unwrap_err();
        assert_eq!(err, WireError::InvalidData("unknown external failure variant"));
    }
}
