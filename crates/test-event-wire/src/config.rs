use std::env;

const ENV_MAX_STRING_BYTES: &str = "TEST_WIRE_MAX_STRING_BYTES";
const ENV_MAX_NESTING: &str = "TEST_WIRE_MAX_NESTING";

const DEFAULT_MAX_STRING_BYTES: usize = 16 * 1024 * 1024;
pub(crate) const DEFAULT_MAX_NESTING_DEPTH: usize = 64;

/// Limits applied while decoding frames received from a worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WireConfig {
    /// Largest string payload accepted before the frame is treated as corrupt.
    pub max_string_bytes: usize,
    /// Deepest failure cause chain accepted on decode.
    pub max_nesting_depth: usize,
}

impl WireConfig {
    /// Load limits from environment variables, keeping defaults for anything
    /// unset or unparsable.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            max_string_bytes: read_limit(ENV_MAX_STRING_BYTES, defaults.max_string_bytes),
            max_nesting_depth: read_limit(ENV_MAX_NESTING, defaults.max_nesting_depth),
        }
    }
}

impl Default for WireConfig {
    fn default() -> Self {
        Self {
            max_string_bytes: DEFAULT_MAX_STRING_BYTES,
            max_nesting_depth: DEFAULT_MAX_NESTING_DEPTH,
        }
    }
}

fn read_limit(var: &str, default: usize) -> usize {
    match env::var(var) {
        Ok(raw) => match raw.trim().parse::<usize>() {
            Ok(value) if value > 0 => value,
            _ => {
                tracing::warn!(var, value = %raw, default, "ignoring invalid wire limit");
                default
            }
        },
        Err(_) => default,
    }
}
