use serde::{Deserialize, Serialize};
use std::fmt;

use crate::codec::Codec;
use crate::error::WireError;
use crate::wire::{self, Cursor};

/// Two-part identifier naming a node in the test tree: the `scope` is the
/// worker that produced it, the `id` is unique within that scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CompositeId {
    pub scope: i64,
    pub id: i64,
}

impl CompositeId {
    pub const fn new(scope: i64, id: i64) -> Self {
        Self { scope, id }
    }
}

impl fmt::Display for CompositeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.scope, self.id)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct IdCodec;

impl Codec<CompositeId> for IdCodec {
    fn encode(&self, buf: &mut Vec<u8>, value: &CompositeId) -> Result<(), WireError> {
        wire::write_i64(buf, value.scope);
        wire::write_i64(buf, value.id);
        Ok(())
    }

    fn decode(&self, cursor: &mut Cursor<'_>) -> Result<CompositeId, WireError> {
        let scope = cursor.read_i64()?;
        let id = cursor.read_i64()?;
        Ok(CompositeId { scope, id })
    }
}
