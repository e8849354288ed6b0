use serde::{Deserialize, Serialize};

use crate::codec::{Codec, Nullable, Ordinal, OrdinalCodec};
use crate::error::WireError;
use crate::id::{CompositeId, IdCodec};
use crate::wire::{self, Cursor};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResultType {
    Success,
    Failure,
    Skipped,
}

impl Ordinal for ResultType {
    const NAME: &'static str = "unknown result type";

    fn ordinal(self) -> u8 {
        match self {
            ResultType::Success => 0,
            ResultType::Failure => 1,
            ResultType::Skipped => 2,
        }
    }

    fn from_ordinal(value: u8) -> Option<Self> {
        match value {
            0 => Some(ResultType::Success),
            1 => Some(ResultType::Failure),
            2 => Some(ResultType::Skipped),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Destination {
    StdOut,
    StdErr,
}

impl Ordinal for Destination {
    const NAME: &'static str = "unknown output destination";

    fn ordinal(self) -> u8 {
        match self {
            Destination::StdOut => 0,
            Destination::StdErr => 1,
        }
    }

    fn from_ordinal(value: u8) -> Option<Self> {
        match value {
            0 => Some(Destination::StdOut),
            1 => Some(Destination::StdErr),
            _ => None,
        }
    }
}

/// A node started executing. `parent_id` is absent for the root of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestStartEvent {
    pub time: i64,
    pub parent_id: Option<CompositeId>,
}

/// A node finished. Composite nodes may leave `result_type` for the
/// consumer to derive from their children.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestCompleteEvent {
    pub end_time: i64,
    pub result_type: Option<ResultType>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestOutputEvent {
    pub destination: Destination,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LifecycleEvent {
    Start(TestStartEvent),
    Complete(TestCompleteEvent),
    Output(TestOutputEvent),
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TestStartEventCodec;

impl Codec<TestStartEvent> for TestStartEventCodec {
    fn encode(&self, buf: &mut Vec<u8>, value: &TestStartEvent) -> Result<(), WireError> {
        wire::write_i64(buf, value.time);
        Nullable(IdCodec).encode(buf, &value.parent_id)
    }

    fn decode(&self, cursor: &mut Cursor<'_>) -> Result<TestStartEvent, WireError> {
        let time = cursor.read_i64()?;
        let parent_id = Nullable(IdCodec).decode(cursor)?;
        Ok(TestStartEvent { time, parent_id })
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TestCompleteEventCodec;

impl Codec<TestCompleteEvent> for TestCompleteEventCodec {
    fn encode(&self, buf: &mut Vec<u8>, value: &TestCompleteEvent) -> Result<(), WireError> {
        wire::write_i64(buf, value.end_time);
        Nullable(OrdinalCodec).encode(buf, &value.result_type)
    }

    fn decode(&self, cursor: &mut Cursor<'_>) -> Result<TestCompleteEvent, WireError> {
        let end_time = cursor.read_i64()?;
        let result_type = Nullable(OrdinalCodec).decode(cursor)?;
        Ok(TestCompleteEvent {
            end_time,
            result_type,
        })
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TestOutputEventCodec;

impl Codec<TestOutputEvent> for TestOutputEventCodec {
    fn encode(&self, buf: &mut Vec<u8>, value: &TestOutputEvent) -> Result<(), WireError> {
        OrdinalCodec.encode(buf, &value.destination)?;
        wire::write_string(buf, &value.message)
    }

    fn decode(&self, cursor: &mut Cursor<'_>) -> Result<TestOutputEvent, WireError> {
        let destination = OrdinalCodec.decode(cursor)?;
        let message = cursor.read_string()?;
        Ok(TestOutputEvent {
            destination,
            message,
        })
    }
}
