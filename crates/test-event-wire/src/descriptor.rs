//! Test-tree node descriptors produced by the worker at discovery time.
//!
//! Every descriptor has its own codec and its own kind tag. The field order
//! written by each codec is part of the wire contract.

use serde::{Deserialize, Serialize};

use crate::codec::Codec;
use crate::error::WireError;
use crate::id::{CompositeId, IdCodec};
use crate::wire::{self, Cursor};

/// Request for the worker to run every test in one class.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestClassRunInfo {
    pub test_class_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuiteDescriptor {
    pub id: CompositeId,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NestedSuiteDescriptor {
    pub id: CompositeId,
    pub name: String,
    pub display_name: String,
    pub parent_id: CompositeId,
}

/// Root suite a single worker process reports its tests under.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerSuiteDescriptor {
    pub id: CompositeId,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassDescriptor {
    pub id: CompositeId,
    pub name: String,
    pub display_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodDescriptor {
    pub id: CompositeId,
    pub class_name: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestDescriptor {
    pub id: CompositeId,
    pub class_name: String,
    pub class_display_name: String,
    pub name: String,
    pub display_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeDescriptor {
    Suite(SuiteDescriptor),
    NestedSuite(NestedSuiteDescriptor),
    WorkerSuite(WorkerSuiteDescriptor),
    Class(ClassDescriptor),
    Method(MethodDescriptor),
    Test(TestDescriptor),
}

impl NodeDescriptor {
    pub fn id(&self) -> CompositeId {
        match self {
            NodeDescriptor::Suite(d) => d.id,
            NodeDescriptor::NestedSuite(d) => d.id,
            NodeDescriptor::WorkerSuite(d) => d.id,
            NodeDescriptor::Class(d) => d.id,
            NodeDescriptor::Method(d) => d.id,
            NodeDescriptor::Test(d) => d.id,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            NodeDescriptor::Suite(d) => &d.name,
            NodeDescriptor::NestedSuite(d) => &d.name,
            NodeDescriptor::WorkerSuite(d) => &d.name,
            NodeDescriptor::Class(d) => &d.name,
            NodeDescriptor::Method(d) => &d.name,
            NodeDescriptor::Test(d) => &d.name,
        }
    }

    /// Human-facing name; variants without one fall back to `name`.
    pub fn display_name(&self) -> &str {
        match self {
            NodeDescriptor::NestedSuite(d) => &d.display_name,
            NodeDescriptor::Class(d) => &d.display_name,
            NodeDescriptor::Test(d) => &d.display_name,
            other => other.name(),
        }
    }

    /// Parent recorded on the descriptor itself. Other nodes learn their
    /// parent from the start event instead.
    pub fn parent_id(&self) -> Option<CompositeId> {
        match self {
            NodeDescriptor::NestedSuite(d) => Some(d.parent_id),
            _ => None,
        }
    }

    pub fn class_name(&self) -> Option<&str> {
        match self {
            NodeDescriptor::Class(d) => Some(&d.name),
            NodeDescriptor::Method(d) => Some(&d.class_name),
            NodeDescriptor::Test(d) => Some(&d.class_name),
            _ => None,
        }
    }

    /// Whether the node groups other nodes rather than being a runnable test.
    pub fn is_composite(&self) -> bool {
        !matches!(self, NodeDescriptor::Method(_) | NodeDescriptor::Test(_))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TestClassRunInfoCodec;

impl Codec<TestClassRunInfo> for TestClassRunInfoCodec {
    fn encode(&self, buf: &mut Vec<u8>, value: &TestClassRunInfo) -> Result<(), WireError> {
        wire::write_string(buf, &value.test_class_name)
    }

    fn decode(&self, cursor: &mut Cursor<'_>) -> Result<TestClassRunInfo, WireError> {
        Ok(TestClassRunInfo {
            test_class_name: cursor.read_string()?,
        })
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SuiteDescriptorCodec;

impl Codec<SuiteDescriptor> for SuiteDescriptorCodec {
    fn encode(&self, buf: &mut Vec<u8>, value: &SuiteDescriptor) -> Result<(), WireError> {
        IdCodec.encode(buf, &value.id)?;
        wire::write_string(buf, &value.name)
    }

    fn decode(&self, cursor: &mut Cursor<'_>) -> Result<SuiteDescriptor, WireError> {
        let id = IdCodec.decode(cursor)?;
        let name = cursor.read_string()?;
        Ok(SuiteDescriptor { id, name })
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NestedSuiteDescriptorCodec;

impl Codec<NestedSuiteDescriptor> for NestedSuiteDescriptorCodec {
    fn encode(&self, buf: &mut Vec<u8>, value: &NestedSuiteDescriptor) -> Result<(), WireError> {
        IdCodec.encode(buf, &value.id)?;
        wire::write_string(buf, &value.name)?;
        wire::write_string(buf, &value.display_name)?;
        IdCodec.encode(buf, &value.parent_id)
    }

    fn decode(&self, cursor: &mut Cursor<'_>) -> Result<NestedSuiteDescriptor, WireError> {
        let id = IdCodec.decode(cursor)?;
        let name = cursor.read_string()?;
        let display_name = cursor.read_string()?;
        let parent_id = IdCodec.decode(cursor)?;
        Ok(NestedSuiteDescriptor {
            id,
            name,
            display_name,
            parent_id,
        })
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct WorkerSuiteDescriptorCodec;

impl Codec<WorkerSuiteDescriptor> for WorkerSuiteDescriptorCodec {
    fn encode(&self, buf: &mut Vec<u8>, value: &WorkerSuiteDescriptor) -> Result<(), WireError> {
        IdCodec.encode(buf, &value.id)?;
        wire::write_string(buf, &value.name)
    }

    fn decode(&self, cursor: &mut Cursor<'_>) -> Result<WorkerSuiteDescriptor, WireError> {
        let id = IdCodec.decode(cursor)?;
        let name = cursor.read_string()?;
        Ok(WorkerSuiteDescriptor { id, name })
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ClassDescriptorCodec;

impl Codec<ClassDescriptor> for ClassDescriptorCodec {
    fn encode(&self, buf: &mut Vec<u8>, value: &ClassDescriptor) -> Result<(), WireError> {
        IdCodec.encode(buf, &value.id)?;
        wire::write_string(buf, &value.name)?;
        wire::write_string(buf, &value.display_name)
    }

    fn decode(&self, cursor: &mut Cursor<'_>) -> Result<ClassDescriptor, WireError> {
        let id = IdCodec.decode(cursor)?;
        let name = cursor.read_string()?;
        let display_name = cursor.read_string()?;
        Ok(ClassDescriptor {
            id,
            name,
            display_name,
        })
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct MethodDescriptorCodec;

impl Codec<MethodDescriptor> for MethodDescriptorCodec {
    fn encode(&self, buf: &mut Vec<u8>, value: &MethodDescriptor) -> Result<(), WireError> {
        IdCodec.encode(buf, &value.id)?;
        wire::write_string(buf, &value.class_name)?;
        wire::write_string(buf, &value.name)
    }

    fn decode(&self, cursor: &mut Cursor<'_>) -> Result<MethodDescriptor, WireError> {
        let id = IdCodec.decode(cursor)?;
        let class_name = cursor.read_string()?;
        let name = cursor.read_string()?;
        Ok(MethodDescriptor {
            id,
            class_name,
            name,
        })
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TestDescriptorCodec;

impl Codec<TestDescriptor> for TestDescriptorCodec {
    fn encode(&self, buf: &mut Vec<u8>, value: &TestDescriptor) -> Result<(), WireError> {
        IdCodec.encode(buf, &value.id)?;
        wire::write_string(buf, &value.class_name)?;
        wire::write_string(buf, &value.class_display_name)?;
        wire::write_string(buf, &value.name)?;
        wire::write_string(buf, &value.display_name)
    }

    fn decode(&self, cursor: &mut Cursor<'_>) -> Result<TestDescriptor, WireError> {
        let id = IdCodec.decode(cursor)?;
        let class_name = cursor.read_string()?;
        let class_display_name = cursor.read_string()?;
        let name = cursor.read_string()?;
        let display_name = cursor.read_string()?;
        Ok(TestDescriptor {
            id,
            class_name,
            class_display_name,
            name,
            display_name,
        })
    }
}
