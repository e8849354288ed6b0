//! Binary wire format for test results sent from a test worker to the
//! process coordinating it.
//!
//! Responsibilities:
//! - identifiers and descriptors for every node of the test tree
//! - start / output / complete lifecycle events
//! - failures rendered to text, cause chains included, so nothing depends on
//!   reconstructing live error objects on the receiving side
//! - a kind registry that frames every record as `[kind tag][fields]`
//!
//! Framing of whole frames on a byte stream, retries and ordering belong to
//! the transport.

pub mod codec;
pub mod config;
pub mod descriptor;
pub mod error;
pub mod event;
pub mod failure;
pub mod id;
pub mod registry;
pub mod wire;

pub use codec::{Codec, Nullable};
pub use config::WireConfig;
pub use descriptor::{
    ClassDescriptor, MethodDescriptor, NestedSuiteDescriptor, NodeDescriptor, SuiteDescriptor,
    TestClassRunInfo, TestDescriptor, WorkerSuiteDescriptor,
};
pub use error::{FailureError, WireError};
pub use event::{
    Destination, LifecycleEvent, ResultType, TestCompleteEvent, TestOutputEvent, TestStartEvent,
};
pub use failure::{
    render_failure, AssertionFailure, ExternalFailure, FailureDetails, FrameworkFailure,
    RawFailure, TestFailure,
};
pub use id::CompositeId;
pub use registry::{default_registry, FrameReader, Kind, Record, Recorded, Registry, RegistryBuilder};
pub use wire::Cursor;
