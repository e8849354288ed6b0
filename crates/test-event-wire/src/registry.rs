//! Kind dispatch: binds every record kind to its codec and frames records as
//! `[kind tag][codec output]`.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::marker::PhantomData;

use crate::codec::Codec;
use crate::config::WireConfig;
use crate::descriptor::{
    ClassDescriptor, ClassDescriptorCodec, MethodDescriptor, MethodDescriptorCodec,
    NestedSuiteDescriptor, NestedSuiteDescriptorCodec, NodeDescriptor, SuiteDescriptor,
    SuiteDescriptorCodec, TestClassRunInfo, TestClassRunInfoCodec, TestDescriptor,
    TestDescriptorCodec, WorkerSuiteDescriptor, WorkerSuiteDescriptorCodec,
};
use crate::error::WireError;
use crate::event::{
    LifecycleEvent, TestCompleteEvent, TestCompleteEventCodec, TestOutputEvent,
    TestOutputEventCodec, TestStartEvent, TestStartEventCodec,
};
use crate::failure::{
    ExternalFailure, ExternalFailureCodec, RawFailure, RawFailureCodec, TestFailure,
    TestFailureCodec,
};
use crate::id::{CompositeId, IdCodec};
use crate::wire::{self, Cursor};

/// Wire discriminator. Tag values are a compatibility contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(u8)]
pub enum Kind {
    TestClassRunInfo = 1,
    CompositeId = 2,
    NestedSuiteDescriptor = 3,
    SuiteDescriptor = 4,
    WorkerSuiteDescriptor = 5,
    ClassDescriptor = 6,
    MethodDescriptor = 7,
    TestDescriptor = 8,
    TestStart = 9,
    TestComplete = 10,
    TestOutput = 11,
    RawFailure = 12,
    TestFailure = 13,
    ExternalFailure = 14,
}

impl Kind {
    pub const ALL: [Kind; 14] = [
        Kind::TestClassRunInfo,
        Kind::CompositeId,
        Kind::NestedSuiteDescriptor,
        Kind::SuiteDescriptor,
        Kind::WorkerSuiteDescriptor,
        Kind::ClassDescriptor,
        Kind::MethodDescriptor,
        Kind::TestDescriptor,
        Kind::TestStart,
        Kind::TestComplete,
        Kind::TestOutput,
        Kind::RawFailure,
        Kind::TestFailure,
        Kind::ExternalFailure,
    ];

    pub fn tag(self) -> u8 {
        self as u8
    }

    pub fn from_tag(tag: u8) -> Option<Kind> {
        Kind::ALL.iter().copied().find(|kind| kind.tag() == tag)
    }
}

/// Any value the registry can put on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Record {
    ClassRunInfo(TestClassRunInfo),
    Id(CompositeId),
    Descriptor(NodeDescriptor),
    Event(LifecycleEvent),
    RawFailure(RawFailure),
    Failure(TestFailure),
    ExternalFailure(ExternalFailure),
}

impl Record {
    pub fn kind(&self) -> Kind {
        match self {
            Record::ClassRunInfo(_) => Kind::TestClassRunInfo,
            Record::Id(_) => Kind::CompositeId,
            Record::Descriptor(descriptor) => match descriptor {
                NodeDescriptor::Suite(_) => Kind::SuiteDescriptor,
                NodeDescriptor::NestedSuite(_) => Kind::NestedSuiteDescriptor,
                NodeDescriptor::WorkerSuite(_) => Kind::WorkerSuiteDescriptor,
                NodeDescriptor::Class(_) => Kind::ClassDescriptor,
                NodeDescriptor::Method(_) => Kind::MethodDescriptor,
                NodeDescriptor::Test(_) => Kind::TestDescriptor,
            },
            Record::Event(event) => match event {
                LifecycleEvent::Start(_) => Kind::TestStart,
                LifecycleEvent::Complete(_) => Kind::TestComplete,
                LifecycleEvent::Output(_) => Kind::TestOutput,
            },
            Record::RawFailure(_) => Kind::RawFailure,
            Record::Failure(_) => Kind::TestFailure,
            Record::ExternalFailure(_) => Kind::ExternalFailure,
        }
    }

    /// Nesting the decoder has to descend through to read this record back.
    pub fn cause_depth(&self) -> usize {
        match self {
            Record::RawFailure(raw) => raw.cause_depth(),
            Record::Failure(failure) => failure.raw_failure().cause_depth(),
            Record::ExternalFailure(failure) => failure.cause_depth(),
            _ => 0,
        }
    }
}

impl From<NodeDescriptor> for Record {
    fn from(value: NodeDescriptor) -> Self {
        Record::Descriptor(value)
    }
}

impl From<LifecycleEvent> for Record {
    fn from(value: LifecycleEvent) -> Self {
        Record::Event(value)
    }
}

/// A concrete value type with a fixed kind, so the codec for it can be
/// chosen when the registry is built rather than by inspecting values.
pub trait Recorded: Sized + 'static {
    const KIND: Kind;

    fn into_record(self) -> Record;
    fn from_record(record: &Record) -> Option<&Self>;
}

macro_rules! recorded {
    ($ty:ty, $kind:ident, |$value:ident| $wrap:expr, $pattern:pat => $inner:ident) => {
        impl Recorded for $ty {
            const KIND: Kind = Kind::$kind;

            fn into_record(self) -> Record {
                let $value = self;
                $wrap
            }

            fn from_record(record: &Record) -> Option<&Self> {
                match record {
                    $pattern => Some($inner),
                    _ => None,
                }
            }
        }

        impl From<$ty> for Record {
            fn from(value: $ty) -> Self {
                value.into_record()
            }
        }
    };
}

recorded!(TestClassRunInfo, TestClassRunInfo, |v| Record::ClassRunInfo(v),
    Record::ClassRunInfo(inner) => inner);
recorded!(CompositeId, CompositeId, |v| Record::Id(v), Record::Id(inner) => inner);
recorded!(NestedSuiteDescriptor, NestedSuiteDescriptor,
    |v| Record::Descriptor(NodeDescriptor::NestedSuite(v)),
    Record::Descriptor(NodeDescriptor::NestedSuite(inner)) => inner);
recorded!(SuiteDescriptor, SuiteDescriptor,
    |v| Record::Descriptor(NodeDescriptor::Suite(v)),
    Record::Descriptor(NodeDescriptor::Suite(inner)) => inner);
recorded!(WorkerSuiteDescriptor, WorkerSuiteDescriptor,
    |v| Record::Descriptor(NodeDescriptor::WorkerSuite(v)),
    Record::Descriptor(NodeDescriptor::WorkerSuite(inner)) => inner);
recorded!(ClassDescriptor, ClassDescriptor,
    |v| Record::Descriptor(NodeDescriptor::Class(v)),
    Record::Descriptor(NodeDescriptor::Class(inner)) => inner);
recorded!(MethodDescriptor, MethodDescriptor,
    |v| Record::Descriptor(NodeDescriptor::Method(v)),
    Record::Descriptor(NodeDescriptor::Method(inner)) => inner);
recorded!(TestDescriptor, TestDescriptor,
    |v| Record::Descriptor(NodeDescriptor::Test(v)),
    Record::Descriptor(NodeDescriptor::Test(inner)) => inner);
recorded!(TestStartEvent, TestStart,
    |v| Record::Event(LifecycleEvent::Start(v)),
    Record::Event(LifecycleEvent::Start(inner)) => inner);
recorded!(TestCompleteEvent, TestComplete,
    |v| Record::Event(LifecycleEvent::Complete(v)),
    Record::Event(LifecycleEvent::Complete(inner)) => inner);
recorded!(TestOutputEvent, TestOutput,
    |v| Record::Event(LifecycleEvent::Output(v)),
    Record::Event(LifecycleEvent::Output(inner)) => inner);
recorded!(RawFailure, RawFailure, |v| Record::RawFailure(v), Record::RawFailure(inner) => inner);
recorded!(TestFailure, TestFailure, |v| Record::Failure(v), Record::Failure(inner) => inner);
recorded!(ExternalFailure, ExternalFailure, |v| Record::ExternalFailure(v),
    Record::ExternalFailure(inner) => inner);

trait RecordCodec: Send + Sync {
    fn encode(&self, buf: &mut Vec<u8>, record: &Record) -> Result<(), WireError>;
    fn decode(&self, cursor: &mut Cursor<'_>) -> Result<Record, WireError>;
}

struct Binding<T, C> {
    codec: C,
    _marker: PhantomData<fn() -> T>,
}

impl<T, C> RecordCodec for Binding<T, C>
where
    T: Recorded,
    C: Codec<T>,
{
    fn encode(&self, buf: &mut Vec<u8>, record: &Record) -> Result<(), WireError> {
        let value = T::from_record(record).ok_or(WireError::KindMismatch(T::KIND))?;
        self.codec.encode(buf, value)
    }

    fn decode(&self, cursor: &mut Cursor<'_>) -> Result<Record, WireError> {
        self.codec.decode(cursor).map(T::into_record)
    }
}

#[derive(Default)]
pub struct RegistryBuilder {
    codecs: HashMap<Kind, Box<dyn RecordCodec>>,
    config: WireConfig,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn config(mut self, config: WireConfig) -> Self {
        self.config = config;
        self
    }

    /// Binds `T`'s kind to `codec`, replacing any earlier binding.
    pub fn register<T, C>(mut self, codec: C) -> Self
    where
        T: Recorded,
        C: Codec<T> + 'static,
    {
        let binding = Binding::<T, C> {
            codec,
            _marker: PhantomData,
        };
        if self.codecs.insert(T::KIND, Box::new(binding)).is_some() {
            tracing::debug!(kind = ?T::KIND, "replaced codec binding");
        }
        self
    }

    pub fn build(self) -> Registry {
        tracing::debug!(kinds = self.codecs.len(), "record registry built");
        Registry {
            codecs: self.codecs,
            config: self.config,
        }
    }
}

/// Immutable kind → codec table. Safe to share across threads once built.
pub struct Registry {
    codecs: HashMap<Kind, Box<dyn RecordCodec>>,
    config: WireConfig,
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("kinds", &self.kinds())
            .field("config", &self.config)
            .finish()
    }
}

impl Registry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::new()
    }

    /// Every record kind bound to its codec, limits taken from the environment.
    pub fn standard() -> Self {
        Self::with_config(WireConfig::from_env())
    }

    pub fn with_config(config: WireConfig) -> Self {
        RegistryBuilder::new()
            .config(config)
            .register::<TestClassRunInfo, _>(TestClassRunInfoCodec)
            .register::<CompositeId, _>(IdCodec)
            .register::<NestedSuiteDescriptor, _>(NestedSuiteDescriptorCodec)
            .register::<SuiteDescriptor, _>(SuiteDescriptorCodec)
            .register::<WorkerSuiteDescriptor, _>(WorkerSuiteDescriptorCodec)
            .register::<ClassDescriptor, _>(ClassDescriptorCodec)
            .register::<MethodDescriptor, _>(MethodDescriptorCodec)
            .register::<TestDescriptor, _>(TestDescriptorCodec)
            .register::<TestStartEvent, _>(TestStartEventCodec)
            .register::<TestCompleteEvent, _>(TestCompleteEventCodec)
            .register::<TestOutputEvent, _>(TestOutputEventCodec)
            .register::<RawFailure, _>(RawFailureCodec)
            .register::<TestFailure, _>(TestFailureCodec)
            .register::<ExternalFailure, _>(ExternalFailureCodec)
            .build()
    }

    pub fn config(&self) -> WireConfig {
        self.config
    }

    pub fn is_registered(&self, kind: Kind) -> bool {
        self.codecs.contains_key(&kind)
    }

    pub fn kinds(&self) -> Vec<Kind> {
        let mut kinds: Vec<Kind> = self.codecs.keys().copied().collect();
        kinds.sort();
        kinds
    }

    /// Appends one frame for `record` to `buf`. On error `buf` is left as it
    /// was. Records nested deeper than this registry would decode are
    /// refused up front.
    pub fn encode(&self, record: &Record, buf: &mut Vec<u8>) -> Result<(), WireError> {
        let kind = record.kind();
        let codec = self.codecs.get(&kind).ok_or(WireError::Unregistered(kind))?;
        let max_depth = self.config.max_nesting_depth;
        if record.cause_depth() > max_depth {
            tracing::warn!(?kind, max_depth, "refusing to encode over-nested record");
            return Err(WireError::NestingTooDeep(max_depth));
        }
        let start = buf.len();
        wire::write_u8(buf, kind.tag());
        if let Err(err) = codec.encode(buf, record) {
            buf.truncate(start);
            return Err(err);
        }
        tracing::trace!(?kind, bytes = buf.len() - start, "encoded frame");
        Ok(())
    }

    pub fn encode_frame(&self, record: &Record) -> Result<Vec<u8>, WireError> {
        let mut buf = Vec::with_capacity(64);
        self.encode(record, &mut buf)?;
        Ok(buf)
    }

    /// Reads one frame at the cursor.
    pub fn decode(&self, cursor: &mut Cursor<'_>) -> Result<Record, WireError> {
        let start = cursor.position();
        let tag = cursor.read_u8()?;
        let codec = Kind::from_tag(tag).and_then(|kind| self.codecs.get(&kind));
        let Some(codec) = codec else {
            tracing::warn!(tag, offset = start, "rejecting frame with unregistered kind");
            return Err(WireError::UnknownKind(tag));
        };
        let record = codec.decode(cursor)?;
        tracing::trace!(
            kind = ?record.kind(),
            bytes = cursor.position() - start,
            "decoded frame"
        );
        Ok(record)
    }

    /// Decodes a buffer that holds exactly one frame.
    pub fn decode_frame(&self, bytes: &[u8]) -> Result<Record, WireError> {
        let mut cursor = self.cursor(bytes);
        let record = self.decode(&mut cursor)?;
        match cursor.remaining() {
            0 => Ok(record),
            extra => Err(WireError::TrailingBytes(extra)),
        }
    }

    pub fn cursor<'a>(&self, bytes: &'a [u8]) -> Cursor<'a> {
        Cursor::with_config(bytes, self.config)
    }

    /// Iterates over back-to-back frames in `bytes`, yielding each record with
    /// the offset it started at. Stops after the first error.
    pub fn frames<'a>(&'a self, bytes: &'a [u8]) -> FrameReader<'a> {
        FrameReader {
            registry: self,
            cursor: self.cursor(bytes),
            failed: false,
        }
    }
}

static DEFAULT_REGISTRY: Lazy<Registry> = Lazy::new(Registry::standard);

/// Process-wide registry with every kind registered.
pub fn default_registry() -> &'static Registry {
    &DEFAULT_REGISTRY
}

pub struct FrameReader<'a> {
    registry: &'a Registry,
    cursor: Cursor<'a>,
    failed: bool,
}

impl<'a> Iterator for FrameReader<'a> {
    type Item = Result<(usize, Record), WireError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.cursor.remaining() == 0 {
            return None;
        }
        let offset = self.cursor.position();
        match self.registry.decode(&mut self.cursor) {
            Ok(record) => Some(Ok((offset, record))),
            Err(err) => {
                self.failed = true;
                Some(Err(err))
            }
        }
    }
}
