use test_event_wire::{
    ClassDescriptor, CompositeId, Destination, FailureDetails, LifecycleEvent, MethodDescriptor,
    RawFailure, Record, Registry, ResultType, SuiteDescriptor, TestClassRunInfo,
    TestCompleteEvent, TestDescriptor, TestFailure, TestOutputEvent, TestStartEvent, WireError,
    WorkerSuiteDescriptor,
};

const WORKER_SCOPE: i64 = 7;

/// One worker's view of a small run: a passing test and a failing one.
pub fn worker_stream() -> Vec<Record> {
    let root = CompositeId::new(0, 1);
    let worker = CompositeId::new(WORKER_SCOPE, 1);
    let class = CompositeId::new(WORKER_SCOPE, 2);
    let passing = CompositeId::new(WORKER_SCOPE, 3);
    let failing = CompositeId::new(WORKER_SCOPE, 4);
    let class_name = "org.example.CacheTest";

    let mut records: Vec<Record> = vec![
        SuiteDescriptor {
            id: root,
            name: "Test Run".into(),
        }
        .into(),
        WorkerSuiteDescriptor {
            id: worker,
            name: format!("Worker {WORKER_SCOPE}"),
        }
        .into(),
        TestClassRunInfo {
            test_class_name: class_name.into(),
        }
        .into(),
        ClassDescriptor {
            id: class,
            name: class_name.into(),
            display_name: "CacheTest".into(),
        }
        .into(),
        MethodDescriptor {
            id: passing,
            class_name: class_name.into(),
            name: "evictsOldestEntry".into(),
        }
        .into(),
        start(1_000, class),
    ];

    records.push(start(1_010, passing));
    records.push(output(Destination::StdOut, "cache size 3\n"));
    records.push(complete(1_020, ResultType::Success));

    records.push(
        TestDescriptor {
            id: failing,
            class_name: class_name.into(),
            class_display_name: "CacheTest".into(),
            name: "expiresEntries".into(),
            display_name: "entries expire after ttl".into(),
        }
        .into(),
    );
    records.push(start(1_030, failing));
    records.push(output(Destination::StdErr, "clock skew detected\n"));
    records.push(
        TestFailure::new(
            RawFailure::new("expected 0 but was 1")
                .with_cause(RawFailure::new("clock went backwards")),
            FailureDetails {
                message: Some("expected 0 but was 1".into()),
                class_name: Some("AssertionError".into()),
                stacktrace: Some("expected 0 but was 1\nCaused by: clock went backwards".into()),
                is_assertion_failure: true,
                expected: Some("0".into()),
                actual: Some("1".into()),
            },
        )
        .into(),
    );
    records.push(complete(1_045, ResultType::Failure));
    records.push(complete(1_050, ResultType::Failure));
    records
}

pub fn encode_stream(registry: &Registry, records: &[Record]) -> Result<Vec<u8>, WireError> {
    let mut buf = Vec::new();
    for record in records {
        registry.encode(record, &mut buf)?;
    }
    Ok(buf)
}

fn start(time: i64, parent: CompositeId) -> Record {
    LifecycleEvent::Start(TestStartEvent {
        time,
        parent_id: Some(parent),
    })
    .into()
}

fn output(destination: Destination, message: &str) -> Record {
    LifecycleEvent::Output(TestOutputEvent {
        destination,
        message: message.into(),
    })
    .into()
}

fn complete(end_time: i64, result_type: ResultType) -> Record {
    LifecycleEvent::Complete(TestCompleteEvent {
        end_time,
        result_type: Some(result_type),
    })
    .into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_event_wire::default_registry;

    #[test_timeout::timeout]
    fn sample_stream_decodes_back() {
        let records = worker_stream();
        let bytes = encode_stream(default_registry(), &records).unwrap();
        let decoded: Vec<Record> = default_registry()
            .frames(&bytes)
            .map(|frame| frame.map(|(_, record)| record))
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(decoded, records);
    }
}
