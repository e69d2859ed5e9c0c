use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use mql_engine::program::builder::ProgramBuilder;
use mql_engine::{
    run_once, run_once_async, run_once_sync, EngineConfig, Error, ExecError, Primitive, Program,
    ProgramError, RawData, Type, Value,
};
use pretty_assertions::assert_eq;

use crate::{comparison, int_array, int_map, memory_runtime, sample_graph};

fn single(program: Arc<Program>) -> RawData {
    let (_, runtime) = memory_runtime();
    let mut results = run_once_sync(&runtime, program, HashMap::new()).unwrap();
    assert_eq!(results.len(), 1);
    results.remove(0).data
}

#[test]
fn test_int_equals_int() {
    let data = single(comparison(Primitive::int(5), "==", Primitive::int(5)));
    assert_eq!(data, RawData::bool(true));
    assert_eq!(data.ty, Type::Bool);
}

#[test]
fn test_int_equals_float() {
    let data = single(comparison(Primitive::int(5), "==", Primitive::float(5.0)));
    assert_eq!(data, RawData::bool(true));
}

#[test]
fn test_array_membership_broadcast() {
    let array = int_array(&[1, 2, 3]);
    for (op, needle, expected) in [
        ("==", 2, true),
        ("==", 5, false),
        ("!=", 2, false),
        ("!=", 5, true),
    ] {
        let data = single(comparison(array.clone(), op, Primitive::int(needle)));
        assert_eq!(data, RawData::bool(expected), "{} {}", op, needle);
    }

    // reversed: scalar bound, array operand
    let data = single(comparison(Primitive::int(3), "==", array));
    assert_eq!(data, RawData::bool(true));
}

#[test]
fn test_array_equality_is_element_wise_for_same_element_type() {
    let data = single(comparison(
        int_array(&[1, 2]),
        "==",
        int_array(&[1, 2]),
    ));
    assert_eq!(data, RawData::bool(true));

    let data = single(comparison(
        int_array(&[1, 2]),
        "==",
        Primitive::array(Type::Bool, vec![Value::Bool(true)]),
    ));
    assert!(matches!(data.error, Some(ExecError::Lookup(_))));
}

#[test]
fn test_string_numeric_ordering_parses_numbers() {
    let data = single(comparison(Primitive::string("10"), "<", Primitive::int(9)));
    assert_eq!(data, RawData::bool(false));

    let data = single(comparison(Primitive::int(9), "<", Primitive::string("10")));
    assert_eq!(data, RawData::bool(true));

    let data = single(comparison(Primitive::string("ten"), "<", Primitive::int(9)));
    assert!(matches!(data.error, Some(ExecError::Operator { .. })));
}

#[test]
fn test_string_matches_regex() {
    let data = single(comparison(
        Primitive::string("PermitRootLogin no"),
        "==",
        Primitive::regex("^PermitRootLogin\\s+no$"),
    ));
    assert_eq!(data, RawData::bool(true));

    let data = single(comparison(
        Primitive::string("PermitRootLogin yes"),
        "!=",
        Primitive::regex("no$"),
    ));
    assert_eq!(data, RawData::bool(true));
}

#[test]
fn test_unregistered_operator_is_result_error() {
    let data = single(comparison(Primitive::bool(true), ">", Primitive::bool(false)));
    let err = data.error.unwrap();
    assert!(matches!(err, ExecError::Lookup(ref lookup) if lookup.is_not_found()));
    assert!(err.to_string().contains("bool"));
}

#[test]
fn test_one_failure_does_not_stop_other_callpoints() {
    let mut b = ProgramBuilder::new();
    let flag = b.primitive(Primitive::bool(true));
    let bad = b.call("<", Some(flag), vec![Primitive::bool(false)]);
    let num = b.primitive(Primitive::int(2));
    let good = b.call(">=", Some(num), vec![Primitive::float(1.5)]);
    b.entrypoint(bad);
    b.entrypoint(good);

    let (_, runtime) = memory_runtime();
    let results = run_once_sync(&runtime, Arc::new(b.build()), HashMap::new()).unwrap();
    assert_eq!(results.len(), 2);
    assert!(results[0].data.is_error());
    assert_eq!(results[1].data, RawData::bool(true));
}

#[test]
fn test_map_index() {
    let mut b = ProgramBuilder::new();
    let map = b.primitive(int_map(&[("a", 1), ("b", 2)]));
    let idx = b.call("[]", Some(map), vec![Primitive::string("b")]);
    let missing = b.call("[]", Some(map), vec![Primitive::string("zz")]);
    let eq = b.call("==", Some(missing), vec![Primitive::int(0)]);
    let len = b.call("length", Some(map), vec![]);
    b.entrypoint(idx);
    b.entrypoint(eq);
    b.datapoint(len);

    let (_, runtime) = memory_runtime();
    let results = run_once_sync(&runtime, Arc::new(b.build()), HashMap::new()).unwrap();
    let data: Vec<RawData> = results.into_iter().map(|r| r.data).collect();
    assert_eq!(
        data,
        vec![RawData::int(2), RawData::bool(false), RawData::int(2)]
    );
}

#[test]
fn test_array_index_and_length() {
    let mut b = ProgramBuilder::new();
    let array = b.primitive(int_array(&[4, 5, 6]));
    let last = b.call("[]", Some(array), vec![Primitive::int(-1)]);
    let out = b.call("[]", Some(array), vec![Primitive::int(3)]);
    let len = b.call("length", Some(array), vec![]);
    b.entrypoint(last);
    b.entrypoint(out);
    b.entrypoint(len);

    let (_, runtime) = memory_runtime();
    let results = run_once_sync(&runtime, Arc::new(b.build()), HashMap::new()).unwrap();
    assert_eq!(results[0].data, RawData::int(6));
    assert!(matches!(
        results[1].data.error,
        Some(ExecError::Operator { .. })
    ));
    assert_eq!(results[2].data, RawData::int(3));
}

#[test]
fn test_results_carry_checksums() {
    let program = comparison(Primitive::int(1), "==", Primitive::int(1));
    let expected = program.checksum(program.entrypoints[0]).unwrap().to_string();
    let (_, runtime) = memory_runtime();
    let results = run_once_sync(&runtime, program, HashMap::new()).unwrap();
    assert_eq!(results[0].code_id, expected);
}

#[test]
fn test_run_once_counts_exactly_callpoints() {
    let mut b = ProgramBuilder::new();
    for i in 0..3 {
        let r = b.primitive(Primitive::int(i));
        b.entrypoint(r);
    }
    let d = b.primitive(Primitive::string("meta"));
    b.datapoint(d);

    let (_, runtime) = memory_runtime();
    let calls = Arc::new(Mutex::new(vec![]));
    let sink = calls.clone();
    run_once(&runtime, Arc::new(b.build()), HashMap::new(), move |_, done| {
        sink.lock().unwrap().push(done)
    })
    .unwrap();

    assert_eq!(*calls.lock().unwrap(), vec![false, false, false, true]);
}

#[test]
fn test_run_once_sync_matches_run_once_invocations() {
    let (graph, runtime) = sample_graph();
    let file = graph.add_resource("file", "/etc/hosts", vec![("size", Value::Int(120))]);

    let mut b = ProgramBuilder::new();
    let f = b.primitive(Primitive::new(file.resource_type(), Value::Resource(file)));
    let size = b.call("size", Some(f), vec![]);
    let big = b.call(">", Some(size), vec![Primitive::int(100)]);
    b.entrypoint(big);
    b.datapoint(size);
    let program = Arc::new(b.build());

    let count = Arc::new(Mutex::new(0));
    let sink = count.clone();
    run_once(&runtime, program.clone(), HashMap::new(), move |_, _| {
        *sink.lock().unwrap() += 1
    })
    .unwrap();

    let results = run_once_sync(&runtime, program, HashMap::new()).unwrap();
    assert_eq!(results.len(), *count.lock().unwrap());
    assert_eq!(results.len(), 2);
}

#[test]
fn test_zero_callpoints_complete_immediately() {
    let (_, runtime) = memory_runtime();
    let calls = Arc::new(Mutex::new(0));
    let sink = calls.clone();
    run_once(&runtime, Arc::new(Program::default()), HashMap::new(), move |_, _| {
        *sink.lock().unwrap() += 1
    })
    .unwrap();
    assert_eq!(*calls.lock().unwrap(), 0);

    let results = run_once_sync(&runtime, Arc::new(Program::default()), HashMap::new()).unwrap();
    assert!(results.is_empty());
}

#[test]
fn test_invalid_program_fails_before_evaluation() {
    let mut program = (*comparison(Primitive::int(1), "==", Primitive::int(1))).clone();
    program.checksums.clear();

    let (_, runtime) = memory_runtime();
    let err = run_once_sync(&runtime, Arc::new(program), HashMap::new()).unwrap_err();
    assert!(matches!(
        err,
        Error::Program(ProgramError::MissingChecksum { .. })
    ));
}

#[test]
fn test_duplicate_callpoints_are_rejected() {
    let mut b = ProgramBuilder::new();
    let r = b.primitive(Primitive::int(1));
    b.entrypoint(r);
    b.datapoint(r);

    let (_, runtime) = memory_runtime();
    let err = run_once_sync(&runtime, Arc::new(b.build()), HashMap::new()).unwrap_err();
    assert!(matches!(
        err,
        Error::Program(ProgramError::DuplicateCallpoint { .. })
    ));
}

#[tokio::test]
async fn test_run_once_async_collects_results() {
    let (_, runtime) = memory_runtime();
    let program = comparison(Primitive::float(2.5), ">", Primitive::int(2));
    let results = run_once_async(&runtime, program, HashMap::new()).await.unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].data, RawData::bool(true));
}

#[tokio::test]
async fn test_run_once_async_times_out_on_missing_data() {
    let (graph, runtime) = sample_graph();
    let runtime = runtime.with_config(EngineConfig {
        result_timeout: Duration::from_millis(50),
        ..Default::default()
    });
    let file = graph.add_resource("file", "/var/log/syslog", vec![]);

    let mut b = ProgramBuilder::new();
    let f = b.primitive(Primitive::new(file.resource_type(), Value::Resource(file)));
    let size = b.call("size", Some(f), vec![]);
    b.entrypoint(size);

    let err = run_once_async(&runtime, Arc::new(b.build()), HashMap::new())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Timeout(d) if d == Duration::from_millis(50)));
    assert_eq!(graph.watch_count(), 0);
}
