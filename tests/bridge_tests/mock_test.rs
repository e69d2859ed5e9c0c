use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use mql_engine::graph::{FieldCallback, GraphError, MockResourceGraph};
use mql_engine::program::builder::ProgramBuilder;
use mql_engine::{
    run_once, run_once_sync, ExecError, Executor, Primitive, Program, RawData, ResourceHandle,
    ResourceSchema, Runtime, Type, Value,
};
use pretty_assertions::assert_eq;

fn file_schema(mock: &mut MockResourceGraph) {
    mock.expect_resource_schema()
        .returning(|_| Ok(Arc::new(ResourceSchema::new("file").with_field("size", Type::Int))));
}

fn size_program() -> Arc<Program> {
    let file = ResourceHandle::new("file", "/etc/fstab");
    let mut b = ProgramBuilder::new();
    let r = b.primitive(Primitive::new(file.resource_type(), Value::Resource(file)));
    let size = b.call("size", Some(r), vec![]);
    b.entrypoint(size);
    Arc::new(b.build())
}

#[test]
fn test_watch_failure_is_registration_error() {
    let mut mock = MockResourceGraph::new();
    file_schema(&mut mock);
    mock.expect_watch_field()
        .times(1)
        .returning(|_, _, _, _| Err(GraphError::Other("collector offline".to_string())));
    // a rejected watch was never registered, so there is nothing to remove
    mock.expect_unregister().never();

    let runtime = Runtime::new(Arc::new(mock));
    let results = run_once_sync(&runtime, size_program(), HashMap::new()).unwrap();

    let err = results[0].data.error.clone().unwrap();
    assert!(matches!(err, ExecError::Registration { .. }));
    assert!(err.to_string().contains("collector offline"));
}

#[test]
fn test_late_delivery_after_unregister_is_discarded() {
    let pending: Arc<Mutex<Option<(String, FieldCallback)>>> = Arc::new(Mutex::new(None));

    let mut mock = MockResourceGraph::new();
    file_schema(&mut mock);
    let store = pending.clone();
    mock.expect_watch_field()
        .times(1)
        .returning(move |_, _, wid, callback| {
            *store.lock().unwrap() = Some((wid.to_string(), callback));
            Ok(())
        });
    mock.expect_unregister().times(1).return_const(());

    let runtime = Runtime::new(Arc::new(mock));
    let seen = Arc::new(Mutex::new(vec![]));
    let sink = seen.clone();
    let executor = run_once(&runtime, size_program(), HashMap::new(), move |r, done| {
        sink.lock().unwrap().push((r.data, done))
    })
    .unwrap();
    assert!(seen.lock().unwrap().is_empty());

    let (wid, callback) = pending.lock().unwrap().take().unwrap();
    assert!(wid.starts_with("mql:"));
    assert!(wid.contains(executor.id()));

    callback(Ok(Value::Int(2048)));
    assert!(executor.is_closed());
    // the graph may still be flushing an update it picked up before the
    // unregister call
    callback(Ok(Value::Int(4096)));

    assert_eq!(*seen.lock().unwrap(), vec![(RawData::int(2048), true)]);
}

#[test]
fn test_unregister_during_watch_leaves_no_watch_behind() {
    let live: Arc<Mutex<HashSet<String>>> = Arc::new(Mutex::new(HashSet::new()));
    let handle: Arc<Mutex<Option<Executor>>> = Arc::new(Mutex::new(None));

    let mut mock = MockResourceGraph::new();
    file_schema(&mut mock);
    let (registered, closer) = (live.clone(), handle.clone());
    mock.expect_watch_field()
        .times(1)
        .returning(move |_, _, wid, _| {
            // the executor closes before the graph has stored the watch
            if let Some(executor) = closer.lock().unwrap().take() {
                executor.unregister();
            }
            registered.lock().unwrap().insert(wid.to_string());
            Ok(())
        });
    let removed = live.clone();
    mock.expect_unregister().returning(move |wid| {
        removed.lock().unwrap().remove(wid);
    });

    let runtime = Runtime::new(Arc::new(mock));
    let executor = Executor::new(runtime, size_program(), HashMap::new(), |_, _| {}).unwrap();
    *handle.lock().unwrap() = Some(executor.clone());
    executor.run();

    assert!(executor.is_closed());
    assert!(live.lock().unwrap().is_empty());
}
