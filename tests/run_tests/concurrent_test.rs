use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use mql_engine::program::builder::ProgramBuilder;
use mql_engine::{run_once, run_once_sync, Primitive, Program, RawData, ResourceHandle, Value};
use pretty_assertions::assert_eq;

use crate::sample_graph;

/// One entrypoint per field of `file`, none of them resolved yet.
fn fields_program(file: &ResourceHandle, fields: &[&str]) -> Arc<Program> {
    let mut b = ProgramBuilder::new();
    let f = b.primitive(Primitive::new(file.resource_type(), Value::Resource(file.clone())));
    for field in fields {
        let call = b.call(field, Some(f), vec![]);
        b.entrypoint(call);
    }
    Arc::new(b.build())
}

#[test]
fn test_done_is_last_when_deliveries_overlap() {
    let (graph, runtime) = sample_graph();
    let file = graph.add_resource("file", "/etc/passwd", vec![]);
    let program = fields_program(&file, &["size", "content"]);

    let flags = Arc::new(Mutex::new(vec![]));
    let sink = flags.clone();
    let _executor = run_once(&runtime, program, HashMap::new(), move |_, done| {
        // keep the first delivery busy while the second one arrives
        if !done {
            thread::sleep(Duration::from_millis(300));
        }
        sink.lock().unwrap().push(done);
    })
    .unwrap();

    let first = {
        let (graph, file) = (graph.clone(), file.clone());
        thread::spawn(move || graph.set_field(&file, "size", Value::Int(1)))
    };
    thread::sleep(Duration::from_millis(50));
    let second = {
        let (graph, file) = (graph.clone(), file.clone());
        thread::spawn(move || graph.set_field(&file, "content", Value::String("root".into())))
    };
    first.join().unwrap();
    second.join().unwrap();

    assert_eq!(*flags.lock().unwrap(), vec![false, true]);
    assert_eq!(graph.watch_count(), 0);
}

#[test]
fn test_run_once_sync_with_many_producers() {
    let (graph, runtime) = sample_graph();
    let file = graph.add_resource("file", "/etc/shadow", vec![]);
    let program = fields_program(&file, &["path", "size", "content"]);

    let updates = [
        ("path", Value::String("/etc/shadow".into())),
        ("size", Value::Int(640)),
        ("content", Value::String("root:*".into())),
    ];
    let producers: Vec<_> = updates
        .into_iter()
        .enumerate()
        .map(|(i, (field, value))| {
            let (graph, file) = (graph.clone(), file.clone());
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(20 * (i as u64 + 1)));
                graph.set_field(&file, field, value);
            })
        })
        .collect();

    let results = run_once_sync(&runtime, program.clone(), HashMap::new()).unwrap();
    for producer in producers {
        producer.join().unwrap();
    }

    assert_eq!(results.len(), program.callpoint_count());
    let mut data: Vec<RawData> = results.into_iter().map(|r| r.data).collect();
    data.sort_by_key(|d| d.value.to_string());
    let mut expected = vec![
        RawData::string("/etc/shadow"),
        RawData::int(640),
        RawData::string("root:*"),
    ];
    expected.sort_by_key(|d| d.value.to_string());
    assert_eq!(data, expected);
    assert_eq!(graph.watch_count(), 0);
}
