//! End-to-end coverage of the batch stage and its transforms.

use rillflow::{SliceCollector, SliceEmitter, Stream, StreamError, Value};
use tokio::time::{timeout, Duration};

async fn run_stream(stream: &mut Stream) -> Result<(), StreamError> {
    timeout(Duration::from_secs(2), stream.run())
        .await
        .expect("stream completes in time")
}

fn split_csv(value: Value) -> Value {
    let fields: Vec<Value> = value
        .as_str()
        .unwrap_or_default()
        .split(',')
        .map(Value::from)
        .collect();
    Value::List(fields)
}

#[tokio::test]
async fn csv_ratio_column_sums_to_expected_total() {
    let rows = [
        "alpha,2026-01-01,330,0.56",
        "bravo,2026-01-02,180,0.56",
        "charlie,2026-01-03,270,0.56",
        "delta,2026-01-04,400,0.56",
        "echo,2026-01-05,115,0.56",
        "foxtrot,2026-01-06,240,0.56",
        "golf,2026-01-07,160,0.56",
        "hotel,2026-01-08,310,0.56",
        "india,2026-01-09,205,0.56",
    ];

    let sink = SliceCollector::new();
    let handle = sink.handle();
    let mut stream = Stream::new(SliceEmitter::new(rows))
        .map(split_csv)
        .map(|row: Value| -> Result<Value, StreamError> {
            let field = row
                .as_list()
                .and_then(|fields| fields.get(3))
                .and_then(Value::as_str)
                .ok_or_else(|| StreamError::general("row has no ratio field"))?;
            let ratio: f64 = field.parse().map_err(StreamError::wrap)?;
            Ok(Value::Float(ratio))
        })
        .batch()
        .sum()
        .sink(sink);

    run_stream(&mut stream).await.expect("clean completion");
    let values = handle.values();
    assert_eq!(values.len(), 1);
    let total = values[0].as_float().expect("sum is a float");
    assert!((total - 5.04).abs() < 1e-9, "unexpected total {total}");
}

#[tokio::test]
async fn filtered_tuples_sort_ascending_by_position() {
    let events = [
        Value::list([Value::from("request"), Value::from("/"), Value::from("GET"), Value::Int(3)]),
        Value::list([Value::from("response"), Value::from("/"), Value::from("200"), Value::Int(7)]),
        Value::list([Value::from("response"), Value::from("/a"), Value::from("200"), Value::Int(2)]),
        Value::list([Value::from("request"), Value::from("/a"), Value::from("GET"), Value::Int(9)]),
        Value::list([Value::from("response"), Value::from("/b"), Value::from("404"), Value::Int(5)]),
        Value::list([Value::from("request"), Value::from("/b"), Value::from("GET"), Value::Int(1)]),
        Value::list([Value::from("response"), Value::from("/c"), Value::from("200"), Value::Int(4)]),
        Value::list([Value::from("response"), Value::from("/d"), Value::from("500"), Value::Int(6)]),
    ];

    let sink = SliceCollector::new();
    let handle = sink.handle();
    let mut stream = Stream::new(SliceEmitter::new(events))
        .filter(|value: &Value| {
            value
                .as_list()
                .and_then(|fields| fields.first())
                .and_then(Value::as_str)
                == Some("response")
        })
        .batch()
        .sort_by_pos(3)
        .sink(sink);

    run_stream(&mut stream).await.expect("clean completion");
    let values = handle.values();
    assert_eq!(values.len(), 1);

    let sorted = values[0].as_list().expect("one sorted batch");
    let keys: Vec<i64> = sorted
        .iter()
        .map(|row| {
            row.as_list()
                .and_then(|fields| fields.get(3))
                .and_then(Value::as_int)
                .expect("sortable key")
        })
        .collect();
    assert_eq!(keys, vec![2, 4, 5, 6, 7]);
}

#[tokio::test]
async fn sorting_twice_changes_nothing() {
    let sink_once = SliceCollector::new();
    let once = sink_once.handle();
    let mut stream = Stream::new(SliceEmitter::new([4, 1, 3, 1, 2]))
        .batch()
        .sort()
        .sink(sink_once);
    run_stream(&mut stream).await.expect("clean completion");

    let sink_twice = SliceCollector::new();
    let twice = sink_twice.handle();
    let mut stream = Stream::new(SliceEmitter::new([4, 1, 3, 1, 2]))
        .batch()
        .sort()
        .sort()
        .sink(sink_twice);
    run_stream(&mut stream).await.expect("clean completion");

    assert_eq!(once.values(), twice.values());
    assert_eq!(once.values(), vec![Value::list([1, 1, 2, 3, 4])]);
}

#[tokio::test]
async fn grouped_maps_keep_arrival_order_within_groups() {
    let requests = [
        Value::map([("verb", "GET"), ("path", "/")]),
        Value::map([("verb", "PUT"), ("path", "/a")]),
        Value::map([("verb", "GET"), ("path", "/b")]),
    ];

    let sink = SliceCollector::new();
    let handle = sink.handle();
    let mut stream = Stream::new(SliceEmitter::new(requests))
        .batch()
        .group_by_key("verb")
        .sink(sink);

    run_stream(&mut stream).await.expect("clean completion");
    let values = handle.values();
    assert_eq!(values.len(), 1);

    let groups = values[0].as_map().expect("grouping emits a map");
    let gets = groups
        .get(&Value::from("GET"))
        .and_then(Value::as_list)
        .expect("GET group");
    assert_eq!(gets.len(), 2);
    assert_eq!(
        gets[0].as_map().unwrap().get(&Value::from("path")),
        Some(&Value::from("/"))
    );
    assert_eq!(
        gets[1].as_map().unwrap().get(&Value::from("path")),
        Some(&Value::from("/b"))
    );
}

#[tokio::test]
async fn grouping_then_flattening_emits_pairs() {
    let rows = [
        Value::list([Value::from("x"), Value::Int(1)]),
        Value::list([Value::from("y"), Value::Int(2)]),
    ];

    let sink = SliceCollector::new();
    let handle = sink.handle();
    let mut stream = Stream::new(SliceEmitter::new(rows))
        .batch()
        .group_by_pos(1)
        .flatten()
        .sink(sink);

    run_stream(&mut stream).await.expect("clean completion");
    let values = handle.values();
    assert_eq!(values.len(), 2);
    for value in values {
        assert!(matches!(value, Value::Pair(_, _)));
    }
}

#[tokio::test]
async fn sum_by_name_totals_a_record_field() {
    let records = [
        Value::record([("host", Value::from("a")), ("hits", Value::Int(3))]),
        Value::record([("host", Value::from("b")), ("hits", Value::Int(4))]),
    ];

    let sink = SliceCollector::new();
    let handle = sink.handle();
    let mut stream = Stream::new(SliceEmitter::new(records))
        .batch()
        .sum_by_name("hits")
        .sink(sink);

    run_stream(&mut stream).await.expect("clean completion");
    assert_eq!(handle.values(), vec![Value::Float(7.0)]);
}

#[tokio::test]
async fn capped_batch_drops_overflow_and_reports_once() {
    let errors = std::sync::Arc::new(std::sync::atomic::AtomicUsize::new(0));
    let counter = errors.clone();

    let sink = SliceCollector::new();
    let handle = sink.handle();
    let mut stream = Stream::new(SliceEmitter::new(0..10i64))
        .with_error_fn(move |_err| {
            counter.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        })
        .batch_with_cap(4)
        .sink(sink);

    run_stream(&mut stream).await.expect("overflow stays non-fatal");
    assert_eq!(handle.values(), vec![Value::list([0, 1, 2, 3])]);
    assert_eq!(errors.load(std::sync::atomic::Ordering::SeqCst), 1);
}
