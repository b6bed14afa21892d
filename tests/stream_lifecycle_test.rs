//! Lifecycle behavior: wiring failures, logging callbacks, external
//! cancellation, custom operators, and the alternate sources and sinks.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rillflow::{
    ChannelEmitter, ErrorKind, FuncCollector, NullCollector, Operator, SliceCollector,
    SliceEmitter, Stream, StreamContext, StreamError, StreamItem, Value,
};
use tokio::sync::mpsc;
use tokio::time::{timeout, Duration};

async fn run_stream(stream: &mut Stream) -> Result<(), StreamError> {
    timeout(Duration::from_secs(2), stream.run())
        .await
        .expect("stream completes in time")
}

#[tokio::test]
async fn log_fn_observes_stage_lifecycles() {
    let messages = Arc::new(Mutex::new(Vec::new()));
    let log = messages.clone();

    let sink = NullCollector::new();
    let mut stream = Stream::new(SliceEmitter::new([1, 2, 3]))
        .with_log_fn(move |msg| {
            log.lock().unwrap().push(msg.to_owned());
        })
        .process(|value: Value| value)
        .sink(sink);

    run_stream(&mut stream).await.expect("clean completion");

    let messages = messages.lock().unwrap();
    for expected in [
        "opening stream",
        "unary operator starting",
        "unary operator done",
        "null collector starting",
        "null collector done",
        "stream completed",
    ] {
        assert!(
            messages.iter().any(|msg| msg == expected),
            "missing log message {expected:?} in {messages:?}"
        );
    }
}

#[tokio::test]
async fn channel_emitter_feeds_a_live_stream() {
    let (tx, rx) = mpsc::channel(4);
    let sink = SliceCollector::new();
    let handle = sink.handle();
    let mut stream = Stream::new(ChannelEmitter::new(rx))
        .map(|value: Value| Value::Int(value.as_int().unwrap_or(0) + 100))
        .sink(sink);
    let done = stream.open();

    for n in [1i64, 2, 3] {
        tx.send(Value::Int(n)).await.expect("send");
    }
    drop(tx);

    timeout(Duration::from_secs(2), done)
        .await
        .expect("completes in time")
        .expect("completion delivered")
        .expect("clean completion");
    assert_eq!(
        handle.values(),
        vec![Value::Int(101), Value::Int(102), Value::Int(103)]
    );
}

#[tokio::test]
async fn external_cancellation_resolves_open_with_a_cancel_error() {
    let ctx = StreamContext::new();
    let (tx, rx) = mpsc::channel(4);
    let sink = SliceCollector::new();
    let handle = sink.handle();
    let mut stream = Stream::new(ChannelEmitter::new(rx))
        .with_context(ctx.clone())
        .sink(sink);
    let done = stream.open();

    tx.send(Value::Int(1)).await.expect("send");
    tokio::time::sleep(Duration::from_millis(20)).await;
    ctx.cancel_token().cancel();

    let result = timeout(Duration::from_secs(2), done)
        .await
        .expect("completes in time")
        .expect("completion delivered");
    let err = result.expect_err("cancellation is not clean completion");
    assert_eq!(err.kind(), ErrorKind::Cancel);

    // Whatever arrived before the cancel is a prefix of the input.
    assert!(handle.len() <= 1);
    drop(tx);
}

#[tokio::test]
async fn func_collector_reports_callback_errors() {
    let errors = Arc::new(AtomicUsize::new(0));
    let counter = errors.clone();

    let sink = FuncCollector::new(|item: StreamItem| {
        if item.value.as_int().unwrap_or(0) > 1 {
            Err(StreamError::general("too large").with_item(item))
        } else {
            Ok(())
        }
    });
    let mut stream = Stream::new(SliceEmitter::new([1, 2, 3]))
        .with_error_fn(move |_err| {
            counter.fetch_add(1, Ordering::SeqCst);
        })
        .sink(sink);

    run_stream(&mut stream).await.expect("general errors stay non-fatal");
    assert_eq!(errors.load(Ordering::SeqCst), 2);
}

/// Minimal third-party stage: tags every item with a sequence number.
struct NumberingOperator {
    next: i64,
    input: Option<mpsc::Receiver<StreamItem>>,
    output_tx: Option<mpsc::Sender<StreamItem>>,
    output_rx: Option<mpsc::Receiver<StreamItem>>,
}

impl NumberingOperator {
    fn new() -> Self {
        let (output_tx, output_rx) = mpsc::channel(16);
        Self {
            next: 0,
            input: None,
            output_tx: Some(output_tx),
            output_rx: Some(output_rx),
        }
    }
}

#[async_trait]
impl Operator for NumberingOperator {
    fn set_input(&mut self, input: mpsc::Receiver<StreamItem>) {
        self.input = Some(input);
    }

    fn take_output(&mut self) -> Option<mpsc::Receiver<StreamItem>> {
        self.output_rx.take()
    }

    async fn exec(&mut self, _ctx: StreamContext) -> Result<(), StreamError> {
        let mut input = self
            .input
            .take()
            .ok_or_else(|| StreamError::general("numbering operator has no input channel"))?;
        let output = self
            .output_tx
            .take()
            .ok_or_else(|| StreamError::general("numbering operator already started"))?;
        let mut next = self.next;

        tokio::spawn(async move {
            while let Some(item) = input.recv().await {
                let numbered = Value::pair(next, item.into_value());
                next += 1;
                if output.send(StreamItem::new(numbered)).await.is_err() {
                    break;
                }
            }
        });
        Ok(())
    }
}

#[tokio::test]
async fn custom_operators_slot_into_the_chain() {
    let sink = SliceCollector::new();
    let handle = sink.handle();
    let mut stream = Stream::new(SliceEmitter::new(["a", "b"]))
        .operator(NumberingOperator::new())
        .sink(sink);

    run_stream(&mut stream).await.expect("clean completion");
    assert_eq!(
        handle.values(),
        vec![Value::pair(0, "a"), Value::pair(1, "b")]
    );
}

#[tokio::test]
async fn reopening_a_consumed_stream_yields_a_definite_error() {
    // The first open consumes the source and sink; the second resolves
    // with the already-opened error rather than a wiring error.
    let sink = SliceCollector::new();
    let mut stream = Stream::new(SliceEmitter::new([1])).sink(sink);
    run_stream(&mut stream).await.expect("first run clean");

    let err = run_stream(&mut stream).await.expect_err("second run fails");
    assert!(err.message().contains("already opened"));
}
