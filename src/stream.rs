//! User-facing pipeline builder and lifecycle owner.
//!
//! A [`Stream`] chains one source, any number of operators, and one sink.
//! `open` wires the stages source-first, starts each one, and returns a
//! single-shot completion channel that yields the first fatal error or a
//! clean result once the sink drains.

use tokio::sync::oneshot;

use crate::collectors::Collector;
use crate::context::StreamContext;
use crate::emitters::Emitter;
use crate::error::StreamError;
use crate::funcs::{batch, BinFn, Emit, UnaryFn};
use crate::operators::{BatchOperator, BinaryOperator, ExpandOperator, Operator, UnaryOperator};
use crate::value::Value;

pub struct Stream {
    source: Option<Box<dyn Emitter>>,
    ops: Vec<Box<dyn Operator>>,
    sink: Option<Box<dyn Collector>>,
    ctx: StreamContext,
    opened: bool,
}

impl Stream {
    /// Bind the source; operators and the sink are added by chaining.
    pub fn new(source: impl Emitter + 'static) -> Self {
        Self {
            source: Some(Box::new(source)),
            ops: Vec::new(),
            sink: None,
            ctx: StreamContext::new(),
            opened: false,
        }
    }

    /// Replace the shared context. Call before `open`.
    pub fn with_context(mut self, ctx: StreamContext) -> Self {
        self.ctx = ctx;
        self
    }

    pub fn with_log_fn(mut self, f: impl Fn(&str) + Send + Sync + 'static) -> Self {
        self.ctx = self.ctx.with_log_fn(f);
        self
    }

    pub fn with_error_fn(mut self, f: impl Fn(&StreamError) + Send + Sync + 'static) -> Self {
        self.ctx = self.ctx.with_error_fn(f);
        self
    }

    pub fn context(&self) -> &StreamContext {
        &self.ctx
    }

    fn append(mut self, op: impl Operator + 'static) -> Self {
        self.ops.push(Box::new(op));
        self
    }

    /// Append a custom third-party operator.
    pub fn operator(self, op: impl Operator + 'static) -> Self {
        self.append(op)
    }

    /// Apply a transform to each item; the return value decides what is
    /// emitted (a value, a wrapped item, nothing, or an error).
    pub fn process<O, F>(self, f: F) -> Self
    where
        F: FnMut(Value) -> O + Send + 'static,
        O: Emit,
    {
        self.append(UnaryOperator::new(UnaryFn::of(f)))
    }

    /// `process` with the stream context as first parameter.
    pub fn process_ctx<O, F>(self, f: F) -> Self
    where
        F: FnMut(&StreamContext, Value) -> O + Send + 'static,
        O: Emit,
    {
        self.append(UnaryOperator::new(UnaryFn::of_ctx(f)))
    }

    /// `process` fanned out over `concurrency` workers. Output order is
    /// undefined when `concurrency` is above one.
    pub fn process_parallel<O, F>(self, concurrency: usize, f: F) -> Self
    where
        F: FnMut(Value) -> O + Send + 'static,
        O: Emit,
    {
        self.append(UnaryOperator::new(UnaryFn::of(f)).with_concurrency(concurrency))
    }

    /// One-to-one transform; an alias of `process` kept for pipelines that
    /// read better with map/filter vocabulary.
    pub fn map<O, F>(self, f: F) -> Self
    where
        F: FnMut(Value) -> O + Send + 'static,
        O: Emit,
    {
        self.process(f)
    }

    pub fn map_ctx<O, F>(self, f: F) -> Self
    where
        F: FnMut(&StreamContext, Value) -> O + Send + 'static,
        O: Emit,
    {
        self.process_ctx(f)
    }

    /// Keep only items matching the predicate.
    pub fn filter<F>(self, predicate: F) -> Self
    where
        F: FnMut(&Value) -> bool + Send + 'static,
    {
        self.append(UnaryOperator::new(UnaryFn::filtering(predicate)))
    }

    pub fn filter_ctx<F>(self, predicate: F) -> Self
    where
        F: FnMut(&StreamContext, &Value) -> bool + Send + 'static,
    {
        self.append(UnaryOperator::new(UnaryFn::filtering_ctx(predicate)))
    }

    /// Transform each item into a list whose elements are emitted
    /// individually, in order.
    pub fn flat_map<O, F>(self, f: F) -> Self
    where
        F: FnMut(Value) -> O + Send + 'static,
        O: Emit,
    {
        self.append(UnaryOperator::new(UnaryFn::of(f)))
            .append(ExpandOperator::new())
    }

    pub fn flat_map_ctx<O, F>(self, f: F) -> Self
    where
        F: FnMut(&StreamContext, Value) -> O + Send + 'static,
        O: Emit,
    {
        self.append(UnaryOperator::new(UnaryFn::of_ctx(f)))
            .append(ExpandOperator::new())
    }

    /// Unpack composite items: lists element-wise, maps as key/value
    /// pairs, scalars unchanged.
    pub fn flatten(self) -> Self {
        self.append(ExpandOperator::new())
    }

    /// Fold the whole stream against an accumulator; the final state is
    /// the stage's single output item.
    pub fn reduce<O, F>(self, initial_state: impl Into<Value>, f: F) -> Self
    where
        F: FnMut(Value, Value) -> O + Send + 'static,
        O: Emit,
    {
        self.append(BinaryOperator::new(initial_state, BinFn::of(f)))
    }

    pub fn reduce_ctx<O, F>(self, initial_state: impl Into<Value>, f: F) -> Self
    where
        F: FnMut(&StreamContext, Value, Value) -> O + Send + 'static,
        O: Emit,
    {
        self.append(BinaryOperator::new(initial_state, BinFn::of_ctx(f)))
    }

    /// Buffer the entire upstream, releasing it as one list when the
    /// upstream closes. The buffer is unbounded; see `batch_with_cap`.
    pub fn batch(self) -> Self {
        self.append(BatchOperator::new())
    }

    /// `batch` with a bounded buffer; overflow raises a general error and
    /// is dropped.
    pub fn batch_with_cap(self, cap: usize) -> Self {
        self.append(BatchOperator::new().with_cap(cap))
    }

    /// Numeric reduction of a batched list. Chain after `batch`.
    pub fn sum(self) -> Self {
        self.append(UnaryOperator::new(batch::sum()))
    }

    /// Sum the numeric values under `key` across a batched list of maps.
    pub fn sum_by_key(self, key: impl Into<Value>) -> Self {
        self.append(UnaryOperator::new(batch::sum_by_key(key)))
    }

    /// Sum the numeric values of field `name` across a batched list of
    /// records.
    pub fn sum_by_name(self, name: impl Into<String>) -> Self {
        self.append(UnaryOperator::new(batch::sum_by_name(name)))
    }

    /// Sum the numeric values at `pos` across a batched list of lists.
    pub fn sum_by_pos(self, pos: usize) -> Self {
        self.append(UnaryOperator::new(batch::sum_by_pos(pos)))
    }

    /// Stable ascending sort of a batched list of comparable values.
    pub fn sort(self) -> Self {
        self.append(UnaryOperator::new(batch::sort()))
    }

    /// Stable ascending sort of a batched list of maps by the value under
    /// `key`.
    pub fn sort_by_key(self, key: impl Into<Value>) -> Self {
        self.append(UnaryOperator::new(batch::sort_by_key(key)))
    }

    /// Stable ascending sort of a batched list of records by field `name`.
    pub fn sort_by_name(self, name: impl Into<String>) -> Self {
        self.append(UnaryOperator::new(batch::sort_by_name(name)))
    }

    /// Stable ascending sort of a batched list of lists by the element at
    /// `pos`.
    pub fn sort_by_pos(self, pos: usize) -> Self {
        self.append(UnaryOperator::new(batch::sort_by_pos(pos)))
    }

    /// Partition a batched list of maps by the value under `key`.
    pub fn group_by_key(self, key: impl Into<Value>) -> Self {
        self.append(UnaryOperator::new(batch::group_by_key(key)))
    }

    /// Partition a batched list of records by field `name`.
    pub fn group_by_name(self, name: impl Into<String>) -> Self {
        self.append(UnaryOperator::new(batch::group_by_name(name)))
    }

    /// Partition a batched list of lists by the element at `pos`.
    pub fn group_by_pos(self, pos: usize) -> Self {
        self.append(UnaryOperator::new(batch::group_by_pos(pos)))
    }

    /// Fix the terminal sink.
    pub fn sink(mut self, collector: impl Collector + 'static) -> Self {
        self.sink = Some(Box::new(collector));
        self
    }

    /// Start the pipeline. The returned single-shot channel yields the
    /// first fatal error, or a clean result once the sink finishes
    /// draining. A stream opens at most once; later calls yield an error.
    pub fn open(&mut self) -> oneshot::Receiver<Result<(), StreamError>> {
        let (done_tx, done_rx) = oneshot::channel();
        if self.opened {
            let _ = done_tx.send(Err(StreamError::general("stream already opened")));
            return done_rx;
        }
        self.opened = true;

        let Some(source) = self.source.take() else {
            let _ = done_tx.send(Err(StreamError::general("stream has no source")));
            return done_rx;
        };
        let Some(sink) = self.sink.take() else {
            let _ = done_tx.send(Err(StreamError::general("stream has no sink")));
            return done_rx;
        };
        let ops = std::mem::take(&mut self.ops);
        let ctx = self.ctx.clone();

        tokio::spawn(async move {
            let outcome = run_pipeline(source, ops, sink, ctx).await;
            let _ = done_tx.send(outcome);
        });
        done_rx
    }

    /// Open and wait for completion.
    pub async fn run(&mut self) -> Result<(), StreamError> {
        self.open()
            .await
            .unwrap_or_else(|_| Err(StreamError::general("stream completion channel dropped")))
    }
}

/// Wire the chain source-first, start every stage, then fold the sink's
/// completion with the context's fatal-error slot.
async fn run_pipeline(
    mut source: Box<dyn Emitter>,
    mut ops: Vec<Box<dyn Operator>>,
    mut sink: Box<dyn Collector>,
    ctx: StreamContext,
) -> Result<(), StreamError> {
    ctx.log("opening stream");
    tracing::info!(operators = ops.len(), "stream opening");

    let mut upstream = source.open(&ctx).await?;
    for op in ops.iter_mut() {
        op.set_input(upstream);
        op.exec(ctx.clone()).await?;
        upstream = op
            .take_output()
            .ok_or_else(|| StreamError::general("operator provided no output channel"))?;
    }
    sink.set_input(upstream);
    let sink_done = sink.open(ctx.clone()).await;

    let sink_result = sink_done.await.unwrap_or_else(|_| {
        Err(StreamError::general(
            "collector completion channel closed unexpectedly",
        ))
    });

    let outcome = match sink_result {
        Ok(()) => match ctx.take_fatal() {
            Some(fatal) => Err(fatal),
            None if ctx.is_cancelled() => Err(StreamError::cancel("stream cancelled")),
            None => Ok(()),
        },
        Err(err) => Err(err),
    };
    match &outcome {
        Ok(()) => {
            ctx.log("stream completed");
            tracing::info!("stream completed");
        }
        Err(err) => {
            ctx.log(&format!("stream failed: {err}"));
            tracing::info!(error = %err, "stream failed");
        }
    }
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collectors::SliceCollector;
    use crate::emitters::SliceEmitter;
    use tokio::time::{timeout, Duration};

    #[tokio::test]
    async fn open_without_sink_fails() {
        let mut stream = Stream::new(SliceEmitter::new([1, 2]));
        let err = stream.run().await.expect_err("must fail");
        assert!(err.message().contains("no sink"));
    }

    #[tokio::test]
    async fn second_open_fails() {
        let sink = SliceCollector::new();
        let mut stream = Stream::new(SliceEmitter::new([1, 2])).sink(sink);

        timeout(Duration::from_secs(1), stream.run())
            .await
            .expect("first run in time")
            .expect("first run clean");

        let err = stream.run().await.expect_err("second open must fail");
        assert!(err.message().contains("already opened"));
    }
}
