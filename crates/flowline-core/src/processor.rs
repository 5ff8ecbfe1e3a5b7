//! The generic typed-consumer contract and its composable combinators.

use std::sync::Mutex;
use std::time::Instant;

use async_trait::async_trait;
use tracing::{debug, error, instrument};

use crate::error::PipelineResult;

/// A consumer of decoded values of type `T`.
#[async_trait]
pub trait Processor: Send + Sync + 'static {
    type Input: Send + Sync + 'static;

    async fn process(&self, value: Self::Input) -> PipelineResult<()>;
}

/// Runs processors in order, stopping at (and returning) the first failure.
pub struct Chain<T> {
    processors: Vec<Box<dyn Processor<Input = T>>>,
}

impl<T: Send + Sync + 'static> Chain<T> {
    pub fn new(processors: Vec<Box<dyn Processor<Input = T>>>) -> Self {
        Self { processors }
    }
}

#[async_trait]
impl<T: Clone + Send + Sync + 'static> Processor for Chain<T> {
    type Input = T;

    async fn process(&self, value: T) -> PipelineResult<()> {
        for processor in &self.processors {
            processor.process(value.clone()).await?;
        }
        Ok(())
    }
}

/// Runs `inner` only when `predicate` returns true; otherwise succeeds
/// without invoking it.
pub struct Conditional<T, F> {
    inner: Box<dyn Processor<Input = T>>,
    predicate: F,
}

impl<T, F> Conditional<T, F>
where
    T: Send + Sync + 'static,
    F: Fn(&T) -> bool + Send + Sync + 'static,
{
    pub fn new(inner: Box<dyn Processor<Input = T>>, predicate: F) -> Self {
        Self { inner, predicate }
    }
}

#[async_trait]
impl<T, F> Processor for Conditional<T, F>
where
    T: Send + Sync + 'static,
    F: Fn(&T) -> bool + Send + Sync + 'static,
{
    type Input = T;

    async fn process(&self, value: T) -> PipelineResult<()> {
        if (self.predicate)(&value) {
            self.inner.process(value).await
        } else {
            Ok(())
        }
    }
}

/// Buffers values and invokes `inner` with the whole buffer once it reaches
/// `capacity`, or when [`Batch::flush`] is called explicitly. The buffer
/// lives inside the combinator; callers are responsible for flushing it on
/// shutdown.
pub struct Batch<T> {
    inner: Box<dyn Processor<Input = Vec<T>>>,
    capacity: usize,
    buffer: Mutex<Vec<T>>,
}

impl<T: Send + Sync + 'static> Batch<T> {
    pub fn new(inner: Box<dyn Processor<Input = Vec<T>>>, capacity: usize) -> Self {
        Self { inner, capacity, buffer: Mutex::new(Vec::with_capacity(capacity)) }
    }

    /// Forces the inner processor to run with whatever is currently
    /// buffered, regardless of fill level, then clears the buffer.
    pub async fn flush(&self) -> PipelineResult<()> {
        let pending = {
            let mut buffer = self.buffer.lock().unwrap();
            if buffer.is_empty() {
                return Ok(());
            }
            std::mem::take(&mut *buffer)
        };
        self.inner.process(pending).await
    }
}

#[async_trait]
impl<T: Send + Sync + 'static> Processor for Batch<T> {
    type Input = T;

    async fn process(&self, value: T) -> PipelineResult<()> {
        let ready = {
            let mut buffer = self.buffer.lock().unwrap();
            buffer.push(value);
            if buffer.len() >= self.capacity {
                Some(std::mem::take(&mut *buffer))
            } else {
                None
            }
        };
        if let Some(batch) = ready {
            self.inner.process(batch).await
        } else {
            Ok(())
        }
    }
}

/// Runs `inner`; on failure, hands the error to `handler`, which may
/// translate it into a different error, suppress it (`Ok`), or propagate it
/// unchanged.
pub struct ErrorHandler<T, H> {
    inner: Box<dyn Processor<Input = T>>,
    handler: H,
}

impl<T, H> ErrorHandler<T, H>
where
    T: Send + Sync + 'static,
    H: Fn(crate::error::Error) -> PipelineResult<()> + Send + Sync + 'static,
{
    pub fn new(inner: Box<dyn Processor<Input = T>>, handler: H) -> Self {
        Self { inner, handler }
    }
}

#[async_trait]
impl<T, H> Processor for ErrorHandler<T, H>
where
    T: Send + Sync + 'static,
    H: Fn(crate::error::Error) -> PipelineResult<()> + Send + Sync + 'static,
{
    type Input = T;

    #[instrument(skip_all)]
    async fn process(&self, value: T) -> PipelineResult<()> {
        match self.inner.process(value).await {
            Ok(()) => Ok(()),
            Err(err) => {
                error!(error = %err, "processor failed, handing off to error handler");
                (self.handler)(err)
            }
        }
    }
}

/// Wraps `inner`, emitting a `tracing::debug!` event per invocation with the
/// elapsed time and outcome. Not load-bearing; a thin convenience for
/// demos and tests that want visibility into a pipe without writing a
/// bespoke processor.
pub struct LoggingProcessor<P> {
    name: &'static str,
    inner: P,
}

impl<P> LoggingProcessor<P> {
    pub fn new(name: &'static str, inner: P) -> Self {
        Self { name, inner }
    }
}

#[async_trait]
impl<P: Processor> Processor for LoggingProcessor<P> {
    type Input = P::Input;

    async fn process(&self, value: Self::Input) -> PipelineResult<()> {
        let start = Instant::now();
        let result = self.inner.process(value).await;
        let elapsed = start.elapsed();
        match &result {
            Ok(()) => debug!(processor = self.name, elapsed_ms = elapsed.as_millis() as u64, outcome = "success", "processor invoked"),
            Err(err) => debug!(processor = self.name, elapsed_ms = elapsed.as_millis() as u64, outcome = "failure", error = %err, "processor invoked"),
        }
        result
    }
}

/// Always succeeds without doing anything.
pub struct Noop<T>(std::marker::PhantomData<fn(T)>);

impl<T> Noop<T> {
    pub fn new() -> Self {
        Self(std::marker::PhantomData)
    }
}

impl<T> Default for Noop<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<T: Send + Sync + 'static> Processor for Noop<T> {
    type Input = T;

    async fn process(&self, _value: T) -> PipelineResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use super::*;
    use crate::error::Error;

    struct Recorder(Arc<AtomicUsize>);

    #[async_trait]
    impl Processor for Recorder {
        type Input = u32;

        async fn process(&self, value: u32) -> PipelineResult<()> {
            self.0.fetch_add(value as usize, Ordering::SeqCst);
            Ok(())
        }
    }

    struct AlwaysFails;

    #[async_trait]
    impl Processor for AlwaysFails {
        type Input = u32;

        async fn process(&self, _value: u32) -> PipelineResult<()> {
            Err(Error::Incomplete("always fails"))
        }
    }

    #[tokio::test]
    async fn chain_stops_at_first_failure() {
        let total = Arc::new(AtomicUsize::new(0));
        let chain: Chain<u32> = Chain::new(vec![
            Box::new(Recorder(total.clone())),
            Box::new(AlwaysFails),
            Box::new(Recorder(total.clone())),
        ]);
        assert!(chain.process(5).await.is_err());
        assert_eq!(total.load(Ordering::SeqCst), 5);
    }

    #[tokio::test]
    async fn conditional_skips_when_predicate_false() {
        let total = Arc::new(AtomicUsize::new(0));
        let cond = Conditional::new(Box::new(Recorder(total.clone())), |v: &u32| *v > 10);
        cond.process(3).await.unwrap();
        assert_eq!(total.load(Ordering::SeqCst), 0);
        cond.process(20).await.unwrap();
        assert_eq!(total.load(Ordering::SeqCst), 20);
    }

    struct BatchRecorder(Arc<std::sync::Mutex<Vec<Vec<u32>>>>);

    #[async_trait]
    impl Processor for BatchRecorder {
        type Input = Vec<u32>;

        async fn process(&self, value: Vec<u32>) -> PipelineResult<()> {
            self.0.lock().unwrap().push(value);
            Ok(())
        }
    }

    #[tokio::test]
    async fn batch_flushes_automatically_at_capacity() {
        let calls = Arc::new(std::sync::Mutex::new(Vec::new()));
        let batch = Batch::new(Box::new(BatchRecorder(calls.clone())), 2);
        batch.process(1).await.unwrap();
        assert!(calls.lock().unwrap().is_empty());
        batch.process(2).await.unwrap();
        assert_eq!(*calls.lock().unwrap(), vec![vec![1, 2]]);
    }

    #[tokio::test]
    async fn batch_explicit_flush_forces_a_partial_call() {
        let calls = Arc::new(std::sync::Mutex::new(Vec::new()));
        let batch = Batch::new(Box::new(BatchRecorder(calls.clone())), 10);
        batch.process(1).await.unwrap();
        batch.flush().await.unwrap();
        assert_eq!(*calls.lock().unwrap(), vec![vec![1]]);
        // A second flush with nothing buffered is a no-op.
        batch.flush().await.unwrap();
        assert_eq!(calls.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn error_handler_can_suppress_a_failure() {
        let handled = ErrorHandler::new(Box::new(AlwaysFails), |_err| Ok(()));
        assert!(handled.process(1).await.is_ok());
    }

    #[tokio::test]
    async fn noop_always_succeeds() {
        let noop: Noop<u32> = Noop::new();
        assert!(noop.process(1u32).await.is_ok());
    }

    #[tokio::test]
    async fn logging_processor_passes_through_success_and_failure() {
        let total = Arc::new(AtomicUsize::new(0));
        let logging = LoggingProcessor::new("recorder", Recorder(total.clone()));
        logging.process(5).await.unwrap();
        assert_eq!(total.load(Ordering::SeqCst), 5);

        let logging = LoggingProcessor::new("always-fails", AlwaysFails);
        assert!(logging.process(1).await.is_err());
    }
}
