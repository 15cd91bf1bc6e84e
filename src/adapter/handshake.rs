use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread;

use super::{Flow, PushSource, ReadQueue};
use crate::config::Config;
use crate::error::{Error, Result, SourceError};

// ============================================================================
// Rendezvous
// ============================================================================

enum Slot<T> {
    Vacant,
    Item(T),
    Done,
    Failed(Error),
}

struct Exchange<T> {
    slot: Slot<T>,
    // Consumer wants one more element.
    demand: bool,
    // Consumer is gone; the producer must stop.
    cancelled: bool,
}

struct Shared<T> {
    state: Mutex<Exchange<T>>,
    signal: Condvar,
}

impl<T> Shared<T> {
    fn lock(&self) -> MutexGuard<'_, Exchange<T>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn wait<'a>(&self, guard: MutexGuard<'a, Exchange<T>>) -> MutexGuard<'a, Exchange<T>> {
        self.signal.wait(guard).unwrap_or_else(PoisonError::into_inner)
    }

    /// Block the producer until the consumer asks for an element. Returns false
    /// if the consumer went away instead.
    fn await_demand(&self) -> bool {
        let mut state = self.lock();
        while !state.demand && !state.cancelled {
            state = self.wait(state);
        }
        !state.cancelled
    }

    /// Hand one element over, then wait for the next request.
    fn publish(&self, item: T) -> Flow {
        let mut state = self.lock();
        if state.cancelled {
            return Flow::Stop;
        }
        state.slot = Slot::Item(item);
        state.demand = false;
        self.signal.notify_all();
        while !state.demand && !state.cancelled {
            state = self.wait(state);
        }
        if state.cancelled {
            Flow::Stop
        } else {
            Flow::Continue
        }
    }

    fn finish(&self, last: Slot<T>) {
        let mut state = self.lock();
        if !state.cancelled {
            state.slot = last;
        }
        self.signal.notify_all();
    }
}

// ============================================================================
// Queue
// ============================================================================

/// Pull queue over a push-only source.
///
/// The source runs on its own thread and is suspended after every element
/// until the consumer asks for the next one, so at most one element is ever
/// buffered. Dropping the queue cancels the producer.
pub struct HandshakeQueue<T> {
    shared: Arc<Shared<T>>,
    exhausted: bool,
}

impl<T: Send + 'static> HandshakeQueue<T> {
    /// Start the producer thread. The source itself does not run until the
    /// first [`ReadQueue::shift`].
    pub fn spawn<S>(source: S, config: &Config) -> Result<Self>
    where
        S: PushSource<T>,
    {
        let shared = Arc::new(Shared {
            state: Mutex::new(Exchange {
                slot: Slot::Vacant,
                demand: false,
                cancelled: false,
            }),
            signal: Condvar::new(),
        });

        let mut builder = thread::Builder::new().name(config.worker_name.clone());
        if let Some(size) = config.worker_stack_size {
            builder = builder.stack_size(size);
        }

        let worker = Arc::clone(&shared);
        builder.spawn(move || produce(worker, source))?;
        tracing::debug!(worker = %config.worker_name, "spawned push source worker");

        Ok(HandshakeQueue {
            shared,
            exhausted: false,
        })
    }
}

fn produce<T, S>(shared: Arc<Shared<T>>, source: S)
where
    S: PushSource<T>,
{
    if !shared.await_demand() {
        tracing::debug!("push source cancelled before it started");
        return;
    }

    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
        source.traverse(&mut |item| shared.publish(item))
    }));

    let last = match outcome {
        Ok(Ok(())) => Slot::Done,
        Ok(Err(e)) => Slot::Failed(failure(e)),
        Err(payload) => Slot::Failed(Error::ProducerPanicked(panic_message(payload))),
    };
    shared.finish(last);
}

fn failure(e: SourceError) -> Error {
    tracing::debug!(error = %e, "push source failed");
    Error::producer(e)
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    let message = if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    };
    tracing::debug!(%message, "push source panicked");
    message
}

impl<T> ReadQueue for HandshakeQueue<T> {
    type Item = T;

    fn shift(&mut self) -> Result<Option<T>> {
        if self.exhausted {
            return Ok(None);
        }
        let mut state = self.shared.lock();
        state.demand = true;
        self.shared.signal.notify_all();
        loop {
            match std::mem::replace(&mut state.slot, Slot::Vacant) {
                Slot::Vacant => state = self.shared.wait(state),
                Slot::Item(item) => return Ok(Some(item)),
                Slot::Done => {
                    self.exhausted = true;
                    tracing::debug!("push source exhausted");
                    return Ok(None);
                }
                Slot::Failed(e) => {
                    self.exhausted = true;
                    return Err(e);
                }
            }
        }
    }
}

impl<T> Drop for HandshakeQueue<T> {
    fn drop(&mut self) {
        if self.exhausted {
            return;
        }
        let mut state = self.shared.lock();
        state.cancelled = true;
        self.shared.signal.notify_all();
        tracing::debug!("push source consumer dropped; cancelling producer");
    }
}

/// Runs any `Send` iterator as a push source, mainly to move its work off the
/// consuming thread.
pub struct IterSource<I>(pub I);

impl<I> PushSource<I::Item> for IterSource<I>
where
    I: IntoIterator + Send + 'static,
{
    fn traverse(self, visit: &mut dyn FnMut(I::Item) -> Flow) -> std::result::Result<(), SourceError> {
        for item in self.0 {
            if visit(item) == Flow::Stop {
                break;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::source_fn;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::mpsc;
    use std::time::Duration;

    fn spawn<S: PushSource<u32>>(source: S) -> HandshakeQueue<u32> {
        HandshakeQueue::spawn(source, &Config::default()).expect("spawn worker")
    }

    fn drain(q: &mut HandshakeQueue<u32>) -> Vec<u32> {
        let mut out = Vec::new();
        while let Some(v) = q.shift().expect("shift") {
            out.push(v);
        }
        out
    }

    #[test]
    fn test_elements_arrive_in_order() {
        let mut q = spawn(IterSource(vec![3, 1, 4, 1, 5]));
        assert_eq!(drain(&mut q), vec![3, 1, 4, 1, 5]);
        assert_eq!(q.shift().expect("shift"), None);
    }

    #[test]
    fn test_empty_source() {
        let mut q = spawn(IterSource(Vec::new()));
        assert_eq!(q.shift().expect("shift"), None);
        assert_eq!(q.shift().expect("shift"), None);
    }

    #[test]
    fn test_producer_stays_one_element_ahead_at_most() {
        let visits = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&visits);
        let mut q = spawn(source_fn(move |visit: &mut dyn FnMut(u32) -> Flow| {
            for i in 0..100 {
                seen.fetch_add(1, Ordering::SeqCst);
                if visit(i) == Flow::Stop {
                    break;
                }
            }
            Ok(())
        }));

        thread::sleep(Duration::from_millis(20));
        assert_eq!(visits.load(Ordering::SeqCst), 0);

        assert_eq!(q.shift().expect("shift"), Some(0));
        thread::sleep(Duration::from_millis(20));
        assert_eq!(visits.load(Ordering::SeqCst), 1);

        assert_eq!(q.shift().expect("shift"), Some(1));
        thread::sleep(Duration::from_millis(20));
        assert_eq!(visits.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_failure_is_reported_once() {
        let mut q = spawn(source_fn(|visit: &mut dyn FnMut(u32) -> Flow| {
            visit(1);
            Err("sensor offline".into())
        }));
        assert_eq!(q.shift().expect("shift"), Some(1));
        let err = q.shift().expect_err("producer failure");
        assert!(matches!(err, Error::Producer(_)));
        assert!(err.to_string().contains("sensor offline"));
        assert_eq!(q.shift().expect("shift"), None);
    }

    #[test]
    fn test_panic_becomes_error() {
        let mut q = spawn(source_fn(|visit: &mut dyn FnMut(u32) -> Flow| {
            visit(7);
            panic!("producer exploded");
        }));
        assert_eq!(q.shift().expect("shift"), Some(7));
        match q.shift() {
            Err(Error::ProducerPanicked(msg)) => assert!(msg.contains("producer exploded")),
            other => panic!("expected a panic error, got {other:?}"),
        }
    }

    #[test]
    fn test_dropping_consumer_stops_producer() {
        let (done_tx, done_rx) = mpsc::channel();
        let mut q = spawn(source_fn(move |visit: &mut dyn FnMut(u32) -> Flow| {
            let mut sent = 0;
            for i in 0.. {
                if visit(i) == Flow::Stop {
                    break;
                }
                sent += 1;
            }
            let _ = done_tx.send(sent);
            Ok(())
        }));
        assert_eq!(q.shift().expect("shift"), Some(0));
        assert_eq!(q.shift().expect("shift"), Some(1));
        drop(q);
        let sent = done_rx
            .recv_timeout(Duration::from_secs(5))
            .expect("producer should stop after cancellation");
        assert_eq!(sent, 1);
    }

    #[test]
    fn test_dropping_before_first_pull_never_runs_source() {
        let started = Arc::new(AtomicUsize::new(0));
        let flag = Arc::clone(&started);
        let q = spawn(source_fn(move |_visit: &mut dyn FnMut(u32) -> Flow| {
            flag.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }));
        drop(q);
        thread::sleep(Duration::from_millis(20));
        assert_eq!(started.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_worker_uses_configured_name() {
        let config = Config {
            worker_name: "sensor-feed".to_string(),
            ..Config::default()
        };
        let mut q = HandshakeQueue::spawn(
            source_fn(|visit: &mut dyn FnMut(String) -> Flow| {
                visit(thread::current().name().unwrap_or_default().to_string());
                Ok(())
            }),
            &config,
        )
        .expect("spawn worker");
        assert_eq!(q.shift().expect("shift").as_deref(), Some("sensor-feed"));
    }
}
