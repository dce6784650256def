//! Jobs that signal completion through streams, driven end to end through the facade.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use orchestrator::{Job, Orchestrator, Readable, StreamError, TaskError, Writable};
use tokio::sync::oneshot;

const HWM: usize = 2;
const CHUNKS: usize = 100;

/// Source producing `CHUNKS` items, counting every call to its read hook.
fn counted_source<T, F>(reads: &Arc<AtomicUsize>, make: F) -> Readable<T>
where
    T: Send + 'static,
    F: Fn(usize) -> T + Send + 'static,
{
    let reads = Arc::clone(reads);
    Readable::from_fn(HWM, move || {
        let n = reads.fetch_add(1, Ordering::SeqCst) + 1;
        (n <= CHUNKS).then(|| make(n))
    })
}

fn byte_chunk(_: usize) -> Vec<u8> {
    b".".to_vec()
}

fn object(n: usize) -> usize {
    n
}

/// Starts `test` and waits for the handler, returning its error and `is_running` as seen from it.
async fn start_and_wait(orch: &Arc<Orchestrator>) -> (Option<TaskError>, bool) {
    let (tx, rx) = oneshot::channel();
    let inner = Arc::clone(orch);
    orch.start("test", move |err| {
        let _ = tx.send((err, inner.is_running()));
    });
    rx.await.expect("handler dropped")
}

#[tokio::test]
async fn consumes_returned_readable_to_relieve_backpressure_object_mode() {
    let orch = Arc::new(Orchestrator::default());
    let reads = Arc::new(AtomicUsize::new(0));
    let r = Arc::clone(&reads);
    orch.add("test", Job::returning(move || counted_source(&r, object)));

    let (err, running) = start_and_wait(&orch).await;
    assert!(reads.load(Ordering::SeqCst) > 99);
    assert!(err.is_none());
    assert!(!running);
}

#[tokio::test]
async fn consumes_returned_readable_to_relieve_backpressure() {
    let orch = Arc::new(Orchestrator::default());
    let reads = Arc::new(AtomicUsize::new(0));
    let r = Arc::clone(&reads);
    orch.add("test", Job::returning(move || counted_source(&r, byte_chunk)));

    let (err, running) = start_and_wait(&orch).await;
    assert!(reads.load(Ordering::SeqCst) > 99);
    assert!(err.is_none());
    assert!(!running);
}

#[tokio::test]
async fn detects_completion_of_returned_writable() {
    let orch = Arc::new(Orchestrator::default());
    let reads = Arc::new(AtomicUsize::new(0));
    let length = Arc::new(AtomicUsize::new(0));
    let (r, l) = (Arc::clone(&reads), Arc::clone(&length));
    orch.add(
        "test",
        Job::returning(move || {
            let rs = counted_source(&r, byte_chunk);
            let l = Arc::clone(&l);
            let ws = Writable::new(HWM, move |chunk: Vec<u8>| {
                l.fetch_add(chunk.len(), Ordering::SeqCst);
                Ok::<_, StreamError>(())
            });
            let _ = rs.pipe(&ws);
            ws
        }),
    );

    let (err, running) = start_and_wait(&orch).await;
    assert!(reads.load(Ordering::SeqCst) > 99);
    assert_eq!(length.load(Ordering::SeqCst), CHUNKS);
    assert!(err.is_none());
    assert!(!running);
}

#[tokio::test]
async fn detects_completion_of_returned_writable_object_mode() {
    let orch = Arc::new(Orchestrator::default());
    let reads = Arc::new(AtomicUsize::new(0));
    let length = Arc::new(AtomicUsize::new(0));
    let (r, l) = (Arc::clone(&reads), Arc::clone(&length));
    orch.add(
        "test",
        Job::returning(move || {
            let rs = counted_source(&r, object);
            let l = Arc::clone(&l);
            let ws = Writable::new(HWM, move |_: usize| {
                l.fetch_add(1, Ordering::SeqCst);
                Ok::<_, StreamError>(())
            });
            let _ = rs.pipe(&ws);
            ws
        }),
    );

    let (err, running) = start_and_wait(&orch).await;
    assert!(reads.load(Ordering::SeqCst) > 99);
    assert_eq!(length.load(Ordering::SeqCst), CHUNKS);
    assert!(err.is_none());
    assert!(!running);
}

#[tokio::test]
async fn handles_intermediate_readable_being_returned() {
    let orch = Arc::new(Orchestrator::default());
    let reads = Arc::new(AtomicUsize::new(0));
    let length = Arc::new(AtomicUsize::new(0));
    let (r, l) = (Arc::clone(&reads), Arc::clone(&length));
    orch.add(
        "test",
        Job::returning(move || {
            let rs = counted_source(&r, byte_chunk);
            let l = Arc::clone(&l);
            let ws = Writable::new(HWM, move |chunk: Vec<u8>| {
                l.fetch_add(chunk.len(), Ordering::SeqCst);
                Ok::<_, StreamError>(())
            });
            let _ = rs.pipe(&ws);
            rs
        }),
    );

    let (err, running) = start_and_wait(&orch).await;
    assert!(reads.load(Ordering::SeqCst) > 99);
    assert_eq!(length.load(Ordering::SeqCst), CHUNKS);
    assert!(err.is_none());
    assert!(!running);
}

#[tokio::test]
async fn handles_intermediate_readable_being_returned_object_mode() {
    let orch = Arc::new(Orchestrator::default());
    let reads = Arc::new(AtomicUsize::new(0));
    let length = Arc::new(AtomicUsize::new(0));
    let (r, l) = (Arc::clone(&reads), Arc::clone(&length));
    orch.add(
        "test",
        Job::returning(move || {
            let rs = counted_source(&r, object);
            let l = Arc::clone(&l);
            let ws = Writable::new(HWM, move |_: usize| {
                l.fetch_add(1, Ordering::SeqCst);
                Ok::<_, StreamError>(())
            });
            let _ = rs.pipe(&ws);
            rs
        }),
    );

    let (err, running) = start_and_wait(&orch).await;
    assert!(reads.load(Ordering::SeqCst) > 99);
    assert_eq!(length.load(Ordering::SeqCst), CHUNKS);
    assert!(err.is_none());
    assert!(!running);
}

#[tokio::test]
async fn failing_stream_reports_its_error() {
    let orch = Arc::new(Orchestrator::default());
    orch.add(
        "test",
        Job::returning(|| {
            let items = futures::stream::iter(vec![Ok(1u8), Ok(2), Err("corrupt chunk")]);
            Readable::from_stream(HWM, items)
        }),
    );

    let (err, running) = start_and_wait(&orch).await;
    match err {
        Some(TaskError::Fail { error }) => assert_eq!(error.to_string(), "corrupt chunk"),
        other => panic!("unexpected outcome: {other:?}"),
    }
    assert!(!running);
}

#[tokio::test]
async fn panicking_source_fails_the_run_instead_of_truncating() {
    let orch = Arc::new(Orchestrator::default());
    let length = Arc::new(AtomicUsize::new(0));
    let l = Arc::clone(&length);
    orch.add(
        "test",
        Job::returning(move || {
            let mut n = 0;
            let rs = Readable::from_fn(HWM, move || {
                n += 1;
                if n == 5 {
                    panic!("read hook failed");
                }
                (n <= CHUNKS).then(|| byte_chunk(n))
            });
            let l = Arc::clone(&l);
            let ws = Writable::new(HWM, move |chunk: Vec<u8>| {
                l.fetch_add(chunk.len(), Ordering::SeqCst);
                Ok::<_, StreamError>(())
            });
            let _ = rs.pipe(&ws);
            rs
        }),
    );

    let (err, running) = start_and_wait(&orch).await;
    match err {
        Some(TaskError::Panicked { info }) => assert_eq!(info, "read hook failed"),
        other => panic!("unexpected outcome: {other:?}"),
    }
    assert!(length.load(Ordering::SeqCst) < CHUNKS);
    assert!(!running);
}
