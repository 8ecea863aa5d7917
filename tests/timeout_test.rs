use std::sync::{Arc, Barrier};
use std::thread;
use std::time::{Duration, Instant};
use tandem::prelude::*;

fn long_task(pool: &WorkerPool, delay: Duration, value: i32) -> Future<i32> {
    pool.submit(move || {
        thread::sleep(delay);
        value
    })
    .unwrap()
}

#[test]
fn test_complete_on_timeout_uses_default() {
    let pool = WorkerPool::with_threads(2).unwrap();
    let slow = long_task(&pool, Duration::from_secs(3), 3);

    let start = Instant::now();
    let result = slow.complete_on_timeout(1, Duration::from_secs(1), &pool);
    assert_eq!(result.get().unwrap(), 1);
    assert!(start.elapsed() < Duration::from_millis(2500));

    pool.shutdown(ShutdownMode::Immediate);
    // The slow task still ran to completion; the result keeps the default.
    assert_eq!(slow.get().unwrap(), 3);
    assert_eq!(result.get().unwrap(), 1);
}

#[test]
fn test_complete_on_timeout_forwards_fast_result() {
    let pool = WorkerPool::with_threads(2).unwrap();
    let fast = long_task(&pool, Duration::from_millis(100), 3);

    let result = fast.complete_on_timeout(1, Duration::from_secs(1), &pool);
    assert_eq!(result.get().unwrap(), 3);
}

#[test]
fn test_complete_on_timeout_forwards_rejection() {
    let pool = WorkerPool::with_threads(1).unwrap();
    let failing: Future<i32> = Future::failed(Error::Cancelled);

    let result = failing.complete_on_timeout(1, Duration::from_millis(200), &pool);
    assert!(matches!(result.get(), Err(Error::Cancelled)));
}

#[test]
fn test_or_timeout_rejects_with_timeout() {
    let pool = WorkerPool::with_threads(1).unwrap();
    let slow = long_task(&pool, Duration::from_millis(300), 3);

    let result = slow.or_timeout(Duration::from_millis(20), &pool);
    match result.get() {
        Err(Error::Timeout(after)) => assert_eq!(after, Duration::from_millis(20)),
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn test_get_timeout_then_get() {
    let pool = WorkerPool::with_threads(1).unwrap();
    let slow = long_task(&pool, Duration::from_millis(150), 9);

    assert!(slow.get_timeout(Duration::from_millis(10)).unwrap_err().is_timeout());
    assert_eq!(slow.get_timeout(Duration::from_secs(2)).unwrap(), 9);
}

#[test]
fn test_timeout_race_resolves_once() {
    // Source and deadline land at roughly the same instant; whichever wins,
    // the result must never change afterwards.
    let pool = WorkerPool::with_threads(2).unwrap();

    for _ in 0..20 {
        let source = Future::pending();
        let result = source.complete_on_timeout(-1, Duration::from_millis(5), &pool);

        let gate = Arc::new(Barrier::new(2));
        let producer = {
            let source = source.clone();
            let gate = gate.clone();
            thread::spawn(move || {
                gate.wait();
                thread::sleep(Duration::from_millis(5));
                source.complete(7);
            })
        };
        gate.wait();

        let first = result.get().unwrap();
        producer.join().unwrap();
        thread::sleep(Duration::from_millis(5));

        assert!(first == 7 || first == -1);
        assert_eq!(result.get().unwrap(), first);
    }
}
