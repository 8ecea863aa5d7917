use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::{Duration, Instant};
use tandem::prelude::*;
use tandem::BoxError;

fn pool(threads: usize) -> WorkerPool {
    WorkerPool::with_threads(threads).unwrap()
}

#[test]
fn test_basic_submit() {
    let pool = pool(2);
    let future = pool.submit(|| 1).unwrap();
    assert_eq!(future.get().unwrap(), 1);
    pool.shutdown(ShutdownMode::Graceful);
}

#[test]
fn test_fire_and_forget_tasks_all_run() {
    let pool = pool(2);
    let counter = Arc::new(AtomicUsize::new(0));

    for _ in 0..10 {
        let counter = counter.clone();
        pool.execute(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();
    }

    pool.shutdown(ShutdownMode::Graceful);
    assert_eq!(counter.load(Ordering::SeqCst), 10);
}

#[test]
fn test_concurrency_never_exceeds_pool_size() {
    for threads in 1..=4 {
        let pool = pool(threads);
        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let futures: Vec<_> = (0..24)
            .map(|_| {
                let running = running.clone();
                let peak = peak.clone();
                pool.submit(move || {
                    let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    thread::sleep(Duration::from_millis(5));
                    running.fetch_sub(1, Ordering::SeqCst);
                })
                .unwrap()
            })
            .collect();

        Future::all_of(&futures).get().unwrap();
        assert!(futures.iter().all(|f| f.state() == State::Fulfilled));
        assert!(peak.load(Ordering::SeqCst) <= threads, "threads = {}", threads);
        pool.shutdown(ShutdownMode::Graceful);
    }
}

#[test]
fn test_failure_isolated_from_other_tasks() {
    let config = PoolConfig::builder()
        .num_threads(2)
        .panic_strategy(PanicStrategy::Isolate)
        .build()
        .unwrap();
    let pool = WorkerPool::new(config).unwrap();

    let futures: Vec<_> = (0..10)
        .map(|i| {
            pool.submit(move || {
                if i % 3 == 0 {
                    panic!("task {} failed", i);
                }
                i
            })
            .unwrap()
        })
        .collect();

    Future::all_of(&futures).get().unwrap();
    for (i, future) in futures.iter().enumerate() {
        if i % 3 == 0 {
            assert!(future.is_rejected());
        } else {
            assert_eq!(future.get().unwrap(), i);
        }
    }
    assert_eq!(pool.stats().panicked, 4);
}

#[test]
fn test_temperature_pipeline() {
    let pool = pool(2);
    let seen = Arc::new(Mutex::new(None));

    let slot = seen.clone();
    let done = pool
        .submit(|| 20)
        .unwrap()
        .then_apply(|c| c * 9 / 5 + 32)
        .then_accept(move |f| *slot.lock() = Some(f));

    done.get().unwrap();
    assert_eq!(*seen.lock(), Some(68));
}

#[test]
fn test_exceptionally_default() {
    let pool = pool(1);
    let data = pool
        .submit_fallible(|| -> std::result::Result<i32, BoxError> { Err("getting data failed".into()) })
        .unwrap();

    assert_eq!(data.exceptionally(|_| 1).get().unwrap(), 1);

    let err = data.get().unwrap_err();
    let source = std::error::Error::source(&err).unwrap();
    assert_eq!(source.to_string(), "getting data failed");
}

#[test]
fn test_combine_price_with_rate() {
    let pool = pool(2);

    let price = pool
        .submit(|| "20USD".to_string())
        .unwrap()
        .then_apply(|s| s.replace("USD", "").parse::<i32>().unwrap());
    let rate = pool.submit(|| 0.9).unwrap();

    let total = price.then_combine(&rate, |price, rate| price as f64 * rate);
    assert!((total.get().unwrap() - 18.0).abs() < 1e-9);
}

#[test]
fn test_all_of_then_inspect_each() {
    let pool = pool(3);
    let first = pool.submit(|| 1).unwrap();
    let second = pool
        .submit_fallible(|| -> std::result::Result<i32, BoxError> { Err("second failed".into()) })
        .unwrap();
    let third = pool.submit(|| 3).unwrap();

    let inputs = [first.clone(), second.clone(), third.clone()];
    let report = Future::all_of(&inputs).then_run(move || {
        assert_eq!(first.try_get().unwrap().unwrap(), 1);
        assert!(second.is_rejected());
        assert_eq!(third.try_get().unwrap().unwrap(), 3);
    });

    assert!(report.get_timeout(Duration::from_secs(5)).is_ok());
}

#[test]
fn test_any_of_fast_server_wins() {
    let pool = pool(2);
    let slow = pool
        .submit(|| {
            thread::sleep(Duration::from_secs(3));
            20
        })
        .unwrap();
    let fast = pool.submit(|| 20).unwrap();

    let start = Instant::now();
    let fastest = Future::any_of(&[slow.clone(), fast]);
    assert_eq!(fastest.get().unwrap(), 20);
    assert!(start.elapsed() < Duration::from_secs(1));
    assert!(!slow.is_done());

    pool.shutdown(ShutdownMode::Immediate);
}

#[test]
fn test_async_continuations_use_pool_threads() {
    let config = PoolConfig::builder()
        .num_threads(2)
        .thread_name_prefix("mail")
        .build()
        .unwrap();
    let pool = WorkerPool::new(config).unwrap();

    let source = Future::completed(1);
    let names = Arc::new(Mutex::new(Vec::new()));

    let record = |names: &Arc<Mutex<Vec<String>>>| {
        let names = names.clone();
        move || {
            let name = thread::current().name().unwrap_or("unnamed").to_string();
            names.lock().push(name);
        }
    };

    let a = source.then_run_async(&pool, record(&names));
    let b = {
        let run = record(&names);
        source.then_accept_async(&pool, move |_| run())
    };
    Future::all_of(&[a, b]).get().unwrap();

    let names = names.lock();
    assert_eq!(names.len(), 2);
    assert!(names.iter().all(|n| n.starts_with("mail-")), "{:?}", names);
}

#[test]
fn test_continuation_on_done_future_no_deadlock() {
    let pool = pool(1);
    let source = pool.submit(|| 5).unwrap();
    source.get().unwrap();

    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let chained = source.then_apply(move |v| {
        counter.fetch_add(1, Ordering::SeqCst);
        v * 2
    });

    assert_eq!(chained.get_timeout(Duration::from_secs(1)).unwrap(), 10);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn test_racing_completion_first_writer_wins() {
    let pool = pool(2);
    let future: Future<&str> = Future::pending();
    let barrier = Arc::new(Barrier::new(3));

    let attempts: Vec<_> = ["worker", "timer"]
        .into_iter()
        .map(|who| {
            let future = future.clone();
            let barrier = barrier.clone();
            pool.submit(move || {
                barrier.wait();
                future.complete(who).then_some(who)
            })
            .unwrap()
        })
        .collect();

    barrier.wait();
    let winners: Vec<_> = attempts
        .iter()
        .filter_map(|a| a.get().unwrap())
        .collect();

    assert_eq!(winners.len(), 1);
    assert_eq!(future.get().unwrap(), winners[0]);
}

#[test]
fn test_immediate_shutdown_cancels_dependents() {
    let pool = pool(1);
    let gate = Arc::new(Barrier::new(2));

    let blocker = {
        let gate = gate.clone();
        pool.submit(move || {
            gate.wait();
            thread::sleep(Duration::from_millis(30));
        })
        .unwrap()
    };
    let queued = pool.submit(|| 1).unwrap();
    let dependent = queued.then_apply(|v| v + 1);

    gate.wait();
    assert_eq!(pool.shutdown(ShutdownMode::Immediate), 1);

    assert!(blocker.get().is_ok());
    assert!(matches!(queued.get(), Err(Error::Cancelled)));
    assert!(matches!(dependent.get(), Err(Error::Cancelled)));
    assert!(matches!(pool.submit(|| 2), Err(Error::PoolClosed)));
}

#[test]
fn test_drop_waits_for_queued_work() {
    let counter = Arc::new(AtomicUsize::new(0));
    {
        let pool = pool(2);
        for _ in 0..8 {
            let counter = counter.clone();
            pool.execute(move || {
                thread::sleep(Duration::from_millis(5));
                counter.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();
        }
    }
    assert_eq!(counter.load(Ordering::SeqCst), 8);
}
