#[cfg(test)]
mod tests {
    use bounded_workpool::{
        observer::Silent,
        pool::{Config, Pool},
    };
    use std::{
        future::Future,
        sync::{
            atomic::{AtomicUsize, Ordering},
            Arc,
        },
        thread,
        time::{Duration, Instant},
    };

    fn measure<T>(name: &str, f: impl FnOnce() -> T) -> (T, Duration) {
        let start = Instant::now();
        let result = f();
        let elapsed = start.elapsed();
        println!("✓ {}: {:?}", name, elapsed);
        (result, elapsed)
    }

    async fn measure_async<F, Fut, T>(name: &str, f: F) -> (T, Duration)
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        let start = Instant::now();
        let result = f().await;
        let elapsed = start.elapsed();
        println!("✓ {}: {:?}", name, elapsed);
        (result, elapsed)
    }

    fn pool(workers: usize) -> Pool {
        Pool::with_config(Config::default().with_workers(workers))
            .unwrap()
            .with_observer(Arc::new(Silent))
    }

    #[test]
    fn load_test_1_many_fast_items() {
        println!("\n=== LOAD TEST 1: 100k trivial items on 8 workers ===");
        let pool = pool(8);
        let mut seen = vec![false; 100_000];

        let (res, _) = measure("100k items", || {
            pool.start(
                0..100_000usize,
                |_: &usize| Ok::<(), String>(()),
                |outcome| {
                    assert!(!seen[outcome.id()], "duplicate id {}", outcome.id());
                    seen[outcome.id()] = true;
                    Ok(())
                },
            )
        });

        res.unwrap();
        assert!(seen.iter().all(|s| *s));
    }

    #[test]
    fn load_test_2_sleeping_items_run_in_parallel() {
        println!("\n=== LOAD TEST 2: 64 items @ 10ms on 8 workers ===");
        let pool = pool(8);
        let delivered = AtomicUsize::new(0);

        let (res, elapsed) = measure("64 items @ 10ms", || {
            pool.start(
                0..64,
                |_: &i32| {
                    thread::sleep(Duration::from_millis(10));
                    Ok::<(), String>(())
                },
                |_| {
                    delivered.fetch_add(1, Ordering::Relaxed);
                    Ok(())
                },
            )
        });

        res.unwrap();
        assert_eq!(delivered.load(Ordering::Relaxed), 64);
        // Sequential processing would take at least 640ms.
        assert!(elapsed < Duration::from_millis(640), "took {elapsed:?}");
    }

    #[test]
    fn load_test_3_mixed_failures() {
        println!("\n=== LOAD TEST 3: 20k items, every third fails ===");
        let pool = pool(num_cpus::get());
        let mut failed = 0;
        let mut ok = 0;

        let (res, _) = measure("20k mixed items", || {
            pool.start(
                0..20_000u64,
                |n: &u64| {
                    if n % 3 == 0 {
                        Err(format!("item {n} rejected"))
                    } else {
                        Ok(())
                    }
                },
                |outcome| {
                    match outcome.error() {
                        Some(err) => {
                            assert_eq!(err, &format!("item {} rejected", outcome.resource()));
                            failed += 1;
                        }
                        None => ok += 1,
                    }
                    Ok(())
                },
            )
        });

        res.unwrap();
        println!("  ok: {ok}, failed: {failed}");
        assert_eq!(failed, 6_667);
        assert_eq!(ok, 13_333);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn load_test_4_async_many_items() {
        println!("\n=== LOAD TEST 4: 20k items through the async pool ===");
        let pool = pool(16);
        let delivered = Arc::new(AtomicUsize::new(0));
        let counter = delivered.clone();

        let (res, _) = measure_async("20k async items", || {
            pool.start_async(
                0..20_000u32,
                |n: &u32| {
                    std::hint::black_box(n.wrapping_mul(31));
                    Ok::<(), String>(())
                },
                move |_| {
                    counter.fetch_add(1, Ordering::Relaxed);
                    Ok(())
                },
            )
        })
        .await;

        res.unwrap();
        assert_eq!(delivered.load(Ordering::Relaxed), 20_000);
        assert!(pool.is_completed());
    }
}
