use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::join_all;

use slotd::alloc::{Allocator, Denial};
use slotd::model::Ms;
use slotd::reset;
use slotd::schedule::generate;

const H: Ms = 3_600_000; // 1 hour in ms
const M: Ms = 60_000; // 1 minute in ms

fn percentile(sorted: &[Duration], p: f64) -> Duration {
    if sorted.is_empty() {
        return Duration::ZERO;
    }
    let idx = ((sorted.len() as f64) * p / 100.0) as usize;
    sorted[idx.min(sorted.len() - 1)]
}

fn print_latency(label: &str, latencies: &mut [Duration]) {
    latencies.sort();
    let total: Duration = latencies.iter().sum();
    let avg = total / latencies.len() as u32;
    println!("  {label}:");
    println!(
        "    n={}, avg={:.2}us, p50={:.2}us, p95={:.2}us, p99={:.2}us, max={:.2}us",
        latencies.len(),
        avg.as_secs_f64() * 1_000_000.0,
        percentile(latencies, 50.0).as_secs_f64() * 1_000_000.0,
        percentile(latencies, 95.0).as_secs_f64() * 1_000_000.0,
        percentile(latencies, 99.0).as_secs_f64() * 1_000_000.0,
        latencies.last().unwrap().as_secs_f64() * 1_000_000.0,
    );
}

/// Full 10-hour day at 2-minute slots (300 slots), capacity 2. The quota
/// limit is lifted so the scan itself is what gets measured.
fn day_allocator(quota_limit: u32) -> Arc<Allocator> {
    Arc::new(Allocator::new(generate(8 * H, 18 * H, 2 * M), 2, quota_limit))
}

async fn phase1_sequential() {
    println!("phase 1: sequential requests, one client each");
    let alloc = day_allocator(u32::MAX);

    let n = 2000;
    let mut latencies = Vec::with_capacity(n);
    let mut granted = 0usize;
    let start = Instant::now();

    for i in 0..n {
        let t = Instant::now();
        let result = alloc.request_slot(&format!("seq{i}"), 8 * H).await;
        latencies.push(t.elapsed());
        if result.is_ok() {
            granted += 1;
        }
    }

    let elapsed = start.elapsed();
    println!(
        "  {n} requests in {:.2}ms ({:.0} req/s), {granted} granted",
        elapsed.as_secs_f64() * 1000.0,
        n as f64 / elapsed.as_secs_f64()
    );
    // 300 slots x capacity 2.
    assert_eq!(granted, 600);
    print_latency("sequential", &mut latencies);
}

async fn phase2_concurrent() {
    println!("phase 2: concurrent storm, distinct clients");
    let alloc = day_allocator(u32::MAX);

    let tasks_n = 64;
    let per_task = 100;
    let start = Instant::now();

    let tasks: Vec<_> = (0..tasks_n)
        .map(|t| {
            let alloc = alloc.clone();
            tokio::spawn(async move {
                let mut latencies = Vec::with_capacity(per_task);
                let mut granted = 0usize;
                for i in 0..per_task {
                    let at = Instant::now();
                    let result = alloc.request_slot(&format!("storm{t}x{i}"), 8 * H).await;
                    latencies.push(at.elapsed());
                    if result.is_ok() {
                        granted += 1;
                    }
                }
                (latencies, granted)
            })
        })
        .collect();

    let mut latencies = Vec::with_capacity(tasks_n * per_task);
    let mut granted = 0usize;
    for result in join_all(tasks).await {
        let (task_latencies, task_granted) = result.unwrap();
        latencies.extend(task_latencies);
        granted += task_granted;
    }

    let elapsed = start.elapsed();
    println!(
        "  {} requests in {:.2}ms ({:.0} req/s), {granted} granted",
        tasks_n * per_task,
        elapsed.as_secs_f64() * 1000.0,
        (tasks_n * per_task) as f64 / elapsed.as_secs_f64()
    );

    // Capacity must hold no matter the interleaving.
    let occupancy = alloc.occupancy().await;
    assert!(occupancy.iter().all(|&c| c <= 2));
    assert_eq!(granted as u32, occupancy.iter().sum::<u32>());
    assert_eq!(granted, 600);
    print_latency("concurrent", &mut latencies);
}

async fn phase3_spam_with_resets() {
    println!("phase 3: quota-limited spam under a fast reset loop");
    let alloc = day_allocator(2);
    let handle = reset::spawn(alloc.clone(), Duration::from_millis(25));

    let tasks: Vec<_> = (0..16)
        .map(|t| {
            let alloc = alloc.clone();
            tokio::spawn(async move {
                let client = format!("spammer{}", t % 4);
                let mut outcomes = (0usize, 0usize, 0usize); // granted, limited, exhausted
                for _ in 0..250 {
                    match alloc.request_slot(&client, 8 * H).await {
                        Ok(_) => outcomes.0 += 1,
                        Err(Denial::RateLimited { .. }) => outcomes.1 += 1,
                        Err(Denial::Exhausted) => outcomes.2 += 1,
                    }
                    tokio::time::sleep(Duration::from_micros(100)).await;
                }
                outcomes
            })
        })
        .collect();

    let mut granted = 0usize;
    let mut limited = 0usize;
    let mut exhausted = 0usize;
    for result in join_all(tasks).await {
        let (g, l, e) = result.unwrap();
        granted += g;
        limited += l;
        exhausted += e;
    }
    handle.stop().await;

    println!("  granted={granted}, rate_limited={limited}, exhausted={exhausted}");
    assert!(alloc.occupancy().await.iter().all(|&c| c <= 2));
}

#[tokio::main(flavor = "multi_thread")]
async fn main() {
    println!("slotd allocator stress");
    phase1_sequential().await;
    phase2_concurrent().await;
    phase3_spam_with_resets().await;
    println!("done");
}
