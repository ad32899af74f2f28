//! Rate limiting example with both backends.
//!
//! Run with: cargo run --example ratelimiter_example -p relaycore-ratelimit
//!
//! This example demonstrates:
//! - Fixed window rate limiting (in-process, sharded by key)
//! - Sliding window rate limiting (built on a pluggable sorted-set store)
//! - The difference in boundary behavior between the two

use std::sync::Arc;
use std::time::Duration;

use relaycore_ratelimit::{
    FixedWindowBackend, InMemorySortedSetStore, RateLimiterBackend, SlidingWindowBackend,
};

#[tokio::main]
async fn main() {
    println!("=== Rate Limiter Demo ===\n");

    demo_fixed_window().await;
    println!("\n{}\n", "=".repeat(50));
    demo_sliding_window().await;
    println!("\n{}\n", "=".repeat(50));
    demo_boundary_comparison().await;
}

async fn demo_fixed_window() {
    println!("1. FIXED WINDOW RATE LIMITING");
    println!("   Resets permits at fixed intervals.");
    println!("   Simple and efficient, but allows bursts at boundaries.\n");

    let limiter = FixedWindowBackend::new(5, Duration::from_secs(1));

    println!("   Sending 8 requests (limit: 5 per second)...");
    let mut permitted = 0;
    let mut rejected = 0;
    for i in 1..=8 {
        match limiter.allow("client-1").await {
            Ok(true) => {
                permitted += 1;
                println!("   Request {i}: permitted");
            }
            Ok(false) => {
                rejected += 1;
                println!("   Request {i}: rejected");
            }
            Err(e) => println!("   Request {i}: backend error: {e}"),
        }
    }

    println!("\n   Result: {permitted} permitted, {rejected} rejected");
}

async fn demo_sliding_window() {
    println!("2. SLIDING WINDOW RATE LIMITING");
    println!("   Tracks request timestamps in a sorted-set store.");
    println!("   No boundary bursts, and the store can be shared across instances.\n");

    let limiter = SlidingWindowBackend::new(Arc::new(InMemorySortedSetStore::new()), 5, Duration::from_secs(1));

    println!("   Sending 8 requests (limit: 5 per second)...");
    let mut permitted = 0;
    let mut rejected = 0;
    for i in 1..=8 {
        match limiter.allow("client-2").await {
            Ok(true) => {
                permitted += 1;
                println!("   Request {i}: permitted");
            }
            Ok(false) => {
                rejected += 1;
                println!("   Request {i}: rejected");
            }
            Err(e) => println!("   Request {i}: backend error: {e}"),
        }
    }

    println!("\n   Result: {permitted} permitted, {rejected} rejected");
}

async fn demo_boundary_comparison() {
    println!("3. BOUNDARY BEHAVIOR COMPARISON");
    println!("   Demonstrating how the two backends differ at boundaries.\n");

    println!("   FIXED WINDOW:");
    {
        let limiter = FixedWindowBackend::new(5, Duration::from_millis(200));
        let mut total = 0;
        for _ in 0..5 {
            if limiter.allow("boundary").await.unwrap() {
                total += 1;
            }
        }
        println!("   - Used 5 permits");

        tokio::time::sleep(Duration::from_millis(210)).await;
        println!("   - Waited for window boundary (210ms)");

        for _ in 0..5 {
            if limiter.allow("boundary").await.unwrap() {
                total += 1;
            }
        }
        println!("   - Total requests admitted in ~210ms: {total} (allows boundary burst)");
    }

    println!();

    println!("   SLIDING WINDOW:");
    {
        let limiter = SlidingWindowBackend::new(
            Arc::new(InMemorySortedSetStore::new()),
            5,
            Duration::from_millis(200),
        );
        for _ in 0..5 {
            let _ = limiter.allow("boundary").await;
        }
        println!("   - Used 5 permits");

        tokio::time::sleep(Duration::from_millis(100)).await;
        println!("   - Waited 100ms (half of the 200ms window)");

        let mut additional = 0;
        for _ in 0..5 {
            if limiter.allow("boundary").await.unwrap() {
                additional += 1;
            }
        }
        println!("   - Additional requests permitted: {additional} (prevents burst)");
    }

    println!("\n   Key takeaway:");
    println!("   - Fixed window: simple, O(1) memory per key, allows boundary bursts");
    println!("   - Sliding window: precise, O(n) entries per key, no boundary bursts");
}
