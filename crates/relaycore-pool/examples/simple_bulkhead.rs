use std::time::Duration;

use relaycore_pool::{Pool, PoolConfig, PoolOutcome};

#[tokio::main]
async fn main() {
    println!("Simple Pool Example\n");

    // A pool that allows at most 5 concurrent tasks.
    let pool = Pool::new(
        PoolConfig::builder()
            .name("api-pool")
            .capacity(5)
            .build()
            .unwrap(),
    );

    for i in 1..=3 {
        match pool
            .submit(async move {
                println!("Processing: Request {i}");
                tokio::time::sleep(Duration::from_millis(100)).await;
                format!("Response to: Request {i}")
            })
            .await
        {
            Ok(task) => match task.await {
                PoolOutcome::Completed(response) => println!("{response}"),
                PoolOutcome::Panicked => println!("Error: task panicked"),
                PoolOutcome::Cancelled => println!("Error: task cancelled"),
            },
            Err(e) => println!("Error: {e}"),
        }
    }

    println!("\nAll requests completed!");
    println!("stats: {:?}", pool.stats());
}
