// crates/guard/examples/guard_demo.rs
//! Demonstration of keyed circuit breaking

use std::time::Duration;

use tripswitch_guard::{BreakerError, CallOptions, CircuitGuard};

#[tokio::main(flavor = "current_thread")]
async fn main() {
    env_logger::init();

    println!("Keyed Circuit Breaker Demo");
    println!("==========================\n");

    let guard = CircuitGuard::new();
    let options = CallOptions::new()
        .with_threshold(3)
        .with_timeout(Duration::from_secs(60));

    println!("1. Tripping the breaker for key \"payments\"");
    println!("-------------------------------------------");

    for i in 1..=5 {
        let result = guard
            .call("payments", &options, || async {
                Err::<i32, String>("service unavailable".to_string())
            })
            .await;

        match result {
            Ok(value) => println!("  Request {}: ✓ Success: {}", i, value),
            Err(BreakerError::Tripped) => println!("  Request {}: ✗ short-circuited", i),
            Err(e) => println!("  Request {}: ✗ {}", i, e),
        }
    }

    println!("\n2. Other keys are unaffected");
    println!("----------------------------");

    let result = guard
        .call("catalog", &options, || async { Ok::<_, String>(42) })
        .await;
    match result {
        Ok(value) => println!("  \"catalog\": ✓ Success: {}", value),
        Err(e) => println!("  \"catalog\": ✗ {}", e),
    }

    println!("\n3. Rewinding the trip past the cooldown");
    println!("---------------------------------------");

    guard.rewind(&"payments", Duration::from_secs(120)).await;
    println!("  Rewound \"payments\" by 120s...");

    let result = guard
        .call("payments", &options, || async { Ok::<_, String>(7) })
        .await;
    match result {
        Ok(value) => println!("  After cooldown: ✓ Request succeeded: {}", value),
        Err(e) => println!("  After cooldown: ✗ {}", e),
    }

    if let Some(handle) = guard.find(&"payments") {
        if let Ok(breaker) = handle.snapshot().await {
            println!(
                "  Breaker state: failures={}, tripped={}",
                breaker.failure_count(),
                breaker.tripped()
            );
        }
    }
}
