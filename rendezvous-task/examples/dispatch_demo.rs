//! Dispatching work to the three queues.
//!
//! Run with:
//! ```bash
//! cargo run -p rendezvous-task --example dispatch_demo
//!
//! # JSON logs, everything at trace
//! cargo run -p rendezvous-task --example dispatch_demo -- json trace
//! ```

use std::env;
use std::error::Error;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use rendezvous_executor::TokioExecutionService;
use rendezvous_runtime::config::ExecutorConfig;
use rendezvous_runtime::logging::{init_logging, LogFormat, LogLevel, LoggingConfig};
use rendezvous_sync::Promise;
use rendezvous_task::{await_value, Dispatcher};
use tracing::info;

fn main() -> Result<(), Box<dyn Error>> {
    let args: Vec<String> = env::args().collect();

    let format = match args.get(1).map(String::as_str) {
        Some("json") => LogFormat::Json,
        Some("compact") => LogFormat::Compact,
        Some("pretty") => LogFormat::Pretty,
        _ => LogFormat::default(),
    };
    let level = match args.get(2).map(String::as_str) {
        Some("trace") => LogLevel::Trace,
        Some("info") => LogLevel::Info,
        _ => LogLevel::Debug,
    };

    init_logging(
        LoggingConfig::default()
            .with_format(format)
            .with_level(level)
            .with_thread_info(true),
    )?;

    let config = ExecutorConfig::builder()
        .worker_threads(4)
        .background_threads(1)
        .thread_name_prefix("demo")
        .build()?;
    let service = Arc::new(TokioExecutionService::from_config(&config)?);
    let dispatcher = Dispatcher::new(service.clone());

    // Plain computation on the shared pool.
    let answer = dispatcher.run(|| 21 * 2);
    info!(answer = *answer.wait()?, "Shared pool");

    // Fan out, then collect.
    let squares: Vec<_> = (1..=5u64).map(|i| dispatcher.run(move || i * i)).collect();
    let total: u64 = squares
        .iter()
        .map(|task| task.wait().copied())
        .sum::<Result<u64, _>>()?;
    info!(total, "Sum of squares");

    // Serial main queue, with a background job feeding it.
    let inner = dispatcher.clone();
    let title = dispatcher.run_on_main_and_await(move || {
        let count = inner.run_in_background(|| {
            thread::sleep(Duration::from_millis(20));
            3
        });
        format!("{} new items", count.wait().copied().unwrap_or_default())
    })?;
    info!(%title, "Main queue");

    // A promise resolved by hand from another thread.
    let promise = Arc::new(Promise::new());
    let producer = promise.clone();
    let worker = thread::spawn(move || {
        thread::sleep(Duration::from_millis(50));
        producer.set(7)
    });
    info!(value = *await_value(&*promise), "Promise");
    worker.join().map_err(|_| "producer thread panicked")??;

    // Failures resolve the task instead of hanging the caller.
    let failed = dispatcher.run(|| -> u32 { panic!("demo failure") });
    if let Err(e) = failed.wait() {
        info!(error = %e, "Panicking work");
    }

    service.shutdown();
    let rejected = dispatcher.run(|| 0);
    if let Err(e) = rejected.wait() {
        info!(error = %e, "After shutdown");
    }

    Ok(())
}
