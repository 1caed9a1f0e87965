use bounded_workpool::{Config, Pool, PoolError};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), PoolError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let pool = Pool::with_config(Config::from_env()?)?;
    let resources: Vec<String> = (0..32).map(|i| format!("resource-{i}")).collect();

    let mut failed = 0;
    pool.start(
        resources,
        |resource: &String| {
            std::thread::sleep(Duration::from_millis(5));
            if resource.ends_with('7') {
                return Err(format!("cannot process {resource}"));
            }
            Ok(())
        },
        |outcome| {
            if let Some(err) = outcome.error() {
                failed += 1;
                tracing::warn!(id = outcome.id(), error = %err, "item failed");
            }
            Ok(())
        },
    )?;

    tracing::info!(workers = pool.workers(), failed, "done");
    Ok(())
}
