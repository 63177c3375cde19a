//! Utility functions and helpers

use std::time::Instant;

use log::info;

/// Run `f`, logging how long it took under `name`
pub fn measure_time<F, T>(name: &str, f: F) -> T
where
    F: FnOnce() -> T,
{
    let start = Instant::now();
    let result = f();
    let elapsed = start.elapsed();
    info!("{} took {}ms", name, elapsed.as_millis());
    result
}
