//! Duration measurement for log fields.

use std::time::Instant;

/// Run `f` and return its result together with the elapsed wall time in
/// fractional seconds, ready to attach to a log line.
pub fn timed<T>(f: impl FnOnce() -> T) -> (T, f64) {
    let started = Instant::now();
    let value = f();
    (value, started.elapsed().as_secs_f64())
}

/// Run `f` and emit its duration as a structured record under `name`.
pub fn log_duration<T>(name: &str, f: impl FnOnce() -> T) -> T {
    let (value, duration) = timed(f);
    tracing::info!(name, duration, "timed section");
    value
}

/// Stopwatch for measuring a section that does not fit a closure, such as
/// an awaited request.
#[derive(Debug)]
pub struct Stopwatch {
    started: Instant,
}

impl Stopwatch {
    pub fn start() -> Self {
        Self {
            started: Instant::now(),
        }
    }

    /// Elapsed wall time in fractional seconds.
    pub fn elapsed_secs(&self) -> f64 {
        self.started.elapsed().as_secs_f64()
    }
}
