use std::fmt::Display;

/// Calls `f` up to `attempts` times and returns the first success or the last error.
///
/// `attempts` of zero is treated as one. Every failed attempt is logged.
pub fn retry<T, E: Display>(
    attempts: usize,
    mut f: impl FnMut() -> Result<T, E>,
) -> Result<T, E> {
    let attempts = attempts.max(1);
    let mut attempt = 1;
    loop {
        match f() {
            Ok(v) => return Ok(v),
            Err(e) if attempt < attempts => {
                tracing::warn!("Attempt {}/{} failed: {}", attempt, attempts, e);
                attempt += 1;
            }
            Err(e) => {
                tracing::warn!("Attempt {}/{} failed: {}", attempt, attempts, e);
                return Err(e);
            }
        }
    }
}
