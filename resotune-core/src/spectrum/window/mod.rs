mod flat_top;
mod rectangular;

pub use flat_top::FlatTop;
pub use rectangular::Rectangular;

/// Window function applied before the transform.
pub trait Window: std::fmt::Debug + Clone + Copy + PartialEq + Send + Sync {
    /// Get the value of a window of length `len` at given index.
    fn value(&self, idx: usize, len: usize) -> f64;

    /// Get all coefficients of a window of length `len`.
    fn coefficients(&self, len: usize) -> Vec<f64> {
        (0..len).map(|i| self.value(i, len)).collect()
    }
}
