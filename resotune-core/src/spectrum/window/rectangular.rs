use super::Window;

/// Rectangular window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rectangular;

impl Window for Rectangular {
    fn value(&self, _idx: usize, _len: usize) -> f64 {
        1.0
    }
}
