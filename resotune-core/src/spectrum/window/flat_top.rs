use std::f64::consts::PI;

use super::Window;

const A: [f64; 5] = [
    0.215_578_95,
    0.416_631_58,
    0.277_263_158,
    0.083_578_947,
    0.006_947_368,
];

/// Symmetric 5-term flat-top window.
///
/// Scalloping loss is negligible, so a tone between two bins still reads at its true
/// amplitude.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FlatTop;

impl Window for FlatTop {
    fn value(&self, idx: usize, len: usize) -> f64 {
        if len == 1 {
            return 1.0;
        }
        let x = 2.0 * PI * idx as f64 / (len - 1) as f64;
        A.iter()
            .enumerate()
            .map(|(k, a)| {
                let term = a * (k as f64 * x).cos();
                if k % 2 == 0 {
                    term
                } else {
                    -term
                }
            })
            .sum()
    }
}
