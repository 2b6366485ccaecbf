/// A resonance peak located in a sweep.
///
/// All fields are `None` when no estimate could be made.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PeakEstimate {
    /// Peak frequency.
    pub f0: Option<f64>,
    /// Magnitude at the peak.
    pub gain: Option<f64>,
    /// Index of the largest raw sample.
    pub index: Option<usize>,
}

impl PeakEstimate {
    /// Returns `true` if a peak frequency was found.
    #[must_use]
    pub const fn is_available(&self) -> bool {
        self.f0.is_some()
    }

    const fn raw(index: usize, f: f64, m: f64) -> Self {
        Self {
            f0: Some(f),
            gain: Some(m),
            index: Some(index),
        }
    }
}

/// Index of the first largest finite value.
fn arg_max(values: &[f64]) -> Option<usize> {
    values
        .iter()
        .enumerate()
        .filter(|(_, v)| v.is_finite())
        .fold(None, |acc: Option<(usize, f64)>, (i, &v)| match acc {
            Some((_, best)) if best >= v => acc,
            _ => Some((i, v)),
        })
        .map(|(i, _)| i)
}

/// Vertex `(x, y)` of the parabola through three points, if it opens downwards.
fn parabola_vertex(x: [f64; 3], y: [f64; 3]) -> Option<(f64, f64)> {
    if x.iter().chain(y.iter()).any(|v| !v.is_finite()) {
        return None;
    }

    // Centre on the middle point to keep the system well conditioned.
    let (u0, u2) = (x[0] - x[1], x[2] - x[1]);
    let (d0, d2) = (y[0] - y[1], y[2] - y[1]);
    let det = u0 * u2 * (u0 - u2);
    if det == 0.0 {
        return None;
    }
    let a = (d0 * u2 - d2 * u0) / det;
    let b = (u0 * u0 * d2 - u2 * u2 * d0) / det;
    if !(a < 0.0) {
        return None;
    }

    let vx = x[1] - b / (2.0 * a);
    let vy = y[1] - b * b / (4.0 * a);
    (vx.is_finite() && vy.is_finite()).then_some((vx, vy))
}

/// Locates the peak of a swept response.
///
/// Needs at least three paired samples, otherwise the estimate is empty. The arg-max is
/// refined with a parabola through it and its two neighbours; when the max sits on a
/// boundary, or the parabola is not concave down, or any of the points is not finite,
/// the raw arg-max sample is returned instead.
#[must_use]
pub fn estimate_peak(frequencies: &[f64], magnitudes: &[f64]) -> PeakEstimate {
    if frequencies.len() != magnitudes.len() || frequencies.len() < 3 {
        return PeakEstimate::default();
    }
    let Some(i) = arg_max(magnitudes) else {
        return PeakEstimate::default();
    };

    let raw = PeakEstimate::raw(i, frequencies[i], magnitudes[i]);
    if i == 0 || i == magnitudes.len() - 1 {
        return raw;
    }

    match parabola_vertex(
        [frequencies[i - 1], frequencies[i], frequencies[i + 1]],
        [magnitudes[i - 1], magnitudes[i], magnitudes[i + 1]],
    ) {
        Some((f0, gain)) => PeakEstimate {
            f0: Some(f0),
            gain: Some(gain),
            index: Some(i),
        },
        None => {
            tracing::debug!("Peak refinement rejected at index {}, using raw sample", i);
            raw
        }
    }
}
