//! Pure normalization of raw measurements into [0,1] signals.

/// Assumed maximum relevant terrain slope (degrees).
pub const MAX_SLOPE_DEGREES: f64 = 45.0;
/// Annual rainfall (mm) at which the rainfall signal saturates.
pub const RAINFALL_SATURATION_MM: f64 = 1000.0;

/// Clamp into [0,1]; NaN maps to 0.
pub fn clamp01(x: f64) -> f64 {
    if x.is_nan() {
        0.0
    } else {
        x.clamp(0.0, 1.0)
    }
}

/// Average annual total over the window. Negative readings are treated as
/// missing observations. `None` when nothing valid remains.
pub fn annual_total(values: impl IntoIterator<Item = f64>, years: f64) -> Option<f64> {
    let mut sum = 0.0;
    let mut n = 0usize;
    for v in values.into_iter().filter(|v| v.is_finite() && *v >= 0.0) {
        sum += v;
        n += 1;
    }
    if n == 0 || years <= 0.0 {
        return None;
    }
    Some(sum / years)
}

/// Mean of the non-negative readings, `None` when there are none.
pub fn mean_non_negative(values: impl IntoIterator<Item = f64>) -> Option<f64> {
    let (sum, n) = values
        .into_iter()
        .filter(|v| v.is_finite() && *v >= 0.0)
        .fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    (n > 0).then(|| sum / n as f64)
}

pub fn rainfall_score(annual_mm: f64) -> f64 {
    clamp01(annual_mm / RAINFALL_SATURATION_MM)
}

/// Turbine step function over the long-term mean speed at hub height.
///
/// | m/s      | score |
/// |----------|-------|
/// | < 3      | 0.0   |
/// | 3 .. 5   | 0.2   |
/// | 5 .. 7   | 0.5   |
/// | 7 .. 9   | 0.75  |
/// | 9 ..= 12 | 1.0   |
/// | > 12     | 0.0   |
pub fn wind_score(avg_speed: f64) -> f64 {
    if avg_speed.is_nan() || avg_speed < 3.0 {
        0.0
    } else if avg_speed < 5.0 {
        0.2
    } else if avg_speed < 7.0 {
        0.5
    } else if avg_speed < 9.0 {
        0.75
    } else if avg_speed <= 12.0 {
        1.0
    } else {
        0.0
    }
}

/// Soil texture class index / 100.
pub fn soil_score(texture_class: f64) -> f64 {
    clamp01(texture_class / 100.0)
}

/// Slope degrees / 45.
pub fn slope_score(degrees: f64) -> f64 {
    clamp01(degrees / MAX_SLOPE_DEGREES)
}
