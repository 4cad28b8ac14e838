//! Daily feature rows for the solar model.

use std::collections::BTreeMap;
use std::f64::consts::PI;

use chrono::{Datelike, NaiveDate};

use crate::signals::SolarDay;

/// Columns: year, month, day_of_year, clear_sky, temperature, day_sin,
/// day_cos, all_sky_7d, all_sky_30d, temperature_7d.
pub const N_FEATURES: usize = 10;

const YEAR: usize = 0;
const MONTH: usize = 1;
const DOY: usize = 2;
const DAY_SIN: usize = 5;
const DAY_COS: usize = 6;

/// Features that are not derived from the calendar. Future rows take these
/// from the historical per-day-of-year means.
const MEASURED: [usize; N_MEASURED] = [3, 4, 7, 8, 9];
const N_MEASURED: usize = 5;

const CYCLE_DAYS: f64 = 365.0;

pub type Features = [f64; N_FEATURES];

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureRow {
    pub date: NaiveDate,
    pub features: Features,
    /// All-sky irradiance for the day.
    pub target: f64,
}

fn calendar(date: NaiveDate, features: &mut Features) {
    let doy = date.ordinal() as f64;
    let angle = 2.0 * PI * doy / CYCLE_DAYS;
    features[YEAR] = date.year() as f64;
    features[MONTH] = date.month() as f64;
    features[DOY] = doy;
    features[DAY_SIN] = angle.sin();
    features[DAY_COS] = angle.cos();
}

/// Trailing mean over the last `window` values, at least one value deep.
fn trailing_means(values: &[f64], window: usize) -> Vec<f64> {
    let mut prefix = Vec::with_capacity(values.len() + 1);
    prefix.push(0.0);
    for v in values {
        prefix.push(prefix[prefix.len() - 1] + v);
    }
    (0..values.len())
        .map(|i| {
            let lo = (i + 1).saturating_sub(window);
            (prefix[i + 1] - prefix[lo]) / (i + 1 - lo) as f64
        })
        .collect()
}

/// Drop non-positive irradiance, sort by date, derive calendar and rolling
/// features.
pub fn featurize(history: &[SolarDay]) -> Vec<FeatureRow> {
    let mut days: Vec<SolarDay> = history
        .iter()
        .filter(|d| d.all_sky > 0.0 && d.all_sky.is_finite())
        .filter(|d| d.clear_sky.is_finite() && d.temperature.is_finite())
        .copied()
        .collect();
    days.sort_by_key(|d| d.date);

    let all_sky: Vec<f64> = days.iter().map(|d| d.all_sky).collect();
    let temperature: Vec<f64> = days.iter().map(|d| d.temperature).collect();
    let all_sky_7 = trailing_means(&all_sky, 7);
    let all_sky_30 = trailing_means(&all_sky, 30);
    let temperature_7 = trailing_means(&temperature, 7);

    days.iter()
        .enumerate()
        .map(|(i, d)| {
            let mut features = [0.0; N_FEATURES];
            calendar(d.date, &mut features);
            features[3] = d.clear_sky;
            features[4] = d.temperature;
            features[7] = all_sky_7[i];
            features[8] = all_sky_30[i];
            features[9] = temperature_7[i];
            FeatureRow {
                date: d.date,
                features,
                target: d.all_sky,
            }
        })
        .collect()
}

/// Rows for every day of the year after the last historical one.
///
/// Returns `None` when `rows` is empty.
pub fn future_year_rows(rows: &[FeatureRow]) -> Option<(i32, Vec<Features>)> {
    let target_year = rows.iter().map(|r| r.date.year()).max()? + 1;

    let mut by_doy: BTreeMap<u32, ([f64; N_MEASURED], usize)> = BTreeMap::new();
    let mut global = [0.0; N_MEASURED];
    for r in rows {
        let entry = by_doy
            .entry(r.date.ordinal())
            .or_insert(([0.0; N_MEASURED], 0));
        for (k, &f) in MEASURED.iter().enumerate() {
            entry.0[k] += r.features[f];
            global[k] += r.features[f];
        }
        entry.1 += 1;
    }
    for g in &mut global {
        *g /= rows.len() as f64;
    }

    let start = NaiveDate::from_ymd_opt(target_year, 1, 1)?;
    let out = start
        .iter_days()
        .take_while(|d| d.year() == target_year)
        .map(|date| {
            let mut features = [0.0; N_FEATURES];
            calendar(date, &mut features);
            let means = match by_doy.get(&date.ordinal()) {
                Some((sums, n)) => sums.map(|s| s / *n as f64),
                None => global,
            };
            for (k, &f) in MEASURED.iter().enumerate() {
                features[f] = means[k];
            }
            features
        })
        .collect();
    Some((target_year, out))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn day(y: i32, m: u32, d: u32, all_sky: f64, temperature: f64) -> SolarDay {
        SolarDay {
            date: NaiveDate::from_ymd_opt(y, m, d).unwrap(),
            all_sky,
            clear_sky: all_sky + 1.0,
            temperature,
        }
    }

    #[test]
    fn drops_non_positive_and_sorts() {
        let rows = featurize(&[
            day(2020, 1, 3, 3.0, 10.0),
            day(2020, 1, 1, 1.0, 10.0),
            day(2020, 1, 2, 0.0, 10.0),
            day(2020, 1, 4, -1.0, 10.0),
        ]);
        assert_eq!(rows.len(), 2);
        assert!(rows[0].date < rows[1].date);
        assert_eq!(rows[0].target, 1.0);
    }

    #[test]
    fn rolling_means_use_min_period_one() {
        let rows = featurize(&[
            day(2020, 1, 1, 2.0, 10.0),
            day(2020, 1, 2, 4.0, 20.0),
            day(2020, 1, 3, 6.0, 30.0),
        ]);
        assert_abs_diff_eq!(rows[0].features[7], 2.0);
        assert_abs_diff_eq!(rows[1].features[7], 3.0);
        assert_abs_diff_eq!(rows[2].features[8], 4.0);
        assert_abs_diff_eq!(rows[2].features[9], 20.0);
    }

    #[test]
    fn trailing_window_slides() {
        let means = trailing_means(&[1.0, 2.0, 3.0, 4.0], 2);
        assert_eq!(means, vec![1.0, 1.5, 2.5, 3.5]);
    }

    #[test]
    fn calendar_encoding() {
        let rows = featurize(&[day(2021, 3, 1, 5.0, 12.0)]);
        let f = rows[0].features;
        assert_eq!(f[YEAR], 2021.0);
        assert_eq!(f[MONTH], 3.0);
        assert_eq!(f[DOY], 60.0);
        assert_abs_diff_eq!(f[DAY_SIN].powi(2) + f[DAY_COS].powi(2), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn future_year_uses_day_of_year_means() {
        let rows = featurize(&[
            day(2019, 1, 1, 2.0, 10.0),
            day(2020, 1, 1, 4.0, 20.0),
        ]);
        let (year, future) = future_year_rows(&rows).unwrap();
        assert_eq!(year, 2021);
        assert_eq!(future.len(), 365);
        // Jan 1 averages both years.
        assert_abs_diff_eq!(future[0][4], 15.0);
        assert_eq!(future[0][YEAR], 2021.0);
        // Unseen days fall back to the global mean.
        assert_abs_diff_eq!(future[100][4], 15.0);
    }

    #[test]
    fn leap_target_year_has_366_days() {
        let rows = featurize(&[day(2023, 6, 1, 5.0, 25.0)]);
        let (year, future) = future_year_rows(&rows).unwrap();
        assert_eq!(year, 2024);
        assert_eq!(future.len(), 366);
    }

    #[test]
    fn no_rows_no_future() {
        assert!(future_year_rows(&[]).is_none());
    }
}
