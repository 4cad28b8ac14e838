// src/forecast/mod.rs
//! Solar forecaster: featurize the daily history, train a boosted model per
//! request, predict every day of the following calendar year and average.

pub mod features;
pub mod gbm;

use std::time::Instant;

use anyhow::{Context, Result};
use metrics::histogram;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::config::ForecastSettings;
use crate::location::Location;
use crate::signals::{SignalFetcher, SignalOutcome, SolarDay};

pub use features::{featurize, future_year_rows, FeatureRow};
pub use gbm::{BoostingParams, GradientBoostedRegressor};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YearlyForecast {
    pub year: i32,
    /// Mean predicted all-sky irradiance (kWh/m²/day), floored at 0.
    pub yearly_average: f64,
    pub days: usize,
    pub training_rows: usize,
    pub trees: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SolarForecast {
    Forecast(YearlyForecast),
    NoData { reason: String },
    Failed { reason: String },
}

impl SolarForecast {
    fn no_data(reason: impl Into<String>) -> Self {
        SolarForecast::NoData {
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SolarForecaster {
    params: BoostingParams,
}

impl SolarForecaster {
    pub fn new(settings: &ForecastSettings) -> Self {
        Self {
            params: BoostingParams::from(settings),
        }
    }

    /// Synchronous core, CPU-bound.
    pub fn forecast_from_history(&self, history: &[SolarDay]) -> Result<SolarForecast> {
        let rows = featurize(history);
        let Some((year, future)) = future_year_rows(&rows) else {
            return Ok(SolarForecast::no_data("no usable solar history"));
        };

        let x: Vec<_> = rows.iter().map(|r| r.features).collect();
        let y: Vec<f64> = rows.iter().map(|r| r.target).collect();
        let model =
            GradientBoostedRegressor::fit(&x, &y, &self.params).context("training solar model")?;

        let predictions = model.predict_many(&future);
        let mean = predictions.iter().sum::<f64>() / predictions.len().max(1) as f64;

        Ok(SolarForecast::Forecast(YearlyForecast {
            year,
            yearly_average: mean.max(0.0),
            days: predictions.len(),
            training_rows: rows.len(),
            trees: model.n_trees(),
        }))
    }

    /// Fetch the cached history, then train and predict on the blocking pool.
    pub async fn forecast(&self, fetcher: &SignalFetcher, location: Location) -> SolarForecast {
        let history = match fetcher.solar_history(location).await {
            SignalOutcome::Value(h) => h,
            SignalOutcome::NoData => return SolarForecast::no_data("no solar history"),
            SignalOutcome::Failed(reason) => return SolarForecast::Failed { reason },
        };

        let forecaster = self.clone();
        let started = Instant::now();
        let joined =
            tokio::task::spawn_blocking(move || forecaster.forecast_from_history(&history)).await;
        let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
        histogram!("forecast_train_ms").record(elapsed_ms);

        match joined {
            Ok(Ok(forecast)) => {
                if let SolarForecast::Forecast(f) = &forecast {
                    info!(
                        %location,
                        year = f.year,
                        yearly_average = f.yearly_average,
                        trees = f.trees,
                        elapsed_ms,
                        "solar forecast"
                    );
                }
                forecast
            }
            Ok(Err(e)) => {
                warn!(%location, error = %format!("{e:#}"), "solar forecast failed");
                SolarForecast::Failed {
                    reason: format!("{e:#}"),
                }
            }
            Err(join) => {
                error!(%location, error = %join, "solar forecast task panicked");
                SolarForecast::Failed {
                    reason: "forecast task failed".to_string(),
                }
            }
        }
    }
}
