// src/report.rs
//! Report assembly: the four scorers run concurrently, then the advisor
//! turns the figures into recommendations.

use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use metrics::counter;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::advisor::{recommendations_for, DynRecommender};
use crate::forecast::SolarForecaster;
use crate::location::Location;
use crate::scoring::{
    afforestation, solar, water, windmill, AfforestationReport, Assessment, SolarReport,
    WaterHarvestingReport, WindmillReport,
};
use crate::signals::SignalFetcher;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SustainabilityReport {
    pub solar_potential: Assessment<SolarReport>,
    pub afforestation_feasibility: Assessment<AfforestationReport>,
    pub water_harvesting: Assessment<WaterHarvestingReport>,
    pub windmill_feasibility: Assessment<WindmillReport>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportResponse {
    pub report: SustainabilityReport,
    pub recommendations: String,
}

#[derive(Clone)]
pub struct ReportAssembler {
    fetcher: Arc<SignalFetcher>,
    forecaster: Arc<SolarForecaster>,
    advisor: DynRecommender,
}

impl ReportAssembler {
    pub fn new(
        fetcher: Arc<SignalFetcher>,
        forecaster: Arc<SolarForecaster>,
        advisor: DynRecommender,
    ) -> Self {
        Self {
            fetcher,
            forecaster,
            advisor,
        }
    }

    /// Scorers never fail; only a panicked scorer task is an error here.
    pub async fn report(&self, location: Location) -> Result<SustainabilityReport> {
        let started = Instant::now();

        let solar_task = {
            let fetcher = self.fetcher.clone();
            let forecaster = self.forecaster.clone();
            tokio::spawn(async move { solar::assess(&fetcher, &forecaster, location).await })
        };
        let afforestation_task = {
            let fetcher = self.fetcher.clone();
            tokio::spawn(async move { afforestation::assess(&fetcher, location).await })
        };
        let water_task = {
            let fetcher = self.fetcher.clone();
            tokio::spawn(async move { water::assess(&fetcher, location).await })
        };
        let windmill_task = {
            let fetcher = self.fetcher.clone();
            tokio::spawn(async move { windmill::assess(&fetcher, location).await })
        };

        let (solar, afforestation, water, windmill) =
            tokio::join!(solar_task, afforestation_task, water_task, windmill_task);

        let report = SustainabilityReport {
            solar_potential: solar.context("solar scorer task")?,
            afforestation_feasibility: afforestation.context("afforestation scorer task")?,
            water_harvesting: water.context("water harvesting scorer task")?,
            windmill_feasibility: windmill.context("windmill scorer task")?,
        };
        info!(
            %location,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "report assembled"
        );
        Ok(report)
    }

    /// Report plus recommendation text.
    pub async fn respond(&self, location: Location) -> Result<ReportResponse> {
        counter!("report_requests_total").increment(1);
        let report = self.report(location).await?;
        let recommendations = recommendations_for(self.advisor.as_ref(), &report).await;
        Ok(ReportResponse {
            report,
            recommendations,
        })
    }
}
