use crate::outputs::Series;
use crate::stats::{EquilibriumReport, equilibrium};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{fs::File, io::BufWriter, path::Path};

#[derive(Debug, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub initial_active: f64,
    /// Active population below which the colony is functionally eliminated.
    pub collapse_threshold: f64,
    /// First day the active population fell below the threshold.
    pub collapse_day: Option<usize>,
    pub final_active: f64,
    pub min_active: f64,
    pub min_active_day: usize,
    pub toxic_deaths: f64,
    /// Active population sustained once the series has settled.
    pub residual: EquilibriumReport,
}

impl Report {
    /// Summarize `series` against a collapse threshold of
    /// `collapse_fraction` times the initial active population.
    pub fn new(series: &Series, collapse_fraction: f64) -> Self {
        let active = &series.active;
        let initial_active = active.first().copied().unwrap_or(0.0);
        let collapse_threshold = collapse_fraction * initial_active;

        let collapse_day = active.iter().position(|&val| val < collapse_threshold);

        let (min_active_day, min_active) = active
            .iter()
            .copied()
            .enumerate()
            .fold((0, f64::INFINITY), |min, (day, val)| {
                if val < min.1 { (day, val) } else { min }
            });

        Self {
            initial_active,
            collapse_threshold,
            collapse_day,
            final_active: active.last().copied().unwrap_or(0.0),
            min_active,
            min_active_day,
            toxic_deaths: series.dead.last().copied().unwrap_or(0.0),
            residual: equilibrium(active),
        }
    }

    pub fn collapsed(&self) -> bool {
        self.collapse_day.is_some()
    }

    pub fn save<P: AsRef<Path>>(&self, file: P) -> Result<()> {
        let file = file.as_ref();
        let file = File::create(file).with_context(|| format!("failed to create {file:?}"))?;
        let writer = BufWriter::new(file);
        serde_json::to_writer_pretty(writer, self).context("failed to serialize report")?;
        Ok(())
    }

    /// Log the headline numbers.
    pub fn log_summary(&self) {
        match self.collapse_day {
            Some(day) => log::info!(
                "active population fell below {:.2} on day {day}",
                self.collapse_threshold
            ),
            None => log::info!(
                "active population never fell below {:.2}",
                self.collapse_threshold
            ),
        }
        log::info!(
            "final active {:.2}, minimum {:.2} on day {}, residual {:.2}",
            self.final_active,
            self.min_active,
            self.min_active_day,
            self.residual.mean
        );
    }
}
