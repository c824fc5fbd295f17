use crate::analysis::Report;
use crate::config::{Config, check_num};
use crate::engine::run_simulation;
use crate::environment::{HUMIDITY_DOMAIN, TEMPERATURE_DOMAIN};
use crate::stats::{Accumulator, AccumulatorReport};
use anyhow::{Context, Result, bail};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::{fs::File, io::BufWriter, path::Path};

/// Largest accepted number of grid points.
const MAX_POINTS: usize = 100_000;

/// Values to sweep. An empty list keeps the base scenario's value.
#[derive(Debug, PartialEq, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SweepGrid {
    pub temperature: Vec<f64>,
    pub humidity: Vec<f64>,
    pub immigration: Vec<f64>,
}

impl SweepGrid {
    pub(crate) fn validate(&self) -> Result<()> {
        for &val in &self.temperature {
            check_num(val, TEMPERATURE_DOMAIN).context("invalid sweep temperature")?;
        }
        for &val in &self.humidity {
            check_num(val, HUMIDITY_DOMAIN).context("invalid sweep humidity")?;
        }
        for &val in &self.immigration {
            check_num(val, 0.0..=1e12).context("invalid sweep immigration")?;
        }
        let n_points = self.temperature.len().max(1)
            * self.humidity.len().max(1)
            * self.immigration.len().max(1);
        if n_points > MAX_POINTS {
            bail!("sweep must have at most {MAX_POINTS} points, but has {n_points}");
        }
        Ok(())
    }

    /// Scenarios of the cartesian product, derived from `base`.
    pub fn scenarios(&self, base: &Config) -> Vec<Config> {
        let or_base = |vals: &[f64], base_val: f64| {
            if vals.is_empty() {
                vec![base_val]
            } else {
                vals.to_vec()
            }
        };
        let temperatures = or_base(&self.temperature, base.environment.temperature);
        let humidities = or_base(&self.humidity, base.environment.humidity);
        let immigrations = or_base(&self.immigration, base.immigration);

        let mut scenarios = Vec::new();
        for &temperature in &temperatures {
            for &humidity in &humidities {
                for &immigration in &immigrations {
                    let mut cfg = base.clone();
                    cfg.environment.temperature = temperature;
                    cfg.environment.humidity = humidity;
                    cfg.immigration = immigration;
                    cfg.sweep = None;
                    scenarios.push(cfg);
                }
            }
        }
        scenarios
    }
}

#[derive(Debug, Serialize)]
pub struct SweepPoint {
    pub temperature: f64,
    pub humidity: f64,
    pub immigration: f64,
    pub env_factor: f64,
    pub report: Report,
}

#[derive(Debug, Serialize)]
pub struct SweepResults {
    pub points: Vec<SweepPoint>,
    /// Final active population across all points.
    pub final_active: AccumulatorReport,
    /// Share of points reaching functional elimination.
    pub collapsed_share: f64,
}

impl SweepResults {
    pub fn save<P: AsRef<Path>>(&self, file: P) -> Result<()> {
        let file = file.as_ref();
        let file = File::create(file).with_context(|| format!("failed to create {file:?}"))?;
        let writer = BufWriter::new(file);
        serde_json::to_writer_pretty(writer, self).context("failed to serialize sweep results")?;
        Ok(())
    }
}

/// Evaluate the sweep grid of `base` in parallel.
///
/// # Errors
/// Returns an error if `base` has no sweep grid or any point fails to run.
pub fn run_sweep(base: &Config) -> Result<SweepResults> {
    let grid = base.sweep.as_ref().context("config has no sweep grid")?;
    let scenarios = grid.scenarios(base);
    log::info!("evaluating {} sweep points", scenarios.len());

    let points = scenarios
        .par_iter()
        .map(|cfg| -> Result<SweepPoint> {
            let series = run_simulation(cfg).with_context(|| {
                format!(
                    "failed to run point (temperature {}, humidity {}, immigration {})",
                    cfg.environment.temperature, cfg.environment.humidity, cfg.immigration
                )
            })?;
            Ok(SweepPoint {
                temperature: cfg.environment.temperature,
                humidity: cfg.environment.humidity,
                immigration: cfg.immigration,
                env_factor: series.env_factor,
                report: Report::new(&series, cfg.output.collapse_fraction),
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let mut acc = Accumulator::new();
    let mut n_collapsed = 0;
    for point in &points {
        acc.add(point.report.final_active);
        if point.report.collapsed() {
            n_collapsed += 1;
        }
    }

    Ok(SweepResults {
        collapsed_share: n_collapsed as f64 / points.len() as f64,
        final_active: acc.report(),
        points,
    })
}
