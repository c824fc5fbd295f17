use crate::demography::Demography;
use crate::environment::EnvironmentConfig;
use crate::resource::Resource;
use crate::sweep::SweepGrid;
use crate::toxicodynamics::ToxicantConfig;
use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::{fmt::Debug, fs, ops::RangeBounds, path::Path};

/// Longest accepted run [days].
pub const MAX_HORIZON: usize = 100_000;

/// Largest accepted compartment or immigration value.
const MAX_POPULATION: f64 = 1e12;

/// Scenario parameters.
///
/// Loaded from a TOML file and validated before use.
/// See [`Config::from_file`] for loading.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Number of simulated days, day 0 included.
    pub horizon: usize,
    /// Individuals entering the colony from outside each day.
    #[serde(default)]
    pub immigration: f64,
    /// Resolution of simultaneous outflows exceeding a compartment.
    #[serde(default)]
    pub outflow_policy: OutflowPolicy,

    pub environment: EnvironmentConfig,
    pub toxicant: ToxicantConfig,
    pub demography: Demography,
    #[serde(default)]
    pub resource: Resource,
    pub init: InitConfig,
    #[serde(default)]
    pub output: OutputConfig,

    /// Optional parameter grid evaluated by the `sweep` command.
    #[serde(default)]
    pub sweep: Option<SweepGrid>,
}

/// Initial population.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct InitConfig {
    /// Susceptible individuals (adults in the stage-structured variant).
    pub susceptible: f64,
    /// Nymphs, stage-structured variant only.
    #[serde(default)]
    pub nymphs: f64,
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Share of the initial active population below which the colony
    /// counts as functionally eliminated.
    pub collapse_fraction: f64,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            collapse_fraction: 0.05,
        }
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutflowPolicy {
    /// Apply every term, then floor each compartment at zero.
    #[default]
    Clamp,
    /// Scale a compartment's outflows down together so they never exceed it.
    Proportional,
}

impl Config {
    /// Load a [`Config`] from a TOML file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, deserialized,
    /// or if the configuration values are invalid.
    pub fn from_file<P: AsRef<Path>>(file: P) -> Result<Self> {
        let file = file.as_ref();
        let contents =
            fs::read_to_string(file).with_context(|| format!("failed to read {file:?}"))?;
        Self::from_toml(&contents)
    }

    /// Parse and validate a [`Config`] from TOML text.
    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents).context("failed to deserialize config")?;

        config.validate().context("failed to validate config")?;

        Ok(config)
    }

    /// Reject parameters the engine cannot run with.
    pub fn validate(&self) -> Result<()> {
        check_num(self.horizon, 1..=MAX_HORIZON).context("invalid horizon")?;
        check_num(self.immigration, 0.0..=MAX_POPULATION).context("invalid immigration rate")?;

        check_num(self.init.susceptible, 0.0..=MAX_POPULATION)
            .context("invalid initial susceptible population")?;
        check_num(self.init.nymphs, 0.0..=MAX_POPULATION)
            .context("invalid initial nymph population")?;
        if self.init.nymphs > 0.0 && !self.demography.is_stage_structured() {
            bail!("initial nymphs require the stage-structured demography");
        }

        self.environment
            .validate()
            .context("invalid environment")?;
        self.toxicant.validate().context("invalid toxicant")?;
        self.demography.validate().context("invalid demography")?;
        self.resource.validate().context("invalid resource")?;

        check_num(self.output.collapse_fraction, 0.0..=1.0)
            .context("invalid collapse fraction")?;

        if let Some(sweep) = &self.sweep {
            sweep.validate().context("invalid sweep")?;
        }

        Ok(())
    }
}

pub(crate) fn check_num<T, R>(num: T, range: R) -> Result<()>
where
    T: PartialOrd + Debug,
    R: RangeBounds<T> + Debug,
{
    if !range.contains(&num) {
        bail!("number must be in the range {range:?}, but is {num:?}");
    }
    Ok(())
}
