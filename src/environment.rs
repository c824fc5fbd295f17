use crate::config::check_num;
use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;

/// Accepted ambient temperatures [°C].
pub const TEMPERATURE_DOMAIN: RangeInclusive<f64> = -20.0..=60.0;
/// Accepted relative humidities [%].
pub const HUMIDITY_DOMAIN: RangeInclusive<f64> = 0.0..=100.0;

// Tent response: optimum and half-width of each triangle.
const TENT_TEMP_OPT: f64 = 30.0;
const TENT_TEMP_WIDTH: f64 = 20.0;
const TENT_HUM_OPT: f64 = 70.0;
const TENT_HUM_WIDTH: f64 = 40.0;

/// Ambient conditions of a scenario.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct EnvironmentConfig {
    /// Ambient temperature [°C].
    pub temperature: f64,
    /// Relative humidity [%].
    pub humidity: f64,
    /// Response family mapping conditions to a reproduction factor.
    #[serde(default)]
    pub response: Response,
}

impl EnvironmentConfig {
    /// Reproduction factor in [0, 1] for these conditions.
    pub fn factor(&self) -> f64 {
        self.response.factor(self.temperature, self.humidity)
    }

    pub(crate) fn validate(&self) -> Result<()> {
        check_num(self.temperature, TEMPERATURE_DOMAIN).context("invalid temperature")?;
        check_num(self.humidity, HUMIDITY_DOMAIN).context("invalid humidity")?;
        self.response
            .validate()
            .context("invalid environmental response")?;
        Ok(())
    }
}

/// Response family.
#[derive(Debug, PartialEq, Clone, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Response {
    /// Product of two triangles peaking at 30 °C and 70 %.
    #[default]
    Tent,
    /// Banded temperature and humidity curves with floors.
    Piecewise(PiecewiseResponse),
}

impl Response {
    pub fn factor(&self, temperature: f64, humidity: f64) -> f64 {
        let factor = match self {
            Response::Tent => tent_factor(temperature, humidity),
            Response::Piecewise(pw) => {
                pw.temperature_factor(temperature) * pw.humidity_factor(humidity)
            }
        };
        factor.clamp(0.0, 1.0)
    }

    fn validate(&self) -> Result<()> {
        match self {
            Response::Tent => Ok(()),
            Response::Piecewise(pw) => pw.validate(),
        }
    }
}

fn tent_factor(temperature: f64, humidity: f64) -> f64 {
    let temp_factor = (1.0 - (temperature - TENT_TEMP_OPT).abs() / TENT_TEMP_WIDTH).max(0.0);
    let hum_factor = (1.0 - (humidity - TENT_HUM_OPT).abs() / TENT_HUM_WIDTH).max(0.0);
    temp_factor * hum_factor
}

/// Piecewise biological response.
///
/// Temperature: zero below `temp_min`, linear ramp up to `temp_opt_low`,
/// plateau until `temp_opt_high`, floored linear decay above it and zero
/// from `temp_max` on. Humidity: `hum_low_floor` below `hum_opt_low`,
/// plateau until `hum_opt_high`, floored linear decay above it.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PiecewiseResponse {
    pub temp_min: f64,
    pub temp_opt_low: f64,
    pub temp_opt_high: f64,
    pub temp_max: f64,
    pub temp_decay_slope: f64,
    pub temp_decay_floor: f64,

    pub hum_opt_low: f64,
    pub hum_opt_high: f64,
    pub hum_low_floor: f64,
    pub hum_decay_slope: f64,
    pub hum_decay_floor: f64,
}

impl Default for PiecewiseResponse {
    fn default() -> Self {
        Self {
            temp_min: 15.0,
            temp_opt_low: 25.0,
            temp_opt_high: 32.0,
            temp_max: 40.0,
            temp_decay_slope: 0.1,
            temp_decay_floor: 0.1,

            hum_opt_low: 40.0,
            hum_opt_high: 80.0,
            hum_low_floor: 0.3,
            hum_decay_slope: 0.02,
            hum_decay_floor: 0.5,
        }
    }
}

impl PiecewiseResponse {
    pub fn temperature_factor(&self, temperature: f64) -> f64 {
        if temperature < self.temp_min || temperature >= self.temp_max {
            0.0
        } else if temperature < self.temp_opt_low {
            (temperature - self.temp_min) / (self.temp_opt_low - self.temp_min)
        } else if temperature <= self.temp_opt_high {
            1.0
        } else {
            let decay = self.temp_decay_slope * (temperature - self.temp_opt_high);
            (1.0 - decay).max(self.temp_decay_floor)
        }
    }

    pub fn humidity_factor(&self, humidity: f64) -> f64 {
        if humidity < self.hum_opt_low {
            self.hum_low_floor
        } else if humidity <= self.hum_opt_high {
            1.0
        } else {
            let decay = self.hum_decay_slope * (humidity - self.hum_opt_high);
            (1.0 - decay).max(self.hum_decay_floor)
        }
    }

    fn validate(&self) -> Result<()> {
        for bound in [self.temp_min, self.temp_opt_low, self.temp_opt_high, self.temp_max] {
            check_num(bound, TEMPERATURE_DOMAIN).context("invalid temperature bound")?;
        }
        for bound in [self.hum_opt_low, self.hum_opt_high] {
            check_num(bound, HUMIDITY_DOMAIN).context("invalid humidity bound")?;
        }
        if !(self.temp_min < self.temp_opt_low
            && self.temp_opt_low <= self.temp_opt_high
            && self.temp_opt_high < self.temp_max)
        {
            bail!(
                "temperature bands must satisfy min < opt_low <= opt_high < max, but are {:?}",
                (
                    self.temp_min,
                    self.temp_opt_low,
                    self.temp_opt_high,
                    self.temp_max
                )
            );
        }
        if self.hum_opt_low > self.hum_opt_high {
            bail!(
                "humidity band must satisfy opt_low <= opt_high, but is {:?}",
                (self.hum_opt_low, self.hum_opt_high)
            );
        }
        check_num(self.temp_decay_slope, 0.0..=10.0).context("invalid temperature decay slope")?;
        check_num(self.temp_decay_floor, 0.0..=1.0).context("invalid temperature decay floor")?;
        check_num(self.hum_low_floor, 0.0..=1.0).context("invalid low humidity floor")?;
        check_num(self.hum_decay_slope, 0.0..=10.0).context("invalid humidity decay slope")?;
        check_num(self.hum_decay_floor, 0.0..=1.0).context("invalid humidity decay floor")?;
        Ok(())
    }
}
