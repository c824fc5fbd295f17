//! Delayed-action oral toxicant.

use crate::config::check_num;
use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

/// Longest accepted delay between uptake and death [days].
pub const MAX_DELAY: usize = 365;

/// Toxicant parameters.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct ToxicantConfig {
    /// Days between uptake and feeding cessation (`K1`).
    pub stop_feeding_delay: usize,
    /// Days between uptake and death (`K2`), strictly greater than `K1`.
    pub lethal_delay: usize,
    /// Daily uptake policy.
    pub uptake: Uptake,
}

/// Flows out of the intoxicated compartments on one day.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct DelayedFlows {
    /// Early-intoxicated individuals that stop feeding.
    pub to_late: f64,
    /// Late-intoxicated individuals that die.
    pub toxic_deaths: f64,
}

impl ToxicantConfig {
    /// Flows released on `day` by uptake recorded `K1` and `K2` days earlier.
    pub fn delayed_flows(&self, lag: &LagBuffer, day: usize) -> DelayedFlows {
        DelayedFlows {
            to_late: lag.delayed(day, self.stop_feeding_delay),
            toxic_deaths: lag.delayed(day, self.lethal_delay),
        }
    }

    pub(crate) fn validate(&self) -> Result<()> {
        check_num(self.stop_feeding_delay, 1..MAX_DELAY).context("invalid stop-feeding delay")?;
        check_num(self.lethal_delay, 2..=MAX_DELAY).context("invalid lethal delay")?;
        if self.lethal_delay <= self.stop_feeding_delay {
            bail!(
                "lethal delay must exceed stop-feeding delay, but {} <= {}",
                self.lethal_delay,
                self.stop_feeding_delay
            );
        }
        self.uptake.validate().context("invalid uptake policy")?;
        Ok(())
    }
}

/// How much of the colony ingests toxicant each day.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Uptake {
    /// A constant fraction of the feeding population ingests bait daily.
    Palatability { fraction: f64 },
    /// Contact limited by colony size and ramped by prodrug activation.
    AccessLimited(AccessLimited),
}

impl Uptake {
    /// Per-capita uptake fraction on `day` for a feeding population of size `colony`.
    pub fn daily_fraction(&self, colony: f64, day: usize) -> f64 {
        match self {
            Uptake::Palatability { fraction } => *fraction,
            Uptake::AccessLimited(access) => {
                // min(a * S, S) == min(a, 1) * S for a non-negative colony.
                access.access_fraction(colony).min(1.0)
                    * access.intensity
                    * access.activation.level(day)
            }
        }
    }

    fn validate(&self) -> Result<()> {
        match self {
            Uptake::Palatability { fraction } => {
                check_num(*fraction, 0.0..=1.0).context("invalid palatability fraction")
            }
            Uptake::AccessLimited(access) => access.validate(),
        }
    }
}

/// Access-limited uptake parameters.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct AccessLimited {
    /// Treatment intensity scaling every contact.
    pub intensity: f64,
    /// Access fraction by colony size, ordered by increasing `below`.
    pub steps: Vec<AccessStep>,
    /// Access fraction for colonies at or above the last step.
    pub floor: f64,
    #[serde(default)]
    pub activation: Activation,
}

/// Access fraction applied to colonies smaller than `below`.
#[derive(Debug, PartialEq, Clone, Copy, Serialize, Deserialize)]
pub struct AccessStep {
    pub below: f64,
    pub fraction: f64,
}

impl AccessLimited {
    /// Daily contact fraction for a colony of the given size.
    ///
    /// Larger colonies expose a smaller share of individuals to bait.
    pub fn access_fraction(&self, colony: f64) -> f64 {
        self.steps
            .iter()
            .find(|step| colony < step.below)
            .map_or(self.floor, |step| step.fraction)
    }

    fn validate(&self) -> Result<()> {
        check_num(self.intensity, 0.0..=1.0).context("invalid treatment intensity")?;
        check_num(self.floor, 0.0..=1.0).context("invalid access floor")?;

        let mut prev: Option<AccessStep> = None;
        for (i_step, step) in self.steps.iter().enumerate() {
            check_num(step.below, 0.0..=f64::MAX)
                .with_context(|| format!("invalid population bound of step {i_step}"))?;
            check_num(step.fraction, 0.0..=1.0)
                .with_context(|| format!("invalid access fraction of step {i_step}"))?;
            if let Some(prev) = prev {
                if step.below <= prev.below {
                    bail!(
                        "step {i_step} bound must exceed {}, but is {}",
                        prev.below,
                        step.below
                    );
                }
                if step.fraction > prev.fraction {
                    bail!(
                        "step {i_step} fraction must not exceed {}, but is {}",
                        prev.fraction,
                        step.fraction
                    );
                }
            }
            prev = Some(*step);
        }
        if let Some(last) = prev {
            if self.floor > last.fraction {
                bail!("floor must not exceed {}, but is {}", last.fraction, self.floor);
            }
        }

        self.activation.validate().context("invalid activation curve")?;
        Ok(())
    }
}

/// Linear ramp of metabolic conversion from `baseline` to `plateau`.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Activation {
    pub baseline: f64,
    pub plateau: f64,
    /// Days from treatment start until the plateau is reached.
    pub ramp_days: usize,
}

impl Default for Activation {
    fn default() -> Self {
        Self {
            baseline: 0.3,
            plateau: 1.0,
            ramp_days: 3,
        }
    }
}

impl Activation {
    pub fn level(&self, day: usize) -> f64 {
        if self.ramp_days == 0 {
            return self.plateau;
        }
        let progress = (day as f64 / self.ramp_days as f64).min(1.0);
        self.baseline + (self.plateau - self.baseline) * progress
    }

    fn validate(&self) -> Result<()> {
        check_num(self.plateau, 0.0..=1.0).context("invalid plateau")?;
        check_num(self.baseline, 0.0..=self.plateau).context("invalid baseline")?;
        check_num(self.ramp_days, 0..=MAX_DELAY).context("invalid ramp length")?;
        Ok(())
    }
}

/// Daily uptake history, indexed by day.
#[derive(Debug, Clone)]
pub struct LagBuffer {
    uptake: Vec<f64>,
}

impl LagBuffer {
    pub fn new(horizon: usize) -> Self {
        Self {
            uptake: vec![0.0; horizon],
        }
    }

    pub(crate) fn record(&mut self, day: usize, uptake: f64) {
        self.uptake[day] = uptake;
    }

    /// Uptake recorded `delay` days before `day`, or 0 during warm-up.
    pub fn delayed(&self, day: usize, delay: usize) -> f64 {
        day.checked_sub(delay)
            .and_then(|past| self.uptake.get(past))
            .copied()
            .unwrap_or(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn palatability(fraction: f64) -> ToxicantConfig {
        ToxicantConfig {
            stop_feeding_delay: 2,
            lethal_delay: 4,
            uptake: Uptake::Palatability { fraction },
        }
    }

    fn access_limited() -> AccessLimited {
        AccessLimited {
            intensity: 0.8,
            steps: vec![
                AccessStep {
                    below: 100.0,
                    fraction: 0.9,
                },
                AccessStep {
                    below: 1000.0,
                    fraction: 0.5,
                },
            ],
            floor: 0.2,
            activation: Activation::default(),
        }
    }

    #[test]
    fn warm_up_yields_zero() {
        let tox = palatability(0.95);
        let mut lag = LagBuffer::new(10);
        for day in 0..10 {
            lag.record(day, 100.0 + day as f64);
        }

        for day in 0..2 {
            assert_eq!(tox.delayed_flows(&lag, day).to_late, 0.0);
        }
        for day in 0..4 {
            assert_eq!(tox.delayed_flows(&lag, day).toxic_deaths, 0.0);
        }

        let flows = tox.delayed_flows(&lag, 7);
        assert_eq!(flows.to_late, 105.0);
        assert_eq!(flows.toxic_deaths, 103.0);
    }

    #[test]
    fn palatability_fraction_is_constant() {
        let uptake = Uptake::Palatability { fraction: 0.95 };
        assert_eq!(uptake.daily_fraction(500.0, 1), 0.95);
        assert_eq!(uptake.daily_fraction(5.0, 40), 0.95);
    }

    #[test]
    fn access_fraction_is_non_increasing() {
        let access = access_limited();
        assert_eq!(access.access_fraction(10.0), 0.9);
        assert_eq!(access.access_fraction(100.0), 0.5);
        assert_eq!(access.access_fraction(999.0), 0.5);
        assert_eq!(access.access_fraction(5000.0), 0.2);

        let mut prev = f64::INFINITY;
        for colony in (0..3000).step_by(50) {
            let fraction = access.access_fraction(colony as f64);
            assert!(fraction <= prev);
            prev = fraction;
        }
    }

    #[test]
    fn activation_ramps_to_plateau() {
        let activation = Activation::default();
        assert_eq!(activation.level(0), 0.3);
        assert!((activation.level(1) - (0.3 + 0.7 / 3.0)).abs() < 1e-12);
        assert_eq!(activation.level(3), 1.0);
        assert_eq!(activation.level(30), 1.0);

        let instant = Activation {
            ramp_days: 0,
            ..Default::default()
        };
        assert_eq!(instant.level(0), 1.0);
    }

    #[test]
    fn access_limited_fraction_combines_terms() {
        let uptake = Uptake::AccessLimited(access_limited());
        let fraction = uptake.daily_fraction(500.0, 3);
        assert!((fraction - 0.5 * 0.8 * 1.0).abs() < 1e-12);

        let early = uptake.daily_fraction(50.0, 0);
        assert!((early - 0.9 * 0.8 * 0.3).abs() < 1e-12);
    }

    #[test]
    fn validate_requires_ordered_delays() {
        assert!(palatability(0.5).validate().is_ok());

        let mut tox = palatability(0.5);
        tox.lethal_delay = 2;
        assert!(tox.validate().is_err());

        tox.lethal_delay = 1;
        assert!(tox.validate().is_err());

        tox.stop_feeding_delay = 0;
        tox.lethal_delay = 3;
        assert!(tox.validate().is_err());
    }

    #[test]
    fn validate_rejects_increasing_access() {
        let mut access = access_limited();
        access.steps[1].fraction = 0.95;
        assert!(Uptake::AccessLimited(access).validate().is_err());

        let mut access = access_limited();
        access.floor = 0.6;
        assert!(Uptake::AccessLimited(access).validate().is_err());

        let mut access = access_limited();
        access.steps[1].below = 50.0;
        assert!(Uptake::AccessLimited(access).validate().is_err());
    }

    #[test]
    fn validate_rejects_palatability_above_one() {
        assert!(palatability(1.2).validate().is_err());
    }
}
