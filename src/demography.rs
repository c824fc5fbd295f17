use crate::config::check_num;
use crate::state::State;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Demography {
    SingleStage(SingleStage),
    StageStructured(StageStructured),
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct SingleStage {
    /// Daily per-capita birth rate at an environmental factor of 1.
    pub birth_rate: f64,
    /// Daily per-capita natural mortality.
    pub natural_mortality: f64,
    /// Only individuals not ingesting bait that day reproduce.
    #[serde(default = "enabled")]
    pub suppress_feeding_births: bool,
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct StageStructured {
    /// Daily nymphs produced per adult at an environmental factor of 1.
    pub birth_rate: f64,
    /// Daily fraction of nymphs becoming adults.
    pub maturation_rate: f64,
    pub nymph_mortality: f64,
    pub adult_mortality: f64,
    /// Relative bait exposure of nymphs.
    #[serde(default = "unit")]
    pub nymph_exposure: f64,
    /// Relative bait exposure of adults.
    #[serde(default = "unit")]
    pub adult_exposure: f64,
    /// Scale exposure by `ln(1 + live population)`.
    #[serde(default = "enabled")]
    pub gregarious_effect: bool,
    /// Freeze the run once fewer than one individual is alive.
    #[serde(default = "enabled")]
    pub extinction_hold: bool,
}

fn enabled() -> bool {
    true
}

fn unit() -> f64 {
    1.0
}

/// Demographic and treatment flows for one day.
///
/// All values are non-negative; signs are applied by the integrator.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct Flows {
    /// Newborns: adults in the single-stage policy, nymphs otherwise.
    pub births: f64,
    pub maturation: f64,
    pub nymph_deaths: f64,
    pub adult_deaths: f64,
    pub nymph_uptake: f64,
    pub adult_uptake: f64,
}

impl Flows {
    pub fn uptake(&self) -> f64 {
        self.nymph_uptake + self.adult_uptake
    }

    pub fn natural_deaths(&self) -> f64 {
        self.nymph_deaths + self.adult_deaths
    }
}

/// Density-dependent exposure multiplier.
pub fn gregarious_effect(live_total: f64) -> f64 {
    live_total.max(0.0).ln_1p()
}

impl Demography {
    pub fn is_stage_structured(&self) -> bool {
        matches!(self, Demography::StageStructured(_))
    }

    /// Whether the run freezes once the colony is extinct.
    pub fn holds_on_extinction(&self) -> bool {
        match self {
            Demography::SingleStage(_) => false,
            Demography::StageStructured(stages) => stages.extinction_hold,
        }
    }

    /// Population whose size limits bait access.
    pub fn colony_size(&self, state: &State) -> f64 {
        match self {
            Demography::SingleStage(_) => state.susceptible,
            Demography::StageStructured(_) => state.nymphs + state.susceptible,
        }
    }

    /// Flows out of `state` (the previous day) given the per-capita uptake fraction.
    pub fn flows(&self, state: &State, env_factor: f64, uptake_fraction: f64) -> Flows {
        match self {
            Demography::SingleStage(single) => {
                let adults = state.susceptible;
                let suppression = if single.suppress_feeding_births {
                    (1.0 - uptake_fraction).clamp(0.0, 1.0)
                } else {
                    1.0
                };
                Flows {
                    births: adults * single.birth_rate * env_factor * state.resource * suppression,
                    adult_deaths: adults * single.natural_mortality,
                    adult_uptake: adults * uptake_fraction,
                    ..Default::default()
                }
            }
            Demography::StageStructured(stages) => {
                let nymphs = state.nymphs;
                let adults = state.susceptible;
                let density = if stages.gregarious_effect {
                    gregarious_effect(state.live_total())
                } else {
                    1.0
                };
                let exposure = uptake_fraction * density;
                Flows {
                    births: adults * stages.birth_rate * env_factor * state.resource,
                    maturation: nymphs * stages.maturation_rate,
                    nymph_deaths: nymphs * stages.nymph_mortality,
                    adult_deaths: adults * stages.adult_mortality,
                    nymph_uptake: (nymphs * exposure * stages.nymph_exposure).min(nymphs),
                    adult_uptake: (adults * exposure * stages.adult_exposure).min(adults),
                }
            }
        }
    }

    pub(crate) fn validate(&self) -> Result<()> {
        match self {
            Demography::SingleStage(single) => {
                check_num(single.birth_rate, 0.0..=5.0).context("invalid birth rate")?;
                check_num(single.natural_mortality, 0.0..=1.0)
                    .context("invalid natural mortality")?;
            }
            Demography::StageStructured(stages) => {
                check_num(stages.birth_rate, 0.0..=5.0).context("invalid birth rate")?;
                check_num(stages.maturation_rate, 0.0..=1.0).context("invalid maturation rate")?;
                check_num(stages.nymph_mortality, 0.0..=1.0).context("invalid nymph mortality")?;
                check_num(stages.adult_mortality, 0.0..=1.0).context("invalid adult mortality")?;
                check_num(stages.nymph_exposure, 0.0..=10.0).context("invalid nymph exposure")?;
                check_num(stages.adult_exposure, 0.0..=10.0).context("invalid adult exposure")?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(nymphs: f64, adults: f64) -> State {
        State {
            nymphs,
            susceptible: adults,
            early_intox: 0.0,
            late_intox: 0.0,
            dead: 0.0,
            resource: 1.0,
        }
    }

    fn single(suppress: bool) -> Demography {
        Demography::SingleStage(SingleStage {
            birth_rate: 0.06,
            natural_mortality: 0.01,
            suppress_feeding_births: suppress,
        })
    }

    fn staged(gregarious: bool) -> StageStructured {
        StageStructured {
            birth_rate: 0.1,
            maturation_rate: 0.05,
            nymph_mortality: 0.02,
            adult_mortality: 0.01,
            nymph_exposure: 0.5,
            adult_exposure: 1.0,
            gregarious_effect: gregarious,
            extinction_hold: true,
        }
    }

    #[test]
    fn single_stage_suppresses_births_of_feeders() {
        let flows = single(true).flows(&state(0.0, 500.0), 1.0, 0.95);
        assert!((flows.births - 500.0 * 0.06 * 0.05).abs() < 1e-9);
        assert!((flows.adult_deaths - 5.0).abs() < 1e-12);
        assert!((flows.adult_uptake - 475.0).abs() < 1e-9);
        assert_eq!(flows.nymph_uptake, 0.0);
        assert_eq!(flows.maturation, 0.0);
    }

    #[test]
    fn single_stage_without_suppression() {
        let flows = single(false).flows(&state(0.0, 500.0), 0.5, 0.95);
        assert!((flows.births - 500.0 * 0.06 * 0.5).abs() < 1e-9);
    }

    #[test]
    fn births_scale_with_resource() {
        let mut current = state(0.0, 500.0);
        current.resource = 0.25;
        let flows = single(false).flows(&current, 1.0, 0.0);
        assert!((flows.births - 500.0 * 0.06 * 0.25).abs() < 1e-9);
    }

    #[test]
    fn stage_structured_flows() {
        let demo = Demography::StageStructured(staged(false));
        let flows = demo.flows(&state(200.0, 100.0), 0.8, 0.1);
        assert!((flows.births - 100.0 * 0.1 * 0.8).abs() < 1e-12);
        assert!((flows.maturation - 10.0).abs() < 1e-12);
        assert!((flows.nymph_deaths - 4.0).abs() < 1e-12);
        assert!((flows.adult_deaths - 1.0).abs() < 1e-12);
        assert!((flows.nymph_uptake - 10.0).abs() < 1e-12);
        assert!((flows.adult_uptake - 10.0).abs() < 1e-12);
    }

    #[test]
    fn gregarious_effect_raises_exposure_with_density() {
        let demo = Demography::StageStructured(staged(true));
        let sparse = demo.flows(&state(0.0, 20.0), 1.0, 0.01);
        let dense = demo.flows(&state(0.0, 2000.0), 1.0, 0.01);
        assert!(dense.adult_uptake / 2000.0 > sparse.adult_uptake / 20.0);
        assert!((gregarious_effect(0.0)).abs() < 1e-12);
        assert!((gregarious_effect(std::f64::consts::E - 1.0) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn stage_uptake_never_exceeds_stage() {
        let demo = Demography::StageStructured(staged(true));
        let flows = demo.flows(&state(300.0, 500.0), 1.0, 0.95);
        assert_eq!(flows.adult_uptake, 500.0);
        assert!(flows.nymph_uptake <= 300.0);
    }

    #[test]
    fn colony_size_by_policy() {
        let current = state(30.0, 70.0);
        assert_eq!(single(true).colony_size(&current), 70.0);
        assert_eq!(
            Demography::StageStructured(staged(true)).colony_size(&current),
            100.0
        );
    }

    #[test]
    fn validate_rejects_negative_rates() {
        let demo = Demography::SingleStage(SingleStage {
            birth_rate: -0.1,
            natural_mortality: 0.01,
            suppress_feeding_births: true,
        });
        assert!(demo.validate().is_err());
        assert!(single(true).validate().is_ok());
    }
}
