use crate::config::check_num;
use crate::state::State;
use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

#[derive(Debug, PartialEq, Clone, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Resource {
    /// Resource is never limiting.
    #[default]
    #[serde(rename = "none")]
    Unlimited,
    Depleting(Depleting),
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct Depleting {
    /// Daily consumption per nymph.
    pub nymph_consumption: f64,
    /// Daily consumption per feeding adult.
    pub adult_consumption: f64,
    /// Lowest reachable level, strictly positive.
    pub floor: f64,
}

impl Resource {
    /// Level after one day of consumption by the feeders in `state`.
    pub fn next_level(&self, state: &State) -> f64 {
        match self {
            Resource::Unlimited => 1.0,
            Resource::Depleting(dep) => {
                let adults = state.susceptible + state.early_intox;
                let demand = dep.nymph_consumption * state.nymphs + dep.adult_consumption * adults;
                (state.resource - demand).clamp(dep.floor, 1.0)
            }
        }
    }

    pub(crate) fn validate(&self) -> Result<()> {
        let Resource::Depleting(dep) = self else {
            return Ok(());
        };
        check_num(dep.nymph_consumption, 0.0..=1.0).context("invalid nymph consumption")?;
        check_num(dep.adult_consumption, 0.0..=1.0).context("invalid adult consumption")?;
        check_num(dep.floor, 0.0..=1.0).context("invalid resource floor")?;
        if dep.floor == 0.0 {
            bail!("resource floor must be positive");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(nymphs: f64, adults: f64, resource: f64) -> State {
        State {
            nymphs,
            susceptible: adults,
            early_intox: 0.0,
            late_intox: 0.0,
            dead: 0.0,
            resource,
        }
    }

    fn depleting() -> Resource {
        Resource::Depleting(Depleting {
            nymph_consumption: 1e-4,
            adult_consumption: 2e-4,
            floor: 0.2,
        })
    }

    #[test]
    fn unlimited_stays_full() {
        assert_eq!(Resource::Unlimited.next_level(&state(1e6, 1e6, 0.5)), 1.0);
    }

    #[test]
    fn depletes_by_weighted_biomass() {
        let level = depleting().next_level(&state(100.0, 500.0, 1.0));
        assert!((level - (1.0 - 0.01 - 0.1)).abs() < 1e-12);
    }

    #[test]
    fn never_drops_below_floor() {
        let resource = depleting();
        let mut current = state(1000.0, 5000.0, 1.0);
        for _ in 0..20 {
            current.resource = resource.next_level(&current);
            assert!(current.resource >= 0.2);
        }
        assert_eq!(current.resource, 0.2);
    }

    #[test]
    fn validate_rejects_zero_floor() {
        let resource = Resource::Depleting(Depleting {
            nymph_consumption: 0.0,
            adult_consumption: 0.0,
            floor: 0.0,
        });
        assert!(resource.validate().is_err());
        assert!(depleting().validate().is_ok());
    }
}
