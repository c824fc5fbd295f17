use crate::state::State;
use serde::{Deserialize, Serialize};

/// Flows applied on one day. All zero on day 0.
#[derive(Debug, Default, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DayFlows {
    /// Toxicant uptake, entering the early-intoxicated compartment.
    pub uptake: f64,
    /// Early-intoxicated individuals that stopped feeding.
    pub to_late: f64,
    /// Late-intoxicated individuals that died.
    pub toxic_deaths: f64,
    pub births: f64,
    pub natural_deaths: f64,
    pub immigration: f64,
}

/// Full run, returned by `run_simulation`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Series {
    /// Reproduction factor used for the whole run.
    pub env_factor: f64,

    pub nymphs: Vec<f64>,
    pub susceptible: Vec<f64>,
    pub early_intox: Vec<f64>,
    pub late_intox: Vec<f64>,
    pub dead: Vec<f64>,
    pub resource: Vec<f64>,
    /// Feeding-capable individuals: nymphs, susceptible and early-intoxicated.
    pub active: Vec<f64>,

    pub uptake: Vec<f64>,
    pub to_late: Vec<f64>,
    pub toxic_deaths: Vec<f64>,
    pub births: Vec<f64>,
    pub natural_deaths: Vec<f64>,
    pub immigration: Vec<f64>,
}

impl Series {
    /// Pre-allocate all vectors for `n` days.
    pub fn with_capacity(n: usize, env_factor: f64) -> Self {
        Self {
            env_factor,
            nymphs: Vec::with_capacity(n),
            susceptible: Vec::with_capacity(n),
            early_intox: Vec::with_capacity(n),
            late_intox: Vec::with_capacity(n),
            dead: Vec::with_capacity(n),
            resource: Vec::with_capacity(n),
            active: Vec::with_capacity(n),
            uptake: Vec::with_capacity(n),
            to_late: Vec::with_capacity(n),
            toxic_deaths: Vec::with_capacity(n),
            births: Vec::with_capacity(n),
            natural_deaths: Vec::with_capacity(n),
            immigration: Vec::with_capacity(n),
        }
    }

    /// Append one day.
    pub fn push(&mut self, state: &State, flows: &DayFlows) {
        self.nymphs.push(state.nymphs);
        self.susceptible.push(state.susceptible);
        self.early_intox.push(state.early_intox);
        self.late_intox.push(state.late_intox);
        self.dead.push(state.dead);
        self.resource.push(state.resource);
        self.active.push(state.active());

        self.uptake.push(flows.uptake);
        self.to_late.push(flows.to_late);
        self.toxic_deaths.push(flows.toxic_deaths);
        self.births.push(flows.births);
        self.natural_deaths.push(flows.natural_deaths);
        self.immigration.push(flows.immigration);
    }

    /// Compartment values on `day`.
    pub fn state(&self, day: usize) -> State {
        State {
            nymphs: self.nymphs[day],
            susceptible: self.susceptible[day],
            early_intox: self.early_intox[day],
            late_intox: self.late_intox[day],
            dead: self.dead[day],
            resource: self.resource[day],
        }
    }

    /// Number of days.
    pub fn len(&self) -> usize {
        self.active.len()
    }

    /// Returns `true` if there are no days.
    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }
}
