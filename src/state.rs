use crate::config::Config;

/// Compartment values on one day.
///
/// In the stage-structured variant `susceptible` holds the adults.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct State {
    pub nymphs: f64,
    pub susceptible: f64,
    pub early_intox: f64,
    pub late_intox: f64,
    /// Cumulative toxic deaths.
    pub dead: f64,
    /// Shared resource level in [0, 1].
    pub resource: f64,
}

impl State {
    /// Day-0 state: no intoxicated or dead individuals, full resource.
    pub fn initialize(cfg: &Config) -> Self {
        Self {
            nymphs: cfg.init.nymphs,
            susceptible: cfg.init.susceptible,
            early_intox: 0.0,
            late_intox: 0.0,
            dead: 0.0,
            resource: 1.0,
        }
    }

    /// Feeding-capable individuals.
    pub fn active(&self) -> f64 {
        self.nymphs + self.susceptible + self.early_intox
    }

    /// Every live individual, feeding or not.
    pub fn live_total(&self) -> f64 {
        self.active() + self.late_intox
    }
}
