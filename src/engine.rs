use crate::config::{Config, OutflowPolicy};
use crate::demography::Flows;
use crate::outputs::{DayFlows, Series};
use crate::state::State;
use crate::toxicodynamics::LagBuffer;
use anyhow::{Context, Result, bail};
use std::sync::atomic::{AtomicBool, Ordering};

/// Simulation engine.
///
/// Holds the parameters of one run, the current state and the uptake
/// history, and advances the state one day at a time.
pub struct Engine<'a> {
    cfg: &'a Config,
    env_factor: f64,
    state: State,
    lag: LagBuffer,
    day: usize,
    halted: bool,
}

impl<'a> Engine<'a> {
    /// Validate the parameters and seed the day-0 state.
    pub fn new(cfg: &'a Config) -> Result<Self> {
        cfg.validate().context("invalid parameters")?;

        let env_factor = cfg.environment.factor();
        log::debug!("environmental factor {env_factor:.4}");

        Ok(Self {
            cfg,
            env_factor,
            state: State::initialize(cfg),
            lag: LagBuffer::new(cfg.horizon),
            day: 0,
            halted: false,
        })
    }

    pub fn state(&self) -> &State {
        &self.state
    }

    pub fn env_factor(&self) -> f64 {
        self.env_factor
    }

    /// Advance the state from `day - 1` to `day` and return the applied flows.
    ///
    /// # Errors
    /// Returns an error if `day` is not the day after the last step, lies
    /// past the horizon, or a compartment stops being finite.
    pub fn step(&mut self, day: usize) -> Result<DayFlows> {
        if day != self.day + 1 {
            bail!("expected day {}, but got {day}", self.day + 1);
        }
        if day >= self.cfg.horizon {
            bail!("day {day} is past the horizon of {} days", self.cfg.horizon);
        }
        self.day = day;

        if self.halted {
            return Ok(DayFlows::default());
        }

        let prev = self.state;
        let tox = &self.cfg.toxicant;
        let demo = &self.cfg.demography;
        let immigration = self.cfg.immigration;

        // Uptake and demographic flows, all from the previous day's state.
        let uptake_fraction = tox.uptake.daily_fraction(demo.colony_size(&prev), day);
        let mut flows = demo.flows(&prev, self.env_factor, uptake_fraction);
        let (nymph_births, adult_births) = if demo.is_stage_structured() {
            (flows.births, 0.0)
        } else {
            (0.0, flows.births)
        };

        if self.cfg.outflow_policy == OutflowPolicy::Proportional {
            limit_outflows(&prev, &mut flows, nymph_births, adult_births + immigration);
        }

        let uptake = flows.uptake();
        self.lag.record(day, uptake);
        let delayed = tox.delayed_flows(&self.lag, day);

        let resource = self.cfg.resource.next_level(&prev);

        let nymphs = prev.nymphs + nymph_births
            - flows.maturation
            - flows.nymph_deaths
            - flows.nymph_uptake;
        let susceptible = prev.susceptible + adult_births + flows.maturation + immigration
            - flows.adult_deaths
            - flows.adult_uptake;
        let early_intox = prev.early_intox + uptake - delayed.to_late;
        let late_intox = prev.late_intox + delayed.to_late - delayed.toxic_deaths;

        self.state = State {
            nymphs: clamp(day, "nymphs", nymphs)?,
            susceptible: clamp(day, "susceptible", susceptible)?,
            early_intox: clamp(day, "early_intox", early_intox)?,
            late_intox: clamp(day, "late_intox", late_intox)?,
            dead: clamp(day, "dead", prev.dead + delayed.toxic_deaths)?,
            resource,
        };

        if demo.holds_on_extinction() && self.state.live_total() < 1.0 {
            log::info!("colony extinct at day {day}, holding state");
            self.halted = true;
        }

        Ok(DayFlows {
            uptake,
            to_late: delayed.to_late,
            toxic_deaths: delayed.toxic_deaths,
            births: flows.births,
            natural_deaths: flows.natural_deaths(),
            immigration,
        })
    }
}

/// Floor a compartment at zero; the discarded deficit is not redistributed.
///
/// Non-finite values mean the population overflowed and are rejected.
fn clamp(day: usize, name: &str, value: f64) -> Result<f64> {
    if !value.is_finite() {
        bail!("day {day}: {name} overflowed to {value}");
    }
    if value < 0.0 {
        log::debug!("day {day}: clamped {name} from {value:.6e}");
        return Ok(0.0);
    }
    Ok(value)
}

/// Scale each compartment's outflows so they never exceed what it holds.
///
/// Available mass is the previous value plus same-day inflows.
fn limit_outflows(prev: &State, flows: &mut Flows, nymph_inflow: f64, adult_inflow: f64) {
    let nymph_outflow = flows.maturation + flows.nymph_deaths + flows.nymph_uptake;
    let nymph_available = prev.nymphs + nymph_inflow;
    if nymph_outflow > nymph_available {
        let scale = nymph_available / nymph_outflow;
        flows.maturation *= scale;
        flows.nymph_deaths *= scale;
        flows.nymph_uptake *= scale;
    }

    let adult_outflow = flows.adult_deaths + flows.adult_uptake;
    let adult_available = prev.susceptible + adult_inflow + flows.maturation;
    if adult_outflow > adult_available {
        let scale = adult_available / adult_outflow;
        flows.adult_deaths *= scale;
        flows.adult_uptake *= scale;
    }
}

/// Run one scenario from day 0 to `horizon - 1`.
///
/// # Errors
/// Returns an error if the parameters are invalid.
pub fn run_simulation(cfg: &Config) -> Result<Series> {
    run_simulation_with_cancel(cfg, &AtomicBool::new(false))
}

/// Like [`run_simulation`], polling `cancel` between days.
///
/// # Errors
/// Returns an error if the parameters are invalid or `cancel` was set.
pub fn run_simulation_with_cancel(cfg: &Config, cancel: &AtomicBool) -> Result<Series> {
    let mut engine = Engine::new(cfg)?;

    let mut series = Series::with_capacity(cfg.horizon, engine.env_factor());
    series.push(engine.state(), &DayFlows::default());

    for day in 1..cfg.horizon {
        if cancel.load(Ordering::Relaxed) {
            bail!("simulation cancelled at day {day}");
        }
        let flows = engine.step(day)?;
        series.push(engine.state(), &flows);
    }

    Ok(series)
}
