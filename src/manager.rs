use crate::analysis::Report;
use crate::config::Config;
use crate::engine::run_simulation;
use crate::outputs::Series;
use crate::sweep::run_sweep;
use anyhow::{Context, Result};
use glob::glob;
use rmp_serde::{decode, encode};
use std::{
    fs::{self, File},
    io::{BufReader, BufWriter, Write},
    path::{Path, PathBuf},
};

/// Simulation directory holding `config.toml` and the generated outputs.
pub struct Manager {
    sim_dir: PathBuf,
    cfg: Config,
}

impl Manager {
    pub fn new<P: AsRef<Path>>(sim_dir: P) -> Result<Self> {
        let sim_dir = sim_dir.as_ref().to_path_buf();

        let cfg =
            Config::from_file(sim_dir.join("config.toml")).context("failed to construct cfg")?;
        log::info!("{cfg:#?}");

        Ok(Self { sim_dir, cfg })
    }

    pub fn run_scenario(&self) -> Result<()> {
        let series = run_simulation(&self.cfg).context("failed to run simulation")?;

        let series_file = self.series_file();
        let file =
            File::create(&series_file).with_context(|| format!("failed to create {series_file:?}"))?;
        let mut writer = BufWriter::new(file);
        encode::write(&mut writer, &series).context("failed to serialize series")?;
        writer.flush().context("failed to flush writer stream")?;
        log::info!("wrote {} days to {series_file:?}", series.len());

        Ok(())
    }

    pub fn run_sweep(&self) -> Result<()> {
        let results = run_sweep(&self.cfg).context("failed to run sweep")?;

        let sweep_file = self.sim_dir.join("sweep.json");
        results
            .save(&sweep_file)
            .with_context(|| format!("failed to save {sweep_file:?}"))?;
        log::info!(
            "{} points, {:.1}% collapsed, wrote {sweep_file:?}",
            results.points.len(),
            100.0 * results.collapsed_share
        );

        Ok(())
    }

    pub fn analyze(&self) -> Result<()> {
        let series_file = self.series_file();
        let file =
            File::open(&series_file).with_context(|| format!("failed to open {series_file:?}"))?;
        let mut reader = BufReader::new(file);
        let series: Series =
            decode::from_read(&mut reader).context("failed to deserialize series")?;

        let report = Report::new(&series, self.cfg.output.collapse_fraction);
        report.log_summary();

        let report_file = self.sim_dir.join("report.json");
        report
            .save(&report_file)
            .with_context(|| format!("failed to save {report_file:?}"))?;

        Ok(())
    }

    pub fn clean(&self) -> Result<()> {
        for pattern in ["*.msgpack", "*.json"] {
            let pattern = self.sim_dir.join(pattern);
            let pattern = pattern.to_str().context("pattern is not valid UTF-8")?;
            for file in glob(pattern).context("failed to glob outputs")? {
                let file = file.context("failed to read glob entry")?;
                fs::remove_file(&file).with_context(|| format!("failed to remove {file:?}"))?;
                log::info!("removed {file:?}");
            }
        }
        Ok(())
    }

    fn series_file(&self) -> PathBuf {
        self.sim_dir.join("series.msgpack")
    }
}
