use crate::config::{Config, ExposedScale};
use crate::model::{Compartments, Lockdown, Record};
use crate::schedule::RateParameters;
use anyhow::{Context, Result, bail};
use rmp_serde::{decode, encode};
use serde::{Deserialize, Serialize};
use std::{
    fs::File,
    io::{BufReader, BufWriter, Write},
    path::Path,
};

/// Simulation engine.
///
/// Holds the configuration, rate parameters, lockdown state and current
/// compartments, and provides methods to initialize, run, save, and load
/// simulations.
#[derive(Serialize, Deserialize)]
pub struct Engine {
    cfg: Config,
    params: RateParameters,
    lockdown: Lockdown,
    comps: Compartments,
    days_done: usize,
}

impl Engine {
    /// Create a new `Engine` with the given configuration at day 0.
    pub fn generate_initial_condition(cfg: Config) -> Self {
        let params = RateParameters::new(&cfg.model, cfg.output.n_days);

        let n = cfg.init.n_pop;
        let e = match cfg.init.exposed_scale {
            ExposedScale::Fraction => cfg.init.n_exposed / n,
            ExposedScale::Count => cfg.init.n_exposed,
        };
        let i = 0.0;
        let r = 0.0;
        let s = n - i;

        Self {
            cfg,
            params,
            lockdown: Lockdown::Armed,
            comps: Compartments { s, e, i, r, n },
            days_done: 0,
        }
    }

    pub fn cfg(&self) -> &Config {
        &self.cfg
    }

    pub fn lockdown(&self) -> Lockdown {
        self.lockdown
    }

    /// Whether every day of the run has been produced.
    pub fn is_finished(&self) -> bool {
        self.days_done >= self.cfg.output.n_days
    }

    /// Produce the record of the next day, or `None` once the run is complete.
    pub fn advance(&mut self) -> Option<Record> {
        if self.is_finished() {
            return None;
        }
        let day = self.days_done;
        if day > 0 {
            self.perform_step(day);
        }
        self.days_done += 1;
        Some(Record {
            day,
            comps: self.comps,
            lockdown: self.lockdown,
        })
    }

    /// Perform the next part of the simulation and save the resulting records to a binary file.
    pub fn perform_simulation<P: AsRef<Path>>(&mut self, file: P) -> Result<()> {
        if self.is_finished() {
            bail!("simulation already covers all {} days", self.cfg.output.n_days);
        }

        let file = file.as_ref();
        let file = File::create(file).with_context(|| format!("failed to create {file:?}"))?;
        let mut writer = BufWriter::new(file);

        let mut records = Vec::with_capacity(self.cfg.output.days_per_file);
        while records.len() < self.cfg.output.days_per_file {
            match self.advance() {
                Some(record) => records.push(record),
                None => break,
            }
        }

        encode::write(&mut writer, &records).context("failed to serialize records")?;
        writer.flush().context("failed to flush writer stream")?;

        let progress = 100.0 * self.days_done as f64 / self.cfg.output.n_days as f64;
        log::info!("completed {progress:06.2}%");

        Ok(())
    }

    /// Save a checkpoint of the entire engine state.
    ///
    /// Can be used to resume the simulation later.
    pub fn save_checkpoint<P: AsRef<Path>>(&self, file: P) -> Result<()> {
        let file = file.as_ref();
        let file = File::create(file).with_context(|| format!("failed to create {file:?}"))?;
        let mut writer = BufWriter::new(file);
        encode::write(&mut writer, &self).context("failed to serialize engine")?;
        writer.flush().context("failed to flush writer stream")?;
        Ok(())
    }

    /// Load a previously saved engine checkpoint.
    pub fn load_checkpoint<P: AsRef<Path>>(file: P) -> Result<Self> {
        let file = file.as_ref();
        let file = File::open(file).with_context(|| format!("failed to open {file:?}"))?;
        let mut reader = BufReader::new(file);
        let engine = decode::from_read(&mut reader).context("failed to deserialize engine")?;
        Ok(engine)
    }

    fn perform_step(&mut self, day: usize) {
        // Every update reads the compartments of the previous day.
        let Compartments { s, e, i, r, n } = self.comps;
        let p = &self.params;
        let b_e = p.b_e[day - 1];

        let contact = b_e * e + p.b_i * i;
        let infection = s / n * contact;
        let reinfection = p.delta * r / n * contact;

        let d_s = p.mu_s * (n - s) - infection - p.nu * s;
        let d_e = infection - (p.mu_e + p.sigma) * e - p.gamma * e + reinfection;
        let d_i = p.sigma * e - (p.mu_i + p.gamma) * i;
        let d_r = p.gamma * i - p.mu_r * r + p.gamma * e - reinfection;

        let mut comps = Compartments {
            s: s + d_s,
            e: e + d_e,
            i: i + d_i,
            r: r + d_r,
            n: 0.0,
        };
        comps.n = comps.total();
        self.comps = comps;

        self.check_lockdown(day);
    }

    fn check_lockdown(&mut self, day: usize) {
        let crossed = self.comps.i >= self.cfg.lockdown.threshold;
        if !crossed || self.lockdown != Lockdown::Armed {
            return;
        }
        self.params.apply_lockdown(day, self.cfg.lockdown.effectiveness);
        self.lockdown = Lockdown::Fired { day };
        log::info!("lockdown triggered at day {day}");
    }
}
