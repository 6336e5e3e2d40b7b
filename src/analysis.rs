use crate::config::Config;
use crate::model::{Lockdown, Record, Trajectory};
use crate::stats::peak;
use anyhow::{Context, Result, bail};
use rmp_serde::{decode, encode};
use serde::Serialize;
use serde_value::Value;
use std::{
    collections::BTreeMap,
    fs::File,
    io::{BufReader, BufWriter, Write},
    path::Path,
};

pub trait Obs {
    fn name(&self) -> &'static str;
    fn update(&mut self, record: &Record) -> Result<()>;
    fn report(&self) -> Result<Value>;
}

fn to_value<T: Serialize>(report: T) -> Result<Value> {
    serde_value::to_value(report).context("failed to convert report")
}

/// Full compartment time series plus the cumulative death toll.
pub struct Series {
    n_pop: f64,
    trajectory: Trajectory,
}

#[derive(Serialize)]
pub struct SeriesReport<'a> {
    pub s: &'a [f64],
    pub e: &'a [f64],
    pub i: &'a [f64],
    pub r: &'a [f64],
    pub n: &'a [f64],
    pub d: Vec<f64>,
}

impl Series {
    pub fn new(cfg: &Config) -> Self {
        Self {
            n_pop: cfg.init.n_pop,
            trajectory: Trajectory::default(),
        }
    }
}

impl Obs for Series {
    fn name(&self) -> &'static str {
        "series"
    }

    fn update(&mut self, record: &Record) -> Result<()> {
        let exp_day = self.trajectory.len();
        if record.day != exp_day {
            bail!("record day must be {exp_day}, but is {}", record.day);
        }
        self.trajectory.push(record);
        Ok(())
    }

    fn report(&self) -> Result<Value> {
        let t = &self.trajectory;
        to_value(SeriesReport {
            s: &t.s,
            e: &t.e,
            i: &t.i,
            r: &t.r,
            n: &t.n,
            d: t.deaths(self.n_pop),
        })
    }
}

/// Day-over-day changes of infected, recovered and deceased.
pub struct DailyChange {
    n_pop: f64,
    trajectory: Trajectory,
}

#[derive(Serialize)]
pub struct DailyChangeReport {
    pub i: Vec<f64>,
    pub r: Vec<f64>,
    pub d: Vec<f64>,
}

impl DailyChange {
    pub fn new(cfg: &Config) -> Self {
        Self {
            n_pop: cfg.init.n_pop,
            trajectory: Trajectory::default(),
        }
    }
}

impl Obs for DailyChange {
    fn name(&self) -> &'static str {
        "daily_change"
    }

    fn update(&mut self, record: &Record) -> Result<()> {
        self.trajectory.push(record);
        Ok(())
    }

    fn report(&self) -> Result<Value> {
        let t = &self.trajectory;
        to_value(DailyChangeReport {
            i: t.daily_infected(),
            r: t.daily_recovered(),
            d: t.daily_deaths(self.n_pop),
        })
    }
}

/// Day and size of the largest number of infected.
pub struct PeakInfected {
    i: Vec<f64>,
}

#[derive(Serialize)]
pub struct PeakReport {
    pub day: Option<usize>,
    pub value: f64,
}

impl PeakInfected {
    pub fn new() -> Self {
        Self { i: Vec::new() }
    }
}

impl Obs for PeakInfected {
    fn name(&self) -> &'static str {
        "peak_infected"
    }

    fn update(&mut self, record: &Record) -> Result<()> {
        self.i.push(record.comps.i);
        Ok(())
    }

    fn report(&self) -> Result<Value> {
        let report = match peak(&self.i) {
            Some((day, value)) => PeakReport {
                day: Some(day),
                value,
            },
            None => PeakReport {
                day: None,
                value: f64::NAN,
            },
        };
        to_value(report)
    }
}

/// Day at which the lockdown was triggered, if ever.
pub struct LockdownDay {
    lockdown: Lockdown,
}

#[derive(Serialize)]
pub struct LockdownReport {
    pub triggered: bool,
    pub day: Option<usize>,
}

impl LockdownDay {
    pub fn new() -> Self {
        Self {
            lockdown: Lockdown::Armed,
        }
    }
}

impl Obs for LockdownDay {
    fn name(&self) -> &'static str {
        "lockdown"
    }

    fn update(&mut self, record: &Record) -> Result<()> {
        match (self.lockdown, record.lockdown) {
            (Lockdown::Fired { day }, Lockdown::Armed) => {
                bail!("lockdown fired at day {day} but is armed at day {}", record.day);
            }
            (Lockdown::Fired { day }, Lockdown::Fired { day: rec_day }) if day != rec_day => {
                bail!("lockdown fired at day {day} and again at day {rec_day}");
            }
            _ => {}
        }
        self.lockdown = record.lockdown;
        Ok(())
    }

    fn report(&self) -> Result<Value> {
        let day = self.lockdown.day();
        to_value(LockdownReport {
            triggered: day.is_some(),
            day,
        })
    }
}

/// Totals at the last simulated day.
pub struct FinalTotals {
    n_pop: f64,
    last: Option<Record>,
}

#[derive(Serialize)]
pub struct FinalTotalsReport {
    pub day: Option<usize>,
    pub deaths: f64,
    pub death_share: f64,
    pub recovered: f64,
    pub susceptible: f64,
}

impl FinalTotals {
    pub fn new(cfg: &Config) -> Self {
        Self {
            n_pop: cfg.init.n_pop,
            last: None,
        }
    }
}

impl Obs for FinalTotals {
    fn name(&self) -> &'static str {
        "final_totals"
    }

    fn update(&mut self, record: &Record) -> Result<()> {
        self.last = Some(record.clone());
        Ok(())
    }

    fn report(&self) -> Result<Value> {
        let report = match &self.last {
            Some(record) => {
                let deaths = self.n_pop - record.comps.n;
                FinalTotalsReport {
                    day: Some(record.day),
                    deaths,
                    death_share: deaths / self.n_pop,
                    recovered: record.comps.r,
                    susceptible: record.comps.s,
                }
            }
            None => FinalTotalsReport {
                day: None,
                deaths: f64::NAN,
                death_share: f64::NAN,
                recovered: f64::NAN,
                susceptible: f64::NAN,
            },
        };
        to_value(report)
    }
}

pub struct Analyzer {
    obs_ptr_vec: Vec<Box<dyn Obs>>,
}

impl Analyzer {
    pub fn new(cfg: &Config) -> Self {
        let obs_ptr_vec: Vec<Box<dyn Obs>> = vec![
            Box::new(Series::new(cfg)),
            Box::new(DailyChange::new(cfg)),
            Box::new(PeakInfected::new()),
            Box::new(LockdownDay::new()),
            Box::new(FinalTotals::new(cfg)),
        ];
        Self { obs_ptr_vec }
    }

    /// Feed every record of a trajectory file to the observables.
    pub fn add_file<P: AsRef<Path>>(&mut self, file: P) -> Result<()> {
        let file = file.as_ref();
        let file = File::open(file).with_context(|| format!("failed to open {file:?}"))?;
        let mut reader = BufReader::new(file);

        let records: Vec<Record> =
            decode::from_read(&mut reader).context("failed to deserialize records")?;
        for record in &records {
            self.add_record(record)?;
        }
        Ok(())
    }

    pub fn add_record(&mut self, record: &Record) -> Result<()> {
        for obs in &mut self.obs_ptr_vec {
            obs.update(record)
                .with_context(|| format!("failed to update {}", obs.name()))?;
        }
        Ok(())
    }

    pub fn reports(&self) -> Result<BTreeMap<&'static str, Value>> {
        self.obs_ptr_vec
            .iter()
            .map(|obs| -> Result<_> { Ok((obs.name(), obs.report()?)) })
            .collect()
    }

    pub fn save_results<P: AsRef<Path>>(&self, file: P) -> Result<()> {
        let reports = self.reports().context("failed to build reports")?;

        let file = file.as_ref();
        let file = File::create(file).with_context(|| format!("failed to create {file:?}"))?;
        let mut writer = BufWriter::new(file);
        encode::write_named(&mut writer, &reports).context("failed to serialize results")?;
        writer.flush().context("failed to flush writer stream")?;
        Ok(())
    }
}
