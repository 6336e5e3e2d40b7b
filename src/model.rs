//! Simulation data types.

use crate::stats::daily_change;
use serde::{Deserialize, Serialize};

/// Compartment sizes at a given day.
#[derive(Debug, PartialEq, Clone, Copy, Serialize, Deserialize)]
pub struct Compartments {
    /// Susceptible.
    pub s: f64,
    /// Exposed (incubating).
    pub e: f64,
    /// Infected with symptoms.
    pub i: f64,
    /// Recovered.
    pub r: f64,
    /// Total living population.
    pub n: f64,
}

impl Compartments {
    /// Sum of the four compartments.
    pub fn total(&self) -> f64 {
        self.s + self.e + self.i + self.r
    }
}

/// Lockdown policy state.
///
/// Starts `Armed` and fires at most once per run.
#[derive(Debug, PartialEq, Clone, Copy, Default, Serialize, Deserialize)]
pub enum Lockdown {
    #[default]
    Armed,
    Fired { day: usize },
}

impl Lockdown {
    pub fn day(&self) -> Option<usize> {
        match self {
            Lockdown::Armed => None,
            Lockdown::Fired { day } => Some(*day),
        }
    }
}

/// Record of the simulation at a single day.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct Record {
    pub day: usize,
    pub comps: Compartments,
    pub lockdown: Lockdown,
}

/// Compartment time series of a run, indexed by day.
#[derive(Debug, Default, Clone)]
pub struct Trajectory {
    pub s: Vec<f64>,
    pub e: Vec<f64>,
    pub i: Vec<f64>,
    pub r: Vec<f64>,
    pub n: Vec<f64>,
    pub lockdown: Lockdown,
}

impl Trajectory {
    /// Append the next day of the run.
    pub fn push(&mut self, record: &Record) {
        let comps = &record.comps;
        self.s.push(comps.s);
        self.e.push(comps.e);
        self.i.push(comps.i);
        self.r.push(comps.r);
        self.n.push(comps.n);
        self.lockdown = record.lockdown;
    }

    pub fn len(&self) -> usize {
        self.n.len()
    }

    /// Cumulative death toll, `n_pop - N[i]`.
    pub fn deaths(&self, n_pop: f64) -> Vec<f64> {
        self.n.iter().map(|&n| n_pop - n).collect()
    }

    pub fn daily_infected(&self) -> Vec<f64> {
        daily_change(&self.i)
    }

    pub fn daily_recovered(&self) -> Vec<f64> {
        daily_change(&self.r)
    }

    pub fn daily_deaths(&self, n_pop: f64) -> Vec<f64> {
        daily_change(&self.deaths(n_pop))
    }
}

impl<'a> FromIterator<&'a Record> for Trajectory {
    fn from_iter<T: IntoIterator<Item = &'a Record>>(iter: T) -> Self {
        let mut trajectory = Trajectory::default();
        for record in iter {
            trajectory.push(record);
        }
        trajectory
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(day: usize, i: f64, n: f64, lockdown: Lockdown) -> Record {
        Record {
            day,
            comps: Compartments {
                s: n - i,
                e: 0.0,
                i,
                r: 0.0,
                n,
            },
            lockdown,
        }
    }

    #[test]
    fn trajectory_derives_deaths_and_changes() {
        let records = [
            record(0, 0.0, 100.0, Lockdown::Armed),
            record(1, 4.0, 99.0, Lockdown::Armed),
            record(2, 6.0, 97.0, Lockdown::Fired { day: 2 }),
        ];
        let trajectory: Trajectory = records.iter().collect();

        assert_eq!(trajectory.len(), 3);
        assert_eq!(trajectory.deaths(100.0), vec![0.0, 1.0, 3.0]);
        assert_eq!(trajectory.daily_deaths(100.0), vec![1.0, 2.0]);
        assert_eq!(trajectory.daily_infected(), vec![4.0, 2.0]);
        assert_eq!(trajectory.daily_recovered(), vec![0.0, 0.0]);
        assert_eq!(trajectory.lockdown.day(), Some(2));
    }
}
