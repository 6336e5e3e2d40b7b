use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::{fmt::Debug, fs, ops::RangeBounds, path::Path};

/// Simulation configuration parameters.
///
/// Loaded from a TOML file and validated before use.
/// See [`Config::from_file`] for loading.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Model rate constants.
    pub model: ModelConfig,
    /// Initial condition.
    pub init: InitConfig,
    /// Lockdown policy.
    pub lockdown: LockdownConfig,
    /// Output parameters.
    pub output: OutputConfig,
}

/// Rate constants of the model (per day).
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Susceptible death rate.
    pub mu_s: f64,
    /// Exposed death rate.
    pub mu_e: f64,
    /// Infected death rate.
    pub mu_i: f64,
    /// Recovered death rate.
    pub mu_r: f64,

    /// Rate at which susceptibles become immune.
    pub nu: f64,
    /// Recovery rate.
    pub gamma: f64,
    /// Symptom onset rate.
    pub sigma: f64,

    /// Initial transmission rate by exposed carriers.
    pub b_e_init: f64,
    /// Asymptotic transmission rate by exposed carriers.
    pub b_e_final: f64,
    /// Decay rate of the exposed transmission rate.
    pub eta: f64,
    /// Transmission rate by infected carriers.
    pub b_i: f64,

    /// Reinfection rate of recovered individuals.
    pub delta: f64,
}

/// Interpretation of the initial number of exposed individuals.
#[derive(Debug, PartialEq, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExposedScale {
    /// `E[0] = n_exposed / n_pop`.
    #[default]
    Fraction,
    /// `E[0] = n_exposed`.
    Count,
}

/// Initial condition of the run.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct InitConfig {
    /// Initial total population.
    pub n_pop: f64,
    /// Initial number of exposed individuals.
    pub n_exposed: f64,
    #[serde(default)]
    pub exposed_scale: ExposedScale,
}

/// Threshold-triggered lockdown policy.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct LockdownConfig {
    /// Number of infected individuals that triggers the lockdown.
    pub threshold: f64,
    /// Factor dividing the exposed transmission and infected death rates.
    pub effectiveness: f64,
}

/// Length of the run and layout of its trajectory files.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Number of simulated days, including day 0.
    pub n_days: usize,
    /// Number of days written per trajectory file.
    pub days_per_file: usize,
}

impl Config {
    /// Load a [`Config`] from a file.
    ///
    /// The file must be TOML-encoded and contain a serialized [`Config`].
    /// Performs validation on all parameters before returning.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, deserialized,
    /// or if the configuration values are invalid.
    pub fn from_file<P: AsRef<Path>>(file: P) -> Result<Self> {
        let file = file.as_ref();
        let contents =
            fs::read_to_string(file).with_context(|| format!("failed to read {file:?}"))?;

        let config: Config = toml::from_str(&contents).context("failed to deserialize config")?;

        config.validate().context("failed to validate config")?;

        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        let model = &self.model;
        let rates = [
            ("mu_s", model.mu_s),
            ("mu_e", model.mu_e),
            ("mu_i", model.mu_i),
            ("mu_r", model.mu_r),
            ("nu", model.nu),
            ("gamma", model.gamma),
            ("sigma", model.sigma),
            ("b_e_init", model.b_e_init),
            ("b_e_final", model.b_e_final),
            ("eta", model.eta),
            ("b_i", model.b_i),
            ("delta", model.delta),
        ];
        for (name, rate) in rates {
            check_finite(rate).with_context(|| format!("invalid rate {name}"))?;
        }

        check_finite(self.init.n_pop).context("invalid initial population")?;
        if self.init.n_pop <= 0.0 {
            bail!("initial population must be positive, but is {}", self.init.n_pop);
        }
        check_finite(self.init.n_exposed).context("invalid initial number of exposed")?;

        check_finite(self.lockdown.threshold).context("invalid lockdown threshold")?;
        check_finite(self.lockdown.effectiveness).context("invalid lockdown effectiveness")?;
        if self.lockdown.effectiveness <= 0.0 {
            bail!(
                "lockdown effectiveness must be positive, but is {}",
                self.lockdown.effectiveness
            );
        }

        check_num(self.output.n_days, 1..1_000_000).context("invalid number of days")?;
        check_num(self.output.days_per_file, 1..1_000_000)
            .context("invalid number of days per file")?;

        Ok(())
    }
}

fn check_num<T, R>(num: T, range: R) -> Result<()>
where
    T: PartialOrd + Debug,
    R: RangeBounds<T> + Debug,
{
    if !range.contains(&num) {
        bail!("number must be in the range {range:?}, but is {num:?}");
    }
    Ok(())
}

fn check_finite(num: f64) -> Result<()> {
    if !num.is_finite() {
        bail!("number must be finite, but is {num:?}");
    }
    Ok(())
}
