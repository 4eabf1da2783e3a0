use std::path::PathBuf;
use thiserror::Error;

/// Boltzmann constant in kJ/(mol K).
pub const BOLTZMANN_KJ_PER_MOL_K: f64 = 0.008314462618;

pub const DEFAULT_TORSION_DIVISIONS: usize = 360;
/// Sterics cutoff in nm.
pub const DEFAULT_STERICS_CUTOFF: f64 = 0.9;

#[derive(Debug, Error, PartialEq, Clone)]
pub enum ConfigError {
    #[error("Missing required parameter: {0}")]
    MissingParameter(&'static str),
    #[error("Invalid value for parameter '{name}': {reason}")]
    InvalidParameter { name: &'static str, reason: String },
}

/// Inverse temperature `1/(k_B T)` in mol/kJ for a temperature in kelvin.
pub fn beta_from_temperature(temperature: f64) -> f64 {
    1.0 / (BOLTZMANN_KJ_PER_MOL_K * temperature)
}

#[derive(Debug, Clone, PartialEq)]
pub struct StageOutputConfig {
    /// Files are written as `<prefix>-<n>-<direction>-<kind>.pdb`.
    pub prefix: PathBuf,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GeometryConfig {
    pub use_sterics: bool,
    pub n_torsion_divisions: usize,
    /// Nonbonded cutoff for growth sterics, in nm.
    pub sterics_cutoff: f64,
    pub stage_output: Option<StageOutputConfig>,
    pub record_pmfs: bool,
}

impl Default for GeometryConfig {
    fn default() -> Self {
        Self {
            use_sterics: false,
            n_torsion_divisions: DEFAULT_TORSION_DIVISIONS,
            sterics_cutoff: DEFAULT_STERICS_CUTOFF,
            stage_output: None,
            record_pmfs: false,
        }
    }
}

#[derive(Default)]
pub struct GeometryConfigBuilder {
    use_sterics: Option<bool>,
    n_torsion_divisions: Option<usize>,
    sterics_cutoff: Option<f64>,
    stage_output_prefix: Option<PathBuf>,
    record_pmfs: Option<bool>,
}

impl GeometryConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn use_sterics(mut self, enabled: bool) -> Self {
        self.use_sterics = Some(enabled);
        self
    }
    pub fn n_torsion_divisions(mut self, n: usize) -> Self {
        self.n_torsion_divisions = Some(n);
        self
    }
    pub fn sterics_cutoff(mut self, cutoff_nm: f64) -> Self {
        self.sterics_cutoff = Some(cutoff_nm);
        self
    }
    pub fn stage_output_prefix(mut self, prefix: PathBuf) -> Self {
        self.stage_output_prefix = Some(prefix);
        self
    }
    pub fn record_pmfs(mut self, enabled: bool) -> Self {
        self.record_pmfs = Some(enabled);
        self
    }

    pub fn build(self) -> Result<GeometryConfig, ConfigError> {
        let defaults = GeometryConfig::default();

        let n_torsion_divisions = self
            .n_torsion_divisions
            .unwrap_or(defaults.n_torsion_divisions);
        if n_torsion_divisions == 0 {
            return Err(ConfigError::InvalidParameter {
                name: "n_torsion_divisions",
                reason: "must be at least 1".to_string(),
            });
        }

        let sterics_cutoff = self.sterics_cutoff.unwrap_or(defaults.sterics_cutoff);
        if !(sterics_cutoff.is_finite() && sterics_cutoff > 0.0) {
            return Err(ConfigError::InvalidParameter {
                name: "sterics_cutoff",
                reason: format!("must be a positive distance in nm, got {}", sterics_cutoff),
            });
        }

        Ok(GeometryConfig {
            use_sterics: self.use_sterics.unwrap_or(defaults.use_sterics),
            n_torsion_divisions,
            sterics_cutoff,
            stage_output: self
                .stage_output_prefix
                .map(|prefix| StageOutputConfig { prefix }),
            record_pmfs: self.record_pmfs.unwrap_or(defaults.record_pmfs),
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProposeConfig {
    /// Temperature in kelvin.
    pub temperature: f64,
    pub compute_reverse: bool,
    pub geometry: GeometryConfig,
}

impl ProposeConfig {
    pub fn beta(&self) -> f64 {
        beta_from_temperature(self.temperature)
    }
}

#[derive(Default)]
pub struct ProposeConfigBuilder {
    temperature: Option<f64>,
    compute_reverse: Option<bool>,
    geometry: Option<GeometryConfig>,
}

impl ProposeConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn temperature(mut self, kelvin: f64) -> Self {
        self.temperature = Some(kelvin);
        self
    }
    pub fn compute_reverse(mut self, enabled: bool) -> Self {
        self.compute_reverse = Some(enabled);
        self
    }
    pub fn geometry(mut self, geometry: GeometryConfig) -> Self {
        self.geometry = Some(geometry);
        self
    }

    pub fn build(self) -> Result<ProposeConfig, ConfigError> {
        let temperature = self
            .temperature
            .ok_or(ConfigError::MissingParameter("temperature"))?;
        if !(temperature.is_finite() && temperature > 0.0) {
            return Err(ConfigError::InvalidParameter {
                name: "temperature",
                reason: format!("must be a positive temperature in K, got {}", temperature),
            });
        }
        Ok(ProposeConfig {
            temperature,
            compute_reverse: self.compute_reverse.unwrap_or(true),
            geometry: self.geometry.unwrap_or_default(),
        })
    }
}
