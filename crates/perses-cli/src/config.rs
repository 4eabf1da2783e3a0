use crate::cli::{ProposeArgs, StericsFlags};
use crate::error::{CliError, Result};
use perses::engine::config as core_config;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const DEFAULT_TEMPERATURE: f64 = 300.0;

#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields)]
struct PartialGeometryConfig {
    #[serde(rename = "use-sterics")]
    use_sterics: Option<bool>,
    #[serde(rename = "torsion-divisions")]
    torsion_divisions: Option<usize>,
    #[serde(rename = "sterics-cutoff")]
    sterics_cutoff: Option<f64>,
    #[serde(rename = "stage-pdb-prefix")]
    stage_pdb_prefix: Option<PathBuf>,
    #[serde(rename = "record-pmfs")]
    record_pmfs: Option<bool>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields)]
pub struct PartialProposeConfig {
    temperature: Option<f64>,
    #[serde(rename = "compute-reverse")]
    compute_reverse: Option<bool>,
    geometry: Option<PartialGeometryConfig>,
}

impl PartialProposeConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        debug!("Loading configuration from file: {:?}", path);
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| CliError::FileParsing {
            path: path.to_path_buf(),
            source: e.into(),
        })
    }

    /// Resolves the final configuration.
    ///
    /// Precedence, highest first: dedicated CLI flags, `--set` values, the config file,
    /// built-in defaults.
    pub fn merge_with_cli(mut self, args: &ProposeArgs) -> Result<core_config::ProposeConfig> {
        self.apply_set_values(&args.set_values)?;

        let geometry_config = self.geometry.take().unwrap_or_default();

        let mut geometry = core_config::GeometryConfigBuilder::new();
        geometry = Self::merge_sterics(geometry, args.sterics, geometry_config.use_sterics);
        if let Some(n) = args.torsion_divisions.or(geometry_config.torsion_divisions) {
            geometry = geometry.n_torsion_divisions(n);
        }
        if let Some(cutoff) = args.sterics_cutoff.or(geometry_config.sterics_cutoff) {
            geometry = geometry.sterics_cutoff(cutoff);
        }
        if let Some(prefix) = args
            .stage_pdb_prefix
            .clone()
            .or(geometry_config.stage_pdb_prefix)
        {
            geometry = geometry.stage_output_prefix(prefix);
        }
        // A PMF dump needs the engine to keep every scan.
        let record_pmfs = args.pmf_csv.is_some() || geometry_config.record_pmfs.unwrap_or(false);
        geometry = geometry.record_pmfs(record_pmfs);

        let geometry = geometry
            .build()
            .map_err(|e| CliError::Config(e.to_string()))?;

        let compute_reverse = if args.no_reverse {
            false
        } else {
            self.compute_reverse.unwrap_or(true)
        };

        core_config::ProposeConfigBuilder::new()
            .temperature(
                args.temperature
                    .or(self.temperature)
                    .unwrap_or(DEFAULT_TEMPERATURE),
            )
            .compute_reverse(compute_reverse)
            .geometry(geometry)
            .build()
            .map_err(|e| CliError::Config(e.to_string()))
    }

    fn merge_sterics(
        builder: core_config::GeometryConfigBuilder,
        cli_flags: StericsFlags,
        file_val: Option<bool>,
    ) -> core_config::GeometryConfigBuilder {
        if cli_flags.sterics {
            builder.use_sterics(true)
        } else if cli_flags.no_sterics {
            builder.use_sterics(false)
        } else if let Some(val) = file_val {
            builder.use_sterics(val)
        } else {
            builder.use_sterics(false)
        }
    }

    fn apply_set_values(&mut self, set_values: &[String]) -> Result<()> {
        for kv_pair in set_values {
            let (key, value_str) = kv_pair.split_once('=').ok_or_else(|| {
                CliError::Config(format!(
                    "Invalid --set format: '{}'. Expected KEY=VALUE.",
                    kv_pair
                ))
            })?;

            match key {
                "temperature" => {
                    self.temperature = Some(parse_value(key, value_str, "float")?);
                }
                "compute-reverse" => {
                    self.compute_reverse = Some(parse_value(key, value_str, "boolean")?);
                }
                "geometry.use-sterics" => {
                    self.geometry
                        .get_or_insert_with(Default::default)
                        .use_sterics = Some(parse_value(key, value_str, "boolean")?);
                }
                "geometry.torsion-divisions" => {
                    self.geometry
                        .get_or_insert_with(Default::default)
                        .torsion_divisions = Some(parse_value(key, value_str, "integer")?);
                }
                "geometry.sterics-cutoff" => {
                    self.geometry
                        .get_or_insert_with(Default::default)
                        .sterics_cutoff = Some(parse_value(key, value_str, "float")?);
                }
                "geometry.stage-pdb-prefix" => {
                    self.geometry
                        .get_or_insert_with(Default::default)
                        .stage_pdb_prefix = Some(PathBuf::from(value_str));
                }
                "geometry.record-pmfs" => {
                    self.geometry
                        .get_or_insert_with(Default::default)
                        .record_pmfs = Some(parse_value(key, value_str, "boolean")?);
                }
                _ => {
                    return Err(CliError::Config(format!(
                        "Unsupported configuration key for --set: '{}'",
                        key
                    )));
                }
            }
        }
        Ok(())
    }
}

fn parse_value<T: std::str::FromStr>(key: &str, value: &str, kind: &str) -> Result<T> {
    value
        .parse()
        .map_err(|_| CliError::Config(format!("Invalid {} value for {}: {}", kind, key, value)))
}
