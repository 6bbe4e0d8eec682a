//! Configuration management for gridprop.
//!
//! This module handles the layered configuration system with the following precedence:
//! 1. Command-line arguments (highest priority)
//! 2. Environment variables
//! 3. JSON config file
//! 4. Default values (lowest priority)

use clap::Parser;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::cache::{SCALAR_CACHE_ENTRIES, VECTOR_CACHE_ENTRIES};
use crate::error::{GridPropError, Result};
use crate::source::SourceRequest;

/// Command-line arguments for gridprop
#[derive(Parser, Debug)]
#[command(name = "gridprop")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to the NetCDF data file
    pub data_file: PathBuf,

    /// Variable to sample; repeat for the components of a vector property
    #[arg(short = 'v', long = "var")]
    pub vars: Vec<String>,

    /// Property kind whose conventional variable names are looked up
    /// (current, wind, water_temperature, salinity, ice_concentration)
    #[arg(short, long)]
    pub kind: Option<String>,

    /// Separate file holding the grid coordinates
    #[arg(short, long, env = "GRIDPROP_GRID_FILE")]
    pub grid_file: Option<PathBuf>,

    /// Longitude of the query point
    #[arg(long, allow_hyphen_values = true)]
    pub lon: f64,

    /// Latitude of the query point
    #[arg(long, allow_hyphen_values = true)]
    pub lat: f64,

    /// Depth of the query point, positive downward
    #[arg(long)]
    pub depth: Option<f64>,

    /// Query time, e.g. 2016-01-01T06:00:00 (defaults to the first time step)
    #[arg(short, long)]
    pub time: Option<String>,

    /// Units to convert results to
    #[arg(short, long)]
    pub units: Option<String>,

    /// Allow query times outside the time axis
    #[arg(long)]
    pub extrapolate: bool,

    /// Value substituted for masked results
    #[arg(long, allow_hyphen_values = true)]
    pub fill_value: Option<f64>,

    /// Disable result caching
    #[arg(long)]
    pub no_memoize: bool,

    /// Read whole variables at startup instead of one time step per query
    #[arg(long)]
    pub load_all: bool,

    /// Path to JSON configuration file
    #[arg(short, long, env = "GRIDPROP_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "GRIDPROP_LOG_LEVEL")]
    pub log_level: Option<String>,
}

/// Interpolation behavior
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterpolationConfig {
    /// Cache query results
    #[serde(default = "default_memoize")]
    pub memoize: bool,

    /// Hold the nearest endpoint for times outside the axis
    #[serde(default)]
    pub extrapolate: bool,

    /// Value substituted for masked results
    #[serde(default)]
    pub fill_value: f64,

    /// Read whole variables when a property is built
    #[serde(default)]
    pub load_all: bool,
}

/// Result cache sizing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Entries kept by each scalar property
    #[serde(default = "default_scalar_entries")]
    pub scalar_entries: usize,

    /// Entries kept by each vector property
    #[serde(default = "default_vector_entries")]
    pub vector_entries: usize,
}

/// Complete configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub interpolation: InterpolationConfig,

    #[serde(default)]
    pub cache: CacheConfig,

    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Config {
    /// Load configuration from all sources with proper precedence
    pub fn load() -> Result<(Self, Args)> {
        let args = Args::parse();
        let config = Self::from_args(&args)?;
        Ok((config, args))
    }

    /// Layer the config file and command-line overrides over the defaults
    pub fn from_args(args: &Args) -> Result<Self> {
        let mut config = Config::default();

        if let Some(config_path) = &args.config {
            let json_config = Self::load_from_file(config_path)?;
            config.merge(json_config);
        }

        if args.extrapolate {
            config.interpolation.extrapolate = true;
        }
        if args.no_memoize {
            config.interpolation.memoize = false;
        }
        if args.load_all {
            config.interpolation.load_all = true;
        }
        if let Some(fill_value) = args.fill_value {
            config.interpolation.fill_value = fill_value;
        }
        if let Some(log_level) = &args.log_level {
            config.log_level = log_level.clone();
        }

        Ok(config)
    }

    /// Load configuration from a JSON file
    fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Merge another config into this one (other takes precedence)
    fn merge(&mut self, other: Config) {
        self.interpolation = other.interpolation;
        self.cache = other.cache;
        self.log_level = other.log_level;
    }

    /// Apply the property settings to a source request
    pub fn apply(&self, request: SourceRequest) -> SourceRequest {
        request
            .fill_value(self.interpolation.fill_value)
            .memoize(self.interpolation.memoize)
            .load_all(self.interpolation.load_all)
            .cache_entries(self.cache.scalar_entries)
            .vector_cache_entries(self.cache.vector_entries)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        match self.log_level.as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => {
                return Err(GridPropError::Config {
                    message: format!(
                        "Invalid log level: {}. Must be one of: trace, debug, info, warn, error",
                        self.log_level
                    ),
                });
            }
        }

        if self.cache.scalar_entries == 0 || self.cache.vector_entries == 0 {
            return Err(GridPropError::Config {
                message: "Cache sizes must be at least 1".to_string(),
            });
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            interpolation: InterpolationConfig::default(),
            cache: CacheConfig::default(),
            log_level: default_log_level(),
        }
    }
}

impl Default for InterpolationConfig {
    fn default() -> Self {
        Self {
            memoize: default_memoize(),
            extrapolate: false,
            fill_value: 0.0,
            load_all: false,
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            scalar_entries: default_scalar_entries(),
            vector_entries: default_vector_entries(),
        }
    }
}

// Default value functions for serde
fn default_memoize() -> bool {
    true
}

fn default_scalar_entries() -> usize {
    SCALAR_CACHE_ENTRIES
}

fn default_vector_entries() -> usize {
    VECTOR_CACHE_ENTRIES
}

fn default_log_level() -> String {
    "info".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn args(extra: &[&str]) -> Args {
        let mut argv = vec!["gridprop", "model.nc", "--lon", "-70.5", "--lat", "42"];
        argv.extend_from_slice(extra);
        Args::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.interpolation.memoize);
        assert!(!config.interpolation.extrapolate);
        assert_eq!(config.interpolation.fill_value, 0.0);
        assert_eq!(config.cache.scalar_entries, 4);
        assert_eq!(config.cache.vector_entries, 8);
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn test_parse_args() {
        let args = args(&["-v", "u", "-v", "v", "--depth", "10", "--extrapolate"]);
        assert_eq!(args.vars, vec!["u", "v"]);
        assert_eq!(args.lon, -70.5);
        assert_eq!(args.depth, Some(10.0));

        let config = Config::from_args(&args).unwrap();
        assert!(config.interpolation.extrapolate);
        assert!(config.interpolation.memoize);
    }

    #[test]
    fn test_args_override_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"interpolation": {{"fill_value": -1.0}}, "cache": {{"scalar_entries": 2}}, "log_level": "debug"}}"#
        )
        .unwrap();
        let path = file.path().to_str().unwrap().to_string();

        let config = Config::from_args(&args(&["--config", &path])).unwrap();
        assert_eq!(config.interpolation.fill_value, -1.0);
        assert_eq!(config.cache.scalar_entries, 2);
        assert_eq!(config.cache.vector_entries, 8);
        assert_eq!(config.log_level, "debug");

        let config =
            Config::from_args(&args(&["--config", &path, "--fill-value", "-99", "--no-memoize"])).unwrap();
        assert_eq!(config.interpolation.fill_value, -99.0);
        assert!(!config.interpolation.memoize);
    }

    #[test]
    fn test_apply_to_request() {
        let mut config = Config::default();
        config.interpolation.fill_value = -5.0;
        config.cache.vector_entries = 3;
        let request = config.apply(SourceRequest::new("model.nc"));
        assert_eq!(request.fill_value, -5.0);
        assert_eq!(request.memoize, Some(true));
        assert_eq!(request.cache_entries, Some(4));
        assert_eq!(request.vector_cache_entries, Some(3));
        assert!(!request.load_all);

        let config = Config::from_args(&args(&["--load-all"])).unwrap();
        assert!(config.apply(SourceRequest::new("model.nc")).load_all);
    }

    #[test]
    fn test_config_validation() {
        assert!(Config::default().validate().is_ok());

        let mut config = Config::default();
        config.log_level = "invalid".to_string();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.cache.vector_entries = 0;
        assert!(config.validate().is_err());
    }
}
