//! Runtime configuration
//!
//! Configuration can be controlled via:
//! 1. Explicit construction (`Config { .. }` or the builder methods)
//! 2. Environment variables, read by [`Config::from_env`] and `Default`
//!
//! | Variable | Meaning | Default |
//! |----------|---------|---------|
//! | `PROBTENSOR_SEED` | generator seed | `2023` |
//! | `PROBTENSOR_RTOL_<DTYPE>` | relative tolerance for a dtype | see [`ToleranceTable`] |
//! | `PROBTENSOR_ATOL_<DTYPE>` | absolute tolerance for a dtype | see [`ToleranceTable`] |
//! | `PROBTENSOR_DATA_HOME` | dataset cache root | `<cache dir>/probtensor/dataset` |

use std::collections::HashMap;
use std::path::PathBuf;

use tracing::warn;

use crate::error::{Result, TensorError};
use crate::tensor::DType;

pub const DEFAULT_SEED: u64 = 2023;

/// Relative/absolute tolerance pair used for numeric comparison
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tolerance {
    pub rtol: f64,
    pub atol: f64,
}

impl Tolerance {
    /// Exact comparison (integer dtypes)
    pub const EXACT: Tolerance = Tolerance { rtol: 0.0, atol: 0.0 };

    pub fn new(rtol: f64, atol: f64) -> Self {
        Self { rtol, atol }
    }
}

/// Per-dtype tolerance table
#[derive(Debug, Clone, PartialEq)]
pub struct ToleranceTable {
    entries: HashMap<DType, Tolerance>,
}

impl Default for ToleranceTable {
    fn default() -> Self {
        let mut entries = HashMap::new();
        entries.insert(DType::Float32, Tolerance::new(1e-3, 0.0));
        entries.insert(DType::Float64, Tolerance::new(1e-5, 0.0));
        Self { entries }
    }
}

impl ToleranceTable {
    /// Tolerance for `dtype`; dtypes without an entry compare exactly
    pub fn get(&self, dtype: DType) -> Tolerance {
        self.entries.get(&dtype).copied().unwrap_or(Tolerance::EXACT)
    }

    pub fn rtol(&self, dtype: DType) -> f64 {
        self.get(dtype).rtol
    }

    pub fn atol(&self, dtype: DType) -> f64 {
        self.get(dtype).atol
    }

    pub fn set(&mut self, dtype: DType, tolerance: Tolerance) {
        self.entries.insert(dtype, tolerance);
    }
}

/// Crate-wide configuration
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Seed for the thread-local generator
    pub seed: u64,
    /// Numeric comparison tolerances
    pub tolerances: ToleranceTable,
    /// Root directory for dataset caches
    pub data_home: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env().unwrap_or_else(|err| {
            warn!(%err, "ignoring invalid environment configuration");
            Self::builtin()
        })
    }
}

impl Config {
    /// Defaults without consulting the environment
    pub fn builtin() -> Self {
        let data_home = dirs::cache_dir()
            .unwrap_or_else(std::env::temp_dir)
            .join("probtensor")
            .join("dataset");

        Self {
            seed: DEFAULT_SEED,
            tolerances: ToleranceTable::default(),
            data_home,
        }
    }

    /// Read overrides from the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Read overrides through an arbitrary variable lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::builtin();

        if let Some(value) = lookup("PROBTENSOR_SEED") {
            config.seed = parse_var("PROBTENSOR_SEED", &value)?;
        }

        for dtype in [DType::Float32, DType::Float64, DType::Int32, DType::Int64] {
            let mut tolerance = config.tolerances.get(dtype);
            let suffix = dtype.name().to_uppercase();

            let rtol_var = format!("PROBTENSOR_RTOL_{suffix}");
            if let Some(value) = lookup(&rtol_var) {
                tolerance.rtol = parse_var(&rtol_var, &value)?;
            }
            let atol_var = format!("PROBTENSOR_ATOL_{suffix}");
            if let Some(value) = lookup(&atol_var) {
                tolerance.atol = parse_var(&atol_var, &value)?;
            }

            if tolerance != config.tolerances.get(dtype) {
                config.tolerances.set(dtype, tolerance);
            }
        }

        if let Some(value) = lookup("PROBTENSOR_DATA_HOME") {
            config.data_home = PathBuf::from(value);
        }

        Ok(config)
    }

    /// Create a config with a specific seed
    pub fn with_seed(seed: u64) -> Self {
        Self {
            seed,
            ..Self::builtin()
        }
    }
}

fn parse_var<T: std::str::FromStr>(var: &str, value: &str) -> Result<T> {
    value.trim().parse().map_err(|_| TensorError::InvalidConfig {
        var: var.to_string(),
        value: value.to_string(),
    })
}
