//! JSON configuration files for the 2D and 1D drivers.

use crate::{Error, Real, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// 2D driver configuration: `{"mesh": "<path>"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config2d {
    pub mesh: PathBuf,
}

/// 1D driver configuration: `{"element_order": k, "quadrature_order": q}`
/// with defaults `k = 1` and `q = k`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config1d {
    pub element_order: usize,
    pub quadrature_order: Option<usize>,
}

impl Default for Config1d {
    fn default() -> Self {
        Self {
            element_order: 1,
            quadrature_order: None,
        }
    }
}

impl Config1d {
    pub fn quadrature_order(&self) -> usize {
        self.quadrature_order.unwrap_or(self.element_order)
    }
}

fn read_json<C: for<'de> Deserialize<'de>>(path: &Path) -> Result<C> {
    let text = std::fs::read_to_string(path)
        .map_err(|err| Error::ConfigInvalid(format!("cannot read {}: {}", path.display(), err)))?;
    serde_json::from_str(&text)
        .map_err(|err| Error::ConfigInvalid(format!("cannot parse {}: {}", path.display(), err)))
}

pub fn load_2d(path: impl AsRef<Path>) -> Result<Config2d> {
    read_json(path.as_ref())
}

pub fn load_1d(path: impl AsRef<Path>) -> Result<Config1d> {
    read_json(path.as_ref())
}

/// Validates the model parameters shared by every driver.
pub fn validate_model<T: Real>(radius: T, local_weight: T) -> Result<()> {
    if local_weight < T::zero() || local_weight > T::one() {
        return Err(Error::ConfigInvalid(
            "local weight p1 must lie in [0, 1]".to_string(),
        ));
    }
    if radius < T::zero() {
        return Err(Error::ConfigInvalid(
            "nonlocal radius must be nonnegative".to_string(),
        ));
    }
    Ok(())
}
