use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};

/// Geometry parameters of a 2D pore, named as in the pore parameter files.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoreParams {
    /// Radial extent of the domain.
    #[serde(rename = "R")]
    pub r: Option<f64>,
    /// Total height, split evenly above and below zero.
    #[serde(rename = "H")]
    pub h: Option<f64>,
    #[serde(rename = "Htop")]
    pub htop: Option<f64>,
    #[serde(rename = "Hbot")]
    pub hbot: Option<f64>,
    pub hmem: Option<f64>,
    pub zmem: Option<f64>,
    /// Cross-sections that split the pore into sections.
    pub cs: Vec<f64>,
    /// Cross-sections that split the protein boundary.
    pub proteincs: Vec<f64>,
    /// Molecule position; only the last coordinate is used.
    pub x0: Option<Vec<f64>>,
    #[serde(rename = "rMolecule")]
    pub r_molecule: Option<f64>,
    pub dim: Option<usize>,
    pub no_membrane: bool,
}

impl PoreParams {
    /// Parses parameters from TOML text.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Toml` on malformed input.
    pub fn from_toml(text: &str) -> Result<Self> {
        let params = toml::from_str(text).map_err(ConfigError::Toml)?;
        Ok(params)
    }

    /// Reads parameters from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Io` if the file cannot be read.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(ConfigError::Io)?;
        Self::from_toml(&text)
    }

    fn require(value: Option<f64>, name: &'static str) -> Result<f64> {
        value.ok_or_else(|| ConfigError::MissingParameter(name).into())
    }

    /// # Errors
    ///
    /// Returns `ConfigError::MissingParameter` if `R` is unset.
    pub fn radius(&self) -> Result<f64> {
        Self::require(self.r, "R")
    }

    /// `(Htop, Hbot)`, taken from `Htop`/`Hbot` if given, else `H / 2` each.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::MissingParameter` if neither form is set.
    pub fn heights(&self) -> Result<(f64, f64)> {
        if let Some(hbot) = self.hbot {
            return Ok((Self::require(self.htop, "Htop")?, hbot));
        }
        let h = Self::require(self.h, "H")?;
        Ok((0.5 * h, 0.5 * h))
    }

    /// `(zbot, ztop)` of the membrane slab.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::MissingParameter` if `hmem` or `zmem` is unset.
    pub fn membrane(&self) -> Result<(f64, f64)> {
        let hmem = Self::require(self.hmem, "hmem")?;
        let zmem = Self::require(self.zmem, "zmem")?;
        Ok((zmem - 0.5 * hmem, zmem + 0.5 * hmem))
    }

    /// `(z, r)` of the molecule, or `None` without a position.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::MissingParameter` if a position is given
    /// without `rMolecule`, or the position is empty.
    pub fn molecule(&self) -> Result<Option<(f64, f64)>> {
        let Some(x0) = &self.x0 else {
            return Ok(None);
        };
        let z = Self::require(x0.last().copied(), "x0")?;
        let r = Self::require(self.r_molecule, "rMolecule")?;
        Ok(Some((z, r)))
    }

    #[must_use]
    pub fn is_3d(&self) -> bool {
        self.dim == Some(3)
    }
}
