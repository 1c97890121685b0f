use serde::{Deserialize, Serialize};

use crate::error::{FitError, Result};

/// Parameterization mode for the parameters of interest.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PoiMode {
    /// Signal strength multipliers `mu`, one per POI.
    Mu,
    /// No explicit POIs (pure nuisance-only model).
    None,
}

/// Driver flags that affect core fitter semantics.
///
/// Mirrors `spec.md` §6 "Driver flags": `chisqFit`, `externalCovariance`,
/// `binByBinStat`, `normalize`, `allowNegativePOI`, `POIMode`, `POIDefault`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FitterOptions {
    /// Use the chi-square likelihood instead of Poisson.
    pub chisq_fit: bool,
    /// Use an externally supplied data covariance inverse (chi-square only).
    pub external_covariance: bool,
    /// Enable per-bin Barlow-Beeston statistical nuisances.
    pub bin_by_bin_stat: bool,
    /// Rescale the expectation to match `sum(n_obs)` after BBB.
    pub normalize: bool,
    /// Allow POIs to go negative instead of squaring them.
    pub allow_negative_poi: bool,
    /// Parameterization mode for the parameters of interest.
    pub poi_mode: PoiMode,
    /// Default (pre-fit) value for every POI.
    pub poi_default: f64,
    /// Optional `scale * log(n_exp)` exponential transform.
    pub exponential_transform_scale: Option<f64>,
}

impl Default for FitterOptions {
    fn default() -> Self {
        Self {
            chisq_fit: false,
            external_covariance: false,
            bin_by_bin_stat: false,
            normalize: false,
            allow_negative_poi: false,
            poi_mode: PoiMode::Mu,
            poi_default: 1.0,
            exponential_transform_scale: None,
        }
    }
}

impl FitterOptions {
    /// Validates cross-option invariants, raising [`FitError::ConfigConflict`]
    /// on the combinations `spec.md` §3/§7 forbid.
    pub fn validate(&self) -> Result<()> {
        if self.external_covariance && !self.chisq_fit {
            return Err(FitError::ConfigConflict(
                "externalCovariance requires chisqFit".into(),
            ));
        }
        if self.external_covariance && self.bin_by_bin_stat {
            return Err(FitError::ConfigConflict(
                "binByBinStat is incompatible with an external data covariance".into(),
            ));
        }
        Ok(())
    }
}
