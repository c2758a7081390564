use crate::errors::{FlowError, FlowResult};
use crate::evapotranspiration::TanFunc;
use crate::soil_hydra::{LayerConfig, MinWaterContent, SoilProfile};
use crate::soil_temp::SoilTempParams;
use crate::vegetation::{N_VEG_TYPES, VegParams, VegType};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

// Site-wide water flow parameters
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct SiteParams {
    pub slow_drain_coeff: f64, // Low-flux drainage coefficient [cm/day]
    pub slow_drain_depth: f64, // Decay of drainage below field capacity [-]
    #[serde(default)]
    pub percent_runoff: f64,   // Fraction of ponded water leaving the site daily [-]
    #[serde(default)]
    pub percent_runon: f64,    // Fraction of surface water added as runon [-]
    #[serde(default)]
    pub transp_region_bounds: Vec<usize>, // Exclusive lower layer bound of each transpiration region
    #[serde(default)]
    pub min_wc: MinWaterContent,
    #[serde(default = "enabled")]
    pub hydraulic_redistribution: bool,
}

fn enabled() -> bool {
    true
}

// Parameters of each vegetation type
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct VegetationSet {
    pub tree: VegParams,
    pub shrub: VegParams,
    pub forb: VegParams,
    pub grass: VegParams,
}

impl VegetationSet {
    pub fn get(&self, veg_type: VegType) -> &VegParams {
        match veg_type {
            VegType::Tree => &self.tree,
            VegType::Shrub => &self.shrub,
            VegType::Forb => &self.forb,
            VegType::Grass => &self.grass,
        }
    }

    // In type index order
    pub fn to_array(&self) -> [VegParams; N_VEG_TYPES] {
        VegType::ALL.map(|t| self.get(t).clone())
    }

    pub fn swp_crit(&self) -> [f64; N_VEG_TYPES] {
        VegType::ALL.map(|t| self.get(t).swp_crit)
    }
}

/// Complete parameter set of one simulated site.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct ModelConfig {
    pub site: SiteParams,
    #[serde(default)]
    pub soil_temperature: SoilTempParams,
    pub evaporation: TanFunc,   // Bare-soil evaporation response to potential
    pub transpiration: TanFunc, // Default transpiration response to potential
    pub layers: Vec<LayerConfig>,
    pub vegetation: VegetationSet,
}

impl ModelConfig {
    pub fn from_toml_str(toml_str: &str) -> FlowResult<Self> {
        let config: ModelConfig = toml::from_str(toml_str)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> FlowResult<Self> {
        let toml_str = fs::read_to_string(path)?;
        Self::from_toml_str(&toml_str)
    }

    pub fn validate(&self) -> FlowResult<()> {
        let site = &self.site;
        if self.layers.is_empty() {
            return Err(FlowError::Configuration("at least one soil layer is required".into()));
        }
        if !(0.0..=1.0).contains(&site.percent_runoff) || !(0.0..=1.0).contains(&site.percent_runon) {
            return Err(FlowError::Configuration(
                "percent_runoff and percent_runon must be within [0, 1]".into(),
            ));
        }
        if site.slow_drain_coeff < 0.0 {
            return Err(FlowError::Configuration("slow_drain_coeff must not be negative".into()));
        }
        if site.transp_region_bounds.windows(2).any(|w| w[0] >= w[1]) {
            return Err(FlowError::Configuration(
                "transp_region_bounds must be strictly increasing".into(),
            ));
        }
        if site.transp_region_bounds.iter().any(|&b| b == 0 || b > self.layers.len()) {
            return Err(FlowError::Configuration(format!(
                "transp_region_bounds must lie within 1..={}",
                self.layers.len()
            )));
        }
        Ok(())
    }

    pub fn soil_profile(&self) -> FlowResult<SoilProfile> {
        SoilProfile::new(&self.layers, self.site.min_wc, &self.vegetation.swp_crit())
    }

    // Region bounds, one region over the whole profile if none are configured
    pub fn transp_region_bounds(&self) -> Vec<usize> {
        if self.site.transp_region_bounds.is_empty() {
            vec![self.layers.len()]
        } else {
            self.site.transp_region_bounds.clone()
        }
    }
}
