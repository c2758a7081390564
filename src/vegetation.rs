use crate::evapotranspiration::{ShadeParams, TanFunc};
use crate::interception::InterceptionCoeffs;
use crate::redistribution::HydRedParams;
use serde::{Deserialize, Serialize};

pub const N_VEG_TYPES: usize = 4;

// Plant functional types, in the order every per-type loop visits them
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum VegType {
    Tree,
    Shrub,
    Forb,
    Grass,
}

impl VegType {
    pub const ALL: [VegType; N_VEG_TYPES] = [VegType::Tree, VegType::Shrub, VegType::Forb, VegType::Grass];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        match self {
            VegType::Tree => "tree",
            VegType::Shrub => "shrub",
            VegType::Forb => "forb",
            VegType::Grass => "grass",
        }
    }

    // Trees intercept in proportion to LAI, the other types to vegetation cover
    pub(crate) fn intercepts_by_lai(self) -> bool {
        self == VegType::Tree
    }
}

// Static parameters of one vegetation type
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct VegParams {
    pub veg_intercept: InterceptionCoeffs,    // Canopy interception coefficients
    pub litt_intercept: InterceptionCoeffs,   // Litter interception coefficients
    pub es_tpartitioning_param: f64,          // LAI extinction of bare-soil evaporation [-]
    pub es_limit: f64,                        // Aboveground biomass that blocks soil evaporation [g/m²]
    pub swp_crit: f64,                        // Potential where transpiration stops [bar]
    pub shade: ShadeParams,                   // Shading of transpiration by dead biomass
    #[serde(default)]
    pub hydred: Option<HydRedParams>,         // Hydraulic redistribution, off if absent
    #[serde(default)]
    pub transp_rate: Option<TanFunc>,         // Overrides the site-wide transpiration response
}

// Daily vegetation state supplied by the phenology component
#[derive(Clone, Copy, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct VegetationDay {
    pub cover: f64,     // Fraction of the site covered by this type [-]
    pub lai_live: f64,  // Live leaf area index [m²/m²]
    pub vegcov: f64,    // Vegetation cover used for interception [-]
    pub biolive: f64,   // Live aboveground biomass [g/m²]
    pub biodead: f64,   // Standing dead biomass [g/m²]
    pub litter: f64,    // Litter [g/m²]
    pub total_agb: f64, // Total aboveground biomass incl. litter [g/m²]
    #[serde(default = "unit_multiplier")]
    pub co2_wue: f64,   // CO2 water-use efficiency multiplier [-]
}

fn unit_multiplier() -> f64 {
    1.0
}

// Cover of the site not occupied by any vegetation type
pub fn bare_ground_cover(vegetation: &[VegetationDay; N_VEG_TYPES]) -> f64 {
    (1.0 - vegetation.iter().map(|v| v.cover).sum::<f64>()).max(0.0)
}

// Cover-weighted aboveground biomass of the site [g/m²]
pub fn site_biomass(vegetation: &[VegetationDay; N_VEG_TYPES]) -> f64 {
    vegetation.iter().map(|v| v.cover * v.total_agb).sum()
}
