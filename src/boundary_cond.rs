use serde::{Deserialize, Serialize};

// Surface temperature regimes, listed in order of precedence
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SurfaceRegime {
    UnderSnow, // Snowpack insulates the soil
    Shaded,    // Biomass at or above the limiter shades the surface
    Exposed,   // Sparse canopy, surface heated by unmet evaporative demand
}

// Weather and canopy conditions driving the soil surface temperature
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SurfaceForcing {
    pub air_temp: f64,   // Daily mean air temperature [°C]
    pub snow_depth: f64, // [cm]
    pub biomass: f64,    // Aboveground biomass [g/m²]
    pub pet: f64,        // Potential evapotranspiration [cm/day]
    pub aet: f64,        // Actual evapotranspiration so far today [cm/day]
}

// Surface temperature parameters (Parton 1978 style empirical fits)
#[derive(Clone, Copy, Debug, PartialEq, Deserialize, Serialize)]
pub struct SurfaceTempParams {
    pub bm_limiter: f64, // Biomass above which the canopy fully shades the surface [g/m²]
    pub t1_param1: f64,  // Heating by unmet evaporative demand [°C/(cm/day)]
    pub t1_param2: f64,  // Cooling by biomass above the limiter [°C]
    pub t1_param3: f64,  // Biomass scale of the cooling [g/m²]
}

impl Default for SurfaceTempParams {
    fn default() -> Self {
        SurfaceTempParams {
            bm_limiter: 300.0,
            t1_param1: 15.0,
            t1_param2: -4.0,
            t1_param3: 600.0,
        }
    }
}

impl SurfaceTempParams {
    pub fn regime(&self, forcing: &SurfaceForcing) -> SurfaceRegime {
        if forcing.snow_depth > 0.0 {
            SurfaceRegime::UnderSnow
        } else if forcing.biomass >= self.bm_limiter {
            SurfaceRegime::Shaded
        } else {
            SurfaceRegime::Exposed
        }
    }

    // Top boundary temperature of the heat equation [°C]
    pub fn surface_temperature(&self, forcing: &SurfaceForcing) -> f64 {
        match self.regime(forcing) {
            SurfaceRegime::UnderSnow => surface_temperature_under_snow(forcing.air_temp, forcing.snow_depth),
            SurfaceRegime::Shaded => {
                forcing.air_temp + self.t1_param2 * (forcing.biomass - self.bm_limiter) / self.t1_param3
            }
            SurfaceRegime::Exposed => {
                let unmet = if forcing.pet > 0.0 {
                    forcing.pet * (1.0 - forcing.aet / forcing.pet)
                } else {
                    0.0
                };
                forcing.air_temp + self.t1_param1 * unmet * (1.0 - forcing.biomass / self.bm_limiter)
            }
        }
    }
}

// Soil surface temperature under snow; insulation saturates beyond ~6.67 cm
pub fn surface_temperature_under_snow(air_temp_avg: f64, snow: f64) -> f64 {
    if snow == 0.0 {
        return 0.0;
    }
    let k_snow = (1.0 - 0.15 * snow).max(0.0);
    if air_temp_avg >= 0.0 {
        -2.0
    } else {
        0.3 * air_temp_avg * k_snow - 2.0
    }
}
