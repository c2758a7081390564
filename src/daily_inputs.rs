use crate::errors::{FlowError, FlowResult};
use crate::vegetation::{N_VEG_TYPES, VegetationDay};
use serde::{Deserialize, Serialize};

// Drivers of a single day
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct DailyWeather {
    pub rain: f64,       // [cm/day]
    pub snowmelt: f64,   // [cm/day]
    pub pet: f64,        // Potential evapotranspiration [cm/day]
    pub air_temp: f64,   // Daily mean air temperature [°C]
    pub snow_depth: f64, // [cm]
    pub vegetation: [VegetationDay; N_VEG_TYPES],
}

// Daily weather and vegetation drivers, one entry per simulated day
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct DailyInputs {
    pub rain: Vec<f64>,       // Daily rainfall [cm/day]
    #[serde(default)]
    pub snowmelt: Vec<f64>,   // Daily snowmelt [cm/day]
    pub pet: Vec<f64>,        // Daily potential evapotranspiration [cm/day]
    pub air_temp: Vec<f64>,   // Daily mean air temperature [°C]
    #[serde(default)]
    pub snow_depth: Vec<f64>, // Daily snow depth [cm]
    #[serde(default)]
    pub vegetation: Vec<[VegetationDay; N_VEG_TYPES]>, // Daily vegetation state per type
}

impl DailyInputs {
    // Same weather and vegetation repeated for `n_days`
    pub fn constant(n_days: usize, weather: DailyWeather) -> Self {
        DailyInputs {
            rain: vec![weather.rain; n_days],
            snowmelt: vec![weather.snowmelt; n_days],
            pet: vec![weather.pet; n_days],
            air_temp: vec![weather.air_temp; n_days],
            snow_depth: vec![weather.snow_depth; n_days],
            vegetation: vec![weather.vegetation; n_days],
        }
    }

    // Simulation length, set by the rainfall series
    pub fn n_days(&self) -> usize {
        self.rain.len()
    }

    pub fn validate(&self) -> FlowResult<()> {
        let n = self.n_days();
        for (name, len) in [("pet", self.pet.len()), ("air_temp", self.air_temp.len())] {
            if len != n {
                return Err(FlowError::Configuration(format!(
                    "{name} has {len} days, rain has {n}"
                )));
            }
        }
        Ok(())
    }

    // Get value for a day; the last value carries forward, empty series read as 0
    pub(crate) fn get_daily_value(&self, day: usize, values: &[f64]) -> f64 {
        if day < values.len() {
            values[day]
        } else {
            values.last().copied().unwrap_or(0.0)
        }
    }

    // Vegetation for a day, carried forward like the other drivers; bare ground if none given
    pub(crate) fn get_vegetation(&self, day: usize) -> [VegetationDay; N_VEG_TYPES] {
        self.vegetation
            .get(day)
            .or(self.vegetation.last())
            .copied()
            .unwrap_or_default()
    }

    pub fn day(&self, day: usize) -> DailyWeather {
        DailyWeather {
            rain: self.get_daily_value(day, &self.rain),
            snowmelt: self.get_daily_value(day, &self.snowmelt),
            pet: self.get_daily_value(day, &self.pet),
            air_temp: self.get_daily_value(day, &self.air_temp),
            snow_depth: self.get_daily_value(day, &self.snow_depth),
            vegetation: self.get_vegetation(day),
        }
    }
}
