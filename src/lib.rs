pub mod boundary_cond;
pub mod config;
pub mod daily_inputs;
pub mod errors;
pub mod evapotranspiration;
pub mod infiltration;
pub mod interception;
pub mod redistribution;
pub mod runoff;
pub mod soil_hydra;
pub mod soil_temp;
pub mod vegetation;
pub mod water_flow;

pub use config::ModelConfig;
pub use daily_inputs::{DailyInputs, DailyWeather};
pub use errors::{FlowError, FlowResult};
pub use vegetation::{VegType, VegetationDay};
pub use water_flow::{DailyFluxes, SoilWaterModel};

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn it_works() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("config/site.toml");
        let config = ModelConfig::from_toml_file(path).unwrap();
        let mut model = SoilWaterModel::new(config).unwrap();

        let mut grass = VegetationDay {
            cover: 0.5,
            lai_live: 0.6,
            vegcov: 0.5,
            biolive: 80.0,
            biodead: 20.0,
            litter: 30.0,
            total_agb: 130.0,
            co2_wue: 1.0,
        };
        let mut inputs = DailyInputs::default();
        for day in 0..90 {
            let season = (day as f64 / 90.0 * std::f64::consts::PI).sin();
            inputs.rain.push(if day % 5 == 0 { 1.2 } else { 0.0 });
            inputs.pet.push(0.1 + 0.4 * season);
            inputs.air_temp.push(-5.0 + 25.0 * season);
            grass.biolive = 20.0 + 100.0 * season;
            let mut veg = [VegetationDay::default(); vegetation::N_VEG_TYPES];
            veg[VegType::Grass.index()] = grass;
            inputs.vegetation.push(veg);
        }

        let start = model.water_storage();
        let results = model.run(&inputs).unwrap();
        assert_eq!(results.len(), 90);

        let rain: f64 = inputs.rain.iter().sum();
        let lost: f64 = results.iter().map(|r| r.aet + r.deep_drainage + r.runoff).sum();
        let runon: f64 = results.iter().map(|r| r.runon).sum();
        assert!((model.water_storage() - start - (rain + runon - lost)).abs() < 1e-8);
        assert!(results.iter().all(|r| r.aet <= inputs.pet[r.day] + 1e-12));
    }
}
