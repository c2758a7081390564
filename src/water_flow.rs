//! Daily soil water flow: runs the interception, infiltration,
//! evapotranspiration, hydraulic redistribution and soil temperature engines
//! in their fixed order over one site's soil profile.

use crate::boundary_cond::SurfaceForcing;
use crate::config::ModelConfig;
use crate::daily_inputs::{DailyInputs, DailyWeather};
use crate::errors::{FlowError, FlowResult};
use crate::evapotranspiration::{
    es_t_partitioning, evap_from_surface, pot_soil_evap, pot_soil_evap_bs, pot_transp, remove_from_soil,
    transp_weighted_avg,
};
use crate::infiltration::{infiltrate_water_high, infiltrate_water_low};
use crate::interception::intercept_rain;
use crate::redistribution::hydraulic_redistribution;
use crate::runoff::{ponded_runoff, runon};
use crate::soil_hydra::SoilProfile;
use crate::soil_temp::SoilTemperature;
use crate::vegetation::{N_VEG_TYPES, VegParams, VegType, bare_ground_cover, site_biomass};
use log::{debug, info};

// Fluxes and end-of-day state of one simulated day
#[derive(Clone, Debug, Default)]
pub struct DailyFluxes {
    pub day: usize,
    pub intercepted_veg: [f64; N_VEG_TYPES],     // Rain held by each canopy [cm]
    pub intercepted_litter: f64,                 // [cm]
    pub runon: f64,                              // [cm]
    pub infiltration: f64,                       // Water offered to the top layer [cm]
    pub runoff: f64,                             // [cm]
    pub surface_evap: f64,                       // From canopy, litter and ponded water [cm]
    pub soil_evap: Vec<f64>,                     // Per layer [cm]
    pub transpiration: [Vec<f64>; N_VEG_TYPES],  // Per vegetation type and layer [cm]
    pub hydred: Vec<f64>,                        // Net hydraulic redistribution per layer [cm]
    pub drain: Vec<f64>,                         // Flux out of the bottom of each layer [cm]
    pub deep_drainage: f64,                      // [cm]
    pub aet: f64,                                // [cm]
    pub surface_temp: f64,                       // [°C]
    pub swc: Vec<f64>,                           // [cm]
    pub temperature: Vec<f64>,                   // [°C]
    pub frozen: Vec<bool>,
    pub standing_water: f64,                     // [cm]
}

/// Water and temperature state of one simulated site.
#[derive(Clone, Debug)]
pub struct SoilWaterModel {
    pub config: ModelConfig,
    pub profile: SoilProfile,
    veg_params: [VegParams; N_VEG_TYPES],
    regions: Vec<usize>,
    n_regions: usize,
    pub swc: Vec<f64>,                  // [cm]
    pub temperature: Vec<f64>,          // [°C]
    pub frozen: Vec<bool>,
    pub standing_water: f64,            // Ponded water [cm]
    pub veg_storage: [f64; N_VEG_TYPES], // Water held on each canopy [cm]
    pub litter_storage: f64,            // Water held by litter [cm]
    pub soil_temp: SoilTemperature,
}

impl SoilWaterModel {
    pub fn new(config: ModelConfig) -> FlowResult<Self> {
        config.validate()?;
        let profile = config.soil_profile()?;
        let bounds = config.transp_region_bounds();
        let regions = profile.transp_regions(&bounds);
        let soil_temp = SoilTemperature::new(&profile, config.soil_temperature)?;
        let n = profile.n_layers();

        info!(
            "initialized site with {n} layers, {} cm deep, {} transpiration regions",
            profile.depth(),
            bounds.len()
        );

        Ok(SoilWaterModel {
            veg_params: config.vegetation.to_array(),
            n_regions: bounds.len(),
            regions,
            swc: profile.initial_swc(),
            temperature: profile.initial_temperature(),
            frozen: vec![false; n],
            standing_water: 0.0,
            veg_storage: [0.0; N_VEG_TYPES],
            litter_storage: 0.0,
            soil_temp,
            profile,
            config,
        })
    }

    pub fn n_layers(&self) -> usize {
        self.profile.n_layers()
    }

    // Water stored in the soil and on the surface [cm]
    pub fn water_storage(&self) -> f64 {
        self.swc.iter().sum::<f64>() + self.standing_water + self.veg_storage.iter().sum::<f64>() + self.litter_storage
    }

    /// Simulates one day. A failed day leaves the temperature state of the
    /// previous day and should end the run.
    pub fn step_day(&mut self, day: usize, weather: &DailyWeather) -> FlowResult<DailyFluxes> {
        self.flow(day, weather).map_err(|e| FlowError::Day {
            day,
            source: Box::new(e),
        })
    }

    fn flow(&mut self, day: usize, weather: &DailyWeather) -> FlowResult<DailyFluxes> {
        let n = self.n_layers();
        let site = &self.config.site;
        let veg = &weather.vegetation;
        let fieldcap = self.profile.fieldcap();
        let saturated = self.profile.saturated();
        let swcmin = self.profile.min_swc();
        let impermeability = self.profile.impermeability();

        let mut out = DailyFluxes {
            day,
            soil_evap: vec![0.0; n],
            transpiration: std::array::from_fn(|_| vec![0.0; n]),
            hydred: vec![0.0; n],
            drain: vec![0.0; n],
            ..Default::default()
        };

        // Interception by canopies, then litter
        let intercepted = intercept_rain(weather.rain, &self.veg_params, veg);
        for k in 0..N_VEG_TYPES {
            self.veg_storage[k] += intercepted.veg[k];
        }
        self.litter_storage += intercepted.litter;
        out.intercepted_veg = intercepted.veg;
        out.intercepted_litter = intercepted.litter;

        // High-flux infiltration of throughfall, snowmelt, runon and yesterday's ponding
        let surface_water = intercepted.ppt_left + weather.snowmelt;
        out.runon = runon(surface_water, site.percent_runon);
        out.infiltration = surface_water + out.runon + self.standing_water;
        self.standing_water = 0.0;
        if out.infiltration > 0.0 {
            let high = infiltrate_water_high(
                &mut self.swc,
                &mut out.drain,
                out.infiltration,
                &fieldcap,
                &saturated,
                &impermeability,
            );
            self.standing_water = high.standing_water;
        }
        out.runoff = ponded_runoff(&mut self.standing_water, site.percent_runoff);

        // Surface pools evaporate first
        let mut peti = weather.pet;
        let mut aet = 0.0;
        let pools = self
            .veg_storage
            .iter_mut()
            .chain(std::iter::once(&mut self.litter_storage))
            .chain(std::iter::once(&mut self.standing_water));
        for pool in pools {
            if *pool > 0.0 && peti > 0.0 {
                let mut rate = peti;
                evap_from_surface(pool, &mut rate, &mut aet);
                peti -= rate;
                out.surface_evap += rate;
            }
        }

        // Potential soil evaporation and transpiration with the PET left
        let layers = &self.profile.layers;
        let n_evap = self.profile.n_evap_layers();
        let evap_rate = &self.config.evaporation;
        let mut soil_evap_rate = 0.0;
        let mut transp_rate = [0.0; N_VEG_TYPES];

        for veg_type in VegType::ALL {
            let k = veg_type.index();
            let params = &self.veg_params[k];
            let day_veg = &veg[k];
            if day_veg.cover <= 0.0 {
                continue;
            }

            let (fbse, fbst) = es_t_partitioning(day_veg.lai_live, params.es_tpartitioning_param);
            let swpavg = transp_weighted_avg(
                layers,
                &self.swc,
                &self.profile.transp_coeff(k),
                &self.regions,
                self.n_regions,
            );
            let rate = params.transp_rate.as_ref().unwrap_or(&self.config.transpiration);
            transp_rate[k] = day_veg.cover
                * pot_transp(
                    swpavg,
                    day_veg.biolive,
                    day_veg.biodead,
                    fbst,
                    peti,
                    rate,
                    &params.shade,
                    day_veg.co2_wue,
                );

            if n_evap > 0 {
                soil_evap_rate += day_veg.cover
                    * pot_soil_evap(
                        &layers[..n_evap],
                        &self.swc[..n_evap],
                        day_veg.total_agb,
                        fbse,
                        peti,
                        evap_rate,
                        params.es_limit,
                    );
            }
        }

        let bare = bare_ground_cover(veg);
        if bare > 0.0 && n_evap > 0 {
            soil_evap_rate += bare * pot_soil_evap_bs(&layers[..n_evap], &self.swc[..n_evap], peti, evap_rate);
        }

        let demand = soil_evap_rate + transp_rate.iter().sum::<f64>();
        if demand > peti && demand > 0.0 {
            let scale = peti.max(0.0) / demand;
            soil_evap_rate *= scale;
            transp_rate.iter_mut().for_each(|t| *t *= scale);
        }

        // Actual soil evaporation, then transpiration of each type
        if n_evap > 0 && soil_evap_rate > 0.0 {
            remove_from_soil(
                &mut self.swc[..n_evap],
                &mut out.soil_evap[..n_evap],
                &mut aet,
                &layers[..n_evap],
                &self.profile.evap_coeff()[..n_evap],
                soil_evap_rate,
                &swcmin[..n_evap],
                &self.frozen[..n_evap],
            );
        }
        for k in 0..N_VEG_TYPES {
            if transp_rate[k] > 0.0 {
                remove_from_soil(
                    &mut self.swc,
                    &mut out.transpiration[k],
                    &mut aet,
                    layers,
                    &self.profile.transp_coeff(k),
                    transp_rate[k],
                    &self.profile.swc_at_swp_crit(k),
                    &self.frozen,
                );
            }
        }

        // Hydraulic redistribution by each rooted type
        if site.hydraulic_redistribution {
            let wiltpt = self.profile.wiltpt();
            let mut hydred = vec![0.0; n];
            for veg_type in VegType::ALL {
                let k = veg_type.index();
                let Some(params) = self.veg_params[k].hydred.as_ref() else {
                    continue;
                };
                if veg[k].cover <= 0.0 {
                    continue;
                }
                hydraulic_redistribution(
                    &mut self.swc,
                    &wiltpt,
                    &self.profile.transp_coeff(k),
                    &mut hydred,
                    layers,
                    &self.frozen,
                    params,
                    veg[k].cover,
                );
                for (total, h) in out.hydred.iter_mut().zip(&hydred) {
                    *total += h;
                }
            }
        }

        // Slow drainage between events
        let low = infiltrate_water_low(
            &mut self.swc,
            &mut out.drain,
            site.slow_drain_coeff,
            site.slow_drain_depth,
            &fieldcap,
            &self.profile.widths(),
            &swcmin,
            &saturated,
            &impermeability,
            &self.frozen,
        );
        self.standing_water += low.standing_water;
        out.deep_drainage = out.drain[n - 1];

        // Soil temperature and freeze/thaw of today's water content
        let forcing = SurfaceForcing {
            air_temp: weather.air_temp,
            snow_depth: weather.snow_depth,
            biomass: site_biomass(veg),
            pet: weather.pet,
            aet,
        };
        out.surface_temp = self.soil_temp.step(
            &forcing,
            &self.profile,
            &self.swc,
            &mut self.temperature,
            &mut self.frozen,
        )?;

        out.aet = aet;
        out.swc = self.swc.clone();
        out.temperature = self.temperature.clone();
        out.frozen = self.frozen.clone();
        out.standing_water = self.standing_water;

        debug!(
            "day {day}: aet {:.4} cm, deep drainage {:.4} cm, surface {:.2} °C",
            out.aet, out.deep_drainage, out.surface_temp
        );
        Ok(out)
    }

    // Steps through every day of the inputs, stopping at the first failure
    pub fn run(&mut self, inputs: &DailyInputs) -> FlowResult<Vec<DailyFluxes>> {
        inputs.validate()?;
        (0..inputs.n_days())
            .map(|day| self.step_day(day, &inputs.day(day)))
            .collect()
    }
}
