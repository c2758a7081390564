//! Soil temperature: explicit finite differences of the 1-D heat equation on a
//! regular grid, with interpolation to and from the irregular soil layers and
//! daily freeze/thaw flags (Parton 1978, 1984; Eitzinger et al. 2000).

use crate::boundary_cond::{SurfaceForcing, SurfaceTempParams};
use crate::errors::{FlowError, FlowResult};
use crate::soil_hydra::SoilProfile;
use log::{debug, error};
use nalgebra::DVector;
use serde::{Deserialize, Serialize};

pub const FREEZING_TEMP_C: f64 = -1.0;
const FREEZING_SWC_PER_CM: f64 = 0.13; // water below saturation that still freezes [cm/cm]
const MAX_STABLE_TEMP: f64 = 100.0; // [°C]
const SEC_PER_DAY: f64 = 86400.0;
const MAX_FOURIER: f64 = 0.5;
const MAX_SUBSTEPS: usize = 1024;
const GRID_EPSILON: f64 = 1e-9; // Relative tolerance on max_depth / delta_x

#[derive(Clone, Copy, Debug, PartialEq, Deserialize, Serialize)]
pub struct SoilTempParams {
    #[serde(default)]
    pub surface: SurfaceTempParams,
    pub cs_param1: f64,    // Thermal conductivity at wilting point [W/(cm·K)]
    pub cs_param2: f64,    // Conductivity gain from wilting point to field capacity
    pub sh_param: f64,     // Specific heat of the dry soil relative to water [-]
    pub t_soil_const: f64, // Temperature at the bottom of the grid [°C]
    pub delta_x: f64,      // Regular grid spacing [cm]
    pub max_depth: f64,    // Depth of the constant-temperature boundary [cm]
    #[serde(default = "default_adjust")]
    pub adjust_time_step: bool, // Split the day when the explicit step would be unstable
}

fn default_adjust() -> bool {
    true
}

impl Default for SoilTempParams {
    fn default() -> Self {
        SoilTempParams {
            surface: SurfaceTempParams::default(),
            cs_param1: 0.0007,
            cs_param2: 0.0003,
            sh_param: 0.18,
            t_soil_const: 4.15,
            delta_x: 15.0,
            max_depth: 990.0,
            adjust_time_step: true,
        }
    }
}

/// Overlap between the regular grid layers and the soil layers.
///
/// Regular layer `k` spans `[k·Δx, min((k+1)·Δx, max_depth)]`. The part of a
/// regular layer below the soil profile takes the values of the deepest soil
/// layer.
#[derive(Clone, Debug, PartialEq)]
pub struct InterpolationMap {
    pub delta_x: f64,
    pub max_depth: f64,
    pub regular_depths: Vec<f64>,         // Bottom depth of each regular layer [cm]
    pub overlaps: Vec<Vec<(usize, f64)>>, // (soil layer, overlap [cm]) per regular layer
    pub below_profile: Vec<f64>,          // Part of each regular layer below the profile [cm]
    pub layer_depths: Vec<f64>,           // Bottom depth of each soil layer [cm]
    layer_widths: Vec<f64>,
}

impl InterpolationMap {
    pub fn new(widths: &[f64], delta_x: f64, max_depth: f64) -> FlowResult<Self> {
        if widths.is_empty() {
            return Err(FlowError::Configuration("no soil layers to map".into()));
        }
        if delta_x <= 0.0 || max_depth < 2.0 * delta_x {
            return Err(FlowError::Configuration(format!(
                "temperature grid needs delta_x > 0 and max_depth >= 2 * delta_x, got {delta_x} and {max_depth}"
            )));
        }

        let layer_depths: Vec<f64> = widths
            .iter()
            .scan(0.0, |depth, w| {
                *depth += w;
                Some(*depth)
            })
            .collect();
        let profile_depth = layer_depths[layer_depths.len() - 1];
        if profile_depth > max_depth {
            return Err(FlowError::ProfileTooDeep {
                profile_depth,
                max_depth,
            });
        }

        let n_regular = regular_layer_count(max_depth, delta_x);
        let mut regular_depths = Vec::with_capacity(n_regular);
        let mut overlaps = Vec::with_capacity(n_regular);
        let mut below_profile = Vec::with_capacity(n_regular);

        for k in 0..n_regular {
            let top = k as f64 * delta_x;
            let bottom = if k + 1 == n_regular {
                max_depth
            } else {
                ((k + 1) as f64 * delta_x).min(max_depth)
            };
            regular_depths.push(bottom);

            let mut row = Vec::new();
            let mut layer_top = 0.0;
            for (j, &layer_bottom) in layer_depths.iter().enumerate() {
                let overlap = bottom.min(layer_bottom) - top.max(layer_top);
                if overlap > 0.0 {
                    row.push((j, overlap));
                }
                layer_top = layer_bottom;
            }
            overlaps.push(row);
            below_profile.push((bottom - top.max(profile_depth)).max(0.0));
        }

        debug!(
            "temperature grid: {n_regular} regular layers of {delta_x} cm over {} soil layers",
            widths.len()
        );

        Ok(InterpolationMap {
            delta_x,
            max_depth,
            regular_depths,
            overlaps,
            below_profile,
            layer_depths,
            layer_widths: widths.to_vec(),
        })
    }

    pub fn n_regular(&self) -> usize {
        self.regular_depths.len()
    }

    pub fn profile_depth(&self) -> f64 {
        self.layer_depths[self.layer_depths.len() - 1]
    }

    // True if the map was built for this layer geometry
    pub fn matches(&self, widths: &[f64]) -> bool {
        self.layer_widths == widths
    }

    // Overlap-weighted average of per-layer values for every regular layer
    pub fn layers_to_regular(&self, values: &[f64]) -> DVector<f64> {
        let deepest = values[values.len() - 1];
        DVector::from_iterator(
            self.n_regular(),
            (0..self.n_regular()).map(|k| {
                let mut sum = self.below_profile[k] * deepest;
                let mut span = self.below_profile[k];
                for &(j, overlap) in &self.overlaps[k] {
                    sum += overlap * values[j];
                    span += overlap;
                }
                sum / span
            }),
        )
    }

    // Overlap-weighted average of regular layer values for every soil layer
    pub fn regular_to_layers(&self, regular: &[f64]) -> Vec<f64> {
        let mut sums = vec![0.0; self.layer_widths.len()];
        for (k, row) in self.overlaps.iter().enumerate() {
            for &(j, overlap) in row {
                sums[j] += overlap * regular[k];
            }
        }
        sums.iter().zip(&self.layer_widths).map(|(s, w)| s / w).collect()
    }

    // Piecewise-linear temperature profile through the layer bottoms and the
    // constant deep temperature, flat above the first layer
    pub fn temperature_at(&self, depth: f64, layer_temps: &[f64], t_const: f64) -> f64 {
        if depth <= self.layer_depths[0] {
            return layer_temps[0];
        }

        let points = self
            .layer_depths
            .iter()
            .copied()
            .zip(layer_temps.iter().copied())
            .chain(std::iter::once((self.max_depth, t_const)));

        let mut prev = (self.layer_depths[0], layer_temps[0]);
        for (z, t) in points.skip(1) {
            if depth <= z && z > prev.0 {
                return prev.1 + (t - prev.1) * (depth - prev.0) / (z - prev.0);
            }
            prev = (z, t);
        }
        t_const
    }
}

// Number of regular layers; a ratio within rounding of an integer is not
// rounded up into a zero-width trailing layer
fn regular_layer_count(max_depth: f64, delta_x: f64) -> usize {
    let ratio = max_depth / delta_x;
    let nearest = ratio.round();
    if (ratio - nearest).abs() <= GRID_EPSILON * nearest.max(1.0) {
        nearest as usize
    } else {
        ratio.ceil() as usize
    }
}

/// Regular grid state. Node 0 is the soil surface, node `i` sits at the bottom
/// of regular layer `i - 1`, and the last node is held at the deep constant.
#[derive(Clone, Debug)]
pub struct TemperatureGrid {
    pub map: InterpolationMap,
    pub bulk_density: DVector<f64>, // Per regular layer [g/cm³]
    pub fieldcap: DVector<f64>,     // [cm/cm]
    pub wiltpt: DVector<f64>,       // [cm/cm]
    pub vwc: DVector<f64>,          // [cm/cm]
    pub yesterday: DVector<f64>,    // Node temperatures before the step [°C]
    pub today: DVector<f64>,        // Node temperatures after the step [°C]
}

impl TemperatureGrid {
    pub fn new(profile: &SoilProfile, params: &SoilTempParams) -> FlowResult<Self> {
        let widths = profile.widths();
        let map = InterpolationMap::new(&widths, params.delta_x, params.max_depth)?;

        let per_cm = |values: Vec<f64>| -> Vec<f64> { values.iter().zip(&widths).map(|(v, w)| v / w).collect() };
        let bulk_density = map.layers_to_regular(&profile.bulk_density());
        let fieldcap = map.layers_to_regular(&per_cm(profile.fieldcap()));
        let wiltpt = map.layers_to_regular(&per_cm(profile.wiltpt()));
        let vwc = map.layers_to_regular(&per_cm(profile.initial_swc()));

        let n_nodes = map.n_regular() + 1;
        Ok(TemperatureGrid {
            map,
            bulk_density,
            fieldcap,
            wiltpt,
            vwc,
            yesterday: DVector::zeros(n_nodes),
            today: DVector::zeros(n_nodes),
        })
    }

    pub fn n_nodes(&self) -> usize {
        self.yesterday.len()
    }

    // Interpolates today's water content and the current layer temperatures onto the grid
    pub fn load_day(&mut self, swc: &[f64], layer_temps: &[f64], surface_temp: f64, t_const: f64) {
        let vwc: Vec<f64> = swc.iter().zip(&self.map.layer_widths).map(|(s, w)| s / w).collect();
        self.vwc = self.map.layers_to_regular(&vwc);

        let last = self.n_nodes() - 1;
        self.yesterday[0] = surface_temp;
        for i in 1..last {
            self.yesterday[i] = self.map.temperature_at(self.map.regular_depths[i - 1], layer_temps, t_const);
        }
        self.yesterday[last] = t_const;
    }

    // dt/Δx² · k/(c·ρ) of every interior node, for a full day
    pub fn fourier_numbers(&self, params: &SoilTempParams) -> DVector<f64> {
        let m = self.n_nodes() - 2;
        let dx2 = params.delta_x * params.delta_x;
        DVector::from_iterator(
            m,
            (0..m).map(|k| {
                let range = self.fieldcap[k] - self.wiltpt[k];
                let pe = if range != 0.0 {
                    (self.vwc[k] - self.wiltpt[k]) / range
                } else {
                    0.0
                };
                let cs = params.cs_param1 + pe * params.cs_param2;
                let sh = self.vwc[k] + params.sh_param * (1.0 - self.vwc[k]);
                SEC_PER_DAY / dx2 * cs / (sh * self.bulk_density[k])
            }),
        )
    }

    // Sub-steps the day is split into so the explicit scheme stays stable
    fn substeps(&self, fourier: &DVector<f64>, params: &SoilTempParams) -> usize {
        let r_max = fourier.iter().fold(0.0_f64, |acc, &r| acc.max(r));
        let mut substeps = 1;
        if params.adjust_time_step && r_max.is_finite() {
            while r_max / substeps as f64 > MAX_FOURIER && substeps < MAX_SUBSTEPS {
                substeps *= 2;
            }
        }
        substeps
    }

    /// Advances `yesterday` by one day into `today` with Dirichlet conditions at
    /// both ends. Fails if any node, boundaries included, leaves (-100, 100) °C.
    pub fn solve(&mut self, params: &SoilTempParams) -> FlowResult<()> {
        let n = self.n_nodes();
        let m = n - 2;
        let fourier = self.fourier_numbers(params);
        let substeps = self.substeps(&fourier, params);
        let r = fourier / substeps as f64;

        let mut temps = self.yesterday.clone();
        for _ in 0..substeps {
            let laplacian = temps.rows(0, m) - temps.rows(1, m) * 2.0 + temps.rows(2, m);
            let change = r.component_mul(&laplacian);
            let mut interior = temps.rows_mut(1, m);
            interior += change;
        }
        self.today = temps;

        for i in 0..n {
            let t = self.today[i];
            if !(t > -MAX_STABLE_TEMP && t < MAX_STABLE_TEMP) {
                error!("soil temperature unstable at node {i}: {t} °C");
                return Err(FlowError::NumericInstability {
                    node: i,
                    temperature: t,
                });
            }
        }
        Ok(())
    }

    // Today's temperatures averaged back onto the soil layers
    pub fn layer_temperatures(&self) -> Vec<f64> {
        let regular: Vec<f64> = self.today.iter().skip(1).copied().collect();
        self.map.regular_to_layers(&regular)
    }
}

// Frozen when at or below -1 °C and close to saturation
pub fn set_frozen_unfrozen(temps: &[f64], swc: &[f64], swc_sat: &[f64], width: &[f64], frozen: &mut [bool]) {
    for i in 0..frozen.len() {
        frozen[i] = temps[i] <= FREEZING_TEMP_C && swc[i] > swc_sat[i] - width[i] * FREEZING_SWC_PER_CM;
    }
}

/// Soil temperature state of one simulation run.
#[derive(Clone, Debug)]
pub struct SoilTemperature {
    pub params: SoilTempParams,
    pub grid: TemperatureGrid,
    pub surface_temp: f64,
    pub stability_error: bool,
}

impl SoilTemperature {
    pub fn new(profile: &SoilProfile, params: SoilTempParams) -> FlowResult<Self> {
        let grid = TemperatureGrid::new(profile, &params)?;
        Ok(SoilTemperature {
            params,
            grid,
            surface_temp: 0.0,
            stability_error: false,
        })
    }

    // Rebuilds the grid if the layer geometry changed; true when rebuilt
    pub fn refresh_geometry(&mut self, profile: &SoilProfile) -> FlowResult<bool> {
        if self.grid.map.matches(&profile.widths()) {
            return Ok(false);
        }
        self.grid = TemperatureGrid::new(profile, &self.params)?;
        Ok(true)
    }

    /// One day of soil temperature: surface forcing, diffusion on the regular
    /// grid, layer temperatures and freeze/thaw flags. Returns the surface
    /// temperature. On instability `temps` and `frozen` are left untouched.
    pub fn step(
        &mut self,
        forcing: &SurfaceForcing,
        profile: &SoilProfile,
        swc: &[f64],
        temps: &mut [f64],
        frozen: &mut [bool],
    ) -> FlowResult<f64> {
        if temps.len() != profile.n_layers() {
            return Err(FlowError::LayerCount {
                expected: profile.n_layers(),
                got: temps.len(),
            });
        }

        self.surface_temp = self.params.surface.surface_temperature(forcing);
        self.grid.load_day(swc, temps, self.surface_temp, self.params.t_soil_const);

        if let Err(e) = self.grid.solve(&self.params) {
            self.stability_error = true;
            return Err(e);
        }

        temps.copy_from_slice(&self.grid.layer_temperatures());
        set_frozen_unfrozen(temps, swc, &profile.saturated(), &profile.widths(), frozen);
        Ok(self.surface_temp)
    }
}
