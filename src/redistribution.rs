use crate::soil_hydra::SoilLayer;
use serde::{Deserialize, Serialize};

const NEGLIGIBLE_CONDUCTANCE: f64 = 1e-12;

// Root hydraulic redistribution parameters of a vegetation type
#[derive(Clone, Copy, Debug, PartialEq, Deserialize, Serialize)]
pub struct HydRedParams {
    pub max_cond_root: f64, // Maximum radial soil-root conductance [cm/(bar·day)]
    pub swp50: f64,         // Potential at half conductance [bar]
    pub shape_cond: f64,    // Shape of the conductance curve [-]
}

impl HydRedParams {
    // Relative soil-root conductance at a potential, in [0, 1]
    pub fn relative_conductance(&self, swp: f64) -> f64 {
        (1.0 / (1.0 + (swp / self.swp50).powf(self.shape_cond))).clamp(0.0, 1.0)
    }
}

/// Moves water between layers through roots, from wet towards dry soil
/// (Ryel et al. 2002). Only pairs where at least one layer is wetter than its
/// wilting point and neither is frozen exchange water. The top layer is not
/// part of any exchange. `hydred` is overwritten with each layer's net gain
/// and `swc` is updated.
#[allow(clippy::too_many_arguments)]
pub fn hydraulic_redistribution(
    swc: &mut [f64],
    swcwp: &[f64],
    root_co: &[f64],
    hydred: &mut [f64],
    layers: &[SoilLayer],
    frozen: &[bool],
    params: &HydRedParams,
    scale: f64,
) {
    let n = swc.len();
    hydred[..n].fill(0.0);
    if n < 3 {
        return;
    }

    let swp: Vec<f64> = (0..n).map(|i| layers[i].swp(swc[i])).collect();
    let swpwp: Vec<f64> = (0..n).map(|i| layers[i].swp(swcwp[i])).collect();
    let rel_cond: Vec<f64> = swp.iter().map(|&p| params.relative_conductance(p)).collect();

    for i in 1..n {
        for j in i + 1..n {
            let wet_enough = swp[i] < swpwp[i] || swp[j] < swpwp[j];
            if !wet_enough || frozen[i] || frozen[j] {
                continue;
            }

            let cond = rel_cond[i].max(rel_cond[j]);
            let denom = 1.0 - root_co[i].max(root_co[j]);
            if cond <= NEGLIGIBLE_CONDUCTANCE || denom <= 0.0 {
                continue;
            }

            let flux = params.max_cond_root * 10.0 / 24.0
                * (swp[j] - swp[i])
                * cond
                * (root_co[i] * root_co[j] / denom);

            hydred[i] += flux * scale;
            hydred[j] -= flux * scale;
        }
    }

    for i in 1..n {
        swc[i] += hydred[i];
    }
}
