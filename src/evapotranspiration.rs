//! Potential bare-soil evaporation and transpiration, and their removal from
//! soil layers and surface water pools.

use crate::soil_hydra::SoilLayer;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

// Ceiling on the bare-soil share of potential evapotranspiration
pub const BSE_MAX: f64 = 0.995;

/// Arctangent response `y + (range/π)·atan(π·slope·(x − x_inflec))`.
pub fn tanfunc(z: f64, xinflec: f64, yinflec: f64, range: f64, slope: f64) -> f64 {
    yinflec + (range / PI) * (PI * slope * (z - xinflec)).atan()
}

#[derive(Clone, Copy, Debug, PartialEq, Deserialize, Serialize)]
pub struct TanFunc {
    pub xinflec: f64, // Inflection point on the x axis
    pub yinflec: f64, // Inflection point on the y axis
    pub range: f64,   // Distance between the asymptotes
    pub slope: f64,   // Slope at the inflection point
}

impl TanFunc {
    pub fn eval(&self, z: f64) -> f64 {
        tanfunc(z, self.xinflec, self.yinflec, self.range, self.slope)
    }

    // Water-limited rate factor with this curve's shift/shape/inflection/range
    pub fn water_rate(&self, swp: f64, petday: f64) -> f64 {
        watrate(swp, petday, self.xinflec, self.slope, self.yinflec, self.range)
    }
}

// Shading of transpiration by standing dead biomass
#[derive(Clone, Copy, Debug, PartialEq, Deserialize, Serialize)]
pub struct ShadeParams {
    pub scale: f64,      // Weight of the live/dead shading ratio [-]
    pub deadmax: f64,    // Dead biomass from which shading applies [g/m²]
    pub effects: TanFunc,
}

/// Splits PET into bare-soil evaporation and transpiration shares from live LAI.
pub fn es_t_partitioning(lai_live: f64, lai_param: f64) -> (f64, f64) {
    let fbse = (-lai_param * lai_live).exp().min(BSE_MAX);
    (fbse, 1.0 - fbse)
}

/// Rate factor in `[0, 1]` limiting potential rates by soil water potential.
///
/// The curve's inflection moves with PET; breakpoints at 0.2, 0.4 and 0.6 cm/day.
pub fn watrate(swp: f64, petday: f64, shift: f64, shape: f64, inflec: f64, range: f64) -> f64 {
    let par1 = if petday < 0.2 {
        3.0
    } else if petday < 0.4 {
        (0.4 - petday) * -10.0 + 5.0
    } else if petday < 0.6 {
        (0.6 - petday) * -15.0 + 8.0
    } else {
        8.0
    };
    let par2 = shift - swp;

    tanfunc(par2, par1, inflec, range, shape).clamp(0.0, 1.0)
}

// Evaporation-coefficient and width weighted potential of the evaporation layers
fn evap_weighted_swp(layers: &[SoilLayer], swc: &[f64]) -> Option<f64> {
    let mut sumwidth = 0.0;
    let mut avswp = 0.0;
    for (layer, &w) in layers.iter().zip(swc) {
        let x = layer.width * layer.evap_coeff;
        sumwidth += x;
        avswp += x * layer.swp(w);
    }
    (sumwidth > 0.0).then(|| avswp / sumwidth)
}

/// Potential bare-soil evaporation under a vegetation canopy [cm/day].
#[allow(clippy::too_many_arguments)]
pub fn pot_soil_evap(
    layers: &[SoilLayer],
    swc: &[f64],
    totagb: f64,
    fbse: f64,
    petday: f64,
    rate: &TanFunc,
    es_limit: f64,
) -> f64 {
    if totagb >= es_limit {
        return 0.0;
    }
    match evap_weighted_swp(layers, swc) {
        Some(avswp) => petday * rate.water_rate(avswp, petday) * (1.0 - totagb / es_limit) * fbse,
        None => 0.0,
    }
}

/// Potential evaporation from bare ground [cm/day].
pub fn pot_soil_evap_bs(layers: &[SoilLayer], swc: &[f64], petday: f64, rate: &TanFunc) -> f64 {
    match evap_weighted_swp(layers, swc) {
        Some(avswp) => petday * rate.water_rate(avswp, petday),
        None => 0.0,
    }
}

/// Potential transpiration of one vegetation type [cm/day].
#[allow(clippy::too_many_arguments)]
pub fn pot_transp(
    swpavg: f64,
    biolive: f64,
    biodead: f64,
    fbst: f64,
    petday: f64,
    rate: &TanFunc,
    shade: &ShadeParams,
    co2_wue: f64,
) -> f64 {
    if biolive <= 0.0 {
        return 0.0;
    }

    let shadeaf = if biodead >= shade.deadmax {
        let ratio = shade.effects.eval(biolive) / shade.effects.eval(biodead);
        (ratio * (1.0 - shade.scale) + shade.scale).min(1.0)
    } else {
        1.0
    };

    rate.water_rate(swpavg, petday) * shadeaf * petday * fbst * co2_wue
}

// Potential seen by roots: the wettest of the coefficient-weighted region averages
pub fn transp_weighted_avg(
    layers: &[SoilLayer],
    swc: &[f64],
    coeffs: &[f64],
    regions: &[usize],
    n_regions: usize,
) -> f64 {
    let mut swp_avg = 0.0;
    for r in 0..n_regions {
        let mut swp = 0.0;
        let mut sumco = 0.0;
        for i in (0..layers.len()).filter(|&i| regions[i] == r) {
            swp += coeffs[i] * layers[i].swp(swc[i]);
            sumco += coeffs[i];
        }
        if sumco > 0.0 {
            swp /= sumco;
        }
        swp_avg = if r == 0 { swp } else { swp.min(swp_avg) };
    }
    swp_avg
}

/// Removes up to `rate` cm of water from unfrozen layers, weighting each layer by
/// `coeff / swp`. Realized amounts go to `qty` and are added to `aet`.
#[allow(clippy::too_many_arguments)]
pub fn remove_from_soil(
    swc: &mut [f64],
    qty: &mut [f64],
    aet: &mut f64,
    layers: &[SoilLayer],
    coeff: &[f64],
    rate: f64,
    swcmin: &[f64],
    frozen: &[bool],
) {
    let n = layers.len();
    let swpfrac: Vec<f64> = (0..n)
        .map(|i| {
            let swp = layers[i].swp(swc[i]);
            if swp > 0.0 { coeff[i] / swp } else { 0.0 }
        })
        .collect();
    let sumswp: f64 = swpfrac.iter().sum();

    if sumswp <= 0.0 {
        return;
    }

    for i in 0..n {
        if frozen[i] {
            qty[i] = 0.0;
            continue;
        }
        let q = swpfrac[i] / sumswp * rate;
        qty[i] = q.min((swc[i] - swcmin[i]).max(0.0));
        swc[i] -= qty[i];
        *aet += qty[i];
    }
}

// Evaporates from a surface pool, reducing the rate to what the pool holds
pub fn evap_from_surface(water_pool: &mut f64, evap_rate: &mut f64, aet: &mut f64) {
    if *water_pool > *evap_rate {
        *water_pool -= *evap_rate;
        *aet += *evap_rate;
    } else {
        *evap_rate = *water_pool;
        *water_pool = 0.0;
        *aet += *evap_rate;
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::soil_hydra::tests::loam;
    use approx::{assert_abs_diff_eq, assert_relative_eq};

    pub(crate) fn shade() -> ShadeParams {
        ShadeParams {
            scale: 1.1,
            deadmax: 0.9,
            effects: TanFunc {
                xinflec: 0.4,
                yinflec: 0.3,
                range: 0.8,
                slope: 0.9,
            },
        }
    }

    fn swp_rate(range: f64) -> TanFunc {
        TanFunc {
            xinflec: 45.0,
            yinflec: 0.25,
            range,
            slope: 0.1,
        }
    }

    #[test]
    fn partitioning_sums_to_one() {
        let (fbse, fbst) = es_t_partitioning(0.002, 2.0);
        assert_relative_eq!(fbse, 0.995, epsilon = 1e-7);
        assert_relative_eq!(fbst, 0.005, epsilon = 1e-7);

        let (fbse, _) = es_t_partitioning(0.0012, 5.0);
        assert_relative_eq!(fbse, 0.994018, epsilon = 1e-6);

        for i in 0..200 {
            let lai = i as f64 * 0.05;
            for param in [0.0, 0.3, 1.0, 2.5] {
                let (fbse, fbst) = es_t_partitioning(lai, param);
                assert_eq!(fbse + fbst, 1.0);
                assert!((0.0..1.0).contains(&fbse));
            }
        }
    }

    #[test]
    fn watrate_regimes() {
        let rate = swp_rate(0.8);
        assert_abs_diff_eq!(rate.water_rate(0.8, 0.1), 0.630365, epsilon = 1e-6);
        assert_abs_diff_eq!(rate.water_rate(0.8, 0.3), 0.6298786, epsilon = 1e-6);
        assert_abs_diff_eq!(rate.water_rate(0.8, 0.5), 0.6285504, epsilon = 1e-6);
        assert_abs_diff_eq!(rate.water_rate(0.8, 0.8), 0.627666, epsilon = 1e-6);

        for swp in [0.0, 1.0, 10.0, 44.0, 100.0, 1e6] {
            let r = rate.water_rate(swp, 0.4);
            assert!((0.0..=1.0).contains(&r));
        }
    }

    #[test]
    fn transpiration_rates() {
        let rate = swp_rate(0.3);
        assert_eq!(pot_transp(0.8, -0.8, 0.2, 0.8, 0.1, &rate, &shade(), 2.1), 0.0);
        assert_eq!(pot_transp(0.8, 0.0, 0.2, 0.8, 0.1, &rate, &shade(), 2.1), 0.0);
        assert_abs_diff_eq!(pot_transp(0.8, 0.8, 0.2, 0.8, 0.1, &rate, &shade(), 2.1), 0.06596299, epsilon = 1e-7);
        assert_abs_diff_eq!(pot_transp(0.8, 0.8, 0.95, 0.8, 0.1, &rate, &shade(), 2.1), 0.06564905, epsilon = 1e-3);

        let mut strong_shade = shade();
        strong_shade.scale = 0.5;
        let shaded = pot_transp(0.8, 0.8, 0.95, 0.8, 0.1, &rate, &strong_shade, 2.1);
        assert!(shaded < 0.06596299);
    }

    #[test]
    fn soil_evaporation_limited_by_biomass() {
        let mut layer = loam(5.0);
        layer.evap_coeff = 1.0;
        let layers = vec![layer; 2];
        let swc = vec![1.2, 1.4];
        let rate = swp_rate(0.8);

        assert_eq!(pot_soil_evap(&layers, &swc, 999.0, 0.8, 0.3, &rate, 999.0), 0.0);
        assert_eq!(pot_soil_evap(&layers, &swc, 1500.0, 0.8, 0.3, &rate, 999.0), 0.0);

        let open = pot_soil_evap(&layers, &swc, 0.0, 0.8, 0.3, &rate, 999.0);
        let half = pot_soil_evap(&layers, &swc, 499.5, 0.8, 0.3, &rate, 999.0);
        assert!(open > 0.0 && open <= 0.3 * 0.8);
        assert_relative_eq!(half, open * 0.5, max_relative = 1e-12);

        let bare = pot_soil_evap_bs(&layers, &swc, 0.3, &rate);
        assert_relative_eq!(bare * 0.8, open, max_relative = 1e-12);

        let mut no_evap = layers.clone();
        no_evap.iter_mut().for_each(|l| l.evap_coeff = 0.0);
        assert_eq!(pot_soil_evap_bs(&no_evap, &swc, 0.3, &rate), 0.0);
    }

    #[test]
    fn weighted_potential_takes_wettest_region() {
        let layers = vec![loam(5.0), loam(5.0), loam(10.0)];
        let swc = vec![1.0, 1.3, 3.0];
        let coeffs = vec![0.3, 0.3, 0.4];

        let single = transp_weighted_avg(&layers, &swc, &coeffs, &[0, 0, 0], 1);
        let expected = (0.3 * layers[0].swp(1.0) + 0.3 * layers[1].swp(1.3) + 0.4 * layers[2].swp(3.0)) / 1.0;
        assert_relative_eq!(single, expected, max_relative = 1e-12);

        let split = transp_weighted_avg(&layers, &swc, &coeffs, &[0, 1, 1], 2);
        let upper = layers[0].swp(1.0);
        let lower = (0.3 * layers[1].swp(1.3) + 0.4 * layers[2].swp(3.0)) / 0.7;
        assert_relative_eq!(split, upper.min(lower), max_relative = 1e-12);
        assert!(split >= 0.0);
    }

    #[test]
    fn removal_respects_minimum() {
        let layers = vec![loam(5.0)];
        let mut swc = vec![0.11];
        let mut qty = vec![0.0];
        let mut aet = 0.33;
        remove_from_soil(&mut swc, &mut qty, &mut aet, &layers, &[0.033], 0.62, &[0.01], &[false]);
        assert_relative_eq!(qty[0], 0.1, epsilon = 1e-12);
        assert_relative_eq!(swc[0], 0.01, epsilon = 1e-12);
        assert_relative_eq!(aet, 0.43, epsilon = 1e-12);
    }

    #[test]
    fn removal_skips_frozen_and_zero_coefficients() {
        let layers = vec![loam(5.0), loam(5.0)];
        let mut swc = vec![1.5, 1.5];
        let mut qty = vec![0.0; 2];
        let mut aet = 0.2;

        remove_from_soil(&mut swc, &mut qty, &mut aet, &layers, &[0.0, 0.0], 0.5, &[0.1, 0.1], &[false, false]);
        assert_eq!(swc, vec![1.5, 1.5]);
        assert_eq!(aet, 0.2);

        remove_from_soil(&mut swc, &mut qty, &mut aet, &layers, &[0.5, 0.5], 0.4, &[0.1, 0.1], &[true, false]);
        assert_eq!(qty[0], 0.0);
        assert_eq!(swc[0], 1.5);
        assert_relative_eq!(qty[1], 0.2, epsilon = 1e-12);
        assert_relative_eq!(aet, 0.4, epsilon = 1e-12);
    }

    #[test]
    fn surface_pool_evaporation() {
        let (mut pool, mut rate, mut aet) = (1.0, 0.33, 0.53);
        evap_from_surface(&mut pool, &mut rate, &mut aet);
        assert_relative_eq!(aet, 0.86, epsilon = 1e-12);
        assert_relative_eq!(rate, 0.33, epsilon = 1e-12);
        assert_relative_eq!(pool, 0.67, epsilon = 1e-12);

        let (mut pool, mut rate, mut aet) = (0.1, 0.67, 0.0);
        evap_from_surface(&mut pool, &mut rate, &mut aet);
        assert_eq!(pool, 0.0);
        assert_eq!(rate, 0.1);
        assert_eq!(aet, 0.1);
    }
}
