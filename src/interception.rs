use crate::vegetation::{N_VEG_TYPES, VegParams, VegType, VegetationDay};
use serde::{Deserialize, Serialize};

// Linear interception model: (a + b*x) + (c + d*x) * ppt
#[derive(Clone, Copy, Debug, PartialEq, Deserialize, Serialize)]
pub struct InterceptionCoeffs {
    pub a: f64, // [cm]
    pub b: f64, // [cm per unit x]
    pub c: f64, // [-]
    pub d: f64, // [1 per unit x]
}

impl InterceptionCoeffs {
    fn storage(&self, x: f64, ppt: f64) -> f64 {
        (self.a + self.b * x) + (self.c + self.d * x) * ppt
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Interception {
    pub intercepted: f64, // [cm]
    pub ppt_left: f64,    // Water passed on towards the soil [cm]
}

// Rain held by a canopy of cover or LAI `x`, bounded by 0.1*x before scaling by cover
pub fn veg_intercepted_water(ppt: f64, x: f64, scale: f64, coeffs: &InterceptionCoeffs) -> Interception {
    if x <= 0.0 || ppt <= 0.0 {
        return Interception {
            intercepted: 0.0,
            ppt_left: ppt,
        };
    }

    let intercepted = coeffs.storage(x, ppt).min(ppt).min(0.1 * x).max(0.0) * scale;

    Interception {
        intercepted,
        ppt_left: (ppt - intercepted).max(0.0),
    }
}

// Rain held by litter, bounded by 0.2*litter before scaling by cover
pub fn litter_intercepted_water(
    ppt_left: f64,
    litter: f64,
    scale: f64,
    coeffs: &InterceptionCoeffs,
) -> Interception {
    if litter <= 0.0 || scale <= 0.0 || ppt_left <= 0.0 {
        return Interception {
            intercepted: 0.0,
            ppt_left,
        };
    }

    let intercepted = coeffs.storage(litter, ppt_left).min(ppt_left).min(0.2 * litter).max(0.0) * scale;

    Interception {
        intercepted,
        ppt_left: (ppt_left - intercepted).max(0.0),
    }
}

// Interception of one day's rain by all canopies and then all litter layers
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CanopyInterception {
    pub veg: [f64; N_VEG_TYPES], // Held by each canopy [cm]
    pub litter: f64,             // Held by litter of all types [cm]
    pub ppt_left: f64,           // Reaching the soil surface [cm]
}

pub fn intercept_rain(
    ppt: f64,
    params: &[VegParams; N_VEG_TYPES],
    vegetation: &[VegetationDay; N_VEG_TYPES],
) -> CanopyInterception {
    let mut out = CanopyInterception {
        ppt_left: ppt,
        ..Default::default()
    };

    // Canopies deplete a shared pool, always in type order
    for veg_type in VegType::ALL {
        let k = veg_type.index();
        let day = &vegetation[k];
        if day.cover <= 0.0 {
            continue;
        }
        let x = if veg_type.intercepts_by_lai() {
            day.lai_live
        } else {
            day.vegcov
        };
        let result = veg_intercepted_water(out.ppt_left, x, day.cover, &params[k].veg_intercept);
        out.veg[k] = result.intercepted;
        out.ppt_left = result.ppt_left;
    }

    for veg_type in VegType::ALL {
        let k = veg_type.index();
        let day = &vegetation[k];
        let result = litter_intercepted_water(out.ppt_left, day.litter, day.cover, &params[k].litt_intercept);
        out.litter += result.intercepted;
        out.ppt_left = result.ppt_left;
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const COEFFS: InterceptionCoeffs = InterceptionCoeffs {
        a: 0.05,
        b: 0.02,
        c: 0.01,
        d: 0.003,
    };

    #[test]
    fn no_canopy_passes_rain_through() {
        for ppt in [0.0, 0.1, 1.5, 10.0] {
            let r = veg_intercepted_water(ppt, 0.0, 1.0, &COEFFS);
            assert_eq!(r.intercepted, 0.0);
            assert_eq!(r.ppt_left, ppt);
        }
    }

    #[test]
    fn no_rain_nothing_intercepted() {
        for x in [0.0, 0.5, 5.0] {
            let r = veg_intercepted_water(0.0, x, 1.0, &COEFFS);
            assert_eq!(r.intercepted, 0.0);
            assert_eq!(r.ppt_left, 0.0);
        }
    }

    #[test]
    fn canopy_storage_bounded() {
        // (0.05 + 0.02*0.5) + (0.01 + 0.0015)*2 = 0.083, capped at 0.1*0.5
        let r = veg_intercepted_water(2.0, 0.5, 1.0, &COEFFS);
        assert_relative_eq!(r.intercepted, 0.05, epsilon = 1e-12);
        assert_relative_eq!(r.ppt_left, 1.95, epsilon = 1e-12);

        // Small events are fully held
        let r = veg_intercepted_water(0.01, 3.0, 1.0, &COEFFS);
        assert_relative_eq!(r.intercepted, 0.01, epsilon = 1e-12);
        assert_eq!(r.ppt_left, 0.0);

        let r = veg_intercepted_water(2.0, 3.0, 0.5, &COEFFS);
        let expected = ((0.05 + 0.06) + (0.01 + 0.009) * 2.0) * 0.5;
        assert_relative_eq!(r.intercepted, expected, epsilon = 1e-12);
        assert_relative_eq!(r.intercepted + r.ppt_left, 2.0, epsilon = 1e-12);
    }

    #[test]
    fn cover_scales_bounded_storage() {
        // Storage 0.083 is capped at 0.1*0.5 first, then halved by cover
        let r = veg_intercepted_water(2.0, 0.5, 0.5, &COEFFS);
        assert_relative_eq!(r.intercepted, 0.025, epsilon = 1e-12);
        assert_relative_eq!(r.ppt_left, 1.975, epsilon = 1e-12);

        // Capped at ppt, then scaled
        let r = veg_intercepted_water(0.01, 3.0, 0.4, &COEFFS);
        assert_relative_eq!(r.intercepted, 0.004, epsilon = 1e-12);

        // Storage 0.0858 is capped at 0.2*0.2, then scaled
        let r = litter_intercepted_water(3.0, 0.2, 0.25, &COEFFS);
        assert_relative_eq!(r.intercepted, 0.01, epsilon = 1e-12);
        assert_relative_eq!(r.ppt_left, 2.99, epsilon = 1e-12);
    }

    #[test]
    fn litter_interception() {
        let r = litter_intercepted_water(1.0, 0.0, 1.0, &COEFFS);
        assert_eq!(r.intercepted, 0.0);
        assert_eq!(r.ppt_left, 1.0);

        let r = litter_intercepted_water(1.0, 1.0, 0.0, &COEFFS);
        assert_eq!(r.intercepted, 0.0);

        let r = litter_intercepted_water(0.0, 1.0, 1.0, &COEFFS);
        assert_eq!(r.intercepted, 0.0);

        // (0.05 + 0.02*0.2) + (0.01 + 0.0006)*3 = 0.0858, capped at 0.2*0.2
        let r = litter_intercepted_water(3.0, 0.2, 1.0, &COEFFS);
        assert_relative_eq!(r.intercepted, 0.04, epsilon = 1e-12);
        assert_relative_eq!(r.ppt_left, 2.96, epsilon = 1e-12);
    }

    #[test]
    fn shared_pool_conserves_water() {
        use crate::evapotranspiration::tests::shade;

        let params: [VegParams; N_VEG_TYPES] = std::array::from_fn(|_| VegParams {
            veg_intercept: COEFFS,
            litt_intercept: COEFFS,
            es_tpartitioning_param: 1.0,
            es_limit: 999.0,
            swp_crit: 30.0,
            shade: shade(),
            hydred: None,
            transp_rate: None,
        });
        let mut vegetation = [VegetationDay::default(); N_VEG_TYPES];
        for day in vegetation.iter_mut() {
            day.cover = 0.25;
            day.lai_live = 2.0;
            day.vegcov = 1.5;
            day.litter = 0.5;
        }

        let out = intercept_rain(0.8, &params, &vegetation);
        let held: f64 = out.veg.iter().sum::<f64>() + out.litter;
        assert_relative_eq!(held + out.ppt_left, 0.8, epsilon = 1e-12);
        assert!(out.veg.iter().all(|&w| w > 0.0));
        assert!(out.litter > 0.0);

        // The same canopy sees less rain when processed later
        assert!(out.veg[VegType::Shrub.index()] > out.veg[VegType::Grass.index()]);
    }
}
