use crate::errors::{FlowError, FlowResult};
use crate::vegetation::N_VEG_TYPES;
use log::{debug, warn};
use serde::{Deserialize, Serialize};

// Sentinel for "no valid value"
pub const SW_MISSING: f64 = 999.0;

const BARCONV: f64 = 1024.0; // cm of water per bar
const GRAVEL_DENSITY: f64 = 2.65; // [g/cm³]
const F_DELTA: f64 = 10.0 * f32::EPSILON as f64;

pub(crate) const SWP_FIELD_CAPACITY: f64 = 0.333; // [bar]
pub(crate) const SWP_WILTING_POINT: f64 = 15.0; // [bar]
const SWP_RESIDUAL: f64 = 30.0; // [bar], suction at residual water content

// Soil water retention curve of the matric (fine earth) fraction, Cosby et al. (1984)
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RetentionCurve {
    pub thetas: f64,    // Saturated matric water content [%]
    pub psis: f64,      // Saturated matric potential [cm]
    pub b: f64,         // Slope of the retention curve [-]
    pub b_inverse: f64, // 1 / b
}

impl RetentionCurve {
    pub fn from_texture(sand: f64, clay: f64) -> FlowResult<Self> {
        let thetas = -14.2 * sand - 3.7 * clay + 50.5;
        let psis = 10.0_f64.powf(-1.58 * sand - 0.63 * clay + 2.17);
        let b = -0.3 * sand + 15.7 * clay + 3.10;

        if b.abs() <= F_DELTA {
            return Err(FlowError::ZeroRetentionSlope { sand, clay });
        }

        Ok(RetentionCurve {
            thetas,
            psis,
            b,
            b_inverse: 1.0 / b,
        })
    }
}

// Saturated bulk water content [cm] from Saxton & Rawls (2006), organic matter assumed zero
pub fn saturated_swc(sand: f64, clay: f64, gravel: f64, width: f64) -> f64 {
    let theta33t = -0.251 * sand + 0.195 * clay + 0.452 * sand * clay + 0.299;
    let theta33 = theta33t + (1.283 * theta33t.powi(2) - 0.374 * theta33t - 0.015);

    let ts33t = 0.278 * sand + 0.034 * clay - 0.584 * sand * clay + 0.078;
    let ts33 = ts33t + (0.636 * ts33t - 0.107);

    width * (theta33 + ts33 - 0.097 * sand + 0.043) * (1.0 - gravel)
}

// Retention curve plus saturated bulk water content [cm] of a layer
pub fn derive_retention_parameters(
    gravel: f64,
    sand: f64,
    clay: f64,
    width: f64,
) -> FlowResult<(RetentionCurve, f64)> {
    let curve = RetentionCurve::from_texture(sand, clay)?;
    Ok((curve, saturated_swc(sand, clay, gravel, width)))
}

// Matric potential [bar] of a bulk water content [cm]
pub fn swc_to_potential(gravel: f64, swc_bulk: f64, layer: &SoilLayer) -> f64 {
    if swc_bulk >= SW_MISSING || swc_bulk <= 0.0 || gravel >= 1.0 || layer.width <= 0.0 {
        return 0.0;
    }

    let curve = &layer.retention;
    let theta = swc_bulk / layer.width * 100.0 / (1.0 - gravel); // matric [%]
    let ratio = (theta / curve.thetas).max(f64::MIN_POSITIVE);
    let swp = curve.psis / ratio.powf(curve.b) / BARCONV;

    if swp.is_finite() { swp } else { f64::MAX }
}

// Bulk volumetric water content [cm/cm] at a matric potential [bar]
pub fn potential_to_vwc(gravel: f64, swp_matric: f64, layer: &SoilLayer) -> f64 {
    if swp_matric <= 0.0 {
        return layer.retention.thetas * 0.01 * (1.0 - gravel);
    }

    let curve = &layer.retention;
    curve.thetas * (curve.psis / (swp_matric * BARCONV)).powf(curve.b_inverse) * 0.01 * (1.0 - gravel)
}

// Residual bulk volumetric water content, Rawls & Brakensiek (1985)
pub fn residual_vwc(sand: f64, clay: f64, porosity: f64, gravel: f64) -> f64 {
    if !(0.05..=0.6).contains(&clay) || !(0.05..=0.7).contains(&sand) {
        return SW_MISSING;
    }

    let s = sand * 100.0;
    let c = clay * 100.0;
    let p = porosity;

    let res = -0.0182482 + 0.00087269 * s + 0.00513488 * c + 0.02939286 * p
        - 0.00015395 * c.powi(2)
        - 0.0010827 * s * p
        - 0.00018233 * c.powi(2) * p.powi(2)
        + 0.00030703 * c.powi(2) * p
        - 0.0023584 * p.powi(2) * c;

    ((1.0 - gravel) * res).max(0.0)
}

// Bulk density of a layer [g/cm³] from matric density and gravel content
pub fn bulk_density(matric_density: f64, gravel: f64) -> f64 {
    matric_density * (1.0 - gravel) + gravel * GRAVEL_DENSITY
}

// How the lower limit of soil water content is set
#[derive(Clone, Copy, Debug, PartialEq, Deserialize, Serialize, Default)]
#[serde(tag = "method", content = "value", rename_all = "snake_case")]
pub enum MinWaterContent {
    #[default]
    Residual, // min(residual water content, water content at 30 bar)
    Potential(f64),  // water content at a fixed potential [bar]
    Volumetric(f64), // fixed bulk volumetric water content [cm/cm]
}

// Soil layer as read from the site configuration
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct LayerConfig {
    pub width: f64,                            // [cm]
    pub matric_density: f64,                   // [g/cm³]
    #[serde(default)]
    pub gravel: f64,                           // Gravel volume fraction [-]
    pub sand: f64,                             // Sand fraction of the matric soil [-]
    pub clay: f64,                             // Clay fraction of the matric soil [-]
    #[serde(default)]
    pub evap_coeff: f64,                       // Bare-soil evaporation coefficient [-]
    #[serde(default)]
    pub transp_coeff: [f64; N_VEG_TYPES],      // Transpiration coefficients per vegetation type [-]
    #[serde(default)]
    pub impermeability: f64,                   // [-]
    pub initial_temperature: f64,              // [°C]
    #[serde(default)]
    pub initial_swc: Option<f64>,              // [cm], field capacity if absent
}

// Soil layer with derived hydraulic properties
#[derive(Clone, Debug)]
pub struct SoilLayer {
    pub width: f64,          // [cm]
    pub depth: f64,          // Bottom depth of layer [cm]
    pub matric_density: f64, // [g/cm³]
    pub bulk_density: f64,   // [g/cm³]
    pub gravel: f64,
    pub sand: f64,
    pub clay: f64,
    pub evap_coeff: f64,
    pub transp_coeff: [f64; N_VEG_TYPES],
    pub impermeability: f64,
    pub retention: RetentionCurve,
    pub swc_saturated: f64,                  // [cm]
    pub swc_fieldcap: f64,                   // [cm]
    pub swc_wiltpt: f64,                     // [cm]
    pub swc_min: f64,                        // [cm]
    pub swc_at_swp_crit: [f64; N_VEG_TYPES], // [cm]
    pub swc_init: f64,                       // [cm]
    pub temp_init: f64,                      // [°C]
}

impl SoilLayer {
    pub fn from_config(config: &LayerConfig, top_depth: f64, min_wc: MinWaterContent) -> FlowResult<Self> {
        if config.width <= 0.0 {
            return Err(FlowError::Configuration(format!(
                "layer at {top_depth} cm has non-positive width {}",
                config.width
            )));
        }
        for (name, value) in [
            ("gravel", config.gravel),
            ("sand", config.sand),
            ("clay", config.clay),
            ("impermeability", config.impermeability),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(FlowError::Configuration(format!(
                    "layer at {top_depth} cm: {name}={value} is outside [0, 1]"
                )));
            }
        }

        let (retention, swc_saturated) =
            derive_retention_parameters(config.gravel, config.sand, config.clay, config.width)?;

        let mut layer = SoilLayer {
            width: config.width,
            depth: top_depth + config.width,
            matric_density: config.matric_density,
            bulk_density: bulk_density(config.matric_density, config.gravel),
            gravel: config.gravel,
            sand: config.sand,
            clay: config.clay,
            evap_coeff: config.evap_coeff,
            transp_coeff: config.transp_coeff,
            impermeability: config.impermeability,
            retention,
            swc_saturated,
            swc_fieldcap: 0.0,
            swc_wiltpt: 0.0,
            swc_min: 0.0,
            swc_at_swp_crit: [0.0; N_VEG_TYPES],
            swc_init: 0.0,
            temp_init: config.initial_temperature,
        };

        layer.swc_fieldcap = layer.swc_at(SWP_FIELD_CAPACITY);
        layer.swc_wiltpt = layer.swc_at(SWP_WILTING_POINT);

        if layer.swc_fieldcap >= layer.swc_saturated {
            return Err(FlowError::Configuration(format!(
                "layer at {top_depth} cm: field capacity {:.4} is not below saturation {:.4}",
                layer.swc_fieldcap, layer.swc_saturated
            )));
        }

        layer.swc_min = match min_wc {
            MinWaterContent::Residual => {
                let porosity = swc_saturated / config.width;
                let residual = residual_vwc(config.sand, config.clay, porosity, config.gravel);
                if residual >= SW_MISSING {
                    warn!(
                        "residual water content undefined for sand={}, clay={}; using {SWP_RESIDUAL} bar",
                        config.sand, config.clay
                    );
                }
                (residual * config.width).min(layer.swc_at(SWP_RESIDUAL)).max(0.0)
            }
            MinWaterContent::Potential(swp) => layer.swc_at(swp),
            MinWaterContent::Volumetric(vwc) => vwc * config.width,
        }
        .min(layer.swc_wiltpt);

        layer.swc_init = config
            .initial_swc
            .unwrap_or(layer.swc_fieldcap)
            .clamp(0.0, layer.swc_saturated);

        Ok(layer)
    }

    // Matric potential [bar] at a bulk water content [cm]
    pub fn swp(&self, swc: f64) -> f64 {
        swc_to_potential(self.gravel, swc, self)
    }

    // Bulk water content [cm] at a matric potential [bar]
    pub fn swc_at(&self, swp: f64) -> f64 {
        potential_to_vwc(self.gravel, swp, self) * self.width
    }

    // Water content at each vegetation type's critical potential, never below the layer minimum
    pub(crate) fn set_critical_swp(&mut self, swp_crit: &[f64; N_VEG_TYPES]) {
        for (k, &swp) in swp_crit.iter().enumerate() {
            self.swc_at_swp_crit[k] = self.swc_at(swp).max(self.swc_min);
        }
    }
}

// Ordered soil profile, index 0 is the shallowest layer
#[derive(Clone, Debug)]
pub struct SoilProfile {
    pub layers: Vec<SoilLayer>,
}

impl SoilProfile {
    pub fn new(
        configs: &[LayerConfig],
        min_wc: MinWaterContent,
        swp_crit: &[f64; N_VEG_TYPES],
    ) -> FlowResult<Self> {
        if configs.is_empty() {
            return Err(FlowError::Configuration("soil profile has no layers".into()));
        }

        let mut layers = Vec::with_capacity(configs.len());
        let mut depth = 0.0;
        for config in configs {
            let mut layer = SoilLayer::from_config(config, depth, min_wc)?;
            layer.set_critical_swp(swp_crit);
            depth = layer.depth;
            layers.push(layer);
        }

        debug!("built soil profile with {} layers, {depth} cm deep", layers.len());
        Ok(SoilProfile { layers })
    }

    pub fn n_layers(&self) -> usize {
        self.layers.len()
    }

    // Total profile depth [cm]
    pub fn depth(&self) -> f64 {
        self.layers.last().map_or(0.0, |l| l.depth)
    }

    // Number of layers down to the deepest one with a positive evaporation coefficient
    pub fn n_evap_layers(&self) -> usize {
        self.layers
            .iter()
            .rposition(|l| l.evap_coeff > 0.0)
            .map_or(0, |i| i + 1)
    }

    pub fn widths(&self) -> Vec<f64> {
        self.layers.iter().map(|l| l.width).collect()
    }

    pub fn fieldcap(&self) -> Vec<f64> {
        self.layers.iter().map(|l| l.swc_fieldcap).collect()
    }

    pub fn wiltpt(&self) -> Vec<f64> {
        self.layers.iter().map(|l| l.swc_wiltpt).collect()
    }

    pub fn saturated(&self) -> Vec<f64> {
        self.layers.iter().map(|l| l.swc_saturated).collect()
    }

    pub fn min_swc(&self) -> Vec<f64> {
        self.layers.iter().map(|l| l.swc_min).collect()
    }

    pub fn impermeability(&self) -> Vec<f64> {
        self.layers.iter().map(|l| l.impermeability).collect()
    }

    pub fn bulk_density(&self) -> Vec<f64> {
        self.layers.iter().map(|l| l.bulk_density).collect()
    }

    pub fn evap_coeff(&self) -> Vec<f64> {
        self.layers.iter().map(|l| l.evap_coeff).collect()
    }

    pub fn transp_coeff(&self, veg: usize) -> Vec<f64> {
        self.layers.iter().map(|l| l.transp_coeff[veg]).collect()
    }

    pub fn swc_at_swp_crit(&self, veg: usize) -> Vec<f64> {
        self.layers.iter().map(|l| l.swc_at_swp_crit[veg]).collect()
    }

    pub fn initial_swc(&self) -> Vec<f64> {
        self.layers.iter().map(|l| l.swc_init).collect()
    }

    pub fn initial_temperature(&self) -> Vec<f64> {
        self.layers.iter().map(|l| l.temp_init).collect()
    }

    // Transpiration region of each layer, given the exclusive lower layer bound of every region
    pub fn transp_regions(&self, bounds: &[usize]) -> Vec<usize> {
        (0..self.n_layers())
            .map(|i| {
                bounds
                    .iter()
                    .position(|&b| i < b)
                    .unwrap_or(bounds.len().saturating_sub(1))
            })
            .collect()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use approx::{assert_abs_diff_eq, assert_relative_eq};

    pub(crate) fn layer_config(width: f64, sand: f64, clay: f64, gravel: f64) -> LayerConfig {
        LayerConfig {
            width,
            matric_density: 1.4,
            gravel,
            sand,
            clay,
            evap_coeff: 0.0,
            transp_coeff: [0.0; N_VEG_TYPES],
            impermeability: 0.0,
            initial_temperature: 5.0,
            initial_swc: None,
        }
    }

    pub(crate) fn loam(width: f64) -> SoilLayer {
        SoilLayer::from_config(&layer_config(width, 0.33, 0.33, 0.1), 0.0, MinWaterContent::Residual).unwrap()
    }

    #[test]
    fn cosby_parameters() {
        let curve = RetentionCurve::from_texture(0.33, 0.33).unwrap();
        assert_relative_eq!(curve.thetas, 44.593, epsilon = 1e-9);
        assert_relative_eq!(curve.psis, 27.586715750763947, epsilon = 1e-9);
        assert_relative_eq!(curve.b, 8.182, epsilon = 1e-9);
        assert_relative_eq!(curve.b_inverse, 1.0 / 8.182, epsilon = 1e-12);
    }

    #[test]
    fn zero_slope_is_rejected() {
        let result = RetentionCurve::from_texture(10.0 + 1.0 / 3.0, 0.0);
        assert!(matches!(result, Err(FlowError::ZeroRetentionSlope { .. })));
    }

    #[test]
    fn saturated_content_within_layer() {
        let (_, sat) = derive_retention_parameters(0.1, 0.33, 0.33, 10.0).unwrap();
        assert!(sat > 0.0 && sat < 10.0);
    }

    #[test]
    fn potential_of_missing_or_empty_water() {
        let layer = loam(10.0);
        assert_eq!(swc_to_potential(layer.gravel, SW_MISSING, &layer), 0.0);
        assert_eq!(swc_to_potential(layer.gravel, 0.0, &layer), 0.0);
        assert_eq!(swc_to_potential(layer.gravel, -1.0, &layer), 0.0);
        assert!(swc_to_potential(layer.gravel, 1e-12, &layer).is_finite());
    }

    #[test]
    fn retention_round_trip() {
        let layer = loam(10.0);
        let mut swc = layer.swc_min + 0.01;
        while swc < layer.swc_saturated {
            let swp = swc_to_potential(layer.gravel, swc, &layer);
            let back = potential_to_vwc(layer.gravel, swp, &layer) * layer.width;
            assert_relative_eq!(back, swc, max_relative = 1e-9);
            swc += 0.25;
        }
    }

    #[test]
    fn reference_water_contents_ordered() {
        let layer = loam(10.0);
        assert!(layer.swc_min <= layer.swc_wiltpt);
        assert!(layer.swc_wiltpt < layer.swc_fieldcap);
        assert!(layer.swc_fieldcap < layer.swc_saturated);
        assert_relative_eq!(layer.swp(layer.swc_fieldcap), SWP_FIELD_CAPACITY, max_relative = 1e-9);
        assert_relative_eq!(layer.swp(layer.swc_wiltpt), SWP_WILTING_POINT, max_relative = 1e-9);
        assert_eq!(layer.swc_init, layer.swc_fieldcap);
    }

    #[test]
    fn residual_outside_regression_domain() {
        assert_eq!(residual_vwc(0.3, 0.65, 0.4, 0.0), SW_MISSING);
        assert_eq!(residual_vwc(0.03, 0.3, 0.4, 0.0), SW_MISSING);
        assert_eq!(residual_vwc(0.75, 0.3, 0.4, 0.0), SW_MISSING);
        assert_eq!(residual_vwc(0.3, 0.04, 0.4, 0.0), SW_MISSING);

        let res = residual_vwc(0.33, 0.33, 0.43, 0.0);
        assert!(res > 0.0 && res < 0.43);
    }

    #[test]
    fn minimum_water_content_methods() {
        let cfg = layer_config(10.0, 0.33, 0.33, 0.0);
        let fixed = SoilLayer::from_config(&cfg, 0.0, MinWaterContent::Volumetric(0.05)).unwrap();
        assert_relative_eq!(fixed.swc_min, 0.5);

        let at_swp = SoilLayer::from_config(&cfg, 0.0, MinWaterContent::Potential(30.0)).unwrap();
        assert_relative_eq!(at_swp.swp(at_swp.swc_min), 30.0, max_relative = 1e-9);
    }

    #[test]
    fn bulk_density_with_gravel() {
        assert_abs_diff_eq!(bulk_density(1.4, 0.0), 1.4);
        assert_abs_diff_eq!(bulk_density(1.4, 0.5), 0.7 + 1.325, epsilon = 1e-12);
    }

    #[test]
    fn profile_depths_and_regions() {
        let configs = vec![layer_config(5.0, 0.33, 0.33, 0.0); 4];
        let profile = SoilProfile::new(&configs, MinWaterContent::Residual, &[20.0, 25.0, 30.0, 35.0]).unwrap();
        assert_eq!(profile.n_layers(), 4);
        assert_relative_eq!(profile.depth(), 20.0);
        assert_eq!(profile.transp_regions(&[1, 3, 4]), vec![0, 1, 1, 2]);

        for layer in &profile.layers {
            assert!(layer.swc_at_swp_crit[0] > layer.swc_at_swp_crit[3]);
            assert!(layer.swc_at_swp_crit.iter().all(|&s| s >= layer.swc_min));
        }
    }

    #[test]
    fn invalid_texture_rejected() {
        let cfg = layer_config(5.0, 1.3, 0.2, 0.0);
        assert!(SoilLayer::from_config(&cfg, 0.0, MinWaterContent::Residual).is_err());
    }
}
