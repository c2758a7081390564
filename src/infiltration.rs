use log::debug;

// Water leaving the profile during one infiltration pass
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct InfiltrationResult {
    pub drain_out: f64,      // Drainage below the deepest layer [cm]
    pub standing_water: f64, // Excess pushed up to the surface [cm]
}

// Pushes water above saturation upward, deepest layer first.
// Whatever the top layer cannot hold is returned as standing water.
fn push_up_excess(swc: &mut [f64], drain: &mut [f64], swcsat: &[f64]) -> f64 {
    let mut standing = 0.0;
    for j in (0..swc.len()).rev() {
        if swc[j] > swcsat[j] {
            let push = swc[j] - swcsat[j];
            swc[j] = swcsat[j];
            if j > 0 {
                drain[j - 1] -= push;
                swc[j - 1] += push;
            } else {
                standing += push;
            }
        }
    }
    standing
}

/// Infiltration of a rain or snowmelt event: water above field capacity
/// drains by gravity, throttled by each layer's impermeability.
///
/// `drain` is overwritten with the flux out of the bottom of each layer.
/// Standing water from earlier days must already be part of `ppt_left`.
pub fn infiltrate_water_high(
    swc: &mut [f64],
    drain: &mut [f64],
    ppt_left: f64,
    swcfc: &[f64],
    swcsat: &[f64],
    impermeability: &[f64],
) -> InfiltrationResult {
    let n = swc.len();
    if n == 0 {
        return InfiltrationResult {
            drain_out: 0.0,
            standing_water: ppt_left,
        };
    }

    swc[0] += ppt_left;

    for i in 0..n {
        let d = (1.0 - impermeability[i]) * (swc[i] - swcfc[i]).max(0.0);
        drain[i] = d;
        swc[i] -= d;
        if i + 1 < n {
            swc[i + 1] += d;
        }
    }

    let standing_water = push_up_excess(swc, drain, swcsat);
    if standing_water > 0.0 {
        debug!("high-flux infiltration ponded {standing_water:.4} cm");
    }

    InfiltrationResult {
        drain_out: drain[n - 1],
        standing_water,
    }
}

/// Slow drainage between events, including below field capacity.
///
/// Below field capacity the potential rate decays as
/// `exp((swc - fc) * slow_drain_depth / width)`. Frozen layers, and layers
/// resting on a frozen layer, do not drain. Fluxes are added to `drain`.
#[allow(clippy::too_many_arguments)]
pub fn infiltrate_water_low(
    swc: &mut [f64],
    drain: &mut [f64],
    slow_drain_coeff: f64,
    slow_drain_depth: f64,
    swcfc: &[f64],
    width: &[f64],
    swcmin: &[f64],
    swcsat: &[f64],
    impermeability: &[f64],
    frozen: &[bool],
) -> InfiltrationResult {
    let n = swc.len();
    let mut drain_out = 0.0;

    for i in 0..n {
        let below_frozen = i + 1 < n && frozen[i + 1];
        let d = if frozen[i] || below_frozen || swc[i] <= swcmin[i] {
            0.0
        } else {
            let swc_avail = (swc[i] - swcmin[i]).max(0.0);
            let drainpot = if swc[i] > swcfc[i] {
                slow_drain_coeff
            } else {
                slow_drain_coeff * ((swc[i] - swcfc[i]) * slow_drain_depth / width[i]).exp()
            };
            (1.0 - impermeability[i]) * swc_avail.min(drainpot)
        };

        drain[i] += d;
        swc[i] -= d;
        if i + 1 < n {
            swc[i + 1] += d;
        } else {
            drain_out += d;
        }
    }

    let standing_water = push_up_excess(swc, drain, swcsat);

    InfiltrationResult {
        drain_out,
        standing_water,
    }
}
