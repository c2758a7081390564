/**
Module for the lateral surface water exchange of ponded water.

Water that cannot infiltrate ponds at the soil surface as standing water. A
fixed fraction of it leaves the site as runoff every day, and a fixed fraction
of the water reaching the surface can arrive from upslope as runon. Units are
cm of water.

Removes the daily runoff fraction from the standing water.

# Arguments
* `standing_water` - Ponded water at the surface [cm], reduced in place.
* `percent_runoff` - Fraction of the ponded water that runs off [-].

# Returns
The runoff [cm].
*/
pub fn ponded_runoff(standing_water: &mut f64, percent_runoff: f64) -> f64 {
    if *standing_water <= 0.0 || percent_runoff <= 0.0 {
        return 0.0;
    }

    let runoff = *standing_water * percent_runoff.min(1.0);
    *standing_water -= runoff;
    runoff
}

/**
Calculates the runon arriving at the site.

# Arguments
- `surface_water` - Water reaching the soil surface today (throughfall and snowmelt) [cm].
- `percent_runon` - Fraction of that water added again as runon from upslope [-].

# Returns
The runon [cm].
*/
pub fn runon(surface_water: f64, percent_runon: f64) -> f64 {
    if surface_water <= 0.0 || percent_runon <= 0.0 {
        return 0.0;
    }

    surface_water * percent_runon
}
