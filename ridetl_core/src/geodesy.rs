use geo::{point, HaversineDistance};

/// Multiply metres by this to get feet.
pub const FEET_PER_METRE: f64 = 3.281;

pub const FEET_PER_MILE: f64 = 5280.0;

pub const METRES_PER_MILE: f64 = 1609.344;

pub const SECONDS_PER_HOUR: f64 = 3600.0;

/// Great-circle distance between two positions, in miles.
pub fn haversine_miles(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    // n.b. x=lon, y=lat. If you do it the other way round the
    // distances are wrong - a lot wrong.
    let p1 = point!(x: lon1, y: lat1);
    let p2 = point!(x: lon2, y: lat2);
    p1.haversine_distance(&p2) / METRES_PER_MILE
}

/// Direction of travel for a change in position, in degrees clockwise from
/// north and always in [0, 360). This treats latitude and longitude as a flat
/// grid, which is fine over the few metres between consecutive samples.
pub fn heading_degrees(delta_lat: f64, delta_lon: f64) -> f64 {
    let mut heading = delta_lon.atan2(delta_lat).to_degrees();
    if heading < 0.0 {
        heading += 360.0;
    }

    // A tiny negative angle rounds up to exactly 360.
    if heading >= 360.0 {
        heading -= 360.0;
    }

    heading
}

/// Speed in mph from miles and seconds.
pub fn speed_mph(miles: f64, seconds: f64) -> f64 {
    miles / seconds * SECONDS_PER_HOUR
}

/// Grade in percent for a climb of `delta_ele_feet` over `distance_miles`.
pub fn grade_percent(delta_ele_feet: f64, distance_miles: f64) -> f64 {
    100.0 * ((delta_ele_feet / FEET_PER_MILE) / distance_miles)
}
