use crate::geo::distance_km;
use crate::models::location::GeoPoint;

/// Urban heuristic, not a routed estimate.
const MINUTES_PER_KM: f64 = 2.0;

pub fn estimate_eta_minutes(driver_lat: f64, driver_lng: f64, dest_lat: f64, dest_lng: f64) -> u32 {
    let distance = distance_km(driver_lat, driver_lng, dest_lat, dest_lng);
    let minutes = (distance * MINUTES_PER_KM).ceil();

    if minutes.is_finite() && minutes > 1.0 {
        minutes.min(u32::MAX as f64) as u32
    } else {
        1
    }
}

pub fn eta_between(driver: &GeoPoint, destination: &GeoPoint) -> u32 {
    estimate_eta_minutes(driver.lat, driver.lng, destination.lat, destination.lng)
}

#[cfg(test)]
mod tests {
    use super::estimate_eta_minutes;

    #[test]
    fn driver_at_the_door_still_gets_one_minute() {
        assert_eq!(estimate_eta_minutes(-34.6, -58.4, -34.6, -58.4), 1);
    }

    #[test]
    fn two_minutes_per_km_rounded_up() {
        // 0.1 degrees of latitude is about 11.12 km.
        assert_eq!(estimate_eta_minutes(0.0, 0.0, 0.1, 0.0), 23);
    }

    #[test]
    fn eta_grows_with_distance() {
        let mut previous = 0;
        for step in 0..50 {
            let lat = step as f64 * 0.01;
            let eta = estimate_eta_minutes(0.0, 0.0, lat, 0.0);
            assert!(eta >= previous);
            assert!(eta >= 1);
            previous = eta;
        }
    }
}
