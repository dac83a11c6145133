//! Coordinate reference systems.

use std::f64::consts::{FRAC_PI_4, PI};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::geometry::{Point, Rectangle};

/// Earth radius used by spherical web mercator, in metres.
pub const EARTH_RADIUS: f64 = 6_378_137.0;

/// Latitude limit at which web mercator becomes square.
pub const MAX_MERCATOR_LATITUDE: f64 = 85.051_128_779_806_59;

/// The coordinate system world positions are expressed in.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Crs {
    /// Plain planar coordinates; projection is the identity.
    #[default]
    Cartesian,
    /// Spherical web mercator (EPSG:3857) in metres.
    WebMercator,
}

impl Crs {
    /// Project a `(longitude, latitude)` pair in degrees into world space.
    ///
    /// Latitudes beyond the mercator limit are clamped.
    pub fn project(&self, lon_lat: Point) -> Point {
        match self {
            Crs::Cartesian => lon_lat,
            Crs::WebMercator => {
                let lat = lon_lat
                    .y
                    .clamp(-MAX_MERCATOR_LATITUDE, MAX_MERCATOR_LATITUDE)
                    .to_radians();
                Point::new(
                    EARTH_RADIUS * lon_lat.x.to_radians(),
                    EARTH_RADIUS * (FRAC_PI_4 + lat / 2.0).tan().ln(),
                )
            }
        }
    }

    /// Inverse of [`Crs::project`].
    pub fn unproject(&self, p: Point) -> Point {
        match self {
            Crs::Cartesian => p,
            Crs::WebMercator => Point::new(
                (p.x / EARTH_RADIUS).to_degrees(),
                (2.0 * (p.y / EARTH_RADIUS).exp().atan() - PI / 2.0).to_degrees(),
            ),
        }
    }

    /// The full extent of the world, if the system has one.
    pub fn world_bounds(&self) -> Option<Rectangle> {
        match self {
            Crs::Cartesian => None,
            Crs::WebMercator => {
                let half = PI * EARTH_RADIUS;
                Some(Rectangle::new(Point::new(-half, -half), Point::new(half, half)))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: Point, b: Point) -> bool {
        (a.x - b.x).abs() < 1e-6 && (a.y - b.y).abs() < 1e-6
    }

    #[test]
    fn cartesian_is_identity() {
        let p = Point::new(12.5, -3.0);
        assert_eq!(Crs::Cartesian.project(p), p);
        assert_eq!(Crs::Cartesian.unproject(p), p);
        assert_eq!(Crs::Cartesian.world_bounds(), None);
    }

    #[test]
    fn mercator_origin() {
        assert!(close(Crs::WebMercator.project(Point::ZERO), Point::ZERO));
    }

    #[test]
    fn mercator_round_trip() {
        let lon_lat = Point::new(13.4, 52.5);
        let back = Crs::WebMercator.unproject(Crs::WebMercator.project(lon_lat));
        assert!(close(back, lon_lat));
    }

    #[test]
    fn mercator_world_is_square() {
        let world = Crs::WebMercator.world_bounds().unwrap();
        assert!((world.width() - world.height()).abs() < 1e-6);
        let corner = Crs::WebMercator.project(Point::new(180.0, MAX_MERCATOR_LATITUDE));
        assert!((corner.x - world.max.x).abs() < 1e-6);
        assert!((corner.y - world.max.y).abs() < 1e-3);
    }
}
