//! Coordinate conversion on a planetary spheroid.
//!
//! Converts between body-fixed Cartesian coordinates (kilometers, Z along
//! the rotation axis) and latitude, longitude (radians) and altitude above
//! the spheroid surface.

use glam::DVec3;

/// Iterations of the latitude refinement. The error shrinks by roughly the
/// eccentricity squared per step, so this is far below float precision.
const LATITUDE_ITERATIONS: usize = 10;

/// A geographic position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LatLonAlt {
    /// Latitude in radians.
    pub lat: f64,
    /// Longitude in radians.
    pub lon: f64,
    /// Altitude above the spheroid surface in kilometers.
    pub alt: f64,
}

/// An oblate spheroid described by its equatorial and polar radii.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Spheroid {
    pub equatorial_radius: f64,
    pub polar_radius: f64,
}

impl Spheroid {
    /// Mars reference spheroid, in kilometers.
    pub const MARS: Self = Self {
        equatorial_radius: 3396.19,
        polar_radius: 3376.2,
    };

    #[must_use]
    pub fn new(equatorial_radius: f64, polar_radius: f64) -> Self {
        Self {
            equatorial_radius,
            polar_radius,
        }
    }

    /// A sphere of the given radius.
    #[must_use]
    pub fn sphere(radius: f64) -> Self {
        Self::new(radius, radius)
    }

    /// First eccentricity squared.
    fn eccentricity_sq(&self) -> f64 {
        let a = self.equatorial_radius;
        let b = self.polar_radius;
        1.0 - (b * b) / (a * a)
    }

    /// Prime vertical radius of curvature at `lat`.
    fn prime_vertical_radius(&self, lat: f64) -> f64 {
        let sin_lat = lat.sin();
        self.equatorial_radius / (1.0 - self.eccentricity_sq() * sin_lat * sin_lat).sqrt()
    }

    /// Convert a geographic position to Cartesian coordinates.
    #[must_use]
    pub fn xyz_from_lla(&self, lla: LatLonAlt) -> DVec3 {
        let e2 = self.eccentricity_sq();
        let n = self.prime_vertical_radius(lla.lat);
        let (sin_lat, cos_lat) = lla.lat.sin_cos();
        let (sin_lon, cos_lon) = lla.lon.sin_cos();
        DVec3::new(
            (n + lla.alt) * cos_lat * cos_lon,
            (n + lla.alt) * cos_lat * sin_lon,
            (n * (1.0 - e2) + lla.alt) * sin_lat,
        )
    }

    /// Convert Cartesian coordinates to a geographic position.
    #[must_use]
    pub fn lla_from_xyz(&self, position: DVec3) -> LatLonAlt {
        let e2 = self.eccentricity_sq();
        let p = position.x.hypot(position.y);
        let lon = position.y.atan2(position.x);

        // On the axis the latitude is exact and the iteration would divide
        // by a zero cosine.
        if p < 1e-12 * self.equatorial_radius {
            let lat = std::f64::consts::FRAC_PI_2.copysign(position.z);
            return LatLonAlt {
                lat,
                lon,
                alt: position.z.abs() - self.polar_radius,
            };
        }

        let mut lat = position.z.atan2(p * (1.0 - e2));
        for _ in 0..LATITUDE_ITERATIONS {
            let n = self.prime_vertical_radius(lat);
            let alt = p / lat.cos() - n;
            lat = position.z.atan2(p * (1.0 - e2 * n / (n + alt)));
        }

        let n = self.prime_vertical_radius(lat);
        let alt = p / lat.cos() - n;
        LatLonAlt { lat, lon, alt }
    }
}
