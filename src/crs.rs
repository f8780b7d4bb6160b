use std::fmt;

use geo::map_coords::MapCoordsInplace;

use crate::feature::FeatureCollection;

/// GeoJSON coordinates are always WGS84 (RFC 7946, section 4).
pub const GEOJSON_CRS: CrsCode = CrsCode::Epsg4326;

const WGS84_A: f64 = 6_378_137.0;
const WGS84_F: f64 = 1.0 / 298.257_223_563;

const UTM_K0: f64 = 0.9996;
const UTM_FALSE_EASTING: f64 = 500_000.0;
const UTM_FALSE_NORTHING_SOUTH: f64 = 10_000_000.0;

// GeoKeyDirectory key ids
const GEOGRAPHIC_TYPE_GEO_KEY: u16 = 2048;
const PROJECTED_CS_TYPE_GEO_KEY: u16 = 3072;

/// Coordinate reference systems found in SpaceNet products.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrsCode {
    /// WGS84 geographic (lon/lat in degrees)
    Epsg4326,
    /// Web Mercator (meters)
    Epsg3857,
    /// WGS84 UTM zone (EPSG 326xx north / 327xx south, meters)
    Utm { zone: u8, north: bool },
}

#[derive(Debug, thiserror::Error)]
pub enum CrsError {
    #[error("Unsupported EPSG code: {0}")]
    UnsupportedEpsg(u32),

    #[error("GeoKeyDirectory defines no coordinate reference system")]
    MissingCrs,

    #[error("GeoKeyDirectory is malformed")]
    MalformedKeyDirectory,
}

impl CrsCode {
    pub fn from_epsg(code: u32) -> Result<Self, CrsError> {
        match code {
            4326 => Ok(CrsCode::Epsg4326),
            3857 | 900913 => Ok(CrsCode::Epsg3857),
            32601..=32660 => Ok(CrsCode::Utm {
                zone: (code - 32600) as u8,
                north: true,
            }),
            32701..=32760 => Ok(CrsCode::Utm {
                zone: (code - 32700) as u8,
                north: false,
            }),
            other => Err(CrsError::UnsupportedEpsg(other)),
        }
    }

    /// Decode from a GeoTIFF GeoKeyDirectory: a four-short header followed by
    /// (key id, tag location, count, value) entries. A projected CS key wins
    /// over a geographic one, since projected files carry both.
    pub fn from_geo_key_directory(keys: &[u16]) -> Result<Self, CrsError> {
        if keys.len() < 4 || keys.len() % 4 != 0 {
            return Err(CrsError::MalformedKeyDirectory);
        }

        let mut geographic = None;
        let mut projected = None;

        for entry in keys[4..].chunks(4) {
            // tag location 0 means the value is stored inline as a SHORT
            if entry[1] != 0 {
                continue;
            }

            match entry[0] {
                GEOGRAPHIC_TYPE_GEO_KEY => geographic = Some(entry[3]),
                PROJECTED_CS_TYPE_GEO_KEY => projected = Some(entry[3]),
                _ => {}
            }
        }

        match projected.or(geographic) {
            Some(code) => CrsCode::from_epsg(code.into()),
            None => Err(CrsError::MissingCrs),
        }
    }
}

impl fmt::Display for CrsCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CrsCode::Epsg4326 => write!(f, "EPSG:4326"),
            CrsCode::Epsg3857 => write!(f, "EPSG:3857"),
            CrsCode::Utm { zone, north: true } => write!(f, "EPSG:{}", 32600 + *zone as u16),
            CrsCode::Utm { zone, north: false } => write!(f, "EPSG:{}", 32700 + *zone as u16),
        }
    }
}

/// Convert a single coordinate between two reference systems, going through
/// WGS84 as the hub.
pub fn convert(from: CrsCode, to: CrsCode, xy: (f64, f64)) -> (f64, f64) {
    if from == to {
        return xy;
    }

    from_wgs84(to, to_wgs84(from, xy))
}

/// Reproject all geometry of a collection in place.
pub fn reproject(features: &mut FeatureCollection<f64>, from: CrsCode, to: CrsCode) {
    if from == to {
        return;
    }

    features.map_coords_inplace(|&(x, y)| convert(from, to, (x, y)));
}

fn to_wgs84(from: CrsCode, xy: (f64, f64)) -> (f64, f64) {
    match from {
        CrsCode::Epsg4326 => xy,
        CrsCode::Epsg3857 => mercator_inverse(xy),
        CrsCode::Utm { zone, north } => utm_inverse(zone, north, xy),
    }
}

fn from_wgs84(to: CrsCode, lon_lat: (f64, f64)) -> (f64, f64) {
    match to {
        CrsCode::Epsg4326 => lon_lat,
        CrsCode::Epsg3857 => mercator_forward(lon_lat),
        CrsCode::Utm { zone, north } => utm_forward(zone, north, lon_lat),
    }
}

fn mercator_forward((lon, lat): (f64, f64)) -> (f64, f64) {
    let x = WGS84_A * lon.to_radians();
    let y = WGS84_A * (std::f64::consts::FRAC_PI_4 + lat.to_radians() / 2.0).tan().ln();

    (x, y)
}

fn mercator_inverse((x, y): (f64, f64)) -> (f64, f64) {
    let lon = (x / WGS84_A).to_degrees();
    let lat = (2.0 * (y / WGS84_A).exp().atan() - std::f64::consts::FRAC_PI_2).to_degrees();

    (lon, lat)
}

fn utm_central_meridian(zone: u8) -> f64 {
    (zone as f64 - 1.0) * 6.0 - 180.0 + 3.0
}

/// Transverse Mercator forward projection (series expansion on the WGS84
/// ellipsoid).
fn utm_forward(zone: u8, north: bool, (lon, lat): (f64, f64)) -> (f64, f64) {
    let e2 = WGS84_F * (2.0 - WGS84_F);
    let ep2 = e2 / (1.0 - e2);

    let phi = lat.to_radians();
    let lambda = lon.to_radians();
    let lambda0 = utm_central_meridian(zone).to_radians();

    let sin_phi = phi.sin();
    let cos_phi = phi.cos();

    let n = WGS84_A / (1.0 - e2 * sin_phi * sin_phi).sqrt();
    let t = phi.tan() * phi.tan();
    let c = ep2 * cos_phi * cos_phi;
    let a = cos_phi * (lambda - lambda0);

    let m = meridional_arc(e2, phi);

    let easting = UTM_K0
        * n
        * (a + (1.0 - t + c) * a.powi(3) / 6.0
            + (5.0 - 18.0 * t + t * t + 72.0 * c - 58.0 * ep2) * a.powi(5) / 120.0)
        + UTM_FALSE_EASTING;

    let mut northing = UTM_K0
        * (m + n
            * phi.tan()
            * (a * a / 2.0
                + (5.0 - t + 9.0 * c + 4.0 * c * c) * a.powi(4) / 24.0
                + (61.0 - 58.0 * t + t * t + 600.0 * c - 330.0 * ep2) * a.powi(6) / 720.0));

    if !north {
        northing += UTM_FALSE_NORTHING_SOUTH;
    }

    (easting, northing)
}

fn utm_inverse(zone: u8, north: bool, (easting, northing): (f64, f64)) -> (f64, f64) {
    let e2 = WGS84_F * (2.0 - WGS84_F);
    let ep2 = e2 / (1.0 - e2);

    let x = easting - UTM_FALSE_EASTING;
    let y = if north {
        northing
    } else {
        northing - UTM_FALSE_NORTHING_SOUTH
    };

    let m = y / UTM_K0;
    let mu = m
        / (WGS84_A * (1.0 - e2 / 4.0 - 3.0 * e2 * e2 / 64.0 - 5.0 * e2 * e2 * e2 / 256.0));

    let e1 = (1.0 - (1.0 - e2).sqrt()) / (1.0 + (1.0 - e2).sqrt());

    let phi1 = mu
        + (3.0 * e1 / 2.0 - 27.0 * e1.powi(3) / 32.0) * (2.0 * mu).sin()
        + (21.0 * e1 * e1 / 16.0 - 55.0 * e1.powi(4) / 32.0) * (4.0 * mu).sin()
        + (151.0 * e1.powi(3) / 96.0) * (6.0 * mu).sin()
        + (1097.0 * e1.powi(4) / 512.0) * (8.0 * mu).sin();

    let sin_phi1 = phi1.sin();
    let cos_phi1 = phi1.cos();
    let tan_phi1 = phi1.tan();

    let c1 = ep2 * cos_phi1 * cos_phi1;
    let t1 = tan_phi1 * tan_phi1;
    let n1 = WGS84_A / (1.0 - e2 * sin_phi1 * sin_phi1).sqrt();
    let r1 = WGS84_A * (1.0 - e2) / (1.0 - e2 * sin_phi1 * sin_phi1).powf(1.5);
    let d = x / (n1 * UTM_K0);

    let phi = phi1
        - (n1 * tan_phi1 / r1)
            * (d * d / 2.0
                - (5.0 + 3.0 * t1 + 10.0 * c1 - 4.0 * c1 * c1 - 9.0 * ep2) * d.powi(4) / 24.0
                + (61.0 + 90.0 * t1 + 298.0 * c1 + 45.0 * t1 * t1 - 252.0 * ep2 - 3.0 * c1 * c1)
                    * d.powi(6)
                    / 720.0);

    let lambda = (d - (1.0 + 2.0 * t1 + c1) * d.powi(3) / 6.0
        + (5.0 - 2.0 * c1 + 28.0 * t1 - 3.0 * c1 * c1 + 8.0 * ep2 + 24.0 * t1 * t1) * d.powi(5)
            / 120.0)
        / cos_phi1;

    let lon = utm_central_meridian(zone) + lambda.to_degrees();
    let lat = phi.to_degrees();

    (lon, lat)
}

/// Meridional arc length from the equator to latitude `phi`.
fn meridional_arc(e2: f64, phi: f64) -> f64 {
    WGS84_A
        * ((1.0 - e2 / 4.0 - 3.0 * e2 * e2 / 64.0 - 5.0 * e2 * e2 * e2 / 256.0) * phi
            - (3.0 * e2 / 8.0 + 3.0 * e2 * e2 / 32.0 + 45.0 * e2 * e2 * e2 / 1024.0)
                * (2.0 * phi).sin()
            + (15.0 * e2 * e2 / 256.0 + 45.0 * e2 * e2 * e2 / 1024.0) * (4.0 * phi).sin()
            - (35.0 * e2 * e2 * e2 / 3072.0) * (6.0 * phi).sin())
}
