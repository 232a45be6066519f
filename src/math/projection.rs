//! Forward map projections from WGS84 latitude/longitude.
//!
//! Only the reference systems the risk raster can realistically ship in are
//! supported. Lambert-93 uses the GRS80 ellipsoid; the GRS80/WGS84 datum shift
//! is below a metre and is ignored.

use std::f64::consts::FRAC_PI_4;

const GRS80_A: f64 = 6_378_137.0;
const GRS80_INV_F: f64 = 298.257_222_101;

/// Spherical radius used by EPSG:3857.
const WEB_MERCATOR_R: f64 = 6_378_137.0;

/// Supported raster coordinate reference systems.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Crs {
    /// Plain lon/lat degrees (EPSG:4326, EPSG:4171).
    Geographic,
    /// EPSG:3857.
    WebMercator,
    /// RGF93 / Lambert-93 (EPSG:2154).
    Lambert93,
}

impl Crs {
    pub fn from_epsg(code: u16) -> Option<Self> {
        match code {
            4326 | 4171 => Some(Crs::Geographic),
            3857 => Some(Crs::WebMercator),
            2154 => Some(Crs::Lambert93),
            _ => None,
        }
    }

    pub fn epsg(self) -> u16 {
        match self {
            Crs::Geographic => 4326,
            Crs::WebMercator => 3857,
            Crs::Lambert93 => 2154,
        }
    }

    /// Project a WGS84 point into this system's `(x, y)`.
    pub fn forward(self, lat: f64, lon: f64) -> (f64, f64) {
        match self {
            Crs::Geographic => (lon, lat),
            Crs::WebMercator => web_mercator(lat, lon),
            Crs::Lambert93 => LambertConic::lambert93().forward(lat, lon),
        }
    }
}

fn web_mercator(lat: f64, lon: f64) -> (f64, f64) {
    let x = WEB_MERCATOR_R * lon.to_radians();
    let y = WEB_MERCATOR_R * (FRAC_PI_4 + lat.to_radians() / 2.0).tan().ln();
    (x, y)
}

/// Lambert conformal conic with two standard parallels, on an ellipsoid.
#[derive(Debug, Clone, Copy)]
struct LambertConic {
    a: f64,
    e: f64,
    n: f64,
    big_f: f64,
    r0: f64,
    lon0: f64,
    x0: f64,
    y0: f64,
}

impl LambertConic {
    /// `parallels` are the two standard parallels, `origin` is `(lat0, lon0)`
    /// and `false_origin` its projected `(x0, y0)`. Angles in degrees.
    fn new(
        a: f64,
        inv_f: f64,
        parallels: (f64, f64),
        origin: (f64, f64),
        false_origin: (f64, f64),
    ) -> Self {
        let f = 1.0 / inv_f;
        let e = (2.0 * f - f * f).sqrt();
        let (p1, p2) = (parallels.0.to_radians(), parallels.1.to_radians());
        let p0 = origin.0.to_radians();

        let m1 = m(e, p1);
        let m2 = m(e, p2);
        let t1 = t(e, p1);
        let t2 = t(e, p2);
        let n = (m1.ln() - m2.ln()) / (t1.ln() - t2.ln());
        let big_f = m1 / (n * t1.powf(n));
        let r0 = a * big_f * t(e, p0).powf(n);

        Self {
            a,
            e,
            n,
            big_f,
            r0,
            lon0: origin.1.to_radians(),
            x0: false_origin.0,
            y0: false_origin.1,
        }
    }

    fn lambert93() -> Self {
        Self::new(
            GRS80_A,
            GRS80_INV_F,
            (49.0, 44.0),
            (46.5, 3.0),
            (700_000.0, 6_600_000.0),
        )
    }

    fn forward(&self, lat: f64, lon: f64) -> (f64, f64) {
        let r = self.a * self.big_f * t(self.e, lat.to_radians()).powf(self.n);
        let theta = self.n * (lon.to_radians() - self.lon0);
        (self.x0 + r * theta.sin(), self.y0 + self.r0 - r * theta.cos())
    }
}

fn m(e: f64, phi: f64) -> f64 {
    let s = phi.sin();
    phi.cos() / (1.0 - e * e * s * s).sqrt()
}

fn t(e: f64, phi: f64) -> f64 {
    let s = phi.sin();
    (FRAC_PI_4 - phi / 2.0).tan() / ((1.0 - e * s) / (1.0 + e * s)).powf(e / 2.0)
}
