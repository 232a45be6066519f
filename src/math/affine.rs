//! Pixel ↔ map affine transforms.
//!
//! Coefficients follow the usual raster convention:
//!
//! ```text
//! x = a * col + b * row + c
//! y = d * col + e * row + f
//! ```
//!
//! where `(col, row)` addresses the upper-left corner of a pixel.

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Affine {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
    pub e: f64,
    pub f: f64,
}

impl Affine {
    /// North-up transform from an origin and pixel sizes (`height` positive).
    pub fn north_up(origin_x: f64, origin_y: f64, width: f64, height: f64) -> Self {
        Self {
            a: width,
            b: 0.0,
            c: origin_x,
            d: 0.0,
            e: -height,
            f: origin_y,
        }
    }

    /// Build from GeoTIFF `ModelTiepoint` (`[i, j, k, x, y, z]`) and
    /// `ModelPixelScale` (`[sx, sy, sz]`).
    pub fn from_tiepoint(tiepoint: &[f64], scale: &[f64]) -> Option<Self> {
        if tiepoint.len() < 6 || scale.len() < 2 {
            return None;
        }
        let (i, j, x, y) = (tiepoint[0], tiepoint[1], tiepoint[3], tiepoint[4]);
        let (sx, sy) = (scale[0], scale[1]);
        if sx == 0.0 || sy == 0.0 {
            return None;
        }
        Some(Self::north_up(x - i * sx, y + j * sy, sx, sy))
    }

    /// Build from a GeoTIFF `ModelTransformation` 4x4 row-major matrix.
    pub fn from_model_transformation(m: &[f64]) -> Option<Self> {
        if m.len() < 16 {
            return None;
        }
        let t = Self {
            a: m[0],
            b: m[1],
            c: m[3],
            d: m[4],
            e: m[5],
            f: m[7],
        };
        t.inverse().map(|_| t)
    }

    /// Same transform with its origin moved by a pixel offset.
    pub fn offset_pixels(&self, dcol: f64, drow: f64) -> Self {
        let (c, f) = self.apply(dcol, drow);
        Self { c, f, ..*self }
    }

    pub fn apply(&self, col: f64, row: f64) -> (f64, f64) {
        (
            self.a * col + self.b * row + self.c,
            self.d * col + self.e * row + self.f,
        )
    }

    pub fn determinant(&self) -> f64 {
        self.a * self.e - self.b * self.d
    }

    pub fn inverse(&self) -> Option<Self> {
        let det = self.determinant();
        if det == 0.0 || !det.is_finite() {
            return None;
        }
        let a = self.e / det;
        let b = -self.b / det;
        let d = -self.d / det;
        let e = self.a / det;
        Some(Self {
            a,
            b,
            c: -(a * self.c + b * self.f),
            d,
            e,
            f: -(d * self.c + e * self.f),
        })
    }

    /// Pixel `(row, col)` containing map point `(x, y)`, given the inverse
    /// transform. `None` when the point is not finite.
    pub fn rowcol(inverse: &Self, x: f64, y: f64) -> Option<(i64, i64)> {
        let (col, row) = inverse.apply(x, y);
        if !(col.is_finite() && row.is_finite()) {
            return None;
        }
        Some((row.floor() as i64, col.floor() as i64))
    }
}
