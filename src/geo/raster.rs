//! Regional Lyme risk raster: fetch-once store and point sampler.
//!
//! The raster is a single-band categorical GeoTIFF (1 = low or unknown,
//! 2 = intermediate, 3 = high). Anything the sampler cannot place on the grid
//! falls back to the low class; coverage gaps are expected and never block an
//! evaluation.

use std::fs;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Serialize;
use tiff::decoder::{Decoder, DecodingResult};
use tiff::tags::Tag;
use tracing::{debug, info, warn};

use crate::geo::RasterError;
use crate::math::{Affine, Crs};
use crate::text::fold_lower;

pub const RISK_RASTER_URL: &str = "https://raw.githubusercontent.com/QuentinLamboley/Borreliosis_tool/main/mean_R1_RF_prob_rep01_05_CATEG_3classes.tif";
pub const RISK_RASTER_FILE: &str = "mean_R1_RF_prob_rep01_05_CATEG_3classes.tif";

const GEOKEY_GT_MODEL_TYPE: u16 = 1024;
const GEOKEY_GT_RASTER_TYPE: u16 = 1025;
const GEOKEY_GEOGRAPHIC_TYPE: u16 = 2048;
const GEOKEY_PROJECTED_CS_TYPE: u16 = 3072;
const MODEL_TYPE_GEOGRAPHIC: u16 = 2;
const RASTER_PIXEL_IS_POINT: u16 = 2;

/// Stored for pixels that carry no class.
const NO_CLASS: u8 = 0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskClass {
    Low,
    Intermediate,
    High,
}

impl RiskClass {
    /// Decode a pixel value; only exact 1, 2 and 3 are categories.
    pub fn from_pixel(v: f64) -> Option<Self> {
        match v {
            v if v == 1.0 => Some(RiskClass::Low),
            v if v == 2.0 => Some(RiskClass::Intermediate),
            v if v == 3.0 => Some(RiskClass::High),
            _ => None,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(RiskClass::Low),
            2 => Some(RiskClass::Intermediate),
            3 => Some(RiskClass::High),
            _ => None,
        }
    }

    /// Parse a manually entered class: a code, a label or a class keyword.
    pub fn parse(text: &str) -> Option<Self> {
        const CLASSES: [RiskClass; 3] = [RiskClass::Low, RiskClass::Intermediate, RiskClass::High];
        let folded = fold_lower(text);
        if let Ok(code) = folded.parse::<u8>() {
            return Self::from_code(code);
        }
        CLASSES
            .into_iter()
            .find(|c| fold_lower(c.label()) == folded)
            .or_else(|| {
                CLASSES
                    .into_iter()
                    .find(|c| c.keywords().iter().any(|k| folded.contains(k)))
            })
    }

    pub fn code(self) -> u8 {
        match self {
            RiskClass::Low => 1,
            RiskClass::Intermediate => 2,
            RiskClass::High => 3,
        }
    }

    /// Human label as published with the raster.
    pub fn label(self) -> &'static str {
        match self {
            RiskClass::Low => "faible ou méconnu",
            RiskClass::Intermediate => "intermédiaire",
            RiskClass::High => "fort",
        }
    }

    /// Keywords tried in order when the registry wording differs from
    /// `label`. Already accent-folded and lowercase.
    fn keywords(self) -> &'static [&'static str] {
        match self {
            RiskClass::Low => &["faible", "meconnu"],
            RiskClass::Intermediate => &["inter"],
            RiskClass::High => &["fort"],
        }
    }
}

/// Map a raster class onto the registry's tokens for the risk feature.
///
/// Precedence:
/// 1. a token equal to the class label (case and accent insensitive)
/// 2. for each class keyword in order, the first token (registry order)
///    containing it
/// 3. the class label unchanged
pub fn reconcile_label(class: RiskClass, levels: &[String]) -> String {
    let target = fold_lower(class.label());
    let folded: Vec<String> = levels.iter().map(|l| fold_lower(l)).collect();

    if let Some(i) = folded.iter().position(|l| *l == target) {
        return levels[i].clone();
    }
    for keyword in class.keywords() {
        if let Some(i) = folded.iter().position(|l| l.contains(keyword)) {
            return levels[i].clone();
        }
    }
    class.label().to_string()
}

/// Map a manually entered class onto the registry's tokens.
///
/// A token equal to the input (case and accent insensitive) wins; otherwise
/// the input is parsed as a class and goes through `reconcile_label`.
/// Unrecognized input passes through trimmed.
pub fn reconcile_manual_label(text: &str, levels: &[String]) -> String {
    let folded = fold_lower(text);
    if let Some(level) = levels.iter().find(|l| fold_lower(l) == folded) {
        return level.clone();
    }
    match RiskClass::parse(text) {
        Some(class) => reconcile_label(class, levels),
        None => text.trim().to_string(),
    }
}

/// Class code per sample; nodata and undefined values become `NO_CLASS`.
fn class_codes<T: Copy>(samples: &[T], to_f64: impl Fn(T) -> f64, nodata: Option<f64>) -> Vec<u8> {
    samples
        .iter()
        .map(|&s| {
            let v = to_f64(s);
            if nodata.is_some_and(|nd| nd == v) {
                return NO_CLASS;
            }
            RiskClass::from_pixel(v).map_or(NO_CLASS, RiskClass::code)
        })
        .collect()
}

/// A loaded single-band categorical grid, one class code per pixel.
#[derive(Debug, Clone)]
pub struct RiskRaster {
    width: usize,
    height: usize,
    codes: Vec<u8>,
    transform: Affine,
    inverse: Affine,
    crs: Crs,
}

impl RiskRaster {
    /// Build from a row-major pixel buffer.
    pub fn from_parts(
        width: usize,
        height: usize,
        data: Vec<f64>,
        transform: Affine,
        crs: Crs,
        nodata: Option<f64>,
    ) -> Result<Self, RasterError> {
        Self::from_codes(width, height, class_codes(&data, |v| v, nodata), transform, crs)
    }

    fn from_codes(
        width: usize,
        height: usize,
        codes: Vec<u8>,
        transform: Affine,
        crs: Crs,
    ) -> Result<Self, RasterError> {
        if width == 0 || height == 0 {
            return Err(RasterError::Grid("raster has no pixels".to_string()));
        }
        if codes.len() != width * height {
            return Err(RasterError::Grid(format!(
                "{} samples for a {width}x{height} single-band grid",
                codes.len()
            )));
        }
        let inverse = transform.inverse().ok_or(RasterError::MissingGeoreference)?;
        Ok(Self {
            width,
            height,
            codes,
            transform,
            inverse,
            crs,
        })
    }

    /// Read a GeoTIFF from disk.
    pub fn open(path: &Path) -> Result<Self, RasterError> {
        let file = fs::File::open(path).map_err(|e| io_error(path, e))?;
        let mut decoder = Decoder::new(BufReader::new(file))?;
        let (width, height) = decoder.dimensions()?;

        let keys = match decoder.find_tag(Tag::GeoKeyDirectoryTag)? {
            Some(v) => Some(v.into_u16_vec()?),
            None => None,
        };
        let mut transform = read_transform(&mut decoder)?;
        // PixelIsPoint tiepoints name pixel centres.
        if keys.as_deref().and_then(|k| geokey(k, GEOKEY_GT_RASTER_TYPE)) == Some(RASTER_PIXEL_IS_POINT) {
            transform = transform.offset_pixels(-0.5, -0.5);
        }
        let crs = read_crs(keys.as_deref())?;
        let nodata = match decoder.find_tag(Tag::GdalNodata)? {
            Some(v) => v.into_string()?.trim_matches(char::from(0)).trim().parse::<f64>().ok(),
            None => None,
        };

        let codes = match decoder.read_image()? {
            DecodingResult::U8(v) => class_codes(&v, f64::from, nodata),
            DecodingResult::U16(v) => class_codes(&v, f64::from, nodata),
            DecodingResult::U32(v) => class_codes(&v, f64::from, nodata),
            DecodingResult::U64(v) => class_codes(&v, |s| s as f64, nodata),
            DecodingResult::I8(v) => class_codes(&v, f64::from, nodata),
            DecodingResult::I16(v) => class_codes(&v, f64::from, nodata),
            DecodingResult::I32(v) => class_codes(&v, f64::from, nodata),
            DecodingResult::I64(v) => class_codes(&v, |s| s as f64, nodata),
            DecodingResult::F32(v) => class_codes(&v, f64::from, nodata),
            DecodingResult::F64(v) => class_codes(&v, |s| s, nodata),
            #[allow(unreachable_patterns)]
            _ => return Err(RasterError::Grid("unsupported sample type".to_string())),
        };

        let raster = Self::from_codes(width as usize, height as usize, codes, transform, crs)?;
        info!(
            path = %path.display(),
            width,
            height,
            epsg = crs.epsg(),
            "loaded risk raster"
        );
        Ok(raster)
    }

    pub fn crs(&self) -> Crs {
        self.crs
    }

    pub fn dimensions(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    /// `(left, bottom, right, top)` in the raster's own CRS.
    pub fn bounds(&self) -> (f64, f64, f64, f64) {
        let (w, h) = (self.width as f64, self.height as f64);
        let corners = [
            self.transform.apply(0.0, 0.0),
            self.transform.apply(w, 0.0),
            self.transform.apply(0.0, h),
            self.transform.apply(w, h),
        ];
        let xs = corners.iter().map(|c| c.0);
        let ys = corners.iter().map(|c| c.1);
        (
            xs.clone().fold(f64::INFINITY, f64::min),
            ys.clone().fold(f64::INFINITY, f64::min),
            xs.fold(f64::NEG_INFINITY, f64::max),
            ys.fold(f64::NEG_INFINITY, f64::max),
        )
    }

    /// Risk class at a WGS84 point, falling back to `Low`.
    pub fn sample(&self, lat: f64, lon: f64) -> RiskClass {
        match self.lookup(lat, lon) {
            Some(class) => class,
            None => {
                warn!(lat, lon, "risk raster coverage gap, using low class");
                RiskClass::Low
            }
        }
    }

    /// Registry token for the risk feature at a WGS84 point.
    pub fn risk_label(&self, lat: f64, lon: f64, levels: &[String]) -> String {
        reconcile_label(self.sample(lat, lon), levels)
    }

    fn lookup(&self, lat: f64, lon: f64) -> Option<RiskClass> {
        let (x, y) = self.crs.forward(lat, lon);
        let (left, bottom, right, top) = self.bounds();
        if !(x >= left && x <= right && y >= bottom && y <= top) {
            debug!(x, y, "point outside raster extent");
            return None;
        }
        let (row, col) = Affine::rowcol(&self.inverse, x, y)?;
        if row < 0 || col < 0 || row as usize >= self.height || col as usize >= self.width {
            return None;
        }
        RiskClass::from_code(self.codes[row as usize * self.width + col as usize])
    }
}

fn io_error(path: &Path, source: std::io::Error) -> RasterError {
    RasterError::Io {
        path: path.display().to_string(),
        source,
    }
}

fn read_transform<R: std::io::Read + std::io::Seek>(decoder: &mut Decoder<R>) -> Result<Affine, RasterError> {
    if let Some(m) = decoder.find_tag(Tag::ModelTransformationTag)? {
        return Affine::from_model_transformation(&m.into_f64_vec()?).ok_or(RasterError::MissingGeoreference);
    }
    let scale = decoder.find_tag(Tag::ModelPixelScaleTag)?;
    let tiepoint = decoder.find_tag(Tag::ModelTiepointTag)?;
    match (scale, tiepoint) {
        (Some(s), Some(t)) => {
            Affine::from_tiepoint(&t.into_f64_vec()?, &s.into_f64_vec()?).ok_or(RasterError::MissingGeoreference)
        }
        _ => Err(RasterError::MissingGeoreference),
    }
}

fn read_crs(keys: Option<&[u16]>) -> Result<Crs, RasterError> {
    let Some(keys) = keys else {
        return Err(RasterError::UnsupportedCrs(None));
    };
    let code = geokey(keys, GEOKEY_PROJECTED_CS_TYPE)
        .or_else(|| geokey(keys, GEOKEY_GEOGRAPHIC_TYPE))
        .or_else(|| {
            // Geographic model without an explicit datum: assume WGS84.
            (geokey(keys, GEOKEY_GT_MODEL_TYPE) == Some(MODEL_TYPE_GEOGRAPHIC)).then_some(4326)
        });
    code.and_then(Crs::from_epsg).ok_or(RasterError::UnsupportedCrs(code))
}

/// Inline SHORT value of a GeoKey directory entry.
///
/// The directory is a 4-value header followed by `(key, location, count,
/// value)` quadruplets; `location == 0` means the value is stored inline.
fn geokey(dir: &[u16], key: u16) -> Option<u16> {
    let count = usize::from(*dir.get(3)?);
    dir.get(4..)?
        .chunks_exact(4)
        .take(count)
        .find(|entry| entry[0] == key && entry[1] == 0)
        .map(|entry| entry[3])
}

/// Local copy of the remote raster, fetched at most once.
#[derive(Debug, Clone)]
pub struct RasterStore {
    url: String,
    path: PathBuf,
    contact_email: String,
    timeout: Duration,
}

impl RasterStore {
    pub fn new(url: impl Into<String>, cache_dir: &Path, contact_email: impl Into<String>, timeout: Duration) -> Self {
        Self {
            url: url.into(),
            path: cache_dir.join(RISK_RASTER_FILE),
            contact_email: contact_email.into(),
            timeout,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Path to a non-empty local copy, downloading it if needed.
    pub fn ensure_local(&self) -> Result<&Path, RasterError> {
        if fs::metadata(&self.path).is_ok_and(|m| m.len() > 0) {
            debug!(path = %self.path.display(), "reusing cached risk raster");
            return Ok(&self.path);
        }
        self.download()?;
        Ok(&self.path)
    }

    pub fn load(&self) -> Result<RiskRaster, RasterError> {
        RiskRaster::open(self.ensure_local()?)
    }

    fn download(&self) -> Result<(), RasterError> {
        info!(url = %self.url, "downloading risk raster");
        let client = reqwest::blocking::Client::builder()
            .user_agent(format!("LYRAE/1.0 ({})", self.contact_email))
            .timeout(self.timeout)
            .build()
            .map_err(|e| RasterError::Download(e.to_string()))?;
        let resp = client
            .get(&self.url)
            .send()
            .map_err(|e| RasterError::Download(e.to_string()))?;
        if !resp.status().is_success() {
            return Err(RasterError::HttpStatus(resp.status().as_u16()));
        }
        let bytes = resp.bytes().map_err(|e| RasterError::Download(e.to_string()))?;
        if bytes.is_empty() {
            return Err(RasterError::EmptyDownload(self.url.clone()));
        }

        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir).map_err(|e| io_error(dir, e))?;
        }
        let partial = self.path.with_extension("tif.part");
        fs::write(&partial, &bytes).map_err(|e| io_error(&partial, e))?;
        fs::rename(&partial, &self.path).map_err(|e| io_error(&self.path, e))?;
        info!(path = %self.path.display(), bytes = bytes.len(), "risk raster cached");
        Ok(())
    }
}
