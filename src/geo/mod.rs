//! Location services: address geocoding and the regional risk raster.
//!
//! - `geocode`: ordered provider chain producing a tagged `GeocodeResult`
//! - `raster`: fetch-once GeoTIFF store and the WGS84 point sampler

pub mod geocode;
pub mod raster;

pub use geocode::*;
pub use raster::*;

#[derive(Debug, thiserror::Error)]
pub enum RasterError {
    #[error("cannot access '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("raster download failed: {0}")]
    Download(String),
    #[error("raster download returned HTTP {0}")]
    HttpStatus(u16),
    #[error("raster download from '{0}' returned an empty body")]
    EmptyDownload(String),
    #[error("invalid GeoTIFF: {0}")]
    Tiff(#[from] tiff::TiffError),
    #[error("raster has no usable georeferencing")]
    MissingGeoreference,
    #[error("raster coordinate reference system {0:?} is not supported")]
    UnsupportedCrs(Option<u16>),
    #[error("raster grid is inconsistent: {0}")]
    Grid(String),
    #[error("no risk raster source is configured")]
    Unavailable,
}

/// Join the address form parts (number, street, postcode, city) with single
/// spaces, skipping blank ones.
pub fn compose_address(number: &str, street: &str, postcode: &str, city: &str) -> String {
    [number, street, postcode, city]
        .iter()
        .map(|p| p.trim())
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}
