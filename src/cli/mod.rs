//! Command-line parsing for the equine Lyme borreliosis evaluator.
//!
//! Argument parsing and command dispatch stay separate from the record and
//! model code. Every engine setting has a `LYRAE_*` environment fallback.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::geo::{DEFAULT_CONTACT_EMAIL, RISK_RASTER_URL};
use crate::schema::FULL_V1;

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "lyrae", version, about = "Equine Lyme borreliosis risk evaluation")]
pub struct Cli {
    #[command(flatten)]
    pub engine: EngineArgs,

    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Evaluate one case from a JSON answers file.
    Evaluate(EvaluateArgs),
    /// Check the schema descriptor against the model and an optional reference dataset.
    Check(CheckArgs),
    /// Resolve an address and print the tagged outcome.
    Geocode(GeocodeArgs),
    /// Sample the regional risk raster at a WGS84 point.
    Risk(RiskArgs),
}

/// Artifact locations and service settings shared by every command.
#[derive(Debug, Args, Clone)]
pub struct EngineArgs {
    /// Classifier artifact (JSON oblivious forest).
    #[arg(long, global = true, env = "LYRAE_MODEL", default_value = "equine_lyme_model.json")]
    pub model: PathBuf,

    /// Schema descriptor (feature_cols, cat_cols, factor_levels).
    #[arg(long, global = true, env = "LYRAE_SCHEMA", default_value = "equine_lyme_meta.json")]
    pub schema: PathBuf,

    /// Analysis feature set: built-in version (full-v1, results-v2) or JSON file.
    #[arg(long, global = true, env = "LYRAE_ANALYSIS_SET", default_value = FULL_V1)]
    pub analysis_set: String,

    /// Contact e-mail sent in the User-Agent of outbound requests.
    #[arg(long, global = true, env = "LYRAE_CONTACT_EMAIL", default_value = DEFAULT_CONTACT_EMAIL)]
    pub contact_email: String,

    /// Remote location of the risk raster.
    #[arg(long, global = true, env = "LYRAE_RISK_RASTER_URL", default_value = RISK_RASTER_URL)]
    pub raster_url: String,

    /// Directory holding the cached risk raster.
    #[arg(long, global = true, env = "LYRAE_CACHE_DIR", default_value = ".")]
    pub cache_dir: PathBuf,

    /// Per-request geocoding timeout (seconds).
    #[arg(long, global = true, env = "LYRAE_GEOCODE_TIMEOUT_SECS", default_value_t = 12)]
    pub geocode_timeout_secs: u64,

    /// Risk raster download timeout (seconds).
    #[arg(long, global = true, env = "LYRAE_RASTER_TIMEOUT_SECS", default_value_t = 90)]
    pub raster_timeout_secs: u64,
}

/// Address given either whole or as form parts.
#[derive(Debug, Args, Clone, Default)]
pub struct AddressArgs {
    /// Full free-text address (overrides the parts below).
    #[arg(long)]
    pub address: Option<String>,

    /// Street number.
    #[arg(long)]
    pub number: Option<String>,

    /// Street name.
    #[arg(long)]
    pub street: Option<String>,

    /// Postcode.
    #[arg(long)]
    pub postcode: Option<String>,

    /// City.
    #[arg(long)]
    pub city: Option<String>,
}

impl AddressArgs {
    /// The address to geocode, if any non-blank part was given.
    pub fn query(&self) -> Option<String> {
        let address = match self.address.as_deref().map(str::trim) {
            Some(a) if !a.is_empty() => a.to_string(),
            _ => crate::geo::compose_address(
                self.number.as_deref().unwrap_or(""),
                self.street.as_deref().unwrap_or(""),
                self.postcode.as_deref().unwrap_or(""),
                self.city.as_deref().unwrap_or(""),
            ),
        };
        (!address.is_empty()).then_some(address)
    }
}

#[derive(Debug, Args)]
pub struct EvaluateArgs {
    /// JSON object of `{feature: answer}`; `-` reads stdin.
    #[arg(value_name = "ANSWERS")]
    pub answers: PathBuf,

    /// Subject (horse) name used in reports and export file names.
    #[arg(long)]
    pub name: Option<String>,

    #[command(flatten)]
    pub location: AddressArgs,

    /// Latitude of the stable (skips geocoding; requires --lon).
    #[arg(long, requires = "lon", allow_hyphen_values = true)]
    pub lat: Option<f64>,

    /// Longitude of the stable (requires --lat).
    #[arg(long, requires = "lat", allow_hyphen_values = true)]
    pub lon: Option<f64>,

    /// Use this regional risk class instead of sampling the raster.
    #[arg(long)]
    pub risk_class: Option<String>,

    /// Print the evaluation as JSON instead of the text report.
    #[arg(long)]
    pub json: bool,

    /// Write `lyrae_<name>_case.json` and `.csv` into this directory.
    #[arg(long, value_name = "DIR")]
    pub export_dir: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct CheckArgs {
    /// Reference dataset (CSV) whose header must match the schema features.
    #[arg(long, value_name = "CSV")]
    pub reference: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct GeocodeArgs {
    #[command(flatten)]
    pub location: AddressArgs,

    /// Address as trailing words (joined with spaces).
    #[arg(value_name = "ADDRESS")]
    pub words: Vec<String>,
}

impl GeocodeArgs {
    pub fn query(&self) -> Option<String> {
        let words = self.words.join(" ");
        if !words.trim().is_empty() {
            return Some(words.trim().to_string());
        }
        self.location.query()
    }
}

#[derive(Debug, Args)]
pub struct RiskArgs {
    /// WGS84 latitude.
    #[arg(long, allow_hyphen_values = true)]
    pub lat: f64,

    /// WGS84 longitude.
    #[arg(long, allow_hyphen_values = true)]
    pub lon: f64,
}
