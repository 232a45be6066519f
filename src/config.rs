//! Resolved runtime settings.
//!
//! Values come from the command line, with `LYRAE_*` environment variables
//! (optionally from `.env`) as fallbacks; see `cli::EngineArgs`.

use std::path::PathBuf;
use std::time::Duration;

use crate::cli::EngineArgs;
use crate::error::AppError;
use crate::geo::{GeocodeResolver, RasterStore};

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub model_path: PathBuf,
    pub schema_path: PathBuf,
    /// Built-in analysis-set version name or path to a JSON definition.
    pub analysis_set: String,
    pub contact_email: String,
    pub raster_url: String,
    pub cache_dir: PathBuf,
    pub geocode_timeout: Duration,
    pub raster_timeout: Duration,
}

impl Settings {
    pub fn from_args(args: &EngineArgs) -> Result<Self, AppError> {
        if args.geocode_timeout_secs == 0 || args.raster_timeout_secs == 0 {
            return Err(AppError::usage("Timeouts must be at least one second."));
        }
        let contact_email = args.contact_email.trim();
        if contact_email.is_empty() {
            return Err(AppError::usage(
                "A contact e-mail is required to identify requests to geocoding services.",
            ));
        }
        if args.analysis_set.trim().is_empty() {
            return Err(AppError::usage("Analysis feature set selector is empty."));
        }
        Ok(Self {
            model_path: args.model.clone(),
            schema_path: args.schema.clone(),
            analysis_set: args.analysis_set.trim().to_string(),
            contact_email: contact_email.to_string(),
            raster_url: args.raster_url.clone(),
            cache_dir: args.cache_dir.clone(),
            geocode_timeout: Duration::from_secs(args.geocode_timeout_secs),
            raster_timeout: Duration::from_secs(args.raster_timeout_secs),
        })
    }

    pub fn raster_store(&self) -> RasterStore {
        RasterStore::new(
            self.raster_url.clone(),
            &self.cache_dir,
            self.contact_email.clone(),
            self.raster_timeout,
        )
    }

    pub fn geocoder(&self) -> Result<GeocodeResolver, AppError> {
        GeocodeResolver::french_chain(&self.contact_email, self.geocode_timeout)
            .map_err(|e| AppError::runtime(format!("Failed to build HTTP client: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;
    use crate::cli::{Cli, Command};
    use crate::geo::RISK_RASTER_FILE;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(args).unwrap()
    }

    #[test]
    fn defaults_resolve() {
        let cli = parse(&["lyrae", "check"]);
        assert!(matches!(cli.command, Command::Check(_)));
        let s = Settings::from_args(&cli.engine).unwrap();
        assert_eq!(s.geocode_timeout, Duration::from_secs(12));
        assert_eq!(s.raster_timeout, Duration::from_secs(90));
        assert_eq!(s.raster_store().path(), PathBuf::from(".").join(RISK_RASTER_FILE));
    }

    #[test]
    fn rejects_zero_timeout_and_blank_contact() {
        let cli = parse(&["lyrae", "--geocode-timeout-secs", "0", "check"]);
        assert_eq!(Settings::from_args(&cli.engine).unwrap_err().exit_code(), 2);

        let cli = parse(&["lyrae", "check", "--contact-email", "  "]);
        assert!(Settings::from_args(&cli.engine).is_err());
    }
}
