//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - loads `.env` and sets up logging
//! - parses CLI arguments into `Settings`
//! - loads the engine artifacts once
//! - dispatches to the requested command

use clap::Parser;
use tracing::warn;
use tracing_subscriber::EnvFilter;

use crate::cli::{CheckArgs, Command, EvaluateArgs, GeocodeArgs, RiskArgs};
use crate::config::Settings;
use crate::domain::{GeoPoint, GeocodeResult};
use crate::error::AppError;
use crate::models::{ClassifierAdapter, ObliviousForest};
use crate::schema::{AnalysisSet, SchemaRegistry, check_reference};

pub mod context;
pub mod pipeline;

pub use context::EngineContext;

/// Entry point for the `lyrae` binary.
pub fn run() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    init_logging();

    let cli = crate::cli::Cli::parse();
    let settings = Settings::from_args(&cli.engine)?;

    match cli.command {
        Command::Evaluate(args) => handle_evaluate(&settings, args),
        Command::Check(args) => handle_check(&settings, args),
        Command::Geocode(args) => handle_geocode(&settings, args),
        Command::Risk(args) => handle_risk(&settings, args),
    }
}

/// Logs go to stderr; stdout carries command output only.
fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn handle_evaluate(settings: &Settings, args: EvaluateArgs) -> Result<(), AppError> {
    let answers = crate::io::read_answers(&args.answers)?;
    let ctx = EngineContext::load(settings)?;

    let location = match (args.lat, args.lon) {
        (Some(lat), Some(lon)) => Some(GeocodeResult::Found(GeoPoint {
            lat,
            lon,
            display_name: format!("{lat:.5}, {lon:.5}"),
            provider: "manual".to_string(),
        })),
        _ => match args.location.query() {
            Some(address) => Some(settings.geocoder()?.resolve(&address)),
            None => None,
        },
    };
    if let Some(GeocodeResult::ProviderError { provider, status, .. }) = &location {
        warn!(%provider, ?status, "continuing without location");
    }

    let request = pipeline::EvaluationRequest {
        subject_name: args.name.clone(),
        answers,
        location,
        risk_override: args.risk_class.clone(),
    };
    let eval = pipeline::evaluate(&ctx, &request)?;

    let subject = request
        .subject_name
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or(crate::io::DEFAULT_SUBJECT);
    if args.json {
        let json = serde_json::to_string_pretty(&eval)
            .map_err(|e| AppError::runtime(format!("Failed to serialize evaluation: {e}")))?;
        println!("{json}");
    } else {
        println!("{}", crate::report::format_evaluation(&eval, subject));
    }

    if let Some(dir) = &args.export_dir {
        let case = crate::io::CaseExport::new(Some(subject), &eval, &request.answers);
        let (json, csv) = crate::io::export_case(dir, &case)?;
        eprintln!("Exported {} and {}", json.display(), csv.display());
    }

    Ok(())
}

fn handle_check(settings: &Settings, args: CheckArgs) -> Result<(), AppError> {
    let registry = SchemaRegistry::load(&settings.schema_path)?;
    let model = ObliviousForest::load(&settings.model_path)?;
    let analysis = AnalysisSet::resolve(&settings.analysis_set)?;

    let contract = ClassifierAdapter::contract(&model, &registry);
    let reference = match &args.reference {
        Some(path) => Some(check_reference(&registry, &crate::io::read_reference_columns(path)?)),
        None => None,
    };
    let discrepancy = AnalysisSet::builtin_discrepancy(&registry);

    println!(
        "{}",
        crate::report::format_check(&contract, reference.as_ref(), &analysis.version, &discrepancy)
    );

    let reference_clean = reference.as_ref().is_none_or(|r| r.is_clean());
    if !(contract.is_clean() && reference_clean) {
        return Err(AppError::artifact("Schema consistency check failed."));
    }
    Ok(())
}

fn handle_geocode(settings: &Settings, args: GeocodeArgs) -> Result<(), AppError> {
    let address = args
        .query()
        .ok_or_else(|| AppError::usage("Give an address, or at least one of --street/--postcode/--city."))?;
    let result = settings.geocoder()?.resolve(&address);

    let json = serde_json::to_string_pretty(&result)
        .map_err(|e| AppError::runtime(format!("Failed to serialize geocode result: {e}")))?;
    println!("{json}");
    eprintln!("{}", result.user_message());

    match result {
        GeocodeResult::ProviderError { .. } => Err(AppError::runtime(result.user_message())),
        _ => Ok(()),
    }
}

fn handle_risk(settings: &Settings, args: RiskArgs) -> Result<(), AppError> {
    if !((-90.0..=90.0).contains(&args.lat) && (-180.0..=180.0).contains(&args.lon)) {
        return Err(AppError::usage("Latitude must be in [-90, 90] and longitude in [-180, 180]."));
    }
    let registry = SchemaRegistry::load(&settings.schema_path)?;
    let raster = settings.raster_store().load()?;

    let class = raster.sample(args.lat, args.lon);
    let levels = registry.risk_feature().map(|f| registry.levels(f)).unwrap_or_default();
    let label = crate::geo::reconcile_label(class, levels);
    println!("{} (class {}, raw \"{}\")", label, class.code(), class.label());
    Ok(())
}
