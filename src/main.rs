//! Motion Sentinel - pointer-stream macro detection
//!
//! Classifies recorded or live pointer-movement streams as human or
//! automated input.

use motion_sentinel::app::cli::{Cli, Commands, ConfigAction};
use motion_sentinel::app::config::Config;
use motion_sentinel::detect::detector::{Detector, DetectorPhase};
use motion_sentinel::features::scaler::RobustScaler;
use motion_sentinel::ingest::point::PointRecord;
use motion_sentinel::model::artifact::ModelArtifact;
use motion_sentinel::replay::session::PointSession;
use std::io::BufRead;
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    // Parse CLI arguments first so we can use --verbose to set log level
    let cli = Cli::parse_args();

    // Initialize tracing (--verbose enables debug-level output)
    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    // Load config
    let config = if let Some(path) = &cli.config {
        Config::load(path)?
    } else {
        Config::load_default()?
    };

    match cli.command {
        Commands::Replay {
            input,
            model,
            scaler,
            json,
        } => {
            let config = with_overrides(config, model, scaler);
            run_replay(&input, json, &config)?;
        }
        Commands::Stream { model, scaler } => {
            let config = with_overrides(config, model, scaler);
            run_stream(&config)?;
        }
        Commands::Validate { model, scaler } => {
            let config = with_overrides(config, model, scaler);
            run_validate(&config)?;
        }
        Commands::Init { force } => {
            run_init(force, &config)?;
        }
        Commands::Config { action } => {
            run_config(action, &config)?;
        }
    }

    Ok(())
}

/// Apply CLI artifact-path overrides on top of the loaded config
fn with_overrides(mut config: Config, model: Option<PathBuf>, scaler: Option<PathBuf>) -> Config {
    if let Some(path) = model {
        config.artifacts.model_path = path;
    }
    if let Some(path) = scaler {
        config.artifacts.scaler_path = path;
    }
    config
}

fn run_replay(input: &std::path::Path, json: bool, config: &Config) -> anyhow::Result<()> {
    if !input.exists() {
        anyhow::bail!("Session file not found: {:?}", input);
    }

    let session = PointSession::load(input)?;
    info!(
        "Loaded session '{}' with {} points",
        session.metadata.name,
        session.len()
    );

    let mut detector = Detector::from_artifacts(config)?;
    let summary = session.replay(&mut detector);

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    println!("\nSession Replay Complete");
    println!("  Session:        {}", summary.session);
    println!("  Points fed:     {}", summary.points_fed);
    println!("  Decisions:      {}", summary.decisions);
    println!("  Macro flags:    {}", summary.macro_flags);
    println!("  Mean raw error: {:.5}", summary.mean_raw_error);
    match summary.last {
        Some(outcome) => println!(
            "  Final verdict:  {} (error {:.5}, threshold {:.5})",
            if outcome.is_human { "HUMAN" } else { "MACRO" },
            outcome.raw_error,
            outcome.threshold
        ),
        None => println!("  Final verdict:  insufficient data"),
    }

    Ok(())
}

fn run_stream(config: &Config) -> anyhow::Result<()> {
    let mut detector = Detector::from_artifacts(config)?;
    info!(
        "Detector ready; collecting {} points before first verdict",
        detector.capacity()
    );

    // Cooperative cancellation: the flag is polled between points
    let stop_flag = std::sync::Arc::new(std::sync::atomic::AtomicBool::new(false));
    let stop_flag_handler = stop_flag.clone();
    ctrlc::set_handler(move || {
        stop_flag_handler.store(true, std::sync::atomic::Ordering::SeqCst);
    })?;

    let stdin = std::io::stdin();
    let mut announced_ready = false;

    for line in stdin.lock().lines() {
        if stop_flag.load(std::sync::atomic::Ordering::SeqCst) {
            break;
        }

        let line = line?;
        if line.trim().is_empty() {
            continue;
        }

        let record: PointRecord = match serde_json::from_str(&line) {
            Ok(record) => record,
            Err(e) => {
                warn!(error = %e, "skipping unparseable point record");
                continue;
            }
        };

        if let Some(result) = detector.push(&record) {
            if !announced_ready {
                info!("Buffer warm; emitting verdicts");
                announced_ready = true;
            }
            println!("{}", serde_json::to_string(&result)?);
        } else if detector.phase() == DetectorPhase::Filling {
            let buffered = detector.buffered();
            if buffered % 50 == 0 {
                info!("Collecting... {} / {}", buffered, detector.capacity());
            }
        }
    }

    info!("Stream ended");
    Ok(())
}

fn run_validate(config: &Config) -> anyhow::Result<()> {
    info!(
        "Validating artifacts: model {:?}, scaler {:?}",
        config.artifacts.model_path, config.artifacts.scaler_path
    );

    let scaler = RobustScaler::load(&config.artifacts.scaler_path)?;
    println!(
        "Scaler OK: schema {}, {} features",
        scaler.schema_version,
        scaler.feature_names.len()
    );

    let artifact = ModelArtifact::load(&config.artifacts.model_path)?;
    let dims = &artifact.dims;
    println!(
        "Model OK: schema {}, {} features, d_model {}, {} layers, {} heads",
        artifact.schema_version, dims.num_features, dims.d_model, dims.num_layers, dims.num_heads
    );

    let expected_width = config.detector.encoding.model_width();
    if dims.num_features != expected_width {
        anyhow::bail!(
            "Model width {} does not match the configured {:?} encoding (expects {})",
            dims.num_features,
            config.detector.encoding,
            expected_width
        );
    }

    let m = &config.model;
    if dims.d_model != m.d_model
        || dims.num_layers != m.num_layers
        || dims.num_heads != m.num_heads
        || dims.feedforward_dim != m.feedforward_dim
    {
        anyhow::bail!(
            "Model architecture {:?} does not match the configured [model] section",
            dims
        );
    }

    println!("Artifacts are compatible with this configuration");
    Ok(())
}

fn run_init(force: bool, config: &Config) -> anyhow::Result<()> {
    let config_path = Config::default_path();

    if config_path.exists() && !force {
        anyhow::bail!(
            "Config already exists at {:?}. Use --force to overwrite.",
            config_path
        );
    }

    config.save_default()?;
    println!("Created config at {:?}", config_path);
    println!("\nConfig content:\n{}", config.to_toml()?);

    std::fs::create_dir_all(Cli::sessions_dir())?;
    println!("Created sessions directory: {:?}", Cli::sessions_dir());

    Ok(())
}

fn run_config(action: ConfigAction, config: &Config) -> anyhow::Result<()> {
    match action {
        ConfigAction::Show => {
            println!("Configuration ({:?}):\n", Config::default_path());
            println!("{}", config.to_toml()?);
        }
        ConfigAction::Get { key } => {
            let root: toml::Value = toml::from_str(&config.to_toml()?)?;
            match toml_get(&root, &key) {
                Some(value) => println!("{} = {}", key, value),
                None => anyhow::bail!("Configuration key '{}' not found", key),
            }
        }
        ConfigAction::Set { key, value } => {
            let config_path = Config::default_path();
            if !config_path.exists() {
                anyhow::bail!("No config file found. Run 'motion-sentinel init' first.");
            }

            let mut root: toml::Value =
                toml::from_str(&std::fs::read_to_string(&config_path)?)?;
            if !toml_set(&mut root, &key, parse_toml_scalar(&value)) {
                anyhow::bail!("Failed to set '{}'. Key may not exist in config.", key);
            }

            // Round-trip through the typed config so bad values are caught
            // before they land on disk
            let updated: Config = toml::from_str(&toml::to_string(&root)?)
                .map_err(|e| anyhow::anyhow!("'{}' rejected: {}", key, e))?;
            updated.validate()?;
            updated.save(&config_path)?;
            println!("Set {} = {}", key, value);
        }
        ConfigAction::Reset { force } => {
            let config_path = Config::default_path();

            if config_path.exists() && !force {
                println!("Config exists at {:?}", config_path);
                println!("Use --force to reset to defaults");
                return Ok(());
            }

            Config::default().save_default()?;
            println!("Configuration reset to defaults at {:?}", config_path);
        }
    }

    Ok(())
}

/// Walk a dotted key through nested TOML tables
fn toml_get<'a>(root: &'a toml::Value, key: &str) -> Option<&'a toml::Value> {
    let mut current = root;
    for part in key.split('.') {
        current = current.get(part)?;
    }
    Some(current)
}

/// Replace an existing leaf value addressed by a dotted key
fn toml_set(root: &mut toml::Value, key: &str, new_value: toml::Value) -> bool {
    let mut parts: Vec<&str> = key.split('.').collect();
    let leaf = match parts.pop() {
        Some(leaf) => leaf,
        None => return false,
    };

    let mut current = root;
    for part in parts {
        current = match current.get_mut(part) {
            Some(value) => value,
            None => return false,
        };
    }

    match current.as_table_mut() {
        Some(table) if table.contains_key(leaf) => {
            table.insert(leaf.to_string(), new_value);
            true
        }
        _ => false,
    }
}

/// Interpret a CLI value string as the closest TOML scalar
fn parse_toml_scalar(raw: &str) -> toml::Value {
    if let Ok(b) = raw.parse::<bool>() {
        return toml::Value::Boolean(b);
    }
    if let Ok(i) = raw.parse::<i64>() {
        return toml::Value::Integer(i);
    }
    if let Ok(f) = raw.parse::<f64>() {
        return toml::Value::Float(f);
    }
    toml::Value::String(raw.to_string())
}
