mod cli;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands};
use slidecast_av::{DurationEstimator, FfmpegProbe, ToolRegistry};
use slidecast_core::config::Config;
use slidecast_core::events::{EventBus, EventPayload};
use slidecast_effects::{describe, list_effects, list_presets, preset, EffectOptions};
use slidecast_ledger::JobLedger;
use slidecast_pipeline::{RenderRequest, RenderService};
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Respect RUST_LOG env var if set, otherwise use defaults based on verbose flag
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "slidecast=trace,slidecast_pipeline=debug,slidecast_av=debug,slidecast_graph=debug,slidecast_ledger=debug".to_string()
        } else {
            "slidecast=info,slidecast_pipeline=info,slidecast_av=info,slidecast_ledger=info".to_string()
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Render {
            images,
            audio,
            effects,
            effects_file,
            preset,
            json,
        } => {
            let options = effect_options(effects, effects_file.as_deref(), preset)?;
            let request = RenderRequest::new(images, audio);
            let request = match options {
                Some(options) => request.with_effects(options),
                None => request,
            };
            let config = load_config(cli.config.as_deref())?;
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(render(config, request, json))
        }
        Commands::Effects { json } => show_effects(json),
        Commands::Describe { category, name } => {
            let info = describe(&category, &name).map_err(report)?;
            println!("{} ({}): {}", info.name, category, info.description);
            Ok(())
        }
        Commands::Preset { name } => {
            let p = preset(&name).map_err(report)?;
            println!("{}", serde_json::to_string_pretty(p)?);
            Ok(())
        }
        Commands::Ledger { json } => {
            let config = load_config(cli.config.as_deref())?;
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(show_ledger(&config, json))
        }
        Commands::Probe { file, json } => {
            let config = load_config(cli.config.as_deref())?;
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(probe_file(&config, &file, json))
        }
        Commands::CheckTools => {
            let config = load_config(cli.config.as_deref())?;
            check_tools(&config)
        }
        Commands::Validate {
            config: config_path,
        } => {
            let path = config_path.or(cli.config);
            validate_config(path.as_deref())
        }
        Commands::Version => {
            println!("slidecast {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    let config = Config::load_or_default(path).map_err(report)?;
    config.check().map_err(report)?;
    for warning in config.validate() {
        tracing::warn!("config: {warning}");
    }
    Ok(config)
}

/// Failures leave the binary as the structured `{kind, message}` report.
fn report(e: slidecast_core::Error) -> anyhow::Error {
    match serde_json::to_string(&e.report()) {
        Ok(json) => anyhow::anyhow!(json),
        Err(_) => anyhow::anyhow!(e.to_string()),
    }
}

fn effect_options(
    inline: Option<String>,
    file: Option<&Path>,
    preset: Option<String>,
) -> Result<Option<EffectOptions>> {
    let mut options = match (inline, file) {
        (Some(json), _) => Some(EffectOptions::from_json(&json).map_err(report)?),
        (None, Some(path)) => {
            let json = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read effects file: {:?}", path))?;
            Some(EffectOptions::from_json(&json).map_err(report)?)
        }
        (None, None) => None,
    };

    if let Some(name) = preset {
        options.get_or_insert_with(EffectOptions::default).preset = Some(name);
    }
    Ok(options)
}

async fn render(config: Config, request: RenderRequest, json: bool) -> Result<()> {
    let tools = Arc::new(ToolRegistry::discover(&config.tools));
    let events = Arc::new(EventBus::default());
    let service = RenderService::new(Arc::new(config), tools, Arc::clone(&events));

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupted, cancelling render");
            on_interrupt.cancel();
        }
    });

    let mut rx = events.subscribe();
    let reporter = tokio::spawn(async move {
        let mut last_pct = 0;
        loop {
            let event = match rx.recv().await {
                Ok(event) => event,
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => break,
            };
            match event.payload {
                EventPayload::JobProgress { fraction, .. } => {
                    let pct = (fraction * 100.0).round() as u32;
                    if pct >= last_pct + 5 || pct == 100 {
                        eprintln!("encoding {pct:>3}%");
                        last_pct = pct;
                    }
                }
                EventPayload::JobCompleted { .. } | EventPayload::JobFailed { .. } => break,
                _ => {}
            }
        }
    });

    let result = service.render(request, cancel).await;
    reporter.abort();
    let outcome = result.map_err(report)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    } else {
        println!("Output: {}", outcome.output_path.display());
        println!(
            "Duration: {:.2}s ({}), {} slides of {:.2}s",
            outcome.total_duration,
            outcome.duration_source,
            outcome.segment_durations.len(),
            outcome.segment_durations.first().copied().unwrap_or_default()
        );
        println!("Processing time: {} ms", outcome.processing_ms);
    }
    Ok(())
}

fn show_effects(json: bool) -> Result<()> {
    let catalog = list_effects();
    let presets = list_presets();

    if json {
        let value = serde_json::json!({ "effects": catalog, "presets": presets });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    for (title, items) in [
        ("Transitions", &catalog.transitions),
        ("Motions", &catalog.motions),
        ("Color grades", &catalog.colors),
        ("Overlays", &catalog.overlays),
    ] {
        println!("{title}:");
        for item in items {
            println!("  {:<16} {}", item.name, item.description);
        }
        println!();
    }

    println!("Presets:");
    for p in presets {
        println!("  {:<16} {}", p.name, p.description);
    }
    Ok(())
}

async fn show_ledger(config: &Config, json: bool) -> Result<()> {
    let ledger = JobLedger::new(config.storage.ledger_path.clone());
    let entries = ledger.list().await.map_err(report)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    if entries.is_empty() {
        println!("No renders recorded in {}", ledger.path().display());
        return Ok(());
    }
    for entry in &entries {
        println!(
            "{}  {}  {} images  {:.1}s  {}",
            entry.timestamp.format("%Y-%m-%d %H:%M:%S"),
            entry.id.short(),
            entry.images.len(),
            entry.audio.duration_seconds,
            entry.output_filename
        );
    }
    Ok(())
}

async fn probe_file(config: &Config, file: &Path, json: bool) -> Result<()> {
    if !file.exists() {
        anyhow::bail!("File does not exist: {:?}", file);
    }

    let tools = Arc::new(ToolRegistry::discover(&config.tools));
    let probe = FfmpegProbe::new(tools, Duration::from_secs(config.jobs.probe_timeout_secs));
    let estimator = DurationEstimator::new(Arc::new(probe), config.duration.clone());
    let estimate = estimator
        .estimate_detailed(file, config.duration.fallback_seconds)
        .await;

    if json {
        println!("{}", serde_json::to_string_pretty(&estimate)?);
    } else {
        println!("File: {}", file.display());
        println!("Duration: {:.3}s", estimate.seconds);
        println!("Source: {}", estimate.source);
    }
    Ok(())
}

fn check_tools(config: &Config) -> Result<()> {
    println!("Checking external tools...\n");

    let tools = ToolRegistry::discover(&config.tools).check_all();
    let mut all_ok = true;

    for tool in &tools {
        let status = if tool.available {
            "✓"
        } else {
            all_ok = false;
            "✗"
        };

        print!("{} {}", status, tool.name);
        if let Some(ref version) = tool.version {
            print!(" ({})", version.lines().next().unwrap_or(""));
        }
        if let Some(ref path) = tool.path {
            print!(" - {}", path.display());
        }
        println!();
    }

    println!();
    if all_ok {
        println!("All required tools are available!");
    } else {
        println!("Some tools are missing. Rendering needs both ffmpeg and ffprobe.");
    }
    Ok(())
}

fn validate_config(path: Option<&Path>) -> Result<()> {
    let config = match path {
        Some(p) => {
            println!("Validating config: {:?}", p);
            Config::load(p).map_err(report)?
        }
        None => {
            println!("No config file specified, using defaults");
            Config::default()
        }
    };
    config.check().map_err(report)?;

    println!("✓ Configuration is valid");
    println!(
        "  Video: {}x{} @ {} fps, {} crf {} ({})",
        config.video.width,
        config.video.height,
        config.video.fps,
        config.video.video_codec,
        config.video.crf,
        config.video.preset
    );
    println!("  Output dir: {}", config.storage.output_dir.display());
    println!("  Ledger: {}", config.storage.ledger_path.display());
    println!("  Max concurrent jobs: {}", config.jobs.max_concurrent);
    for warning in config.validate() {
        println!("  ⚠ {warning}");
    }
    Ok(())
}
