use crate::{
    config::Config,
    engine::{Engine, native::NativeEngine},
    entities::{EntityRecognizer, RuleRecognizer, extract_entities},
    pipeline::Pipeline,
    util::{ensure_dir, now_rfc3339},
};
use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, Layer, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "brochure-forge")]
#[command(about = "Turn a product datasheet PDF into a brochure PDF")]
pub struct Args {
    #[command(subcommand)]
    pub cmd: Command,

    /// Path to config TOML. If omitted, uses ./brochure-forge.toml if present, else built-in defaults.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Override log level (trace/debug/info/warn/error).
    #[arg(long)]
    pub log_level: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Extract, refine and render the brochure.
    Run {
        #[arg(long)]
        input: Option<PathBuf>,
        #[arg(long)]
        out_dir: Option<PathBuf>,
        #[arg(long)]
        images_dir: Option<PathBuf>,
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Dump the extracted text to a UTF-8 file.
    ExtractText {
        #[arg(long)]
        input: Option<PathBuf>,
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Write every embedded image to a directory.
    Images {
        #[arg(long)]
        input: Option<PathBuf>,
        #[arg(long)]
        out_dir: Option<PathBuf>,
    },
    /// Print the refined product overview.
    Overview {
        #[arg(long)]
        input: Option<PathBuf>,
    },
    /// Print recognized entities and feature sentences.
    Entities {
        #[arg(long)]
        input: Option<PathBuf>,
    },
    /// Print page, image and text counts.
    Inspect {
        #[arg(long)]
        input: Option<PathBuf>,
    },
}

impl Command {
    /// The `--input` override; every subcommand reads one PDF.
    pub fn input(&self) -> Option<&Path> {
        match self {
            Command::Run { input, .. }
            | Command::ExtractText { input, .. }
            | Command::Images { input, .. }
            | Command::Overview { input }
            | Command::Entities { input }
            | Command::Inspect { input } => input.as_deref(),
        }
    }
}

pub fn dispatch(args: Args) -> Result<()> {
    let cfg = load_config(args.config.as_deref())?;
    let log_path = resolve_log_path(&cfg);
    let _guard = init_logging(&args, &cfg, log_path.as_deref())?;

    let input = resolve_input(&cfg, args.cmd.input());
    validate_input(&input)?;

    match &args.cmd {
        Command::Run {
            out_dir,
            images_dir,
            output,
            ..
        } => run(
            &cfg,
            &input,
            out_dir.as_deref(),
            images_dir.as_deref(),
            output.as_deref(),
        ),
        Command::ExtractText { output, .. } => extract_text(&cfg, &input, output.as_deref()),
        Command::Images { out_dir, .. } => images(&cfg, &input, out_dir.as_deref()),
        Command::Overview { .. } => overview(&cfg, &input),
        Command::Entities { .. } => entities(&cfg, &input),
        Command::Inspect { .. } => inspect(&input),
    }
}

fn load_config(user: Option<&Path>) -> Result<Config> {
    if let Some(p) = user {
        return Config::load(p);
    }
    let default = PathBuf::from("brochure-forge.toml");
    if default.exists() {
        Config::load(&default)
    } else {
        Ok(Config::default())
    }
}

pub fn resolve_input(cfg: &Config, user: Option<&Path>) -> PathBuf {
    user.map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(&cfg.paths.input_pdf))
}

fn init_logging(args: &Args, cfg: &Config, file_path: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let level = args
        .log_level
        .as_deref()
        .unwrap_or(cfg.logging.level.as_str());

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    // stdout carries command output; logs go to stderr.
    let stderr_layer = if cfg.logging.json {
        tracing_subscriber::fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_target(true)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .boxed()
    };

    let (file_layer, guard) = if let Some(path) = file_path {
        let parent = path.parent().unwrap_or_else(|| Path::new("."));
        ensure_dir(parent)?;
        let file = std::fs::File::create(path)
            .with_context(|| format!("create log file: {}", path.display()))?;
        let (non_blocking, guard) = tracing_appender::non_blocking(file);
        let layer = tracing_subscriber::fmt::layer()
            .with_writer(non_blocking)
            .with_ansi(false)
            .with_target(true)
            .boxed();
        (Some(layer), Some(guard))
    } else {
        (None, None)
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| anyhow!("failed to init logging: {e}"))?;

    Ok(guard)
}

fn resolve_log_path(cfg: &Config) -> Option<PathBuf> {
    if !cfg.logging.write_to_file {
        return None;
    }
    if !cfg.logging.file_path.is_empty() {
        return Some(PathBuf::from(&cfg.logging.file_path));
    }
    Some(PathBuf::from(&cfg.paths.out_dir).join("brochure-forge.log"))
}

pub fn validate_input(input: &Path) -> Result<()> {
    if !input.exists() {
        return Err(anyhow!("input does not exist: {}", input.display()));
    }

    if let Some(ext) = input.extension().and_then(|s| s.to_str()) {
        if !ext.eq_ignore_ascii_case("pdf") {
            return Err(anyhow!("input is not a PDF: {}", input.display()));
        }
    } else {
        warn!("input has no extension; assuming PDF: {}", input.display());
    }

    Ok(())
}

fn run(
    cfg: &Config,
    input: &Path,
    out_override: Option<&Path>,
    images_override: Option<&Path>,
    output_override: Option<&Path>,
) -> Result<()> {
    let out_dir = out_override
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(&cfg.paths.out_dir));
    let images_dir = images_override
        .map(PathBuf::from)
        .unwrap_or_else(|| out_dir.join(&cfg.paths.images_dir));
    let output = output_override
        .map(PathBuf::from)
        .unwrap_or_else(|| out_dir.join(&cfg.paths.brochure_filename));
    ensure_dir(&out_dir)?;

    info!("input={} out={}", input.display(), out_dir.display());

    if cfg.debug.dump_effective_config {
        let raw = toml::to_string(cfg).unwrap_or_default();
        std::fs::write(out_dir.join("effective-config.toml"), raw)?;
    }

    let recognizer = if cfg.entities.enabled {
        Some(RuleRecognizer::new(&cfg.entities)?)
    } else {
        None
    };

    let pipeline = Pipeline::new(cfg, NativeEngine::new());
    let started = now_rfc3339();
    let result = pipeline.run(
        input,
        &images_dir,
        &output,
        recognizer.as_ref().map(|r| r as &dyn EntityRecognizer),
    )?;

    if cfg.output.write_report_json {
        std::fs::write(
            out_dir.join(&cfg.output.report_filename),
            serde_json::to_string_pretty(&result.report)?,
        )?;
    }

    if cfg.output.write_text {
        std::fs::write(out_dir.join(&cfg.output.text_filename), &result.text)?;
    }

    if let Some(entities) = &result.entities {
        std::fs::write(
            out_dir.join(&cfg.output.entities_filename),
            serde_json::to_string_pretty(entities)?,
        )?;
    }

    if cfg.output.write_index_json {
        let index = serde_json::json!({
            "started": started,
            "finished": now_rfc3339(),
            "brochure": output,
            "images_dir": images_dir,
            "images": result.images.iter().map(|i| &i.path).collect::<Vec<_>>(),
            "report": cfg.output.write_report_json.then(|| cfg.output.report_filename.clone()),
        });
        std::fs::write(out_dir.join("index.json"), serde_json::to_string_pretty(&index)?)?;
    }

    println!("Brochure created at: {}", output.display());

    if cfg.global.print_summary {
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "brochure": output,
                "pages": result.render.page_count,
                "images": result.images.len(),
                "degraded": result.report.degraded,
                "status": if result.report.is_degraded() { "degraded" } else { "ok" },
            }))?
        );
    }

    Ok(())
}

fn extract_text(cfg: &Config, input: &Path, output: Option<&Path>) -> Result<()> {
    let output = output
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(&cfg.paths.text_dump_path));

    let pipeline = Pipeline::new(cfg, NativeEngine::new());
    let text = pipeline.extract_text(input)?;

    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        ensure_dir(parent)?;
    }
    std::fs::write(&output, text.as_bytes())
        .with_context(|| format!("writing text: {}", output.display()))?;

    println!(
        "Text extraction complete. The extracted text is saved to {}",
        output.display()
    );
    Ok(())
}

fn images(cfg: &Config, input: &Path, out_dir: Option<&Path>) -> Result<()> {
    let out_dir = out_dir
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(&cfg.paths.images_dir));
    let images = NativeEngine::new().extract_images(input, &out_dir)?;
    println!("{}", serde_json::to_string_pretty(&images)?);
    Ok(())
}

fn overview(cfg: &Config, input: &Path) -> Result<()> {
    let pipeline = Pipeline::new(cfg, NativeEngine::new());
    let refined = pipeline.refine(input)?;
    println!("{}", serde_json::to_string_pretty(&refined)?);
    Ok(())
}

fn entities(cfg: &Config, input: &Path) -> Result<()> {
    let recognizer = RuleRecognizer::new(&cfg.entities)?;
    let pipeline = Pipeline::new(cfg, NativeEngine::new());
    let text = pipeline.extract_text(input)?;
    let buckets = extract_entities(&recognizer, &text, &cfg.entities.sentence_keywords);
    println!("{}", serde_json::to_string_pretty(&buckets)?);
    Ok(())
}

fn inspect(input: &Path) -> Result<()> {
    let probe = NativeEngine::new().probe_pdf(input)?;
    println!(
        "{}",
        serde_json::to_string_pretty(&serde_json::json!({
            "probe": probe,
            "image_count": probe.image_count(),
        }))?
    );
    Ok(())
}
