use clap::{Args, Parser, Subcommand, ValueEnum};
use imgpress::config::{self, OptimizerConfig};
use imgpress::imaging::{Dimensions, OutputFormat, Resample, is_supported_input, plan_for};
use imgpress::optimize::{Optimizer, OptimizerOptions};
use imgpress::types::{SourceImage, mime_from_filename};
use imgpress::{archive, output};
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use walkdir::WalkDir;

#[derive(Parser)]
#[command(name = "imgpress")]
#[command(about = "Resize, flatten and re-encode images for the web")]
#[command(long_about = "\
Resize, flatten and re-encode images for the web

Every image is decoded, scaled down to fit the output bounds (never up),
composited onto a white background, and re-encoded as JPEG, PNG or WebP.
Results are written as optimized_<name>.<ext>.

Inputs: JPEG, PNG, WebP, GIF (first frame). Directories are walked
recursively for files with those extensions.

Settings are layered: stock defaults, then imgpress.toml, then flags.
Run 'imgpress gen-config' to generate a documented imgpress.toml.")]
#[command(version)]
struct Cli {
    /// Config file (missing file = stock defaults)
    #[arg(long, default_value = config::CONFIG_FILENAME, global = true)]
    config: PathBuf,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace). RUST_LOG overrides.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

/// Output bound flags shared by commands that plan dimensions.
#[derive(Args, Clone, Default)]
struct BoundsArgs {
    /// Maximum output width
    #[arg(long)]
    max_width: Option<u32>,

    /// Maximum output height
    #[arg(long)]
    max_height: Option<u32>,

    /// Use 3840x2160 bounds
    #[arg(long, conflicts_with_all = ["max_width", "max_height"])]
    uhd: bool,
}

#[derive(Args)]
struct OptimizeArgs {
    /// Image files or directories
    #[arg(required = true)]
    paths: Vec<PathBuf>,

    /// Encoding quality (1-100, ignored for png)
    #[arg(short, long, value_parser = clap::value_parser!(u32).range(1..=100))]
    quality: Option<u32>,

    /// Output format: jpeg, png, webp (or a MIME type)
    #[arg(short, long)]
    format: Option<OutputFormat>,

    #[command(flatten)]
    bounds: BoundsArgs,

    /// Resampling filter
    #[arg(long, value_enum)]
    filter: Option<Resample>,

    /// Directory for optimized files
    #[arg(long, default_value = "optimized")]
    out_dir: PathBuf,

    /// Also bundle all results into this ZIP file
    #[arg(long, value_name = "FILE")]
    zip: Option<PathBuf>,

    /// Print a JSON report instead of the text summary
    #[arg(long)]
    json: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Optimize images and write the results
    Optimize(OptimizeArgs),
    /// Print the planned output size for a source size
    Plan {
        width: u32,
        height: u32,
        #[command(flatten)]
        bounds: BoundsArgs,
    },
    /// Print a stock imgpress.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Command::Optimize(args) => {
            let overrides = optimize_overrides(&args);
            let config = config::load_config(&cli.config, Some(overrides))?;
            init_thread_pool(&config.processing);
            if !run_optimize(&args, &config)? {
                std::process::exit(1);
            }
        }
        Command::Plan {
            width,
            height,
            bounds,
        } => {
            let config = config::load_config(&cli.config, Some(bounds_overrides(&bounds)))?;
            let source = Dimensions::new(width, height);
            let planned = plan_for(source, config.bounds());
            println!("{}", output::format_plan(source, planned, config.bounds()));
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

/// Log to stderr so `--json` output on stdout stays clean.
fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}

/// Initialize the rayon thread pool based on processing config.
///
/// Capped at the number of available CPU cores: config can constrain down, not up.
fn init_thread_pool(processing: &config::ProcessingConfig) {
    let threads = config::effective_threads(processing);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
}

/// Sparse TOML overlay for the bound flags.
fn bounds_overrides(args: &BoundsArgs) -> toml::Value {
    let mut limits = toml::Table::new();
    let (width, height) = if args.uhd {
        (Some(3840), Some(2160))
    } else {
        (args.max_width, args.max_height)
    };
    if let Some(w) = width {
        limits.insert("max_width".into(), toml::Value::Integer(w.into()));
    }
    if let Some(h) = height {
        limits.insert("max_height".into(), toml::Value::Integer(h.into()));
    }

    let mut root = toml::Table::new();
    if !limits.is_empty() {
        root.insert("limits".into(), toml::Value::Table(limits));
    }
    toml::Value::Table(root)
}

/// Sparse TOML overlay for every optimize flag that was given.
///
/// Previews are always off here: the CLI writes results to disk instead.
fn optimize_overrides(args: &OptimizeArgs) -> toml::Value {
    let mut root = match bounds_overrides(&args.bounds) {
        toml::Value::Table(t) => t,
        _ => toml::Table::new(),
    };

    let mut encode = toml::Table::new();
    if let Some(q) = args.quality {
        encode.insert("quality".into(), toml::Value::Integer(q.into()));
    }
    if let Some(f) = args.format {
        encode.insert("format".into(), toml::Value::String(f.to_string()));
    }
    if !encode.is_empty() {
        root.insert("encode".into(), toml::Value::Table(encode));
    }

    if let Some(filter) = args.filter.and_then(|f| f.to_possible_value()) {
        let mut resample = toml::Table::new();
        resample.insert(
            "filter".into(),
            toml::Value::String(filter.get_name().to_string()),
        );
        root.insert("resample".into(), toml::Value::Table(resample));
    }

    let mut preview = toml::Table::new();
    preview.insert("enabled".into(), toml::Value::Boolean(false));
    root.insert("preview".into(), toml::Value::Table(preview));

    toml::Value::Table(root)
}

/// Expand the given paths into image files. Directories are walked
/// recursively for supported extensions; explicit files are always kept so
/// unsupported ones are reported instead of silently skipped.
fn collect_inputs(paths: &[PathBuf]) -> Vec<PathBuf> {
    let mut files = Vec::new();
    for path in paths {
        if !path.is_dir() {
            files.push(path.clone());
            continue;
        }
        for entry in WalkDir::new(path).sort_by_file_name() {
            match entry {
                Ok(e) if e.file_type().is_file() && has_supported_extension(e.path()) => {
                    files.push(e.into_path());
                }
                Ok(_) => {}
                Err(e) => warn!(error = %e, "skipping unreadable entry"),
            }
        }
    }
    files
}

fn has_supported_extension(path: &Path) -> bool {
    path.file_name()
        .map(|n| is_supported_input(mime_from_filename(&n.to_string_lossy())))
        .unwrap_or(false)
}

/// Optimize every input, write results, and report. Returns `false` if any
/// input failed.
fn run_optimize(
    args: &OptimizeArgs,
    config: &OptimizerConfig,
) -> Result<bool, Box<dyn std::error::Error>> {
    let inputs = collect_inputs(&args.paths);
    let mut names = Vec::with_capacity(inputs.len());
    let mut sources = Vec::with_capacity(inputs.len());
    let mut unreadable = 0;

    for path in &inputs {
        match SourceImage::from_path(path) {
            Ok(source) => {
                names.push(path.display().to_string());
                sources.push(source);
            }
            Err(e) => {
                eprintln!("Failed to read {}: {}", path.display(), e);
                unreadable += 1;
            }
        }
    }

    let optimizer = Optimizer::new(OptimizerOptions::from_config(config));
    let settings = config.encode_settings();
    let results = optimizer.optimize_batch(&sources, settings);

    std::fs::create_dir_all(&args.out_dir)?;
    let mut written = Vec::new();
    for result in results.iter().flatten() {
        let path = args.out_dir.join(&result.filename);
        std::fs::write(&path, &result.bytes)?;
        written.push(path);
    }
    info!(count = written.len(), dir = %args.out_dir.display(), "wrote outputs");

    if args.json {
        let report = output::json_entries(&names, &results);
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        output::print_optimize_output(&names, &results, &settings, config.bounds());
    }

    if let Some(zip_path) = &args.zip {
        let ok: Vec<_> = results.into_iter().filter_map(Result::ok).collect();
        let size = archive::write_bundle(zip_path, &ok)?;
        if !args.json {
            println!("{}", output::format_archive_line(&zip_path.display().to_string(), size));
        }
    }

    let failed = written.len() < sources.len();
    Ok(unreadable == 0 && !failed && !inputs.is_empty())
}
