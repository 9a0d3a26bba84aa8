use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use snapmerge::config::load_settings;
use snapmerge::config::merged::{MergedConfig, Overrides};
use snapmerge::intake::{self, MergeMode, UploadedFile};
use snapmerge::pipeline::assembler::Assembler;
use snapmerge::response::ErrorPayload;
use tracing_subscriber::EnvFilter;

const USAGE: &str = "\
Usage: snapmerge [OPTIONS] <image>...
  Merge images into one PDF, in the order given.

Options:
  --split             One PDF per image, bundled as a ZIP
  --no-labels         Do not caption pages with the filename
  --no-compress       Skip post-compression
  --quality <N>       Optimizer JPEG quality (1-100)
  --settings <file>   Settings YAML (default: ./settings.yaml if present)
  -o, --output <path> Output file (default: suggested name in current dir)
  --preview           Print the processing order as JSON and exit
  --verbose           Debug logging
  -h, --help          Show this help
  -V, --version       Show version";

struct CliArgs {
    inputs: Vec<PathBuf>,
    mode: MergeMode,
    overrides: Overrides,
    settings_path: Option<PathBuf>,
    output: Option<PathBuf>,
    preview: bool,
    verbose: bool,
}

fn parse_args(args: &[String]) -> Result<CliArgs, String> {
    let mut cli = CliArgs {
        inputs: Vec::new(),
        mode: MergeMode::Merge,
        overrides: Overrides::default(),
        settings_path: None,
        output: None,
        preview: false,
        verbose: false,
    };

    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--split" => cli.mode = MergeMode::Split,
            "--no-labels" => cli.overrides.add_labels = Some(false),
            "--no-compress" => cli.overrides.compress = Some(false),
            "--preview" => cli.preview = true,
            "--verbose" => cli.verbose = true,
            "--quality" => {
                let value = iter.next().ok_or("--quality requires a value")?;
                let q: u8 = value
                    .parse()
                    .map_err(|_| format!("invalid quality: '{value}'"))?;
                cli.overrides.optimize_quality = Some(q);
            }
            "--settings" => {
                let value = iter.next().ok_or("--settings requires a path")?;
                cli.settings_path = Some(PathBuf::from(value));
            }
            "-o" | "--output" => {
                let value = iter.next().ok_or("--output requires a path")?;
                cli.output = Some(PathBuf::from(value));
            }
            other if other.starts_with('-') && other.len() > 1 => {
                return Err(format!("unknown option: {other}"));
            }
            path => cli.inputs.push(PathBuf::from(path)),
        }
    }

    Ok(cli)
}

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().skip(1).collect();

    if args.is_empty() || args.iter().any(|a| a == "--help" || a == "-h") {
        eprintln!("{USAGE}");
        return if args.is_empty() {
            ExitCode::FAILURE
        } else {
            ExitCode::SUCCESS
        };
    }

    if args.iter().any(|a| a == "--version" || a == "-V") {
        eprintln!("snapmerge {}", env!("CARGO_PKG_VERSION"));
        return ExitCode::SUCCESS;
    }

    let cli = match parse_args(&args) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("ERROR: {e}");
            eprintln!("{USAGE}");
            return ExitCode::FAILURE;
        }
    };

    let default_filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    // Read inputs in argument order; unreadable paths become empty uploads so
    // they are reported as skipped like any other undecodable file.
    let mut files: Vec<UploadedFile> = Vec::with_capacity(cli.inputs.len());
    for path in &cli.inputs {
        let bytes = match std::fs::read(path) {
            Ok(b) => b,
            Err(e) => {
                eprintln!("WARNING: cannot read {}: {e}", path.display());
                Vec::new()
            }
        };
        files.push(UploadedFile::from_name(display_name(path), bytes));
    }

    if cli.preview {
        let report = intake::preview(&files);
        match serde_json::to_string_pretty(&report) {
            Ok(json) => println!("{json}"),
            Err(e) => {
                eprintln!("ERROR: {e}");
                return ExitCode::FAILURE;
            }
        }
        return ExitCode::SUCCESS;
    }

    let settings = match load_settings(cli.settings_path.as_deref()) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("ERROR: Failed to load settings: {e}");
            return ExitCode::FAILURE;
        }
    };
    let config = match MergedConfig::new(&settings, &cli.overrides) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("ERROR: {e}");
            return ExitCode::FAILURE;
        }
    };

    let mut assembler = match Assembler::new(config) {
        Ok(a) => a,
        Err(e) => {
            eprintln!("ERROR: {e}");
            return ExitCode::FAILURE;
        }
    };

    let outcome = match assembler.run(&files, cli.mode) {
        Ok(o) => o,
        Err(e) => {
            println!("{}", ErrorPayload::from(&e).to_json());
            eprintln!("ERROR: {e}");
            return ExitCode::FAILURE;
        }
    };

    for skip in &outcome.metadata.skipped {
        eprintln!("WARNING: skipped {}: {}", skip.filename, skip.reason);
    }

    let target = cli
        .output
        .unwrap_or_else(|| PathBuf::from(&outcome.metadata.suggested_filename));
    let saved = outcome.save_document(&target);
    let metadata = outcome.metadata.clone();
    outcome.schedule_cleanup(Duration::ZERO).wait();

    if let Err(e) = saved {
        eprintln!("ERROR: Failed to write {}: {e}", target.display());
        return ExitCode::FAILURE;
    }

    eprintln!(
        "OK: {} ({} processed, {} total, {} skipped)",
        target.display(),
        metadata.processed_images,
        metadata.total_files,
        metadata.skipped_files
    );
    ExitCode::SUCCESS
}

/// Upload name for a path: its final component, lossily converted.
fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned())
}
