use std::path::PathBuf;
use std::process;

use clap::{ArgGroup, Args, Parser, Subcommand};

use photo_watermark::{
    parse_coordinate, run_batch, BatchObserver, BatchRequest, BatchSummary, FileOutcome,
    Previewer, Watermark, DEFAULT_OFFSET,
};

#[derive(Parser)]
#[command(
    name = "photo-watermark",
    about = "Stamp a watermark image onto every photo in a folder",
    version,
    after_help = "Batch:    photo-watermark apply -s photos/ -w logo.svg -o out/ -x 10 -y 10\n\
                  Preview:  photo-watermark preview -w logo.png -s photos/\n\n\
                  Photos (png, jpg, jpeg, heic) are found recursively and written as PNG\n\
                  under the output folder, keeping their relative paths.\n\n\
                  HEIC decoding needs a build with `--features heic` (system libheif);\n\
                  without it every .heic file is reported as failed."
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Suppress all non-error output
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Watermark every photo under a folder into a mirrored output folder
    Apply(ApplyArgs),
    /// Render one watermarked preview image
    Preview(PreviewArgs),
}

#[derive(Args)]
struct Position {
    /// Left offset of the watermark in pixels (clamped to the photo)
    #[arg(short = 'x', long = "x", default_value_t = DEFAULT_OFFSET, value_parser = coordinate, allow_negative_numbers = true)]
    x: i64,

    /// Top offset of the watermark in pixels (clamped to the photo)
    #[arg(short = 'y', long = "y", default_value_t = DEFAULT_OFFSET, value_parser = coordinate, allow_negative_numbers = true)]
    y: i64,
}

#[derive(Args)]
struct ApplyArgs {
    /// Folder containing the photos
    #[arg(short, long)]
    source: PathBuf,

    /// Watermark image (svg, png, jpg, jpeg, heic)
    #[arg(short, long)]
    watermark: PathBuf,

    /// Output folder
    #[arg(short, long)]
    output: PathBuf,

    #[command(flatten)]
    position: Position,
}

#[derive(Args)]
#[command(group(
    ArgGroup::new("input")
        .required(true)
        .args(["source", "base64", "base64_file"])
))]
struct PreviewArgs {
    /// Watermark image (svg, png, jpg, jpeg, heic)
    #[arg(short, long)]
    watermark: PathBuf,

    /// Preview the first usable photo in this folder
    #[arg(short, long)]
    source: Option<PathBuf>,

    /// Preview a base64 image, optionally a `data:image/...;base64,` URI
    #[arg(long)]
    base64: Option<String>,

    /// Read the base64 image from a file instead
    #[arg(long)]
    base64_file: Option<PathBuf>,

    /// Where to write the preview (default: system temp dir)
    #[arg(long)]
    preview_path: Option<PathBuf>,

    #[command(flatten)]
    position: Position,
}

fn coordinate(text: &str) -> Result<i64, String> {
    parse_coordinate(text).map_err(|e| e.to_string())
}

/// Prints one line per file, in the same shape for every run.
struct Console {
    verbose: bool,
    quiet: bool,
}

impl BatchObserver for Console {
    fn on_file_done(&self, outcome: &FileOutcome) {
        log::debug!("{} -> {}", outcome.path.display(), outcome.output.display());
        if !self.quiet {
            eprintln!("[OK] {}", outcome.path.display());
        }
        if self.verbose {
            eprintln!("  -> {}", outcome.output.display());
        }
    }

    fn on_file_failed(&self, outcome: &FileOutcome) {
        log::debug!("{} failed: {}", outcome.path.display(), outcome.message);
        eprintln!("[FAIL] {}: {}", outcome.path.display(), outcome.message);
    }

    fn on_finished(&self, summary: &BatchSummary) {
        if self.quiet {
            return;
        }
        eprintln!();
        eprint!("[Summary] Processed: {}", summary.processed);
        if summary.failed > 0 {
            eprint!(", Failed: {}", summary.failed);
        }
        eprintln!(" (Total: {})", summary.total());
    }
}

fn main() {
    let cli = Cli::parse();

    let level = if cli.quiet {
        "error"
    } else if cli.verbose {
        "debug"
    } else {
        "info"
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let console = Console {
        verbose: cli.verbose,
        quiet: cli.quiet,
    };

    let code = match cli.command {
        Command::Apply(args) => apply(args, &console),
        Command::Preview(args) => preview(args, &console),
    };
    process::exit(code);
}

fn apply(args: ApplyArgs, console: &Console) -> i32 {
    let request = BatchRequest {
        source: args.source,
        watermark: args.watermark,
        output: args.output,
        x: args.position.x,
        y: args.position.y,
    };

    let summary = match run_batch(&request, console) {
        Ok(summary) => summary,
        Err(e) => {
            eprintln!("Error: {e}");
            return 1;
        }
    };

    if summary.total() == 0 {
        eprintln!(
            "No compatible images found under {}",
            request.source.display()
        );
    }

    i32::from(summary.failed > 0)
}

fn preview(args: PreviewArgs, console: &Console) -> i32 {
    if !args.watermark.is_file() {
        eprintln!(
            "Error: Watermark file does not exist: {}",
            args.watermark.display()
        );
        return 1;
    }

    let watermark = match Watermark::load(&args.watermark) {
        Ok(w) => w,
        Err(e) => {
            eprintln!("Error: {e}");
            return 1;
        }
    };

    let previewer = args
        .preview_path
        .map_or_else(Previewer::default, Previewer::new);
    let (x, y) = (args.position.x, args.position.y);

    let result = if let Some(folder) = &args.source {
        previewer.preview_first_in_folder(folder, Some(&watermark), x, y)
    } else {
        let text = match (args.base64, &args.base64_file) {
            (Some(text), _) => text,
            (None, Some(file)) => match std::fs::read_to_string(file) {
                Ok(text) => text,
                Err(e) => {
                    eprintln!("Error: Cannot read {}: {e}", file.display());
                    return 1;
                }
            },
            (None, None) => {
                eprintln!("Error: Provide --source, --base64 or --base64-file");
                return 1;
            }
        };
        previewer
            .preview_base64(&text, Some(&watermark), x, y)
            .map(Some)
    };

    match result {
        Ok(Some(path)) => {
            if !console.quiet {
                eprintln!("[OK] Preview generated");
            }
            println!("{}", path.display());
            0
        }
        Ok(None) => {
            eprintln!("No compatible images found for preview");
            1
        }
        Err(e) => {
            eprintln!("Error: {e}");
            1
        }
    }
}
