//! PDF Print Rescaler CLI
//!
//! Command-line interface for shrinking PDF pages onto printable margins.

use anyhow::{bail, Context};
use clap::{Parser, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use rescale_pdf::inspect::inspect_pdf_bytes;
use rescale_pdf::naming::timestamped_output_path;
use rescale_pdf::options::{
    DEFAULT_DPI, DEFAULT_JPEG_QUALITY, DEFAULT_SCALE_PERCENT, DPI_CHOICES, MAX_SCALE_PERCENT,
    MIN_SCALE_PERCENT,
};
use rescale_pdf::{ImageEncoding, JobEvent, JobStatus, RescaleJob, RescaleOptions, RescaleRequest};
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

/// Shrink PDF page content onto same-size pages as high-resolution images
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Input PDF file path (prompted for when omitted)
    #[arg(value_name = "INPUT")]
    input: Option<PathBuf>,

    /// Output PDF file path (defaults to <input>_print_<timestamp>.pdf)
    #[arg(value_name = "OUTPUT")]
    output: Option<PathBuf>,

    /// Content size as a percentage of the page
    #[arg(
        short,
        long,
        default_value_t = DEFAULT_SCALE_PERCENT,
        value_parser = clap::value_parser!(u8).range(MIN_SCALE_PERCENT as i64..=MAX_SCALE_PERCENT as i64)
    )]
    scale: u8,

    /// Rasterization resolution (150, 200, 300, 400 or 600)
    #[arg(short, long, default_value_t = DEFAULT_DPI, value_parser = parse_dpi)]
    dpi: u32,

    /// How page images are stored
    #[arg(short, long, value_enum, default_value = "flate")]
    encoding: Encoding,

    /// JPEG quality (1-100, only used with --encoding jpeg)
    #[arg(
        short,
        long,
        default_value_t = DEFAULT_JPEG_QUALITY,
        value_parser = clap::value_parser!(u8).range(1..=100)
    )]
    quality: u8,

    /// Leave PDF streams uncompressed
    #[arg(long)]
    no_compress: bool,

    /// Print page sizes and image placement of INPUT instead of rescaling
    #[arg(long)]
    inspect: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum Encoding {
    /// Lossless Flate-compressed images
    Flate,
    /// Smaller, lossy JPEG images
    Jpeg,
}

impl From<Encoding> for ImageEncoding {
    fn from(encoding: Encoding) -> Self {
        match encoding {
            Encoding::Flate => ImageEncoding::Flate,
            Encoding::Jpeg => ImageEncoding::Jpeg,
        }
    }
}

fn parse_dpi(value: &str) -> Result<u32, String> {
    let dpi: u32 = value
        .parse()
        .map_err(|_| format!("`{}` is not a number", value))?;
    if DPI_CHOICES.contains(&dpi) {
        Ok(dpi)
    } else {
        Err(format!("DPI must be one of {:?}", DPI_CHOICES))
    }
}

fn prompt(stdin: &mut impl BufRead, label: &str) -> anyhow::Result<String> {
    print!("{}", label);
    io::stdout().flush()?;

    let mut line = String::new();
    stdin.read_line(&mut line)?;
    Ok(line.trim().to_string())
}

/// Resolve input and output paths, asking on `stdin` for what is missing.
///
/// Inspect mode only reads the input, so no output is resolved for it.
fn resolve_paths(
    args: &Args,
    stdin: &mut impl BufRead,
) -> anyhow::Result<(PathBuf, Option<PathBuf>)> {
    let input = match &args.input {
        Some(input) => input.clone(),
        None => {
            let answer = prompt(stdin, "Enter input PDF path: ")?;
            if answer.is_empty() {
                bail!("No input PDF given");
            }
            PathBuf::from(answer)
        }
    };

    if args.inspect {
        return Ok((input, None));
    }

    let output = match (&args.output, &args.input) {
        (Some(output), _) => output.clone(),
        (None, Some(_)) => timestamped_output_path(&input),
        (None, None) => {
            let answer = prompt(stdin, "Enter output PDF path: ")?;
            if answer.is_empty() {
                timestamped_output_path(&input)
            } else {
                PathBuf::from(answer)
            }
        }
    };
    Ok((input, Some(output)))
}

fn print_inspection(input: &Path) -> anyhow::Result<()> {
    let bytes = std::fs::read(input).with_context(|| format!("reading {:?}", input))?;
    let layouts = inspect_pdf_bytes(&bytes)?;

    for page in &layouts {
        println!(
            "Page {}: {:.1} x {:.1} pt, {} image(s)",
            page.page_number,
            page.width,
            page.height,
            page.images.len()
        );
        for image in &page.images {
            println!(
                "  /{} {} {}: {}x{} px [{}] at ({:.1}, {:.1}) size {:.1} x {:.1} pt",
                image.name,
                image.object_id.0,
                image.object_id.1,
                image.pixel_width,
                image.pixel_height,
                image.filter,
                image.rect.x,
                image.rect.y,
                image.rect.width,
                image.rect.height
            );
        }
    }

    Ok(())
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    let (input, output) = resolve_paths(&args, &mut io::stdin().lock())?;
    let Some(output) = output else {
        return print_inspection(&input);
    };

    if !input.is_file() {
        bail!("Input file not found: {:?}", input);
    }

    let options = RescaleOptions::from_percent(args.scale, args.dpi)?
        .with_encoding(args.encoding.into(), args.quality)
        .with_compression(!args.no_compress);

    println!("PDF Print Rescaler");
    println!("==================");
    println!("Input:  {:?}", input);
    println!("Output: {:?}", output);
    println!("Scale:  {}%, {} DPI", options.scale_percent(), options.dpi);

    let handle = RescaleJob::spawn(RescaleRequest {
        input,
        output: output.clone(),
        options,
    })
    .context("starting rescale worker")?;

    let bar = ProgressBar::new(0);
    bar.set_style(
        ProgressStyle::with_template("{bar:40.cyan/blue} {pos}/{len} pages {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );

    let status = handle.wait_with(|event, _| match event {
        JobEvent::Started { total } => bar.set_length(*total as u64),
        JobEvent::Progress(progress) => bar.set_position(progress.page as u64),
        _ => {}
    });

    match status {
        JobStatus::Done(summary) => {
            bar.finish_with_message("done");
            println!("\nProcessed {} pages", summary.pages);
            println!("{}", summary.size_report());
            println!("PDF successfully created for printing: {:?}", output);
            Ok(())
        }
        JobStatus::Cancelled => {
            bar.abandon_with_message("cancelled");
            bail!("Rescale cancelled; no output written")
        }
        JobStatus::Failed(message) => {
            bar.abandon_with_message("failed");
            bail!("Error: {}", message)
        }
        JobStatus::Idle | JobStatus::Processing { .. } => {
            bar.abandon();
            bail!("Rescale worker stopped without reporting a result")
        }
    }
}
