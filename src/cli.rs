// ============================================================================
// iopaint CLI — headless inpainting via command-line arguments
// ============================================================================
//
// Usage examples:
//   iopaint --input photo.png --mask blemish.png --output fixed.png
//   iopaint -i photo.jpg -m mask.png                  (writes photo_out.png)
//   iopaint -i scan.png -m mask.png --server 192.168.1.5:8080 --padding 128
//
// The mask is a grayscale PNG of the same dimensions as the input: non-zero
// pixels mark the region to inpaint.  All processing runs synchronously on
// the current thread.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;

use clap::Parser;

use crate::canvas::Document;
use crate::client::{DEFAULT_AUTHORITY, InpaintClient};
use crate::ops::inpaint::{self, InpaintOutcome, InpaintSettings};
use crate::ops::region::PAD;

// ============================================================================
// CLI argument definition (clap Derive)
// ============================================================================

/// Headless inpainting against a local IOPaint server.
///
/// Sends the masked region of an image (plus surrounding context) to the
/// server and writes the patched image back out — no GUI required.
#[derive(Parser, Debug)]
#[command(
    name = "iopaint",
    about = "Inpaint a masked image region via a local IOPaint server",
    long_about = "Send the masked region of an image, plus surrounding context,\n\
                  to a locally running IOPaint server and write the patched\n\
                  image back out.\n\n\
                  Example:\n  \
                  iopaint --input photo.png --mask blemish.png --output fixed.png"
)]
pub struct CliArgs {
    /// Input image (PNG, JPEG, WEBP, BMP).
    #[arg(short, long, value_name = "IMAGE")]
    pub input: PathBuf,

    /// Selection mask: grayscale PNG, same dimensions as the input.
    /// Non-zero pixels mark the region to inpaint.
    #[arg(short, long, value_name = "MASK.png")]
    pub mask: PathBuf,

    /// Output file path.  Defaults to the input path with an `_out` stem
    /// (never silently overwrites the input).
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Address of the IOPaint server.
    #[arg(long, value_name = "HOST:PORT", default_value = DEFAULT_AUTHORITY)]
    pub server: String,

    /// Context pixels included around the mask bounds.
    #[arg(long, default_value_t = PAD, value_name = "PIXELS")]
    pub padding: u32,

    /// Print region math and timing information.
    #[arg(short, long)]
    pub verbose: bool,
}

// ============================================================================
// Public entry point
// ============================================================================

/// Run the CLI and return an OS exit code (`0` = success).
pub fn run(args: CliArgs) -> ExitCode {
    let output = match args.output.clone() {
        Some(p) => p,
        None => default_output_path(&args.input),
    };

    let started = Instant::now();
    match run_one(&args, &output) {
        Ok(()) => {
            if args.verbose {
                println!(
                    "→ {} ({:.0}ms)",
                    output.display(),
                    started.elapsed().as_secs_f64() * 1000.0
                );
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

// ============================================================================
// Processing pipeline
// ============================================================================

fn run_one(args: &CliArgs, output: &Path) -> Result<(), String> {
    // -- Step 1: Load ----------------------------------------------------
    let input = image::open(&args.input)
        .map_err(|e| format!("could not load '{}': {}", args.input.display(), e))?
        .into_rgba8();
    let mask = image::open(&args.mask)
        .map_err(|e| format!("could not load mask '{}': {}", args.mask.display(), e))?
        .into_luma8();

    if input.dimensions() != mask.dimensions() {
        return Err(format!(
            "mask is {}×{} but input is {}×{} — dimensions must match",
            mask.width(),
            mask.height(),
            input.width(),
            input.height()
        ));
    }

    let mut doc = Document::from_image(input);
    doc.set_selection_mask(mask);

    // -- Step 2: Inpaint -------------------------------------------------
    let client = InpaintClient::new(args.server.clone());
    let settings = InpaintSettings {
        margin: args.padding,
    };
    let outcome = inpaint::run(&mut doc, &client, &settings)
        .map_err(|e| format!("inpaint failed: {}", e))?;

    for msg in doc.messages.drain(..) {
        eprintln!("warning: {}", msg);
    }

    match outcome {
        InpaintOutcome::Applied { region } => {
            if args.verbose {
                println!(
                    "patched region {}×{} at ({}, {})",
                    region.w, region.h, region.x, region.y
                );
            }
        }
        InpaintOutcome::NoSelection => {
            return Err("the mask selects no pixels".to_string());
        }
        InpaintOutcome::ServerUnreachable => {
            return Err(format!("no IOPaint server reachable at {}", args.server));
        }
    }

    // -- Step 3: Save ----------------------------------------------------
    save_output(&doc, output)
}

fn save_output(doc: &Document, path: &Path) -> Result<(), String> {
    let flat = doc.composite();
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();

    // JPEG has no alpha channel — drop it instead of failing the encode
    if matches!(ext.as_str(), "jpg" | "jpeg") {
        let rgb = image::DynamicImage::ImageRgba8(flat).into_rgb8();
        return rgb
            .save(path)
            .map_err(|e| format!("save failed: {}", e));
    }
    flat.save(path).map_err(|e| format!("save failed: {}", e))
}

/// `photo.png` → `photo_out.png`, alongside the input.
fn default_output_path(input: &Path) -> PathBuf {
    let parent = input.parent().unwrap_or(Path::new("."));
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "out".to_string());
    parent.join(format!("{}_out.png", stem))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_output_gets_an_out_stem() {
        assert_eq!(
            default_output_path(Path::new("shots/photo.png")),
            PathBuf::from("shots/photo_out.png")
        );
    }

    #[test]
    fn args_parse_with_defaults() {
        let args = CliArgs::parse_from(["iopaint", "-i", "a.png", "-m", "m.png"]);
        assert_eq!(args.server, DEFAULT_AUTHORITY);
        assert_eq!(args.padding, PAD);
        assert!(args.output.is_none());
    }
}
