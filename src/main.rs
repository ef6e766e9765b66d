//! A CLI tool for decoding an Explicit VR Little Endian DICOM file into a
//! 16-bit grayscale PNG.
use std::path::PathBuf;

use clap::Parser;
use dicom_reader::service::{read_file, to_image};
use snafu::{Report, ResultExt, Whatever};
use tracing::{error, Level};

/// Decode a DICOM file into a 16-bit grayscale image
#[derive(Debug, Parser)]
struct App {
    /// Path to the DICOM file to decode
    file: PathBuf,

    /// Path to the output image
    /// (default is to replace input extension with `.png`)
    #[arg(short = 'o', long = "out")]
    output: Option<PathBuf>,

    /// Print more information while decoding
    #[arg(short = 'v', long = "verbose")]
    verbose: bool,
}

fn main() {
    let App {
        file,
        output,
        verbose,
    } = App::parse();

    tracing::subscriber::set_global_default(
        tracing_subscriber::FmtSubscriber::builder()
            .with_max_level(if verbose { Level::DEBUG } else { Level::INFO })
            .finish(),
    )
    .whatever_context("Could not set up global logging subscriber")
    .unwrap_or_else(|e: Whatever| {
        eprintln!("[ERROR] {}", Report::from_error(e));
    });

    let output = output.unwrap_or_else(|| {
        let mut path = file.clone();
        path.set_extension("png");
        path
    });

    let descriptor = read_file(&file).unwrap_or_else(|e| {
        error!("{}", Report::from_error(e));
        std::process::exit(-1);
    });

    if verbose {
        println!(
            "{}x{} image, {} byte(s) per pixel",
            descriptor.columns, descriptor.rows, descriptor.bytes_per_pixel
        );
    }

    let img = to_image(&descriptor);

    img.save(&output).unwrap_or_else(|e| {
        error!("{}", Report::from_error(e));
        std::process::exit(-2);
    });

    if verbose {
        println!("Image saved to {}", output.display());
    }
}
