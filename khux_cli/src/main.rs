use std::fs::{self, File};
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use indicatif::{ParallelProgressIterator, ProgressBar, ProgressDrawTarget, ProgressStyle};
use khux::{texture::TextureHeader, DecodedImage, EntryPath, Extractor, FileType};
use path_clean::PathClean;
use rayon::prelude::*;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
struct ActionInfo {
    /// Input file path
    #[arg(index = 1)]
    input: String,
}

#[derive(Parser, Debug)]
struct ActionList {
    /// Input BGAD container path
    #[arg(index = 1)]
    input: String,

    /// Fail on a truncated or garbled container tail instead of stopping there
    #[arg(long, default_value = "false")]
    strict: bool,
}

#[derive(Parser, Debug)]
struct ActionUnpack {
    /// Input files, BGAD containers or BTF textures
    #[arg(index = 1, required = true)]
    input: Vec<String>,

    /// Output directory
    #[arg(short, long, default_value = "extracted_files")]
    output: String,

    /// Also write each texture composited onto its canvas
    #[arg(short, long, default_value = "false")]
    canvas: bool,

    /// Fail on a truncated or garbled container tail instead of stopping there
    #[arg(long, default_value = "false")]
    strict: bool,

    /// Hides normal output such as progress bar and completion status
    #[arg(short, long, default_value = "false")]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Action {
    /// Print file type and header info
    Info(ActionInfo),
    /// List BGAD container entries
    List(ActionList),
    /// Extract containers and decode textures
    Unpack(ActionUnpack),
}

#[derive(Parser, Debug)]
#[command(author, version)]
struct Args {
    #[command(subcommand)]
    action: Action,

    /// Verbose logging to stderr
    #[arg(short, long, global = true, default_value = "false")]
    verbose: bool,
}

fn main() -> Result<(), khux::Error> {
    let args = Args::parse();
    init_logging(args.verbose);

    match args.action {
        Action::Info(args) => info(args),
        Action::List(args) => list(args),
        Action::Unpack(args) => unpack(args),
    }
}

fn init_logging(verbose: bool) {
    let filter = match verbose {
        true => EnvFilter::new("debug"),
        false => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn discard(_: &EntryPath, _: Vec<u8>) -> Result<(), khux::Error> {
    Ok(())
}

fn info(args: ActionInfo) -> Result<(), khux::Error> {
    let mut reader = BufReader::new(File::open(&args.input)?);
    let file_type = FileType::read(&mut reader)?;
    println!("type: {file_type}");
    match file_type {
        FileType::Container => {
            let container = Extractor::new().scan(&mut reader, &mut discard)?;
            println!("{} entries", container.len());
        }
        FileType::Texture => {
            let header = TextureHeader::read(&mut reader)?;
            println!("format: {}", header.format);
            println!("size: {}x{}", header.width, header.height);
            println!(
                "canvas: {}x{} at {},{}",
                header.canvas.width,
                header.canvas.height,
                header.canvas.offset_x,
                header.canvas.offset_y
            );
            println!("palette size: {}", header.palette_size);
            println!("compressed size: {}", header.compressed_size);
        }
        FileType::Lwf => {}
    }
    Ok(())
}

fn list(args: ActionList) -> Result<(), khux::Error> {
    let mut reader = BufReader::new(File::open(&args.input)?);
    if FileType::read(&mut reader)? != FileType::Container {
        return Err(khux::Error::Other("input is not a BGAD container"));
    }
    let container = Extractor::new()
        .strict(args.strict)
        .scan(&mut reader, &mut discard)?;
    for entry in container.entries() {
        println!("{:#010x} {}", entry.offset, entry.name);
    }
    Ok(())
}

fn unpack(args: ActionUnpack) -> Result<(), khux::Error> {
    let output = PathBuf::from(&args.output);
    fs::create_dir_all(&output)?;

    let extractor = Extractor::new().strict(args.strict);
    let style = ProgressStyle::with_template("{bar:40.cyan/blue} {pos}/{len} {wide_msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar());
    let progress = ProgressBar::new(args.input.len() as u64).with_style(style);
    if args.quiet {
        progress.set_draw_target(ProgressDrawTarget::hidden());
    }

    let counts = args
        .input
        .par_iter()
        .progress_with(progress)
        .map(|input| unpack_file(&extractor, Path::new(input), &output, args.canvas))
        .collect::<Result<Vec<_>, _>>()?;

    if !args.quiet {
        println!(
            "Unpacked {} files to {}",
            counts.iter().sum::<usize>(),
            output.display()
        );
    }
    Ok(())
}

/// Extracts a single input, returning how many files were written.
fn unpack_file(
    extractor: &Extractor,
    input: &Path,
    output: &Path,
    canvas: bool,
) -> Result<usize, khux::Error> {
    let file_name = input
        .file_name()
        .ok_or(khux::Error::Other("input has no file name"))?
        .to_string_lossy()
        .into_owned();
    let mut reader = BufReader::new(File::open(input)?);

    match FileType::read(&mut reader)? {
        FileType::Container => {
            let root = output.join("bgad").join(&file_name).clean();
            let mut sink = |entry: &EntryPath, data: Vec<u8>| -> Result<(), khux::Error> {
                let file_path = root.join(entry.to_path_buf()).clean();
                if file_path == root || !file_path.starts_with(&root) {
                    return Err(khux::Error::WriteOutsideOutput(entry.to_string()));
                }
                if let Some(parent) = file_path.parent() {
                    fs::create_dir_all(parent)?;
                }
                tracing::info!("extracting {}", file_path.display());
                fs::write(&file_path, data)?;
                Ok(())
            };
            let container = extractor.scan(&mut reader, &mut sink)?;
            Ok(container.len())
        }
        FileType::Texture => {
            let image = extractor.decode_texture(&mut reader)?;
            write_png(&image, &output.join(format!("{file_name}.png")))?;
            if !canvas {
                return Ok(1);
            }
            let composited = image.composite();
            if composited.width == 0 || composited.height == 0 {
                tracing::warn!("{file_name} has an empty canvas, skipping");
                return Ok(1);
            }
            write_png(&composited, &output.join(format!("{file_name}_canvas.png")))?;
            Ok(2)
        }
        file_type @ FileType::Lwf => Err(khux::Error::UnsupportedFileType(file_type)),
    }
}

fn write_png(image: &DecodedImage, path: &Path) -> Result<(), khux::Error> {
    tracing::info!("writing {}", path.display());
    image::save_buffer_with_format(
        path,
        &image.pixels,
        image.width,
        image.height,
        image::ExtendedColorType::Rgba8,
        image::ImageFormat::Png,
    )
    .map_err(io::Error::other)?;
    Ok(())
}
