use std::{
    fs::{self, File},
    io::{BufWriter, Write},
    path::{Path, PathBuf},
    process::ExitCode,
};

use byteorder::{LittleEndian, WriteBytesExt};
use clap::{Parser, Subcommand, ValueEnum};
use jpeg12_decoder::{
    decode_with_options, get_info,
    image::{Bitmap, ImageEncoder},
    ppm::PNMEncoder,
    DecodeOptions, Report,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "jpeg12", version, about = "Inspect and decode 12-bit JPEG images")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the geometry and precision of an image
    Info {
        file: PathBuf,
        /// Indent the JSON report
        #[arg(long)]
        pretty: bool,
    },
    /// Decode an image, optionally writing its samples out
    Decode {
        file: PathBuf,
        /// Where to write the decoded samples
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[arg(long, value_enum, default_value_t = Format::Raw)]
        format: Format,
        /// Leave samples as decoded even when the image carries a Zen mask
        #[arg(long)]
        no_mask: bool,
        /// Rows requested from the decoder per call
        #[arg(long, default_value_t = 2, value_parser = clap::value_parser!(u8).range(1..=2))]
        scanlines: u8,
        /// Indent the JSON report
        #[arg(long)]
        pretty: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    /// Little-endian 16-bit samples, rows then channels
    Raw,
    /// 16-bit binary PGM or PPM
    Pnm,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let report = match cli.command {
        Command::Info { file, pretty } => info_cmd(&file).map(|r| (r, pretty)),
        Command::Decode {
            file,
            output,
            format,
            no_mask,
            scanlines,
            pretty,
        } => {
            let options = DecodeOptions {
                scanlines_per_read: scanlines as usize,
                apply_zen_mask: !no_mask,
            };
            decode_cmd(&file, output.as_deref(), format, &options).map(|r| (r, pretty))
        }
    };

    let (report, pretty) = match report {
        Ok(report) => report,
        Err(err) => {
            eprintln!("{err}");
            return ExitCode::FAILURE;
        }
    };
    let json = if pretty {
        report.to_json_pretty()
    } else {
        report.to_json()
    };
    match json {
        Ok(json) => println!("{json}"),
        Err(err) => {
            eprintln!("Failed to serialize report: {err}");
            return ExitCode::FAILURE;
        }
    }

    if report.is_error() {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

fn read_input(file: &Path) -> Result<Vec<u8>, String> {
    fs::read(file).map_err(|e| format!("Failed to read {}: {e}", file.display()))
}

fn info_cmd(file: &Path) -> Result<Report, String> {
    let data = read_input(file)?;
    Ok(Report::info(&get_info(&data)))
}

fn decode_cmd(
    file: &Path,
    output: Option<&Path>,
    format: Format,
    options: &DecodeOptions,
) -> Result<Report, String> {
    let data = read_input(file)?;

    // Size the buffer from the header; a failed lookup is reported by decode itself
    let header = get_info(&data).unwrap_or_default();
    let mut samples = vec![0u16; header.sample_count().unwrap_or(0)];
    let result = decode_with_options(&data, &mut samples, options);
    let report = Report::decode(&result);

    if let (Ok(decoded), Some(path)) = (&result, output) {
        let written = match format {
            Format::Raw => write_raw(path, &samples),
            Format::Pnm => {
                let bitmap = Bitmap {
                    channels: decoded.header.num_components,
                    size: (decoded.header.width, decoded.header.height),
                    precision: decoded.header.data_precision,
                    data: samples,
                };
                PNMEncoder::new(&bitmap).encode_to_file(&path.to_string_lossy())
            }
        };
        written.map_err(|e| format!("Failed to write {}: {e}", path.display()))?;
        tracing::info!("wrote {}", path.display());
    }

    Ok(report)
}

fn write_raw(path: &Path, samples: &[u16]) -> std::io::Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    for &sample in samples {
        writer.write_u16::<LittleEndian>(sample)?;
    }
    writer.flush()
}
