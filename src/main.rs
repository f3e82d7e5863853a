//! # Nelko CLI
//!
//! Command-line interface for the Nelko P21 label printer.
//!
//! ## Usage
//!
//! ```bash
//! # Device status (printer bound to /dev/rfcomm0)
//! nelko battery
//! nelko config --json
//! nelko ready
//!
//! # Print an image on the stock 14x40 mm label
//! nelko print --image label.png
//!
//! # Print a test pattern, or a solid black label
//! nelko print --pattern diagonal
//! nelko print --black --copies 2
//!
//! # Write the encoded job to a file instead of printing
//! nelko print --pattern diagonal --dry-run job.bin
//!
//! # Send TSPL2 statements directly
//! nelko raw "SIZE 14.0 mm,40.0 mm" "CLS" "BAR 0,0,96,50" "PRINT 1"
//! ```

use clap::{Parser, Subcommand};
use log::{info, LevelFilter};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use nelko::{
    DeviceStatus, NelkoError,
    job::{BitmapMode, Direction, LabelSpec, PrintJob},
    ota,
    printer::PrinterConfig,
    protocol::{EncodeOptions, LineEnding, Statement, tspl},
    render::{self, Dithering, patterns},
    session::{Session, SessionConfig},
    transport::{BluetoothTransport, bluetooth},
};

/// Nelko - P21 label printer utility
#[derive(Parser, Debug)]
#[command(name = "nelko")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Printer device path
    #[arg(long, global = true, default_value = bluetooth::DEFAULT_DEVICE)]
    device: String,

    /// Reply timeout in milliseconds
    #[arg(long, global = true, default_value = "1000")]
    timeout_ms: u64,

    /// Print statuses as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Show battery level and charging state
    Battery,

    /// Show resolution, versions and settings
    Config,

    /// Check whether the printer is ready
    Ready,

    /// Cancel a paused print
    CancelPause,

    /// Print an image, a test pattern, or a solid black label
    Print {
        /// Image file to print
        #[arg(long, value_name = "FILE", conflicts_with_all = ["pattern", "black"])]
        image: Option<PathBuf>,

        /// Test pattern to print (see --list)
        #[arg(long, conflicts_with = "black")]
        pattern: Option<String>,

        /// Print a fully black label
        #[arg(long)]
        black: bool,

        /// List available patterns
        #[arg(long)]
        list: bool,

        /// Label width in mm
        #[arg(long, default_value = "14.0")]
        width_mm: f32,

        /// Label height in mm
        #[arg(long, default_value = "40.0")]
        height_mm: f32,

        /// Gap between labels in mm
        #[arg(long, default_value = "5.0")]
        gap_mm: f32,

        /// Gap offset in mm
        #[arg(long, default_value = "0.0")]
        gap_offset_mm: f32,

        /// Print density (0-15)
        #[arg(long, default_value = "15")]
        density: u8,

        /// Mirror the output
        #[arg(long)]
        mirror: bool,

        /// Raster height in dots
        #[arg(long, default_value_t = PrinterConfig::DEFAULT_RASTER_ROWS)]
        rows: u32,

        /// Dithering: bayer or threshold
        #[arg(long, default_value = "bayer")]
        dither: String,

        /// BITMAP mode: 0 overwrite, 1 or, 2 xor
        #[arg(long, default_value = "1")]
        mode: u8,

        /// Number of copies
        #[arg(long, default_value = "1")]
        copies: u32,

        /// Terminate statements with LF instead of CRLF
        #[arg(long)]
        lf: bool,

        /// Write the encoded job to FILE instead of printing
        #[arg(long, value_name = "FILE")]
        dry_run: Option<PathBuf>,

        /// Save a PNG preview of the bitmap
        #[arg(long, value_name = "FILE")]
        png: Option<PathBuf>,
    },

    /// Print the built-in self-test label
    Selftest,

    /// Send TSPL2 statements (one per argument)
    Raw {
        /// Statements, e.g. "DENSITY 8"
        #[arg(required = true)]
        statements: Vec<String>,

        /// Allow BARCODE statements (output is unreliable)
        #[arg(long)]
        barcode: bool,

        /// Terminate statements with LF instead of CRLF
        #[arg(long)]
        lf: bool,
    },

    /// Ask the vendor backend about firmware updates
    OtaCheck {
        /// Hardware version (queried from the printer if omitted)
        #[arg(long, requires = "firmware")]
        hardware: Option<String>,

        /// Firmware version (queried from the printer if omitted)
        #[arg(long, requires = "hardware")]
        firmware: Option<String>,

        #[arg(long, default_value = ota::FIRMWARE_VERIFY_URL)]
        url: String,
    },
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn init_logging(verbose: bool) {
    let mut builder = env_logger::Builder::new();
    builder.filter_level(LevelFilter::Warn);
    builder.parse_default_env();
    if verbose {
        builder.filter_level(LevelFilter::Debug);
    }
    builder.init();
}

fn run(cli: Cli) -> Result<(), NelkoError> {
    let timeout = Duration::from_millis(cli.timeout_ms);

    match cli.command {
        Commands::Battery => {
            let mut session = open_session(&cli.device, timeout)?;
            let battery = session.battery()?;
            report(&DeviceStatus::Battery(battery), cli.json)
        }
        Commands::Config => {
            let mut session = open_session(&cli.device, timeout)?;
            let config = session.config()?;
            report(&DeviceStatus::Config(config), cli.json)
        }
        Commands::Ready => {
            let mut session = open_session(&cli.device, timeout)?;
            let ready = session.ready_status()?;
            report(&DeviceStatus::Ready(ready), cli.json)
        }
        Commands::CancelPause => {
            let mut session = open_session(&cli.device, timeout)?;
            let ack = session.cancel_pause()?;
            report(&DeviceStatus::PauseCancelAck(ack), cli.json)
        }
        Commands::Print {
            image,
            pattern,
            black,
            list,
            width_mm,
            height_mm,
            gap_mm,
            gap_offset_mm,
            density,
            mirror,
            rows,
            dither,
            mode,
            copies,
            lf,
            dry_run,
            png,
        } => {
            if list || (image.is_none() && pattern.is_none() && !black) {
                println!("Available patterns:");
                for name in patterns::list_patterns() {
                    println!("  {}", name);
                }
                println!("\nUse --image FILE, --pattern NAME or --black.");
                return Ok(());
            }

            let label = LabelSpec::new(width_mm, height_mm)
                .gap(gap_mm, gap_offset_mm)
                .direction(if mirror { Direction::Mirrored } else { Direction::Normal })
                .density(density);
            label.validate()?;

            let job = if black {
                PrintJob::black_bar(label)
            } else {
                let dithering: Dithering = dither.parse()?;
                let mode = BitmapMode::from_code(mode).ok_or_else(|| {
                    NelkoError::UnsupportedCommand(format!("BITMAP mode {}", mode))
                })?;
                let width = PrinterConfig::P21.width_dots as u32;

                let gray = match image {
                    Some(path) => render::load_image(&path, width, rows)?,
                    None => {
                        let name = pattern.unwrap_or_default();
                        patterns::by_name(&name, width, rows).ok_or_else(|| {
                            NelkoError::Image(format!(
                                "Unknown pattern '{}'. Run with --list to see available options.",
                                name
                            ))
                        })?
                    }
                };
                let bitmap = render::bitmap_from_gray(&gray, dithering, mode);

                if let Some(png_path) = &png {
                    render::to_gray(&bitmap).save(png_path)?;
                    println!("Saved preview to {}", png_path.display());
                }
                PrintJob::bitmap(label, bitmap)
            };
            let job = job.copies(copies);

            let options = EncodeOptions::default().line_ending(line_ending(lf));

            if let Some(path) = dry_run {
                let data = tspl::encode_print_job(&job, &options)?;
                fs::write(&path, &data)?;
                println!("Wrote {} bytes to {}", data.len(), path.display());
                return Ok(());
            }

            let config = SessionConfig::default().response_timeout(timeout).encode_options(options);
            let mut session = Session::new(config);
            session.connect(BluetoothTransport::open(&cli.device)?)?;
            session.print(job)?;
            println!("Sent to printer.");
            Ok(())
        }
        Commands::Selftest => {
            let mut session = open_session(&cli.device, timeout)?;
            session.self_test()?;
            println!("Self-test requested.");
            Ok(())
        }
        Commands::Raw {
            statements,
            barcode,
            lf,
        } => {
            let parsed = statements
                .iter()
                .map(|line| Statement::parse(line))
                .collect::<Result<Vec<_>, _>>()?;
            let options = EncodeOptions::default()
                .line_ending(line_ending(lf))
                .best_effort_barcode(barcode);

            let mut session = open_session(&cli.device, timeout)?;
            session.send_statements(&parsed, &options)?;
            println!("Sent {} statements.", parsed.len());
            Ok(())
        }
        Commands::OtaCheck { hardware, firmware, url } => {
            let query = match (hardware, firmware) {
                (Some(hw), Some(fw)) => ota::FirmwareQuery::new(hw, fw),
                _ => {
                    let mut session = open_session(&cli.device, timeout)?;
                    ota::FirmwareQuery::from_config(&session.config()?)
                }
            };
            info!("Firmware query: {:?}", query);

            let runtime = tokio::runtime::Runtime::new()?;
            let body = runtime.block_on(async {
                let client = ota::client()?;
                ota::check_firmware(&client, &url, &query).await
            })?;
            println!("{}", body);
            Ok(())
        }
    }
}

fn line_ending(lf: bool) -> LineEnding {
    if lf { LineEnding::Lf } else { LineEnding::CrLf }
}

fn open_session(
    device: &str,
    timeout: Duration,
) -> Result<Session<BluetoothTransport>, NelkoError> {
    let mut session = Session::new(SessionConfig::default().response_timeout(timeout));
    session.connect(BluetoothTransport::open(device)?)?;
    Ok(session)
}

fn report(status: &DeviceStatus, json: bool) -> Result<(), NelkoError> {
    if json {
        let text = serde_json::to_string_pretty(status)
            .map_err(|e| NelkoError::MalformedResponse(format!("JSON encoding failed: {}", e)))?;
        println!("{}", text);
    } else {
        println!("{}", status);
    }
    Ok(())
}
