//! # hp41print CLI
//!
//! Command-line interface for capturing HP-41 printer output.
//!
//! ## Usage
//!
//! ```bash
//! # List serial ports
//! hp41print ports
//!
//! # Capture from the default port (legacy USB interface)
//! hp41print listen
//!
//! # Capture from a DTR interface and save the transcript
//! hp41print listen --device /dev/ttyACM0 --dtr --output listing.txt
//!
//! # Decode a raw capture offline, one byte per chunk
//! hp41print decode capture.bin --dtr --chunk 1
//!
//! # Show the printer character set
//! hp41print glyphs
//! ```
//!
//! Logging goes to stderr; set `RUST_LOG` or pass `-v` / `-vv`.

use std::fs::File;
use std::io::{self, Read, Write};
use std::path::PathBuf;

use chrono::Local;
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use hp41print::{
    Hp41PrintError, LineDecoder, Mode, SerialConfig, Transcript,
    config::Parity,
    protocol::charset,
    session::{self, SessionStats},
    transcript::{LineRecord, LineSink},
    transport::{ReadSource, SerialTransport, serial},
};

/// hp41print - HP-41 thermal printer stream decoder
#[derive(Parser, Debug)]
#[command(name = "hp41print")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Capture printer output from a serial port
    Listen {
        /// Serial device path (defaults to the preferred discovered port)
        #[arg(long)]
        device: Option<String>,

        /// JSON settings file; flags override its values
        #[arg(long, value_name = "FILE")]
        config: Option<PathBuf>,

        #[arg(long)]
        baud: Option<u32>,

        #[arg(long)]
        data_bits: Option<u8>,

        #[arg(long)]
        stop_bits: Option<u8>,

        #[arg(long, value_enum)]
        parity: Option<Parity>,

        /// DTR-handshake interface (TULIP4041)
        #[arg(long)]
        dtr: bool,

        /// Also save the transcript to this file
        #[arg(long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Emit one JSON record per line
        #[arg(long)]
        json: bool,
    },

    /// Decode a raw capture file (or stdin)
    Decode {
        /// Capture file; reads stdin when omitted
        input: Option<PathBuf>,

        /// DTR-handshake interface (TULIP4041)
        #[arg(long)]
        dtr: bool,

        /// Deliver the capture in chunks of this many bytes
        #[arg(long, value_name = "BYTES")]
        chunk: Option<usize>,

        /// Also save the transcript to this file
        #[arg(long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Emit one JSON record per line
        #[arg(long)]
        json: bool,
    },

    /// List serial ports
    Ports,

    /// Print the printer character set
    Glyphs,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = run(cli.command) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn run(command: Commands) -> Result<(), Hp41PrintError> {
    charset::validate()?;

    match command {
        Commands::Listen {
            device,
            config,
            baud,
            data_bits,
            stop_bits,
            parity,
            dtr,
            output,
            json,
        } => {
            let mut settings = match config {
                Some(path) => SerialConfig::load(path)?,
                None => SerialConfig::default(),
            };
            if device.is_some() {
                settings.device = device;
            }
            settings.baud_rate = baud.unwrap_or(settings.baud_rate);
            settings.data_bits = data_bits.unwrap_or(settings.data_bits);
            settings.stop_bits = stop_bits.unwrap_or(settings.stop_bits);
            settings.parity = parity.unwrap_or(settings.parity);
            settings.dtr |= dtr;
            settings.validate()?;
            if !settings.is_common_baud_rate() {
                warn!("unusual baud rate {}", settings.baud_rate);
            }

            listen(&settings, output, json)
        }
        Commands::Decode {
            input,
            dtr,
            chunk,
            output,
            json,
        } => {
            let reader: Box<dyn Read> = match &input {
                Some(path) => Box::new(File::open(path).map_err(|e| {
                    Hp41PrintError::Transport(format!("Failed to open {}: {}", path.display(), e))
                })?),
                None => Box::new(io::stdin().lock()),
            };
            let mut source = match chunk {
                Some(size) => ReadSource::with_chunk_size(reader, size),
                None => ReadSource::new(reader),
            };

            let mut decoder = LineDecoder::new(Mode::from_dtr(dtr));
            let mut out = OutputSink::new(json);
            let stats = session::pump(&mut source, &mut decoder, &mut out)?;
            out.finish(output, json.then_some(stats))
        }
        Commands::Ports => {
            let ports = serial::list_ports()?;
            if ports.is_empty() {
                println!("No serial ports found");
                return Ok(());
            }
            let preferred = serial::preferred_port(&ports).cloned();
            println!("Available serial ports:");
            for port in &ports {
                let marker = if Some(port) == preferred.as_ref() { " (default)" } else { "" };
                println!("  {}{}", port.display(), marker);
            }
            Ok(())
        }
        Commands::Glyphs => {
            for (row, glyphs) in charset::GLYPHS.chunks(16).enumerate() {
                let line: String = glyphs.iter().flat_map(|g| [*g, ' ']).collect();
                println!("{:3}  {}", row * 16, line.trim_end());
            }
            Ok(())
        }
    }
}

#[tokio::main]
async fn listen(
    settings: &SerialConfig,
    output: Option<PathBuf>,
    json: bool,
) -> Result<(), Hp41PrintError> {
    let transport = SerialTransport::open_config(settings)?;
    eprintln!(
        "Listening on {} ({} mode), Ctrl-C to stop",
        transport.path().display(),
        settings.mode()
    );

    let mut listener = session::spawn_listener(transport, settings.mode());
    let mut out = OutputSink::new(json);

    loop {
        tokio::select! {
            line = listener.recv() => match line {
                Some(line) => out.push_line(line),
                None => break,
            },
            _ = tokio::signal::ctrl_c() => {
                info!("interrupted, disconnecting");
                listener.stop();
                break;
            }
        }
    }

    let stats = listener.finish(&mut out).await?;
    out.finish(output, json.then_some(stats))
}

/// Writes lines to stdout as they complete and keeps the transcript.
struct OutputSink {
    transcript: Transcript,
    json: bool,
}

impl OutputSink {
    fn new(json: bool) -> Self {
        Self {
            transcript: Transcript::new(),
            json,
        }
    }

    fn finish(
        self,
        output: Option<PathBuf>,
        summary: Option<SessionStats>,
    ) -> Result<(), Hp41PrintError> {
        if let Some(stats) = summary {
            println!("{}", serde_json::to_string(&stats)?);
        }
        if let Some(path) = output {
            self.transcript.save(&path)?;
            eprintln!(
                "Saved {} lines to {}",
                self.transcript.line_count(),
                path.display()
            );
        }
        Ok(())
    }
}

impl LineSink for OutputSink {
    fn push_line(&mut self, line: String) {
        let mut stdout = io::stdout().lock();
        let written = if self.json {
            let record = LineRecord::new(self.transcript.line_count() + 1, &line, Local::now());
            match record.to_json() {
                Ok(json) => writeln!(stdout, "{}", json),
                Err(e) => {
                    warn!("failed to encode line: {}", e);
                    Ok(())
                }
            }
        } else {
            stdout.write_all(line.as_bytes())
        };
        if let Err(e) = written.and_then(|()| stdout.flush()) {
            warn!("stdout write failed: {}", e);
        }
        self.transcript.push_line(line);
    }
}
