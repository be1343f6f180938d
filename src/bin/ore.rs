//! ORE command line tool.
//!
//! Block-compresses whole files with the ORE codec.
//!
//! # Commands
//!
//! - `compress` - Pack a file into an ORE block container
//! - `decompress` - Restore a file from a container
//! - `analyze` - Token statistics and ratio for a file
//! - `bound` - Worst-case compressed size for a block length
//!
//! # Container
//!
//! A sequence of blocks, each:
//!
//! ```text
//! +-------------+---------------+-----+-------------------+
//! | raw_len u32 | stored_len u32| tag | payload           |
//! |   (LE)      |   (LE)        | u8  | stored_len bytes  |
//! +-------------+---------------+-----+-------------------+
//! ```
//!
//! Tag 0 stores the block raw, tag 1 holds an ORE token stream. Blocks that
//! fail to compress or do not shrink are stored raw.

use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use ore::{
    codec::TokenKind,
    config::{Config, LoggingConfig},
    BlockCodec, DeviceHint, TokenStats, VERSION,
};
use serde::Serialize;

/// Block stored uncompressed.
const TAG_RAW: u8 = 0;

/// Block holds an ORE token stream.
const TAG_ORE: u8 = 1;

/// Bytes of per-block framing.
const BLOCK_HEADER_LEN: usize = 9;

#[derive(Parser)]
#[command(name = "ore")]
#[command(version = VERSION)]
#[command(about = "ORE - Orbital Redundancy Encoding block codec", long_about = None)]
struct Cli {
    /// Config file (default: <config dir>/ore/config.toml if present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Target device class (solid-state, rotational, zoned, tape)
    #[arg(long, global = true)]
    device: Option<DeviceHint>,

    /// Target is byte-addressable persistent memory
    #[arg(long, global = true)]
    pmem: bool,

    /// Block size in bytes
    #[arg(long, global = true)]
    block_size: Option<usize>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compress a file into an ORE container
    Compress {
        /// Input file (- for stdin)
        input: PathBuf,

        /// Output file path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Show compression statistics
        #[arg(short, long)]
        stats: bool,
    },

    /// Restore a file from an ORE container
    Decompress {
        /// Container file (- for stdin)
        input: PathBuf,

        /// Output file path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Report how a file would encode
    Analyze {
        /// Input file (- for stdin)
        input: PathBuf,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the worst-case compressed size for a block length
    Bound {
        /// Block length in bytes
        size: u32,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = Config::load(cli.config.as_deref()).context("loading configuration")?;
    if let Some(device) = cli.device {
        config.codec.device = device;
    }
    if cli.pmem {
        config.codec.persistent_memory = true;
    }
    if let Some(block_size) = cli.block_size {
        config.codec.block_size = block_size;
    }
    config.validate()?;
    init_logging(&config.logging);

    let codec = config.codec.block_codec();
    let block_size = config.codec.block_size;

    match cli.command {
        Commands::Compress {
            input,
            output,
            stats,
        } => cmd_compress(&codec, block_size, &input, output, stats),

        Commands::Decompress { input, output } => cmd_decompress(&codec, &input, output),

        Commands::Analyze { input, json } => cmd_analyze(&codec, block_size, &input, json),

        Commands::Bound { size } => {
            println!("{}", ore::bound(size));
            Ok(())
        },
    }
}

fn init_logging(logging: &LoggingConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&logging.level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr);
    if logging.json {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Totals gathered while packing a file.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
struct PackSummary {
    blocks: usize,
    raw_blocks: usize,
    original_bytes: usize,
    stored_bytes: usize,
    stats: TokenStats,
}

impl PackSummary {
    fn ratio(&self) -> f64 {
        if self.stored_bytes == 0 {
            0.0
        } else {
            self.original_bytes as f64 / self.stored_bytes as f64
        }
    }
}

fn push_block(out: &mut Vec<u8>, raw_len: usize, tag: u8, payload: &[u8]) {
    out.extend_from_slice(&(raw_len as u32).to_le_bytes());
    out.extend_from_slice(&(payload.len() as u32).to_le_bytes());
    out.push(tag);
    out.extend_from_slice(payload);
}

/// Split `data` into blocks and pack them into a container.
fn pack(codec: &BlockCodec, data: &[u8], block_size: usize) -> (Vec<u8>, PackSummary) {
    let mut out = Vec::with_capacity(data.len() + data.len() / block_size * BLOCK_HEADER_LEN);
    let mut summary = PackSummary {
        original_bytes: data.len(),
        ..PackSummary::default()
    };

    for (index, block) in data.chunks(block_size).enumerate() {
        summary.blocks += 1;
        match codec.compress_to_vec(block) {
            Ok(result) if result.is_beneficial() => {
                summary.stats.merge(&result.stats);
                push_block(&mut out, block.len(), TAG_ORE, &result.data);
            },
            Ok(_) => {
                tracing::debug!(index, "block did not shrink, stored raw");
                summary.raw_blocks += 1;
                push_block(&mut out, block.len(), TAG_RAW, block);
            },
            Err(e) => {
                tracing::warn!(index, error = %e, "compression failed, stored raw");
                summary.raw_blocks += 1;
                push_block(&mut out, block.len(), TAG_RAW, block);
            },
        }
    }

    summary.stored_bytes = out.len();
    (out, summary)
}

/// Restore the original bytes from a container.
fn unpack(codec: &BlockCodec, container: &[u8]) -> anyhow::Result<Vec<u8>> {
    let mut out = Vec::new();
    let mut rest = container;
    let mut index = 0usize;

    while !rest.is_empty() {
        let offset = container.len() - rest.len();
        let Some((header, body)) = rest.split_first_chunk::<BLOCK_HEADER_LEN>() else {
            bail!("block {index} at offset {offset}: truncated block header");
        };
        let raw_len = u32::from_le_bytes([header[0], header[1], header[2], header[3]]) as usize;
        let stored_len = u32::from_le_bytes([header[4], header[5], header[6], header[7]]) as usize;
        let tag = header[8];
        if body.len() < stored_len {
            bail!("block {index} at offset {offset}: payload truncated");
        }
        let (payload, tail) = body.split_at(stored_len);

        match tag {
            TAG_RAW => {
                if raw_len != stored_len {
                    bail!("block {index} at offset {offset}: raw block length mismatch");
                }
                out.extend_from_slice(payload);
            },
            TAG_ORE => {
                let block = codec
                    .decompress_to_vec(payload, raw_len)
                    .with_context(|| format!("block {index} at offset {offset}"))?;
                out.extend_from_slice(&block);
            },
            other => bail!("block {index} at offset {offset}: unknown tag {other}"),
        }

        rest = tail;
        index += 1;
    }

    Ok(out)
}

fn cmd_compress(
    codec: &BlockCodec,
    block_size: usize,
    input: &Path,
    output: Option<PathBuf>,
    stats: bool,
) -> anyhow::Result<()> {
    let data = read_input(input)?;
    let (container, summary) = pack(codec, &data, block_size);
    write_output(output, &container)?;

    if stats {
        eprintln!();
        eprintln!("Compression Statistics:");
        eprintln!("  Device:       {}", codec.device());
        eprintln!("  Blocks:       {} ({} raw)", summary.blocks, summary.raw_blocks);
        eprintln!("  Original:     {} bytes", summary.original_bytes);
        eprintln!("  Stored:       {} bytes", summary.stored_bytes);
        eprintln!("  Ratio:        {:.2}x", summary.ratio());
    }

    Ok(())
}

fn cmd_decompress(codec: &BlockCodec, input: &Path, output: Option<PathBuf>) -> anyhow::Result<()> {
    let container = read_input(input)?;
    let data = unpack(codec, &container)?;
    write_output(output, &data)
}

#[derive(Serialize)]
struct KindReport {
    kind: TokenKind,
    tokens: usize,
    bytes: usize,
}

#[derive(Serialize)]
struct AnalyzeReport {
    device: DeviceHint,
    block_size: usize,
    blocks: usize,
    raw_blocks: usize,
    original_bytes: usize,
    stored_bytes: usize,
    ratio: f64,
    kinds: Vec<KindReport>,
}

fn cmd_analyze(codec: &BlockCodec, block_size: usize, input: &Path, json: bool) -> anyhow::Result<()> {
    let data = read_input(input)?;
    let (_, summary) = pack(codec, &data, block_size);

    let report = AnalyzeReport {
        device: codec.device(),
        block_size,
        blocks: summary.blocks,
        raw_blocks: summary.raw_blocks,
        original_bytes: summary.original_bytes,
        stored_bytes: summary.stored_bytes,
        ratio: summary.ratio(),
        kinds: TokenKind::all()
            .iter()
            .map(|&kind| KindReport {
                kind,
                tokens: summary.stats.count(kind),
                bytes: summary.stats.covered(kind),
            })
            .collect(),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("Analysis ({}, {} byte blocks):", report.device, report.block_size);
    println!("  Blocks:       {} ({} raw)", report.blocks, report.raw_blocks);
    println!("  Original:     {} bytes", report.original_bytes);
    println!("  Stored:       {} bytes", report.stored_bytes);
    println!("  Ratio:        {:.2}x", report.ratio);
    println!();
    println!("  {:<10} {:>10} {:>14}", "Token", "Count", "Bytes");
    for k in &report.kinds {
        println!("  {:<10} {:>10} {:>14}", k.kind.name(), k.tokens, k.bytes);
    }
    Ok(())
}

fn read_input(path: &Path) -> anyhow::Result<Vec<u8>> {
    if path.as_os_str() == "-" {
        let mut buffer = Vec::new();
        io::stdin().read_to_end(&mut buffer)?;
        Ok(buffer)
    } else {
        std::fs::read(path).with_context(|| format!("reading {}", path.display()))
    }
}

fn write_output(output: Option<PathBuf>, content: &[u8]) -> anyhow::Result<()> {
    if let Some(path) = output {
        std::fs::write(&path, content).with_context(|| format!("writing {}", path.display()))?;
    } else {
        io::stdout().lock().write_all(content)?;
    }
    Ok(())
}
