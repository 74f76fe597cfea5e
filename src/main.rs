// src/main.rs
mod logger;

use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, bail};
use clap::{Parser, Subcommand, ValueEnum};
use huffpack::{FrequencyTable, HuffmanCode, Stats, compare};
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "huffpack", version)]
#[command(about = "Static Huffman encoder and decoder.", long_about = None)]
struct Cli {
    /// More log output (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
    /// Only log warnings and errors
    #[arg(short, long, global = true)]
    quiet: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum, Debug, Default)]
enum ReportFormat {
    #[default]
    #[clap(help = "Aligned human-readable report.")]
    Text,
    #[clap(help = "One JSON object.")]
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Encode a file
    Encode {
        input: PathBuf,
        output: PathBuf,
        /// Print statistics about the code afterwards
        #[arg(long)]
        stats: bool,
        #[arg(long, value_enum, default_value_t)]
        format: ReportFormat,
    },
    /// Decode a file produced by `encode`
    Decode {
        input: PathBuf,
        output: PathBuf,
        #[arg(long)]
        stats: bool,
        /// Refuse files whose header declares a larger decoded size, in bytes
        #[arg(long, value_name = "BYTES")]
        max_output: Option<u64>,
        #[arg(long, value_enum, default_value_t)]
        format: ReportFormat,
    },
    /// Show statistics of the code a file would be encoded with
    Stats {
        input: PathBuf,
        #[arg(long, value_enum, default_value_t)]
        format: ReportFormat,
        /// Also print the tree and the code table
        #[arg(long)]
        tree: bool,
    },
    /// Encode a text and print the code bits as 0s and 1s
    Bits { text: String },
    /// Compare two files byte by byte
    Verify { left: PathBuf, right: PathBuf },
    /// Encode, decode and compare a file
    Roundtrip {
        input: PathBuf,
        /// Directory for the intermediate files (defaults to the system temp dir)
        #[arg(long)]
        dir: Option<PathBuf>,
        /// Keep the intermediate files
        #[arg(long)]
        keep: bool,
    },
}

fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    logger::init(logger::level(cli.verbose, cli.quiet))?;

    let span = tracing::info_span!("command_execution", command = ?std::env::args().collect::<Vec<_>>());
    let _enter = span.enter();

    match cli.command {
        Commands::Encode {
            input,
            output,
            stats,
            format,
        } => {
            let code = huffpack::encode_file(&input, &output)
                .with_context(|| format!("encoding {} into {}", input.display(), output.display()))?;
            info!(input = %input.display(), output = %output.display(), "file encoded");
            if stats {
                print_stats(&code, format)?;
            }
        }
        Commands::Decode {
            input,
            output,
            stats,
            max_output,
            format,
        } => {
            let limit = max_output.unwrap_or(u64::MAX);
            let code = huffpack::decode_file_limited(&input, &output, limit)
                .with_context(|| format!("decoding {} into {}", input.display(), output.display()))?;
            info!(input = %input.display(), output = %output.display(), "file decoded");
            if stats {
                print_stats(&code, format)?;
            }
        }
        Commands::Stats {
            input,
            format,
            tree,
        } => {
            let code = code_for_file(&input)?;
            print_stats(&code, format)?;
            if tree {
                print_tree(&code);
            }
        }
        Commands::Bits { text } => {
            let code = HuffmanCode::generate(&FrequencyTable::build(text.as_bytes()));
            let Some(bits) = code.table().render(text.as_bytes()) else {
                bail!("text contains a symbol missing from its own code table");
            };
            println!("Original string (length = {} bytes): {}", text.len(), text);
            println!("Encoded string  (length = {} bits): {}", bits.len(), bits);
            print_stats(&code, ReportFormat::Text)?;
            print_tree(&code);
        }
        Commands::Verify { left, right } => {
            if !verify(&left, &right)? {
                return Ok(ExitCode::FAILURE);
            }
        }
        Commands::Roundtrip { input, dir, keep } => {
            if !roundtrip(&input, dir, keep)? {
                return Ok(ExitCode::FAILURE);
            }
        }
    }

    Ok(ExitCode::SUCCESS)
}

fn code_for_file(path: &Path) -> anyhow::Result<HuffmanCode> {
    let file = fs::File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let frequencies = FrequencyTable::from_reader(std::io::BufReader::new(file))
        .with_context(|| format!("reading {}", path.display()))?;
    Ok(HuffmanCode::generate(&frequencies))
}

fn print_stats(code: &HuffmanCode, format: ReportFormat) -> anyhow::Result<()> {
    let stats = Stats::of(code);
    match format {
        ReportFormat::Text => print!("{stats}"),
        ReportFormat::Json => println!(
            "{}",
            serde_json::to_string_pretty(&stats).context("serializing statistics")?
        ),
    }
    Ok(())
}

fn print_tree(code: &HuffmanCode) {
    if let Some(tree) = code.tree() {
        println!();
        print!("{tree}");
        println!();
        print!("{}", code.table());
    }
}

fn verify(left: &Path, right: &Path) -> anyhow::Result<bool> {
    for path in [left, right] {
        let digest = compare::file_digest(path)
            .with_context(|| format!("hashing {}", path.display()))?;
        println!("{digest}  {}", path.display());
    }
    match compare::first_difference(left, right).context("comparing files")? {
        None => {
            println!("OK: files are identical.");
            Ok(true)
        }
        Some(offset) => {
            println!("ERROR: files differ at byte {offset}.");
            Ok(false)
        }
    }
}

fn roundtrip(input: &Path, dir: Option<PathBuf>, keep: bool) -> anyhow::Result<bool> {
    let dir = dir.unwrap_or_else(std::env::temp_dir);
    let stem = input
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_else(|| "input".to_string());
    let tag = std::process::id();
    let encoded = dir.join(format!("{stem}.{tag}.huff"));
    let decoded = dir.join(format!("{stem}.{tag}.decoded"));

    let identical = encode_decode_compare(input, &encoded, &decoded);

    if keep {
        info!(encoded = %encoded.display(), decoded = %decoded.display(), "kept intermediate files");
    } else {
        for path in [&encoded, &decoded] {
            match fs::remove_file(path) {
                Err(e) if e.kind() != std::io::ErrorKind::NotFound => {
                    warn!(path = %path.display(), error = %e, "could not remove intermediate file");
                }
                _ => {}
            }
        }
    }
    identical
}

fn encode_decode_compare(input: &Path, encoded: &Path, decoded: &Path) -> anyhow::Result<bool> {
    let code = huffpack::encode_file(input, encoded)
        .with_context(|| format!("encoding {}", input.display()))?;
    print_stats(&code, ReportFormat::Text)?;
    huffpack::decode_file(encoded, decoded)
        .with_context(|| format!("decoding {}", encoded.display()))?;

    let identical = compare::files_identical(input, decoded).context("comparing files")?;
    if identical {
        println!("OK: File is identical after decoding.");
    } else {
        println!("ERROR: File is not identical after decoding.");
    }
    Ok(identical)
}
