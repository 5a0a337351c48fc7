use std::fs::File;
use std::io::{self, IsTerminal, Read, Write};
use std::path::{Path, PathBuf};

use bitstat::bits::{bits_to_bytes, bits_to_string};
use bitstat::cap::parse_data_cap;
use bitstat::codec::Compression;
use bitstat::error::BitstatError;
use bitstat::pipeline::{self, PipelineConfig};
use bitstat::render::write_stats;
use bitstat::stats::{AnalysisConfig, Report};
use clap::{Args, Parser, Subcommand};
use log::{error, info};

#[derive(Parser)]
#[command(name = "bitstat", about = "Decode and encode data to bit strings, with bit statistics")]
struct Cli {
    /// Cap the amount of data to read before processing (e.g. 1024, 12B, 14K).
    #[arg(long, default_value = "")]
    rcap: String,

    /// Compression algorithm to decompress the input with.
    #[arg(short = 'c', long = "compression", default_value = "")]
    compression: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Decode data to the corresponding bit string.
    #[command(alias = "d")]
    Decode(OpArgs),
    /// Encode a bit string to the corresponding data.
    #[command(alias = "e")]
    Encode(OpArgs),
}

#[derive(Args)]
struct OpArgs {
    /// Input file (stdin when omitted).
    file: Option<PathBuf>,

    /// Cap the amount of data to write after processing.
    #[arg(long, default_value = "")]
    wcap: String,

    /// Compression algorithm to compress the output with.
    #[arg(short = 'c', long = "compression", default_value = "")]
    compression: String,

    /// Output the top k most frequent substrings (<= 0 for all).
    #[arg(short = 'k', long, default_value_t = -1, allow_negative_numbers = true)]
    topk: i64,

    /// Count substrings of every length up to this many bits.
    #[arg(long, default_value_t = 8)]
    maxchunk: usize,

    /// Count substrings of exactly this many bits.
    #[arg(long)]
    chunk: Option<usize>,

    /// Compute entropy over blocks of this many bits.
    #[arg(long)]
    block: Option<usize>,

    /// Length in bits of the symbol used for Shannon entropy.
    #[arg(long, default_value_t = 2)]
    slen: usize,

    /// Print bit statistics to stderr.
    #[arg(short = 's', long)]
    stats: bool,

    /// Write the output as a string of 0s and 1s.
    #[arg(long)]
    str: bool,

    /// Separator to make the bit string more readable.
    #[arg(long)]
    sep: Option<char>,

    /// Put the separator after every N bits.
    #[arg(short = 'b', long, default_value_t = 8)]
    count: usize,
}

enum Mode {
    Decode,
    Encode,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("error")).init();

    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        error!("{e}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), BitstatError> {
    let (mode, args) = match cli.command {
        Command::Decode(args) => (Mode::Decode, args),
        Command::Encode(args) => (Mode::Encode, args),
    };

    let config = PipelineConfig {
        in_max_bits: parse_data_cap(&cli.rcap)?,
        in_compression: Compression::from_flag(&cli.compression),
        out_max_bits: parse_data_cap(&args.wcap)?,
        out_compression: Compression::from_flag(&args.compression),
        analysis: AnalysisConfig {
            max_window_len: args.maxchunk,
            window_len: args.chunk,
            block_size: args.block,
            symbol_len: args.slen,
            top_k: args.topk,
            ..Default::default()
        },
    };
    info!(
        "input codec {}, output codec {}",
        config.in_compression, config.out_compression
    );

    let input = open_input(args.file.as_deref())?;

    let report = match mode {
        Mode::Decode => pipeline::decode(input, &config)?,
        Mode::Encode => pipeline::encode(input, &config)?,
    };

    write_output(&report, &args)?;
    if args.stats {
        write_stats(&mut io::stderr().lock(), &report.stats)?;
    }
    Ok(())
}

fn open_input(path: Option<&Path>) -> Result<Box<dyn Read>, BitstatError> {
    match path {
        Some(path) => {
            let file = File::open(path).map_err(|source| BitstatError::OpenInput {
                path: path.to_path_buf(),
                source,
            })?;
            Ok(Box::new(file))
        }
        None => Ok(Box::new(io::stdin().lock())),
    }
}

/// Bits go to stdout as text on a terminal (or with `--str`), raw bytes
/// otherwise.
fn write_output(report: &Report, args: &OpArgs) -> io::Result<()> {
    let stdout = io::stdout();
    let as_text = args.str || stdout.is_terminal();
    let mut out = stdout.lock();
    if as_text {
        writeln!(out, "{}", bits_to_string(&report.bits, args.sep, args.count))?;
    } else {
        out.write_all(&bits_to_bytes(&report.bits))?;
    }
    out.flush()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_input_names_the_file() {
        let path = Path::new("no/such/dir/input.bin");
        let err = match open_input(Some(path)) {
            Ok(_) => panic!("opening a missing file should fail"),
            Err(e) => e,
        };
        assert!(matches!(&err, BitstatError::OpenInput { path: p, .. } if p == path));
        assert!(err.to_string().contains("no/such/dir/input.bin"));
    }
}
