//! Dump raw device data from a devrpc server.
//!
//! Usage:
//!   # Whole device to a file
//!   dump-device ram0 dump.bin
//!
//!   # Whole device to stdout
//!   dump-device ram0 -
//!
//!   # First 1K from another server
//!   dump-device --addr 192.168.11.86:8910 ram0 0 1024 dump.bin

use anyhow::{Context, Result, bail};
use clap::Parser;
use tokio::io::AsyncWrite;
use tracing_subscriber::{EnvFilter, fmt};

use devrpc_client::constants::{DEFAULT_CHUNK_SIZE, DEFAULT_SERVER_ADDRESS, MAX_CHUNK_SIZE};
use devrpc_client::{DevClient, DumpRange, dump_device, parse_number};

/// Dump raw device data over Dev.Read.
#[derive(Parser, Debug)]
#[command(name = "dump-device")]
#[command(about = "Dump raw device data from a devrpc server")]
struct Args {
    /// Server address
    #[arg(long, default_value = DEFAULT_SERVER_ADDRESS)]
    addr: String,

    /// Bytes per Dev.Read call, at most 16 MiB
    #[arg(
        long,
        default_value_t = DEFAULT_CHUNK_SIZE,
        value_parser = clap::value_parser!(u64).range(1..=MAX_CHUNK_SIZE)
    )]
    chunk_size: u64,

    /// NAME [OFFSET LENGTH] OUTPUT (use "-" for stdout; LENGTH 0 means to the end)
    #[arg(required = true, num_args = 2..=4)]
    positional: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // stdout may carry the dump; logs go to stderr
    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let (name, range, output) = match args.positional.as_slice() {
        [name, output] => (name, DumpRange::default(), output),
        [name, offset, length, output] => {
            let offset = parse_number(offset).context("invalid offset")?;
            let length = parse_number(length).context("invalid length")?;
            (
                name,
                DumpRange {
                    offset,
                    length: Some(length),
                },
                output,
            )
        }
        _ => bail!("usage: dump-device NAME [OFFSET LENGTH] OUTPUT"),
    };

    let mut client = DevClient::connect(&args.addr)
        .await
        .with_context(|| format!("failed to connect to {}", args.addr))?;

    let mut out: Box<dyn AsyncWrite + Unpin> = if output == "-" {
        Box::new(tokio::io::stdout())
    } else {
        let file = tokio::fs::File::create(output)
            .await
            .with_context(|| format!("failed to open output file {output}"))?;
        Box::new(file)
    };

    dump_device(&mut client, name, range, args.chunk_size, &mut out)
        .await
        .with_context(|| format!("failed to dump {name:?}"))?;
    Ok(())
}
