//! Ramdisk binary.
//!
//! Builds a capacity-bounded in-memory filesystem for a mount target and
//! drives it from a line console on stdin.
//!
//! Usage:
//!   cargo run -p ramdisk -- /mnt/ram 64
//!
//!   # Verbose engine logging
//!   RUST_LOG=ramdisk_kernel=debug cargo run -p ramdisk -- /mnt/ram 64

mod console;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing_subscriber::{EnvFilter, fmt};

use console::{Console, Outcome};
use ramdisk_kernel::{Ramdisk, RamdiskConfig};

/// In-memory filesystem with a fixed capacity ceiling.
#[derive(Parser, Debug)]
#[command(name = "ramdisk")]
#[command(about = "Capacity-bounded in-memory filesystem")]
struct Args {
    /// Directory the filesystem is mounted on
    mount_dir: PathBuf,

    /// Capacity ceiling in megabytes
    size_mb: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr; stdout belongs to the console
    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let config = RamdiskConfig::from_megabytes(&args.mount_dir, args.size_mb)
        .context("invalid ramdisk configuration")?;
    let fs = Ramdisk::new(&config).context("failed to create ramdisk")?;

    tracing::info!(
        mount_point = %config.mount_point.display(),
        max_size = config.max_size,
        "ramdisk ready"
    );

    let console = Console::new(&fs);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    while let Some(line) = lines.next_line().await? {
        match console.execute(&line).await {
            Outcome::Continue(output) => {
                stdout.write_all(output.as_bytes()).await?;
                stdout.flush().await?;
            }
            Outcome::Exit => break,
        }
    }

    let usage = fs.usage();
    tracing::info!(
        curr_size = usage.curr_size,
        max_size = usage.max_size,
        "ramdisk shutting down"
    );
    Ok(())
}
