//! Dirstream command - list the records of a directory container.
//!
//! # Examples
//!
//! ```bash
//! # Dump a captured GETDIR container
//! kfusectl dirstream ./listing.bin
//!
//! # Resume from a saved stream position with the smallest chunk
//! kfusectl dirstream ./listing.bin --offset 96 --chunk 280
//! ```

use std::fs::File;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::Args as ClapArgs;
use kfuse_core::config::MIN_DIR_READ_CHUNK;
use kfuse_core::{DirHandle, SinkControl};
use kfuse_proto::DEFAULT_DIR_READ_CHUNK;
use tracing::{debug, instrument};

use super::{create_table, kind_label, show_bytes};

#[derive(ClapArgs, Clone)]
pub struct Args {
    /// Container file holding the listing stream
    pub file: PathBuf,

    /// Stream position to start from
    #[arg(long, default_value_t = 0)]
    pub offset: u64,

    /// Bytes fetched per read (raised to fit the largest record)
    #[arg(long, default_value_t = DEFAULT_DIR_READ_CHUNK)]
    pub chunk: usize,

    /// Print names only, one per line
    #[arg(short = '1')]
    pub names_only: bool,
}

struct Row {
    position: u64,
    child_id: u64,
    kind: u32,
    name: String,
}

#[instrument(level = "info", name = "cmd::dirstream", skip_all, fields(file = %args.file.display()))]
pub fn execute(args: &Args) -> Result<()> {
    let file = File::open(&args.file)
        .with_context(|| format!("Failed to open container: {}", args.file.display()))?;
    if !file.metadata()?.is_file() {
        bail!("Not a regular file: {}", args.file.display());
    }

    let chunk = args.chunk.max(MIN_DIR_READ_CHUNK);
    debug!(chunk, offset = args.offset, "reading container");

    let mut handle = DirHandle::new(0, Box::new(file), chunk);
    handle.seek(args.offset);

    let mut rows = Vec::new();
    handle
        .read_to_end(&mut |name: &[u8], position: u64, child_id: u64, kind: u32| {
            rows.push(Row {
                position,
                child_id,
                kind,
                name: show_bytes(name),
            });
            SinkControl::Continue
        })
        .with_context(|| format!("Malformed listing after offset {}", handle.position()))?;

    let end = handle.position();
    handle.release();

    if args.names_only {
        for row in &rows {
            println!("{}", row.name);
        }
        return Ok(());
    }

    let mut table = create_table();
    table.set_header(vec!["Offset", "Id", "Type", "Name"]);
    for row in &rows {
        table.add_row(vec![
            row.position.to_string(),
            row.child_id.to_string(),
            kind_label(row.kind).to_string(),
            row.name.clone(),
        ]);
    }
    println!("{table}");
    println!("{} entries, stream ends at {end}", rows.len());
    Ok(())
}
