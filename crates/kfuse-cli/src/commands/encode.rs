//! Encode command - build a request frame from command-line fields.

use anyhow::{Context, Result};
use clap::{Args as ClapArgs, Subcommand};
use kfuse_proto::attr::S_IFREG;
use kfuse_proto::{Opcode, Request};

#[derive(ClapArgs, Clone)]
pub struct Args {
    #[command(subcommand)]
    pub verb: Verb,
}

#[derive(Subcommand, Clone)]
pub enum Verb {
    /// Resolve a name in a directory
    Lookup { parent: u64, name: String },
    /// Fetch attributes
    Getattr { object: u64 },
    /// Fetch a symlink target
    Readlink { object: u64 },
    /// Open a directory listing
    Getdir { object: u64 },
    /// Create a node
    Mknod {
        parent: u64,
        name: String,
        /// Type and permission bits, in octal
        #[arg(long, value_parser = parse_octal, default_value = "100644")]
        mode: u32,
        /// Device number
        #[arg(long, default_value_t = 0)]
        rdev: u32,
    },
    /// Create a directory
    Mkdir {
        parent: u64,
        name: String,
        /// Permission bits, in octal
        #[arg(long, value_parser = parse_octal, default_value = "755")]
        mode: u32,
    },
    /// Create a symlink
    Symlink {
        parent: u64,
        name: String,
        target: String,
    },
    /// Remove a non-directory
    Unlink { parent: u64, name: String },
    /// Remove an empty directory
    Rmdir { parent: u64, name: String },
    /// Move a name
    Rename {
        parent: u64,
        old_name: String,
        new_parent: u64,
        new_name: String,
    },
    /// Add a hard link
    Link {
        object: u64,
        new_parent: u64,
        new_name: String,
    },
}

fn parse_octal(s: &str) -> Result<u32, String> {
    u32::from_str_radix(s.trim_start_matches("0o"), 8).map_err(|e| format!("invalid octal mode: {e}"))
}

impl Verb {
    fn request(&self) -> Result<Request> {
        let request = match self {
            Verb::Lookup { parent, name } => Request::lookup(*parent, name.as_bytes()),
            Verb::Getattr { object } => Request::attribute_query(Opcode::Getattr, *object),
            Verb::Readlink { object } => Request::attribute_query(Opcode::Readlink, *object),
            Verb::Getdir { object } => Request::attribute_query(Opcode::Getdir, *object),
            Verb::Mknod {
                parent,
                name,
                mode,
                rdev,
            } => {
                let mode = if *mode & !0o7777 == 0 { *mode | S_IFREG } else { *mode };
                Request::mknod(*parent, mode, *rdev, name.as_bytes())
            }
            Verb::Mkdir { parent, name, mode } => Request::mkdir(*parent, *mode, name.as_bytes()),
            Verb::Symlink {
                parent,
                name,
                target,
            } => Request::symlink(*parent, name.as_bytes(), target.as_bytes()),
            Verb::Unlink { parent, name } => Request::unlink(*parent, name.as_bytes()),
            Verb::Rmdir { parent, name } => Request::rmdir(*parent, name.as_bytes()),
            Verb::Rename {
                parent,
                old_name,
                new_parent,
                new_name,
            } => Request::rename(*parent, *new_parent, old_name.as_bytes(), new_name.as_bytes()),
            Verb::Link {
                object,
                new_parent,
                new_name,
            } => Request::link(*object, *new_parent, new_name.as_bytes()),
        };
        request.context("Cannot encode request")
    }
}

pub fn execute(args: &Args) -> Result<()> {
    let request = args.verb.request()?;
    let frame = request.encode_frame().context("Cannot encode request")?;
    tracing::debug!(opcode = %request.opcode(), bytes = frame.len(), "encoded");
    println!("{}", hex::encode(&frame));
    Ok(())
}
