//! Decode command - take a hex request frame apart.

use anyhow::{Context, Result};
use clap::Args as ClapArgs;
use kfuse_proto::{Request, RequestBody};

use super::{create_table, show_bytes};

#[derive(ClapArgs, Clone)]
pub struct Args {
    /// Frame bytes as hex; whitespace is ignored
    pub hex: String,
}

fn body_fields(body: &RequestBody<'_>) -> Vec<(&'static str, String)> {
    match body {
        RequestBody::Empty => Vec::new(),
        RequestBody::Name(name) => vec![("name", show_bytes(name))],
        RequestBody::Mknod { mode, rdev, name } => vec![
            ("mode", format!("{mode:o}")),
            ("rdev", format!("{rdev:#x}")),
            ("name", show_bytes(name)),
        ],
        RequestBody::Mkdir { mode, name } => {
            vec![("mode", format!("{mode:o}")), ("name", show_bytes(name))]
        }
        RequestBody::Symlink { name, target } => {
            vec![("name", show_bytes(name)), ("target", show_bytes(target))]
        }
        RequestBody::Rename {
            new_parent,
            old_name,
            new_name,
        } => vec![
            ("new_parent", new_parent.to_string()),
            ("old_name", show_bytes(old_name)),
            ("new_name", show_bytes(new_name)),
        ],
        RequestBody::Link { new_parent, name } => vec![
            ("new_parent", new_parent.to_string()),
            ("name", show_bytes(name)),
        ],
    }
}

pub fn execute(args: &Args) -> Result<()> {
    let text: String = args.hex.split_whitespace().collect();
    let frame = hex::decode(&text).context("Frame is not valid hex")?;
    let request = Request::decode_frame(&frame).context("Malformed request frame")?;
    let body = request.decode_body().context("Malformed request body")?;

    let mut table = create_table();
    table.set_header(vec!["Field", "Value"]);
    table.add_row(vec!["opcode".to_string(), request.opcode().to_string()]);
    table.add_row(vec!["subject".to_string(), request.subject().to_string()]);
    table.add_row(vec!["body_size".to_string(), request.body().len().to_string()]);
    for (field, value) in body_fields(&body) {
        table.add_row(vec![field.to_string(), value]);
    }
    println!("{table}");
    Ok(())
}
