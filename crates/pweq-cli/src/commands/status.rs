//! Status command: what the server and the equalizer look like right now.

use std::collections::BTreeMap;
use std::path::PathBuf;

use clap::Args;
use pweq_pipewire::AudioServer;
use serde::Serialize;

use super::common::{Context, print_gains};

#[derive(Args)]
pub struct StatusArgs {
    /// Print machine-readable JSON
    #[arg(long)]
    json: bool,
}

#[derive(Serialize)]
struct Status {
    server_running: bool,
    server_ready: bool,
    alsa_module_loaded: bool,
    equalizer_node_id: Option<u32>,
    filter_port_id: Option<u32>,
    config_path: PathBuf,
    config_present: bool,
    session: BTreeMap<u32, f32>,
}

pub fn run(ctx: &Context, args: StatusArgs) -> anyhow::Result<()> {
    let server = ctx.server();
    let config_path = ctx.layout.rendered_config_path();
    let session = ctx.session().load()?;

    let equalizer_node_id = server.find_equalizer_node_id();
    let status = Status {
        server_running: server.is_server_running(),
        server_ready: server.is_ready(),
        alsa_module_loaded: server.is_alsa_module_loaded(),
        equalizer_node_id,
        filter_port_id: equalizer_node_id.and_then(|id| server.find_filter_port_id(id)),
        config_present: config_path.exists(),
        config_path,
        session: session.iter().collect(),
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&status)?);
        return Ok(());
    }

    let yes_no = |b: bool| if b { "yes" } else { "no" };
    println!("PipeWire running:   {}", yes_no(status.server_running));
    println!("PipeWire ready:     {}", yes_no(status.server_ready));
    println!("ALSA module loaded: {}", yes_no(status.alsa_module_loaded));
    match status.equalizer_node_id {
        Some(id) => println!("Equalizer node:     {}", id),
        None => println!("Equalizer node:     not found"),
    }
    if let Some(port) = status.filter_port_id {
        println!("Equalizer port:     {}", port);
    }
    println!(
        "Config:             {}{}",
        status.config_path.display(),
        if status.config_present { "" } else { " (not written yet)" }
    );
    println!();
    println!("Last applied gains:");
    if session.is_empty() {
        println!("  (none)");
    } else {
        print_gains(&session);
    }
    Ok(())
}
