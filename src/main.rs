// Copyright 2018-2021 System76 <info@system76.com>
//
// SPDX-License-Identifier: GPL-3.0-only

use clap::Parser;
use log::LevelFilter;
use std::process;
use system76_gmux::{
    args::Args, client, config::Config, daemon, graphics, logging, mux::Gmux, power::PowerState,
};

fn main() {
    let args = Args::parse();

    let res = match &args {
        Args::Daemon { quiet, verbose } => {
            let level = if *quiet {
                LevelFilter::Off
            } else if *verbose {
                LevelFilter::Debug
            } else {
                LevelFilter::Info
            };

            if let Err(why) = logging::setup(level) {
                eprintln!("failed to set up logging: {}", why);
                process::exit(1);
            }

            if system76_gmux::is_root() {
                load_config().and_then(daemon::daemon)
            } else {
                Err("must be run as root".to_string())
            }
        }
        Args::Probe => {
            if system76_gmux::is_root() {
                load_config().and_then(|config| probe(&config))
            } else {
                Err("must be run as root".to_string())
            }
        }
        Args::Clients => list_clients(),
        _ => run_client(&args),
    };

    match res {
        Ok(()) => (),
        Err(err) => {
            eprintln!("{}", err);
            process::exit(1);
        }
    }
}

fn load_config() -> Result<Config, String> { Config::load().map_err(|why| why.to_string()) }

fn run_client(args: &Args) -> Result<(), String> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|why| format!("failed to start async runtime: {}", why))?;

    runtime.block_on(client::client(args)).map_err(|why| format!("{:#}", why))
}

fn probe(config: &Config) -> Result<(), String> {
    let gmux = Gmux::open(config).map_err(|why| why.to_string())?;
    let route = gmux.current_route().map_err(|why| why.to_string())?;
    let brightness = gmux.brightness().map_err(|why| why.to_string())?;
    let power = gmux.discrete_power().map_err(|why| why.to_string())?;
    let status = gmux.interrupt_status().map_err(|why| why.to_string())?;

    println!("Version: {}", gmux.version());
    println!("Route: {}", route.map_or_else(|| "unknown".to_owned(), |route| route.to_string()));
    println!("Brightness: {}/{}", brightness, gmux.max_brightness());
    println!("Discrete power: {}", if power == PowerState::On { "on" } else { "off" });
    println!("Interrupt status: {:#04x}", status.bits());
    Ok(())
}

fn list_clients() -> Result<(), String> {
    let clients = graphics::clients().map_err(|why| why.to_string())?;
    if clients.is_empty() {
        println!("no graphics clients found");
    }

    for client in clients {
        println!("{}: {:04x}:{:04x} {}", client.id, client.vendor, client.device, client.role);
    }

    Ok(())
}
