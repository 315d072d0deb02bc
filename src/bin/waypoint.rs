// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Inspect a Waypoint configuration from the command line.
//!
//!  waypoint [--check] [METHOD:]PATH...
//!
//! Prints the filters that apply to each path, in execution order. With
//! `--check` an empty message is sent to the configured span collector.
//! The binary honours WAYPOINT_CONFIG_FILE or falls back to
//! /etc/waypoint/config.toml.

use std::env;
use std::error::Error;
use waypoint::{HttpMethod, Waypoint, error_fmt, info_fmt};

const DEFAULT_CONFIG_PATH: &str = "/etc/waypoint/config.toml";

fn parse_target(arg: &str) -> Result<(HttpMethod, &str), Box<dyn Error>> {
    match arg.split_once(':') {
        Some((method, path)) if !method.starts_with('/') => Ok((method.parse()?, path)),
        _ => Ok((HttpMethod::Get, arg)),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let mut check = false;
    let mut targets = Vec::new();
    for arg in env::args().skip(1) {
        if arg == "--check" {
            check = true;
        } else {
            targets.push(arg);
        }
    }

    let config_path = env::var("WAYPOINT_CONFIG_FILE").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
    if !std::path::Path::new(&config_path).exists() {
        eprintln!("Configuration file {config_path} does not exist.");
        return Err(Box::from("No configuration file found."));
    }

    let waypoint = Waypoint::loader()
        .with_config_file(&config_path)
        .with_env_vars()
        .build()
        .await?;
    info_fmt!("Waypoint", "Loaded configuration from {}", config_path);

    for target in &targets {
        let (method, path) = parse_target(target)?;
        let names: Vec<String> = waypoint
            .filter_chain()
            .matching(method, path)
            .await
            .iter()
            .map(|f| f.name().to_string())
            .collect();

        if names.is_empty() {
            println!("{method} {path} -> (no filters)");
        } else {
            println!("{method} {path} -> {}", names.join(", "));
        }
    }

    if check {
        let Some(sender) = waypoint.sender() else {
            println!("No span sender configured.");
            return Ok(());
        };
        match sender.check().await {
            Ok(()) => println!("{}: collector reachable", sender.name()),
            Err(e) => {
                error_fmt!("Waypoint", "Collector check failed: {}", e);
                return Err(e.into());
            }
        }
    }

    Ok(())
}
