//! Pieces shared by the demo binaries

use std::path::Path;

use rover_core::RoverResult;
use rover_runtime::RuntimeConfig;

/// Load the JSON config if one was given, otherwise start from defaults
pub fn load_config(path: Option<&Path>) -> RoverResult<RuntimeConfig> {
    match path {
        Some(path) => RuntimeConfig::load(path),
        None => Ok(RuntimeConfig::default()),
    }
}

pub fn banner(title: &str, subtitle: &str) {
    println!("╔════════════════════════════════════════════════════════════╗");
    println!("║  {:<58}║", title);
    println!("║  {:<58}║", subtitle);
    println!("╚════════════════════════════════════════════════════════════╝");
    println!();
}
