//! Eval command implementation

use anyhow::{Context, Result};
use colored::Colorize;
use ks_driver::Driver;
use std::path::Path;

pub fn eval(driver: &Driver, path: &Path, json: bool) -> Result<()> {
    let unit = driver
        .compile_file(path)
        .map_err(|errors| crate::report(driver, &errors))?;

    if json {
        let text = serde_json::to_string_pretty(&unit.constants)
            .context("Failed to serialize constants")?;
        println!("{text}");
        return Ok(());
    }

    if unit.constants.is_empty() {
        println!("{} no constants in {}", "Note:".yellow(), path.display());
    }
    for (name, value) in &unit.constants {
        println!("{} = {}", name.bold(), value.repr());
    }
    Ok(())
}
