//! Check command implementation

use anyhow::Result;
use colored::Colorize;
use ks_driver::Driver;
use std::path::Path;

pub fn check(driver: &Driver, path: &Path) -> Result<()> {
    println!("{} {}", "Checking".green().bold(), path.display());

    let unit = driver
        .compile_file(path)
        .map_err(|errors| crate::report(driver, &errors))?;

    println!(
        "  {} {} items resolved, {} macro expansions",
        "✓".green(),
        unit.index.symbols.len(),
        unit.index.expansions
    );
    println!("  {} {} constants evaluated", "✓".green(), unit.constants.len());
    println!("  {} {} runtime functions", "✓".green(), unit.functions.len());
    println!("{} No errors found", "Success:".green().bold());
    Ok(())
}
