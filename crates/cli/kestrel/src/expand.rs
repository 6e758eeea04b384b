//! Expand command implementation

use anyhow::Result;
use ks_driver::Driver;
use std::path::Path;

pub fn expand(driver: &Driver, path: &Path) -> Result<()> {
    let index = driver
        .index_file(path)
        .map_err(|errors| crate::report(driver, &errors))?;
    tracing::info!(expansions = index.expansions, "expanded macros");

    print!("{}", driver.expanded_source(&index));
    Ok(())
}
