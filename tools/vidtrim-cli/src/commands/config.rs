//! Show (and optionally persist) the effective configuration.

use vidtrim_common::config::AppConfig;

pub fn run(config: &AppConfig, write: bool) -> anyhow::Result<()> {
    println!("# {}", AppConfig::path().display());
    println!("{}", serde_json::to_string_pretty(config)?);

    if write {
        config.save()?;
        println!("Saved to {}", AppConfig::path().display());
    }
    Ok(())
}
