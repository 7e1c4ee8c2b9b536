//! Configuration command implementations

use anyhow::Result;

use crate::cli::{ConfigCommands, ConfigFormat, Output};
use crate::config::DnacompConfig;

/// Execute config commands
pub async fn execute(cmd: ConfigCommands, config_path: Option<&str>, output: &Output) -> Result<()> {
    match cmd {
        ConfigCommands::Show { format } => show(config_path, format),
        ConfigCommands::Validate => validate(config_path, output),
    }
}

fn show(config_path: Option<&str>, format: ConfigFormat) -> Result<()> {
    let config = DnacompConfig::load(config_path, None)?;
    let rendered = match format {
        ConfigFormat::Toml => toml::to_string_pretty(&config)?,
        ConfigFormat::Json => serde_json::to_string_pretty(&config)?,
    };
    println!("{}", rendered);
    Ok(())
}

fn validate(config_path: Option<&str>, output: &Output) -> Result<()> {
    let config = DnacompConfig::load(config_path, None)?;
    config.validate()?;

    output.success("Configuration is valid");
    output.key_value("Input directory", &config.input.directory.display().to_string(), false);
    output.key_value("Output directory", &config.output.directory.display().to_string(), false);
    let threads = match config.pool.max_threads {
        0 => "unbounded".to_string(),
        n => n.to_string(),
    };
    output.key_value("Max threads", &threads, false);
    Ok(())
}
