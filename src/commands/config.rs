use colored::*;
use eyre::Result;

use crate::cli::{ConfigAction, OutputFormat};
use crate::config::Config;

pub fn run(action: ConfigAction, config: &Config) -> Result<()> {
    match action {
        ConfigAction::Show { format } => show(OutputFormat::resolve(format), config),
    }
}

fn show(format: OutputFormat, config: &Config) -> Result<()> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(config)?);
        }
        OutputFormat::Yaml => {
            println!("{}", serde_yaml::to_string(config)?);
        }
        OutputFormat::Text => {
            println!("{}", "Atlas Configuration".bold());
            println!();

            println!("  log_level: {}", config.log_level.as_filter());
            println!("  author: {}", config.author);
            println!();

            println!("{}:", "maestro".cyan());
            println!("  api_url: {}", config.maestro.api_url);
            println!(
                "  session_name: {}",
                config.maestro.session_name.as_deref().unwrap_or("(auto)")
            );
            println!("  timeout_secs: {}", config.maestro.timeout_secs);
            println!("  retries: {}", config.maestro.retries);
            println!("  retry_delay_secs: {}", config.maestro.retry_delay_secs);
            println!();

            println!("{}:", "github".cyan());
            println!("  label: {}", config.github.label);
        }
    }

    Ok(())
}
