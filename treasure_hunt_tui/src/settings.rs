use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use treasure_hunt_core::config::GameConfig;

#[derive(Parser, Debug, Default)]
#[command(version, about = "An agent races the clock to dig up treasure", long_about = None)]
pub struct Args {
    /// TOML file with game settings
    #[arg(short, long, value_name = "CONFIG_FILE")]
    pub config: Option<PathBuf>,

    /// Fixed board to play instead of random ones
    #[arg(short, long, value_name = "LAYOUT_FILE")]
    pub layout: Option<PathBuf>,

    /// Board side length
    #[arg(long)]
    pub size: Option<usize>,

    /// Seconds per session
    #[arg(long, value_name = "SECONDS")]
    pub time_limit: Option<u64>,

    /// Ticks per second
    #[arg(long)]
    pub fps: Option<u32>,

    /// Seed for board generation
    #[arg(long)]
    pub seed: Option<u64>,

    /// Disable the terminal bell on win and loss
    #[arg(long)]
    pub mute: bool,

    /// Write logs to this file
    #[arg(long, value_name = "LOG_FILE")]
    pub log_file: Option<PathBuf>,

    /// Log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl Args {
    /// Loads the config file, if any, and applies command line overrides on top.
    pub fn game_config(&self) -> Result<GameConfig> {
        let mut config = match &self.config {
            Some(path) => load_config(path)?,
            None => GameConfig::default(),
        };
        if let Some(size) = self.size {
            config.grid_size = size;
        }
        if let Some(time_limit) = self.time_limit {
            config.time_limit_secs = time_limit;
        }
        if let Some(fps) = self.fps {
            config.ticks_per_second = fps;
        }
        if self.seed.is_some() {
            config.seed = self.seed;
        }
        config.validate().context("Invalid game settings")?;
        Ok(config)
    }

    pub fn log_level(&self) -> tracing::Level {
        match self.verbose {
            0 => tracing::Level::INFO,
            1 => tracing::Level::DEBUG,
            _ => tracing::Level::TRACE,
        }
    }
}

fn load_config(path: &Path) -> Result<GameConfig> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;
    parse_config(&text).with_context(|| format!("Failed to parse config file {}", path.display()))
}

fn parse_config(text: &str) -> Result<GameConfig> {
    Ok(toml::from_str(text)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_config_keeps_defaults() {
        let config = parse_config(
            r#"
            grid_size = 12
            seed = 7

            [rules]
            damage = 25
            "#,
        )
        .unwrap();
        assert_eq!(config.grid_size, 12);
        assert_eq!(config.seed, Some(7));
        assert_eq!(config.rules.damage, 25);
        assert_eq!(config.rules.starting_health, 100);
        assert_eq!(config.treasure_count, 3);
        assert_eq!(config.time_limit_secs, 30);
    }

    #[test]
    fn cli_overrides_win() {
        let args = Args::parse_from(["treasure-hunt", "--size", "8", "--fps", "10", "--seed", "3"]);
        let config = args.game_config().unwrap();
        assert_eq!(config.grid_size, 8);
        assert_eq!(config.ticks_per_second, 10);
        assert_eq!(config.seed, Some(3));
    }

    #[test]
    fn invalid_overrides_are_rejected() {
        let args = Args::parse_from(["treasure-hunt", "--size", "1"]);
        assert!(args.game_config().is_err());
    }

    #[test]
    fn verbosity_maps_to_levels() {
        let args = Args::parse_from(["treasure-hunt", "-vv"]);
        assert_eq!(args.log_level(), tracing::Level::TRACE);
        assert_eq!(Args::default().log_level(), tracing::Level::INFO);
    }

    #[test]
    fn mistyped_fields_are_rejected() {
        assert!(parse_config("grid_size = \"big\"").is_err());
    }
}
