use clap::Parser;
use sart_experiment::{ConfigError, ParticipantId, SessionConfig, SessionNumber};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "sart", version, about = "Sustained attention to response task")]
pub struct Args {
    /// Participant id, `a` followed by eight digits
    #[arg(short, long)]
    pub participant: ParticipantId,

    /// Session number, 1 to 6
    #[arg(short, long)]
    pub session: SessionNumber,

    /// JSON config file; omitted keys keep their defaults
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    #[arg(long)]
    pub data_dir: Option<PathBuf>,

    /// TrueType font used for digits and texts
    #[arg(long)]
    pub font: Option<PathBuf>,

    /// Directory holding the page images (sart_instructions.png, ...)
    #[arg(long)]
    pub screens: Option<PathBuf>,

    /// Seed for the digit sequences and sizes
    #[arg(long)]
    pub seed: Option<u64>,

    /// Run in a window instead of fullscreen
    #[arg(long)]
    pub windowed: bool,
}

impl Args {
    /// Loads the config file, if any, and applies the command line overrides.
    pub fn session_config(&self) -> Result<SessionConfig, ConfigError> {
        let mut config = match &self.config {
            Some(path) => SessionConfig::load(path)?,
            None => SessionConfig::default(),
        };
        if let Some(dir) = &self.data_dir {
            config.data_dir = dir.clone();
        }
        if let Some(font) = &self.font {
            config.font_path = font.clone();
        }
        if let Some(dir) = &self.screens {
            config.screens_dir = Some(dir.clone());
        }
        config.validate()?;
        Ok(config)
    }
}
