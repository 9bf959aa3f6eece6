//! Game configuration.

use serde::{Deserialize, Serialize};

use crate::error::{GameError, Result};

/// Settings for the persuasion-challenge game loop.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameSettings {
    /// Topics to rotate through, one per challenge.
    pub topics: Vec<String>,

    /// Minimum seconds between posting new challenges.
    #[serde(default = "default_cast_interval_secs")]
    pub cast_interval_secs: u64,

    /// Seconds between game loop ticks.
    #[serde(default = "default_tick_interval_secs")]
    pub tick_interval_secs: u64,

    /// Minimum score (inclusive, 1-10) a reply must reach to win.
    #[serde(default = "default_threshold")]
    pub persuasion_threshold: u8,

    /// Reward paid to the winner, in native token units.
    #[serde(default = "default_reward_amount")]
    pub reward_amount: String,

    /// Maximum replies fetched from the feed per tick.
    #[serde(default = "default_page_size")]
    pub page_size: usize,

    /// Directory holding the durable game document.
    #[serde(default = "default_data_dir")]
    pub data_dir: String,

    /// Address for the operator API.
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,
}

fn default_cast_interval_secs() -> u64 {
    3600
}

fn default_tick_interval_secs() -> u64 {
    60
}

fn default_threshold() -> u8 {
    7
}

fn default_reward_amount() -> String {
    "2".to_string()
}

fn default_page_size() -> usize {
    25
}

fn default_data_dir() -> String {
    "data".to_string()
}

fn default_listen_addr() -> String {
    "0.0.0.0:3000".to_string()
}

impl GameSettings {
    /// Validate the settings.
    pub fn validate(&self) -> Result<()> {
        if self.topics.is_empty() {
            return Err(GameError::Config(
                "at least one challenge topic is required".to_string(),
            ));
        }
        if !(1..=10).contains(&self.persuasion_threshold) {
            return Err(GameError::Config(format!(
                "persuasion_threshold must be in 1..=10, got {}",
                self.persuasion_threshold
            )));
        }
        if self.page_size == 0 {
            return Err(GameError::Config("page_size must be nonzero".to_string()));
        }
        Ok(())
    }
}

impl Default for GameSettings {
    fn default() -> Self {
        Self {
            topics: Vec::new(),
            cast_interval_secs: default_cast_interval_secs(),
            tick_interval_secs: default_tick_interval_secs(),
            persuasion_threshold: default_threshold(),
            reward_amount: default_reward_amount(),
            page_size: default_page_size(),
            data_dir: default_data_dir(),
            listen_addr: default_listen_addr(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings_with_topics() -> GameSettings {
        GameSettings {
            topics: vec!["AI benefits outweigh risks".to_string()],
            ..GameSettings::default()
        }
    }

    #[test]
    fn test_valid_settings() {
        assert!(settings_with_topics().validate().is_ok());
    }

    #[test]
    fn test_empty_topics_rejected() {
        let settings = GameSettings::default();
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_threshold_out_of_range_rejected() {
        let mut settings = settings_with_topics();
        settings.persuasion_threshold = 11;
        assert!(settings.validate().is_err());

        settings.persuasion_threshold = 0;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_defaults_fill_optional_fields() {
        let settings: GameSettings =
            serde_json::from_str(r#"{"topics": ["remote work beats offices"]}"#).unwrap();
        assert_eq!(settings.persuasion_threshold, 7);
        assert_eq!(settings.reward_amount, "2");
        assert_eq!(settings.cast_interval_secs, 3600);
    }
}
