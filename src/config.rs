//! Engine configuration: board scaling, starting stats and drop cadence.

/// Game tunables
#[derive(Debug, Clone)]
pub struct GameConfig {
    /// Board cells per player along the x axis (width = factor x players)
    pub board_width_per_player: u32,
    /// Board cells per player along the y axis
    pub board_height_per_player: u32,
    /// Explicit board width; overrides the per-player derivation
    pub board_width: Option<u32>,
    /// Explicit board height; overrides the per-player derivation
    pub board_height: Option<u32>,
    /// Action points each player starts with
    pub starting_points: u32,
    /// Starting Chebyshev action radius
    pub starting_range: u32,
    pub starting_lives: u32,
    /// Milliseconds between periodic action point drops
    pub gift_round_interval: u64,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            board_width_per_player: 5,
            board_height_per_player: 3,
            board_width: None,
            board_height: None,
            starting_points: 1,
            starting_range: 2,
            starting_lives: 3,
            gift_round_interval: 600_000, // 10 minutes
        }
    }
}

impl GameConfig {
    /// Load config from environment or use defaults
    pub fn load_or_default() -> Self {
        let mut config = Self::default();

        if let Ok(interval) = std::env::var("GIFT_ROUND_INTERVAL_MS") {
            if let Ok(parsed) = interval.parse::<u64>() {
                if parsed > 0 {
                    config.gift_round_interval = parsed;
                } else {
                    tracing::warn!("GIFT_ROUND_INTERVAL_MS must be > 0, using default");
                }
            } else {
                tracing::warn!("Invalid GIFT_ROUND_INTERVAL_MS '{}', using default", interval);
            }
        }

        if let Ok(lives) = std::env::var("STARTING_LIVES") {
            if let Ok(parsed) = lives.parse::<u32>() {
                if parsed > 0 {
                    config.starting_lives = parsed;
                } else {
                    tracing::warn!("STARTING_LIVES must be > 0, using default");
                }
            } else {
                tracing::warn!("Invalid STARTING_LIVES '{}', using default", lives);
            }
        }

        if let Ok(range) = std::env::var("STARTING_RANGE") {
            if let Ok(parsed) = range.parse::<u32>() {
                if parsed >= 2 {
                    config.starting_range = parsed;
                } else {
                    tracing::warn!("STARTING_RANGE must be >= 2, using default");
                }
            } else {
                tracing::warn!("Invalid STARTING_RANGE '{}', using default", range);
            }
        }

        if let Ok(points) = std::env::var("STARTING_POINTS") {
            if let Ok(parsed) = points.parse::<u32>() {
                config.starting_points = parsed;
            } else {
                tracing::warn!("Invalid STARTING_POINTS '{}', using default", points);
            }
        }

        if let Ok(width) = std::env::var("BOARD_WIDTH") {
            if let Ok(parsed) = width.parse::<u32>() {
                if parsed > 0 {
                    config.board_width = Some(parsed);
                } else {
                    tracing::warn!("BOARD_WIDTH must be > 0, using default");
                }
            } else {
                tracing::warn!("Invalid BOARD_WIDTH '{}', using default", width);
            }
        }

        if let Ok(height) = std::env::var("BOARD_HEIGHT") {
            if let Ok(parsed) = height.parse::<u32>() {
                if parsed > 0 {
                    config.board_height = Some(parsed);
                } else {
                    tracing::warn!("BOARD_HEIGHT must be > 0, using default");
                }
            } else {
                tracing::warn!("Invalid BOARD_HEIGHT '{}', using default", height);
            }
        }

        config
    }

    /// Validate configuration after loading
    pub fn validate(&self) -> Result<(), String> {
        if self.board_width_per_player == 0 || self.board_height_per_player == 0 {
            return Err("board scaling factors must be at least 1".to_string());
        }
        if self.board_width == Some(0) || self.board_height == Some(0) {
            return Err("explicit board dimensions cannot be 0".to_string());
        }
        if self.starting_range < 2 {
            return Err("starting_range must be at least 2".to_string());
        }
        if self.starting_lives == 0 {
            return Err("starting_lives must be at least 1".to_string());
        }
        if self.gift_round_interval == 0 {
            return Err("gift_round_interval must be at least 1ms".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = GameConfig::default();
        assert_eq!(config.board_width_per_player, 5);
        assert_eq!(config.board_height_per_player, 3);
        assert_eq!(config.starting_range, 2);
        assert_eq!(config.starting_lives, 3);
        assert_eq!(config.gift_round_interval, 600_000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_catches_degenerate_values() {
        let mut config = GameConfig::default();
        config.starting_range = 1;
        assert!(config.validate().is_err());

        let mut config = GameConfig::default();
        config.board_width = Some(0);
        assert!(config.validate().is_err());

        let mut config = GameConfig::default();
        config.gift_round_interval = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_or_default() {
        let config = GameConfig::load_or_default();
        assert!(config.validate().is_ok());
    }
}
