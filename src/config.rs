use crate::types::Config;
use anyhow::{bail, Context, Result};
use std::fs;

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let contents =
            fs::read_to_string(path).with_context(|| format!("failed to read {}", path))?;
        let config: Config =
            serde_yaml::from_str(&contents).with_context(|| format!("failed to parse {}", path))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let p = &self.freefly;
        if !(p.edge_low <= p.edge_high && p.edge_high <= p.edge_block) {
            bail!(
                "edge thresholds must be ordered: low={} high={} block={}",
                p.edge_low,
                p.edge_high,
                p.edge_block
            );
        }
        if p.forward_clear_frames == 0 {
            bail!("forward_clear_frames must be at least 1");
        }
        if p.move_fb <= 0 || p.move_ud <= 0 || p.move_yw <= 0 {
            bail!("command caps must be positive");
        }
        if self.video.fps == 0 || self.video.stall_timeout_ms == 0 {
            bail!("video fps and stall_timeout_ms must be positive");
        }
        if self.safety.altitude_min_cm >= self.safety.altitude_max_cm {
            bail!("altitude band is empty");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn rejects_inverted_edge_thresholds() {
        let mut config = Config::default();
        config.freefly.edge_low = 90.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn missing_config_file_is_an_error() {
        let err = Config::load("/nonexistent/freefly.yaml").unwrap_err();
        assert!(err.to_string().contains("failed to read"));
    }

    #[test]
    fn rejects_zero_confirm_frames() {
        let mut config = Config::default();
        config.freefly.forward_clear_frames = 0;
        assert!(config.validate().is_err());
    }
}
