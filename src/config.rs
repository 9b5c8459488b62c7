use super::core::constants::{
    DEFAULT_ITERATION_CAP, DEFAULT_MAX_HOPS, DEFAULT_MAX_PATHS, DEFAULT_STEPS, ROUNDING_TOLERANCE,
};
use super::core::error::RouterError;
use super::types::RouterConfig;
use anyhow::Context;
use std::path::Path;
use std::time::Duration;

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            max_hops: DEFAULT_MAX_HOPS,
            max_paths: DEFAULT_MAX_PATHS,
            steps: DEFAULT_STEPS,
            iteration_cap: DEFAULT_ITERATION_CAP,
            deadline_ms: None,
            rounding_tolerance: ROUNDING_TOLERANCE,
        }
    }
}

impl RouterConfig {
    // Loads the config at `path`, writing the defaults there if it does not exist yet
    pub fn load_from<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let config: Self = confy::load_path(path)
            .with_context(|| format!("Couldn't load router config from {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), RouterError> {
        let positive = [
            ("max_hops", self.max_hops),
            ("max_paths", self.max_paths),
            ("steps", self.steps),
            ("iteration_cap", self.iteration_cap),
        ];
        if let Some((name, _)) = positive.iter().find(|(_, value)| *value == 0) {
            return Err(RouterError::Config(format!("{name} must be greater than zero")));
        }
        if !self.rounding_tolerance.is_finite() || self.rounding_tolerance <= 0.0 {
            return Err(RouterError::Config(format!(
                "rounding_tolerance must be positive, got {}",
                self.rounding_tolerance
            )));
        }
        Ok(())
    }

    pub fn deadline(&self) -> Option<Duration> {
        self.deadline_ms.map(Duration::from_millis)
    }
}
