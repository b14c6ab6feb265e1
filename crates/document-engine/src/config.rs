use std::time::Duration;

/// Engine tuning
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Idle time after the last edit before the editor saves
    pub save_debounce: Duration,
    /// Upper bound on one text generation call
    pub generation_timeout: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            save_debounce: Duration::from_millis(800),
            generation_timeout: Duration::from_secs(30),
        }
    }
}
