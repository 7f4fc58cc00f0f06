// config.rs - engine configuration

use std::time::Duration;

pub const DEFAULT_PORT: u16 = 8030;
pub const DEFAULT_CANCEL_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Clone, Debug)]
pub struct EngineConfig {
    /// Upper bound on how long a cancel-and-restart waits for the old loop.
    pub cancel_timeout: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            cancel_timeout: DEFAULT_CANCEL_TIMEOUT,
        }
    }
}

impl EngineConfig {
    pub fn with_cancel_timeout(mut self, timeout: Duration) -> Self {
        self.cancel_timeout = timeout;
        self
    }
}
