//! Tunable redemption protocol parameters.

use serde::{Deserialize, Serialize};

/// Parameters governing the redemption protocol.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedemptionParams {
    /// Minimum time between two redemptions by the same member at the same
    /// business. Default: 24 hours.
    #[serde(default = "default_duplicate_window_secs")]
    pub duplicate_window_secs: u64,

    /// How long a verified scan may wait for operator confirmation before the
    /// terminal cancels it. Default: 2 minutes.
    #[serde(default = "default_confirmation_timeout_secs")]
    pub confirmation_timeout_secs: u64,
}

fn default_duplicate_window_secs() -> u64 {
    24 * 3600
}

fn default_confirmation_timeout_secs() -> u64 {
    120
}

impl Default for RedemptionParams {
    fn default() -> Self {
        Self {
            duplicate_window_secs: default_duplicate_window_secs(),
            confirmation_timeout_secs: default_confirmation_timeout_secs(),
        }
    }
}
