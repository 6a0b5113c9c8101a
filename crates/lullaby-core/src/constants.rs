//! Application constants and configuration defaults
//!
//! Centralized location for magic numbers and default values

use std::time::Duration;

/// HTTP client configuration
pub mod http {
    use super::*;

    /// Connection timeout for HTTP requests
    pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(15);

    /// Timeout for job submission requests
    pub const SUBMIT_TIMEOUT: Duration = Duration::from_secs(30);

    /// Timeout for status checks
    pub const STATUS_TIMEOUT: Duration = Duration::from_secs(10);

    /// Audio files can be large
    pub const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(60);

    /// User agent sent with every request
    pub const USER_AGENT: &str = "Lullaby/0.1";
}

/// Polling defaults
pub mod polling {
    use super::*;

    /// Maximum number of status checks per job
    pub const MAX_ATTEMPTS: u32 = 60;

    /// Nominal delay between status checks
    pub const INTERVAL: Duration = Duration::from_secs(5);

    /// Overall wall-clock ceiling for one job
    pub const MAX_TOTAL: Duration = Duration::from_secs(600);

    /// Consecutive transient failures tolerated before giving up
    pub const MAX_UNAVAILABLE_RETRIES: u32 = 3;

    /// Upper bound for any single backoff delay
    pub const MAX_DELAY: Duration = Duration::from_secs(60);
}

/// Provider defaults
pub mod providers {
    /// sunoapi.org base URL
    pub const SUNO_API_BASE_URL: &str = "https://api.sunoapi.org";

    /// Default sunoapi.org model
    pub const SUNO_API_MODEL: &str = "V3_5";

    /// PiAPI base URL (shared by Udio and Suno models)
    pub const PIAPI_BASE_URL: &str = "https://api.piapi.ai";

    /// PiAPI Udio model
    pub const PIAPI_UDIO_MODEL: &str = "music-u";

    /// PiAPI Suno model
    pub const PIAPI_SUNO_MODEL: &str = "chirp-v3-5";

    /// Default style when the request carries none
    pub const DEFAULT_STYLE: &str = "lullaby";

    /// Default title when the request carries none
    pub const DEFAULT_TITLE: &str = "Untitled Song";

    /// Audio returned by the demo provider
    pub const DEMO_AUDIO_URL: &str =
        "https://www.soundhelix.com/examples/mp3/SoundHelix-Song-1.mp3";
}

/// Configuration file locations
pub mod config {
    /// Config directory name under the platform config dir
    pub const CONFIG_DIR_NAME: &str = "lullaby";

    /// Config file name
    pub const CONFIG_FILE_NAME: &str = "config.toml";
}
