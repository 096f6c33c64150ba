//! Process configuration from environment variables

use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_LOCALE: &str = "en-US";
const DEFAULT_VOICE: &str = "en-US-DavisNeural";
const DEFAULT_NO_INPUT_TIMEOUT_MS: u64 = 5000;

/// Speech subsystem settings, handed to the bridge
#[derive(Debug, Clone, PartialEq)]
pub struct SpeechSettings {
    pub locale: String,
    pub voice: String,
    /// How long a listen turn waits before reporting no input
    pub no_input_timeout: Duration,
}

impl Default for SpeechSettings {
    fn default() -> Self {
        Self {
            locale: DEFAULT_LOCALE.to_string(),
            voice: DEFAULT_VOICE.to_string(),
            no_input_timeout: Duration::from_millis(DEFAULT_NO_INPUT_TIMEOUT_MS),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Json,
    Text,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Settings {
    pub speech: SpeechSettings,
    /// Grammar file to load instead of the built-in table
    pub grammar_path: Option<PathBuf>,
    pub log_format: LogFormat,
}

impl Settings {
    /// Load settings from `VOICE_BOOKING_*` environment variables.
    /// Missing or malformed values fall back to defaults.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    #[must_use]
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = SpeechSettings::default();
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let no_input_timeout = non_empty("VOICE_BOOKING_NO_INPUT_TIMEOUT_MS")
            .and_then(|ms| ms.trim().parse::<u64>().ok())
            .map_or(defaults.no_input_timeout, Duration::from_millis);

        let log_format = match non_empty("VOICE_BOOKING_LOG_FORMAT").as_deref() {
            Some(f) if f.eq_ignore_ascii_case("text") => LogFormat::Text,
            _ => LogFormat::Json,
        };

        Self {
            speech: SpeechSettings {
                locale: non_empty("VOICE_BOOKING_LOCALE").unwrap_or(defaults.locale),
                voice: non_empty("VOICE_BOOKING_VOICE").unwrap_or(defaults.voice),
                no_input_timeout,
            },
            grammar_path: non_empty("VOICE_BOOKING_GRAMMAR").map(PathBuf::from),
            log_format,
        }
    }
}
