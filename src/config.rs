use std::time::Duration;

use crossterm::style::{Color, Stylize};
use url::Url;

use crate::messages::{Locale, Messages};

pub const DEFAULT_BASE_URL: &str = "http://localhost:11434";
pub const DEFAULT_MODEL: &str = "qwen3:0.6b";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 60;
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Runtime settings, resolved once at startup and never mutated.
#[derive(Debug, Clone)]
pub struct Config {
    pub base_url: Url,
    pub model: String,
    pub request_timeout: Duration,
    pub probe_timeout: Duration,
    pub stream: bool,
    pub thinking: bool,
    /// Classify every chat line and route file requests to the file pipeline.
    pub agent: bool,
    /// Refuse file writes that resolve outside the working directory.
    pub confine_writes: bool,
    pub locale: Locale,
    pub palette: Palette,
}

impl Config {
    /// Settings for `base_url` and `model` with every other knob at its default.
    pub fn new(base_url: Url, model: impl Into<String>) -> Self {
        Self {
            base_url,
            model: model.into(),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            probe_timeout: PROBE_TIMEOUT,
            stream: true,
            thinking: false,
            agent: false,
            confine_writes: false,
            locale: Locale::default(),
            palette: Palette::default(),
        }
    }

    pub fn messages(&self) -> Messages {
        Messages::new(self.locale)
    }
}

/// Which role a piece of terminal output belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    User,
    Assistant,
    System,
    Error,
}

/// Terminal colours for each [`Tone`].
#[derive(Debug, Clone, Copy)]
pub struct Palette {
    pub enabled: bool,
    pub user: Color,
    pub assistant: Color,
    pub system: Color,
    pub error: Color,
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            enabled: true,
            user: Color::Blue,
            assistant: Color::Green,
            system: Color::Yellow,
            error: Color::Red,
        }
    }
}

impl Palette {
    pub fn plain() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    pub fn paint(&self, tone: Tone, text: &str) -> String {
        if !self.enabled {
            return text.to_string();
        }
        let color = match tone {
            Tone::User => self.user,
            Tone::Assistant => self.assistant,
            Tone::System => self.system,
            Tone::Error => self.error,
        };
        text.with(color).to_string()
    }
}
