//! Command-line and environment configuration.

use std::{net::SocketAddr, time::Duration};

use clap::Parser;
use gemini_relay_gemini::{DEFAULT_BASE_URL, DEFAULT_MODEL, GeminiConfig};
use gemini_relay_transport::ErrorPolicy;

/// Relay settings. Every flag can also come from the environment or `.env`.
#[derive(Parser)]
#[command(name = "gemini-relay")]
#[command(version, about = "Relay chat messages to Gemini and stream the growing answer back")]
pub struct Args {
    /// Gemini API key.
    #[arg(long, env = "GOOGLE_API_KEY", hide_env_values = true)]
    pub api_key: String,

    /// Model used for every exchange.
    #[arg(long, env = "GEMINI_MODEL", default_value = DEFAULT_MODEL)]
    pub model: String,

    /// Base URL of the Gemini API.
    #[arg(long, env = "GEMINI_API_BASE", default_value = DEFAULT_BASE_URL)]
    pub api_base: String,

    /// Address to listen on.
    #[arg(long, env = "RELAY_ADDR", default_value = "0.0.0.0:8000")]
    pub addr: SocketAddr,

    /// What to do when the provider fails: `report` an error frame or `disconnect`.
    #[arg(long, env = "RELAY_ON_PROVIDER_ERROR", default_value_t = ErrorPolicy::Report)]
    pub on_provider_error: ErrorPolicy,

    /// Provider connect timeout in seconds.
    #[arg(long, default_value_t = 10)]
    pub connect_timeout_secs: u64,

    /// Longest gap between streamed provider events, in seconds.
    #[arg(long, default_value_t = 120)]
    pub idle_timeout_secs: u64,

    /// Output logs as JSON.
    #[arg(long)]
    pub log_json: bool,
}

impl Args {
    /// Provider settings derived from the arguments.
    #[must_use]
    pub fn gemini_config(&self) -> GeminiConfig {
        let mut config = GeminiConfig::new(self.api_key.clone())
            .with_model(self.model.clone())
            .with_base_url(self.api_base.clone());
        config.connect_timeout = Duration::from_secs(self.connect_timeout_secs);
        config.idle_timeout = Duration::from_secs(self.idle_timeout_secs);
        config
    }
}
