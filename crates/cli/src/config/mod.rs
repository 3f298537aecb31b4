use clap::Args;
use serde::Deserialize;

use crate::error::Result;

const DEFAULT_CONFIG_PATH: &str = "config/trackwise.toml";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub base_url: String,
    /// JSON file holding the bearer token between runs.
    pub session_path: String,
    pub log_level: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000/api".to_string(),
            session_path: "config/trackwise_session.json".to_string(),
            log_level: "warn".to_string(),
        }
    }
}

#[derive(Debug, Args)]
pub struct ConfigArgs {
    /// Optional config file path (TOML).
    #[arg(long, global = true)]
    config: Option<String>,
    /// Override base URL (e.g. http://localhost:3000/api).
    #[arg(long, global = true)]
    base_url: Option<String>,
    /// Override where the session token is stored.
    #[arg(long, global = true)]
    session_path: Option<String>,
    /// Override log level (error, warn, info, debug, trace).
    #[arg(long, global = true)]
    log_level: Option<String>,
}

const ENV_PREFIX: &str = "TRACKWISE";

/// Defaults, then the TOML file, then `TRACKWISE_*` variables, then flags.
pub fn load(args: ConfigArgs) -> Result<AppConfig> {
    layered(args, config::Environment::with_prefix(ENV_PREFIX))
}

fn layered(args: ConfigArgs, env: config::Environment) -> Result<AppConfig> {
    let config_path = args.config.as_deref().unwrap_or(DEFAULT_CONFIG_PATH);
    let mut builder = config::Config::builder();
    builder = builder.add_source(config::File::with_name(config_path).required(false));
    builder = builder.add_source(env);
    let mut settings: AppConfig = builder.build()?.try_deserialize()?;

    if let Some(base_url) = args.base_url {
        settings.base_url = base_url;
    }
    if let Some(session_path) = args.session_path {
        settings.session_path = session_path;
    }
    if let Some(log_level) = args.log_level {
        settings.log_level = log_level;
    }

    Ok(settings)
}
