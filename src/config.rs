use serde_derive::Deserialize;

use crate::utils::Result;


pub const CONFIG_ERROR: &str = "config error";

pub const DEFAULT_LISTEN: &str = "localhost";
pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_POLICY: &str = "full";
pub const DEFAULT_LOG_KIND: &str = "console";
pub const DEFAULT_LOG_LEVEL: &str = "info";
pub const DEFAULT_LOG_FILE: &str = "hellod.log";


#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub listen: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn address(&self) -> String {
        format!("{}:{}", self.listen, self.port)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct HandlerConfig {
    /// One of `full`, `simple`, `minimal`
    pub policy: String,
    pub accept_put: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
    /// `console` or `file`
    pub kind: String,
    pub level: String,
    pub file: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub handler: HandlerConfig,
    pub log: LogConfig,
}

/// Values given on the command line; they win over the file.
#[derive(Debug, Default)]
pub struct Overrides {
    pub listen: Option<String>,
    pub port: Option<u16>,
    pub level: Option<String>,
}


impl Config {
    pub fn load(path: Option<&str>, overrides: &Overrides) -> Result<Config> {
        Self::build(path.map(config::File::with_name), overrides)
    }

    fn build<S>(source: Option<S>, overrides: &Overrides) -> Result<Config>
    where
        S: config::Source + Send + Sync + 'static,
    {
        let mut builder = config::Config::builder()
            .set_default("server.listen", DEFAULT_LISTEN).map_err(report)?
            .set_default("server.port", i64::from(DEFAULT_PORT)).map_err(report)?
            .set_default("handler.policy", DEFAULT_POLICY).map_err(report)?
            .set_default("handler.accept_put", true).map_err(report)?
            .set_default("log.kind", DEFAULT_LOG_KIND).map_err(report)?
            .set_default("log.level", DEFAULT_LOG_LEVEL).map_err(report)?
            .set_default("log.file", DEFAULT_LOG_FILE).map_err(report)?;

        if let Some(source) = source {
            builder = builder.add_source(source);
        }
        if let Some(listen) = &overrides.listen {
            builder = builder.set_override("server.listen", listen.as_str()).map_err(report)?;
        }
        if let Some(port) = overrides.port {
            builder = builder.set_override("server.port", i64::from(port)).map_err(report)?;
        }
        if let Some(level) = &overrides.level {
            builder = builder.set_override("log.level", level.as_str()).map_err(report)?;
        }

        builder.build()
            .and_then(|c| c.try_deserialize::<Config>())
            .map_err(report)
    }
}

// The logger is not up yet while the config is being read.
fn report(e: config::ConfigError) -> &'static str {
    eprintln!("Could not load configuration: {}", e);
    CONFIG_ERROR
}
