#[macro_use] extern crate log;

pub mod config;
pub mod context;
pub mod handlers;
pub mod logger;
pub mod request;
pub mod response;
pub mod server;
pub mod utils;

use clap::Parser;

use crate::config::{Config, Overrides, CONFIG_ERROR};
use crate::handlers::StaticHandler;
use crate::server::HttpServer;
use crate::utils::ResultV;


const MODULE: &str = "MAIN";

/// Minimal HTTP server answering GET and PUT with a fixed payload
#[derive(Parser, Debug)]
#[command(author, version, about, long_about)]
struct Args {
    /// Path to the configurational file
    config_fn: Option<String>,

    /// Host or interface to bind
    #[arg(short, long)]
    listen: Option<String>,

    /// TCP port to bind
    #[arg(short, long)]
    port: Option<u16>,

    /// Log errors only
    #[arg(short, long, group = "verbosity")]
    quiet: bool,

    /// Log debug messages too
    #[arg(short, long, group = "verbosity")]
    verbose: bool,

    /// Log everything
    #[arg(short, long, group = "verbosity")]
    debug: bool,
}

impl Args {
    fn log_level(&self) -> Option<String> {
        let level = if self.debug {
            "trace"
        } else if self.verbose {
            "debug"
        } else if self.quiet {
            "error"
        } else {
            return None;
        };
        Some(level.to_string())
    }
}


fn main() -> ResultV {
    let args = Args::parse();
    let overrides = Overrides { level: args.log_level(), listen: args.listen, port: args.port };
    let cfg = Config::load(args.config_fn.as_deref(), &overrides)?;
    logger::init_logger(&cfg.log)?;

    let handler = StaticHandler::from_config(&cfg.handler).map_err(|e| {
        error!("[{}] Bad handler configuration: {}", MODULE, e);
        CONFIG_ERROR
    })?;
    info!("[{}] Use `{:?}` response policy; PUT accepted: {}", MODULE, handler.policy(), cfg.handler.accept_put);

    let server = HttpServer::bind(&cfg.server, handler)?;

    let addr = server.local_addr().map_or_else(|| cfg.server.address(), |a| a.to_string());
    info!("[{}] Starting hellod at {}", MODULE, addr);
    if let Some(path) = &args.config_fn {
        info!("[{}] Config loaded from {}", MODULE, path);
    }

    server.serve_forever()
}
