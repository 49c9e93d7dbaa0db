use std::{path::PathBuf, sync::Arc};

use anyhow::anyhow;
use clap::Parser;
use log::info;
use shoutout_bot::{
    config::Config,
    handlers::{shoutout::compose::ShoutoutComposer, ShoutoutHandler},
    server::ShoutoutServer,
    twitch::{agent::TwitchAgent, ClientCredentials},
};

#[derive(Parser, Debug)]
#[command(version, about = "answers GET /shoutout/<username> with a ready-to-post shoutout")]
struct Args {
    /// Path to the configuration file. Written with defaults if it doesn't exist.
    #[arg(short, long, default_value = "shoutout.toml")]
    config: PathBuf,

    /// Port to listen on, overriding the config file.
    #[arg(short, long, env = "PORT")]
    port: Option<u16>,

    /// Address to bind, overriding the config file.
    #[arg(short, long)]
    address: Option<String>,
}

#[rocket::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    let mut config = Config::read_or_write_default_from(&args.config)?;
    if let Some(port) = args.port {
        config.server.port = port;
    }
    if let Some(address) = args.address {
        config.server.address = address;
    }
    config.validate()?;

    // credentials are a startup precondition, bail early without them
    let credentials = ClientCredentials::from_env()?;

    let agent = TwitchAgent::new(credentials, &config.twitch);
    let composer = ShoutoutComposer::new(config.shoutout.clone())?;
    let handler = ShoutoutHandler::new(Arc::new(agent), composer);

    info!(
        "listening for shoutout requests on {}:{}",
        config.server.address, config.server.port
    );
    let server = ShoutoutServer::new(handler, config.server.clone());

    let handle = server
        .launch()
        .await
        .map_err(|e| anyhow!("couldn't start the server: {e}"))?;

    // `?` for the `JoinError`, then rocket's own error
    handle
        .await?
        .map_err(|e| anyhow!("server stopped with an error: {e}"))?;

    Ok(())
}
