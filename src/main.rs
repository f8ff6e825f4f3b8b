use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use rocket::{routes, Build, Rocket};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

mod community;
use community::DiscordRest;

mod config;
use config::RosterConfig;

mod correlation;

mod graph;
use graph::WellPlayedGraph;

mod reconciler;
use reconciler::{Reconciler, ReconcilerSettings};

#[cfg(test)]
mod testing;

mod webhooks;
use webhooks::{well_played_webhook, WellPlayedSecret};

#[derive(Parser)]
#[command(version)]
struct Opts {
    /// Configuration file for roster-sync
    #[arg(short, long)]
    config: PathBuf,
}

#[rocket::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let opts = Opts::parse();
    let config = RosterConfig::load(&opts.config)?;
    debug!("loaded config: {:?}", config);
    info!(
        "syncing teams of WellPlayed app {} into Discord guild {}",
        config.wp_app_id, config.discord_guild_id
    );

    let graph = WellPlayedGraph::new(config.wp_graphql_url.clone(), &config.wp_graphql_headers)
        .context("failed to create WellPlayed GraphQL client")?;
    let discord = DiscordRest::new(config.discord_api_url.clone(), config.discord_token.clone())
        .context("failed to create Discord REST client")?;
    let reconciler = Reconciler::new(
        Box::new(graph),
        Box::new(discord),
        ReconcilerSettings::from(&config),
    );
    let secret = WellPlayedSecret(config.wp_webhook_secret);

    rocket(secret, reconciler)
        .launch()
        .await
        .map(|_| ())
        .map_err(|err| anyhow::anyhow!("rocket failed: {}", err))
}

fn rocket(secret: WellPlayedSecret, reconciler: Reconciler) -> Rocket<Build> {
    rocket::build()
        .mount("/", routes![well_played_webhook])
        .manage(secret)
        .manage(reconciler)
}
