mod accounts;
mod display;
mod serve;
mod settings;

use anyhow::Result;
use clap::{arg, Command};
use tracing_subscriber::{
    filter::LevelFilter, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter,
};

use crate::settings::Settings;

static CLIENT_NAME: &str = "slotter";

async fn run() -> Result<()> {
    let app = Command::new(CLIENT_NAME)
        .about("The slotter utility serves the candidate account list for the static to \
         dynamic slotting transition wizard, sourced from a monday.com board.")
        .version("0.1.0")
        .subcommand_required(true)
        .allow_external_subcommands(false)
        .arg(arg!(CONFIG: -c --config [FILE] "Sets a custom config file"))
        .arg(arg!(verbose: -v --verbose "Logs at info level unless RUST_LOG says otherwise"))
        .subcommand(Command::new("serve")
            .about("Runs the account proxy HTTP server until interrupted.")
            .arg(arg!(listen: -l --listen [ADDR] "The socket address to listen on, overrides the configured one.")))
        .subcommand(Command::new("accounts")
            .about("Queries the board once and prints the candidate accounts to stdout."));

    let matches = app.get_matches();

    let default_level = if matches.is_present("verbose") {
        LevelFilter::INFO
    } else {
        LevelFilter::WARN
    };
    tracing_subscriber::registry()
        .with(
            EnvFilter::builder()
                .with_default_directive(default_level.into())
                .from_env_lossy(),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let settings = Settings::new(matches.value_of("CONFIG"))?;

    match matches.subcommand() {
        Some(("serve", serve_matches)) => serve::run(serve_matches, settings).await?,
        Some(("accounts", account_matches)) => accounts::run(account_matches, settings).await?,
        None => unreachable!("subcommand is required"),
        _ => unreachable!(),
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        println!("{:#}", err);
        std::process::exit(1);
    }
}
