mod config;
mod error;
mod ip;
mod provider;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::builder::FalseyValueParser;
use clap::Parser;
use log::{debug, info};

use crate::config::{Config, Overrides, Settings};
use crate::error::Error;
use crate::provider::client::{ApiClient, ReqwestTransport};
use crate::provider::cloudflare::{self, Target};
use crate::provider::ReconciliationOutcome;

/// Specify a Cloudflare API token and a desired (sub)domain, and the record
/// will be assigned your public IP address.
#[derive(Parser)]
#[command(name = "cddns")]
#[command(version)]
#[command(about = "Cloudflare Dynamic DNS updater")]
struct Args {
    /// Cloudflare API token with Zone.DNS permission
    /// (https://dash.cloudflare.com/profile/api-tokens)
    #[arg(short, long, env = "CF_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// The FQDN to create or update with the IP address
    #[arg(short, long, env = "CF_DOMAIN")]
    domain: Option<String>,

    /// Assign an AAAA record with IPv6 instead
    #[arg(long, env = "CF_IPV6", value_parser = FalseyValueParser::new())]
    ipv6: bool,

    /// Proxy the record through Cloudflare. Only applies when creating it
    #[arg(short, long, env = "CF_PROXY", value_parser = FalseyValueParser::new())]
    proxy: bool,

    /// Enable verbose output
    #[arg(long)]
    debug: bool,

    /// Optional TOML configuration file
    #[arg(short, long, env = "CF_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let args = Args::parse();

    match run(args).await {
        Ok(outcome) => {
            let record = outcome.record();
            let verb = match &outcome {
                ReconciliationOutcome::Created(_) => "created with",
                ReconciliationOutcome::Updated(_) => "changed to",
            };
            println!(
                "Success: Your address {} has been {} the IP {}",
                record.name, verb, record.content
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            match e.hint() {
                Some(hint) => eprintln!("Error: {} ({})", e, hint),
                None => eprintln!("Error: {}", e),
            }
            ExitCode::from(e.exit_code())
        }
    }
}

async fn run(args: Args) -> Result<ReconciliationOutcome, Error> {
    let config = match &args.config {
        Some(path) => Config::load(path).map_err(Error::Config)?,
        None => Config::default(),
    };

    let settings = Settings::resolve(
        Overrides {
            token: args.token,
            domain: args.domain,
            ipv6: args.ipv6,
            proxy: args.proxy,
            debug: args.debug,
        },
        config,
    )?;

    // Env var takes precedence over the configured level
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(&settings.log_level),
    )
    .init();

    if let Some(path) = &args.config {
        info!("Loaded configuration from: {}", path.display());
    }
    debug!("{:?}", settings);

    let transport = ReqwestTransport::new();

    let ip = ip::discover(&transport, settings.ip_url(), settings.ipv6).await?;
    info!("Current IP address for {}: {}", settings.domain, ip);

    let client = ApiClient::new(transport, &settings.api_base, &settings.token);
    let ip = ip.to_string();
    let target = Target {
        domain: &settings.domain,
        ip: &ip,
        ipv6: settings.ipv6,
        proxy: settings.proxy,
    };

    let outcome = cloudflare::reconcile(&client, &target).await?;
    debug!("Final record state: {:?}", outcome.record());

    Ok(outcome)
}
