use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use futures::future::join_all;
use tracing::{error, info};

use devbox_releases::config::RegistryConfig;
use devbox_releases::datasource::registries::DevboxRegistry;
use devbox_releases::datasource::{LookupError, LookupRequest, Registry, ReleaseResult};

/// Look up published releases of Devbox packages
#[derive(Debug, Parser)]
#[command(name = "devbox-releases", version, about)]
struct Cli {
    /// Package names to look up (e.g. nodejs, python)
    #[arg(required = true)]
    packages: Vec<String>,

    /// Registry base URL [default: $DEVBOX_REGISTRY_URL or the public registry]
    #[arg(long)]
    registry_url: Option<String>,

    /// Request timeout in seconds
    #[arg(long, default_value_t = devbox_releases::config::DEFAULT_TIMEOUT_SECS)]
    timeout: u64,

    /// Print results as JSON, one object per line
    #[arg(long)]
    json: bool,

    /// Mirror debug logs to stderr
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    devbox_releases::log::init(cli.verbose)?;

    let config = match &cli.registry_url {
        Some(url) => RegistryConfig::new(url)?,
        None => RegistryConfig::from_env()?,
    }
    .with_timeout(Duration::from_secs(cli.timeout));

    info!("Looking up {} package(s) at {}", cli.packages.len(), config.registry_url);

    let registry = DevboxRegistry::from_config(&config)?;

    let lookups = cli.packages.iter().map(|name| {
        let registry = &registry;
        async move {
            let outcome = match LookupRequest::new(name.as_str()) {
                Ok(request) => registry.get_releases(&request).await,
                Err(e) => Err(e),
            };
            (name.as_str(), outcome)
        }
    });
    let outcomes = join_all(lookups).await;

    let mut failed = false;
    for (name, outcome) in outcomes {
        if let Err(e) = &outcome {
            error!("Lookup for {} failed: {}", name, e);
            failed = true;
        }
        if cli.json {
            println!("{}", json_line(name, &outcome)?);
        } else {
            print_human(name, &outcome);
        }
    }

    Ok(if failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}

fn json_line(
    name: &str,
    outcome: &Result<Option<ReleaseResult>, LookupError>,
) -> serde_json::Result<String> {
    let value = match outcome {
        Ok(result) => serde_json::json!({ "package": name, "result": result }),
        Err(e) => serde_json::json!({
            "package": name,
            "error": e.to_string(),
            "externalHostError": e.is_external_host_error(),
        }),
    };
    serde_json::to_string(&value)
}

fn print_human(name: &str, outcome: &Result<Option<ReleaseResult>, LookupError>) {
    match outcome {
        Ok(Some(result)) => {
            println!("{} ({} releases)", name, result.releases().len());
            if let Some(homepage) = result.homepage() {
                println!("  homepage: {}", homepage);
            }
            for release in result.releases() {
                match &release.release_timestamp {
                    Some(ts) => println!("  {:<20} {}", release.version, ts),
                    None => println!("  {}", release.version),
                }
            }
        }
        Ok(None) => println!("{}: no releases", name),
        Err(e) => eprintln!("{}: {}", name, e),
    }
}
