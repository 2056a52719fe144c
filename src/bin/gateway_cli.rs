//! gateway-cli: send one call through the gateway, or manage local secrets.
//!
//! Usage:
//!   gateway-cli call <OPERATION> [PAYLOAD_JSON] [--identity <id>] [--config <file>]
//!   gateway-cli secret set <identity> <value> [--config <file>]
//!   gateway-cli secret remove <identity> [--config <file>]

use anyhow::{anyhow, bail, Context};
use backend_gateway::secrets::{KeyringSecretStore, SecretStore};
use backend_gateway::{Gateway, GatewayConfig, Identity, Operation};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().collect();
    if args.len() < 2 {
        print_usage();
        std::process::exit(1);
    }

    let outcome = match args[1].as_str() {
        "call" => cmd_call(&args[2..]).await,
        "secret" => cmd_secret(&args[2..]).await,
        "version" | "--version" | "-V" => {
            println!("gateway-cli {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        "help" | "--help" | "-h" => {
            print_usage();
            Ok(())
        }
        other => {
            eprintln!("Unknown command: {other}");
            eprintln!();
            print_usage();
            std::process::exit(1);
        }
    };

    if let Err(e) = outcome {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}

fn print_usage() {
    println!(
        r#"gateway-cli: backend request gateway

USAGE:
    gateway-cli <COMMAND> [OPTIONS]

COMMANDS:
    call <OPERATION> [PAYLOAD_JSON]     Send one call and print the response
        --identity <id>                 Call as this identity (default: public)
    secret set <identity> <value>       Store a signing secret in the keychain
    secret remove <identity>            Remove a signing secret
    version                             Show version information
    help                                Show this help message

OPTIONS:
    --config <file>                     YAML config file

ENVIRONMENT:
    GATEWAY_ENDPOINT                    Backend URL
    GATEWAY_HTTP_TIMEOUT_SECS           Request timeout
    GATEWAY_HTTP_POOL_MAX_IDLE_PER_HOST Idle connections kept per host
    GATEWAY_PROXY_URL                   HTTP proxy
    GATEWAY_FRESHNESS_MS                Cache freshness window
    GATEWAY_CACHE_ENABLED               Enable the response cache
    GATEWAY_KEYRING_SERVICE             Keychain service name
    RUST_LOG                            Log filter (default: warn)"#
    );
}

/// Pull `--flag <value>` out of `args`, returning the value and the remaining positionals.
fn take_flag(args: &[String], flag: &str) -> anyhow::Result<(Option<String>, Vec<String>)> {
    let mut value = None;
    let mut rest = Vec::new();
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        if arg == flag {
            let v = iter
                .next()
                .ok_or_else(|| anyhow!("{flag} requires a value"))?;
            value = Some(v.clone());
        } else {
            rest.push(arg.clone());
        }
    }
    Ok((value, rest))
}

fn load_config(path: Option<&str>) -> anyhow::Result<GatewayConfig> {
    match path {
        Some(p) => {
            let mut cfg = GatewayConfig::from_yaml_file(p)
                .with_context(|| format!("loading config {p}"))?;
            cfg.apply_env();
            Ok(cfg)
        }
        None => Ok(GatewayConfig::from_env()),
    }
}

async fn cmd_call(args: &[String]) -> anyhow::Result<()> {
    let (config_path, args) = take_flag(args, "--config")?;
    let (identity, args) = take_flag(&args, "--identity")?;

    let Some(name) = args.first() else {
        bail!("call requires an OPERATION");
    };
    let payload = match args.get(1) {
        Some(raw) => serde_json::from_str(raw).context("PAYLOAD_JSON is not valid JSON")?,
        None => serde_json::Value::Null,
    };

    let gateway = Gateway::builder()
        .config(load_config(config_path.as_deref())?)
        .build()?;
    let identity = identity.map(Identity::from).unwrap_or(Identity::Anonymous);

    let response = gateway
        .call(&Operation::classify(name.as_str()), payload, &identity)
        .await?;
    println!("{}", serde_json::to_string_pretty(&response)?);
    if !response.is_success() {
        std::process::exit(2);
    }
    Ok(())
}

async fn cmd_secret(args: &[String]) -> anyhow::Result<()> {
    let (config_path, args) = take_flag(args, "--config")?;
    let cfg = load_config(config_path.as_deref())?;
    let store = KeyringSecretStore::new(cfg.keyring_service);

    match args.iter().map(String::as_str).collect::<Vec<_>>().as_slice() {
        ["set", identity, value] => {
            if Identity::from(*identity).is_reserved() {
                bail!("{identity} is a reserved identity and is never signed");
            }
            if !store.write_secret(identity, value).await {
                bail!("keychain refused the secret for {identity}");
            }
            println!("stored secret for {identity}");
        }
        ["remove", identity] => {
            if store.remove_secret(identity).await {
                println!("removed secret for {identity}");
            } else {
                println!("no secret stored for {identity}");
            }
        }
        _ => bail!("usage: secret set <identity> <value> | secret remove <identity>"),
    }
    Ok(())
}
