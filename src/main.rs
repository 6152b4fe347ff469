use std::fs;

use smtp_sts_verify::{
    auth::fetch::HttpFetcher,
    config::Config,
    validator::{Request, Validator},
    UnwrapFailure,
};

#[derive(Debug, Default)]
struct Arguments {
    request: Request,
    cache: Option<String>,
    config: Option<String>,
    verbose: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let args = parse_args(std::env::args().skip(1)).failed("Invalid command line");

    // Read configuration parameters
    let mut config = match &args.config {
        Some(path) => Config::parse(
            &fs::read_to_string(path).failed("Could not read configuration file"),
        )
        .failed("Invalid configuration file"),
        None => Config::default(),
    };
    if let Some(cache) = &args.cache {
        config.set_value("cache.path", cache.as_str());
    }
    let validator_config = config
        .build_validator_config()
        .failed("Configuration error");

    // Enable logging
    let level = if args.verbose {
        tracing::Level::DEBUG
    } else {
        config
            .value("global.log-level")
            .failed("Failed to parse log level")
            .unwrap_or(tracing::Level::INFO)
    };
    tracing::subscriber::set_global_default(
        tracing_subscriber::FmtSubscriber::builder()
            .with_max_level(level)
            .with_writer(std::io::stderr)
            .finish(),
    )
    .failed("Failed to set subscriber");

    let fetcher = HttpFetcher::new(&validator_config.user_agent, validator_config.http_timeout)
        .failed("Failed to build HTTP client");
    let verdict = Validator::new(validator_config, fetcher)
        .validate(&args.request)
        .await;

    println!("{}", verdict.trail);
    std::process::exit(verdict.status.exit_code());
}

fn parse_args(mut args: impl Iterator<Item = String>) -> Result<Arguments, String> {
    let mut result = Arguments::default();
    let mut domain = None;
    let mut record = None;

    while let Some(arg) = args.next() {
        let (key, value) = if let Some((key, value)) = arg.split_once('=') {
            (key.to_string(), Some(value.to_string()))
        } else {
            (arg, None)
        };

        match key.as_str() {
            "-D" | "--dnssec" | "-v" | "--verbose" if value.is_some() => {
                return Err(format!("Flag {} does not take a value", key));
            }
            "-D" | "--dnssec" => result.request.dnssec = true,
            "-v" | "--verbose" => result.verbose = true,
            "-d" | "--domain" | "-s" | "--smtp-sts" | "-m" | "--mx" | "-c" | "--cachedb"
            | "--config" => {
                let value = match value.or_else(|| args.next()) {
                    Some(value) => value,
                    None => return Err(format!("Missing value for {}", key)),
                };
                match key.as_str() {
                    "-d" | "--domain" => domain = Some(value.trim().to_lowercase()),
                    "-s" | "--smtp-sts" => record = Some(value),
                    "-m" | "--mx" => result.request.mx.push(value.trim().to_string()),
                    "-c" | "--cachedb" => result.cache = Some(value),
                    _ => result.config = Some(value),
                }
            }
            _ => return Err(format!("Unknown argument {:?}", key)),
        }
    }

    result.request.domain = domain.ok_or("Missing parameter --domain=<domain>")?;
    result.request.sts_record = record.ok_or("Missing parameter --smtp-sts=<record>")?;
    if result.request.mx.is_empty() {
        return Err("Missing parameter --mx=<hostname>".to_string());
    }

    Ok(result)
}
