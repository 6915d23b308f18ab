//! transgate CLI Client
//!
//! Command-line interface for sending one command through the gateway.

use clap::{ArgMatches, CommandFactory, FromArgMatches, Parser, Subcommand};
use transgate::protocol::ResponseFormat;
use transgate::{Command, Config, Gateway, Interactor, Parameter};
use tracing_subscriber::{fmt, EnvFilter};

/// transgate CLI
#[derive(Parser, Debug)]
#[command(name = "transgate-cli")]
#[command(about = "CLI for the line-protocol command gateway")]
#[command(version)]
struct Args {
    /// Backend host (overrides TRANS_HOST)
    #[arg(long)]
    host: Option<String>,

    /// Backend port (overrides TRANS_PORT)
    #[arg(short, long)]
    port: Option<u16>,

    /// Request deadline in milliseconds (overrides TRANS_TIMEOUT_MS)
    #[arg(short, long)]
    timeout_ms: Option<u64>,

    /// Allowed command; repeat for several (overrides TRANS_ALLOWED_COMMANDS)
    #[arg(short, long = "allow")]
    allow: Vec<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Send a command to the backend
    Send {
        /// Command name
        name: String,

        /// Plain parameter as key=value (repeatable, interleaves with --blob in typed order)
        #[arg(short = 'p', long = "param", value_parser = parse_key_value)]
        params: Vec<(String, String)>,

        /// Blob parameter as key=value (repeatable, interleaves with --param in typed order)
        #[arg(short = 'b', long = "blob", value_parser = parse_key_value)]
        blobs: Vec<(String, String)>,

        /// Output shape: map or slice
        #[arg(short, long, default_value = "map")]
        format: ResponseFormat,
    },

    /// Print the effective configuration
    Config,
}

fn parse_key_value(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .ok_or_else(|| format!("expected key=value, got {:?}", raw))
}

/// Interleave `--param` and `--blob` values in the order they were typed
fn ordered_params(
    matches: Option<&ArgMatches>,
    params: Vec<(String, String)>,
    blobs: Vec<(String, String)>,
) -> Vec<Parameter> {
    let indices = |id: &str| -> Vec<usize> {
        matches
            .and_then(|m| m.indices_of(id))
            .map(|indices| indices.collect())
            .unwrap_or_default()
    };

    let plain = params.into_iter().map(|(key, value)| Parameter::new(key, value));
    let blob = blobs.into_iter().map(|(key, value)| Parameter::blob(key, value));

    let mut tagged: Vec<(usize, Parameter)> = indices("params")
        .into_iter()
        .zip(plain)
        .chain(indices("blobs").into_iter().zip(blob))
        .collect();
    tagged.sort_by_key(|(index, _)| *index);

    tagged.into_iter().map(|(_, param)| param).collect()
}

fn load_config(args: &Args) -> transgate::Result<Config> {
    let base = Config::from_env()?;
    let mut builder = Config::builder()
        .host(args.host.clone().unwrap_or(base.host))
        .port(args.port.unwrap_or(base.port))
        .connect_timeout(base.connect_timeout)
        .request_timeout(base.request_timeout)
        .retry_after(base.retry_after)
        .read_buffer_size(base.read_buffer_size)
        .allowed_commands(base.allowed_commands);

    if let Some(ms) = args.timeout_ms {
        builder = builder.request_timeout_ms(ms);
    }
    if !args.allow.is_empty() {
        builder = builder.allowed_commands(args.allow.iter().cloned());
    }

    Ok(builder.build())
}

fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    fmt().with_env_filter(filter).with_writer(std::io::stderr).init();

    let matches = Args::command().get_matches();
    let args = match Args::from_arg_matches(&matches) {
        Ok(args) => args,
        Err(e) => e.exit(),
    };

    let config = match load_config(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(2);
        }
    };

    match args.command {
        Commands::Config => {
            println!("backend:          {}", config.addr());
            println!("connect timeout:  {:?}", config.connect_timeout);
            println!("request timeout:  {:?}", config.request_timeout);
            println!("retry after:      {:?}", config.retry_after);
            println!("read buffer size: {}", config.read_buffer_size);
            println!("allowed commands: {}", config.allowed_commands_display());
        }
        Commands::Send {
            name,
            params,
            blobs,
            format,
        } => {
            let gateway = match Gateway::new(config) {
                Ok(gateway) => gateway,
                Err(e) => {
                    eprintln!("{}", e);
                    std::process::exit(2);
                }
            };

            let command = ordered_params(matches.subcommand_matches("send"), params, blobs)
                .into_iter()
                .fold(Command::new(name), Command::with_param);

            let interactor = Interactor::new(gateway);
            let (response, failed) = match interactor.execute_command(&command) {
                Ok(response) => (response, false),
                Err(e) => (e.into_response(), true),
            };

            match serde_json::to_string_pretty(&response.view(format)) {
                Ok(json) => println!("{}", json),
                Err(e) => {
                    eprintln!("Failed to render response: {}", e);
                    std::process::exit(1);
                }
            }

            if failed || !response.is_ok() {
                std::process::exit(1);
            }
        }
    }
}
