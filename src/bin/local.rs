//! hop5 local hop binary.
//!
//! Usage: hop5-local [OPTIONS]
//!
//! Options:
//!   -c, --config <FILE>  Path to configuration file
//!   -g, --generate       Print a configuration template
//!   -h, --help           Print help information

use std::env;

use hop5::{ConfigFile, Server};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing — respects RUST_LOG env var (e.g. RUST_LOG=debug)
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        print_usage();
        return Ok(());
    }

    match args[1].as_str() {
        "-h" | "--help" => {
            print_usage();
        }
        "-g" | "--generate" => {
            generate_config()?;
        }
        "-c" | "--config" => {
            if args.len() < 3 {
                eprintln!("Error: --config requires a file path");
                return Ok(());
            }
            run(&args[2]).await?;
        }
        _ => {
            eprintln!("Unknown option: {}", args[1]);
            print_usage();
        }
    }

    Ok(())
}

fn print_usage() {
    println!(
        r#"hop5-local - client-facing hop of the hop5 proxy

USAGE:
    hop5-local [OPTIONS]

OPTIONS:
    -c, --config <FILE>  Path to configuration file
    -g, --generate       Print a configuration template
    -h, --help           Print help information

The configuration is TOML: a listen address for SOCKS5 clients, the
remote hop's address, and the shared 32-byte secret. Clients point
their SOCKS5 settings at the listen address.

EXAMPLES:
    Generate a configuration:
        hop5-local --generate > local.toml

    Run the hop:
        hop5-local --config local.toml
"#
    );
}

fn generate_config() -> anyhow::Result<()> {
    println!("# hop5 local hop configuration");
    println!("# key must be exactly 32 bytes and match the remote hop");
    println!();
    println!("{}", toml::to_string_pretty(&ConfigFile::local_template())?);
    Ok(())
}

async fn run(config_path: &str) -> anyhow::Result<()> {
    let content = std::fs::read_to_string(config_path)?;
    let file: ConfigFile = toml::from_str(&content)?;
    let config = file.to_local_config()?;

    Server::new(config).run().await?;
    Ok(())
}
