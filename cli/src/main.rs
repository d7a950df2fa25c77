//! regfault CLI — inspect error codes and try registrations from the terminal.
//!
//! Usage:
//! ```bash
//! # List every classification code
//! regfault codes
//!
//! # Register a publication against the in-process driver
//! regfault register --channel aeron:udp?endpoint=localhost:40123 --stream 10
//!
//! # Release a registration id (always unknown to a fresh driver)
//! regfault release --id 42
//! ```

use std::env;
use std::process;
use std::sync::Arc;

use anyhow::{anyhow, Context};

use regfault_client::{init_tracing, ClientConfig, MemoryDriver, RegistrationClient};
use regfault_core::{ErrorCode, RegistrationFault};

/// Exit status used when a registration fault reaches the top level.
const EXIT_FAULT: i32 = 2;

#[tokio::main]
async fn main() {
    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        print_usage();
        process::exit(1);
    }

    let result = match args[1].as_str() {
        "codes" => {
            cmd_codes(&args[2..]);
            Ok(())
        }
        "register" => cmd_register(&args[2..]).await,
        "release" => cmd_release(&args[2..]).await,
        "version" | "--version" | "-V" => {
            println!("regfault {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        "help" | "--help" | "-h" => {
            print_usage();
            Ok(())
        }
        other => {
            eprintln!("Unknown command: {other}");
            print_usage();
            process::exit(1);
        }
    };

    if let Err(e) = result {
        if let Some(fault) = e.downcast_ref::<RegistrationFault>() {
            eprintln!("Registration failed [{}]: {}", fault.code(), fault.message());
            process::exit(EXIT_FAULT);
        }
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

fn print_usage() {
    println!("regfault {}", env!("CARGO_PKG_VERSION"));
    println!("Inspect registration error codes and exercise a registration client\n");
    println!("USAGE:");
    println!("    regfault <COMMAND>\n");
    println!("COMMANDS:");
    println!("    codes      List classification codes (--json for JSON)");
    println!("    register   Add a publication or subscription");
    println!("    release    Release a registration id");
    println!("    version    Print version");
    println!("    help       Print this help\n");
    println!("REGISTER FLAGS:");
    println!("    --channel <URI>     Channel URI  [required]");
    println!("    --stream <ID>       Stream id    [default: 1]");
    println!("    --kind <pub|sub>    Endpoint kind [default: pub]");
    println!("    --config <FILE>     JSON client config");
    println!("\nRELEASE FLAGS:");
    println!("    --id <ID>           Registration id  [required]");
    println!("    --kind <pub|sub>    Endpoint kind [default: pub]");
    println!("\nExit status is {EXIT_FAULT} when a registration fault is reported.");
}

fn cmd_codes(args: &[String]) {
    if args.iter().any(|a| a == "--json") {
        let rows: Vec<_> = ErrorCode::ALL
            .iter()
            .map(|c| serde_json::json!({ "name": c.name(), "value": c.value() }))
            .collect();
        println!("{}", serde_json::to_string_pretty(&rows).unwrap_or_default());
        return;
    }
    println!("Registration error codes:\n");
    for code in ErrorCode::ALL {
        println!("  {:>3}  {code}", code.value());
    }
}

async fn cmd_register(args: &[String]) -> anyhow::Result<()> {
    let channel = parse_flag(args, "--channel").ok_or_else(|| anyhow!("--channel is required"))?;
    let stream_id: i32 = match parse_flag(args, "--stream") {
        Some(s) => s.parse().with_context(|| format!("invalid --stream '{s}'"))?,
        None => 1,
    };
    let client = start_client(args)?;

    match kind(args)? {
        Kind::Publication => {
            let publication = client.add_publication(&channel, stream_id).await?;
            println!("Publication registered");
            println!("  Registration id: {}", publication.registration_id);
            println!("  Channel:         {}", publication.channel);
            println!("  Stream id:       {}", publication.stream_id);
            println!("  Session id:      {}", publication.session_id);
            println!("  Log file:        {}", publication.log_file);
        }
        Kind::Subscription => {
            let subscription = client.add_subscription(&channel, stream_id).await?;
            println!("Subscription registered");
            println!("  Registration id: {}", subscription.registration_id);
            println!("  Channel:         {}", subscription.channel);
            println!("  Stream id:       {}", subscription.stream_id);
        }
    }
    client.close().await;
    Ok(())
}

async fn cmd_release(args: &[String]) -> anyhow::Result<()> {
    let id = parse_flag(args, "--id").ok_or_else(|| anyhow!("--id is required"))?;
    let id: i64 = id.parse().with_context(|| format!("invalid --id '{id}'"))?;
    let client = start_client(args)?;

    match kind(args)? {
        Kind::Publication => client.release_publication(id).await?,
        Kind::Subscription => client.release_subscription(id).await?,
    }
    println!("Released registration {id}");
    client.close().await;
    Ok(())
}

enum Kind {
    Publication,
    Subscription,
}

fn kind(args: &[String]) -> anyhow::Result<Kind> {
    match parse_flag(args, "--kind").as_deref() {
        None | Some("pub") | Some("publication") => Ok(Kind::Publication),
        Some("sub") | Some("subscription") => Ok(Kind::Subscription),
        Some(other) => Err(anyhow!("unknown --kind '{other}' (expected pub or sub)")),
    }
}

fn start_client(args: &[String]) -> anyhow::Result<RegistrationClient> {
    let config = match parse_flag(args, "--config") {
        Some(path) => ClientConfig::from_file(&path)?,
        None => ClientConfig::default(),
    };
    // a subscriber may already be installed; logging is best effort here
    let _ = init_tracing(&config.log);
    tracing::debug!(?config, "client configuration loaded");

    let (driver, responses) = MemoryDriver::new("regfault-cli");
    Ok(RegistrationClient::start(Arc::new(driver), responses, config))
}

fn parse_flag(args: &[String], flag: &str) -> Option<String> {
    args.windows(2)
        .find(|w| w[0] == flag)
        .map(|w| w[1].clone())
}
