//! tcpwire CLI Client
//!
//! Sends one request to a tcpwire server and prints the response.

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tcpwire::protocol::separator::{SeparationParams, SeparatorProtocol};
use tcpwire::{Client, ClientOptions, Request, Result};

/// tcpwire CLI
#[derive(Parser, Debug)]
#[command(name = "tcpwire-cli")]
#[command(about = "CLI for tcpwire servers")]
struct Args {
    /// Server address
    #[arg(short, long, default_value = "127.0.0.1:7878")]
    server: String,

    /// Separator between messages
    #[arg(long, default_value = "\n")]
    message_separator: String,

    /// Separator between message parts
    #[arg(long, default_value = "|")]
    part_separator: String,

    /// Separator between headers
    #[arg(long, default_value = "&")]
    header_separator: String,

    /// Separator between a header key and value
    #[arg(long, default_value = "=")]
    key_value_separator: String,

    /// Read/write timeout in milliseconds (0 = none)
    #[arg(short, long, default_value = "5000")]
    timeout_ms: u64,

    /// Header as key=value (repeatable)
    #[arg(short = 'H', long = "header", value_parser = parse_header)]
    headers: Vec<(String, String)>,

    /// Request body
    #[arg(short, long)]
    body: Option<String>,

    /// Request action
    action: String,
}

fn parse_header(raw: &str) -> std::result::Result<(String, String), String> {
    raw.split_once('=')
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .ok_or_else(|| format!("expected key=value, got {:?}", raw))
}

fn main() {
    let args = Args::parse();

    match run(&args) {
        Ok(()) => {}
        Err(e) => {
            eprintln!("error: {}", e);
            std::process::exit(1);
        }
    }
}

fn run(args: &Args) -> Result<()> {
    let protocol = Arc::new(SeparatorProtocol::new(SeparationParams::new(
        args.message_separator.as_str(),
        args.part_separator.as_str(),
        args.header_separator.as_str(),
        args.key_value_separator.as_str(),
    ))?);

    let timeout = (args.timeout_ms > 0).then(|| Duration::from_millis(args.timeout_ms));
    let options = ClientOptions {
        read_timeout: timeout,
        write_timeout: timeout,
        connect_timeout: timeout,
    };

    let mut request = Request::builder().action(args.action.clone());
    for (key, value) in &args.headers {
        request = request.header(key.clone(), value.clone())?;
    }
    if let Some(body) = &args.body {
        request = request.body(body.clone());
    }
    let request = request.build()?;

    let mut client = Client::connect(&args.server, protocol, options)?;
    let response = client.send_request(&request)?;
    client.close()?;

    println!("{}", String::from_utf8_lossy(response.status()));
    if let Some(headers) = response.headers() {
        let mut lines: Vec<String> = headers
            .iter()
            .map(|(key, value)| {
                format!(
                    "{}: {}",
                    String::from_utf8_lossy(key.as_bytes()),
                    String::from_utf8_lossy(value.as_bytes())
                )
            })
            .collect();
        lines.sort();
        for line in lines {
            println!("{}", line);
        }
    }
    if let Some(body) = response.body() {
        println!();
        println!("{}", String::from_utf8_lossy(body));
    }

    Ok(())
}
