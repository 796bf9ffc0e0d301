//! tcpwire Server Binary
//!
//! Serves a small demo router over the separator-based protocol.

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tcpwire::handler::{apply_request_middlewares, request_logging_middleware, RequestHandler};
use tcpwire::protocol::separator::SeparationParams;
use tcpwire::{
    Config, Context, DefaultConnectionHandler, Error, Reply, Request, RequestRouter, Response,
    Result, Server, ServerOptions,
};
use tracing_subscriber::{fmt, EnvFilter};

/// tcpwire Server
#[derive(Parser, Debug)]
#[command(name = "tcpwire-server")]
#[command(about = "Request/response server over a separator-based TCP protocol")]
#[command(version)]
struct Args {
    /// Listen address (host:port)
    #[arg(short, long, default_value = "127.0.0.1:7878")]
    listen: String,

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

    /// Read timeout in milliseconds (0 = none)
    #[arg(long, default_value = "0")]
    read_timeout_ms: u64,

    /// Write timeout in milliseconds (0 = none)
    #[arg(long, default_value = "0")]
    write_timeout_ms: u64,

    /// Request handling timeout in milliseconds (0 = none)
    #[arg(long, default_value = "0")]
    handling_timeout_ms: u64,

    /// Maximum message size in KB
    #[arg(short = 'm', long, default_value = "64")]
    max_token_kb: usize,
}

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tcpwire=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .init();

    let args = Args::parse();

    tracing::info!("tcpwire Server v{}", tcpwire::VERSION);
    tracing::info!("Listen address: {}", args.listen);

    let config = build_config(&args);
    if let Err(e) = serve(config) {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }

    tracing::info!("Server stopped");
}

/// Build config from args
fn build_config(args: &Args) -> Config {
    let mut builder = Config::builder(SeparationParams::new(
        args.message_separator.as_str(),
        args.part_separator.as_str(),
        args.header_separator.as_str(),
        args.key_value_separator.as_str(),
    ))
    .listen_addr(&args.listen)
    .max_token_size(args.max_token_kb * 1024);

    if args.read_timeout_ms > 0 {
        builder = builder.read_timeout(Duration::from_millis(args.read_timeout_ms));
    }
    if args.write_timeout_ms > 0 {
        builder = builder.write_timeout(Duration::from_millis(args.write_timeout_ms));
    }
    if args.handling_timeout_ms > 0 {
        builder = builder.handling_timeout(Duration::from_millis(args.handling_timeout_ms));
    }

    let mut config = builder.build();
    config.initial_buffer_size = config.initial_buffer_size.min(config.max_token_size);
    config
}

fn serve(config: Config) -> Result<()> {
    let protocol = Arc::new(config.protocol()?);

    let request_handler = apply_request_middlewares(
        Arc::new(demo_router()?) as Arc<dyn RequestHandler<Request, Response>>,
        &[request_logging_middleware()],
    );
    let connection_handler =
        DefaultConnectionHandler::new(config.connection_options(), protocol, request_handler);

    let server = Server::bind(ServerOptions {
        address: config.listen_addr.clone(),
        connection_handler: Arc::new(connection_handler),
        error_handler: Arc::new(|e: Error| {
            if e.is_listener_closed() {
                tracing::debug!("{}", e);
            } else {
                tracing::warn!("{}", e);
            }
        }),
    })?;

    tracing::info!("Server ready on {}", server.local_addr());
    server.run(&Context::background())
}

/// Routes: `ping`, `echo`, `quit`, anything else is `not_found`
fn demo_router() -> Result<RequestRouter<Request, Response>> {
    let mut router = RequestRouter::by_action();

    router
        .set_route_handler(
            "ping",
            Arc::new(|_ctx: &Context, _request: Request| -> Result<Reply<Response>> {
                Ok(Reply::Continue(Response::new("pong")?))
            }),
        )
        .set_route_handler(
            "echo",
            Arc::new(|_ctx: &Context, request: Request| -> Result<Reply<Response>> {
                let mut response = Response::builder().status("ok");
                if let Some(headers) = request.headers() {
                    response = response.headers(headers.clone());
                }
                if let Some(body) = request.body() {
                    response = response.body(body.clone());
                }
                Ok(Reply::Continue(response.build()?))
            }),
        )
        .set_route_handler(
            "quit",
            Arc::new(|_ctx: &Context, _request: Request| -> Result<Reply<Response>> {
                Ok(Reply::Stop(Response::new("bye")?))
            }),
        )
        .set_not_found_handler(Arc::new(
            |_ctx: &Context, request: Request| -> Result<Reply<Response>> {
                let response = Response::builder()
                    .status("not_found")
                    .body(request.action().clone())
                    .build()?;
                Ok(Reply::Continue(response))
            },
        ));

    Ok(router)
}
