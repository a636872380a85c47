use anyhow::{anyhow, ensure, Context};
use clap::{Args, Parser, Subcommand};
use pingora_core::server::configuration::Opt;
use pingora_core::server::Server;
use std::sync::Arc;
use std::time::Duration;

use signed_image_proxy::config::{EnvConfigProvider, ImageProxyConfig, LogFormat, ServerConfig};
use signed_image_proxy::constants::{
    DEFAULT_ADDRESS, DEFAULT_FETCH_TIMEOUT_SECS, DEFAULT_MAX_SOURCE_BYTES, DEFAULT_PORT,
    DEFAULT_THREADS,
};
use signed_image_proxy::fetch::{FetcherConfig, HttpFetcher};
use signed_image_proxy::image::ImageProcessor;
use signed_image_proxy::pipeline::TransformPipeline;
use signed_image_proxy::proxy::ImageProxy;
use signed_image_proxy::signing::{build_signed_url, build_src_set, SignOptions};

/// Signed Image Proxy - on-demand image resizing and format negotiation built with Cloudflare's Pingora
#[derive(Parser, Debug)]
#[command(name = "signed-image-proxy")]
#[command(version, about, long_about = None)]
#[command(args_conflicts_with_subcommands = true)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    #[command(flatten)]
    serve: ServeArgs,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the proxy server (default)
    Serve(ServeArgs),
    /// Print a signed proxy URL, or a srcset when --widths is given
    Sign(SignArgs),
}

#[derive(Args, Debug)]
struct ServeArgs {
    /// Listen address
    #[arg(long, env = "IMAGE_PROXY_ADDRESS", default_value = DEFAULT_ADDRESS)]
    address: String,

    /// Listen port
    #[arg(long, env = "IMAGE_PROXY_PORT", default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Worker threads
    #[arg(long, env = "IMAGE_PROXY_THREADS", default_value_t = DEFAULT_THREADS)]
    threads: usize,

    /// Upstream fetch timeout in seconds
    #[arg(long, env = "IMAGE_PROXY_FETCH_TIMEOUT_SECS", default_value_t = DEFAULT_FETCH_TIMEOUT_SECS)]
    fetch_timeout_secs: u64,

    /// Largest accepted source image in bytes
    #[arg(long, env = "IMAGE_PROXY_MAX_SOURCE_BYTES", default_value_t = DEFAULT_MAX_SOURCE_BYTES)]
    max_source_bytes: usize,

    /// Share fetch and transform work between concurrent identical requests
    #[arg(long, env = "IMAGE_PROXY_COALESCE")]
    coalesce: bool,

    /// Log output format
    #[arg(long, env = "IMAGE_PROXY_LOG_FORMAT", value_enum, default_value_t = LogFormat::Json)]
    log_format: LogFormat,
}

impl From<ServeArgs> for ServerConfig {
    fn from(args: ServeArgs) -> Self {
        ServerConfig {
            address: args.address,
            port: args.port,
            threads: args.threads.max(1),
            fetch_timeout: Duration::from_secs(args.fetch_timeout_secs.max(1)),
            max_source_bytes: args.max_source_bytes,
            coalesce: args.coalesce,
            log_format: args.log_format,
        }
    }
}

#[derive(Args, Debug)]
struct SignArgs {
    /// Source image URL
    #[arg(long)]
    url: String,

    /// Target width
    #[arg(long)]
    width: Option<u32>,

    /// Output quality (1-100)
    #[arg(long, value_parser = clap::value_parser!(u8).range(1..=100))]
    quality: Option<u8>,

    /// Comma separated widths for a srcset, e.g. 320,640,1024
    #[arg(long, value_delimiter = ',')]
    widths: Vec<u32>,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command.unwrap_or(Command::Serve(cli.serve)) {
        Command::Serve(args) => serve(args.into()),
        Command::Sign(args) => sign(args),
    }
}

fn serve(config: ServerConfig) -> anyhow::Result<()> {
    // Initialize logging subsystem
    signed_image_proxy::logging::init_subscriber(config.log_format)
        .map_err(|e| anyhow!("Failed to initialize logging subsystem: {e}"))?;

    // The handler re-reads the environment per request; this is only an early warning
    match ImageProxyConfig::from_env() {
        Ok(image_config) => {
            tracing::info!(
                max_width = image_config.max_width,
                cache_max_age = image_config.cache_max_age,
                allowed_origins = image_config
                    .allowed_origins
                    .as_ref()
                    .map(|origins| origins.len())
                    .unwrap_or(0),
                "Image proxy configuration loaded"
            );
            for warning in image_config.warnings() {
                tracing::warn!("{}", warning);
            }
        }
        Err(e) => tracing::warn!(
            error = %e,
            "Image proxy configuration is invalid; /proxy will answer 500 until it is fixed"
        ),
    }

    let fetcher = HttpFetcher::new(FetcherConfig {
        timeout: config.fetch_timeout,
        max_bytes: config.max_source_bytes,
    })
    .context("Failed to create source fetcher")?;

    let mut pipeline = TransformPipeline::new(
        Arc::new(EnvConfigProvider),
        Arc::new(fetcher),
        Arc::new(ImageProcessor::default()),
    );
    if config.coalesce {
        pipeline = pipeline.with_coalescing();
    }

    // Create Pingora server
    let mut server = Server::new(Some(Opt::default()))
        .map_err(|e| anyhow!("Failed to create Pingora server: {e}"))?;
    server.bootstrap();

    let mut proxy_service =
        pingora_proxy::http_proxy_service(&server.configuration, ImageProxy::new(pipeline));
    proxy_service.threads = Some(config.threads);

    let listen_addr = config.listen_addr();
    proxy_service.add_tcp(&listen_addr);

    tracing::info!(
        address = %listen_addr,
        threads = config.threads,
        coalesce = config.coalesce,
        fetch_timeout_secs = config.fetch_timeout.as_secs(),
        "Starting Signed Image Proxy"
    );

    server.add_service(proxy_service);

    // Run server forever (blocks until shutdown)
    server.run_forever();
}

fn sign(args: SignArgs) -> anyhow::Result<()> {
    let config = ImageProxyConfig::from_env()?;

    let output = if args.widths.is_empty() {
        if let Some(width) = args.width {
            ensure!(
                (1..=config.max_width).contains(&width),
                "--width must be 1-{}",
                config.max_width
            );
        }
        build_signed_url(
            &config.public_url,
            &args.url,
            SignOptions::new(args.width, args.quality),
            &config,
        )?
    } else {
        ensure!(
            args.widths
                .iter()
                .all(|width| (1..=config.max_width).contains(width)),
            "--widths entries must be 1-{}",
            config.max_width
        );
        build_src_set(&args.url, &args.widths, args.quality, &config)?
    };

    println!("{output}");
    Ok(())
}
