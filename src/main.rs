use std::{
    net::SocketAddr,
    path::{Path, PathBuf},
    sync::Arc,
};

use clap::Parser;
use color_eyre::{
    Result,
    eyre::{Context, eyre},
};
use protobridge::{
    adapters::{HttpClientAdapter, ProtoRegistry, ProtobufJsonCodec, ProxyHandler, ProxyServer},
    config::{
        ProxyConfig, ProxyConfigValidator,
        loader::{load_config, load_from_env},
    },
    core::TranscodePipeline,
    metrics,
    ports::{http_client::HttpClient, http_server::HttpServer, schema_registry::SchemaRegistry},
    tracing_setup,
    utils::GracefulShutdown,
};

#[derive(Parser, Debug)]
#[clap(author, version, about)]
struct Args {
    #[clap(subcommand)]
    command: Option<Commands>,

    #[clap(flatten)]
    serve: ServeArgs,
}

/// Flags shared by `serve` and `validate`; each one overrides the config file
#[derive(clap::Args, Debug, Clone)]
struct ServeArgs {
    /// Configuration file (TOML, YAML or JSON). Optional when flags cover everything
    #[clap(short, long, default_value = "protobridge.toml")]
    config: String,

    /// Proto file to load; repeat to load several, earlier files win on name clashes
    #[clap(short = 'p', long = "proto")]
    proto: Vec<PathBuf>,

    /// Directory searched for proto imports; repeatable
    #[clap(short = 'I', long = "import-paths")]
    import_paths: Vec<PathBuf>,

    /// Port to listen on
    #[clap(long)]
    port: Option<u16>,

    /// Base URL of the upstream service
    #[clap(short, long)]
    upstream: Option<String>,
}

#[derive(Parser, Debug)]
enum Commands {
    /// Start the proxy (default)
    Serve(ServeArgs),
    /// Validate configuration and compile the proto files without serving
    Validate(ServeArgs),
    /// Initialize a new configuration file
    Init {
        /// Output path for the new config file
        #[clap(short, long, default_value = "protobridge.toml")]
        config: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let args = Args::parse();

    match args.command {
        Some(Commands::Init { config }) => init_config_command(&config).await,
        Some(Commands::Validate(serve)) => validate_config_command(&serve).await,
        Some(Commands::Serve(serve)) => serve_command(&serve).await,
        None => serve_command(&args.serve).await,
    }
}

/// Load the config file when present, otherwise start from defaults plus environment,
/// then apply command line overrides
async fn resolve_config(args: &ServeArgs) -> Result<ProxyConfig> {
    let mut config = if Path::new(&args.config).exists() {
        load_config(&args.config)
            .await
            .with_context(|| format!("Failed to load config from {}", args.config))?
    } else {
        load_from_env().context("Failed to load config from environment")?
    };

    if !args.proto.is_empty() {
        config.proto_files = args.proto.clone();
    }
    if !args.import_paths.is_empty() {
        config.import_paths = args.import_paths.clone();
    }
    if let Some(port) = args.port {
        config.set_port(port);
    }
    if let Some(upstream) = &args.upstream {
        config.upstream = upstream.clone();
    }

    Ok(config)
}

async fn serve_command(args: &ServeArgs) -> Result<()> {
    let config = resolve_config(args).await?;
    ProxyConfigValidator::validate(&config).map_err(|e| eyre!("Invalid configuration: {e}"))?;

    tracing_setup::init_tracing(&config.logging)
        .map_err(|e| eyre!("Failed to initialize tracing: {}", e))?;
    metrics::init_metrics().map_err(|e| eyre!("Failed to initialize metrics: {}", e))?;

    let registry = ProtoRegistry::load(&config.proto_files, &config.import_paths)
        .context("Failed to load proto files")?;
    tracing::info!(
        files = registry.file_count(),
        message_types = registry.message_type_names().len(),
        "Schema registry ready"
    );

    let pipeline = Arc::new(TranscodePipeline::new(
        Arc::new(registry),
        Arc::new(ProtobufJsonCodec::new()),
        config.empty_directive,
    ));

    let http_client: Arc<dyn HttpClient> = Arc::new(
        HttpClientAdapter::new(config.upstream_timeout()?)
            .context("Failed to create HTTP client adapter")?,
    );

    let handler = Arc::new(
        ProxyHandler::new(
            pipeline,
            http_client,
            &config.upstream,
            config.max_body_bytes,
        )
        .context("Failed to create proxy handler")?,
    );

    let graceful_shutdown = Arc::new(GracefulShutdown::new());
    let signal_handler_shutdown = graceful_shutdown.clone();
    tokio::spawn(async move {
        if let Err(e) = signal_handler_shutdown.run_signal_handler().await {
            tracing::error!("Signal handler error: {}", e);
        }
    });

    let listen_addr: SocketAddr = config
        .listen_addr
        .parse()
        .with_context(|| format!("Invalid listen address {}", config.listen_addr))?;

    tracing::info!(upstream = %config.upstream, "Starting protobridge");
    let server = ProxyServer::new(listen_addr, handler, graceful_shutdown);
    server.run().await?;

    tracing::info!("protobridge stopped");
    Ok(())
}

/// Validate configuration and make sure every proto file compiles
async fn validate_config_command(args: &ServeArgs) -> Result<()> {
    println!("🔍 Validating configuration: {}", args.config);

    let config = match resolve_config(args).await {
        Ok(config) => {
            println!("✅ Configuration parsing: OK");
            config
        }
        Err(e) => {
            eprintln!("❌ Configuration parsing failed:");
            eprintln!("   {e:#}");
            std::process::exit(1);
        }
    };

    if let Err(e) = ProxyConfigValidator::validate(&config) {
        eprintln!("❌ Configuration validation failed:");
        eprintln!("{e}");
        println!();
        println!("💡 Common fixes:");
        println!("   • Ensure the upstream URL starts with http:// or https://");
        println!("   • Name at least one proto file (config `proto_files` or --proto)");
        println!("   • Verify listen address format (e.g., '127.0.0.1:7777')");
        println!("   • Use humantime durations for upstream_timeout (e.g., '30s')");
        std::process::exit(1);
    }
    println!("✅ Configuration validation: OK");

    let registry = match ProtoRegistry::load(&config.proto_files, &config.import_paths) {
        Ok(registry) => registry,
        Err(e) => {
            eprintln!("❌ Proto compilation failed:");
            eprintln!("   {e:#}");
            std::process::exit(1);
        }
    };
    println!("✅ Proto compilation: OK");

    println!();
    println!("📋 Configuration Summary:");
    println!("   • Listen Address: {}", config.listen_addr);
    println!("   • Upstream: {}", config.upstream);
    println!("   • Proto Files: {}", registry.file_count());
    println!("   • Message Types: {}", registry.message_type_names().len());
    println!("   • Max Body Bytes: {}", config.max_body_bytes);
    println!("   • Upstream Timeout: {}", config.upstream_timeout);
    println!();
    println!("🎉 Configuration is valid and ready to use!");
    Ok(())
}

/// Initialize a new configuration file
async fn init_config_command(config_path: &str) -> Result<()> {
    let path = Path::new(config_path);
    if path.exists() {
        eprintln!("❌ Error: Configuration file '{config_path}' already exists");
        std::process::exit(1);
    }

    let default_config = r#"# protobridge configuration

# The address to listen on
listen_addr = "0.0.0.0:7777"

# Every request is forwarded to this base URL, path and query preserved
upstream = "http://localhost:8080"

# Proto files in lookup order: when two files define the same message name,
# the earlier file wins
proto_files = ["protos/api.proto"]

# Directories searched for imports
import_paths = ["protos"]

# Limit for buffered request / response bodies
max_body_bytes = 4194304

# Upstream exchange timeout
upstream_timeout = "30s"

# Requests whose Content-Type names no message types: "reject" or "pass_through"
empty_directive = "reject"

[logging]
level = "info"
json = true
"#;

    tokio::fs::write(path, default_config)
        .await
        .context("Failed to write config file")?;
    println!("✅ Created default configuration at: {config_path}");
    println!("   Run 'protobridge serve --config {config_path}' to start the proxy");
    Ok(())
}
