use anyhow::Context;
use clap::Parser;
use rafka_producer::{Producer, ProducerOptions, DEFAULT_FLUSH_TIMEOUT_MS};
use std::io::BufRead;
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

#[derive(Parser, Debug)]
#[command(name = "rafka-produce")]
#[command(about = "Produce messages to a Redis-protocol message broker", long_about = None)]
struct Args {
    #[arg(short, long, value_name = "FILE", help = "Options file (TOML, YAML or JSON)")]
    config: Option<PathBuf>,

    #[arg(long, help = "Broker host, overrides the options file")]
    host: Option<String>,

    #[arg(short, long, help = "Broker port, overrides the options file")]
    port: Option<u16>,

    #[arg(short, long, help = "Topic to produce to")]
    topic: String,

    #[arg(long, default_value_t = DEFAULT_FLUSH_TIMEOUT_MS, help = "Flush timeout in milliseconds")]
    flush_timeout_ms: u64,

    #[arg(short, long, help = "Enable JSON output for logs")]
    json_logs: bool,

    #[arg(short, long, help = "Verbose logging")]
    verbose: bool,

    #[arg(help = "Messages to produce; read from stdin, one per line, if none are given")]
    messages: Vec<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    init_logging(args.json_logs, args.verbose);

    let options = load_options(&args)?;
    let config = options.resolve();

    info!(
        broker = %config.address(),
        db = config.db,
        topic = %args.topic,
        "Configuration summary"
    );

    let messages = if args.messages.is_empty() {
        read_stdin()?
    } else {
        args.messages.clone()
    };

    let mut producer = Producer::connect_with(config)
        .await
        .context("failed to connect to broker")?;

    let result = run(&mut producer, &args.topic, &messages, args.flush_timeout_ms).await;
    producer.close();

    match result {
        Ok(unflushed) => {
            println!(
                "produced {} message(s), {} unflushed",
                messages.len(),
                unflushed
            );
            Ok(())
        }
        Err(e) => {
            error!("Produce failed: {}", e);
            Err(e.into())
        }
    }
}

async fn run(
    producer: &mut Producer,
    topic: &str,
    messages: &[String],
    flush_timeout_ms: u64,
) -> rafka_producer::Result<u64> {
    for message in messages {
        producer.produce(topic, message).await?;
    }
    producer.flush(flush_timeout_ms).await
}

fn load_options(args: &Args) -> anyhow::Result<ProducerOptions> {
    let mut options = match &args.config {
        Some(path) => {
            info!("Loading options from {:?}", path);
            ProducerOptions::from_file(path)
                .with_context(|| format!("failed to load options from {:?}", path))?
        }
        None => ProducerOptions::from_env().context("failed to load options from environment")?,
    };

    if let Some(host) = &args.host {
        options.host = Some(host.clone());
    }
    if let Some(port) = args.port {
        options.port = Some(port);
    }

    Ok(options)
}

fn read_stdin() -> rafka_producer::Result<Vec<String>> {
    let stdin = std::io::stdin();
    let mut messages = Vec::new();
    for line in stdin.lock().lines() {
        let line = line?;
        if !line.is_empty() {
            messages.push(line);
        }
    }
    Ok(messages)
}

fn init_logging(json: bool, verbose: bool) {
    let env_filter = if verbose {
        EnvFilter::new("rafka_producer=debug,rafka_produce=debug,info")
    } else {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("rafka_producer=info,warn"))
    };

    let fmt_layer = if json {
        tracing_subscriber::fmt::layer()
            .json()
            .flatten_event(true)
            .with_current_span(false)
            .with_span_list(false)
            .with_writer(std::io::stderr)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_target(false)
            .with_thread_ids(false)
            .with_thread_names(false)
            .with_writer(std::io::stderr)
            .boxed()
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();
}
