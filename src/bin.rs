//! `task-bot` executable: parses flags, installs the log and OTLP layers,
//! then runs the Lark event listener until Ctrl-C.

use clap::Parser;
use opentelemetry::trace::TracerProvider;
use opentelemetry_otlp::{Protocol, WithExportConfig};
use task_bot::base::{config::Config, types::Void};
use tracing_subscriber::{fmt::format::FmtSpan, layer::SubscriberExt, util::SubscriberInitExt};

/// Creates Lark tasks from `创建任务:` / `create task:` chat messages.
///
/// Credentials and listener settings come from the environment (`APP_ID`,
/// `APP_SECRET`, `LISTEN_ADDRESS`, ...) and an optional TOML file.
#[derive(Parser, Debug)]
#[command(version, author, about, long_about = None)]
struct Args {
    /// TOML config file; `.hidden/config.toml` is used when present and this is omitted.
    #[arg(short, long)]
    config: Option<std::path::PathBuf>,
    /// Log verbosity: INFO by default, `-v` for DEBUG, `-vv` for TRACE.
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[tokio::main]
async fn main() -> Void {
    let args = Args::parse();

    // Level.

    let level = match args.verbose {
        0 => tracing::Level::INFO,
        1 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };

    let level_filter = tracing_subscriber::filter::LevelFilter::from_level(level);

    // Stdout layer; span close events carry handling time per message.

    let stdout = tracing_subscriber::fmt::layer()
        .without_time()
        .with_ansi(true)
        .with_level(true)
        .with_file(false)
        .with_target(false)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_span_events(FmtSpan::CLOSE);

    // Spans also go to an OTLP collector, if one listens.

    let exporter = opentelemetry_otlp::SpanExporter::builder().with_http().with_protocol(Protocol::HttpBinary).build()?;
    let tracer = opentelemetry_sdk::trace::SdkTracerProvider::builder().with_simple_exporter(exporter).build().tracer("task-bot");
    let otel = tracing_opentelemetry::layer().with_tracer(tracer);

    tracing_subscriber::registry().with(otel).with(level_filter).with(stdout).init();

    let config = Config::load(args.config.as_deref())?;

    task_bot::start(config).await
}
