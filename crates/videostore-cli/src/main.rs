//! Videostore CLI — command-line client for a remote videostore resource.
//!
//! Set VIDEOSTORE_RESOURCE and VIDEOSTORE_ADDRESS (see `ClientConfig`).
//! Run with RUST_LOG=debug to see every outgoing request.

use std::path::PathBuf;

use anyhow::Context;
use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use videostore_api_client::{
    ClientConfig, ClientOptions, RequestEvent, SaveOptions, VideostoreClient,
};
use videostore_cli::{init_tracing, resolve_range, stream_output, write_output};

#[derive(Parser)]
#[command(name = "videostore", about = "Videostore CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct RangeArgs {
    /// Start timestamp (YYYY-MM-DD_HH-MM-SS)
    #[arg(long, requires = "to")]
    from: Option<String>,
    /// End timestamp (YYYY-MM-DD_HH-MM-SS)
    #[arg(long, requires = "from")]
    to: Option<String>,
    /// Use the last N seconds instead of --from/--to
    #[arg(long, conflicts_with_all = ["from", "to"])]
    last: Option<u64>,
    /// Output container format
    #[arg(long, default_value = "mp4")]
    container: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch a range as a single clip and write it to a file
    Fetch {
        #[command(flatten)]
        range: RangeArgs,
        /// Path to write the clip to
        #[arg(long)]
        output: PathBuf,
    },
    /// Save a range on the server and print the resulting filename
    Save {
        #[command(flatten)]
        range: RangeArgs,
        /// Metadata tag stored with the file
        #[arg(long, default_value = "")]
        metadata: String,
        /// Return before the file is written
        #[arg(long)]
        r#async: bool,
    },
    /// Stream a range chunk by chunk into a file
    Stream {
        #[command(flatten)]
        range: RangeArgs,
        /// Path to write the stream to
        #[arg(long)]
        output: PathBuf,
    },
}

#[derive(Serialize)]
struct FetchOutput {
    output: String,
    bytes: usize,
}

#[derive(Serialize)]
struct SaveOutput {
    filename: String,
}

#[derive(Serialize)]
struct StreamOutput {
    output: String,
    bytes: u64,
    chunks: usize,
}

fn print_json(value: &impl Serialize) -> anyhow::Result<()> {
    let out = serde_json::to_string_pretty(value).context("Serialize response")?;
    println!("{}", out);
    Ok(())
}

fn request_logger(event: RequestEvent<'_>) {
    match event {
        RequestEvent::Fetch(req) => tracing::debug!(?req, "fetch request"),
        RequestEvent::Save(req) => tracing::debug!(?req, "save request"),
        RequestEvent::FetchStream(req) => tracing::debug!(?req, "fetchStream request"),
        RequestEvent::StreamError(status) => tracing::error!(%status, "fetchStream failed"),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let cli = Cli::parse();

    let config = ClientConfig::from_env().context(
        "Failed to load client config. Set VIDEOSTORE_RESOURCE and VIDEOSTORE_ADDRESS",
    )?;
    let options = ClientOptions::default().with_request_logger(request_logger);
    let client = VideostoreClient::connect(&config, options)
        .await
        .with_context(|| format!("Failed to connect to {}", config.address))?;

    match cli.command {
        Commands::Fetch { range, output } => {
            let (from, to) = resolve_range(range.from, range.to, range.last, Utc::now())?;
            let video = client.fetch(&from, &to, &range.container).await?;
            write_output(&output, &video).await?;
            print_json(&FetchOutput {
                output: output.display().to_string(),
                bytes: video.len(),
            })?;
        }
        Commands::Save {
            range,
            metadata,
            r#async,
        } => {
            let (from, to) = resolve_range(range.from, range.to, range.last, Utc::now())?;
            let options = SaveOptions::default()
                .with_metadata(metadata)
                .asynchronous(r#async);
            let filename = client
                .save_with(&from, &to, &range.container, options)
                .await?;
            print_json(&SaveOutput { filename })?;
        }
        Commands::Stream { range, output } => {
            let (from, to) = resolve_range(range.from, range.to, range.last, Utc::now())?;
            let client = &client;
            let summary = stream_output(&output, |mut file| async move {
                client
                    .fetch_stream_to_writer(&from, &to, &range.container, &mut file)
                    .await
            })
            .await?;
            print_json(&StreamOutput {
                output: output.display().to_string(),
                bytes: summary.bytes,
                chunks: summary.chunks,
            })?;
        }
    }

    Ok(())
}
