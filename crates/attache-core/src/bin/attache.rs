//! attache: inspect an attachment from the command line.
//!
//! Prints the derived identifier, MIME type, or base64 content of a file,
//! URL, or inline text. Logs go to stderr so stdout stays pipeable.

use std::path::PathBuf;
use std::process::ExitCode;

use attache_core::{Attachment, HttpFetcher};
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "attache")]
#[command(author, version, about = "Resolve attachment identifiers, types and content")]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
#[group(required = true, multiple = false)]
struct SourceArgs {
    /// Local file backing the attachment
    #[arg(short, long)]
    path: Option<PathBuf>,

    /// Remote URL backing the attachment
    #[arg(short, long)]
    url: Option<String>,

    /// Inline content (UTF-8 text)
    #[arg(short, long)]
    text: Option<String>,
}

#[derive(Args)]
struct Target {
    #[command(flatten)]
    source: SourceArgs,

    /// Explicit MIME type, skips detection
    #[arg(short, long)]
    mime: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the content identifier
    Id(Target),

    /// Print the resolved MIME type
    Type(Target),

    /// Print the content as standard base64
    Base64(Target),

    /// Print the attachment as JSON with id and type resolved
    Show(Target),
}

impl Target {
    fn into_attachment(self) -> Attachment {
        let SourceArgs { path, url, text } = self.source;
        let attachment = Attachment::from_parts(
            None,
            text.map(String::into_bytes),
            path,
            url,
            None,
        );
        match self.mime {
            Some(mime) => attachment.with_type(mime),
            None => attachment,
        }
    }
}

fn init_tracing() {
    let log_format = std::env::var("ATTACHE_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "attache=info,attache_core=info".into());

    let registry = tracing_subscriber::registry().with(env_filter);

    if log_format == "json" {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let fetcher = HttpFetcher::from_env()?;

    match cli.command {
        Commands::Id(target) => {
            let attachment = target.into_attachment();
            println!("{}", attachment.id().await?);
        }
        Commands::Type(target) => {
            let attachment = target.into_attachment();
            println!("{}", attachment.resolve_type_with(&fetcher).await?);
        }
        Commands::Base64(target) => {
            let attachment = target.into_attachment();
            println!("{}", attachment.base64_content_with(&fetcher).await?);
        }
        Commands::Show(target) => {
            let attachment = target.into_attachment();
            let mime = attachment.resolve_type_with(&fetcher).await?;
            attachment.id().await?;

            let mut output = serde_json::to_value(&attachment)?;
            output["resolved_type"] = serde_json::Value::String(mime);
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    Ok(())
}
