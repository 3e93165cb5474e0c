use std::sync::Arc;
use std::time::Duration;

use async_std::channel::{self, Receiver};
use async_std::io::{prelude::BufReadExt, BufReader};
use async_std::task;
use futures_lite::stream::StreamExt;
use structopt::StructOpt;
use tracing::{error, info, warn};
use url::Url;

pub mod api;
pub mod browser;
pub mod debounce;
pub mod query;
pub mod render;
pub mod selection;
pub mod telemetry;

use api::UnsplashClient;
use render::{RenderError, Renderer};

#[derive(Debug)]
pub enum Error {
    TemplateParseError(tera::Error),
    TelemetryInitError(anyhow::Error),
    RenderError(RenderError),
    IoError(std::io::Error),
}

impl From<Error> for u8 {
    fn from(error: Error) -> u8 {
        match error {
            Error::TemplateParseError(_) => 3,
            Error::TelemetryInitError(_) => 4,
            Error::RenderError(_) => 5,
            Error::IoError(_) => 6,
        }
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::TemplateParseError(err) => {
                write!(f, "Template parsing error: {}", err)
            },
            Error::TelemetryInitError(err) => {
                write!(f, "Failed to init telemetry: {}", err)
            },
            Error::RenderError(err) => match err {
                RenderError::Tera(source) => write!(f, "Failed to render view: {}", source),
            },
            Error::IoError(err) => {
                write!(f, "Failed to write output: {}", err)
            },
        }
    }
}

impl From<RenderError> for Error {
    fn from(error: RenderError) -> Self {
        Error::RenderError(error)
    }
}

impl From<std::io::Error> for Error {
    fn from(error: std::io::Error) -> Self {
        Error::IoError(error)
    }
}

#[derive(Debug, StructOpt)]
#[structopt(about = "Browse and search Unsplash photos from the terminal.")]
pub struct Args {
    /// Unsplash access key, sent as a `Client-ID` authorization header.
    #[structopt(long, env = "UNSPLASH_ACCESS_KEY", hide_env_values = true)]
    access_key: Option<String>,

    /// Unsplash API base URL.
    #[structopt(
        long,
        default_value = "https://api.unsplash.com",
        env = "UNSPLASH_API_BASE_URL"
    )]
    api_base_url: Url,

    /// Number of photos per page
    #[structopt(long, default_value = "20", env = "UNSPLASH_GALLERY_PER_PAGE")]
    per_page: u8,

    /// Milliseconds search input has to stay unchanged before it is searched for.
    #[structopt(long, default_value = "400", env = "UNSPLASH_GALLERY_DEBOUNCE_MS")]
    debounce_ms: u64,

    /// Seconds to wait for an API response.
    #[structopt(
        long,
        default_value = "30",
        env = "UNSPLASH_GALLERY_REQUEST_TIMEOUT_SECS"
    )]
    request_timeout_secs: u64,

    /// Directory of Tera `*.txt` templates overriding the built-in ones
    #[structopt(long, parse(from_os_str), env = "UNSPLASH_GALLERY_TEMPLATE_PATH")]
    template_path: Option<std::path::PathBuf>,
}

/// Stdin, line by line. The channel closes at end of input.
fn stdin_lines() -> Receiver<String> {
    let (tx, rx) = channel::unbounded();

    task::spawn(async move {
        let mut lines = BufReader::new(async_std::io::stdin()).lines();
        while let Some(line) = lines.next().await {
            match line {
                Ok(line) => {
                    if tx.send(line).await.is_err() {
                        break;
                    }
                },
                Err(err) => {
                    error!("Failed to read input: {}", err);
                    break;
                },
            }
        }
    });

    rx
}

pub async fn main() -> Result<(), Error> {
    dotenv::dotenv().ok();
    let args = Args::from_args();

    telemetry::init().map_err(Error::TelemetryInitError)?;

    if args.access_key.is_none() {
        warn!("No Unsplash access key configured, requests will not be authorized");
    }
    let client = UnsplashClient::new(
        args.api_base_url.clone(),
        args.access_key.clone(),
        args.per_page,
        Duration::from_secs(args.request_timeout_secs),
    );

    let template_path = args.template_path.as_deref();
    let renderer = Renderer::new(template_path).map_err(Error::TemplateParseError)?;

    info!(base_url = %args.api_base_url, per_page = args.per_page, "Starting gallery");
    let mut stdout = std::io::stdout();
    browser::run(
        Arc::new(client),
        &renderer,
        stdin_lines(),
        &mut stdout,
        args.per_page,
        Duration::from_millis(args.debounce_ms),
    )
    .await
}
