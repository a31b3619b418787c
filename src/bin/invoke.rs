use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::http::header::CONTENT_TYPE;
use clap::Parser;
use clap::Subcommand;
use serde::Serialize;
use serde_json::{json, Value};

use crate::error::{HandlerError, HandlerResult};
use crate::headers::CORS_HEADERS;
use crate::inference::{InferenceRequest, InferenceResponse, InferenceService, TractRuntime};
use crate::store::FsBlobStore;

#[allow(dead_code)]
#[path = "../error.rs"]
mod error;
#[allow(dead_code)]
#[path = "../headers.rs"]
mod headers;
#[allow(dead_code)]
#[path = "../inference/mod.rs"]
mod inference;
#[allow(dead_code)]
#[path = "../store/mod.rs"]
mod store;

/// Runs a single invocation event through the inference handler and prints the envelope
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Directory holding model artifacts as <uid>/<model_name>
    #[arg(short, long, env, default_value = "models")]
    model_dir: String,

    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Invoke with an event read from a JSON file
    Event {
        /// Path to the event file
        #[clap(short, long)]
        file: String,
    },
    /// Invoke with the request fields given inline
    Text {
        #[clap(short, long)]
        uid: String,

        #[clap(short, long)]
        model_name: String,

        #[clap(short, long)]
        input: String,
    },
}

/// The `{statusCode, headers, body}` shape returned by function-execution services.
#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
struct Envelope {
    status_code: u16,
    headers: BTreeMap<String, String>,
    body: String,
}

impl Envelope {
    fn from_result(result: HandlerResult<InferenceResponse>) -> Result<Self> {
        let mut headers = BTreeMap::from([(
            CONTENT_TYPE.to_string(),
            "application/json".to_string(),
        )]);

        let (status, body) = match result {
            Ok(response) => {
                for (name, value) in CORS_HEADERS {
                    headers.insert(name.to_string(), value.to_string());
                }
                (200, serde_json::to_string(&response)?)
            }
            Err(HandlerError { status, message }) => {
                (status.as_u16(), serde_json::to_string(&message)?)
            }
        };

        Ok(Envelope {
            status_code: status,
            headers,
            body,
        })
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or(tracing_subscriber::EnvFilter::new("INFO")),
        )
        .init();

    let args = Args::parse();
    let event: Value = match args.cmd {
        Commands::Event { file } => {
            let raw = std::fs::read_to_string(&file)
                .with_context(|| format!("Failed to read event file {file}"))?;
            serde_json::from_str(&raw).context("Event file is not valid JSON")?
        }
        Commands::Text {
            uid,
            model_name,
            input,
        } => json!({"uid": uid, "model_name": model_name, "input": input}),
    };

    let service = InferenceService::new(
        Arc::new(FsBlobStore::new(&args.model_dir)),
        Arc::new(TractRuntime),
    );
    let result = match InferenceRequest::from_event(&event) {
        Ok(request) => Ok(service.infer(request).await),
        Err(err) => Err(err),
    };

    let envelope = Envelope::from_result(result)?;
    println!("{}", serde_json::to_string_pretty(&envelope)?);
    Ok(())
}
