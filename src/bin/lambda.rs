//! AWS Lambda entry point.
//!
//! Configuration comes from the environment only. The generator is built once
//! per container, so the session and article cache survive warm invocations.

use std::collections::HashMap;
use std::sync::Arc;

use lambda_runtime::{service_fn, Error as LambdaError, LambdaEvent};
use serde::Serialize;
use serde_json::Value;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use instafeed::storage::ArticleCache;
use instafeed::{Config, FeedGenerator, GenerateError};

const RSS_CONTENT_TYPE: &str = "application/rss+xml; charset=utf-8";
const TEXT_CONTENT_TYPE: &str = "text/plain; charset=utf-8";

/// API Gateway proxy response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct FeedResponse {
    status_code: u16,
    headers: HashMap<&'static str, &'static str>,
    body: String,
}

impl FeedResponse {
    fn from_result(result: Result<String, GenerateError>) -> Self {
        match result {
            Ok(document) => Self {
                status_code: 200,
                headers: HashMap::from([("Content-Type", RSS_CONTENT_TYPE)]),
                body: document,
            },
            Err(e) => Self {
                status_code: 502,
                headers: HashMap::from([("Content-Type", TEXT_CONTENT_TYPE)]),
                body: format!("Failed to generate feed: {e}"),
            },
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), LambdaError> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    let mut config = Config::default();
    config.apply_env();
    let generator = Arc::new(FeedGenerator::new(&config, ArticleCache::new())?);

    info!("instafeed Lambda starting");
    lambda_runtime::run(service_fn(move |event: LambdaEvent<Value>| {
        let generator = Arc::clone(&generator);
        async move { handler(&generator, event).await }
    }))
    .await
}

async fn handler(
    generator: &FeedGenerator,
    _event: LambdaEvent<Value>,
) -> Result<FeedResponse, LambdaError> {
    let result = generator.generate().await;
    if let Err(e) = &result {
        error!(error = %e, "Feed generation failed");
    }
    Ok(FeedResponse::from_result(result))
}
