use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use http::header::ACCEPT_ENCODING;
use http::HeaderValue;
use reqwest::Client;
use tracing::debug;

use crate::config::settings::ApiSettings;
use crate::error::{DirectoryError, Result};
use crate::observability::metrics::get_metrics;
use crate::transport::request::ApiRequest;

static SUCCESS_MSG: &'static str = "success";
static FAILURE_MSG: &'static str = "failure";
static TRANSPORT_MSG: &'static str = "transport";

/// Result of one HTTP attempt. Non-2xx statuses are data, not errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HttpOutcome {
    Success { status: u16, raw_body: String },
    Failure { status: u16, raw_body: String },
}

impl HttpOutcome {
    pub fn classify(status: u16, raw_body: String) -> Self {
        if (200..300).contains(&status) {
            HttpOutcome::Success { status, raw_body }
        } else {
            HttpOutcome::Failure { status, raw_body }
        }
    }

    pub fn status(&self) -> u16 {
        match self {
            HttpOutcome::Success { status, .. } | HttpOutcome::Failure { status, .. } => *status,
        }
    }

    pub fn raw_body(&self) -> &str {
        match self {
            HttpOutcome::Success { raw_body, .. } | HttpOutcome::Failure { raw_body, .. } => raw_body,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, HttpOutcome::Success { .. })
    }

    /// Body of a success, `RequestFailed` otherwise.
    pub fn into_body(self) -> Result<String> {
        match self {
            HttpOutcome::Success { raw_body, .. } => Ok(raw_body),
            HttpOutcome::Failure { status, raw_body } => Err(DirectoryError::RequestFailed { status, body: raw_body }),
        }
    }
}

/// One request in, one classified outcome out.
pub trait ExecuteRequest {
    fn execute(&self, request: &ApiRequest) -> impl Future<Output = Result<HttpOutcome>> + Send;
}

/// reqwest backed executor bound to one bearer token.
#[derive(Clone)]
pub struct RequestExecutor {
    client: Client,
    api: Arc<ApiSettings>,
    token: String,
}

impl RequestExecutor {
    pub fn new(api: Arc<ApiSettings>, token: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_millis(api.timeout_ms))
            .user_agent(client_user_agent(&api))
            .gzip(api.compression)
            .build()?;
        Ok(Self::with_client(client, api, token))
    }

    pub fn with_client(client: Client, api: Arc<ApiSettings>, token: impl Into<String>) -> Self {
        Self { client, api, token: token.into() }
    }

    pub fn api(&self) -> &ApiSettings {
        &self.api
    }
}

impl ExecuteRequest for RequestExecutor {
    async fn execute(&self, request: &ApiRequest) -> Result<HttpOutcome> {
        let metrics = get_metrics().await;
        let method = request.method.as_str();
        let start = Instant::now();

        let mut builder = self
            .client
            .request(request.method.clone(), &request.url)
            .query(&request.query)
            .headers(request.headers.clone())
            .bearer_auth(&self.token);

        if self.api.compression {
            builder = builder.header(ACCEPT_ENCODING, HeaderValue::from_static("gzip"));
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        debug!("{} {}", method, request.url);
        let sent = async {
            let response = builder.send().await?;
            let status = response.status().as_u16();
            let raw_body = response.text().await?;
            Ok::<_, reqwest::Error>(HttpOutcome::classify(status, raw_body))
        }
        .await;

        metrics
            .api_request_duration
            .with_label_values(&[method])
            .observe(start.elapsed().as_secs_f64());

        match sent {
            Ok(outcome) => {
                let label = if outcome.is_success() { SUCCESS_MSG } else { FAILURE_MSG };
                metrics.api_requests.with_label_values(&[method, label]).inc();
                debug!("{} {} -> {}", method, request.url, outcome.status());
                Ok(outcome)
            }
            Err(err) => {
                metrics.api_requests.with_label_values(&[method, TRANSPORT_MSG]).inc();
                Err(DirectoryError::Transport(err))
            }
        }
    }
}

/// Google marks compressed clients by a `gzip` token in the user agent.
pub fn client_user_agent(api: &ApiSettings) -> String {
    if api.compression {
        format!("{} (gzip)", api.user_agent)
    } else {
        api.user_agent.clone()
    }
}
