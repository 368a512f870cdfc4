use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use reqwest::Url;
use thiserror::Error;
use tracing::debug;

use super::{OptimizerRequest, OptimizerResponse};
use crate::config::OptimizerConfig;

const DEFAULT_TIMEOUT_SECONDS: u64 = 30;

#[derive(Debug, Error)]
pub enum OptimizerError {
    #[error("invalid optimizer endpoint {url:?}: {reason}")]
    InvalidEndpoint { url: String, reason: String },

    #[error("optimizer credentials are not configured")]
    MissingCredentials,

    #[error("optimizer request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("optimizer returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("optimizer response could not be decoded: {0}")]
    Decode(#[from] serde_json::Error),
}

impl OptimizerError {
    /// Errors no retry can fix without a configuration change
    pub fn is_configuration(&self) -> bool {
        match self {
            Self::InvalidEndpoint { .. } | Self::MissingCredentials => true,
            Self::Status { status, .. } => matches!(status, 401 | 403),
            Self::Http(_) | Self::Decode(_) => false,
        }
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait OptimizerGateway: Send + Sync {
    async fn optimize(
        &self,
        request: &OptimizerRequest,
    ) -> Result<OptimizerResponse, OptimizerError>;

    /// Probe endpoint and credentials with an empty request
    async fn check_connection(&self) -> Result<(), OptimizerError>;
}

#[derive(Clone)]
pub struct HttpOptimizerGateway {
    url: Url,
    user: String,
    password: String,
    client: reqwest::Client,
}

impl HttpOptimizerGateway {
    pub fn new(config: &OptimizerConfig) -> Result<Self, OptimizerError> {
        let url = parse_endpoint(&config.url)?;
        if config.user.trim().is_empty() || config.password.is_empty() {
            return Err(OptimizerError::MissingCredentials);
        }

        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_static(concat!("site-smart-charging/", env!("CARGO_PKG_VERSION"))),
        );
        let timeout = match config.timeout_seconds {
            0 => DEFAULT_TIMEOUT_SECONDS,
            secs => secs,
        };
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout))
            .default_headers(headers)
            .build()?;

        Ok(Self {
            url,
            user: config.user.clone(),
            password: config.password.clone(),
            client,
        })
    }

    async fn post(&self, request: &OptimizerRequest) -> Result<String, OptimizerError> {
        let resp = self
            .client
            .post(self.url.clone())
            .basic_auth(&self.user, Some(&self.password))
            .json(request)
            .send()
            .await?;
        let status = resp.status();
        let body = resp.text().await?;
        if !status.is_success() {
            return Err(OptimizerError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(body)
    }
}

fn parse_endpoint(raw: &str) -> Result<Url, OptimizerError> {
    let invalid = |reason: &str| OptimizerError::InvalidEndpoint {
        url: raw.to_string(),
        reason: reason.to_string(),
    };
    let url = Url::parse(raw).map_err(|e| invalid(&e.to_string()))?;
    match url.scheme() {
        "http" | "https" => {}
        _ => return Err(invalid("scheme must be http or https")),
    }
    if url.host_str().is_none() {
        return Err(invalid("missing host"));
    }
    Ok(url)
}

#[async_trait]
impl OptimizerGateway for HttpOptimizerGateway {
    async fn optimize(
        &self,
        request: &OptimizerRequest,
    ) -> Result<OptimizerResponse, OptimizerError> {
        debug!(
            url = %self.url,
            cars = request.state.cars.len(),
            "posting optimizer request"
        );
        let body = self.post(request).await?;
        Ok(serde_json::from_str(&body)?)
    }

    async fn check_connection(&self) -> Result<(), OptimizerError> {
        self.post(&OptimizerRequest::probe()).await.map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{basic_auth, body_partial_json, header_exists, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config(url: String) -> OptimizerConfig {
        OptimizerConfig {
            url,
            user: "tenant".into(),
            password: "secret".into(),
            timeout_seconds: 5,
        }
    }

    #[test]
    fn test_malformed_endpoint_is_a_configuration_error() {
        let err = HttpOptimizerGateway::new(&config("not a url".into())).err().unwrap();
        assert!(matches!(err, OptimizerError::InvalidEndpoint { .. }));
        assert!(err.is_configuration());

        let err = HttpOptimizerGateway::new(&config("ftp://solver.local/opt".into()))
            .err()
            .unwrap();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_missing_credentials_rejected() {
        let mut cfg = config("http://solver.local/optimize".into());
        cfg.password.clear();
        let err = HttpOptimizerGateway::new(&cfg).err().unwrap();
        assert!(matches!(err, OptimizerError::MissingCredentials));
    }

    #[tokio::test]
    async fn test_optimize_posts_with_basic_auth() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/optimize"))
            .and(basic_auth("tenant", "secret"))
            .and(header_exists("user-agent"))
            .and(body_partial_json(json!({ "event": { "eventType": "Reoptimize" } })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "cars": [{ "id": 2, "name": "CS1~1", "currentPlan": [16.0, 16.0] }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let gateway =
            HttpOptimizerGateway::new(&config(format!("{}/optimize", server.uri()))).unwrap();
        let response = gateway.optimize(&OptimizerRequest::probe()).await.unwrap();
        assert_eq!(response.cars.len(), 1);
        assert_eq!(response.cars[0].name, "CS1~1");
    }

    #[tokio::test]
    async fn test_error_status_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("solver crashed"))
            .mount(&server)
            .await;

        let gateway = HttpOptimizerGateway::new(&config(server.uri())).unwrap();
        let err = gateway.optimize(&OptimizerRequest::probe()).await.unwrap_err();
        match &err {
            OptimizerError::Status { status, body } => {
                assert_eq!(*status, 500);
                assert_eq!(body, "solver crashed");
            }
            other => panic!("unexpected error {other:?}"),
        }
        assert!(!err.is_configuration());
    }

    #[tokio::test]
    async fn test_rejected_credentials_are_a_configuration_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let gateway = HttpOptimizerGateway::new(&config(server.uri())).unwrap();
        let err = gateway.check_connection().await.unwrap_err();
        assert!(err.is_configuration());
    }

    #[tokio::test]
    async fn test_garbage_body_is_a_decode_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
            .mount(&server)
            .await;

        let gateway = HttpOptimizerGateway::new(&config(server.uri())).unwrap();
        let err = gateway.optimize(&OptimizerRequest::probe()).await.unwrap_err();
        assert!(matches!(err, OptimizerError::Decode(_)));
    }

    #[tokio::test]
    async fn test_check_connection_ok() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "cars": [] })))
            .expect(1)
            .mount(&server)
            .await;

        let gateway = HttpOptimizerGateway::new(&config(server.uri())).unwrap();
        assert!(gateway.check_connection().await.is_ok());
    }
}
