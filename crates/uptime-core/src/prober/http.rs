use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use tracing::debug;

use super::Prober;
use crate::config::{MonitorOptions, Target};
use crate::monitor::status::StatusValue;

/// Probes targets with a single HTTP GET. Only a `200` counts as online.
#[derive(Debug, Clone)]
pub struct HttpProber {
    client: Client,
}

impl HttpProber {
    pub fn new(timeout: Duration) -> reqwest::Result<Self> {
        Ok(Self::with_client(Self::build_client(timeout)?))
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    pub fn from_options(options: &MonitorOptions) -> reqwest::Result<Self> {
        Self::new(options.probe_timeout)
    }

    /// The underlying client, for sharing its pool with other senders.
    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Client with an overall request timeout. The connect phase gets the
    /// same bound so an unroutable host cannot outlive the probe budget.
    pub fn build_client(timeout: Duration) -> reqwest::Result<Client> {
        Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .pool_max_idle_per_host(4)
            .user_agent(concat!("uptime-monitor/", env!("CARGO_PKG_VERSION")))
            .build()
    }
}

#[async_trait]
impl Prober for HttpProber {
    async fn check(&self, target: &Target) -> StatusValue {
        let status = match self.client.get(&target.url).send().await {
            Ok(response) => classify_status(response.status()),
            Err(e) => classify_error(&e),
        };
        debug!(target_name = %target.name, url = %target.url, %status, "Probe finished");
        status
    }
}

pub fn classify_status(status: StatusCode) -> StatusValue {
    if status == StatusCode::OK {
        StatusValue::Online
    } else {
        StatusValue::HttpError(status.as_u16())
    }
}

/// Map a transport failure to a status. Timeouts win over connect errors,
/// since a connect that timed out reports both.
pub fn classify_error(err: &reqwest::Error) -> StatusValue {
    if err.is_timeout() {
        StatusValue::Timeout
    } else if err.is_connect() {
        StatusValue::ConnectionFailed
    } else if err.is_builder() {
        StatusValue::other("invalid request")
    } else if err.is_redirect() {
        StatusValue::other("too many redirects")
    } else {
        StatusValue::other(root_cause(err))
    }
}

fn root_cause(err: &reqwest::Error) -> String {
    let mut cause: &dyn std::error::Error = err;
    while let Some(next) = std::error::Error::source(cause) {
        cause = next;
    }
    cause.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monitor::status::OTHER_ERROR_MAX_CHARS;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn target(url: String) -> Target {
        Target::new("t", url)
    }

    #[tokio::test]
    async fn ok_is_online() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/health"))
            .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
            .expect(1)
            .mount(&server)
            .await;

        let prober = HttpProber::new(Duration::from_secs(5)).unwrap();
        let status = prober
            .check(&target(format!("{}/health", server.uri())))
            .await;
        assert_eq!(status, StatusValue::Online);
    }

    #[tokio::test]
    async fn other_codes_keep_exact_status() {
        let server = MockServer::start().await;
        for (p, code) in [("/missing", 404u16), ("/down", 503), ("/empty", 204)] {
            Mock::given(method("GET"))
                .and(path(p))
                .respond_with(ResponseTemplate::new(code))
                .mount(&server)
                .await;
        }

        let prober = HttpProber::new(Duration::from_secs(5)).unwrap();
        for (p, code) in [("/missing", 404u16), ("/down", 503), ("/empty", 204)] {
            let status = prober.check(&target(format!("{}{}", server.uri(), p))).await;
            assert_eq!(status, StatusValue::HttpError(code));
        }
    }

    #[tokio::test]
    async fn single_request_per_check() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .expect(1)
            .mount(&server)
            .await;

        let prober = HttpProber::new(Duration::from_secs(5)).unwrap();
        let status = prober.check(&target(server.uri())).await;
        assert_eq!(status, StatusValue::HttpError(500));
    }

    #[tokio::test]
    async fn slow_response_is_timeout() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(3)))
            .mount(&server)
            .await;

        let prober = HttpProber::new(Duration::from_millis(200)).unwrap();
        let status = prober.check(&target(server.uri())).await;
        assert_eq!(status, StatusValue::Timeout);
    }

    #[tokio::test]
    async fn options_timeout_bounds_each_check() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(3)))
            .mount(&server)
            .await;

        let options = MonitorOptions::default().with_probe_timeout(Duration::from_millis(200));
        let prober = HttpProber::from_options(&options).unwrap();
        let started = std::time::Instant::now();
        let status = prober.check(&target(server.uri())).await;
        assert_eq!(status, StatusValue::Timeout);
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[tokio::test]
    async fn refused_connection_is_connection_failed() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let prober = HttpProber::new(Duration::from_secs(5)).unwrap();
        let status = prober
            .check(&target(format!("http://127.0.0.1:{}/", port)))
            .await;
        assert_eq!(status, StatusValue::ConnectionFailed);
    }

    #[tokio::test]
    async fn malformed_url_is_other_error() {
        let prober = HttpProber::new(Duration::from_secs(5)).unwrap();
        let status = prober.check(&target("not a url".into())).await;
        match status {
            StatusValue::OtherError(msg) => {
                assert!(!msg.is_empty());
                assert!(msg.chars().count() <= OTHER_ERROR_MAX_CHARS);
            }
            other => panic!("expected OtherError, got {:?}", other),
        }
    }

    #[test]
    fn classify_status_codes() {
        assert_eq!(classify_status(StatusCode::OK), StatusValue::Online);
        assert_eq!(classify_status(StatusCode::CREATED), StatusValue::HttpError(201));
        assert_eq!(
            classify_status(StatusCode::MOVED_PERMANENTLY),
            StatusValue::HttpError(301)
        );
        assert_eq!(
            classify_status(StatusCode::INTERNAL_SERVER_ERROR),
            StatusValue::HttpError(500)
        );
    }
}
