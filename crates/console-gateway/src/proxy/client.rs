//! Per-backend HTTP clients.

use std::time::Duration;

use log::debug;
use reqwest::{Certificate, Client, Method, RequestBuilder, Url};

use super::ProxyError;
use crate::backends::BackendConfig;
use crate::paths::single_joining_slash;

/// A configured backend endpoint and the client used to reach it.
#[derive(Debug, Clone)]
pub struct Upstream {
    name: String,
    base: Url,
    client: Client,
    timeout: Option<Duration>,
}

impl Upstream {
    /// Build the client for a backend from its config.
    ///
    /// Redirects are never followed; the client sees them as-is.
    pub fn from_config(name: &str, config: &BackendConfig) -> Result<Self, ProxyError> {
        let base = Url::parse(&config.endpoint).map_err(|e| ProxyError::InvalidEndpoint {
            backend: name.to_string(),
            message: format!("{}: {}", config.endpoint, e),
        })?;
        if !matches!(base.scheme(), "http" | "https") {
            return Err(ProxyError::InvalidEndpoint {
                backend: name.to_string(),
                message: format!("unsupported scheme {}", base.scheme()),
            });
        }

        let mut builder = Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .danger_accept_invalid_certs(config.insecure_skip_verify);

        if let Some(ca_file) = &config.ca_file {
            let pem = std::fs::read(ca_file).map_err(|e| ProxyError::Client {
                backend: name.to_string(),
                message: format!("cannot read {}: {}", ca_file.display(), e),
            })?;
            let cert = Certificate::from_pem(&pem).map_err(|e| ProxyError::Client {
                backend: name.to_string(),
                message: e.to_string(),
            })?;
            builder = builder.add_root_certificate(cert);
        }

        let client = builder.build().map_err(|e| ProxyError::Client {
            backend: name.to_string(),
            message: e.to_string(),
        })?;

        debug!("upstream {} -> {}", name, base);
        Ok(Self {
            name: name.to_string(),
            base,
            client,
            timeout: config.timeout_secs.map(Duration::from_secs),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    /// Target URL for a backend-relative path: the endpoint path joined
    /// with `path`, plus `query`.
    pub fn url_for(&self, path: &str, query: Option<&str>) -> Url {
        let mut url = self.base.clone();
        url.set_path(&single_joining_slash(self.base.path(), path));
        url.set_query(query);
        url
    }

    /// Start a request to `url` with the configured timeout applied.
    pub fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let builder = self.client.request(method, url);
        match self.timeout {
            Some(timeout) => builder.timeout(timeout),
            None => builder,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(endpoint: &str) -> BackendConfig {
        BackendConfig {
            endpoint: endpoint.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_url_for_joins_endpoint_path() {
        let upstream = Upstream::from_config("thanos", &config("http://thanos:9090/api")).unwrap();
        let url = upstream.url_for("/v1/query", Some("query=up"));
        assert_eq!(url.as_str(), "http://thanos:9090/api/v1/query?query=up");

        let upstream = Upstream::from_config("kiali", &config("http://kiali:20001")).unwrap();
        assert_eq!(
            upstream.url_for("/api/namespaces", None).as_str(),
            "http://kiali:20001/api/namespaces"
        );
    }

    #[test]
    fn test_rejects_bad_endpoint() {
        assert!(matches!(
            Upstream::from_config("grafana", &config("not a url")),
            Err(ProxyError::InvalidEndpoint { .. })
        ));
        assert!(matches!(
            Upstream::from_config("grafana", &config("ftp://grafana")),
            Err(ProxyError::InvalidEndpoint { .. })
        ));
    }

    #[test]
    fn test_missing_ca_file() {
        let mut cfg = config("https://k8s.local");
        cfg.ca_file = Some("/nonexistent/ca.crt".into());
        assert!(matches!(
            Upstream::from_config("kubernetes", &cfg),
            Err(ProxyError::Client { .. })
        ));
    }
}
