use crate::{
    auth::{ServiceCatalog, StaticToken},
    client::{Client, Config, Credentials},
};
use anyhow::Result;
use log::debug;
use reqwest::Url;
use std::{path::PathBuf, sync::Arc};
use structopt::StructOpt;

/// How to reach the metering API. Shared by every report tool.
#[derive(Debug, StructOpt)]
pub struct ConnectionOptions {
    /// Ceilometer API endpoint
    #[structopt(long, env = "CEILOMETER_URL", default_value = "http://localhost:9000")]
    pub base_url: Url,
    /// API version path segment
    #[structopt(long, default_value = "v1")]
    pub api_version: String,
    /// Token sent in the X-Auth-Token header
    #[structopt(long, env = "OS_AUTH_TOKEN", hide_env_values = true)]
    pub auth_token: Option<String>,
    /// Saved identity service `access` document to take the endpoint and token from
    #[structopt(long, env = "OS_SERVICE_CATALOG", parse(from_os_str))]
    pub service_catalog: Option<PathBuf>,
}

impl ConnectionOptions {
    /// Build the client these options describe. A service catalog overrides `--base-url`,
    /// and an explicit `--auth-token` overrides the catalog's token.
    pub fn client(&self) -> Result<Client> {
        let static_token = self
            .auth_token
            .as_ref()
            .map(|token| Credentials::Authenticated(Arc::new(StaticToken::new(token.as_str()))));
        let (base_url, credentials) = match &self.service_catalog {
            Some(path) => {
                let catalog = ServiceCatalog::from_file(path)?;
                debug!("Using metering endpoint {} from {}", catalog.metering_endpoint(), path.display());
                let base_url = catalog.metering_endpoint().clone();
                (base_url, static_token.unwrap_or_else(|| Credentials::Authenticated(Arc::new(catalog))))
            }
            None => (self.base_url.clone(), static_token.unwrap_or(Credentials::Anonymous)),
        };
        Ok(Client::new(Config::new(base_url).with_version(self.api_version.as_str()), credentials))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn parse(args: &[&str]) -> ConnectionOptions {
        ConnectionOptions::from_iter_safe(std::iter::once("tool").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_base_url_and_version() {
        let client = parse(&["--base-url", "http://metering.example.com:8777/", "--api-version", "v2"])
            .client()
            .unwrap();
        assert_eq!(client.config().base_url.as_str(), "http://metering.example.com:8777/");
        assert_eq!(client.config().version, "v2");
    }

    #[test]
    fn test_service_catalog_overrides_base_url() {
        let file = tempfile::NamedTempFile::new().unwrap();
        fs::write(
            file.path(),
            r#"{"access": {
                "token": {"id": "abc"},
                "serviceCatalog": [{"type": "metering", "endpoints": [{"adminURL": "http://10.0.0.5:9000/"}]}]
            }}"#,
        )
        .unwrap();
        let options = parse(&[
            "--base-url",
            "http://localhost:9000",
            "--service-catalog",
            file.path().to_str().unwrap(),
        ]);
        let client = options.client().unwrap();
        assert_eq!(client.config().base_url.as_str(), "http://10.0.0.5:9000/");
        assert_eq!(client.config().version, "v1");
    }

    #[test]
    fn test_missing_service_catalog_file() {
        let options = parse(&["--service-catalog", "/nonexistent/catalog.json"]);
        assert!(options.client().is_err());
    }
}
