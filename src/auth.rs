use anyhow::{anyhow, Context, Result};
use json::JsonValue;
use reqwest::Url;
use std::{fs, path::Path};

/// Something that can hand out a token for the `X-Auth-Token` header.
pub trait TokenProvider: Send + Sync {
    fn auth_token(&self) -> Result<String>;
}

/// A token that was obtained elsewhere and never changes.
#[derive(Clone)]
pub struct StaticToken(String);

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }
}

impl TokenProvider for StaticToken {
    fn auth_token(&self) -> Result<String> {
        Ok(self.0.clone())
    }
}

/// Token and metering endpoint taken from an identity service `access` document
/// (the body returned by a Keystone v2.0 token request).
#[derive(Clone)]
pub struct ServiceCatalog {
    token: String,
    metering_endpoint: Url,
}

impl ServiceCatalog {
    /// Pull the token id and the first metering `adminURL` out of an `access` document.
    pub fn from_access(document: &JsonValue) -> Result<Self> {
        let access = &document["access"];
        let token = access["token"]["id"]
            .as_str()
            .ok_or_else(|| anyhow!("service catalog has no access.token.id"))?
            .to_owned();
        let admin_url = access["serviceCatalog"]
            .members()
            .find(|service| service["type"].as_str() == Some("metering"))
            .and_then(|service| service["endpoints"][0]["adminURL"].as_str())
            .ok_or_else(|| anyhow!("service catalog has no metering endpoint"))?;
        Ok(Self {
            token,
            metering_endpoint: admin_url
                .parse()
                .with_context(|| format!("invalid metering endpoint {:?}", admin_url))?,
        })
    }

    /// Read a saved `access` document from disk.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents =
            fs::read_to_string(path).with_context(|| format!("failed to read service catalog {}", path.display()))?;
        let document = json::parse(&contents).with_context(|| format!("invalid JSON in {}", path.display()))?;
        Self::from_access(&document)
    }

    pub fn metering_endpoint(&self) -> &Url {
        &self.metering_endpoint
    }
}

impl TokenProvider for ServiceCatalog {
    fn auth_token(&self) -> Result<String> {
        Ok(self.token.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ACCESS: &str = r#"
    {
        "access": {
            "token": {"id": "abc*token*abc", "expires": "2012-09-01T00:00:00Z"},
            "serviceCatalog": [
                {
                    "type": "identity",
                    "name": "keystone",
                    "endpoints": [{"adminURL": "http://localhost:35357/v2.0"}]
                },
                {
                    "type": "metering",
                    "name": "ceilometer",
                    "endpoints": [
                        {
                            "adminURL": "http://localhost:9000/",
                            "region": "RegionOne",
                            "id": "8e88da8f3ca54ed8a1c4b56ccb39d2b6"
                        }
                    ]
                }
            ]
        }
    }"#;

    #[test]
    fn test_catalog_resolves_metering_endpoint() {
        let catalog = ServiceCatalog::from_access(&json::parse(ACCESS).unwrap()).unwrap();
        assert_eq!(catalog.metering_endpoint().as_str(), "http://localhost:9000/");
        assert_eq!(catalog.auth_token().unwrap(), "abc*token*abc");
    }

    #[test]
    fn test_catalog_without_metering_service() {
        let document = json::parse(r#"{"access": {"token": {"id": "t"}, "serviceCatalog": []}}"#).unwrap();
        let error = ServiceCatalog::from_access(&document).err().unwrap();
        assert!(error.to_string().contains("metering"));
    }

    #[test]
    fn test_catalog_from_file() {
        let file = tempfile::NamedTempFile::new().unwrap();
        fs::write(file.path(), ACCESS).unwrap();
        let catalog = ServiceCatalog::from_file(file.path()).unwrap();
        assert_eq!(catalog.metering_endpoint().host_str(), Some("localhost"));
    }
}
