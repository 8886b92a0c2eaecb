use crate::{
    auth::{ServiceCatalog, TokenProvider},
    error::{Error, Scope},
};
use anyhow::{anyhow, Result};
use chrono::{NaiveDateTime, Timelike};
use json::JsonValue;
use log::debug;
use reqwest::{Response, StatusCode, Url};
use std::sync::Arc;

/// Header carrying the identity token on authenticated requests.
pub const AUTH_TOKEN_HEADER: &str = "X-Auth-Token";

/// Where the metering API lives.
#[derive(Debug, Clone)]
pub struct Config {
    pub base_url: Url,
    pub version: String,
}

impl Config {
    /// Point at `base_url`, using the `v1` API.
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url,
            version: String::from("v1"),
        }
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }
}

/// How requests are authenticated.
#[derive(Clone)]
pub enum Credentials {
    Anonymous,
    Authenticated(Arc<dyn TokenProvider>),
}

/// Optional bounds for a query. Unset bounds are not sent at all.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TimeRange {
    pub start: Option<NaiveDateTime>,
    pub end: Option<NaiveDateTime>,
}

impl TimeRange {
    /// No bounds.
    pub fn all() -> Self {
        Self::default()
    }

    pub fn between(start: NaiveDateTime, end: NaiveDateTime) -> Self {
        Self {
            start: Some(start),
            end: Some(end),
        }
    }

    fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::with_capacity(2);
        if let Some(start) = &self.start {
            pairs.push(("start_timestamp", isoformat(start)));
        }
        if let Some(end) = &self.end {
            pairs.push(("end_timestamp", isoformat(end)));
        }
        pairs
    }
}

/// `YYYY-MM-DDTHH:MM:SS`, with microseconds only when there are any.
pub fn isoformat(timestamp: &NaiveDateTime) -> String {
    if timestamp.nanosecond() == 0 {
        timestamp.format("%Y-%m-%dT%H:%M:%S").to_string()
    } else {
        timestamp.format("%Y-%m-%dT%H:%M:%S%.6f").to_string()
    }
}

#[derive(Debug, Clone, Copy)]
enum Aggregate {
    Sum,
    Max,
}

impl Aggregate {
    fn as_str(self) -> &'static str {
        match self {
            Aggregate::Sum => "sum",
            Aggregate::Max => "max",
        }
    }
}

/// Client object for making metering API calls. Uses `Arc` internally to be cheaply cloneable.
#[derive(Clone)]
pub struct Client {
    client: reqwest::Client,
    data: Arc<ClientData>,
}

struct ClientData {
    config: Config,
    credentials: Credentials,
}

impl Client {
    /// Construct a new client from an explicit configuration and credential source.
    pub fn new(config: Config, credentials: Credentials) -> Self {
        Self {
            client: reqwest::Client::new(),
            data: Arc::new(ClientData { config, credentials }),
        }
    }

    /// Unauthenticated client for the `v1` API at `base_url`.
    pub fn anonymous(base_url: Url) -> Self {
        Self::new(Config::new(base_url), Credentials::Anonymous)
    }

    /// Authenticated client for the metering endpoint listed in a service catalog.
    pub fn from_catalog(catalog: ServiceCatalog) -> Self {
        let config = Config::new(catalog.metering_endpoint().clone());
        Self::new(config, Credentials::Authenticated(Arc::new(catalog)))
    }

    pub fn config(&self) -> &Config {
        &self.data.config
    }

    /// Returns list of project ids known to the server. Null ids are kept as `None`.
    pub async fn get_projects(&self) -> Result<Vec<Option<String>>> {
        let url = self.endpoint(&["projects"])?;
        let mut body = self.get_json(url.clone(), None).await?;
        Ok(take_list(&mut body, "projects", &url)?
            .into_iter()
            .map(|project| project.as_str().map(String::from))
            .collect())
    }

    /// Returns the resources owned by a project.
    pub async fn get_resources(&self, project_id: &str, range: &TimeRange) -> Result<Vec<JsonValue>> {
        let mut url = self.endpoint(&["projects", project_id, "resources"])?;
        append_query(&mut url, range.query_pairs());
        let mut body = self.get_json(url.clone(), Some((Scope::Project, project_id))).await?;
        take_list(&mut body, "resources", &url)
    }

    /// Returns events recorded for a resource and meter in the time range.
    pub async fn get_events(&self, resource_id: &str, meter: &str, range: &TimeRange) -> Result<Vec<JsonValue>> {
        let mut url = self.endpoint(&["resources", resource_id, "meters", meter])?;
        append_query(&mut url, range.query_pairs());
        let mut body = self.get_json(url.clone(), Some((Scope::Resource, resource_id))).await?;
        take_list(&mut body, "events", &url)
    }

    /// Returns the first and last timestamps and the duration a resource reported the meter
    /// within the time range, as the server sent them.
    pub async fn get_resource_duration_info(
        &self,
        resource_id: &str,
        meter: &str,
        range: &TimeRange,
        search_offset: u64,
    ) -> Result<JsonValue> {
        let mut url = self.endpoint(&["resources", resource_id, "meters", meter, "duration"])?;
        append_query(&mut url, search_pairs(range, search_offset));
        let body = self.get_json(url.clone(), Some((Scope::Resource, resource_id))).await?;
        if !body.is_object() {
            return Err(Error::malformed(&url, "duration info is not an object").into());
        }
        Ok(body)
    }

    /// Returns the max volume of a meter for a project within the time range.
    pub async fn get_project_volume_max(
        &self,
        project_id: &str,
        meter: &str,
        range: &TimeRange,
        search_offset: u64,
    ) -> Result<Option<JsonValue>> {
        self.volume(Scope::Project, project_id, meter, Aggregate::Max, range, search_offset).await
    }

    /// Returns the total volume of a meter for a project within the time range.
    pub async fn get_project_volume_sum(
        &self,
        project_id: &str,
        meter: &str,
        range: &TimeRange,
        search_offset: u64,
    ) -> Result<Option<JsonValue>> {
        self.volume(Scope::Project, project_id, meter, Aggregate::Sum, range, search_offset).await
    }

    pub async fn get_resource_volume_max(
        &self,
        resource_id: &str,
        meter: &str,
        range: &TimeRange,
        search_offset: u64,
    ) -> Result<Option<JsonValue>> {
        self.volume(Scope::Resource, resource_id, meter, Aggregate::Max, range, search_offset).await
    }

    /// Returns the total volume of a meter for a resource within the time range.
    pub async fn get_resource_volume_sum(
        &self,
        resource_id: &str,
        meter: &str,
        range: &TimeRange,
        search_offset: u64,
    ) -> Result<Option<JsonValue>> {
        self.volume(Scope::Resource, resource_id, meter, Aggregate::Sum, range, search_offset).await
    }

    async fn volume(
        &self,
        scope: Scope,
        id: &str,
        meter: &str,
        aggregate: Aggregate,
        range: &TimeRange,
        search_offset: u64,
    ) -> Result<Option<JsonValue>> {
        let collection = match scope {
            Scope::Project => "projects",
            Scope::Resource => "resources",
        };
        let mut url = self.endpoint(&[collection, id, "meters", meter, "volume", aggregate.as_str()])?;
        append_query(&mut url, search_pairs(range, search_offset));
        let mut body = self.get_json(url, Some((scope, id))).await?;
        let volume = body.remove("volume");
        Ok(if volume.is_null() { None } else { Some(volume) })
    }

    /// Join the base url, the api version and the given path segments.
    pub(crate) fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let config = &self.data.config;
        let mut url = config.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| anyhow!("base url {} cannot have a path", config.base_url))?
            .pop_if_empty()
            .extend(config.version.split('/').filter(|s| !s.is_empty()))
            .extend(segments);
        Ok(url)
    }

    async fn get_json(&self, url: Url, lookup: Option<(Scope, &str)>) -> Result<JsonValue> {
        debug!("GET {}", url);
        let mut request = self.client.get(url.clone()).header(reqwest::header::ACCEPT, "application/json");
        if let Credentials::Authenticated(provider) = &self.data.credentials {
            request = request.header(AUTH_TOKEN_HEADER, provider.auth_token()?);
        }
        // Send the request, and get the body as a string
        let body = check_status(request.send().await?, &url, lookup)?.text().await?;
        json::parse(&body).map_err(|error| Error::malformed(&url, error.to_string()).into())
    }
}

fn search_pairs(range: &TimeRange, search_offset: u64) -> Vec<(&'static str, String)> {
    let mut pairs = vec![("search_offset", search_offset.to_string())];
    pairs.extend(range.query_pairs());
    pairs
}

fn append_query(url: &mut Url, pairs: Vec<(&'static str, String)>) {
    // Touching query_pairs_mut with nothing to add would leave a dangling `?`
    if !pairs.is_empty() {
        url.query_pairs_mut().extend_pairs(pairs);
    }
}

/// Remove a listing field from a response body. A missing or null field is an empty list.
fn take_list(body: &mut JsonValue, field: &str, url: &Url) -> Result<Vec<JsonValue>> {
    match body.remove(field) {
        JsonValue::Array(items) => Ok(items),
        JsonValue::Null => Ok(Vec::new()),
        _ => Err(Error::malformed(url, format!("`{}` is not a list", field)).into()),
    }
}

fn check_status(response: Response, url: &Url, lookup: Option<(Scope, &str)>) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    match lookup {
        Some((scope, id)) if status == StatusCode::NOT_FOUND => Err(Error::NotFound {
            scope,
            id: id.to_owned(),
        }
        .into()),
        _ => Err(Error::RequestFailed {
            url: url.clone(),
            status,
        }
        .into()),
    }
}
