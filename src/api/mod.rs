// API client module: a small blocking HTTP client for the Cosmos DB SQL API.
// It is intentionally synchronous: the demos run one request at a time and
// print results as they go.
//
// - `auth`: request signing (master key) and resource tokens.
// - `link`: name-based resource addressing.
// - `models`: typed resource descriptors.
// - `error`: the client's error type.

pub mod auth;
pub mod error;
pub mod link;
pub mod models;

use chrono::Utc;
use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, CONTENT_TYPE};
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;
use url::Url;

pub use auth::Credential;
pub use error::CosmosError;
pub use link::{Link, ResourceType};
pub use models::*;

/// REST API version sent with every request.
pub const API_VERSION: &str = "2018-12-31";

const CONTINUATION: &str = "x-ms-continuation";
const REQUEST_CHARGE: &str = "x-ms-request-charge";

pub type Result<T> = std::result::Result<T, CosmosError>;

/// Per-request options. Only the fields that are set become headers.
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    /// Provisioned throughput (RU/s) for a new collection.
    pub offer_throughput: Option<u32>,
    /// Partition key value of the addressed document or script execution.
    pub partition_key: Option<Value>,
    pub pre_triggers: Vec<String>,
    pub post_triggers: Vec<String>,
    pub max_item_count: Option<u32>,
    pub continuation: Option<String>,
    pub enable_cross_partition_query: bool,
}

impl RequestOptions {
    pub fn partition_key(value: impl Into<Value>) -> Self {
        Self {
            partition_key: Some(value.into()),
            ..Default::default()
        }
    }

    pub fn throughput(request_units: u32) -> Self {
        Self {
            offer_throughput: Some(request_units),
            ..Default::default()
        }
    }

    pub fn cross_partition() -> Self {
        Self {
            enable_cross_partition_query: true,
            ..Default::default()
        }
    }

    fn headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        if let Some(throughput) = self.offer_throughput {
            insert(&mut headers, "x-ms-offer-throughput", &throughput.to_string())?;
        }
        if let Some(key) = &self.partition_key {
            let key = ascii_json(&Value::Array(vec![key.clone()]));
            insert(&mut headers, "x-ms-documentdb-partitionkey", &key)?;
        }
        if !self.pre_triggers.is_empty() {
            insert(&mut headers, "x-ms-documentdb-pre-trigger-include", &self.pre_triggers.join(","))?;
        }
        if !self.post_triggers.is_empty() {
            insert(&mut headers, "x-ms-documentdb-post-trigger-include", &self.post_triggers.join(","))?;
        }
        if let Some(count) = self.max_item_count {
            insert(&mut headers, "x-ms-max-item-count", &count.to_string())?;
        }
        if let Some(token) = &self.continuation {
            insert(&mut headers, CONTINUATION, token)?;
        }
        if self.enable_cross_partition_query {
            insert(&mut headers, "x-ms-documentdb-query-enablecrosspartition", "True")?;
        }
        Ok(headers)
    }
}

/// JSON text with every non-ASCII character written as a `\uXXXX` escape,
/// so it is a valid header value.
fn ascii_json(value: &Value) -> String {
    let mut escaped = String::new();
    for c in value.to_string().chars() {
        if c.is_ascii() {
            escaped.push(c);
        } else {
            for unit in c.encode_utf16(&mut [0; 2]) {
                escaped.push_str(&format!("\\u{unit:04x}"));
            }
        }
    }
    escaped
}

fn insert(headers: &mut HeaderMap, name: &'static str, value: &str) -> Result<()> {
    let value = HeaderValue::from_str(value).map_err(|source| CosmosError::Header { name, source })?;
    headers.insert(HeaderName::from_static(name), value);
    Ok(())
}

/// SQL query with optional named parameters (`@name`).
#[derive(Debug, Clone, Serialize)]
pub struct Query {
    pub query: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub parameters: Vec<QueryParameter>,
}

#[derive(Debug, Clone, Serialize)]
pub struct QueryParameter {
    pub name: String,
    pub value: Value,
}

impl Query {
    pub fn new(sql: &str) -> Self {
        Self {
            query: sql.to_string(),
            parameters: Vec::new(),
        }
    }

    pub fn with_parameter(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.parameters.push(QueryParameter {
            name: name.to_string(),
            value: value.into(),
        });
        self
    }
}

/// One page of a feed or query.
#[derive(Debug, Clone)]
pub struct FeedPage<T> {
    pub items: Vec<T>,
    pub continuation: Option<String>,
    pub request_charge: f64,
}

/// Cosmos DB client holding a reqwest blocking client, the account endpoint
/// and the credential used to authorize requests.
#[derive(Clone, Debug)]
pub struct CosmosClient {
    client: Client,
    endpoint: Url,
    credential: Credential,
}

impl CosmosClient {
    /// Create a client authorized with the account master key.
    pub fn new(endpoint: &str, master_key: &str) -> Result<Self> {
        Self::with_credential(endpoint, Credential::master_key(master_key)?)
    }

    /// Create a client authorized with a permission's resource token.
    pub fn with_resource_token(endpoint: &str, token: &str) -> Result<Self> {
        Self::with_credential(endpoint, Credential::resource_token(token))
    }

    pub fn with_credential(endpoint: &str, credential: Credential) -> Result<Self> {
        let mut endpoint = Url::parse(endpoint).map_err(|source| CosmosError::InvalidEndpoint {
            endpoint: endpoint.to_string(),
            source,
        })?;
        if !endpoint.path().ends_with('/') {
            let path = format!("{}/", endpoint.path());
            endpoint.set_path(&path);
        }
        let client = Client::builder().build().map_err(CosmosError::Client)?;
        Ok(CosmosClient {
            client,
            endpoint,
            credential,
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// List every resource of type `T` below `parent`, following
    /// continuation tokens until the feed is exhausted.
    pub fn list<T: CosmosResource>(&self, parent: &Link) -> Result<Vec<T>> {
        let mut options = RequestOptions::default();
        let mut items = Vec::new();
        loop {
            let page = self.read_feed::<T>(parent, &options)?;
            items.extend(page.items);
            match page.continuation {
                Some(token) => options.continuation = Some(token),
                None => return Ok(items),
            }
        }
    }

    /// Read a single page of the `T` feed below `parent`.
    pub fn read_feed<T: CosmosResource>(&self, parent: &Link, options: &RequestOptions) -> Result<FeedPage<T>> {
        let path = parent.feed_url_path(T::TYPE);
        let request = self.request(Method::GET, &path, T::TYPE, &parent.path(), options)?;
        let (body, continuation, request_charge) = self.send(Method::GET, request, &path)?;
        Ok(FeedPage {
            items: feed_items(body, T::TYPE, &path)?,
            continuation,
            request_charge,
        })
    }

    pub fn create<T: CosmosResource>(&self, parent: &Link, resource: &T, options: &RequestOptions) -> Result<T> {
        let path = parent.feed_url_path(T::TYPE);
        let request = self
            .request(Method::POST, &path, T::TYPE, &parent.path(), options)?
            .json(resource);
        self.send_for(Method::POST, request, &path)
    }

    pub fn read<T: CosmosResource>(&self, link: &Link, options: &RequestOptions) -> Result<T> {
        let path = link.url_path();
        let request = self.request(Method::GET, &path, T::TYPE, &link.path(), options)?;
        self.send_for(Method::GET, request, &path)
    }

    pub fn replace<T: CosmosResource>(&self, link: &Link, resource: &T, options: &RequestOptions) -> Result<T> {
        let path = link.url_path();
        let request = self
            .request(Method::PUT, &path, T::TYPE, &link.path(), options)?
            .json(resource);
        self.send_for(Method::PUT, request, &path)
    }

    pub fn delete(&self, link: &Link, options: &RequestOptions) -> Result<()> {
        let resource_type = link.resource_type().unwrap_or(ResourceType::Databases);
        let path = link.url_path();
        let request = self.request(Method::DELETE, &path, resource_type, &link.path(), options)?;
        self.send(Method::DELETE, request, &path)?;
        Ok(())
    }

    /// Run a SQL query against the `resource_type` feed below `parent` and
    /// return one page of results.
    pub fn query<T: DeserializeOwned>(
        &self,
        parent: &Link,
        resource_type: ResourceType,
        query: &Query,
        options: &RequestOptions,
    ) -> Result<FeedPage<T>> {
        let path = parent.feed_url_path(resource_type);
        let request = self
            .request(Method::POST, &path, resource_type, &parent.path(), options)?
            .header(CONTENT_TYPE, "application/query+json")
            .header("x-ms-documentdb-isquery", "True")
            .json(query);
        let (body, continuation, request_charge) = self.send(Method::POST, request, &path)?;
        Ok(FeedPage {
            items: feed_items(body, resource_type, &path)?,
            continuation,
            request_charge,
        })
    }

    /// Run a query to completion, collecting every page.
    pub fn query_all<T: DeserializeOwned>(
        &self,
        parent: &Link,
        resource_type: ResourceType,
        query: &Query,
        options: &RequestOptions,
    ) -> Result<Vec<T>> {
        let mut options = options.clone();
        let mut items = Vec::new();
        loop {
            let page = self.query::<T>(parent, resource_type, query, &options)?;
            items.extend(page.items);
            match page.continuation {
                Some(token) => options.continuation = Some(token),
                None => return Ok(items),
            }
        }
    }

    /// Execute a stored procedure. Parameters are passed positionally.
    pub fn execute_stored_procedure<R: DeserializeOwned>(
        &self,
        link: &Link,
        parameters: &[Value],
        options: &RequestOptions,
    ) -> Result<R> {
        let path = link.url_path();
        let request = self
            .request(Method::POST, &path, ResourceType::StoredProcedures, &link.path(), options)?
            .json(parameters);
        self.send_for(Method::POST, request, &path)
    }

    fn request(
        &self,
        method: Method,
        path: &str,
        resource_type: ResourceType,
        resource_link: &str,
        options: &RequestOptions,
    ) -> Result<RequestBuilder> {
        let url = self
            .endpoint
            .join(path)
            .map_err(|source| CosmosError::InvalidEndpoint {
                endpoint: format!("{}{}", self.endpoint, path),
                source,
            })?;
        let date = auth::format_date(Utc::now());
        let authorization =
            self.credential
                .authorization(method.as_str(), resource_type.as_str(), resource_link, &date)?;

        let mut headers = options.headers()?;
        insert(&mut headers, "authorization", &authorization)?;
        insert(&mut headers, "x-ms-date", &date)?;
        insert(&mut headers, "x-ms-version", API_VERSION)?;
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        Ok(self.client.request(method, url).headers(headers))
    }

    fn send_for<T: DeserializeOwned>(&self, method: Method, request: RequestBuilder, path: &str) -> Result<T> {
        let (body, _, _) = self.send(method, request, path)?;
        serde_json::from_slice(&body).map_err(|source| CosmosError::Decode {
            path: path.to_string(),
            source,
        })
    }

    // Returns the raw body with the continuation token and request charge.
    fn send(&self, method: Method, request: RequestBuilder, path: &str) -> Result<(Vec<u8>, Option<String>, f64)> {
        let transport = |source| CosmosError::Transport {
            method: method.to_string(),
            path: path.to_string(),
            source,
        };
        let res: Response = request.send().map_err(transport)?;

        let status = res.status();
        let continuation = header_text(&res, CONTINUATION);
        let request_charge = header_text(&res, REQUEST_CHARGE)
            .and_then(|v| v.parse::<f64>().ok())
            .unwrap_or_default();
        debug!(%method, path, status = status.as_u16(), request_charge, "cosmos request");

        let body = res.bytes().map_err(transport)?;
        if !status.is_success() {
            return Err(CosmosError::from_response(status, &String::from_utf8_lossy(&body)));
        }
        Ok((body.to_vec(), continuation, request_charge))
    }
}

fn header_text(res: &Response, name: &str) -> Option<String> {
    res.headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn feed_items<T: DeserializeOwned>(body: Vec<u8>, resource_type: ResourceType, path: &str) -> Result<Vec<T>> {
    let decode = |source| CosmosError::Decode {
        path: path.to_string(),
        source,
    };
    let mut feed: serde_json::Map<String, Value> = serde_json::from_slice(&body).map_err(decode)?;
    let items = feed
        .remove(resource_type.feed_key())
        .unwrap_or_else(|| Value::Array(Vec::new()));
    serde_json::from_value(items).map_err(decode)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn partition_key_header_escapes_non_ascii() {
        let headers = RequestOptions::partition_key("Zürich").headers().unwrap();
        assert_eq!(headers["x-ms-documentdb-partitionkey"], r#"["Z\u00fcrich"]"#);

        let headers = RequestOptions::partition_key("😀").headers().unwrap();
        assert_eq!(headers["x-ms-documentdb-partitionkey"], r#"["\ud83d\ude00"]"#);
    }

    #[test]
    fn ascii_partition_keys_pass_through() {
        let headers = RequestOptions::partition_key(json!(11229)).headers().unwrap();
        assert_eq!(headers["x-ms-documentdb-partitionkey"], "[11229]");
    }

    #[test]
    fn only_set_options_become_headers() {
        let options = RequestOptions {
            pre_triggers: vec!["trgValidateDocument".into()],
            max_item_count: Some(1),
            ..RequestOptions::cross_partition()
        };
        let headers = options.headers().unwrap();

        assert_eq!(headers.len(), 3);
        assert_eq!(headers["x-ms-documentdb-pre-trigger-include"], "trgValidateDocument");
        assert_eq!(headers["x-ms-max-item-count"], "1");
        assert_eq!(headers["x-ms-documentdb-query-enablecrosspartition"], "True");
    }
}
