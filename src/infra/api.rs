//! HTTP client for the users/products REST API.
//!
//! Every call carries a JSON content type, is bounded by the configured
//! timeout, and unwraps the response envelope to its payload. Failures are
//! reported once; retrying is the caller's concern.

use std::time::Instant;

use async_trait::async_trait;
use crudboard_api_types::{
    Envelope, NewProduct, NewUser, Product, ProductEnvelope, ProductsEnvelope, User, UserEnvelope,
    UsersEnvelope,
};
use reqwest::{
    Client, Method, StatusCode, Url,
    header::{ACCEPT, CONTENT_TYPE, HeaderMap, HeaderValue},
};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, warn};

use crate::application::records::RecordsApi;
use crate::config::ApiSettings;

use super::error::InfraError;

const USERS_PATH: &str = "users";
const PRODUCTS_PATH: &str = "products";

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("request to `{path}` timed out")]
    Timeout { path: String },
    #[error("network error calling `{path}`: {source}")]
    Network {
        path: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("`{path}` responded with status {status}")]
    Status { path: String, status: StatusCode },
    #[error("failed to decode response from `{path}`: {source}")]
    Decode {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid request path `{path}`: {source}")]
    Url {
        path: String,
        #[source]
        source: url::ParseError,
    },
}

impl ApiError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, ApiError::Timeout { .. })
    }

    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    fn transport(path: &str, source: reqwest::Error) -> Self {
        if source.is_timeout() {
            ApiError::Timeout {
                path: path.to_string(),
            }
        } else {
            ApiError::Network {
                path: path.to_string(),
                source,
            }
        }
    }
}

#[derive(Clone, Debug)]
pub struct ApiClient {
    client: Client,
    base: Url,
}

impl ApiClient {
    pub fn new(settings: &ApiSettings) -> Result<Self, InfraError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .user_agent(Self::user_agent())
            .default_headers(headers)
            .timeout(settings.timeout)
            .build()
            .map_err(|err| InfraError::http_client(err.to_string()))?;

        Ok(Self {
            client,
            base: settings.base_url.clone(),
        })
    }

    pub fn user_agent() -> &'static str {
        concat!("crudboard/", env!("CARGO_PKG_VERSION"))
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    /// Resolve `path` beneath the base URL; a leading `/` does not escape it.
    pub fn url(&self, path: &str) -> Result<Url, ApiError> {
        self.base
            .join(path.trim_start_matches('/'))
            .map_err(|source| ApiError::Url {
                path: path.to_string(),
                source,
            })
    }

    pub async fn get<E: Envelope>(&self, path: &str) -> Result<E::Inner, ApiError> {
        self.send::<E, ()>(Method::GET, path, None).await
    }

    pub async fn post<E, B>(&self, path: &str, body: &B) -> Result<E::Inner, ApiError>
    where
        E: Envelope,
        B: Serialize + ?Sized,
    {
        self.send::<E, B>(Method::POST, path, Some(body)).await
    }

    async fn send<E, B>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<E::Inner, ApiError>
    where
        E: Envelope,
        B: Serialize + ?Sized,
    {
        let url = self.url(path)?;
        let started = Instant::now();

        let mut request = self.client.request(method.clone(), url);
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request
            .send()
            .await
            .map_err(|source| ApiError::transport(path, source))?;
        let status = response.status();
        let bytes = response
            .bytes()
            .await
            .map_err(|source| ApiError::transport(path, source))?;
        let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

        if !status.is_success() {
            warn!(
                method = %method,
                path,
                status = status.as_u16(),
                elapsed_ms,
                body = %String::from_utf8_lossy(&bytes),
                "API request failed"
            );
            return Err(ApiError::Status {
                path: path.to_string(),
                status,
            });
        }

        let envelope: E = serde_json::from_slice(&bytes).map_err(|source| ApiError::Decode {
            path: path.to_string(),
            source,
        })?;
        debug!(
            method = %method,
            path,
            status = status.as_u16(),
            elapsed_ms,
            "API request completed"
        );
        Ok(envelope.into_inner())
    }
}

#[async_trait]
impl RecordsApi for ApiClient {
    async fn list_users(&self) -> Result<Vec<User>, ApiError> {
        self.get::<UsersEnvelope>(USERS_PATH).await
    }

    async fn create_user(&self, user: &NewUser) -> Result<User, ApiError> {
        self.post::<UserEnvelope, _>(USERS_PATH, user).await
    }

    async fn list_products(&self) -> Result<Vec<Product>, ApiError> {
        self.get::<ProductsEnvelope>(PRODUCTS_PATH).await
    }

    async fn create_product(&self, product: &NewProduct) -> Result<Product, ApiError> {
        self.post::<ProductEnvelope, _>(PRODUCTS_PATH, product)
            .await
    }
}
