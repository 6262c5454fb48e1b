//! Remote cart store over the storefront REST API.

use async_trait::async_trait;
use boutique_core::{LineItem, Order, ProductId};
use reqwest::{Method, RequestBuilder, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};
use url::Url;
use uuid::Uuid;

use super::{RemoteCartStore, RemoteError};
use crate::config::ClientConfig;

/// Sent on every call so server logs can be matched to client logs.
const REQUEST_ID_HEADER: &str = "x-request-id";

/// Thin JSON-over-HTTP wrapper shared by the cart and auth clients.
#[derive(Debug, Clone)]
pub(crate) struct ApiClient {
    client: reqwest::Client,
    config: ClientConfig,
}

impl ApiClient {
    pub(crate) fn new(config: &ClientConfig) -> Result<Self, RemoteError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("boutique-client/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| RemoteError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            config: config.clone(),
        })
    }

    pub(crate) fn endpoint(&self, path: &str) -> Result<Url, RemoteError> {
        self.config
            .endpoint(path)
            .map_err(|e| RemoteError::Transport(format!("invalid endpoint {path}: {e}")))
    }

    /// `{base}/{path}/{segment}` with `segment` percent-encoded.
    pub(crate) fn endpoint_with_segment(
        &self,
        path: &str,
        segment: &str,
    ) -> Result<Url, RemoteError> {
        let mut url = self.endpoint(path)?;
        url.path_segments_mut()
            .map_err(|()| RemoteError::Transport("API URL cannot be a base".to_string()))?
            .push(segment);
        Ok(url)
    }

    pub(crate) fn request(
        &self,
        method: Method,
        url: Url,
        token: Option<&SecretString>,
    ) -> RequestBuilder {
        let request_id = Uuid::new_v4().to_string();
        debug!(%method, path = url.path(), %request_id, "API request");
        let builder = self
            .client
            .request(method, url)
            .header(REQUEST_ID_HEADER, request_id);
        match token {
            Some(token) => builder.bearer_auth(token.expose_secret()),
            None => builder,
        }
    }

    pub(crate) async fn send<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
    ) -> Result<T, RemoteError> {
        let response = request.send().await.map_err(classify)?;
        let status = response.status();
        let body = response.bytes().await.map_err(classify)?;

        if !status.is_success() {
            return Err(error_for_status(status, &body));
        }

        serde_json::from_slice(&body).map_err(|e| RemoteError::Decode(e.to_string()))
    }
}

fn classify(error: reqwest::Error) -> RemoteError {
    if error.is_timeout() {
        RemoteError::Timeout
    } else if error.is_decode() {
        RemoteError::Decode(error.to_string())
    } else {
        RemoteError::Transport(error.to_string())
    }
}

/// Map a non-success response onto [`RemoteError`], keeping the server's
/// `{"message": ...}` text when there is one.
fn error_for_status(status: StatusCode, body: &[u8]) -> RemoteError {
    #[derive(Deserialize)]
    struct ErrorBody {
        #[serde(alias = "error")]
        message: String,
    }

    let message = serde_json::from_slice::<ErrorBody>(body).map_or_else(
        |_| {
            status
                .canonical_reason()
                .unwrap_or("request failed")
                .to_string()
        },
        |body| body.message,
    );

    match status {
        StatusCode::UNAUTHORIZED => RemoteError::Unauthorized,
        StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
            RemoteError::Validation(message)
        }
        StatusCode::NOT_FOUND => RemoteError::NotFound(message),
        _ => RemoteError::Status { status, message },
    }
}

#[derive(Deserialize)]
struct CartResponse {
    items: Vec<LineItem>,
}

#[derive(Serialize)]
struct QuantityRequest {
    quantity: u32,
}

#[derive(Serialize)]
struct MergeRequest<'a> {
    items: &'a [LineItem],
}

/// [`RemoteCartStore`] backed by the storefront's `/cart` endpoints.
#[derive(Debug, Clone)]
pub struct HttpCartClient {
    api: ApiClient,
}

impl HttpCartClient {
    /// Create a client for the API at `config.api_url`.
    ///
    /// # Errors
    ///
    /// Returns [`RemoteError::Transport`] if the HTTP client fails to build.
    pub fn new(config: &ClientConfig) -> Result<Self, RemoteError> {
        Ok(Self {
            api: ApiClient::new(config)?,
        })
    }

    async fn cart(&self, request: RequestBuilder) -> Result<Vec<LineItem>, RemoteError> {
        let cart: CartResponse = self.api.send(request).await?;
        Ok(cart.items)
    }

    /// The account's past orders, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`RemoteError::Unauthorized`] if the token is rejected.
    #[instrument(skip_all)]
    pub async fn orders(&self, token: &SecretString) -> Result<Vec<Order>, RemoteError> {
        let url = self.api.endpoint("orders")?;
        self.api
            .send(self.api.request(Method::GET, url, Some(token)))
            .await
    }
}

#[async_trait]
impl RemoteCartStore for HttpCartClient {
    #[instrument(skip_all)]
    async fn fetch(&self, token: &SecretString) -> Result<Vec<LineItem>, RemoteError> {
        let url = self.api.endpoint("cart")?;
        self.cart(self.api.request(Method::GET, url, Some(token)))
            .await
    }

    #[instrument(skip_all, fields(product_id = %item.product_id))]
    async fn add_item(
        &self,
        token: &SecretString,
        item: &LineItem,
    ) -> Result<Vec<LineItem>, RemoteError> {
        let url = self.api.endpoint("cart/items")?;
        self.cart(self.api.request(Method::POST, url, Some(token)).json(item))
            .await
    }

    #[instrument(skip_all, fields(product_id = %product_id, quantity = quantity))]
    async fn set_quantity(
        &self,
        token: &SecretString,
        product_id: &ProductId,
        quantity: u32,
    ) -> Result<Vec<LineItem>, RemoteError> {
        let url = self
            .api
            .endpoint_with_segment("cart/items", product_id.as_str())?;
        self.cart(
            self.api
                .request(Method::PUT, url, Some(token))
                .json(&QuantityRequest { quantity }),
        )
        .await
    }

    #[instrument(skip_all, fields(product_id = %product_id))]
    async fn remove_item(
        &self,
        token: &SecretString,
        product_id: &ProductId,
    ) -> Result<Vec<LineItem>, RemoteError> {
        let url = self
            .api
            .endpoint_with_segment("cart/items", product_id.as_str())?;
        self.cart(self.api.request(Method::DELETE, url, Some(token)))
            .await
    }

    #[instrument(skip_all)]
    async fn clear(&self, token: &SecretString) -> Result<Vec<LineItem>, RemoteError> {
        let url = self.api.endpoint("cart")?;
        self.cart(self.api.request(Method::DELETE, url, Some(token)))
            .await
    }

    #[instrument(skip_all, fields(lines = items.len()))]
    async fn merge(
        &self,
        token: &SecretString,
        items: &[LineItem],
    ) -> Result<Vec<LineItem>, RemoteError> {
        let url = self.api.endpoint("cart/merge")?;
        self.cart(
            self.api
                .request(Method::POST, url, Some(token))
                .json(&MergeRequest { items }),
        )
        .await
    }

    #[instrument(skip_all)]
    async fn checkout(&self, token: &SecretString) -> Result<Order, RemoteError> {
        let url = self.api.endpoint("orders")?;
        self.api
            .send(self.api.request(Method::POST, url, Some(token)))
            .await
    }
}
