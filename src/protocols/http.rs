use std::time::Duration;

use hyper::{Request, Uri};
use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;

pub type HyperHttpClient = hyper::Client<hyper::client::HttpConnector>;

#[derive(Debug, Error)]
pub enum RequestError {
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("transport error: {0}")]
    Transport(#[from] hyper::Error),

    #[error("failed to build request: {0}")]
    Request(#[from] hyper::http::Error),

    #[error("failed to serialize request body: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("failed to decode response body: {0}")]
    Decode(#[from] serde_path_to_error::Error<serde_json::Error>),
}

pub fn mk_hyper_http_client() -> HyperHttpClient {
    // The bridge closes idle keep-alive connections quickly, don't hold on to them
    hyper::Client::builder()
        .pool_idle_timeout(Duration::from_secs(5))
        .build_http()
}

async fn send_request<T: DeserializeOwned>(
    client: &HyperHttpClient,
    request: Request<hyper::Body>,
    timeout: Duration,
) -> Result<T, RequestError> {
    let exchange = async {
        let result = client.request(request).await?;
        let body_bytes = hyper::body::to_bytes(result.into_body()).await?;
        Ok::<_, hyper::Error>(body_bytes)
    };

    let body_bytes = tokio::time::timeout(timeout, exchange)
        .await
        .map_err(|_| RequestError::Timeout(timeout))??;

    let de = &mut serde_json::Deserializer::from_slice(&body_bytes);
    let response: T = serde_path_to_error::deserialize(de)?;

    Ok(response)
}

pub async fn mk_get_request<T: DeserializeOwned>(
    client: &HyperHttpClient,
    uri: &Uri,
    timeout: Duration,
) -> Result<T, RequestError> {
    let request = Request::builder()
        .method("GET")
        .uri(uri)
        .body(hyper::Body::empty())?;

    send_request(client, request, timeout).await
}

pub async fn mk_put_request<RequestBody, ResponseBody>(
    client: &HyperHttpClient,
    uri: &Uri,
    body: &RequestBody,
    timeout: Duration,
) -> Result<ResponseBody, RequestError>
where
    RequestBody: Serialize,
    ResponseBody: DeserializeOwned,
{
    let body = serde_json::to_string(body).map_err(RequestError::Encode)?;

    let request = Request::builder()
        .method("PUT")
        .header("content-type", "application/json")
        .uri(uri)
        .body(body.into())?;

    send_request(client, request, timeout).await
}
