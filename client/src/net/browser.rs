//! `fetch`-backed transport for the browser.
//!
//! Client-side (hydrate): real HTTP calls via `gloo-net`, raced against a
//! `gloo-timers` deadline.
//! Server-side (SSR): a stub that reports the server as unreachable, since
//! API calls are only issued from the browser.
//!
//! TRADE-OFFS
//! ==========
//! `fetch` has no native deadline. When the timer wins, the request future is
//! dropped and the browser may still complete the exchange in the
//! background; its response is discarded.

#[cfg(test)]
#[path = "browser_test.rs"]
mod browser_test;

use std::time::Duration;

use notex::config::ClientConfig;
use notex::net::transport::{ApiRequest, ApiResponse, Transport, TransportError};
#[cfg(feature = "hydrate")]
use notex::net::transport::{FormPart, HttpMethod, RequestBody};

#[derive(Debug, Clone)]
pub struct BrowserTransport {
    base_url: String,
    default_timeout: Duration,
}

impl BrowserTransport {
    pub fn new(config: &ClientConfig) -> Self {
        Self { base_url: config.base_url.clone(), default_timeout: config.timeouts.request() }
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Deadline for a request that does not carry its own.
    #[must_use]
    pub fn deadline(&self, request: &ApiRequest) -> Duration {
        request.timeout.unwrap_or(self.default_timeout)
    }
}

#[async_trait::async_trait(?Send)]
impl Transport for BrowserTransport {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, TransportError> {
        #[cfg(feature = "hydrate")]
        {
            use futures::future::Either;

            let deadline = self.deadline(&request);
            let prepared = build(&self.base_url, request)?;
            let exchange = async {
                let response = prepared
                    .send()
                    .await
                    .map_err(|e| TransportError::Unreachable(e.to_string()))?;
                let status = response.status();
                let body = response
                    .binary()
                    .await
                    .map_err(|e| TransportError::Unreachable(e.to_string()))?;
                Ok::<_, TransportError>(ApiResponse::new(status, body))
            };
            let timer = gloo_timers::future::sleep(deadline);

            match futures::future::select(Box::pin(exchange), Box::pin(timer)).await {
                Either::Left((outcome, _)) => outcome,
                Either::Right(((), _)) => Err(TransportError::TimedOut),
            }
        }
        #[cfg(not(feature = "hydrate"))]
        {
            Err(TransportError::Unreachable(format!(
                "{} {}: no browser transport outside the browser",
                request.method, request.path
            )))
        }
    }
}

#[cfg(feature = "hydrate")]
fn build(base_url: &str, request: ApiRequest) -> Result<gloo_net::http::Request, TransportError> {
    use gloo_net::http::{Method, RequestBuilder};

    let url = request.url(base_url)?;
    let method = match request.method {
        HttpMethod::Get => Method::GET,
        HttpMethod::Post => Method::POST,
        HttpMethod::Patch => Method::PATCH,
        HttpMethod::Put => Method::PUT,
        HttpMethod::Delete => Method::DELETE,
    };
    let mut builder = RequestBuilder::new(url.as_str()).method(method);
    for (name, value) in &request.headers {
        builder = builder.header(name, value);
    }
    let built = match request.body {
        RequestBody::Empty => builder.build(),
        RequestBody::Json(value) => builder.json(&value),
        RequestBody::Multipart(parts) => builder.body(form_data(parts)?),
    };
    built.map_err(|e| TransportError::InvalidRequest(e.to_string()))
}

/// Browser sets the multipart boundary itself, so no content type is set here.
#[cfg(feature = "hydrate")]
fn form_data(parts: Vec<FormPart>) -> Result<web_sys::FormData, TransportError> {
    let invalid = |e: wasm_bindgen::JsValue| TransportError::InvalidRequest(format!("{e:?}"));

    let form = web_sys::FormData::new().map_err(invalid)?;
    for part in parts {
        match part {
            FormPart::Text { name, value } => form.append_with_str(&name, &value).map_err(invalid)?,
            FormPart::File { name, file_name, content_type, bytes } => {
                let chunks = js_sys::Array::new();
                chunks.push(&js_sys::Uint8Array::from(bytes.as_slice()).into());
                let options = web_sys::BlobPropertyBag::new();
                options.set_type(&content_type);
                let blob =
                    web_sys::Blob::new_with_u8_array_sequence_and_options(&chunks, &options).map_err(invalid)?;
                form.append_with_blob_and_filename(&name, &blob, &file_name)
                    .map_err(invalid)?;
            }
        }
    }
    Ok(form)
}
