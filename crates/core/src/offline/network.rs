use std::{future::Future, time::Duration};

use reqwest::{header::CONTENT_TYPE, Client};

use super::{NetworkError, Request, Response};

/// Something that can fetch a request over the network.
pub trait Network: Send + Sync + 'static {
    /// Fetch `request`. HTTP error statuses resolve successfully; only transport failures are
    /// errors. May stay pending indefinitely when there is no connectivity.
    fn fetch(&self, request: &Request)
        -> impl Future<Output = Result<Response, NetworkError>> + Send;
}

/// [`Network`] backed by `reqwest`.
#[derive(Debug, Clone)]
pub struct HttpNetwork {
    client: Client,
}

impl HttpNetwork {
    /// Client with a request timeout so a dead link cannot hold a refresh open forever.
    pub fn new(timeout: Duration) -> Result<Self, NetworkError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| NetworkError::Transport {
                url: String::new(),
                message: err.to_string(),
            })?;
        Ok(Self { client })
    }
}

impl Network for HttpNetwork {
    async fn fetch(&self, request: &Request) -> Result<Response, NetworkError> {
        let transport = |err: reqwest::Error| NetworkError::Transport {
            url: request.url.to_string(),
            message: err.to_string(),
        };

        let response = self
            .client
            .request(request.method.clone(), request.url.clone())
            .send()
            .await
            .map_err(transport)?;
        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        let body = response.bytes().await.map_err(transport)?.to_vec();

        Ok(Response {
            status,
            content_type,
            body,
        })
    }
}
