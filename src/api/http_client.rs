use reqwest::{Client, ClientBuilder, Response};
use std::time::Duration;

use super::client::ClientConfig;
use crate::error::{BidwatchError, Result};

/// Create an HTTP client with a hard per-request timeout
pub fn create_client(config: &ClientConfig) -> Result<Client> {
    let client = ClientBuilder::new()
        .timeout(Duration::from_secs(config.timeout))
        .connect_timeout(Duration::from_secs(config.timeout.min(10)))
        .user_agent(config.user_agent.as_str())
        .tcp_nodelay(true)
        .use_rustls_tls()
        .build()?;

    Ok(client)
}

/// Turn a non-2xx response into `HttpStatus`
pub fn ensure_success(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        Err(BidwatchError::HttpStatus {
            status: status.as_u16(),
            url: response.url().to_string(),
        })
    }
}
