//! Web page sources.

use crate::parser::{parse_bytes, ContentType};
use kbchat_core::{AppError, AppResult};
use std::time::Duration;

const FETCH_TIMEOUT_SECS: u64 = 30;

/// Bytes read per page; anything beyond is dropped.
pub const MAX_PAGE_BYTES: usize = 2 * 1024 * 1024;

/// A fetched page, reduced to text.
#[derive(Debug, Clone)]
pub struct WebDocument {
    pub url: String,
    pub content_type: ContentType,
    pub text: String,
}

/// HTTP client used for fetching web sources.
pub fn build_client() -> AppResult<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(FETCH_TIMEOUT_SECS))
        .user_agent(concat!("kbchat/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| AppError::Knowledge(format!("Failed to create HTTP client: {}", e)))
}

/// Fetch a URL and extract its text.
///
/// Pages without a recognizable content type are treated as HTML.
pub async fn fetch_url(client: &reqwest::Client, url: &str) -> AppResult<WebDocument> {
    fetch_url_capped(client, url, MAX_PAGE_BYTES).await
}

async fn fetch_url_capped(
    client: &reqwest::Client,
    url: &str,
    max_bytes: usize,
) -> AppResult<WebDocument> {
    let parsed = reqwest::Url::parse(url)
        .map_err(|e| AppError::Knowledge(format!("Invalid URL '{}': {}", url, e)))?;

    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(AppError::Knowledge(format!(
            "Unsupported URL scheme '{}' in '{}'",
            parsed.scheme(),
            url
        )));
    }

    tracing::debug!("Fetching {}", url);

    let response = client
        .get(parsed)
        .send()
        .await
        .map_err(|e| AppError::Knowledge(format!("Failed to fetch {}: {}", url, e)))?;

    let status = response.status();
    if !status.is_success() {
        return Err(AppError::Knowledge(format!(
            "Fetching {} returned {}",
            url, status
        )));
    }

    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(ContentType::from_mime)
        .filter(ContentType::is_ingestible)
        .unwrap_or(ContentType::Html);

    let bytes = read_body(response, max_bytes, url).await?;
    let text = parse_bytes(&bytes, content_type)?;

    Ok(WebDocument {
        url: url.to_string(),
        content_type,
        text,
    })
}

/// Read at most `max_bytes` of the body, trimming a UTF-8 sequence cut at the limit.
async fn read_body(
    mut response: reqwest::Response,
    max_bytes: usize,
    url: &str,
) -> AppResult<Vec<u8>> {
    let mut body = Vec::new();

    while let Some(chunk) = response
        .chunk()
        .await
        .map_err(|e| AppError::Knowledge(format!("Failed to read body of {}: {}", url, e)))?
    {
        let remaining = max_bytes - body.len();
        if chunk.len() > remaining {
            body.extend_from_slice(&chunk[..remaining]);
            tracing::warn!("{} exceeds {} bytes, truncating", url, max_bytes);
            if let Err(e) = std::str::from_utf8(&body) {
                if e.error_len().is_none() {
                    body.truncate(e.valid_up_to());
                }
            }
            break;
        }
        body.extend_from_slice(&chunk);
    }

    Ok(body)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_rejects_invalid_url() {
        let client = build_client().unwrap();
        let err = fetch_url(&client, "not a url").await.unwrap_err();
        assert!(err.to_string().contains("Invalid URL"));
    }

    #[tokio::test]
    async fn test_rejects_non_http_scheme() {
        let client = build_client().unwrap();
        let err = fetch_url(&client, "file:///etc/passwd").await.unwrap_err();
        assert!(err.to_string().contains("Unsupported URL scheme"));
    }

    #[tokio::test]
    async fn test_unreachable_host_is_knowledge_error() {
        let client = build_client().unwrap();
        let result = fetch_url(&client, "http://127.0.0.1:9/page").await;
        assert!(matches!(result, Err(AppError::Knowledge(_))));
    }

    /// Serve one canned HTTP response on a local port.
    async fn serve_once(content_type: &'static str, body: &'static str) -> String {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = [0u8; 1024];
            let _ = socket.read(&mut request).await;
            let response = format!(
                "HTTP/1.1 200 OK\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                content_type,
                body.len(),
                body
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            let _ = socket.shutdown().await;
        });

        format!("http://{}/page", addr)
    }

    #[tokio::test]
    async fn test_body_is_capped() {
        let url = serve_once("text/plain", "0123456789abcdef").await;
        let client = build_client().unwrap();

        let page = fetch_url_capped(&client, &url, 10).await.unwrap();
        assert_eq!(page.text, "0123456789");
        assert_eq!(page.content_type, ContentType::PlainText);
    }

    #[tokio::test]
    async fn test_cap_does_not_split_multibyte_chars() {
        let url = serve_once("text/plain; charset=utf-8", "caf\u{e9}s").await;
        let client = build_client().unwrap();

        // "caf" is 3 bytes and "\u{e9}" takes two more; a 4-byte cap cuts it in half.
        let page = fetch_url_capped(&client, &url, 4).await.unwrap();
        assert_eq!(page.text, "caf");
    }

    #[tokio::test]
    async fn test_html_page_entities_are_decoded() {
        let url = serve_once("text/html", "<p>Fees &#8212; none</p>").await;
        let client = build_client().unwrap();

        let page = fetch_url(&client, &url).await.unwrap();
        assert_eq!(page.text, "Fees \u{2014} none");
    }
}
