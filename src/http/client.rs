use super::debug::{
    HttpDebugConfig, redact_body, redact_header_value, redact_url, truncate_for_log,
};
use reqwest::header::HeaderMap;
use reqwest::{Client, Request, Response};
use serde::Serialize;
use std::fmt;
use tracing::debug;

/// Thin wrapper over `reqwest::Client` that logs upstream traffic when debug
/// output is enabled.
#[derive(Clone)]
pub struct HttpClient {
    inner: Client,
    debug: HttpDebugConfig,
}

impl fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpClient")
            .field("debug", &self.debug)
            .finish()
    }
}

impl HttpClient {
    pub fn new(inner: Client, debug: HttpDebugConfig) -> Self {
        Self { inner, debug }
    }

    /// Sends the request and reads the whole body.
    pub async fn post_json<T: Serialize + ?Sized>(
        &self,
        url: &str,
        bearer: &str,
        payload: &T,
    ) -> Result<HttpResponseData, reqwest::Error> {
        let response = self.send(url, bearer, payload).await?;
        let status = response.status().as_u16();
        let headers = response.headers().clone();
        let body = response.text().await?;

        self.log_lines(response_log_lines(self.debug, status, &headers, Some(&body)));
        Ok(HttpResponseData { status, body })
    }

    /// Sends the request and hands back the response with its body unread.
    pub async fn post_json_streaming<T: Serialize + ?Sized>(
        &self,
        url: &str,
        bearer: &str,
        payload: &T,
    ) -> Result<Response, reqwest::Error> {
        let response = self.send(url, bearer, payload).await?;
        self.log_lines(response_log_lines(
            self.debug,
            response.status().as_u16(),
            response.headers(),
            None,
        ));
        Ok(response)
    }

    async fn send<T: Serialize + ?Sized>(
        &self,
        url: &str,
        bearer: &str,
        payload: &T,
    ) -> Result<Response, reqwest::Error> {
        let request = self
            .inner
            .post(url)
            .bearer_auth(bearer)
            .json(payload)
            .build()?;

        if self.debug.enabled {
            let body = serde_json::to_string(payload)
                .unwrap_or_else(|err| format!("<serialization failed: {err}>"));
            self.log_lines(request_log_lines(self.debug, &request, &body));
        }

        self.inner.execute(request).await.inspect_err(|err| {
            debug!(target: "climate_chat::http", error = %err, "upstream request failed");
        })
    }

    fn log_lines(&self, lines: Vec<String>) {
        if !self.debug.enabled {
            return;
        }
        for line in lines {
            debug!(target: "climate_chat::http", "{line}");
        }
    }
}

fn request_log_lines(debug: HttpDebugConfig, request: &Request, body_json: &str) -> Vec<String> {
    let mut lines = vec![format!(
        "> {} {}",
        request.method(),
        redact_url(request.url(), debug.redact_secrets)
    )];
    push_headers(&mut lines, '>', debug, request.headers());
    let body = truncate_for_log(
        &redact_body(body_json, debug.redact_secrets),
        debug.max_body_chars,
    );
    push_body(&mut lines, '>', &body);
    lines
}

fn response_log_lines(
    debug: HttpDebugConfig,
    status: u16,
    headers: &HeaderMap,
    body: Option<&str>,
) -> Vec<String> {
    let mut lines = vec![format!("< HTTP {status}")];
    push_headers(&mut lines, '<', debug, headers);
    match body {
        Some(body) => {
            let body = truncate_for_log(
                &redact_body(body, debug.redact_secrets),
                debug.max_body_chars,
            );
            push_body(&mut lines, '<', &body);
        }
        None => lines.push("< <streamed body>".to_string()),
    }
    lines
}

fn push_headers(
    lines: &mut Vec<String>,
    direction: char,
    debug: HttpDebugConfig,
    headers: &HeaderMap,
) {
    for (name, value) in headers {
        lines.push(format!(
            "{direction} {}: {}",
            name.as_str(),
            redact_header_value(name.as_str(), value, debug.redact_secrets)
        ));
    }
}

fn push_body(lines: &mut Vec<String>, direction: char, body: &str) {
    if body.is_empty() {
        lines.push(format!("{direction} <empty body>"));
        return;
    }
    lines.extend(body.lines().map(|line| format!("{direction} {line}")));
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponseData {
    pub status: u16,
    pub body: String,
}

#[cfg(test)]
mod tests {
    use super::{HttpClient, HttpResponseData, request_log_lines, response_log_lines};
    use crate::http::debug::HttpDebugConfig;
    use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
    use reqwest::{Client, Method, Request, Url};
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn post_json_sends_bearer_and_reads_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/test"))
            .and(header("authorization", "Bearer secret-key"))
            .and(body_json(json!({"hello": "world"})))
            .respond_with(ResponseTemplate::new(200).set_body_string("{\"ok\":true}"))
            .expect(1)
            .mount(&server)
            .await;

        let client = HttpClient::new(Client::new(), HttpDebugConfig::from_flag(true));
        let response = client
            .post_json(
                &format!("{}/v1/test", server.uri()),
                "secret-key",
                &json!({"hello": "world"}),
            )
            .await
            .expect("request should succeed");

        assert_eq!(
            response,
            HttpResponseData {
                status: 200,
                body: "{\"ok\":true}".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn post_json_streaming_leaves_body_unread() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503).set_body_string("busy"))
            .mount(&server)
            .await;

        let client = HttpClient::new(Client::new(), HttpDebugConfig::disabled());
        let response = client
            .post_json_streaming(&server.uri(), "k", &json!({}))
            .await
            .expect("request should succeed");

        assert_eq!(response.status().as_u16(), 503);
        assert_eq!(response.text().await.expect("body"), "busy");
    }

    #[test]
    fn request_log_lines_redact_credentials() {
        let debug = HttpDebugConfig::from_flag(true);
        let mut request = Request::new(
            Method::POST,
            Url::parse("https://api.example.com/chat/completions").expect("url"),
        );
        request
            .headers_mut()
            .insert(AUTHORIZATION, HeaderValue::from_static("Bearer gsk_secret"));

        let lines = request_log_lines(debug, &request, r#"{"api_key":"abc","model":"m"}"#);
        insta::assert_snapshot!(lines.join("\n"), @r#"
        > POST https://api.example.com/chat/completions
        > authorization: ***REDACTED***
        > {"api_key":"***REDACTED***","model":"m"}
        "#);
    }

    #[test]
    fn response_log_lines_mark_streamed_bodies() {
        let debug = HttpDebugConfig::from_flag(true);
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("text/event-stream"));

        let lines = response_log_lines(debug, 200, &headers, None);
        assert_eq!(
            lines,
            vec![
                "< HTTP 200".to_string(),
                "< content-type: text/event-stream".to_string(),
                "< <streamed body>".to_string(),
            ]
        );
    }

    #[test]
    fn response_log_lines_truncate_long_bodies() {
        let debug = HttpDebugConfig {
            enabled: true,
            redact_secrets: true,
            max_body_chars: 5,
        };
        let lines = response_log_lines(debug, 500, &HeaderMap::new(), Some("0123456789"));
        assert_eq!(lines.last().map(String::as_str), Some("< 01234... <truncated 5 chars>"));
    }
}
