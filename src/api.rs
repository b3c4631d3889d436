//! Client for the `/get_info` and `/download` backend endpoints.
//!
//! The content-type sniffing of download replies happens here and nowhere
//! else: callers receive a [`DownloadReply`] and never look at headers.

use async_trait::async_trait;
use reqwest::{
    Client, Response, StatusCode,
    header::{CONTENT_DISPOSITION, CONTENT_TYPE, HeaderName},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::disposition::filename_from_disposition;
use crate::model::VideoInfo;

/// What a non-2xx body told us about the failure
#[derive(Debug, Clone, PartialEq)]
pub enum ServerMessage {
    /// The body was JSON with an `error` string
    Provided(String),
    /// The body was JSON without a usable `error`
    Absent,
    /// The body was not JSON at all
    Unreadable,
}

impl ServerMessage {
    /// Picks the text to show, given fallbacks for the two failure shapes
    pub fn or_fallback(&self, absent: &str, unreadable: &str) -> String {
        match self {
            ServerMessage::Provided(msg) => msg.clone(),
            ServerMessage::Absent => absent.to_string(),
            ServerMessage::Unreadable => unreadable.to_string(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("server returned {status}")]
    Http {
        status: StatusCode,
        message: ServerMessage,
    },
    #[error("connection error: {0}")]
    Connection(String),
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        ApiError::Connection(err.to_string())
    }
}

/// Successful `/download` reply, already classified by content type
#[derive(Debug, Clone, PartialEq)]
pub enum DownloadReply {
    /// JSON body; `None` when it carried no `download_url`
    DirectLink(Option<String>),
    /// Raw file bytes, with the name from `Content-Disposition` if any
    File {
        bytes: Vec<u8>,
        suggested_name: Option<String>,
    },
}

/// The two backend calls the controller depends on
#[async_trait]
pub trait Backend: Send + Sync {
    async fn get_info(&self, url: &str) -> Result<VideoInfo, ApiError>;

    async fn request_download(&self, url: &str, format_id: &str)
    -> Result<DownloadReply, ApiError>;
}

#[derive(Serialize)]
struct InfoRequest<'a> {
    url: &'a str,
}

#[derive(Serialize)]
struct DownloadRequest<'a> {
    url: &'a str,
    format_id: &'a str,
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error: Option<serde_json::Value>,
}

#[derive(Deserialize)]
struct LinkBody {
    #[serde(default)]
    download_url: Option<String>,
}

/// Reads a non-2xx body into a [`ServerMessage`]
pub fn parse_error_body(body: &[u8]) -> ServerMessage {
    let error = match serde_json::from_slice::<ErrorBody>(body) {
        Ok(body) => body.error,
        Err(_) => return ServerMessage::Unreadable,
    };
    match error {
        None | Some(serde_json::Value::Null) => ServerMessage::Absent,
        Some(serde_json::Value::String(msg)) if msg.is_empty() => ServerMessage::Absent,
        Some(serde_json::Value::String(msg)) => ServerMessage::Provided(msg),
        Some(other) => ServerMessage::Provided(other.to_string()),
    }
}

/// Classifies a 2xx `/download` reply
pub fn classify_download(
    content_type: Option<&str>,
    disposition: Option<&str>,
    body: Vec<u8>,
) -> Result<DownloadReply, ApiError> {
    let is_json = content_type
        .map(|ct| ct.to_ascii_lowercase().contains("application/json"))
        .unwrap_or(false);

    if is_json {
        let link: LinkBody = serde_json::from_slice(&body)
            .map_err(|e| ApiError::Connection(format!("invalid JSON reply: {e}")))?;
        return Ok(DownloadReply::DirectLink(
            link.download_url.filter(|u| !u.is_empty()),
        ));
    }

    Ok(DownloadReply::File {
        bytes: body,
        suggested_name: disposition.and_then(filename_from_disposition),
    })
}

/// reqwest-backed [`Backend`]
pub struct HttpBackend {
    client: Client,
    base_url: String,
}

impl HttpBackend {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    async fn fail(resp: Response) -> ApiError {
        let status = resp.status();
        let message = match resp.bytes().await {
            Ok(body) => parse_error_body(&body),
            Err(_) => ServerMessage::Unreadable,
        };
        warn!(%status, ?message, "backend reported an error");
        ApiError::Http { status, message }
    }
}

#[async_trait]
impl Backend for HttpBackend {
    async fn get_info(&self, url: &str) -> Result<VideoInfo, ApiError> {
        debug!(url, "requesting video info");
        let resp = self
            .client
            .post(self.endpoint("get_info"))
            .json(&InfoRequest { url })
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(Self::fail(resp).await);
        }

        let info: VideoInfo = resp.json().await?;
        info!(
            title = info.title.as_deref().unwrap_or(""),
            formats = info.formats.as_ref().map_or(0, Vec::len),
            "received video info"
        );
        Ok(info)
    }

    async fn request_download(
        &self,
        url: &str,
        format_id: &str,
    ) -> Result<DownloadReply, ApiError> {
        debug!(url, format_id, "requesting download");
        let resp = self
            .client
            .post(self.endpoint("download"))
            .json(&DownloadRequest { url, format_id })
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(Self::fail(resp).await);
        }

        let header = |name: HeaderName| {
            resp.headers()
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        };
        let content_type = header(CONTENT_TYPE);
        let disposition = header(CONTENT_DISPOSITION);
        let body = resp.bytes().await?.to_vec();

        let reply = classify_download(content_type.as_deref(), disposition.as_deref(), body)?;
        match &reply {
            DownloadReply::DirectLink(link) => {
                info!(has_link = link.is_some(), "download reply is a direct link")
            }
            DownloadReply::File { bytes, .. } => {
                info!(size = bytes.len(), "download reply carries file bytes")
            }
        }
        Ok(reply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{response, serve_once};

    #[test]
    fn error_body_shapes() {
        assert_eq!(
            parse_error_body(br#"{"error":"Invalid URL or video unavailable."}"#),
            ServerMessage::Provided("Invalid URL or video unavailable.".into())
        );
        assert_eq!(parse_error_body(b"{}"), ServerMessage::Absent);
        assert_eq!(parse_error_body(b"<html>502</html>"), ServerMessage::Unreadable);
    }

    #[test]
    fn non_string_error_is_still_a_message() {
        assert_eq!(
            parse_error_body(br#"{"error":404}"#),
            ServerMessage::Provided("404".into())
        );
        assert_eq!(
            parse_error_body(br#"{"error":{"code":"gone"}}"#),
            ServerMessage::Provided(r#"{"code":"gone"}"#.into())
        );
        assert_eq!(parse_error_body(br#"{"error":null}"#), ServerMessage::Absent);
        assert_eq!(parse_error_body(br#"{"error":""}"#), ServerMessage::Absent);
    }

    #[test]
    fn fallbacks_follow_message_shape() {
        assert_eq!(ServerMessage::Absent.or_fallback("a", "u"), "a");
        assert_eq!(ServerMessage::Unreadable.or_fallback("a", "u"), "u");
        assert_eq!(ServerMessage::Provided("x".into()).or_fallback("a", "u"), "x");
    }

    #[test]
    fn json_reply_is_a_direct_link() {
        let reply = classify_download(
            Some("application/json; charset=utf-8"),
            Some(r#"attachment; filename="ignored.mp4""#),
            br#"{"download_url":"https://x/y.mp4","title":"t"}"#.to_vec(),
        )
        .unwrap();
        assert_eq!(reply, DownloadReply::DirectLink(Some("https://x/y.mp4".into())));
    }

    #[test]
    fn json_reply_without_link() {
        let reply = classify_download(Some("application/json"), None, b"{}".to_vec()).unwrap();
        assert_eq!(reply, DownloadReply::DirectLink(None));
    }

    #[test]
    fn other_content_types_are_files() {
        let reply = classify_download(
            Some("video/mp4"),
            Some(r#"attachment; filename="Server Name.mp4""#),
            vec![0, 1, 2],
        )
        .unwrap();
        assert_eq!(
            reply,
            DownloadReply::File {
                bytes: vec![0, 1, 2],
                suggested_name: Some("Server Name.mp4".into()),
            }
        );

        let reply = classify_download(None, None, vec![9]).unwrap();
        assert_eq!(
            reply,
            DownloadReply::File {
                bytes: vec![9],
                suggested_name: None,
            }
        );
    }

    #[test]
    fn endpoint_joins_without_double_slash() {
        let backend = HttpBackend::new("http://localhost:5000/");
        assert_eq!(backend.endpoint("get_info"), "http://localhost:5000/get_info");
    }

    async fn backend_serving(raw: Vec<u8>) -> HttpBackend {
        HttpBackend::new(serve_once(raw).await)
    }

    #[tokio::test]
    async fn http_info_is_decoded() {
        let body = br#"{"title":"Clip","formats":[{"id":"18","label":"360p"}]}"#;
        let backend =
            backend_serving(response("200 OK", &[("Content-Type", "application/json")], body))
                .await;
        let info = backend.get_info("https://youtu.be/x").await.unwrap();
        assert_eq!(info.title.as_deref(), Some("Clip"));
        assert_eq!(info.formats.unwrap()[0].ext_or_default(), "mp4");
    }

    #[tokio::test]
    async fn http_info_with_invalid_json_is_a_connection_error() {
        let backend =
            backend_serving(response("200 OK", &[("Content-Type", "text/plain")], b"not json"))
                .await;
        let err = backend.get_info("https://youtu.be/x").await.unwrap_err();
        assert!(matches!(err, ApiError::Connection(_)), "{err:?}");
    }

    #[tokio::test]
    async fn http_json_download_reply_is_a_direct_link() {
        let backend = backend_serving(response(
            "200 OK",
            &[("Content-Type", "application/json")],
            br#"{"download_url":"https://x/y.mp4"}"#,
        ))
        .await;
        let reply = backend.request_download("https://youtu.be/x", "22").await.unwrap();
        assert_eq!(reply, DownloadReply::DirectLink(Some("https://x/y.mp4".into())));
    }

    #[tokio::test]
    async fn http_file_reply_reads_disposition() {
        let backend = backend_serving(response(
            "200 OK",
            &[
                ("Content-Type", "video/mp4"),
                ("Content-Disposition", "attachment; filename*=UTF-8''My%20Clip.mp4"),
            ],
            &[0, 1, 2, 3],
        ))
        .await;
        let reply = backend.request_download("https://youtu.be/x", "22").await.unwrap();
        assert_eq!(
            reply,
            DownloadReply::File {
                bytes: vec![0, 1, 2, 3],
                suggested_name: Some("My Clip.mp4".into()),
            }
        );
    }

    #[tokio::test]
    async fn http_error_status_carries_server_message() {
        let backend = backend_serving(response(
            "500 Internal Server Error",
            &[("Content-Type", "application/json")],
            br#"{"error":"Server error while downloading."}"#,
        ))
        .await;
        match backend.request_download("https://youtu.be/x", "22").await {
            Err(ApiError::Http { status, message }) => {
                assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
                assert_eq!(
                    message,
                    ServerMessage::Provided("Server error while downloading.".into())
                );
            }
            other => panic!("expected an HTTP error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn http_error_with_html_body_is_unreadable() {
        let backend = backend_serving(response(
            "502 Bad Gateway",
            &[("Content-Type", "text/html")],
            b"<html><body>Bad Gateway</body></html>",
        ))
        .await;
        match backend.get_info("https://youtu.be/x").await {
            Err(ApiError::Http { status, message }) => {
                assert_eq!(status, StatusCode::BAD_GATEWAY);
                assert_eq!(message, ServerMessage::Unreadable);
            }
            other => panic!("expected an HTTP error, got {other:?}"),
        }
    }
}
