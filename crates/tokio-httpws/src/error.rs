//! tokio-httpws エラー型

use std::fmt;

/// tokio-httpws エラー
#[derive(Debug)]
pub enum Error {
    /// I/O エラー
    Io(std::io::Error),
    /// レスポンスパースエラー
    Protocol(shiguredo_httpws::ResponseError),
    /// WebSocket フレームエラー
    WebSocket(shiguredo_httpws::websocket::WebSocketError),
    /// 不正な URL
    InvalidUrl(String),
    /// TLS エラー
    Tls(String),
    /// TLS 機能が無効 (`tls` feature なしで https/wss を要求した)
    TlsNotEnabled,
    /// リクエストタイムアウト
    Timeout,
    /// 接続が確立されていない
    NotConnected,
    /// 接続が閉じられた
    ConnectionClosed,
    /// WebSocket アップグレードが拒否された (101 以外のステータス)
    UpgradeFailed(u16),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Io(e) => write!(f, "I/O error: {}", e),
            Error::Protocol(e) => write!(f, "protocol error: {}", e),
            Error::WebSocket(e) => write!(f, "websocket error: {}", e),
            Error::InvalidUrl(msg) => write!(f, "invalid URL: {}", msg),
            Error::Tls(e) => write!(f, "TLS error: {}", e),
            Error::TlsNotEnabled => write!(f, "TLS support is not enabled"),
            Error::Timeout => write!(f, "request timeout"),
            Error::NotConnected => write!(f, "not connected"),
            Error::ConnectionClosed => write!(f, "connection closed"),
            Error::UpgradeFailed(status) => {
                write!(f, "websocket upgrade failed with status {}", status)
            }
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(e) => Some(e),
            Error::Protocol(e) => Some(e),
            Error::WebSocket(e) => Some(e),
            _ => None,
        }
    }
}

impl Error {
    /// タイムアウトかどうか
    pub fn is_timeout(&self) -> bool {
        matches!(self, Error::Timeout)
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e)
    }
}

impl From<shiguredo_httpws::ResponseError> for Error {
    fn from(e: shiguredo_httpws::ResponseError) -> Self {
        Error::Protocol(e)
    }
}

impl From<shiguredo_httpws::websocket::WebSocketError> for Error {
    fn from(e: shiguredo_httpws::websocket::WebSocketError) -> Self {
        Error::WebSocket(e)
    }
}

impl From<shiguredo_httpws::uri::UriError> for Error {
    fn from(e: shiguredo_httpws::uri::UriError) -> Self {
        Error::InvalidUrl(e.to_string())
    }
}

impl From<tokio::time::error::Elapsed> for Error {
    fn from(_: tokio::time::error::Elapsed) -> Self {
        Error::Timeout
    }
}

#[cfg(feature = "tls")]
impl From<rustls::Error> for Error {
    fn from(e: rustls::Error) -> Self {
        Error::Tls(e.to_string())
    }
}

#[cfg(feature = "tls")]
impl From<rustls_pki_types::InvalidDnsNameError> for Error {
    fn from(e: rustls_pki_types::InvalidDnsNameError) -> Self {
        Error::Tls(e.to_string())
    }
}

/// Result 型エイリアス
pub type Result<T> = std::result::Result<T, Error>;
