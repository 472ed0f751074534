//! クライアント用 URI パース (RFC 3986 のサブセット)
//!
//! ## 概要
//!
//! HTTP/1.1 + WebSocket クライアントが扱う `http` / `https` / `ws` / `wss`
//! スキームの URI パースを提供します。fragment は無視します。
//!
//! ## 使い方
//!
//! ```rust
//! use shiguredo_httpws::uri::{Scheme, Uri};
//!
//! let uri = Uri::parse("https://example.com:8443/path?q=1").unwrap();
//! assert_eq!(uri.scheme(), Scheme::Https);
//! assert_eq!(uri.host(), "example.com");
//! assert_eq!(uri.port_or_default(), 8443);
//! assert_eq!(uri.request_target(), "/path?q=1");
//! assert!(uri.is_ssl());
//! ```

use core::fmt;

/// URI パースエラー
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UriError {
    /// 空の URI
    Empty,
    /// スキームがない、または未対応のスキーム
    InvalidScheme,
    /// ホストがない、または不正なホスト
    InvalidHost,
    /// 不正なポート番号
    InvalidPort,
}

impl fmt::Display for UriError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UriError::Empty => write!(f, "empty URI"),
            UriError::InvalidScheme => write!(f, "invalid or unsupported scheme"),
            UriError::InvalidHost => write!(f, "invalid host"),
            UriError::InvalidPort => write!(f, "invalid port"),
        }
    }
}

impl std::error::Error for UriError {}

/// URI スキーム
///
/// クライアントが対応するのは HTTP 系と WebSocket 系の 4 種のみ。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scheme {
    Http,
    Https,
    Ws,
    Wss,
}

impl Scheme {
    /// スキーム名
    pub fn as_str(&self) -> &'static str {
        match self {
            Scheme::Http => "http",
            Scheme::Https => "https",
            Scheme::Ws => "ws",
            Scheme::Wss => "wss",
        }
    }

    /// デフォルトポート
    pub fn default_port(&self) -> u16 {
        match self {
            Scheme::Http | Scheme::Ws => 80,
            Scheme::Https | Scheme::Wss => 443,
        }
    }

    /// TLS を使用するスキームかどうか
    pub fn is_ssl(&self) -> bool {
        matches!(self, Scheme::Https | Scheme::Wss)
    }

    /// WebSocket スキームかどうか
    pub fn is_websocket(&self) -> bool {
        matches!(self, Scheme::Ws | Scheme::Wss)
    }

    fn parse(s: &str) -> Result<Self, UriError> {
        match s {
            "http" => Ok(Scheme::Http),
            "https" => Ok(Scheme::Https),
            "ws" => Ok(Scheme::Ws),
            "wss" => Ok(Scheme::Wss),
            _ => Err(UriError::InvalidScheme),
        }
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// パース済み URI
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Uri {
    scheme: Scheme,
    host: String,
    port: Option<u16>,
    path: String,
    query: Option<String>,
}

impl Uri {
    /// URI 文字列をパース
    ///
    /// スキームは必須。パスが空の場合は `/` になる。fragment は読み捨てる。
    ///
    /// # 例
    ///
    /// ```rust
    /// use shiguredo_httpws::uri::Uri;
    ///
    /// let uri = Uri::parse("http://example.com").unwrap();
    /// assert_eq!(uri.path(), "/");
    /// assert_eq!(uri.port(), None);
    /// assert_eq!(uri.port_or_default(), 80);
    /// ```
    pub fn parse(input: &str) -> Result<Self, UriError> {
        let input = input.trim();
        if input.is_empty() {
            return Err(UriError::Empty);
        }

        let (scheme_str, rest) = input.split_once("://").ok_or(UriError::InvalidScheme)?;
        let scheme = Scheme::parse(scheme_str)?;

        // authority の終端は '/', '?', '#' のいずれか
        let auth_end = rest
            .find(|c| c == '/' || c == '?' || c == '#')
            .unwrap_or(rest.len());
        let authority = &rest[..auth_end];
        let after = &rest[auth_end..];

        let (host, port) = parse_authority(authority)?;

        // パスとクエリ (fragment は捨てる)
        let after = match after.find('#') {
            Some(pos) => &after[..pos],
            None => after,
        };
        let (path, query) = match after.split_once('?') {
            Some((p, q)) => (p, Some(q.to_string())),
            None => (after, None),
        };
        let path = if path.is_empty() {
            "/".to_string()
        } else {
            path.to_string()
        };

        Ok(Uri {
            scheme,
            host,
            port,
            path,
            query,
        })
    }

    /// スキームを取得
    pub fn scheme(&self) -> Scheme {
        self.scheme
    }

    /// ホストを取得
    pub fn host(&self) -> &str {
        &self.host
    }

    /// ポート番号を取得 (URI に明示されている場合のみ)
    pub fn port(&self) -> Option<u16> {
        self.port
    }

    /// ポート番号を取得 (省略時はスキームのデフォルト)
    pub fn port_or_default(&self) -> u16 {
        self.port.unwrap_or_else(|| self.scheme.default_port())
    }

    /// パスを取得 (常に `/` 始まり)
    pub fn path(&self) -> &str {
        &self.path
    }

    /// クエリを取得
    pub fn query(&self) -> Option<&str> {
        self.query.as_deref()
    }

    /// TLS を使用するかどうか
    pub fn is_ssl(&self) -> bool {
        self.scheme.is_ssl()
    }

    /// WebSocket 接続かどうか
    pub fn is_websocket(&self) -> bool {
        self.scheme.is_websocket()
    }

    /// リクエストターゲット (origin-form: パス + クエリ)
    pub fn request_target(&self) -> String {
        match &self.query {
            Some(q) => format!("{}?{}", self.path, q),
            None => self.path.clone(),
        }
    }
}

/// authority 部をパースして (host, port) を返す
///
/// IPv6 リテラルは `[...]` で囲まれている前提。userinfo は扱わない。
fn parse_authority(authority: &str) -> Result<(String, Option<u16>), UriError> {
    if authority.is_empty() {
        return Err(UriError::InvalidHost);
    }

    if let Some(rest) = authority.strip_prefix('[') {
        // IPv6: "[::1]" または "[::1]:8080"
        let close = rest.find(']').ok_or(UriError::InvalidHost)?;
        let host = &rest[..close];
        if host.is_empty() {
            return Err(UriError::InvalidHost);
        }
        let after = &rest[close + 1..];
        let port = match after.strip_prefix(':') {
            Some(p) => Some(parse_port(p)?),
            None if after.is_empty() => None,
            None => return Err(UriError::InvalidHost),
        };
        return Ok((host.to_string(), port));
    }

    match authority.rsplit_once(':') {
        Some((host, port)) => {
            if host.is_empty() {
                return Err(UriError::InvalidHost);
            }
            Ok((host.to_string(), Some(parse_port(port)?)))
        }
        None => Ok((authority.to_string(), None)),
    }
}

fn parse_port(s: &str) -> Result<u16, UriError> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return Err(UriError::InvalidPort);
    }
    s.parse::<u16>().map_err(|_| UriError::InvalidPort)
}

/// スキームがない URI に `http://` を前置する
///
/// 判定は `http://` / `https://` / `ws://` / `wss://` の literal prefix 比較。
pub fn ensure_http_scheme(uri: &str) -> String {
    let has_scheme = uri.starts_with("http://")
        || uri.starts_with("https://")
        || uri.starts_with("ws://")
        || uri.starts_with("wss://");
    if has_scheme {
        uri.to_string()
    } else {
        format!("http://{}", uri)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_basic() {
        let uri = Uri::parse("http://example.com/path?query=value").unwrap();
        assert_eq!(uri.scheme(), Scheme::Http);
        assert_eq!(uri.host(), "example.com");
        assert_eq!(uri.port(), None);
        assert_eq!(uri.port_or_default(), 80);
        assert_eq!(uri.path(), "/path");
        assert_eq!(uri.query(), Some("query=value"));
        assert_eq!(uri.request_target(), "/path?query=value");
        assert!(!uri.is_ssl());
        assert!(!uri.is_websocket());
    }

    #[test]
    fn parse_https_with_port() {
        let uri = Uri::parse("https://example.com:8443/").unwrap();
        assert_eq!(uri.scheme(), Scheme::Https);
        assert_eq!(uri.port(), Some(8443));
        assert_eq!(uri.port_or_default(), 8443);
        assert!(uri.is_ssl());
    }

    #[test]
    fn parse_empty_path() {
        let uri = Uri::parse("http://example.com").unwrap();
        assert_eq!(uri.path(), "/");
        assert_eq!(uri.request_target(), "/");
    }

    #[test]
    fn parse_websocket() {
        let uri = Uri::parse("ws://localhost:8080/chat").unwrap();
        assert!(uri.is_websocket());
        assert!(!uri.is_ssl());
        assert_eq!(uri.port_or_default(), 8080);

        let uri = Uri::parse("wss://example.com/chat").unwrap();
        assert!(uri.is_websocket());
        assert!(uri.is_ssl());
        assert_eq!(uri.port_or_default(), 443);
    }

    #[test]
    fn parse_fragment_is_ignored() {
        let uri = Uri::parse("http://example.com/path#section").unwrap();
        assert_eq!(uri.path(), "/path");
        assert_eq!(uri.query(), None);

        let uri = Uri::parse("http://example.com/path?q=1#section").unwrap();
        assert_eq!(uri.query(), Some("q=1"));
    }

    #[test]
    fn parse_ipv6() {
        let uri = Uri::parse("http://[::1]:8080/api").unwrap();
        assert_eq!(uri.host(), "::1");
        assert_eq!(uri.port(), Some(8080));

        let uri = Uri::parse("http://[2001:db8::1]/").unwrap();
        assert_eq!(uri.host(), "2001:db8::1");
        assert_eq!(uri.port(), None);
    }

    #[test]
    fn parse_invalid() {
        assert!(Uri::parse("").is_err());
        assert!(Uri::parse("example.com").is_err());
        assert!(Uri::parse("ftp://example.com").is_err());
        assert!(Uri::parse("http://").is_err());
        assert!(Uri::parse("http://:8080").is_err());
        assert!(Uri::parse("http://example.com:notaport/").is_err());
        assert!(Uri::parse("http://example.com:99999/").is_err());
        assert!(Uri::parse("http://[::1/").is_err());
    }

    #[test]
    fn ensure_scheme_prefix() {
        assert_eq!(ensure_http_scheme("example.com/x"), "http://example.com/x");
        assert_eq!(ensure_http_scheme("http://a"), "http://a");
        assert_eq!(ensure_http_scheme("https://a"), "https://a");
        assert_eq!(ensure_http_scheme("ws://a"), "ws://a");
        assert_eq!(ensure_http_scheme("wss://a"), "wss://a");
        // 文字集合検索と違い、先頭一致しない入力には必ず前置される
        assert_eq!(ensure_http_scheme("ttp://a"), "http://ttp://a");
    }
}
