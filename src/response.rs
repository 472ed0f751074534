//! レスポンスヘッダーパーサー
//!
//! ## 概要
//!
//! ステータスライン + ヘッダーブロックのパースと、chunked ボディの
//! チャンクサイズ行のパースを提供します。ボディの読み取り自体は I/O 層が
//! 行い、ここはバイト列の解釈のみを担当します (Sans I/O)。
//!
//! ## 使い方
//!
//! ```rust
//! use shiguredo_httpws::response::ResponseHead;
//!
//! let head = ResponseHead::parse(
//!     b"HTTP/1.1 200 OK\r\nContent-Length: 5\r\nConnection: keep-alive\r\n\r\n",
//! ).unwrap();
//! assert_eq!(head.status_code, 200);
//! assert!(head.is_keep_alive());
//! assert_eq!(head.content_length().unwrap(), Some(5));
//! ```

use core::fmt;

/// レスポンスパースエラー
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseError {
    /// 不正なステータスライン
    InvalidStatusLine(String),
    /// 不正なステータスコード
    InvalidStatusCode(String),
    /// 不正なヘッダー行
    InvalidHeaderLine(String),
    /// 不正な Content-Length
    InvalidContentLength(String),
    /// 不正なチャンクサイズ
    InvalidChunkSize(String),
}

impl fmt::Display for ResponseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResponseError::InvalidStatusLine(s) => write!(f, "invalid status line: {}", s),
            ResponseError::InvalidStatusCode(s) => write!(f, "invalid status code: {}", s),
            ResponseError::InvalidHeaderLine(s) => write!(f, "invalid header line: {}", s),
            ResponseError::InvalidContentLength(s) => write!(f, "invalid Content-Length: {}", s),
            ResponseError::InvalidChunkSize(s) => write!(f, "invalid chunk size: {}", s),
        }
    }
}

impl std::error::Error for ResponseError {}

/// `\r\n\r\n` を探し、その直後の位置を返す
pub fn find_double_crlf(buf: &[u8]) -> Option<usize> {
    buf.windows(4).position(|w| w == b"\r\n\r\n").map(|p| p + 4)
}

/// `\r\n` を探し、その直後の位置を返す
pub fn find_crlf(buf: &[u8]) -> Option<usize> {
    buf.windows(2).position(|w| w == b"\r\n").map(|p| p + 2)
}

/// パース済みレスポンスヘッダー
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseHead {
    /// HTTP バージョン (HTTP/1.1 等)
    pub version: String,
    /// ステータスコード
    pub status_code: u16,
    /// ステータスフレーズ
    pub reason_phrase: String,
    /// ヘッダー
    pub headers: Vec<(String, String)>,
}

impl ResponseHead {
    /// ステータスライン + ヘッダーブロックをパース
    ///
    /// 入力は `\r\n\r\n` までのヘッダーブロック全体 (終端空行は含んでも
    /// 含まなくてもよい)。
    pub fn parse(head: &[u8]) -> Result<Self, ResponseError> {
        let text = std::str::from_utf8(head)
            .map_err(|e| ResponseError::InvalidHeaderLine(format!("invalid UTF-8: {e}")))?;

        let mut lines = text.split("\r\n");

        let status_line = lines
            .next()
            .ok_or_else(|| ResponseError::InvalidStatusLine("empty input".to_string()))?;

        // VERSION SP STATUS-CODE SP REASON-PHRASE
        let mut parts = status_line.splitn(3, ' ');
        let version = parts
            .next()
            .filter(|v| v.starts_with("HTTP/"))
            .ok_or_else(|| ResponseError::InvalidStatusLine(status_line.to_string()))?;
        let code_str = parts
            .next()
            .ok_or_else(|| ResponseError::InvalidStatusLine(status_line.to_string()))?;
        let status_code: u16 = code_str
            .parse()
            .map_err(|_| ResponseError::InvalidStatusCode(code_str.to_string()))?;
        if !(100..=599).contains(&status_code) {
            return Err(ResponseError::InvalidStatusCode(code_str.to_string()));
        }
        let reason_phrase = parts.next().unwrap_or("").to_string();

        let mut headers = Vec::new();
        for line in lines {
            if line.is_empty() {
                break;
            }
            let (name, value) = parse_header_line(line)?;
            headers.push((name, value));
        }

        Ok(ResponseHead {
            version: version.to_string(),
            status_code,
            reason_phrase,
            headers,
        })
    }

    /// ヘッダーを取得 (大文字小文字を区別しない)
    pub fn get_header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// ヘッダーが存在するか確認
    pub fn has_header(&self, name: &str) -> bool {
        self.headers
            .iter()
            .any(|(n, _)| n.eq_ignore_ascii_case(name))
    }

    /// キープアライブ接続かどうかを判定
    ///
    /// HTTP/1.1 ではデフォルトでキープアライブ。
    /// HTTP/1.0 では `Connection: keep-alive` が必要。
    /// Connection ヘッダーはカンマ区切りのトークンリストとして扱う (RFC 9110)。
    pub fn is_keep_alive(&self) -> bool {
        let mut has_keep_alive = false;
        for (name, value) in &self.headers {
            if name.eq_ignore_ascii_case("Connection") {
                for token in value.split(',') {
                    let token = token.trim();
                    if token.eq_ignore_ascii_case("close") {
                        return false;
                    }
                    if token.eq_ignore_ascii_case("keep-alive") {
                        has_keep_alive = true;
                    }
                }
            }
        }
        if has_keep_alive {
            return true;
        }
        self.version.ends_with("/1.1")
    }

    /// Transfer-Encoding が chunked かどうかを判定
    ///
    /// Transfer-Encoding リストの最後が chunked かどうかを確認する (RFC 9112)。
    /// 複数の Transfer-Encoding ヘッダーがある場合は連結して扱う。
    pub fn is_chunked(&self) -> bool {
        let mut last_token: Option<&str> = None;
        for (name, value) in &self.headers {
            if name.eq_ignore_ascii_case("Transfer-Encoding") {
                for token in value.split(',') {
                    let token = token.trim();
                    if !token.is_empty() {
                        last_token = Some(token);
                    }
                }
            }
        }
        last_token.is_some_and(|t| t.eq_ignore_ascii_case("chunked"))
    }

    /// Range レスポンスかどうかを判定
    ///
    /// ステータス 206、または `Content-Range` / `Accept-Ranges` ヘッダーの
    /// 存在で判定する。
    pub fn is_ranges(&self) -> bool {
        self.status_code == 206
            || self.has_header("Content-Range")
            || self.has_header("Accept-Ranges")
    }

    /// リダイレクトレスポンス (3xx) かどうかを判定
    pub fn is_redirect(&self) -> bool {
        (300..400).contains(&self.status_code)
    }

    /// Location ヘッダーの値を取得
    pub fn location(&self) -> Option<&str> {
        self.get_header("Location")
    }

    /// Content-Length ヘッダーの値を取得
    ///
    /// 複数の Content-Length がある場合、値が一致しなければエラー (RFC 9112)。
    pub fn content_length(&self) -> Result<Option<usize>, ResponseError> {
        let mut value: Option<usize> = None;
        for (name, raw) in &self.headers {
            if name.eq_ignore_ascii_case("Content-Length") {
                let raw = raw.trim();
                if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
                    return Err(ResponseError::InvalidContentLength(raw.to_string()));
                }
                let parsed: usize = raw
                    .parse()
                    .map_err(|_| ResponseError::InvalidContentLength(raw.to_string()))?;
                if let Some(prev) = value {
                    if prev != parsed {
                        return Err(ResponseError::InvalidContentLength(
                            "mismatched values".to_string(),
                        ));
                    }
                } else {
                    value = Some(parsed);
                }
            }
        }
        Ok(value)
    }
}

/// ヘッダー行をパース
fn parse_header_line(line: &str) -> Result<(String, String), ResponseError> {
    if line.starts_with(' ') || line.starts_with('\t') {
        return Err(ResponseError::InvalidHeaderLine("obs-fold".to_string()));
    }

    let (name, value) = line
        .split_once(':')
        .ok_or_else(|| ResponseError::InvalidHeaderLine(format!("missing colon: {line}")))?;
    if name.is_empty() || !name.bytes().all(is_token_char) {
        return Err(ResponseError::InvalidHeaderLine(format!(
            "invalid name: {name}"
        )));
    }

    Ok((name.to_string(), value.trim().to_string()))
}

/// トークン文字か確認 (RFC 9110)
fn is_token_char(b: u8) -> bool {
    matches!(
        b,
        b'!' | b'#' | b'$' | b'%' | b'&' | b'\'' | b'*' | b'+' | b'-' | b'.' |
        b'0'..=b'9' | b'A'..=b'Z' | b'^' | b'_' | b'`' | b'a'..=b'z' | b'|' | b'~'
    )
}

/// チャンクサイズ行をパース
///
/// 行は CRLF を含まないチャンクサイズ行。先頭の 16 進数の並びのみを
/// 読み、チャンク拡張 (`;` 以降) は無視する。16 進数が 1 文字もない場合は
/// エラー。
pub fn parse_chunk_size(line: &[u8]) -> Result<usize, ResponseError> {
    let mut size: usize = 0;
    let mut digits = 0;
    for &b in line {
        let digit = match b {
            b'0'..=b'9' => b - b'0',
            b'a'..=b'f' => b - b'a' + 10,
            b'A'..=b'F' => b - b'A' + 10,
            _ => break,
        };
        size = size
            .checked_mul(16)
            .and_then(|s| s.checked_add(digit as usize))
            .ok_or_else(|| {
                ResponseError::InvalidChunkSize(String::from_utf8_lossy(line).into_owned())
            })?;
        digits += 1;
    }
    if digits == 0 {
        return Err(ResponseError::InvalidChunkSize(
            String::from_utf8_lossy(line).into_owned(),
        ));
    }
    Ok(size)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_basic() {
        let head = ResponseHead::parse(
            b"HTTP/1.1 200 OK\r\nContent-Length: 5\r\nConnection: keep-alive\r\n\r\n",
        )
        .unwrap();
        assert_eq!(head.version, "HTTP/1.1");
        assert_eq!(head.status_code, 200);
        assert_eq!(head.reason_phrase, "OK");
        assert_eq!(head.headers.len(), 2);
        assert_eq!(head.content_length().unwrap(), Some(5));
        assert!(head.is_keep_alive());
        assert!(!head.is_chunked());
        assert!(!head.is_ranges());
    }

    #[test]
    fn parse_without_trailing_empty_line() {
        let head = ResponseHead::parse(b"HTTP/1.1 404 Not Found\r\nContent-Length: 0").unwrap();
        assert_eq!(head.status_code, 404);
        assert_eq!(head.content_length().unwrap(), Some(0));
    }

    #[test]
    fn parse_reason_with_spaces() {
        let head = ResponseHead::parse(b"HTTP/1.1 500 Internal Server Error\r\n\r\n").unwrap();
        assert_eq!(head.reason_phrase, "Internal Server Error");
    }

    #[test]
    fn keep_alive_rules() {
        let head = ResponseHead::parse(b"HTTP/1.1 200 OK\r\nConnection: close\r\n\r\n").unwrap();
        assert!(!head.is_keep_alive());

        let head = ResponseHead::parse(b"HTTP/1.1 200 OK\r\n\r\n").unwrap();
        assert!(head.is_keep_alive());

        let head =
            ResponseHead::parse(b"HTTP/1.0 200 OK\r\nConnection: keep-alive\r\n\r\n").unwrap();
        assert!(head.is_keep_alive());

        let head = ResponseHead::parse(b"HTTP/1.0 200 OK\r\n\r\n").unwrap();
        assert!(!head.is_keep_alive());
    }

    #[test]
    fn chunked_detection() {
        let head =
            ResponseHead::parse(b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\n").unwrap();
        assert!(head.is_chunked());

        let head =
            ResponseHead::parse(b"HTTP/1.1 200 OK\r\nTransfer-Encoding: gzip, chunked\r\n\r\n")
                .unwrap();
        assert!(head.is_chunked());

        let head = ResponseHead::parse(b"HTTP/1.1 200 OK\r\nTransfer-Encoding: gzip\r\n\r\n")
            .unwrap();
        assert!(!head.is_chunked());
    }

    #[test]
    fn ranges_detection() {
        let head = ResponseHead::parse(
            b"HTTP/1.1 206 Partial Content\r\nContent-Range: bytes 0-4/10\r\n\r\n",
        )
        .unwrap();
        assert!(head.is_ranges());

        let head =
            ResponseHead::parse(b"HTTP/1.1 200 OK\r\nAccept-Ranges: bytes\r\n\r\n").unwrap();
        assert!(head.is_ranges());
    }

    #[test]
    fn redirect_location() {
        let head = ResponseHead::parse(
            b"HTTP/1.1 301 Moved Permanently\r\nLocation: http://example.com/new\r\n\r\n",
        )
        .unwrap();
        assert!(head.is_redirect());
        assert_eq!(head.location(), Some("http://example.com/new"));
    }

    #[test]
    fn content_length_mismatch() {
        let head = ResponseHead::parse(
            b"HTTP/1.1 200 OK\r\nContent-Length: 5\r\nContent-Length: 6\r\n\r\n",
        )
        .unwrap();
        assert!(head.content_length().is_err());

        let head = ResponseHead::parse(
            b"HTTP/1.1 200 OK\r\nContent-Length: 5\r\nContent-Length: 5\r\n\r\n",
        )
        .unwrap();
        assert_eq!(head.content_length().unwrap(), Some(5));
    }

    #[test]
    fn parse_invalid() {
        assert!(ResponseHead::parse(b"").is_err());
        assert!(ResponseHead::parse(b"garbage\r\n\r\n").is_err());
        assert!(ResponseHead::parse(b"HTTP/1.1\r\n\r\n").is_err());
        assert!(ResponseHead::parse(b"HTTP/1.1 abc OK\r\n\r\n").is_err());
        assert!(ResponseHead::parse(b"HTTP/1.1 999 Nope\r\n\r\n").is_err());
        assert!(ResponseHead::parse(b"HTTP/1.1 200 OK\r\nbad header\r\n\r\n").is_err());
        assert!(ResponseHead::parse(b"HTTP/1.1 200 OK\r\n folded: x\r\n\r\n").is_err());
    }

    #[test]
    fn find_delimiters() {
        assert_eq!(find_double_crlf(b"abc\r\n\r\ntail"), Some(7));
        assert_eq!(find_double_crlf(b"abc\r\n"), None);
        assert_eq!(find_crlf(b"5\r\nhello"), Some(3));
        assert_eq!(find_crlf(b"5"), None);
    }

    #[test]
    fn chunk_size_parse() {
        assert_eq!(parse_chunk_size(b"0").unwrap(), 0);
        assert_eq!(parse_chunk_size(b"5").unwrap(), 5);
        assert_eq!(parse_chunk_size(b"1a").unwrap(), 26);
        assert_eq!(parse_chunk_size(b"FF").unwrap(), 255);
        // チャンク拡張は無視される
        assert_eq!(parse_chunk_size(b"10;name=value").unwrap(), 16);
        // 先頭に 16 進数がなければエラー
        assert!(parse_chunk_size(b"").is_err());
        assert!(parse_chunk_size(b"zz").is_err());
        assert!(parse_chunk_size(b";ext").is_err());
        // オーバーフロー
        assert!(parse_chunk_size(b"ffffffffffffffffff").is_err());
    }
}
