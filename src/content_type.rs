//! リクエスト Content-Type と拡張子 → MIME 対応表
//!
//! ## 概要
//!
//! リクエストボディの Content-Type タグと、multipart のファイルパートに
//! 付与する MIME タイプを拡張子から引く対応表を提供します。
//!
//! ## 使い方
//!
//! ```rust
//! use shiguredo_httpws::content_type::{mime_for_extension, ReqContentType};
//!
//! assert_eq!(ReqContentType::Json.header_value(), Some("application/json"));
//! assert_eq!(ReqContentType::None.header_value(), None);
//! assert_eq!(mime_for_extension("png"), Some("image/png"));
//! ```

/// リクエストボディの Content-Type タグ
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReqContentType {
    /// Content-Type を付与しない
    #[default]
    None,
    /// application/x-www-form-urlencoded
    UrlEncoded,
    /// application/json
    Json,
    /// multipart/form-data (boundary は呼び出し側が付与する)
    Multipart,
    /// application/octet-stream
    OctetStream,
    /// text/plain
    PlainText,
}

impl ReqContentType {
    /// ヘッダー値を取得
    ///
    /// `Multipart` は `boundary=` で終わる接頭辞を返すので、呼び出し側が
    /// 境界文字列を連結する。`None` はヘッダーを出力しない。
    pub fn header_value(&self) -> Option<&'static str> {
        match self {
            ReqContentType::None => None,
            ReqContentType::UrlEncoded => Some("application/x-www-form-urlencoded"),
            ReqContentType::Json => Some("application/json"),
            ReqContentType::Multipart => Some("multipart/form-data; boundary="),
            ReqContentType::OctetStream => Some("application/octet-stream"),
            ReqContentType::PlainText => Some("text/plain"),
        }
    }

    /// multipart かどうか
    pub fn is_multipart(&self) -> bool {
        matches!(self, ReqContentType::Multipart)
    }
}

/// ファイル拡張子から MIME タイプを引く
///
/// 拡張子は先頭の `.` なし、大文字小文字は区別しない。
/// 未知の拡張子は `None` (Content-Type を付与しない)。
pub fn mime_for_extension(ext: &str) -> Option<&'static str> {
    let ext = ext.strip_prefix('.').unwrap_or(ext);
    let ext = ext.to_ascii_lowercase();
    let mime = match ext.as_str() {
        "html" | "htm" => "text/html",
        "css" => "text/css",
        "csv" => "text/csv",
        "txt" => "text/plain",
        "xml" => "text/xml",
        "js" | "mjs" => "text/javascript",
        "json" => "application/json",
        "pdf" => "application/pdf",
        "zip" => "application/zip",
        "gz" => "application/gzip",
        "tar" => "application/x-tar",
        "wasm" => "application/wasm",
        "bin" => "application/octet-stream",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "svg" => "image/svg+xml",
        "webp" => "image/webp",
        "ico" => "image/vnd.microsoft.icon",
        "bmp" => "image/bmp",
        "mp3" => "audio/mpeg",
        "wav" => "audio/wav",
        "ogg" => "audio/ogg",
        "mp4" => "video/mp4",
        "webm" => "video/webm",
        "woff" => "font/woff",
        "woff2" => "font/woff2",
        _ => return None,
    };
    Some(mime)
}

/// ファイル名から MIME タイプを引く
///
/// 最後の `.` 以降を拡張子として扱う。拡張子がない場合は `None`。
pub fn mime_for_filename(filename: &str) -> Option<&'static str> {
    let ext = filename.rsplit_once('.')?.1;
    mime_for_extension(ext)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_values() {
        assert_eq!(ReqContentType::None.header_value(), None);
        assert_eq!(
            ReqContentType::UrlEncoded.header_value(),
            Some("application/x-www-form-urlencoded")
        );
        assert_eq!(ReqContentType::Json.header_value(), Some("application/json"));
        assert_eq!(
            ReqContentType::Multipart.header_value(),
            Some("multipart/form-data; boundary=")
        );
        assert!(ReqContentType::Multipart.is_multipart());
        assert!(!ReqContentType::Json.is_multipart());
    }

    #[test]
    fn extension_lookup() {
        assert_eq!(mime_for_extension("png"), Some("image/png"));
        assert_eq!(mime_for_extension(".png"), Some("image/png"));
        assert_eq!(mime_for_extension("PNG"), Some("image/png"));
        assert_eq!(mime_for_extension("jpeg"), Some("image/jpeg"));
        assert_eq!(mime_for_extension("unknown-ext"), None);
        assert_eq!(mime_for_extension(""), None);
    }

    #[test]
    fn filename_lookup() {
        assert_eq!(mime_for_filename("photo.jpg"), Some("image/jpeg"));
        assert_eq!(mime_for_filename("archive.tar.gz"), Some("application/gzip"));
        assert_eq!(mime_for_filename("README"), None);
        assert_eq!(mime_for_filename("noext."), None);
    }
}
