//! multipart/form-data 生成 (RFC 7578)
//!
//! ## 概要
//!
//! multipart/form-data アップロードのパートヘッダー生成、終端境界、
//! および `Content-Length` の事前計算を提供します。パートボディの
//! ストリーミングは I/O 層が行います (Sans I/O)。
//!
//! `content_length()` はパートヘッダーのフォーマッター自身から導出される
//! ため、実際に送信されるバイト数と常に一致します。
//!
//! ## 使い方
//!
//! ```rust
//! use shiguredo_httpws::multipart::{closing_boundary, content_length, format_part_head, PartInfo, BOUNDARY};
//!
//! let head = format_part_head(BOUNDARY, "field1", None);
//! assert!(head.starts_with("--"));
//! assert!(head.ends_with("\r\n\r\n"));
//!
//! let len = content_length(
//!     BOUNDARY,
//!     [PartInfo { name: "field1", filename: None, size: 6 }],
//! );
//! assert_eq!(len, (head.len() + 6 + 2 + closing_boundary(BOUNDARY).len()) as u64);
//! ```

use crate::content_type::mime_for_filename;

/// multipart 境界文字列
pub const BOUNDARY: &str = "--HttpwsBoundary4F2A9C81D7E3B065";

/// 行終端
pub const CRLF: &str = "\r\n";

/// ヘッダーブロック終端
pub const DOUBLE_CRLF: &str = "\r\n\r\n";

/// Content-Length 計算用のパート情報
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PartInfo<'a> {
    /// パート名 (form-data の name)
    pub name: &'a str,
    /// ファイル名 (ファイルパートのみ)
    pub filename: Option<&'a str>,
    /// ボディのバイト数
    pub size: u64,
}

/// パートヘッダーを生成
///
/// 出力は境界行からヘッダーブロック終端の空行までの全体:
///
/// ```text
/// --<boundary>\r\n
/// Content-Disposition: form-data; name="<name>"[; filename="<filename>"]\r\n
/// [Content-Type: <mime>\r\n]
/// \r\n
/// ```
///
/// `Content-Type` はファイル名の拡張子が既知の MIME に対応する場合のみ
/// 付与する。この直後にパートボディ、その後に `\r\n` が続く。
pub fn format_part_head(boundary: &str, name: &str, filename: Option<&str>) -> String {
    let mut head = String::with_capacity(96);
    head.push_str("--");
    head.push_str(boundary);
    head.push_str(CRLF);
    head.push_str("Content-Disposition: form-data; name=\"");
    head.push_str(name);
    head.push('"');
    if let Some(filename) = filename {
        head.push_str("; filename=\"");
        head.push_str(filename);
        head.push('"');
        head.push_str(CRLF);
        if let Some(mime) = mime_for_filename(filename) {
            head.push_str("Content-Type: ");
            head.push_str(mime);
            head.push_str(CRLF);
        }
    } else {
        head.push_str(CRLF);
    }
    head.push_str(CRLF);
    head
}

/// 終端境界を生成 (`--<boundary>--\r\n`)
pub fn closing_boundary(boundary: &str) -> String {
    format!("--{}--{}", boundary, CRLF)
}

/// multipart ボディ全体の Content-Length を計算
///
/// 最初のパートヘッダーの先頭バイトから終端境界までを含む。
/// 各パートは `ヘッダー + ボディ + CRLF`。値はフォーマッターの出力長から
/// 導出されるため、送信処理が同じフォーマッターを使う限り一致する。
pub fn content_length<'a, I>(boundary: &str, parts: I) -> u64
where
    I: IntoIterator<Item = PartInfo<'a>>,
{
    let mut len: u64 = 0;
    for part in parts {
        len += format_part_head(boundary, part.name, part.filename).len() as u64;
        len += part.size + CRLF.len() as u64;
    }
    len + closing_boundary(boundary).len() as u64
}
