//! レスポンスヘッダーパーサーのプロパティテスト

use pbt::{header_name, header_value};
use proptest::prelude::*;
use shiguredo_httpws::response::{find_double_crlf, parse_chunk_size, ResponseHead};

/// ボディ解釈に影響するキーを除いたヘッダー
fn plain_headers() -> impl Strategy<Value = Vec<(String, String)>> {
    proptest::collection::vec((header_name(), header_value()), 0..8).prop_filter(
        "no body-framing keys",
        |headers| {
            headers.iter().all(|(name, _)| {
                !name.eq_ignore_ascii_case("Content-Length")
                    && !name.eq_ignore_ascii_case("Transfer-Encoding")
            })
        },
    )
}

fn render_head(status: u16, reason: &str, headers: &[(String, String)]) -> Vec<u8> {
    let mut out = format!("HTTP/1.1 {} {}\r\n", status, reason);
    for (name, value) in headers {
        out.push_str(&format!("{}: {}\r\n", name, value));
    }
    out.push_str("\r\n");
    out.into_bytes()
}

proptest! {
    // レンダリングしたヘッダーブロックのパースで全フィールドが復元される
    #[test]
    fn head_roundtrip(
        status in 100u16..600,
        reason in "[A-Za-z ]{0,20}",
        headers in plain_headers(),
    ) {
        let reason = reason.trim().to_string();
        let rendered = render_head(status, &reason, &headers);
        let head = ResponseHead::parse(&rendered).unwrap();

        prop_assert_eq!(head.status_code, status);
        prop_assert_eq!(&head.version, "HTTP/1.1");
        prop_assert_eq!(&head.reason_phrase, &reason);
        prop_assert_eq!(head.headers, headers);
    }

    // Content-Length は単一値なら復元される
    #[test]
    fn content_length_roundtrip(len in 0usize..10_000_000) {
        let rendered = render_head(
            200,
            "OK",
            &[("Content-Length".to_string(), len.to_string())],
        );
        let head = ResponseHead::parse(&rendered).unwrap();
        prop_assert_eq!(head.content_length().unwrap(), Some(len));
    }

    // Connection: close があれば keep-alive でない
    #[test]
    fn close_token_disables_keep_alive(headers in plain_headers()) {
        let mut all = headers.clone();
        all.push(("Connection".to_string(), "close".to_string()));
        let rendered = render_head(200, "OK", &all);
        let head = ResponseHead::parse(&rendered).unwrap();
        prop_assert!(!head.is_keep_alive());
    }

    // find_double_crlf はヘッダーブロック長を返す
    #[test]
    fn double_crlf_position(headers in plain_headers(), tail in proptest::collection::vec(any::<u8>(), 0..64)) {
        let rendered = render_head(200, "OK", &headers);
        let mut buf = rendered.clone();
        buf.extend_from_slice(&tail);
        // ヘッダー部に \r\n\r\n が含まれない前提で、最初の検出位置は
        // ヘッダーブロックの終端になる
        prop_assert_eq!(find_double_crlf(&buf), Some(rendered.len()));
    }

    // 16 進数でフォーマットしたチャンクサイズは拡張の有無によらず復元される
    #[test]
    fn chunk_size_roundtrip(size in 0usize..0x1000000, ext in proptest::option::of("[a-z]{1,8}=[a-z]{1,8}")) {
        let line = match &ext {
            Some(ext) => format!("{:x};{}", size, ext),
            None => format!("{:x}", size),
        };
        prop_assert_eq!(parse_chunk_size(line.as_bytes()).unwrap(), size);

        // 大文字でも同じ
        let upper = format!("{:X}", size);
        prop_assert_eq!(parse_chunk_size(upper.as_bytes()).unwrap(), size);
    }
}
