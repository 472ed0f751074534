//! リクエストヘッダーライターのプロパティテスト

use pbt::{header_name, header_value, host, path};
use proptest::prelude::*;
use shiguredo_httpws::content_type::ReqContentType;
use shiguredo_httpws::request::{content_length_for, Method, RequestHead};

fn method_strategy() -> impl Strategy<Value = Method> {
    prop_oneof![
        Just(Method::Get),
        Just(Method::Post),
        Just(Method::Put),
        Just(Method::Delete),
        Just(Method::Head),
        Just(Method::Options),
        Just(Method::Trace),
        Just(Method::Patch),
        Just(Method::Connect),
    ]
}

fn content_type_strategy() -> impl Strategy<Value = ReqContentType> {
    prop_oneof![
        Just(ReqContentType::None),
        Just(ReqContentType::UrlEncoded),
        Just(ReqContentType::Json),
        Just(ReqContentType::Multipart),
        Just(ReqContentType::OctetStream),
        Just(ReqContentType::PlainText),
    ]
}

/// エンジンが自動で扱うキーを除いたユーザーヘッダー
fn user_headers() -> impl Strategy<Value = Vec<(String, String)>> {
    proptest::collection::vec((header_name(), header_value()), 0..5).prop_filter(
        "no engine-managed keys",
        |headers| {
            headers.iter().all(|(name, _)| {
                !name.eq_ignore_ascii_case("Connection")
                    && !name.eq_ignore_ascii_case("Content-Length")
                    && !name.eq_ignore_ascii_case("Host")
            })
        },
    )
}

proptest! {
    // ヘッダーブロックの基本形: リクエストライン、Host、終端空行
    #[test]
    fn head_shape(
        method in method_strategy(),
        host in host(),
        path in path(),
        headers in user_headers(),
    ) {
        let target = if path.is_empty() { "/".to_string() } else { path };
        let head = RequestHead {
            method,
            target: &target,
            host: &host,
            user_headers: &headers,
            ..RequestHead::default()
        };
        let encoded = head.encode();

        prop_assert!(encoded.starts_with(&format!("{} {} HTTP/1.1\r\n", method.as_str(), target)), "missing request line");
        prop_assert!(encoded.contains(&format!("\r\nHost: {}\r\n", host)), "missing Host header");
        prop_assert!(encoded.ends_with("\r\n\r\n"));

        // ユーザーヘッダーは指定順に現れる
        let mut offset = 0;
        for (name, value) in &headers {
            let line = format!("{}: {}\r\n", name, value);
            let pos = encoded[offset..].find(&line);
            prop_assert!(pos.is_some(), "missing header line: {}", line);
            offset += pos.unwrap() + line.len();
        }
    }

    // Connection 行はちょうど 1 行 (ユーザー未指定ならデフォルトが入る)
    #[test]
    fn exactly_one_connection_line(
        method in method_strategy(),
        host in host(),
        headers in user_headers(),
    ) {
        let head = RequestHead {
            method,
            target: "/",
            host: &host,
            user_headers: &headers,
            ..RequestHead::default()
        };
        let encoded = head.encode();
        let count = encoded.matches("\r\nConnection: ").count();
        prop_assert_eq!(count, 1);
        prop_assert!(encoded.contains("\r\nConnection: keep-alive\r\n"));
    }

    // Content-Length はルール通りにのみ出力される
    #[test]
    fn content_length_rule(
        method in method_strategy(),
        content_type in content_type_strategy(),
        body_len in 0usize..4096,
    ) {
        let expected = if body_len > 0 {
            Some(body_len as u64)
        } else if method == Method::Post && !content_type.is_multipart() {
            Some(0)
        } else {
            None
        };
        prop_assert_eq!(content_length_for(method, content_type, body_len), expected);

        let head = RequestHead {
            method,
            target: "/",
            host: "example.com",
            content_length: content_length_for(method, content_type, body_len),
            ..RequestHead::default()
        };
        let encoded = head.encode();
        match expected {
            Some(len) => prop_assert!(
                encoded.contains(&format!("\r\nContent-Length: {}\r\n", len)),
                "missing Content-Length header"
            ),
            None => prop_assert!(!encoded.contains("\r\nContent-Length: ")),
        }
    }
}
