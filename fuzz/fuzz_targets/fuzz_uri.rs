#![no_main]

use libfuzzer_sys::fuzz_target;
use shiguredo_httpws::uri::{ensure_http_scheme, Uri};

fuzz_target!(|data: &[u8]| {
    // UTF-8 文字列として解釈できる場合のみテスト
    if let Ok(s) = std::str::from_utf8(data) {
        // URI パース
        if let Ok(uri) = Uri::parse(s) {
            // パース成功したら各種操作を実行
            assert!(!uri.host().is_empty());
            assert!(uri.path().starts_with('/'));
            let _ = uri.port();
            let _ = uri.port_or_default();
            let _ = uri.query();
            let _ = uri.is_ssl();
            let _ = uri.is_websocket();
            let _ = uri.request_target();
        }

        // スキーム前置の結果は必ず既知のスキームで始まる
        let ensured = ensure_http_scheme(s);
        assert!(
            ensured.starts_with("http://")
                || ensured.starts_with("https://")
                || ensured.starts_with("ws://")
                || ensured.starts_with("wss://")
        );
    }
});
