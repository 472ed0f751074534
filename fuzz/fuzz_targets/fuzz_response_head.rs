#![no_main]

use libfuzzer_sys::fuzz_target;
use shiguredo_httpws::response::{find_double_crlf, ResponseHead};

fuzz_target!(|data: &[u8]| {
    // 任意のバイト列でパニックしないこと
    if let Ok(head) = ResponseHead::parse(data) {
        // パース成功したら各種操作を実行
        assert!((100..=599).contains(&head.status_code));
        let _ = head.is_keep_alive();
        let _ = head.is_chunked();
        let _ = head.is_ranges();
        let _ = head.is_redirect();
        let _ = head.location();
        let _ = head.content_length();
        for (name, _) in &head.headers {
            assert!(!name.is_empty());
        }
    }

    let _ = find_double_crlf(data);
});
