#![no_main]

use libfuzzer_sys::fuzz_target;
use shiguredo_httpws::websocket::{parse_frame_header, FrameParse};

fuzz_target!(|data: &[u8]| {
    // 任意のバイト列でパニックしないこと
    match parse_frame_header(data) {
        Ok(FrameParse::NeedMore(n)) => {
            // 不足バイト数は必ず正で、ヘッダー最大長 (14) を超えない
            assert!(n > 0);
            assert!(n <= 14);
        }
        Ok(FrameParse::Header(header)) => {
            assert!(header.header_len >= 2);
            assert!(header.header_len <= 14);
            assert!(header.header_len <= data.len());
        }
        Err(_) => {}
    }
});
