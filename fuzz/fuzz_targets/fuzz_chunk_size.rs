#![no_main]

use libfuzzer_sys::fuzz_target;
use shiguredo_httpws::response::parse_chunk_size;

fuzz_target!(|data: &[u8]| {
    // 任意のバイト列でパニックしないこと (オーバーフロー含む)
    if let Ok(size) = parse_chunk_size(data) {
        // 成功したら先頭は必ず 16 進数
        assert!(data[0].is_ascii_hexdigit());
        // 16 進でフォーマットし直すとラウンドトリップする
        let formatted = format!("{:x}", size);
        assert_eq!(parse_chunk_size(formatted.as_bytes()).unwrap(), size);
    }
});
