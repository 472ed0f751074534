//! 不完全な入力に対するパーサーの挙動テスト
//!
//! 受信途中のバッファ (ヘッダーブロックが `\r\n\r\n` まで届いていない、
//! チャンクサイズ行が途切れている) をクライアントの I/O 層がどう扱うかは、
//! 「区切りが見つかるまで読み足す」という判定に依存している。
//! PBT は完全な入力のラウンドトリップを検証するが、途中で切れたデータは
//! 生成器から自然には出てこないため、ここで個別に固定する。

use shiguredo_httpws::response::{find_crlf, find_double_crlf, parse_chunk_size, ResponseHead};

/// ヘッダーブロックが完結するまで find_double_crlf は None を返す
#[test]
fn incomplete_head_is_not_found() {
    let full = b"HTTP/1.1 200 OK\r\nContent-Length: 5\r\n\r\nworld";
    for cut in 0..38 {
        assert_eq!(
            find_double_crlf(&full[..cut]),
            None,
            "premature match at cut={}",
            cut
        );
    }
    // 38 バイト目で初めてヘッダーブロックが完結する
    assert_eq!(find_double_crlf(full), Some(38));
}

/// 完結したヘッダーブロックはボディの先頭バイトが混ざっていてもパースできる
#[test]
fn head_parse_ignores_trailing_bytes_before_terminator() {
    let full = b"HTTP/1.1 200 OK\r\nContent-Length: 5\r\n\r\nworld";
    let head_end = find_double_crlf(full).unwrap();
    let head = ResponseHead::parse(&full[..head_end]).unwrap();
    assert_eq!(head.status_code, 200);
    assert_eq!(head.content_length().unwrap(), Some(5));
    // 残り (= ボディ) は呼び出し側のバッファに残る
    assert_eq!(&full[head_end..], b"world");
}

/// チャンクサイズ行も CRLF が届くまでは行として成立しない
#[test]
fn incomplete_chunk_size_line() {
    let line = b"1a;ext=1\r\n";
    for cut in 0..10 {
        assert_eq!(find_crlf(&line[..cut]), None, "premature match at cut={}", cut);
    }
    let end = find_crlf(line).unwrap();
    assert_eq!(end, 10);
    // CRLF を除いた行をパースする
    assert_eq!(parse_chunk_size(&line[..end - 2]).unwrap(), 0x1a);
}

/// 終端チャンクのサイズ行
#[test]
fn last_chunk_size_line() {
    assert_eq!(parse_chunk_size(b"0").unwrap(), 0);
    assert_eq!(parse_chunk_size(b"000").unwrap(), 0);
}
