//! PBT テスト共通ユーティリティ

use proptest::prelude::*;

// ========================================
// HTTP トークン生成 (RFC 9110)
// ========================================

/// ヘッダー名: token 文字のみ (1-24 文字)
pub fn header_name() -> impl Strategy<Value = String> {
    "[a-zA-Z][a-zA-Z0-9-]{0,23}".prop_map(|s| s)
}

/// ヘッダー値: 可視 ASCII (空白を含む、前後空白なし)
pub fn header_value() -> impl Strategy<Value = String> {
    "[!-~]([ -~]{0,30}[!-~])?".prop_map(|s| s)
}

// ========================================
// multipart 生成 (RFC 7578)
// ========================================

/// 有効なフィールド名
pub fn field_name() -> impl Strategy<Value = String> {
    "[a-zA-Z][a-zA-Z0-9_]{0,15}".prop_map(|s| s)
}

/// 有効なファイル名 (既知の拡張子と未知の拡張子の両方)
pub fn file_name() -> impl Strategy<Value = String> {
    (
        "[a-zA-Z0-9_-]{1,16}",
        prop_oneof![
            Just("png".to_string()),
            Just("jpg".to_string()),
            Just("txt".to_string()),
            Just("json".to_string()),
            Just("bin".to_string()),
            Just("unknownext".to_string()),
        ],
    )
        .prop_map(|(stem, ext)| format!("{}.{}", stem, ext))
}

// ========================================
// URI 生成 (クライアント用サブセット)
// ========================================

/// ホスト名
pub fn host() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9-]{0,10}(\\.[a-z]{2,5}){0,2}".prop_map(|s| s)
}

/// パス (`/` 始まり)
pub fn path() -> impl Strategy<Value = String> {
    "(/[a-zA-Z0-9._-]{1,8}){0,4}".prop_map(|s| s)
}
