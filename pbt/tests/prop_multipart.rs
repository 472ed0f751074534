//! multipart 生成のプロパティテスト
//!
//! 事前計算した Content-Length が、同じフォーマッターで組み立てた
//! ボディの実バイト数と常に一致することを確認する。

use pbt::{field_name, file_name};
use proptest::prelude::*;
use shiguredo_httpws::multipart::{
    closing_boundary, content_length, format_part_head, PartInfo, BOUNDARY,
};

/// パートの素: (名前, ファイル名の有無, ボディ)
fn part_strategy() -> impl Strategy<Value = (String, Option<String>, Vec<u8>)> {
    (
        field_name(),
        proptest::option::of(file_name()),
        proptest::collection::vec(any::<u8>(), 0..512),
    )
}

/// 名前が一意なパート列
fn parts_strategy() -> impl Strategy<Value = Vec<(String, Option<String>, Vec<u8>)>> {
    proptest::collection::vec(part_strategy(), 1..6).prop_filter("unique names", |parts| {
        let mut names: Vec<&str> = parts.iter().map(|(name, _, _)| name.as_str()).collect();
        names.sort();
        names.dedup();
        names.len() == parts.len()
    })
}

proptest! {
    // 事前計算した Content-Length = 実際に組み立てたボディのバイト数
    #[test]
    fn content_length_matches_assembled_body(parts in parts_strategy()) {
        let computed = content_length(
            BOUNDARY,
            parts.iter().map(|(name, filename, body)| PartInfo {
                name,
                filename: filename.as_deref(),
                size: body.len() as u64,
            }),
        );

        let mut assembled = Vec::new();
        for (name, filename, body) in &parts {
            assembled.extend_from_slice(
                format_part_head(BOUNDARY, name, filename.as_deref()).as_bytes(),
            );
            assembled.extend_from_slice(body);
            assembled.extend_from_slice(b"\r\n");
        }
        assembled.extend_from_slice(closing_boundary(BOUNDARY).as_bytes());

        prop_assert_eq!(computed, assembled.len() as u64);
    }

    // パートヘッダーは常に境界行で始まり空行で終わる
    #[test]
    fn part_head_shape(name in field_name(), filename in proptest::option::of(file_name())) {
        let head = format_part_head(BOUNDARY, &name, filename.as_deref());
        prop_assert!(head.starts_with(&format!("--{}\r\n", BOUNDARY)), "missing boundary line");
        prop_assert!(head.ends_with("\r\n\r\n"));
        prop_assert!(head.contains(&format!("name=\"{}\"", name)), "missing name field");
        if let Some(filename) = &filename {
            prop_assert!(head.contains(&format!("filename=\"{}\"", filename)), "missing filename field");
        }
    }
}

#[test]
fn closing_boundary_shape() {
    assert_eq!(
        closing_boundary(BOUNDARY),
        format!("--{}--\r\n", BOUNDARY)
    );
}
