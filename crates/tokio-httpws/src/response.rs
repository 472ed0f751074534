//! レスポンスデータ

use shiguredo_httpws::ResponseHead;

/// 受信済みレスポンス
///
/// ボディはクライアントの受信バッファからコピーして所有する。
/// ダウンロードのようにシンクへストリームした場合、`body` は空になる。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    /// ステータスコード
    pub status: u16,
    /// ステータスフレーズ
    pub reason: String,
    /// ヘッダー
    pub headers: Vec<(String, String)>,
    /// ボディ
    pub body: Vec<u8>,
    /// ボディ消費後に受信バッファが空だったかどうか
    pub eof: bool,
}

impl Response {
    pub(crate) fn from_head(head: ResponseHead, body: Vec<u8>, eof: bool) -> Self {
        Self {
            status: head.status_code,
            reason: head.reason_phrase,
            headers: head.headers,
            body,
            eof,
        }
    }

    /// ヘッダーを取得 (大文字小文字を区別しない)
    pub fn get_header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// ヘッダーが存在するか確認
    pub fn has_header(&self, name: &str) -> bool {
        self.headers
            .iter()
            .any(|(n, _)| n.eq_ignore_ascii_case(name))
    }

    /// ステータスコードが成功 (2xx) か確認
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// ステータスコードがリダイレクト (3xx) か確認
    pub fn is_redirect(&self) -> bool {
        (300..400).contains(&self.status)
    }
}
