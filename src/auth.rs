//! プロキシ認証 (Basic / Bearer)
//!
//! ## 概要
//!
//! `Proxy-Authorization` ヘッダー値の生成を提供します。
//! Basic 認証 (RFC 7617) と Bearer トークン (RFC 6750) に対応します。
//!
//! ## 使い方
//!
//! ```rust
//! use shiguredo_httpws::auth::{BasicAuth, BearerToken};
//!
//! let auth = BasicAuth::new("user", "password");
//! assert_eq!(auth.to_header_value(), "Basic dXNlcjpwYXNzd29yZA==");
//!
//! let token = BearerToken::new("abc.def");
//! assert_eq!(token.to_header_value(), "Bearer abc.def");
//! ```

use core::fmt;

/// 認証ヘッダー生成エラー
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// 空のユーザー名
    EmptyUsername,
    /// 空のトークン
    EmptyToken,
    /// ユーザー名にコロンが含まれる (RFC 7617 で禁止)
    ColonInUsername,
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthError::EmptyUsername => write!(f, "empty username"),
            AuthError::EmptyToken => write!(f, "empty token"),
            AuthError::ColonInUsername => write!(f, "username must not contain a colon"),
        }
    }
}

impl std::error::Error for AuthError {}

/// Basic 認証
///
/// RFC 7617 Section 2
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BasicAuth {
    /// ユーザー名
    username: String,
    /// パスワード
    password: String,
}

impl BasicAuth {
    /// 新しい Basic 認証を作成
    pub fn new(username: &str, password: &str) -> Self {
        BasicAuth {
            username: username.to_string(),
            password: password.to_string(),
        }
    }

    /// ユーザー名を取得
    pub fn username(&self) -> &str {
        &self.username
    }

    /// パスワードを取得
    pub fn password(&self) -> &str {
        &self.password
    }

    /// `Basic <base64(user:pass)>` 形式のヘッダー値を生成
    pub fn to_header_value(&self) -> String {
        let credentials = format!("{}:{}", self.username, self.password);
        format!("Basic {}", base64_encode(credentials.as_bytes()))
    }

    /// ユーザー名を検証してからヘッダー値を生成
    ///
    /// RFC 7617 Section 2: ユーザー名にコロンを含めてはならない
    pub fn try_to_header_value(&self) -> Result<String, AuthError> {
        if self.username.is_empty() {
            return Err(AuthError::EmptyUsername);
        }
        if self.username.contains(':') {
            return Err(AuthError::ColonInUsername);
        }
        Ok(self.to_header_value())
    }
}

/// Bearer トークン
///
/// RFC 6750 Section 2.1
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BearerToken {
    token: String,
}

impl BearerToken {
    /// 新しい Bearer トークンを作成
    pub fn new(token: &str) -> Self {
        BearerToken {
            token: token.to_string(),
        }
    }

    /// トークンを取得
    pub fn token(&self) -> &str {
        &self.token
    }

    /// `Bearer <token>` 形式のヘッダー値を生成
    pub fn to_header_value(&self) -> String {
        format!("Bearer {}", self.token)
    }
}

const BASE64_CHARS: &[u8; 64] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";

/// Base64 エンコード (RFC 4648、パディングあり)
fn base64_encode(input: &[u8]) -> String {
    let mut out = String::with_capacity(input.len().div_ceil(3) * 4);
    for chunk in input.chunks(3) {
        let b0 = chunk[0] as u32;
        let b1 = chunk.get(1).copied().unwrap_or(0) as u32;
        let b2 = chunk.get(2).copied().unwrap_or(0) as u32;
        let n = (b0 << 16) | (b1 << 8) | b2;

        out.push(BASE64_CHARS[(n >> 18) as usize & 0x3f] as char);
        out.push(BASE64_CHARS[(n >> 12) as usize & 0x3f] as char);
        out.push(if chunk.len() > 1 {
            BASE64_CHARS[(n >> 6) as usize & 0x3f] as char
        } else {
            '='
        });
        out.push(if chunk.len() > 2 {
            BASE64_CHARS[n as usize & 0x3f] as char
        } else {
            '='
        });
    }
    out
}
