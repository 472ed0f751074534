//! # shiguredo_httpws
//!
//! 依存なしの HTTP/1.1 + WebSocket クライアントプロトコルライブラリ (Sans I/O)
//!
//! ## 特徴
//!
//! - **依存なし**: 標準ライブラリのみ使用
//! - **Sans I/O**: I/O を完全に分離した設計
//! - **クライアント特化**: リクエスト生成とレスポンス解釈のみを提供
//!
//! 非同期 I/O と組み合わせたクライアント本体は `tokio-httpws` クレートが
//! 提供します。
//!
//! ## 使い方
//!
//! ### リクエストヘッダーの生成
//!
//! ```rust
//! use shiguredo_httpws::request::{Method, RequestHead};
//!
//! let head = RequestHead {
//!     method: Method::Get,
//!     target: "/",
//!     host: "example.com",
//!     ..RequestHead::default()
//! };
//! let bytes = head.encode();
//! // bytes を送信...
//! ```
//!
//! ### レスポンスヘッダーのパース
//!
//! ```rust
//! use shiguredo_httpws::response::ResponseHead;
//!
//! // `\r\n\r\n` まで受信したら...
//! let head = ResponseHead::parse(b"HTTP/1.1 200 OK\r\nContent-Length: 0\r\n\r\n").unwrap();
//! assert_eq!(head.status_code, 200);
//! ```

pub mod auth;
pub mod content_type;
pub mod multipart;
pub mod request;
pub mod response;
pub mod uri;
pub mod websocket;

pub use request::{Method, RequestHead};
pub use response::{ResponseError, ResponseHead};
pub use uri::Uri;
