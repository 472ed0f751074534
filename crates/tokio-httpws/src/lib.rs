//! tokio_httpws - Tokio integration for shiguredo_httpws
//!
//! tokio と tokio-rustls を使用した、単一接続の非同期 HTTP/1.1 /
//! WebSocket クライアントライブラリ。
//!
//! ## Features
//!
//! - `tls` - HTTPS / WSS 対応 (デフォルト有効)
//!
//! ## 特徴
//!
//! - **shiguredo_httpws ベース**: Sans I/O ライブラリをベースにした設計
//! - **単一接続**: ひとつの TCP 接続をキープアライブで使い回す
//! - **非同期 I/O**: tokio による完全非同期対応
//! - **TLS 対応**: tokio-rustls による HTTPS / WSS 対応
//! - **WebSocket**: 同じ接続でのアップグレードとフレームメッセージング
//!
//! ## クライアント
//!
//! ```ignore
//! use tokio_httpws::{Client, ReqContentType};
//!
//! let mut client = Client::new();
//!
//! // GET (同じ接続で続けてリクエストするとキープアライブで再利用される)
//! let response = client.get("http://example.com/path").await?;
//! println!("{}", response.status);
//!
//! // POST with body
//! let response = client
//!     .post("http://example.com/api", "{\"key\":1}", ReqContentType::Json)
//!     .await?;
//!
//! // タイムアウトとリダイレクト追跡
//! client.set_timeout(std::time::Duration::from_secs(5));
//! client.enable_auto_redirect(true);
//! ```
//!
//! ## WebSocket
//!
//! ```ignore
//! use tokio_httpws::{Client, Opcode};
//!
//! let mut client = Client::new();
//! client.on_ws_msg(|msg| {
//!     if let Ok(msg) = msg {
//!         println!("received: {:?}", msg.payload);
//!     }
//! });
//! client.on_ws_close(|reason| println!("closed: {:?}", reason));
//! client.ws_connect("ws://example.com/chat").await?;
//! client.ws_send("ping", true, Opcode::Text).await?;
//! ```

pub mod client;
mod deadline;
pub mod error;
pub mod response;
pub mod response_ext;
mod transport;
pub mod websocket;

pub use client::{Client, Config, RequestContext};
pub use error::{Error, Result};
pub use response::Response;
pub use response_ext::{JsonError, ResponseExt};
pub use websocket::WsMessage;

#[cfg(feature = "tls")]
pub use transport::{TlsOptions, VerifyMode};

// shiguredo_httpws の型を re-export
pub use shiguredo_httpws::content_type::ReqContentType;
pub use shiguredo_httpws::request::Method;
pub use shiguredo_httpws::websocket::Opcode;
