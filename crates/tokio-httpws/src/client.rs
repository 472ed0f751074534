//! HTTP/HTTPS + WebSocket クライアント
//!
//! 単一の TCP 接続 (必要なら TLS) 上でリクエストを発行する
//! キープアライブ対応クライアント。同じ接続でアップグレード後の
//! WebSocket メッセージングも行う。
//!
//! ## 使い方
//!
//! ```ignore
//! use tokio_httpws::{Client, ReqContentType};
//!
//! // GET
//! let mut client = Client::new();
//! let response = client.get("http://example.com/path").await?;
//!
//! // POST with body
//! let response = client
//!     .post("http://example.com/api", "{\"key\":1}", ReqContentType::Json)
//!     .await?;
//!
//! // multipart アップロード
//! client.add_str_part("field1", "value1");
//! client.add_file_part("file1", "photo.png");
//! let response = client.upload("http://example.com/upload").await?;
//!
//! // WebSocket
//! client.on_ws_msg(|msg| println!("{:?}", msg));
//! client.ws_connect("ws://example.com/chat").await?;
//! client.ws_send("ping", true, tokio_httpws::Opcode::Text).await?;
//! ```

use std::io;
use std::path::Path;
use std::time::Duration;

use shiguredo_httpws::content_type::ReqContentType;
use shiguredo_httpws::multipart::{self, PartInfo, BOUNDARY};
use shiguredo_httpws::request::{content_length_for, Method, RequestHead};
use shiguredo_httpws::response::parse_chunk_size;
use shiguredo_httpws::uri::{ensure_http_scheme, Uri};
use shiguredo_httpws::websocket::{Opcode, DEFAULT_SEC_KEY, SEC_WEBSOCKET_VERSION};
use shiguredo_httpws::ResponseHead;
use tokio::io::{AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::deadline::Deadline;
use crate::error::{Error, Result};
use crate::response::Response;
use crate::transport::{Connection, RecvBuf};
use crate::websocket::{OnClose, OnMessage, WsChannel, WsMessage};

#[cfg(feature = "tls")]
use crate::transport::{build_tls_config, default_tls_config, TlsOptions};
#[cfg(feature = "tls")]
use std::sync::Arc;

/// リクエストコンテキスト
///
/// リクエスト単位のボディと付加ヘッダー。リダイレクト再発行のために
/// Clone 可能。レスポンスボディの出力先 (ダウンロードシンク) は
/// `download()` が内部で扱う。
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    /// ボディの Content-Type タグ
    pub content_type: ReqContentType,
    /// 追加ヘッダーフラグメント (各行 CRLF 終端、例: `Range: bytes=0-9\r\n`)
    pub extra_header: String,
    /// リクエストボディ
    pub content: Vec<u8>,
}

/// クライアント設定
///
/// `Client::init_config()` でまとめて適用する。
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// リクエストタイムアウト (未設定ならタイムアウトなし)
    pub timeout_duration: Option<Duration>,
    /// WebSocket ハンドシェイクの Sec-WebSocket-Key
    pub sec_key: Option<String>,
    /// multipart ファイルパートの 1 回の書き込み上限
    pub max_single_part_size: Option<usize>,
    /// プロキシホスト
    pub proxy_host: Option<String>,
    /// プロキシポート
    pub proxy_port: Option<u16>,
    /// プロキシ Basic 認証ユーザー名
    pub proxy_auth_username: Option<String>,
    /// プロキシ Basic 認証パスワード
    pub proxy_auth_passwd: Option<String>,
    /// プロキシ Bearer トークン
    pub proxy_auth_token: Option<String>,
    /// TLS 設定
    #[cfg(feature = "tls")]
    pub tls: Option<TlsOptions>,
}

/// 接続状態
///
/// `Closed` では保留中の I/O は存在しない。エラーまたは
/// `Connection: close` レスポンスの後は必ず `Closed` に遷移する。
enum ConnState {
    Closed,
    Http(Connection),
    Ws(WsChannel),
}

/// multipart パート
struct FormPart {
    filename: Option<String>,
    content: Vec<u8>,
    size: u64,
}

/// HTTP/1.1 + WebSocket クライアント
///
/// 接続・受信バッファ・保留ヘッダー・multipart レジストリを単一所有する。
/// 同時に実行できるリクエストはひとつ (`&mut self`)。
pub struct Client {
    state: ConnState,
    read_buf: RecvBuf,
    req_headers: Vec<(String, String)>,
    form_data: Vec<(String, FormPart)>,
    max_single_part_size: usize,
    timeout_duration: Option<Duration>,
    proxy: Option<Proxy>,
    proxy_basic_auth: Option<(String, String)>,
    proxy_bearer_token: Option<String>,
    redirect_uri: Option<String>,
    enable_follow_redirect: bool,
    ws_sec_key: Option<String>,
    on_ws_msg: Option<OnMessage>,
    on_ws_close: Option<OnClose>,
    #[cfg(feature = "tls")]
    tls_config: Option<Arc<rustls::ClientConfig>>,
    #[cfg(feature = "tls")]
    tls_domain: String,
}

struct Proxy {
    host: String,
    port: u16,
}

impl Default for Client {
    fn default() -> Self {
        Self::new()
    }
}

impl Client {
    /// 新しいクライアントを作成
    pub fn new() -> Self {
        Self {
            state: ConnState::Closed,
            read_buf: RecvBuf::new(),
            req_headers: Vec::new(),
            form_data: Vec::new(),
            max_single_part_size: 1024 * 1024,
            timeout_duration: None,
            proxy: None,
            proxy_basic_auth: None,
            proxy_bearer_token: None,
            redirect_uri: None,
            enable_follow_redirect: false,
            ws_sec_key: None,
            on_ws_msg: None,
            on_ws_close: None,
            #[cfg(feature = "tls")]
            tls_config: None,
            #[cfg(feature = "tls")]
            tls_domain: String::new(),
        }
    }

    /// 設定をまとめて適用する
    pub fn init_config(&mut self, config: Config) -> Result<()> {
        if let Some(duration) = config.timeout_duration {
            self.set_timeout(duration);
        }
        if let Some(sec_key) = config.sec_key {
            self.set_ws_sec_key(sec_key);
        }
        if let Some(size) = config.max_single_part_size {
            self.set_max_single_part_size(size);
        }
        if let (Some(host), Some(port)) = (config.proxy_host, config.proxy_port) {
            self.set_proxy(&host, port);
        }
        if let (Some(username), Some(passwd)) =
            (config.proxy_auth_username, config.proxy_auth_passwd)
        {
            self.set_proxy_basic_auth(&username, &passwd);
        }
        if let Some(token) = config.proxy_auth_token {
            self.set_proxy_bearer_token_auth(&token);
        }
        #[cfg(feature = "tls")]
        if let Some(tls) = config.tls {
            self.init_tls(&tls)?;
        }
        Ok(())
    }

    /// TLS 設定を初期化する
    ///
    /// https/wss リクエスト前に一度だけ呼ぶ。呼ばなかった場合は
    /// OS のルート証明書ストアによるデフォルト設定が使われる。
    #[cfg(feature = "tls")]
    pub fn init_tls(&mut self, options: &TlsOptions) -> Result<()> {
        self.tls_config = Some(build_tls_config(options)?);
        self.tls_domain = options.domain.clone();
        Ok(())
    }

    /// リクエストタイムアウトを設定する
    pub fn set_timeout(&mut self, duration: Duration) {
        self.timeout_duration = Some(duration);
    }

    /// WebSocket ハンドシェイクの Sec-WebSocket-Key を設定する
    pub fn set_ws_sec_key(&mut self, sec_key: impl Into<String>) {
        self.ws_sec_key = Some(sec_key.into());
    }

    /// multipart ファイルパートの 1 回の書き込み上限を設定する (デフォルト 1 MiB)
    pub fn set_max_single_part_size(&mut self, size: usize) {
        self.max_single_part_size = size;
    }

    /// プロキシを設定する
    ///
    /// 以降の接続はプロキシに対して張られ、リクエストターゲットは
    /// absolute-form に書き換えられる。
    pub fn set_proxy(&mut self, host: &str, port: u16) {
        self.proxy = Some(Proxy {
            host: host.to_string(),
            port,
        });
    }

    /// プロキシ Basic 認証を設定する
    pub fn set_proxy_basic_auth(&mut self, username: &str, password: &str) {
        self.proxy_basic_auth = Some((username.to_string(), password.to_string()));
    }

    /// プロキシ Bearer トークン認証を設定する
    pub fn set_proxy_bearer_token_auth(&mut self, token: &str) {
        self.proxy_bearer_token = Some(token.to_string());
    }

    /// リダイレクト (3xx + Location) の自動追跡を有効にする (1 ホップのみ)
    pub fn enable_auto_redirect(&mut self, enable: bool) {
        self.enable_follow_redirect = enable;
    }

    /// 直近のレスポンスで捕捉したリダイレクト先を取得する
    pub fn get_redirect_uri(&self) -> Option<&str> {
        self.redirect_uri.as_deref()
    }

    /// 接続が閉じているかどうか
    pub fn has_closed(&self) -> bool {
        match &self.state {
            ConnState::Closed => true,
            ConnState::Http(_) => false,
            ConnState::Ws(channel) => channel.is_closed(),
        }
    }

    /// ユーザーヘッダーを追加する
    ///
    /// `Host` は拒否する (エンジンが設定する)。重複キーも拒否する。
    /// ヘッダーはリクエストごとにクリアされる。
    pub fn add_header(&mut self, key: &str, value: &str) -> bool {
        if key.is_empty() || key == "Host" {
            return false;
        }
        if self.req_headers.iter().any(|(name, _)| name == key) {
            return false;
        }
        self.req_headers.push((key.to_string(), value.to_string()));
        true
    }

    /// 文字列パートを登録する (名前はレジストリ内で一意)
    pub fn add_str_part(&mut self, name: &str, content: impl Into<Vec<u8>>) -> bool {
        if self.form_data.iter().any(|(n, _)| n == name) {
            return false;
        }
        let content = content.into();
        let size = content.len() as u64;
        self.form_data.push((
            name.to_string(),
            FormPart {
                filename: None,
                content,
                size,
            },
        ));
        true
    }

    /// ファイルパートを登録する (名前はレジストリ内で一意)
    ///
    /// 登録時にサイズを記録する。ファイルが開けない場合は false。
    pub fn add_file_part(&mut self, name: &str, filename: &str) -> bool {
        if self.form_data.iter().any(|(n, _)| n == name) {
            return false;
        }
        let Ok(metadata) = std::fs::metadata(filename) else {
            return false;
        };
        if !metadata.is_file() {
            return false;
        }
        self.form_data.push((
            name.to_string(),
            FormPart {
                filename: Some(filename.to_string()),
                content: Vec::new(),
                size: metadata.len(),
            },
        ));
        true
    }

    /// WebSocket メッセージコールバックを設定する
    pub fn on_ws_msg(&mut self, callback: impl FnMut(Result<WsMessage>) + Send + 'static) {
        self.on_ws_msg = Some(Box::new(callback));
    }

    /// WebSocket クローズコールバックを設定する
    pub fn on_ws_close(&mut self, callback: impl FnMut(Vec<u8>) + Send + 'static) {
        self.on_ws_close = Some(Box::new(callback));
    }

    // ------------------------------------------------------------
    // HTTP 操作
    // ------------------------------------------------------------

    /// GET リクエストを発行する
    pub async fn get(&mut self, uri: &str) -> Result<Response> {
        self.request(uri, Method::Get, RequestContext::default())
            .await
    }

    /// POST リクエストを発行する
    pub async fn post(
        &mut self,
        uri: &str,
        content: impl Into<Vec<u8>>,
        content_type: ReqContentType,
    ) -> Result<Response> {
        let ctx = RequestContext {
            content_type,
            content: content.into(),
            ..RequestContext::default()
        };
        self.request(uri, Method::Post, ctx).await
    }

    /// PUT リクエストを発行する
    pub async fn put(
        &mut self,
        uri: &str,
        content: impl Into<Vec<u8>>,
        content_type: ReqContentType,
    ) -> Result<Response> {
        let ctx = RequestContext {
            content_type,
            content: content.into(),
            ..RequestContext::default()
        };
        self.request(uri, Method::Put, ctx).await
    }

    /// DELETE リクエストを発行する
    pub async fn delete(
        &mut self,
        uri: &str,
        content: impl Into<Vec<u8>>,
        content_type: ReqContentType,
    ) -> Result<Response> {
        let ctx = RequestContext {
            content_type,
            content: content.into(),
            ..RequestContext::default()
        };
        self.request(uri, Method::Delete, ctx).await
    }

    /// HEAD リクエストを発行する
    pub async fn head(&mut self, uri: &str) -> Result<Response> {
        self.request(uri, Method::Head, RequestContext::default())
            .await
    }

    /// OPTIONS リクエストを発行する
    pub async fn options(&mut self, uri: &str) -> Result<Response> {
        self.request(uri, Method::Options, RequestContext::default())
            .await
    }

    /// TRACE リクエストを発行する
    pub async fn trace(&mut self, uri: &str) -> Result<Response> {
        self.request(uri, Method::Trace, RequestContext::default())
            .await
    }

    /// PATCH リクエストを発行する
    pub async fn patch(&mut self, uri: &str) -> Result<Response> {
        self.request(uri, Method::Patch, RequestContext::default())
            .await
    }

    /// CONNECT リクエストを発行する
    pub async fn connect(&mut self, uri: &str) -> Result<Response> {
        self.request(uri, Method::Connect, RequestContext::default())
            .await
    }

    /// リクエストを発行する
    ///
    /// 接続が閉じていれば接続 (プロキシ設定があればプロキシへ、
    /// https/wss なら TLS ハンドシェイク) してから送信する。
    /// 自動リダイレクトが有効で 3xx + `Location` を受け取った場合は
    /// 同じメソッドで一度だけ再発行する。
    /// ユーザーヘッダーはリクエストごとにクリアされる。
    pub async fn request(
        &mut self,
        uri: &str,
        method: Method,
        ctx: RequestContext,
    ) -> Result<Response> {
        let response = self.request_once(uri, method, &ctx, None).await?;
        if self.enable_follow_redirect && response.is_redirect() {
            if let Some(location) = self.redirect_uri.clone() {
                return self.request_once(&location, method, &ctx, None).await;
            }
        }
        Ok(response)
    }

    /// multipart アップロードを実行する
    ///
    /// 事前に `add_str_part()` / `add_file_part()` で 1 つ以上のパートを
    /// 登録しておく。Content-Length は事前計算して送信し、ファイルは
    /// `max_single_part_size` 以下のスライスでストリームする。
    /// 成否にかかわらずレジストリとユーザーヘッダーはクリアされる。
    pub async fn upload(&mut self, uri: &str) -> Result<Response> {
        let result = self.upload_inner(uri).await;
        self.req_headers.clear();
        self.form_data.clear();
        if result.is_err() {
            self.close_socket().await;
        }
        result
    }

    /// ファイルをひとつ登録してアップロードする
    pub async fn upload_file(&mut self, uri: &str, name: &str, filename: &str) -> Result<Response> {
        if !self.add_file_part(name, filename) {
            return Err(Error::Io(io::Error::new(
                io::ErrorKind::InvalidInput,
                "failed to open file or duplicate part name",
            )));
        }
        self.upload(uri).await
    }

    /// レスポンスボディをファイルへダウンロードする
    ///
    /// `range` は `Range: bytes=<range>` として送られる (例 `"0-9"`)。
    /// ボディはファイルへストリームされ、レスポンスの `body` は空になる。
    pub async fn download(
        &mut self,
        uri: &str,
        path: &str,
        range: Option<&str>,
    ) -> Result<Response> {
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await?;
        let ctx = RequestContext {
            extra_header: match range {
                Some(range) => format!("Range: bytes={}\r\n", range),
                None => String::new(),
            },
            ..RequestContext::default()
        };
        let sink: &mut (dyn AsyncWrite + Unpin + Send) = &mut file;
        self.request_once(uri, Method::Get, &ctx, Some(sink)).await
    }

    /// 接続を強制的に閉じる (冪等)
    pub async fn close(&mut self) {
        self.close_socket().await;
    }

    /// 接続を閉じて受信バッファを捨てる
    ///
    /// クライアント自体は破棄せず、次のリクエストで新しいソケットが
    /// 張り直される。
    pub async fn reset(&mut self) {
        self.close_socket().await;
        self.read_buf.clear();
    }

    /// `reset()` してから GET を発行する
    pub async fn reconnect(&mut self, uri: &str) -> Result<Response> {
        self.reset().await;
        self.get(uri).await
    }

    // ------------------------------------------------------------
    // WebSocket 操作
    // ------------------------------------------------------------

    /// WebSocket 接続を確立する
    ///
    /// GET + Upgrade ヘッダーでハンドシェイクし、101 を受け取ったら
    /// フレーム読み取りループを起動する。以降このクライアントは
    /// `ws_send()` / `ws_close()` 専用になる。
    pub async fn ws_connect(&mut self, uri: &str) -> Result<()> {
        let target_uri = ensure_http_scheme(uri);
        let u = Uri::parse(&target_uri)?;
        if u.is_websocket() {
            let sec_key = self
                .ws_sec_key
                .clone()
                .unwrap_or_else(|| DEFAULT_SEC_KEY.to_string());
            self.add_header("Upgrade", "websocket");
            self.add_header("Connection", "Upgrade");
            self.add_header("Sec-WebSocket-Key", &sec_key);
            self.add_header("Sec-WebSocket-Version", SEC_WEBSOCKET_VERSION);
        }

        let response = self
            .request(&target_uri, Method::Get, RequestContext::default())
            .await?;
        if response.status != 101 {
            self.close_socket().await;
            return Err(Error::UpgradeFailed(response.status));
        }

        let ConnState::Http(conn) = std::mem::replace(&mut self.state, ConnState::Closed) else {
            return Err(Error::NotConnected);
        };
        // アップグレード後のフレームは読み取りループが最初から読む
        self.read_buf.clear();
        let channel = WsChannel::spawn(
            conn.into_stream(),
            self.on_ws_msg.take(),
            self.on_ws_close.take(),
        );
        self.state = ConnState::Ws(channel);
        Ok(())
    }

    /// WebSocket フレームを送信する
    pub async fn ws_send(
        &mut self,
        msg: impl Into<Vec<u8>>,
        mask: bool,
        opcode: Opcode,
    ) -> Result<()> {
        let ConnState::Ws(channel) = &self.state else {
            return Err(Error::NotConnected);
        };
        channel.send(msg.into(), mask, opcode).await
    }

    /// close フレームを送信する
    pub async fn ws_close(&mut self, reason: impl Into<Vec<u8>>) -> Result<()> {
        self.ws_send(reason, false, Opcode::Close).await
    }

    // ------------------------------------------------------------
    // 内部処理
    // ------------------------------------------------------------

    /// 1 回分のリクエストを実行する
    ///
    /// 完了後にユーザーヘッダーをクリアし、エラー時はソケットを閉じる。
    async fn request_once(
        &mut self,
        uri: &str,
        method: Method,
        ctx: &RequestContext,
        sink: Option<&mut (dyn AsyncWrite + Unpin + Send)>,
    ) -> Result<Response> {
        let result = self.request_inner(uri, method, ctx, sink).await;
        self.req_headers.clear();
        if result.is_err() {
            self.close_socket().await;
        }
        result
    }

    async fn request_inner(
        &mut self,
        uri: &str,
        method: Method,
        ctx: &RequestContext,
        sink: Option<&mut (dyn AsyncWrite + Unpin + Send)>,
    ) -> Result<Response> {
        let target_uri = ensure_http_scheme(uri);
        let u = Uri::parse(&target_uri)?;
        let deadline = Deadline::start(self.timeout_duration);
        deadline.run(self.perform(&u, method, ctx, sink)).await
    }

    /// 接続確立 → リクエスト送信 → レスポンス読み取り
    async fn perform(
        &mut self,
        u: &Uri,
        method: Method,
        ctx: &RequestContext,
        sink: Option<&mut (dyn AsyncWrite + Unpin + Send)>,
    ) -> Result<Response> {
        self.redirect_uri = None;
        self.ensure_connected(u).await?;

        let target = self.request_target(u);
        let content_type_value = content_type_header(ctx.content_type);
        let head = RequestHead {
            method,
            target: &target,
            host: u.host(),
            content_type: content_type_value.as_deref(),
            user_headers: &self.req_headers,
            proxy_basic_auth: self
                .proxy_basic_auth
                .as_ref()
                .map(|(username, password)| (username.as_str(), password.as_str())),
            proxy_bearer_token: self.proxy_bearer_token.as_deref(),
            extra: &ctx.extra_header,
            content_length: content_length_for(method, ctx.content_type, ctx.content.len()),
        };
        let mut message = head.encode().into_bytes();
        message.extend_from_slice(&ctx.content);

        let ConnState::Http(conn) = &mut self.state else {
            return Err(Error::NotConnected);
        };
        conn.write_all(&message).await?;

        let (response, keep_alive) = read_response(conn, &mut self.read_buf, method, sink).await?;

        if response.is_redirect() {
            if let Some(location) = response.get_header("Location") {
                self.redirect_uri = Some(location.to_string());
            }
        }
        if !keep_alive {
            self.close_socket().await;
        }
        Ok(response)
    }

    async fn upload_inner(&mut self, uri: &str) -> Result<Response> {
        if self.form_data.is_empty() {
            return Err(Error::Io(io::Error::new(
                io::ErrorKind::InvalidInput,
                "no multipart parts registered",
            )));
        }
        let target_uri = ensure_http_scheme(uri);
        let u = Uri::parse(&target_uri)?;
        let deadline = Deadline::start(self.timeout_duration);
        deadline.run(self.perform_upload(&u)).await
    }

    async fn perform_upload(&mut self, u: &Uri) -> Result<Response> {
        self.redirect_uri = None;
        self.ensure_connected(u).await?;

        // Content-Length はパートヘッダーのフォーマッターから導出する
        let content_len = multipart::content_length(
            BOUNDARY,
            self.form_data.iter().map(|(name, part)| PartInfo {
                name,
                filename: part.filename.as_deref().map(basename),
                size: part.size,
            }),
        );
        self.req_headers
            .push(("Content-Length".to_string(), content_len.to_string()));

        let target = self.request_target(u);
        let content_type_value = content_type_header(ReqContentType::Multipart);
        let head = RequestHead {
            method: Method::Post,
            target: &target,
            host: u.host(),
            content_type: content_type_value.as_deref(),
            user_headers: &self.req_headers,
            proxy_basic_auth: self
                .proxy_basic_auth
                .as_ref()
                .map(|(username, password)| (username.as_str(), password.as_str())),
            proxy_bearer_token: self.proxy_bearer_token.as_deref(),
            extra: "",
            content_length: content_length_for(Method::Post, ReqContentType::Multipart, 0),
        };
        let message = head.encode();

        let max_single_part_size = self.max_single_part_size;
        let ConnState::Http(conn) = &mut self.state else {
            return Err(Error::NotConnected);
        };
        conn.write_all(message.as_bytes()).await?;

        for (name, part) in &self.form_data {
            send_single_part(conn, name, part, max_single_part_size).await?;
        }
        conn.write_all(multipart::closing_boundary(BOUNDARY).as_bytes())
            .await?;

        let (response, keep_alive) =
            read_response(conn, &mut self.read_buf, Method::Post, None).await?;
        if !keep_alive {
            self.close_socket().await;
        }
        Ok(response)
    }

    /// 接続が閉じていれば張り直す
    ///
    /// キープアライブ中でも接続先 (ホスト・ポート・TLS) が変わった場合は
    /// 閉じて張り直す (リダイレクト先が別ホストのケース)。
    async fn ensure_connected(&mut self, u: &Uri) -> Result<()> {
        // WebSocket 稼働中の HTTP リクエストは不可
        if matches!(self.state, ConnState::Ws(_)) {
            return Err(Error::NotConnected);
        }

        let (host, port) = match &self.proxy {
            Some(proxy) => (proxy.host.clone(), proxy.port),
            None => (u.host().to_string(), u.port_or_default()),
        };
        if let ConnState::Http(conn) = &self.state {
            if conn.is_same_target(&host, port, u.is_ssl()) {
                return Ok(());
            }
        }

        self.close_socket().await;
        let conn = Connection::connect(&host, port).await?;
        let conn = if u.is_ssl() {
            self.tls_wrap(conn, u.host()).await?
        } else {
            conn
        };
        self.read_buf.clear();
        self.state = ConnState::Http(conn);
        Ok(())
    }

    #[cfg(feature = "tls")]
    async fn tls_wrap(&self, conn: Connection, host: &str) -> Result<Connection> {
        let config = match &self.tls_config {
            Some(config) => config.clone(),
            None => default_tls_config(),
        };
        let domain = if self.tls_domain.is_empty() {
            host
        } else {
            &self.tls_domain
        };
        conn.handshake_tls(config, domain).await
    }

    #[cfg(not(feature = "tls"))]
    async fn tls_wrap(&self, _conn: Connection, _host: &str) -> Result<Connection> {
        Err(Error::TlsNotEnabled)
    }

    /// リクエストターゲットを決める
    ///
    /// プロキシ使用時は absolute-form (`scheme://host:port/path`) に
    /// 書き換える。ポートが省略されていればスキームのデフォルト
    /// (http=80, https=443) を使う。
    fn request_target(&self, u: &Uri) -> String {
        match &self.proxy {
            Some(_) => {
                let scheme = if u.is_ssl() { "https" } else { "http" };
                format!(
                    "{}://{}:{}{}",
                    scheme,
                    u.host(),
                    u.port_or_default(),
                    u.request_target()
                )
            }
            None => u.request_target(),
        }
    }

    async fn close_socket(&mut self) {
        match std::mem::replace(&mut self.state, ConnState::Closed) {
            ConnState::Closed => {}
            ConnState::Http(mut conn) => conn.shutdown().await,
            ConnState::Ws(channel) => channel.shutdown().await,
        }
    }
}

/// Content-Type ヘッダー値を組み立てる (multipart は境界を連結)
fn content_type_header(content_type: ReqContentType) -> Option<String> {
    content_type.header_value().map(|value| {
        if content_type.is_multipart() {
            format!("{}{}", value, BOUNDARY)
        } else {
            value.to_string()
        }
    })
}

/// ファイルパスから basename を取り出す
fn basename(path: &str) -> &str {
    Path::new(path)
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or(path)
}

/// パートをひとつ送信する
///
/// ファイルパートは `max_single_part_size` 以下のスライスに分けて
/// 書き込む (バックプレッシャーは write_all 任せ)。登録後にファイルが
/// 消えていた場合は `ErrorKind::NotFound` の I/O エラーになる。
async fn send_single_part(
    conn: &mut Connection,
    name: &str,
    part: &FormPart,
    max_single_part_size: usize,
) -> Result<()> {
    match &part.filename {
        Some(path) => {
            let mut file = tokio::fs::File::open(path).await?;
            let head = multipart::format_part_head(BOUNDARY, name, Some(basename(path)));
            conn.write_all(head.as_bytes()).await?;

            let mut buffer = vec![0u8; max_single_part_size.min(part.size as usize).max(1)];
            let mut remaining = part.size;
            while remaining > 0 {
                let want = (remaining as usize).min(max_single_part_size);
                file.read_exact(&mut buffer[..want]).await?;
                conn.write_all(&buffer[..want]).await?;
                remaining -= want as u64;
            }
        }
        None => {
            let head = multipart::format_part_head(BOUNDARY, name, None);
            conn.write_all(head.as_bytes()).await?;
            conn.write_all(&part.content).await?;
        }
    }
    conn.write_all(b"\r\n").await?;
    Ok(())
}

/// レスポンスを読み取る
///
/// 状態機械: ヘッダーブロックまで読む → パース → ボディ戦略
/// (なし / 固定長 / chunked / range)。戻り値は (レスポンス, keep-alive)。
async fn read_response(
    conn: &mut Connection,
    buf: &mut RecvBuf,
    method: Method,
    mut sink: Option<&mut (dyn AsyncWrite + Unpin + Send)>,
) -> Result<(Response, bool)> {
    let head_end = conn.read_until(buf, b"\r\n\r\n").await?;
    let head = ResponseHead::parse(&buf.as_slice()[..head_end])?;
    buf.consume(head_end);

    let mut keep_alive = head.is_keep_alive();

    if method == Method::Head {
        // ボディは読まない。パイプラインはしないので、ヘッダーより後に
        // 受信済みのバイトは次のレスポンスと混ざらないよう捨てる。
        buf.clear();
        return Ok((Response::from_head(head, Vec::new(), true), keep_alive));
    }

    // range と chunked はキープアライブ扱い
    if head.is_ranges() {
        keep_alive = true;
    }
    if head.is_chunked() {
        keep_alive = true;
        let body = read_chunked(conn, buf, &mut sink).await?;
        return Ok((Response::from_head(head, body, true), keep_alive));
    }

    let content_len = head.content_length()?.unwrap_or(0);
    if content_len > buf.len() {
        let need = content_len - buf.len();
        conn.read_exact_into(buf, need).await?;
    }
    let mut body = buf.take_front(content_len);
    let eof = buf.is_empty();

    if let Some(sink) = sink.as_mut() {
        sink.write_all(&body).await?;
        sink.flush().await?;
        body = Vec::new();
    }

    Ok((Response::from_head(head, body, eof), keep_alive))
}

/// chunked ボディを読み取る
///
/// チャンクサイズ 0 で終端。シンクがあればチャンクごとに書き込み、
/// なければ蓄積したボディを返す。
async fn read_chunked(
    conn: &mut Connection,
    buf: &mut RecvBuf,
    sink: &mut Option<&mut (dyn AsyncWrite + Unpin + Send)>,
) -> Result<Vec<u8>> {
    let mut body = Vec::new();
    loop {
        let line_end = conn.read_until(buf, b"\r\n").await?;
        let chunk_size = parse_chunk_size(&buf.as_slice()[..line_end - 2])?;
        buf.consume(line_end);

        if chunk_size == 0 {
            // 終端チャンクの後の CRLF を消費する
            if buf.len() < 2 {
                let need = 2 - buf.len();
                conn.read_exact_into(buf, need).await?;
            }
            buf.consume(2);
            break;
        }

        // チャンクデータ + 末尾 CRLF が揃うまで読む
        if buf.len() < chunk_size + 2 {
            let need = chunk_size + 2 - buf.len();
            conn.read_exact_into(buf, need).await?;
        }
        match sink.as_mut() {
            Some(sink) => {
                sink.write_all(&buf.as_slice()[..chunk_size]).await?;
            }
            None => body.extend_from_slice(&buf.as_slice()[..chunk_size]),
        }
        buf.consume(chunk_size + 2);
    }

    if let Some(sink) = sink.as_mut() {
        sink.flush().await?;
    }
    Ok(body)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_header_rules() {
        let mut client = Client::new();
        assert!(client.add_header("User-Agent", "httpws"));
        // Host は拒否
        assert!(!client.add_header("Host", "example.com"));
        // 重複キーは拒否
        assert!(!client.add_header("User-Agent", "other"));
        // 空キーは拒否
        assert!(!client.add_header("", "x"));
        assert_eq!(client.req_headers.len(), 1);
    }

    #[test]
    fn add_part_rules() {
        let mut client = Client::new();
        assert!(client.add_str_part("field1", "value"));
        assert!(!client.add_str_part("field1", "other"));
        // 存在しないファイルは登録できない
        assert!(!client.add_file_part("file1", "/nonexistent/path/x.bin"));
        assert_eq!(client.form_data.len(), 1);
    }

    #[test]
    fn request_target_rewrite() {
        let mut client = Client::new();
        let u = Uri::parse("http://example.com/path?q=1").unwrap();
        assert_eq!(client.request_target(&u), "/path?q=1");

        client.set_proxy("proxy.local", 3128);
        assert_eq!(
            client.request_target(&u),
            "http://example.com:80/path?q=1"
        );

        let u = Uri::parse("https://example.com:8443/x").unwrap();
        assert_eq!(
            client.request_target(&u),
            "https://example.com:8443/x"
        );
    }

    #[test]
    fn content_type_boundary() {
        let value = content_type_header(ReqContentType::Multipart).unwrap();
        assert_eq!(value, format!("multipart/form-data; boundary={}", BOUNDARY));
        assert_eq!(
            content_type_header(ReqContentType::Json).as_deref(),
            Some("application/json")
        );
        assert_eq!(content_type_header(ReqContentType::None), None);
    }

    #[test]
    fn basename_extraction() {
        assert_eq!(basename("/tmp/dir/photo.png"), "photo.png");
        assert_eq!(basename("photo.png"), "photo.png");
        assert_eq!(basename("dir/"), "dir");
    }
}
