//! トランスポート層
//!
//! TCP ソケット (必要なら TLS でラップ) と受信バッファを所有し、
//! `read_exact_into` / `read_until` / `write_all` の 3 プリミティブを提供する。
//! TLS 有効時も同じプリミティブが TLS ストリーム経由でディスパッチされる。

use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;

use crate::error::{Error, Result};

#[cfg(feature = "tls")]
use std::sync::Arc;
#[cfg(feature = "tls")]
use tokio_rustls::TlsConnector;

/// 受信バッファ
///
/// 末尾に追記し、先頭から消費する可変長バッファ。
/// 直前のレスポンスの未消費の残りだけを保持する。
#[derive(Debug, Default)]
pub(crate) struct RecvBuf {
    buf: Vec<u8>,
}

impl RecvBuf {
    pub fn new() -> Self {
        Self { buf: Vec::new() }
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.buf
    }

    pub fn extend(&mut self, data: &[u8]) {
        self.buf.extend_from_slice(data);
    }

    /// 先頭 `n` バイトを捨てる
    pub fn consume(&mut self, n: usize) {
        self.buf.drain(..n);
    }

    /// 先頭 `n` バイトを取り出す
    pub fn take_front(&mut self, n: usize) -> Vec<u8> {
        let rest = self.buf.split_off(n);
        std::mem::replace(&mut self.buf, rest)
    }

    pub fn clear(&mut self) {
        self.buf.clear();
    }
}

/// 接続ストリーム (平文 TCP または TLS)
pub(crate) enum ConnStream {
    Plain(TcpStream),
    #[cfg(feature = "tls")]
    Tls(Box<tokio_rustls::client::TlsStream<TcpStream>>),
}

impl AsyncRead for ConnStream {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut tokio::io::ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        match self.get_mut() {
            ConnStream::Plain(s) => Pin::new(s).poll_read(cx, buf),
            #[cfg(feature = "tls")]
            ConnStream::Tls(s) => Pin::new(s).poll_read(cx, buf),
        }
    }
}

impl AsyncWrite for ConnStream {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        data: &[u8],
    ) -> Poll<io::Result<usize>> {
        match self.get_mut() {
            ConnStream::Plain(s) => Pin::new(s).poll_write(cx, data),
            #[cfg(feature = "tls")]
            ConnStream::Tls(s) => Pin::new(s).poll_write(cx, data),
        }
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut() {
            ConnStream::Plain(s) => Pin::new(s).poll_flush(cx),
            #[cfg(feature = "tls")]
            ConnStream::Tls(s) => Pin::new(s).poll_flush(cx),
        }
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut() {
            ConnStream::Plain(s) => Pin::new(s).poll_shutdown(cx),
            #[cfg(feature = "tls")]
            ConnStream::Tls(s) => Pin::new(s).poll_shutdown(cx),
        }
    }
}

/// 確立済みの接続
///
/// リダイレクト先が別ホストだった場合の張り直し判定のために
/// 接続先を覚えておく。
pub(crate) struct Connection {
    stream: ConnStream,
    host: String,
    port: u16,
    use_tls: bool,
}

impl Connection {
    /// TCP 接続を確立
    pub async fn connect(host: &str, port: u16) -> Result<Self> {
        let stream = TcpStream::connect((host, port)).await?;
        Ok(Self {
            stream: ConnStream::Plain(stream),
            host: host.to_string(),
            port,
            use_tls: false,
        })
    }

    /// 同じ接続先かどうか
    pub fn is_same_target(&self, host: &str, port: u16, use_tls: bool) -> bool {
        self.host == host && self.port == port && self.use_tls == use_tls
    }

    /// TLS ハンドシェイクを実行してストリームをラップする
    #[cfg(feature = "tls")]
    pub async fn handshake_tls(
        self,
        config: Arc<rustls::ClientConfig>,
        domain: &str,
    ) -> Result<Self> {
        let ConnStream::Plain(tcp) = self.stream else {
            return Err(Error::Tls("stream is already TLS".to_string()));
        };
        let connector = TlsConnector::from(config);
        let server_name = rustls_pki_types::ServerName::try_from(domain.to_string())?;
        let tls = connector
            .connect(server_name, tcp)
            .await
            .map_err(|e| Error::Tls(e.to_string()))?;
        Ok(Self {
            stream: ConnStream::Tls(Box::new(tls)),
            host: self.host,
            port: self.port,
            use_tls: true,
        })
    }

    /// ちょうど `n` バイトを読み取って `buf` に追記する
    pub async fn read_exact_into(&mut self, buf: &mut RecvBuf, n: usize) -> Result<()> {
        let mut tmp = [0u8; 8192];
        let mut remaining = n;
        while remaining > 0 {
            let want = remaining.min(tmp.len());
            let got = self.stream.read(&mut tmp[..want]).await?;
            if got == 0 {
                return Err(Error::ConnectionClosed);
            }
            buf.extend(&tmp[..got]);
            remaining -= got;
        }
        Ok(())
    }

    /// `delim` が現れるまで読み取り、`delim` の直後の位置を返す
    ///
    /// `buf` に既に `delim` が含まれる場合は読み取りを行わない。
    /// `delim` より後のバイトが `buf` に残ることがある。
    pub async fn read_until(&mut self, buf: &mut RecvBuf, delim: &[u8]) -> Result<usize> {
        // 読み足しのたびに境界をまたぐ部分だけ再検索する
        let mut search_from = 0;
        loop {
            if let Some(pos) = find_subsequence(&buf.as_slice()[search_from..], delim) {
                return Ok(search_from + pos + delim.len());
            }
            search_from = buf.len().saturating_sub(delim.len() - 1);

            let mut tmp = [0u8; 8192];
            let got = self.stream.read(&mut tmp).await?;
            if got == 0 {
                return Err(Error::ConnectionClosed);
            }
            buf.extend(&tmp[..got]);
        }
    }

    /// 全バイトを書き込む
    pub async fn write_all(&mut self, data: &[u8]) -> Result<()> {
        self.stream.write_all(data).await?;
        Ok(())
    }

    /// 両方向をシャットダウンする (冪等)
    pub async fn shutdown(&mut self) {
        let _ = self.stream.shutdown().await;
    }

    /// 内部ストリームを取り出す (WebSocket 移行用)
    pub fn into_stream(self) -> ConnStream {
        self.stream
    }
}

fn find_subsequence(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.len() > haystack.len() {
        return None;
    }
    haystack.windows(needle.len()).position(|w| w == needle)
}

/// TLS 検証モード
#[cfg(feature = "tls")]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VerifyMode {
    /// サーバー証明書を検証する
    #[default]
    Peer,
    /// 検証しない (テスト用)
    None,
}

/// TLS 設定
///
/// `base_path` + `cert_file` で信頼する証明書 (PEM) を指定する。
/// どちらも空の場合は OS のルート証明書ストアを使用する。
/// `domain` は証明書のホスト名検証に使用する接続先名の上書き。
#[cfg(feature = "tls")]
#[derive(Debug, Clone, Default)]
pub struct TlsOptions {
    /// 証明書ファイルのディレクトリ
    pub base_path: String,
    /// 証明書ファイル名
    pub cert_file: String,
    /// 検証モード
    pub verify_mode: VerifyMode,
    /// 期待するホスト名 (空ならリクエスト先ホスト)
    pub domain: String,
}

/// OS のルート証明書ストアを使用するデフォルトの TLS 設定を作成
#[cfg(feature = "tls")]
pub(crate) fn default_tls_config() -> Arc<rustls::ClientConfig> {
    Arc::new(
        rustls::ClientConfig::builder()
            .dangerous()
            .with_custom_certificate_verifier(Arc::new(rustls_platform_verifier::Verifier::new()))
            .with_no_client_auth(),
    )
}

/// TlsOptions から rustls::ClientConfig を構築
#[cfg(feature = "tls")]
pub(crate) fn build_tls_config(options: &TlsOptions) -> Result<Arc<rustls::ClientConfig>> {
    use rustls_pki_types::pem::PemObject;
    use rustls_pki_types::CertificateDer;

    if options.verify_mode == VerifyMode::None {
        return Ok(Arc::new(
            rustls::ClientConfig::builder()
                .dangerous()
                .with_custom_certificate_verifier(Arc::new(NoVerification))
                .with_no_client_auth(),
        ));
    }

    if options.base_path.is_empty() && options.cert_file.is_empty() {
        return Ok(default_tls_config());
    }

    let path = std::path::Path::new(&options.base_path).join(&options.cert_file);
    let mut roots = rustls::RootCertStore::empty();
    for cert in CertificateDer::pem_file_iter(&path)
        .map_err(|e| Error::Tls(format!("failed to read {}: {}", path.display(), e)))?
    {
        let cert = cert.map_err(|e| Error::Tls(e.to_string()))?;
        roots.add(cert)?;
    }

    Ok(Arc::new(
        rustls::ClientConfig::builder()
            .with_root_certificates(roots)
            .with_no_client_auth(),
    ))
}

/// 証明書を検証しない verifier (VerifyMode::None 用)
#[cfg(feature = "tls")]
#[derive(Debug)]
struct NoVerification;

#[cfg(feature = "tls")]
impl rustls::client::danger::ServerCertVerifier for NoVerification {
    fn verify_server_cert(
        &self,
        _end_entity: &rustls_pki_types::CertificateDer<'_>,
        _intermediates: &[rustls_pki_types::CertificateDer<'_>],
        _server_name: &rustls_pki_types::ServerName<'_>,
        _ocsp_response: &[u8],
        _now: rustls_pki_types::UnixTime,
    ) -> std::result::Result<rustls::client::danger::ServerCertVerified, rustls::Error> {
        Ok(rustls::client::danger::ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        _message: &[u8],
        _cert: &rustls_pki_types::CertificateDer<'_>,
        _dss: &rustls::DigitallySignedStruct,
    ) -> std::result::Result<rustls::client::danger::HandshakeSignatureValid, rustls::Error> {
        Ok(rustls::client::danger::HandshakeSignatureValid::assertion())
    }

    fn verify_tls13_signature(
        &self,
        _message: &[u8],
        _cert: &rustls_pki_types::CertificateDer<'_>,
        _dss: &rustls::DigitallySignedStruct,
    ) -> std::result::Result<rustls::client::danger::HandshakeSignatureValid, rustls::Error> {
        Ok(rustls::client::danger::HandshakeSignatureValid::assertion())
    }

    fn supported_verify_schemes(&self) -> Vec<rustls::SignatureScheme> {
        vec![
            rustls::SignatureScheme::RSA_PKCS1_SHA256,
            rustls::SignatureScheme::RSA_PKCS1_SHA384,
            rustls::SignatureScheme::RSA_PKCS1_SHA512,
            rustls::SignatureScheme::RSA_PSS_SHA256,
            rustls::SignatureScheme::RSA_PSS_SHA384,
            rustls::SignatureScheme::RSA_PSS_SHA512,
            rustls::SignatureScheme::ECDSA_NISTP256_SHA256,
            rustls::SignatureScheme::ECDSA_NISTP384_SHA384,
            rustls::SignatureScheme::ED25519,
        ]
    }
}
