//! WebSocket チャネル
//!
//! アップグレード完了後のソケットを読み書きに分割し、読み取り側は専用
//! タスクのフレーム読み取りループが所有する。書き込み側は非同期 Mutex
//! 越しに共有され、ユーザーの送信と読み取りループの close 応答が
//! 直列化される (同時に書き込まないという契約の実装形)。

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use shiguredo_httpws::websocket::{
    apply_mask, close_code, encode_close_payload, encode_frame_header, parse_frame_header,
    split_close_payload, FrameParse, Opcode,
};
use tokio::io::{AsyncReadExt, AsyncWriteExt, ReadHalf, WriteHalf};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::error::{Error, Result};
use crate::transport::{ConnStream, RecvBuf};

/// 受信した WebSocket メッセージ
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WsMessage {
    /// フレームの opcode
    pub opcode: Opcode,
    /// ペイロード (マスク解除済み)
    pub payload: Vec<u8>,
}

/// メッセージコールバック
///
/// 読み取りエラー時は `Err` を一度だけ受け取り、その後ループは終了する。
pub type OnMessage = Box<dyn FnMut(Result<WsMessage>) + Send>;

/// クローズコールバック (2 バイトのステータスコードを除いた理由を受け取る)
pub type OnClose = Box<dyn FnMut(Vec<u8>) + Send>;

/// アップグレード済み接続のチャネル
pub(crate) struct WsChannel {
    writer: Arc<Mutex<WriteHalf<ConnStream>>>,
    closed: Arc<AtomicBool>,
    reader_task: JoinHandle<()>,
}

impl WsChannel {
    /// ストリームを分割して読み取りループを起動する
    pub fn spawn(
        stream: ConnStream,
        on_message: Option<OnMessage>,
        on_close: Option<OnClose>,
    ) -> Self {
        let (read_half, write_half) = tokio::io::split(stream);
        let writer = Arc::new(Mutex::new(write_half));
        let closed = Arc::new(AtomicBool::new(false));
        let reader_task = tokio::spawn(reader_loop(
            read_half,
            writer.clone(),
            closed.clone(),
            on_message,
            on_close,
        ));
        Self {
            writer,
            closed,
            reader_task,
        }
    }

    /// 読み取りループが終了済みかどうか
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// フレームを送信する
    ///
    /// `opcode` が close の場合、ペイロードは
    /// `{2 バイトコード (normal), 理由}` に組み替えられる。
    pub async fn send(&self, msg: Vec<u8>, mask: bool, opcode: Opcode) -> Result<()> {
        if self.is_closed() {
            return Err(Error::NotConnected);
        }

        let mut payload = msg;
        if opcode == Opcode::Close {
            payload = encode_close_payload(close_code::NORMAL, &payload);
        }

        let mask_key = if mask {
            Some(rand::random::<[u8; 4]>())
        } else {
            None
        };
        if let Some(key) = mask_key {
            apply_mask(&mut payload, key);
        }
        let header = encode_frame_header(payload.len(), opcode, mask_key);

        let mut writer = self.writer.lock().await;
        writer.write_all(&header).await?;
        writer.write_all(&payload).await?;
        Ok(())
    }

    /// 書き込み側を閉じ、読み取りループを止める
    pub async fn shutdown(self) {
        {
            let mut writer = self.writer.lock().await;
            let _ = writer.shutdown().await;
        }
        self.closed.store(true, Ordering::Release);
        self.reader_task.abort();
    }
}

/// ちょうど `n` バイトを読み取って `buf` に追記する
async fn read_exact_into(
    reader: &mut ReadHalf<ConnStream>,
    buf: &mut RecvBuf,
    n: usize,
) -> Result<()> {
    let mut tmp = [0u8; 8192];
    let mut remaining = n;
    while remaining > 0 {
        let want = remaining.min(tmp.len());
        let got = reader.read(&mut tmp[..want]).await?;
        if got == 0 {
            return Err(Error::ConnectionClosed);
        }
        buf.extend(&tmp[..got]);
        remaining -= got;
    }
    Ok(())
}

/// フレーム読み取りループ
///
/// close フレーム受信時は `on_close` を一度だけ呼び、応答の close フレーム
/// (マスクなし、本文 "close") を送信してからソケットを閉じて終了する。
/// 読み取りエラー時は `on_message` に `Err` を届けてから終了する。
async fn reader_loop(
    mut reader: ReadHalf<ConnStream>,
    writer: Arc<Mutex<WriteHalf<ConnStream>>>,
    closed: Arc<AtomicBool>,
    mut on_message: Option<OnMessage>,
    mut on_close: Option<OnClose>,
) {
    let mut buf = RecvBuf::new();
    let mut header_size = 2usize;

    loop {
        if buf.len() < header_size {
            let need = header_size - buf.len();
            if let Err(e) = read_exact_into(&mut reader, &mut buf, need).await {
                deliver_error(&mut on_message, e);
                break;
            }
        }

        let header = match parse_frame_header(buf.as_slice()) {
            Ok(FrameParse::NeedMore(n)) => {
                header_size += n;
                continue;
            }
            Ok(FrameParse::Header(header)) => header,
            Err(e) => {
                deliver_error(&mut on_message, e.into());
                break;
            }
        };
        buf.consume(header.header_len);

        let payload_len = header.payload_len as usize;
        if buf.len() < payload_len {
            let need = payload_len - buf.len();
            if let Err(e) = read_exact_into(&mut reader, &mut buf, need).await {
                deliver_error(&mut on_message, e);
                break;
            }
        }

        let mut payload = buf.take_front(payload_len);
        if let Some(key) = header.mask_key {
            apply_mask(&mut payload, key);
        }

        if header.opcode == Opcode::Close {
            let (_code, reason) = split_close_payload(&payload);
            if let Some(callback) = on_close.as_mut() {
                callback(reason.to_vec());
            }

            let close_payload = encode_close_payload(close_code::NORMAL, b"close");
            let close_header = encode_frame_header(close_payload.len(), Opcode::Close, None);
            let mut writer = writer.lock().await;
            let _ = writer.write_all(&close_header).await;
            let _ = writer.write_all(&close_payload).await;
            let _ = writer.shutdown().await;
            break;
        }

        if let Some(callback) = on_message.as_mut() {
            callback(Ok(WsMessage {
                opcode: header.opcode,
                payload,
            }));
        }

        buf.clear();
        header_size = 2;
    }

    closed.store(true, Ordering::Release);
}

fn deliver_error(on_message: &mut Option<OnMessage>, error: Error) {
    if let Some(callback) = on_message.as_mut() {
        callback(Err(error));
    }
}
