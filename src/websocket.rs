//! WebSocket フレームコーデック (RFC 6455)
//!
//! ## 概要
//!
//! WebSocket フレームヘッダーのパース/生成、ペイロードのマスク処理、
//! close ペイロードの組み立てを提供します。ソケット I/O は行いません
//! (Sans I/O)。
//!
//! ## 使い方
//!
//! ```rust
//! use shiguredo_httpws::websocket::{encode_frame_header, parse_frame_header, FrameParse, Opcode};
//!
//! let header = encode_frame_header(5, Opcode::Text, None);
//! assert_eq!(header, vec![0x81, 0x05]);
//!
//! match parse_frame_header(&header).unwrap() {
//!     FrameParse::Header(h) => {
//!         assert_eq!(h.opcode, Opcode::Text);
//!         assert_eq!(h.payload_len, 5);
//!     }
//!     FrameParse::NeedMore(_) => unreachable!(),
//! }
//! ```

use core::fmt;

/// ハンドシェイクで使用するデフォルトの Sec-WebSocket-Key
///
/// 呼び出し側が鍵を指定しなかった場合に使用される固定値。
pub const DEFAULT_SEC_KEY: &str = "s//GYHa/XO7Hd2F2eOGfyA==";

/// Sec-WebSocket-Version ヘッダー値
pub const SEC_WEBSOCKET_VERSION: &str = "13";

/// close ステータスコード (RFC 6455 Section 7.4.1)
pub mod close_code {
    /// 正常終了
    pub const NORMAL: u16 = 1000;
    /// 接続先の退出
    pub const GOING_AWAY: u16 = 1001;
    /// プロトコルエラー
    pub const PROTOCOL_ERROR: u16 = 1002;
}

/// フレームパースエラー
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebSocketError {
    /// 未定義の opcode
    InvalidOpcode(u8),
    /// ペイロード長の最上位ビットが立っている (RFC 6455 で禁止)
    InvalidPayloadLength,
}

impl fmt::Display for WebSocketError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WebSocketError::InvalidOpcode(op) => write!(f, "invalid opcode: 0x{:x}", op),
            WebSocketError::InvalidPayloadLength => write!(f, "invalid payload length"),
        }
    }
}

impl std::error::Error for WebSocketError {}

/// フレーム opcode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Opcode {
    Continuation,
    Text,
    Binary,
    Close,
    Ping,
    Pong,
}

impl Opcode {
    /// opcode 値から変換
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0x0 => Some(Opcode::Continuation),
            0x1 => Some(Opcode::Text),
            0x2 => Some(Opcode::Binary),
            0x8 => Some(Opcode::Close),
            0x9 => Some(Opcode::Ping),
            0xa => Some(Opcode::Pong),
            _ => None,
        }
    }

    /// opcode 値に変換
    pub fn as_u8(&self) -> u8 {
        match self {
            Opcode::Continuation => 0x0,
            Opcode::Text => 0x1,
            Opcode::Binary => 0x2,
            Opcode::Close => 0x8,
            Opcode::Ping => 0x9,
            Opcode::Pong => 0xa,
        }
    }

    /// 制御フレームかどうか
    pub fn is_control(&self) -> bool {
        matches!(self, Opcode::Close | Opcode::Ping | Opcode::Pong)
    }
}

/// パース済みフレームヘッダー
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    /// FIN ビット
    pub fin: bool,
    /// opcode
    pub opcode: Opcode,
    /// ペイロード長
    pub payload_len: u64,
    /// マスクキー (マスクされている場合のみ)
    pub mask_key: Option<[u8; 4]>,
    /// ヘッダー全体のバイト数
    pub header_len: usize,
}

/// フレームヘッダーのパース結果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameParse {
    /// ヘッダーの残りをパースするにはあと N バイト必要
    NeedMore(usize),
    /// パース完了
    Header(FrameHeader),
}

/// フレームヘッダーをパース
///
/// `buf` はフレーム先頭からのバイト列。ヘッダー全体に足りない場合は
/// `NeedMore(不足バイト数)` を返すので、読み足してから再度呼び出す。
pub fn parse_frame_header(buf: &[u8]) -> Result<FrameParse, WebSocketError> {
    if buf.len() < 2 {
        return Ok(FrameParse::NeedMore(2 - buf.len()));
    }

    let b0 = buf[0];
    let b1 = buf[1];
    let fin = b0 & 0x80 != 0;
    let opcode =
        Opcode::from_u8(b0 & 0x0f).ok_or(WebSocketError::InvalidOpcode(b0 & 0x0f))?;
    let masked = b1 & 0x80 != 0;
    let len7 = b1 & 0x7f;

    let ext_len = match len7 {
        126 => 2,
        127 => 8,
        _ => 0,
    };
    let mask_len = if masked { 4 } else { 0 };
    let header_len = 2 + ext_len + mask_len;

    if buf.len() < header_len {
        return Ok(FrameParse::NeedMore(header_len - buf.len()));
    }

    let payload_len = match len7 {
        126 => u16::from_be_bytes([buf[2], buf[3]]) as u64,
        127 => {
            let len = u64::from_be_bytes([
                buf[2], buf[3], buf[4], buf[5], buf[6], buf[7], buf[8], buf[9],
            ]);
            if len & (1 << 63) != 0 {
                return Err(WebSocketError::InvalidPayloadLength);
            }
            len
        }
        n => n as u64,
    };

    let mask_key = if masked {
        let offset = 2 + ext_len;
        Some([
            buf[offset],
            buf[offset + 1],
            buf[offset + 2],
            buf[offset + 3],
        ])
    } else {
        None
    };

    Ok(FrameParse::Header(FrameHeader {
        fin,
        opcode,
        payload_len,
        mask_key,
        header_len,
    }))
}

/// フレームヘッダーを生成
///
/// FIN ビットは常に立てる (フラグメント送信は行わない)。
/// `mask_key` を渡した場合はマスクビットを立ててキーを埋め込む。
/// ペイロード自体のマスク処理は `apply_mask()` で別途行う。
pub fn encode_frame_header(
    payload_len: usize,
    opcode: Opcode,
    mask_key: Option<[u8; 4]>,
) -> Vec<u8> {
    let mut header = Vec::with_capacity(14);
    header.push(0x80 | opcode.as_u8());

    let mask_bit = if mask_key.is_some() { 0x80 } else { 0x00 };
    if payload_len < 126 {
        header.push(mask_bit | payload_len as u8);
    } else if payload_len <= u16::MAX as usize {
        header.push(mask_bit | 126);
        header.extend_from_slice(&(payload_len as u16).to_be_bytes());
    } else {
        header.push(mask_bit | 127);
        header.extend_from_slice(&(payload_len as u64).to_be_bytes());
    }

    if let Some(key) = mask_key {
        header.extend_from_slice(&key);
    }

    header
}

/// ペイロードにマスクを適用/解除する (XOR は自己逆元)
pub fn apply_mask(payload: &mut [u8], key: [u8; 4]) {
    for (i, byte) in payload.iter_mut().enumerate() {
        *byte ^= key[i % 4];
    }
}

/// close フレームのペイロードを生成 (`2 バイト BE コード + 理由`)
pub fn encode_close_payload(code: u16, reason: &[u8]) -> Vec<u8> {
    let mut payload = Vec::with_capacity(2 + reason.len());
    payload.extend_from_slice(&code.to_be_bytes());
    payload.extend_from_slice(reason);
    payload
}

/// close フレームのペイロードを分解して (コード, 理由) を返す
///
/// ペイロードが 2 バイト未満の場合はコードなしとみなし
/// `close_code::NORMAL` を返す。
pub fn split_close_payload(payload: &[u8]) -> (u16, &[u8]) {
    if payload.len() < 2 {
        return (close_code::NORMAL, &[]);
    }
    let code = u16::from_be_bytes([payload[0], payload[1]]);
    (code, &payload[2..])
}
