//! The abstract HTTP message model exchanged with the application layer.
//! Grounded on `CodecHttp2.cpp`'s use of `HttpMsg` across `Encode`/`Decode`.

use bytes::Bytes;
use std::collections::HashSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageType {
    Request,
    Response,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpgradeInfo {
    pub is_upgrade: bool,
    pub protocol: String,
}

#[derive(Debug, Clone)]
pub struct Message {
    pub message_type: MessageType,
    /// 0 until assigned by `ConnectionCodec::encode` for outbound requests.
    pub stream_id: u32,
    pub method: Option<String>,
    pub path: Option<String>,
    pub status_code: Option<u16>,
    pub scheme: Option<String>,
    pub authority: Option<String>,
    /// Regular headers, insertion order preserved, names lowercased.
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
    pub trailer_headers: Vec<(String, String)>,
    /// Pseudo-headers in their original wire order, populated on decode.
    pub pseudo_headers: Vec<(String, String)>,
    pub with_huffman: bool,
    pub settings: Vec<(u16, u32)>,
    pub adding_never_index_headers: HashSet<String>,
    pub adding_without_index_headers: HashSet<String>,
    /// 0 means "no dynamic table size update accompanies this message".
    pub dynamic_table_update_size: u32,
    /// When set, `Stream::encode` emits one DATA frame per call instead of
    /// coalescing up to the negotiated MAX_FRAME_SIZE.
    pub chunk_notice: bool,
    pub upgrade: UpgradeInfo,
}

impl Message {
    pub fn request() -> Self {
        Self::new(MessageType::Request)
    }

    pub fn response() -> Self {
        Self::new(MessageType::Response)
    }

    fn new(message_type: MessageType) -> Self {
        Self {
            message_type,
            stream_id: 0,
            method: None,
            path: None,
            status_code: None,
            scheme: None,
            authority: None,
            headers: Vec::new(),
            body: Bytes::new(),
            trailer_headers: Vec::new(),
            pseudo_headers: Vec::new(),
            with_huffman: true,
            settings: Vec::new(),
            adding_never_index_headers: HashSet::new(),
            adding_without_index_headers: HashSet::new(),
            dynamic_table_update_size: 0,
            chunk_notice: false,
            upgrade: UpgradeInfo::default(),
        }
    }

    pub fn add_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.headers.push((name.into().to_ascii_lowercase(), value.into()));
    }
}

/// Classify an incoming header by pseudo-header name, appending it to the
/// right field of `message`. Once the body has started accumulating,
/// subsequent header events become trailers, mirroring
/// `CodecHttp2.cpp::ClassifyHeader`'s body-already-present branch.
pub fn classify_header(message: &mut Message, name: &str, value: &str, body_started: bool) {
    if body_started {
        message.trailer_headers.push((name.to_string(), value.to_string()));
        return;
    }
    match name {
        ":method" => {
            message.pseudo_headers.push((name.to_string(), value.to_string()));
            message.method = Some(value.to_string());
        }
        ":path" => {
            message.pseudo_headers.push((name.to_string(), value.to_string()));
            message.path = Some(value.to_string());
        }
        ":scheme" => {
            message.pseudo_headers.push((name.to_string(), value.to_string()));
            message.scheme = Some(value.to_string());
        }
        ":authority" => {
            message.pseudo_headers.push((name.to_string(), value.to_string()));
            message.authority = Some(value.to_string());
        }
        ":status" => {
            message.pseudo_headers.push((name.to_string(), value.to_string()));
            message.status_code = value.parse().ok();
        }
        _ => {
            message.headers.push((name.to_string(), value.to_string()));
        }
    }
}
