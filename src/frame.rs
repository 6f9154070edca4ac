//! RFC 7540 Section 4 & 6: the 9-octet frame header and the nine standard
//! frame payload types.

use crate::error::ErrorCode;

#[allow(dead_code)]
pub mod frame_type {
    pub const DATA: u8 = 0x0;
    pub const HEADERS: u8 = 0x1;
    pub const PRIORITY: u8 = 0x2;
    pub const RST_STREAM: u8 = 0x3;
    pub const SETTINGS: u8 = 0x4;
    pub const PUSH_PROMISE: u8 = 0x5;
    pub const PING: u8 = 0x6;
    pub const GOAWAY: u8 = 0x7;
    pub const WINDOW_UPDATE: u8 = 0x8;
    pub const CONTINUATION: u8 = 0x9;
}

#[allow(dead_code)]
pub mod flags {
    pub const END_STREAM: u8 = 0x1;
    pub const ACK: u8 = 0x1;
    pub const END_HEADERS: u8 = 0x4;
    pub const PADDED: u8 = 0x8;
    pub const PRIORITY: u8 = 0x20;
}

#[allow(dead_code)]
pub mod settings_id {
    pub const HEADER_TABLE_SIZE: u16 = 0x1;
    pub const ENABLE_PUSH: u16 = 0x2;
    pub const MAX_CONCURRENT_STREAMS: u16 = 0x3;
    pub const INITIAL_WINDOW_SIZE: u16 = 0x4;
    pub const MAX_FRAME_SIZE: u16 = 0x5;
    pub const MAX_HEADER_LIST_SIZE: u16 = 0x6;
}

pub const FRAME_HEADER_SIZE: usize = 9;
pub const CONNECTION_PREFACE: &[u8] = b"PRI * HTTP/2.0\r\n\r\nSM\r\n\r\n";
pub const DEFAULT_MAX_FRAME_SIZE: u32 = 16384;
pub const MAX_MAX_FRAME_SIZE: u32 = 16_777_215;
pub const DEFAULT_INITIAL_WINDOW_SIZE: u32 = 65535;
pub const MAX_WINDOW_SIZE: u32 = 2_147_483_647;

/// Maximum accumulated header block size across HEADERS + CONTINUATION,
/// bounding memory growth from a stalled or malicious peer.
pub const MAX_HEADER_BLOCK_SIZE: usize = 256 * 1024;

pub fn is_h2c_preface(data: &[u8]) -> bool {
    data.len() >= CONNECTION_PREFACE.len() && &data[..CONNECTION_PREFACE.len()] == CONNECTION_PREFACE
}

/// A parsed 9-byte frame header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    pub length: u32,
    pub frame_type: u8,
    pub flags: u8,
    pub stream_id: u32,
}

impl FrameHeader {
    pub fn parse(data: &[u8]) -> Option<Self> {
        if data.len() < FRAME_HEADER_SIZE {
            return None;
        }
        let length = ((data[0] as u32) << 16) | ((data[1] as u32) << 8) | (data[2] as u32);
        let frame_type = data[3];
        let flags = data[4];
        let stream_id = (((data[5] as u32) << 24)
            | ((data[6] as u32) << 16)
            | ((data[7] as u32) << 8)
            | (data[8] as u32))
            & 0x7FFF_FFFF;
        Some(Self {
            length,
            frame_type,
            flags,
            stream_id,
        })
    }

    pub fn encode(&self) -> [u8; FRAME_HEADER_SIZE] {
        let mut out = [0u8; FRAME_HEADER_SIZE];
        out[0] = (self.length >> 16) as u8;
        out[1] = (self.length >> 8) as u8;
        out[2] = self.length as u8;
        out[3] = self.frame_type;
        out[4] = self.flags;
        let sid = self.stream_id & 0x7FFF_FFFF;
        out[5] = (sid >> 24) as u8;
        out[6] = (sid >> 16) as u8;
        out[7] = (sid >> 8) as u8;
        out[8] = sid as u8;
        out
    }

    pub fn total_size(&self) -> usize {
        FRAME_HEADER_SIZE + self.length as usize
    }

    pub fn is_end_stream(&self) -> bool {
        self.flags & flags::END_STREAM != 0
    }

    pub fn is_end_headers(&self) -> bool {
        self.flags & flags::END_HEADERS != 0
    }

    pub fn is_ack(&self) -> bool {
        self.flags & flags::ACK != 0
    }

    pub fn is_padded(&self) -> bool {
        self.flags & flags::PADDED != 0
    }

    pub fn has_priority(&self) -> bool {
        self.flags & flags::PRIORITY != 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PriorityParams {
    pub dependency: u32,
    pub exclusive: bool,
    pub weight: u8,
}

/// A decoded frame payload, paired with the stream id carried by its
/// header (PRIORITY/RST_STREAM/WINDOW_UPDATE/HEADERS carry it on the
/// frame; SETTINGS/PING/GOAWAY are always stream id 0).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Data {
        stream_id: u32,
        data: Vec<u8>,
        end_stream: bool,
    },
    Headers {
        stream_id: u32,
        header_block_fragment: Vec<u8>,
        end_stream: bool,
        end_headers: bool,
        priority: Option<PriorityParams>,
    },
    Priority {
        stream_id: u32,
        params: PriorityParams,
    },
    RstStream {
        stream_id: u32,
        error_code: u32,
    },
    Settings {
        ack: bool,
        settings: Vec<(u16, u32)>,
    },
    PushPromise {
        stream_id: u32,
        promised_stream_id: u32,
        header_block_fragment: Vec<u8>,
        end_headers: bool,
    },
    Ping {
        ack: bool,
        data: [u8; 8],
    },
    GoAway {
        last_stream_id: u32,
        error_code: u32,
        debug_data: Vec<u8>,
    },
    WindowUpdate {
        stream_id: u32,
        increment: u32,
    },
    Continuation {
        stream_id: u32,
        header_block_fragment: Vec<u8>,
        end_headers: bool,
    },
    /// A frame of a type this codec does not recognize. RFC 7540 Section
    /// 4.1 requires these be ignored rather than treated as errors.
    Unknown {
        frame_type: u8,
    },
}

fn strip_padding(header: &FrameHeader, mut payload: Vec<u8>) -> Result<(Vec<u8>, usize), ErrorCode> {
    let mut offset = 0;
    if header.is_padded() {
        if payload.is_empty() {
            return Err(ErrorCode::ProtocolError);
        }
        let pad_len = payload[0] as usize;
        offset = 1;
        if pad_len >= payload.len() - offset {
            return Err(ErrorCode::ProtocolError);
        }
        let end = payload.len() - pad_len;
        payload.truncate(end);
    }
    Ok((payload, offset))
}

/// Decode the payload matching `header.frame_type`. `max_frame_size` is the
/// negotiated SETTINGS_MAX_FRAME_SIZE bound, enforced before dispatch.
pub fn decode_frame(header: &FrameHeader, payload: Vec<u8>, max_frame_size: u32) -> Result<Frame, ErrorCode> {
    if header.length > max_frame_size {
        return Err(ErrorCode::FrameSizeError);
    }

    match header.frame_type {
        frame_type::DATA => {
            if header.stream_id == 0 {
                return Err(ErrorCode::ProtocolError);
            }
            let (mut data, offset) = strip_padding(header, payload)?;
            if offset > 0 {
                data.drain(..offset);
            }
            Ok(Frame::Data {
                stream_id: header.stream_id,
                data,
                end_stream: header.is_end_stream(),
            })
        }
        frame_type::HEADERS => {
            if header.stream_id == 0 {
                return Err(ErrorCode::ProtocolError);
            }
            let (mut body, mut offset) = strip_padding(header, payload)?;
            let priority = if header.has_priority() {
                if body.len() - offset < 5 {
                    return Err(ErrorCode::FrameSizeError);
                }
                let raw = u32::from_be_bytes([body[offset], body[offset + 1], body[offset + 2], body[offset + 3]]);
                let exclusive = raw & 0x8000_0000 != 0;
                let dependency = raw & 0x7FFF_FFFF;
                let weight = body[offset + 4];
                offset += 5;
                Some(PriorityParams {
                    dependency,
                    exclusive,
                    weight,
                })
            } else {
                None
            };
            if offset > 0 {
                body.drain(..offset);
            }
            Ok(Frame::Headers {
                stream_id: header.stream_id,
                header_block_fragment: body,
                end_stream: header.is_end_stream(),
                end_headers: header.is_end_headers(),
                priority,
            })
        }
        frame_type::PRIORITY => {
            if header.stream_id == 0 {
                return Err(ErrorCode::ProtocolError);
            }
            if payload.len() != 5 {
                return Err(ErrorCode::FrameSizeError);
            }
            let raw = u32::from_be_bytes([payload[0], payload[1], payload[2], payload[3]]);
            Ok(Frame::Priority {
                stream_id: header.stream_id,
                params: PriorityParams {
                    dependency: raw & 0x7FFF_FFFF,
                    exclusive: raw & 0x8000_0000 != 0,
                    weight: payload[4],
                },
            })
        }
        frame_type::RST_STREAM => {
            if header.stream_id == 0 || payload.len() != 4 {
                return Err(ErrorCode::FrameSizeError);
            }
            Ok(Frame::RstStream {
                stream_id: header.stream_id,
                error_code: u32::from_be_bytes([payload[0], payload[1], payload[2], payload[3]]),
            })
        }
        frame_type::SETTINGS => {
            if header.stream_id != 0 || header.length % 6 != 0 {
                return Err(ErrorCode::FrameSizeError);
            }
            let ack = header.is_ack();
            if ack && !payload.is_empty() {
                return Err(ErrorCode::FrameSizeError);
            }
            let mut settings = Vec::with_capacity(payload.len() / 6);
            let mut pos = 0;
            while pos + 6 <= payload.len() {
                let id = u16::from_be_bytes([payload[pos], payload[pos + 1]]);
                let value = u32::from_be_bytes([payload[pos + 2], payload[pos + 3], payload[pos + 4], payload[pos + 5]]);
                settings.push((id, value));
                pos += 6;
            }
            Ok(Frame::Settings { ack, settings })
        }
        frame_type::PUSH_PROMISE => {
            if header.stream_id == 0 {
                return Err(ErrorCode::ProtocolError);
            }
            let (mut body, mut offset) = strip_padding(header, payload)?;
            if body.len() - offset < 4 {
                return Err(ErrorCode::FrameSizeError);
            }
            let promised_stream_id =
                u32::from_be_bytes([body[offset], body[offset + 1], body[offset + 2], body[offset + 3]]) & 0x7FFF_FFFF;
            offset += 4;
            if offset > 0 {
                body.drain(..offset);
            }
            Ok(Frame::PushPromise {
                stream_id: header.stream_id,
                promised_stream_id,
                header_block_fragment: body,
                end_headers: header.is_end_headers(),
            })
        }
        frame_type::PING => {
            if header.stream_id != 0 || payload.len() != 8 {
                return Err(ErrorCode::FrameSizeError);
            }
            let mut data = [0u8; 8];
            data.copy_from_slice(&payload);
            Ok(Frame::Ping {
                ack: header.is_ack(),
                data,
            })
        }
        frame_type::GOAWAY => {
            if header.stream_id != 0 || payload.len() < 8 {
                return Err(ErrorCode::FrameSizeError);
            }
            let last_stream_id = u32::from_be_bytes([payload[0], payload[1], payload[2], payload[3]]) & 0x7FFF_FFFF;
            let error_code = u32::from_be_bytes([payload[4], payload[5], payload[6], payload[7]]);
            Ok(Frame::GoAway {
                last_stream_id,
                error_code,
                debug_data: payload[8..].to_vec(),
            })
        }
        frame_type::WINDOW_UPDATE => {
            if payload.len() != 4 {
                return Err(ErrorCode::FrameSizeError);
            }
            let increment = u32::from_be_bytes([payload[0], payload[1], payload[2], payload[3]]) & 0x7FFF_FFFF;
            if increment == 0 {
                return Err(ErrorCode::ProtocolError);
            }
            Ok(Frame::WindowUpdate {
                stream_id: header.stream_id,
                increment,
            })
        }
        frame_type::CONTINUATION => {
            if header.stream_id == 0 {
                return Err(ErrorCode::ProtocolError);
            }
            Ok(Frame::Continuation {
                stream_id: header.stream_id,
                header_block_fragment: payload,
                end_headers: header.is_end_headers(),
            })
        }
        other => Ok(Frame::Unknown { frame_type: other }),
    }
}

pub fn encode_rst_stream(stream_id: u32, error_code: u32) -> Vec<u8> {
    let header = FrameHeader {
        length: 4,
        frame_type: frame_type::RST_STREAM,
        flags: 0,
        stream_id,
    };
    let mut out = header.encode().to_vec();
    out.extend_from_slice(&error_code.to_be_bytes());
    out
}

pub fn encode_goaway(last_stream_id: u32, error_code: u32, debug_data: &[u8]) -> Vec<u8> {
    let header = FrameHeader {
        length: 8 + debug_data.len() as u32,
        frame_type: frame_type::GOAWAY,
        flags: 0,
        stream_id: 0,
    };
    let mut out = header.encode().to_vec();
    out.extend_from_slice(&(last_stream_id & 0x7FFF_FFFF).to_be_bytes());
    out.extend_from_slice(&error_code.to_be_bytes());
    out.extend_from_slice(debug_data);
    out
}

pub fn encode_settings_ack() -> Vec<u8> {
    FrameHeader {
        length: 0,
        frame_type: frame_type::SETTINGS,
        flags: flags::ACK,
        stream_id: 0,
    }
    .encode()
    .to_vec()
}

pub fn encode_settings(settings: &[(u16, u32)]) -> Vec<u8> {
    let header = FrameHeader {
        length: (settings.len() * 6) as u32,
        frame_type: frame_type::SETTINGS,
        flags: 0,
        stream_id: 0,
    };
    let mut out = header.encode().to_vec();
    for (id, value) in settings {
        out.extend_from_slice(&id.to_be_bytes());
        out.extend_from_slice(&value.to_be_bytes());
    }
    out
}

pub fn encode_ping(ack: bool, data: [u8; 8]) -> Vec<u8> {
    let header = FrameHeader {
        length: 8,
        frame_type: frame_type::PING,
        flags: if ack { flags::ACK } else { 0 },
        stream_id: 0,
    };
    let mut out = header.encode().to_vec();
    out.extend_from_slice(&data);
    out
}

pub fn encode_window_update(stream_id: u32, increment: u32) -> Vec<u8> {
    let header = FrameHeader {
        length: 4,
        frame_type: frame_type::WINDOW_UPDATE,
        flags: 0,
        stream_id,
    };
    let mut out = header.encode().to_vec();
    out.extend_from_slice(&(increment & 0x7FFF_FFFF).to_be_bytes());
    out
}

pub fn encode_headers(stream_id: u32, header_block_fragment: &[u8], end_stream: bool, end_headers: bool) -> Vec<u8> {
    let mut flags_byte = 0u8;
    if end_stream {
        flags_byte |= flags::END_STREAM;
    }
    if end_headers {
        flags_byte |= flags::END_HEADERS;
    }
    let header = FrameHeader {
        length: header_block_fragment.len() as u32,
        frame_type: frame_type::HEADERS,
        flags: flags_byte,
        stream_id,
    };
    let mut out = header.encode().to_vec();
    out.extend_from_slice(header_block_fragment);
    out
}

pub fn encode_continuation(stream_id: u32, header_block_fragment: &[u8], end_headers: bool) -> Vec<u8> {
    let header = FrameHeader {
        length: header_block_fragment.len() as u32,
        frame_type: frame_type::CONTINUATION,
        flags: if end_headers { flags::END_HEADERS } else { 0 },
        stream_id,
    };
    let mut out = header.encode().to_vec();
    out.extend_from_slice(header_block_fragment);
    out
}

pub fn encode_data(stream_id: u32, data: &[u8], end_stream: bool) -> Vec<u8> {
    let header = FrameHeader {
        length: data.len() as u32,
        frame_type: frame_type::DATA,
        flags: if end_stream { flags::END_STREAM } else { 0 },
        stream_id,
    };
    let mut out = header.encode().to_vec();
    out.extend_from_slice(data);
    out
}

pub fn encode_priority(stream_id: u32, params: PriorityParams) -> Vec<u8> {
    let header = FrameHeader {
        length: 5,
        frame_type: frame_type::PRIORITY,
        flags: 0,
        stream_id,
    };
    let mut out = header.encode().to_vec();
    let raw = (params.dependency & 0x7FFF_FFFF) | if params.exclusive { 0x8000_0000 } else { 0 };
    out.extend_from_slice(&raw.to_be_bytes());
    out.push(params.weight);
    out
}
