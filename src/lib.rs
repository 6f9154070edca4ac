//! h2-codec: a sans-I/O HTTP/2 connection codec.
//!
//! This crate translates between a raw byte stream and a structured HTTP
//! message model, implementing RFC 7540 (framing, stream multiplexing, flow
//! control, settings negotiation, priority) and RFC 7541 (HPACK header
//! compression).
//!
//! # Features
//!
//! - **Sans-I/O design**: no bundled socket or TLS layer; callers own the
//!   transport and drive the codec with bytes in, bytes out.
//! - **Full frame codec**: all nine standard HTTP/2 frame types.
//! - **HPACK from scratch**: canonical Huffman coding, the static table, and
//!   a FIFO dynamic table with independent encoder/decoder instances.
//! - **Flow control**: per-connection and per-stream windows, with outbound
//!   buffering and priority-ordered draining when windows reopen.
//! - **Priority tree**: RFC 7540 Section 5.3 dependency/weight scheduling.
//!
//! # Quick start
//!
//! ```rust
//! use h2_codec::{ConnectionCodec, Role, ByteBuffer, Message};
//!
//! let mut client = ConnectionCodec::new(Role::Client);
//! let mut wire = ByteBuffer::new();
//! client.connection_setting(&mut wire);
//!
//! let mut request = Message::request();
//! request.method = Some("GET".to_string());
//! request.scheme = Some("https".to_string());
//! request.authority = Some("example.com".to_string());
//! request.path = Some("/".to_string());
//! client.encode(&mut request, &mut wire);
//! ```
//!
//! # Architecture
//!
//! Leaves first: [`byte_buffer`] (cursor-tracked growable bytes), [`hpack`]
//! (Huffman, integer/string primitives, static and dynamic tables, header
//! block representation), [`frame`] (the 9-octet frame header and the nine
//! standard payload types), [`message`] (the abstract request/response
//! model), [`stream`] (per-stream state machine and flow-control windows),
//! [`priority`] (the dependency tree), [`settings`] (SETTINGS bookkeeping),
//! and [`connection`] (the top-level orchestrator).
//!
//! It does NOT provide TLS/ALPN negotiation, a socket event loop, or the
//! HTTP/1.1 upgrade handshake itself — only the handoff of a pre-parsed
//! "holding message" across that boundary (see
//! [`ConnectionCodec::transfer_holding_msg`]).

pub mod byte_buffer;
pub mod connection;
pub mod error;
pub mod frame;
pub mod hpack;
pub mod message;
pub mod priority;
pub mod settings;
pub mod stream;

pub use byte_buffer::ByteBuffer;
pub use connection::{ConnectionCodec, Role};
pub use error::{ErrorCode, Http2Error, Status};
pub use frame::{flags, frame_type, settings_id, Frame, FrameHeader, CONNECTION_PREFACE, MAX_HEADER_BLOCK_SIZE};
pub use hpack::{H2Header, HpackDecoder, HpackEncoder};
pub use message::{Message, MessageType, UpgradeInfo};
pub use priority::PriorityTree;
pub use settings::Settings;
pub use stream::{Stream, StreamState};
