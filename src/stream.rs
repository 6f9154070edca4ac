//! RFC 7540 Section 5.1: per-stream state machine, header block assembly
//! across CONTINUATION, and the per-stream flow-control windows with their
//! outbound pending-data queue.

use crate::error::ErrorCode;
use bytes::Bytes;
use std::collections::VecDeque;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    Idle,
    ReservedLocal,
    ReservedRemote,
    Open,
    HalfClosedLocal,
    HalfClosedRemote,
    Closed,
}

#[derive(Debug)]
pub struct Stream {
    pub id: u32,
    pub state: StreamState,
    pub send_window: i64,
    pub recv_window: i64,
    /// Accumulates HEADERS/PUSH_PROMISE fragments across CONTINUATION.
    pub header_block_buffer: Vec<u8>,
    /// END_STREAM flag captured from the frame that opened header assembly.
    pub end_stream_pending: bool,
    pub body_started: bool,
    pub pending_send: VecDeque<Bytes>,
}

impl Stream {
    pub fn new(id: u32, initial_window: u32) -> Self {
        Self {
            id,
            state: StreamState::Idle,
            send_window: initial_window as i64,
            recv_window: initial_window as i64,
            header_block_buffer: Vec::new(),
            end_stream_pending: false,
            body_started: false,
            pending_send: VecDeque::new(),
        }
    }

    pub fn is_closed(&self) -> bool {
        self.state == StreamState::Closed
    }

    pub fn on_send_headers(&mut self, end_stream: bool) -> Result<(), ErrorCode> {
        self.state = match self.state {
            StreamState::Idle => {
                if end_stream {
                    StreamState::HalfClosedLocal
                } else {
                    StreamState::Open
                }
            }
            StreamState::ReservedLocal => {
                if end_stream {
                    StreamState::Closed
                } else {
                    StreamState::HalfClosedRemote
                }
            }
            StreamState::Open if end_stream => StreamState::HalfClosedLocal,
            StreamState::HalfClosedRemote if end_stream => StreamState::Closed,
            _ => return Err(ErrorCode::StreamClosed),
        };
        Ok(())
    }

    pub fn on_recv_headers(&mut self, end_stream: bool) -> Result<(), ErrorCode> {
        self.state = match self.state {
            StreamState::Idle => {
                if end_stream {
                    StreamState::HalfClosedRemote
                } else {
                    StreamState::Open
                }
            }
            StreamState::ReservedRemote => {
                if end_stream {
                    StreamState::Closed
                } else {
                    StreamState::HalfClosedLocal
                }
            }
            StreamState::Open if end_stream => StreamState::HalfClosedRemote,
            StreamState::HalfClosedLocal if end_stream => StreamState::Closed,
            _ => return Err(ErrorCode::StreamClosed),
        };
        Ok(())
    }

    pub fn on_send_push_promise(&mut self) -> Result<(), ErrorCode> {
        match self.state {
            StreamState::Idle => {
                self.state = StreamState::ReservedLocal;
                Ok(())
            }
            _ => Err(ErrorCode::ProtocolError),
        }
    }

    pub fn on_recv_push_promise(&mut self) -> Result<(), ErrorCode> {
        match self.state {
            StreamState::Idle => {
                self.state = StreamState::ReservedRemote;
                Ok(())
            }
            _ => Err(ErrorCode::ProtocolError),
        }
    }

    /// Applied when a DATA frame with END_STREAM is sent.
    pub fn on_send_data_end_stream(&mut self) -> Result<(), ErrorCode> {
        self.state = match self.state {
            StreamState::Open => StreamState::HalfClosedLocal,
            StreamState::HalfClosedRemote => StreamState::Closed,
            other => other,
        };
        Ok(())
    }

    /// Applied when a DATA frame with END_STREAM is received.
    pub fn on_recv_data_end_stream(&mut self) -> Result<(), ErrorCode> {
        self.state = match self.state {
            StreamState::Open => StreamState::HalfClosedRemote,
            StreamState::HalfClosedLocal => StreamState::Closed,
            other => other,
        };
        Ok(())
    }

    pub fn on_rst(&mut self) {
        self.state = StreamState::Closed;
    }

    /// Queue outbound body bytes awaiting flow-control window.
    pub fn queue_outbound(&mut self, data: Bytes) {
        if !data.is_empty() {
            self.pending_send.push_back(data);
        }
    }

    pub fn has_pending(&self) -> bool {
        !self.pending_send.is_empty()
    }

    /// Pop up to `max_len` bytes from the front of the pending queue,
    /// splitting a chunk if it is larger than `max_len`.
    pub fn pop_chunk(&mut self, max_len: usize) -> Option<Bytes> {
        let front = self.pending_send.front_mut()?;
        if front.len() <= max_len {
            self.pending_send.pop_front()
        } else {
            Some(front.split_to(max_len))
        }
    }

    /// Apply a delta to the send window (used when INITIAL_WINDOW_SIZE
    /// changes after the stream already exists).
    pub fn apply_send_window_delta(&mut self, delta: i64) {
        self.send_window += delta;
    }

    /// True once the receive window has dropped below a quarter of the
    /// negotiated initial size, signalling it is time to replenish.
    pub fn should_replenish_recv_window(&self, initial_window_size: u32) -> bool {
        self.recv_window < (initial_window_size as i64) / 4
    }
}
