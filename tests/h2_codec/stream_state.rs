//! Tests for per-stream state transitions as observed through the connection codec.

use h2_codec::frame;
use h2_codec::{ByteBuffer, ConnectionCodec, Role, Status, StreamState};

fn server_past_preface() -> ConnectionCodec {
    let mut server = ConnectionCodec::new(Role::Server);
    let mut react = ByteBuffer::new();
    let mut input = ByteBuffer::from(frame::CONNECTION_PREFACE);
    server.decode(&mut input, &mut react);
    server
}

#[test]
fn headers_without_end_stream_opens_the_stream() {
    let mut server = server_past_preface();
    let mut react = ByteBuffer::new();
    let mut input = ByteBuffer::from(frame::encode_headers(1, &[0x82, 0x84], false, true).as_slice());
    let (status, msg) = server.decode(&mut input, &mut react);
    assert_eq!(status, Status::Ok);
    assert!(msg.is_some());
    assert_eq!(server.stream_state(1), Some(StreamState::Open));
}

#[test]
fn headers_with_end_stream_is_half_closed_remote() {
    let mut server = server_past_preface();
    let mut react = ByteBuffer::new();
    let mut input = ByteBuffer::from(frame::encode_headers(1, &[0x82, 0x84], true, true).as_slice());
    server.decode(&mut input, &mut react);
    assert_eq!(server.stream_state(1), Some(StreamState::HalfClosedRemote));
}

#[test]
fn data_end_stream_after_open_headers_closes_the_stream() {
    let mut server = server_past_preface();
    let mut react = ByteBuffer::new();

    let mut input = ByteBuffer::from(frame::encode_headers(1, &[0x82, 0x84], false, true).as_slice());
    server.decode(&mut input, &mut react);
    assert_eq!(server.stream_state(1), Some(StreamState::Open));

    let mut input = ByteBuffer::from(frame::encode_data(1, b"hi", true).as_slice());
    server.decode(&mut input, &mut react);
    assert_eq!(server.stream_state(1), Some(StreamState::HalfClosedRemote));
}

#[test]
fn rst_stream_closes_an_open_stream() {
    let mut server = server_past_preface();
    let mut react = ByteBuffer::new();

    let mut input = ByteBuffer::from(frame::encode_headers(1, &[0x82, 0x84], false, true).as_slice());
    server.decode(&mut input, &mut react);

    let mut input = ByteBuffer::from(frame::encode_rst_stream(1, 0x8).as_slice());
    let (status, _) = server.decode(&mut input, &mut react);
    assert_eq!(status, Status::Ok);
    assert_eq!(server.stream_state(1), Some(StreamState::Closed));
}

#[test]
fn rst_stream_for_unknown_stream_is_a_noop() {
    let mut server = server_past_preface();
    let mut react = ByteBuffer::new();
    let mut input = ByteBuffer::from(frame::encode_rst_stream(999, 0x8).as_slice());
    let (status, _) = server.decode(&mut input, &mut react);
    assert_eq!(status, Status::Ok);
    assert_eq!(server.stream_state(999), None);
}

#[test]
fn unknown_stream_state_is_none() {
    let server = server_past_preface();
    assert_eq!(server.stream_state(42), None);
}

#[test]
fn headers_arriving_after_data_are_classified_as_trailers() {
    let mut server = server_past_preface();
    let mut react = ByteBuffer::new();

    let mut input = ByteBuffer::from(frame::encode_headers(1, &[0x82, 0x84], false, true).as_slice());
    server.decode(&mut input, &mut react);

    let mut input = ByteBuffer::from(frame::encode_data(1, b"hi", false).as_slice());
    server.decode(&mut input, &mut react);

    // Literal Header Field without Indexing, new name "x-trailer": "1".
    let trailer_block: &[u8] = &[
        0x00, 0x09, b'x', b'-', b't', b'r', b'a', b'i', b'l', b'e', b'r', 0x01, b'1',
    ];
    let mut input = ByteBuffer::from(frame::encode_headers(1, trailer_block, true, true).as_slice());
    let (status, msg) = server.decode(&mut input, &mut react);
    assert_eq!(status, Status::Ok);
    let msg = msg.expect("trailing HEADERS produces a message");
    assert!(msg.headers.is_empty());
    assert_eq!(
        msg.trailer_headers,
        vec![("x-trailer".to_string(), "1".to_string())]
    );
}
