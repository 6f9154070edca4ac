//! Tests for malformed frames and connection/stream-scoped error propagation.

use h2_codec::frame::{self, flags, frame_type, FrameHeader};
use h2_codec::{ByteBuffer, ConnectionCodec, ErrorCode, Role, Status};

fn server_past_preface() -> ConnectionCodec {
    let mut server = ConnectionCodec::new(Role::Server);
    let mut react = ByteBuffer::new();
    let mut input = ByteBuffer::from(frame::CONNECTION_PREFACE);
    server.decode(&mut input, &mut react);
    server
}

fn feed(server: &mut ConnectionCodec, bytes: &[u8]) -> Status {
    let mut react = ByteBuffer::new();
    let mut input = ByteBuffer::from(bytes);
    server.decode(&mut input, &mut react).0
}

#[test]
fn window_update_too_short_is_frame_size_error() {
    let mut server = server_past_preface();
    let bytes = [0, 0, 2, frame_type::WINDOW_UPDATE, 0, 0, 0, 0, 1, 0, 0];
    assert_eq!(feed(&mut server, &bytes), Status::Err(ErrorCode::FrameSizeError));
}

#[test]
fn ping_too_short_is_frame_size_error() {
    let mut server = server_past_preface();
    let bytes = [0, 0, 4, frame_type::PING, 0, 0, 0, 0, 0, 1, 2, 3, 4];
    assert_eq!(feed(&mut server, &bytes), Status::Err(ErrorCode::FrameSizeError));
}

#[test]
fn goaway_too_short_is_frame_size_error() {
    let mut server = server_past_preface();
    let bytes = [0, 0, 4, frame_type::GOAWAY, 0, 0, 0, 0, 0, 0, 0, 0, 5];
    assert_eq!(feed(&mut server, &bytes), Status::Err(ErrorCode::FrameSizeError));
}

#[test]
fn rst_stream_too_short_is_frame_size_error() {
    let mut server = server_past_preface();
    let bytes = [0, 0, 2, frame_type::RST_STREAM, 0, 0, 0, 0, 1, 0, 0];
    assert_eq!(feed(&mut server, &bytes), Status::Err(ErrorCode::FrameSizeError));
}

#[test]
fn padded_data_frame_with_padding_exceeding_payload_is_protocol_error() {
    let mut server = server_past_preface();
    let mut input = ByteBuffer::from(frame::encode_headers(1, &[0x82, 0x84], false, true).as_slice());
    let mut react = ByteBuffer::new();
    server.decode(&mut input, &mut react);

    let header = FrameHeader {
        length: 6,
        frame_type: frame_type::DATA,
        flags: flags::PADDED,
        stream_id: 1,
    };
    let mut bytes = header.encode().to_vec();
    bytes.push(10); // pad length exceeds remaining 5 bytes
    bytes.extend_from_slice(b"hello");
    assert_eq!(feed(&mut server, &bytes), Status::Err(ErrorCode::ProtocolError));
}

#[test]
fn stream_id_regression_is_a_connection_error() {
    let mut server = server_past_preface();
    feed(&mut server, &frame::encode_headers(5, &[0x82, 0x84], true, true));
    let status = feed(&mut server, &frame::encode_headers(3, &[0x82, 0x84], true, true));
    assert_eq!(status, Status::Err(ErrorCode::ProtocolError));
}

#[test]
fn connection_window_update_overflow_is_flow_control_error() {
    let mut server = server_past_preface();
    let bytes = frame::encode_window_update(0, frame::MAX_WINDOW_SIZE);
    assert_eq!(feed(&mut server, &bytes), Status::Err(ErrorCode::FlowControlError));
}

#[test]
fn data_exceeding_stream_recv_window_resets_the_stream_not_the_connection() {
    let mut server = server_past_preface();
    feed(&mut server, &frame::encode_headers(1, &[0x82, 0x84], false, true));

    let oversized = vec![0u8; (frame::DEFAULT_INITIAL_WINDOW_SIZE as usize) + 1];
    let mut react = ByteBuffer::new();
    let mut input = ByteBuffer::new();
    // Split across frames under MAX_FRAME_SIZE so only the window check trips.
    for chunk in oversized.chunks(16000) {
        input.write_bytes(&frame::encode_data(1, chunk, false));
    }
    let mut status = Status::Ok;
    loop {
        let (s, _) = server.decode(&mut input, &mut react);
        status = s;
        if status != Status::Ok {
            break;
        }
    }
    assert_eq!(status, Status::PartErr(ErrorCode::FlowControlError));
    let header = FrameHeader::parse(react.peek()).unwrap();
    assert_eq!(header.frame_type, frame::frame_type::RST_STREAM);
}

#[test]
fn data_on_a_stream_that_was_never_opened_is_reset_with_stream_closed() {
    let mut server = server_past_preface();
    let status = feed(&mut server, &frame::encode_data(7, b"x", false));
    assert_eq!(status, Status::PartErr(ErrorCode::StreamClosed));
}

#[test]
fn data_on_stream_zero_is_a_connection_protocol_error() {
    let mut server = server_past_preface();
    let header = FrameHeader {
        length: 2,
        frame_type: frame_type::DATA,
        flags: 0,
        stream_id: 0,
    };
    let mut bytes = header.encode().to_vec();
    bytes.extend_from_slice(b"hi");
    assert_eq!(feed(&mut server, &bytes), Status::Err(ErrorCode::ProtocolError));
}

#[test]
fn frames_above_goaway_last_stream_id_are_dropped_with_cancel() {
    let mut server = server_past_preface();
    feed(&mut server, &frame::encode_headers(1, &[0x82, 0x84], false, true));

    let goaway = frame::encode_goaway(1, ErrorCode::NoError.as_u32(), &[]);
    let status = feed(&mut server, &goaway);
    assert_eq!(status, Status::Ok);

    // Stream 3 was never opened before the GOAWAY and exceeds its
    // last_stream_id of 1; the HEADERS frame must be dropped, not processed.
    let status = feed(&mut server, &frame::encode_headers(3, &[0x82, 0x84], true, true));
    assert_eq!(status, Status::PartErr(ErrorCode::Cancel));
}

#[test]
fn encode_after_a_connection_error_queued_goaway_is_a_connect_error() {
    let mut server = server_past_preface();
    // An out-of-range ENABLE_PUSH value is a connection error that queues
    // our own outbound GOAWAY and latches `goaway_sent`.
    let status = feed(
        &mut server,
        &frame::encode_settings(&[(h2_codec::settings_id::ENABLE_PUSH, 2)]),
    );
    assert_eq!(status, Status::Err(ErrorCode::ProtocolError));

    let mut message = h2_codec::Message::response();
    message.stream_id = 1;
    message.status_code = Some(200);
    let mut out = ByteBuffer::new();
    assert_eq!(server.encode(&mut message, &mut out), Status::Err(ErrorCode::ConnectError));
}
