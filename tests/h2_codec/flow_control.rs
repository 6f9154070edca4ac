//! Tests for outbound flow control: windows bounding how much queued body
//! data `send_waiting_frame_data` may emit, and WINDOW_UPDATE reopening it.

use bytes::Bytes;
use h2_codec::frame::{self, DEFAULT_INITIAL_WINDOW_SIZE, FrameHeader};
use h2_codec::{ByteBuffer, ConnectionCodec, Message, Role, Status};

fn sum_data_payload_lengths(mut bytes: &[u8]) -> usize {
    let mut total = 0usize;
    while !bytes.is_empty() {
        let header = FrameHeader::parse(bytes).expect("complete frame header");
        assert_eq!(header.frame_type, frame::frame_type::DATA);
        total += header.length as usize;
        bytes = &bytes[header.total_size()..];
    }
    total
}

fn client_with_queued_upload(body_len: usize) -> (ConnectionCodec, Message) {
    let mut client = ConnectionCodec::new(Role::Client);
    let mut handshake = ByteBuffer::new();
    client.connection_setting(&mut handshake);

    let mut request = Message::request();
    request.method = Some("POST".to_string());
    request.scheme = Some("https".to_string());
    request.authority = Some("example.com".to_string());
    request.path = Some("/upload".to_string());
    request.body = Bytes::from(vec![0u8; body_len]);

    let mut headers_out = ByteBuffer::new();
    assert_eq!(client.encode(&mut request, &mut headers_out), Status::Ok);
    (client, request)
}

#[test]
fn initial_window_bounds_the_first_batch_of_data_frames() {
    let (mut client, _request) = client_with_queued_upload(70_000);

    let mut data_out = ByteBuffer::new();
    assert_eq!(client.send_waiting_frame_data(&mut data_out), Status::Ok);
    assert_eq!(sum_data_payload_lengths(data_out.peek()), DEFAULT_INITIAL_WINDOW_SIZE as usize);
}

#[test]
fn a_fully_exhausted_window_pauses_further_draining() {
    let (mut client, _request) = client_with_queued_upload(70_000);
    let mut data_out = ByteBuffer::new();
    client.send_waiting_frame_data(&mut data_out);

    let mut more = ByteBuffer::new();
    assert_eq!(client.send_waiting_frame_data(&mut more), Status::Pause);
    assert!(more.is_empty_unread());
}

#[test]
fn window_update_on_stream_and_connection_unlocks_exactly_the_remaining_body() {
    let (mut client, request) = client_with_queued_upload(70_000);
    let stream_id = request.stream_id;

    let mut data_out = ByteBuffer::new();
    client.send_waiting_frame_data(&mut data_out);
    assert_eq!(sum_data_payload_lengths(data_out.peek()), 65_535);

    let mut react = ByteBuffer::new();
    let mut input = ByteBuffer::from(frame::encode_window_update(stream_id, 5_000).as_slice());
    assert_eq!(client.decode(&mut input, &mut react).0, Status::Ok);
    let mut input = ByteBuffer::from(frame::encode_window_update(0, 5_000).as_slice());
    assert_eq!(client.decode(&mut input, &mut react).0, Status::Ok);

    let mut more = ByteBuffer::new();
    assert_eq!(client.send_waiting_frame_data(&mut more), Status::Ok);
    assert_eq!(sum_data_payload_lengths(more.peek()), 4_465);

    // Every byte of the body has now been emitted; nothing is left to drain.
    let mut drained_again = ByteBuffer::new();
    assert_eq!(client.send_waiting_frame_data(&mut drained_again), Status::Pause);
}

#[test]
fn the_last_data_frame_of_a_stream_carries_end_stream() {
    let (mut client, _request) = client_with_queued_upload(100);
    let mut data_out = ByteBuffer::new();
    client.send_waiting_frame_data(&mut data_out);

    let header = FrameHeader::parse(data_out.peek()).unwrap();
    assert!(header.is_end_stream());
}

#[test]
fn a_stream_with_no_queued_body_has_nothing_to_drain() {
    let mut client = ConnectionCodec::new(Role::Client);
    let mut handshake = ByteBuffer::new();
    client.connection_setting(&mut handshake);

    let mut request = Message::request();
    request.method = Some("GET".to_string());
    request.scheme = Some("https".to_string());
    request.authority = Some("example.com".to_string());
    request.path = Some("/".to_string());

    let mut headers_out = ByteBuffer::new();
    client.encode(&mut request, &mut headers_out);

    let mut data_out = ByteBuffer::new();
    assert_eq!(client.send_waiting_frame_data(&mut data_out), Status::Ok);
    assert!(data_out.is_empty_unread());
}
