//! Tests for HPACK header-block decoding.

use h2_codec::HpackDecoder;

#[test]
fn decode_indexed_header() {
    let mut decoder = HpackDecoder::new(4096);
    let data = [0x82];
    let headers = decoder.decode(&data).unwrap();
    assert_eq!(headers.len(), 1);
    assert_eq!(headers[0].name, ":method");
    assert_eq!(headers[0].value, "GET");
}

#[test]
fn decode_multiple_indexed_headers() {
    let mut decoder = HpackDecoder::new(4096);
    let data = [0x82, 0x86, 0x84];
    let headers = decoder.decode(&data).unwrap();
    assert_eq!(headers.len(), 3);
    assert_eq!(headers[1].name, ":scheme");
    assert_eq!(headers[1].value, "http");
}

#[test]
fn decode_literal_with_incremental_indexing_and_new_name() {
    let mut decoder = HpackDecoder::new(4096);
    let data = [0x40, 0x06, b'c', b'u', b's', b't', b'o', b'm', 0x05, b'v', b'a', b'l', b'u', b'e'];
    let headers = decoder.decode(&data).unwrap();
    assert_eq!(headers[0].name, "custom");
    assert_eq!(headers[0].value, "value");
}

#[test]
fn decode_literal_with_indexed_name() {
    let mut decoder = HpackDecoder::new(4096);
    let data = [0x41, 0x0B, b'e', b'x', b'a', b'm', b'p', b'l', b'e', b'.', b'c', b'o', b'm'];
    let headers = decoder.decode(&data).unwrap();
    assert_eq!(headers[0].name, ":authority");
    assert_eq!(headers[0].value, "example.com");
}

#[test]
fn decode_status_200() {
    let mut decoder = HpackDecoder::new(4096);
    let data = [0x88];
    let headers = decoder.decode(&data).unwrap();
    assert_eq!(headers[0].name, ":status");
    assert_eq!(headers[0].value, "200");
}

#[test]
fn decode_literal_without_indexing_does_not_grow_the_dynamic_table() {
    let mut decoder = HpackDecoder::new(4096);
    // 0x00 prefix: literal header field without indexing, new name.
    let data = [0x00, 0x03, b'f', b'o', b'o', 0x03, b'b', b'a', b'r'];
    let headers = decoder.decode(&data).unwrap();
    assert_eq!(headers[0].name, "foo");
    assert_eq!(decoder.dynamic_table.len(), 0);
}

#[test]
fn decode_literal_with_incremental_indexing_grows_the_dynamic_table() {
    let mut decoder = HpackDecoder::new(4096);
    let data = [0x40, 0x03, b'f', b'o', b'o', 0x03, b'b', b'a', b'r'];
    decoder.decode(&data).unwrap();
    assert_eq!(decoder.dynamic_table.len(), 1);
}

#[test]
fn dynamic_table_size_update_shrinks_capacity_and_evicts() {
    let mut decoder = HpackDecoder::new(4096);
    decoder.decode(&[0x40, 0x03, b'f', b'o', b'o', 0x03, b'b', b'a', b'r']).unwrap();
    assert_eq!(decoder.dynamic_table.len(), 1);

    // Dynamic table size update to 0 evicts every entry (RFC 7541 6.3).
    decoder.decode(&[0x20]).unwrap();
    assert_eq!(decoder.dynamic_table.len(), 0);
}

#[test]
fn decode_rfc7541_c_4_1_request_with_huffman() {
    // RFC 7541 Appendix C.4.1: first request, Huffman-coded literals.
    let data = [
        0x82, 0x86, 0x84, 0x41, 0x8c, 0xf1, 0xe3, 0xc2, 0xe5, 0xf2, 0x3a, 0x6b, 0xa0, 0xab, 0x90,
        0xf4, 0xff,
    ];
    let mut decoder = HpackDecoder::new(4096);
    let headers = decoder.decode(&data).unwrap();
    assert_eq!(headers.len(), 4);
    assert_eq!(headers[0].name, ":method");
    assert_eq!(headers[0].value, "GET");
    assert_eq!(headers[1].name, ":scheme");
    assert_eq!(headers[1].value, "http");
    assert_eq!(headers[2].name, ":path");
    assert_eq!(headers[2].value, "/");
    assert_eq!(headers[3].name, ":authority");
    assert_eq!(headers[3].value, "www.example.com");
    // Only :authority is newly indexed; the other three were static-table hits.
    assert_eq!(decoder.dynamic_table.len(), 1);
}

#[test]
fn truncated_literal_string_is_an_error() {
    let mut decoder = HpackDecoder::new(4096);
    let data = [0x40, 0x06, b'c', b'u', b's'];
    assert!(decoder.decode(&data).is_err());
}
