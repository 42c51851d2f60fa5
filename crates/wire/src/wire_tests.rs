// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::{Request, Response};
use std::time::Duration;

const T: Duration = Duration::from_secs(1);

#[test]
fn encode_prefixes_payload_length() {
    let frame = encode(&Request::Ping).unwrap();
    let len = u32::from_be_bytes([frame[0], frame[1], frame[2], frame[3]]) as usize;
    assert_eq!(len, frame.len() - 4);
}

#[test]
fn encode_decode_round_trip() {
    let request = Request::Comment {
        id: "X-1".into(),
        author: "gaffer".into(),
        body: "merge conflict, workspace preserved".into(),
    };
    let frame = encode(&request).unwrap();
    let back: Request = decode(&frame).unwrap();
    assert_eq!(back, request);
}

#[test]
fn decode_rejects_short_frames() {
    assert!(matches!(
        decode::<Request>(&[0, 0]),
        Err(ProtocolError::ConnectionClosed)
    ));
}

#[test]
fn decode_rejects_oversized_announcements() {
    let mut frame = Vec::new();
    frame.extend_from_slice(&(MAX_FRAME_BYTES as u32 + 1).to_be_bytes());
    assert!(matches!(decode::<Request>(&frame), Err(ProtocolError::TooLarge(_))));
}

#[tokio::test]
async fn async_read_write_round_trip() {
    let (mut client, mut server) = tokio::io::duplex(4096);

    write_message(&mut client, &Request::Status, T).await.unwrap();
    let request: Request = read_message(&mut server, T).await.unwrap();
    assert_eq!(request, Request::Status);

    write_message(&mut server, &Response::ok(), T).await.unwrap();
    let response: Response = read_message(&mut client, T).await.unwrap();
    assert_eq!(response, Response::ok());
}

#[tokio::test]
async fn closed_peer_reads_as_connection_closed() {
    let (client, mut server) = tokio::io::duplex(64);
    drop(client);

    let err = read_message::<Request, _>(&mut server, T).await.err().unwrap();
    assert!(matches!(err, ProtocolError::ConnectionClosed), "got {err}");
}

#[tokio::test(start_paused = true)]
async fn read_times_out_on_a_silent_peer() {
    let (_client, mut server) = tokio::io::duplex(64);

    let err = read_message::<Request, _>(&mut server, Duration::from_millis(100))
        .await
        .err()
        .unwrap();
    assert!(matches!(err, ProtocolError::Timeout));
}
