// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Property tests: every request survives the wire.

use crate::{decode, encode, Request};
use gf_core::IssueFields;
use proptest::prelude::*;

fn arb_fields() -> impl Strategy<Value = IssueFields> {
    (
        proptest::option::of(".{0,20}"),
        proptest::option::of(".{0,20}"),
        proptest::option::of(0u32..10),
    )
        .prop_map(|(title, description, priority)| IssueFields {
            title,
            description,
            acceptance_criteria: None,
            priority,
            status: None,
        })
}

fn arb_request() -> impl Strategy<Value = Request> {
    prop_oneof![
        Just(Request::Ping),
        Just(Request::Status),
        Just(Request::Pause),
        Just(Request::Resume),
        Just(Request::Interrupt),
        Just(Request::Shutdown),
        (".{1,30}", ".{0,60}", proptest::option::of(0u32..5)).prop_map(
            |(title, description, priority)| Request::File {
                title,
                description,
                priority,
                labels: Vec::new(),
            }
        ),
        ("[A-Z]-[0-9]{1,4}", "[a-z]{1,8}", ".{0,40}").prop_map(|(id, author, body)| {
            Request::Comment { id, author, body }
        }),
        ("[A-Z]-[0-9]{1,4}", arb_fields())
            .prop_map(|(id, fields)| Request::Update { id, fields }),
        "[A-Z]-[0-9]{1,4}".prop_map(|id| Request::Inspect { id }),
        (proptest::option::of("[a-z]{3,12}"), proptest::option::of(0usize..100))
            .prop_map(|(phase, limit)| Request::List { phase, limit }),
    ]
}

proptest! {
    #[test]
    fn request_frame_round_trip(request in arb_request()) {
        let frame = encode(&request).unwrap();
        let back: Request = decode(&frame).unwrap();
        prop_assert_eq!(back, request);
    }

    #[test]
    fn frame_length_prefix_is_exact(request in arb_request()) {
        let frame = encode(&request).unwrap();
        let len = u32::from_be_bytes([frame[0], frame[1], frame[2], frame[3]]) as usize;
        prop_assert_eq!(len + 4, frame.len());
    }
}
