//! Fuzz target for request and reply frame decoding
//!
//! Checks that:
//! - Decoding arbitrary bytes never panics
//! - A request frame that decodes re-encodes to the same bytes
//! - Reply validation never accepts a body that breaks its declared shape

#![no_main]

use arbitrary::Arbitrary;
use kfuse_proto::{Opcode, Outcome, Reply, ReplyShape, Request};
use libfuzzer_sys::fuzz_target;

#[derive(Arbitrary, Debug)]
enum FuzzInput {
    Request(Vec<u8>),
    Reply { opcode_index: u8, readlink_max: u16, frame: Vec<u8> },
}

fuzz_target!(|input: FuzzInput| {
    match input {
        FuzzInput::Request(frame) => {
            if let Ok(request) = Request::decode_frame(&frame) {
                let _ = request.decode_body();
                let encoded = request.encode_frame().expect("decoded request re-encodes");
                assert_eq!(&encoded[..], &frame[..], "request frame round-trip");
            }
        }

        FuzzInput::Reply {
            opcode_index,
            readlink_max,
            frame,
        } => {
            let opcode = Opcode::ALL[usize::from(opcode_index) % Opcode::ALL.len()];
            let shape = opcode.reply_shape(usize::from(readlink_max));
            let Ok(reply) = Reply::decode_frame(&frame) else {
                return;
            };
            if let Ok(Outcome::Success(body)) = reply.into_outcome(shape) {
                match shape {
                    ReplyShape::Empty => assert!(body.is_empty()),
                    ReplyShape::Fixed(size) => assert_eq!(body.len(), size),
                    ReplyShape::Variable { max } => assert!(body.len() <= max),
                }
            }
        }
    }
});
