//! Fuzz target for Frame::decode
//!
//! Arbitrary bytes must never panic the decoder. Anything that decodes must
//! re-encode to the same header and payload.

#![no_main]

use libfuzzer_sys::fuzz_target;
use prioq_proto::Frame;

fuzz_target!(|data: &[u8]| {
    let Ok(frame) = Frame::decode(data) else {
        return;
    };

    let mut buf = Vec::with_capacity(frame.encoded_len());
    frame.encode(&mut buf).expect("decoded frame must re-encode");
    assert_eq!(&buf[..], &data[..frame.encoded_len()]);
});
