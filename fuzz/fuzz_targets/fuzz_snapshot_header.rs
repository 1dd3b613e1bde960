//! Fuzz testing for snapshot header parsing.
//!
//! Arbitrary bytes must either parse into a header that writes back
//! byte-identically, or be rejected with an error. Never a panic.

#![no_main]

use libfuzzer_sys::fuzz_target;

use structstore::storage::{SnapshotHeader, SNAPSHOT_HEADER_SIZE};

fuzz_target!(|data: &[u8]| {
    let Ok(header) = SnapshotHeader::from_bytes(data) else {
        return;
    };

    let mut out = [0u8; SNAPSHOT_HEADER_SIZE];
    header.write_to(&mut out).unwrap();
    assert_eq!(&out[..], &data[..SNAPSHOT_HEADER_SIZE]);

    let _ = header.fingerprint();
    let _ = header.capacity();
    let _ = header.row_stride_bits();
    let _ = header.segment_count();
    let _ = header.list_count();
});
