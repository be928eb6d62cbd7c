#![no_main]

use libfuzzer_sys::fuzz_target;
use mysqlx_protocol::core::frame;
use mysqlx_protocol::protocol::registry;
use mysqlx_protocol::transport::memory::MemoryTransport;

fuzz_target!(|data: &[u8]| {
    // Arbitrary server bytes must produce frames or classified errors, never panics
    let mut peer = MemoryTransport::new();
    peer.push_bytes(data);
    while let Ok(frame) = frame::read_frame(&mut peer, 1 << 20) {
        let _ = registry::decode(frame.type_tag, &frame.payload);
    }
});
