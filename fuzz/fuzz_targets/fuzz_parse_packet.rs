#![no_main]

use libfuzzer_sys::fuzz_target;
use scs_rs::scs::frame::{decode_data_packet, pack_request, parse_request};

fuzz_target!(|data: &[u8]| {
    // Request parser must reject malformed input without panicking
    if let Ok((_, request)) = parse_request(data) {
        // Anything that parses must pack back to the bytes it came from
        let packed = pack_request(&request);
        assert_eq!(&packed[..], &data[..packed.len()]);
    }

    // Data packets of every length the first byte can claim
    if let Some((&length, rest)) = data.split_first() {
        let _ = decode_data_packet(rest, usize::from(length));
    }
});
