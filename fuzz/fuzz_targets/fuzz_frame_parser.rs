#![no_main]
use libfuzzer_sys::fuzz_target;
use nezha_core::frame;

fuzz_target!(|data: [u8; 8]| {
    if let Some(parsed) = frame::parse_run_for(&data) {
        // a decoded run-for frame re-encodes to the same bytes
        let again = frame::run_for(parsed.motor, parsed.direction, parsed.value, parsed.mode);
        assert_eq!(again, data);
    }
    let _ = frame::opcode_of(&data);
    let _ = frame::decode_speed([data[0], data[1]], 0.17);
    let _ = frame::decode_aggregate_angle([data[0], data[1], data[2], data[3]]);
});
