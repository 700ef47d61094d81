#![no_main]
use libfuzzer_sys::fuzz_target;
use parcheck_channel::codec::{decode_frame, encode_frame};
use parcheck_params::ExplicitSolver;

fuzz_target!(|data: &[u8]| {
    let solver = ExplicitSolver::new(70);
    if let Ok(entries) = decode_frame(&solver, data) {
        let frame = encode_frame(&solver, &entries).unwrap();
        assert_eq!(decode_frame(&solver, &frame).unwrap(), entries);
    }
});
