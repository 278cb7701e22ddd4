#![no_main]

// Every supported kernel must produce the same bit transpose as the portable one, and
// invert it.

use bitshuffle_transpose::{KernelId, TransposeEngine};
use libfuzzer_sys::{arbitrary, fuzz_target};

#[derive(Clone, Debug, arbitrary::Arbitrary)]
pub struct Input {
    pub element_size: u8,
    pub data: Vec<u8>,
}

fuzz_target!(|input: Input| {
    let element_size = input.element_size.max(1) as usize;
    let group_bytes = element_size * 8;
    let len = input.data.len() / group_bytes * group_bytes;
    if len == 0 {
        return;
    }
    let block = &input.data[..len];

    let mut expected = vec![0u8; len];
    TransposeEngine::portable()
        .transpose(block, &mut expected, element_size)
        .unwrap();

    for kernel in KernelId::all_values().iter() {
        let Ok(engine) = TransposeEngine::new(*kernel) else {
            continue;
        };

        let mut transposed = vec![0u8; len];
        let mut restored = vec![0u8; len];
        engine
            .transpose(block, &mut transposed, element_size)
            .unwrap();
        engine
            .untranspose(&transposed, &mut restored, element_size)
            .unwrap();

        assert_eq!(transposed, expected, "kernel {kernel} disagrees");
        assert_eq!(restored, block, "kernel {kernel} doesn't invert");
    }
});
