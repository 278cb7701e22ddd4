#![doc = include_str!(concat!("../", core::env!("CARGO_PKG_README")))]
#![no_std]

extern crate alloc;

#[cfg(feature = "std")]
extern crate std;

pub mod compress;

pub use compress::{BlockCompressor, NoCompression, NoCompressionError};
