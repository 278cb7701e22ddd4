#![doc = include_str!(concat!("../", core::env!("CARGO_PKG_README")))]
#![no_std]
#![cfg_attr(docsrs, feature(doc_cfg))]

extern crate alloc;

#[cfg(feature = "std")]
extern crate std;

pub mod bit_transpose;
pub mod byte_shuffle;
pub mod engine;
pub mod error;

pub use bitshuffle_common::KernelId;
pub use engine::{TransformMode, TransposeEngine};
pub use error::TransposeError;

/// Largest supported element size, in bytes.
///
/// The frame header stores the element size in a single byte.
pub const MAX_ELEMENT_SIZE: usize = u8::MAX as usize;

/// Number of elements that make up one group of the bit transpose.
///
/// Blocks passed to the transforms must contain a positive multiple of this many elements.
pub const ELEMENTS_PER_GROUP: usize = 8;
