#![doc = include_str!(concat!("../", core::env!("CARGO_PKG_README")))]
#![cfg_attr(not(feature = "std"), no_std)]

pub mod cpu_detect;
pub mod intrinsics;
pub mod kernel;

pub use kernel::KernelId;
