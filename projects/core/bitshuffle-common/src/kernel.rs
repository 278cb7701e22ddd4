//! # Transpose Kernels
//!
//! Every bit transpose kernel implements the exact same permutation; they only differ in how
//! many bytes they process per step. The kernel to use is chosen once, up front, and passed
//! around as a plain [`KernelId`] value.
//!
//! | Kernel     | Width    | Availability                     |
//! |------------|----------|----------------------------------|
//! | `Portable` | 8 bytes  | Everywhere                       |
//! | `Sse2`     | 16 bytes | x86/x86-64 with SSE2             |
//! | `Avx2`     | 32 bytes | x86/x86-64 with AVX2             |

use core::fmt;
use core::str::FromStr;
use derive_enum_all_values::AllValues;

/// Identifies one of the bit transpose kernel implementations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, AllValues)]
pub enum KernelId {
    /// Scalar implementation. Always available.
    Portable,
    /// 128-bit implementation using SSE2 instructions.
    Sse2,
    /// 256-bit implementation using AVX2 instructions.
    Avx2,
}

impl KernelId {
    /// Returns the best kernel available on the current CPU.
    ///
    /// With the `no-runtime-cpu-detection` feature, the choice is made from the target
    /// features enabled at compile time instead.
    pub fn detect() -> Self {
        #[cfg(any(target_arch = "x86_64", target_arch = "x86"))]
        {
            if KernelId::Avx2.is_supported() {
                return KernelId::Avx2;
            }

            if KernelId::Sse2.is_supported() {
                return KernelId::Sse2;
            }
        }

        KernelId::Portable
    }

    /// Returns `true` if this kernel can be executed on the current CPU.
    pub fn is_supported(self) -> bool {
        match self {
            KernelId::Portable => true,
            KernelId::Sse2 => has_sse2(),
            KernelId::Avx2 => has_avx2(),
        }
    }

    /// Number of input bytes the kernel consumes per step of the bit transpose.
    pub const fn width_bytes(self) -> usize {
        match self {
            KernelId::Portable => 8,
            KernelId::Sse2 => 16,
            KernelId::Avx2 => 32,
        }
    }

    /// Short, lowercase name of the kernel.
    pub const fn name(self) -> &'static str {
        match self {
            KernelId::Portable => "portable",
            KernelId::Sse2 => "sse2",
            KernelId::Avx2 => "avx2",
        }
    }
}

impl fmt::Display for KernelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Returned when parsing a [`KernelId`] from an unknown name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnknownKernelError;

impl fmt::Display for UnknownKernelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Unknown kernel. Valid kernels are: portable, sse2, avx2")
    }
}

impl FromStr for KernelId {
    type Err = UnknownKernelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        KernelId::all_values()
            .iter()
            .copied()
            .find(|kernel| kernel.name().eq_ignore_ascii_case(s))
            .ok_or(UnknownKernelError)
    }
}

#[cfg(any(target_arch = "x86_64", target_arch = "x86"))]
#[inline(always)]
fn has_sse2() -> bool {
    #[cfg(not(feature = "no-runtime-cpu-detection"))]
    {
        crate::cpu_detect::has_sse2()
    }

    #[cfg(feature = "no-runtime-cpu-detection")]
    {
        cfg!(target_feature = "sse2")
    }
}

#[cfg(any(target_arch = "x86_64", target_arch = "x86"))]
#[inline(always)]
fn has_avx2() -> bool {
    #[cfg(not(feature = "no-runtime-cpu-detection"))]
    {
        crate::cpu_detect::has_avx2()
    }

    #[cfg(feature = "no-runtime-cpu-detection")]
    {
        cfg!(target_feature = "avx2")
    }
}

#[cfg(not(any(target_arch = "x86_64", target_arch = "x86")))]
#[inline(always)]
fn has_sse2() -> bool {
    false
}

#[cfg(not(any(target_arch = "x86_64", target_arch = "x86")))]
#[inline(always)]
fn has_avx2() -> bool {
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn portable_is_always_supported() {
        assert!(KernelId::Portable.is_supported());
    }

    #[test]
    fn detected_kernel_is_supported() {
        assert!(KernelId::detect().is_supported());
    }

    #[rstest]
    #[case::portable("portable", KernelId::Portable)]
    #[case::sse2("sse2", KernelId::Sse2)]
    #[case::avx2("AVX2", KernelId::Avx2)]
    fn parses_kernel_names(#[case] name: &str, #[case] expected: KernelId) {
        assert_eq!(name.parse::<KernelId>(), Ok(expected));
    }

    #[test]
    fn rejects_unknown_kernel_names() {
        assert_eq!("neon".parse::<KernelId>(), Err(UnknownKernelError));
    }

    #[test]
    fn widths_grow_with_register_size() {
        let widths: [usize; 3] = [
            KernelId::Portable.width_bytes(),
            KernelId::Sse2.width_bytes(),
            KernelId::Avx2.width_bytes(),
        ];
        assert_eq!(widths, [8, 16, 32]);
    }
}
