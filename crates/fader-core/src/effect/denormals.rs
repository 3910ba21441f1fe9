//! Scoped flush-to-zero control for the processing path
//!
//! Denormal float operands run orders of magnitude slower on common
//! hardware, and feedback-style DSP decays into the denormal range.
//! [`ScopedFlushToZero`] switches the calling thread's FPU into
//! flush-to-zero mode for the duration of a processing call and restores
//! the previous mode on drop, so the setting never leaks into caller
//! code.
//!
//! On x86_64 this sets the FTZ and DAZ bits in MXCSR; on aarch64 the FZ
//! bit in FPCR. Other targets get a no-op guard.

#[cfg(target_arch = "x86_64")]
const MXCSR_FTZ: u32 = 1 << 15;
#[cfg(target_arch = "x86_64")]
const MXCSR_DAZ: u32 = 1 << 6;

#[cfg(target_arch = "aarch64")]
const FPCR_FZ: u64 = 1 << 24;

/// RAII guard that keeps flush-to-zero enabled while it lives
///
/// Thread-local effect; engage it on the thread that runs the kernel.
#[must_use]
#[derive(Debug)]
pub struct ScopedFlushToZero {
    #[cfg(target_arch = "x86_64")]
    saved: u32,
    #[cfg(target_arch = "aarch64")]
    saved: u64,
}

impl ScopedFlushToZero {
    /// Enable flush-to-zero, remembering the current FPU mode
    pub fn engage() -> Self {
        #[cfg(target_arch = "x86_64")]
        {
            let saved = read_mxcsr();
            write_mxcsr(saved | MXCSR_FTZ | MXCSR_DAZ);
            Self { saved }
        }

        #[cfg(target_arch = "aarch64")]
        {
            let saved = read_fpcr();
            write_fpcr(saved | FPCR_FZ);
            Self { saved }
        }

        #[cfg(not(any(target_arch = "x86_64", target_arch = "aarch64")))]
        {
            Self {}
        }
    }
}

impl Drop for ScopedFlushToZero {
    fn drop(&mut self) {
        #[cfg(target_arch = "x86_64")]
        write_mxcsr(self.saved);

        #[cfg(target_arch = "aarch64")]
        write_fpcr(self.saved);
    }
}

#[cfg(target_arch = "x86_64")]
fn read_mxcsr() -> u32 {
    let mut word: u32 = 0;
    // Safety: stmxcsr writes 4 bytes to the given address; `word` is a
    // valid aligned u32 on this thread's stack.
    unsafe {
        std::arch::asm!(
            "stmxcsr [{0}]",
            in(reg) &mut word,
            options(nostack, preserves_flags)
        );
    }
    word
}

#[cfg(target_arch = "x86_64")]
fn write_mxcsr(word: u32) {
    // Safety: ldmxcsr only changes SSE control/status state; rounding
    // and exception-mask bits are restored by the paired read.
    unsafe {
        std::arch::asm!(
            "ldmxcsr [{0}]",
            in(reg) &word,
            options(readonly, nostack, preserves_flags)
        );
    }
}

#[cfg(target_arch = "aarch64")]
fn read_fpcr() -> u64 {
    let word: u64;
    // Safety: mrs from FPCR is a plain register read.
    unsafe {
        std::arch::asm!(
            "mrs {0}, fpcr",
            out(reg) word,
            options(nomem, nostack, preserves_flags)
        );
    }
    word
}

#[cfg(target_arch = "aarch64")]
fn write_fpcr(word: u64) {
    // Safety: msr to FPCR only changes float control state; the paired
    // read restores the original word.
    unsafe {
        std::arch::asm!(
            "msr fpcr, {0}",
            in(reg) word,
            options(nomem, nostack, preserves_flags)
        );
    }
}

#[cfg(all(test, any(target_arch = "x86_64", target_arch = "aarch64")))]
mod tests {
    use super::*;
    use std::hint::black_box;

    // A denormal operand; multiplying by 1.0 preserves it unless the FPU
    // flushes it to zero.
    fn denormal() -> f32 {
        black_box(f32::MIN_POSITIVE) / black_box(4.0)
    }

    #[test]
    fn test_guard_flushes_denormals() {
        {
            let _ftz = ScopedFlushToZero::engage();
            let flushed = black_box(denormal()) * black_box(1.0f32);
            assert_eq!(flushed, 0.0);
        }

        // Out of scope the mode is restored and denormals survive
        let kept = black_box(denormal()) * black_box(1.0f32);
        assert_ne!(kept, 0.0);
    }

    #[cfg(target_arch = "x86_64")]
    #[test]
    fn test_mode_word_restored() {
        let before = read_mxcsr();
        {
            let _ftz = ScopedFlushToZero::engage();
            assert_ne!(read_mxcsr() & (MXCSR_FTZ | MXCSR_DAZ), 0);
        }
        assert_eq!(read_mxcsr(), before);
    }

    #[cfg(target_arch = "aarch64")]
    #[test]
    fn test_mode_word_restored() {
        let before = read_fpcr();
        {
            let _ftz = ScopedFlushToZero::engage();
            assert_ne!(read_fpcr() & FPCR_FZ, 0);
        }
        assert_eq!(read_fpcr(), before);
    }
}
