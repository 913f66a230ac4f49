//! Error taxonomy for the scheduler kernel.
//!
//! Most misuse is tolerated silently (duplicate listener, unknown handler
//! on delete) because it is ordinary and recoverable. The four kinds here
//! are reserved for conditions that latch the kernel into `Error` state and
//! are reported exactly once through the HAL's error callback.

/// A fatal condition reported through [`crate::hal::System::on_error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// A caller-supplied parameter violates a documented range, e.g.
    /// `init(0)`.
    InvalidParameters,
    /// A statically sized table or queue is already at capacity.
    InsufficientResources,
    /// An operation was attempted from a state that does not permit it,
    /// e.g. re-`init` while `Running`.
    AccessNotPermitted,
    /// A debug-only internal invariant was violated.
    AssertionFailure,
}

/// Checks a debug-only invariant, routing a failure through the same
/// latch-and-report path as any other fatal error rather than panicking.
/// Compiles to nothing in release builds.
macro_rules! debug_assert_invariant {
    ($kernel:expr, $cond:expr) => {
        #[cfg(debug_assertions)]
        {
            if !$cond {
                $kernel.latch_error($crate::error::ErrorKind::AssertionFailure);
            }
        }
    };
}

pub(crate) use debug_assert_invariant;
