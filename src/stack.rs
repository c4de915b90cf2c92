//! Stack growth for the recursive parts of the front-end.
//!
//! The Pratt parser and the tree printer recurse once per nesting level, so
//! deeply nested but valid input would otherwise run off the end of the
//! thread's stack. Wrapping the recursive entry points in
//! [`ensure_sufficient_stack`] moves the work onto a fresh segment whenever
//! the remaining space drops below the red zone.

/// Grow when less than this much stack is left.
const RED_ZONE: usize = 100 * 1024;

/// Size of each newly allocated stack segment.
const STACK_PER_RECURSION: usize = 1024 * 1024;

#[inline]
#[cfg(not(target_arch = "wasm32"))]
pub fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    stacker::maybe_grow(RED_ZONE, STACK_PER_RECURSION, f)
}

/// WASM manages its own stack.
#[inline]
#[cfg(target_arch = "wasm32")]
pub fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    f()
}
