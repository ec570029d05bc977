//! Native stack headroom for the recursive passes.
//!
//! The parser, resolver, printer and interpreter all recurse on the shape of
//! the program. Each of their recursive entry points runs through
//! [`ensure_sufficient_stack`], which moves onto a freshly allocated stack
//! segment when the current one is nearly exhausted. Unbounded script-level
//! recursion is cut off separately by the interpreter's call-depth limit.

/// Below this much remaining stack, grow before recursing (100 KB).
const RED_ZONE: usize = 100 * 1024;

/// Size of each newly allocated stack segment (1 MB).
const STACK_PER_RECURSION: usize = 1024 * 1024;

#[inline]
pub fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    stacker::maybe_grow(RED_ZONE, STACK_PER_RECURSION, f)
}
