//! Property-based tests for decoding and task state invariants

mod decoding;
mod task_state;
