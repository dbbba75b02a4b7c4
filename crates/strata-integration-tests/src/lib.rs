//! End-to-end tests for the Strata plugin host live under `tests/`; this
//! crate body is intentionally empty.
