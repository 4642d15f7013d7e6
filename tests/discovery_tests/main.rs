//! Discovery Tests
//!
//! Probe/response rounds against simulated responders.
