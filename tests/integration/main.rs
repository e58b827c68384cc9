//! Integration test driver for `tests/integration/`.
//!
//! Each `mod` below maps to a file that exercises a subsystem against the
//! recording mock services. All tests run on the host with no GPIO, bus
//! connection or audio hardware required.

mod connection_tests;
mod dialing_flow_tests;
mod mock_services;
