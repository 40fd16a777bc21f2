//! Dispatch unit tests

mod worker_tests;
