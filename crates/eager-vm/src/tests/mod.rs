//! Integration tests for the VM

pub mod helpers;

pub mod concurrency;
