#![cfg(test)]
#![allow(dead_code)]
#![allow(unused_imports)]

pub mod fake_resolver;

pub use fake_resolver::{FakeResolverDaemon, RecordedCall};
