//! Shared test utilities for pipeline integration tests.
//!
//! - `MemoryStore`: in-memory `ParsingStore` with write-fault injection
//! - `ScriptedProvider`: `ParsingProvider` replaying scripted HTTP bodies
//! - `RecordingQueue`: `PollQueue` that records scheduled tasks
//! - `Harness`: the services wired together over the fakes

#![allow(dead_code)]

pub mod fakes;
pub mod harness;

pub use fakes::*;
pub use harness::Harness;
