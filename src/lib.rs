// src/lib.rs — Library root for livetrack

pub mod cli;
pub mod infra;
pub mod storage;
pub mod upstream;
pub mod watch;
