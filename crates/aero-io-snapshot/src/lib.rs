//! Deterministic, versioned snapshot encoding for emulated I/O devices.
#![forbid(unsafe_code)]

pub mod io;
