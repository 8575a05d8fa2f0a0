//! Integration tests for the emulator suite, driven through the library API
//! with real sockets.

mod common;
mod hosting;
mod lifecycle;
