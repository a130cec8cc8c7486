//! The payload module contains the codecs that turn raw basepage bytes into
//! values and back.

pub mod bcd;

pub use bcd::*;
