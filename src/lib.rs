//! sstv-studio library crate.
//!
//! Encodes images into SSTV audio and decodes them back, recommends modes,
//! records from the microphone and manages the on-disk file store.

pub mod assets;
pub mod audio;
pub mod capture;
pub mod cli;
pub mod codec;
pub mod config;
pub mod decoder;
pub mod encoder;
pub mod error;
pub mod imaging;
pub mod modes;

pub use error::{ErrorKind, Result, SstvError};
