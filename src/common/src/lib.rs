//! Types shared between the Ember EC core and board support code.

#![no_std]

pub mod error;
pub mod gpio;
pub mod keyboard;

pub use error::{EcError, EcResult};
