//! Firmware core of a serial to CAN bridge.
//!
//! The host talks to the bridge over a serial link with modem-style `AT`
//! commands to configure the CAN bit rate, acceptance masks and filters (all
//! persisted to non-volatile storage), then issues `ATO` to tunnel raw CAN
//! frames in either a binary or a hex encoding until it sends `+++`.
//!
//! Hardware is reached only through the [`Transport`], [`Storage`],
//! [`CanBus`] and [`Indicator`] traits, so the core runs unchanged on any
//! board.

#![no_std]

#[macro_use]
mod fmt;

mod bridge;
mod capability;
mod command;
mod config;
mod frame;
pub mod hex;
mod line;
mod store;
pub mod word;

#[cfg(test)]
mod mock;

pub use bridge::*;
pub use capability::*;
pub use command::*;
pub use config::*;
pub use frame::*;
pub use line::*;
pub use store::*;

pub use embedded_can::{ExtendedId, Id, StandardId};
