// Licensed under the Apache-2.0 license

//! AXI IIC driver module.
//!
//! One [`AxiI2c`] instance drives one core in both roles: it runs controller
//! transfers for local callers and, once a target is registered, answers a
//! remote controller from its interrupt handler. The embedded-hal front end
//! is [`I2cController`].

pub mod axi_i2c;
pub mod common;
mod controller;
pub mod i2c_controller;
pub mod registers;
pub mod sync;
mod target;
pub mod traits;

pub use axi_i2c::AxiI2c;
pub use common::{
    AxiI2cConfig, AxiI2cConfigBuilder, Error, I2cMsg, MsgBuf, MsgFlags, TargetConfig,
    TargetFlags, TargetReject,
};
pub use i2c_controller::I2cController;
pub use registers::{MmioRegisters, RegisterBlock};
pub use sync::{InterruptEvent, PollingEvent};
pub use traits::{DummyTarget, I2cBus, I2cTarget, IrqHandler};
