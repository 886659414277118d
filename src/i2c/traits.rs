// Licensed under the Apache-2.0 license

//! # Driver-level traits
//!
//! The seams between the AXI IIC engine and the rest of the system:
//!
//! - [`I2cBus`]: what a bus client calls (configure, transfer, target
//!   registration).
//! - [`I2cTarget`]: what the target engine calls back into while this
//!   controller is addressed by a remote controller.
//! - [`IrqHandler`]: the per-instance interrupt trampoline handed to the
//!   platform's interrupt installation hook.

use crate::i2c::common::{I2cMsg, TargetConfig, TargetReject};

/// Controller-side operations of a dual-role bus driver.
///
/// # Examples
///
/// ```rust,ignore
/// use xlnx_axi_i2c::i2c::{I2cBus, I2cMsg};
///
/// fn read_reg<B: I2cBus>(bus: &B, reg: u8) -> Result<u8, B::Error> {
///     let mut out = [0u8; 1];
///     bus.transfer(
///         &mut [I2cMsg::write(&[reg]), I2cMsg::read(&mut out).with_restart().with_stop()],
///         0x50,
///     )?;
///     Ok(out[0])
/// }
/// ```
pub trait I2cBus {
    type Error: embedded_hal::i2c::Error + core::fmt::Debug;
    type Target: I2cTarget;

    /// Re-applies the controller configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the core cannot be brought back to an idle state.
    fn configure(&self) -> Result<(), Self::Error>;

    /// Runs `msgs` as one bus transaction addressed to `addr`.
    ///
    /// The first message and any message flagged `RESTART` start with the
    /// address byte; the others continue the previous message.
    ///
    /// # Errors
    ///
    /// The first failing message aborts the transaction; the core is
    /// reinitialized before the error is returned.
    fn transfer(&self, msgs: &mut [I2cMsg<'_>], addr: u16) -> Result<(), Self::Error>;

    /// Starts answering to `config.address` as a bus target.
    ///
    /// # Errors
    ///
    /// `Busy` if a target is already registered; the rejected configuration
    /// is handed back alongside the error.
    fn register_target(
        &self,
        config: TargetConfig<Self::Target>,
    ) -> Result<(), (Self::Error, TargetConfig<Self::Target>)>;

    /// Stops answering as a target and returns the registration.
    ///
    /// # Errors
    ///
    /// `Busy` while a remote read or write is in progress.
    fn unregister_target(&self) -> Result<TargetConfig<Self::Target>, Self::Error>;
}

/// Callbacks the target engine runs from interrupt context.
///
/// Implementations must not block. Returning [`TargetReject`] from a write
/// hook NAKs the byte; from a read hook it ends the data and the remaining
/// bytes are sent as `0xFF`.
pub trait I2cTarget {
    /// A remote controller addressed us for reading; returns the first byte.
    fn read_requested(&mut self) -> Result<u8, TargetReject>;

    /// The previous byte was clocked out; returns the next one.
    fn read_processed(&mut self) -> Result<u8, TargetReject>;

    /// A remote controller addressed us for writing.
    fn write_requested(&mut self) -> Result<(), TargetReject>;

    fn write_received(&mut self, byte: u8) -> Result<(), TargetReject>;

    /// We are no longer addressed.
    fn stop(&mut self);
}

/// Placeholder target that refuses every request.
#[derive(Copy, Clone, Debug, Default)]
pub struct DummyTarget;

impl I2cTarget for DummyTarget {
    fn read_requested(&mut self) -> Result<u8, TargetReject> {
        Err(TargetReject)
    }

    fn read_processed(&mut self) -> Result<u8, TargetReject> {
        Err(TargetReject)
    }

    fn write_requested(&mut self) -> Result<(), TargetReject> {
        Err(TargetReject)
    }

    fn write_received(&mut self, _byte: u8) -> Result<(), TargetReject> {
        Err(TargetReject)
    }

    fn stop(&mut self) {}
}

/// Interrupt trampoline for one controller instance.
pub trait IrqHandler: Sync {
    fn on_interrupt(&self);
}
