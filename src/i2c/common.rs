// Licensed under the Apache-2.0 license

//! Common types for the AXI IIC driver modules.
//!
//! Error handling, the controller configuration and its builder, transfer
//! messages and the target registration record live here.

use core::fmt;

use bitflags::bitflags;
use embedded_hal::i2c::{self, NoAcknowledgeSource};
use fugit::MillisDurationU32;

use crate::i2c::traits::IrqHandler;

/// Highest 7-bit bus address.
pub const MAX_7BIT_ADDRESS: u16 = 0x7F;

/// Longest read the dynamic path can describe in its length word.
pub const MAX_DYNAMIC_READ_LEN: usize = 255;

/// Default time to wait for any single interrupt.
pub const DEFAULT_TIMEOUT: MillisDurationU32 = MillisDurationU32::millis(100);

/// Errors returned by the AXI IIC driver.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// Zero-length read, out of range address, or no such registration.
    InvalidArgument,
    /// 10-bit addressing was requested.
    NotSupported,
    /// A target is already registered or active, or the bus stayed busy.
    Busy,
    /// No interrupt arrived within the configured deadline.
    Timeout,
    /// Another controller won the bus mid-transaction.
    ArbitrationLost,
    /// The addressed device did not acknowledge.
    NoAck,
    /// Generic register layer failure.
    Io,
}

impl i2c::Error for Error {
    #[inline]
    fn kind(&self) -> i2c::ErrorKind {
        match *self {
            Error::ArbitrationLost => i2c::ErrorKind::ArbitrationLoss,
            Error::NoAck => i2c::ErrorKind::NoAcknowledge(NoAcknowledgeSource::Unknown),
            Error::Busy | Error::Io => i2c::ErrorKind::Bus,
            Error::InvalidArgument | Error::NotSupported | Error::Timeout => {
                i2c::ErrorKind::Other
            }
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            Error::InvalidArgument => "invalid argument",
            Error::NotSupported => "not supported",
            Error::Busy => "busy",
            Error::Timeout => "timed out waiting for interrupt",
            Error::ArbitrationLost => "arbitration lost",
            Error::NoAck => "no acknowledge",
            Error::Io => "i/o error",
        };
        f.write_str(msg)
    }
}

/// Controller configuration.
#[derive(Copy, Clone)]
pub struct AxiI2cConfig {
    /// Some core revisions mishandle the dynamic read mode; clear this to
    /// force byte-at-a-time reads.
    pub dynamic_read_working: bool,
    /// Deadline for each interrupt wait.
    pub timeout: MillisDurationU32,
    /// Soft-reset the core at the start of every transfer.
    pub reinit_before_transfer: bool,
    /// Installs and enables the interrupt line; called once by `init`.
    pub irq_config: Option<fn(&'static dyn IrqHandler)>,
}

impl Default for AxiI2cConfig {
    fn default() -> Self {
        AxiI2cConfigBuilder::new().build()
    }
}

impl fmt::Debug for AxiI2cConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AxiI2cConfig")
            .field("dynamic_read_working", &self.dynamic_read_working)
            .field("timeout", &self.timeout)
            .field("reinit_before_transfer", &self.reinit_before_transfer)
            .field("irq_config", &self.irq_config.is_some())
            .finish()
    }
}

pub struct AxiI2cConfigBuilder {
    dynamic_read_working: bool,
    timeout: MillisDurationU32,
    reinit_before_transfer: bool,
    irq_config: Option<fn(&'static dyn IrqHandler)>,
}

impl Default for AxiI2cConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl AxiI2cConfigBuilder {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            dynamic_read_working: true,
            timeout: DEFAULT_TIMEOUT,
            reinit_before_transfer: true,
            irq_config: None,
        }
    }
    #[must_use]
    pub const fn dynamic_read_working(mut self, working: bool) -> Self {
        self.dynamic_read_working = working;
        self
    }
    #[must_use]
    pub const fn timeout(mut self, timeout: MillisDurationU32) -> Self {
        self.timeout = timeout;
        self
    }
    #[must_use]
    pub const fn reinit_before_transfer(mut self, enabled: bool) -> Self {
        self.reinit_before_transfer = enabled;
        self
    }
    #[must_use]
    pub const fn irq_config(mut self, install: fn(&'static dyn IrqHandler)) -> Self {
        self.irq_config = Some(install);
        self
    }
    #[must_use]
    pub const fn build(self) -> AxiI2cConfig {
        AxiI2cConfig {
            dynamic_read_working: self.dynamic_read_working,
            timeout: self.timeout,
            reinit_before_transfer: self.reinit_before_transfer,
            irq_config: self.irq_config,
        }
    }
}

bitflags! {
    /// Per-message flags.
    #[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
    pub struct MsgFlags: u8 {
        /// Issue a repeated START with the address before this message.
        const RESTART = 1 << 0;
        /// Release the bus after this message.
        const STOP = 1 << 1;
        const ADDR_10_BITS = 1 << 2;
    }
}

/// Data buffer of a message; the variant is the transfer direction.
#[derive(Debug)]
pub enum MsgBuf<'a> {
    Read(&'a mut [u8]),
    Write(&'a [u8]),
}

/// One message of a bus transaction.
#[derive(Debug)]
pub struct I2cMsg<'a> {
    pub buf: MsgBuf<'a>,
    pub flags: MsgFlags,
}

impl<'a> I2cMsg<'a> {
    #[must_use]
    pub fn write(bytes: &'a [u8]) -> Self {
        Self {
            buf: MsgBuf::Write(bytes),
            flags: MsgFlags::empty(),
        }
    }

    #[must_use]
    pub fn read(buffer: &'a mut [u8]) -> Self {
        Self {
            buf: MsgBuf::Read(buffer),
            flags: MsgFlags::empty(),
        }
    }

    #[must_use]
    pub fn with_stop(mut self) -> Self {
        self.flags |= MsgFlags::STOP;
        self
    }

    #[must_use]
    pub fn with_restart(mut self) -> Self {
        self.flags |= MsgFlags::RESTART;
        self
    }

    #[must_use]
    pub fn with_flags(mut self, flags: MsgFlags) -> Self {
        self.flags |= flags;
        self
    }

    #[must_use]
    pub fn is_read(&self) -> bool {
        matches!(self.buf, MsgBuf::Read(_))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        match &self.buf {
            MsgBuf::Read(buf) => buf.len(),
            MsgBuf::Write(buf) => buf.len(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

bitflags! {
    #[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
    pub struct TargetFlags: u8 {
        const ADDR_10_BITS = 1 << 0;
    }
}

/// Returned by a target callback to refuse the current byte or transfer.
///
/// On a write this NAKs the byte; on a read the remaining bytes are sent as
/// `0xFF`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TargetReject;

/// A target registration: the address we answer to and the callbacks that
/// produce and consume the data.
#[derive(Debug)]
pub struct TargetConfig<T> {
    pub address: u16,
    pub flags: TargetFlags,
    pub callbacks: T,
}

impl<T> TargetConfig<T> {
    pub const fn new(address: u16, callbacks: T) -> Self {
        Self {
            address,
            flags: TargetFlags::empty(),
            callbacks,
        }
    }
}
