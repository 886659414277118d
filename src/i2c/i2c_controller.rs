// Licensed under the Apache-2.0 license

//! embedded-hal front end for any [`I2cBus`].
//!
//! Operations of an `embedded_hal::i2c::I2c` transaction become messages of a
//! single bus transfer: a direction change issues a repeated START and the
//! last operation ends with STOP.

use embedded_hal::i2c::{Operation, SevenBitAddress};
use heapless::Vec;

use crate::common::{Logger, NoOpLogger};
use crate::i2c::common::{Error, I2cMsg, MsgFlags};
use crate::i2c::traits::I2cBus;
use crate::log_error;

/// Most operations a single `transaction` call may carry.
pub const MAX_OPERATIONS: usize = 16;

pub struct I2cController<'d, B: I2cBus, L: Logger = NoOpLogger> {
    pub bus: &'d B,
    pub logger: L,
}

impl<'d, B: I2cBus> I2cController<'d, B> {
    pub fn new(bus: &'d B) -> Self {
        Self {
            bus,
            logger: NoOpLogger,
        }
    }
}

impl<'d, B: I2cBus, L: Logger> I2cController<'d, B, L> {
    pub fn with_logger(bus: &'d B, logger: L) -> Self {
        Self { bus, logger }
    }
}

impl<B, L> embedded_hal::i2c::ErrorType for I2cController<'_, B, L>
where
    B: I2cBus,
    B::Error: From<Error>,
    L: Logger,
{
    type Error = B::Error;
}

impl<B, L> embedded_hal::i2c::I2c for I2cController<'_, B, L>
where
    B: I2cBus,
    B::Error: From<Error>,
    L: Logger,
{
    fn transaction(
        &mut self,
        addr: SevenBitAddress,
        operations: &mut [Operation<'_>],
    ) -> Result<(), Self::Error> {
        let count = operations.len();
        let mut msgs: Vec<I2cMsg<'_>, MAX_OPERATIONS> = Vec::new();
        let mut prev_read = None;

        for (index, op) in operations.iter_mut().enumerate() {
            let msg = match op {
                Operation::Read(buf) => I2cMsg::read(buf),
                Operation::Write(bytes) => I2cMsg::write(bytes),
            };
            let mut flags = MsgFlags::empty();
            if prev_read.is_some_and(|read| read != msg.is_read()) {
                flags |= MsgFlags::RESTART;
            }
            if index + 1 == count {
                flags |= MsgFlags::STOP;
            }
            prev_read = Some(msg.is_read());

            if msgs.push(msg.with_flags(flags)).is_err() {
                log_error!(self.logger, "{} operations exceed {}", count, MAX_OPERATIONS);
                return Err(Error::InvalidArgument.into());
            }
        }

        self.bus.transfer(&mut msgs, u16::from(addr))
    }
}
