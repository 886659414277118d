// Licensed under the Apache-2.0 license

//! Target engine: answering a remote controller from interrupt context.
//!
//! A session exists between `register_target` and `unregister_target`. The
//! remote read path keeps one byte of look-ahead in the TX FIFO so the core
//! can clock it out without stretching the bus.

use crate::common::Logger;
use crate::i2c::axi_i2c::{AxiI2c, IrqUpdate};
use crate::i2c::common::{Error, TargetConfig, TargetFlags, MAX_7BIT_ADDRESS};
use crate::i2c::registers::{AxiIicRegs, Control, Interrupts, RegisterBlock, Status, TxCmd};
use crate::i2c::sync::InterruptEvent;
use crate::i2c::traits::I2cTarget;
use crate::{log_debug, log_error};

/// Sent once the read callbacks have rejected.
const FILL_BYTE: u8 = 0xFF;

pub(crate) struct TargetSession<T> {
    pub(crate) config: TargetConfig<T>,
    reading: bool,
    writing: bool,
    read_aborted: bool,
}

impl<T: I2cTarget> TargetSession<T> {
    pub(crate) fn new(config: TargetConfig<T>) -> Self {
        Self {
            config,
            reading: false,
            writing: false,
            read_aborted: false,
        }
    }

    pub(crate) fn is_active(&self) -> bool {
        self.reading || self.writing
    }

    pub(crate) fn reset(&mut self) {
        self.reading = false;
        self.writing = false;
        self.read_aborted = false;
    }

    pub(crate) fn address7(&self) -> u8 {
        // Checked against MAX_7BIT_ADDRESS at registration.
        (self.config.address & MAX_7BIT_ADDRESS) as u8
    }

    /// Causes this session consumes given its state on entry.
    fn owned(&self, status: Interrupts) -> Interrupts {
        let mut owned = Interrupts::ADDR_TARGET;
        if self.is_active() {
            owned |= Interrupts::NOT_ADDR_TARGET;
        }
        if self.writing {
            owned |= Interrupts::RX_FIFO_FULL;
        }
        if self.reading {
            owned |= Interrupts::TX_FIFO_EMPTY | Interrupts::TX_ERR_TARGET_COMP;
        }
        status & owned
    }

    /// Handles one target-mode cause per pass, highest priority first.
    ///
    /// Owned causes left unhandled stay pending for the next pass; the rest
    /// of `status` belongs to the controller engine.
    pub(crate) fn service<R: RegisterBlock, L: Logger>(
        &mut self,
        regs: &AxiIicRegs<R>,
        status: Interrupts,
        update: &mut IrqUpdate,
        logger: &L,
    ) {
        let owned = self.owned(status);
        if owned.is_empty() {
            return;
        }

        let handled = if owned.contains(Interrupts::ADDR_TARGET) {
            self.addressed(regs, update, logger);
            Interrupts::ADDR_TARGET
        } else if owned.contains(Interrupts::NOT_ADDR_TARGET) {
            self.released(regs, update, logger);
            Interrupts::NOT_ADDR_TARGET
        } else if owned.contains(Interrupts::RX_FIFO_FULL) {
            let byte = regs.pop_rx();
            if self.config.callbacks.write_received(byte).is_err() {
                log_debug!(*logger, "target rejected byte {:#04x}", byte);
                regs.modify_cr(|cr| cr | Control::TXAK);
            }
            update.keep(Interrupts::RX_FIFO_FULL);
            Interrupts::RX_FIFO_FULL
        } else if owned.contains(Interrupts::TX_ERR_TARGET_COMP) {
            // The remote NAKed our last byte; nothing more goes out.
            update.disarm(Interrupts::TX_FIFO_EMPTY);
            update.keep(Interrupts::TX_ERR_TARGET_COMP);
            Interrupts::TX_ERR_TARGET_COMP
        } else {
            let byte = if self.read_aborted {
                FILL_BYTE
            } else {
                match self.config.callbacks.read_processed() {
                    Ok(byte) => byte,
                    Err(_) => {
                        log_debug!(*logger, "target read aborted");
                        self.read_aborted = true;
                        FILL_BYTE
                    }
                }
            };
            regs.push_tx(byte, TxCmd::empty());
            update.keep(Interrupts::TX_FIFO_EMPTY);
            Interrupts::TX_FIFO_EMPTY
        };

        update.defer(owned - handled);
    }

    fn addressed<R: RegisterBlock, L: Logger>(
        &mut self,
        regs: &AxiIicRegs<R>,
        update: &mut IrqUpdate,
        logger: &L,
    ) {
        update.clear |= Interrupts::ADDR_TARGET | Interrupts::NOT_ADDR_TARGET;
        update.disarm(Interrupts::ADDR_TARGET);
        update.arm(Interrupts::NOT_ADDR_TARGET);

        if regs.sr().contains(Status::SRW) {
            self.reading = true;
            let byte = self.config.callbacks.read_requested().unwrap_or_else(|_| {
                self.read_aborted = true;
                FILL_BYTE
            });
            log_debug!(*logger, "target read requested, first byte {:#04x}", byte);
            regs.push_tx(byte, TxCmd::empty());
            let tx = Interrupts::TX_FIFO_EMPTY | Interrupts::TX_ERR_TARGET_COMP;
            update.arm(tx);
            update.clear |= tx;
        } else {
            self.writing = true;
            update.arm(Interrupts::RX_FIFO_FULL);
            if self.config.callbacks.write_requested().is_err() {
                log_debug!(*logger, "target write rejected");
                regs.modify_cr(|cr| cr | Control::TXAK);
            } else {
                log_debug!(*logger, "target write requested");
            }
        }
    }

    fn released<R: RegisterBlock, L: Logger>(
        &mut self,
        regs: &AxiIicRegs<R>,
        update: &mut IrqUpdate,
        logger: &L,
    ) {
        self.config.callbacks.stop();
        if self.reading {
            // Drop the look-ahead byte the remote never clocked out.
            regs.modify_cr(|cr| cr | Control::TX_FIFO_RST);
            regs.modify_cr(|cr| cr - Control::TX_FIFO_RST);
        }
        self.reset();
        regs.modify_cr(|cr| cr - Control::TXAK);

        update.disarm(
            Interrupts::NOT_ADDR_TARGET
                | Interrupts::TX_FIFO_EMPTY
                | Interrupts::TX_ERR_TARGET_COMP
                | Interrupts::RX_FIFO_FULL,
        );
        update.arm(Interrupts::ADDR_TARGET);
        log_debug!(*logger, "target stop");
    }
}

impl<R, E, T, L> AxiI2c<R, E, T, L>
where
    R: RegisterBlock,
    E: InterruptEvent,
    T: I2cTarget,
    L: Logger,
{
    pub(crate) fn attach_target(
        &self,
        config: TargetConfig<T>,
    ) -> Result<(), (Error, TargetConfig<T>)> {
        if config.flags.contains(TargetFlags::ADDR_10_BITS) {
            return Err((Error::NotSupported, config));
        }
        if config.address > MAX_7BIT_ADDRESS {
            return Err((Error::InvalidArgument, config));
        }

        let _guard = self.transaction.lock();
        let address = config.address;
        let refused = critical_section::with(|cs| {
            let mut slot = self.target.borrow_ref_mut(cs);
            if slot.is_some() {
                return Some(config);
            }
            *slot = Some(TargetSession::new(config));
            None
        });
        if let Some(config) = refused {
            log_error!(self.logger, "target already registered");
            return Err((Error::Busy, config));
        }

        // Reinit programs ADR, the RX threshold and the address-match enable.
        self.reinit();
        log_debug!(self.logger, "target registered at {:#04x}", address);
        Ok(())
    }

    pub(crate) fn detach_target(&self) -> Result<TargetConfig<T>, Error> {
        let _guard = self.transaction.lock();
        let session = critical_section::with(|cs| {
            let mut slot = self.target.borrow_ref_mut(cs);
            match slot.as_ref() {
                None => return Err(Error::InvalidArgument),
                Some(session) if session.is_active() => return Err(Error::Busy),
                Some(_) => {}
            }

            self.regs.set_target_address(0);
            self.regs.modify_ier(|ier| ier - Interrupts::TARGET);
            slot.take().ok_or(Error::InvalidArgument)
        });

        match session {
            Ok(session) => {
                log_debug!(self.logger, "target unregistered");
                Ok(session.config)
            }
            Err(err) => {
                log_error!(self.logger, "target unregister refused: {}", err);
                Err(err)
            }
        }
    }
}
