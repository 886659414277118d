// Licensed under the Apache-2.0 license

//! AXI IIC controller instance: construction, core reset, interrupt waits
//! and the top-half interrupt handler.
//!
//! The controller transfer engine lives in `controller.rs` and the target
//! engine in `target.rs`; both are inherent methods on [`AxiI2c`].

use core::cell::RefCell;

use crate::common::{Logger, NoOpLogger};
use crate::i2c::common::{AxiI2cConfig, Error, I2cMsg, TargetConfig};
use crate::i2c::registers::{AxiIicRegs, Control, Interrupts, RegisterBlock, Status};
use crate::i2c::sync::InterruptEvent;
use crate::i2c::target::TargetSession;
use crate::i2c::traits::{DummyTarget, I2cBus, I2cTarget, IrqHandler};
use crate::{log_debug, log_error};

/// Driver for one AXI IIC core.
///
/// `R` reaches the registers, `E` carries interrupt causes from
/// [`AxiI2c::handle_interrupt`] to a blocked caller, `T` receives target-mode
/// callbacks and `L` takes diagnostics.
pub struct AxiI2c<R, E, T = DummyTarget, L = NoOpLogger> {
    pub(crate) regs: AxiIicRegs<R>,
    pub(crate) event: E,
    pub(crate) config: AxiI2cConfig,
    /// Serializes whole transfers and target (un)registration.
    pub(crate) transaction: spin::Mutex<()>,
    pub(crate) target: critical_section::Mutex<RefCell<Option<TargetSession<T>>>>,
    pub(crate) logger: L,
}

impl<R, E, T, L> AxiI2c<R, E, T, L>
where
    R: RegisterBlock,
    E: InterruptEvent,
    T: I2cTarget,
    L: Logger,
{
    pub const fn new(regs: R, event: E, config: AxiI2cConfig, logger: L) -> Self {
        Self {
            regs: AxiIicRegs::new(regs),
            event,
            config,
            transaction: spin::Mutex::new(()),
            target: critical_section::Mutex::new(RefCell::new(None)),
            logger,
        }
    }

    pub fn config(&self) -> &AxiI2cConfig {
        &self.config
    }

    pub fn registers(&self) -> &AxiIicRegs<R> {
        &self.regs
    }

    /// Address of the registered target, if any.
    pub fn target_address(&self) -> Option<u16> {
        critical_section::with(|cs| {
            self.target
                .borrow_ref(cs)
                .as_ref()
                .map(|session| session.config.address)
        })
    }

    /// Soft-resets the core and restores the enable state.
    ///
    /// A registered target gets its address and address-match interrupt
    /// back; a target transfer cut short by the reset is ended with `stop`.
    pub(crate) fn reinit(&self) {
        critical_section::with(|cs| {
            self.regs.soft_reset();
            self.regs.set_cr(Control::TX_FIFO_RST);
            self.regs.set_cr(Control::EN);

            if let Some(session) = self.target.borrow_ref_mut(cs).as_mut() {
                if session.is_active() {
                    session.config.callbacks.stop();
                }
                session.reset();
                self.regs.set_target_address(session.address7());
                self.regs.set_rx_threshold(0);
                self.regs.set_ier(Interrupts::ADDR_TARGET);
            }

            self.regs.set_global_interrupts(true);
        });
        log_debug!(self.logger, "core reinitialized");
    }

    /// Arms `mask` and blocks until one of its causes fires.
    pub(crate) fn wait_interrupt(&self, mask: Interrupts) -> Result<Interrupts, Error> {
        critical_section::with(|_| {
            self.event.clear(mask);
            self.regs.modify_ier(|ier| ier | mask);
        });

        let events = self.event.wait(mask, self.config.timeout);
        if events.is_empty() {
            log_error!(
                self.logger,
                "timeout waiting for {:#04x}, sr {:#04x} isr {:#04x}",
                mask.bits(),
                self.regs.sr().bits(),
                self.regs.isr().bits()
            );
            return Err(Error::Timeout);
        }
        Ok(events)
    }

    /// Returns once the bus is idle; a bus that stays busy is reset and
    /// reported as [`Error::Busy`].
    pub(crate) fn wait_not_busy(&self) -> Result<(), Error> {
        let busy = critical_section::with(|_| {
            self.regs.clear_interrupts(Interrupts::BUS_NOT_BUSY);
            self.regs.sr().contains(Status::BB)
        });
        if !busy {
            return Ok(());
        }

        match self.wait_interrupt(Interrupts::BUS_NOT_BUSY) {
            Ok(events) if events.contains(Interrupts::BUS_NOT_BUSY) => Ok(()),
            _ => {
                log_error!(self.logger, "bus stuck busy");
                self.reinit();
                Err(Error::Busy)
            }
        }
    }

    /// Resets the core and waits for the bus to go idle.
    ///
    /// # Errors
    ///
    /// [`Error::Busy`] if the bus is still held after the reset.
    pub fn recover_bus(&self) -> Result<(), Error> {
        let _guard = self.transaction.lock();
        self.reinit();
        self.wait_not_busy()
    }

    /// Top half of the controller's interrupt.
    ///
    /// Acknowledges and masks the pending causes, hands target-mode causes to
    /// the target engine and wakes any caller blocked in a wait.
    pub fn handle_interrupt(&self) {
        let status = critical_section::with(|cs| {
            let enabled = self.regs.ier();
            let status = self.regs.isr() & enabled;
            let mut update = IrqUpdate::new(status, enabled);

            if status.contains(Interrupts::ARB_LOST) {
                // MSMS has to drop before the cause is acknowledged.
                self.regs.modify_cr(|cr| cr - Control::MSMS);
            }

            if let Some(session) = self.target.borrow_ref_mut(cs).as_mut() {
                session.service(&self.regs, status, &mut update, &self.logger);
            }

            self.regs.set_ier(update.enable - update.mask);
            self.regs.clear_interrupts(update.clear);
            status
        });

        if !status.is_empty() {
            self.event.post(status);
        }
    }
}

impl<R, E, T, L> AxiI2c<R, E, T, L>
where
    R: RegisterBlock,
    E: InterruptEvent,
    T: I2cTarget,
    L: Logger,
    Self: IrqHandler + 'static,
{
    /// Resets the core, then hands the instance to the interrupt
    /// installation hook.
    pub fn init(&'static self) {
        self.reinit();
        if let Some(install) = self.config.irq_config {
            install(self);
        }
        log_debug!(
            self.logger,
            "initialized, dynamic read {}",
            self.config.dynamic_read_working
        );
    }
}

/// Register updates an interrupt pass accumulates before writing back.
///
/// The written `IER` is `enable - mask`: every pending cause is masked
/// unless the target engine claims or re-arms it.
pub(crate) struct IrqUpdate {
    pub(crate) clear: Interrupts,
    pub(crate) mask: Interrupts,
    pub(crate) enable: Interrupts,
}

impl IrqUpdate {
    pub(crate) fn new(status: Interrupts, enabled: Interrupts) -> Self {
        Self {
            clear: status,
            mask: status,
            enable: enabled,
        }
    }

    pub(crate) fn arm(&mut self, bits: Interrupts) {
        self.enable |= bits;
        self.mask -= bits;
    }

    pub(crate) fn disarm(&mut self, bits: Interrupts) {
        self.enable -= bits;
    }

    /// Leaves `bits` enabled as they are.
    pub(crate) fn keep(&mut self, bits: Interrupts) {
        self.mask -= bits;
    }

    /// Leaves `bits` pending and enabled so the next pass picks them up.
    pub(crate) fn defer(&mut self, bits: Interrupts) {
        self.clear -= bits;
        self.mask -= bits;
    }
}

impl<R, E, T, L> IrqHandler for AxiI2c<R, E, T, L>
where
    R: RegisterBlock + Sync,
    E: InterruptEvent + Sync,
    T: I2cTarget + Send,
    L: Logger + Sync,
{
    fn on_interrupt(&self) {
        self.handle_interrupt();
    }
}

impl<R, E, T, L> I2cBus for AxiI2c<R, E, T, L>
where
    R: RegisterBlock,
    E: InterruptEvent,
    T: I2cTarget,
    L: Logger,
{
    type Error = Error;
    type Target = T;

    fn configure(&self) -> Result<(), Error> {
        let _guard = self.transaction.lock();
        self.reinit();
        Ok(())
    }

    fn transfer(&self, msgs: &mut [I2cMsg<'_>], addr: u16) -> Result<(), Error> {
        self.transfer_msgs(msgs, addr)
    }

    fn register_target(&self, config: TargetConfig<T>) -> Result<(), (Error, TargetConfig<T>)> {
        self.attach_target(config)
    }

    fn unregister_target(&self) -> Result<TargetConfig<T>, Error> {
        self.detach_target()
    }
}
