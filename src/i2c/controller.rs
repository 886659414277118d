// Licensed under the Apache-2.0 license

//! Controller transfer engine.
//!
//! Writes are fed through the TX FIFO and complete on TX-empty. Reads use the
//! core's dynamic mode, where a programmed byte count lets the hardware drive
//! ACK/NAK and STOP, unless that mode is unavailable. The fallback receives one
//! byte per interrupt: `RX_FIFO_FULL` only fires when the occupancy *equals*
//! the threshold, so buffering several bytes could overrun unnoticed.

use core::cmp::min;

use crate::common::Logger;
use crate::i2c::axi_i2c::AxiI2c;
use crate::i2c::common::{
    Error, I2cMsg, MsgBuf, MsgFlags, MAX_7BIT_ADDRESS, MAX_DYNAMIC_READ_LEN,
};
use crate::i2c::registers::{Control, Interrupts, RegisterBlock, TxCmd, FIFO_SIZE};
use crate::i2c::sync::InterruptEvent;
use crate::i2c::traits::I2cTarget;
use crate::{log_debug, log_error};

const WRITE_EVENTS: Interrupts = Interrupts::TX_FIFO_EMPTY
    .union(Interrupts::BUS_NOT_BUSY)
    .union(Interrupts::ARB_LOST)
    .union(Interrupts::TX_ERR_TARGET_COMP);

const READ_EVENTS: Interrupts = Interrupts::RX_FIFO_FULL
    .union(Interrupts::ARB_LOST)
    .union(Interrupts::TX_ERR_TARGET_COMP);

/// Where a message sits in its transaction.
#[derive(Copy, Clone, Debug)]
struct Framing {
    /// Send the address first.
    start: bool,
    /// The address goes out as a repeated START.
    restart: bool,
    stop: bool,
    /// No further byte of this read direction follows: NAK the last one.
    ends_read: bool,
}

fn address_byte(addr: u8, read: bool) -> u8 {
    (addr << 1) | u8::from(read)
}

fn fail_on(events: Interrupts) -> Result<(), Error> {
    if events.contains(Interrupts::ARB_LOST) {
        Err(Error::ArbitrationLost)
    } else if events.contains(Interrupts::TX_ERR_TARGET_COMP) {
        Err(Error::NoAck)
    } else {
        Ok(())
    }
}

/// Rejects a message list the engine cannot express, before the bus is
/// touched.
fn validate(msgs: &[I2cMsg<'_>], addr: u16) -> Result<u8, Error> {
    if msgs.iter().any(|msg| msg.flags.contains(MsgFlags::ADDR_10_BITS)) {
        return Err(Error::NotSupported);
    }
    let addr = u8::try_from(addr)
        .ok()
        .filter(|addr| u16::from(*addr) <= MAX_7BIT_ADDRESS)
        .ok_or(Error::InvalidArgument)?;

    let mut prev_read = None;
    for msg in msgs {
        if msg.is_read() && msg.is_empty() {
            return Err(Error::InvalidArgument);
        }
        // The direction can only change behind a (repeated) START.
        if prev_read.is_some_and(|read| read != msg.is_read())
            && !msg.flags.contains(MsgFlags::RESTART)
        {
            return Err(Error::InvalidArgument);
        }
        prev_read = Some(msg.is_read());
    }
    Ok(addr)
}

impl<R, E, T, L> AxiI2c<R, E, T, L>
where
    R: RegisterBlock,
    E: InterruptEvent,
    T: I2cTarget,
    L: Logger,
{
    pub(crate) fn transfer_msgs(&self, msgs: &mut [I2cMsg<'_>], addr: u16) -> Result<(), Error> {
        let addr = validate(msgs, addr)?;

        let _guard = self.transaction.lock();
        if self.config.reinit_before_transfer {
            self.reinit();
        }
        if msgs.is_empty() {
            return Ok(());
        }
        self.wait_not_busy()?;

        let count = msgs.len();
        for index in 0..count {
            let next_flags = msgs.get(index + 1).map(|m| (m.flags, m.is_read()));
            let Some(msg) = msgs.get_mut(index) else {
                break;
            };
            let restart = msg.flags.contains(MsgFlags::RESTART);
            let stop = msg.flags.contains(MsgFlags::STOP);
            let framing = Framing {
                start: index == 0 || restart,
                restart: index != 0 && restart,
                stop,
                ends_read: stop
                    || next_flags.map_or(true, |(flags, read)| {
                        flags.contains(MsgFlags::RESTART) || !read
                    }),
            };

            let result = self.run_msg(msg, addr, framing).and_then(|()| {
                if stop {
                    self.wait_not_busy()
                } else {
                    Ok(())
                }
            });
            if let Err(err) = result {
                log_error!(
                    self.logger,
                    "msg {} of {} to {:#04x} failed: {}",
                    index,
                    count,
                    addr,
                    err
                );
                self.reinit();
                return Err(err);
            }
        }
        Ok(())
    }

    fn run_msg(&self, msg: &mut I2cMsg<'_>, addr: u8, framing: Framing) -> Result<(), Error> {
        match &mut msg.buf {
            MsgBuf::Write(data) => self.write_msg(addr, data, framing),
            MsgBuf::Read(buf) => {
                // The length word covers this message only, so the core NAKs
                // its last byte: a read phase continued by the next message
                // has to go bytewise.
                if self.config.dynamic_read_working
                    && framing.start
                    && framing.ends_read
                    && buf.len() <= MAX_DYNAMIC_READ_LEN
                {
                    self.read_dynamic(addr, buf, framing)
                } else {
                    self.read_bytewise(addr, buf, framing)
                }
            }
        }
    }

    fn write_msg(&self, addr: u8, data: &[u8], framing: Framing) -> Result<(), Error> {
        if data.is_empty() && !framing.start {
            if framing.stop {
                critical_section::with(|_| self.regs.modify_cr(|cr| cr - Control::MSMS));
            }
            return Ok(());
        }

        let mut rest = data;
        let mut first = true;
        loop {
            let room = if first && framing.start {
                FIFO_SIZE - 1
            } else {
                FIFO_SIZE
            };
            let (chunk, tail) = rest.split_at(min(room, rest.len()));
            let last_chunk = tail.is_empty();

            // Filling with the lock held keeps a FIFO that drains mid-fill
            // from being taken as completion.
            critical_section::with(|_| {
                self.regs
                    .clear_interrupts(Interrupts::TX_FIFO_EMPTY | Interrupts::BUS_NOT_BUSY);

                if first && framing.start {
                    let cmd = if data.is_empty() && framing.stop {
                        TxCmd::START | TxCmd::STOP
                    } else {
                        TxCmd::START
                    };
                    self.regs.push_tx(address_byte(addr, false), cmd);
                    let mut cr = Control::EN | Control::MSMS | Control::TX;
                    if framing.restart {
                        cr |= Control::RSTA;
                    }
                    self.regs.set_cr(cr);
                }

                let len = chunk.len();
                for (i, &byte) in chunk.iter().enumerate() {
                    let cmd = if framing.stop && last_chunk && i + 1 == len {
                        TxCmd::STOP
                    } else {
                        TxCmd::empty()
                    };
                    self.regs.push_tx(byte, cmd);
                }
            });

            let events = self.wait_interrupt(WRITE_EVENTS)?;
            if let Err(err) = fail_on(events) {
                log_debug!(
                    self.logger,
                    "write interrupted, {} bytes unsent, isr {:#04x}",
                    tail.len(),
                    events.bits()
                );
                return Err(err);
            }

            if last_chunk {
                return Ok(());
            }
            rest = tail;
            first = false;
        }
    }

    fn read_dynamic(&self, addr: u8, buf: &mut [u8], framing: Framing) -> Result<(), Error> {
        let len = u8::try_from(buf.len()).map_err(|_| Error::InvalidArgument)?;
        let total = buf.len();

        critical_section::with(|_| {
            self.regs.set_rx_threshold(rx_threshold(total));
            self.regs.push_tx(address_byte(addr, true), TxCmd::START);
            let cmd = if framing.stop {
                TxCmd::STOP
            } else {
                TxCmd::empty()
            };
            self.regs.push_tx(len, cmd);
        });

        let mut received = 0;
        for chunk in buf.chunks_mut(FIFO_SIZE) {
            let events = self.wait_interrupt(READ_EVENTS)?;
            if let Err(err) = fail_on(events) {
                log_debug!(
                    self.logger,
                    "read interrupted after {} of {} bytes",
                    received,
                    total
                );
                return Err(err);
            }

            for slot in chunk.iter_mut() {
                *slot = self.regs.pop_rx();
            }
            received += chunk.len();

            let remaining = total - received;
            if remaining > 0 {
                self.regs.set_rx_threshold(rx_threshold(remaining));
            }
        }
        Ok(())
    }

    fn read_bytewise(&self, addr: u8, buf: &mut [u8], framing: Framing) -> Result<(), Error> {
        let total = buf.len();

        critical_section::with(|_| {
            self.regs.set_rx_threshold(0);
            if framing.start {
                self.regs.push_tx(address_byte(addr, true), TxCmd::empty());
            }
            let mut cr = Control::EN | Control::MSMS;
            if total == 1 && framing.ends_read {
                cr |= Control::TXAK;
            }
            if framing.restart {
                cr |= Control::RSTA;
            }
            self.regs.set_cr(cr);
        });

        for (i, slot) in buf.iter_mut().enumerate() {
            let events = self.wait_interrupt(READ_EVENTS)?;
            if let Err(err) = fail_on(events) {
                log_debug!(self.logger, "read interrupted after {} of {} bytes", i, total);
                return Err(err);
            }

            // NAK and STOP have to be set up before the byte that precedes
            // them is taken out of the FIFO, or the core clocks one more.
            // The interrupt handler also writes CR (MSMS on arbitration loss).
            let remaining = total - i;
            if remaining == 2 && framing.ends_read {
                critical_section::with(|_| self.regs.modify_cr(|cr| cr | Control::TXAK));
            } else if remaining == 1 && framing.stop {
                critical_section::with(|_| self.regs.modify_cr(|cr| cr - Control::MSMS));
            }
            *slot = self.regs.pop_rx();
        }
        Ok(())
    }
}

/// `RX_FIFO_PIRQ` value for `remaining` bytes still to come.
fn rx_threshold(remaining: usize) -> u32 {
    // Bounded by FIFO_SIZE, so the cast is lossless.
    (min(remaining, FIFO_SIZE) as u32).saturating_sub(1)
}
