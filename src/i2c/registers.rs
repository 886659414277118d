// Licensed under the Apache-2.0 license

//! Register map of the AXI IIC core.
//!
//! Everything that touches memory-mapped I/O is confined to
//! [`MmioRegisters`]. The engine above works against the [`RegisterBlock`]
//! trait through the typed [`AxiIicRegs`] wrapper, so it can be driven by a
//! simulated core in tests.

use bitflags::bitflags;

/// Depth of both the TX and the RX FIFO.
pub const FIFO_SIZE: usize = 16;

/// Value written to `SOFTR` to reset the core.
pub const SOFTR_KEY: u32 = 0xA;

/// Global interrupt enable bit of `GIE`.
pub const GIE_ENABLE: u32 = 1 << 31;

/// Data bits of an `RX_FIFO` read.
pub const RX_FIFO_DATA_MASK: u32 = 0xFF;

/// Width mask of the occupancy and threshold registers.
pub const FIFO_LEVEL_MASK: u32 = 0x0F;

/// Register offsets from the core's base address.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(usize)]
pub enum Reg {
    Gie = 0x01C,
    Isr = 0x020,
    Ier = 0x028,
    Softr = 0x040,
    Cr = 0x100,
    Sr = 0x104,
    TxFifo = 0x108,
    RxFifo = 0x10C,
    Adr = 0x110,
    TxFifoOcy = 0x114,
    RxFifoOcy = 0x118,
    TenAdr = 0x11C,
    RxFifoPirq = 0x120,
    Gpo = 0x124,
}

impl Reg {
    #[must_use]
    pub const fn offset(self) -> usize {
        self as usize
    }
}

bitflags! {
    /// Interrupt causes, shared by `ISR` and `IER`.
    #[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
    pub struct Interrupts: u32 {
        const ARB_LOST = 1 << 0;
        /// Controller: the addressed device NAKed. Target: transmit complete.
        const TX_ERR_TARGET_COMP = 1 << 1;
        const TX_FIFO_EMPTY = 1 << 2;
        /// Fires when RX occupancy equals `RX_FIFO_PIRQ + 1`.
        const RX_FIFO_FULL = 1 << 3;
        const BUS_NOT_BUSY = 1 << 4;
        const ADDR_TARGET = 1 << 5;
        const NOT_ADDR_TARGET = 1 << 6;
        const TX_HALF_EMPTY = 1 << 7;
    }
}

impl Interrupts {
    /// Causes the target engine may consume.
    pub const TARGET: Self = Self::ADDR_TARGET
        .union(Self::NOT_ADDR_TARGET)
        .union(Self::RX_FIFO_FULL)
        .union(Self::TX_FIFO_EMPTY)
        .union(Self::TX_ERR_TARGET_COMP);
}

bitflags! {
    /// `CR` control register.
    #[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
    pub struct Control: u32 {
        const EN = 1 << 0;
        const TX_FIFO_RST = 1 << 1;
        /// Controller (1) or target (0) mode; clearing it while controller
        /// generates a STOP.
        const MSMS = 1 << 2;
        /// Transmit (1) or receive (0).
        const TX = 1 << 3;
        /// NAK the next received byte.
        const TXAK = 1 << 4;
        const RSTA = 1 << 5;
        const GC_EN = 1 << 6;
    }
}

bitflags! {
    /// `SR` status register.
    #[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
    pub struct Status: u32 {
        const ABGC = 1 << 0;
        const AAS = 1 << 1;
        const BB = 1 << 2;
        /// Set when the remote controller is reading from us.
        const SRW = 1 << 3;
        const TX_FIFO_FULL = 1 << 4;
        const RX_FIFO_FULL = 1 << 5;
        const RX_FIFO_EMPTY = 1 << 6;
        const TX_FIFO_EMPTY = 1 << 7;
    }
}

bitflags! {
    /// Command bits carried alongside a data byte in `TX_FIFO`.
    #[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
    pub struct TxCmd: u32 {
        const START = 1 << 8;
        const STOP = 1 << 9;
    }
}

/// Raw 32-bit access to the register file.
pub trait RegisterBlock {
    fn read(&self, reg: Reg) -> u32;
    fn write(&self, reg: Reg, value: u32);
}

impl<R: RegisterBlock + ?Sized> RegisterBlock for &R {
    fn read(&self, reg: Reg) -> u32 {
        (**self).read(reg)
    }

    fn write(&self, reg: Reg, value: u32) {
        (**self).write(reg, value);
    }
}

/// Volatile accessor for a core mapped at a fixed physical address.
#[derive(Debug)]
pub struct MmioRegisters {
    base: usize,
}

impl MmioRegisters {
    /// # Safety
    ///
    /// `base` must be the address of an AXI IIC register file that stays
    /// mapped for the lifetime of the returned value, and no other code may
    /// drive the same core.
    #[must_use]
    pub const unsafe fn new(base: usize) -> Self {
        Self { base }
    }

    #[must_use]
    pub const fn base(&self) -> usize {
        self.base
    }

    fn ptr(&self, reg: Reg) -> *mut u32 {
        (self.base + reg.offset()) as *mut u32
    }
}

impl RegisterBlock for MmioRegisters {
    fn read(&self, reg: Reg) -> u32 {
        // SAFETY: `new` guarantees a mapped, exclusively owned register file;
        // every `Reg` offset lies within it and is 4-byte aligned.
        unsafe { core::ptr::read_volatile(self.ptr(reg)) }
    }

    fn write(&self, reg: Reg, value: u32) {
        // SAFETY: see `read`.
        unsafe { core::ptr::write_volatile(self.ptr(reg), value) }
    }
}

macro_rules! flag_register {
    ($name:ident, $reg:ident, $ty:ty) => {
        paste::paste! {
            #[inline]
            pub fn $name(&self) -> $ty {
                <$ty>::from_bits_retain(self.raw.read(Reg::$reg))
            }

            #[inline]
            pub fn [<set_ $name>](&self, value: $ty) {
                self.raw.write(Reg::$reg, value.bits());
            }

            #[inline]
            pub fn [<modify_ $name>](&self, f: impl FnOnce($ty) -> $ty) {
                let value = self.$name();
                self.[<set_ $name>](f(value));
            }
        }
    };
}

/// Typed view over a [`RegisterBlock`].
pub struct AxiIicRegs<R> {
    raw: R,
}

impl<R: RegisterBlock> AxiIicRegs<R> {
    pub const fn new(raw: R) -> Self {
        Self { raw }
    }

    pub fn raw(&self) -> &R {
        &self.raw
    }

    flag_register!(isr, Isr, Interrupts);
    flag_register!(ier, Ier, Interrupts);
    flag_register!(cr, Cr, Control);

    pub fn sr(&self) -> Status {
        Status::from_bits_retain(self.raw.read(Reg::Sr))
    }

    pub fn set_global_interrupts(&self, enabled: bool) {
        self.raw
            .write(Reg::Gie, if enabled { GIE_ENABLE } else { 0 });
    }

    pub fn soft_reset(&self) {
        self.raw.write(Reg::Softr, SOFTR_KEY);
    }

    /// Acknowledges `mask`, touching only bits that are currently pending.
    ///
    /// `ISR` toggles on write: writing 1 over a clear bit would raise it.
    pub fn clear_interrupts(&self, mask: Interrupts) {
        let pending = self.isr();
        self.set_isr(pending & mask);
    }

    pub fn push_tx(&self, byte: u8, cmd: TxCmd) {
        self.raw.write(Reg::TxFifo, u32::from(byte) | cmd.bits());
    }

    pub fn pop_rx(&self) -> u8 {
        // Masked to the data byte, so the narrowing cannot lose data.
        (self.raw.read(Reg::RxFifo) & RX_FIFO_DATA_MASK) as u8
    }

    pub fn set_rx_threshold(&self, level: u32) {
        self.raw.write(Reg::RxFifoPirq, level & FIFO_LEVEL_MASK);
    }

    pub fn tx_occupancy(&self) -> u32 {
        self.raw.read(Reg::TxFifoOcy) & FIFO_LEVEL_MASK
    }

    pub fn rx_occupancy(&self) -> u32 {
        self.raw.read(Reg::RxFifoOcy) & FIFO_LEVEL_MASK
    }

    /// Programs the 7-bit target address (stored left-aligned).
    pub fn set_target_address(&self, address: u8) {
        self.raw.write(Reg::Adr, u32::from(address) << 1);
    }
}
