// Licensed under the Apache-2.0 license

//! Host tests of the driver against a simulated core.

mod functional;

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use critical_section::RawRestoreState;

use crate::common::{Logger, NoOpLogger};
use crate::i2c::{AxiI2c, AxiI2cConfigBuilder, I2cTarget, IrqHandler, TargetReject};
use sim::Sim;

pub type TestI2c<L = NoOpLogger> = AxiI2c<&'static Sim, &'static Sim, Recorder, L>;

thread_local! {
    static INSTALLED: Cell<Option<&'static dyn IrqHandler>> = const { Cell::new(None) };
    static CS_DEPTH: Cell<usize> = const { Cell::new(0) };
    static CS_GUARD: RefCell<Option<MutexGuard<'static, ()>>> = const { RefCell::new(None) };
}

/// Host critical section: one process-wide lock, reentrant per thread. The
/// nesting depth lets the simulated core tell whether the driver holds it.
struct HostCriticalSection;
critical_section::set_impl!(HostCriticalSection);

static CS_LOCK: Mutex<()> = Mutex::new(());

unsafe impl critical_section::Impl for HostCriticalSection {
    unsafe fn acquire() -> RawRestoreState {
        if CS_DEPTH.get() == 0 {
            let guard = CS_LOCK.lock().unwrap_or_else(PoisonError::into_inner);
            CS_GUARD.with(|slot| *slot.borrow_mut() = Some(guard));
        }
        CS_DEPTH.set(CS_DEPTH.get() + 1);
    }

    unsafe fn release(_token: RawRestoreState) {
        let depth = CS_DEPTH.get() - 1;
        CS_DEPTH.set(depth);
        if depth == 0 {
            CS_GUARD.with(|slot| drop(slot.borrow_mut().take()));
        }
    }
}

pub fn in_critical_section() -> bool {
    CS_DEPTH.get() > 0
}

fn install(handler: &'static dyn IrqHandler) {
    INSTALLED.with(|slot| slot.set(Some(handler)));
}

/// Builds a driver over a fresh simulated core, runs `init` and wires the
/// handler it installs to the core's interrupt line.
pub fn setup_with<L>(builder: AxiI2cConfigBuilder, logger: L) -> (&'static Sim, &'static TestI2c<L>)
where
    L: Logger + Sync + 'static,
{
    let sim: &'static Sim = Box::leak(Box::new(Sim::new()));
    let config = builder.irq_config(install).build();
    let i2c: &'static TestI2c<L> = Box::leak(Box::new(AxiI2c::new(sim, sim, config, logger)));

    i2c.init();
    let handler = INSTALLED.with(Cell::take).expect("init installs the interrupt handler");
    sim.attach(handler);
    sim.clear_log();
    (sim, i2c)
}

pub fn setup(builder: AxiI2cConfigBuilder) -> (&'static Sim, &'static TestI2c) {
    setup_with(builder, NoOpLogger)
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TargetEvent {
    ReadRequested,
    ReadProcessed,
    WriteRequested,
    WriteReceived(u8),
    Stop,
}

/// Target callbacks that log every call and serve scripted read data.
#[derive(Default)]
pub struct Recorder {
    pub events: Arc<Mutex<Vec<TargetEvent>>>,
    /// Bytes handed out to remote reads; rejects once empty.
    pub replies: VecDeque<u8>,
    pub reject_write_request: bool,
    pub reject_byte: Option<u8>,
}

impl Recorder {
    pub fn replying(bytes: &[u8]) -> Self {
        Self {
            replies: bytes.iter().copied().collect(),
            ..Self::default()
        }
    }

    fn record(&self, event: TargetEvent) {
        self.events.lock().unwrap().push(event);
    }
}

impl I2cTarget for Recorder {
    fn read_requested(&mut self) -> Result<u8, TargetReject> {
        self.record(TargetEvent::ReadRequested);
        self.replies.pop_front().ok_or(TargetReject)
    }

    fn read_processed(&mut self) -> Result<u8, TargetReject> {
        self.record(TargetEvent::ReadProcessed);
        self.replies.pop_front().ok_or(TargetReject)
    }

    fn write_requested(&mut self) -> Result<(), TargetReject> {
        self.record(TargetEvent::WriteRequested);
        if self.reject_write_request {
            Err(TargetReject)
        } else {
            Ok(())
        }
    }

    fn write_received(&mut self, byte: u8) -> Result<(), TargetReject> {
        self.record(TargetEvent::WriteReceived(byte));
        if self.reject_byte == Some(byte) {
            Err(TargetReject)
        } else {
            Ok(())
        }
    }

    fn stop(&mut self) {
        self.record(TargetEvent::Stop);
    }
}

/// Byte sink shared between a `WriterLogger` and the test reading it back.
#[derive(Clone, Default)]
pub struct SharedSink(pub Arc<Mutex<Vec<u8>>>);

impl SharedSink {
    pub fn text(&self) -> String {
        String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
    }
}

impl embedded_io::ErrorType for SharedSink {
    type Error = core::convert::Infallible;
}

impl embedded_io::Write for SharedSink {
    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}
