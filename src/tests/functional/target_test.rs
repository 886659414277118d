// Licensed under the Apache-2.0 license

use std::sync::{Arc, Mutex};

use crate::i2c::registers::{Control, Interrupts, Reg};
use crate::i2c::{AxiI2cConfigBuilder, Error, I2cBus, I2cMsg, TargetConfig, TargetFlags};
use crate::tests::sim::Sim;
use crate::tests::{setup, Recorder, TargetEvent, TestI2c};

const TARGET_ADDR: u16 = 0x42;

fn registered(recorder: Recorder) -> (&'static Sim, &'static TestI2c, Arc<Mutex<Vec<TargetEvent>>>) {
    let (sim, i2c) = setup(AxiI2cConfigBuilder::new());
    let events = recorder.events.clone();
    if i2c
        .register_target(TargetConfig::new(TARGET_ADDR, recorder))
        .is_err()
    {
        panic!("registration refused");
    }
    sim.clear_log();
    (sim, i2c, events)
}

fn events(log: &Arc<Mutex<Vec<TargetEvent>>>) -> Vec<TargetEvent> {
    log.lock().unwrap().clone()
}

fn ier(sim: &Sim) -> Interrupts {
    Interrupts::from_bits_retain(sim.peek(Reg::Ier))
}

#[test]
fn registration_programs_address_and_match_interrupt() {
    let (sim, i2c) = setup(AxiI2cConfigBuilder::new());

    assert!(i2c
        .register_target(TargetConfig::new(TARGET_ADDR, Recorder::default()))
        .is_ok());

    assert_eq!(sim.peek(Reg::Adr), 0x84);
    assert_eq!(sim.peek(Reg::RxFifoPirq), 0);
    assert_eq!(ier(sim), Interrupts::ADDR_TARGET);
    assert_eq!(i2c.target_address(), Some(TARGET_ADDR));
}

#[test]
fn remote_read_runs_one_request_and_one_follow_up() {
    let (sim, _i2c, log) = registered(Recorder::replying(&[0xA1, 0xA2]));

    sim.remote_address(true);
    let first = sim.remote_read(false);
    let second = sim.remote_read(true);

    assert_eq!((first, second), (0xA1, 0xA2));
    assert_eq!(
        events(&log),
        vec![TargetEvent::ReadRequested, TargetEvent::ReadProcessed]
    );
    assert!(!ier(sim).contains(Interrupts::TX_FIFO_EMPTY));

    sim.remote_stop();

    assert_eq!(
        events(&log),
        vec![
            TargetEvent::ReadRequested,
            TargetEvent::ReadProcessed,
            TargetEvent::Stop,
        ]
    );
    assert_eq!(ier(sim), Interrupts::ADDR_TARGET);
}

#[test]
fn rejected_read_pads_with_ff_without_calling_back() {
    let (sim, _i2c, log) = registered(Recorder::replying(&[0x5A]));

    sim.remote_address(true);
    let bytes = [
        sim.remote_read(false),
        sim.remote_read(false),
        sim.remote_read(true),
    ];
    sim.remote_stop();

    assert_eq!(bytes, [0x5A, 0xFF, 0xFF]);
    assert_eq!(
        events(&log),
        vec![
            TargetEvent::ReadRequested,
            TargetEvent::ReadProcessed,
            TargetEvent::Stop,
        ]
    );
}

#[test]
fn stop_discards_the_unread_look_ahead_byte() {
    let (sim, _i2c, _log) = registered(Recorder::replying(&[1, 2, 3]));

    sim.remote_address(true);
    sim.remote_read(false);
    assert_eq!(sim.tx_fifo(), vec![0x02]);

    sim.remote_stop();

    assert!(sim.tx_fifo().is_empty());
}

#[test]
fn remote_write_delivers_each_byte() {
    let (sim, _i2c, log) = registered(Recorder::default());

    sim.remote_address(false);
    assert!(sim.remote_write(0x10));
    assert!(sim.remote_write(0x20));
    sim.remote_stop();

    assert_eq!(
        events(&log),
        vec![
            TargetEvent::WriteRequested,
            TargetEvent::WriteReceived(0x10),
            TargetEvent::WriteReceived(0x20),
            TargetEvent::Stop,
        ]
    );
    assert_eq!(ier(sim), Interrupts::ADDR_TARGET);
}

#[test]
fn rejected_byte_naks_the_rest_until_stop() {
    let recorder = Recorder {
        reject_byte: Some(0x20),
        ..Recorder::default()
    };
    let (sim, _i2c, _log) = registered(recorder);

    sim.remote_address(false);
    assert!(sim.remote_write(0x10));
    assert!(sim.remote_write(0x20));
    assert!(!sim.remote_write(0x30));
    sim.remote_stop();

    assert_eq!(sim.peek(Reg::Cr) & Control::TXAK.bits(), 0);
    sim.remote_address(false);
    assert!(sim.remote_write(0x40));
}

#[test]
fn rejected_write_request_naks_the_first_byte() {
    let recorder = Recorder {
        reject_write_request: true,
        ..Recorder::default()
    };
    let (sim, _i2c, _log) = registered(recorder);

    sim.remote_address(false);

    assert!(!sim.remote_write(0x10));
}

#[test]
fn second_registration_is_refused_untouched() {
    let (sim, i2c, log) = registered(Recorder::replying(&[0x77]));

    let refused = i2c.register_target(TargetConfig::new(0x43, Recorder::default()));

    match refused {
        Err((Error::Busy, config)) => assert_eq!(config.address, 0x43),
        other => panic!("unexpected {:?}", other.map_err(|(err, _)| err)),
    }
    assert_eq!(i2c.target_address(), Some(TARGET_ADDR));
    assert!(sim.log().is_empty());

    sim.remote_address(true);
    assert_eq!(sim.remote_read(true), 0x77);
    assert_eq!(events(&log), vec![TargetEvent::ReadRequested]);
}

#[test]
fn unsupported_registrations() {
    let (_sim, i2c) = setup(AxiI2cConfigBuilder::new());

    let mut ten_bit = TargetConfig::new(0x142, Recorder::default());
    ten_bit.flags = TargetFlags::ADDR_10_BITS;
    assert!(matches!(
        i2c.register_target(ten_bit),
        Err((Error::NotSupported, _))
    ));
    assert!(matches!(
        i2c.register_target(TargetConfig::new(0x80, Recorder::default())),
        Err((Error::InvalidArgument, _))
    ));
    assert_eq!(i2c.target_address(), None);
}

#[test]
fn unregister_waits_for_the_remote_to_finish() {
    let (sim, i2c, log) = registered(Recorder::default());

    sim.remote_address(false);
    assert!(matches!(i2c.unregister_target(), Err(Error::Busy)));
    assert_eq!(i2c.target_address(), Some(TARGET_ADDR));

    sim.remote_stop();
    let config = match i2c.unregister_target() {
        Ok(config) => config,
        Err(err) => panic!("unregister failed: {err}"),
    };

    assert_eq!(config.address, TARGET_ADDR);
    assert_eq!(
        events(&log),
        vec![TargetEvent::WriteRequested, TargetEvent::Stop]
    );
    assert_eq!(sim.peek(Reg::Adr), 0);
    assert!(!ier(sim).intersects(Interrupts::TARGET));
    assert_eq!(i2c.target_address(), None);
    assert!(matches!(
        i2c.unregister_target(),
        Err(Error::InvalidArgument)
    ));
}

#[test]
fn controller_transfer_keeps_target_mode_armed() {
    let (sim, i2c, log) = registered(Recorder::replying(&[0x33]));

    i2c.transfer(&mut [I2cMsg::write(&[0x01]).with_stop()], 0x50)
        .unwrap();

    assert_eq!(sim.peek(Reg::Adr), 0x84);
    assert!(ier(sim).contains(Interrupts::ADDR_TARGET));

    sim.remote_address(true);
    assert_eq!(sim.remote_read(true), 0x33);
    assert_eq!(events(&log), vec![TargetEvent::ReadRequested]);
}

#[test]
fn reset_ends_an_interrupted_target_transfer() {
    let (sim, i2c, log) = registered(Recorder::replying(&[0x01]));

    sim.remote_address(true);
    i2c.transfer(&mut [], 0x50).unwrap();

    assert_eq!(
        events(&log),
        vec![TargetEvent::ReadRequested, TargetEvent::Stop]
    );
    assert_eq!(ier(sim), Interrupts::ADDR_TARGET);
    assert!(i2c.unregister_target().is_ok());
}
