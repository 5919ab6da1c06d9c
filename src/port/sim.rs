// Copyright 2018-2021 System76 <info@system76.com>
//
// SPDX-License-Identifier: GPL-3.0-only

//! Simulated gmux register file.

use super::*;
use std::sync::{
    mpsc::{channel, Receiver, Sender},
    Mutex,
};

struct Registers {
    regs:   [u8; 0x100],
    writes: Vec<(u16, u8)>,
    sticky: u8,
}

pub struct SimPort {
    window:       IoWindow,
    state:        Mutex<Registers>,
    power_events: Mutex<Option<Sender<u8>>>,
}

impl SimPort {
    pub fn new() -> Self {
        let port = Self {
            window:       IoWindow::new(0x700, 0xFF),
            state:        Mutex::new(Registers { regs: [0; 0x100], writes: Vec::new(), sticky: 0 }),
            power_events: Mutex::new(None),
        };

        port.set_version(1, 9, 23);
        port.set_reg32(GMUX_PORT_MAX_BRIGHTNESS, 0x1_AF40);
        port
    }

    pub fn with_window_len(mut self, len: u16) -> Self {
        self.window.len = len;
        self
    }

    pub fn set_version(&self, major: u8, minor: u8, release: u8) {
        self.set_reg(GMUX_PORT_VERSION_MAJOR, major);
        self.set_reg(GMUX_PORT_VERSION_MINOR, minor);
        self.set_reg(GMUX_PORT_VERSION_RELEASE, release);
    }

    pub fn set_reg(&self, offset: u16, value: u8) {
        self.state.lock().unwrap().regs[usize::from(offset)] = value;
    }

    pub fn set_reg32(&self, offset: u16, value: u32) {
        let mut state = self.state.lock().unwrap();
        let start = usize::from(offset);
        state.regs[start..start + 4].copy_from_slice(&value.to_le_bytes());
    }

    pub fn reg(&self, offset: u16) -> u8 { self.state.lock().unwrap().regs[usize::from(offset)] }

    /// Status bits which survive being written back.
    pub fn set_sticky_status(&self, bits: u8) { self.state.lock().unwrap().sticky = bits; }

    pub fn writes(&self) -> Vec<(u16, u8)> { self.state.lock().unwrap().writes.clone() }

    pub fn writes_to(&self, offset: u16) -> Vec<u8> {
        self.writes().into_iter().filter(|&(o, _)| o == offset).map(|(_, v)| v).collect()
    }

    pub fn clear_writes(&self) { self.state.lock().unwrap().writes.clear(); }

    /// Receives the final value of every discrete power sequence.
    pub fn power_events(&self) -> Receiver<u8> {
        let (tx, rx) = channel();
        *self.power_events.lock().unwrap() = Some(tx);
        rx
    }
}

impl PortIo for SimPort {
    fn window(&self) -> IoWindow { self.window }

    fn read8(&self, offset: u16) -> io::Result<u8> {
        self.window.address(offset, 1)?;
        Ok(self.reg(offset))
    }

    fn write8(&self, offset: u16, value: u8) -> io::Result<()> {
        self.window.address(offset, 1)?;

        let mut state = self.state.lock().unwrap();
        state.writes.push((offset, value));

        let index = usize::from(offset);
        match offset {
            GMUX_PORT_INTERRUPT_STATUS => {
                let sticky = state.sticky;
                state.regs[index] = (state.regs[index] & !value) | sticky;
            }
            GMUX_PORT_DISCRETE_POWER => {
                state.regs[index] = value;
                if value == 0 || value == 3 {
                    state.regs[usize::from(GMUX_PORT_INTERRUPT_STATUS)] |=
                        InterruptStatus::POWER.bits();
                    drop(state);
                    if let Some(tx) = self.power_events.lock().unwrap().as_ref() {
                        let _ = tx.send(value);
                    }
                }
            }
            _ => state.regs[index] = value,
        }

        Ok(())
    }

    fn read32(&self, offset: u16) -> io::Result<u32> {
        self.window.address(offset, 4)?;
        let state = self.state.lock().unwrap();
        let start = usize::from(offset);
        let mut data = [0; 4];
        data.copy_from_slice(&state.regs[start..start + 4]);
        Ok(u32::from_le_bytes(data))
    }
}
