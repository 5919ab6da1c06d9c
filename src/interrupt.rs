// Copyright 2018-2021 System76 <info@system76.com>
//
// SPDX-License-Identifier: GPL-3.0-only

//! Handling of gmux notifications.
//!
//! Each notification walks the interrupt line through the same sequence:
//! disable, read status, re-arm, re-enable, dispatch. Every step consumes the
//! previous one, so the sequence cannot be reordered or cut short.

use crate::{
    completion::Completion,
    errors::BridgeFault,
    mux::Gmux,
    port::{
        InterruptStatus, PortIo, GMUX_INTERRUPT_DISABLE, GMUX_INTERRUPT_ENABLE,
        GMUX_PORT_INTERRUPT_ENABLE, GMUX_PORT_INTERRUPT_STATUS,
    },
};
use std::io;

pub struct Idle<'a> {
    port: &'a dyn PortIo,
}

pub struct Disabled<'a> {
    port: &'a dyn PortIo,
}

pub struct StatusRead<'a> {
    port:   &'a dyn PortIo,
    status: InterruptStatus,
}

pub struct Rearmed<'a> {
    port:   &'a dyn PortIo,
    status: InterruptStatus,
    fault:  Option<BridgeFault>,
}

pub struct Enabled {
    status: InterruptStatus,
}

#[derive(Debug)]
pub struct Dispatched {
    pub status:          InterruptStatus,
    pub power_completed: bool,
}

impl<'a> Idle<'a> {
    pub fn new(port: &'a dyn PortIo) -> Self { Self { port } }

    pub fn disable(self) -> io::Result<Disabled<'a>> {
        self.port.write8(GMUX_PORT_INTERRUPT_ENABLE, GMUX_INTERRUPT_DISABLE)?;
        Ok(Disabled { port: self.port })
    }
}

impl<'a> Disabled<'a> {
    pub fn read_status(self) -> io::Result<StatusRead<'a>> {
        let status = InterruptStatus::from_bits_retain(self.port.read8(GMUX_PORT_INTERRUPT_STATUS)?);
        log::debug!("gmux: notification with status {:#04x}", status.bits());
        Ok(StatusRead { port: self.port, status })
    }
}

impl<'a> StatusRead<'a> {
    pub fn status(&self) -> InterruptStatus { self.status }

    /// Writes the status back to acknowledge it. A status of zero afterwards
    /// means the interrupt is armed again.
    pub fn rearm(self) -> io::Result<Rearmed<'a>> {
        let old = self.status.bits();
        self.port.write8(GMUX_PORT_INTERRUPT_STATUS, old)?;
        let new = self.port.read8(GMUX_PORT_INTERRUPT_STATUS)?;

        let fault = if new != 0 { Some(BridgeFault::RearmFailed { old, new }) } else { None };

        Ok(Rearmed { port: self.port, status: self.status, fault })
    }
}

impl<'a> Rearmed<'a> {
    pub fn fault(&self) -> Option<&BridgeFault> { self.fault.as_ref() }

    /// Re-enables interrupts, even if re-arming failed.
    pub fn enable(self) -> io::Result<Enabled> {
        if let Some(fault) = self.fault.as_ref() {
            log::error!("gmux: {}", fault);
        }

        self.port.write8(GMUX_PORT_INTERRUPT_ENABLE, GMUX_INTERRUPT_ENABLE)?;
        Ok(Enabled { status: self.status })
    }
}

impl Enabled {
    pub fn dispatch(self, completion: &Completion) -> Dispatched {
        let mut power_completed = false;
        if self.status.contains(InterruptStatus::POWER) {
            power_completed = completion.complete();
            if !power_completed {
                log::debug!("gmux: power change with no request waiting");
            }
        }

        if self.status.intersects(InterruptStatus::DISPLAY | InterruptStatus::HOTPLUG) {
            log::info!("gmux: display event, status {:#04x}", self.status.bits());
        }

        Dispatched { status: self.status, power_completed }
    }
}

impl Gmux {
    /// Services one notification from the gmux.
    pub fn notify(&self) -> io::Result<Dispatched> {
        let dispatched = Idle::new(self.port.as_ref())
            .disable()?
            .read_status()?
            .rearm()?
            .enable()?
            .dispatch(self.sequencer.completion());

        Ok(dispatched)
    }

    pub fn enable_interrupts(&self) -> io::Result<()> {
        self.port.write8(GMUX_PORT_INTERRUPT_ENABLE, GMUX_INTERRUPT_ENABLE)
    }

    pub fn disable_interrupts(&self) -> io::Result<()> {
        self.port.write8(GMUX_PORT_INTERRUPT_ENABLE, GMUX_INTERRUPT_DISABLE)
    }

    pub fn interrupt_status(&self) -> io::Result<InterruptStatus> {
        Ok(InterruptStatus::from_bits_retain(self.port.read8(GMUX_PORT_INTERRUPT_STATUS)?))
    }
}
