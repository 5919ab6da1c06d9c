// Copyright 2018-2021 System76 <info@system76.com>
//
// SPDX-License-Identifier: GPL-3.0-only

use crate::{
    graphics::ClientRole,
    mux::Gmux,
    port::{GMUX_PORT_SWITCH_DDC, GMUX_PORT_SWITCH_DISPLAY, GMUX_PORT_SWITCH_EXTERNAL},
};
use std::{io, sync::PoisonError};

impl Gmux {
    /// Routes DDC, the internal panel, and external outputs to `target`.
    ///
    /// Nothing is awaited: the panel stays dark if `target` is not powered.
    pub fn route(&self, target: ClientRole) -> io::Result<()> {
        let (ddc, display, external) = match target {
            ClientRole::Integrated => (1, 2, 2),
            ClientRole::Discrete => (2, 3, 3),
        };

        self.port.write8(GMUX_PORT_SWITCH_DDC, ddc)?;
        self.port.write8(GMUX_PORT_SWITCH_DISPLAY, display)?;
        self.port.write8(GMUX_PORT_SWITCH_EXTERNAL, external)?;
        log::info!("switched displays to {}", target);
        Ok(())
    }

    pub fn switch_ddc(&self, target: ClientRole) -> io::Result<()> {
        log::info!("switch ddc to {}", target);
        self.port.write8(GMUX_PORT_SWITCH_DDC, match target {
            ClientRole::Integrated => 1,
            ClientRole::Discrete => 2,
        })
    }

    pub fn current_route(&self) -> io::Result<Option<ClientRole>> {
        Ok(match self.port.read8(GMUX_PORT_SWITCH_DISPLAY)? {
            2 => Some(ClientRole::Integrated),
            3 => Some(ClientRole::Discrete),
            _ => None,
        })
    }

    /// Remembers which client drives the panel so `resume` can restore it.
    pub fn suspend(&self) -> io::Result<()> {
        let client = if self.port.read8(GMUX_PORT_SWITCH_DISPLAY)? == 2 {
            ClientRole::Integrated
        } else {
            ClientRole::Discrete
        };

        log::info!("suspending with displays on {}", client);
        *self.resume_client.lock().unwrap_or_else(PoisonError::into_inner) = Some(client);
        Ok(())
    }

    pub fn resume(&self) -> io::Result<()> {
        let client = *self.resume_client.lock().unwrap_or_else(PoisonError::into_inner);
        match client {
            Some(client) => self.route(client),
            None => {
                log::debug!("resume without a recorded route");
                Ok(())
            }
        }
    }
}
