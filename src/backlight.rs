// Copyright 2018-2021 System76 <info@system76.com>
//
// SPDX-License-Identifier: GPL-3.0-only

use crate::{
    mux::{Gmux, GMUX_BRIGHTNESS_MASK},
    port::GMUX_PORT_BRIGHTNESS,
};
use std::io;

impl Gmux {
    pub fn brightness(&self) -> io::Result<u32> {
        Ok(self.port.read32(GMUX_PORT_BRIGHTNESS)? & GMUX_BRIGHTNESS_MASK)
    }

    pub fn set_brightness(&self, level: u32) -> io::Result<()> {
        let level = if level > self.max_brightness() {
            log::warn!("brightness {} exceeds maximum of {}", level, self.max_brightness());
            self.max_brightness()
        } else {
            level
        };

        // Older gmux versions require writing out the lower bytes first, then
        // setting the upper byte to 0 to flush the values. Newer versions also
        // accept this sequence.
        self.port.write8(GMUX_PORT_BRIGHTNESS, level as u8)?;
        self.port.write8(GMUX_PORT_BRIGHTNESS + 1, (level >> 8) as u8)?;
        self.port.write8(GMUX_PORT_BRIGHTNESS + 2, (level >> 16) as u8)?;
        self.port.write8(GMUX_PORT_BRIGHTNESS + 3, 0)
    }
}
