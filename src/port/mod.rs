// Copyright 2018-2021 System76 <info@system76.com>
//
// SPDX-License-Identifier: GPL-3.0-only

//! Register access to the gmux I/O port window.

mod dev;
#[cfg(test)]
pub(crate) mod sim;

pub use self::dev::DevPort;

use bitflags::bitflags;
use std::io;

pub const GMUX_PORT_VERSION_MAJOR: u16 = 0x04;
pub const GMUX_PORT_VERSION_MINOR: u16 = 0x05;
pub const GMUX_PORT_VERSION_RELEASE: u16 = 0x06;
pub const GMUX_PORT_SWITCH_DISPLAY: u16 = 0x10;
pub const GMUX_PORT_SWITCH_GET_DISPLAY: u16 = 0x11;
pub const GMUX_PORT_INTERRUPT_ENABLE: u16 = 0x14;
pub const GMUX_PORT_INTERRUPT_STATUS: u16 = 0x16;
pub const GMUX_PORT_SWITCH_DDC: u16 = 0x28;
pub const GMUX_PORT_SWITCH_EXTERNAL: u16 = 0x40;
pub const GMUX_PORT_SWITCH_GET_EXTERNAL: u16 = 0x41;
pub const GMUX_PORT_DISCRETE_POWER: u16 = 0x50;
pub const GMUX_PORT_MAX_BRIGHTNESS: u16 = 0x70;
pub const GMUX_PORT_BRIGHTNESS: u16 = 0x74;

pub const GMUX_MIN_IO_LEN: u16 = GMUX_PORT_BRIGHTNESS + 4;

pub const GMUX_INTERRUPT_ENABLE: u8 = 0xFF;
pub const GMUX_INTERRUPT_DISABLE: u8 = 0x00;

bitflags! {
    /// Pending interrupt sources, as reported by the interrupt status register.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct InterruptStatus: u8 {
        const DISPLAY = 1 << 0;
        const POWER = 1 << 2;
        const HOTPLUG = 1 << 3;

        const _ = !0;
    }
}

/// A base-relative range of I/O ports owned by the gmux.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct IoWindow {
    pub base: u16,
    pub len:  u16,
}

impl IoWindow {
    pub fn new(base: u16, len: u16) -> Self { Self { base, len } }

    /// Absolute port address of an access of `width` bytes at `offset`.
    pub fn address(&self, offset: u16, width: u16) -> io::Result<u64> {
        if u32::from(offset) + u32::from(width) > u32::from(self.len) {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!(
                    "gmux port {:#x} (width {}) outside of I/O window {:#x}+{:#x}",
                    offset, width, self.base, self.len
                ),
            ));
        }

        Ok(u64::from(self.base) + u64::from(offset))
    }
}

/// Width-correct access to the registers behind an [`IoWindow`].
pub trait PortIo: Send + Sync {
    fn window(&self) -> IoWindow;

    fn read8(&self, offset: u16) -> io::Result<u8>;

    fn write8(&self, offset: u16, value: u8) -> io::Result<()>;

    /// Little-endian read of four consecutive ports.
    fn read32(&self, offset: u16) -> io::Result<u32>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_bounds() {
        let window = IoWindow::new(0x700, GMUX_MIN_IO_LEN);

        assert_eq!(window.address(GMUX_PORT_VERSION_MAJOR, 1).unwrap(), 0x704);
        assert_eq!(window.address(GMUX_PORT_BRIGHTNESS, 4).unwrap(), 0x774);
        assert_eq!(
            window.address(GMUX_PORT_BRIGHTNESS + 1, 4).unwrap_err().kind(),
            io::ErrorKind::InvalidInput
        );
        assert!(IoWindow::new(0x700, 0).address(0, 1).is_err());
    }

    #[test]
    fn interrupt_status_bits() {
        let status = InterruptStatus::from_bits_retain(0x05);
        assert!(status.contains(InterruptStatus::DISPLAY));
        assert!(status.contains(InterruptStatus::POWER));
        assert!(!status.contains(InterruptStatus::HOTPLUG));

        assert_eq!(InterruptStatus::from_bits_retain(0x80).bits(), 0x80);
    }
}
