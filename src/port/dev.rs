// Copyright 2018-2021 System76 <info@system76.com>
//
// SPDX-License-Identifier: GPL-3.0-only

use super::{IoWindow, PortIo};
use crate::errors::ResourceError;
use std::{
    fs::{File, OpenOptions},
    io,
    os::unix::fs::FileExt,
    path::Path,
};

/// Port I/O through the kernel's `/dev/port` character device.
pub struct DevPort {
    file:   File,
    window: IoWindow,
}

impl DevPort {
    pub fn open(path: &Path, window: IoWindow) -> Result<Self, ResourceError> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(path)
            .map_err(|why| ResourceError::Open(path.display().to_string(), why))?;

        Ok(Self { file, window })
    }
}

impl PortIo for DevPort {
    fn window(&self) -> IoWindow { self.window }

    fn read8(&self, offset: u16) -> io::Result<u8> {
        let mut data = [0; 1];
        self.file.read_exact_at(&mut data, self.window.address(offset, 1)?)?;
        Ok(data[0])
    }

    fn write8(&self, offset: u16, value: u8) -> io::Result<()> {
        self.file.write_all_at(&[value], self.window.address(offset, 1)?)
    }

    fn read32(&self, offset: u16) -> io::Result<u32> {
        let mut data = [0; 4];
        self.file.read_exact_at(&mut data, self.window.address(offset, 4)?)?;
        Ok(u32::from_le_bytes(data))
    }
}
