// Copyright 2018-2021 System76 <info@system76.com>
//
// SPDX-License-Identifier: GPL-3.0-only

//! Platform firmware power-resource calls which bracket discrete GPU power changes.
//!
//! Methods are evaluated through the `acpi_call` kernel module:
//!
//! - https://github.com/nix-community/acpi_call

use crate::errors::PlatformCallError;
use std::{fs, path::PathBuf};

const ACPI_CALL: &str = "/proc/acpi/call";

pub const DEFAULT_POWER_METHOD: &str = "\\_SB_.PCI0.P0P2.GFX0.PWRD";

/// Argument passed to the power resource before powering the discrete GPU up.
pub const POWER_RESOURCE_ON: u8 = 0;
/// Argument passed to the power resource after powering the discrete GPU down.
pub const POWER_RESOURCE_OFF: u8 = 1;

pub trait PlatformPower: Send + Sync {
    fn power_resource(&self, arg: u8) -> Result<(), PlatformCallError>;
}

pub struct AcpiCall {
    method: String,
    call:   PathBuf,
}

impl AcpiCall {
    pub fn new(method: String) -> Self { Self { method, call: PathBuf::from(ACPI_CALL) } }
}

impl PlatformPower for AcpiCall {
    fn power_resource(&self, arg: u8) -> Result<(), PlatformCallError> {
        if !self.call.exists() {
            return Err(PlatformCallError::Open(
                ACPI_CALL,
                std::io::Error::new(std::io::ErrorKind::NotFound, "acpi_call module not loaded"),
            ));
        }

        fs::write(&self.call, format!("{} {}", self.method, arg))
            .map_err(|why| PlatformCallError::Invoke(self.method.clone(), why))?;

        let reply = fs::read_to_string(&self.call)
            .map_err(|why| PlatformCallError::Invoke(self.method.clone(), why))?;

        check_reply(&self.method, &reply)?;
        log::info!("{} call successful", self.method);
        Ok(())
    }
}

fn check_reply(method: &str, reply: &str) -> Result<(), PlatformCallError> {
    let reply = reply.trim_end_matches('\0').trim();
    if reply.starts_with("Error") {
        Err(PlatformCallError::Rejected(method.to_owned(), reply.to_owned()))
    } else {
        Ok(())
    }
}
