// Copyright 2018-2021 System76 <info@system76.com>
//
// SPDX-License-Identifier: GPL-3.0-only

use std::{fmt, io, str::FromStr};
use sysfs_class::{PciDevice, SysClass};

const PCI_VENDOR_ID_INTEL: u16 = 0x8086;
const PCI_VENDOR_ID_NVIDIA: u16 = 0x10DE;

// GeForce 9400M, the integrated chipset graphics of early switchable MacBook Pros.
const PCI_DEVICE_ID_GEFORCE_9400M: u16 = 0x0863;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ClientRole {
    Integrated,
    Discrete,
}

impl ClientRole {
    pub fn classify(vendor: u16, device: u16) -> Self {
        match (vendor, device) {
            (PCI_VENDOR_ID_INTEL, _) => ClientRole::Integrated,
            (PCI_VENDOR_ID_NVIDIA, PCI_DEVICE_ID_GEFORCE_9400M) => ClientRole::Integrated,
            _ => ClientRole::Discrete,
        }
    }
}

impl fmt::Display for ClientRole {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match self {
            ClientRole::Integrated => "integrated",
            ClientRole::Discrete => "discrete",
        })
    }
}

impl FromStr for ClientRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "integrated" => Ok(ClientRole::Integrated),
            "discrete" => Ok(ClientRole::Discrete),
            other => Err(format!("unknown graphics client '{}'", other)),
        }
    }
}

/// A display controller on the PCI bus and the role it plays behind the gmux.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GraphicsClient {
    pub id:     String,
    pub vendor: u16,
    pub device: u16,
    pub role:   ClientRole,
}

pub fn clients() -> io::Result<Vec<GraphicsClient>> {
    let mut clients = Vec::new();

    for dev in PciDevice::all()? {
        // Display controller class, any subclass.
        if dev.class()? >> 16 != 0x03 {
            continue;
        }

        let vendor = dev.vendor()?;
        let device = dev.device()?;
        let role = ClientRole::classify(vendor, device);
        log::debug!("{}: {:04X}:{:04X} is {}", dev.id(), vendor, device, role);

        clients.push(GraphicsClient { id: dev.id().to_owned(), vendor, device, role });
    }

    Ok(clients)
}
