// Copyright 2018-2021 System76 <info@system76.com>
//
// SPDX-License-Identifier: GPL-3.0-only

use crate::{
    acpi::{AcpiCall, PlatformPower},
    completion::WaitPolicy,
    config::Config,
    errors::{ProbeError, ResourceError},
    graphics::ClientRole,
    port::{
        DevPort, PortIo, GMUX_MIN_IO_LEN, GMUX_PORT_MAX_BRIGHTNESS, GMUX_PORT_VERSION_MAJOR,
        GMUX_PORT_VERSION_MINOR, GMUX_PORT_VERSION_RELEASE,
    },
    power::PowerSequencer,
};
use std::{
    fmt,
    sync::{Arc, Mutex},
};

/// Brightness values wider than 24 bits are not understood by older gmux firmware.
pub const GMUX_BRIGHTNESS_MASK: u32 = 0x00FF_FFFF;
pub const GMUX_MAX_BRIGHTNESS: u32 = GMUX_BRIGHTNESS_MASK;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Version {
    pub major:   u8,
    pub minor:   u8,
    pub release: u8,
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.release)
    }
}

#[derive(Default)]
pub struct GmuxOptions {
    pub wait:     WaitPolicy,
    pub platform: Option<Box<dyn PlatformPower>>,
}

/// The display and power multiplexer of a dual-GPU Apple laptop.
pub struct Gmux {
    pub(crate) port:          Arc<dyn PortIo>,
    version:                  Version,
    max_brightness:           u32,
    pub(crate) sequencer:     PowerSequencer,
    pub(crate) resume_client: Mutex<Option<ClientRole>>,
}

impl Gmux {
    /// Opens the I/O window described by the configuration and probes it.
    pub fn open(config: &Config) -> Result<Self, ProbeError> {
        let port = DevPort::open(&config.port_device, config.window())?;

        let platform = config
            .platform_method
            .clone()
            .map(|method| Box::new(AcpiCall::new(method)) as Box<dyn PlatformPower>);

        Self::probe(Arc::new(port), GmuxOptions { wait: config.wait_policy(), platform })
    }

    pub fn probe(port: Arc<dyn PortIo>, options: GmuxOptions) -> Result<Self, ProbeError> {
        let window = port.window();
        if window.len < GMUX_MIN_IO_LEN {
            log::error!("gmux I/O region too small ({:#x} < {:#x})", window.len, GMUX_MIN_IO_LEN);
            return Err(ResourceError::WindowTooSmall { len: window.len, min: GMUX_MIN_IO_LEN }.into());
        }

        // Some machines describe a gmux in ACPI without actually having one.
        let version = Version {
            major:   port.read8(GMUX_PORT_VERSION_MAJOR)?,
            minor:   port.read8(GMUX_PORT_VERSION_MINOR)?,
            release: port.read8(GMUX_PORT_VERSION_RELEASE)?,
        };

        if (version.major, version.minor, version.release) == (0xFF, 0xFF, 0xFF) {
            log::info!("gmux device not present");
            return Err(ProbeError::NotPresent);
        }

        log::info!("Found gmux version {}", version);

        let mut max_brightness = port.read32(GMUX_PORT_MAX_BRIGHTNESS)?;
        if max_brightness > GMUX_MAX_BRIGHTNESS {
            log::warn!(
                "gmux reports max brightness {:#x}, capping at {:#x}",
                max_brightness,
                GMUX_MAX_BRIGHTNESS
            );
            max_brightness = GMUX_MAX_BRIGHTNESS;
        }

        let gmux = Gmux {
            port,
            version,
            max_brightness,
            sequencer: PowerSequencer::new(options.wait, options.platform),
            resume_client: Mutex::new(None),
        };

        // Push the current level back through the byte-wise sequence so that the
        // firmware latches a value this driver is able to read back.
        let brightness = gmux.brightness()?;
        gmux.set_brightness(brightness)?;

        Ok(gmux)
    }

    pub fn version(&self) -> Version { self.version }

    pub fn max_brightness(&self) -> u32 { self.max_brightness }
}
