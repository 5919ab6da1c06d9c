// Copyright 2018-2021 System76 <info@system76.com>
//
// SPDX-License-Identifier: GPL-3.0-only

use crate::{acpi::DEFAULT_POWER_METHOD, completion::WaitPolicy, errors::ConfigError, port::IoWindow};
use serde::{Deserialize, Serialize};
use std::{
    env, fs,
    path::{Path, PathBuf},
    time::Duration,
};

const CONFIG_PATH: &str = "/etc/system76-gmux/config.json";

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(default)]
pub struct Config {
    /// First I/O port of the gmux window.
    pub io_base:          u16,
    pub io_len:           u16,
    pub port_device:      PathBuf,
    /// ACPI GPE raised by the gmux; the interrupt status register is polled when unset.
    pub gpe:              Option<u8>,
    pub poll_interval_ms: u64,
    /// `null` waits for power change completion without a bound.
    pub power_timeout_ms: Option<u64>,
    /// Platform power resource bracketing discrete power changes; `null` skips the call.
    pub platform_method:  Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            io_base:          0x700,
            io_len:           0xFF,
            port_device:      PathBuf::from("/dev/port"),
            gpe:              None,
            poll_interval_ms: 10,
            power_timeout_ms: Some(200),
            platform_method:  Some(DEFAULT_POWER_METHOD.to_owned()),
        }
    }
}

impl Config {
    /// The config path, which may be overridden by `S76_GMUX_CONFIG`.
    pub fn path() -> PathBuf {
        env::var_os("S76_GMUX_CONFIG").map_or_else(|| PathBuf::from(CONFIG_PATH), PathBuf::from)
    }

    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::path();
        if !path.exists() {
            log::info!("config file does not exist at {}; using defaults", path.display());
            return Ok(Self::default());
        }

        Self::read(&path)
    }

    pub fn read(path: &Path) -> Result<Self, ConfigError> {
        let data = fs::read(path).map_err(|why| ConfigError::Read(path.to_owned(), why))?;
        serde_json::from_slice(&data).map_err(|why| ConfigError::Parse(path.to_owned(), why))
    }

    pub fn window(&self) -> IoWindow { IoWindow::new(self.io_base, self.io_len) }

    pub fn wait_policy(&self) -> WaitPolicy {
        match self.power_timeout_ms {
            Some(ms) => WaitPolicy::Bounded(Duration::from_millis(ms)),
            None => WaitPolicy::Unbounded,
        }
    }
}
