// Copyright 2018-2021 System76 <info@system76.com>
//
// SPDX-License-Identifier: GPL-3.0-only

use std::{io, path::PathBuf, time::Duration};

#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
    #[error("gmux I/O resource unavailable: {}", _0)]
    Resource(ResourceError),
    #[error("gmux device not present")]
    NotPresent,
    #[error("gmux I/O failed during probe: {}", _0)]
    Io(io::Error),
}

impl From<ResourceError> for ProbeError {
    fn from(why: ResourceError) -> ProbeError { ProbeError::Resource(why) }
}

impl From<io::Error> for ProbeError {
    fn from(why: io::Error) -> ProbeError { ProbeError::Io(why) }
}

#[derive(Debug, thiserror::Error)]
pub enum ResourceError {
    #[error("gmux I/O region too small ({:#x} < {:#x})", len, min)]
    WindowTooSmall { len: u16, min: u16 },
    #[error("failed to open {}: {}", _0, _1)]
    Open(String, io::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum PowerError {
    #[error("a discrete power transition is already in flight")]
    Busy,
    #[error("gmux did not signal power change completion within {:?}", _0)]
    Timeout(Duration),
    #[error("gmux I/O failed while sequencing power: {}", _0)]
    Io(io::Error),
}

impl From<io::Error> for PowerError {
    fn from(why: io::Error) -> PowerError { PowerError::Io(why) }
}

#[derive(Debug, thiserror::Error)]
pub enum PlatformCallError {
    #[error("failed to open {}: {}", _0, _1)]
    Open(&'static str, io::Error),
    #[error("failed to invoke {}: {}", _0, _1)]
    Invoke(String, io::Error),
    #[error("{} call failed: {}", _0, _1)]
    Rejected(String, String),
}

#[derive(Debug, thiserror::Error)]
pub enum BridgeFault {
    #[error("interrupt status did not clear on re-arm (old status {:#04x}, new status {:#04x})", old, new)]
    RearmFailed { old: u8, new: u8 },
}

#[derive(Debug, thiserror::Error)]
pub enum AttachError {
    #[error("failed to install notification handler: {}", _0)]
    Install(io::Error),
    #[error("failed to enable gmux interrupts: {}", _0)]
    Enable(io::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config at {:?}: {}", _0, _1)]
    Read(PathBuf, io::Error),
    #[error("failed to parse config at {:?}: {}", _0, _1)]
    Parse(PathBuf, serde_json::Error),
}
