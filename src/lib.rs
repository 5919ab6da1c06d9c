// Copyright 2018-2021 System76 <info@system76.com>
//
// SPDX-License-Identifier: GPL-3.0-only

#![deny(clippy::all)]
#![deny(unused_crate_dependencies)]
#![deny(unused_imports)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::module_name_repetitions)]

pub mod acpi;
pub mod args;
pub mod backlight;
pub mod client;
pub mod completion;
pub mod config;
pub mod daemon;
pub mod errors;
pub mod graphics;
pub mod interrupt;
pub mod logging;
pub mod mux;
pub mod notify;
pub mod port;
pub mod power;
pub mod switch;

pub use self::{
    errors::{PowerError, ProbeError},
    graphics::ClientRole,
    mux::Gmux,
    power::PowerState,
};

pub static DBUS_NAME: &str = "com.system76.Gmux";
pub static DBUS_PATH: &str = "/com/system76/Gmux";
pub static DBUS_IFACE: &str = "com.system76.Gmux";

/// Whether the process has the privileges needed to open `/dev/port`.
pub fn is_root() -> bool { unsafe { libc::geteuid() == 0 } }

// Helper function for errors
pub(crate) fn err_str<E: ::std::fmt::Display>(err: E) -> String { format!("{}", err) }
