// Copyright 2018-2021 System76 <info@system76.com>
//
// SPDX-License-Identifier: GPL-3.0-only

use crate::graphics::ClientRole;
use clap::{Parser, ValueEnum};

/// Control the Apple gmux display multiplexer
#[derive(Parser, Debug)]
#[command(
    about = "Utility for controlling the Apple gmux display multiplexer",
    version,
    propagate_version = true
)]
pub enum Args {
    #[command(
        about = "Runs the program in daemon mode",
        long_about = "Registers a new DBUS service and starts an event loop to listen for, and \
                      respond to, DBUS events from clients"
    )]
    Daemon {
        #[arg(
            short,
            long,
            help = "Set the verbosity of daemon logs to 'off' [default is 'info']",
            group = "verbosity"
        )]
        quiet: bool,

        #[arg(
            short,
            long,
            help = "Set the verbosity of daemon logs to 'debug' [default is 'info']",
            group = "verbosity"
        )]
        verbose: bool,
    },

    #[command(about = "Query the gmux version, route, brightness and discrete power")]
    Status,

    #[command(
        about = "Query or set the backlight brightness",
        long_about = "Query or set the backlight brightness.\n\n - If an argument is not \
                      provided, the brightness will be queried\n - Otherwise, the brightness \
                      is set, clamped to the maximum the gmux reports"
    )]
    Brightness { level: Option<u32> },

    #[command(about = "Query which graphics client drives the internal panel")]
    Route,

    #[command(about = "Route the panel, DDC and external outputs to a graphics client")]
    Switch {
        #[arg(help = "integrated or discrete")]
        client: ClientRole,
    },

    #[command(about = "Route only the DDC lines to a graphics client")]
    Ddc {
        #[arg(help = "integrated or discrete")]
        client: ClientRole,
    },

    #[command(about = "Query or set the discrete graphics power state")]
    Power {
        #[arg(help = "Set whether discrete graphics should be on or off")]
        state: Option<PowerArg>,
    },

    #[command(about = "List the graphics clients found on the PCI bus")]
    Clients,

    #[command(about = "Probe the gmux directly, without the daemon")]
    Probe,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum PowerArg {
    On,
    Off,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn command_is_well_formed() { Args::command().debug_assert(); }

    #[test]
    fn parses_client_roles() {
        let args = Args::try_parse_from(["system76-gmux", "switch", "discrete"]).unwrap();
        assert!(matches!(args, Args::Switch { client: ClientRole::Discrete }));

        assert!(Args::try_parse_from(["system76-gmux", "ddc", "nvidia"]).is_err());
    }

    #[test]
    fn power_state_is_optional() {
        let args = Args::try_parse_from(["system76-gmux", "power"]).unwrap();
        assert!(matches!(args, Args::Power { state: None }));

        let args = Args::try_parse_from(["system76-gmux", "power", "off"]).unwrap();
        assert!(matches!(args, Args::Power { state: Some(PowerArg::Off) }));
    }
}
