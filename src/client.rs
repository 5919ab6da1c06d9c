// Copyright 2018-2021 System76 <info@system76.com>
//
// SPDX-License-Identifier: GPL-3.0-only

use crate::args::{Args, PowerArg};
use anyhow::Context;
use system76_gmux_zbus::GmuxProxy;

pub struct GmuxClient {
    proxy: GmuxProxy<'static>,
}

impl GmuxClient {
    pub async fn new() -> anyhow::Result<Self> {
        let connection =
            zbus::Connection::system().await.context("failed to connect to the system bus")?;
        let proxy = GmuxProxy::new(&connection)
            .await
            .context("failed to create com.system76.Gmux proxy")?;
        Ok(Self { proxy })
    }

    async fn status(&self) -> anyhow::Result<()> {
        let status = self.proxy.get_status().await?;
        println!("Version: {}", status.version);
        println!("Route: {}", status.route);
        println!("Brightness: {}/{}", status.brightness, status.max_brightness);
        println!("Discrete power: {}", if status.discrete_power { "on" } else { "off" });
        Ok(())
    }

    async fn brightness(&self, level: Option<u32>) -> anyhow::Result<()> {
        match level {
            Some(level) => {
                log::info!("setting brightness to {}", level);
                self.proxy.set_brightness(level).await?;
            }
            None => {
                let brightness = self.proxy.get_brightness().await?;
                let max_brightness = self.proxy.get_max_brightness().await?;
                let percent = if max_brightness == 0 {
                    0
                } else {
                    u64::from(brightness) * 100 / u64::from(max_brightness)
                };
                println!("{}/{} = {}%", brightness, max_brightness, percent);
            }
        }

        Ok(())
    }

    async fn power(&self, state: Option<PowerArg>) -> anyhow::Result<()> {
        match state {
            Some(PowerArg::On) => self.proxy.set_discrete_power(true).await?,
            Some(PowerArg::Off) => self.proxy.set_discrete_power(false).await?,
            None => {
                let on = self.proxy.get_discrete_power().await?;
                println!("{}", if on { "on" } else { "off" });
            }
        }

        Ok(())
    }
}

pub async fn client(args: &Args) -> anyhow::Result<()> {
    let client = GmuxClient::new().await?;

    match args {
        Args::Status => client.status().await,
        Args::Brightness { level } => client.brightness(*level).await,
        Args::Route => {
            println!("{}", client.proxy.get_route().await?);
            Ok(())
        }
        Args::Switch { client: target } => {
            client.proxy.switch_to(&target.to_string()).await.map_err(anyhow::Error::from)
        }
        Args::Ddc { client: target } => {
            client.proxy.switch_ddc(&target.to_string()).await.map_err(anyhow::Error::from)
        }
        Args::Power { state } => client.power(*state).await,
        Args::Daemon { .. } | Args::Probe | Args::Clients => {
            Err(anyhow::anyhow!("{:?} is not a client command", args))
        }
    }
}
