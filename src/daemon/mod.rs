// Copyright 2018-2021 System76 <info@system76.com>
//
// SPDX-License-Identifier: GPL-3.0-only

use futures_lite::StreamExt;
use std::{
    fmt::Display,
    sync::{atomic::Ordering, Arc},
    time::Duration,
};
use system76_gmux_zbus::GmuxStatus;
use tokio::time::sleep;
use zbus::{dbus_interface, dbus_proxy, fdo, SignalContext};

use crate::{
    config::Config, err_str, errors::ProbeError, graphics::ClientRole, mux::Gmux, notify,
    power::PowerState, DBUS_IFACE, DBUS_NAME, DBUS_PATH,
};

mod signals;
use self::signals::CONTINUE;

struct GmuxDaemon {
    gmux: Arc<Gmux>,
}

fn failed<E: Display>(why: E) -> fdo::Error { fdo::Error::Failed(why.to_string()) }

fn client(name: &str) -> fdo::Result<ClientRole> { name.parse().map_err(fdo::Error::InvalidArgs) }

#[dbus_interface(name = "com.system76.Gmux")]
impl GmuxDaemon {
    fn get_status(&self) -> fdo::Result<GmuxStatus> {
        log::debug!("DBUS Received GetStatus method");
        let gmux = &self.gmux;
        Ok(GmuxStatus {
            version:        gmux.version().to_string(),
            route:          gmux
                .current_route()
                .map_err(failed)?
                .map_or_else(|| "unknown".to_owned(), |route| route.to_string()),
            brightness:     gmux.brightness().map_err(failed)?,
            max_brightness: gmux.max_brightness(),
            discrete_power: gmux.discrete_power().map_err(failed)? == PowerState::On,
        })
    }

    fn get_brightness(&self) -> fdo::Result<u32> { self.gmux.brightness().map_err(failed) }

    fn get_max_brightness(&self) -> u32 { self.gmux.max_brightness() }

    fn set_brightness(&self, level: u32) -> fdo::Result<()> {
        log::info!("DBUS Received SetBrightness({}) method", level);
        self.gmux.set_brightness(level).map_err(failed)
    }

    fn get_route(&self) -> fdo::Result<String> {
        Ok(match self.gmux.current_route().map_err(failed)? {
            Some(route) => route.to_string(),
            None => "unknown".to_owned(),
        })
    }

    fn switch_to(&self, client_name: &str) -> fdo::Result<()> {
        log::info!("DBUS Received SwitchTo({}) method", client_name);
        self.gmux.route(client(client_name)?).map_err(failed)
    }

    fn switch_ddc(&self, client_name: &str) -> fdo::Result<()> {
        log::info!("DBUS Received SwitchDdc({}) method", client_name);
        self.gmux.switch_ddc(client(client_name)?).map_err(failed)
    }

    fn get_discrete_power(&self) -> fdo::Result<bool> {
        Ok(self.gmux.discrete_power().map_err(failed)? == PowerState::On)
    }

    async fn set_discrete_power(
        &self,
        #[zbus(signal_context)] ctxt: SignalContext<'_>,
        power: bool,
    ) -> fdo::Result<()> {
        log::info!("DBUS Received SetDiscretePower({}) method", power);

        // The sequencer blocks until the gmux interrupt arrives.
        let gmux = self.gmux.clone();
        tokio::task::spawn_blocking(move || gmux.try_set_discrete_power(PowerState::from(power)))
            .await
            .map_err(failed)?
            .map_err(failed)?;

        Self::power_changed(&ctxt, power).await?;
        Ok(())
    }

    #[dbus_interface(signal)]
    async fn power_changed(ctxt: &SignalContext<'_>, power: bool) -> zbus::Result<()>;
}

#[dbus_proxy(
    interface = "org.freedesktop.login1.Manager",
    default_service = "org.freedesktop.login1",
    default_path = "/org/freedesktop/login1"
)]
trait LoginManager {
    #[dbus_proxy(signal)]
    fn prepare_for_sleep(&self, start: bool) -> zbus::Result<()>;
}

/// Saves the display route before system sleep and restores it on wake.
async fn sleep_watcher(connection: zbus::Connection, gmux: Arc<Gmux>) {
    let proxy = match LoginManagerProxy::new(&connection).await {
        Ok(proxy) => proxy,
        Err(why) => {
            log::warn!("failed to connect to logind, routes will not survive sleep: {}", why);
            return;
        }
    };

    let mut stream = match proxy.receive_prepare_for_sleep().await {
        Ok(stream) => stream,
        Err(why) => {
            log::warn!("failed to watch for sleep: {}", why);
            return;
        }
    };

    while let Some(signal) = stream.next().await {
        let start = match signal.args() {
            Ok(args) => args.start,
            Err(why) => {
                log::warn!("malformed PrepareForSleep signal: {}", why);
                continue;
            }
        };

        let result = if start { gmux.suspend() } else { gmux.resume() };
        if let Err(why) = result {
            log::error!("failed to {} gmux: {}", if start { "suspend" } else { "resume" }, why);
        }
    }
}

#[tokio::main(flavor = "current_thread")]
pub async fn daemon(config: Config) -> Result<(), String> {
    signals::handle().map_err(err_str)?;

    log::info!("Probing gmux at {:#x}+{:#x}", config.io_base, config.io_len);
    let gmux = match Gmux::open(&config) {
        Ok(gmux) => Arc::new(gmux),
        Err(ProbeError::NotPresent) => return Ok(()),
        Err(why) => return Err(err_str(why)),
    };

    log::info!("Attaching gmux notifications");
    let attachment = gmux.attach(notify::source(&gmux, &config)).map_err(err_str)?;

    log::info!("Registering dbus name {}", DBUS_NAME);
    log::info!("Adding dbus path {} with interface {}", DBUS_PATH, DBUS_IFACE);
    let connection = zbus::ConnectionBuilder::system()
        .and_then(|builder| builder.name(DBUS_NAME))
        .and_then(|builder| builder.serve_at(DBUS_PATH, GmuxDaemon { gmux: gmux.clone() }))
        .map_err(err_str)?
        .build()
        .await
        .map_err(err_str)?;

    let _sleep_task = tokio::spawn(sleep_watcher(connection.clone(), gmux.clone()));

    while CONTINUE.load(Ordering::SeqCst) {
        sleep(Duration::from_millis(1000)).await;
    }

    log::info!("Detaching gmux notifications");
    attachment.detach().map_err(err_str)
}
