// SPDX-License-Identifier: MPL-2.0

use serde::{Deserialize, Serialize};
use zvariant::Type;

#[derive(Deserialize, Serialize, Type, Debug)]
pub struct GmuxStatus {
    pub version:        String,
    pub route:          String,
    pub brightness:     u32,
    pub max_brightness: u32,
    pub discrete_power: bool,
}

#[zbus::dbus_proxy(
    interface = "com.system76.Gmux",
    default_service = "com.system76.Gmux",
    default_path = "/com/system76/Gmux"
)]
trait Gmux {
    /// GetStatus method
    fn get_status(&self) -> zbus::Result<GmuxStatus>;

    /// GetBrightness method
    fn get_brightness(&self) -> zbus::Result<u32>;

    /// GetMaxBrightness method
    fn get_max_brightness(&self) -> zbus::Result<u32>;

    /// SetBrightness method
    fn set_brightness(&self, level: u32) -> zbus::Result<()>;

    /// GetRoute method
    fn get_route(&self) -> zbus::Result<String>;

    /// SwitchTo method
    fn switch_to(&self, client: &str) -> zbus::Result<()>;

    /// SwitchDdc method
    fn switch_ddc(&self, client: &str) -> zbus::Result<()>;

    /// GetDiscretePower method
    fn get_discrete_power(&self) -> zbus::Result<bool>;

    /// SetDiscretePower method
    fn set_discrete_power(&self, power: bool) -> zbus::Result<()>;

    /// PowerChanged signal
    #[dbus_proxy(signal)]
    fn power_changed(&self, power: bool) -> zbus::Result<()>;
}
