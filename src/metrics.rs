/*
 *  metrics.rs
 *
 *  OctoMonS - print status at a glance
 *  (c) 2020-26 Stuart Hunter
 *
 *  Local machine readings: CPU temperature and interface address
 *
 *  This program is free software: you can redistribute it and/or modify
 *  it under the terms of the GNU General Public License as published by
 *  the Free Software Foundation, either version 3 of the License, or
 *  (at your option) any later version.
 *
 *  This program is distributed in the hope that it will be useful,
 *  but WITHOUT ANY WARRANTY; without even the implied warranty of
 *  MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 *  GNU General Public License for more details.
 *
 *  See <http://www.gnu.org/licenses/> to get a copy of the GNU General
 *  Public License.
 *
 */
//! Readings gathered from /sys and the kernel's interface table.

use std::net::{IpAddr, Ipv4Addr};
use std::path::Path;

use crate::sources::SourceError;

/// Parses the first whitespace separated token of a sysfs style file.
fn first_float(content: &str) -> Option<f64> {
    content.split_whitespace().next()?.parse::<f64>().ok()
}

/// Returns the CPU temperature in Celsius.
/// The thermal zone reports millidegrees Celsius.
pub async fn read_cpu_temperature(path: &Path) -> Result<f64, SourceError> {
    let content = tokio::fs::read_to_string(path).await
        .map_err(|e| SourceError::SensorUnavailable(format!("{}: {}", path.display(), e)))?;
    let millideg = first_float(&content)
        .filter(|v| v.is_finite())
        .ok_or_else(|| SourceError::SensorUnavailable(format!(
            "{}: unreadable value {:?}", path.display(), content.trim()
        )))?;
    Ok(millideg / 1000.0)
}

/// Picks the first IPv4 address bound to `ifname` from an interface listing.
pub fn ipv4_for<'a, I>(ifname: &str, interfaces: I) -> Option<Ipv4Addr>
where
    I: IntoIterator<Item = &'a (String, IpAddr)>,
{
    interfaces.into_iter().find_map(|(name, addr)| match addr {
        IpAddr::V4(v4) if name == ifname => Some(*v4),
        _ => None,
    })
}

/// Resolves the IPv4 address bound to the named interface.
pub fn interface_ipv4(ifname: &str) -> Result<Ipv4Addr, SourceError> {
    let unavailable = |reason: String| SourceError::InterfaceUnavailable {
        interface: ifname.to_string(),
        reason,
    };
    let interfaces = local_ip_address::list_afinet_netifas()
        .map_err(|e| unavailable(e.to_string()))?;
    ipv4_for(ifname, &interfaces)
        .ok_or_else(|| unavailable("no IPv4 address assigned".to_string()))
}
