use std::net::IpAddr;

use rand::seq::IndexedRandom;
use tokio::net::lookup_host;
use tracing::debug;

use crate::config::AddressFamily;
use crate::error::FetchError;

pub(crate) fn filter_by_family(addrs: &[IpAddr], family: AddressFamily) -> Vec<IpAddr> {
    addrs
        .iter()
        .copied()
        .filter(|ip| match family {
            AddressFamily::Ipv4 => ip.is_ipv4(),
            AddressFamily::Ipv6 => ip.is_ipv6(),
            AddressFamily::Any => true,
            // System never reaches explicit resolution
            AddressFamily::System => false,
        })
        .collect()
}

/// Resolve `host` and pick one address in the allowed family, uniformly at
/// random among the survivors.
pub(crate) async fn resolve_pinned_addr(
    host: &str,
    port: u16,
    family: AddressFamily,
) -> Result<IpAddr, FetchError> {
    let addrs: Vec<IpAddr> = lookup_host((host, port))
        .await?
        .map(|addr| addr.ip())
        .collect();

    let filtered = filter_by_family(&addrs, family);
    let Some(selected) = filtered.choose(&mut rand::rng()).copied() else {
        return Err(FetchError::DnsResolution {
            host: host.to_string(),
        });
    };

    debug!(host, %selected, ?family, candidates = ?addrs, "pinned stream server address");
    Ok(selected)
}
