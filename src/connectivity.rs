//! Reachability check that gates every feed request.
//!
//! Only Wi-Fi, cellular, and Ethernet count as connected. VPN tunnels,
//! Bluetooth tethering, and other virtual links are treated as offline.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransportKind {
    Wifi,
    Cellular,
    Ethernet,
    Other,
    None,
}

/// Reports the transports of the currently active networks.
pub trait ConnectivityProvider: Send + Sync {
    fn active_transport_kinds(&self) -> HashSet<TransportKind>;
}

impl<T: ConnectivityProvider + ?Sized> ConnectivityProvider for Box<T> {
    fn active_transport_kinds(&self) -> HashSet<TransportKind> {
        (**self).active_transport_kinds()
    }
}

impl<T: ConnectivityProvider + ?Sized> ConnectivityProvider for std::sync::Arc<T> {
    fn active_transport_kinds(&self) -> HashSet<TransportKind> {
        (**self).active_transport_kinds()
    }
}

/// True iff an active network uses Wi-Fi, cellular, or Ethernet.
pub fn has_internet_connection<C: ConnectivityProvider + ?Sized>(provider: &C) -> bool {
    provider
        .active_transport_kinds()
        .iter()
        .any(|kind| match kind {
            TransportKind::Wifi | TransportKind::Cellular | TransportKind::Ethernet => true,
            TransportKind::Other | TransportKind::None => false,
        })
}

// ============================================================================
// Fixed Provider
// ============================================================================

/// Provider that always reports the same transports.
///
/// Used when the config sets `assume_online`, and in tests.
#[derive(Debug, Clone)]
pub struct StaticConnectivity(HashSet<TransportKind>);

impl StaticConnectivity {
    pub fn new(kinds: impl IntoIterator<Item = TransportKind>) -> Self {
        Self(kinds.into_iter().collect())
    }

    pub fn online() -> Self {
        Self::new([TransportKind::Ethernet])
    }

    pub fn offline() -> Self {
        Self::new([TransportKind::None])
    }
}

impl ConnectivityProvider for StaticConnectivity {
    fn active_transport_kinds(&self) -> HashSet<TransportKind> {
        self.0.clone()
    }
}

// ============================================================================
// Linux sysfs Provider
// ============================================================================

/// ARPHRD_ETHER: Ethernet and most Wi-Fi drivers
const ARPHRD_ETHER: u32 = 1;
/// ARPHRD_RAWIP and ARPHRD_NONE: used by WWAN modems
const ARPHRD_RAWIP: u32 = 519;
const ARPHRD_NONE: u32 = 0xFFFE;

/// Interface name prefixes of virtual Ethernet devices that never reach the
/// internet on their own.
const VIRTUAL_PREFIXES: &[&str] = &["veth", "docker", "br-", "virbr", "vmnet", "vboxnet"];

/// Reads interface state from `/sys/class/net`.
///
/// An interface counts as active when its `operstate` is `up`. Loopback is
/// ignored. Each active interface is classified by its sysfs attributes.
#[derive(Debug, Clone)]
pub struct SysfsConnectivity {
    root: PathBuf,
}

impl Default for SysfsConnectivity {
    fn default() -> Self {
        Self::new("/sys/class/net")
    }
}

impl SysfsConnectivity {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn classify(dir: &Path, name: &str) -> TransportKind {
        if dir.join("wireless").exists() || dir.join("phy80211").exists() {
            return TransportKind::Wifi;
        }
        if name.starts_with("wwan") {
            return TransportKind::Cellular;
        }

        let link_type = std::fs::read_to_string(dir.join("type"))
            .ok()
            .and_then(|t| t.trim().parse::<u32>().ok());

        match link_type {
            Some(ARPHRD_RAWIP) | Some(ARPHRD_NONE) if dir.join("device").exists() => {
                TransportKind::Cellular
            }
            Some(ARPHRD_ETHER) => {
                let is_virtual = dir.join("bridge").exists()
                    || dir.join("tun_flags").exists()
                    || VIRTUAL_PREFIXES.iter().any(|p| name.starts_with(p))
                    || name.starts_with("bnep");
                if is_virtual {
                    TransportKind::Other
                } else {
                    TransportKind::Ethernet
                }
            }
            _ => TransportKind::Other,
        }
    }
}

impl ConnectivityProvider for SysfsConnectivity {
    fn active_transport_kinds(&self) -> HashSet<TransportKind> {
        let mut kinds = HashSet::new();

        let entries = match std::fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) => {
                tracing::debug!(path = %self.root.display(), error = %e, "Cannot read network interfaces");
                kinds.insert(TransportKind::None);
                return kinds;
            }
        };

        for entry in entries.flatten() {
            let name = entry.file_name().to_string_lossy().into_owned();
            if name == "lo" {
                continue;
            }
            let dir = entry.path();
            let operstate = std::fs::read_to_string(dir.join("operstate")).unwrap_or_default();
            if operstate.trim() != "up" {
                continue;
            }
            let kind = Self::classify(&dir, &name);
            tracing::trace!(interface = %name, kind = ?kind, "Active interface");
            kinds.insert(kind);
        }

        if kinds.is_empty() {
            kinds.insert(TransportKind::None);
        }
        kinds
    }
}
