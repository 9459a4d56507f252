use std::sync::Arc;
use std::sync::RwLock;

/// One discovered server, as it advertised itself.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct HostRecord {
    pub name: String,
    pub address: String,
}

/// Ordered collection of discovered hosts, deduplicated by address.
///
/// Cloning yields another handle to the same collection. During a discovery
/// session exactly one writer (the session itself) appends; any number of
/// readers may take snapshots concurrently.
#[derive(Debug, Default, Clone)]
pub struct Registry {
    hosts: Arc<RwLock<Vec<HostRecord>>>,
}

impl Registry {
    /// Appends `host` unless an entry with the same address already exists.
    ///
    /// First-seen wins: a re-advertisement never replaces an existing record.
    /// Returns the record iff it was newly added.
    pub(crate) fn insert(&self, host: HostRecord) -> Option<HostRecord> {
        let mut hosts = self.hosts.write().expect("Registry lock poisoned");
        if hosts.iter().any(|existing| existing.address == host.address) {
            return None;
        }
        hosts.push(host.clone());
        Some(host)
    }

    /// Copies the current contents, in insertion order.
    pub fn snapshot(&self) -> Vec<HostRecord> {
        self.hosts.read().expect("Registry lock poisoned").clone()
    }

    pub fn get(&self, address: &str) -> Option<HostRecord> {
        self.hosts
            .read()
            .expect("Registry lock poisoned")
            .iter()
            .find(|host| host.address == address)
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.hosts.read().expect("Registry lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
