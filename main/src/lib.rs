mod discovery;
mod dispatch;
mod network;
mod packet;
mod registry;

use std::time::Duration;

pub use discovery::discover;
pub use discovery::DiscoverError;
pub use discovery::DiscoveryListener;
pub use dispatch::CommandDispatcher;
pub use registry::HostRecord;
pub use registry::Registry;

/// UDP port advertising servers broadcast to by default.
pub const DEFAULT_LISTEN_PORT: u16 = 17756;

/// How long a discovery session listens by default.
///
/// The window is fixed: it is measured from session start and is not
/// extended when an advertisement arrives.
pub const DEFAULT_LISTEN_TIMEOUT: Duration = Duration::from_millis(5000);

#[cfg(test)]
mod test {
    pub fn init() {
        let _ = env_logger::builder().is_test(true).try_init();
    }
}
