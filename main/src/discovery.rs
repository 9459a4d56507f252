use crate::network::udp_receiver::AdvertisementReceiver;
use crate::network::udp_receiver::AdvertisementStream;
use crate::network::udp_receiver::UdpAdvertisementReceiver;
use crate::packet::Advertisement;
use crate::packet::DecodeError;
use crate::registry::HostRecord;
use crate::registry::Registry;
use futures_util::stream::BoxStream;
use futures_util::Stream;
use futures_util::StreamExt;
use futures_util::TryFutureExt;
use std::net::SocketAddr;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::time::Duration;
use thiserror::Error;

/// Listens for server advertisements broadcast over UDP.
///
/// Each advertisement names the server and its address; the first sighting of
/// an address is recorded, later ones are dropped. A session lasts exactly
/// `listen_timeout` and then stops. Only one session may run at a time.
pub struct DiscoveryListener {
    listen_port: u16,
    listen_timeout: Duration,
    session_active: AtomicBool,
}

impl DiscoveryListener {
    pub fn new(listen_port: u16, listen_timeout: Duration) -> Self {
        Self {
            listen_port,
            listen_timeout,
            session_active: AtomicBool::new(false),
        }
    }

    /// Runs one full discovery session and returns the accumulated registry.
    ///
    /// Fails only when the port cannot be bound or when a session is already
    /// running. A quiet network yields an empty registry, and a read error
    /// mid-session ends the session with whatever has been discovered so far.
    pub async fn start_discovery(&self) -> Result<Registry, DiscoverError> {
        self.start_discovery_with(UdpAdvertisementReceiver).await
    }

    async fn start_discovery_with(
        &self,
        receiver: impl AdvertisementReceiver + Send + 'static,
    ) -> Result<Registry, DiscoverError> {
        if self.session_active.swap(true, Ordering::AcqRel) {
            return Err(DiscoverError::SessionActive);
        }
        let _guard = SessionGuard(&self.session_active);

        let registry = Registry::default();
        let mut hosts = discover_internal(
            receiver,
            self.listen_port,
            self.listen_timeout,
            registry.clone(),
        );
        while let Some(event) = hosts.next().await {
            match event {
                Ok(host) => log::info!("Discovered server {} at {}", host.name, host.address),
                Err(e @ DiscoverError::Bind(_)) => return Err(e),
                Err(e) => {
                    log::error!("Discovery session ended early: {}", e);
                    break;
                }
            }
        }
        Ok(registry)
    }
}

struct SessionGuard<'a>(&'a AtomicBool);

impl Drop for SessionGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Discovers advertising servers, yielding each host as it is first seen.
///
/// The stream binds `0.0.0.0:listen_port` when first polled and ends once
/// `listen_timeout` has elapsed, measured from that point. Duplicate and
/// malformed advertisements are dropped silently.
pub fn discover(
    listen_port: u16,
    listen_timeout: Duration,
) -> impl Stream<Item = Result<HostRecord, DiscoverError>> {
    discover_internal(
        UdpAdvertisementReceiver,
        listen_port,
        listen_timeout,
        Registry::default(),
    )
}

fn discover_internal(
    receiver: impl AdvertisementReceiver + Send + 'static,
    listen_port: u16,
    listen_timeout: Duration,
    registry: Registry,
) -> BoxStream<'static, Result<HostRecord, DiscoverError>> {
    receiver
        .bind(listen_port)
        .map_err(DiscoverError::Bind)
        .map_ok(move |advertisements| session(advertisements, listen_timeout, registry))
        .try_flatten_stream()
        .boxed()
}

/// Races the advertisement stream against the session deadline.
///
/// `take_until` polls the deadline before the inner stream, so if a datagram
/// arrives at the exact instant the window closes, the timeout wins.
fn session(
    advertisements: AdvertisementStream,
    listen_timeout: Duration,
    registry: Registry,
) -> impl Stream<Item = Result<HostRecord, DiscoverError>> + Send + 'static {
    advertisements
        .take_until(tokio::time::sleep(listen_timeout))
        .filter_map(|result| async { strip_malformed(result) })
        .filter_map(move |result| {
            let registry = registry.clone();
            async move {
                match result {
                    Ok(advertisement) => registry.insert(advertisement.into()).map(Ok),
                    Err(e) => Some(Err(e)),
                }
            }
        })
}

fn strip_malformed(
    result: Result<(Advertisement, SocketAddr), DecodeError>,
) -> Option<Result<Advertisement, DiscoverError>> {
    match result {
        Ok((advertisement, remote_address)) => {
            log::debug!(
                "Received advertisement {:?} from {}",
                advertisement,
                remote_address
            );
            Some(Ok(advertisement))
        }
        Err(DecodeError::Io(e)) => Some(Err(DiscoverError::Read(e))),
        Err(e) => {
            log::debug!("Discarding an invalid advertisement: {}", e);
            None
        }
    }
}

#[derive(Error, Debug)]
pub enum DiscoverError {
    #[error("Failed to bind the discovery socket")]
    Bind(#[source] std::io::Error),

    #[error("Error while receiving advertisements")]
    Read(#[source] std::io::Error),

    #[error("Another discovery session is already running")]
    SessionActive,
}
