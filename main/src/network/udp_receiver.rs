use crate::packet::Advertisement;
use crate::packet::AdvertisementDecoder;
use crate::packet::DecodeError;
use futures_util::future::BoxFuture;
use futures_util::stream::BoxStream;
use futures_util::FutureExt;
use futures_util::StreamExt;
use mockall::automock;
use std::net::Ipv4Addr;
use std::net::SocketAddr;
use std::net::SocketAddrV4;
use tokio::net::UdpSocket;
use tokio_util::udp::UdpFramed;

/// Source of inbound advertisements, one per UDP datagram.
#[automock]
pub trait AdvertisementReceiver {
    /// Binds the listening socket.
    ///
    /// The socket lives inside the returned stream and is closed when the
    /// stream is dropped.
    fn bind(
        &self,
        port: u16,
    ) -> BoxFuture<'static, std::io::Result<AdvertisementStream>>;
}

pub type AdvertisementStream =
    BoxStream<'static, Result<(Advertisement, SocketAddr), DecodeError>>;

pub struct UdpAdvertisementReceiver;

impl AdvertisementReceiver for UdpAdvertisementReceiver {
    fn bind(
        &self,
        port: u16,
    ) -> BoxFuture<'static, std::io::Result<AdvertisementStream>> {
        async move {
            let bind_address = SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, port);
            log::info!("Binding discovery socket at {}", bind_address);
            let socket = UdpSocket::bind(bind_address).await?;
            Ok(UdpFramed::new(socket, AdvertisementDecoder).boxed())
        }
        .boxed()
    }
}
