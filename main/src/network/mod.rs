pub mod udp_receiver;
