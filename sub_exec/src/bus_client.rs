//! # Bus Client
//!
//! Subscribes to every topic on the message bus and forwards the parsed messages to the control
//! loop.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use log::{info, trace, warn};

use comms_if::{
    msg::{MsgParseError, NavMsg},
    net::{zmq, BusMsgError, MonitoredSocket, MonitoredSocketError, NetParams, SocketOptions},
};
use crate::ingest::Ingest;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Message bus client
pub struct BusClient {
    socket: MonitoredSocket
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum BusClientError {
    #[error("Socket error: {0}")]
    SocketError(MonitoredSocketError),

    #[error("Could not subscribe to the bus: {0}")]
    SubscribeError(zmq::Error),

    #[error("Could not receive a message from the bus: {0}")]
    RecvError(BusMsgError),

    #[error("Could not parse the message: {0}")]
    ParseError(MsgParseError),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl BusClient {

    /// Create a new instance of the bus client.
    ///
    /// This function will not block until the bus connects. Receives wait at most
    /// `recv_timeout_ms` for a message.
    pub fn new(
        ctx: &zmq::Context,
        params: &NetParams,
        recv_timeout_ms: i32
    ) -> Result<Self, BusClientError> {
        let socket_options = SocketOptions {
            block_on_first_connect: false,
            connect_timeout: 1000,
            linger: 1,
            recv_timeout: recv_timeout_ms,
            ..Default::default()
        };

        let socket = MonitoredSocket::new(
            ctx,
            zmq::SUB,
            socket_options,
            &params.bus_endpoint
        ).map_err(BusClientError::SocketError)?;

        // Every topic is of interest
        socket.set_subscribe(b"")
            .map_err(BusClientError::SubscribeError)?;

        Ok(Self {
            socket
        })
    }

    /// Check if the client is connected to the bus
    pub fn is_connected(&self) -> bool {
        self.socket.connected()
    }

    /// Receive a single message from the bus.
    ///
    /// `Ok(None)` means no message arrived within the receive timeout.
    pub fn recv_msg(&self) -> Result<Option<NavMsg>, BusClientError> {
        let (topic, payload) = match self.socket.recv_bus_msg() {
            Ok(Some(m)) => m,
            Ok(None) => return Ok(None),
            Err(e) => return Err(BusClientError::RecvError(e))
        };

        trace!("Bus message {}: {}", topic, payload);

        NavMsg::parse(&topic, &payload)
            .map(Some)
            .map_err(BusClientError::ParseError)
    }

    /// Forward messages to the control loop until it stops.
    ///
    /// Bad messages and receive failures are logged and the client carries on with the next one.
    pub fn run(self, ingest: Ingest) {
        info!("Bus client listening");

        loop {
            match self.recv_msg() {
                Ok(Some(msg)) => {
                    if ingest.forward(msg).is_err() {
                        info!("Control loop has stopped, bus client exiting");
                        return
                    }
                },
                Ok(None) => (),
                Err(e) => warn!("{}", e)
            }
        }
    }
}
