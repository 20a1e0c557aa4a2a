//! # TM Server
//!
//! Publishes navigation telemetry and zero position requests onto the bus.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::{
    sync::mpsc::{Receiver, RecvTimeoutError, SyncSender, TrySendError},
    time::{Duration, Instant},
};
use log::{debug, info, warn};

use comms_if::{
    msg::{NAV_STATUS, ZERO_POSITION},
    net::{zmq, BusMsgError, MonitoredSocket, MonitoredSocketError, NetParams, SocketOptions},
    tm::NavTm,
};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Telemetry server
pub struct TmServer {
    socket: MonitoredSocket
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Items the control loop hands to the server.
#[derive(Debug, Clone)]
pub enum Outbound {
    /// Latest telemetry, published at the status period.
    Telemetry(NavTm),

    /// Published as soon as it is received.
    ZeroPosition,
}

#[derive(Debug, thiserror::Error)]
pub enum TmServerError {
    #[error("Socket error: {0}")]
    SocketError(MonitoredSocketError),

    #[error("Could not send telemetry: {0}")]
    SendError(BusMsgError),

    #[error("Could not serialize the telemetry: {0}")]
    SerializationError(serde_json::Error),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl TmServer {
    /// Create a new instance of the TM Server.
    ///
    /// This function will not block until a subscriber connects.
    pub fn new(ctx: &zmq::Context, params: &NetParams) -> Result<Self, TmServerError> {
        let socket_options = SocketOptions {
            block_on_first_connect: false,
            bind: true,
            connect_timeout: 1000,
            linger: 1,
            send_timeout: 10,
            ..Default::default()
        };

        let socket = MonitoredSocket::new(
            ctx,
            zmq::PUB,
            socket_options,
            &params.tm_endpoint
        ).map_err(TmServerError::SocketError)?;

        Ok(Self {
            socket
        })
    }

    /// Publish a telemetry packet on `NAV_STATUS`.
    pub fn send_tm(&self, tm: &NavTm) -> Result<(), TmServerError> {
        let packet_string = serde_json::to_string(tm)
            .map_err(TmServerError::SerializationError)?;

        self.socket.send_bus_msg(NAV_STATUS, &packet_string)
            .map_err(TmServerError::SendError)
    }

    /// Publish a zero position request.
    pub fn send_zero_position(&self) -> Result<(), TmServerError> {
        self.socket.send_bus_msg(ZERO_POSITION, "true")
            .map_err(TmServerError::SendError)
    }

    /// Serve items from `rx` until the sending end is dropped.
    ///
    /// Only the newest telemetry is published each status period, older packets are replaced.
    pub fn run(self, rx: Receiver<Outbound>, status_period: Duration) {
        let mut latest: Option<NavTm> = None;
        let mut next_status = Instant::now() + status_period;

        loop {
            let timeout = next_status.saturating_duration_since(Instant::now());

            match rx.recv_timeout(timeout) {
                Ok(Outbound::Telemetry(tm)) => latest = Some(tm),
                Ok(Outbound::ZeroPosition) => {
                    if let Err(e) = self.send_zero_position() {
                        warn!("Could not send the zero position request: {}", e);
                    }
                },
                Err(RecvTimeoutError::Timeout) => (),
                Err(RecvTimeoutError::Disconnected) => {
                    info!("Control loop has stopped, TM server exiting");
                    return
                }
            }

            let now = Instant::now();
            if now < next_status {
                continue
            }

            if let Some(ref tm) = latest {
                if let Err(e) = self.send_tm(tm) {
                    warn!("{}", e);
                }
            }

            // Missed periods are skipped rather than sent in a burst
            next_status += status_period;
            if next_status < now {
                next_status = now + status_period;
            }
        }
    }
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Hand an item to the server without blocking the control loop.
///
/// Returns `false` if the item was dropped because the queue is full or the server has stopped.
pub fn queue(tx: &SyncSender<Outbound>, item: Outbound) -> bool {
    match tx.try_send(item) {
        Ok(()) => true,
        // A newer packet follows next cycle
        Err(TrySendError::Full(Outbound::Telemetry(_))) => {
            debug!("TM queue full, telemetry dropped");
            false
        },
        Err(TrySendError::Full(Outbound::ZeroPosition)) => {
            warn!("TM queue full, zero position request dropped");
            false
        },
        Err(TrySendError::Disconnected(_)) => {
            warn!("TmServer has stopped, outbound item dropped");
            false
        }
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use std::sync::mpsc::sync_channel;

    #[test]
    fn test_queue_never_blocks() {
        let (tx, rx) = sync_channel(2);

        assert!(queue(&tx, Outbound::Telemetry(NavTm::default())));
        assert!(queue(&tx, Outbound::ZeroPosition));

        // Nothing is draining the queue, the sends must return straight away
        assert!(!queue(&tx, Outbound::Telemetry(NavTm::default())));
        assert!(!queue(&tx, Outbound::ZeroPosition));

        assert!(matches!(rx.try_recv(), Ok(Outbound::Telemetry(_))));
        assert!(matches!(rx.try_recv(), Ok(Outbound::ZeroPosition)));
        assert!(rx.try_recv().is_err());

        drop(rx);
        assert!(!queue(&tx, Outbound::ZeroPosition));
    }
}
