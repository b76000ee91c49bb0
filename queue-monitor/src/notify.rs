use std::net::{Ipv4Addr, SocketAddr, UdpSocket};
use std::time::{Duration, Instant};

use log::{error, info};

use crate::config::{MonitorConfig, QUEUE_POP_PAYLOAD};
use crate::error::{Error, Result};

/// Time-based gate between notifications. Expiry is checked lazily.
#[derive(Clone, Copy, Debug)]
pub struct Cooldown {
    period: Duration,
    last_sent: Option<Instant>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NotifierState {
    /// A notification may go out right away
    Idle,

    /// A notification went out less than one cooldown period ago
    Cooldown,
}

impl Cooldown {
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            last_sent: None,
        }
    }

    pub fn state(&self, now: Instant) -> NotifierState {
        if self.remaining(now).is_zero() {
            NotifierState::Idle
        } else {
            NotifierState::Cooldown
        }
    }

    /// Time left before the next notification is allowed.
    pub fn remaining(&self, now: Instant) -> Duration {
        match self.last_sent {
            Some(last) => self
                .period
                .saturating_sub(now.saturating_duration_since(last)),
            None => Duration::ZERO,
        }
    }

    pub fn start(&mut self, now: Instant) {
        self.last_sent = Some(now);
    }
}

/// What happened to a request to notify.
#[derive(Debug)]
pub enum Delivery {
    /// The datagram was handed to the OS
    Sent,

    /// The socket refused the datagram. The cooldown still started.
    Failed(Error),

    /// Still cooling down from the previous notification; nothing sent
    Suppressed { remaining: Duration },
}

/// Fire-and-forget UDP notifier.
///
/// One unconnected socket bound to an ephemeral port, reused for every send.
pub struct Notifier {
    socket: UdpSocket,
    destination: SocketAddr,
    cooldown: Cooldown,
}

impl Notifier {
    pub fn new(destination: SocketAddr, cooldown: Duration) -> Result<Self> {
        let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0))
            .map_err(|e| Error::from(e).context("creating UDP socket"))?;
        info!("UDP socket created, will send to {}", destination);
        Ok(Self {
            socket,
            destination,
            cooldown: Cooldown::new(cooldown),
        })
    }

    pub fn from_config(config: &MonitorConfig) -> Result<Self> {
        Self::new(config.destination(), config.cooldown)
    }

    pub fn state(&self, now: Instant) -> NotifierState {
        self.cooldown.state(now)
    }

    /// Send the queue pop marker unless still cooling down.
    ///
    /// The cooldown restarts on every attempt, including one the socket
    /// rejects.
    pub fn notify(&mut self, now: Instant) -> Delivery {
        let remaining = self.cooldown.remaining(now);
        if !remaining.is_zero() {
            return Delivery::Suppressed { remaining };
        }

        self.cooldown.start(now);
        match self.send() {
            Ok(()) => {
                info!(
                    "Sent notification to {} - {}",
                    self.destination, QUEUE_POP_PAYLOAD
                );
                Delivery::Sent
            }
            Err(e) => {
                error!("Error sending notification: {}", e);
                Delivery::Failed(e)
            }
        }
    }

    fn send(&self) -> Result<()> {
        let payload = QUEUE_POP_PAYLOAD.as_bytes();
        let sent = self.socket.send_to(payload, self.destination)?;
        if sent != payload.len() {
            return Err(format!("short send: {} of {} bytes", sent, payload.len()).into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn receiver() -> Result<UdpSocket> {
        let socket = UdpSocket::bind((Ipv4Addr::LOCALHOST, 0))?;
        socket.set_read_timeout(Some(Duration::from_millis(200)))?;
        Ok(socket)
    }

    #[test]
    fn cooldown_states() {
        let t0 = Instant::now();
        let mut cooldown = Cooldown::new(Duration::from_secs(5));
        assert_eq!(cooldown.state(t0), NotifierState::Idle);

        cooldown.start(t0);
        assert_eq!(cooldown.state(t0), NotifierState::Cooldown);
        assert_eq!(
            cooldown.remaining(t0 + Duration::from_secs(2)),
            Duration::from_secs(3)
        );
        assert_eq!(
            cooldown.state(t0 + Duration::from_millis(4999)),
            NotifierState::Cooldown
        );
        assert_eq!(
            cooldown.state(t0 + Duration::from_secs(5)),
            NotifierState::Idle
        );
    }

    #[test]
    fn sends_payload_then_suppresses() -> Result<()> {
        let receiver = receiver()?;
        let mut notifier = Notifier::new(receiver.local_addr()?, Duration::from_secs(5))?;
        let t0 = Instant::now();

        assert!(matches!(notifier.notify(t0), Delivery::Sent));
        let mut buf = [0u8; 64];
        let (len, _) = receiver.recv_from(&mut buf)?;
        assert_eq!(&buf[..len], b"queue_pop");

        match notifier.notify(t0 + Duration::from_secs(1)) {
            Delivery::Suppressed { remaining } => assert_eq!(remaining, Duration::from_secs(4)),
            other => panic!("expected suppression, got {:?}", other),
        }
        assert!(receiver.recv_from(&mut buf).is_err());

        assert!(matches!(
            notifier.notify(t0 + Duration::from_secs(5)),
            Delivery::Sent
        ));
        assert!(receiver.recv_from(&mut buf).is_ok());
        Ok(())
    }

    #[test]
    fn failed_send_still_starts_cooldown() -> Result<()> {
        // Broadcast without SO_BROADCAST is rejected by the OS.
        let destination = SocketAddr::from((Ipv4Addr::BROADCAST, 9876));
        let mut notifier = Notifier::new(destination, Duration::from_secs(5))?;
        let t0 = Instant::now();

        assert!(matches!(notifier.notify(t0), Delivery::Failed(_)));
        assert_eq!(notifier.state(t0), NotifierState::Cooldown);
        assert!(matches!(
            notifier.notify(t0 + Duration::from_secs(1)),
            Delivery::Suppressed { .. }
        ));
        Ok(())
    }
}
