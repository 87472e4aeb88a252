//! Multicast feed dispatcher.
//!
//! Owns the receive loop: joins the multicast group, pulls datagrams into a
//! reusable buffer, and walks the registered normalizers in order until one
//! yields a tick. The tick is then pushed to every registered callback.
//!
//! Normalizers are held by `Weak` reference so an externally dropped
//! normalizer simply disappears from the walk. Callbacks are owned.
//! Both lists are snapshotted under a short-held lock; no lock is held
//! across a callback invocation.

use std::net::{Ipv4Addr, UdpSocket};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use anyhow::{Context, Result};
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::core::Exchange;
use crate::data::constants::{MAX_PACKET_SIZE, RECV_POLL_MS};
use crate::data::normalizer::Normalizer;
use crate::data::types::CanonicalTick;

/// Consumer callback, invoked once per decoded tick.
pub type TickCallback = Box<dyn Fn(&CanonicalTick) + Send + Sync>;

struct RegisteredNormalizer {
    /// Advisory only; dispatch is first-success-wins in registration order.
    exchange: Exchange,
    normalizer: Weak<dyn Normalizer>,
}

struct Shared {
    normalizers: Mutex<Vec<RegisteredNormalizer>>,
    callbacks: Mutex<Vec<Arc<TickCallback>>>,
    packets_received: AtomicU64,
    packets_processed: AtomicU64,
}

impl Shared {
    /// Walk normalizers in order; first tick wins. Dead weak references are
    /// skipped silently.
    fn process_packet(&self, frame: &[u8]) {
        let normalizers: Vec<Weak<dyn Normalizer>> = {
            let registered = self.normalizers.lock();
            registered.iter().map(|r| r.normalizer.clone()).collect()
        };

        for weak in normalizers {
            let Some(normalizer) = weak.upgrade() else {
                continue;
            };
            if let Some(tick) = normalizer.normalize(frame) {
                self.packets_processed.fetch_add(1, Ordering::Relaxed);
                let callbacks: Vec<Arc<TickCallback>> =
                    self.callbacks.lock().iter().cloned().collect();
                for callback in callbacks {
                    callback(&tick);
                }
                return;
            }
        }
    }
}

/// Multicast receiver with pluggable normalizers and fan-out callbacks.
pub struct FeedDispatcher {
    group: Ipv4Addr,
    port: u16,
    running: Arc<AtomicBool>,
    listener: Mutex<Option<JoinHandle<()>>>,
    shared: Arc<Shared>,
}

impl FeedDispatcher {
    pub fn new(group: Ipv4Addr, port: u16) -> Self {
        Self {
            group,
            port,
            running: Arc::new(AtomicBool::new(false)),
            listener: Mutex::new(None),
            shared: Arc::new(Shared {
                normalizers: Mutex::new(Vec::new()),
                callbacks: Mutex::new(Vec::new()),
                packets_received: AtomicU64::new(0),
                packets_processed: AtomicU64::new(0),
            }),
        }
    }

    /// Append a normalizer. The dispatcher keeps only a weak reference; the
    /// caller owns the normalizer and may drop it to deregister.
    pub fn register_normalizer(&self, exchange: Exchange, normalizer: &Arc<dyn Normalizer>) {
        debug!("Registering {} normalizer", exchange);
        self.shared.normalizers.lock().push(RegisteredNormalizer {
            exchange,
            normalizer: Arc::downgrade(normalizer),
        });
    }

    /// Append an owned consumer callback.
    pub fn register_callback(&self, callback: impl Fn(&CanonicalTick) + Send + Sync + 'static) {
        self.shared.callbacks.lock().push(Arc::new(Box::new(callback)));
    }

    /// Bind the socket, join the group, and spawn the receive loop.
    ///
    /// Returns `Ok(false)` when already running. Socket setup failures abort
    /// startup and surface to the caller.
    pub fn start(&self) -> Result<bool> {
        if self.running.swap(true, Ordering::AcqRel) {
            return Ok(false);
        }

        let socket = match self.bind_socket() {
            Ok(socket) => socket,
            Err(e) => {
                self.running.store(false, Ordering::Release);
                return Err(e);
            }
        };

        info!("Feed dispatcher listening on {}:{}", self.group, self.port);

        let running = self.running.clone();
        let shared = self.shared.clone();
        let handle = thread::Builder::new()
            .name("feed-listener".to_string())
            .spawn(move || listener_loop(socket, running, shared))
            .context("failed to spawn feed listener thread")?;

        *self.listener.lock() = Some(handle);
        Ok(true)
    }

    /// Stop the receive loop and wait for the listener to exit. Idempotent.
    pub fn stop(&self) {
        if !self.running.swap(false, Ordering::AcqRel) {
            return;
        }
        if let Some(handle) = self.listener.lock().take() {
            if handle.join().is_err() {
                warn!("Feed listener thread panicked during shutdown");
            }
        }
        info!("Feed dispatcher stopped");
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// `(packets_received, packets_processed)` counter snapshot.
    pub fn stats(&self) -> (u64, u64) {
        (
            self.shared.packets_received.load(Ordering::Relaxed),
            self.shared.packets_processed.load(Ordering::Relaxed),
        )
    }

    /// Advisory exchange tags of the registered normalizers, in walk order.
    pub fn registered_exchanges(&self) -> Vec<Exchange> {
        self.shared
            .normalizers
            .lock()
            .iter()
            .map(|r| r.exchange)
            .collect()
    }

    fn bind_socket(&self) -> Result<UdpSocket> {
        let socket = bind_reuse(self.port)
            .with_context(|| format!("failed to bind UDP socket on port {}", self.port))?;
        socket
            .join_multicast_v4(&self.group, &Ipv4Addr::UNSPECIFIED)
            .with_context(|| format!("failed to join multicast group {}", self.group))?;
        socket
            .set_read_timeout(Some(Duration::from_millis(RECV_POLL_MS)))
            .context("failed to set socket read timeout")?;
        Ok(socket)
    }
}

impl Drop for FeedDispatcher {
    fn drop(&mut self) {
        self.stop();
    }
}

fn listener_loop(socket: UdpSocket, running: Arc<AtomicBool>, shared: Arc<Shared>) {
    let mut buffer = vec![0u8; MAX_PACKET_SIZE];

    while running.load(Ordering::Acquire) {
        match socket.recv_from(&mut buffer) {
            Ok((len, _sender)) => {
                shared.packets_received.fetch_add(1, Ordering::Relaxed);
                shared.process_packet(&buffer[..len]);
            }
            Err(e)
                if e.kind() == std::io::ErrorKind::WouldBlock
                    || e.kind() == std::io::ErrorKind::TimedOut =>
            {
                // Poll tick; re-check the running flag.
            }
            Err(e) => {
                warn!("Feed socket receive error: {}", e);
            }
        }
    }

    debug!("Feed listener exiting");
}

/// Bind `0.0.0.0:port` with `SO_REUSEADDR` so multiple consumers can share
/// the multicast port on one host.
#[cfg(target_os = "linux")]
fn bind_reuse(port: u16) -> std::io::Result<UdpSocket> {
    use std::os::fd::FromRawFd;

    // SAFETY: raw socket/setsockopt/bind sequence; the fd is closed on every
    // error path and ownership transfers to UdpSocket on success.
    unsafe {
        let fd = libc::socket(libc::AF_INET, libc::SOCK_DGRAM, 0);
        if fd < 0 {
            return Err(std::io::Error::last_os_error());
        }

        let reuse: libc::c_int = 1;
        if libc::setsockopt(
            fd,
            libc::SOL_SOCKET,
            libc::SO_REUSEADDR,
            &reuse as *const libc::c_int as *const libc::c_void,
            std::mem::size_of::<libc::c_int>() as libc::socklen_t,
        ) < 0
        {
            let err = std::io::Error::last_os_error();
            libc::close(fd);
            return Err(err);
        }

        let addr = libc::sockaddr_in {
            sin_family: libc::AF_INET as libc::sa_family_t,
            sin_port: port.to_be(),
            sin_addr: libc::in_addr {
                s_addr: u32::from(Ipv4Addr::UNSPECIFIED).to_be(),
            },
            sin_zero: [0; 8],
        };
        if libc::bind(
            fd,
            &addr as *const libc::sockaddr_in as *const libc::sockaddr,
            std::mem::size_of::<libc::sockaddr_in>() as libc::socklen_t,
        ) < 0
        {
            let err = std::io::Error::last_os_error();
            libc::close(fd);
            return Err(err);
        }

        Ok(UdpSocket::from_raw_fd(fd))
    }
}

/// Fallback without `SO_REUSEADDR`; port sharing is a Linux deployment
/// concern.
#[cfg(not(target_os = "linux"))]
fn bind_reuse(port: u16) -> std::io::Result<UdpSocket> {
    UdpSocket::bind((Ipv4Addr::UNSPECIFIED, port))
}
