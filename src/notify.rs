// Copyright 2018-2021 System76 <info@system76.com>
//
// SPDX-License-Identifier: GPL-3.0-only

use crate::{
    config::Config,
    errors::AttachError,
    mux::Gmux,
    port::{PortIo, GMUX_PORT_INTERRUPT_STATUS},
};
use std::{
    fs, io,
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread::{self, JoinHandle},
    time::Duration,
};

pub type NotifyHandler = Box<dyn Fn() + Send + Sync>;

/// Delivers hardware notifications from the gmux to a handler.
pub trait NotificationSource: Send {
    fn install(&mut self, handler: NotifyHandler) -> io::Result<()>;

    fn remove(&mut self);
}

struct Worker {
    running: Arc<AtomicBool>,
    thread:  JoinHandle<()>,
}

impl Worker {
    /// Calls `handler` whenever `poll` reports a new event.
    fn spawn<P>(name: &str, interval: Duration, mut poll: P, handler: NotifyHandler) -> io::Result<Self>
    where
        P: FnMut() -> bool + Send + 'static,
    {
        let running = Arc::new(AtomicBool::new(true));
        let thread = {
            let running = running.clone();
            thread::Builder::new().name(name.into()).spawn(move || {
                while running.load(Ordering::SeqCst) {
                    if poll() {
                        handler();
                    }
                    thread::sleep(interval);
                }
            })?
        };

        Ok(Self { running, thread })
    }

    fn stop(self) {
        self.running.store(false, Ordering::SeqCst);
        if self.thread.join().is_err() {
            log::error!("notification worker panicked");
        }
    }
}

/// Watches the dispatch counter of the ACPI GPE wired to the gmux.
pub struct GpeWatcher {
    path:     PathBuf,
    interval: Duration,
    worker:   Option<Worker>,
}

impl GpeWatcher {
    pub fn new(gpe: u8, interval: Duration) -> Self {
        Self::with_path(PathBuf::from(format!("/sys/firmware/acpi/interrupts/gpe{:02X}", gpe)), interval)
    }

    fn with_path(path: PathBuf, interval: Duration) -> Self { Self { path, interval, worker: None } }
}

fn gpe_count(path: &Path) -> io::Result<u64> {
    let data = fs::read_to_string(path)?;
    data.split_whitespace()
        .next()
        .and_then(|count| count.parse().ok())
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidData, "malformed GPE counter"))
}

impl NotificationSource for GpeWatcher {
    fn install(&mut self, handler: NotifyHandler) -> io::Result<()> {
        let mut last = gpe_count(&self.path)?;
        log::info!("watching {} from count {}", self.path.display(), last);

        let path = self.path.clone();
        let poll = move || match gpe_count(&path) {
            Ok(count) => {
                let fired = count > last;
                last = count;
                fired
            }
            Err(why) => {
                log::debug!("failed to read {}: {}", path.display(), why);
                false
            }
        };

        self.worker = Some(Worker::spawn("gmux-gpe", self.interval, poll, handler)?);
        Ok(())
    }

    fn remove(&mut self) {
        if let Some(worker) = self.worker.take() {
            worker.stop();
        }
    }
}

/// Polls the gmux interrupt status register, for platforms where the GPE
/// driving the gmux is unknown.
pub struct StatusPoller {
    port:     Arc<dyn PortIo>,
    interval: Duration,
    worker:   Option<Worker>,
}

impl StatusPoller {
    pub fn new(gmux: &Gmux, interval: Duration) -> Self {
        Self { port: gmux.port.clone(), interval, worker: None }
    }
}

impl NotificationSource for StatusPoller {
    fn install(&mut self, handler: NotifyHandler) -> io::Result<()> {
        let port = self.port.clone();
        // A status that survives its re-arm is only reported again once it changes.
        let mut last = 0;
        let poll = move || match port.read8(GMUX_PORT_INTERRUPT_STATUS) {
            Ok(status) => {
                let fired = status != 0 && status != last;
                last = status;
                fired
            }
            Err(why) => {
                log::debug!("failed to poll gmux interrupt status: {}", why);
                false
            }
        };

        self.worker = Some(Worker::spawn("gmux-poll", self.interval, poll, handler)?);
        Ok(())
    }

    fn remove(&mut self) {
        if let Some(worker) = self.worker.take() {
            worker.stop();
        }
    }
}

/// Picks the notification source described by the configuration.
pub fn source(gmux: &Gmux, config: &Config) -> Box<dyn NotificationSource> {
    let interval = Duration::from_millis(config.poll_interval_ms);
    match config.gpe {
        Some(gpe) => Box::new(GpeWatcher::new(gpe, interval)),
        None => Box::new(StatusPoller::new(gmux, interval)),
    }
}

/// A gmux with its notification source installed and interrupts enabled.
pub struct Attachment {
    gmux:   Arc<Gmux>,
    source: Option<Box<dyn NotificationSource>>,
}

impl Gmux {
    pub fn attach(
        self: &Arc<Self>,
        mut source: Box<dyn NotificationSource>,
    ) -> Result<Attachment, AttachError> {
        let gmux = self.clone();
        let handler: NotifyHandler = Box::new(move || {
            if let Err(why) = gmux.notify() {
                log::error!("gmux: failed to handle notification: {}", why);
            }
        });

        source.install(handler).map_err(AttachError::Install)?;

        if !self.sequencer.reset_idle() {
            log::debug!("power transition in flight, keeping its completion");
        }

        if let Err(why) = self.enable_interrupts() {
            source.remove();
            return Err(AttachError::Enable(why));
        }

        Ok(Attachment { gmux: self.clone(), source: Some(source) })
    }
}

impl Attachment {
    /// Removes the notification source and disables interrupts.
    pub fn detach(mut self) -> io::Result<()> { self.release() }

    fn release(&mut self) -> io::Result<()> {
        match self.source.take() {
            Some(mut source) => {
                source.remove();
                self.gmux.disable_interrupts()
            }
            None => Ok(()),
        }
    }
}

impl Drop for Attachment {
    fn drop(&mut self) {
        if let Err(why) = self.release() {
            log::error!("failed to disable gmux interrupts: {}", why);
        }
    }
}
