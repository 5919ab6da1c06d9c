// Copyright 2023 System76 <info@system76.com>
// SPDX-License-Identifier: GPL-3.0-only

use std::{
    io,
    sync::atomic::{AtomicBool, Ordering},
};
use tokio::signal::unix::{signal, SignalKind};

pub static CONTINUE: AtomicBool = AtomicBool::new(true);

pub fn handle() -> io::Result<()> {
    let mut int = signal(SignalKind::interrupt())?;
    let mut hup = signal(SignalKind::hangup())?;
    let mut term = signal(SignalKind::terminate())?;

    tokio::spawn(async move {
        let sig = tokio::select! {
            _ = int.recv() => "SIGINT",
            _ = hup.recv() => "SIGHUP",
            _ = term.recv() => "SIGTERM",
        };

        log::info!("caught signal: {}", sig);
        CONTINUE.store(false, Ordering::SeqCst);
    });

    Ok(())
}
