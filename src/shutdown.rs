/*
 *  shutdown.rs
 *
 *  OctoMonS - print status at a glance
 *  (c) 2020-26 Stuart Hunter
 *
 *  Unix signals to a shutdown flag
 *
 *  This program is free software: you can redistribute it and/or modify
 *  it under the terms of the GNU General Public License as published by
 *  the Free Software Foundation, either version 3 of the License, or
 *  (at your option) any later version.
 *
 *  This program is distributed in the hope that it will be useful,
 *  but WITHOUT ANY WARRANTY; without even the implied warranty of
 *  MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 *  GNU General Public License for more details.
 *
 *  See <http://www.gnu.org/licenses/> to get a copy of the GNU General
 *  Public License.
 *
 */

use log::info;
use tokio::signal::unix::{signal, Signal, SignalKind};
use tokio::sync::watch;

/// SIGINT, SIGTERM and SIGHUP, registered together.
struct TermSignals {
    sigint: Signal,
    sigterm: Signal,
    sighup: Signal,
}

impl TermSignals {
    fn register() -> std::io::Result<Self> {
        Ok(Self {
            sigint: signal(SignalKind::interrupt())?,
            sigterm: signal(SignalKind::terminate())?,
            sighup: signal(SignalKind::hangup())?,
        })
    }

    /// Asynchronously waits for any of the three.
    async fn recv(&mut self) {
        tokio::select! {
            _ = self.sigint.recv() => {
                info!("SIGINT received. Initiating graceful shutdown.");
            }
            _ = self.sigterm.recv() => {
                info!("SIGTERM received. Initiating graceful shutdown.");
            }
            _ = self.sighup.recv() => {
                info!("SIGHUP received. Initiating graceful shutdown.");
            }
        }
    }
}

/// Installs the handlers and returns the flag they raise.
///
/// Handlers are registered before this returns, so a signal that arrives
/// right after start-up is not lost.
pub fn install() -> std::io::Result<watch::Receiver<bool>> {
    let mut signals = TermSignals::register()?;
    let (tx, rx) = watch::channel(false);

    tokio::spawn(async move {
        signals.recv().await;
        let _ = tx.send(true);
        // hold the sender so receivers see `true` rather than a closed channel
        tx.closed().await;
    });

    Ok(rx)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_flag_starts_lowered() {
        let rx = install().unwrap();
        assert!(!*rx.borrow());
        assert!(!rx.has_changed().unwrap());
    }
}
