// Copyright 2018-2021 System76 <info@system76.com>
//
// SPDX-License-Identifier: GPL-3.0-only

use crate::{
    acpi::{PlatformPower, POWER_RESOURCE_OFF, POWER_RESOURCE_ON},
    completion::{Completion, WaitPolicy},
    errors::PowerError,
    graphics::ClientRole,
    mux::Gmux,
    port::{PortIo, GMUX_PORT_DISCRETE_POWER},
};
use std::{
    fmt, io,
    sync::{Mutex, MutexGuard, PoisonError, TryLockError},
    time::Duration,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PowerState {
    On,
    Off,
}

impl From<bool> for PowerState {
    fn from(on: bool) -> Self {
        if on {
            PowerState::On
        } else {
            PowerState::Off
        }
    }
}

impl fmt::Display for PowerState {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match self {
            PowerState::On => "on",
            PowerState::Off => "off",
        })
    }
}

/// Drives discrete GPU power transitions, one at a time.
pub struct PowerSequencer {
    in_flight:  Mutex<()>,
    completion: Completion,
    wait:       WaitPolicy,
    platform:   Option<Box<dyn PlatformPower>>,
}

impl PowerSequencer {
    pub fn new(wait: WaitPolicy, platform: Option<Box<dyn PlatformPower>>) -> Self {
        Self { in_flight: Mutex::new(()), completion: Completion::default(), wait, platform }
    }

    pub fn completion(&self) -> &Completion { &self.completion }

    /// Clears a stale completion. A transition in flight owns the completion
    /// and is left alone. Returns `false` in that case.
    pub fn reset_idle(&self) -> bool {
        match self.in_flight.try_lock() {
            Ok(_guard) => {
                self.completion.cancel();
                true
            }
            Err(TryLockError::Poisoned(_poisoned)) => {
                self.completion.cancel();
                true
            }
            Err(TryLockError::WouldBlock) => false,
        }
    }

    /// Waits for any in-flight transition to resolve, then performs this one.
    pub fn set_discrete_power(&self, port: &dyn PortIo, state: PowerState) -> Result<(), PowerError> {
        let _guard = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
        self.sequence(port, state)
    }

    /// Like `set_discrete_power`, but fails with `PowerError::Busy` instead of waiting.
    pub fn try_set_discrete_power(
        &self,
        port: &dyn PortIo,
        state: PowerState,
    ) -> Result<(), PowerError> {
        let _guard: MutexGuard<()> = match self.in_flight.try_lock() {
            Ok(guard) => guard,
            Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
            Err(TryLockError::WouldBlock) => return Err(PowerError::Busy),
        };

        self.sequence(port, state)
    }

    fn sequence(&self, port: &dyn PortIo, state: PowerState) -> Result<(), PowerError> {
        // Armed before the first write; only this request's notification completes it.
        self.completion.reset();

        if let Err(why) = self.write_sequence(port, state) {
            self.completion.cancel();
            return Err(why.into());
        }

        if self.completion.wait(self.wait) {
            log::debug!("discrete power change to {} completed", state);
            Ok(())
        } else {
            let timeout = match self.wait {
                WaitPolicy::Bounded(timeout) => timeout,
                WaitPolicy::Unbounded => Duration::MAX,
            };
            log::warn!("completion timeout while powering discrete card {}", state);
            Err(PowerError::Timeout(timeout))
        }
    }

    fn write_sequence(&self, port: &dyn PortIo, state: PowerState) -> io::Result<()> {
        match state {
            PowerState::On => {
                self.platform_call(POWER_RESOURCE_ON);
                port.write8(GMUX_PORT_DISCRETE_POWER, 1)?;
                port.write8(GMUX_PORT_DISCRETE_POWER, 3)?;
                log::info!("discrete card powered up");
            }
            PowerState::Off => {
                port.write8(GMUX_PORT_DISCRETE_POWER, 1)?;
                port.write8(GMUX_PORT_DISCRETE_POWER, 0)?;
                self.platform_call(POWER_RESOURCE_OFF);
                log::info!("discrete card powered down");
            }
        }

        Ok(())
    }

    fn platform_call(&self, arg: u8) {
        if let Some(platform) = self.platform.as_ref() {
            if let Err(why) = platform.power_resource(arg) {
                log::error!("platform power resource call failed: {}", why);
            }
        }
    }
}

impl Gmux {
    pub fn set_discrete_power(&self, state: PowerState) -> Result<(), PowerError> {
        self.sequencer.set_discrete_power(self.port.as_ref(), state)
    }

    pub fn try_set_discrete_power(&self, state: PowerState) -> Result<(), PowerError> {
        self.sequencer.try_set_discrete_power(self.port.as_ref(), state)
    }

    /// The integrated client is always powered, so requests for it are accepted and ignored.
    pub fn set_power_state(&self, client: ClientRole, state: PowerState) -> Result<(), PowerError> {
        match client {
            ClientRole::Integrated => Ok(()),
            ClientRole::Discrete => self.set_discrete_power(state),
        }
    }

    pub fn discrete_power(&self) -> io::Result<PowerState> {
        Ok(match self.port.read8(GMUX_PORT_DISCRETE_POWER)? {
            3 => PowerState::On,
            _ => PowerState::Off,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{errors::PlatformCallError, mux::GmuxOptions, port::sim::SimPort};
    use std::{
        sync::Arc,
        thread,
        time::{Duration, Instant},
    };

    fn gmux(wait: WaitPolicy, platform: Option<Box<dyn PlatformPower>>) -> (Arc<SimPort>, Arc<Gmux>) {
        let sim = Arc::new(SimPort::new());
        let gmux = Gmux::probe(sim.clone(), GmuxOptions { wait, platform }).unwrap();
        sim.clear_writes();
        (sim, Arc::new(gmux))
    }

    /// Plays the part of the interrupt line for `count` power sequences.
    fn respond(sim: &SimPort, gmux: &Arc<Gmux>, count: usize) -> thread::JoinHandle<()> {
        let events = sim.power_events();
        let gmux = gmux.clone();
        thread::spawn(move || {
            for _ in events.iter().take(count) {
                gmux.notify().unwrap();
            }
        })
    }

    const LONG: WaitPolicy = WaitPolicy::Bounded(Duration::from_secs(5));

    #[test]
    fn power_on_sequence() {
        let (sim, gmux) = gmux(LONG, None);
        let responder = respond(&sim, &gmux, 1);

        gmux.set_discrete_power(PowerState::On).unwrap();
        responder.join().unwrap();

        assert_eq!(sim.writes_to(GMUX_PORT_DISCRETE_POWER), vec![1, 3]);
        assert_eq!(gmux.discrete_power().unwrap(), PowerState::On);
    }

    #[test]
    fn power_off_sequence() {
        let (sim, gmux) = gmux(LONG, None);
        let responder = respond(&sim, &gmux, 1);

        gmux.set_discrete_power(PowerState::Off).unwrap();
        responder.join().unwrap();

        assert_eq!(sim.writes_to(GMUX_PORT_DISCRETE_POWER), vec![1, 0]);
        assert_eq!(gmux.discrete_power().unwrap(), PowerState::Off);
    }

    #[test]
    fn completes_before_timeout() {
        let (sim, gmux) = gmux(LONG, None);
        let responder = respond(&sim, &gmux, 1);

        let start = Instant::now();
        gmux.set_discrete_power(PowerState::On).unwrap();
        assert!(start.elapsed() < Duration::from_secs(5));
        responder.join().unwrap();
    }

    #[test]
    fn times_out_without_interrupt() {
        let timeout = Duration::from_millis(30);
        let (sim, gmux) = gmux(WaitPolicy::Bounded(timeout), None);

        let start = Instant::now();
        match gmux.set_discrete_power(PowerState::On) {
            Err(PowerError::Timeout(elapsed)) => assert_eq!(elapsed, timeout),
            other => panic!("expected timeout, got {:?}", other),
        }
        assert!(start.elapsed() >= timeout);
        assert!(start.elapsed() < Duration::from_secs(2));

        // Writes are not rolled back.
        assert_eq!(sim.writes_to(GMUX_PORT_DISCRETE_POWER), vec![1, 3]);

        // The signal is reusable by the next request.
        let responder = respond(&sim, &gmux, 1);
        gmux.set_discrete_power(PowerState::Off).unwrap();
        responder.join().unwrap();
    }

    #[test]
    fn integrated_power_is_ignored() {
        let (sim, gmux) = gmux(LONG, None);

        gmux.set_power_state(ClientRole::Integrated, PowerState::Off).unwrap();
        assert!(sim.writes().is_empty());
    }

    #[test]
    fn concurrent_requests_are_serialized() {
        let (sim, gmux) = gmux(LONG, None);
        let responder = respond(&sim, &gmux, 2);

        let callers: Vec<_> = [PowerState::On, PowerState::Off]
            .into_iter()
            .map(|state| {
                let gmux = gmux.clone();
                thread::spawn(move || gmux.set_discrete_power(state))
            })
            .collect();

        for caller in callers {
            caller.join().unwrap().unwrap();
        }
        responder.join().unwrap();

        let writes = sim.writes_to(GMUX_PORT_DISCRETE_POWER);
        assert!(writes == [1, 3, 1, 0] || writes == [1, 0, 1, 3], "interleaved: {:?}", writes);
    }

    #[test]
    fn try_set_rejects_while_in_flight() {
        let (sim, gmux) = gmux(WaitPolicy::Bounded(Duration::from_millis(500)), None);

        let first = {
            let gmux = gmux.clone();
            thread::spawn(move || gmux.set_discrete_power(PowerState::On))
        };

        thread::sleep(Duration::from_millis(100));
        assert!(matches!(gmux.try_set_discrete_power(PowerState::Off), Err(PowerError::Busy)));

        assert!(matches!(first.join().unwrap(), Err(PowerError::Timeout(_))));
        assert_eq!(sim.writes_to(GMUX_PORT_DISCRETE_POWER), vec![1, 3]);
    }

    struct Recorder {
        sim:   Arc<SimPort>,
        calls: Arc<Mutex<Vec<(u8, usize)>>>,
        fail:  bool,
    }

    impl PlatformPower for Recorder {
        fn power_resource(&self, arg: u8) -> Result<(), PlatformCallError> {
            let writes = self.sim.writes_to(GMUX_PORT_DISCRETE_POWER).len();
            self.calls.lock().unwrap().push((arg, writes));
            if self.fail {
                Err(PlatformCallError::Rejected("PWRD".into(), "Error: AE_NOT_FOUND".into()))
            } else {
                Ok(())
            }
        }
    }

    fn recorded(fail: bool) -> (Arc<SimPort>, Arc<Gmux>, Arc<Mutex<Vec<(u8, usize)>>>) {
        let sim = Arc::new(SimPort::new());
        let calls = Arc::new(Mutex::new(Vec::new()));
        let platform = Recorder { sim: sim.clone(), calls: calls.clone(), fail };
        let gmux = Gmux::probe(sim.clone(), GmuxOptions {
            wait:     LONG,
            platform: Some(Box::new(platform)),
        })
        .unwrap();
        (sim, Arc::new(gmux), calls)
    }

    #[test]
    fn platform_call_brackets_writes() {
        let (sim, gmux, calls) = recorded(false);
        let responder = respond(&sim, &gmux, 2);

        gmux.set_discrete_power(PowerState::On).unwrap();
        gmux.set_discrete_power(PowerState::Off).unwrap();
        responder.join().unwrap();

        // Before both writes when powering up, after both when powering down.
        assert_eq!(*calls.lock().unwrap(), vec![(0, 0), (1, 4)]);
    }

    #[test]
    fn platform_call_failure_is_not_fatal() {
        let (sim, gmux, calls) = recorded(true);
        let responder = respond(&sim, &gmux, 1);

        gmux.set_discrete_power(PowerState::On).unwrap();
        responder.join().unwrap();

        assert_eq!(calls.lock().unwrap().len(), 1);
        assert_eq!(sim.writes_to(GMUX_PORT_DISCRETE_POWER), vec![1, 3]);
    }
}
