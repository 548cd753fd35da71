use std::{
    panic::{self, AssertUnwindSafe},
    sync::{
        mpsc::{self, Sender},
        Arc, Condvar, Mutex, MutexGuard, PoisonError,
    },
    thread::{self, JoinHandle},
    time::Duration,
};

use anyhow::{bail, Context, Result};

use super::{browser::BrowserLauncher, clipboard::ClipboardAccess, poller::Poller};
use crate::WorkerError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceState {
    Initialized,
    Running,
    StopPending,
    Stopped,
}

#[derive(Debug)]
struct Inner {
    state: ServiceState,
    stop_tx: Option<Sender<()>>,
    worker: Option<JoinHandle<()>>,
    failure: Option<WorkerError>,
    #[cfg(test)]
    history: Vec<ServiceState>,
}

impl Inner {
    fn transition(&mut self, from: ServiceState, to: ServiceState) -> bool {
        if self.state != from {
            return false;
        }
        tracing::info!(from = ?from, to = ?to, "Monitor state changed");
        self.state = to;
        #[cfg(test)]
        self.history.push(to);
        true
    }
}

#[derive(Debug)]
struct Shared {
    inner: Mutex<Inner>,
    changed: Condvar,
}

/// Owns the monitor state and the polling worker.
///
/// Cloning gives another handle on the same monitor, e.g. for a signal handler.
#[derive(Debug, Clone)]
pub struct Controller {
    shared: Arc<Shared>,
}

impl Default for Controller {
    fn default() -> Self {
        Self::new()
    }
}

impl Controller {
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Shared {
                inner: Mutex::new(Inner {
                    state: ServiceState::Initialized,
                    stop_tx: None,
                    worker: None,
                    failure: None,
                    #[cfg(test)]
                    history: vec![],
                }),
                changed: Condvar::new(),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.shared
            .inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    pub fn state(&self) -> ServiceState {
        self.lock().state
    }

    /// Moves to Running and spawns `poller` on its own thread. Returns without waiting.
    pub fn start<C, B>(&self, mut poller: Poller<C, B>) -> Result<()>
    where
        C: ClipboardAccess,
        B: BrowserLauncher,
    {
        let mut inner = self.lock();
        if !inner.transition(ServiceState::Initialized, ServiceState::Running) {
            bail!("Monitor can not start from {:?}", inner.state)
        }

        let (stop_tx, stop_rx) = mpsc::channel();
        let controller = self.clone();
        let spawned = thread::Builder::new()
            .name("poller".into())
            .spawn(move || {
                let failure = match panic::catch_unwind(AssertUnwindSafe(|| poller.run(&stop_rx))) {
                    Ok(Ok(())) => return,
                    Ok(Err(e)) => WorkerError::Failed(e),
                    Err(payload) => WorkerError::from_panic(payload),
                };
                log::error!("Error in clipboard monitor: {}", failure);
                controller.force_stop(failure);
            });

        match spawned {
            Ok(worker) => {
                inner.stop_tx = Some(stop_tx);
                inner.worker = Some(worker);
                Ok(())
            }
            Err(e) => {
                inner.transition(ServiceState::Running, ServiceState::StopPending);
                inner.transition(ServiceState::StopPending, ServiceState::Stopped);
                drop(inner);
                self.shared.changed.notify_all();
                Err(e).context("Spawn poller thread")
            }
        }
    }

    /// Asks the worker to finish its current poll, waits for it, then moves to Stopped.
    ///
    /// A no-op once stopping has begun. Stopping a monitor that never started moves it
    /// straight to Stopped.
    pub fn stop(&self) {
        let (stop_tx, worker) = {
            let mut inner = self.lock();
            match inner.state {
                ServiceState::Initialized => {
                    inner.transition(ServiceState::Initialized, ServiceState::Stopped);
                    drop(inner);
                    self.shared.changed.notify_all();
                    return;
                }
                ServiceState::Running => {}
                ServiceState::StopPending | ServiceState::Stopped => {
                    log::debug!("Monitor is {:?}, ignore stop", inner.state);
                    return;
                }
            }
            inner.transition(ServiceState::Running, ServiceState::StopPending);
            (inner.stop_tx.take(), inner.worker.take())
        };

        if let Some(tx) = stop_tx {
            tx.send(()).ok();
        }
        if let Some(worker) = worker {
            if worker.join().is_err() {
                log::error!("Poller thread panicked while stopping");
            }
        }

        self.lock()
            .transition(ServiceState::StopPending, ServiceState::Stopped);
        self.shared.changed.notify_all();
    }

    /// Called from the worker thread after its loop ended with an error.
    fn force_stop(&self, failure: WorkerError) {
        let mut inner = self.lock();
        inner.failure = Some(failure);
        if inner.transition(ServiceState::Running, ServiceState::StopPending) {
            inner.stop_tx.take();
            inner.worker.take();
            inner.transition(ServiceState::StopPending, ServiceState::Stopped);
        }
        drop(inner);
        self.shared.changed.notify_all();
    }

    /// Blocks until the monitor is Stopped.
    pub fn wait(&self) {
        let mut inner = self.lock();
        while inner.state != ServiceState::Stopped {
            inner = self
                .shared
                .changed
                .wait(inner)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Like [`Controller::wait`] with an upper bound. Returns true once Stopped.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let inner = self.lock();
        let (inner, _) = self
            .shared
            .changed
            .wait_timeout_while(inner, timeout, |inner| {
                inner.state != ServiceState::Stopped
            })
            .unwrap_or_else(PoisonError::into_inner);
        inner.state == ServiceState::Stopped
    }

    /// The error that ended the worker, if it did not stop on request.
    pub fn take_failure(&self) -> Option<WorkerError> {
        self.lock().failure.take()
    }

    #[cfg(test)]
    fn history(&self) -> Vec<ServiceState> {
        self.lock().history.clone()
    }
}

/// Lifecycle hooks for a service host: the monitor starts on `on_start` and stops on `on_stop`.
pub struct MonitorService<C, B> {
    controller: Controller,
    poller: Option<Poller<C, B>>,
}

impl<C: ClipboardAccess, B: BrowserLauncher> MonitorService<C, B> {
    pub fn new(poller: Poller<C, B>) -> Self {
        Self {
            controller: Controller::new(),
            poller: Some(poller),
        }
    }

    pub fn controller(&self) -> &Controller {
        &self.controller
    }

    pub fn on_start(&mut self) -> Result<()> {
        log::info!("Service is starting...");
        let poller = match self.poller.take() {
            Some(p) => p,
            None => bail!("Service already started"),
        };
        self.controller.start(poller)
    }

    pub fn on_stop(&mut self) {
        log::info!("Service is stopping...");
        self.controller.stop();
    }
}

#[cfg(test)]
mod tests {
    use std::{thread, time::Duration};

    use super::{Controller, MonitorService, ServiceState};
    use crate::{
        data::constant::MATCH_TEMPLATE,
        monitor::{
            browser::fake::RecordingBrowser,
            clipboard::fake::{Read, ScriptedClipboard},
            poller::Poller,
            MonitorConfig,
        },
        WorkerError,
    };

    const TICK: Duration = Duration::from_millis(5);

    fn poller(
        reads: Vec<Read>,
        browser: RecordingBrowser,
    ) -> Poller<ScriptedClipboard, RecordingBrowser> {
        let config = MonitorConfig {
            poll_interval: TICK,
            ..Default::default()
        };
        Poller::new(ScriptedClipboard::new(reads), browser, config)
    }

    #[test]
    fn start_then_stop() {
        let browser = RecordingBrowser::default();
        let controller = Controller::new();
        assert_eq!(controller.state(), ServiceState::Initialized);
        controller
            .start(poller(vec![Read::Text("A")], browser.clone()))
            .unwrap();
        assert_eq!(controller.state(), ServiceState::Running);
        thread::sleep(Duration::from_millis(50));
        controller.stop();
        assert_eq!(controller.state(), ServiceState::Stopped);
        assert!(controller.take_failure().is_none());
    }

    #[test]
    fn stop_passes_through_stop_pending_once() {
        let controller = Controller::new();
        controller
            .start(poller(vec![Read::Text("A")], RecordingBrowser::default()))
            .unwrap();
        thread::sleep(Duration::from_millis(20));
        controller.stop();
        controller.stop();
        controller.stop();
        assert_eq!(
            controller.history(),
            vec![
                ServiceState::Running,
                ServiceState::StopPending,
                ServiceState::Stopped
            ]
        );
    }

    #[test]
    fn stop_survives_poisoned_lock() {
        let controller = Controller::new();
        controller
            .start(poller(vec![], RecordingBrowser::default()))
            .unwrap();
        let handle = controller.clone();
        let _ = thread::spawn(move || {
            let _guard = handle.lock();
            panic!("poison the monitor lock");
        })
        .join();
        assert!(controller.shared.inner.is_poisoned());
        controller.stop();
        assert_eq!(controller.state(), ServiceState::Stopped);
        assert!(controller.wait_timeout(Duration::from_millis(10)));
    }

    #[test]
    fn no_browser_open_after_stopped() {
        let browser = RecordingBrowser::default();
        let controller = Controller::new();
        controller
            .start(poller(
                vec![Read::Text(MATCH_TEMPLATE), Read::Text("B")],
                browser.clone(),
            ))
            .unwrap();
        thread::sleep(Duration::from_millis(50));
        controller.stop();
        let opened = browser.count();
        assert_eq!(opened, 1);
        thread::sleep(Duration::from_millis(50));
        assert_eq!(browser.count(), opened);
    }

    #[test]
    fn stop_is_idempotent() {
        let controller = Controller::new();
        controller
            .start(poller(vec![], RecordingBrowser::default()))
            .unwrap();
        controller.stop();
        controller.stop();
        controller.clone().stop();
        assert_eq!(controller.state(), ServiceState::Stopped);
    }

    #[test]
    fn stop_before_start() {
        let controller = Controller::new();
        controller.stop();
        assert_eq!(controller.state(), ServiceState::Stopped);
        assert!(controller
            .start(poller(vec![], RecordingBrowser::default()))
            .is_err());
        assert_eq!(controller.state(), ServiceState::Stopped);
    }

    #[test]
    fn no_restart_after_stopped() {
        let controller = Controller::new();
        controller
            .start(poller(vec![], RecordingBrowser::default()))
            .unwrap();
        assert!(controller
            .start(poller(vec![], RecordingBrowser::default()))
            .is_err());
        controller.stop();
        assert!(controller
            .start(poller(vec![], RecordingBrowser::default()))
            .is_err());
        assert_eq!(controller.state(), ServiceState::Stopped);
    }

    #[test]
    fn concurrent_stop() {
        let controller = Controller::new();
        controller
            .start(poller(vec![], RecordingBrowser::default()))
            .unwrap();
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let c = controller.clone();
                thread::spawn(move || c.stop())
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert!(controller.wait_timeout(Duration::from_secs(1)));
    }

    #[test]
    fn worker_error_forces_stop() {
        let controller = Controller::new();
        controller
            .start(poller(
                vec![Read::Text(MATCH_TEMPLATE)],
                RecordingBrowser::failing(),
            ))
            .unwrap();
        assert!(controller.wait_timeout(Duration::from_secs(5)));
        assert!(matches!(
            controller.take_failure(),
            Some(WorkerError::Failed(_))
        ));
        controller.stop();
        assert_eq!(controller.state(), ServiceState::Stopped);
    }

    #[test]
    fn wait_returns_after_stop_from_other_thread() {
        let controller = Controller::new();
        controller
            .start(poller(vec![], RecordingBrowser::default()))
            .unwrap();
        let handle = controller.clone();
        let stopper = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            handle.stop();
        });
        controller.wait();
        stopper.join().unwrap();
        assert_eq!(controller.state(), ServiceState::Stopped);
    }

    #[test]
    fn service_hooks() {
        let browser = RecordingBrowser::default();
        let mut service = MonitorService::new(poller(vec![Read::Text("A")], browser));
        service.on_start().unwrap();
        assert_eq!(service.controller().state(), ServiceState::Running);
        assert!(service.on_start().is_err());
        service.on_stop();
        service.on_stop();
        assert_eq!(service.controller().state(), ServiceState::Stopped);
    }
}
