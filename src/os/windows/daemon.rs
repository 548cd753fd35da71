// region: use
use std::{
    ffi::OsString,
    sync::mpsc::{self, Receiver, RecvTimeoutError},
    time::Duration,
};

use anyhow::{Context, Result};
use windows_service::{
    define_windows_service,
    service::{
        ServiceControl, ServiceControlAccept, ServiceExitCode, ServiceState as ScmState,
        ServiceStatus, ServiceType,
    },
    service_control_handler::{self, ServiceControlHandlerResult, ServiceStatusHandle},
    service_dispatcher,
};

use super::{clipboard::Win32Clipboard, mutex::create_app_mutex, MONITOR_MUTEX_NAME, SERVICE_TYPE};
use crate::{
    data::constant::{POLL_INTERVAL, SERVICE_NAME},
    monitor::{Controller, MonitorConfig, MonitorService, Poller, ServiceState, SystemBrowser},
    ExpectWithTracing,
};
// endregion: use

pub struct DaemonMonitorDispatcher;

impl DaemonMonitorDispatcher {
    pub fn run(name: &str) -> Result<()> {
        service_dispatcher::start(name, ffi_service_main).context("Run daemon service")
    }
}

define_windows_service!(ffi_service_main, main);

fn main(arguments: Vec<OsString>) {
    log::debug!("Service arguments: {:?}", arguments);
    let name = arguments
        .get(0)
        .and_then(|n| n.to_str())
        .unwrap_or(SERVICE_NAME)
        .to_owned();
    log::debug!("Run service with name: {}", name);

    let service = DaemonMonitorService::new(&name, SERVICE_TYPE);
    if let Err(e) = service.run() {
        log::error!("Error while running service: {:?}", e);
    }
    log::info!("Service exit");
}

// region: Daemon service
#[derive(Debug)]
struct DaemonMonitorService {
    name: String,
    service_type: ServiceType,
    status_handle: ServiceStatusHandle,
    control_rx: Receiver<ServiceControl>,
}

impl DaemonMonitorService {
    pub fn new(name: &str, service_type: ServiceType) -> Self {
        let (control_tx, control_rx) = mpsc::channel();
        let event_handler = move |control_event| -> ServiceControlHandlerResult {
            log::info!("Event: {:?}", control_event);
            use ServiceControl::*;
            use ServiceControlHandlerResult::*;
            match control_event {
                Stop => {
                    control_tx.send(control_event).ok();
                    NoError
                }
                Interrogate => NoError,
                _ => NotImplemented,
            }
        };

        let status_handle = service_control_handler::register(name, event_handler)
            .expectx("Register service control handler");

        Self {
            name: name.to_string(),
            service_type,
            status_handle,
            control_rx,
        }
    }

    pub fn run(self) -> Result<()> {
        self.update_state(SSP_START_PENDING, ServiceExitCode::Win32(0));

        let _mutex = match create_app_mutex(MONITOR_MUTEX_NAME) {
            Ok(m) => m,
            Err(e) => {
                self.update_state(SSP_STOPPED, ServiceExitCode::ServiceSpecific(1));
                return Err(e);
            }
        };

        let poller = Poller::new(Win32Clipboard, SystemBrowser, MonitorConfig::default());
        let mut service = MonitorService::new(poller);
        if let Err(e) = service.on_start() {
            self.update_state(SSP_STOPPED, ServiceExitCode::ServiceSpecific(1));
            return Err(e);
        }
        self.update_state(SSP_RUNNING, ServiceExitCode::Win32(0));

        self.wait_stop(service.controller());

        self.update_state(SSP_STOP_PENDING, ServiceExitCode::Win32(0));
        service.on_stop();

        let exit_code = match service.controller().take_failure() {
            Some(e) => {
                log::error!("Monitor stopped by error: {}", e);
                ServiceExitCode::ServiceSpecific(1)
            }
            None => ServiceExitCode::Win32(0),
        };
        self.update_state(SSP_STOPPED, exit_code);
        Ok(())
    }

    /// Returns on a Stop control, or when the monitor has stopped by itself.
    fn wait_stop(&self, controller: &Controller) {
        loop {
            match self.control_rx.recv_timeout(POLL_INTERVAL) {
                Ok(ServiceControl::Stop) | Err(RecvTimeoutError::Disconnected) => return,
                Ok(_) => {}
                Err(RecvTimeoutError::Timeout) => {
                    if controller.state() == ServiceState::Stopped {
                        return;
                    }
                }
            }
        }
    }

    fn update_state(&self, ssp: ServiceStatePreset, exit_code: ServiceExitCode) {
        self.status_handle
            .set_service_status(ServiceStatus {
                service_type: self.service_type,
                current_state: ssp.0,
                controls_accepted: ssp.1,
                exit_code,
                checkpoint: 0,
                wait_hint: ssp.2,
                process_id: None,
            })
            .expectx("Set service status");
        log::debug!("Set {} state to: {:?} success", self.name, ssp.0);
    }
}
// endregion: Daemon service

// region: ServiceState and ControlAccept
const SCA_EMPTY: ServiceControlAccept = ServiceControlAccept::empty();
const SCA_STOP: ServiceControlAccept = ServiceControlAccept::STOP;
const NO_WAIT: Duration = Duration::ZERO;
/// One poll plus one clipboard access.
const STOP_WAIT: Duration = Duration::from_secs(3);

struct ServiceStatePreset(ScmState, ServiceControlAccept, Duration);

macro_rules! service_state {
    () => {};
    ($($name:ident = $state:ident $sca:ident $wait:ident),+$(,)?) => {
        $(
            const $name: ServiceStatePreset = ServiceStatePreset(ScmState::$state, $sca, $wait);
        )*
    };
}

service_state!(
    SSP_START_PENDING = StartPending SCA_EMPTY NO_WAIT,
    SSP_RUNNING = Running SCA_STOP NO_WAIT,
    SSP_STOP_PENDING = StopPending SCA_EMPTY STOP_WAIT,
    SSP_STOPPED = Stopped SCA_EMPTY NO_WAIT,
);
// endregion: ServiceState and ControlAccept
