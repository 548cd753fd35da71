use std::{
    ffi::OsString,
    path::PathBuf,
    time::{Duration, Instant},
};

use anyhow::{bail, Result};
use windows::Win32::Foundation::ERROR_SERVICE_DOES_NOT_EXIST;
use windows_service::{
    service::{
        Service, ServiceAccess, ServiceErrorControl, ServiceInfo, ServiceStartType, ServiceState,
        ServiceType,
    },
    service_manager::{ServiceManager, ServiceManagerAccess},
};

use super::SystemServiceController;

pub struct WindowsServiceController {
    service_type: ServiceType,
    service_name: String,
    display_name: String,
    description: String,
    executable_path: PathBuf,
    uninstall_timeout: u64,
}

fn is_not_installed(e: &windows_service::Error) -> bool {
    match e {
        windows_service::Error::Winapi(e) => {
            e.raw_os_error() == Some(ERROR_SERVICE_DOES_NOT_EXIST.0 as _)
        }
        _ => false,
    }
}

impl WindowsServiceController {
    pub fn new(
        service_type: ServiceType,
        service_name: String,
        display_name: String,
        description: String,
        executable_path: PathBuf,
        uninstall_timeout: u64,
    ) -> Self {
        Self {
            service_type,
            service_name,
            display_name,
            description,
            executable_path,
            uninstall_timeout,
        }
    }

    fn manager(&self) -> Result<ServiceManager> {
        Ok(ServiceManager::local_computer(
            None::<&str>,
            ServiceManagerAccess::CONNECT,
        )?)
    }

    fn open(&self, access: ServiceAccess) -> Result<Service> {
        match self.manager()?.open_service(&self.service_name, access) {
            Ok(s) => Ok(s),
            Err(e) if is_not_installed(&e) => bail!("{} not installed", self.service_name),
            Err(e) => Err(e.into()),
        }
    }

    fn wait(&self, service: Service, state: ServiceState, timeout: Duration) -> Result<Service> {
        let start = Instant::now();
        while start.elapsed() < timeout {
            if service.query_status()?.current_state == state {
                println!("{:?}", state);
                return Ok(service);
            }
            std::thread::sleep(Duration::from_millis(50));
        }
        bail!("wait {:?} {:?} timeout", self.service_name, state)
    }
}

/// Long enough for the monitor to finish one poll.
const STATE_TIMEOUT: Duration = Duration::from_secs(5);

impl SystemServiceController for WindowsServiceController {
    fn install(&self, arguments: Vec<OsString>) -> Result<()> {
        let service_name = &self.service_name;
        let manager_access = ServiceManagerAccess::CONNECT | ServiceManagerAccess::CREATE_SERVICE;
        let service_manager = ServiceManager::local_computer(None::<&str>, manager_access)?;

        if service_manager
            .open_service(service_name, ServiceAccess::QUERY_STATUS)
            .is_ok()
        {
            bail!("{} has installed", service_name);
        }

        let service_info = ServiceInfo {
            name: service_name.into(),
            display_name: self.display_name.clone().into(),
            service_type: self.service_type,
            start_type: ServiceStartType::AutoStart,
            error_control: ServiceErrorControl::Normal,
            executable_path: self.executable_path.clone(),
            launch_arguments: arguments,
            dependencies: vec![],
            account_name: None,
            account_password: None,
        };
        let service =
            service_manager.create_service(&service_info, ServiceAccess::CHANGE_CONFIG)?;
        service.set_description(&self.description)?;
        println!("{} installed", service_name);

        Ok(())
    }

    fn start(&self, arguments: Vec<OsString>) -> Result<()> {
        let service = self.open(ServiceAccess::QUERY_STATUS | ServiceAccess::START)?;
        let state = service.query_status()?.current_state;
        if state != ServiceState::Stopped {
            bail!("{} is {:?}", self.service_name, state)
        }
        println!("Start {}", self.service_name);
        service.start(&arguments)?;
        self.wait(service, ServiceState::Running, STATE_TIMEOUT)?;
        Ok(())
    }

    fn restart(&self, arguments: Vec<OsString>) -> Result<()> {
        let service = self.open(
            ServiceAccess::QUERY_STATUS | ServiceAccess::START | ServiceAccess::STOP,
        )?;
        if service.query_status()?.current_state != ServiceState::Stopped {
            println!("Stop {}", self.service_name);
            service.stop()?;
        }
        let service = self.wait(service, ServiceState::Stopped, STATE_TIMEOUT)?;

        println!("Start {}", self.service_name);
        service.start(&arguments)?;
        self.wait(service, ServiceState::Running, STATE_TIMEOUT)?;
        Ok(())
    }

    fn stop(&self) -> Result<()> {
        let service = self.open(ServiceAccess::QUERY_STATUS | ServiceAccess::STOP)?;
        if service.query_status()?.current_state == ServiceState::Stopped {
            bail!("{} has stopped", self.service_name)
        }
        println!("Stop {}", self.service_name);
        service.stop()?;
        self.wait(service, ServiceState::Stopped, STATE_TIMEOUT)?;
        Ok(())
    }

    fn status(&self) -> Result<()> {
        let service = self.open(ServiceAccess::QUERY_STATUS)?;
        let status = service.query_status()?;
        println!("{:?}", status.current_state);
        Ok(())
    }

    fn uninstall(&self) -> Result<()> {
        let service_name = &self.service_name;
        let service_manager = self.manager()?;
        let service = self.open(
            ServiceAccess::QUERY_STATUS | ServiceAccess::STOP | ServiceAccess::DELETE,
        )?;
        if service.query_status()?.current_state == ServiceState::Running {
            bail!("{} is {:?}", service_name, ServiceState::Running)
        }

        service.delete()?;
        if service.query_status()?.current_state != ServiceState::Stopped {
            service.stop()?;
        }
        drop(service);

        let start = Instant::now();
        let timeout = Duration::from_secs(self.uninstall_timeout);
        while start.elapsed() < timeout {
            if let Err(e) = service_manager.open_service(service_name, ServiceAccess::QUERY_STATUS)
            {
                if is_not_installed(&e) {
                    println!("{} is deleted", service_name);
                    return Ok(());
                }
            }
            std::thread::sleep(Duration::from_secs(1));
        }
        println!("{} is marked for deletion", service_name);

        Ok(())
    }
}
