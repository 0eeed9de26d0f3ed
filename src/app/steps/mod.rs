pub mod artifacts;
pub mod finish;
pub mod host;
pub mod network;
pub mod patch;
pub mod python;
pub mod repository;
pub mod system;

use crate::core::sequence::ProvisionStep;

/// 標準佈署順序
pub fn standard_steps() -> Vec<Box<dyn ProvisionStep>> {
    vec![
        Box::new(host::DetectHostStep),
        Box::new(host::CheckPrivilegesStep),
        Box::new(network::CheckNetworkStep),
        Box::new(system::InstallPackagesStep),
        Box::new(system::SerialAccessStep),
        Box::new(python::PythonEnvStep),
        Box::new(repository::FetchRepositoryStep),
        Box::new(patch::PatchConfigStep),
        Box::new(artifacts::LauncherStep),
        Box::new(artifacts::ServiceUnitStep),
        Box::new(artifacts::LogRotationStep),
        Box::new(artifacts::ScheduleStep),
        Box::new(finish::SummaryStep),
        Box::new(python::SmokeTestStep),
        Box::new(finish::RebootStep),
    ]
}
