pub mod context;
pub mod provisioner;
pub mod sequence;
pub mod templates;

pub use crate::domain::model::{CommandOutput, CommandSpec, HostContext, InstallLayout, StepReport};
pub use crate::domain::ports::{CommandRunner, ConnectivityProbe, Prompt, Storage};
pub use crate::utils::error::Result;
