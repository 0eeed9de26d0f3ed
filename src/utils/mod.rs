pub mod error;
pub mod logger;
pub mod system_info;
pub mod validation;
