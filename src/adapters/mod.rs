// Adapters layer: concrete implementations for external systems (storage, processes, http).

pub mod http;
pub mod process;
pub mod storage;
pub mod terminal;

pub use http::HttpProbe;
pub use process::SystemRunner;
pub use storage::LocalStorage;
pub use terminal::TerminalPrompt;
