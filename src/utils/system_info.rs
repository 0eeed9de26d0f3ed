use serde::{Deserialize, Serialize};
#[cfg(feature = "cli")]
use sysinfo::System;

const DEVICE_TREE_MODEL: &str = "/proc/device-tree/model";

/// 主機資訊，僅用於摘要與日誌
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct HostFacts {
    pub os: Option<String>,
    pub kernel: Option<String>,
    pub hostname: Option<String>,
    pub total_memory_mb: Option<u64>,
    pub board_model: Option<String>,
}

impl HostFacts {
    #[cfg(feature = "cli")]
    pub fn collect() -> Self {
        let mut system = System::new();
        system.refresh_memory();

        let os = match (System::name(), System::os_version()) {
            (Some(name), Some(version)) => Some(format!("{} {}", name, version)),
            (name, _) => name,
        };

        Self {
            os,
            kernel: System::kernel_version(),
            hostname: System::host_name(),
            total_memory_mb: Some(system.total_memory() / 1024 / 1024),
            board_model: read_board_model(),
        }
    }

    // 為非CLI環境提供精簡實現
    #[cfg(not(feature = "cli"))]
    pub fn collect() -> Self {
        Self {
            board_model: read_board_model(),
            ..Self::default()
        }
    }

    pub fn is_raspberry_pi(&self) -> bool {
        self.board_model
            .as_deref()
            .map(|model| model.contains("Raspberry Pi"))
            .unwrap_or(false)
    }

    pub fn log_facts(&self) {
        tracing::info!(
            "🖥️ Host: {} | OS: {} | Kernel: {} | Memory: {}MB | Board: {}",
            self.hostname.as_deref().unwrap_or("unknown"),
            self.os.as_deref().unwrap_or("unknown"),
            self.kernel.as_deref().unwrap_or("unknown"),
            self.total_memory_mb
                .map(|m| m.to_string())
                .unwrap_or_else(|| "?".to_string()),
            self.board_model.as_deref().unwrap_or("unknown"),
        );
    }
}

fn read_board_model() -> Option<String> {
    std::fs::read(DEVICE_TREE_MODEL)
        .ok()
        .map(|raw| parse_board_model(&raw))
        .filter(|model| !model.is_empty())
}

/// device-tree 的字串以 NUL 結尾
fn parse_board_model(raw: &[u8]) -> String {
    String::from_utf8_lossy(raw)
        .trim_end_matches('\0')
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_board_model_strips_nul() {
        let raw = b"Raspberry Pi 3 Model B Rev 1.2\0";
        assert_eq!(parse_board_model(raw), "Raspberry Pi 3 Model B Rev 1.2");
    }

    #[test]
    fn test_is_raspberry_pi() {
        let facts = HostFacts {
            board_model: Some("Raspberry Pi 4 Model B Rev 1.4".to_string()),
            ..HostFacts::default()
        };
        assert!(facts.is_raspberry_pi());
        assert!(!HostFacts::default().is_raspberry_pi());
    }
}
