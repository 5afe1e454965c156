use serde::{Deserialize, Serialize};

/// System memory probe consumed by the resource manager's admission policy.
///
/// Behind a trait so tests can pin memory conditions instead of depending
/// on the host the suite happens to run on.
pub trait SystemInfo: Send + Sync {
    fn available_memory_mb(&self) -> u64;
    fn total_memory_mb(&self) -> u64;
}

/// Memory usage snapshot reported by the resource manager
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryStats {
    pub total_mb: u64,
    pub available_mb: u64,
    pub used_mb: u64,
    pub percent: f64,
}

/// Reads memory statistics from /proc/meminfo.
///
/// The service targets Linux deployments; a probe failure reports zero
/// available memory, which keeps the admission policy conservative.
#[derive(Debug, Default)]
pub struct ProcSystemInfo;

impl ProcSystemInfo {
    fn read_field(field: &str) -> u64 {
        let contents = match std::fs::read_to_string("/proc/meminfo") {
            Ok(contents) => contents,
            Err(e) => {
                tracing::warn!("Failed to read /proc/meminfo: {}", e);
                return 0;
            }
        };

        for line in contents.lines() {
            if let Some(rest) = line.strip_prefix(field) {
                let kb = rest
                    .trim_start_matches(':')
                    .trim()
                    .trim_end_matches(" kB")
                    .parse::<u64>()
                    .unwrap_or(0);
                return kb / 1024;
            }
        }

        tracing::warn!("Field {} missing from /proc/meminfo", field);
        0
    }
}

impl SystemInfo for ProcSystemInfo {
    fn available_memory_mb(&self) -> u64 {
        Self::read_field("MemAvailable")
    }

    fn total_memory_mb(&self) -> u64 {
        Self::read_field("MemTotal")
    }
}

/// Fixed memory readings for tests and non-Linux development hosts
#[derive(Debug, Clone, Copy)]
pub struct FixedSystemInfo {
    pub available_mb: u64,
    pub total_mb: u64,
}

impl SystemInfo for FixedSystemInfo {
    fn available_memory_mb(&self) -> u64 {
        self.available_mb
    }

    fn total_memory_mb(&self) -> u64 {
        self.total_mb
    }
}
