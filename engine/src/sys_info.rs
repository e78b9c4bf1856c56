//! Environment report for the `/info` endpoint.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sysinfo::System;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvironmentInfo {
    pub machine_name: String,
    pub process_id: u32,
    pub processor_count: usize,
    pub physical_core_count: usize,
    pub cpu_model: Option<String>,
    pub os_version: String,
    pub kernel_version: Option<String>,
    pub architecture: &'static str,
    pub total_memory: String,
    pub available_memory: String,
    pub timestamp: DateTime<Utc>,
}

/// Format bytes to human-readable format
fn get_size_format(bytes: u64, factor: u64, suffix: &str) -> String {
    let units = ["", "K", "M", "G", "T", "P"];
    let mut size = bytes as f64;
    let mut unit_index = 0;

    while size >= factor as f64 && unit_index < units.len() - 1 {
        size /= factor as f64;
        unit_index += 1;
    }

    format!("{:.2} {}{}", size, units[unit_index], suffix)
}

pub fn collect() -> EnvironmentInfo {
    let mut sys = System::new_all();
    sys.refresh_memory();

    EnvironmentInfo {
        machine_name: System::host_name().unwrap_or_else(|| "unknown".to_string()),
        process_id: std::process::id(),
        processor_count: num_cpus::get(),
        physical_core_count: num_cpus::get_physical(),
        cpu_model: sys.cpus().first().map(|cpu| cpu.brand().trim().to_string()),
        os_version: System::long_os_version().unwrap_or_else(|| std::env::consts::OS.to_string()),
        kernel_version: System::kernel_version(),
        architecture: std::env::consts::ARCH,
        total_memory: get_size_format(sys.total_memory(), 1024, "B"),
        available_memory: get_size_format(sys.available_memory(), 1024, "B"),
        timestamp: Utc::now(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_size_format() {
        assert_eq!(get_size_format(512, 1024, "B"), "512.00 B");
        assert_eq!(get_size_format(1536, 1024, "B"), "1.50 KB");
        assert_eq!(get_size_format(8 * 1024 * 1024 * 1024, 1024, "B"), "8.00 GB");
    }

    #[test]
    fn test_collect_reports_this_process() {
        let info = collect();
        assert_eq!(info.process_id, std::process::id());
        assert!(info.processor_count >= 1);
        assert!(!info.machine_name.is_empty());
    }
}
