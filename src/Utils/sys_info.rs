/*
A tool for pretty printing system information about the computer. Stored next to the timings of the
compared solvers, so that the numbers can be put in context.
*/
use log::info;
use serde::Serialize;
use tabled::settings::Style;
use tabled::{Table, Tabled};

#[derive(Debug, Clone, PartialEq, Tabled, Serialize)]
pub struct SystemInfo {
    pub key: &'static str,
    pub value: String,
}

fn or_unknown<T: ToString, E>(value: Result<T, E>) -> String {
    value
        .map(|v| v.to_string())
        .unwrap_or_else(|_| "unknown".to_string())
}

/// Collects what sys-info can tell about the machine; entries that cannot be read are "unknown".
pub fn this_system_info() -> Vec<SystemInfo> {
    let disk_info = sys_info::disk_info().ok();
    let loadavg = sys_info::loadavg().ok();
    let mem_info = sys_info::mem_info().ok();
    let unknown = || "unknown".to_string();

    let system_info = vec![
        SystemInfo {
            key: "CPU Cores",
            value: or_unknown(sys_info::cpu_num()),
        },
        SystemInfo {
            key: "CPU Speed (MHz)",
            value: or_unknown(sys_info::cpu_speed()),
        },
        SystemInfo {
            key: "Disk Total (KB)",
            value: disk_info.as_ref().map_or_else(unknown, |d| d.total.to_string()),
        },
        SystemInfo {
            key: "Disk Free (KB)",
            value: disk_info.as_ref().map_or_else(unknown, |d| d.free.to_string()),
        },
        SystemInfo {
            key: "Load Average (1 min)",
            value: loadavg.as_ref().map_or_else(unknown, |l| l.one.to_string()),
        },
        SystemInfo {
            key: "Load Average (5 min)",
            value: loadavg.as_ref().map_or_else(unknown, |l| l.five.to_string()),
        },
        SystemInfo {
            key: "Memory Total (KB)",
            value: mem_info.as_ref().map_or_else(unknown, |m| m.total.to_string()),
        },
        SystemInfo {
            key: "Memory Free (KB)",
            value: mem_info.as_ref().map_or_else(unknown, |m| m.free.to_string()),
        },
        SystemInfo {
            key: "OS Type",
            value: or_unknown(sys_info::os_type()),
        },
        SystemInfo {
            key: "OS Release",
            value: or_unknown(sys_info::os_release()),
        },
        SystemInfo {
            key: "Rayon Threads",
            value: rayon::current_num_threads().to_string(),
        },
    ];
    system_info
}

pub fn system_info_table(system_info: &[SystemInfo]) -> String {
    let mut table = Table::new(system_info);
    table.with(Style::modern_rounded());
    table.to_string()
}

pub fn log_system_info() -> Vec<SystemInfo> {
    let system_info = this_system_info();
    info!("System Information\n{}", system_info_table(&system_info));
    system_info
}
