use crate::app::AppState;
use axum::{extract::State, Json};
use chrono::Utc;
use serde_json::json;

pub const APP_NAME: &str = "hlf-lab-test-app";

pub async fn root(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({
        "message": "HLF Test Application",
        "environment": state.cfg.environment,
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": Utc::now().to_rfc3339(),
    }))
}

pub async fn info(State(state): State<AppState>) -> Json<serde_json::Value> {
    let memory = memory_usage();
    let database = match &state.db {
        Some(pool) => json!({
            "configured": true,
            "size": pool.size(),
            "idle": pool.idle(),
            "closed": pool.is_closed(),
        }),
        None => json!({ "configured": false }),
    };

    Json(json!({
        "application": APP_NAME,
        "version": env!("CARGO_PKG_VERSION"),
        "environment": state.cfg.environment,
        "runtime": "tokio",
        "platform": std::env::consts::OS,
        "arch": std::env::consts::ARCH,
        "memory": {
            "rss": memory.rss_kb.map(megabytes),
            "virtual": memory.virtual_kb.map(megabytes),
        },
        "database": database,
        "uptime": format!("{} seconds", state.started.elapsed().as_secs()),
    }))
}

#[derive(Debug, Default, PartialEq, Eq)]
struct MemoryUsage {
    rss_kb: Option<u64>,
    virtual_kb: Option<u64>,
}

fn megabytes(kb: u64) -> String {
    format!("{} MB", (kb + 512) / 1024)
}

#[cfg(target_os = "linux")]
fn memory_usage() -> MemoryUsage {
    std::fs::read_to_string("/proc/self/status")
        .map(|s| parse_proc_status(&s))
        .unwrap_or_default()
}

#[cfg(not(target_os = "linux"))]
fn memory_usage() -> MemoryUsage {
    MemoryUsage::default()
}

fn parse_proc_status(status: &str) -> MemoryUsage {
    let field = |name: &str| {
        status
            .lines()
            .find_map(|l| l.strip_prefix(name))
            .and_then(|rest| rest.trim().trim_end_matches("kB").trim().parse::<u64>().ok())
    };
    MemoryUsage {
        rss_kb: field("VmRSS:"),
        virtual_kb: field("VmSize:"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_proc_status_fields() {
        let status = "Name:\tprobe\nVmSize:\t  204800 kB\nVmRSS:\t   10240 kB\n";
        assert_eq!(
            parse_proc_status(status),
            MemoryUsage {
                rss_kb: Some(10240),
                virtual_kb: Some(204800),
            }
        );
        assert_eq!(megabytes(10240), "10 MB");
    }

    #[test]
    fn missing_fields_are_none() {
        assert_eq!(parse_proc_status("Name:\tprobe\n"), MemoryUsage::default());
    }
}
