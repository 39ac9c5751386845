use plusplus_core::config::{AppConfig, LoadOptions};
use plusplus_db::open_point_store;
use secrecy::ExposeSecret;
use serde::Serialize;

use crate::commands::config::redact_token;

/// Key read by the connectivity probe. Reads never create records.
const PROBE_KEY: &str = "__doctor_probe__";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum CheckStatus {
    Pass,
    Fail,
    Skipped,
}

#[derive(Debug, Serialize)]
struct DoctorCheck {
    name: &'static str,
    status: CheckStatus,
    details: String,
}

#[derive(Debug, Serialize)]
struct DoctorReport {
    overall_status: CheckStatus,
    summary: String,
    checks: Vec<DoctorCheck>,
}

pub fn run(json_output: bool) -> String {
    let report = build_report();

    if json_output {
        return serde_json::to_string_pretty(&report).unwrap_or_else(|error| {
            format!(
                "{{\"overall_status\":\"fail\",\"summary\":\"doctor serialization failed\",\"error\":\"{}\"}}",
                escape_json(&error.to_string())
            )
        });
    }

    render_human(&report)
}

fn build_report() -> DoctorReport {
    let mut checks = Vec::new();

    match AppConfig::load(LoadOptions::default()) {
        Ok(config) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Pass,
                details: format!(
                    "configuration loaded and validated (storage backend: {})",
                    config.storage.backend.as_str()
                ),
            });
            checks.push(check_slack_tokens(&config));
            checks.push(check_store_connectivity(&config));
        }
        Err(error) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Fail,
                details: error.to_string(),
            });
            checks.push(DoctorCheck {
                name: "slack_token_readiness",
                status: CheckStatus::Skipped,
                details: "skipped because configuration did not load".to_string(),
            });
            checks.push(DoctorCheck {
                name: "store_connectivity",
                status: CheckStatus::Skipped,
                details: "skipped because configuration did not load".to_string(),
            });
        }
    }

    let all_pass = checks.iter().all(|check| check.status == CheckStatus::Pass);
    let overall_status = if all_pass { CheckStatus::Pass } else { CheckStatus::Fail };
    let summary = if all_pass {
        "doctor: all readiness checks passed".to_string()
    } else {
        "doctor: one or more readiness checks failed".to_string()
    };

    DoctorReport { overall_status, summary, checks }
}

fn check_slack_tokens(config: &AppConfig) -> DoctorCheck {
    DoctorCheck {
        name: "slack_token_readiness",
        status: CheckStatus::Pass,
        details: format!(
            "app token {} and bot token {} have the expected prefixes",
            redact_token(config.slack.app_token.expose_secret()),
            redact_token(config.slack.bot_token.expose_secret()),
        ),
    }
}

fn check_store_connectivity(config: &AppConfig) -> DoctorCheck {
    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return DoctorCheck {
                name: "store_connectivity",
                status: CheckStatus::Fail,
                details: format!("failed to initialize async runtime: {error}"),
            };
        }
    };

    let result = runtime.block_on(async {
        let store = open_point_store(config)
            .await
            .map_err(|error| format!("failed to open point store: {error}"))?;
        let probe = store.get_points(PROBE_KEY).await;
        let closed = store.close().await;

        probe.map_err(|error| format!("point store read failed: {error}"))?;
        closed.map_err(|error| format!("point store did not close cleanly: {error}"))?;
        Ok::<&'static str, String>(store.backend_name())
    });

    match result {
        Ok(backend) => DoctorCheck {
            name: "store_connectivity",
            status: CheckStatus::Pass,
            details: format!("{backend} store answered a read probe"),
        },
        Err(error) => {
            DoctorCheck { name: "store_connectivity", status: CheckStatus::Fail, details: error }
        }
    }
}

fn render_human(report: &DoctorReport) -> String {
    let mut lines = Vec::new();
    lines.push(report.summary.clone());

    for check in &report.checks {
        let marker = match check.status {
            CheckStatus::Pass => "ok",
            CheckStatus::Fail => "fail",
            CheckStatus::Skipped => "skip",
        };
        lines.push(format!("- [{marker}] {}: {}", check.name, check.details));
    }

    lines.join("\n")
}

fn escape_json(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}
