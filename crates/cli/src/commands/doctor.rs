use serde::Serialize;
use shopdesk_core::config::{AppConfig, LoadOptions};
use shopdesk_db::{connect_with_settings, migrations::MIGRATOR};

use crate::commands::CommandResult;

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

/// Exit code is 0 when every check passes and 6 otherwise.
pub fn run(json_output: bool) -> CommandResult {
    let report = build_report();
    let exit_code = if report.overall_status == CheckStatus::Pass { 0 } else { 6 };

    if json_output {
        let output = serde_json::to_string_pretty(&report).unwrap_or_else(|error| {
            format!(
                "{{\"overall_status\":\"fail\",\"summary\":\"doctor serialization failed\",\"error\":\"{}\"}}",
                escape_json(&error.to_string())
            )
        });
        return CommandResult { exit_code, output };
    }

    CommandResult { exit_code, output: render_human(&report) }
}

fn build_report() -> DoctorReport {
    let mut checks = Vec::new();

    match AppConfig::load(LoadOptions::default()) {
        Ok(config) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Pass,
                details: "configuration loaded and validated".to_string(),
            });
            checks.push(check_llm_readiness(&config));
            checks.extend(check_database(&config));
        }
        Err(error) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Fail,
                details: error.to_string(),
            });
            for name in ["llm_readiness", "database_connectivity", "schema_migrations"] {
                checks.push(skipped(name, "configuration did not load"));
            }
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

fn skipped(name: &'static str, reason: &str) -> DoctorCheck {
    DoctorCheck { name, status: CheckStatus::Skipped, details: format!("skipped because {reason}") }
}

fn check_llm_readiness(config: &AppConfig) -> DoctorCheck {
    let key_state = match (&config.llm.api_key, config.llm.provider.requires_api_key()) {
        (Some(_), _) => "api key present",
        (None, false) => "no api key required",
        (None, true) => {
            return DoctorCheck {
                name: "llm_readiness",
                status: CheckStatus::Fail,
                details: format!("{:?} requires an api key", config.llm.provider),
            };
        }
    };

    DoctorCheck {
        name: "llm_readiness",
        status: CheckStatus::Pass,
        details: format!(
            "{:?} model `{}` at {} ({key_state})",
            config.llm.provider,
            config.llm.model,
            config.llm.effective_base_url()
        ),
    }
}

/// Connectivity plus a comparison of applied migrations against the embedded
/// set. Doctor never applies migrations itself.
fn check_database(config: &AppConfig) -> Vec<DoctorCheck> {
    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return vec![
                DoctorCheck {
                    name: "database_connectivity",
                    status: CheckStatus::Fail,
                    details: format!("failed to initialize async runtime: {error}"),
                },
                skipped("schema_migrations", "the async runtime did not start"),
            ];
        }
    };

    runtime.block_on(async {
        let pool = match connect_with_settings(
            &config.database.url,
            config.database.max_connections,
            config.database.timeout_secs,
        )
        .await
        {
            Ok(pool) => pool,
            Err(error) => {
                return vec![
                    DoctorCheck {
                        name: "database_connectivity",
                        status: CheckStatus::Fail,
                        details: format!("failed to connect to database: {error}"),
                    },
                    skipped("schema_migrations", "the database is unreachable"),
                ];
            }
        };

        let connectivity = DoctorCheck {
            name: "database_connectivity",
            status: CheckStatus::Pass,
            details: format!("connected using `{}`", config.database.url),
        };

        let expected = MIGRATOR.iter().count() as i64;
        let applied = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM _sqlx_migrations WHERE success = 1",
        )
        .fetch_one(&pool)
        .await
        .unwrap_or(0);
        pool.close().await;

        let schema = if applied >= expected {
            DoctorCheck {
                name: "schema_migrations",
                status: CheckStatus::Pass,
                details: format!("{applied} of {expected} migrations applied"),
            }
        } else {
            DoctorCheck {
                name: "schema_migrations",
                status: CheckStatus::Fail,
                details: format!(
                    "{applied} of {expected} migrations applied; run `shopdesk migrate`"
                ),
            }
        };

        vec![connectivity, schema]
    })
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

#[cfg(test)]
mod tests {
    use super::{render_human, skipped, CheckStatus, DoctorCheck, DoctorReport};

    #[test]
    fn human_report_marks_each_check() {
        let report = DoctorReport {
            overall_status: CheckStatus::Fail,
            summary: "doctor: one or more readiness checks failed".to_string(),
            checks: vec![
                DoctorCheck {
                    name: "config_validation",
                    status: CheckStatus::Pass,
                    details: "configuration loaded and validated".to_string(),
                },
                DoctorCheck {
                    name: "llm_readiness",
                    status: CheckStatus::Fail,
                    details: "Groq requires an api key".to_string(),
                },
                skipped("schema_migrations", "the database is unreachable"),
            ],
        };

        assert_eq!(
            render_human(&report),
            "doctor: one or more readiness checks failed\n\
             - [ok] config_validation: configuration loaded and validated\n\
             - [fail] llm_readiness: Groq requires an api key\n\
             - [skip] schema_migrations: skipped because the database is unreachable"
        );
    }
}
