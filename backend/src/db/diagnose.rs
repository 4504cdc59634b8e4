//! Database connectivity probe behind `GET /api/diagnose`.
//!
//! The probe opens its own connection from `DATABASE_URL` (never the pool),
//! runs `SELECT NOW()` and a row count per catalog table, then closes it.
//! Probe failures are reported in the body, not as errors.

use serde::Serialize;

use super::config::environment_name;

/// Variables whose presence (never their value) is reported.
pub const REPORTED_ENV_VARS: [&str; 6] = [
    "PGHOST",
    "PGUSER",
    "PGDATABASE",
    "PGPORT",
    "SUPABASE_URL",
    "SUPABASE_KEY",
];

/// Database verdict, serialized with the tokens the status page expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DatabaseStatus {
    #[serde(rename = "ok")]
    Ok,
    #[serde(rename = "erro")]
    Error,
    #[serde(rename = "desconhecido")]
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnvVarStatus {
    pub name: &'static str,
    pub configured: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiagnoseReport {
    pub api: &'static str,
    pub database: DatabaseStatus,
    pub checks: Vec<String>,
    pub errors: Vec<String>,
    pub environment: String,
    pub environment_variables: Vec<EnvVarStatus>,
    #[serde(skip)]
    missing_database_url: bool,
}

impl DiagnoseReport {
    fn new() -> Self {
        Self {
            api: "ok",
            database: DatabaseStatus::Unknown,
            checks: Vec::new(),
            errors: Vec::new(),
            environment: environment_name(),
            environment_variables: REPORTED_ENV_VARS
                .iter()
                .map(|name| EnvVarStatus {
                    name,
                    configured: std::env::var(name).map(|v| !v.is_empty()).unwrap_or(false),
                })
                .collect(),
            missing_database_url: false,
        }
    }

    fn fail(&mut self, message: impl Into<String>) {
        self.database = DatabaseStatus::Error;
        self.errors.push(message.into());
    }

    /// HTTP status for the report: 500 only when there was nothing to probe.
    pub fn status_code(&self) -> u16 {
        if self.missing_database_url {
            500
        } else {
            200
        }
    }
}

/// Probe the database at `database_url`.
pub async fn run(database_url: Option<String>) -> DiagnoseReport {
    let mut report = DiagnoseReport::new();

    let Some(url) = database_url.filter(|u| !u.trim().is_empty()) else {
        report.fail("DATABASE_URL is not configured");
        report.missing_database_url = true;
        return report;
    };
    report.checks.push("DATABASE_URL is configured".to_string());

    let report = probe(url, report).await;
    if report.database != DatabaseStatus::Ok {
        log::warn!("Database diagnose failed: {}", report.errors.join("; "));
    }
    report
}

#[cfg(feature = "postgres-repo")]
async fn probe(url: String, report: DiagnoseReport) -> DiagnoseReport {
    let snapshot = report.clone();
    match tokio::task::spawn_blocking(move || sql::probe_blocking(&url, report)).await {
        Ok(report) => report,
        Err(e) => {
            let mut report = snapshot;
            report.fail(format!("diagnose task failed: {}", e));
            report
        }
    }
}

#[cfg(not(feature = "postgres-repo"))]
async fn probe(_url: String, mut report: DiagnoseReport) -> DiagnoseReport {
    report.fail("raw SQL support is not compiled in (enable the postgres-repo feature)");
    report
}

#[cfg(feature = "postgres-repo")]
mod sql {
    use diesel::prelude::*;
    use diesel::sql_query;
    use diesel::sql_types::{BigInt, Text};

    use super::{DatabaseStatus, DiagnoseReport};
    use crate::db::schema::ALL_TABLES;

    #[derive(QueryableByName)]
    struct Now {
        #[diesel(sql_type = Text)]
        now: String,
    }

    #[derive(QueryableByName)]
    struct Count {
        #[diesel(sql_type = BigInt)]
        count: i64,
    }

    pub(super) fn probe_blocking(url: &str, mut report: DiagnoseReport) -> DiagnoseReport {
        let mut conn = match PgConnection::establish(url) {
            Ok(conn) => conn,
            Err(e) => {
                report.fail(format!("database connection failed: {}", e));
                return report;
            }
        };

        match sql_query("SELECT NOW()::text AS now").get_result::<Now>(&mut conn) {
            Ok(row) => {
                report.database = DatabaseStatus::Ok;
                report
                    .checks
                    .push(format!("database connection established at {}", row.now));
            }
            Err(e) => {
                report.fail(format!("database connection failed: {}", e));
                return report;
            }
        }

        for table in ALL_TABLES.iter() {
            let query = format!("SELECT COUNT(*) AS count FROM {}", table.name);
            match sql_query(query).get_result::<Count>(&mut conn) {
                Ok(row) => report.checks.push(format!(
                    "table '{}' reachable with {} rows",
                    table.name, row.count
                )),
                Err(e) => {
                    report
                        .errors
                        .push(format!("failed to access table '{}': {}", table.name, e));
                    break;
                }
            }
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_url_is_server_error() {
        let report = run(None).await;
        assert_eq!(report.database, DatabaseStatus::Error);
        assert_eq!(report.status_code(), 500);
        assert_eq!(report.errors, vec!["DATABASE_URL is not configured"]);
        assert!(report.checks.is_empty());
        assert_eq!(report.environment_variables.len(), REPORTED_ENV_VARS.len());
    }

    #[tokio::test]
    async fn test_blank_url_counts_as_missing() {
        let report = run(Some("   ".into())).await;
        assert_eq!(report.status_code(), 500);
    }

    #[test]
    fn test_report_serializes_status_tokens() {
        let mut report = DiagnoseReport::new();
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["api"], "ok");
        assert_eq!(json["database"], "desconhecido");
        assert!(json.get("missing_database_url").is_none());

        report.fail("boom");
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["database"], "erro");
        assert_eq!(json["errors"][0], "boom");
        assert_eq!(json["environment_variables"][0]["name"], "PGHOST");
    }
}
