use super::download_runner::{BatchReport, RunnerError};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompanyOutcome {
    pub company: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report: Option<BatchReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum RunStatus {
    Running,
    Finished { results: Vec<CompanyOutcome> },
    Failed { error: String },
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunRecord {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub status: RunStatus,
}

struct RunEntry {
    record: RunRecord,
    /// Set when the run ends; running entries never expire.
    expires_at: Option<Instant>,
}

/// Background runs the HTTP layer can poll. Finished runs are kept for
/// `ttl` and then dropped.
#[derive(Clone)]
pub struct RunRegistry {
    runs: Arc<RwLock<HashMap<Uuid, RunEntry>>>,
    ttl: Duration,
}

impl RunRegistry {
    pub fn new(ttl_secs: u64) -> Self {
        Self {
            runs: Arc::new(RwLock::new(HashMap::new())),
            ttl: Duration::from_secs(ttl_secs),
        }
    }

    pub async fn start(&self) -> Uuid {
        let run_id = Uuid::new_v4();
        let record = RunRecord {
            run_id,
            started_at: Utc::now(),
            finished_at: None,
            status: RunStatus::Running,
        };
        self.runs.write().await.insert(
            run_id,
            RunEntry {
                record,
                expires_at: None,
            },
        );
        run_id
    }

    pub async fn get(&self, run_id: &Uuid) -> Option<RunRecord> {
        let runs = self.runs.read().await;
        let entry = runs.get(run_id)?;
        match entry.expires_at {
            Some(at) if Instant::now() >= at => None,
            _ => Some(entry.record.clone()),
        }
    }

    /// Records the per-company results. A run where every company failed
    /// is `Failed`.
    pub async fn complete(&self, run_id: Uuid, results: Vec<(String, Result<BatchReport, RunnerError>)>) {
        let all_failed = !results.is_empty() && results.iter().all(|(_, r)| r.is_err());

        let outcomes: Vec<CompanyOutcome> = results
            .into_iter()
            .map(|(company, result)| match result {
                Ok(report) => CompanyOutcome {
                    company,
                    report: Some(report),
                    error: None,
                },
                Err(e) => CompanyOutcome {
                    company,
                    report: None,
                    error: Some(e.to_string()),
                },
            })
            .collect();

        let status = if all_failed {
            let error = outcomes
                .iter()
                .filter_map(|o| o.error.as_deref().map(|e| format!("{}: {}", o.company, e)))
                .collect::<Vec<_>>()
                .join("; ");
            RunStatus::Failed { error }
        } else {
            RunStatus::Finished { results: outcomes }
        };
        self.set_status(run_id, status).await;
    }

    pub async fn fail(&self, run_id: Uuid, error: impl Into<String>) {
        self.set_status(run_id, RunStatus::Failed { error: error.into() }).await;
    }

    async fn set_status(&self, run_id: Uuid, status: RunStatus) {
        let mut runs = self.runs.write().await;
        if let Some(entry) = runs.get_mut(&run_id) {
            entry.record.status = status;
            entry.record.finished_at = Some(Utc::now());
            entry.expires_at = Some(Instant::now() + self.ttl);
        }
    }

    pub async fn cleanup_expired(&self) {
        let now = Instant::now();
        self.runs
            .write()
            .await
            .retain(|_, entry| entry.expires_at.map_or(true, |at| at > now));
    }
}

impl Default for RunRegistry {
    fn default() -> Self {
        Self::new(3600)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orchestrator::BatchSummary;

    fn report(company: &str) -> BatchReport {
        BatchReport {
            company: company.to_string(),
            summary: BatchSummary::default(),
            policies: vec![],
        }
    }

    #[tokio::test]
    async fn test_run_lifecycle() {
        let registry = RunRegistry::new(60);
        let run_id = registry.start().await;
        assert!(matches!(registry.get(&run_id).await.unwrap().status, RunStatus::Running));

        registry
            .complete(
                run_id,
                vec![
                    ("BSE".to_string(), Ok(report("BSE"))),
                    ("SURA".to_string(), Err(RunnerError::InactiveCompany("SURA".to_string()))),
                ],
            )
            .await;

        let record = registry.get(&run_id).await.unwrap();
        assert!(record.finished_at.is_some());
        match record.status {
            RunStatus::Finished { results } => {
                assert_eq!(results.len(), 2);
                assert!(results.iter().any(|o| o.company == "SURA" && o.error.is_some()));
            }
            other => panic!("unexpected status {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_all_failed_is_failed() {
        let registry = RunRegistry::new(60);
        let run_id = registry.start().await;
        registry
            .complete(
                run_id,
                vec![("BSE".to_string(), Err(RunnerError::WebDriver("sin driver".to_string())))],
            )
            .await;
        let record = registry.get(&run_id).await.unwrap();
        assert!(matches!(record.status, RunStatus::Failed { .. }));
    }

    #[tokio::test]
    async fn test_finished_runs_expire() {
        let registry = RunRegistry::new(0);
        let run_id = registry.start().await;
        registry.fail(run_id, "boom").await;
        assert!(registry.get(&run_id).await.is_none());

        registry.cleanup_expired().await;
        assert!(registry.runs.read().await.is_empty());
    }
}
