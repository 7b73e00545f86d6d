//! Sequential diagnostic checklist over a [`PostgrestClient`].
//!
//! Every probe goes through [`isolate`], which turns the call into a
//! [`ProbeOutcome`] and logs it. Nothing a probe does can stop the probes
//! after it.

use std::future::Future;

use crate::{PostgrestClient, ProbeRequest, Query, Result, RpcArgs, ServiceResponse};

pub const DISH_COOKING_BATCH_FN: &str = "start_dish_cooking_batch";
pub const PLACEHOLDER_DISH_ID: &str = "00000000-0000-0000-0000-000000000000";
pub const PROBE_BATCH_DATE: &str = "2024-10-03";
pub const PROBE_USER_ID: &str = "f7886c95-23c3-4e6a-a976-08d24b9a17e1";

/// One diagnostic request with a label for the log.
#[derive(Clone, Debug, PartialEq)]
pub struct Probe {
    pub label: String,
    pub request: ProbeRequest,
}

impl Probe {
    pub fn rpc<A: Into<RpcArgs>>(
        label: impl Into<String>,
        function: impl Into<String>,
        args: A,
    ) -> Self {
        Self {
            label: label.into(),
            request: ProbeRequest::Rpc {
                function: function.into(),
                args: args.into(),
            },
        }
    }

    pub fn query(label: impl Into<String>, query: Query) -> Self {
        Self {
            label: label.into(),
            request: ProbeRequest::Query(query),
        }
    }
}

/// Tagged result of one probe.
#[derive(Clone, Debug, PartialEq)]
pub enum ProbeOutcome {
    /// The service answered, with a payload or a structured error.
    Responded(ServiceResponse),
    /// The call failed before any structured answer arrived.
    Failed(String),
}

impl ProbeOutcome {
    pub fn response(&self) -> Option<&ServiceResponse> {
        match self {
            Self::Responded(response) => Some(response),
            Self::Failed(_) => None,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }
}

/// Labelled outcome of one probe, in checklist order.
#[derive(Clone, Debug, PartialEq)]
pub struct ProbeReport {
    pub label: String,
    pub outcome: ProbeOutcome,
}

/// Counts of each outcome kind over a checklist run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ChecklistSummary {
    pub ok: usize,
    pub service_errors: usize,
    pub failed: usize,
}

impl ChecklistSummary {
    pub fn from_reports(reports: &[ProbeReport]) -> Self {
        reports
            .iter()
            .fold(Self::default(), |mut summary, report| {
                match &report.outcome {
                    ProbeOutcome::Responded(response) if response.is_error() => {
                        summary.service_errors += 1
                    }
                    ProbeOutcome::Responded(_) => summary.ok += 1,
                    ProbeOutcome::Failed(_) => summary.failed += 1,
                }
                summary
            })
    }
}

/// Awaits `call` once and logs what happened under `label`.
pub async fn isolate<F>(label: &str, call: F) -> ProbeOutcome
where
    F: Future<Output = Result<ServiceResponse>>,
{
    match call.await {
        Ok(response) => {
            log_response(label, &response);
            ProbeOutcome::Responded(response)
        }
        Err(err) => {
            tracing::error!(probe = label, error = %err, "probe raised");
            ProbeOutcome::Failed(err.to_string())
        }
    }
}

fn log_response(label: &str, response: &ServiceResponse) {
    match &response.error {
        Some(error) => {
            let serialized = serde_json::to_string_pretty(error)
                .unwrap_or_else(|err| format!("<unserializable error: {err}>"));
            tracing::warn!(
                probe = label,
                status = response.status,
                message = %error.message,
                code = error.code.as_deref().unwrap_or("-"),
                "probe returned error"
            );
            tracing::warn!(probe = label, "error details:\n{serialized}");
        }
        None => {
            let data = response
                .data
                .as_ref()
                .map_or_else(|| "null".to_owned(), |data| data.to_string());
            tracing::info!(
                probe = label,
                status = response.status,
                rows = response.row_count(),
                data = %data,
                "probe returned data"
            );
        }
    }
}

/// Calls `function` once with `args` and logs the answer.
pub async fn run_procedure_probe(
    client: &PostgrestClient,
    label: &str,
    function: &str,
    args: RpcArgs,
) -> ProbeReport {
    tracing::info!(probe = label, function, "testing procedure");
    let outcome = isolate(label, client.rpc(function, args)).await;
    ProbeReport {
        label: label.to_owned(),
        outcome,
    }
}

/// Runs `query` once and logs the rows or error.
pub async fn run_query_probe(client: &PostgrestClient, label: &str, query: &Query) -> ProbeReport {
    tracing::info!(
        probe = label,
        collection = %query.collection,
        filters = query.filters.len(),
        "testing query"
    );
    let outcome = isolate(label, client.query(query)).await;
    ProbeReport {
        label: label.to_owned(),
        outcome,
    }
}

/// Dispatches a [`Probe`] to the matching runner.
pub async fn run_probe(client: &PostgrestClient, probe: &Probe) -> ProbeReport {
    match &probe.request {
        ProbeRequest::Rpc { function, args } => {
            run_procedure_probe(client, &probe.label, function, args.clone()).await
        }
        ProbeRequest::Query(query) => run_query_probe(client, &probe.label, query).await,
    }
}

/// Runs probes one after another, in order.
pub async fn run_checklist<I>(client: &PostgrestClient, probes: I) -> Vec<ProbeReport>
where
    I: IntoIterator<Item = Probe>,
{
    let mut reports = Vec::new();
    for probe in probes {
        reports.push(run_probe(client, &probe).await);
    }
    reports
}

/// The checklist this tool ships with.
pub fn default_checklist() -> Vec<Probe> {
    vec![
        Probe::rpc(
            "start_dish_cooking_batch",
            DISH_COOKING_BATCH_FN,
            [
                ("p_dish_id", PLACEHOLDER_DISH_ID),
                ("p_batch_date", PROBE_BATCH_DATE),
            ],
        ),
        Probe::query(
            "token wallets",
            Query::table("token_wallets").eq("user_id", PROBE_USER_ID),
        ),
        Probe::query(
            "user carts",
            Query::table("user_carts").eq("user_id", PROBE_USER_ID),
        ),
        Probe::query("protein options", Query::table("protein_options")),
        Probe::query("dish protein options", Query::table("dish_protein_options")),
    ]
}

#[cfg(test)]
mod tests {
    use std::{
        io,
        sync::{Arc, Mutex},
    };

    use serde_json::json;

    use super::*;
    use crate::{PostgrestError, ServiceError};

    #[derive(Clone, Default)]
    struct SharedBuf(Arc<Mutex<Vec<u8>>>);

    impl io::Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0
                .lock()
                .expect("log buffer mutex must not be poisoned")
                .extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl SharedBuf {
        fn contents(&self) -> String {
            let bytes = self.0.lock().expect("log buffer mutex must not be poisoned");
            String::from_utf8_lossy(&bytes).into_owned()
        }
    }

    /// Runs `call` through `isolate` with a subscriber recording into a buffer.
    async fn captured_isolate<F>(label: &str, call: F) -> (ProbeOutcome, String)
    where
        F: Future<Output = Result<ServiceResponse>>,
    {
        let buf = SharedBuf::default();
        let writer = buf.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::DEBUG)
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let outcome = isolate(label, call).await;
        (outcome, buf.contents())
    }

    #[tokio::test]
    async fn service_error_is_logged_with_serialized_details() {
        let rejected = ServiceResponse {
            status: 400,
            data: None,
            error: Some(ServiceError {
                message: "Dish not found".to_owned(),
                code: Some("P0001".to_owned()),
                details: None,
                hint: Some("check the dish id".to_owned()),
            }),
        };

        let (outcome, logs) =
            captured_isolate("start_dish_cooking_batch", async { Ok(rejected) }).await;

        assert!(outcome.response().is_some_and(ServiceResponse::is_error));
        assert!(logs.contains("WARN"), "logs: {logs}");
        assert!(logs.contains("probe returned error"), "logs: {logs}");
        assert!(logs.contains("status=400"), "logs: {logs}");
        assert!(logs.contains("P0001"), "logs: {logs}");
        assert!(logs.contains("error details:"), "logs: {logs}");
        assert!(logs.contains(r#""code": "P0001""#), "logs: {logs}");
        assert!(logs.contains(r#""hint": "check the dish id""#), "logs: {logs}");
    }

    #[tokio::test]
    async fn empty_result_is_logged_with_zero_rows() {
        let (outcome, logs) = captured_isolate("token wallets", async { Ok(ok_response()) }).await;

        assert_eq!(outcome.response(), Some(&ok_response()));
        assert!(logs.contains("INFO"), "logs: {logs}");
        assert!(logs.contains("probe returned data"), "logs: {logs}");
        assert!(logs.contains("rows=0"), "logs: {logs}");
        assert!(logs.contains("data=[]"), "logs: {logs}");
        assert!(!logs.contains("WARN"), "logs: {logs}");
    }

    #[tokio::test]
    async fn failed_call_is_logged_at_error_level() {
        let (outcome, logs) = captured_isolate("protein options", async {
            Err::<ServiceResponse, _>(PostgrestError::Decode("bad body".to_owned()))
        })
        .await;

        assert!(outcome.is_failed());
        assert!(logs.contains("ERROR"), "logs: {logs}");
        assert!(logs.contains("probe raised"), "logs: {logs}");
        assert!(logs.contains("decode error: bad body"), "logs: {logs}");
        assert!(logs.contains(r#"probe="protein options""#), "logs: {logs}");
    }

    fn ok_response() -> ServiceResponse {
        ServiceResponse {
            status: 200,
            data: Some(json!([])),
            error: None,
        }
    }

    #[tokio::test]
    async fn isolate_converts_errors_into_failed_outcome() {
        let outcome = isolate("broken", async {
            Err::<ServiceResponse, _>(PostgrestError::InvalidRequest("nope".to_owned()))
        })
        .await;
        assert_eq!(
            outcome,
            ProbeOutcome::Failed("invalid request: nope".to_owned())
        );
    }

    #[tokio::test]
    async fn isolate_passes_service_answer_through() {
        let outcome = isolate("fine", async { Ok(ok_response()) }).await;
        assert_eq!(outcome.response(), Some(&ok_response()));
        assert!(!outcome.is_failed());
    }

    #[test]
    fn default_checklist_starts_with_rpc_then_four_queries() {
        let probes = default_checklist();
        assert_eq!(probes.len(), 5);
        match &probes[0].request {
            ProbeRequest::Rpc { function, args } => {
                assert_eq!(function, DISH_COOKING_BATCH_FN);
                assert_eq!(args.0.len(), 2);
            }
            other => panic!("expected rpc, got {other:?}"),
        }
        let collections: Vec<&str> = probes[1..]
            .iter()
            .map(|probe| match &probe.request {
                ProbeRequest::Query(query) => query.collection.as_str(),
                other => panic!("expected query, got {other:?}"),
            })
            .collect();
        assert_eq!(
            collections,
            ["token_wallets", "user_carts", "protein_options", "dish_protein_options"]
        );
    }

    #[test]
    fn summary_counts_each_outcome_kind() {
        let reports = vec![
            ProbeReport {
                label: "a".to_owned(),
                outcome: ProbeOutcome::Responded(ok_response()),
            },
            ProbeReport {
                label: "b".to_owned(),
                outcome: ProbeOutcome::Responded(ServiceResponse {
                    status: 404,
                    data: None,
                    error: Some(ServiceError {
                        message: "missing".to_owned(),
                        code: None,
                        details: None,
                        hint: None,
                    }),
                }),
            },
            ProbeReport {
                label: "c".to_owned(),
                outcome: ProbeOutcome::Failed("timeout".to_owned()),
            },
        ];
        assert_eq!(
            ChecklistSummary::from_reports(&reports),
            ChecklistSummary {
                ok: 1,
                service_errors: 1,
                failed: 1,
            }
        );
    }
}
