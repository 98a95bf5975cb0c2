use async_trait::async_trait;
use citytrack_provisioner::api::{ApiError, ApiResult, MemberDirectory};
use citytrack_provisioner::model::NewWorker;
use citytrack_provisioner::provision::{provision_workers, ProvisionError};
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Records every creation request and optionally fails every `n`th call.
#[derive(Clone, Default)]
struct RecordingDirectory {
    calls: Arc<Mutex<Vec<NewWorker>>>,
    fail_every: Option<usize>,
}

impl RecordingDirectory {
    fn failing_every(n: usize) -> Self {
        Self {
            fail_every: Some(n),
            ..Default::default()
        }
    }

    async fn calls(&self) -> Vec<NewWorker> {
        self.calls.lock().await.clone()
    }
}

#[async_trait]
impl MemberDirectory for RecordingDirectory {
    async fn create_worker(&self, request: &NewWorker) -> ApiResult<Value> {
        let mut calls = self.calls.lock().await;
        calls.push(request.clone());
        if let Some(n) = self.fail_every {
            if calls.len() % n == 0 {
                return Err(ApiError::new("create worker: status 409 Conflict"));
            }
        }
        Ok(json!({ "id": format!("w-{}", calls.len()) }))
    }
}

const NAMES: [&str; 10] = [
    "Ramesh Kumar",
    "Sukesh Singh",
    "Harish Patel",
    "Vikram Sharma",
    "Ajay Kumar",
    "Rajesh Tiwari",
    "Manoj Singh",
    "Arjun Verma",
    "Deepak Yadav",
    "Sandeep Gupta",
];

const LOCATIONS: [&str; 10] = [
    "Una", "Haroli", "Amb", "Kasauli", "Baddi", "Nalagarh", "Solan", "Parwanoo", "Kalka", "Kurali",
];

#[tokio::test]
async fn every_third_failure_partitions_without_aborting() {
    let directory = RecordingDirectory::failing_every(3);

    let report = provision_workers(&directory, "PWD", "d-1", &NAMES, &LOCATIONS)
        .await
        .unwrap();

    assert_eq!(report.total, 10);
    assert_eq!(report.created, 7);
    assert_eq!(report.failed, 3);
    assert_eq!(report.created + report.failed, report.total);

    // Failures are items 3, 6 and 9, in input order.
    let failed_names: Vec<&str> = report.failures.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(failed_names, vec![NAMES[2], NAMES[5], NAMES[8]]);

    // The successful partition keeps the remaining names in input order.
    let created_names: Vec<&str> = report.workers.iter().map(|w| w.name.as_str()).collect();
    let expected: Vec<&str> = NAMES
        .iter()
        .enumerate()
        .filter(|(i, _)| (i + 1) % 3 != 0)
        .map(|(_, name)| *name)
        .collect();
    assert_eq!(created_names, expected);

    // All ten items were attempted despite the interleaved failures.
    assert_eq!(directory.calls().await.len(), 10);
}

#[tokio::test]
async fn mismatched_lengths_issue_no_remote_calls() {
    let directory = RecordingDirectory::default();

    let err = provision_workers(&directory, "PWD", "d-1", &NAMES[..3], &LOCATIONS[..2])
        .await
        .unwrap_err();

    assert_eq!(
        err,
        ProvisionError::LengthMismatch {
            names: 3,
            locations: 2
        }
    );
    assert!(directory.calls().await.is_empty());
}

#[tokio::test]
async fn requests_carry_derived_identity_and_fixed_defaults() {
    let directory = RecordingDirectory::default();

    let report = provision_workers(
        &directory,
        "SANITATION",
        "d-2",
        &["Suresh Singh", "Mohan Lal"],
        &["Una", "Haroli"],
    )
    .await
    .unwrap();

    assert_eq!(report.department, "SANITATION");
    assert_eq!(report.created, 2);
    assert_eq!(report.failed, 0);

    let calls = directory.calls().await;
    assert_eq!(calls[0].email, "zrxarchit+suresh.singh.sanitation@gmail.com");
    assert_eq!(calls[0].phone.as_deref(), Some("9202000001"));
    assert_eq!(calls[1].phone.as_deref(), Some("9202000002"));
    assert_eq!(calls[0].role, "worker");
    assert_eq!(calls[0].password, "12345678");
    assert_eq!(calls[0].city, "Himachal Pradesh");
    assert_eq!(calls[0].max_workload, 10);
    assert_eq!(calls[0].department_id, "d-2");

    // Same-length lists pair locations 1:1 through the cyclic rule.
    assert_eq!(calls[0].locality, "Una");
    assert_eq!(calls[1].locality, "Haroli");
}

#[tokio::test]
async fn report_serializes_partition_fields() {
    let directory = RecordingDirectory::failing_every(2);

    let report = provision_workers(&directory, "TRAFFIC", "d-3", &["A B", "C D"], &["Una", "Amb"])
        .await
        .unwrap();

    let body = serde_json::to_value(&report).unwrap();
    assert_eq!(body["department"], "TRAFFIC");
    assert_eq!(body["total"], 2);
    assert_eq!(body["created"], 1);
    assert_eq!(body["failed"], 1);
    assert_eq!(body["workers"][0]["status"], "created");
    assert_eq!(body["failures"][0]["name"], "C D");
    assert!(body["failures"][0]["error"]
        .as_str()
        .unwrap()
        .contains("409"));
}
