//! Bulk provisioning orchestrator.
//!
//! Items are processed strictly sequentially in input order so that
//! ordinal-index-derived phone numbers stay deterministic within a batch.
//! Per-item failures are collected, never escalated: the batch always runs
//! to completion and reports a partitioned outcome.

use thiserror::Error;
use tracing::{info, warn};

use crate::api::MemberDirectory;
use crate::identity::derive_identity;
use crate::model::{BatchReport, CreatedWorker, FailedWorker, NewWorker};

pub const DEFAULT_WORKER_PASSWORD: &str = "12345678";
pub const DEFAULT_WORKER_CITY: &str = "Himachal Pradesh";
pub const DEFAULT_MAX_WORKLOAD: i64 = 10;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProvisionError {
    #[error("number of names ({names}) and locations ({locations}) must match")]
    LengthMismatch { names: usize, locations: usize },
}

/// Create one worker per name in `names`, deriving email and phone from the
/// department code and the item's position. The location for item `i` is
/// `locations[i % locations.len()]`; with the exact-length precondition this
/// degenerates to 1:1 pairing, but the cyclic rule is kept for
/// compatibility. No remote call is made when the precondition fails.
pub async fn provision_workers(
    directory: &dyn MemberDirectory,
    department_code: &str,
    department_id: &str,
    names: &[&str],
    locations: &[&str],
) -> Result<BatchReport, ProvisionError> {
    if names.len() != locations.len() {
        return Err(ProvisionError::LengthMismatch {
            names: names.len(),
            locations: locations.len(),
        });
    }

    let mut workers = Vec::new();
    let mut failures = Vec::new();

    for (index, name) in names.iter().enumerate() {
        let locality = locations[index % locations.len()];
        let identity = derive_identity(name, department_code, index);
        let request = NewWorker {
            department_id: department_id.to_string(),
            name: (*name).to_string(),
            email: identity.email.clone(),
            phone: Some(identity.phone),
            role: "worker".to_string(),
            city: DEFAULT_WORKER_CITY.to_string(),
            locality: locality.to_string(),
            max_workload: DEFAULT_MAX_WORKLOAD,
            password: DEFAULT_WORKER_PASSWORD.to_string(),
        };

        match directory.create_worker(&request).await {
            Ok(_) => {
                info!(name = *name, email = %identity.email, locality, "created worker");
                workers.push(CreatedWorker {
                    name: (*name).to_string(),
                    email: identity.email,
                    locality: locality.to_string(),
                    status: "created".to_string(),
                });
            }
            Err(err) => {
                warn!(name = *name, email = %identity.email, error = %err, "worker creation failed");
                failures.push(FailedWorker {
                    name: (*name).to_string(),
                    email: identity.email,
                    error: err.to_string(),
                });
            }
        }
    }

    Ok(BatchReport {
        department: department_code.to_string(),
        total: names.len(),
        created: workers.len(),
        failed: failures.len(),
        workers,
        failures,
    })
}
