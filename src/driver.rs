//! Bootstrap driver: health probe, login, department discovery with
//! create-if-missing recovery, one bulk batch per baseline department, and a
//! final worker inventory. The transcript goes to stdout; diagnostics go to
//! tracing.

use anyhow::Result;
use chrono::Utc;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use tracing::{info, warn};
use uuid::Uuid;

use crate::api::{AuthedClient, Client};
use crate::config::{Config, DatabaseConfig};
use crate::db::{self, Db};
use crate::model::{normalize_departments, BatchReport, NewDepartment};
use crate::provision::provision_workers;

pub const NEARBY_LOCATIONS: [&str; 10] = [
    "Una", "Haroli", "Amb", "Kasauli", "Baddi", "Nalagarh", "Solan", "Parwanoo", "Kalka", "Kurali",
];

pub const PWD_WORKERS: [&str; 10] = [
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

pub const SANITATION_WORKERS: [&str; 10] = [
    "Suresh Singh",
    "Mohan Lal",
    "Ravi Kumar",
    "Anita Devi",
    "Asha Sharma",
    "Priya Singh",
    "Meera Patel",
    "Kavya Reddy",
    "Neha Verma",
    "Pooja Kumari",
];

pub const TRAFFIC_WORKERS: [&str; 10] = [
    "Priya Sharma",
    "Anil Kumar",
    "Bhavna Singh",
    "Nitin Patel",
    "Sanjay Verma",
    "Rohit Sharma",
    "Dinesh Kumar",
    "Sachin Singh",
    "Amit Patel",
    "Vishal Reddy",
];

const BASELINE_DEPARTMENTS: [(&str, &str); 3] = [
    ("Public Works Department", "PWD"),
    ("Sanitation Department", "SANITATION"),
    ("Traffic Department", "TRAFFIC"),
];

pub async fn run(cfg: &Config) -> Result<()> {
    let banner = "=".repeat(80);
    println!("{banner}");
    println!("CityTrack API Client - Worker Bulk Creation");
    println!("{banner}");
    println!("Base URL: {}", cfg.api.base_url);
    println!("{banner}");

    let client = Client::new(cfg.base_url()?);

    println!("\n[1] Health Check:");
    match client.health().await {
        Ok(health) => println!("{}", serde_json::to_string_pretty(&health)?),
        Err(err) => println!(
            "{}",
            serde_json::to_string_pretty(&json!({ "error": err.to_string() }))?
        ),
    }

    println!("\n[2] Admin Login:");
    let login = match client
        .login(&cfg.api.admin_email, &cfg.api.admin_password, "admin")
        .await
    {
        Ok(login) => login,
        Err(err) => {
            println!(
                "{}",
                serde_json::to_string_pretty(&json!({ "error": err.to_string() }))?
            );
            return Ok(());
        }
    };
    println!(
        "{}",
        serde_json::to_string_pretty(&json!({
            "token_type": login.payload.get("token_type"),
            "user": login.payload.get("user"),
        }))?
    );
    let client = login.client;

    println!("\n[3] Fetching Departments:");
    let Some(mut departments) = department_map(&client).await else {
        return Ok(());
    };

    if departments.is_empty() {
        println!("  No departments found. Creating baseline departments...");
        for (name, code) in BASELINE_DEPARTMENTS {
            if let Err(err) = client
                .create_department(&NewDepartment::baseline(name, code))
                .await
            {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&json!({
                        "department": code,
                        "result": { "error": err.to_string() },
                    }))?
                );
            }
        }

        let Some(refetched) = department_map(&client).await else {
            return Ok(());
        };
        departments = refetched;
        if departments.is_empty() {
            println!("  ERROR: Failed to create/fetch departments.");
            return Ok(());
        }
    }

    let batches: [(usize, &str, &str, &[&str]); 3] = [
        (4, "PWD", "PWD", &PWD_WORKERS),
        (5, "SANITATION", "Sanitation", &SANITATION_WORKERS),
        (6, "TRAFFIC", "Traffic", &TRAFFIC_WORKERS),
    ];

    let mut reports = Vec::new();
    for (section, code, label, names) in batches {
        println!("\n[{section}] Creating {label} Workers ({} workers):", names.len());
        println!("{}", "-".repeat(80));
        let Some(department_id) = departments.get(code) else {
            println!("  ERROR: {code} department not found");
            continue;
        };
        match provision_workers(&client, code, department_id, names, &NEARBY_LOCATIONS).await {
            Ok(report) => {
                println!("{}", serde_json::to_string_pretty(&report)?);
                reports.push(report);
            }
            Err(err) => println!("  ERROR: {err}"),
        }
    }

    println!("\n[7] Fetching All Workers:");
    match client.list_workers(None).await {
        Ok(Value::Array(workers)) => {
            println!("  Total workers: {}", workers.len());
            for worker in workers.iter().take(5) {
                println!(
                    "    - {} ({})",
                    worker.get("name").and_then(Value::as_str).unwrap_or("?"),
                    worker.get("email").and_then(Value::as_str).unwrap_or("?"),
                );
            }
            if workers.len() > 5 {
                println!("    ... and {} more", workers.len() - 5);
            }
        }
        Ok(other) => {
            let rendered = serde_json::to_string_pretty(&other)?;
            let preview: String = rendered.chars().take(500).collect();
            println!("{preview}...");
        }
        Err(err) => println!(
            "{}",
            serde_json::to_string_pretty(&json!({ "error": err.to_string() }))?
        ),
    }

    if let Some(audit_cfg) = &cfg.audit {
        if let Err(err) = record_run(audit_cfg, &reports).await {
            warn!(?err, "failed to record provisioning run");
        }
    }

    println!("\n{banner}");
    println!("Bulk Worker Creation Complete!");
    println!("{banner}");
    Ok(())
}

/// Fetch and normalize the department list into a `code -> id` map,
/// printing one line per department. `None` means an unrecoverable fetch or
/// shape error, already reported.
async fn department_map(client: &AuthedClient) -> Option<BTreeMap<String, String>> {
    let response = match client.list_departments().await {
        Ok(response) => response,
        Err(err) => {
            println!("  Error fetching departments: {err}");
            return None;
        }
    };
    let Some(departments) = normalize_departments(&response) else {
        println!("  Error fetching departments: {response}");
        return None;
    };

    let mut map = BTreeMap::new();
    for dept in departments {
        println!("  - {} (Code: {}, ID: {})", dept.name, dept.code, dept.id);
        map.insert(dept.code, dept.id);
    }
    Some(map)
}

/// Record the run's batch reports in one scoped session. The session guard
/// rolls the whole run back if any insert fails.
async fn record_run(cfg: &DatabaseConfig, reports: &[BatchReport]) -> Result<()> {
    let audit = Db::connect(cfg).await?;
    let outcome = async {
        audit.init_schema().await?;
        let run_id = Uuid::new_v4().to_string();
        let recorded_at = Utc::now();

        let mut session = audit.session().await?;
        for report in reports {
            let batch_id = db::record_batch(session.executor(), &run_id, report, recorded_at).await?;
            db::record_failures(session.executor(), batch_id, &report.failures).await?;
        }
        session.commit().await?;

        info!(run_id = %run_id, batches = reports.len(), "recorded provisioning run");
        Ok(())
    }
    .await;
    audit.close().await;
    outcome
}
