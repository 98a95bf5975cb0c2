//! Wire payloads sent to the remote API and the report types returned by
//! the bulk provisioning orchestrator.

use serde::Serialize;
use serde_json::Value;

/// Payload for `POST /admin/departments`. Optional fields serialize as
/// explicit nulls, which the remote accepts.
#[derive(Debug, Clone, Serialize)]
pub struct NewDepartment {
    pub name: String,
    pub code: String,
    pub description: Option<String>,
    pub categories: Option<String>,
    pub default_sla_hours: i64,
    pub escalation_email: Option<String>,
}

impl NewDepartment {
    /// A department with only name and code set, using the remote's default
    /// 48-hour SLA.
    pub fn baseline(name: &str, code: &str) -> Self {
        Self {
            name: name.to_string(),
            code: code.to_string(),
            description: None,
            categories: None,
            default_sla_hours: 48,
            escalation_email: None,
        }
    }
}

/// Payload for `POST /admin/members`.
#[derive(Debug, Clone, Serialize)]
pub struct NewWorker {
    pub department_id: String,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub role: String,
    pub city: String,
    pub locality: String,
    pub max_workload: i64,
    pub password: String,
}

/// A department as seen by the driver: the remote-assigned id is opaque and
/// kept as a string regardless of how the remote encodes it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Department {
    pub id: String,
    pub name: String,
    pub code: String,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct CreatedWorker {
    pub name: String,
    pub email: String,
    pub locality: String,
    pub status: String,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct FailedWorker {
    pub name: String,
    pub email: String,
    pub error: String,
}

/// Outcome of one department's bulk provisioning batch.
///
/// Invariant: `created + failed == total`, and every input name appears in
/// exactly one of `workers`/`failures`, in input order.
#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub department: String,
    pub total: usize,
    pub created: usize,
    pub failed: usize,
    pub workers: Vec<CreatedWorker>,
    pub failures: Vec<FailedWorker>,
}

/// Normalize the two accepted shapes of the department-list response (a
/// bare array, or an object wrapping the array under `"departments"`) into
/// one canonical list. Returns `None` for any other shape or for entries
/// missing `code`/`id`.
pub fn normalize_departments(response: &Value) -> Option<Vec<Department>> {
    let entries = match response {
        Value::Array(entries) => entries,
        Value::Object(map) => map.get("departments")?.as_array()?,
        _ => return None,
    };

    let mut departments = Vec::with_capacity(entries.len());
    for entry in entries {
        let code = entry.get("code")?.as_str()?;
        let name = entry.get("name").and_then(Value::as_str).unwrap_or(code);
        let id = opaque_id(entry.get("id")?)?;
        departments.push(Department {
            id,
            name: name.to_string(),
            code: code.to_string(),
        });
    }
    Some(departments)
}

fn opaque_id(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
