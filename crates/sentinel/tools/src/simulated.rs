//! Simulated diagnostic backends.
//!
//! Each tool answers deterministic data derived from the requested service
//! name, so demos and tests are reproducible without live infrastructure.

use async_trait::async_trait;
use sentinel_registry::{RegistryError, ToolHandler, ToolRegistry, ToolSpec};
use sentinel_types::{PermissionLevel, RiskLevel};
use std::sync::Arc;

fn service_of(arguments: &serde_json::Value) -> String {
    arguments
        .get("service")
        .and_then(|v| v.as_str())
        .unwrap_or("unknown")
        .to_string()
}

/// Stable small number derived from the service name, used to vary the
/// simulated data between services.
fn seed(service: &str) -> u64 {
    service.bytes().map(u64::from).sum()
}

// ── query_metrics ────────────────────────────────────────────────────

pub struct QueryMetrics;

#[async_trait]
impl ToolHandler for QueryMetrics {
    async fn call(&self, arguments: &serde_json::Value) -> anyhow::Result<serde_json::Value> {
        let service = service_of(arguments);
        let metric = arguments
            .get("metric")
            .and_then(|v| v.as_str())
            .unwrap_or("latency_p99_ms");
        let base = 200 + seed(&service) % 400;
        let points: Vec<serde_json::Value> = (0..6u64)
            .map(|i| {
                serde_json::json!({
                    "offset_min": i as i64 * 10 - 50,
                    "value": base + i * (seed(&service) % 37),
                })
            })
            .collect();
        Ok(serde_json::json!({
            "service": service,
            "metric": metric,
            "window": "1h",
            "points": points,
        }))
    }
}

// ── query_logs ───────────────────────────────────────────────────────

pub struct QueryLogs;

#[async_trait]
impl ToolHandler for QueryLogs {
    async fn call(&self, arguments: &serde_json::Value) -> anyhow::Result<serde_json::Value> {
        let service = service_of(arguments);
        let noisy = seed(&service) % 2 == 0;
        let mut entries = vec![
            serde_json::json!({
                "level": "warn",
                "message": format!("{}: connection pool above 80% utilization", service),
            }),
            serde_json::json!({
                "level": "info",
                "message": format!("{}: health check passing", service),
            }),
        ];
        if noisy {
            entries.insert(
                0,
                serde_json::json!({
                    "level": "error",
                    "message": format!("{}: upstream timeout after 2000ms", service),
                }),
            );
        }
        Ok(serde_json::json!({
            "service": service,
            "window": arguments.get("window").cloned().unwrap_or("1h".into()),
            "entries": entries,
        }))
    }
}

// ── query_topology ───────────────────────────────────────────────────

pub struct QueryTopology;

#[async_trait]
impl ToolHandler for QueryTopology {
    async fn call(&self, arguments: &serde_json::Value) -> anyhow::Result<serde_json::Value> {
        let service = service_of(arguments);
        Ok(serde_json::json!({
            "service": service,
            "upstreams": [format!("{}-db", service), "shared-cache"],
            "downstreams": ["edge-gateway"],
            "zone": format!("dc-{}", seed(&service) % 3 + 1),
        }))
    }
}

// ── get_change_history ───────────────────────────────────────────────

pub struct GetChangeHistory;

#[async_trait]
impl ToolHandler for GetChangeHistory {
    async fn call(&self, arguments: &serde_json::Value) -> anyhow::Result<serde_json::Value> {
        let service = service_of(arguments);
        let window_hours = arguments
            .get("window_hours")
            .and_then(|v| v.as_u64())
            .unwrap_or(24);
        Ok(serde_json::json!({
            "service": service,
            "window_hours": window_hours,
            "changes": [
                {
                    "id": format!("chg-{}", seed(&service) % 9000 + 1000),
                    "kind": "deploy",
                    "age_minutes": seed(&service) % 90 + 10,
                    "description": format!("rollout of {} config update", service),
                },
            ],
        }))
    }
}

fn service_schema(extra: &[(&str, serde_json::Value)]) -> serde_json::Value {
    let mut properties = serde_json::Map::new();
    properties.insert("service".into(), serde_json::json!({"type": "string"}));
    for (key, schema) in extra {
        properties.insert((*key).into(), schema.clone());
    }
    serde_json::json!({
        "type": "object",
        "properties": properties,
        "required": ["service"],
    })
}

/// Register the four simulated diagnostic tools. All are READ_ONLY and
/// callable at GUEST permission.
pub fn register_builtin_tools(registry: &ToolRegistry) -> Result<(), RegistryError> {
    registry.register(
        ToolSpec::new(
            "query_metrics",
            "read a metric series for a service",
            service_schema(&[("metric", serde_json::json!({"type": "string"}))]),
            RiskLevel::ReadOnly,
            PermissionLevel::Guest,
        ),
        Arc::new(QueryMetrics),
    )?;
    registry.register(
        ToolSpec::new(
            "query_logs",
            "read recent log entries for a service",
            service_schema(&[("window", serde_json::json!({"type": "string"}))]),
            RiskLevel::ReadOnly,
            PermissionLevel::Guest,
        ),
        Arc::new(QueryLogs),
    )?;
    registry.register(
        ToolSpec::new(
            "query_topology",
            "read the dependency topology around a service",
            service_schema(&[]),
            RiskLevel::ReadOnly,
            PermissionLevel::Guest,
        ),
        Arc::new(QueryTopology),
    )?;
    registry.register(
        ToolSpec::new(
            "get_change_history",
            "list recent changes affecting a service",
            service_schema(&[(
                "window_hours",
                serde_json::json!({"type": "integer", "minimum": 1}),
            )]),
            RiskLevel::ReadOnly,
            PermissionLevel::Guest,
        ),
        Arc::new(GetChangeHistory),
    )?;
    Ok(())
}
