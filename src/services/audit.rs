/*
 * Responsibility
 * - Best-effort append of AuditEvent for state-changing operations
 * - Never fails its caller: storage errors and timeouts are logged and dropped
 * - dispatch() runs the append on its own task, off the response path;
 *   drain() waits for whatever is still in flight (shutdown, tests)
 */
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use chrono::Utc;
use serde_json::Value;

use crate::models::{AuditAction, AuditEvent};
use tokio::task::JoinHandle;

use crate::repos::AuditStore;

#[derive(Clone)]
pub struct AuditRecorder {
    store: Arc<dyn AuditStore>,
    write_timeout: Duration,
    in_flight: Arc<Mutex<Vec<JoinHandle<()>>>>,
}

impl AuditRecorder {
    pub fn new(store: Arc<dyn AuditStore>, write_timeout: Duration) -> Self {
        Self {
            store,
            write_timeout,
            in_flight: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Spawn the append and return immediately.
    pub fn dispatch(&self, user_id: String, action: AuditAction, resource: String, details: Value) {
        let recorder = Self {
            store: self.store.clone(),
            write_timeout: self.write_timeout,
            in_flight: Arc::default(),
        };
        let handle = tokio::spawn(async move {
            recorder.record(&user_id, action, &resource, details).await;
        });

        let mut in_flight = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
        in_flight.retain(|h| !h.is_finished());
        in_flight.push(handle);
    }

    /// Wait until every dispatched append has settled.
    pub async fn drain(&self) {
        let pending = std::mem::take(
            &mut *self.in_flight.lock().unwrap_or_else(PoisonError::into_inner),
        );
        for handle in pending {
            if let Err(err) = handle.await {
                tracing::warn!(error = %err, "audit task did not complete");
            }
        }
    }

    async fn record(&self, user_id: &str, action: AuditAction, resource: &str, details: Value) {
        let event = AuditEvent {
            user_id: user_id.to_string(),
            ts: Utc::now().timestamp_millis(),
            action,
            resource: resource.to_string(),
            details,
        };

        match tokio::time::timeout(self.write_timeout, self.store.append(event)).await {
            Ok(Ok(())) => {
                tracing::debug!(%user_id, action = action.as_str(), %resource, "audit recorded");
            }
            Ok(Err(err)) => {
                tracing::warn!(
                    error = %err,
                    %user_id,
                    action = action.as_str(),
                    %resource,
                    "audit append failed"
                );
            }
            Err(_) => {
                tracing::warn!(
                    %user_id,
                    action = action.as_str(),
                    %resource,
                    timeout_ms = self.write_timeout.as_millis() as u64,
                    "audit append timed out"
                );
            }
        }
    }
}
