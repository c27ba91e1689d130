//! Retraining trigger: publishes the decision to NATS

use crate::error::{MonitorError, Result};
use crate::types::{RetrainingDecision, TriggeredBy};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

/// Payload published when a cycle decides to retrain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrainEvent {
    pub retrain: bool,
    pub triggered_by: TriggeredBy,
    pub cycle_id: Uuid,
    pub evaluated_at: DateTime<Utc>,
}

/// Fire-and-forget publisher for retraining events.
///
/// Delivery is best effort: a publish failure is logged and surfaced to
/// the pipeline, which records it without failing the cycle. The durable
/// cycle report is the source of truth, not the event.
pub struct RetrainTrigger {
    client: async_nats::Client,
    subject: String,
}

impl RetrainTrigger {
    pub async fn connect(nats_url: &str, subject: &str) -> Result<Self> {
        let client = async_nats::connect(nats_url)
            .await
            .map_err(|e| MonitorError::Trigger(format!("connect {nats_url}: {e}")))?;
        info!(url = nats_url, subject, "Connected to NATS for retrain events");
        Ok(Self {
            client,
            subject: subject.to_string(),
        })
    }

    /// Publish one retraining event. Called only when the decision says
    /// retrain.
    pub async fn fire(&self, cycle_id: Uuid, decision: &RetrainingDecision) -> Result<()> {
        let event = RetrainEvent {
            retrain: true,
            triggered_by: decision.triggered_by,
            cycle_id,
            evaluated_at: decision.evaluated_at,
        };
        let payload = serde_json::to_vec(&event)?;

        if let Err(e) = self.client.publish(self.subject.clone(), payload.into()).await {
            warn!(subject = %self.subject, error = %e, "Failed to publish retrain event");
            return Err(MonitorError::Trigger(format!(
                "publish to {}: {e}",
                self.subject
            )));
        }
        // Flush so the event leaves the process before the cycle ends
        if let Err(e) = self.client.flush().await {
            warn!(error = %e, "NATS flush failed after retrain event");
            return Err(MonitorError::Trigger(format!("flush: {e}")));
        }

        info!(subject = %self.subject, %cycle_id, triggered_by = ?decision.triggered_by, "Retrain event published");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_payload_shape() {
        let decision = RetrainingDecision {
            should_retrain: true,
            triggered_by: TriggeredBy::DataDrift,
            evaluated_at: Utc::now(),
        };
        let event = RetrainEvent {
            retrain: true,
            triggered_by: decision.triggered_by,
            cycle_id: Uuid::new_v4(),
            evaluated_at: decision.evaluated_at,
        };

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["retrain"], true);
        assert_eq!(json["triggered_by"], "data_drift");
        assert!(json["cycle_id"].is_string());
    }
}
