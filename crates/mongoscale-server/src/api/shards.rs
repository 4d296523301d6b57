//! AddShard Endpoint
//!
//! POST /shards launches one new shard instance joined to the cluster's
//! router. The trigger carries no payload beyond activation; an optional
//! idempotency token is the only accepted field. Provisioning faults are
//! returned to the caller unmodified.

use super::state::AppState;
use crate::observability::metrics::{record_shard_provision_failure, record_shard_provisioned};
use axum::{extract::State, http::StatusCode, response::Json};
use mongoscale_core::{CloudError, ProvisionError};
use serde::{Deserialize, Serialize};

/// Request body for POST /shards. The body itself is optional.
#[derive(Debug, Default, Deserialize)]
pub struct AddShardRequest {
    /// Forwarded to the compute backend so retried triggers cannot create
    /// duplicate instances.
    #[serde(default)]
    pub idempotency_token: Option<String>,
}

/// Response for POST /shards
#[derive(Debug, Serialize)]
pub struct AddShardResponse {
    pub instance_id: String,
    pub shard_id: u64,
    pub replica_set: String,
}

/// POST /shards - Launch one new shard instance.
#[tracing::instrument(skip(state, body))]
pub async fn add_shard(
    State(state): State<AppState>,
    body: Option<Json<AddShardRequest>>,
) -> Result<Json<AddShardResponse>, (StatusCode, String)> {
    let token = body.and_then(|Json(body)| body.idempotency_token);

    match state
        .provisioner
        .add_shard(&state.router, token.as_deref())
        .await
    {
        Ok(shard) => {
            record_shard_provisioned();
            Ok(Json(AddShardResponse {
                instance_id: shard.instance_id.to_string(),
                shard_id: shard.shard_id.value(),
                replica_set: shard.replica_set,
            }))
        }
        Err(error) => {
            tracing::warn!(error = %error, "AddShard failed");
            record_shard_provision_failure(failure_kind(&error));
            Err((status_for(&error), error.to_string()))
        }
    }
}

fn failure_kind(error: &ProvisionError) -> &'static str {
    match error {
        ProvisionError::EmptyRouterAddr => "config",
        ProvisionError::Template(_) => "template",
        ProvisionError::Cloud(_) => "cloud",
    }
}

fn status_for(error: &ProvisionError) -> StatusCode {
    match error {
        ProvisionError::Cloud(CloudError::InvalidParameter(_)) => StatusCode::BAD_REQUEST,
        ProvisionError::Cloud(_) => StatusCode::BAD_GATEWAY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mongoscale_core::TemplateError;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            status_for(&ProvisionError::Cloud(CloudError::QuotaExceeded(
                "vCPU limit".into()
            ))),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            status_for(&ProvisionError::Cloud(CloudError::InvalidParameter(
                "bad subnet".into()
            ))),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_for(&ProvisionError::Template(
                TemplateError::MissingPlaceholders(vec!["%ROUTER_IP%".into()])
            )),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_failure_kind_labels() {
        assert_eq!(
            failure_kind(&ProvisionError::Cloud(CloudError::Backend("boom".into()))),
            "cloud"
        );
        assert_eq!(failure_kind(&ProvisionError::EmptyRouterAddr), "config");
    }
}
