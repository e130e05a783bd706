//! GitHub push webhook: verify the signature, then redeploy
//!
//! The route is only mounted when a webhook secret is configured.

use axum::{body::Bytes, extract::State, http::HeaderMap, Json};
use folio_common::config::DeployConfig;
use hmac::{Hmac, Mac};
use serde_json::{json, Value};
use sha2::Sha256;
use tracing::{info, warn};

use super::error::ApiError;
use crate::AppState;

/// Header carrying `sha256=<hex HMAC of the body>`
pub const SIGNATURE_HEADER: &str = "x-hub-signature-256";

type HmacSha256 = Hmac<Sha256>;

/// Check a GitHub `X-Hub-Signature-256` value against the raw body
///
/// Comparison is constant-time.
pub fn verify_signature(secret: &str, body: &[u8], signature: &str) -> bool {
    let Some(hex_digest) = signature.strip_prefix("sha256=") else {
        return false;
    };
    let Ok(expected) = hex::decode(hex_digest) else {
        return false;
    };
    let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
        return false;
    };
    mac.update(body);
    mac.verify_slice(&expected).is_ok()
}

/// Start the redeploy command without waiting for it
///
/// The command usually restarts this very process.
fn spawn_redeploy(deploy: &DeployConfig) -> Result<(), ApiError> {
    let Some(command) = deploy.redeploy_command() else {
        warn!("Verified push received but no redeploy command is configured");
        return Ok(());
    };

    let mut cmd = tokio::process::Command::new("sh");
    cmd.arg("-c").arg(command);
    if let Some(dir) = &deploy.working_dir {
        cmd.current_dir(dir);
    }

    let mut child = cmd
        .spawn()
        .map_err(|e| ApiError::Internal(format!("Failed to start redeploy: {}", e)))?;
    info!("Redeploy started: {}", command);

    tokio::spawn(async move {
        match child.wait().await {
            Ok(status) => info!("Redeploy command exited with {}", status),
            Err(e) => warn!("Redeploy command failed: {}", e),
        }
    });
    Ok(())
}

/// POST /private/reboot
pub async fn github_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>, ApiError> {
    let secret = state
        .deploy
        .secret()
        .ok_or_else(|| ApiError::NotFound("404 not found.".to_string()))?;

    let verified = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|signature| verify_signature(secret, &body, signature));
    if !verified {
        warn!("Rejected webhook call with missing or invalid signature");
        return Err(ApiError::Unauthorized("Invalid secret.".to_string()));
    }

    spawn_redeploy(&state.deploy)?;
    Ok(Json(json!({ "status": "ok" })))
}
