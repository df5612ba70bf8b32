//! Admission check against the external per-user usage counter. The counter
//! endpoint performs the atomic increment-and-check; this side only asks the
//! question and fails closed when it cannot get an answer.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::config::Config;

#[derive(Serialize)]
struct AdmitRequest<'a> {
    user_id: &'a str,
    request_class: &'a str,
}

#[derive(Deserialize)]
struct AdmitResponse {
    admitted: bool,
}

pub fn request_class(advanced: bool) -> &'static str {
    if advanced {
        "advanced"
    } else {
        "basic"
    }
}

/// Asks the counter service to charge one unit of the user's basic or
/// advanced budget. Any failure to reach or understand the counter is
/// treated as not admitted, so an infrastructure outage can never bypass
/// quota.
pub async fn admit(client: &Client, config: &Config, user_id: &str, advanced: bool) -> bool {
    let body = AdmitRequest {
        user_id,
        request_class: request_class(advanced),
    };

    let response = match client
        .post(&config.quota_url)
        .bearer_auth(&config.service_key)
        .json(&body)
        .send()
        .await
    {
        Ok(response) => response,
        Err(e) => {
            warn!(error = %e, "quota counter unreachable, failing closed");
            return false;
        }
    };

    if !response.status().is_success() {
        warn!(status = %response.status(), "quota counter returned an error, failing closed");
        return false;
    }

    match response.json::<AdmitResponse>().await {
        Ok(decision) => decision.admitted,
        Err(e) => {
            warn!(error = %e, "quota counter response unreadable, failing closed");
            false
        }
    }
}
