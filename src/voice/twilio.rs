//! Twilio REST client for call origination.

use secrecy::ExposeSecret;
use serde::Deserialize;
use tracing::{error, info};

use crate::config::TwilioConfig;
use crate::error::VoiceError;

const TWILIO_API_BASE: &str = "https://api.twilio.com/2010-04-01";

/// Call lifecycle events the status callback subscribes to. Each one is sent
/// as its own repeated `StatusCallbackEvent` form parameter.
const STATUS_CALLBACK_EVENTS: &[&str] = &["initiated", "ringing", "answered", "completed"];

/// TwiML document Twilio serves in test mode (no webhook round trip).
const TEST_MODE_TWIML_URL: &str = "http://demo.twilio.com/docs/voice.xml";

#[derive(Debug, Deserialize)]
struct CallResource {
    sid: String,
}

/// Thin client over Twilio's Calls API.
pub struct TwilioClient {
    config: TwilioConfig,
    http: reqwest::Client,
}

impl TwilioClient {
    pub fn new(config: TwilioConfig) -> Self {
        Self {
            config,
            http: reqwest::Client::new(),
        }
    }

    /// Originate an outbound call to `to`, pointing Twilio at the greeting
    /// webhook under `base_url` with status callbacks wired. Returns the call
    /// SID. In test mode the call plays Twilio's demo document instead.
    pub async fn create_call(
        &self,
        to: &str,
        base_url: &str,
        test_mode: bool,
    ) -> Result<String, VoiceError> {
        let base = base_url.trim_end_matches('/');
        let twiml_url = if test_mode {
            TEST_MODE_TWIML_URL.to_string()
        } else {
            format!("{base}/voice/greeting")
        };
        let status_callback = format!("{base}/voice/status");

        let url = format!(
            "{TWILIO_API_BASE}/Accounts/{}/Calls.json",
            self.config.account_sid
        );

        let params = call_params(
            to,
            &self.config.from_number,
            &twiml_url,
            &status_callback,
        );
        let response = self
            .http
            .post(&url)
            .basic_auth(
                &self.config.account_sid,
                Some(self.config.auth_token.expose_secret()),
            )
            .form(&params)
            .send()
            .await
            .map_err(|e| VoiceError::CallFailed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(status = status.as_u16(), %body, "Twilio rejected call origination");
            return Err(VoiceError::ProviderRejected {
                status: status.as_u16(),
                body,
            });
        }

        let call: CallResource = response
            .json()
            .await
            .map_err(|e| VoiceError::CallFailed(format!("malformed Twilio response: {e}")))?;

        info!(call_sid = %call.sid, to, test_mode, "Outbound call initiated");
        Ok(call.sid)
    }
}

/// Form parameters for the Calls API, with one repeated `StatusCallbackEvent`
/// pair per subscribed event.
fn call_params<'a>(
    to: &'a str,
    from: &'a str,
    twiml_url: &'a str,
    status_callback: &'a str,
) -> Vec<(&'static str, &'a str)> {
    let mut params = vec![
        ("To", to),
        ("From", from),
        ("Url", twiml_url),
        ("Method", "POST"),
        ("StatusCallback", status_callback),
    ];
    for event in STATUS_CALLBACK_EVENTS.iter().copied() {
        params.push(("StatusCallbackEvent", event));
    }
    params.push(("StatusCallbackMethod", "POST"));
    params
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_callback_events_are_repeated_params() {
        let params = call_params(
            "+15551234567",
            "+15550000000",
            "http://localhost:8000/voice/greeting",
            "http://localhost:8000/voice/status",
        );
        let events: Vec<&str> = params
            .iter()
            .filter(|(key, _)| *key == "StatusCallbackEvent")
            .map(|(_, value)| *value)
            .collect();
        assert_eq!(events, ["initiated", "ringing", "answered", "completed"]);
        // No space-joined single value anywhere.
        assert!(params.iter().all(|(_, v)| !v.contains(' ')));
    }
}
