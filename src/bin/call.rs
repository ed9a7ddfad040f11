//! Call origination CLI.
//!
//! Asks the running service to place the call; if the service is down,
//! falls back to a direct Twilio REST call with the same callbacks.
//!
//! Usage: call <phone-number> [--test]

use voice_assist::config::TwilioConfig;
use voice_assist::voice::twilio::TwilioClient;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_target(false)
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let test_mode = args.iter().any(|a| a == "--test");
    let phone_number = args
        .iter()
        .find(|a| !a.starts_with("--"))
        .cloned()
        .or_else(|| std::env::var("MY_NUMBER").ok())
        .unwrap_or_else(|| {
            eprintln!("Usage: call <phone-number> [--test]");
            eprintln!("  (or set MY_NUMBER, e.g. +1234567890)");
            std::process::exit(2);
        });

    let base_url =
        std::env::var("BASE_URL").unwrap_or_else(|_| "http://localhost:8000".to_string());

    println!("📞 Calling {phone_number}...");

    match call_via_service(&base_url, &phone_number, test_mode).await {
        Ok(call_sid) => {
            println!("✅ Call initiated through the service. Call SID: {call_sid}");
            return Ok(());
        }
        Err(e) => {
            eprintln!("⚠️  Service not reachable ({e}), making direct call...");
        }
    }

    let config = TwilioConfig::from_env().ok_or_else(|| {
        anyhow::anyhow!(
            "TWILIO_ACCOUNT_SID / TWILIO_AUTH_TOKEN / TWILIO_NUMBER must be set for a direct call"
        )
    })?;
    let client = TwilioClient::new(config);
    let call_sid = client.create_call(&phone_number, &base_url, test_mode).await?;
    println!("✅ Direct call initiated. Call SID: {call_sid}");
    Ok(())
}

/// POST /make-call on the running service.
async fn call_via_service(
    base_url: &str,
    phone_number: &str,
    test_mode: bool,
) -> anyhow::Result<String> {
    let client = reqwest::Client::new();
    let response = client
        .post(format!("{}/make-call", base_url.trim_end_matches('/')))
        .json(&serde_json::json!({
            "phone_number": phone_number,
            "test_mode": test_mode,
        }))
        .send()
        .await?;

    if !response.status().is_success() {
        anyhow::bail!("service answered {}", response.status());
    }

    let body: serde_json::Value = response.json().await?;
    body["call_sid"]
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| anyhow::anyhow!("service response missing call_sid"))
}
