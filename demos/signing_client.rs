//! Plays the route layer against a running gate: registers a principal,
//! logs it in, then authenticates a signed request twice to show the
//! replay rejection.
//!
//! ```text
//! cargo run --example signing_client -- /run/signgate/signgate.sock
//! ```

use std::time::Duration;

use serde_json::{json, Value};
use tokio::net::UnixStream;

use signgate::auth::{canonical, sign, unix_now};
use signgate::error::GateError;
use signgate::protocol::{read_json, write_json, GateRequest, Response, DEFAULT_MAX_MESSAGE_SIZE};

const TIMEOUT: Duration = Duration::from_secs(5);

async fn call(stream: &mut UnixStream, command: &str, params: Value) -> Result<Response, GateError> {
    write_json(stream, &GateRequest::new(command, params), TIMEOUT).await?;
    read_json(stream, DEFAULT_MAX_MESSAGE_SIZE, TIMEOUT).await
}

fn data(response: &Response) -> Result<&Value, Box<dyn std::error::Error>> {
    match (&response.data, &response.error) {
        (Some(data), _) if response.success => Ok(data),
        (_, Some(err)) => Err(format!("{} ({}): {}", err.code, response.status, err.message).into()),
        _ => Err("empty response".into()),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let socket = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "/run/signgate/signgate.sock".to_string());
    let mut stream = UnixStream::connect(&socket).await?;

    let username = format!("demo-{}", &uuid::Uuid::new_v4().simple().to_string()[..8]);
    let password = uuid::Uuid::new_v4().to_string();
    let credentials = json!({"username": username, "password": password});

    let registered = call(&mut stream, "principal.register", credentials.clone()).await?;
    let registered = data(&registered)?;
    let principal_id = registered["principal_id"].as_u64().ok_or("no principal_id")?;
    let secret = registered["secret"].as_str().ok_or("no secret")?.to_string();
    println!("registered principal {} as {}", principal_id, username);

    let issued = call(&mut stream, "auth.login", credentials).await?;
    let token = data(&issued)?["access_token"]
        .as_str()
        .ok_or("no access_token")?
        .to_string();

    let timestamp = unix_now();
    let nonce = uuid::Uuid::new_v4().to_string();
    let query = vec![("limit".to_string(), "5".to_string())];
    let body = b"{\"note\":\"hello\"}";
    let signing_string = canonical::canonicalize("POST", "/notes", &query, body, timestamp, &nonce);
    let signature = sign(secret.as_bytes(), &signing_string);

    let forwarded = json!({
        "method": "POST",
        "path": "/notes",
        "query": "limit=5",
        "body": "{\"note\":\"hello\"}",
        "headers": {
            "Authorization": format!("Bearer {}", token),
            "X-Signature": signature,
            "X-Timestamp": timestamp.to_string(),
            "X-Nonce": nonce,
        }
    });

    for attempt in 1..=2 {
        let response = call(&mut stream, "auth.authenticate", forwarded.clone()).await?;
        match data(&response) {
            Ok(d) => println!("attempt {}: accepted as {} ({})", attempt, d["principal_id"], d["mode"]),
            Err(e) => println!("attempt {}: rejected: {}", attempt, e),
        }
    }

    Ok(())
}
