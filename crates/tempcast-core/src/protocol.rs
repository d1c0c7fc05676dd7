//! Wire protocol - command decoding and reading pushes
//!
//! Inbound messages are JSON objects whose string `method` field selects the
//! command; outbound messages are unsolicited JSON-RPC pushes carrying one
//! reading each. There is no request/response correlation.

use serde::{Deserialize, Serialize};

/// Center of the synthetic temperature band.
const BAND_CENTER: f64 = 150.0;

/// Maximum jitter applied either side of the band center.
const BAND_JITTER: f64 = 1.0;

/// A decoded client request.
///
/// Anything that is not a well-formed `start`/`stop` request - malformed
/// JSON, a missing `method`, a non-string `method`, an unrecognized verb -
/// decodes to `Unknown`. Bad input must never close the connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Start,
    Stop,
    Unknown,
}

/// Inbound request envelope. Only `method` matters; the demo client also
/// sends `jsonrpc` and `params`, which are ignored rather than validated.
#[derive(Debug, Deserialize)]
struct Request {
    #[serde(default)]
    method: Option<String>,
}

impl Command {
    /// Decode one inbound text payload.
    pub fn decode(payload: &str) -> Self {
        let method = match serde_json::from_str::<Request>(payload) {
            Ok(request) => request.method,
            Err(_) => None,
        };
        match method.as_deref() {
            Some("start") => Self::Start,
            Some("stop") => Self::Stop,
            _ => Self::Unknown,
        }
    }
}

/// A single synthetic sensor sample.
#[derive(Debug, Clone, Copy)]
pub struct Reading {
    pub value: f64,
}

/// Outbound push envelope: `{"jsonrpc": "2.0", "result": <value>, "id": null}`.
#[derive(Serialize)]
struct Push {
    jsonrpc: &'static str,
    result: f64,
    id: Option<i64>,
}

impl Reading {
    /// Sample a fresh reading: band center plus uniform jitter.
    pub fn sample() -> Self {
        use rand::Rng;
        let value = BAND_CENTER + rand::thread_rng().gen_range(-BAND_JITTER..=BAND_JITTER);
        Self { value }
    }

    /// Serialize as an unsolicited JSON-RPC push. Infallible: the payload is
    /// a flat struct over a finite float.
    pub fn to_push(&self) -> String {
        let push = Push {
            jsonrpc: "2.0",
            result: self.value,
            id: None,
        };
        serde_json::to_string(&push).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_start_and_stop() {
        assert_eq!(Command::decode(r#"{"method": "start"}"#), Command::Start);
        assert_eq!(Command::decode(r#"{"method": "stop"}"#), Command::Stop);
    }

    #[test]
    fn decodes_full_rpc_envelope() {
        let payload = r#"{"jsonrpc": "2.0", "method": "start", "params": []}"#;
        assert_eq!(Command::decode(payload), Command::Start);
    }

    #[test]
    fn unrecognized_method_is_unknown() {
        assert_eq!(Command::decode(r#"{"method": "ping"}"#), Command::Unknown);
    }

    #[test]
    fn missing_method_is_unknown() {
        assert_eq!(Command::decode(r#"{"params": []}"#), Command::Unknown);
        assert_eq!(Command::decode("{}"), Command::Unknown);
    }

    #[test]
    fn non_string_method_is_unknown() {
        assert_eq!(Command::decode(r#"{"method": 42}"#), Command::Unknown);
        assert_eq!(Command::decode(r#"{"method": null}"#), Command::Unknown);
    }

    #[test]
    fn malformed_json_is_unknown() {
        assert_eq!(Command::decode("not json"), Command::Unknown);
        assert_eq!(Command::decode(""), Command::Unknown);
        assert_eq!(Command::decode(r#"{"method": "start""#), Command::Unknown);
    }

    #[test]
    fn sampled_readings_stay_in_band() {
        for _ in 0..1000 {
            let reading = Reading::sample();
            assert!(reading.value.is_finite());
            assert!((149.0..=151.0).contains(&reading.value));
        }
    }

    #[test]
    fn push_has_rpc_shape() {
        let push = Reading { value: 150.25 }.to_push();
        let parsed: serde_json::Value = serde_json::from_str(&push).unwrap();
        assert_eq!(parsed["jsonrpc"], "2.0");
        assert!(parsed["id"].is_null());
        assert_eq!(parsed["result"], 150.25);
    }
}
