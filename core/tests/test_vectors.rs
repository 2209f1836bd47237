//! Verify dispatch and response classification against JSON test vectors
//! stored in `test-vectors/`.
//!
//! Each dispatch case names a method token, optional id and finder value, and
//! either the expected plan or the expected error variant. Each classify case
//! describes a simulated response and the expected outcome fields.

use invoicexpress_core::{
    ApiError, Arguments, FailureKind, HttpMethod, HttpResponse, InvoiceXpressClient, RequestPlan,
    UreqTransport,
};

/// A client without credentials: dispatch and classification need none.
fn client() -> InvoiceXpressClient<UreqTransport> {
    InvoiceXpressClient::new(UreqTransport::new())
}

/// Parse the method string from test vectors into `HttpMethod`.
fn parse_method(s: &str) -> HttpMethod {
    match s {
        "GET" => HttpMethod::Get,
        "POST" => HttpMethod::Post,
        "PUT" => HttpMethod::Put,
        "DELETE" => HttpMethod::Delete,
        other => panic!("unknown method: {other}"),
    }
}

fn error_name(err: &ApiError) -> &'static str {
    match err {
        ApiError::Configuration(_) => "Configuration",
        ApiError::MalformedMethodToken(_) => "MalformedMethodToken",
        ApiError::UnsupportedEntity(_) => "UnsupportedEntity",
        ApiError::UnsupportedAction { .. } => "UnsupportedAction",
        ApiError::MissingResourceId { .. } => "MissingResourceId",
        ApiError::MissingQueryValue { .. } => "MissingQueryValue",
        ApiError::InvalidUrl { .. } => "InvalidUrl",
        ApiError::SerializationError(_) => "SerializationError",
    }
}

fn parse_failure(s: &str) -> FailureKind {
    match s {
        "Transport" => FailureKind::Transport,
        "Protocol" => FailureKind::Protocol,
        "Application" => FailureKind::Application,
        "Status" => FailureKind::Status,
        other => panic!("unknown failure kind: {other}"),
    }
}

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

#[test]
fn dispatch_test_vectors() {
    let raw = include_str!("../../test-vectors/dispatch.json");
    let vectors: serde_json::Value = serde_json::from_str(raw).unwrap();

    let c = client();
    for case in vectors["cases"].as_array().unwrap() {
        let name = case["name"].as_str().unwrap();
        let token = case["token"].as_str().unwrap();
        let id = case.get("id").and_then(|v| v.as_u64());
        let extra = case.get("extra").and_then(|v| v.as_str());

        let result = c.build_request(token, id, extra);

        if let Some(expected_error) = case.get("expected_error") {
            let err = result.unwrap_err();
            assert_eq!(error_name(&err), expected_error.as_str().unwrap(), "{name}: error");
            continue;
        }

        let plan: RequestPlan = result.unwrap();
        let expected = &case["expected"];
        assert_eq!(plan.method, parse_method(expected["method"].as_str().unwrap()), "{name}: method");
        assert_eq!(plan.path, expected["path"].as_str().unwrap(), "{name}: path");

        let expected_query: Vec<(String, String)> = expected
            .get("query")
            .and_then(|q| q.as_array())
            .map(|pairs| {
                pairs
                    .iter()
                    .map(|p| {
                        let arr = p.as_array().unwrap();
                        (arr[0].as_str().unwrap().to_string(), arr[1].as_str().unwrap().to_string())
                    })
                    .collect()
            })
            .unwrap_or_default();
        assert_eq!(plan.query, expected_query, "{name}: query");

        let expected_defaults = match expected.get("default_args") {
            Some(v) => Arguments::try_from(v.clone()).unwrap(),
            None => Arguments::new(),
        };
        assert_eq!(plan.default_args, expected_defaults, "{name}: default args");

        // Resolution is pure: a second call yields the identical plan.
        assert_eq!(c.build_request(token, id, extra).unwrap(), plan, "{name}: deterministic");
    }
}

// ---------------------------------------------------------------------------
// Classification
// ---------------------------------------------------------------------------

#[test]
fn classify_test_vectors() {
    let raw = include_str!("../../test-vectors/classify.json");
    let vectors: serde_json::Value = serde_json::from_str(raw).unwrap();

    let c = client();
    for case in vectors["cases"].as_array().unwrap() {
        let name = case["name"].as_str().unwrap();
        let sim = &case["response"];
        let body = sim["body"].as_str().unwrap().to_string();
        let response = HttpResponse {
            status: sim["status"].as_u64().unwrap() as u16,
            headers: Vec::new(),
            body: body.clone(),
        };

        let outcome = c.parse_response(response);
        let expected = &case["expected"];

        assert_eq!(outcome.success, expected["success"].as_bool().unwrap(), "{name}: success");
        assert_eq!(outcome.http_status as u64, sim["status"].as_u64().unwrap(), "{name}: status");
        assert_eq!(outcome.raw_body, body, "{name}: raw body preserved");

        if let Some(decoded) = expected.get("decoded") {
            assert_eq!(outcome.decoded_body.is_some(), decoded.as_bool().unwrap(), "{name}: decoded");
        }
        match expected.get("failure") {
            Some(kind) => assert_eq!(
                outcome.failure,
                Some(parse_failure(kind.as_str().unwrap())),
                "{name}: failure kind"
            ),
            None => assert_eq!(outcome.failure, None, "{name}: failure kind"),
        }
        if let Some(message) = expected.get("message") {
            assert_eq!(outcome.error_message.as_deref(), message.as_str(), "{name}: message");
        }
    }
}
