// crates.io
use httpmock::prelude::*;
use serde::Deserialize;
// self
use directory_broker::{
	auth::TenantId,
	config::DirectoryConfig,
	error::{ConfigError, Error},
	pipeline::RequestPipeline,
	url::Url,
};

const TENANT: &str = "contoso.onmicrosoft.com";
const TOKEN_PATH: &str = "/contoso.onmicrosoft.com/oauth2/token";
const TOKEN_BODY: &str =
	"{\"access_token\":\"graph-token\",\"token_type\":\"Bearer\",\"expires_in\":3600}";

#[derive(Debug, Deserialize, PartialEq)]
struct Created {
	#[serde(rename = "objectId")]
	object_id: String,
}

fn build_pipeline(server: &MockServer) -> RequestPipeline {
	let base = Url::parse(&server.base_url()).expect("Mock server base URL should parse.");
	let tenant = TenantId::new(TENANT).expect("Test tenant should be valid.");
	let config = DirectoryConfig::builder(tenant, "app-under-test", "secret-under-test")
		.authority(base.clone())
		.api_base(base)
		.build()
		.expect("Loopback configuration should validate.");

	RequestPipeline::with_client(config, mock_tls_client())
		.expect("Pipeline should build from a validated configuration.")
}

// `httpmock` serves a self-signed certificate.
fn mock_tls_client() -> reqwest::Client {
	reqwest::Client::builder()
		.danger_accept_invalid_certs(true)
		.danger_accept_invalid_hostnames(true)
		.redirect(reqwest::redirect::Policy::none())
		.build()
		.expect("Failed to build insecure Reqwest client for tests.")
}

async fn mock_token(server: &MockServer) -> httpmock::Mock<'_> {
	server
		.mock_async(|when, then| {
			when.method(POST).path(TOKEN_PATH).body_includes("grant_type=client_credentials");
			then.status(200).header("content-type", "application/json").body(TOKEN_BODY);
		})
		.await
}

#[tokio::test]
async fn get_sends_bearer_version_and_query_and_reuses_token() {
	let server = MockServer::start_async().await;
	let pipeline = build_pipeline(&server);
	let token = mock_token(&server).await;
	let users = server
		.mock_async(|when, then| {
			when.method(GET)
				.path("/contoso.onmicrosoft.com/users")
				.query_param("api-version", "1.6")
				.query_param("$top", "5")
				.header("authorization", "Bearer graph-token");
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"value\":[]}");
		})
		.await;

	for _ in 0..2 {
		let page: serde_json::Value = pipeline
			.get("/users", Some("?$top=5"))
			.await
			.expect("GET should not fail locally.")
			.expect("GET should succeed upstream.");

		assert_eq!(page["value"], serde_json::json!([]));
	}

	token.assert_calls_async(1).await;
	users.assert_calls_async(2).await;
}

#[tokio::test]
async fn post_not_found_is_normalized() {
	let server = MockServer::start_async().await;
	let pipeline = build_pipeline(&server);

	mock_token(&server).await;
	server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/contoso.onmicrosoft.com/users/missing/getMemberGroups")
				.header("content-type", "application/json")
				.body("{\"securityEnabledOnly\":true}");
			then.status(404).header("content-type", "application/json").body(
				"{\"odata.error\":{\"code\":\"Request_ResourceNotFound\",\"message\":{\"value\":\"Resource not found\"}}}",
			);
		})
		.await;

	let error = pipeline
		.post::<serde_json::Value>(
			"/users/missing/getMemberGroups",
			None,
			Some("{\"securityEnabledOnly\":true}".into()),
		)
		.await
		.expect("Upstream rejection should not be raised.")
		.expect_err("404 should be returned as a normalized error.");

	assert_eq!(error.status, 404);
	assert_eq!(error.code.as_deref(), Some("Request_ResourceNotFound"));
	assert_eq!(error.message, "Resource not found");
	assert_eq!(error.raw_body, None);
	assert!(error.is_not_found());
}

#[tokio::test]
async fn post_plain_text_failure_keeps_raw_body() {
	let server = MockServer::start_async().await;
	let pipeline = build_pipeline(&server);

	mock_token(&server).await;
	server
		.mock_async(|when, then| {
			when.method(POST).path("/contoso.onmicrosoft.com/users");
			then.status(500).body("Internal Server Error");
		})
		.await;

	let error = pipeline
		.post::<Created>("/users", None, Some("{}".into()))
		.await
		.expect("Upstream rejection should not be raised.")
		.expect_err("500 should be returned as a normalized error.");

	assert_eq!(error.code, None);
	assert_eq!(error.message, "Internal Server Error");
	assert_eq!(error.raw_body.as_deref(), Some("Internal Server Error"));
}

#[tokio::test]
async fn delete_rejection_is_fatal() {
	let server = MockServer::start_async().await;
	let pipeline = build_pipeline(&server);

	mock_token(&server).await;
	server
		.mock_async(|when, then| {
			when.method(DELETE).path("/contoso.onmicrosoft.com/users/42");
			then.status(403).body("Insufficient privileges");
		})
		.await;

	let error = pipeline
		.delete("/users/42", None)
		.await
		.expect_err("DELETE rejection should be raised.");

	match error {
		Error::FatalDelete { url, status, body } => {
			assert!(url.ends_with("/contoso.onmicrosoft.com/users/42?api-version=1.6"));
			assert_eq!(status, 403);
			assert_eq!(body, "Insufficient privileges");
		},
		other => panic!("Unexpected error: {other:?}."),
	}
}

#[tokio::test]
async fn delete_success_returns_body_text() {
	let server = MockServer::start_async().await;
	let pipeline = build_pipeline(&server);

	mock_token(&server).await;
	server
		.mock_async(|when, then| {
			when.method(DELETE).path("/contoso.onmicrosoft.com/users/42");
			then.status(204);
		})
		.await;

	let body = pipeline.delete("/users/42", None).await.expect("DELETE should succeed.");

	assert_eq!(body, "");
}

#[tokio::test]
async fn malformed_success_body_is_raised_with_path() {
	let server = MockServer::start_async().await;
	let pipeline = build_pipeline(&server);

	mock_token(&server).await;
	server
		.mock_async(|when, then| {
			when.method(POST).path("/contoso.onmicrosoft.com/users");
			then.status(201)
				.header("content-type", "application/json")
				.body("{\"objectId\":42}");
		})
		.await;

	let error = pipeline
		.post::<Created>("/users", None, Some("{}".into()))
		.await
		.expect_err("Mismatched 2xx body should be raised.");

	match error {
		Error::MalformedResponse { status, source, .. } => {
			assert_eq!(status, 201);
			assert_eq!(source.path().to_string(), "objectId");
		},
		other => panic!("Unexpected error: {other:?}."),
	}
}

#[tokio::test]
async fn empty_success_body_is_malformed() {
	let server = MockServer::start_async().await;
	let pipeline = build_pipeline(&server);

	mock_token(&server).await;
	server
		.mock_async(|when, then| {
			when.method(POST).path("/contoso.onmicrosoft.com/users");
			then.status(201).body("");
		})
		.await;

	let error = pipeline
		.post::<serde_json::Value>("/users", None, Some("{}".into()))
		.await
		.expect_err("Empty 2xx body should be raised.");

	assert!(matches!(error, Error::MalformedResponse { status: 201, .. }));
}

#[tokio::test]
async fn patch_ignores_success_body_and_normalizes_failures() {
	let server = MockServer::start_async().await;
	let pipeline = build_pipeline(&server);

	mock_token(&server).await;

	let accepted = server
		.mock_async(|when, then| {
			when.method(PATCH)
				.path("/contoso.onmicrosoft.com/users/1")
				.body("{\"displayName\":\"Ada\"}");
			then.status(204).body("not json");
		})
		.await;

	server
		.mock_async(|when, then| {
			when.method(PATCH).path("/contoso.onmicrosoft.com/users/2");
			then.status(400).body(
				"{\"odata.error\":{\"code\":\"Request_BadRequest\",\"message\":{\"value\":\"Bad\"},\"requestId\":\"r-1\"}}",
			);
		})
		.await;

	pipeline
		.patch("/users/1", None, Some("{\"displayName\":\"Ada\"}".into()))
		.await
		.expect("PATCH should not fail locally.")
		.expect("PATCH should succeed upstream.");
	accepted.assert_async().await;

	let error = pipeline
		.patch("/users/2", None, Some("{}".into()))
		.await
		.expect("PATCH rejection should not be raised.")
		.expect_err("400 should be returned as a normalized error.");

	assert_eq!(error.code.as_deref(), Some("Request_BadRequest"));
	assert_eq!(error.request_id.as_deref(), Some("r-1"));
}

#[tokio::test]
async fn issuer_rejection_surfaces_before_any_directory_call() {
	let server = MockServer::start_async().await;
	let pipeline = build_pipeline(&server);

	server
		.mock_async(|when, then| {
			when.method(POST).path(TOKEN_PATH);
			then.status(401).header("content-type", "application/json").body(
				"{\"error\":\"invalid_client\",\"error_description\":\"AADSTS7000215: Invalid client secret.\"}",
			);
		})
		.await;

	let directory = server
		.mock_async(|when, then| {
			when.path("/contoso.onmicrosoft.com/users");
			then.status(200).body("{\"value\":[]}");
		})
		.await;
	let error = pipeline
		.get::<serde_json::Value>("/users", None)
		.await
		.expect_err("Credential failure should be raised.");

	assert!(matches!(error, Error::InvalidClient { reason } if reason.contains("AADSTS7000215")));

	directory.assert_calls_async(0).await;
}

#[tokio::test]
async fn out_of_range_token_lifetime_is_an_error_not_a_panic() {
	let server = MockServer::start_async().await;
	let pipeline = build_pipeline(&server);

	server
		.mock_async(|when, then| {
			when.method(POST).path(TOKEN_PATH);
			then.status(200).header("content-type", "application/json").body(
				"{\"access_token\":\"graph-token\",\"token_type\":\"Bearer\",\"expires_in\":999999999999}",
			);
		})
		.await;

	let handle = tokio::spawn(async move { pipeline.get::<serde_json::Value>("/users", None).await });
	let result = handle.await.expect("Request task should complete without panicking.");

	assert!(matches!(result, Err(Error::Config(ConfigError::ExpiresInOutOfRange))));
}
