// std
use std::sync::Arc;
// crates.io
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use httpmock::prelude::*;
// self
use directory_broker::{
	auth::{ObjectId, TenantId, TokenSecret},
	config::DirectoryConfig,
	directory::{DirectoryClient, DirectoryUser, SignInName},
	flows::{Claim, GrantValidation, PasswordGrantValidator, ProfileEnricher},
	pipeline::RequestPipeline,
	url::Url,
};

const TENANT: &str = "contoso.onmicrosoft.com";
const TOKEN_PATH: &str = "/contoso.onmicrosoft.com/oauth2/token";
const SUBJECT: &str = "4c1a9b2e-0d7f-4a55-9e0c-6f0b8f5a1d22";

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

fn subject() -> ObjectId {
	ObjectId::new(SUBJECT).expect("Test subject should be valid.")
}

fn token_response(access_token: &str) -> String {
	format!("{{\"access_token\":\"{access_token}\",\"token_type\":\"Bearer\",\"expires_in\":3600}}")
}

async fn mock_application_token(server: &MockServer) {
	server
		.mock_async(|when, then| {
			when.method(POST).path(TOKEN_PATH).body_includes("grant_type=client_credentials");
			then.status(200)
				.header("content-type", "application/json")
				.body(token_response("graph-token"));
		})
		.await;
}

#[tokio::test]
async fn create_user_adds_user_name_aliases_and_other_mails() {
	let server = MockServer::start_async().await;
	let directory = DirectoryClient::new(build_pipeline(&server));

	mock_application_token(&server).await;

	let created = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/contoso.onmicrosoft.com/users")
				.body_includes("\"otherMails\":[\"alice@contoso.com\"]")
				.body_includes("{\"type\":\"userName\",\"value\":\"alice_contoso.com\"}")
				.body_includes("\"creationType\":\"LocalAccount\"");
			then.status(201).header("content-type", "application/json").body(format!(
				"{{\"objectId\":\"{SUBJECT}\",\"accountEnabled\":true,\"displayName\":\"Alice\",\"userType\":\"Member\"}}"
			));
		})
		.await;
	let mut user = DirectoryUser::local_account("alice", "P@ssw0rd!", Some("Alice".into()));

	user.sign_in_names = vec![SignInName::email("alice@contoso.com")];

	let user = directory
		.create_user(user)
		.await
		.expect("Create should not fail locally.")
		.expect("Create should succeed upstream.");

	created.assert_async().await;

	assert_eq!(user.object_id, Some(subject()));
	assert_eq!(user.additional_fields["userType"], "Member");
}

#[tokio::test]
async fn find_user_by_sign_in_name_returns_first_match_or_none() {
	let server = MockServer::start_async().await;
	let directory = DirectoryClient::new(build_pipeline(&server));

	mock_application_token(&server).await;
	server
		.mock_async(|when, then| {
			when.method(GET)
				.path("/contoso.onmicrosoft.com/users")
				.query_param_exists("$filter")
				.query_param("api-version", "1.6");
			then.status(200)
				.header("content-type", "application/json")
				.body(format!("{{\"value\":[{{\"objectId\":\"{SUBJECT}\",\"displayName\":\"Alice\"}}]}}"));
		})
		.await;

	let user = directory
		.find_user_by_sign_in_name("alice@contoso.com")
		.await
		.expect("Lookup should not fail locally.")
		.expect("Lookup should succeed upstream.")
		.expect("Lookup should find the user.");

	assert_eq!(user.display_name.as_deref(), Some("Alice"));
	assert!(user.account_enabled);
}

#[tokio::test]
async fn profile_claims_include_roles_only_when_requested() {
	let server = MockServer::start_async().await;
	let enricher = ProfileEnricher::new(DirectoryClient::new(build_pipeline(&server)));

	mock_application_token(&server).await;
	server
		.mock_async(|when, then| {
			when.method(GET).path(format!("/contoso.onmicrosoft.com/users/{SUBJECT}"));
			then.status(200).header("content-type", "application/json").body(format!(
				"{{\"objectId\":\"{SUBJECT}\",\"displayName\":\"Alice Liddell\",\"surname\":\"Liddell\",\"facsimileTelephoneNumber\":\"  \"}}"
			));
		})
		.await;

	let groups = server
		.mock_async(|when, then| {
			when.method(POST)
				.path(format!("/contoso.onmicrosoft.com/users/{SUBJECT}/getMemberGroups"))
				.body("{\"securityEnabledOnly\":true}");
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"value\":[\"group-a\",\"group-b\"]}");
		})
		.await;
	let claims = enricher
		.profile_claims(&subject(), &["name", "family_name", "phone_number"])
		.await
		.expect("Claims should not fail locally.")
		.expect("Claims should succeed upstream.");

	assert_eq!(claims, vec![Claim::new("name", "Alice Liddell"), Claim::new("family_name", "Liddell")]);

	groups.assert_calls_async(0).await;

	let claims = enricher
		.profile_claims(&subject(), &["given_name", "role"])
		.await
		.expect("Claims should not fail locally.")
		.expect("Claims should succeed upstream.");

	assert_eq!(
		claims,
		vec![
			Claim::new("given_name", ""),
			Claim::new("role", "group-a"),
			Claim::new("role", "group-b"),
		]
	);

	groups.assert_calls_async(1).await;

	let claims = enricher
		.profile_claims(&subject(), &[])
		.await
		.expect("Empty request should not fail.")
		.expect("Empty request should not reach upstream.");

	assert!(claims.is_empty());
	assert!(enricher.is_active(&subject()));
}

#[tokio::test]
async fn missing_user_is_reported_as_data() {
	let server = MockServer::start_async().await;
	let enricher = ProfileEnricher::new(DirectoryClient::new(build_pipeline(&server)));

	mock_application_token(&server).await;
	server
		.mock_async(|when, then| {
			when.method(GET).path(format!("/contoso.onmicrosoft.com/users/{SUBJECT}"));
			then.status(404).body(
				"{\"odata.error\":{\"code\":\"Request_ResourceNotFound\",\"message\":{\"value\":\"Resource not found\"}}}",
			);
		})
		.await;

	let error = enricher
		.profile_claims(&subject(), &["name"])
		.await
		.expect("Missing user should not be raised.")
		.expect_err("Missing user should be a normalized error.");

	assert!(error.is_not_found());
}

#[tokio::test]
async fn password_grant_accepts_and_rejects() {
	let server = MockServer::start_async().await;
	let pipeline = build_pipeline(&server);
	let validator = PasswordGrantValidator::from_config(
		pipeline.config(),
		pipeline.credentials().as_ref(),
		Arc::clone(pipeline.transport()),
	)
	.expect("Validator should build from the pipeline configuration.");
	let payload = URL_SAFE_NO_PAD.encode(format!("{{\"oid\":\"{SUBJECT}\"}}"));
	let user_token = format!("eyJhbGciOiJub25lIn0.{payload}.sig");

	server
		.mock_async(|when, then| {
			when.method(POST)
				.path(TOKEN_PATH)
				.body_includes("grant_type=password")
				.body_includes("username=alice_contoso.com")
				.body_includes("password=correct");
			then.status(200)
				.header("content-type", "application/json")
				.body(token_response(&user_token));
		})
		.await;
	server
		.mock_async(|when, then| {
			when.method(POST)
				.path(TOKEN_PATH)
				.body_includes("grant_type=password")
				.body_includes("password=wrong");
			then.status(400).header("content-type", "application/json").body(
				"{\"error\":\"invalid_grant\",\"error_description\":\"AADSTS50126: Invalid username or password.\"}",
			);
		})
		.await;

	let accepted = validator
		.validate("alice@contoso.com", &TokenSecret::new("correct"))
		.await
		.expect("Accepted grant should not be raised.");

	assert_eq!(accepted, GrantValidation::Accepted { subject: subject() });

	let rejected = validator
		.validate("alice@contoso.com", &TokenSecret::new("wrong"))
		.await
		.expect("Rejected grant should not be raised.");

	match rejected {
		GrantValidation::Rejected { description } => assert!(description.contains("AADSTS50126")),
		other => panic!("Unexpected validation result: {other:?}."),
	}
}
