//! Azure Resource Manager backend implementation.

use super::poller::{check_status, wait_for_completion, PollOptions};
use super::wire::{GroupWire, ResourceWire};
use crate::backends::azure::AzureSession;
use crate::config::ENV_SUBSCRIPTION_ID;
use crate::export::ExportSnapshot;
use crate::paging::{Lister, Page};
use crate::validation::{validate_group_name, validate_resource_name};
use crate::{Backend, Config, Item, ResourceSpec, Result, RgmuxError, Session, Tags};
use async_trait::async_trait;
use azure_core::auth::TokenCredential;
use azure_identity::DefaultAzureCredential;
use reqwest::header::ACCEPT;
use reqwest::Method;
use std::sync::Arc;
use tracing::{debug, info};

/// api-version for resource group calls.
const DEFAULT_GROUPS_API_VERSION: &str = "2021-04-01";

const USER_AGENT: &str = concat!("rgmux/", env!("CARGO_PKG_VERSION"));

/// Azure Resource Manager backend.
pub struct AzureBackend {
    http: Option<reqwest::Client>,
    credential: Option<Arc<DefaultAzureCredential>>,
    endpoint: String,
    subscription_id: String,
    groups_api_version: String,
    lister: Lister,
    poll: PollOptions,
}

impl AzureBackend {
    /// Creates a new Azure Resource Manager backend from configuration.
    pub fn new(config: Config) -> Self {
        let subscription_id = config.subscription_id.clone().unwrap_or_default();

        let groups_api_version = config
            .get_option("groups_api_version")
            .cloned()
            .unwrap_or_else(|| DEFAULT_GROUPS_API_VERSION.to_string());

        Self {
            http: None,
            credential: None,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            subscription_id,
            groups_api_version,
            lister: Lister::new().with_limit(config.max_pages),
            poll: PollOptions {
                interval: config.poll_interval,
                max_polls: config.max_polls,
            },
        }
    }

    /// Token scope for the configured endpoint.
    fn scope(&self) -> String {
        format!("{}/.default", self.endpoint)
    }

    /// Builds `<endpoint>/subscriptions/<sub>/<path>?api-version=<version>`.
    fn url(&self, path: &str, api_version: &str) -> String {
        format!(
            "{}/subscriptions/{}/{}?api-version={}",
            self.endpoint, self.subscription_id, path, api_version
        )
    }

    fn group_url(&self, name: &str) -> String {
        self.url(&format!("resourcegroups/{}", name), &self.groups_api_version)
    }

    /// Gets the HTTP client.
    fn http(&self) -> Result<&reqwest::Client> {
        self.http.as_ref().ok_or(RgmuxError::NotAuthenticated)
    }

    /// Sends one request and checks its status.
    async fn send(
        &self,
        method: Method,
        url: &str,
        body: Option<&serde_json::Value>,
        target: &str,
        session: &dyn Session,
    ) -> Result<reqwest::Response> {
        let http = self.http()?;
        debug!(%method, url, "management request");

        let mut request = http
            .request(method, url)
            .bearer_auth(session.token())
            .header(ACCEPT, "application/json");
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request
            .send()
            .await
            .map_err(|e| RgmuxError::Remote(e.to_string()))?;
        check_status(response, target).await
    }

    /// Sends one request and waits out a long-running operation.
    async fn send_and_wait(
        &self,
        method: Method,
        url: &str,
        body: Option<&serde_json::Value>,
        target: &str,
        session: &dyn Session,
    ) -> Result<reqwest::Response> {
        let response = self.send(method, url, body, target, session).await?;
        wait_for_completion(self.http()?, response, session.token(), target, self.poll).await
    }

    fn op_error(&self, operation: &str, target: &str, err: RgmuxError) -> RgmuxError {
        match err {
            // Keep these matchable by callers.
            RgmuxError::NotFound(_) | RgmuxError::NotAuthenticated => err,
            other => RgmuxError::backend_op(self.name(), operation, target, other),
        }
    }
}

async fn read_body(response: reqwest::Response) -> Result<Vec<u8>> {
    let bytes = response
        .bytes()
        .await
        .map_err(|e| RgmuxError::Remote(format!("reading response: {}", e)))?;
    Ok(bytes.to_vec())
}

async fn json<T: serde::de::DeserializeOwned>(response: reqwest::Response) -> Result<T> {
    let body = read_body(response).await?;
    Ok(serde_json::from_slice(&body)?)
}

#[async_trait]
impl Backend for AzureBackend {
    fn name(&self) -> &str {
        "azurerm"
    }

    fn lister(&self) -> Lister {
        self.lister
    }

    async fn init(&mut self) -> Result<()> {
        if self.subscription_id.is_empty() {
            return Err(RgmuxError::MissingEnvironment(vec![
                ENV_SUBSCRIPTION_ID.to_string()
            ]));
        }

        let credential = Arc::new(DefaultAzureCredential::create(Default::default()).map_err(
            |e| RgmuxError::Other(anyhow::anyhow!("Failed to create Azure credentials: {}", e)),
        )?);

        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| RgmuxError::Other(anyhow::anyhow!("Failed to create HTTP client: {}", e)))?;

        self.credential = Some(credential);
        self.http = Some(http);
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        self.http = None;
        self.credential = None;
        Ok(())
    }

    async fn is_authenticated(&self) -> bool {
        self.credential.is_some()
    }

    async fn authenticate(&mut self) -> Result<Arc<dyn Session>> {
        let credential = self
            .credential
            .as_ref()
            .ok_or(RgmuxError::NotAuthenticated)?;

        let scope = self.scope();
        let token = credential
            .get_token(&[scope.as_str()])
            .await
            .map_err(|e| RgmuxError::Remote(format!("acquiring token: {}", e)))?;

        let expires_at = chrono::DateTime::from_timestamp(token.expires_on.unix_timestamp(), 0);
        info!(backend = self.name(), "authenticated");

        Ok(Arc::new(AzureSession::new(
            token.token.secret().to_string(),
            expires_at,
        )))
    }

    async fn create_or_update_group(
        &mut self,
        name: &str,
        location: &str,
        tags: &Tags,
        session: &dyn Session,
    ) -> Result<Item> {
        validate_group_name(name)?;

        let body = serde_json::json!({ "location": location, "tags": tags });
        let result: Result<GroupWire> = async {
            let response = self
                .send(Method::PUT, &self.group_url(name), Some(&body), name, session)
                .await?;
            json(response).await
        }
        .await;

        result
            .map(Item::from)
            .map_err(|e| self.op_error("create-group", name, e))
    }

    async fn list_groups_page(
        &self,
        next_link: Option<String>,
        session: &dyn Session,
    ) -> Result<Page<Item>> {
        let url = next_link.unwrap_or_else(|| self.url("resourcegroups", &self.groups_api_version));

        let response = self
            .send(Method::GET, &url, None, "resourcegroups", session)
            .await?;
        let page: Page<GroupWire> = json(response).await?;

        Ok(Page {
            items: page.items.into_iter().map(Item::from).collect(),
            next_link: page.next_link,
        })
    }

    async fn delete_group(&mut self, name: &str, session: &dyn Session) -> Result<()> {
        validate_group_name(name)?;

        self.send_and_wait(Method::DELETE, &self.group_url(name), None, name, session)
            .await
            .map_err(|e| self.op_error("delete-group", name, e))?;

        info!(group = name, "resource group deleted");
        Ok(())
    }

    async fn export_template(&self, group: &str, session: &dyn Session) -> Result<ExportSnapshot> {
        validate_group_name(group)?;

        let url = self.url(
            &format!("resourcegroups/{}/exportTemplate", group),
            &self.groups_api_version,
        );
        // "*" selects every resource in the group.
        let body = serde_json::json!({ "resources": ["*"] });

        let result: Result<serde_json::Value> = async {
            let response = self
                .send_and_wait(Method::POST, &url, Some(&body), group, session)
                .await?;
            json(response).await
        }
        .await;

        result
            .map(ExportSnapshot::new)
            .map_err(|e| self.op_error("export-template", group, e))
    }

    async fn create_or_update_resource(
        &mut self,
        group: &str,
        resource: &ResourceSpec,
        session: &dyn Session,
    ) -> Result<Item> {
        validate_group_name(group)?;
        validate_resource_name(&resource.name)?;

        let url = self.url(&resource.path_in(group), &resource.api_version);
        let target = format!("{}/{}", group, resource.name);
        let body = resource.body();

        let result: Result<ResourceWire> = async {
            let response = self
                .send_and_wait(Method::PUT, &url, Some(&body), &target, session)
                .await?;
            let created = read_body(response).await?;
            if created.iter().all(u8::is_ascii_whitespace) {
                // Some providers finish with an empty body; read the resource back.
                debug!(resource = %target, "empty create response, reading resource back");
                let response = self.send(Method::GET, &url, None, &target, session).await?;
                return json(response).await;
            }
            Ok(serde_json::from_slice(&created)?)
        }
        .await;

        result
            .map(Item::from)
            .map_err(|e| self.op_error("create-resource", &target, e))
    }

    async fn list_resources_page(
        &self,
        group: &str,
        next_link: Option<String>,
        session: &dyn Session,
    ) -> Result<Page<Item>> {
        validate_group_name(group)?;

        let url = next_link.unwrap_or_else(|| {
            self.url(
                &format!("resourceGroups/{}/resources", group),
                &self.groups_api_version,
            )
        });

        let response = self.send(Method::GET, &url, None, group, session).await?;
        let page: Page<ResourceWire> = json(response).await?;

        Ok(Page {
            items: page.items.into_iter().map(Item::from).collect(),
            next_link: page.next_link,
        })
    }

    async fn delete_resource(
        &mut self,
        group: &str,
        resource: &ResourceSpec,
        session: &dyn Session,
    ) -> Result<()> {
        validate_group_name(group)?;
        validate_resource_name(&resource.name)?;

        let url = self.url(&resource.path_in(group), &resource.api_version);
        let target = format!("{}/{}", group, resource.name);

        self.send_and_wait(Method::DELETE, &url, None, &target, session)
            .await
            .map_err(|e| self.op_error("delete-resource", &target, e))?;

        info!(resource = %target, "resource deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::BackendType;
    use serde_json::json;
    use std::time::Duration;
    use wiremock::matchers::{method, path, query_param, query_param_is_missing};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const GROUPS_PATH: &str = "/subscriptions/sub-1/resourcegroups";
    const VAULT_PATH: &str =
        "/subscriptions/sub-1/resourceGroups/rg/providers/Microsoft.KeyVault/vaults/kv";

    fn backend() -> AzureBackend {
        AzureBackend::new(
            Config::new(BackendType::AzureResourceManager)
                .with_subscription_id("sub-1")
                .with_endpoint("https://management.azure.com/"),
        )
    }

    #[test]
    fn test_urls() {
        let backend = backend();

        assert_eq!(
            backend.group_url("rg"),
            "https://management.azure.com/subscriptions/sub-1/resourcegroups/rg?api-version=2021-04-01"
        );

        let vault = ResourceSpec::key_vault("kv", "westus", "t");
        assert_eq!(
            backend.url(&vault.path_in("rg"), &vault.api_version),
            "https://management.azure.com/subscriptions/sub-1/resourceGroups/rg/providers/Microsoft.KeyVault/vaults/kv?api-version=2015-06-01"
        );
    }

    #[test]
    fn test_scope_follows_endpoint() {
        assert_eq!(backend().scope(), "https://management.azure.com/.default");

        let gov = AzureBackend::new(
            Config::new(BackendType::AzureResourceManager)
                .with_subscription_id("s")
                .with_endpoint("https://management.usgovcloudapi.net"),
        );
        assert_eq!(gov.scope(), "https://management.usgovcloudapi.net/.default");
    }

    #[test]
    fn test_groups_api_version_option() {
        let backend = AzureBackend::new(
            Config::new(BackendType::AzureResourceManager)
                .with_subscription_id("s")
                .with_option("groups_api_version", "2022-09-01"),
        );
        assert!(backend.group_url("rg").ends_with("api-version=2022-09-01"));
    }

    #[tokio::test]
    async fn test_calls_before_init_fail() {
        let mut backend = backend();
        assert!(!backend.is_authenticated().await);
        assert!(matches!(
            backend.authenticate().await,
            Err(RgmuxError::NotAuthenticated)
        ));

        let session = AzureSession::new("tok", None);
        let result = backend.list_groups(&session).await;
        assert!(matches!(result, Err(RgmuxError::PageFetch { page: 1, .. })));
    }

    #[test]
    fn test_op_error_keeps_not_found() {
        let backend = backend();
        let err = backend.op_error("delete-group", "rg", RgmuxError::NotFound("rg".to_string()));
        assert!(matches!(err, RgmuxError::NotFound(_)));

        let err = backend.op_error(
            "delete-group",
            "rg",
            RgmuxError::Http {
                status: 409,
                message: "conflict".to_string(),
            },
        );
        assert_eq!(err.to_string(), "azurerm: delete-group rg: HTTP 409: conflict");
    }

    /// Backend pointed at `server` with a ready HTTP client and fast polling.
    fn stub_backend(server: &MockServer, poll_interval: Duration) -> AzureBackend {
        let mut backend = AzureBackend::new(
            Config::new(BackendType::AzureResourceManager)
                .with_subscription_id("sub-1")
                .with_endpoint(server.uri())
                .with_poll_interval(poll_interval)
                .with_max_polls(3),
        );
        backend.http = Some(reqwest::Client::new());
        backend
    }

    fn group_json(name: &str) -> serde_json::Value {
        json!({
            "id": format!("/subscriptions/sub-1/resourceGroups/{}", name),
            "name": name,
            "type": "Microsoft.Resources/resourceGroups",
            "location": "westus",
            "properties": {"provisioningState": "Succeeded"}
        })
    }

    #[tokio::test]
    async fn test_group_listing_follows_next_link() {
        let server = MockServer::start().await;
        let next = format!(
            "{}{}?api-version=2021-04-01&%24skiptoken=page2",
            server.uri(),
            GROUPS_PATH
        );

        Mock::given(method("GET"))
            .and(path(GROUPS_PATH))
            .and(query_param("api-version", "2021-04-01"))
            .and(query_param_is_missing("$skiptoken"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"value": [group_json("rg-a")], "nextLink": next})),
            )
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(GROUPS_PATH))
            .and(query_param("$skiptoken", "page2"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"value": [group_json("rg-b")]})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let backend = stub_backend(&server, Duration::from_millis(1));
        let session = AzureSession::new("tok", None);
        let groups = backend.list_groups(&session).await.unwrap();

        let names: Vec<_> = groups.iter().map(|g| g.name.as_str()).collect();
        assert_eq!(names, vec!["rg-a", "rg-b"]);

        let requests = server.received_requests().await.unwrap();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[1].url.path(), GROUPS_PATH);
        assert_eq!(
            requests[1].url.query(),
            Some("api-version=2021-04-01&%24skiptoken=page2")
        );
        assert_eq!(
            requests[0].headers.get("authorization").unwrap().to_str().unwrap(),
            "Bearer tok"
        );
    }

    #[tokio::test]
    async fn test_export_polls_until_done() {
        let server = MockServer::start().await;
        let first = format!("{}/operations/1", server.uri());
        let second = format!("{}/operations/2", server.uri());

        Mock::given(method("POST"))
            .and(path(format!("{}/rg/exportTemplate", GROUPS_PATH)))
            .respond_with(ResponseTemplate::new(202).insert_header("Location", first.as_str()))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/operations/1"))
            .respond_with(ResponseTemplate::new(202).insert_header("Location", second.as_str()))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/operations/2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "template": {"contentVersion": "1.0.0.0", "resources": []}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let backend = stub_backend(&server, Duration::from_millis(1));
        let session = AzureSession::new("tok", None);
        let snapshot = backend.export_template("rg", &session).await.unwrap();

        assert_eq!(snapshot.document()["template"]["contentVersion"], "1.0.0.0");
    }

    #[tokio::test]
    async fn test_polling_stops_at_max_polls() {
        let server = MockServer::start().await;
        let location = format!("{}/operations/stuck", server.uri());

        Mock::given(method("DELETE"))
            .and(path(format!("{}/rg", GROUPS_PATH)))
            .respond_with(ResponseTemplate::new(202).insert_header("Location", location.as_str()))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/operations/stuck"))
            .respond_with(ResponseTemplate::new(202))
            .expect(3)
            .mount(&server)
            .await;

        let mut backend = stub_backend(&server, Duration::from_millis(1));
        let session = AzureSession::new("tok", None);
        let err = backend.delete_group("rg", &session).await.unwrap_err();

        assert!(err.to_string().contains("did not finish after 3 polls"));
        assert_eq!(err.kind(), crate::ErrorKind::Remote);
    }

    #[tokio::test]
    async fn test_retry_after_overrides_poll_interval() {
        let server = MockServer::start().await;
        let location = format!("{}/operations/1", server.uri());

        Mock::given(method("DELETE"))
            .and(path(format!("{}/rg", GROUPS_PATH)))
            .respond_with(
                ResponseTemplate::new(202)
                    .insert_header("Location", location.as_str())
                    .insert_header("Retry-After", "0"),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/operations/1"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        // Without the header this would wait an hour.
        let mut backend = stub_backend(&server, Duration::from_secs(3600));
        let session = AzureSession::new("tok", None);
        let result = tokio::time::timeout(
            Duration::from_secs(10),
            backend.delete_group("rg", &session),
        )
        .await;

        assert!(matches!(result, Ok(Ok(()))));
    }

    #[tokio::test]
    async fn test_delete_missing_group_is_not_found() {
        let server = MockServer::start().await;

        Mock::given(method("DELETE"))
            .and(path(format!("{}/rg", GROUPS_PATH)))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({
                "error": {"code": "ResourceGroupNotFound", "message": "Resource group 'rg' could not be found."}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let mut backend = stub_backend(&server, Duration::from_millis(1));
        let session = AzureSession::new("tok", None);
        let err = backend.delete_group("rg", &session).await.unwrap_err();

        assert!(matches!(err, RgmuxError::NotFound(ref target) if target == "rg"));
    }

    #[tokio::test]
    async fn test_create_resource_reads_back_empty_body() {
        let server = MockServer::start().await;

        Mock::given(method("PUT"))
            .and(path(VAULT_PATH))
            .and(query_param("api-version", "2015-06-01"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(VAULT_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": VAULT_PATH,
                "name": "kv",
                "type": "Microsoft.KeyVault/vaults",
                "location": "westus",
                "properties": {"provisioningState": "Succeeded"}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let mut backend = stub_backend(&server, Duration::from_millis(1));
        let session = AzureSession::new("tok", None);
        let vault = ResourceSpec::key_vault("kv", "westus", "tenant");
        let item = backend
            .create_or_update_resource("rg", &vault, &session)
            .await
            .unwrap();

        assert_eq!(item.name, "kv");
        assert_eq!(item.provisioning_state.as_deref(), Some("Succeeded"));
    }

    #[tokio::test]
    async fn test_create_resource_bad_body_is_decode_error() {
        let server = MockServer::start().await;

        Mock::given(method("PUT"))
            .and(path(VAULT_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>gateway</html>"))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(VAULT_PATH))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let mut backend = stub_backend(&server, Duration::from_millis(1));
        let session = AzureSession::new("tok", None);
        let vault = ResourceSpec::key_vault("kv", "westus", "tenant");
        let err = backend
            .create_or_update_resource("rg", &vault, &session)
            .await
            .unwrap_err();

        match err {
            RgmuxError::BackendOperation { source, .. } => {
                assert!(matches!(*source, RgmuxError::Json(_)));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_missing_subscription_fails_init() {
        let mut backend = AzureBackend::new(Config::new(BackendType::AzureResourceManager));

        let err = backend.init().await.unwrap_err();
        assert!(matches!(err, RgmuxError::MissingEnvironment(ref names) if names == &["AZURE_SUBSCRIPTION_ID"]));
    }
}
