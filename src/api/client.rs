use super::credential::PatCredential;
use super::transport::{ApiRequest, ApiResponse, HttpMethod, HttpTransport, Transport};
use super::wiql;
use crate::error::{ApiError, ApiResult};
use crate::models::{QueryCriteria, WorkItem, WorkItemComment, WorkItemDetails, WorkItemId, WorkspaceConfig};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// API version for work item, query and batch endpoints.
pub const API_VERSION: &str = "7.1-preview.2";
/// API version for the comments endpoint.
pub const COMMENTS_API_VERSION: &str = "7.1-preview.3";
/// Content type Azure DevOps requires for work item updates.
pub const JSON_PATCH_CONTENT_TYPE: &str = "application/json-patch+json";

const QUERY_ACTION: &str = "query work items";
const UPDATE_ACTION: &str = "update work items";
const COMMENT_ACTION: &str = "add comments";

#[derive(Deserialize)]
struct WiqlResponse {
    #[serde(rename = "workItems", default)]
    work_items: Vec<WorkItemReference>,
}

#[derive(Deserialize)]
struct WorkItemReference {
    id: i32,
}

#[derive(Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
struct ValueList<T> {
    // Absent and null both mean an empty list.
    #[serde(default)]
    value: Option<Vec<T>>,
}

impl<T> ValueList<T> {
    fn into_items(self) -> Vec<T> {
        self.value.unwrap_or_default()
    }
}

/// Client for the work item tracking REST API.
///
/// Stateless apart from the transport: every call takes the workspace it
/// should act on and re-sends the token.
pub struct AzureDevOpsClient<T = HttpTransport> {
    transport: Arc<T>,
}

impl<T> Clone for AzureDevOpsClient<T> {
    fn clone(&self) -> Self {
        Self {
            transport: Arc::clone(&self.transport),
        }
    }
}

impl AzureDevOpsClient<HttpTransport> {
    /// Creates a client backed by reqwest.
    pub fn new() -> ApiResult<Self> {
        Ok(Self::with_transport(HttpTransport::new()?))
    }
}

impl<T: Transport> AzureDevOpsClient<T> {
    pub fn with_transport(transport: T) -> Self {
        Self {
            transport: Arc::new(transport),
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Runs a query for `criteria` and fetches `fields` for every match.
    ///
    /// Two round trips: the WIQL query returns ids, the batch call returns the
    /// items. An empty id list returns early without the batch call.
    pub async fn query_work_items(
        &self,
        auth: &WorkspaceConfig,
        criteria: &QueryCriteria,
        fields: &[String],
    ) -> ApiResult<Vec<WorkItem>> {
        let credential = PatCredential::from_workspace(auth, QUERY_ACTION)?;
        let base = auth.project_url();
        let query = wiql::build_query(criteria);
        debug!(query = %query, "Querying work items");

        let request = self
            .request(HttpMethod::Post, format!("{}/_apis/wit/wiql", base), &credential)
            .query("api-version", API_VERSION)
            .json(json!({ "query": query }));
        let response = self.send_checked(request).await?;
        let ids: Vec<i32> = decode::<WiqlResponse>("query", &response)?
            .work_items
            .into_iter()
            .map(|r| r.id)
            .collect();

        if ids.is_empty() {
            debug!("Query matched no work items");
            return Ok(Vec::new());
        }

        debug!(count = ids.len(), "Fetching work item batch");
        let request = self
            .request(
                HttpMethod::Post,
                format!("{}/_apis/wit/workitemsbatch", base),
                &credential,
            )
            .query("api-version", API_VERSION)
            .json(json!({ "ids": ids, "fields": fields }));
        let response = self.send_checked(request).await?;
        let items = decode::<ValueList<WorkItem>>("work item batch", &response)?.into_items();

        info!(count = items.len(), "Loaded work items");
        Ok(items)
    }

    /// Fetches one item (with relations) and its comments concurrently.
    ///
    /// Both calls must succeed; if either fails, the other result is dropped.
    pub async fn get_work_item_details(
        &self,
        auth: &WorkspaceConfig,
        id: WorkItemId,
        fields: &[String],
    ) -> ApiResult<WorkItemDetails> {
        let credential = PatCredential::from_workspace(auth, QUERY_ACTION)?;
        let base = auth.project_url();
        debug!(%id, "Loading work item details");

        let item_request = self
            .request(
                HttpMethod::Get,
                format!("{}/_apis/wit/workitems/{}", base, id),
                &credential,
            )
            .query("api-version", API_VERSION)
            .query("$expand", "relations")
            .query("fields", fields.join(","));
        let comments_request = self
            .request(
                HttpMethod::Get,
                format!("{}/_apis/wit/workItems/{}/comments", base, id),
                &credential,
            )
            .query("api-version", COMMENTS_API_VERSION);

        let (item_response, comments_response) = futures::try_join!(
            self.send_checked(item_request),
            self.send_checked(comments_request)
        )?;

        let work_item = decode::<WorkItem>("work item", &item_response)?;
        let comments = decode::<ValueList<WorkItemComment>>("comments", &comments_response)?
            .into_items();

        debug!(%id, comments = comments.len(), "Loaded work item details");
        Ok(WorkItemDetails {
            work_item,
            comments,
        })
    }

    /// Sets `System.State`. Last write wins; nothing is read back.
    pub async fn update_work_item_state(
        &self,
        auth: &WorkspaceConfig,
        id: WorkItemId,
        new_state: &str,
    ) -> ApiResult<()> {
        let credential = PatCredential::from_workspace(auth, UPDATE_ACTION)?;
        let request = self
            .request(
                HttpMethod::Patch,
                format!("{}/_apis/wit/workitems/{}", auth.project_url(), id),
                &credential,
            )
            .query("api-version", API_VERSION)
            .json(json!([
                { "op": "add", "path": "/fields/System.State", "value": new_state }
            ]))
            .content_type(JSON_PATCH_CONTENT_TYPE);

        self.send_checked(request).await?;
        info!(%id, state = new_state, "Updated work item state");
        Ok(())
    }

    /// Posts a comment as given; callers decide what text is acceptable.
    pub async fn add_work_item_comment(
        &self,
        auth: &WorkspaceConfig,
        id: WorkItemId,
        text: &str,
    ) -> ApiResult<()> {
        let credential = PatCredential::from_workspace(auth, COMMENT_ACTION)?;
        let request = self
            .request(
                HttpMethod::Post,
                format!("{}/_apis/wit/workItems/{}/comments", auth.project_url(), id),
                &credential,
            )
            .query("api-version", COMMENTS_API_VERSION)
            .json(json!({ "text": text }));

        self.send_checked(request).await?;
        info!(%id, "Added comment");
        Ok(())
    }

    fn request(&self, method: HttpMethod, url: String, credential: &PatCredential) -> ApiRequest {
        ApiRequest::new(method, url, credential.authorization_header())
    }

    async fn send_checked(&self, request: ApiRequest) -> ApiResult<ApiResponse> {
        let method = request.method;
        let url = request.url.clone();
        let response = self.transport.send(request).await?;
        if !response.is_success() {
            warn!(%method, %url, status = response.status, "Azure DevOps request failed");
            return Err(ApiError::RequestFailed {
                status: response.status,
                body: response.body,
            });
        }
        Ok(response)
    }
}

fn decode<R: DeserializeOwned>(what: &'static str, response: &ApiResponse) -> ApiResult<R> {
    serde_json::from_str(&response.body).map_err(|e| ApiError::Decode {
        what,
        message: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::transport::mocks::MockTransport;
    use crate::fields::{default_fields, detail_fields};
    use secrecy::ExposeSecret;
    use serde_json::Value;

    const BASE: &str = "https://dev.azure.com/org/proj";

    fn workspace() -> WorkspaceConfig {
        WorkspaceConfig::new("org", "proj", "https://dev.azure.com/").with_pat("token")
    }

    fn id(value: i64) -> WorkItemId {
        WorkItemId::new(value).unwrap()
    }

    fn client(mock: &MockTransport) -> AzureDevOpsClient<MockTransport> {
        AzureDevOpsClient::with_transport(mock.clone())
    }

    /// # Missing Credential Blocks Every Operation
    ///
    /// Tests that no operation touches the transport without a token.
    ///
    /// ## Test Scenario
    /// - Workspace without a PAT
    /// - Call all four operations
    ///
    /// ## Expected Outcome
    /// - Each fails with MissingCredential naming its action
    /// - The transport records zero calls
    #[tokio::test]
    async fn test_missing_credential_blocks_every_operation() {
        let mock = MockTransport::new();
        let client = client(&mock);
        let ws = WorkspaceConfig::new("org", "proj", "https://dev.azure.com");

        let err = client
            .query_work_items(&ws, &QueryCriteria::default(), &default_fields())
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Personal Access Token is required to query work items"
        );

        let err = client
            .get_work_item_details(&ws, id(1), &detail_fields())
            .await
            .unwrap_err();
        assert!(err.is_missing_credential());

        let err = client
            .update_work_item_state(&ws, id(1), "Active")
            .await
            .unwrap_err();
        assert!(err.to_string().ends_with("update work items"));

        let err = client
            .add_work_item_comment(&ws, id(1), "hi")
            .await
            .unwrap_err();
        assert!(err.to_string().ends_with("add comments"));

        assert_eq!(mock.call_count().await, 0);
    }

    /// # Query Then Batch
    ///
    /// Tests the two-step query flow.
    ///
    /// ## Test Scenario
    /// - WIQL returns ids 3 and 5; batch returns two items
    ///
    /// ## Expected Outcome
    /// - Query POST carries the WIQL text and api-version
    /// - Batch POST carries ids and the requested fields
    /// - Items come back in batch order
    #[tokio::test]
    async fn test_query_then_batch() {
        let mock = MockTransport::new();
        mock.respond_json(
            HttpMethod::Post,
            "/_apis/wit/wiql",
            json!({"workItems": [{"id": 3, "url": "u3"}, {"id": 5, "url": "u5"}]}),
        )
        .await;
        mock.respond_json(
            HttpMethod::Post,
            "/_apis/wit/workitemsbatch",
            json!({"count": 2, "value": [
                {"id": 3, "url": "u3", "fields": {"System.Title": "Three"}},
                {"id": 5, "url": "u5", "fields": {"System.Title": "Five"}}
            ]}),
        )
        .await;

        let fields = vec!["System.Id".to_string(), "System.Title".to_string()];
        let items = client(&mock)
            .query_work_items(&workspace(), &QueryCriteria::new().search("o'k"), &fields)
            .await
            .unwrap();

        assert_eq!(items.iter().map(WorkItem::id).collect::<Vec<_>>(), vec![3, 5]);
        assert_eq!(items[1].title(), Some("Five"));

        let requests = mock.requests().await;
        assert_eq!(requests.len(), 2);

        let query = &requests[0];
        assert_eq!(query.url, format!("{}/_apis/wit/wiql", BASE));
        assert_eq!(query.query_value("api-version"), Some(API_VERSION));
        let wiql_text = query.body.as_ref().and_then(|b| b["query"].as_str()).unwrap();
        assert!(wiql_text.contains("CONTAINS 'o''k'"));
        assert!(wiql_text.ends_with("ORDER BY [System.ChangedDate] DESC"));

        let batch = &requests[1];
        assert_eq!(batch.url, format!("{}/_apis/wit/workitemsbatch", BASE));
        assert_eq!(
            batch.body,
            Some(json!({"ids": [3, 5], "fields": ["System.Id", "System.Title"]}))
        );
        assert_eq!(batch.authorization.expose_secret(), "Basic OnRva2Vu");
    }

    /// # Empty Query Result Skips Batch
    ///
    /// Tests the short circuit on an empty id list.
    ///
    /// ## Test Scenario
    /// - WIQL returns no work items
    ///
    /// ## Expected Outcome
    /// - Empty list, exactly one transport call
    #[tokio::test]
    async fn test_empty_query_skips_batch() {
        let mock = MockTransport::new();
        mock.respond_json(HttpMethod::Post, "/_apis/wit/wiql", json!({"workItems": []}))
            .await;

        let items = client(&mock)
            .query_work_items(&workspace(), &QueryCriteria::default(), &default_fields())
            .await
            .unwrap();

        assert!(items.is_empty());
        assert_eq!(mock.call_count().await, 1);
    }

    /// # Details Load Item And Comments
    ///
    /// Tests the detail request pair.
    ///
    /// ## Test Scenario
    /// - Item GET returns fields and relations; comments GET returns one comment
    ///
    /// ## Expected Outcome
    /// - Item GET uses $expand=relations and the csv field list
    /// - Comments GET uses the comments api-version
    /// - Result carries both
    #[tokio::test]
    async fn test_details_load_item_and_comments() {
        let mock = MockTransport::new();
        mock.respond_json(
            HttpMethod::Get,
            "/_apis/wit/workitems/42",
            json!({
                "id": 42, "rev": 7, "url": "u42",
                "fields": {"System.Title": "Answer", "System.State": "Active"},
                "relations": [{"rel": "System.LinkTypes.Hierarchy-Reverse", "url": "p", "attributes": {"isLocked": false}}]
            }),
        )
        .await;
        mock.respond_json(
            HttpMethod::Get,
            "/_apis/wit/workItems/42/comments",
            json!({"count": 1, "value": [{
                "id": 1, "text": "first",
                "createdBy": {"displayName": "Bob"},
                "createdDate": "2024-05-01T12:00:00Z"
            }]}),
        )
        .await;

        let fields = detail_fields();
        let details = client(&mock)
            .get_work_item_details(&workspace(), id(42), &fields)
            .await
            .unwrap();

        assert_eq!(details.work_item.id(), 42);
        assert_eq!(details.work_item.relations.as_ref().map(Vec::len), Some(1));
        assert_eq!(details.comments.len(), 1);
        assert_eq!(details.comments[0].created_by.display_name, "Bob");

        let requests = mock.requests().await;
        let item = requests
            .iter()
            .find(|r| r.url.ends_with("/workitems/42"))
            .unwrap();
        assert_eq!(item.query_value("api-version"), Some(API_VERSION));
        assert_eq!(item.query_value("$expand"), Some("relations"));
        assert_eq!(item.query_value("fields"), Some(fields.join(",").as_str()));

        let comments = requests
            .iter()
            .find(|r| r.url.ends_with("/comments"))
            .unwrap();
        assert_eq!(comments.query_value("api-version"), Some(COMMENTS_API_VERSION));
    }

    /// # Missing Comment Value
    ///
    /// Tests that a comments response without `value`, or with a null one,
    /// reads as no comments.
    ///
    /// ## Test Scenario
    /// - Comments GET returns `{"count": 0}`
    /// - Comments GET returns `{"count": 0, "value": null}`
    ///
    /// ## Expected Outcome
    /// - Details load with an empty comment list
    #[tokio::test]
    async fn test_missing_comment_value() {
        let mock = MockTransport::new();
        mock.respond_json(HttpMethod::Get, "/workitems/8", json!({"id": 8, "fields": {}}))
            .await;
        mock.respond_json(HttpMethod::Get, "/workItems/8/comments", json!({"count": 0}))
            .await;

        let details = client(&mock)
            .get_work_item_details(&workspace(), id(8), &detail_fields())
            .await
            .unwrap();
        assert!(details.comments.is_empty());

        let mock = MockTransport::new();
        mock.respond_json(HttpMethod::Get, "/workitems/8", json!({"id": 8, "fields": {}}))
            .await;
        mock.respond_json(
            HttpMethod::Get,
            "/workItems/8/comments",
            json!({"count": 0, "value": null}),
        )
        .await;

        let details = client(&mock)
            .get_work_item_details(&workspace(), id(8), &detail_fields())
            .await
            .unwrap();
        assert!(details.comments.is_empty());
    }

    /// # Comment Failure Fails Details
    ///
    /// Tests that the second call's failure propagates.
    ///
    /// ## Test Scenario
    /// - Item GET succeeds, comments GET returns 500
    ///
    /// ## Expected Outcome
    /// - The whole call fails with the comments status and body
    #[tokio::test]
    async fn test_comment_failure_fails_details() {
        let mock = MockTransport::new();
        mock.respond_json(HttpMethod::Get, "/workitems/8", json!({"id": 8}))
            .await;
        mock.respond(HttpMethod::Get, "/workItems/8/comments", 500, "boom")
            .await;

        let err = client(&mock)
            .get_work_item_details(&workspace(), id(8), &detail_fields())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Azure DevOps request failed (500): boom");
    }

    /// # State Update Patch
    ///
    /// Tests the JSON-patch document and content type.
    ///
    /// ## Test Scenario
    /// - Update item 42 to Resolved
    ///
    /// ## Expected Outcome
    /// - One PATCH with the add-op body and json-patch content type
    #[tokio::test]
    async fn test_state_update_patch() {
        let mock = MockTransport::new();
        mock.respond_json(HttpMethod::Patch, "/_apis/wit/workitems/42", json!({"id": 42}))
            .await;

        client(&mock)
            .update_work_item_state(&workspace(), id(42), "Resolved")
            .await
            .unwrap();

        let requests = mock.requests().await;
        assert_eq!(requests.len(), 1);
        let patch = &requests[0];
        assert_eq!(patch.method, HttpMethod::Patch);
        assert_eq!(patch.content_type, Some(JSON_PATCH_CONTENT_TYPE));
        assert_eq!(
            patch.body,
            Some(json!([{"op": "add", "path": "/fields/System.State", "value": "Resolved"}]))
        );
    }

    /// # Add Comment Post
    ///
    /// Tests the comment POST body and api-version.
    ///
    /// ## Test Scenario
    /// - Post "Looks good" on item 9
    ///
    /// ## Expected Outcome
    /// - Body is `{"text": "Looks good"}`, comments api-version used
    #[tokio::test]
    async fn test_add_comment_post() {
        let mock = MockTransport::new();
        mock.respond(HttpMethod::Post, "/_apis/wit/workItems/9/comments", 200, "{}")
            .await;

        client(&mock)
            .add_work_item_comment(&workspace(), id(9), "Looks good")
            .await
            .unwrap();

        let request = &mock.requests().await[0];
        assert_eq!(request.body, Some(json!({"text": "Looks good"})));
        assert_eq!(request.query_value("api-version"), Some(COMMENTS_API_VERSION));
    }

    /// # Unauthorized Everywhere
    ///
    /// Tests that a 401 surfaces status and body from every operation.
    ///
    /// ## Test Scenario
    /// - Every request answers 401 "unauthorized"
    ///
    /// ## Expected Outcome
    /// - All four operations fail with a message containing 401 and unauthorized
    #[tokio::test]
    async fn test_unauthorized_everywhere() {
        let mock = MockTransport::new();
        mock.respond_to_all(401, "unauthorized").await;
        let client = client(&mock);
        let ws = workspace();

        let errors = vec![
            client
                .query_work_items(&ws, &QueryCriteria::default(), &default_fields())
                .await
                .unwrap_err(),
            client
                .get_work_item_details(&ws, id(1), &detail_fields())
                .await
                .unwrap_err(),
            client
                .update_work_item_state(&ws, id(1), "Closed")
                .await
                .unwrap_err(),
            client
                .add_work_item_comment(&ws, id(1), "x")
                .await
                .unwrap_err(),
        ];

        for err in errors {
            let msg = err.to_string();
            assert!(msg.contains("401"), "{msg}");
            assert!(msg.contains("unauthorized"), "{msg}");
            assert_eq!(err.status(), Some(401));
        }
    }

    /// # Malformed Success Body
    ///
    /// Tests that a 2xx body with the wrong shape is a decode error.
    ///
    /// ## Test Scenario
    /// - WIQL endpoint returns 200 with HTML
    ///
    /// ## Expected Outcome
    /// - ApiError::Decode naming the query response
    #[tokio::test]
    async fn test_malformed_success_body() {
        let mock = MockTransport::new();
        mock.respond(HttpMethod::Post, "/_apis/wit/wiql", 200, "<html>sign in</html>")
            .await;

        let err = client(&mock)
            .query_work_items(&workspace(), &QueryCriteria::default(), &default_fields())
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Decode { what: "query", .. }));
    }

    /// # Field Values Stay Opaque
    ///
    /// Tests that unexpected field value types pass through untouched.
    ///
    /// ## Test Scenario
    /// - Batch returns a nested object and an array as field values
    ///
    /// ## Expected Outcome
    /// - Values are preserved as raw JSON
    #[tokio::test]
    async fn test_field_values_stay_opaque() {
        let mock = MockTransport::new();
        mock.respond_json(HttpMethod::Post, "/wiql", json!({"workItems": [{"id": 1}]}))
            .await;
        mock.respond_json(
            HttpMethod::Post,
            "/workitemsbatch",
            json!({"value": [{"id": 1, "fields": {"Custom.Blob": {"a": [1, 2]}, "Custom.List": [true]}}]}),
        )
        .await;

        let items = client(&mock)
            .query_work_items(&workspace(), &QueryCriteria::default(), &default_fields())
            .await
            .unwrap();
        assert_eq!(items[0].field("Custom.Blob"), Some(&json!({"a": [1, 2]})));
        assert_eq!(items[0].field("Custom.List"), Some(&Value::Array(vec![Value::Bool(true)])));
    }
}
