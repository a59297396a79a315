//! Notion database repository
//!
//! Implements the `FileRepository` trait on top of the Notion REST API.

use async_trait::async_trait;
use bridge_traits::error::Result as BridgeResult;
use bridge_traits::http::{HttpClient, HttpMethod, HttpRequest};
use bridge_traits::links::LinkGenerator;
use bridge_traits::storage::{FileRecord, FileRepository, RelativeId, UpsertOutcome};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, instrument, warn};

use crate::error::{NotionError, Result};
use crate::types::{
    relation, row_properties, self_relation_schema, CreatePageRequest, CreatedPage,
    DatabaseId, DatabaseParent, DatabaseSchema, Icon, QueryRequest, QueryResponse,
    UpdatePageRequest,
};

/// Notion API base URL
const NOTION_API_BASE: &str = "https://api.notion.com/v1";

/// Pinned API version
pub const NOTION_VERSION: &str = "2022-06-28";

/// Maximum results per page (Notion API limit)
const PAGE_SIZE: u32 = 100;

const LIST_TIMEOUT: Duration = Duration::from_secs(30);
const LOOKUP_TIMEOUT: Duration = Duration::from_secs(10);
const WRITE_TIMEOUT: Duration = Duration::from_secs(30);

/// Relation property name in Spanish-localized workspaces
pub const RELATION_PROPERTY_ES: &str = "ítem principal";
/// Relation property name in English workspaces, created when neither exists
pub const RELATION_PROPERTY_EN: &str = "Parent item";

const FOLDER_MARKER: &str = "FOLDER";
const NO_EXTENSION: &str = "None";
const FOLDER_LINK_PLACEHOLDER: &str = "https://notion.so";
const FOLDER_ICON: &str = "📁";
const FILE_ICON: &str = "📄";

/// Where a write puts the parent relation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelationTarget {
    /// Under the named relation property
    Property(String),
    /// Not at all
    Omitted,
}

#[derive(Debug, Clone, Copy)]
enum RowWrite<'a> {
    Create,
    Update(&'a str),
}

/// Notion-backed [`FileRepository`]
///
/// Each local entry is one database row keyed by its `RelativeID`. Folders
/// become rows too, linked to their parent through a self relation.
///
/// The repository keeps an identifier → page-id cache. It is replaced on
/// every full listing and extended by point lookups and creations.
///
/// # Example
///
/// ```ignore
/// use provider_notion::NotionRepository;
///
/// let mut repository = NotionRepository::connect(http_client, token, db_id, links).await;
/// let rows = repository.get_all_active_files().await?;
/// ```
pub struct NotionRepository {
    http_client: Arc<dyn HttpClient>,
    token: String,
    database_id: DatabaseId,
    link_generator: Arc<dyn LinkGenerator>,
    relation_property: Option<String>,
    cache: HashMap<RelativeId, String>,
}

impl NotionRepository {
    /// Create a repository without touching the network
    pub fn new(
        http_client: Arc<dyn HttpClient>,
        token: impl Into<String>,
        database_id: &str,
        link_generator: Arc<dyn LinkGenerator>,
    ) -> Self {
        let database_id = DatabaseId::parse(database_id);
        debug!(database_id = %database_id, "Using Notion database");

        Self {
            http_client,
            token: token.into(),
            database_id,
            link_generator,
            relation_property: None,
            cache: HashMap::new(),
        }
    }

    /// Create a repository and make sure the hierarchy relation exists
    pub async fn connect(
        http_client: Arc<dyn HttpClient>,
        token: impl Into<String>,
        database_id: &str,
        link_generator: Arc<dyn LinkGenerator>,
    ) -> Self {
        let mut repository = Self::new(http_client, token, database_id, link_generator);
        repository.ensure_hierarchy_property().await;
        repository
    }

    pub fn database_id(&self) -> &DatabaseId {
        &self.database_id
    }

    /// Relation property found or created at bootstrap
    pub fn relation_property(&self) -> Option<&str> {
        self.relation_property.as_deref()
    }

    pub fn cached_row_id(&self, identifier: &RelativeId) -> Option<&str> {
        self.cache.get(identifier).map(String::as_str)
    }

    /// Detect the parent relation property, creating `Parent item` if absent
    ///
    /// Failures are logged; the repository keeps working without a known
    /// relation and relies on the fallback chain.
    #[instrument(skip(self), fields(database_id = %self.database_id))]
    pub async fn ensure_hierarchy_property(&mut self) {
        let schema: DatabaseSchema = match self
            .send(self.request(HttpMethod::Get, &self.database_path(""), WRITE_TIMEOUT))
            .await
        {
            Ok(schema) => schema,
            Err(e) => {
                warn!(error = %e, "Could not read database schema, hierarchy setup skipped");
                warn!("Enable sub-items in the Notion database settings to get folder nesting");
                return;
            }
        };

        for name in [RELATION_PROPERTY_ES, RELATION_PROPERTY_EN] {
            if let Some(property) = schema.properties.get(name) {
                info!(property = name, kind = %property.kind, "Detected hierarchy property");
                self.relation_property = Some(name.to_string());
                return;
            }
        }

        info!(property = RELATION_PROPERTY_EN, "Creating hierarchy property");
        match self.create_relation_property().await {
            Ok(()) => {
                info!("Hierarchy property created");
                self.relation_property = Some(RELATION_PROPERTY_EN.to_string());
            }
            Err(e) => {
                warn!(error = %e, "Could not create hierarchy property");
                warn!("Enable sub-items in the Notion database settings to get folder nesting");
            }
        }
    }

    async fn create_relation_property(&self) -> Result<()> {
        let body = self_relation_schema(RELATION_PROPERTY_EN, &self.database_id);
        self.send_json::<Value, _>(HttpMethod::Patch, &self.database_path(""), &body)
            .await?;
        Ok(())
    }

    /// Ordered relation placements to try for a write
    ///
    /// The detected property comes first, then the other known name, then
    /// no relation. Writes without a parent only try [`RelationTarget::Omitted`].
    pub fn relation_candidates(&self, has_parent: bool) -> Vec<RelationTarget> {
        if !has_parent {
            return vec![RelationTarget::Omitted];
        }

        let mut candidates = Vec::with_capacity(3);
        if let Some(detected) = &self.relation_property {
            candidates.push(RelationTarget::Property(detected.clone()));
        }
        for name in [RELATION_PROPERTY_ES, RELATION_PROPERTY_EN] {
            if self.relation_property.as_deref() != Some(name) {
                candidates.push(RelationTarget::Property(name.to_string()));
            }
        }
        candidates.push(RelationTarget::Omitted);
        candidates
    }

    /// Resolve the page id of `identifier` from the cache or a point query
    pub async fn find_row_id(&mut self, identifier: &RelativeId) -> Option<String> {
        if let Some(row_id) = self.cache.get(identifier) {
            return Some(row_id.clone());
        }

        let request = match self
            .request(HttpMethod::Post, &self.database_path("/query"), LOOKUP_TIMEOUT)
            .json(&QueryRequest::by_relative_id(identifier.as_str()))
        {
            Ok(request) => request,
            Err(e) => {
                debug!(identifier = %identifier, error = %e, "Lookup request not built");
                return None;
            }
        };

        match self.send::<QueryResponse>(request).await {
            Ok(response) => {
                let row_id = response.results.into_iter().next()?.id;
                self.cache.insert(identifier.clone(), row_id.clone());
                Some(row_id)
            }
            Err(e) => {
                debug!(identifier = %identifier, error = %e, "Lookup failed");
                None
            }
        }
    }

    /// Make sure every ancestor folder of `identifier` has a row
    ///
    /// Returns the page id of the immediate parent, or `None` for top-level
    /// entries and when the parent row could not be created.
    #[instrument(skip(self, identifier), fields(identifier = %identifier))]
    pub async fn ensure_parent_folder(&mut self, identifier: &RelativeId) -> Option<String> {
        let mut missing = Vec::new();
        let mut anchor = None;
        let mut current = identifier.parent();

        while let Some(folder) = current {
            if let Some(row_id) = self.find_row_id(&folder).await {
                anchor = Some(row_id);
                break;
            }
            current = folder.parent();
            missing.push(folder);
        }

        // Top-down, each folder linked to the one above it
        for folder in missing.into_iter().rev() {
            anchor = self.create_folder_row(&folder, anchor.as_deref()).await;
        }

        anchor
    }

    async fn create_folder_row(
        &mut self,
        folder: &RelativeId,
        parent_row: Option<&str>,
    ) -> Option<String> {
        info!(folder = %folder, "Auto-creating folder row");

        let properties = row_properties(
            folder.name(),
            folder.as_str(),
            FOLDER_MARKER,
            FOLDER_LINK_PLACEHOLDER,
        );

        match self
            .write_row(RowWrite::Create, properties, Some(Icon::emoji(FOLDER_ICON)), parent_row)
            .await
        {
            Ok(row_id) => {
                self.cache.insert(folder.clone(), row_id.clone());
                Some(row_id)
            }
            Err(e) => {
                error!(folder = %folder, error = %e, "Failed to create folder row");
                None
            }
        }
    }

    /// Create or update a row, walking the relation fallback chain
    ///
    /// Returns the page id of the written row or the last rejection.
    async fn write_row(
        &self,
        target: RowWrite<'_>,
        properties: Map<String, Value>,
        icon: Option<Icon>,
        parent_row: Option<&str>,
    ) -> Result<String> {
        let mut candidates = self
            .relation_candidates(parent_row.is_some())
            .into_iter()
            .peekable();

        while let Some(candidate) = candidates.next() {
            let mut attempt = properties.clone();
            if let (RelationTarget::Property(name), Some(parent)) = (&candidate, parent_row) {
                attempt.insert(name.clone(), relation(parent));
            }

            let result = match target {
                RowWrite::Create => self.create_page(attempt, icon.clone()).await,
                RowWrite::Update(row_id) => self
                    .update_page(row_id, attempt, icon.clone())
                    .await
                    .map(|_| row_id.to_string()),
            };

            match result {
                Ok(row_id) => return Ok(row_id),
                Err(e) if candidates.peek().is_some() => {
                    debug!(relation = ?candidate, error = %e, "Write rejected, trying next relation");
                }
                Err(e) => return Err(e),
            }
        }

        Err(NotionError::ParseError("relation fallback chain is empty".to_string()))
    }

    async fn create_page(
        &self,
        properties: Map<String, Value>,
        icon: Option<Icon>,
    ) -> Result<String> {
        let body = CreatePageRequest {
            parent: DatabaseParent {
                database_id: self.database_id.as_str().to_string(),
            },
            properties,
            icon,
        };
        let created: CreatedPage = self.send_json(HttpMethod::Post, "/pages", &body).await?;
        Ok(created.id)
    }

    async fn update_page(
        &self,
        row_id: &str,
        properties: Map<String, Value>,
        icon: Option<Icon>,
    ) -> Result<()> {
        let body = UpdatePageRequest {
            properties: Some(properties),
            icon,
            archived: None,
        };
        self.send_json::<Value, _>(HttpMethod::Patch, &page_path(row_id), &body)
            .await?;
        Ok(())
    }

    /// Properties, icon and parent for `record`, or the reason it cannot be written
    async fn prepare_write(
        &mut self,
        record: &FileRecord,
    ) -> std::result::Result<(Map<String, Value>, Option<String>), String> {
        let magic_link = self
            .link_generator
            .generate(&record.relative_path)
            .map_err(|e| format!("link generation failed: {}", e))?;

        let properties = row_properties(
            &record.filename,
            record.relative_path.as_str(),
            &extension_value(record),
            &magic_link,
        );
        let parent_row = self.ensure_parent_folder(&record.relative_path).await;

        Ok((properties, parent_row))
    }

    fn request(&self, method: HttpMethod, path: &str, timeout: Duration) -> HttpRequest {
        HttpRequest::new(method, format!("{}{}", NOTION_API_BASE, path))
            .bearer_token(self.token.as_str())
            .header("Notion-Version", NOTION_VERSION)
            .header("Content-Type", "application/json")
            .timeout(timeout)
    }

    fn database_path(&self, suffix: &str) -> String {
        format!(
            "/databases/{}{}",
            urlencoding::encode(self.database_id.as_str()),
            suffix
        )
    }

    async fn send_json<T, B>(&self, method: HttpMethod, path: &str, body: &B) -> Result<T>
    where
        T: DeserializeOwned,
        B: Serialize + Sync,
    {
        let request = self.request(method, path, WRITE_TIMEOUT).json(body)?;
        self.send(request).await
    }

    async fn send<T: DeserializeOwned>(&self, request: HttpRequest) -> Result<T> {
        let response = self
            .http_client
            .execute(request)
            .await
            .map_err(|e| NotionError::NetworkError(e.to_string()))?;

        if !response.is_success() {
            return Err(NotionError::from_response(&response));
        }

        response
            .json()
            .map_err(|e| NotionError::ParseError(e.to_string()))
    }
}

/// Wire value of the `Extension` property
fn extension_value(record: &FileRecord) -> String {
    if record.is_directory {
        return FOLDER_MARKER.to_string();
    }

    let extension = record.extension.to_lowercase().replace('.', "");
    if extension.is_empty() {
        NO_EXTENSION.to_string()
    } else {
        extension
    }
}

fn icon_for(record: &FileRecord) -> Icon {
    Icon::emoji(if record.is_directory {
        FOLDER_ICON
    } else {
        FILE_ICON
    })
}

fn page_path(row_id: &str) -> String {
    format!("/pages/{}", urlencoding::encode(row_id))
}

#[async_trait]
impl FileRepository for NotionRepository {
    #[instrument(skip(self), fields(database_id = %self.database_id))]
    async fn get_all_active_files(&mut self) -> BridgeResult<HashMap<RelativeId, String>> {
        info!("Fetching all rows from Notion");

        let mut mapping = HashMap::new();
        let mut cursor: Option<String> = None;

        loop {
            let request = self
                .request(HttpMethod::Post, &self.database_path("/query"), LIST_TIMEOUT)
                .json(&QueryRequest::page(PAGE_SIZE, cursor.take()))?;

            let page: QueryResponse = match self.send(request).await {
                Ok(page) => page,
                Err(e) => {
                    error!(error = %e, fetched = mapping.len(), "Listing aborted, keeping partial results");
                    break;
                }
            };

            for row in &page.results {
                if let Some(relative_id) = row.relative_id() {
                    mapping.insert(RelativeId::new(relative_id), row.id.clone());
                }
            }
            debug!("Fetched {} rows so far", mapping.len());

            match page.next_cursor {
                Some(next) if page.has_more => cursor = Some(next),
                _ => break,
            }
        }

        self.cache = mapping.clone();
        Ok(mapping)
    }

    #[instrument(skip(self, record), fields(identifier = %record.relative_path))]
    async fn upsert_file(&mut self, record: &FileRecord) -> BridgeResult<UpsertOutcome> {
        let existing = self.find_row_id(&record.relative_path).await;

        let (properties, parent_row) = match self.prepare_write(record).await {
            Ok(prepared) => prepared,
            Err(reason) => {
                error!(reason = %reason, "Cannot sync entry");
                return Ok(UpsertOutcome::Failed { reason });
            }
        };
        let icon = Some(icon_for(record));

        let outcome = match existing {
            Some(row_id) => {
                info!(name = %record.filename, "Updating row");
                self.write_row(RowWrite::Update(&row_id), properties, icon, parent_row.as_deref())
                    .await
                    .map(|row_id| UpsertOutcome::Updated { row_id })
            }
            None => {
                info!(name = %record.filename, "Creating row");
                self.write_row(RowWrite::Create, properties, icon, parent_row.as_deref())
                    .await
                    .map(|row_id| UpsertOutcome::Created { row_id })
            }
        };

        match outcome {
            Ok(outcome) => {
                if let Some(row_id) = outcome.row_id() {
                    self.cache
                        .insert(record.relative_path.clone(), row_id.to_string());
                }
                Ok(outcome)
            }
            Err(e) => {
                error!(name = %record.filename, error = %e, "Failed to sync entry");
                Ok(UpsertOutcome::Failed {
                    reason: e.to_string(),
                })
            }
        }
    }

    #[instrument(skip(self, identifier), fields(identifier = %identifier))]
    async fn mark_as_missing(&mut self, identifier: &RelativeId) -> BridgeResult<bool> {
        let Some(row_id) = self.find_row_id(identifier).await else {
            debug!("No row to archive");
            return Ok(false);
        };

        match self
            .send_json::<Value, _>(HttpMethod::Patch, &page_path(&row_id), &UpdatePageRequest::archive())
            .await
        {
            Ok(_) => {
                info!("Archived row");
                self.cache.remove(identifier);
                Ok(true)
            }
            Err(e) => {
                warn!(error = %e, "Failed to archive row");
                Ok(false)
            }
        }
    }

    #[instrument(skip(self, old_identifier, record), fields(from = %old_identifier, to = %record.relative_path))]
    async fn move_file(
        &mut self,
        old_identifier: &RelativeId,
        record: &FileRecord,
    ) -> BridgeResult<UpsertOutcome> {
        let Some(row_id) = self.find_row_id(old_identifier).await else {
            warn!("Source row not found, creating a new one");
            return self.upsert_file(record).await;
        };

        let (properties, parent_row) = match self.prepare_write(record).await {
            Ok(prepared) => prepared,
            Err(reason) => {
                error!(reason = %reason, "Cannot move entry");
                return Ok(UpsertOutcome::Failed { reason });
            }
        };

        info!("Moving row");
        match self
            .write_row(RowWrite::Update(&row_id), properties, None, parent_row.as_deref())
            .await
        {
            Ok(row_id) => {
                self.cache.remove(old_identifier);
                self.cache
                    .insert(record.relative_path.clone(), row_id.clone());
                Ok(UpsertOutcome::Updated { row_id })
            }
            Err(e) => {
                error!(error = %e, "Failed to move row");
                Ok(UpsertOutcome::Failed {
                    reason: e.to_string(),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_traits::error::BridgeError;
    use bridge_traits::http::HttpResponse;
    use mockall::mock;
    use serde_json::json;
    use std::path::PathBuf;

    mock! {
        pub Http {}

        #[async_trait]
        impl HttpClient for Http {
            async fn execute(&self, request: HttpRequest) -> BridgeResult<HttpResponse>;
        }
    }

    struct StaticLinks;

    impl LinkGenerator for StaticLinks {
        fn generate(&self, relative_path: &RelativeId) -> BridgeResult<String> {
            Ok(format!("file:///data/{}", relative_path))
        }
    }

    struct BrokenLinks;

    impl LinkGenerator for BrokenLinks {
        fn generate(&self, _relative_path: &RelativeId) -> BridgeResult<String> {
            Err(BridgeError::NotAvailable("link server".to_string()))
        }
    }

    const DB: &str = "0123456789abcdef0123456789abcdef";
    const DB_HYPHENATED: &str = "01234567-89ab-cdef-0123-456789abcdef";

    fn repository(http: MockHttp) -> NotionRepository {
        NotionRepository::new(Arc::new(http), "secret_token", DB, Arc::new(StaticLinks))
    }

    fn record(relative: &str, is_directory: bool, extension: &str) -> FileRecord {
        let relative_path = RelativeId::new(relative);
        FileRecord {
            absolute_path: PathBuf::from("/data").join(relative),
            filename: relative_path.name().to_string(),
            relative_path,
            extension: extension.to_string(),
            size_bytes: 0,
            last_modified: 0,
            device_id: "test".to_string(),
            is_directory,
        }
    }

    fn ok(body: Value) -> BridgeResult<HttpResponse> {
        HttpResponse::with_json(200, &body)
    }

    /// Request body as JSON, `Null` when absent
    fn body_of(req: &HttpRequest) -> Value {
        req.body_json().ok().flatten().unwrap_or(Value::Null)
    }

    #[test]
    fn test_request_carries_notion_headers() {
        let repo = repository(MockHttp::new());
        let request = repo.request(HttpMethod::Get, &repo.database_path(""), LOOKUP_TIMEOUT);

        assert_eq!(
            request.url,
            format!("https://api.notion.com/v1/databases/{}", DB_HYPHENATED)
        );
        assert_eq!(request.headers["Authorization"], "Bearer secret_token");
        assert_eq!(request.headers["Notion-Version"], "2022-06-28");
        assert_eq!(request.headers["Content-Type"], "application/json");
        assert_eq!(request.timeout, Some(LOOKUP_TIMEOUT));
    }

    #[test]
    fn test_relation_candidates_order() {
        let mut repo = repository(MockHttp::new());

        assert_eq!(repo.relation_candidates(false), vec![RelationTarget::Omitted]);
        assert_eq!(
            repo.relation_candidates(true),
            vec![
                RelationTarget::Property(RELATION_PROPERTY_ES.to_string()),
                RelationTarget::Property(RELATION_PROPERTY_EN.to_string()),
                RelationTarget::Omitted,
            ]
        );

        repo.relation_property = Some(RELATION_PROPERTY_EN.to_string());
        assert_eq!(
            repo.relation_candidates(true),
            vec![
                RelationTarget::Property(RELATION_PROPERTY_EN.to_string()),
                RelationTarget::Property(RELATION_PROPERTY_ES.to_string()),
                RelationTarget::Omitted,
            ]
        );
    }

    #[test]
    fn test_extension_value() {
        assert_eq!(extension_value(&record("docs", true, "DIR")), "FOLDER");
        assert_eq!(extension_value(&record("a.PDF", false, "PDF")), "pdf");
        assert_eq!(extension_value(&record("a.txt", false, ".txt")), "txt");
        assert_eq!(extension_value(&record("Makefile", false, "")), "None");
    }

    #[tokio::test]
    async fn test_bootstrap_detects_existing_property() {
        let mut http = MockHttp::new();
        http.expect_execute()
            .withf(|req| req.method == HttpMethod::Get && req.url.ends_with(DB_HYPHENATED))
            .times(1)
            .returning(|_| {
                ok(json!({
                    "object": "database",
                    "properties": {
                        "Name": { "type": "title" },
                        "ítem principal": { "type": "relation" }
                    }
                }))
            });

        let mut repo = repository(http);
        repo.ensure_hierarchy_property().await;

        assert_eq!(repo.relation_property(), Some(RELATION_PROPERTY_ES));
    }

    #[tokio::test]
    async fn test_bootstrap_creates_parent_item() {
        let mut http = MockHttp::new();
        http.expect_execute()
            .withf(|req| req.method == HttpMethod::Get)
            .times(1)
            .returning(|_| ok(json!({ "properties": { "Name": { "type": "title" } } })));
        http.expect_execute()
            .withf(|req| {
                let body = body_of(req);
                req.method == HttpMethod::Patch
                    && body["properties"]["Parent item"]["relation"]["type"] == "dual_property"
            })
            .times(1)
            .returning(|_| ok(json!({ "object": "database" })));

        let mut repo = repository(http);
        repo.ensure_hierarchy_property().await;

        assert_eq!(repo.relation_property(), Some(RELATION_PROPERTY_EN));
    }

    #[tokio::test]
    async fn test_bootstrap_failure_is_not_fatal() {
        let mut http = MockHttp::new();
        http.expect_execute()
            .times(1)
            .returning(|_| Err(BridgeError::Timeout("schema".to_string())));

        let mut repo = repository(http);
        repo.ensure_hierarchy_property().await;

        assert_eq!(repo.relation_property(), None);
    }

    #[tokio::test]
    async fn test_find_row_id_prefers_cache() {
        let mut http = MockHttp::new();
        http.expect_execute().times(0);

        let mut repo = repository(http);
        repo.cache
            .insert(RelativeId::new("notes"), "row-notes".to_string());

        assert_eq!(
            repo.find_row_id(&RelativeId::new("notes")).await,
            Some("row-notes".to_string())
        );
    }

    #[tokio::test]
    async fn test_find_row_id_caches_point_lookup() {
        let mut http = MockHttp::new();
        http.expect_execute()
            .withf(|req| {
                let body = body_of(req);
                req.timeout == Some(LOOKUP_TIMEOUT)
                    && body["filter"]["rich_text"]["equals"] == "a/b"
            })
            .times(1)
            .returning(|_| ok(json!({ "results": [{ "id": "row-ab", "properties": {} }] })));

        let mut repo = repository(http);
        let id = RelativeId::new("a/b");

        assert_eq!(repo.find_row_id(&id).await, Some("row-ab".to_string()));
        // second call served from cache
        assert_eq!(repo.find_row_id(&id).await, Some("row-ab".to_string()));
        assert_eq!(repo.cached_row_id(&id), Some("row-ab"));
    }

    #[tokio::test]
    async fn test_lookup_failure_reads_as_absent() {
        let mut http = MockHttp::new();
        http.expect_execute().times(1).returning(|_| {
            HttpResponse::with_json(
                400,
                &json!({ "object": "error", "status": 400, "code": "validation_error", "message": "bad filter" }),
            )
        });

        let mut repo = repository(http);
        assert_eq!(repo.find_row_id(&RelativeId::new("x")).await, None);
    }

    #[tokio::test]
    async fn test_mark_as_missing_unknown_row_is_noop() {
        let mut http = MockHttp::new();
        http.expect_execute()
            .times(1)
            .returning(|_| ok(json!({ "results": [] })));

        let mut repo = repository(http);
        assert!(!repo
            .mark_as_missing(&RelativeId::new("ghost.txt"))
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_mark_as_missing_archives_and_evicts() {
        let mut http = MockHttp::new();
        http.expect_execute()
            .withf(|req| {
                let body = body_of(req);
                req.method == HttpMethod::Patch
                    && req.url.ends_with("/pages/row-old")
                    && body == json!({ "archived": true })
            })
            .times(1)
            .returning(|_| ok(json!({ "id": "row-old", "archived": true })));

        let mut repo = repository(http);
        let id = RelativeId::new("old/path.txt");
        repo.cache.insert(id.clone(), "row-old".to_string());

        assert!(repo.mark_as_missing(&id).await.unwrap());
        assert_eq!(repo.cached_row_id(&id), None);
    }

    #[tokio::test]
    async fn test_archive_rejection_returns_false() {
        let mut http = MockHttp::new();
        http.expect_execute()
            .times(1)
            .returning(|_| HttpResponse::with_json(500, &json!({})));

        let mut repo = repository(http);
        let id = RelativeId::new("a.txt");
        repo.cache.insert(id.clone(), "row-a".to_string());

        assert!(!repo.mark_as_missing(&id).await.unwrap());
        assert_eq!(repo.cached_row_id(&id), Some("row-a"));
    }

    #[tokio::test]
    async fn test_top_level_create_has_no_relation() {
        let mut http = MockHttp::new();
        // point lookup
        http.expect_execute()
            .withf(|req| req.url.ends_with("/query"))
            .times(1)
            .returning(|_| ok(json!({ "results": [] })));
        http.expect_execute()
            .withf(|req| {
                let body = body_of(req);
                req.url.ends_with("/pages")
                    && body["properties"].as_object().map_or(false, |p| p.len() == 4)
                    && body["icon"] == json!({ "type": "emoji", "emoji": "📄" })
                    && body["parent"]["database_id"] == DB_HYPHENATED
                    && body["properties"]["Extension"]["rich_text"][0]["text"]["content"] == "md"
            })
            .times(1)
            .returning(|_| ok(json!({ "id": "row-readme" })));

        let mut repo = repository(http);
        let outcome = repo
            .upsert_file(&record("README.md", false, "md"))
            .await
            .unwrap();

        assert_eq!(
            outcome,
            UpsertOutcome::Created {
                row_id: "row-readme".to_string()
            }
        );
        assert_eq!(repo.cached_row_id(&RelativeId::new("README.md")), Some("row-readme"));
    }

    #[tokio::test]
    async fn test_update_falls_back_to_second_relation_name() {
        let mut http = MockHttp::new();
        http.expect_execute()
            .withf(|req| {
                let body = body_of(req);
                req.method == HttpMethod::Patch
                    && req.url.ends_with("/pages/row-a")
                    && body["properties"].get(RELATION_PROPERTY_ES).is_some()
            })
            .times(1)
            .returning(|_| {
                HttpResponse::with_json(
                    400,
                    &json!({
                        "object": "error",
                        "status": 400,
                        "code": "validation_error",
                        "message": "ítem principal is not a property that exists."
                    }),
                )
            });
        http.expect_execute()
            .withf(|req| {
                let body = body_of(req);
                req.method == HttpMethod::Patch
                    && req.url.ends_with("/pages/row-a")
                    && body["properties"][RELATION_PROPERTY_EN] == relation("row-docs")
                    && body["properties"].get(RELATION_PROPERTY_ES).is_none()
            })
            .times(1)
            .returning(|_| ok(json!({ "id": "row-a" })));

        let mut repo = repository(http);
        repo.cache
            .insert(RelativeId::new("docs"), "row-docs".to_string());
        repo.cache
            .insert(RelativeId::new("docs/a.txt"), "row-a".to_string());

        let outcome = repo
            .upsert_file(&record("docs/a.txt", false, "txt"))
            .await
            .unwrap();

        assert_eq!(
            outcome,
            UpsertOutcome::Updated {
                row_id: "row-a".to_string()
            }
        );
        assert_eq!(repo.cached_row_id(&RelativeId::new("docs/a.txt")), Some("row-a"));
    }

    #[tokio::test]
    async fn test_link_failure_is_per_entry() {
        let mut http = MockHttp::new();
        http.expect_execute()
            .times(1)
            .returning(|_| ok(json!({ "results": [] })));

        let mut repo =
            NotionRepository::new(Arc::new(http), "secret_token", DB, Arc::new(BrokenLinks));
        let outcome = repo.upsert_file(&record("a.txt", false, "txt")).await.unwrap();

        assert!(matches!(outcome, UpsertOutcome::Failed { .. }));
    }

    #[tokio::test]
    async fn test_listing_keeps_partial_results() {
        let mut http = MockHttp::new();
        http.expect_execute()
            .withf(|req| {
                let body = body_of(req);
                body.get("start_cursor").is_none()
            })
            .times(1)
            .returning(|_| {
                ok(json!({
                    "results": [
                        { "id": "row-1", "properties": { "RelativeID": { "rich_text": [{ "text": { "content": "a.txt" } }] } } },
                        { "id": "row-2", "properties": { "RelativeID": { "rich_text": [] } } }
                    ],
                    "has_more": true,
                    "next_cursor": "c2"
                }))
            });
        http.expect_execute()
            .withf(|req| {
                let body = body_of(req);
                body["start_cursor"] == "c2" && body["page_size"] == 100
            })
            .times(1)
            .returning(|_| Err(BridgeError::Timeout("query".to_string())));

        let mut repo = repository(http);
        let rows = repo.get_all_active_files().await.unwrap();

        assert_eq!(rows.len(), 1);
        assert_eq!(rows.get("a.txt"), Some(&"row-1".to_string()));
        assert_eq!(repo.cached_row_id(&RelativeId::new("a.txt")), Some("row-1"));
    }
}
