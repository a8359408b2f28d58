//! EWS SOAP client implementing [`CalendarGateway`].

use std::collections::{BTreeSet, HashMap};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Method, StatusCode};
use roomsync_core::{CalendarGateway, MailboxSnapshot};
use roomsync_domain::{
    normalize_mailbox, AttachmentRef, ConnectionStatus, EwsConfig, ItemIdentity, ItemRecord,
    NewCalendarItem, Result, RoomSyncError, TimeWindow,
};
use tracing::{debug, info, warn};
use url::Url;

use super::auth::EwsAuth;
use super::folders::FolderCache;
use super::parser;
use super::soap::{self, TimeField};
use super::strategy::{ImpersonationStrategy, StrategyState};
use super::timezone::windows_zone_name;
use crate::errors::{status_error, InfraError};
use crate::http::HttpClient;
use crate::observability::error_label;

const SOAP_CONTENT_TYPE: &str = "text/xml; charset=utf-8";

/// One authenticated EWS session for a service account.
///
/// Tracks the last observed [`ConnectionStatus`] and falls back from
/// impersonation to delegate access once if Exchange refuses it.
#[derive(Debug)]
pub struct EwsClient {
    http: HttpClient,
    endpoint: Url,
    api_version: String,
    auth: EwsAuth,
    strategy: StrategyState,
    timezone_name: String,
    folders: FolderCache,
    status: Mutex<ConnectionStatus>,
}

impl EwsClient {
    /// # Errors
    /// `RoomSyncError::Config` when no username or an unknown timezone is
    /// configured, or the HTTP client cannot be built.
    pub fn new(config: &EwsConfig, auth: EwsAuth) -> Result<Self> {
        let username = config
            .username
            .as_deref()
            .ok_or_else(|| RoomSyncError::Config("EWS username is required".into()))?;

        let endpoint = Url::parse(&config.endpoint_url()).map_err(|err| {
            RoomSyncError::Config(format!("invalid EWS endpoint '{}': {err}", config.endpoint_url()))
        })?;

        let http = HttpClient::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .user_agent(concat!("roomsync/", env!("CARGO_PKG_VERSION")))
            .accept_invalid_certs(!config.verify_certs)
            .build()?;

        Ok(Self {
            http,
            endpoint,
            api_version: config.api_version.clone(),
            auth,
            strategy: StrategyState::new(username, config.impersonation.as_deref()),
            timezone_name: windows_zone_name(config.timezone()?),
            folders: FolderCache::new(),
            status: Mutex::new(ConnectionStatus::Unknown),
        })
    }

    pub fn connection_status(&self) -> ConnectionStatus {
        *self.status.lock()
    }

    pub fn strategy(&self) -> ImpersonationStrategy {
        self.strategy.current()
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Issue one SOAP operation.
    ///
    /// `build` is called again if the strategy changes, since folder
    /// addressing depends on it.
    async fn call<F>(&self, operation: &'static str, build: F) -> Result<String>
    where
        F: Fn() -> String + Send + Sync,
    {
        let mut reissued = false;
        loop {
            let (status, text) = self.post(operation, &build()).await?;

            let denied = parser::is_impersonation_denied(&text);
            let failed = !status.is_success() || parser::is_error_response(&text);
            self.set_status(if failed {
                ConnectionStatus::Disconnected
            } else {
                ConnectionStatus::Connected
            });

            if !failed {
                return Ok(text);
            }

            for message in parser::error_messages(&text) {
                debug!(operation, %status, message = %message, "EWS error message");
            }

            if !reissued && (denied || !status.is_success()) && self.strategy.switch_to_delegate() {
                reissued = true;
                continue;
            }

            let err = classify_failure(status, &text, denied);
            warn!(operation, %status, kind = error_label(&err), error = %err, "EWS request failed");
            return Err(err);
        }
    }

    async fn post(&self, operation: &'static str, body: &str) -> Result<(StatusCode, String)> {
        let envelope =
            soap::envelope(&self.api_version, self.strategy.impersonation_header(), body);

        let request = self
            .http
            .request(Method::POST, self.endpoint.clone())
            .header(CONTENT_TYPE, SOAP_CONTENT_TYPE)
            .body(envelope);
        let request = self.auth.apply(request).await?;

        debug!(operation, strategy = ?self.strategy.current(), "sending EWS request");
        let response = match self.http.send(request).await {
            Ok(response) => response,
            Err(err) => {
                self.set_status(ConnectionStatus::Disconnected);
                return Err(err);
            }
        };

        let status = response.status();
        let text = response.text().await.map_err(|err| RoomSyncError::from(InfraError::from(err)))?;
        Ok((status, text))
    }

    fn set_status(&self, next: ConnectionStatus) {
        let mut current = self.status.lock();
        let previous = *current;
        if previous != next {
            info!(from = %previous, to = %next, endpoint = %self.endpoint, "EWS connection status changed");
            *current = next;
        }
    }

    /// Learn calendar folder ids for mailboxes not seen before.
    ///
    /// Mailboxes Exchange cannot resolve are logged and left out. Transport
    /// and authentication failures abort.
    async fn resolve_folders(&self, mailboxes: &[String]) -> Result<()> {
        for mailbox in self.folders.missing(mailboxes) {
            let lookup = std::slice::from_ref(&mailbox);
            match self.call("GetFolder", || soap::get_calendar_folders(lookup)).await {
                Ok(text) => match parser::calendar_folder_ids(&text).into_iter().flatten().next() {
                    Some(folder_id) => {
                        debug!(mailbox = %mailbox, folder_id = %folder_id, "resolved calendar folder");
                        self.folders.insert(&mailbox, folder_id);
                    }
                    None => warn!(mailbox = %mailbox, "GetFolder returned no calendar folder id"),
                },
                Err(err @ (RoomSyncError::Network(_) | RoomSyncError::Auth(_))) => return Err(err),
                Err(err) => warn!(mailbox = %mailbox, error = %err, "cannot resolve calendar folder"),
            }
        }
        Ok(())
    }

    async fn update_time(
        &self,
        identity: &ItemIdentity,
        field: TimeField,
        instant: DateTime<Utc>,
    ) -> Result<Option<ItemIdentity>> {
        let text =
            self.call("UpdateItem", || soap::update_time(identity, field, instant)).await?;
        Ok(parser::first_item_id(&text))
    }
}

fn classify_failure(status: StatusCode, text: &str, denied: bool) -> RoomSyncError {
    let message = parser::error_messages(text).join("; ");

    if denied {
        return RoomSyncError::Auth(format!("impersonation denied: {message}"));
    }

    if let Some(code) = parser::error_codes(text).first() {
        return code_error(code, &message);
    }

    if !status.is_success() {
        let reason = match (status.canonical_reason(), message.is_empty()) {
            (Some(reason), true) => reason.to_string(),
            (Some(reason), false) => format!("{reason}: {message}"),
            (None, _) => message,
        };
        return status_error(status.as_u16(), Some(&reason));
    }

    RoomSyncError::Protocol(format!("EWS error response: {message}"))
}

fn code_error(code: &str, message: &str) -> RoomSyncError {
    let detail = if message.is_empty() { code.to_string() } else { format!("{code}: {message}") };

    match code {
        "ErrorItemNotFound" => RoomSyncError::NotFound(detail),
        "ErrorIrresolvableConflict" => RoomSyncError::Conflict(detail),
        code if code.starts_with("ErrorChangeKey") => RoomSyncError::Conflict(detail),
        "ErrorAccessDenied" | "ErrorImpersonateUserDenied" => RoomSyncError::Auth(detail),
        _ => RoomSyncError::Protocol(detail),
    }
}

#[async_trait]
impl CalendarGateway for EwsClient {
    async fn fetch_snapshot(&self, mailbox: &str, window: &TimeWindow) -> Result<Vec<ItemRecord>> {
        let text = self
            .call("FindItem", || soap::find_items(&[self.strategy.folder_for(mailbox)], window))
            .await?;
        let items = parser::calendar_view(&text)?;
        debug!(mailbox, items = items.len(), "fetched calendar snapshot");
        Ok(items)
    }

    /// One FindItem across every resolvable mailbox, attributed back by
    /// `ParentFolderId`.
    async fn fetch_snapshots(
        &self,
        mailboxes: &[String],
        window: &TimeWindow,
    ) -> Result<Vec<MailboxSnapshot>> {
        self.resolve_folders(mailboxes).await?;

        let mut keys: Vec<String> = mailboxes.iter().map(|m| normalize_mailbox(m)).collect();
        keys.sort();
        keys.dedup();
        let resolved: Vec<String> =
            keys.into_iter().filter(|key| self.folders.get(key).is_some()).collect();
        if resolved.is_empty() {
            return Ok(Vec::new());
        }

        let text = self
            .call("FindItem", || {
                let targets: Vec<_> =
                    resolved.iter().map(|mailbox| self.strategy.folder_for(mailbox)).collect();
                soap::find_items(&targets, window)
            })
            .await?;

        let mut by_mailbox: HashMap<String, Vec<ItemRecord>> =
            resolved.iter().map(|mailbox| (mailbox.clone(), Vec::new())).collect();

        for item in parser::calendar_view(&text)? {
            let Some(folder_id) = item.attributes.parent_folder_id.as_deref() else {
                warn!(item_id = item.item_id(), "batch item has no parent folder; dropping");
                continue;
            };
            match self.folders.mailbox_for(folder_id) {
                Ok(mailbox) => by_mailbox.entry(mailbox).or_default().push(item),
                Err(_) => warn!(item_id = item.item_id(), folder_id, "item from unknown folder"),
            }
        }

        Ok(resolved
            .into_iter()
            .map(|mailbox| {
                let items = by_mailbox.remove(&mailbox).unwrap_or_default();
                MailboxSnapshot { mailbox, items }
            })
            .collect())
    }

    async fn create_item(&self, mailbox: &str, item: &NewCalendarItem) -> Result<()> {
        self.call("CreateItem", || {
            soap::create_item(self.strategy.folder_for(mailbox), item, &self.timezone_name)
        })
        .await?;
        info!(mailbox, subject = %item.subject, "created calendar item");
        Ok(())
    }

    /// Start and end are separate updates; the second uses the change key
    /// returned by the first.
    async fn change_item_time(
        &self,
        mailbox: &str,
        identity: &ItemIdentity,
        new_start: Option<DateTime<Utc>>,
        new_end: Option<DateTime<Utc>>,
    ) -> Result<()> {
        let mut current = identity.clone();

        if let Some(start) = new_start {
            if let Some(next) = self.update_time(&current, TimeField::Start, start).await? {
                current = next;
            }
        }
        if let Some(end) = new_end {
            self.update_time(&current, TimeField::End, end).await?;
        }

        info!(mailbox, item_id = %identity.item_id, "changed calendar item time");
        Ok(())
    }

    async fn change_item_body(
        &self,
        mailbox: &str,
        identity: &ItemIdentity,
        body: &str,
    ) -> Result<()> {
        self.call("UpdateItem", || soap::update_body(identity, body)).await?;
        info!(mailbox, item_id = %identity.item_id, "changed calendar item body");
        Ok(())
    }

    async fn delete_item(&self, mailbox: &str, identity: &ItemIdentity) -> Result<()> {
        self.call("DeleteItem", || soap::delete_item(identity)).await?;
        info!(mailbox, item_id = %identity.item_id, "deleted calendar item");
        Ok(())
    }

    async fn get_attendees(&self, _mailbox: &str, identity: &ItemIdentity) -> Result<Vec<String>> {
        let text = self.call("GetItem", || soap::get_attendees(&identity.item_id)).await?;
        Ok(parser::attendee_emails(&text))
    }

    async fn change_attendees(
        &self,
        mailbox: &str,
        identity: &ItemIdentity,
        add: &[String],
        remove: &[String],
    ) -> Result<()> {
        let current: BTreeSet<String> =
            self.get_attendees(mailbox, identity).await?.into_iter().collect();

        let mut next = current.clone();
        next.extend(add.iter().map(|address| normalize_mailbox(address)));
        for address in remove {
            next.remove(&normalize_mailbox(address));
        }

        if next == current {
            debug!(mailbox, item_id = %identity.item_id, "attendees unchanged");
            return Ok(());
        }

        let attendees: Vec<String> = next.into_iter().collect();
        self.call("UpdateItem", || soap::update_required_attendees(identity, &attendees)).await?;
        info!(mailbox, item_id = %identity.item_id, attendees = attendees.len(), "changed attendees");
        Ok(())
    }

    async fn list_attachments(
        &self,
        _mailbox: &str,
        identity: &ItemIdentity,
    ) -> Result<Vec<AttachmentRef>> {
        let text = self.call("GetItem", || soap::get_attachments(&identity.item_id)).await?;
        Ok(parser::attachments(&text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn response_codes_map_to_error_kinds() {
        assert!(code_error("ErrorItemNotFound", "gone").is_not_found());
        assert!(matches!(code_error("ErrorChangeKeyRequiredForWriteOperations", ""), RoomSyncError::Conflict(_)));
        assert!(matches!(code_error("ErrorIrresolvableConflict", ""), RoomSyncError::Conflict(_)));
        assert!(matches!(code_error("ErrorAccessDenied", ""), RoomSyncError::Auth(_)));
        assert!(matches!(code_error("ErrorSchemaValidation", ""), RoomSyncError::Protocol(_)));
    }

    #[test]
    fn http_failures_keep_message_text() {
        let fault = "<faultstring>The request failed schema validation.</faultstring>";
        match classify_failure(StatusCode::BAD_REQUEST, fault, false) {
            RoomSyncError::Protocol(message) => {
                assert!(message.contains("400"));
                assert!(message.contains("schema validation"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(matches!(
            classify_failure(StatusCode::UNAUTHORIZED, "", false),
            RoomSyncError::Auth(_)
        ));
    }

    #[test]
    fn rejects_unparseable_server_url() {
        let config = EwsConfig {
            username: Some("svc@example.com".into()),
            server_url: Some("not a url".into()),
            ..EwsConfig::default()
        };
        let auth = EwsAuth::Basic { username: "svc@example.com".into(), password: "x".into() };
        assert!(matches!(EwsClient::new(&config, auth), Err(RoomSyncError::Config(_))));
    }

    #[test]
    fn requires_username() {
        let auth = EwsAuth::Basic { username: String::new(), password: String::new() };
        let err = EwsClient::new(&EwsConfig::default(), auth).unwrap_err();
        assert!(matches!(err, RoomSyncError::Config(_)));
    }
}
