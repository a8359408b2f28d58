//! In-memory mock for `CalendarGateway`.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use roomsync_core::CalendarGateway;
use roomsync_domain::{
    AttachmentRef, ItemIdentity, ItemRecord, NewCalendarItem, Result as DomainResult,
    RoomSyncError, TimeWindow,
};

/// A mutation the mock received, in call order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    Create { mailbox: String, subject: String },
    ChangeTime {
        mailbox: String,
        identity: ItemIdentity,
        new_start: Option<DateTime<Utc>>,
        new_end: Option<DateTime<Utc>>,
    },
    ChangeBody { mailbox: String, identity: ItemIdentity, body: String },
    Delete { mailbox: String, identity: ItemIdentity },
    ChangeAttendees { mailbox: String, identity: ItemIdentity, add: Vec<String>, remove: Vec<String> },
}

/// Serves whatever items were last set for a mailbox, filtered by window.
///
/// Mailboxes listed in `failing` return a network error on fetch.
#[derive(Default, Clone)]
pub struct MockCalendarGateway {
    calendars: Arc<Mutex<HashMap<String, Vec<ItemRecord>>>>,
    failing: Arc<Mutex<Vec<String>>>,
    fetches: Arc<Mutex<Vec<String>>>,
    mutations: Arc<Mutex<Vec<Mutation>>>,
    attendees: Arc<Mutex<Vec<String>>>,
}

impl MockCalendarGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the remote calendar for `mailbox`.
    pub fn set_items(&self, mailbox: &str, items: Vec<ItemRecord>) {
        self.calendars.lock().unwrap().insert(mailbox.to_string(), items);
    }

    pub fn fail_mailbox(&self, mailbox: &str) {
        self.failing.lock().unwrap().push(mailbox.to_string());
    }

    pub fn with_attendees(self, attendees: &[&str]) -> Self {
        *self.attendees.lock().unwrap() = attendees.iter().map(|a| a.to_string()).collect();
        self
    }

    pub fn fetches(&self) -> Vec<String> {
        self.fetches.lock().unwrap().clone()
    }

    pub fn mutations(&self) -> Vec<Mutation> {
        self.mutations.lock().unwrap().clone()
    }

    fn record(&self, mutation: Mutation) {
        self.mutations.lock().unwrap().push(mutation);
    }
}

#[async_trait]
impl CalendarGateway for MockCalendarGateway {
    async fn fetch_snapshot(
        &self,
        mailbox: &str,
        window: &TimeWindow,
    ) -> DomainResult<Vec<ItemRecord>> {
        self.fetches.lock().unwrap().push(mailbox.to_string());

        if self.failing.lock().unwrap().iter().any(|m| m == mailbox) {
            return Err(RoomSyncError::Network(format!("connection reset fetching {mailbox}")));
        }

        Ok(self
            .calendars
            .lock()
            .unwrap()
            .get(mailbox)
            .map(|items| items.iter().filter(|item| item.overlaps(window)).cloned().collect())
            .unwrap_or_default())
    }

    async fn create_item(&self, mailbox: &str, item: &NewCalendarItem) -> DomainResult<()> {
        self.record(Mutation::Create { mailbox: mailbox.into(), subject: item.subject.clone() });
        Ok(())
    }

    async fn change_item_time(
        &self,
        mailbox: &str,
        identity: &ItemIdentity,
        new_start: Option<DateTime<Utc>>,
        new_end: Option<DateTime<Utc>>,
    ) -> DomainResult<()> {
        self.record(Mutation::ChangeTime {
            mailbox: mailbox.into(),
            identity: identity.clone(),
            new_start,
            new_end,
        });
        Ok(())
    }

    async fn change_item_body(
        &self,
        mailbox: &str,
        identity: &ItemIdentity,
        body: &str,
    ) -> DomainResult<()> {
        self.record(Mutation::ChangeBody {
            mailbox: mailbox.into(),
            identity: identity.clone(),
            body: body.into(),
        });
        Ok(())
    }

    async fn delete_item(&self, mailbox: &str, identity: &ItemIdentity) -> DomainResult<()> {
        self.record(Mutation::Delete { mailbox: mailbox.into(), identity: identity.clone() });
        Ok(())
    }

    async fn get_attendees(
        &self,
        _mailbox: &str,
        _identity: &ItemIdentity,
    ) -> DomainResult<Vec<String>> {
        Ok(self.attendees.lock().unwrap().clone())
    }

    async fn change_attendees(
        &self,
        mailbox: &str,
        identity: &ItemIdentity,
        add: &[String],
        remove: &[String],
    ) -> DomainResult<()> {
        self.record(Mutation::ChangeAttendees {
            mailbox: mailbox.into(),
            identity: identity.clone(),
            add: add.to_vec(),
            remove: remove.to_vec(),
        });
        Ok(())
    }

    async fn list_attachments(
        &self,
        _mailbox: &str,
        identity: &ItemIdentity,
    ) -> DomainResult<Vec<AttachmentRef>> {
        Ok(vec![AttachmentRef {
            id: format!("{}-att-1", identity.item_id),
            name: "agenda.pdf".into(),
        }])
    }
}
