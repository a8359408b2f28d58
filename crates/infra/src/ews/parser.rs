//! Regex extraction of the EWS response fields we consume.
//!
//! This is not a general XML parser. It understands exactly the shapes
//! Exchange returns for FindItem, GetFolder, GetItem and UpdateItem.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use roomsync_domain::{
    AttachmentPresence, AttachmentRef, ItemAttributes, ItemIdentity, ItemRecord, Result,
    RoomSyncError, Sensitivity,
};

fn compile(pattern: &str) -> Regex {
    Regex::new(pattern).expect("EWS response pattern should compile - this is a bug")
}

static CALENDAR_ITEM: Lazy<Regex> =
    Lazy::new(|| compile(r"<t:CalendarItem>([\w\W]*?)</t:CalendarItem>"));
static ITEM_ID: Lazy<Regex> =
    Lazy::new(|| compile(r#"<t:ItemId Id="([^"]*)" ChangeKey="([^"]*)"\s*/>"#));
static SUBJECT: Lazy<Regex> = Lazy::new(|| compile(r"<t:Subject>([\w\W]*?)</t:Subject>"));
static ORGANIZER: Lazy<Regex> =
    Lazy::new(|| compile(r"<t:Organizer>[\w\W]*?<t:Name>([\w\W]*?)</t:Name>[\w\W]*?</t:Organizer>"));
static PARENT_FOLDER_ID: Lazy<Regex> =
    Lazy::new(|| compile(r#"<t:ParentFolderId Id="([^"]*)"(?: ChangeKey="[^"]*")?\s*/>"#));
static HTML_BODY: Lazy<Regex> =
    Lazy::new(|| compile(r#"(?i)<t:Body BodyType="HTML"[^>]*>([\w\W]*?)</t:Body>"#));
static HAS_ATTACHMENTS: Lazy<Regex> =
    Lazy::new(|| compile(r"<t:HasAttachments>(\w+)</t:HasAttachments>"));
static SENSITIVITY: Lazy<Regex> = Lazy::new(|| compile(r"<t:Sensitivity>(\w+)</t:Sensitivity>"));
static IS_ONLINE_MEETING: Lazy<Regex> =
    Lazy::new(|| compile(r"<t:IsOnlineMeeting>(\w+)</t:IsOnlineMeeting>"));
static ROOT_FOLDER: Lazy<Regex> = Lazy::new(|| compile(r"<m:RootFolder\b([^>]*)>"));
static TOTAL_ITEMS_IN_VIEW: Lazy<Regex> = Lazy::new(|| compile(r#"TotalItemsInView="(\d+)""#));
static INCLUDES_LAST_ITEM: Lazy<Regex> =
    Lazy::new(|| compile(r#"IncludesLastItemInRange="(\w+)""#));
static START: Lazy<Regex> = Lazy::new(|| compile(r"<t:Start>([^<]*)</t:Start>"));
static END: Lazy<Regex> = Lazy::new(|| compile(r"<t:End>([^<]*)</t:End>"));

static ERROR_CLASS: Lazy<Regex> = Lazy::new(|| compile(r#"(?i)ResponseClass="Error""#));
static MESSAGE_TEXT: Lazy<Regex> =
    Lazy::new(|| compile(r"<m:MessageText>([\w\W]*?)</m:MessageText>"));
static RESPONSE_CODE: Lazy<Regex> =
    Lazy::new(|| compile(r"<m:ResponseCode>(\w+)</m:ResponseCode>"));
static FAULT_STRING: Lazy<Regex> = Lazy::new(|| compile(r"<faultstring[^>]*>([\w\W]*?)</faultstring>"));

static CALENDAR_FOLDER: Lazy<Regex> =
    Lazy::new(|| compile(r"<t:CalendarFolder>([\w\W]*?)</t:CalendarFolder>"));
static FOLDER_ID: Lazy<Regex> = Lazy::new(|| compile(r#"<t:FolderId Id="([^"]*)""#));

static ATTENDEE: Lazy<Regex> = Lazy::new(|| compile(r"<t:Attendee>([\w\W]*?)</t:Attendee>"));
static EMAIL_ADDRESS: Lazy<Regex> =
    Lazy::new(|| compile(r"[a-zA-Z0-9_.+-]+@[a-zA-Z0-9-]+\.[a-zA-Z0-9.-]+"));

static ATTACHMENT: Lazy<Regex> = Lazy::new(|| {
    compile(r"<t:(?:File|Item)Attachment>([\w\W]*?)</t:(?:File|Item)Attachment>")
});
static ATTACHMENT_ID: Lazy<Regex> = Lazy::new(|| compile(r#"<t:AttachmentId Id="([^"]+)""#));
static NAME: Lazy<Regex> = Lazy::new(|| compile(r"<t:Name>([\w\W]*?)</t:Name>"));

const IMPERSONATION_DENIED_MARKERS: [&str; 2] = [
    "ErrorImpersonateUserDenied",
    "The account does not have permission to impersonate the requested user.",
];

/// Undo the five predefined XML entities.
pub fn xml_unescape(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

fn capture<'t>(pattern: &Regex, haystack: &'t str) -> Option<&'t str> {
    pattern.captures(haystack).and_then(|caps| caps.get(1)).map(|m| m.as_str())
}

fn parse_time(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw.trim()).ok().map(|dt| dt.with_timezone(&Utc))
}

/// Every `<t:CalendarItem>` in a FindItem CalendarView response.
///
/// The result is an authoritative snapshot of the window, so anything short
/// of the complete view is an error: a view the server cut off at
/// `MaxEntriesReturned`, or an item without an id or readable times.
pub fn calendar_view(xml: &str) -> Result<Vec<ItemRecord>> {
    for caps in ROOT_FOLDER.captures_iter(xml) {
        let attributes = caps.get(1).map_or("", |m| m.as_str());
        let includes_last = capture(&INCLUDES_LAST_ITEM, attributes);
        if includes_last.is_some_and(|raw| raw.eq_ignore_ascii_case("false")) {
            let total = capture(&TOTAL_ITEMS_IN_VIEW, attributes).unwrap_or("?");
            return Err(RoomSyncError::Protocol(format!(
                "calendar view truncated with {total} items in the window; use a narrower window"
            )));
        }
    }

    CALENDAR_ITEM
        .captures_iter(xml)
        .filter_map(|caps| caps.get(1))
        .map(|block| {
            calendar_item(block.as_str()).ok_or_else(|| {
                let snippet: String = block.as_str().chars().take(120).collect();
                RoomSyncError::Protocol(format!("calendar item without id or times: {snippet}"))
            })
        })
        .collect()
}

/// Parse the inside of one `<t:CalendarItem>` block.
pub fn calendar_item(block: &str) -> Option<ItemRecord> {
    let ids = ITEM_ID.captures(block)?;
    let identity = ItemIdentity::new(ids.get(1)?.as_str(), ids.get(2)?.as_str());

    let start_time = parse_time(capture(&START, block)?)?;
    let end_time = parse_time(capture(&END, block)?)?;

    let has_attachments = match capture(&HAS_ATTACHMENTS, block) {
        Some("true") => AttachmentPresence::Present,
        Some("false") => AttachmentPresence::Absent,
        _ => AttachmentPresence::Unknown,
    };

    let attributes = ItemAttributes {
        subject: capture(&SUBJECT, block).map(xml_unescape).unwrap_or_default(),
        organizer_name: capture(&ORGANIZER, block).map(xml_unescape),
        body: capture(&HTML_BODY, block).map(xml_unescape),
        has_attachments,
        parent_folder_id: capture(&PARENT_FOLDER_ID, block).map(str::to_string),
        sensitivity: capture(&SENSITIVITY, block).and_then(|raw| raw.parse::<Sensitivity>().ok()),
        is_online_meeting: capture(&IS_ONLINE_MEETING, block).map(|raw| raw == "true"),
    };

    ItemRecord::new(identity, start_time, end_time, attributes).ok()
}

pub fn is_error_response(xml: &str) -> bool {
    ERROR_CLASS.is_match(xml)
}

pub fn is_impersonation_denied(xml: &str) -> bool {
    IMPERSONATION_DENIED_MARKERS.iter().any(|marker| xml.contains(marker))
}

/// `<m:ResponseCode>` values other than `NoError`.
pub fn error_codes(xml: &str) -> Vec<String> {
    RESPONSE_CODE
        .captures_iter(xml)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str())
        .filter(|code| *code != "NoError")
        .map(str::to_string)
        .collect()
}

/// Human-readable error messages (`MessageText`, or a SOAP fault string).
pub fn error_messages(xml: &str) -> Vec<String> {
    let messages: Vec<String> = MESSAGE_TEXT
        .captures_iter(xml)
        .filter_map(|caps| caps.get(1))
        .map(|m| xml_unescape(m.as_str().trim()))
        .collect();

    if !messages.is_empty() {
        return messages;
    }
    capture(&FAULT_STRING, xml).map(|fault| vec![xml_unescape(fault.trim())]).unwrap_or_default()
}

/// Calendar folder ids from a GetFolder response, in response order.
pub fn calendar_folder_ids(xml: &str) -> Vec<Option<String>> {
    CALENDAR_FOLDER
        .captures_iter(xml)
        .filter_map(|caps| caps.get(1))
        .map(|block| capture(&FOLDER_ID, block.as_str()).map(str::to_string))
        .collect()
}

/// First `ItemId` in a response, e.g. the refreshed id after UpdateItem.
pub fn first_item_id(xml: &str) -> Option<ItemIdentity> {
    let caps = ITEM_ID.captures(xml)?;
    Some(ItemIdentity::new(caps.get(1)?.as_str(), caps.get(2)?.as_str()))
}

/// Unique attendee addresses, lowercased and sorted.
pub fn attendee_emails(xml: &str) -> Vec<String> {
    let unique: BTreeSet<String> = ATTENDEE
        .captures_iter(xml)
        .filter_map(|caps| caps.get(1))
        .flat_map(|block| EMAIL_ADDRESS.find_iter(block.as_str()))
        .map(|m| m.as_str().to_lowercase())
        .collect();
    unique.into_iter().collect()
}

/// Attachment ids and names from a GetItem response.
pub fn attachments(xml: &str) -> Vec<AttachmentRef> {
    ATTACHMENT
        .captures_iter(xml)
        .filter_map(|caps| caps.get(1))
        .filter_map(|block| {
            let block = block.as_str();
            Some(AttachmentRef {
                id: capture(&ATTACHMENT_ID, block)?.to_string(),
                name: capture(&NAME, block).map(xml_unescape).unwrap_or_default(),
            })
        })
        .collect()
}
