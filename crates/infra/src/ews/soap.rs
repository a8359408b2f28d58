//! SOAP request builders for the EWS operations we use.
//!
//! Everything here is string assembly. Interpolated text goes through
//! [`xml_escape`]; timestamps are sent in UTC with second precision.

use std::fmt::Write;

use chrono::{DateTime, Utc};
use roomsync_domain::constants::CALENDAR_VIEW_MAX_ENTRIES;
use roomsync_domain::{truncate_to_minute, ItemIdentity, NewCalendarItem, TimeWindow};

const ENVELOPE_OPEN: &str = concat!(
    r#"<?xml version="1.0" encoding="utf-8"?>"#,
    r#"<soap:Envelope xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance""#,
    r#" xmlns:m="http://schemas.microsoft.com/exchange/services/2006/messages""#,
    r#" xmlns:t="http://schemas.microsoft.com/exchange/services/2006/types""#,
    r#" xmlns:soap="http://schemas.xmlsoap.org/soap/envelope/">"#,
);

const UPDATE_ITEM_OPEN: &str = concat!(
    r#"<m:UpdateItem MessageDisposition="SaveOnly" ConflictResolution="AlwaysOverwrite""#,
    r#" SendMeetingInvitationsOrCancellations="SendToNone">"#,
);

/// Which calendar a request addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FolderTarget<'a> {
    /// The calendar of whoever the request runs as.
    OwnCalendar,
    /// Another mailbox's calendar, addressed explicitly.
    Mailbox(&'a str),
}

/// Calendar fields that can be moved with [`update_time`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeField {
    Start,
    End,
}

impl TimeField {
    fn element(self) -> &'static str {
        match self {
            Self::Start => "Start",
            Self::End => "End",
        }
    }
}

pub fn xml_escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// `YYYY-MM-DDTHH:MM:SSZ`
pub fn format_time(instant: DateTime<Utc>) -> String {
    instant.format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

/// Wrap `body` in a SOAP envelope.
///
/// With `impersonation` set, the header asks Exchange to run the request as
/// that mailbox.
pub fn envelope(api_version: &str, impersonation: Option<&str>, body: &str) -> String {
    let mut header =
        format!(r#"<t:RequestServerVersion Version="{}" />"#, xml_escape(api_version));

    if let Some(address) = impersonation {
        // PrimarySmtpAddress must stay on a single line.
        let _ = write!(
            header,
            "<t:ExchangeImpersonation><t:ConnectingSID><t:PrimarySmtpAddress>{}</t:PrimarySmtpAddress></t:ConnectingSID></t:ExchangeImpersonation>",
            xml_escape(address)
        );
    }

    format!("{ENVELOPE_OPEN}<soap:Header>{header}</soap:Header><soap:Body>{body}</soap:Body></soap:Envelope>")
}

pub fn folder_xml(target: FolderTarget<'_>) -> String {
    match target {
        FolderTarget::OwnCalendar => r#"<t:DistinguishedFolderId Id="calendar"/>"#.to_string(),
        FolderTarget::Mailbox(address) => format!(
            r#"<t:DistinguishedFolderId Id="calendar"><t:Mailbox><t:EmailAddress>{}</t:EmailAddress></t:Mailbox></t:DistinguishedFolderId>"#,
            xml_escape(address)
        ),
    }
}

fn item_id_xml(identity: &ItemIdentity) -> String {
    format!(
        r#"<t:ItemId Id="{}" ChangeKey="{}"/>"#,
        xml_escape(&identity.item_id),
        xml_escape(&identity.change_key)
    )
}

/// FindItem over a CalendarView for one or more calendar folders.
pub fn find_items(folders: &[FolderTarget<'_>], window: &TimeWindow) -> String {
    let parent_folders: String = folders.iter().map(|folder| folder_xml(*folder)).collect();

    format!(
        concat!(
            r#"<m:FindItem Traversal="Shallow">"#,
            "<m:ItemShape><t:BaseShape>IdOnly</t:BaseShape><t:AdditionalProperties>",
            r#"<t:FieldURI FieldURI="item:Subject" />"#,
            r#"<t:FieldURI FieldURI="calendar:Start" />"#,
            r#"<t:FieldURI FieldURI="calendar:End" />"#,
            r#"<t:FieldURI FieldURI="item:Body" />"#,
            r#"<t:FieldURI FieldURI="calendar:Organizer" />"#,
            r#"<t:FieldURI FieldURI="item:HasAttachments" />"#,
            r#"<t:FieldURI FieldURI="item:Size" />"#,
            r#"<t:FieldURI FieldURI="item:Sensitivity" />"#,
            r#"<t:FieldURI FieldURI="item:ParentFolderId" />"#,
            r#"<t:FieldURI FieldURI="calendar:IsOnlineMeeting" />"#,
            "</t:AdditionalProperties></m:ItemShape>",
            r#"<m:CalendarView MaxEntriesReturned="{max}" StartDate="{start}" EndDate="{end}" />"#,
            "<m:ParentFolderIds>{folders}</m:ParentFolderIds>",
            "</m:FindItem>",
        ),
        max = CALENDAR_VIEW_MAX_ENTRIES,
        start = format_time(window.start()),
        end = format_time(window.end()),
        folders = parent_folders,
    )
}

/// GetFolder for the calendar folders of `mailboxes`, in order.
pub fn get_calendar_folders(mailboxes: &[String]) -> String {
    let folder_ids: String =
        mailboxes.iter().map(|mailbox| folder_xml(FolderTarget::Mailbox(mailbox))).collect();

    format!(
        "<m:GetFolder><m:FolderShape><t:BaseShape>Default</t:BaseShape></m:FolderShape><m:FolderIds>{folder_ids}</m:FolderIds></m:GetFolder>"
    )
}

pub fn attendees_xml(attendees: &[String]) -> String {
    if attendees.is_empty() {
        return String::new();
    }

    let mut xml = String::from("<t:RequiredAttendees>");
    for address in attendees {
        let _ = write!(
            xml,
            "<t:Attendee><t:Mailbox><t:EmailAddress>{}</t:EmailAddress></t:Mailbox></t:Attendee>",
            xml_escape(address)
        );
    }
    xml.push_str("</t:RequiredAttendees>");
    xml
}

/// CreateItem without sending invitations. Times are sent minute-truncated.
pub fn create_item(target: FolderTarget<'_>, item: &NewCalendarItem, timezone_name: &str) -> String {
    format!(
        concat!(
            r#"<m:CreateItem SendMeetingInvitations="SendToNone">"#,
            "<m:SavedItemFolderId>{folder}</m:SavedItemFolderId>",
            "<m:Items><t:CalendarItem>",
            "<t:Subject>{subject}</t:Subject>",
            r#"<t:Body BodyType="Text">{body}</t:Body>"#,
            "<t:Start>{start}</t:Start>",
            "<t:End>{end}</t:End>",
            r#"<t:MeetingTimeZone TimeZoneName="{tz}" />"#,
            "{attendees}",
            "<t:IsOnlineMeeting>true</t:IsOnlineMeeting>",
            "</t:CalendarItem></m:Items>",
            "</m:CreateItem>",
        ),
        folder = folder_xml(target),
        subject = xml_escape(&item.subject),
        body = xml_escape(item.body.as_deref().unwrap_or_default()),
        start = format_time(truncate_to_minute(item.start_time)),
        end = format_time(truncate_to_minute(item.end_time)),
        tz = xml_escape(timezone_name),
        attendees = attendees_xml(&item.attendees),
    )
}

fn update_item(identity: &ItemIdentity, field_uri: &str, payload: &str) -> String {
    format!(
        concat!(
            "{open}<m:ItemChanges><t:ItemChange>{item_id}<t:Updates><t:SetItemField>",
            r#"<t:FieldURI FieldURI="{field}" />"#,
            "<t:CalendarItem>{payload}</t:CalendarItem>",
            "</t:SetItemField></t:Updates></t:ItemChange></m:ItemChanges></m:UpdateItem>",
        ),
        open = UPDATE_ITEM_OPEN,
        item_id = item_id_xml(identity),
        field = field_uri,
        payload = payload,
    )
}

/// UpdateItem for a single time field. EWS rejects changes carrying more
/// than one property, so start and end go in separate requests.
pub fn update_time(identity: &ItemIdentity, field: TimeField, instant: DateTime<Utc>) -> String {
    let element = field.element();
    let instant = truncate_to_minute(instant);
    update_item(
        identity,
        &format!("calendar:{element}"),
        &format!("<t:{element}>{}</t:{element}>", format_time(instant)),
    )
}

pub fn update_body(identity: &ItemIdentity, body: &str) -> String {
    let escaped = xml_escape(body);
    update_item(
        identity,
        "item:Body",
        &format!(
            r#"<t:Body BodyType="HTML">{escaped}</t:Body><t:Body BodyType="Text">{escaped}</t:Body>"#
        ),
    )
}

pub fn update_required_attendees(identity: &ItemIdentity, attendees: &[String]) -> String {
    update_item(identity, "calendar:RequiredAttendees", &attendees_xml(attendees))
}

pub fn delete_item(identity: &ItemIdentity) -> String {
    format!(
        r#"<m:DeleteItem DeleteType="HardDelete" SendMeetingCancellations="SendToNone"><m:ItemIds>{}</m:ItemIds></m:DeleteItem>"#,
        item_id_xml(identity)
    )
}

fn get_item(item_id: &str, fields: &[&str]) -> String {
    let properties: String =
        fields.iter().map(|field| format!(r#"<t:FieldURI FieldURI="{field}" />"#)).collect();

    format!(
        r#"<m:GetItem><m:ItemShape><t:BaseShape>IdOnly</t:BaseShape><t:AdditionalProperties>{properties}</t:AdditionalProperties></m:ItemShape><m:ItemIds><t:ItemId Id="{}" /></m:ItemIds></m:GetItem>"#,
        xml_escape(item_id)
    )
}

pub fn get_attendees(item_id: &str) -> String {
    get_item(item_id, &["calendar:RequiredAttendees", "calendar:OptionalAttendees"])
}

pub fn get_attachments(item_id: &str) -> String {
    get_item(item_id, &["item:Attachments", "item:HasAttachments"])
}
