//! Shared fixtures for infra integration tests.
#![allow(dead_code)]

use roomsync_domain::EwsConfig;
use roomsync_infra::ServiceAccount;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockBuilder, MockServer, ResponseTemplate};

pub const SERVICE_ACCOUNT: &str = "svc-rooms@example.com";
pub const ROOM: &str = "room.4a@example.com";
pub const ENDPOINT_PATH: &str = "/EWS/exchange.asmx";

pub fn ews_config(server: &MockServer) -> EwsConfig {
    EwsConfig {
        server_url: Some(server.uri()),
        username: Some(SERVICE_ACCOUNT.into()),
        password: Some("hunter2".into()),
        request_timeout_secs: 5,
        ..EwsConfig::default()
    }
}

pub fn account(server: &MockServer) -> ServiceAccount {
    ServiceAccount::basic(ews_config(server)).expect("basic account")
}

/// POST to the EWS endpoint.
pub fn soap() -> MockBuilder {
    Mock::given(method("POST")).and(path(ENDPOINT_PATH))
}

pub fn ok(body: String) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_string(body).insert_header("content-type", "text/xml")
}

pub fn envelope(body: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="utf-8"?><s:Envelope xmlns:s="http://schemas.xmlsoap.org/soap/envelope/"><s:Body>{body}</s:Body></s:Envelope>"#
    )
}

pub struct CalendarItemXml<'a> {
    pub id: &'a str,
    pub change_key: &'a str,
    pub subject: &'a str,
    pub start: &'a str,
    pub end: &'a str,
    pub folder_id: Option<&'a str>,
}

impl CalendarItemXml<'_> {
    pub fn render(&self) -> String {
        let folder = self
            .folder_id
            .map(|id| format!(r#"<t:ParentFolderId Id="{id}" ChangeKey="AQ"/>"#))
            .unwrap_or_default();
        format!(
            concat!(
                "<t:CalendarItem>",
                r#"<t:ItemId Id="{id}" ChangeKey="{key}"/>{folder}"#,
                "<t:Subject>{subject}</t:Subject>",
                "<t:HasAttachments>false</t:HasAttachments>",
                "<t:Start>{start}</t:Start><t:End>{end}</t:End>",
                "</t:CalendarItem>"
            ),
            id = self.id,
            key = self.change_key,
            folder = folder,
            subject = self.subject,
            start = self.start,
            end = self.end,
        )
    }
}

pub fn find_item_response(items: &[CalendarItemXml<'_>]) -> String {
    let rendered: String = items.iter().map(CalendarItemXml::render).collect();
    find_item_view(items.len(), true, &rendered)
}

/// A CalendarView the server cut off after `items`.
pub fn truncated_find_item_response(total: usize, items: &[CalendarItemXml<'_>]) -> String {
    let rendered: String = items.iter().map(CalendarItemXml::render).collect();
    find_item_view(total, false, &rendered)
}

/// FindItem response with hand-written `<t:Items>` content.
pub fn find_item_view(total: usize, includes_last: bool, items: &str) -> String {
    envelope(&format!(
        concat!(
            r#"<m:FindItemResponse><m:ResponseMessages><m:FindItemResponseMessage ResponseClass="Success">"#,
            "<m:ResponseCode>NoError</m:ResponseCode>",
            r#"<m:RootFolder TotalItemsInView="{total}" IncludesLastItemInRange="{last}"><t:Items>{items}</t:Items></m:RootFolder>"#,
            "</m:FindItemResponseMessage></m:ResponseMessages></m:FindItemResponse>"
        ),
        total = total,
        last = includes_last,
        items = items,
    ))
}

pub fn get_folder_response(folder_id: &str) -> String {
    envelope(&format!(
        concat!(
            r#"<m:GetFolderResponse><m:ResponseMessages><m:GetFolderResponseMessage ResponseClass="Success">"#,
            "<m:ResponseCode>NoError</m:ResponseCode>",
            r#"<m:Folders><t:CalendarFolder><t:FolderId Id="{id}" ChangeKey="AgAA"/><t:DisplayName>Calendar</t:DisplayName></t:CalendarFolder></m:Folders>"#,
            "</m:GetFolderResponseMessage></m:ResponseMessages></m:GetFolderResponse>"
        ),
        id = folder_id,
    ))
}

pub fn update_item_response(id: &str, change_key: &str) -> String {
    envelope(&format!(
        concat!(
            r#"<m:UpdateItemResponse><m:ResponseMessages><m:UpdateItemResponseMessage ResponseClass="Success">"#,
            "<m:ResponseCode>NoError</m:ResponseCode>",
            r#"<m:Items><t:CalendarItem><t:ItemId Id="{id}" ChangeKey="{key}"/></t:CalendarItem></m:Items>"#,
            "</m:UpdateItemResponseMessage></m:ResponseMessages></m:UpdateItemResponse>"
        ),
        id = id,
        key = change_key,
    ))
}

pub fn success_response(operation: &str) -> String {
    envelope(&format!(
        r#"<m:{operation}Response><m:ResponseMessages><m:{operation}ResponseMessage ResponseClass="Success"><m:ResponseCode>NoError</m:ResponseCode></m:{operation}ResponseMessage></m:ResponseMessages></m:{operation}Response>"#
    ))
}

pub fn error_response(operation: &str, code: &str, message: &str) -> String {
    envelope(&format!(
        r#"<m:{operation}Response><m:ResponseMessages><m:{operation}ResponseMessage ResponseClass="Error"><m:MessageText>{message}</m:MessageText><m:ResponseCode>{code}</m:ResponseCode></m:{operation}ResponseMessage></m:ResponseMessages></m:{operation}Response>"#
    ))
}

pub fn impersonation_denied_fault() -> String {
    envelope(concat!(
        "<s:Fault><faultcode>a:ErrorImpersonateUserDenied</faultcode>",
        "<faultstring>The account does not have permission to impersonate the requested user.</faultstring>",
        "</s:Fault>"
    ))
}

pub async fn request_bodies(server: &MockServer) -> Vec<String> {
    server
        .received_requests()
        .await
        .expect("request recording enabled")
        .into_iter()
        .map(|request| String::from_utf8(request.body).expect("utf-8 body"))
        .collect()
}
