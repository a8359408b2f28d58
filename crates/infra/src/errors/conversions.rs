//! Conversions from external infrastructure errors into domain errors.

use roomsync_domain::RoomSyncError;
use reqwest::Error as HttpError;
use serde_json::Error as JsonError;
use std::io::Error as IoError;

/// Error newtype that keeps conversions on the infrastructure side and can be
/// converted back into the domain error.
#[derive(Debug)]
pub struct InfraError(pub RoomSyncError);

impl From<InfraError> for RoomSyncError {
    fn from(value: InfraError) -> Self {
        value.0
    }
}

impl From<RoomSyncError> for InfraError {
    fn from(value: RoomSyncError) -> Self {
        InfraError(value)
    }
}

/// Extension trait to make the conversion logic explicit in tests and within
/// this module.
trait IntoRoomSyncError {
    fn into_roomsync(self) -> RoomSyncError;
}

/* -------------------------------------------------------------------------- */
/* reqwest::Error → RoomSyncError */
/* -------------------------------------------------------------------------- */

impl IntoRoomSyncError for HttpError {
    fn into_roomsync(self) -> RoomSyncError {
        if self.is_timeout() {
            return RoomSyncError::Network("HTTP request timed out".into());
        }

        if self.is_connect() {
            return RoomSyncError::Network("HTTP connection failure".into());
        }

        if let Some(status) = self.status() {
            return status_error(status.as_u16(), status.canonical_reason());
        }

        RoomSyncError::Network(self.to_string())
    }
}

impl From<HttpError> for InfraError {
    fn from(value: HttpError) -> Self {
        InfraError(value.into_roomsync())
    }
}

/// Map a non-success HTTP status to the domain taxonomy.
pub fn status_error(code: u16, reason: Option<&str>) -> RoomSyncError {
    let message = format!("HTTP {} {}", code, reason.unwrap_or("unknown status"));

    match code {
        401 | 403 => RoomSyncError::Auth(message),
        404 => RoomSyncError::NotFound(message),
        409 | 412 => RoomSyncError::Conflict(message),
        429 => RoomSyncError::Network(message),
        400..=499 => RoomSyncError::Protocol(message),
        _ => RoomSyncError::Network(message),
    }
}

/* -------------------------------------------------------------------------- */
/* std::io::Error → RoomSyncError */
/* -------------------------------------------------------------------------- */

impl IntoRoomSyncError for IoError {
    fn into_roomsync(self) -> RoomSyncError {
        use std::io::ErrorKind;

        match self.kind() {
            ErrorKind::NotFound => RoomSyncError::NotFound(format!("file not found: {self}")),
            ErrorKind::PermissionDenied => {
                RoomSyncError::Persistence(format!("permission denied: {self}"))
            }
            _ => RoomSyncError::Persistence(self.to_string()),
        }
    }
}

impl From<IoError> for InfraError {
    fn from(value: IoError) -> Self {
        InfraError(value.into_roomsync())
    }
}

/* -------------------------------------------------------------------------- */
/* serde_json::Error → RoomSyncError */
/* -------------------------------------------------------------------------- */

impl IntoRoomSyncError for JsonError {
    fn into_roomsync(self) -> RoomSyncError {
        RoomSyncError::Persistence(format!(
            "invalid JSON at line {} column {}: {}",
            self.line(),
            self.column(),
            self
        ))
    }
}

impl From<JsonError> for InfraError {
    fn from(value: JsonError) -> Self {
        InfraError(value.into_roomsync())
    }
}

/* -------------------------------------------------------------------------- */
/* Tests */
/* -------------------------------------------------------------------------- */

#[cfg(test)]
mod tests {
    use reqwest::{Client, StatusCode};
    use tokio::runtime::Runtime;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    #[test]
    fn io_not_found_maps_to_not_found() {
        let err = IoError::new(std::io::ErrorKind::NotFound, "room.json");
        let mapped: RoomSyncError = InfraError::from(err).into();
        assert!(mapped.is_not_found());
    }

    #[test]
    fn other_io_errors_are_persistence() {
        let err = IoError::new(std::io::ErrorKind::Other, "disk full");
        let mapped: RoomSyncError = InfraError::from(err).into();
        match mapped {
            RoomSyncError::Persistence(msg) => assert!(msg.contains("disk full")),
            other => panic!("expected persistence error, got {:?}", other),
        }
    }

    #[test]
    fn json_errors_carry_position() {
        let err = serde_json::from_str::<serde_json::Value>("{\n  \"a\": }").unwrap_err();
        let mapped: RoomSyncError = InfraError::from(err).into();
        match mapped {
            RoomSyncError::Persistence(msg) => assert!(msg.contains("line 2")),
            other => panic!("expected persistence error, got {:?}", other),
        }
    }

    #[test]
    fn status_codes_map_to_taxonomy() {
        assert!(matches!(status_error(403, None), RoomSyncError::Auth(_)));
        assert!(matches!(status_error(412, None), RoomSyncError::Conflict(_)));
        assert!(matches!(status_error(400, None), RoomSyncError::Protocol(_)));
        assert!(matches!(status_error(503, None), RoomSyncError::Network(_)));
    }

    #[test]
    fn http_status_401_maps_to_auth_error() {
        Runtime::new().unwrap().block_on(async {
            let server = MockServer::start().await;
            Mock::given(method("GET"))
                .respond_with(ResponseTemplate::new(StatusCode::UNAUTHORIZED))
                .mount(&server)
                .await;

            let client = Client::builder().no_proxy().build().unwrap();
            let error =
                client.get(server.uri()).send().await.unwrap().error_for_status().unwrap_err();

            let mapped: RoomSyncError = InfraError::from(error).into();
            match mapped {
                RoomSyncError::Auth(msg) => assert!(msg.contains("401")),
                other => panic!("expected auth error, got {:?}", other),
            }
        });
    }
}
