use serde_json::Value as JsonValue;

use crate::{PostgrestError, ServiceError, ServiceResponse};

/// Turns a raw HTTP answer into a [`ServiceResponse`].
///
/// Only a malformed success body is an error; every failed status is
/// reported through `ServiceResponse::error`.
pub(crate) fn decode_response(status: u16, body: &str) -> Result<ServiceResponse, PostgrestError> {
    if (200..300).contains(&status) {
        let data = if body.trim().is_empty() {
            None
        } else {
            Some(serde_json::from_str::<JsonValue>(body).map_err(|err| {
                PostgrestError::Decode(format!("invalid response JSON: {err}; body: {body}"))
            })?)
        };
        return Ok(ServiceResponse {
            status,
            data,
            error: None,
        });
    }

    Ok(ServiceResponse {
        status,
        data: None,
        error: Some(decode_service_error(status, body)),
    })
}

fn decode_service_error(status: u16, body: &str) -> ServiceError {
    if let Ok(error) = serde_json::from_str::<ServiceError>(body) {
        return error;
    }
    let message = if body.trim().is_empty() {
        format!("http status {status}")
    } else {
        body.to_owned()
    };
    ServiceError {
        message,
        code: Some(status.to_string()),
        details: None,
        hint: None,
    }
}
