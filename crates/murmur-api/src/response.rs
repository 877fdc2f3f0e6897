use axum::Json;
use serde::Serialize;
use serde_json::Value;

// Front-end codes: 0 is success. (The tier RPC surface uses the opposite
// convention; the two never mix on one wire.)
pub const CODE_OK: i32 = 0;
pub const CODE_FAIL: i32 = 1;

#[derive(Debug, Serialize)]
pub struct ApiResponse {
    pub code: i32,
    pub message: String,
    pub data: Value,
}

pub fn ok(message: &str, data: impl Serialize) -> Json<ApiResponse> {
    Json(ApiResponse {
        code: CODE_OK,
        message: message.to_string(),
        data: serde_json::to_value(data).unwrap_or(Value::Null),
    })
}

/// Failures are always HTTP 200 with a code; the message is the only
/// detail a caller gets.
pub fn fail(message: &str) -> Json<ApiResponse> {
    Json(ApiResponse {
        code: CODE_FAIL,
        message: message.to_string(),
        data: Value::Null,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn response_shape() {
        let Json(resp) = ok("login success", "tok123");
        let json = serde_json::to_string(&resp).unwrap();
        assert_eq!(json, r#"{"code":0,"message":"login success","data":"tok123"}"#);

        let Json(resp) = fail("auth fail");
        assert_eq!(resp.code, CODE_FAIL);
        assert!(resp.data.is_null());
    }
}
