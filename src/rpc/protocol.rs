//! JSON-RPC 2.0 types as spoken by the waypoint server.

use crate::directory::DirectoryError;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

pub const JSONRPC_VERSION: &str = "2.0";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<JsonRpcId>,
    pub method: String,
    #[serde(default)]
    pub params: Option<Value>,
}

impl JsonRpcRequest {
    pub fn new(id: JsonRpcId, method: &str, params: Value) -> Self {
        JsonRpcRequest {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id: Some(id),
            method: method.to_string(),
            params: Some(params),
        }
    }

    /// Requests without an id are notifications and get no response.
    pub fn is_notification(&self) -> bool {
        self.id.is_none()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    /// `null` when the request id could not be read.
    #[serde(default)]
    pub id: Option<JsonRpcId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum JsonRpcId {
    String(String),
    Number(i64),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JsonRpcError {
    pub code: i32,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl JsonRpcResponse {
    pub fn success(id: Option<JsonRpcId>, result: Value) -> Self {
        JsonRpcResponse {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            result: Some(result),
            error: None,
        }
    }

    pub fn error(id: Option<JsonRpcId>, code: i32, message: impl Into<String>) -> Self {
        JsonRpcResponse::failure(
            id,
            JsonRpcError {
                code,
                message: message.into(),
                data: None,
            },
        )
    }

    pub fn failure(id: Option<JsonRpcId>, error: JsonRpcError) -> Self {
        JsonRpcResponse {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            result: None,
            error: Some(error),
        }
    }
}

impl From<&DirectoryError> for JsonRpcError {
    fn from(error: &DirectoryError) -> Self {
        let (code, data) = match error {
            DirectoryError::NotFound(name) => (error_codes::NOT_FOUND, Some(json!({ "name": name }))),
            DirectoryError::DuplicateName(name) => (error_codes::DUPLICATE_NAME, Some(json!({ "name": name }))),
            DirectoryError::InvalidName => (error_codes::INVALID_NAME, None),
            DirectoryError::InvalidCoordinate(name) => (error_codes::INVALID_COORDINATE, Some(json!({ "name": name }))),
        };

        JsonRpcError {
            code,
            message: error.to_string(),
            data,
        }
    }
}

impl JsonRpcError {
    /// Reverses the mapping of a directory error, `None` for any other error code.
    pub fn to_directory_error(&self) -> Option<DirectoryError> {
        let name = || {
            self.data
                .as_ref()
                .and_then(|data| data.get("name"))
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string()
        };

        match self.code {
            error_codes::NOT_FOUND => Some(DirectoryError::NotFound(name())),
            error_codes::DUPLICATE_NAME => Some(DirectoryError::DuplicateName(name())),
            error_codes::INVALID_NAME => Some(DirectoryError::InvalidName),
            error_codes::INVALID_COORDINATE => Some(DirectoryError::InvalidCoordinate(name())),
            _ => None,
        }
    }
}

pub mod error_codes {
    pub const PARSE_ERROR: i32 = -32700;
    pub const INVALID_REQUEST: i32 = -32600;
    pub const METHOD_NOT_FOUND: i32 = -32601;
    pub const INVALID_PARAMS: i32 = -32602;
    pub const INTERNAL_ERROR: i32 = -32603;

    // Directory errors (-32001 to -32099)
    pub const NOT_FOUND: i32 = -32001;
    pub const DUPLICATE_NAME: i32 = -32002;
    pub const INVALID_NAME: i32 = -32003;
    pub const INVALID_COORDINATE: i32 = -32004;
}

pub mod methods {
    pub const LIST_NAMES: &str = "listNames";
    pub const GET_ACTIVE: &str = "getActive";
    pub const SET_ACTIVE: &str = "setActive";
    pub const GET: &str = "get";
    pub const ADD: &str = "add";
    pub const MODIFY: &str = "modify";
    pub const REMOVE: &str = "remove";
    pub const CALC_DIST_BEAR: &str = "calcDistBear";
    pub const SERVICE_INFO: &str = "serviceInfo";
    pub const LIBRARY_SIZE: &str = "librarySize";
    pub const DEBUG_LIBRARY: &str = "debugLibrary";

    /// Method names used by the first generation of front ends.
    pub mod legacy {
        pub const GET_NAMES_FROM_LIBRARY: &str = "getNamesFromLibrary";
        pub const GET_JSON_POINT_FROM_LIBRARY: &str = "getJSONPointFromLibrary";
        pub const ADD_WAYPOINT: &str = "addWaypoint";
        pub const MODIFY_WAYPOINT: &str = "modifyWaypoint";
        pub const REMOVE_WAYPOINT: &str = "removeWaypoint";
        pub const GET_LIBRARY_SIZE: &str = "getLibrarySize";
    }
}
