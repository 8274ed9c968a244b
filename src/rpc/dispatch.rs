use crate::directory::{DirectoryError, WaypointDirectory};
use crate::domain::Waypoint;
use crate::geodesy::{DistanceUnit, UnknownDistanceUnit};
use crate::rpc::protocol::{JSONRPC_VERSION, JsonRpcError, JsonRpcRequest, JsonRpcResponse, error_codes, methods};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use thiserror::Error;
use tracing::{debug, instrument, warn};

/// Handles one raw JSON-RPC message. Returns `None` for notifications.
#[instrument(skip_all)]
pub async fn handle<D>(directory: &D, body: &[u8]) -> Option<JsonRpcResponse>
where
    D: WaypointDirectory<Error = DirectoryError> + ?Sized,
{
    let value = match serde_json::from_slice::<Value>(body) {
        Ok(value) => value,
        Err(e) => {
            warn!("⚠️ Could not parse request: {}", e);
            return Some(JsonRpcResponse::error(None, error_codes::PARSE_ERROR, format!("parse error: {}", e)));
        }
    };

    let request = match serde_json::from_value::<JsonRpcRequest>(value) {
        Ok(request) if request.jsonrpc == JSONRPC_VERSION => request,
        Ok(request) => {
            warn!("⚠️ Unsupported JSON-RPC version '{}'", request.jsonrpc);
            return Some(JsonRpcResponse::error(request.id, error_codes::INVALID_REQUEST, "jsonrpc must be \"2.0\""));
        }
        Err(e) => {
            warn!("⚠️ Invalid request: {}", e);
            return Some(JsonRpcResponse::error(None, error_codes::INVALID_REQUEST, format!("invalid request: {}", e)));
        }
    };

    let notification = request.is_notification();
    let response = dispatch(directory, request).await;
    if notification { None } else { Some(response) }
}

#[instrument(skip(directory, request), fields(method = %request.method))]
pub async fn dispatch<D>(directory: &D, request: JsonRpcRequest) -> JsonRpcResponse
where
    D: WaypointDirectory<Error = DirectoryError> + ?Sized,
{
    debug!(params = ?request.params, "🔸 Received call");
    match call(directory, &request.method, request.params).await {
        Ok(result) => JsonRpcResponse::success(request.id, result),
        Err(error) => {
            debug!("🔸 Call failed: {}", error);
            JsonRpcResponse::failure(request.id, JsonRpcError::from(&error))
        }
    }
}

async fn call<D>(directory: &D, method: &str, params: Option<Value>) -> Result<Value, DispatchError>
where
    D: WaypointDirectory<Error = DirectoryError> + ?Sized,
{
    use methods::legacy;

    let result = match method {
        methods::LIST_NAMES | legacy::GET_NAMES_FROM_LIBRARY => json!(directory.list_names().await?),
        methods::GET_ACTIVE => json!(directory.get_active().await?),
        methods::SET_ACTIVE => {
            let (name,): (String,) = parse_params(params)?;
            directory.set_active(&name).await?;
            Value::Null
        }
        methods::GET => {
            let (name,): (String,) = parse_params(params)?;
            serde_json::to_value(directory.get(&name).await?)?
        }
        legacy::GET_JSON_POINT_FROM_LIBRARY => {
            // Older front ends expect `{ name: { lat, lon, ele } }` and treat the lookup as a selection
            let (name,): (String,) = parse_params(params)?;
            let waypoint = directory.select_and_get(&name).await?;
            json!({ name: waypoint.coordinates })
        }
        methods::ADD | legacy::ADD_WAYPOINT => {
            directory.add(parse_waypoint(params)?).await?;
            Value::Null
        }
        methods::MODIFY | legacy::MODIFY_WAYPOINT => {
            directory.modify(parse_waypoint(params)?).await?;
            Value::Null
        }
        methods::REMOVE | legacy::REMOVE_WAYPOINT => {
            let (name,): (String,) = parse_params(params)?;
            serde_json::to_value(directory.remove(&name).await?)?
        }
        methods::CALC_DIST_BEAR => {
            let CalcDistBearParams(from, to, unit) = parse_params(params)?;
            let unit = match unit {
                Some(unit) => unit.parse::<DistanceUnit>()?,
                None => DistanceUnit::default(),
            };
            let result = directory.calc_dist_bear(&from, &to, unit).await?;
            json!([result.distance, result.bearing])
        }
        methods::SERVICE_INFO => json!(directory.service_info().await?),
        methods::LIBRARY_SIZE | legacy::GET_LIBRARY_SIZE => json!(directory.library_size().await?),
        methods::DEBUG_LIBRARY => {
            directory.debug_library().await?;
            Value::Null
        }
        _ => return Err(DispatchError::MethodNotFound(method.to_string())),
    };

    Ok(result)
}

#[derive(Deserialize)]
struct CalcDistBearParams(String, String, #[serde(default)] Option<String>);

fn parse_params<T: DeserializeOwned>(params: Option<Value>) -> Result<T, DispatchError> {
    serde_json::from_value(params.unwrap_or(Value::Null)).map_err(|e| DispatchError::InvalidParams(e.to_string()))
}

fn parse_waypoint(params: Option<Value>) -> Result<Waypoint, DispatchError> {
    let (name, latitude, longitude, elevation): (String, f64, f64, f64) = parse_params(params)?;
    Ok(Waypoint::new(name, latitude, longitude, elevation))
}

#[derive(Error, Debug)]
enum DispatchError {
    #[error("unknown method '{0}'")]
    MethodNotFound(String),
    #[error("invalid params: {0}")]
    InvalidParams(String),
    #[error("invalid params: {0}")]
    InvalidUnit(#[from] UnknownDistanceUnit),
    #[error(transparent)]
    Directory(#[from] DirectoryError),
    #[error("could not encode result: {0}")]
    Encode(#[from] serde_json::Error),
}

impl From<&DispatchError> for JsonRpcError {
    fn from(error: &DispatchError) -> Self {
        let code = match error {
            DispatchError::Directory(directory_error) => return JsonRpcError::from(directory_error),
            DispatchError::MethodNotFound(_) => error_codes::METHOD_NOT_FOUND,
            DispatchError::InvalidParams(_) | DispatchError::InvalidUnit(_) => error_codes::INVALID_PARAMS,
            DispatchError::Encode(_) => error_codes::INTERNAL_ERROR,
        };

        JsonRpcError {
            code,
            message: error.to_string(),
            data: None,
        }
    }
}
