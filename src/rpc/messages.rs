//! Protocol message types for the CLI service.
//!
//! These mirror the service definition's structs. Wire field names are noted
//! on each field; the codec in [`super::wire`] encodes them by field id.
//! Enumerations are open newtypes over the wire integer so that values added
//! by newer servers survive decoding.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Status code reported as success.
pub const SUCCESS_STATUS: i32 = 0;
pub const SUCCESS_WITH_INFO_STATUS: i32 = 1;
pub const STILL_EXECUTING_STATUS: i32 = 2;
pub const ERROR_STATUS: i32 = 3;
pub const INVALID_HANDLE_STATUS: i32 = 4;

/// Client protocol revisions negotiated when opening a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ProtocolVersion {
    V1,
    V2,
    V3,
    V4,
    V5,
    V6,
    V7,
    V8,
    V9,
    V10,
}

impl ProtocolVersion {
    const ALL: [ProtocolVersion; 10] = [
        ProtocolVersion::V1,
        ProtocolVersion::V2,
        ProtocolVersion::V3,
        ProtocolVersion::V4,
        ProtocolVersion::V5,
        ProtocolVersion::V6,
        ProtocolVersion::V7,
        ProtocolVersion::V8,
        ProtocolVersion::V9,
        ProtocolVersion::V10,
    ];

    /// Wire ordinal (`client_protocol`).
    pub fn ordinal(self) -> i32 {
        self as i32
    }

    /// Look up a version by its wire ordinal.
    pub fn from_ordinal(ordinal: i32) -> Option<Self> {
        usize::try_from(ordinal)
            .ok()
            .and_then(|idx| Self::ALL.get(idx).copied())
    }

    /// Whether row sets arrive column-oriented for this version.
    pub fn is_columnar(self) -> bool {
        self >= ProtocolVersion::V6
    }
}

impl fmt::Display for ProtocolVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HIVE_CLI_SERVICE_PROTOCOL_V{}", self.ordinal() + 1)
    }
}

/// Wire value of an operation's state (`TOperationState`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OperationStateCode(pub i32);

impl OperationStateCode {
    pub const INITIALIZED_STATE: Self = Self(0);
    pub const RUNNING_STATE: Self = Self(1);
    pub const FINISHED_STATE: Self = Self(2);
    pub const CANCELED_STATE: Self = Self(3);
    pub const CLOSED_STATE: Self = Self(4);
    pub const ERROR_STATE: Self = Self(5);
    pub const UKNOWN_STATE: Self = Self(6);
    pub const PENDING_STATE: Self = Self(7);
}

/// Wire value of an operation's type (`TOperationType`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OperationType(pub i32);

impl OperationType {
    pub const EXECUTE_STATEMENT: Self = Self(0);
    pub const GET_TYPE_INFO: Self = Self(1);
    pub const GET_CATALOGS: Self = Self(2);
    pub const GET_SCHEMAS: Self = Self(3);
    pub const GET_TABLES: Self = Self(4);
    pub const GET_TABLE_TYPES: Self = Self(5);
    pub const GET_COLUMNS: Self = Self(6);
    pub const GET_FUNCTIONS: Self = Self(7);
    pub const UNKNOWN: Self = Self(8);
}

/// Wire value of a fetch cursor directive (`TFetchOrientation`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FetchOrientation(pub i32);

impl FetchOrientation {
    pub const FETCH_NEXT: Self = Self(0);
    pub const FETCH_PRIOR: Self = Self(1);
    pub const FETCH_RELATIVE: Self = Self(2);
    pub const FETCH_ABSOLUTE: Self = Self(3);
    pub const FETCH_FIRST: Self = Self(4);
    pub const FETCH_LAST: Self = Self(5);

    /// Every orientation the protocol declares, by wire name.
    pub const VALUES: &'static [(&'static str, FetchOrientation)] = &[
        ("FETCH_NEXT", Self::FETCH_NEXT),
        ("FETCH_PRIOR", Self::FETCH_PRIOR),
        ("FETCH_RELATIVE", Self::FETCH_RELATIVE),
        ("FETCH_ABSOLUTE", Self::FETCH_ABSOLUTE),
        ("FETCH_FIRST", Self::FETCH_FIRST),
        ("FETCH_LAST", Self::FETCH_LAST),
    ];

    /// Wire name of this orientation, if declared.
    pub fn name(self) -> Option<&'static str> {
        Self::VALUES
            .iter()
            .find(|(_, value)| *value == self)
            .map(|(name, _)| *name)
    }
}

/// Wire value of a column type (`TTypeId`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypeId(pub i32);

impl TypeId {
    pub const BOOLEAN_TYPE: Self = Self(0);
    pub const TINYINT_TYPE: Self = Self(1);
    pub const SMALLINT_TYPE: Self = Self(2);
    pub const INT_TYPE: Self = Self(3);
    pub const BIGINT_TYPE: Self = Self(4);
    pub const FLOAT_TYPE: Self = Self(5);
    pub const DOUBLE_TYPE: Self = Self(6);
    pub const STRING_TYPE: Self = Self(7);
    pub const TIMESTAMP_TYPE: Self = Self(8);
    pub const BINARY_TYPE: Self = Self(9);
    pub const ARRAY_TYPE: Self = Self(10);
    pub const MAP_TYPE: Self = Self(11);
    pub const STRUCT_TYPE: Self = Self(12);
    pub const UNION_TYPE: Self = Self(13);
    pub const USER_DEFINED_TYPE: Self = Self(14);
    pub const DECIMAL_TYPE: Self = Self(15);
    pub const NULL_TYPE: Self = Self(16);
    pub const DATE_TYPE: Self = Self(17);
    pub const VARCHAR_TYPE: Self = Self(18);
    pub const CHAR_TYPE: Self = Self(19);
    pub const INTERVAL_YEAR_MONTH_TYPE: Self = Self(20);
    pub const INTERVAL_DAY_TIME_TYPE: Self = Self(21);

    const NAMES: [&'static str; 22] = [
        "BOOLEAN",
        "TINYINT",
        "SMALLINT",
        "INT",
        "BIGINT",
        "FLOAT",
        "DOUBLE",
        "STRING",
        "TIMESTAMP",
        "BINARY",
        "ARRAY",
        "MAP",
        "STRUCT",
        "UNIONTYPE",
        "USER_DEFINED",
        "DECIMAL",
        "VOID",
        "DATE",
        "VARCHAR",
        "CHAR",
        "INTERVAL_YEAR_MONTH",
        "INTERVAL_DAY_TIME",
    ];

    /// SQL name of the type.
    pub fn sql_name(self) -> &'static str {
        usize::try_from(self.0)
            .ok()
            .and_then(|idx| Self::NAMES.get(idx).copied())
            .unwrap_or("UNKNOWN")
    }
}

/// Opaque server identifier (`THandleIdentifier`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HandleIdentifier {
    /// `guid`
    pub guid: Vec<u8>,
    /// `secret`
    pub secret: Vec<u8>,
}

/// Server-issued session handle (`TSessionHandle`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionHandle {
    /// `sessionId`
    #[serde(rename = "sessionId")]
    pub session_id: HandleIdentifier,
}

impl SessionHandle {
    /// Whether both identifier parts are present.
    pub fn is_complete(&self) -> bool {
        !self.session_id.guid.is_empty() && !self.session_id.secret.is_empty()
    }
}

/// Server-issued operation handle (`TOperationHandle`).
#[derive(Debug, Clone, PartialEq)]
pub struct OperationHandle {
    /// `operationId`
    pub operation_id: HandleIdentifier,
    /// `operationType`
    pub operation_type: OperationType,
    /// `hasResultSet`
    pub has_result_set: bool,
    /// `modifiedRowCount`
    pub modified_row_count: Option<f64>,
}

/// Response status block (`TStatus`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Status {
    /// `statusCode`
    pub status_code: i32,
    /// `infoMessages`
    pub info_messages: Option<Vec<String>>,
    /// `sqlState`
    pub sql_state: Option<String>,
    /// `errorCode`
    pub error_code: Option<i32>,
    /// `errorMessage`
    pub error_message: Option<String>,
}

impl Status {
    /// A plain success status.
    pub fn success() -> Self {
        Self::default()
    }

    /// An error status carrying the given message.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status_code: ERROR_STATUS,
            error_message: Some(message.into()),
            ..Default::default()
        }
    }
}

/// `TOpenSessionReq`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenSessionReq {
    /// `client_protocol`
    pub client_protocol: ProtocolVersion,
    /// `username`
    pub username: Option<String>,
    /// `password`
    pub password: Option<String>,
    /// `configuration`
    pub configuration: Option<HashMap<String, String>>,
}

/// `TOpenSessionResp`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OpenSessionResp {
    /// `status`
    pub status: Status,
    /// `serverProtocolVersion`
    pub server_protocol_version: i32,
    /// `sessionHandle`
    pub session_handle: Option<SessionHandle>,
    /// `configuration`
    pub configuration: Option<HashMap<String, String>>,
}

/// `TCloseSessionReq`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloseSessionReq {
    /// `sessionHandle`
    pub session_handle: SessionHandle,
}

/// `TCloseSessionResp`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CloseSessionResp {
    /// `status`
    pub status: Status,
}

/// `TExecuteStatementReq`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecuteStatementReq {
    /// `sessionHandle`
    pub session_handle: SessionHandle,
    /// `statement`
    pub statement: String,
    /// `confOverlay`
    pub conf_overlay: Option<HashMap<String, String>>,
    /// `runAsync`
    pub run_async: Option<bool>,
}

/// `TExecuteStatementResp`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExecuteStatementResp {
    /// `status`
    pub status: Status,
    /// `operationHandle`
    pub operation_handle: Option<OperationHandle>,
}

/// `TGetOperationStatusReq`
#[derive(Debug, Clone, PartialEq)]
pub struct GetOperationStatusReq {
    /// `operationHandle`
    pub operation_handle: OperationHandle,
}

/// `TGetOperationStatusResp`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GetOperationStatusResp {
    /// `status`
    pub status: Status,
    /// `operationState`
    pub operation_state: Option<OperationStateCode>,
    /// `sqlState`
    pub sql_state: Option<String>,
    /// `errorCode`
    pub error_code: Option<i32>,
    /// `errorMessage`
    pub error_message: Option<String>,
}

/// `TCancelOperationReq`
#[derive(Debug, Clone, PartialEq)]
pub struct CancelOperationReq {
    /// `operationHandle`
    pub operation_handle: OperationHandle,
}

/// `TCancelOperationResp`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CancelOperationResp {
    /// `status`
    pub status: Status,
}

/// `TCloseOperationReq`
#[derive(Debug, Clone, PartialEq)]
pub struct CloseOperationReq {
    /// `operationHandle`
    pub operation_handle: OperationHandle,
}

/// `TCloseOperationResp`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CloseOperationResp {
    /// `status`
    pub status: Status,
}

/// `TGetResultSetMetadataReq`
#[derive(Debug, Clone, PartialEq)]
pub struct GetResultSetMetadataReq {
    /// `operationHandle`
    pub operation_handle: OperationHandle,
}

/// `TGetResultSetMetadataResp`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GetResultSetMetadataResp {
    /// `status`
    pub status: Status,
    /// `schema`
    pub schema: Option<TableSchema>,
}

/// `TTableSchema`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableSchema {
    /// `columns`
    pub columns: Vec<ColumnDesc>,
}

/// `TColumnDesc`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDesc {
    /// `columnName`
    pub column_name: String,
    /// Kind of the outermost `typeDesc` entry
    pub type_id: Option<TypeId>,
    /// `position`
    pub position: i32,
    /// `comment`
    pub comment: Option<String>,
}

impl ColumnDesc {
    /// SQL type name, with complex types reported by their outer kind.
    pub fn type_name(&self) -> &'static str {
        self.type_id.map(TypeId::sql_name).unwrap_or("STRING")
    }
}

/// `TFetchResultsReq`
#[derive(Debug, Clone, PartialEq)]
pub struct FetchResultsReq {
    /// `operationHandle`
    pub operation_handle: OperationHandle,
    /// `orientation`
    pub orientation: FetchOrientation,
    /// `maxRows`
    pub max_rows: i64,
}

/// `TFetchResultsResp`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FetchResultsResp {
    /// `status`
    pub status: Status,
    /// `hasMoreRows`
    pub has_more_rows: Option<bool>,
    /// `results`
    pub results: Option<RowSet>,
}

/// `TRowSet`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RowSet {
    /// `startRowOffset`
    pub start_row_offset: i64,
    /// `rows`
    pub rows: Vec<Vec<ColumnValue>>,
    /// `columns`
    pub columns: Option<Vec<ColumnData>>,
}

/// One cell of a row-oriented row set (`TColumnValue`).
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnValue {
    Bool(Option<bool>),
    Byte(Option<i8>),
    I16(Option<i16>),
    I32(Option<i32>),
    I64(Option<i64>),
    Double(Option<f64>),
    String(Option<String>),
    /// No union member was set
    Empty,
}

/// One column of a column-oriented row set (`TColumn`).
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnData {
    Bool { values: Vec<bool>, nulls: Vec<u8> },
    Byte { values: Vec<i8>, nulls: Vec<u8> },
    I16 { values: Vec<i16>, nulls: Vec<u8> },
    I32 { values: Vec<i32>, nulls: Vec<u8> },
    I64 { values: Vec<i64>, nulls: Vec<u8> },
    Double { values: Vec<f64>, nulls: Vec<u8> },
    String { values: Vec<String>, nulls: Vec<u8> },
    Binary { values: Vec<Vec<u8>>, nulls: Vec<u8> },
}

impl ColumnData {
    /// Number of values in the column.
    pub fn len(&self) -> usize {
        match self {
            ColumnData::Bool { values, .. } => values.len(),
            ColumnData::Byte { values, .. } => values.len(),
            ColumnData::I16 { values, .. } => values.len(),
            ColumnData::I32 { values, .. } => values.len(),
            ColumnData::I64 { values, .. } => values.len(),
            ColumnData::Double { values, .. } => values.len(),
            ColumnData::String { values, .. } => values.len(),
            ColumnData::Binary { values, .. } => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether the value at `idx` is marked null in the column's bitmap.
    pub fn is_null(&self, idx: usize) -> bool {
        let nulls = match self {
            ColumnData::Bool { nulls, .. }
            | ColumnData::Byte { nulls, .. }
            | ColumnData::I16 { nulls, .. }
            | ColumnData::I32 { nulls, .. }
            | ColumnData::I64 { nulls, .. }
            | ColumnData::Double { nulls, .. }
            | ColumnData::String { nulls, .. }
            | ColumnData::Binary { nulls, .. } => nulls,
        };
        nulls
            .get(idx / 8)
            .map(|byte| byte & (1 << (idx % 8)) != 0)
            .unwrap_or(false)
    }
}
