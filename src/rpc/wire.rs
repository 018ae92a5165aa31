//! Struct encodings for the CLI service messages.
//!
//! Requests and responses are encoded field by field using the ids of the
//! service definition. Unknown fields are skipped on decode, which keeps the
//! client compatible with servers that add fields.

use std::collections::HashMap;

use super::codec::{
    ttype, DecodeError, DecodeResult, MessageHeader, MessageType, ProtocolReader, ProtocolWriter,
    ReadThrift, WriteThrift,
};
use super::messages::{
    CancelOperationReq, CancelOperationResp, CloseOperationReq, CloseOperationResp,
    CloseSessionReq, CloseSessionResp, ColumnData, ColumnDesc, ColumnValue, ExecuteStatementReq,
    ExecuteStatementResp, FetchOrientation, FetchResultsReq, FetchResultsResp,
    GetOperationStatusReq, GetOperationStatusResp, GetResultSetMetadataReq,
    GetResultSetMetadataResp, HandleIdentifier, OpenSessionReq, OpenSessionResp, OperationHandle,
    OperationStateCode, OperationType, ProtocolVersion, RowSet, SessionHandle, Status,
    TableSchema, TypeId,
};
use crate::error::TransportError;

// ============================================================================
// Helpers
// ============================================================================

fn required<T>(value: Option<T>, field: &str) -> DecodeResult<T> {
    value.ok_or_else(|| DecodeError::Invalid(format!("missing required field {}", field)))
}

fn read_list<'a, T>(
    r: &mut ProtocolReader<'a>,
    mut read_element: impl FnMut(&mut ProtocolReader<'a>) -> DecodeResult<T>,
) -> DecodeResult<Vec<T>> {
    let (_, size) = r.read_list_begin()?;
    let mut items = Vec::with_capacity(size.min(1024));
    for _ in 0..size {
        items.push(read_element(r)?);
    }
    Ok(items)
}

fn read_string_map(r: &mut ProtocolReader<'_>) -> DecodeResult<HashMap<String, String>> {
    let (_, _, size) = r.read_map_begin()?;
    let mut map = HashMap::with_capacity(size.min(1024));
    for _ in 0..size {
        let key = r.read_string()?;
        let value = r.read_string()?;
        map.insert(key, value);
    }
    Ok(map)
}

fn write_string_map(w: &mut ProtocolWriter, id: i16, map: &HashMap<String, String>) {
    w.write_field_begin(ttype::MAP, id);
    w.write_map_begin(ttype::STRING, ttype::STRING, map.len());
    let mut entries: Vec<_> = map.iter().collect();
    entries.sort();
    for (key, value) in entries {
        w.write_string(key);
        w.write_string(value);
    }
}

fn write_struct_field<T: WriteThrift>(w: &mut ProtocolWriter, id: i16, value: &T) {
    w.write_field_begin(ttype::STRUCT, id);
    value.write(w);
}

fn write_status_only(w: &mut ProtocolWriter, status: &Status) {
    write_struct_field(w, 1, status);
    w.write_field_stop();
}

/// Read a struct holding only an `operationHandle` or only a `status` at field 1.
fn read_single_struct_field<T: ReadThrift>(r: &mut ProtocolReader<'_>, name: &str) -> DecodeResult<T> {
    let mut value = None;
    while let Some((field_type, id)) = r.read_field_begin()? {
        match (id, field_type) {
            (1, ttype::STRUCT) => value = Some(T::read(r)?),
            _ => r.skip(field_type)?,
        }
    }
    required(value, name)
}

// ============================================================================
// Handles and status
// ============================================================================

impl WriteThrift for HandleIdentifier {
    fn write(&self, w: &mut ProtocolWriter) {
        w.write_field_begin(ttype::STRING, 1);
        w.write_binary(&self.guid);
        w.write_field_begin(ttype::STRING, 2);
        w.write_binary(&self.secret);
        w.write_field_stop();
    }
}

impl ReadThrift for HandleIdentifier {
    fn read(r: &mut ProtocolReader<'_>) -> DecodeResult<Self> {
        let mut guid = None;
        let mut secret = None;
        while let Some((field_type, id)) = r.read_field_begin()? {
            match (id, field_type) {
                (1, ttype::STRING) => guid = Some(r.read_binary()?),
                (2, ttype::STRING) => secret = Some(r.read_binary()?),
                _ => r.skip(field_type)?,
            }
        }
        Ok(Self {
            guid: required(guid, "THandleIdentifier.guid")?,
            secret: required(secret, "THandleIdentifier.secret")?,
        })
    }
}

impl WriteThrift for SessionHandle {
    fn write(&self, w: &mut ProtocolWriter) {
        write_struct_field(w, 1, &self.session_id);
        w.write_field_stop();
    }
}

impl ReadThrift for SessionHandle {
    fn read(r: &mut ProtocolReader<'_>) -> DecodeResult<Self> {
        Ok(Self {
            session_id: read_single_struct_field(r, "TSessionHandle.sessionId")?,
        })
    }
}

impl WriteThrift for OperationHandle {
    fn write(&self, w: &mut ProtocolWriter) {
        write_struct_field(w, 1, &self.operation_id);
        w.write_field_begin(ttype::I32, 2);
        w.write_i32(self.operation_type.0);
        w.write_field_begin(ttype::BOOL, 3);
        w.write_bool(self.has_result_set);
        if let Some(count) = self.modified_row_count {
            w.write_field_begin(ttype::DOUBLE, 4);
            w.write_double(count);
        }
        w.write_field_stop();
    }
}

impl ReadThrift for OperationHandle {
    fn read(r: &mut ProtocolReader<'_>) -> DecodeResult<Self> {
        let mut operation_id = None;
        let mut operation_type = None;
        let mut has_result_set = None;
        let mut modified_row_count = None;
        while let Some((field_type, id)) = r.read_field_begin()? {
            match (id, field_type) {
                (1, ttype::STRUCT) => operation_id = Some(HandleIdentifier::read(r)?),
                (2, ttype::I32) => operation_type = Some(OperationType(r.read_i32()?)),
                (3, ttype::BOOL) => has_result_set = Some(r.read_bool()?),
                (4, ttype::DOUBLE) => modified_row_count = Some(r.read_double()?),
                _ => r.skip(field_type)?,
            }
        }
        Ok(Self {
            operation_id: required(operation_id, "TOperationHandle.operationId")?,
            operation_type: required(operation_type, "TOperationHandle.operationType")?,
            has_result_set: required(has_result_set, "TOperationHandle.hasResultSet")?,
            modified_row_count,
        })
    }
}

impl WriteThrift for Status {
    fn write(&self, w: &mut ProtocolWriter) {
        w.write_field_begin(ttype::I32, 1);
        w.write_i32(self.status_code);
        if let Some(messages) = &self.info_messages {
            w.write_field_begin(ttype::LIST, 2);
            w.write_list_begin(ttype::STRING, messages.len());
            for message in messages {
                w.write_string(message);
            }
        }
        if let Some(sql_state) = &self.sql_state {
            w.write_field_begin(ttype::STRING, 3);
            w.write_string(sql_state);
        }
        if let Some(error_code) = self.error_code {
            w.write_field_begin(ttype::I32, 4);
            w.write_i32(error_code);
        }
        if let Some(error_message) = &self.error_message {
            w.write_field_begin(ttype::STRING, 5);
            w.write_string(error_message);
        }
        w.write_field_stop();
    }
}

impl ReadThrift for Status {
    fn read(r: &mut ProtocolReader<'_>) -> DecodeResult<Self> {
        let mut status = Status::default();
        let mut status_code = None;
        while let Some((field_type, id)) = r.read_field_begin()? {
            match (id, field_type) {
                (1, ttype::I32) => status_code = Some(r.read_i32()?),
                (2, ttype::LIST) => {
                    status.info_messages = Some(read_list(r, |r| r.read_string())?)
                }
                (3, ttype::STRING) => status.sql_state = Some(r.read_string()?),
                (4, ttype::I32) => status.error_code = Some(r.read_i32()?),
                (5, ttype::STRING) => status.error_message = Some(r.read_string()?),
                _ => r.skip(field_type)?,
            }
        }
        status.status_code = required(status_code, "TStatus.statusCode")?;
        Ok(status)
    }
}

// ============================================================================
// Sessions
// ============================================================================

impl WriteThrift for OpenSessionReq {
    fn write(&self, w: &mut ProtocolWriter) {
        w.write_field_begin(ttype::I32, 1);
        w.write_i32(self.client_protocol.ordinal());
        if let Some(username) = &self.username {
            w.write_field_begin(ttype::STRING, 2);
            w.write_string(username);
        }
        if let Some(password) = &self.password {
            w.write_field_begin(ttype::STRING, 3);
            w.write_string(password);
        }
        if let Some(configuration) = &self.configuration {
            write_string_map(w, 4, configuration);
        }
        w.write_field_stop();
    }
}

impl ReadThrift for OpenSessionReq {
    fn read(r: &mut ProtocolReader<'_>) -> DecodeResult<Self> {
        let mut client_protocol = None;
        let mut username = None;
        let mut password = None;
        let mut configuration = None;
        while let Some((field_type, id)) = r.read_field_begin()? {
            match (id, field_type) {
                (1, ttype::I32) => {
                    let ordinal = r.read_i32()?;
                    client_protocol = Some(ProtocolVersion::from_ordinal(ordinal).ok_or_else(
                        || DecodeError::Invalid(format!("unknown protocol version {}", ordinal)),
                    )?);
                }
                (2, ttype::STRING) => username = Some(r.read_string()?),
                (3, ttype::STRING) => password = Some(r.read_string()?),
                (4, ttype::MAP) => configuration = Some(read_string_map(r)?),
                _ => r.skip(field_type)?,
            }
        }
        Ok(Self {
            client_protocol: required(client_protocol, "TOpenSessionReq.client_protocol")?,
            username,
            password,
            configuration,
        })
    }
}

impl WriteThrift for OpenSessionResp {
    fn write(&self, w: &mut ProtocolWriter) {
        write_struct_field(w, 1, &self.status);
        w.write_field_begin(ttype::I32, 2);
        w.write_i32(self.server_protocol_version);
        if let Some(handle) = &self.session_handle {
            write_struct_field(w, 3, handle);
        }
        if let Some(configuration) = &self.configuration {
            write_string_map(w, 4, configuration);
        }
        w.write_field_stop();
    }
}

impl ReadThrift for OpenSessionResp {
    fn read(r: &mut ProtocolReader<'_>) -> DecodeResult<Self> {
        let mut resp = OpenSessionResp::default();
        let mut status = None;
        while let Some((field_type, id)) = r.read_field_begin()? {
            match (id, field_type) {
                (1, ttype::STRUCT) => status = Some(Status::read(r)?),
                (2, ttype::I32) => resp.server_protocol_version = r.read_i32()?,
                (3, ttype::STRUCT) => resp.session_handle = Some(SessionHandle::read(r)?),
                (4, ttype::MAP) => resp.configuration = Some(read_string_map(r)?),
                _ => r.skip(field_type)?,
            }
        }
        resp.status = required(status, "TOpenSessionResp.status")?;
        Ok(resp)
    }
}

impl WriteThrift for CloseSessionReq {
    fn write(&self, w: &mut ProtocolWriter) {
        write_struct_field(w, 1, &self.session_handle);
        w.write_field_stop();
    }
}

impl WriteThrift for CloseSessionResp {
    fn write(&self, w: &mut ProtocolWriter) {
        write_status_only(w, &self.status);
    }
}

impl ReadThrift for CloseSessionResp {
    fn read(r: &mut ProtocolReader<'_>) -> DecodeResult<Self> {
        Ok(Self {
            status: read_single_struct_field(r, "TCloseSessionResp.status")?,
        })
    }
}

// ============================================================================
// Statements and operations
// ============================================================================

impl WriteThrift for ExecuteStatementReq {
    fn write(&self, w: &mut ProtocolWriter) {
        write_struct_field(w, 1, &self.session_handle);
        w.write_field_begin(ttype::STRING, 2);
        w.write_string(&self.statement);
        if let Some(overlay) = &self.conf_overlay {
            write_string_map(w, 3, overlay);
        }
        if let Some(run_async) = self.run_async {
            w.write_field_begin(ttype::BOOL, 4);
            w.write_bool(run_async);
        }
        w.write_field_stop();
    }
}

impl ReadThrift for ExecuteStatementReq {
    fn read(r: &mut ProtocolReader<'_>) -> DecodeResult<Self> {
        let mut session_handle = None;
        let mut statement = None;
        let mut conf_overlay = None;
        let mut run_async = None;
        while let Some((field_type, id)) = r.read_field_begin()? {
            match (id, field_type) {
                (1, ttype::STRUCT) => session_handle = Some(SessionHandle::read(r)?),
                (2, ttype::STRING) => statement = Some(r.read_string()?),
                (3, ttype::MAP) => conf_overlay = Some(read_string_map(r)?),
                (4, ttype::BOOL) => run_async = Some(r.read_bool()?),
                _ => r.skip(field_type)?,
            }
        }
        Ok(Self {
            session_handle: required(session_handle, "TExecuteStatementReq.sessionHandle")?,
            statement: required(statement, "TExecuteStatementReq.statement")?,
            conf_overlay,
            run_async,
        })
    }
}

impl WriteThrift for ExecuteStatementResp {
    fn write(&self, w: &mut ProtocolWriter) {
        write_struct_field(w, 1, &self.status);
        if let Some(handle) = &self.operation_handle {
            write_struct_field(w, 2, handle);
        }
        w.write_field_stop();
    }
}

impl ReadThrift for ExecuteStatementResp {
    fn read(r: &mut ProtocolReader<'_>) -> DecodeResult<Self> {
        let mut status = None;
        let mut operation_handle = None;
        while let Some((field_type, id)) = r.read_field_begin()? {
            match (id, field_type) {
                (1, ttype::STRUCT) => status = Some(Status::read(r)?),
                (2, ttype::STRUCT) => operation_handle = Some(OperationHandle::read(r)?),
                _ => r.skip(field_type)?,
            }
        }
        Ok(Self {
            status: required(status, "TExecuteStatementResp.status")?,
            operation_handle,
        })
    }
}

impl WriteThrift for GetOperationStatusReq {
    fn write(&self, w: &mut ProtocolWriter) {
        write_struct_field(w, 1, &self.operation_handle);
        w.write_field_stop();
    }
}

impl WriteThrift for GetOperationStatusResp {
    fn write(&self, w: &mut ProtocolWriter) {
        write_struct_field(w, 1, &self.status);
        if let Some(state) = self.operation_state {
            w.write_field_begin(ttype::I32, 2);
            w.write_i32(state.0);
        }
        if let Some(sql_state) = &self.sql_state {
            w.write_field_begin(ttype::STRING, 3);
            w.write_string(sql_state);
        }
        if let Some(error_code) = self.error_code {
            w.write_field_begin(ttype::I32, 4);
            w.write_i32(error_code);
        }
        if let Some(error_message) = &self.error_message {
            w.write_field_begin(ttype::STRING, 5);
            w.write_string(error_message);
        }
        w.write_field_stop();
    }
}

impl ReadThrift for GetOperationStatusResp {
    fn read(r: &mut ProtocolReader<'_>) -> DecodeResult<Self> {
        let mut resp = GetOperationStatusResp::default();
        let mut status = None;
        while let Some((field_type, id)) = r.read_field_begin()? {
            match (id, field_type) {
                (1, ttype::STRUCT) => status = Some(Status::read(r)?),
                (2, ttype::I32) => resp.operation_state = Some(OperationStateCode(r.read_i32()?)),
                (3, ttype::STRING) => resp.sql_state = Some(r.read_string()?),
                (4, ttype::I32) => resp.error_code = Some(r.read_i32()?),
                (5, ttype::STRING) => resp.error_message = Some(r.read_string()?),
                _ => r.skip(field_type)?,
            }
        }
        resp.status = required(status, "TGetOperationStatusResp.status")?;
        Ok(resp)
    }
}

impl WriteThrift for CancelOperationReq {
    fn write(&self, w: &mut ProtocolWriter) {
        write_struct_field(w, 1, &self.operation_handle);
        w.write_field_stop();
    }
}

impl WriteThrift for CancelOperationResp {
    fn write(&self, w: &mut ProtocolWriter) {
        write_status_only(w, &self.status);
    }
}

impl ReadThrift for CancelOperationResp {
    fn read(r: &mut ProtocolReader<'_>) -> DecodeResult<Self> {
        Ok(Self {
            status: read_single_struct_field(r, "TCancelOperationResp.status")?,
        })
    }
}

impl WriteThrift for CloseOperationReq {
    fn write(&self, w: &mut ProtocolWriter) {
        write_struct_field(w, 1, &self.operation_handle);
        w.write_field_stop();
    }
}

impl WriteThrift for CloseOperationResp {
    fn write(&self, w: &mut ProtocolWriter) {
        write_status_only(w, &self.status);
    }
}

impl ReadThrift for CloseOperationResp {
    fn read(r: &mut ProtocolReader<'_>) -> DecodeResult<Self> {
        Ok(Self {
            status: read_single_struct_field(r, "TCloseOperationResp.status")?,
        })
    }
}

// ============================================================================
// Metadata
// ============================================================================

impl WriteThrift for GetResultSetMetadataReq {
    fn write(&self, w: &mut ProtocolWriter) {
        write_struct_field(w, 1, &self.operation_handle);
        w.write_field_stop();
    }
}

impl WriteThrift for GetResultSetMetadataResp {
    fn write(&self, w: &mut ProtocolWriter) {
        write_struct_field(w, 1, &self.status);
        if let Some(schema) = &self.schema {
            write_struct_field(w, 2, schema);
        }
        w.write_field_stop();
    }
}

impl ReadThrift for GetResultSetMetadataResp {
    fn read(r: &mut ProtocolReader<'_>) -> DecodeResult<Self> {
        let mut status = None;
        let mut schema = None;
        while let Some((field_type, id)) = r.read_field_begin()? {
            match (id, field_type) {
                (1, ttype::STRUCT) => status = Some(Status::read(r)?),
                (2, ttype::STRUCT) => schema = Some(TableSchema::read(r)?),
                _ => r.skip(field_type)?,
            }
        }
        Ok(Self {
            status: required(status, "TGetResultSetMetadataResp.status")?,
            schema,
        })
    }
}

impl WriteThrift for TableSchema {
    fn write(&self, w: &mut ProtocolWriter) {
        w.write_field_begin(ttype::LIST, 1);
        w.write_list_begin(ttype::STRUCT, self.columns.len());
        for column in &self.columns {
            column.write(w);
        }
        w.write_field_stop();
    }
}

impl ReadThrift for TableSchema {
    fn read(r: &mut ProtocolReader<'_>) -> DecodeResult<Self> {
        let mut columns = Vec::new();
        while let Some((field_type, id)) = r.read_field_begin()? {
            match (id, field_type) {
                (1, ttype::LIST) => columns = read_list(r, ColumnDesc::read)?,
                _ => r.skip(field_type)?,
            }
        }
        Ok(Self { columns })
    }
}

impl WriteThrift for ColumnDesc {
    fn write(&self, w: &mut ProtocolWriter) {
        w.write_field_begin(ttype::STRING, 1);
        w.write_string(&self.column_name);

        // typeDesc: a single primitive entry
        w.write_field_begin(ttype::STRUCT, 2);
        w.write_field_begin(ttype::LIST, 1);
        let entries = usize::from(self.type_id.is_some());
        w.write_list_begin(ttype::STRUCT, entries);
        if let Some(type_id) = self.type_id {
            w.write_field_begin(ttype::STRUCT, 1);
            w.write_field_begin(ttype::I32, 1);
            w.write_i32(type_id.0);
            w.write_field_stop();
            w.write_field_stop();
        }
        w.write_field_stop();

        w.write_field_begin(ttype::I32, 3);
        w.write_i32(self.position);
        if let Some(comment) = &self.comment {
            w.write_field_begin(ttype::STRING, 4);
            w.write_string(comment);
        }
        w.write_field_stop();
    }
}

impl ReadThrift for ColumnDesc {
    fn read(r: &mut ProtocolReader<'_>) -> DecodeResult<Self> {
        let mut column_name = None;
        let mut type_id = None;
        let mut position = None;
        let mut comment = None;
        while let Some((field_type, id)) = r.read_field_begin()? {
            match (id, field_type) {
                (1, ttype::STRING) => column_name = Some(r.read_string()?),
                (2, ttype::STRUCT) => type_id = read_type_desc(r)?,
                (3, ttype::I32) => position = Some(r.read_i32()?),
                (4, ttype::STRING) => comment = Some(r.read_string()?),
                _ => r.skip(field_type)?,
            }
        }
        Ok(Self {
            column_name: required(column_name, "TColumnDesc.columnName")?,
            type_id,
            position: position.unwrap_or(0),
            comment,
        })
    }
}

/// Read a `TTypeDesc`, returning the kind of its first (outermost) entry.
fn read_type_desc(r: &mut ProtocolReader<'_>) -> DecodeResult<Option<TypeId>> {
    let mut entries = Vec::new();
    while let Some((field_type, id)) = r.read_field_begin()? {
        match (id, field_type) {
            (1, ttype::LIST) => entries = read_list(r, read_type_entry)?,
            _ => r.skip(field_type)?,
        }
    }
    Ok(entries.into_iter().next().flatten())
}

/// Read a `TTypeEntry` union.
fn read_type_entry(r: &mut ProtocolReader<'_>) -> DecodeResult<Option<TypeId>> {
    let mut kind = None;
    while let Some((field_type, id)) = r.read_field_begin()? {
        match (id, field_type) {
            (1, ttype::STRUCT) => kind = read_primitive_entry(r)?,
            (2, ttype::STRUCT) => {
                r.skip(field_type)?;
                kind = Some(TypeId::ARRAY_TYPE);
            }
            (3, ttype::STRUCT) => {
                r.skip(field_type)?;
                kind = Some(TypeId::MAP_TYPE);
            }
            (4, ttype::STRUCT) => {
                r.skip(field_type)?;
                kind = Some(TypeId::STRUCT_TYPE);
            }
            (5, ttype::STRUCT) => {
                r.skip(field_type)?;
                kind = Some(TypeId::UNION_TYPE);
            }
            (6, ttype::STRUCT) => {
                r.skip(field_type)?;
                kind = Some(TypeId::USER_DEFINED_TYPE);
            }
            _ => r.skip(field_type)?,
        }
    }
    Ok(kind)
}

fn read_primitive_entry(r: &mut ProtocolReader<'_>) -> DecodeResult<Option<TypeId>> {
    let mut type_id = None;
    while let Some((field_type, id)) = r.read_field_begin()? {
        match (id, field_type) {
            (1, ttype::I32) => type_id = Some(TypeId(r.read_i32()?)),
            _ => r.skip(field_type)?,
        }
    }
    Ok(type_id)
}

// ============================================================================
// Fetching
// ============================================================================

impl WriteThrift for FetchResultsReq {
    fn write(&self, w: &mut ProtocolWriter) {
        write_struct_field(w, 1, &self.operation_handle);
        w.write_field_begin(ttype::I32, 2);
        w.write_i32(self.orientation.0);
        w.write_field_begin(ttype::I64, 3);
        w.write_i64(self.max_rows);
        w.write_field_stop();
    }
}

impl ReadThrift for FetchResultsReq {
    fn read(r: &mut ProtocolReader<'_>) -> DecodeResult<Self> {
        let mut operation_handle = None;
        let mut orientation = FetchOrientation::FETCH_NEXT;
        let mut max_rows = None;
        while let Some((field_type, id)) = r.read_field_begin()? {
            match (id, field_type) {
                (1, ttype::STRUCT) => operation_handle = Some(OperationHandle::read(r)?),
                (2, ttype::I32) => orientation = FetchOrientation(r.read_i32()?),
                (3, ttype::I64) => max_rows = Some(r.read_i64()?),
                _ => r.skip(field_type)?,
            }
        }
        Ok(Self {
            operation_handle: required(operation_handle, "TFetchResultsReq.operationHandle")?,
            orientation,
            max_rows: required(max_rows, "TFetchResultsReq.maxRows")?,
        })
    }
}

impl WriteThrift for FetchResultsResp {
    fn write(&self, w: &mut ProtocolWriter) {
        write_struct_field(w, 1, &self.status);
        if let Some(has_more_rows) = self.has_more_rows {
            w.write_field_begin(ttype::BOOL, 2);
            w.write_bool(has_more_rows);
        }
        if let Some(results) = &self.results {
            write_struct_field(w, 3, results);
        }
        w.write_field_stop();
    }
}

impl ReadThrift for FetchResultsResp {
    fn read(r: &mut ProtocolReader<'_>) -> DecodeResult<Self> {
        let mut status = None;
        let mut has_more_rows = None;
        let mut results = None;
        while let Some((field_type, id)) = r.read_field_begin()? {
            match (id, field_type) {
                (1, ttype::STRUCT) => status = Some(Status::read(r)?),
                (2, ttype::BOOL) => has_more_rows = Some(r.read_bool()?),
                (3, ttype::STRUCT) => results = Some(RowSet::read(r)?),
                _ => r.skip(field_type)?,
            }
        }
        Ok(Self {
            status: required(status, "TFetchResultsResp.status")?,
            has_more_rows,
            results,
        })
    }
}

impl WriteThrift for RowSet {
    fn write(&self, w: &mut ProtocolWriter) {
        w.write_field_begin(ttype::I64, 1);
        w.write_i64(self.start_row_offset);
        w.write_field_begin(ttype::LIST, 2);
        w.write_list_begin(ttype::STRUCT, self.rows.len());
        for row in &self.rows {
            // TRow
            w.write_field_begin(ttype::LIST, 1);
            w.write_list_begin(ttype::STRUCT, row.len());
            for value in row {
                value.write(w);
            }
            w.write_field_stop();
        }
        if let Some(columns) = &self.columns {
            w.write_field_begin(ttype::LIST, 3);
            w.write_list_begin(ttype::STRUCT, columns.len());
            for column in columns {
                column.write(w);
            }
        }
        w.write_field_stop();
    }
}

impl ReadThrift for RowSet {
    fn read(r: &mut ProtocolReader<'_>) -> DecodeResult<Self> {
        let mut row_set = RowSet::default();
        while let Some((field_type, id)) = r.read_field_begin()? {
            match (id, field_type) {
                (1, ttype::I64) => row_set.start_row_offset = r.read_i64()?,
                (2, ttype::LIST) => row_set.rows = read_list(r, read_row)?,
                (3, ttype::LIST) => row_set.columns = Some(read_list(r, ColumnData::read)?),
                _ => r.skip(field_type)?,
            }
        }
        Ok(row_set)
    }
}

/// Read a `TRow`.
fn read_row(r: &mut ProtocolReader<'_>) -> DecodeResult<Vec<ColumnValue>> {
    let mut values = Vec::new();
    while let Some((field_type, id)) = r.read_field_begin()? {
        match (id, field_type) {
            (1, ttype::LIST) => values = read_list(r, ColumnValue::read)?,
            _ => r.skip(field_type)?,
        }
    }
    Ok(values)
}

impl WriteThrift for ColumnValue {
    fn write(&self, w: &mut ProtocolWriter) {
        match self {
            ColumnValue::Bool(v) => write_scalar(w, 1, ttype::BOOL, v.as_ref(), |w, v| w.write_bool(*v)),
            ColumnValue::Byte(v) => write_scalar(w, 2, ttype::BYTE, v.as_ref(), |w, v| w.write_byte(*v)),
            ColumnValue::I16(v) => write_scalar(w, 3, ttype::I16, v.as_ref(), |w, v| w.write_i16(*v)),
            ColumnValue::I32(v) => write_scalar(w, 4, ttype::I32, v.as_ref(), |w, v| w.write_i32(*v)),
            ColumnValue::I64(v) => write_scalar(w, 5, ttype::I64, v.as_ref(), |w, v| w.write_i64(*v)),
            ColumnValue::Double(v) => {
                write_scalar(w, 6, ttype::DOUBLE, v.as_ref(), |w, v| w.write_double(*v))
            }
            ColumnValue::String(v) => {
                write_scalar(w, 7, ttype::STRING, v.as_deref(), |w, v| w.write_string(v))
            }
            ColumnValue::Empty => {}
        }
        w.write_field_stop();
    }
}

/// Write one member of the `TColumnValue` union: a wrapper struct with an optional `value`.
fn write_scalar<T: ?Sized>(
    w: &mut ProtocolWriter,
    member: i16,
    value_type: u8,
    value: Option<&T>,
    write_value: impl FnOnce(&mut ProtocolWriter, &T),
) {
    w.write_field_begin(ttype::STRUCT, member);
    if let Some(value) = value {
        w.write_field_begin(value_type, 1);
        write_value(w, value);
    }
    w.write_field_stop();
}

impl ReadThrift for ColumnValue {
    fn read(r: &mut ProtocolReader<'_>) -> DecodeResult<Self> {
        let mut value = ColumnValue::Empty;
        while let Some((field_type, id)) = r.read_field_begin()? {
            value = match (id, field_type) {
                (1, ttype::STRUCT) => ColumnValue::Bool(read_scalar(r, ttype::BOOL, |r| r.read_bool())?),
                (2, ttype::STRUCT) => ColumnValue::Byte(read_scalar(r, ttype::BYTE, |r| r.read_byte())?),
                (3, ttype::STRUCT) => ColumnValue::I16(read_scalar(r, ttype::I16, |r| r.read_i16())?),
                (4, ttype::STRUCT) => ColumnValue::I32(read_scalar(r, ttype::I32, |r| r.read_i32())?),
                (5, ttype::STRUCT) => ColumnValue::I64(read_scalar(r, ttype::I64, |r| r.read_i64())?),
                (6, ttype::STRUCT) => {
                    ColumnValue::Double(read_scalar(r, ttype::DOUBLE, |r| r.read_double())?)
                }
                (7, ttype::STRUCT) => {
                    let cell = read_scalar(r, ttype::STRING, |r| r.read_string_lossy())?;
                    ColumnValue::String(cell)
                }
                _ => {
                    r.skip(field_type)?;
                    value
                }
            };
        }
        Ok(value)
    }
}

fn read_scalar<'a, T>(
    r: &mut ProtocolReader<'a>,
    value_type: u8,
    read_value: impl Fn(&mut ProtocolReader<'a>) -> DecodeResult<T>,
) -> DecodeResult<Option<T>> {
    let mut value = None;
    while let Some((field_type, id)) = r.read_field_begin()? {
        if id == 1 && field_type == value_type {
            value = Some(read_value(r)?);
        } else {
            r.skip(field_type)?;
        }
    }
    Ok(value)
}

impl WriteThrift for ColumnData {
    fn write(&self, w: &mut ProtocolWriter) {
        match self {
            ColumnData::Bool { values, nulls } => {
                write_column(w, 1, ttype::BOOL, values, nulls, |w, v| w.write_bool(*v))
            }
            ColumnData::Byte { values, nulls } => {
                write_column(w, 2, ttype::BYTE, values, nulls, |w, v| w.write_byte(*v))
            }
            ColumnData::I16 { values, nulls } => {
                write_column(w, 3, ttype::I16, values, nulls, |w, v| w.write_i16(*v))
            }
            ColumnData::I32 { values, nulls } => {
                write_column(w, 4, ttype::I32, values, nulls, |w, v| w.write_i32(*v))
            }
            ColumnData::I64 { values, nulls } => {
                write_column(w, 5, ttype::I64, values, nulls, |w, v| w.write_i64(*v))
            }
            ColumnData::Double { values, nulls } => {
                write_column(w, 6, ttype::DOUBLE, values, nulls, |w, v| w.write_double(*v))
            }
            ColumnData::String { values, nulls } => {
                write_column(w, 7, ttype::STRING, values, nulls, |w, v| w.write_string(v))
            }
            ColumnData::Binary { values, nulls } => {
                write_column(w, 8, ttype::STRING, values, nulls, |w, v| w.write_binary(v))
            }
        }
        w.write_field_stop();
    }
}

/// Write one member of the `TColumn` union: `{1: list<T> values, 2: binary nulls}`.
fn write_column<T>(
    w: &mut ProtocolWriter,
    member: i16,
    element_type: u8,
    values: &[T],
    nulls: &[u8],
    write_value: impl Fn(&mut ProtocolWriter, &T),
) {
    w.write_field_begin(ttype::STRUCT, member);
    w.write_field_begin(ttype::LIST, 1);
    w.write_list_begin(element_type, values.len());
    for value in values {
        write_value(w, value);
    }
    w.write_field_begin(ttype::STRING, 2);
    w.write_binary(nulls);
    w.write_field_stop();
}

impl ReadThrift for ColumnData {
    fn read(r: &mut ProtocolReader<'_>) -> DecodeResult<Self> {
        let mut column = None;
        while let Some((field_type, id)) = r.read_field_begin()? {
            let decoded = match (id, field_type) {
                (1, ttype::STRUCT) => {
                    let (values, nulls) = read_column(r, |r| r.read_bool())?;
                    ColumnData::Bool { values, nulls }
                }
                (2, ttype::STRUCT) => {
                    let (values, nulls) = read_column(r, |r| r.read_byte())?;
                    ColumnData::Byte { values, nulls }
                }
                (3, ttype::STRUCT) => {
                    let (values, nulls) = read_column(r, |r| r.read_i16())?;
                    ColumnData::I16 { values, nulls }
                }
                (4, ttype::STRUCT) => {
                    let (values, nulls) = read_column(r, |r| r.read_i32())?;
                    ColumnData::I32 { values, nulls }
                }
                (5, ttype::STRUCT) => {
                    let (values, nulls) = read_column(r, |r| r.read_i64())?;
                    ColumnData::I64 { values, nulls }
                }
                (6, ttype::STRUCT) => {
                    let (values, nulls) = read_column(r, |r| r.read_double())?;
                    ColumnData::Double { values, nulls }
                }
                (7, ttype::STRUCT) => {
                    let (values, nulls) = read_column(r, |r| r.read_string_lossy())?;
                    ColumnData::String { values, nulls }
                }
                (8, ttype::STRUCT) => {
                    let (values, nulls) = read_column(r, |r| r.read_binary())?;
                    ColumnData::Binary { values, nulls }
                }
                _ => {
                    r.skip(field_type)?;
                    continue;
                }
            };
            column = Some(decoded);
        }
        required(column, "TColumn")
    }
}

fn read_column<'a, T>(
    r: &mut ProtocolReader<'a>,
    read_value: impl Fn(&mut ProtocolReader<'a>) -> DecodeResult<T>,
) -> DecodeResult<(Vec<T>, Vec<u8>)> {
    let mut values = Vec::new();
    let mut nulls = Vec::new();
    while let Some((field_type, id)) = r.read_field_begin()? {
        match (id, field_type) {
            (1, ttype::LIST) => values = read_list(r, &read_value)?,
            (2, ttype::STRING) => nulls = r.read_binary()?,
            _ => r.skip(field_type)?,
        }
    }
    Ok((values, nulls))
}

// ============================================================================
// Message framing
// ============================================================================

/// Encode a call: message header, then `<method>_args` with the request at field 1.
pub fn encode_call<T: WriteThrift>(method: &str, seq_id: i32, request: &T) -> Vec<u8> {
    let mut w = ProtocolWriter::new();
    w.write_message_begin(method, MessageType::Call, seq_id);
    write_struct_field(&mut w, 1, request);
    w.write_field_stop();
    w.into_bytes()
}

/// Encode a reply: message header, then `<method>_result` with the response at field 0.
pub fn encode_reply<T: WriteThrift>(method: &str, seq_id: i32, response: &T) -> Vec<u8> {
    let mut w = ProtocolWriter::new();
    w.write_message_begin(method, MessageType::Reply, seq_id);
    write_struct_field(&mut w, 0, response);
    w.write_field_stop();
    w.into_bytes()
}

/// Encode an application exception reply.
pub fn encode_exception(method: &str, seq_id: i32, kind: i32, message: &str) -> Vec<u8> {
    let mut w = ProtocolWriter::new();
    w.write_message_begin(method, MessageType::Exception, seq_id);
    w.write_field_begin(ttype::STRING, 1);
    w.write_string(message);
    w.write_field_begin(ttype::I32, 2);
    w.write_i32(kind);
    w.write_field_stop();
    w.into_bytes()
}

/// Outcome of decoding a buffered reply.
#[derive(Debug)]
pub enum ReplyError {
    /// More bytes are needed
    Incomplete,
    /// The reply is complete but unusable
    Failed(TransportError),
}

impl From<DecodeError> for ReplyError {
    fn from(err: DecodeError) -> Self {
        match err {
            DecodeError::UnexpectedEof => ReplyError::Incomplete,
            other => ReplyError::Failed(other.into()),
        }
    }
}

/// Decode a reply for `method` with sequence id `seq_id`.
///
/// Returns the response together with the number of bytes consumed.
pub fn decode_reply<T: ReadThrift>(
    bytes: &[u8],
    method: &str,
    seq_id: i32,
) -> Result<(T, usize), ReplyError> {
    let mut r = ProtocolReader::new(bytes);
    let header = r.read_message_begin()?;

    if header.message_type == MessageType::Exception {
        let (kind, message) = read_application_exception(&mut r)?;
        return Err(ReplyError::Failed(TransportError::ApplicationException {
            kind,
            message,
        }));
    }
    if header.message_type != MessageType::Reply {
        return Err(ReplyError::Failed(TransportError::ProtocolError(format!(
            "expected reply, received {:?}",
            header.message_type
        ))));
    }
    if header.name != method {
        return Err(ReplyError::Failed(TransportError::ProtocolError(format!(
            "wrong method name: expected {}, received {}",
            method, header.name
        ))));
    }
    if header.seq_id != seq_id {
        return Err(ReplyError::Failed(TransportError::ProtocolError(format!(
            "out of sequence response: expected {}, received {}",
            seq_id, header.seq_id
        ))));
    }

    let mut success = None;
    while let Some((field_type, id)) = r.read_field_begin()? {
        match (id, field_type) {
            (0, ttype::STRUCT) => success = Some(T::read(&mut r)?),
            _ => r.skip(field_type)?,
        }
    }
    let response = success.ok_or_else(|| {
        ReplyError::Failed(TransportError::ProtocolError(format!(
            "{} failed: unknown result",
            method
        )))
    })?;
    Ok((response, r.position()))
}

fn read_application_exception(r: &mut ProtocolReader<'_>) -> DecodeResult<(i32, String)> {
    let mut message = String::new();
    let mut kind = 0;
    while let Some((field_type, id)) = r.read_field_begin()? {
        match (id, field_type) {
            (1, ttype::STRING) => message = r.read_string()?,
            (2, ttype::I32) => kind = r.read_i32()?,
            _ => r.skip(field_type)?,
        }
    }
    Ok((kind, message))
}

/// Decode the header of a call and return it with the raw `<method>_args` bytes skipped.
///
/// Used by in-process servers in tests to answer calls.
pub fn decode_call_header(bytes: &[u8]) -> DecodeResult<(MessageHeader, usize)> {
    let mut r = ProtocolReader::new(bytes);
    let header = r.read_message_begin()?;
    r.skip(ttype::STRUCT)?;
    Ok((header, r.position()))
}

/// Decode a call's request from `<method>_args`.
pub fn decode_call<T: ReadThrift>(bytes: &[u8]) -> DecodeResult<(MessageHeader, T)> {
    let mut r = ProtocolReader::new(bytes);
    let header = r.read_message_begin()?;
    let request = read_single_struct_field(&mut r, "args.req")?;
    Ok((header, request))
}
