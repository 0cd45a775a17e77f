//! Message envelope
//!
//! An encoded message is a payload plus a content type naming its writer
//! schema. Two reference styles are supported:
//!
//! - `application/{prefix}.{subject}.v{version}+{format}`, payload is the bare datum
//! - `application/{prefix}.schemaid+{format}`, payload is
//!   `[magic_byte(1)][schema_id(4)][datum(N)]`

use crate::error::{ClientError, Result};
use bytes::{Buf, BufMut, Bytes, BytesMut};
use std::fmt;

/// Default content-type vendor prefix
pub const DEFAULT_PREFIX: &str = "vnd";

/// Magic byte indicating schema ID is present
const MAGIC_BYTE: u8 = 0x00;

const ID_MARKER: &str = "schemaid";

/// How a message locates its writer schema
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SchemaReference {
    Version {
        subject: String,
        format: String,
        version: i32,
    },
    Id {
        format: String,
        id: i32,
    },
}

impl SchemaReference {
    pub fn format(&self) -> &str {
        match self {
            SchemaReference::Version { format, .. } | SchemaReference::Id { format, .. } => format,
        }
    }

    pub fn content_type(&self, prefix: &str) -> String {
        match self {
            SchemaReference::Version {
                subject,
                format,
                version,
            } => format!("application/{}.{}.v{}+{}", prefix, subject, version, format),
            SchemaReference::Id { format, .. } => {
                format!("application/{}.{}+{}", prefix, ID_MARKER, format)
            }
        }
    }
}

impl fmt::Display for SchemaReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchemaReference::Version {
                subject,
                format,
                version,
            } => write!(f, "{}/{}/v{}", subject, format, version),
            SchemaReference::Id { format, id } => write!(f, "{}#{}", format, id),
        }
    }
}

/// An encoded payload and its content type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub content_type: String,
    pub payload: Bytes,
}

impl Message {
    /// Envelope for `datum` written with the schema `reference` points at
    pub fn wrap(reference: &SchemaReference, prefix: &str, datum: &[u8]) -> Self {
        let payload = match reference {
            SchemaReference::Id { id, .. } => frame_with_schema_id(*id, datum),
            SchemaReference::Version { .. } => Bytes::copy_from_slice(datum),
        };
        Self {
            content_type: reference.content_type(prefix),
            payload,
        }
    }

    /// Writer schema reference and the bare datum
    pub fn unwrap(&self, prefix: &str) -> Result<(SchemaReference, Bytes)> {
        match parse_content_type(&self.content_type, prefix)? {
            ContentType::Versioned(reference) => Ok((reference, self.payload.clone())),
            ContentType::IdFramed { format } => {
                let (id, datum) = read_schema_id(&self.payload)?;
                Ok((SchemaReference::Id { format, id }, datum))
            }
        }
    }
}

enum ContentType {
    Versioned(SchemaReference),
    IdFramed { format: String },
}

fn parse_content_type(content_type: &str, prefix: &str) -> Result<ContentType> {
    let invalid = || {
        ClientError::InvalidEnvelope(format!(
            "content type '{}' does not name a schema",
            content_type
        ))
    };

    // Parameters such as "; charset=..." are not part of the reference
    let essence = content_type.split(';').next().unwrap_or(content_type).trim();

    let rest = essence
        .strip_prefix("application/")
        .and_then(|r| r.strip_prefix(prefix))
        .and_then(|r| r.strip_prefix('.'))
        .ok_or_else(invalid)?;
    let (name, format) = rest.rsplit_once('+').ok_or_else(invalid)?;
    if format.is_empty() {
        return Err(invalid());
    }

    if name == ID_MARKER {
        return Ok(ContentType::IdFramed {
            format: format.to_string(),
        });
    }

    let (subject, version) = name.rsplit_once(".v").ok_or_else(invalid)?;
    let version: i32 = version.parse().map_err(|_| invalid())?;
    if subject.is_empty() || version < 1 {
        return Err(invalid());
    }

    Ok(ContentType::Versioned(SchemaReference::Version {
        subject: subject.to_string(),
        format: format.to_string(),
        version,
    }))
}

/// Prefix `datum` with the magic byte and big-endian schema id
pub fn frame_with_schema_id(schema_id: i32, datum: &[u8]) -> Bytes {
    let mut buf = BytesMut::with_capacity(1 + 4 + datum.len());
    buf.put_u8(MAGIC_BYTE);
    buf.put_i32(schema_id);
    buf.put_slice(datum);
    buf.freeze()
}

/// Split an id-framed payload into (schema id, datum)
pub fn read_schema_id(payload: &Bytes) -> Result<(i32, Bytes)> {
    if payload.len() < 5 {
        return Err(ClientError::InvalidEnvelope(
            "Data too short to contain schema ID".to_string(),
        ));
    }

    if payload[0] != MAGIC_BYTE {
        return Err(ClientError::InvalidEnvelope(format!(
            "Invalid magic byte: expected 0x00, got 0x{:02x}",
            payload[0]
        )));
    }

    let mut id_bytes = &payload[1..5];
    let schema_id = id_bytes.get_i32();

    Ok((schema_id, payload.slice(5..)))
}
