//! 12-byte document identifiers rendered as 24 lowercase hex characters.
//!
//! Layout follows the usual document-store scheme: a big-endian seconds
//! timestamp, five random bytes chosen once per process, and a rolling
//! three byte counter. Ids generated by one process therefore sort roughly by
//! creation time, but nothing in the crate relies on that.

use std::{
    fmt,
    str::FromStr,
    sync::{
        OnceLock,
        atomic::{AtomicU32, Ordering},
    },
};

use chrono::Utc;
use rand_core::{OsRng, RngCore};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

use crate::error::SocialError;

const ID_BYTES: usize = 12;
const ID_HEX_LEN: usize = ID_BYTES * 2;

static PROCESS_UNIQUE: OnceLock<[u8; 5]> = OnceLock::new();
static COUNTER: AtomicU32 = AtomicU32::new(0);

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("expected 24 hex characters, got {0:?}")]
pub struct ParseObjectIdError(String);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId([u8; ID_BYTES]);

impl ObjectId {
    pub fn new() -> Self {
        let mut bytes = [0u8; ID_BYTES];
        let seconds = Utc::now().timestamp() as u32;
        bytes[..4].copy_from_slice(&seconds.to_be_bytes());
        bytes[4..9].copy_from_slice(process_unique());
        let count = COUNTER.fetch_add(1, Ordering::Relaxed);
        bytes[9..].copy_from_slice(&count.to_be_bytes()[1..]);
        Self(bytes)
    }

    /// Parses a caller-supplied id, reporting failures as
    /// `InvalidArgument("Invalid <label> ID")`.
    pub fn parse_labeled(value: &str, label: &str) -> Result<Self, SocialError> {
        value
            .parse()
            .map_err(|_| SocialError::invalid(format!("Invalid {label} ID")))
    }
}

impl Default for ObjectId {
    fn default() -> Self {
        Self::new()
    }
}

fn process_unique() -> &'static [u8; 5] {
    PROCESS_UNIQUE.get_or_init(|| {
        let mut bytes = [0u8; 5];
        OsRng.fill_bytes(&mut bytes);
        bytes
    })
}

impl FromStr for ObjectId {
    type Err = ParseObjectIdError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        if value.len() != ID_HEX_LEN || !value.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(ParseObjectIdError(value.to_owned()));
        }
        let mut bytes = [0u8; ID_BYTES];
        for (index, byte) in bytes.iter_mut().enumerate() {
            let pair = &value[index * 2..index * 2 + 2];
            *byte = u8::from_str_radix(pair, 16)
                .map_err(|_| ParseObjectIdError(value.to_owned()))?;
        }
        Ok(Self(bytes))
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

impl Serialize for ObjectId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ObjectId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

impl ToSql for ObjectId {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.to_string()))
    }
}

impl FromSql for ObjectId {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|err| FromSqlError::Other(Box::new(err)))
    }
}
