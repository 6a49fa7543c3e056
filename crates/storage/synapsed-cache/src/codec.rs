//! Delta-log codec
//!
//! A set log is a sequence of records, each `<sign><base64(member)><space>`,
//! where the sign is `+` for insert and `-` for remove and the base64 is the
//! standard padded alphabet. Fragments encoded independently can be
//! concatenated and still parse as the concatenation of their records, which
//! is what makes a raw store append safe.
//!
//! Tokens that do not decode are skipped: they are logged, counted in
//! [`ParsedLog::malformed`], and contribute no operation to the replay.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use bytes::Bytes;
use std::collections::{HashMap, HashSet};
use tracing::warn;

const INSERT: u8 = b'+';
const REMOVE: u8 = b'-';
const SEPARATOR: u8 = b' ';

/// Direction of a delta record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Sign {
    /// Member becomes present
    Insert,
    /// Member becomes absent
    Remove,
}

impl Sign {
    /// Marker byte written in front of the payload
    pub fn marker(self) -> u8 {
        match self {
            Sign::Insert => INSERT,
            Sign::Remove => REMOVE,
        }
    }

    /// Sign for a marker byte, if it is one
    pub fn from_marker(marker: u8) -> Option<Self> {
        match marker {
            INSERT => Some(Sign::Insert),
            REMOVE => Some(Sign::Remove),
            _ => None,
        }
    }
}

/// One signed member operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeltaRecord {
    /// Insert or remove
    pub sign: Sign,
    /// Opaque member bytes
    pub member: Bytes,
}

impl DeltaRecord {
    /// Insert record for `member`
    pub fn insert(member: impl Into<Bytes>) -> Self {
        Self {
            sign: Sign::Insert,
            member: member.into(),
        }
    }

    /// Remove record for `member`
    pub fn remove(member: impl Into<Bytes>) -> Self {
        Self {
            sign: Sign::Remove,
            member: member.into(),
        }
    }
}

/// Records recovered from a raw log, in log order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedLog {
    /// Decoded records
    pub records: Vec<DeltaRecord>,
    /// Tokens dropped because they could not be decoded
    pub malformed: usize,
}

/// Membership reconstructed from a log
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Replay {
    /// Members whose last record is an insert
    pub members: HashSet<Bytes>,
    /// Number of records replayed, including overridden ones
    pub total_ops: usize,
}

impl Replay {
    /// Share of replayed records that still describe a live member
    pub fn density(&self) -> Option<f64> {
        density(self.members.len(), self.total_ops)
    }
}

/// Encode `members` as one fragment of `sign` records, in the given order
pub fn encode_batch<M: AsRef<[u8]>>(members: &[M], sign: Sign) -> String {
    let mut fragment = String::new();
    for member in members {
        fragment.push(char::from(sign.marker()));
        STANDARD.encode_string(member.as_ref(), &mut fragment);
        fragment.push(char::from(SEPARATOR));
    }
    fragment
}

/// Split a raw log into records, skipping empty and malformed tokens
pub fn parse_log(raw: &[u8]) -> ParsedLog {
    let mut parsed = ParsedLog::default();
    for token in raw.split(|b| *b == SEPARATOR).filter(|t| !t.is_empty()) {
        match decode_token(token) {
            Some(record) => parsed.records.push(record),
            None => {
                warn!(
                    token = %String::from_utf8_lossy(token),
                    "Skipping malformed delta record"
                );
                parsed.malformed += 1;
            }
        }
    }
    parsed
}

fn decode_token(token: &[u8]) -> Option<DeltaRecord> {
    let (&marker, payload) = token.split_first()?;
    let sign = Sign::from_marker(marker)?;
    let member = STANDARD.decode(payload).ok()?;
    Some(DeltaRecord {
        sign,
        member: Bytes::from(member),
    })
}

/// Replay records in order; the last record mentioning a member decides its presence
pub fn replay(records: &[DeltaRecord]) -> Replay {
    let mut presence: HashMap<&Bytes, bool> = HashMap::new();
    for record in records {
        presence.insert(&record.member, record.sign == Sign::Insert);
    }
    Replay {
        members: presence
            .into_iter()
            .filter(|(_, present)| *present)
            .map(|(member, _)| member.clone())
            .collect(),
        total_ops: records.len(),
    }
}

/// `live / total`, or `None` for an empty log
#[allow(clippy::cast_precision_loss)] // exact for counts below 2^53
pub fn density(live: usize, total: usize) -> Option<f64> {
    (total > 0).then(|| live as f64 / total as f64)
}

/// Minimal log for `members`: one insert per member, in byte order
pub fn encode_compacted(members: &HashSet<Bytes>) -> String {
    let mut sorted: Vec<&Bytes> = members.iter().collect();
    sorted.sort();
    encode_batch(&sorted, Sign::Insert)
}
