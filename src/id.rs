//! Store-assigned product identifiers.
//!
//! An [`ObjectId`] is 12 bytes rendered as 24 lowercase hex characters:
//!
//! ```text
//! | unix seconds (4, BE) | process random (5) | counter (3, BE) |
//! ```
//!
//! Within one process ids are strictly increasing: the counter restarts at
//! zero each second and, if it would overflow, borrows the next second. Ids
//! from different processes interleave by second, then by process bytes, so
//! across processes the order is only approximately creation order.

use std::fmt;
use std::str::FromStr;
use std::sync::{Mutex, OnceLock, PoisonError};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use uuid::Uuid;

const LEN: usize = 12;

/// Opaque, immutable product identifier.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct ObjectId([u8; LEN]);

/// Returned when a string is not 24 hex characters.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("`{0}` is not a 24-character hex object id")]
pub struct InvalidObjectId(pub String);

const COUNTER_MAX: u32 = 0x00ff_ffff;

struct Seed {
    process: [u8; 5],
    clock: Mutex<Clock>,
}

/// Last issued `(seconds, counter)` pair.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
struct Clock {
    secs: u32,
    count: u32,
}

impl Clock {
    /// Advances to the next pair strictly after the current one. A clock
    /// that steps backwards keeps the last second.
    fn tick(&mut self, now: u32) -> Self {
        if now > self.secs {
            *self = Self { secs: now, count: 0 };
        } else if self.count == COUNTER_MAX {
            *self = Self { secs: self.secs.wrapping_add(1), count: 0 };
        } else {
            self.count += 1;
        }
        *self
    }
}

fn seed() -> &'static Seed {
    static SEED: OnceLock<Seed> = OnceLock::new();
    SEED.get_or_init(|| {
        let random = Uuid::new_v4();
        let b = random.as_bytes();
        Seed {
            process: [b[0], b[1], b[2], b[3], b[4]],
            clock: Mutex::new(Clock::default()),
        }
    })
}

impl ObjectId {
    /// Generates a fresh id, greater than every id this process issued
    /// before it and very likely unique across processes.
    pub fn new() -> Self {
        let seed = seed();
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs() as u32)
            .unwrap_or_default();
        let Clock { secs, count } = seed
            .clock
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .tick(now);

        let mut bytes = [0u8; LEN];
        bytes[..4].copy_from_slice(&secs.to_be_bytes());
        bytes[4..9].copy_from_slice(&seed.process);
        bytes[9..].copy_from_slice(&count.to_be_bytes()[1..]);
        Self(bytes)
    }

    pub const fn from_bytes(bytes: [u8; LEN]) -> Self {
        Self(bytes)
    }

    pub const fn bytes(&self) -> [u8; LEN] {
        self.0
    }
}

impl Default for ObjectId {
    fn default() -> Self { Self::new() }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for b in self.0 {
            write!(f, "{b:02x}")?;
        }
        Ok(())
    }
}

/// Accepts exactly 24 hex digits, either case.
impl FromStr for ObjectId {
    type Err = InvalidObjectId;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || InvalidObjectId(s.to_owned());
        if s.len() != LEN * 2 || !s.bytes().all(|c| c.is_ascii_hexdigit()) {
            return Err(invalid());
        }

        let mut bytes = [0u8; LEN];
        for (i, out) in bytes.iter_mut().enumerate() {
            *out = u8::from_str_radix(&s[i * 2..i * 2 + 2], 16).map_err(|_| invalid())?;
        }
        Ok(Self(bytes))
    }
}

impl Serialize for ObjectId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ObjectId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
