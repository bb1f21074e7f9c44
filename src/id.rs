//! Compact identifiers for decks, configuration groups and cards.
//!
//! An [`Id`] is a random `u64` rendered as 11 base64 characters. The last
//! character only carries 4 bits, so its low 2 bits are always zero.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

const ALPHABET: &[u8; 64] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";
const ENCODED_LEN: usize = 11;

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Id(u64);

pub type DeckId = Id;
pub type GroupId = Id;
pub type ItemId = Id;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("`{0}` is not an 11 character id")]
pub struct ParseIdError(String);

impl Id {
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn random() -> Self {
        Self(rand::random())
    }

    pub const fn get(self) -> u64 {
        self.0
    }

    fn encode(self) -> [u8; ENCODED_LEN] {
        let mut data = self.0;
        let mut res = [0u8; ENCODED_LEN];
        for c in &mut res {
            *c = ALPHABET[(data >> 58) as usize];
            data <<= 6;
        }
        res
    }

    fn decode(text: &[u8]) -> Option<Self> {
        if text.len() != ENCODED_LEN {
            return None;
        }
        let mut res = 0u64;
        for (idx, c) in text.iter().enumerate() {
            let position = ALPHABET.iter().position(|e| e == c)? as u64;
            if idx == ENCODED_LEN - 1 {
                if position & 0b11 != 0 {
                    return None;
                }
                res = (res << 4) | (position >> 2);
            } else {
                res = (res << 6) | position;
            }
        }
        Some(Self(res))
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let encoded = self.encode();
        // The alphabet is pure ASCII.
        f.write_str(std::str::from_utf8(&encoded).map_err(|_| fmt::Error)?)
    }
}

impl FromStr for Id {
    type Err = ParseIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::decode(s.trim().as_bytes()).ok_or_else(|| ParseIdError(s.to_owned()))
    }
}

impl TryFrom<String> for Id {
    type Error = ParseIdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Id> for String {
    fn from(id: Id) -> Self {
        id.to_string()
    }
}
