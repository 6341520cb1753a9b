use std::{
    fmt::{Display, Formatter},
    result,
    str::FromStr,
};

use anyhow::{anyhow, Error, Result};
use data_encoding::HEXLOWER;
use ring::digest::{Context, SHA256};
use serde::{Deserialize, Serialize};

/// Length of a SHA-256 digest in bytes.
pub const DIGEST_LENGTH: usize = 32;

/// Content address of a block: lower-case hex SHA-256 of its bytes.
#[derive(Serialize, Deserialize, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
#[serde(try_from = "String", into = "String")]
pub struct Digest(String);

impl Digest {
    pub fn of(data: &[u8]) -> Self {
        let mut context = Context::new(&SHA256);
        context.update(data);
        let digest = context.finish();
        Self(HEXLOWER.encode(digest.as_ref()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Abbreviated form for log lines.
    pub fn short(&self) -> &str {
        &self.0[..12]
    }
}

impl FromStr for Digest {
    type Err = Error;

    fn from_str(string: &str) -> Result<Self> {
        if string.len() != DIGEST_LENGTH * 2 {
            return Err(anyhow!("invalid digest: {string}"));
        }

        // HEXLOWER rejects upper-case input, which keeps one spelling per digest
        HEXLOWER
            .decode(string.as_bytes())
            .map_err(|_| anyhow!("invalid digest: {string}"))?;

        Ok(Self(string.to_string()))
    }
}

impl TryFrom<String> for Digest {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<Digest> for String {
    fn from(value: Digest) -> Self {
        value.0
    }
}

impl Display for Digest {
    fn fmt(&self, f: &mut Formatter) -> result::Result<(), std::fmt::Error> {
        f.write_str(self.as_str())
    }
}
