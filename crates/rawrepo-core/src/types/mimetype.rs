//! Record content types.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, InvalidInputError};

/// The closed set of content types a record can carry.
///
/// The payload itself is opaque; the mimetype drives merge compatibility and
/// the relation topology a record may take part in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum MimeType {
    MarcXchange,
    Enrichment,
    Article,
    Authority,
    LitAnalysis,
    MatVurd,
    HostPub,
    Simple,
    Unknown,
}

impl MimeType {
    /// Every mimetype, in declaration order.
    pub const ALL: [MimeType; 9] = [
        MimeType::MarcXchange,
        MimeType::Enrichment,
        MimeType::Article,
        MimeType::Authority,
        MimeType::LitAnalysis,
        MimeType::MatVurd,
        MimeType::HostPub,
        MimeType::Simple,
        MimeType::Unknown,
    ];

    /// The wire string.
    pub fn as_str(&self) -> &'static str {
        match self {
            MimeType::MarcXchange => "text/marcxchange",
            MimeType::Enrichment => "text/enrichment+marcxchange",
            MimeType::Article => "text/article+marcxchange",
            MimeType::Authority => "text/authority+marcxchange",
            MimeType::LitAnalysis => "text/litanalysis+marcxchange",
            MimeType::MatVurd => "text/matvurd+marcxchange",
            MimeType::HostPub => "text/hostpub+marcxchange",
            MimeType::Simple => "text/simple",
            MimeType::Unknown => "unknown/unknown",
        }
    }

    /// Content types that can stand as the base of a merge.
    pub fn is_base_content(&self) -> bool {
        !matches!(self, MimeType::Enrichment | MimeType::Unknown)
    }
}

impl fmt::Display for MimeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MimeType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MimeType::ALL
            .into_iter()
            .find(|m| m.as_str() == s)
            .ok_or_else(|| {
                InvalidInputError::MimeType {
                    value: s.to_string(),
                }
                .into()
            })
    }
}

impl From<MimeType> for String {
    fn from(m: MimeType) -> Self {
        m.as_str().to_string()
    }
}

impl TryFrom<String> for MimeType {
    type Error = Error;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}
