use serde::{Deserialize, Serialize};

use crate::Result;

use super::Campaign;

/// `TryParse` allows a subfield to fail parsing without failing the parsing of the whole
/// structure.
///
/// A campaign that does not decode (e.g., written by a newer server) is skipped while the rest of
/// the set stays usable.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(untagged)]
pub enum TryParse<T> {
    /// Successfully parsed.
    Parsed(T),
    /// Parsing failed.
    ParseFailed(serde_json::Value),
}

impl<T> From<TryParse<T>> for Option<T> {
    fn from(value: TryParse<T>) -> Self {
        match value {
            TryParse::Parsed(v) => Some(v),
            TryParse::ParseFailed(_) => None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct CampaignSetWire {
    campaigns: Vec<TryParse<Campaign>>,
}

/// Campaigns decoded from a `{ "campaigns": [...] }` document.
#[derive(Debug, Clone, Default)]
pub struct CampaignSet {
    campaigns: Vec<Campaign>,
    skipped: usize,
}

impl CampaignSet {
    /// Decode a campaign set, skipping (and logging) campaigns that fail to decode.
    ///
    /// Returns an error only if the document itself is not a campaign set.
    pub fn from_json(json: &str) -> Result<CampaignSet> {
        let wire: CampaignSetWire = serde_json::from_str(json)?;

        let mut campaigns = Vec::with_capacity(wire.campaigns.len());
        let mut skipped = 0;
        for campaign in wire.campaigns {
            match campaign {
                TryParse::Parsed(campaign) => campaigns.push(campaign),
                TryParse::ParseFailed(value) => {
                    skipped += 1;
                    log_skipped(value);
                }
            }
        }

        Ok(CampaignSet { campaigns, skipped })
    }

    #[allow(missing_docs)]
    pub fn campaigns(&self) -> &[Campaign] {
        &self.campaigns
    }

    #[allow(missing_docs)]
    pub fn into_campaigns(self) -> Vec<Campaign> {
        self.campaigns
    }

    /// Number of campaigns that failed to decode.
    pub fn skipped(&self) -> usize {
        self.skipped
    }
}

fn log_skipped(value: serde_json::Value) {
    let campaign_id = value
        .get("id")
        .and_then(|id| id.as_str())
        .unwrap_or("<unknown>")
        .to_owned();
    // Decoding again recovers the error that the untagged fallback swallowed.
    let reason = match serde_json::from_value::<Campaign>(value) {
        Ok(_) => "unknown".to_owned(),
        Err(err) => err.to_string(),
    };
    log::warn!(target: "campaign_engine", campaign_id;
        "skipping campaign that failed to decode: {reason}");
}
