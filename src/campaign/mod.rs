use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::countdown::CountdownWindow;
use crate::donation::aggregate::progress_percentage;
use crate::error::Error;
use crate::typedid::RemoteId;
use crate::utils::{invalid_field as invalid, null_as_default};

pub mod client;
pub mod endpoints;
pub mod manager;
pub use endpoints::*;

pub type CampaignId = RemoteId<Campaign>;

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Campaign {
    #[serde(rename = "_id")]
    pub id: CampaignId,
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub goal_amount: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub raised_amount: f64,
    #[serde(default)]
    pub start_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub end_date: Option<DateTime<Utc>>,
}

impl Campaign {
    pub fn window(&self) -> Option<CountdownWindow> {
        match (self.start_date, self.end_date) {
            (Some(start), Some(end)) => Some(CountdownWindow { start, end }),
            _ => None,
        }
    }

    pub fn is_ongoing(&self, now: DateTime<Utc>) -> bool {
        self.end_date.map_or(false, |end| end > now)
    }

    /// Share of the goal raised so far, in `[0, 100]`. A campaign without a
    /// positive goal reports 0.
    pub fn funding_percentage(&self) -> f64 {
        progress_percentage(self.raised_amount, self.goal_amount)
    }
}

/// A campaign as submitted for creation or replacement.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CampaignDraft {
    pub title: String,
    pub description: String,
    pub goal_amount: f64,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
}

impl CampaignDraft {
    pub fn validate(&self) -> Result<(), Error> {
        if self.title.trim().is_empty() {
            return Err(invalid("title", "must not be empty"));
        }
        if self.description.trim().is_empty() {
            return Err(invalid("description", "must not be empty"));
        }
        if !(self.goal_amount > 0.0) || self.goal_amount.is_infinite() {
            return Err(invalid("goalAmount", "must be greater than 0"));
        }
        if self.start_date >= self.end_date {
            return Err(invalid("endDate", "must be after startDate"));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn campaign(goal_amount: f64, raised_amount: f64) -> Campaign {
        Campaign {
            id: "c1".into(),
            title: "Books for all".to_string(),
            description: None,
            goal_amount,
            raised_amount,
            start_date: None,
            end_date: None,
        }
    }

    #[test]
    fn parses_remote_campaign() {
        let json = r#"{
            "_id": "65a1f0c2e4b0a1b2c3d4e5f6",
            "title": "Winter Relief",
            "description": "Blankets",
            "goalAmount": 50000,
            "raisedAmount": 12500.5,
            "startDate": "2024-01-01T00:00:00.000Z",
            "endDate": "2024-01-11T00:00:00.000Z",
            "user": { "referralCode": "abc123" }
        }"#;

        let campaign: Campaign = serde_json::from_str(json).unwrap();

        assert_eq!(campaign.id.as_str(), "65a1f0c2e4b0a1b2c3d4e5f6");
        assert_eq!(campaign.goal_amount, 50000.0);
        assert_eq!(
            campaign.window().unwrap().end,
            Utc.with_ymd_and_hms(2024, 1, 11, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn missing_dates_have_no_window() {
        let campaign: Campaign = serde_json::from_str(r#"{ "_id": "x", "title": "t" }"#).unwrap();

        assert!(campaign.window().is_none());
        assert!(!campaign.is_ongoing(Utc::now()));
    }

    fn draft() -> CampaignDraft {
        CampaignDraft {
            title: "Winter Relief".to_string(),
            description: "Blankets".to_string(),
            goal_amount: 1000.0,
            start_date: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            end_date: Utc.with_ymd_and_hms(2024, 1, 11, 0, 0, 0).unwrap(),
        }
    }

    #[test]
    fn draft_validation() {
        assert!(draft().validate().is_ok());

        let blank = CampaignDraft {
            title: "  ".to_string(),
            ..draft()
        };
        assert_eq!(blank.validate().unwrap_err(), invalid("title", "must not be empty"));

        for goal_amount in [0.0, -5.0, f64::NAN].iter().copied() {
            let draft = CampaignDraft {
                goal_amount,
                ..draft()
            };
            assert!(matches!(
                draft.validate(),
                Err(Error::InvalidField { field: "goalAmount", .. })
            ));
        }

        let backwards = CampaignDraft {
            end_date: draft().start_date,
            ..draft()
        };
        assert!(matches!(
            backwards.validate(),
            Err(Error::InvalidField { field: "endDate", .. })
        ));
    }

    #[test]
    fn draft_serializes_like_the_portal_api() {
        let json = serde_json::to_value(draft()).unwrap();

        assert_eq!(json["goalAmount"], 1000.0);
        assert_eq!(json["startDate"], "2024-01-01T00:00:00Z");
    }

    #[test]
    fn null_fields_keep_the_campaign() {
        let records: Vec<serde_json::Value> = serde_json::from_str(
            r#"[
                { "_id": "a", "title": "Food Drive", "goalAmount": null, "raisedAmount": null },
                { "_id": "b", "title": null, "goalAmount": 500 }
            ]"#,
        )
        .unwrap();

        let campaigns: Vec<Campaign> = crate::api::parse_records(records, "campaign");

        assert_eq!(campaigns.len(), 2);
        assert_eq!(campaigns[0].goal_amount, 0.0);
        assert_eq!(campaigns[0].funding_percentage(), 0.0);
        assert_eq!(campaigns[1].title, "");
    }

    #[test]
    fn funding_percentage_is_clamped() {
        assert_eq!(campaign(200.0, 50.0).funding_percentage(), 25.0);
        assert_eq!(campaign(200.0, 500.0).funding_percentage(), 100.0);
        assert_eq!(campaign(0.0, 500.0).funding_percentage(), 0.0);
        assert_eq!(campaign(f64::NAN, 500.0).funding_percentage(), 0.0);
    }
}
