use crate::api::PortalApi;
use crate::error::Error;
use crate::session::Session;

use super::aggregate::{summarize, DonationSummary};
use super::{Donation, DonationFilter, LeaderboardEntry};

#[tracing::instrument(skip(api))]
pub async fn get_donations(
    api: &dyn PortalApi,
    session: &Session,
    filter: &DonationFilter,
) -> Result<Vec<Donation>, Error> {
    let donations = api
        .donations()
        .fetch_donations(session)
        .await?
        .into_iter()
        .filter(|donation| filter.matches(donation))
        .collect();

    Ok(donations)
}

#[tracing::instrument(skip(api))]
pub async fn get_donation_summary(
    api: &dyn PortalApi,
    session: &Session,
) -> Result<DonationSummary, Error> {
    let donations = api.donations().fetch_donations(session).await?;

    Ok(summarize(&donations))
}

#[tracing::instrument(skip(api))]
pub async fn get_leaderboard(
    api: &dyn PortalApi,
    session: &Session,
) -> Result<Vec<LeaderboardEntry>, Error> {
    let leaderboard = api.donations().fetch_leaderboard(session).await?;

    Ok(leaderboard)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::test::MockPortalApi;
    use crate::donation::DonationType;
    use std::sync::{Arc, Mutex};

    fn donation(amount: f64, referral_code: Option<&str>) -> Donation {
        Donation {
            amount: Some(amount),
            referral_code: referral_code.map(String::from),
            donor_name: Some("Asha".to_string()),
            date: None,
            campaign: None,
        }
    }

    fn api_with(donations: Vec<Donation>, called: Arc<Mutex<bool>>) -> MockPortalApi {
        let mut api = MockPortalApi::new();
        api.donations.on_fetch_donations = Box::new(move |_| {
            *called.lock().unwrap() = true;
            Ok(donations.clone())
        });
        api
    }

    #[tokio::test]
    async fn get_donations_applies_filter() {
        let called_fetch = Arc::new(Mutex::new(false));
        let api = api_with(
            vec![donation(10.0, Some("ABC")), donation(20.0, None)],
            Arc::clone(&called_fetch),
        );
        let filter = DonationFilter {
            donation_type: Some(DonationType::Direct),
            ..Default::default()
        };

        let donations = get_donations(&api, &Session::bearer("token"), &filter)
            .await
            .unwrap();

        assert_eq!(donations.len(), 1);
        assert_eq!(donations[0].amount, Some(20.0));
        assert!(
            *called_fetch.lock().unwrap(),
            "api.fetch_donations was not called"
        );
    }

    #[tokio::test]
    async fn get_donation_summary_totals_everything() {
        let api = api_with(
            vec![donation(10.0, Some("ABC")), donation(20.0, None)],
            Arc::new(Mutex::new(false)),
        );

        let summary = get_donation_summary(&api, &Session::bearer("token"))
            .await
            .unwrap();

        assert_eq!(summary.count, 2);
        assert_eq!(summary.total, 30.0);
        assert_eq!(summary.referral_total, 10.0);
    }
}
