use futures::future;
use tracing::warn;

use crate::api::PortalApi;
use crate::config::PortalPolicy;
use crate::donation::aggregate::{aggregate, progress_percentage};
use crate::donation::Donation;
use crate::error::Error;
use crate::session::Session;
use crate::user::Role;

use super::{DashboardStats, InternProgress};

fn or_zero<T: Default>(figure: &'static str, result: Result<T, Error>) -> T {
    result.unwrap_or_else(|err| {
        warn!(figure, error = %err, "dashboard figure unavailable, reporting zero");
        T::default()
    })
}

/// Each figure is fetched concurrently and falls back to zero on its own.
#[tracing::instrument(skip(api))]
pub async fn get_dashboard_stats(api: &dyn PortalApi, session: &Session) -> DashboardStats {
    let (campaigns, users, donations) = future::join3(
        api.campaigns().fetch_campaigns(session),
        api.users().fetch_users(session),
        api.donations().fetch_donations(session),
    )
    .await;

    DashboardStats {
        campaign_count: or_zero("campaign_count", campaigns.map(|c| c.len())),
        intern_count: or_zero(
            "intern_count",
            users.map(|users| users.iter().filter(|u| u.role == Role::Intern).count()),
        ),
        total_donated: or_zero(
            "total_donated",
            donations.map(|d| d.iter().map(Donation::amount_or_zero).sum()),
        ),
    }
}

/// Progress of the session's own intern against the configured goal. The
/// donations endpoint scopes its result to the session's user.
#[tracing::instrument(skip(api))]
pub async fn get_intern_progress(
    api: &dyn PortalApi,
    session: &Session,
    policy: &PortalPolicy,
) -> Result<InternProgress, Error> {
    let (user, donations) = future::join(
        api.users().fetch_current_user(session),
        api.donations().fetch_donations(session),
    )
    .await;
    let user = user?;
    let totals = aggregate(&donations?, policy.stipend_rate);

    Ok(InternProgress {
        name: user.full_name(),
        referral_code: user
            .valid_referral_code()
            .map(|code| code.as_str().to_string()),
        email: user.email,
        total_raised: totals.total_donations,
        goal: policy.intern_goal,
        percentage: progress_percentage(totals.total_donations, policy.intern_goal),
        stipend_amount: totals.stipend_amount,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::test::MockPortalApi;
    use crate::user::User;

    fn user(id: &str, role: Role) -> User {
        User {
            id: id.into(),
            firstname: "Priya".to_string(),
            lastname: "Sharma".to_string(),
            email: "priya@example.org".to_string(),
            referral_code: Some("PRI01".to_string()),
            internship_period: None,
            role,
        }
    }

    fn donation(amount: f64) -> Donation {
        Donation {
            amount: Some(amount),
            referral_code: None,
            donor_name: None,
            date: None,
            campaign: None,
        }
    }

    #[tokio::test]
    async fn stats_degrade_independently() {
        let mut api = MockPortalApi::new();
        api.campaigns.on_fetch_campaigns = Box::new(|_| {
            Err(Error::UpstreamRejected {
                status: 500,
                message: "down".to_string(),
            })
        });
        api.users.on_fetch_users = Box::new(|_| {
            Ok(vec![
                user("a", Role::Intern),
                user("b", Role::Intern),
                user("c", Role::SuperAdmin),
            ])
        });
        api.donations.on_fetch_donations = Box::new(|_| Ok(vec![donation(100.0), donation(50.5)]));

        let stats = get_dashboard_stats(&api, &Session::bearer("token")).await;

        assert_eq!(
            stats,
            DashboardStats {
                campaign_count: 0,
                intern_count: 2,
                total_donated: 150.5
            }
        );
    }

    #[tokio::test]
    async fn progress_against_goal() {
        let mut api = MockPortalApi::new();
        api.users.on_fetch_current_user = Box::new(|_| Ok(user("me", Role::Intern)));
        api.donations.on_fetch_donations =
            Box::new(|_| Ok(vec![donation(3000.0), donation(2000.0)]));

        let progress = get_intern_progress(&api, &Session::bearer("token"), &PortalPolicy::default())
            .await
            .unwrap();

        assert_eq!(progress.name, "Priya Sharma");
        assert_eq!(progress.referral_code.as_deref(), Some("PRI01"));
        assert_eq!(progress.total_raised, 5000.0);
        assert_eq!(progress.goal, 20000.0);
        assert_eq!(progress.percentage, 25.0);
        assert_eq!(progress.stipend_amount, 1000.0);
    }

    #[tokio::test]
    async fn progress_fails_without_current_user() {
        let mut api = MockPortalApi::new();
        api.users.on_fetch_current_user = Box::new(|_| {
            Err(Error::UpstreamRejected {
                status: 401,
                message: "Token is not valid".to_string(),
            })
        });
        api.donations.on_fetch_donations = Box::new(|_| Ok(vec![]));

        let result =
            get_intern_progress(&api, &Session::bearer("token"), &PortalPolicy::default()).await;

        assert!(matches!(
            result.unwrap_err(),
            Error::UpstreamRejected { status: 401, .. }
        ));
    }
}
