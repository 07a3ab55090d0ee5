use futures::future;
use tracing::{debug, info, warn};

use crate::api::PortalApi;
use crate::donation::aggregate::{aggregate, InternAggregate};
use crate::error::Error;
use crate::session::Session;
use crate::utils::ensure_path_safe;

use super::{InternFilter, InternUpdate, NewIntern, ReferralCode, Role, User, UserId};

#[tracing::instrument(skip(api))]
pub async fn get_interns(
    api: &dyn PortalApi,
    session: &Session,
    filter: &InternFilter,
) -> Result<Vec<User>, Error> {
    let interns = api
        .users()
        .fetch_users(session)
        .await?
        .into_iter()
        .filter(|user| user.role == Role::Intern && filter.matches(user))
        .collect();

    Ok(interns)
}

/// Interns matching `filter`, each with the donations attributed to their
/// referral code. Lookups run concurrently; one failing lookup only zeroes
/// that intern's figures.
#[tracing::instrument(skip(api))]
pub async fn get_intern_stipends(
    api: &dyn PortalApi,
    session: &Session,
    filter: &InternFilter,
    stipend_rate: f64,
) -> Result<Vec<(User, InternAggregate)>, Error> {
    let interns = get_interns(api, session, filter).await?;

    let aggregates = future::join_all(
        interns
            .iter()
            .map(|intern| get_intern_aggregate(api, session, intern, stipend_rate)),
    )
    .await;

    Ok(interns.into_iter().zip(aggregates).collect())
}

#[tracing::instrument(skip(api, intern), fields(intern_id = %intern.id))]
pub async fn get_intern_aggregate(
    api: &dyn PortalApi,
    session: &Session,
    intern: &User,
    stipend_rate: f64,
) -> InternAggregate {
    let referral_code = match intern.valid_referral_code() {
        Some(referral_code) => referral_code,
        None => {
            debug!("intern has no usable referral code");
            return InternAggregate::default();
        }
    };

    match api
        .donations()
        .fetch_donations_by_referral(session, &referral_code)
        .await
    {
        Ok(donations) => aggregate(&donations, stipend_rate),
        Err(err) => {
            warn!(error = %err, "referral lookup failed, reporting zero");
            InternAggregate::default()
        }
    }
}

#[tracing::instrument(skip(api))]
pub async fn get_current_user(api: &dyn PortalApi, session: &Session) -> Result<User, Error> {
    let user = api.users().fetch_current_user(session).await?;

    Ok(user)
}

/// Registers a new intern under a freshly generated referral code.
#[tracing::instrument(skip(api))]
pub async fn create_intern(
    api: &dyn PortalApi,
    session: &Session,
    intern: NewIntern,
) -> Result<User, Error> {
    intern.validate()?;

    let referral_code = ReferralCode::generate(&mut rand::thread_rng());
    let user = api
        .users()
        .create_intern(session, &intern, &referral_code)
        .await?;
    info!(user_id = %user.id, referral_code = referral_code.as_str(), "created intern");

    Ok(user)
}

#[tracing::instrument(skip(api))]
pub async fn update_intern(
    api: &dyn PortalApi,
    session: &Session,
    user_id: UserId,
    update: InternUpdate,
) -> Result<User, Error> {
    ensure_path_safe(&user_id)?;
    update.validate()?;

    let user = api.users().update_user(session, &user_id, &update).await?;
    info!(%user_id, "updated intern");

    Ok(user)
}

#[tracing::instrument(skip(api))]
pub async fn delete_intern(
    api: &dyn PortalApi,
    session: &Session,
    user_id: UserId,
) -> Result<(), Error> {
    ensure_path_safe(&user_id)?;

    api.users().delete_user(session, &user_id).await?;
    info!(%user_id, "deleted intern");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::test::MockPortalApi;
    use crate::donation::Donation;
    use std::sync::{Arc, Mutex};

    fn user(id: &str, role: Role, referral_code: Option<&str>) -> User {
        User {
            id: id.into(),
            firstname: id.to_string(),
            lastname: "Intern".to_string(),
            email: format!("{}@example.org", id),
            referral_code: referral_code.map(String::from),
            internship_period: Some("3 months".to_string()),
            role,
        }
    }

    fn donation(amount: Option<f64>) -> Donation {
        Donation {
            amount,
            referral_code: Some("code".to_string()),
            donor_name: None,
            date: None,
            campaign: None,
        }
    }

    fn new_intern() -> NewIntern {
        NewIntern {
            firstname: "Priya".to_string(),
            lastname: "Sharma".to_string(),
            email: "priya@example.org".to_string(),
            password: "hunter22".into(),
            internship_period: "1 month".to_string(),
        }
    }

    #[tokio::test]
    async fn create_intern_assigns_a_referral_code() {
        let mut api = MockPortalApi::new();
        api.users.on_create_intern = Box::new(|session, intern, referral_code| {
            assert_eq!(session.token(), "token");
            assert_eq!(referral_code.as_str().len(), 6);
            let mut created = user("u9", Role::Intern, Some(referral_code.as_str()));
            created.firstname = intern.firstname.clone();
            Ok(created)
        });

        let created = create_intern(&api, &Session::bearer("token"), new_intern())
            .await
            .unwrap();

        assert_eq!(created.firstname, "Priya");
        assert!(created.valid_referral_code().is_some());
    }

    #[tokio::test]
    async fn incomplete_intern_is_rejected_before_calling_api() {
        let api = MockPortalApi::new();
        let intern = NewIntern {
            lastname: " ".to_string(),
            ..new_intern()
        };

        let result = create_intern(&api, &Session::bearer("token"), intern).await;

        assert!(matches!(
            result.unwrap_err(),
            Error::InvalidField { field: "lastname", .. }
        ));
    }

    #[tokio::test]
    async fn update_and_delete_target_the_given_id() {
        let deleted = Arc::new(Mutex::new(false));
        let deleted_clone = Arc::clone(&deleted);
        let mut api = MockPortalApi::new();
        api.users.on_update_user = Box::new(|_, user_id, update| {
            assert_eq!(user_id.as_str(), "u1");
            assert!(update.new_password().is_none());
            let mut updated = user("u1", Role::Intern, Some("AAA"));
            updated.email = update.email.clone();
            Ok(updated)
        });
        api.users.on_delete_user = Box::new(move |_, user_id| {
            assert_eq!(user_id.as_str(), "u1");
            *deleted_clone.lock().unwrap() = true;
            Ok(())
        });
        let session = Session::bearer("token");
        let update = InternUpdate {
            firstname: "Priya".to_string(),
            lastname: "Sharma".to_string(),
            email: "p.sharma@example.org".to_string(),
            password: None,
            internship_period: "2 months".to_string(),
        };

        let updated = update_intern(&api, &session, "u1".into(), update).await.unwrap();
        delete_intern(&api, &session, "u1".into()).await.unwrap();

        assert_eq!(updated.email, "p.sharma@example.org");
        assert!(*deleted.lock().unwrap(), "api.delete_user was not called");
        assert!(matches!(
            delete_intern(&api, &session, "u1/../..".into()).await.unwrap_err(),
            Error::InvalidField { field: "id", .. }
        ));
    }

    #[tokio::test]
    async fn failing_lookup_only_zeroes_that_intern() {
        let mut api = MockPortalApi::new();
        api.users.on_fetch_users = Box::new(|_| {
            Ok(vec![
                user("a", Role::Intern, Some("AAA")),
                user("b", Role::Intern, Some("BBB")),
                user("c", Role::Intern, Some("CCC")),
                user("mod", Role::Moderator, Some("MOD")),
            ])
        });
        let lookups = Arc::new(Mutex::new(Vec::new()));
        let lookups_clone = Arc::clone(&lookups);
        api.donations.on_fetch_donations_by_referral = Box::new(move |_, referral_code| {
            lookups_clone
                .lock()
                .unwrap()
                .push(referral_code.as_str().to_string());
            match referral_code.as_str() {
                "AAA" => Ok(vec![donation(Some(100.0)), donation(None), donation(Some(400.0))]),
                "BBB" => Err(Error::UpstreamRejected {
                    status: 500,
                    message: "boom".to_string(),
                }),
                _ => Ok(vec![donation(Some(50.0))]),
            }
        });

        let stipends = get_intern_stipends(
            &api,
            &Session::bearer("token"),
            &InternFilter::default(),
            0.2,
        )
        .await
        .unwrap();

        let figures: Vec<(&str, InternAggregate)> = stipends
            .iter()
            .map(|(intern, aggregate)| (intern.id.as_str(), *aggregate))
            .collect();
        assert_eq!(
            figures,
            vec![
                (
                    "a",
                    InternAggregate {
                        total_donations: 500.0,
                        stipend_amount: 100.0
                    }
                ),
                ("b", InternAggregate::default()),
                (
                    "c",
                    InternAggregate {
                        total_donations: 50.0,
                        stipend_amount: 10.0
                    }
                ),
            ]
        );
        assert_eq!(lookups.lock().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn interns_without_valid_code_are_not_looked_up() {
        let mut api = MockPortalApi::new();
        api.users.on_fetch_users = Box::new(|_| {
            Ok(vec![
                user("none", Role::Intern, None),
                user("bad", Role::Intern, Some("not a code")),
            ])
        });

        let stipends = get_intern_stipends(
            &api,
            &Session::bearer("token"),
            &InternFilter::default(),
            0.2,
        )
        .await
        .unwrap();

        assert_eq!(stipends.len(), 2);
        assert!(stipends
            .iter()
            .all(|(_, aggregate)| *aggregate == InternAggregate::default()));
    }

    #[tokio::test]
    async fn filter_applies_before_lookups() {
        let mut api = MockPortalApi::new();
        api.users.on_fetch_users = Box::new(|_| {
            Ok(vec![
                user("priya", Role::Intern, Some("PRI")),
                user("ravi", Role::Intern, Some("RAV")),
            ])
        });
        api.donations.on_fetch_donations_by_referral = Box::new(|_, referral_code| {
            assert_eq!(referral_code.as_str(), "RAV");
            Ok(vec![])
        });
        let filter = InternFilter {
            name: Some("RAVI".to_string()),
            ..Default::default()
        };

        let stipends = get_intern_stipends(&api, &Session::bearer("token"), &filter, 0.2)
            .await
            .unwrap();

        assert_eq!(stipends.len(), 1);
        assert_eq!(stipends[0].0.id.as_str(), "ravi");
    }
}
