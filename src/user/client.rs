use actix_web::http::Method;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::api::{parse_records, HttpPortalApi};
use crate::error::Error;
use crate::session::Session;

use super::{InternUpdate, NewIntern, Password, ReferralCode, Role, User, UserId};

#[async_trait(?Send)]
pub trait UserClient {
    async fn fetch_users(&self, session: &Session) -> Result<Vec<User>, Error>;
    /// The user the session belongs to.
    async fn fetch_current_user(&self, session: &Session) -> Result<User, Error>;
    /// Registers `intern` with the intern role and the given referral code.
    async fn create_intern(
        &self,
        session: &Session,
        intern: &NewIntern,
        referral_code: &ReferralCode,
    ) -> Result<User, Error>;
    async fn update_user(
        &self,
        session: &Session,
        user_id: &UserId,
        update: &InternUpdate,
    ) -> Result<User, Error>;
    async fn delete_user(&self, session: &Session, user_id: &UserId) -> Result<(), Error>;
}

#[derive(Deserialize)]
struct UsersBody {
    #[serde(default)]
    users: Vec<Value>,
}

#[derive(Deserialize)]
struct SingleUserBody {
    user: User,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SignupRequest<'a> {
    firstname: &'a str,
    lastname: &'a str,
    email: &'a str,
    password: &'a Password,
    referral_code: &'a str,
    internship_period: &'a str,
    role: Role,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ProfileRequest<'a> {
    firstname: &'a str,
    lastname: &'a str,
    email: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    password: Option<&'a Password>,
    internship_period: &'a str,
}

#[async_trait(?Send)]
impl UserClient for HttpPortalApi {
    #[tracing::instrument(skip(self))]
    async fn fetch_users(&self, session: &Session) -> Result<Vec<User>, Error> {
        let body: UsersBody = self.get(session, "/api/users").await?;

        Ok(parse_records(body.users, "user"))
    }

    #[tracing::instrument(skip(self))]
    async fn fetch_current_user(&self, session: &Session) -> Result<User, Error> {
        let body: SingleUserBody = self.get(session, "/api/auth/user").await?;

        Ok(body.user)
    }

    #[tracing::instrument(skip(self))]
    async fn create_intern(
        &self,
        session: &Session,
        intern: &NewIntern,
        referral_code: &ReferralCode,
    ) -> Result<User, Error> {
        let request = SignupRequest {
            firstname: &intern.firstname,
            lastname: &intern.lastname,
            email: &intern.email,
            password: &intern.password,
            referral_code: referral_code.as_str(),
            internship_period: &intern.internship_period,
            role: Role::Intern,
        };

        let body: SingleUserBody = self
            .send(session, Method::POST, "/api/auth/signup", &request)
            .await?;

        Ok(body.user)
    }

    #[tracing::instrument(skip(self))]
    async fn update_user(
        &self,
        session: &Session,
        user_id: &UserId,
        update: &InternUpdate,
    ) -> Result<User, Error> {
        let request = ProfileRequest {
            firstname: &update.firstname,
            lastname: &update.lastname,
            email: &update.email,
            password: update.new_password(),
            internship_period: &update.internship_period,
        };

        let path = format!("/api/users/{}", user_id);
        let body: SingleUserBody = self.send(session, Method::PUT, &path, &request).await?;

        Ok(body.user)
    }

    #[tracing::instrument(skip(self))]
    async fn delete_user(&self, session: &Session, user_id: &UserId) -> Result<(), Error> {
        let path = format!("/api/users/{}", user_id);

        self.execute(session, Method::DELETE, &path, None).await
    }
}
