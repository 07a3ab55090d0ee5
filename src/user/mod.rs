use std::fmt::{self, Debug};

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::donation::contains;
use crate::error::Error;
use crate::typedid::RemoteId;
use crate::utils::{invalid_field as invalid, null_as_default};

pub mod client;
pub mod endpoints;
pub mod manager;
pub use endpoints::*;

pub type UserId = RemoteId<User>;

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(rename = "_id")]
    pub id: UserId,
    #[serde(default, deserialize_with = "null_as_default")]
    pub firstname: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub lastname: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub email: String,
    #[serde(default)]
    pub referral_code: Option<String>,
    #[serde(default)]
    pub internship_period: Option<String>,
    #[serde(default)]
    pub role: Role,
}

impl User {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.firstname, self.lastname)
            .trim()
            .to_string()
    }

    /// The user's referral code if it is well formed.
    pub fn valid_referral_code(&self) -> Option<ReferralCode> {
        self.referral_code
            .as_deref()
            .and_then(|code| ReferralCode::parse(code))
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
pub enum Role {
    Intern,
    #[serde(rename = "Admin")]
    Moderator,
    #[serde(rename = "Super Admin")]
    SuperAdmin,
    Unknown,
}

impl Default for Role {
    fn default() -> Role {
        Role::Unknown
    }
}

impl<'de> Deserialize<'de> for Role {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let role = Option::<String>::deserialize(deserializer)?;

        Ok(match role.as_deref() {
            Some("Intern") => Role::Intern,
            Some("Admin") => Role::Moderator,
            Some("Super Admin") => Role::SuperAdmin,
            _ => Role::Unknown,
        })
    }
}

/// Token attributing donations to an intern. Only ASCII letters and digits.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize)]
#[serde(transparent)]
pub struct ReferralCode(String);

impl ReferralCode {
    pub fn parse(code: &str) -> Option<ReferralCode> {
        if !code.is_empty() && code.chars().all(|c| c.is_ascii_alphanumeric()) {
            Some(ReferralCode(code.to_string()))
        } else {
            None
        }
    }

    /// A fresh code of six uppercase letters and digits.
    pub fn generate(rng: &mut impl Rng) -> ReferralCode {
        const CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

        let code = (0..6)
            .map(|_| CHARSET[rng.gen_range(0..CHARSET.len())] as char)
            .collect();

        ReferralCode(code)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Clone, Deserialize, Serialize)]
#[serde(transparent)]
pub struct Password(String);

impl Password {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<&str> for Password {
    fn from(password: &str) -> Password {
        Password(password.to_string())
    }
}

impl Debug for Password {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("<redacted>")
    }
}

/// An intern account to be registered on the portal.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewIntern {
    pub firstname: String,
    pub lastname: String,
    pub email: String,
    pub password: Password,
    pub internship_period: String,
}

impl NewIntern {
    pub fn validate(&self) -> Result<(), Error> {
        validate_profile(
            &self.firstname,
            &self.lastname,
            &self.email,
            &self.internship_period,
        )?;
        if self.password.is_empty() {
            return Err(invalid("password", "must not be empty"));
        }

        Ok(())
    }
}

/// Replacement profile for an existing user. An empty or missing password
/// leaves the current one in place.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InternUpdate {
    pub firstname: String,
    pub lastname: String,
    pub email: String,
    #[serde(default)]
    pub password: Option<Password>,
    pub internship_period: String,
}

impl InternUpdate {
    pub fn validate(&self) -> Result<(), Error> {
        validate_profile(
            &self.firstname,
            &self.lastname,
            &self.email,
            &self.internship_period,
        )
    }

    pub fn new_password(&self) -> Option<&Password> {
        self.password.as_ref().filter(|password| !password.is_empty())
    }
}

fn validate_profile(
    firstname: &str,
    lastname: &str,
    email: &str,
    internship_period: &str,
) -> Result<(), Error> {
    if firstname.trim().is_empty() {
        return Err(invalid("firstname", "must not be empty"));
    }
    if lastname.trim().is_empty() {
        return Err(invalid("lastname", "must not be empty"));
    }
    if !email.contains('@') {
        return Err(invalid("email", "must be an email address"));
    }
    if internship_period.trim().is_empty() {
        return Err(invalid("internshipPeriod", "must not be empty"));
    }

    Ok(())
}

/// Intern table filter: substrings on name, email and referral code, exact
/// match on internship period. All comparisons ignore case.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct InternFilter {
    pub name: Option<String>,
    pub email: Option<String>,
    pub referral_code: Option<String>,
    pub period: Option<String>,
}

impl InternFilter {
    pub fn matches(&self, user: &User) -> bool {
        let period_matches = match self.period.as_deref() {
            None | Some("") => true,
            Some(period) => user
                .internship_period
                .as_deref()
                .map_or(false, |p| p.eq_ignore_ascii_case(period)),
        };

        contains(&self.name, Some(user.full_name().as_str()))
            && contains(&self.email, Some(user.email.as_str()))
            && contains(
                &self.referral_code,
                Some(user.referral_code.as_deref().unwrap_or("")),
            )
            && period_matches
    }
}
