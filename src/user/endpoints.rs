use actix_web::web::{Data, Json, Path, Query};
use actix_web::{delete, get, post, put};
use serde::{Deserialize, Serialize};

use crate::api::PortalApi;
use crate::config::PortalPolicy;
use crate::donation::aggregate::InternAggregate;
use crate::error::Error;
use crate::session::Session;
use crate::utils::SuccessBody;

use super::{manager, InternFilter, InternUpdate, NewIntern, Role, User, UserId};

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct InternBody {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub referral_code: Option<String>,
    pub internship_period: Option<String>,
    pub total_donations: f64,
    pub stipend_amount: f64,
}

impl InternBody {
    pub fn render(intern: User, aggregate: InternAggregate) -> InternBody {
        InternBody {
            name: intern.full_name(),
            referral_code: intern
                .valid_referral_code()
                .map(|code| code.as_str().to_string()),
            id: intern.id,
            email: intern.email,
            internship_period: intern.internship_period,
            total_donations: aggregate.total_donations,
            stipend_amount: aggregate.stipend_amount,
        }
    }
}

/// A portal account as returned after it was created or changed.
#[derive(Clone, Debug, Serialize)]
pub struct UserBody {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub referral_code: Option<String>,
    pub internship_period: Option<String>,
    pub role: Role,
}

impl UserBody {
    pub fn render(user: User) -> UserBody {
        UserBody {
            name: user.full_name(),
            id: user.id,
            email: user.email,
            referral_code: user.referral_code,
            internship_period: user.internship_period,
            role: user.role,
        }
    }
}

#[get("/interns")]
#[tracing::instrument(skip(api, policy))]
pub async fn get_interns(
    api: Data<dyn PortalApi>,
    policy: Data<PortalPolicy>,
    session: Session,
    query: Query<InternFilter>,
) -> Result<Json<Vec<InternBody>>, Error> {
    let filter = query.into_inner();

    let stipends =
        manager::get_intern_stipends(&**api, &session, &filter, policy.stipend_rate).await?;

    let body = stipends
        .into_iter()
        .map(|(intern, aggregate)| InternBody::render(intern, aggregate))
        .collect();

    Ok(Json(body))
}

#[post("/interns")]
#[tracing::instrument(skip(api))]
pub async fn create_intern(
    api: Data<dyn PortalApi>,
    session: Session,
    body: Json<NewIntern>,
) -> Result<Json<UserBody>, Error> {
    let intern = body.into_inner();

    let user = manager::create_intern(&**api, &session, intern).await?;

    Ok(Json(UserBody::render(user)))
}

#[put("/interns/{user_id}")]
#[tracing::instrument(skip(api))]
pub async fn update_intern(
    api: Data<dyn PortalApi>,
    session: Session,
    params: Path<UserId>,
    body: Json<InternUpdate>,
) -> Result<Json<UserBody>, Error> {
    let user_id = params.into_inner();
    let update = body.into_inner();

    let user = manager::update_intern(&**api, &session, user_id, update).await?;

    Ok(Json(UserBody::render(user)))
}

#[delete("/interns/{user_id}")]
#[tracing::instrument(skip(api))]
pub async fn delete_intern(
    api: Data<dyn PortalApi>,
    session: Session,
    params: Path<UserId>,
) -> Result<Json<SuccessBody>, Error> {
    let user_id = params.into_inner();

    manager::delete_intern(&**api, &session, user_id).await?;

    Ok(Json(SuccessBody {}))
}
