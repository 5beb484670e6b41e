use db::{models::Role, Database, Db, Session};
use warp::{Filter, Rejection};

use crate::with_db;

/// The bearer token of the request and a snapshot of its session.
#[derive(Clone, Debug)]
pub struct Authed {
    pub token: String,
    pub session: Session,
}

/// Filter that checks if the user is authenticated or not, and rejects the request if he/she isn't
pub fn authed(db: &Db) -> impl Filter<Extract = (Authed,), Error = Rejection> + Clone {
    with_db(db.clone())
        .and(warp::header::optional::<String>("Authorization"))
        .and_then(guard)
}

/// Checks that the user is authenticated and has one of the requested roles, rejecting the
/// request otherwise.
pub fn authed_is_of_kind<'a>(
    db: &Db,
    roles: &'a [Role],
) -> impl Filter<Extract = (Authed,), Error = Rejection> + Clone + 'a {
    authed(db)
        .map(move |authed| (authed, roles))
        .untuple_one()
        .and_then(guard_kind)
}

#[derive(Debug)]
pub struct Forbidden;

impl warp::reject::Reject for Forbidden {}

#[derive(Debug)]
pub struct Unauthorized;

impl warp::reject::Reject for Unauthorized {}

/// Extracts the token of a "Bearer <token>" header value.
pub fn bearer_token(authorization: &str) -> Option<&str> {
    let (auth_type, token) = {
        let mut parts = authorization.splitn(2, ' ');
        (parts.next().unwrap_or(""), parts.next().unwrap_or(""))
    };

    if auth_type.eq_ignore_ascii_case("bearer") && !token.is_empty() {
        Some(token)
    } else {
        None
    }
}

async fn guard(db: Db, authorization: Option<String>) -> Result<Authed, warp::Rejection> {
    let token = match authorization.as_deref().and_then(bearer_token) {
        Some(token) => token.to_string(),
        None => return Err(warp::reject::custom(Forbidden)),
    };

    let db = db.lock().await;

    match db.auth_session(&token) {
        Some(session) => Ok(Authed {
            session: session.clone(),
            token,
        }),
        None => Err(warp::reject::custom(Forbidden)),
    }
}

async fn guard_kind(authed: Authed, wanted: &[Role]) -> Result<Authed, warp::Rejection> {
    if wanted.contains(&authed.session.role) {
        Ok(authed)
    } else {
        Err(warp::reject::custom(Unauthorized))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use db::JSONDatabase;
    use std::sync::Arc;
    use tokio::sync::Mutex;

    fn db() -> Db {
        Arc::new(Mutex::new(JSONDatabase::in_memory()))
    }

    #[test]
    fn bearer_tokens_are_parsed() {
        assert_eq!(bearer_token("Bearer abc"), Some("abc"));
        assert_eq!(bearer_token("bearer abc"), Some("abc"));
        assert_eq!(bearer_token("Basic abc"), None);
        assert_eq!(bearer_token("Bearer"), None);
    }

    #[tokio::test]
    async fn known_tokens_pass() {
        let db = db();
        let token = db.lock().await.auth_login("sam@x.com", Role::Student).1;

        let authed = warp::test::request()
            .header("Authorization", format!("Bearer {}", token))
            .filter(&authed(&db))
            .await
            .unwrap();

        assert_eq!(authed.token, token);
        assert_eq!(authed.session.email, "sam@x.com");
    }

    #[tokio::test]
    async fn missing_or_unknown_tokens_are_forbidden() {
        let db = db();

        let missing = warp::test::request().filter(&authed(&db)).await;
        assert!(missing.unwrap_err().find::<Forbidden>().is_some());

        let unknown = warp::test::request()
            .header("Authorization", "Bearer nope")
            .filter(&authed(&db))
            .await;
        assert!(unknown.unwrap_err().find::<Forbidden>().is_some());
    }

    #[tokio::test]
    async fn wrong_roles_are_unauthorized() {
        let db = db();
        let token = db.lock().await.auth_login("sam@x.com", Role::Student).1;

        let rejection = warp::test::request()
            .header("Authorization", format!("Bearer {}", token))
            .filter(&authed_is_of_kind(&db, &[Role::Admin]))
            .await
            .unwrap_err();

        assert!(rejection.find::<Unauthorized>().is_some());
    }
}
