use db::Db;
use percent_encoding::percent_decode_str;
use std::convert::Infallible;
use warp::{Filter, Rejection};

mod authed;

pub use authed::{authed, authed_is_of_kind, Authed, Forbidden, Unauthorized};

/// Rejection for well-formed requests carrying unusable values, eg. an impossible date.
#[derive(Debug)]
pub struct Malformed;

impl warp::reject::Reject for Malformed {}

/// Hands every request a handle on the shared store.
pub fn with_db(db: Db) -> impl Filter<Extract = (Db,), Error = Infallible> + Clone {
    warp::any().map(move || Db::clone(&db))
}

/// Next path segment with its escapes decoded, eg. `sam%40x.com` gives `sam@x.com`.
pub fn decoded_param() -> impl Filter<Extract = (String,), Error = Rejection> + Clone {
    warp::path::param::<String>().and_then(|segment: String| async move {
        percent_decode_str(&segment)
            .decode_utf8()
            .map(|decoded| decoded.into_owned())
            .map_err(|_| warp::reject::custom(Malformed))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use db::JSONDatabase;
    use std::sync::Arc;
    use tokio::sync::Mutex;

    #[tokio::test]
    async fn every_request_sees_the_same_store() {
        let db: Db = Arc::new(Mutex::new(JSONDatabase::in_memory()));

        let handle = warp::test::request().filter(&with_db(db.clone())).await.unwrap();

        assert!(Arc::ptr_eq(&db, &handle));
    }

    #[tokio::test]
    async fn path_segments_are_decoded() {
        let email = warp::test::request()
            .path("/sam%40x.com")
            .filter(&decoded_param())
            .await
            .unwrap();
        assert_eq!(email, "sam@x.com");

        let plain = warp::test::request()
            .path("/sam@x.com")
            .filter(&decoded_param())
            .await
            .unwrap();
        assert_eq!(plain, "sam@x.com");

        let rejection = warp::test::request()
            .path("/%FF")
            .filter(&decoded_param())
            .await
            .unwrap_err();
        assert!(rejection.find::<Malformed>().is_some());
    }
}
