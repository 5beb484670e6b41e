use std::convert::Infallible;
use tokio::sync::broadcast;
use tokio_stream::{wrappers::BroadcastStream, Stream, StreamExt};
use warp::{sse::Event, Filter, Rejection, Reply};

use db::{Change, Database, Db};
use filters::{authed, with_db, Authed};

pub fn routes(db: &Db) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    warp::path!("api" / "changes")
        .and(warp::get())
        .and(authed(db))
        .and(with_db(db.clone()))
        .and_then(changes)
        .boxed()
}

/// Streams every committed change as a `change` event until the client goes away.
async fn changes(_authed: Authed, db: Db) -> Result<impl Reply, Infallible> {
    let receiver = db.lock().await.subscribe();
    Ok(warp::sse::reply(
        warp::sse::keep_alive().stream(change_events(receiver)),
    ))
}

/// Slow clients miss changes rather than holding the feed back.
fn change_events(
    receiver: broadcast::Receiver<Change>,
) -> impl Stream<Item = Result<Event, serde_json::Error>> {
    BroadcastStream::new(receiver).filter_map(|change| match change {
        Ok(change) => Some(Event::default().event("change").json_data(&change)),
        Err(error) => {
            log::warn!("change feed: {}", error);
            None
        }
    })
}
