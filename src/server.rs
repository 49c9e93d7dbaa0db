use std::{io::Cursor, sync::Arc};

use log::{debug, error};
use rocket::{
    catch, catchers, get,
    http::{ContentType, Status},
    response::Responder,
    routes, Build, Ignite, Response, Rocket, State,
};
use tokio::task::JoinHandle;

use crate::{config::ServerConfig, handlers::ShoutoutHandler, ShoutoutError};

pub const UPSTREAM_ERROR_MESSAGE: &str = "⚠️ Error fetching shoutout info.";

/// ShoutoutServer answers `GET /shoutout/<username>` with a plain text shoutout.
pub struct ShoutoutServer {
    handler: Arc<ShoutoutHandler>,
    config: ServerConfig,
}

impl ShoutoutServer {
    pub fn new(handler: ShoutoutHandler, config: ServerConfig) -> Self {
        Self {
            handler: Arc::new(handler),
            config,
        }
    }

    pub fn build(&self) -> Rocket<Build> {
        let figment = rocket::Config::figment()
            .merge(("address", self.config.address.clone()))
            .merge(("port", self.config.port));

        rocket::custom(figment)
            .manage(self.handler.clone())
            .mount("/", routes![shoutout])
            .register("/", catchers![not_found])
    }

    /// This function does not block when awaited. It returns a JoinHandle that can be awaited
    /// to wait for the server to stop.
    pub async fn launch(
        &self,
    ) -> Result<JoinHandle<Result<Rocket<Ignite>, rocket::Error>>, rocket::Error> {
        let rocket = self.build().ignite().await?;
        Ok(tokio::task::spawn(async { rocket.launch().await }))
    }
}

#[get("/shoutout/<username>")]
pub(crate) async fn shoutout(
    username: &str,
    handler: &State<Arc<ShoutoutHandler>>,
) -> Result<String, ShoutoutError> {
    debug!("shoutout requested for {username:?}");
    Ok(handler.shoutout(username).await?.into_message())
}

#[catch(404)]
fn not_found() -> &'static str {
    "nothing here :< try /shoutout/<username>"
}

impl<'req> Responder<'req, 'static> for ShoutoutError {
    fn respond_to(self, _request: &'req rocket::Request<'_>) -> rocket::response::Result<'static> {
        error!("couldn't build a shoutout: {self}");
        Response::build()
            .status(Status::InternalServerError)
            .header(ContentType::Plain)
            .sized_body(
                UPSTREAM_ERROR_MESSAGE.len(),
                Cursor::new(UPSTREAM_ERROR_MESSAGE),
            )
            .ok()
    }
}
