use std::{env, net::SocketAddr, sync::Arc};

use log::{debug, info};
use simplelog::*;

use battleship::{router, AppState, Store};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // set up the logging facility
    let _ = SimpleLogger::init(LevelFilter::Debug, Config::default());
    info!("Starting..");

    // Retrieve the JWT secret and token duration from the env vars and store them in the shared AppState
    let state = AppState {
        jwt_secret: env::var("JWT_SECRET").expect("$JWT_SECRET is not set"),
        token_duration: env::var("TOKEN_DURATION").expect("$TOKEN_DURATION is not set")
            .parse::<i64>().expect("$TOKEN_DURATION is not numeric"),
    };

    // Sessions live in process memory; the store is shared with all handlers
    let store = Arc::new(Store::new());
    let app = router(state, store);

    // Start the server
    let addr = SocketAddr::from(([0, 0, 0, 0], 3000));
    debug!("Listening on {}", addr);
    axum::Server::bind(&addr)
        .serve(app.into_make_service())
        .await?;

    Ok(())
}
