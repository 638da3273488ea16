use std::env;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use log::{error, info};

mod app;
mod args;
mod auth;
mod db;
mod routes;
mod template;
mod user;
mod verb;

use app::App;
use args::Args;
use db::{UserDb, VerbDb};

#[tokio::main]
async fn main() -> ExitCode {
    let mut logger = pretty_env_logger::formatted_timed_builder();
    logger.filter_level(log::LevelFilter::Info);
    if let Ok(filters) = env::var("RUST_LOG") {
        logger.parse_filters(&filters);
    }
    logger.init();

    let args = Args::parse();

    let addr = match args.addr() {
        Ok(addr) => addr,
        Err(e) => {
            error!("invalid address: {e}");
            return ExitCode::FAILURE;
        }
    };

    let users = match UserDb::load(args.users_path()) {
        Ok(db) => db,
        Err(e) => {
            error!("couldn't load users from {:?}: {e}", args.users_path());
            return ExitCode::FAILURE;
        }
    };

    let verbs = match VerbDb::load(args.verbs_path()) {
        Ok(db) => db,
        Err(e) => {
            error!("couldn't load verbs from {:?}: {e}", args.verbs_path());
            return ExitCode::FAILURE;
        }
    };

    let app = Arc::new(App::new(users, verbs, args.public_dir().clone()));

    let saver = {
        let app = Arc::clone(&app);
        let mut interval = tokio::time::interval(args.save_interval());

        tokio::spawn(async move {
            // the first tick completes immediately
            interval.tick().await;
            loop {
                interval.tick().await;
                info!("saving...");
                // failures are logged by save()
                let _ = app.save();
            }
        })
    };

    let routes = routes::routes(Arc::clone(&app), args.secure());

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("couldn't listen for ctrl-c: {e}");
        }
    };

    let (addr, server) = match warp::serve(routes).try_bind_with_graceful_shutdown(addr, shutdown) {
        Ok(bound) => bound,
        Err(e) => {
            error!("couldn't bind {addr}: {e}");
            return ExitCode::FAILURE;
        }
    };

    info!("listening on {addr}...");
    server.await;

    saver.abort();
    info!("shutting down, saving...");

    match app.save() {
        Ok(()) => ExitCode::SUCCESS,
        Err(_) => ExitCode::FAILURE,
    }
}
