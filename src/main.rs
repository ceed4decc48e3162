#[macro_use]
extern crate rocket;

use std::sync::Arc;

use probewatch::db::{SqliteStore, Store};
use probewatch::email::{EmailTransport, SmtpEmailTransport};
use probewatch::engine::Engine;
use probewatch::{catchers, config, routes};

#[launch]
fn rocket() -> _ {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = config::Config::from_env();
    let store: Arc<dyn Store> = Arc::new(SqliteStore::new(&config.database_path).expect("failed to initialize database"));
    let transport: Arc<dyn EmailTransport> = Arc::new(SmtpEmailTransport::from_env());

    let engine = Arc::new(Engine::new(store.clone(), transport, config.scheduler_tick));
    let scheduler = engine.scheduler();

    rocket::build()
        .manage(store)
        .manage(scheduler)
        .manage(engine.clone())
        .mount(
            "/api",
            routes![
                routes::health,
                routes::create_monitor,
                routes::list_monitors,
                routes::get_monitor,
                routes::delete_monitor,
                routes::check_monitor,
                routes::monitor_history,
                routes::monitor_logs,
                routes::dashboard_stats,
                routes::create_alert_settings,
                routes::get_alert_settings,
                routes::delete_alert_settings,
            ],
        )
        .register(
            "/",
            catchers![
                catchers::bad_request,
                catchers::not_found,
                catchers::unprocessable_entity,
                catchers::internal_error,
            ],
        )
        .attach(rocket::fairing::AdHoc::on_liftoff("Engine start", move |_rocket| {
            Box::pin(async move {
                engine.start();
            })
        }))
        .attach(rocket::fairing::AdHoc::on_shutdown("Engine stop", |rocket| {
            Box::pin(async move {
                if let Some(engine) = rocket.state::<Arc<Engine>>() {
                    engine.stop().await;
                }
            })
        }))
}
