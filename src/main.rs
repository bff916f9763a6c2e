use actix_cors::Cors;
use actix_web::{
    self,
    middleware::{from_fn, Logger},
    web, App, HttpServer,
};
use std::{sync::Arc, time::Duration};

use social_backend::{
    configs::{connect_database, run_migrations},
    constants::ENV,
    middlewares::authentication,
    modules::{
        self,
        friend::{
            repository_pg::FriendRepositoryPg,
            service::{EngineConfig, FriendService},
        },
        graph::{repository_pg::GraphRepositoryPg, service::GraphService},
        group::{repository_pg::GroupRepositoryPg, service::GroupService},
        user::repository_pg::UserRepositoryPg,
    },
};

#[actix_web::get("/")]
async fn health_check() -> &'static str {
    "Server is running"
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::init();

    let db_pool =
        connect_database().await.map_err(|_| std::io::Error::other("Database connection error"))?;
    run_migrations(&db_pool).await.map_err(|_| std::io::Error::other("Database migration error"))?;

    let lock_timeout = Duration::from_millis(ENV.lock_timeout_ms);
    let config = EngineConfig::from_env();

    let user_repo = Arc::new(UserRepositoryPg::new(db_pool.clone()));
    let friend_repo =
        Arc::new(FriendRepositoryPg::new(db_pool.clone()).with_lock_timeout(lock_timeout));
    let group_repo =
        Arc::new(GroupRepositoryPg::new(db_pool.clone()).with_lock_timeout(lock_timeout));
    let graph_repo = Arc::new(GraphRepositoryPg::new(db_pool.clone()));

    let friend_service =
        FriendService::with_dependencies(friend_repo.clone(), user_repo.clone(), config);
    let group_service = GroupService::with_dependencies(group_repo.clone(), friend_repo, config);
    let graph_service = GraphService::with_dependencies(graph_repo, group_repo, user_repo);

    log::info!("Starting server at http://{}:{}", ENV.ip.as_str(), ENV.port);
    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .wrap(
                Cors::default()
                    .allowed_origin(ENV.frontend_url.as_str())
                    .allow_any_method()
                    .allow_any_header()
                    .supports_credentials(),
            )
            .app_data(web::Data::new(friend_service.clone()))
            .app_data(web::Data::new(group_service.clone()))
            .app_data(web::Data::new(graph_service.clone()))
            .service(health_check)
            .service(
                web::scope("/api")
                    .wrap(from_fn(authentication))
                    .configure(modules::friend::route::configure)
                    .configure(modules::group::route::configure)
                    .configure(modules::graph::route::configure),
            )
    })
    .bind((ENV.ip.as_str(), ENV.port))?
    .run()
    .await
}
