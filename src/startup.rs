use actix_web::dev::Server;
use actix_web::{middleware::Logger, web, App, HttpServer};
use std::net::TcpListener;

use crate::configuration::Environment;
use crate::error::{expose_error_stacks, AppError, ValidationError};
use crate::middleware::AuthMiddleware;
use crate::routes::{
    change_password, current_user, health_check, login, logout, refresh_token, register,
    update_account, update_avatar, update_cover_image, CookiePolicy,
};
use crate::session::SessionCoordinator;

const JSON_BODY_LIMIT: usize = 16 * 1024;

pub fn run(
    listener: TcpListener,
    coordinator: SessionCoordinator,
    environment: Environment,
) -> Result<Server, std::io::Error> {
    expose_error_stacks(environment);
    let coordinator = web::Data::new(coordinator);
    let cookie_policy = web::Data::new(CookiePolicy::for_environment(environment));

    let server = HttpServer::new(move || {
        let json_config = web::JsonConfig::default()
            .limit(JSON_BODY_LIMIT)
            .error_handler(|err, _req| {
                AppError::from(ValidationError::MalformedBody(err.to_string())).into()
            });
        let gate = || AuthMiddleware::new(coordinator.clone());

        App::new()
            .wrap(Logger::default())

            // Shared state
            .app_data(coordinator.clone())
            .app_data(cookie_policy.clone())
            .app_data(json_config)

            .route("/api/v1/healthcheck", web::get().to(health_check))
            .service(
                web::scope("/api/v1/users")
                    // Public routes
                    .route("/register", web::post().to(register))
                    .route("/login", web::post().to(login))
                    .route("/refresh-token", web::post().to(refresh_token))

                    // Protected routes
                    .service(
                        web::resource("/logout")
                            .wrap(gate())
                            .route(web::post().to(logout)),
                    )
                    .service(
                        web::resource("/change-password")
                            .wrap(gate())
                            .route(web::post().to(change_password)),
                    )
                    .service(
                        web::resource("/current-user")
                            .wrap(gate())
                            .route(web::get().to(current_user)),
                    )
                    .service(
                        web::resource("/update-account")
                            .wrap(gate())
                            .route(web::patch().to(update_account)),
                    )
                    .service(
                        web::resource("/avatar")
                            .wrap(gate())
                            .route(web::patch().to(update_avatar)),
                    )
                    .service(
                        web::resource("/cover-image")
                            .wrap(gate())
                            .route(web::patch().to(update_cover_image)),
                    ),
            )
    })
    .listen(listener)?
    .run();

    Ok(server)
}
