use crate::{
    api::{approval, attendance, permission},
    config::Config,
    ws,
};
use actix_governor::{
    Governor, GovernorConfigBuilder, PeerIpKeyExtractor, governor::middleware::NoOpMiddleware,
};
use actix_web::web;
use std::sync::Arc;

pub fn configure(cfg: &mut web::ServiceConfig, config: Config) {
    // Helper to build per-route limiter
    fn build_limiter(requests_per_min: u32) -> Governor<PeerIpKeyExtractor, NoOpMiddleware> {
        let per_ms = if requests_per_min == 0 {
            1
        } else {
            60_000 / requests_per_min as u64
        };
        let cfg = GovernorConfigBuilder::default()
            .per_millisecond(per_ms)
            .burst_size(requests_per_min)
            .key_extractor(PeerIpKeyExtractor)
            .finish()
            .unwrap();
        Governor::new(&cfg)
    }

    let punch_limiter = Arc::new(build_limiter(config.rate_punch_per_min));
    let admin_limiter = Arc::new(build_limiter(config.rate_admin_per_min));
    let query_limiter = Arc::new(build_limiter(config.rate_query_per_min));

    // Realtime channel; clients identify with ?user_id=
    cfg.service(web::resource("/ws").route(web::get().to(ws::connect)));

    cfg.service(
        web::scope(&config.api_prefix)
            .service(
                web::scope("/attendance")
                    // /attendance/punch
                    .service(
                        web::resource("/punch")
                            .wrap(punch_limiter)
                            .route(web::post().to(attendance::punch)),
                    )
                    // /attendance/today/{user_id}
                    .service(
                        web::resource("/today/{user_id}")
                            .wrap(query_limiter.clone())
                            .route(web::get().to(attendance::today)),
                    )
                    // /attendance/history/{user_id}
                    .service(
                        web::resource("/history/{user_id}")
                            .wrap(query_limiter.clone())
                            .route(web::get().to(attendance::history)),
                    )
                    // /attendance (bulk clear)
                    .service(
                        web::resource("")
                            .wrap(admin_limiter.clone())
                            .route(web::delete().to(attendance::clear)),
                    ),
            )
            .service(
                web::scope("/approvals")
                    // /approvals
                    .service(
                        web::resource("")
                            .wrap(query_limiter.clone())
                            .route(web::get().to(approval::list)),
                    )
                    // /approvals/{id}/status
                    .service(
                        web::resource("/{id}/status")
                            .wrap(admin_limiter.clone())
                            .route(web::put().to(approval::decide)),
                    ),
            )
            .service(
                web::scope("/permissions")
                    // /permissions
                    .service(
                        web::resource("")
                            .wrap(query_limiter)
                            .route(web::get().to(permission::list))
                            .route(web::post().to(permission::create)),
                    )
                    // /permissions/{id}/status
                    .service(
                        web::resource("/{id}/status")
                            .wrap(admin_limiter)
                            .route(web::put().to(permission::decide)),
                    ),
            ),
    );
}
