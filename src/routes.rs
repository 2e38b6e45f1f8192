use crate::{
    api::{attendance, biometric, device, overtime},
    auth::middleware::auth_middleware,
    config::Config,
};
use actix_governor::{
    Governor, GovernorConfigBuilder, PeerIpKeyExtractor, governor::middleware::NoOpMiddleware,
};
use actix_web::{middleware::from_fn, web};
use std::sync::Arc;

// Helper to build per-route limiter
fn build_limiter(requests_per_min: u32) -> Governor<PeerIpKeyExtractor, NoOpMiddleware> {
    let requests_per_min = requests_per_min.max(1);
    let per_ms = (60_000 / u64::from(requests_per_min)).max(1);
    let cfg = GovernorConfigBuilder::default()
        .per_millisecond(per_ms)
        .burst_size(requests_per_min)
        .key_extractor(PeerIpKeyExtractor)
        .finish()
        .expect("non-zero period and burst size");
    Governor::new(&cfg)
}

pub fn configure(cfg: &mut web::ServiceConfig, config: &Config) {
    let protected_limiter = Arc::new(build_limiter(config.rate_protected_per_min));
    let checkin_limiter = Arc::new(build_limiter(config.rate_checkin_per_min));

    // Everything is behind the bearer token
    cfg.service(
        web::scope(&config.api_prefix)
            .wrap(from_fn(auth_middleware)) // authentication
            .wrap(protected_limiter) // rate limiting
            .service(
                web::scope("/attendance")
                    // /attendance/mobile-checkin
                    .service(
                        web::resource("/mobile-checkin")
                            .wrap(checkin_limiter)
                            .route(web::post().to(attendance::mobile_checkin)),
                    )
                    .service(
                        web::resource("/process")
                            .route(web::post().to(attendance::process_attendance)),
                    )
                    .service(
                        web::resource("/summary")
                            .route(web::post().to(attendance::anomaly_summary)),
                    )
                    .service(
                        web::resource("/processor-logs")
                            .route(web::get().to(attendance::processor_logs)),
                    )
                    // /attendance/overtime
                    .service(
                        web::resource("/overtime")
                            .route(web::get().to(overtime::get_overtime_summary)),
                    )
                    .service(
                        web::resource("/overtime/process")
                            .route(web::post().to(overtime::process_overtime)),
                    ),
            )
            .service(
                web::scope("/biometric").service(
                    web::resource("/punches").route(web::post().to(biometric::push_punches)),
                ),
            )
            .service(
                web::scope("/devices")
                    .service(web::resource("/test").route(web::post().to(device::test_device))),
            ),
    );
}
