use crate::{
    api::{balances, engineer_transactions, payments},
    config::Config,
};
use actix_governor::{
    GovernorConfig, GovernorConfigBuilder, PeerIpKeyExtractor,
    governor::middleware::NoOpMiddleware, Governor,
};
use actix_web::web;

pub fn configure(cfg: &mut web::ServiceConfig, config: &Config) {
    // Helper to build a per-class limiter config
    fn build_limiter(requests_per_min: u32) -> GovernorConfig<PeerIpKeyExtractor, NoOpMiddleware> {
        let per_ms = 60_000 / u64::from(requests_per_min.max(1));
        GovernorConfigBuilder::default()
            .per_millisecond(per_ms.max(1))
            .burst_size(requests_per_min.max(1))
            .key_extractor(PeerIpKeyExtractor)
            .finish()
            .expect("limiter period and burst are non-zero")
    }

    let read_limiter = build_limiter(config.rate_read_per_min);
    let write_limiter = build_limiter(config.rate_write_per_min);

    cfg.service(
        web::scope(&config.api_prefix)
            .service(
                web::scope("/sites/{site_id}")
                    // /sites/{site_id}/balances
                    .service(
                        web::resource("/balances")
                            .wrap(Governor::new(&read_limiter))
                            .route(web::get().to(balances::site_balances)),
                    )
                    // /sites/{site_id}/weeks
                    .service(
                        web::resource("/weeks")
                            .wrap(Governor::new(&read_limiter))
                            .route(web::get().to(balances::site_weeks)),
                    )
                    // /sites/{site_id}/payments/preview
                    .service(
                        web::resource("/payments/preview")
                            .wrap(Governor::new(&read_limiter))
                            .route(web::post().to(payments::preview_payment)),
                    )
                    // /sites/{site_id}/payments
                    .service(
                        web::resource("/payments")
                            .wrap(Governor::new(&write_limiter))
                            .route(web::post().to(payments::record_payment)),
                    ),
            )
            // /payments/{payment_id}/cancel
            .service(
                web::resource("/payments/{payment_id}/cancel")
                    .wrap(Governor::new(&write_limiter))
                    .route(web::post().to(payments::cancel_payment)),
            )
            // /engineer-transactions/{transaction_id}/settle
            .service(
                web::resource("/engineer-transactions/{transaction_id}/settle")
                    .wrap(Governor::new(&write_limiter))
                    .route(web::put().to(engineer_transactions::settle_transaction)),
            ),
    );
}
