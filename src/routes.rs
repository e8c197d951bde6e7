use crate::{
    api::{attendance, leave_balance, leave_request, loan, payroll, request},
    auth::{handlers, middleware::auth_middleware},
    config::Config,
};
use actix_governor::{
    Governor, GovernorConfig, GovernorConfigBuilder, PeerIpKeyExtractor, governor::middleware::NoOpMiddleware,
};
use actix_web::{middleware::from_fn, web};
use std::sync::Arc;

fn build_limiter(requests_per_min: u32) -> Governor<PeerIpKeyExtractor, NoOpMiddleware> {
    let per_ms = if requests_per_min == 0 {
        1
    } else {
        (60_000 / u64::from(requests_per_min)).max(1)
    };
    let cfg = GovernorConfigBuilder::default()
        .milliseconds_per_request(per_ms)
        .burst_size(requests_per_min.max(1))
        .key_extractor(PeerIpKeyExtractor)
        .finish()
        .unwrap_or_else(|| {
            tracing::warn!(requests_per_min, "Rejected rate limit, using governor defaults");
            GovernorConfig::default()
        });
    Governor::new(&cfg)
}

pub fn configure(cfg: &mut web::ServiceConfig, config: Config) {
    let login_limiter = Arc::new(build_limiter(config.rate_login_per_min));
    let register_limiter = Arc::new(build_limiter(config.rate_register_per_min));
    let refresh_limiter = Arc::new(build_limiter(config.rate_refresh_per_min));
    let protected_limiter = Arc::new(build_limiter(config.rate_protected_per_min));

    // Public routes
    cfg.service(
        web::scope("/auth")
            .service(
                web::resource("/login")
                    .wrap(login_limiter.clone())
                    .route(web::post().to(handlers::login)),
            )
            .service(
                web::resource("/register")
                    .wrap(register_limiter.clone())
                    .route(web::post().to(handlers::register)),
            )
            .service(
                web::resource("/refresh")
                    .wrap(refresh_limiter.clone())
                    .route(web::post().to(handlers::refresh_token)),
            )
            .service(
                web::resource("/logout")
                    .wrap(login_limiter.clone())
                    .route(web::post().to(handlers::logout)),
            ),
    );

    // Protected routes
    cfg.service(
        web::scope(&config.api_prefix)
            .wrap(from_fn(auth_middleware))
            .wrap(protected_limiter)
            .service(web::resource("/me").route(web::get().to(handlers::me)))
            .service(
                web::scope("/attendance")
                    .service(web::resource("/punch").route(web::post().to(attendance::punch)))
                    .service(web::resource("/build").route(web::post().to(attendance::build)))
                    .service(web::resource("/build/cancel").route(web::post().to(attendance::cancel_build)))
                    .service(
                        web::resource("/cycle")
                            .route(web::get().to(attendance::get_cycle))
                            .route(web::put().to(attendance::put_cycle)),
                    )
                    .service(web::resource("/summary").route(web::get().to(attendance::list_summaries)))
                    .service(web::resource("/days").route(web::get().to(attendance::list_days))),
            )
            .service(
                web::scope("/requests")
                    .service(
                        web::resource("")
                            .route(web::get().to(request::list))
                            .route(web::post().to(request::submit)),
                    )
                    .service(web::resource("/{id}/decision").route(web::put().to(request::decide))),
            )
            .service(
                web::scope("/leaves")
                    .service(
                        web::resource("")
                            .route(web::get().to(leave_request::list))
                            .route(web::post().to(leave_request::apply)),
                    )
                    .service(web::resource("/{id}").route(web::get().to(leave_request::get)))
                    .service(web::resource("/{id}/approve").route(web::put().to(leave_request::approve)))
                    .service(web::resource("/{id}/reject").route(web::put().to(leave_request::reject))),
            )
            .service(
                web::scope("/leave-balances")
                    .service(web::resource("").route(web::get().to(leave_balance::list)))
                    .service(web::resource("/generate").route(web::post().to(leave_balance::generate))),
            )
            .service(
                web::scope("/payroll")
                    .service(web::resource("/generate").route(web::post().to(payroll::generate)))
                    .service(web::resource("/generate/cancel").route(web::post().to(payroll::cancel_generate)))
                    .service(web::resource("/freeze").route(web::put().to(payroll::toggle_freeze)))
                    .service(web::resource("/payslips").route(web::get().to(payroll::list_payslips)))
                    .service(
                        web::resource("/payslips/{empid}/{year}/{month}").route(web::get().to(payroll::get_payslip)),
                    )
                    .service(web::resource("/bank/{empid}").route(web::put().to(payroll::backfill_bank)))
                    .service(web::resource("/groups/{empid}").route(web::put().to(payroll::set_group))),
            )
            .service(
                web::scope("/loans")
                    .service(
                        web::resource("")
                            .route(web::get().to(loan::list))
                            .route(web::post().to(loan::apply)),
                    )
                    .service(web::resource("/{id}/installments").route(web::get().to(loan::installments)))
                    .service(web::resource("/{id}/stages/{stage}").route(web::put().to(loan::decide_stage)))
                    .service(web::resource("/{id}/activate").route(web::post().to(loan::activate))),
            ),
    );
}

// LOGIN
//  ├─ access_token (15 min)
//  └─ refresh_token (7 days)

// API REQUEST
//  └─ Authorization: Bearer access_token

// ACCESS EXPIRED
//  └─ POST /auth/refresh with refresh_token
//       └─ returns a rotated pair
