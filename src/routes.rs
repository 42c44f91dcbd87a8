use crate::{
    api::{absence, break_type, clock, company, employee, holiday, report, schedule, vacation},
    auth::{handlers, middleware::auth_middleware},
    config::Config,
};
use actix_governor::{
    Governor, GovernorConfigBuilder, PeerIpKeyExtractor, governor::middleware::NoOpMiddleware,
};
use actix_web::{middleware::from_fn, web};
use anyhow::{Context, Result};
use std::sync::Arc;

type Limiter = Arc<Governor<PeerIpKeyExtractor, NoOpMiddleware>>;

/// Per-route rate limiters, built once and shared by every worker.
#[derive(Clone)]
pub struct Limiters {
    login: Limiter,
    refresh: Limiter,
    protected: Limiter,
}

fn build_limiter(requests_per_min: u32) -> Result<Limiter> {
    let requests_per_min = requests_per_min.max(1);
    let per_ms = (60_000 / u64::from(requests_per_min)).max(1);

    let cfg = GovernorConfigBuilder::default()
        .per_millisecond(per_ms)
        .burst_size(requests_per_min)
        .key_extractor(PeerIpKeyExtractor)
        .finish()
        .with_context(|| format!("invalid rate limit: {requests_per_min}/min"))?;

    Ok(Arc::new(Governor::new(&cfg)))
}

impl Limiters {
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self {
            login: build_limiter(config.rate_login_per_min)?,
            refresh: build_limiter(config.rate_refresh_per_min)?,
            protected: build_limiter(config.rate_protected_per_min)?,
        })
    }
}

pub fn configure(cfg: &mut web::ServiceConfig, config: &Config, limiters: &Limiters) {
    // Public routes
    cfg.service(
        web::scope("/auth")
            .service(
                web::resource("/login")
                    .wrap(limiters.login.clone())
                    .route(web::post().to(handlers::login)),
            )
            .service(
                web::resource("/refresh")
                    .wrap(limiters.refresh.clone())
                    .route(web::post().to(handlers::refresh_token)),
            )
            .service(
                web::resource("/logout")
                    .wrap(limiters.login.clone())
                    .route(web::post().to(handlers::logout)),
            ),
    );

    // Protected routes
    cfg.service(
        web::scope(&config.api_prefix)
            .wrap(from_fn(auth_middleware)) // authentication
            .wrap(limiters.protected.clone()) // rate limiting
            .service(web::resource("/users").route(web::post().to(handlers::create_user)))
            .service(
                web::scope("/clock")
                    .service(web::resource("/in").route(web::post().to(clock::clock_in)))
                    .service(web::resource("/out").route(web::post().to(clock::clock_out)))
                    .service(
                        web::resource("/break-start").route(web::post().to(clock::break_start)),
                    )
                    .service(web::resource("/break-end").route(web::post().to(clock::break_end)))
                    .service(web::resource("/events").route(web::get().to(clock::list_events))),
            )
            .service(
                web::scope("/employees")
                    // /employees
                    .service(
                        web::resource("")
                            .route(web::post().to(employee::create_employee))
                            .route(web::get().to(employee::list_employees)),
                    )
                    // /employees/{id}
                    .service(
                        web::resource("/{id}")
                            .route(web::put().to(employee::update_employee))
                            .route(web::get().to(employee::get_employee))
                            .route(web::delete().to(employee::deactivate_employee)),
                    ),
            )
            .service(
                web::scope("/absences")
                    .service(
                        web::resource("")
                            .route(web::get().to(absence::list_absences))
                            .route(web::post().to(absence::create_absence)),
                    )
                    .service(
                        web::resource("/{id}")
                            .route(web::get().to(absence::get_absence))
                            .route(web::delete().to(absence::cancel_absence)),
                    )
                    .service(
                        web::resource("/{id}/approve")
                            .route(web::put().to(absence::approve_absence)),
                    )
                    .service(
                        web::resource("/{id}/reject").route(web::put().to(absence::reject_absence)),
                    ),
            )
            .service(
                web::scope("/schedules")
                    .service(
                        web::resource("")
                            .route(web::get().to(schedule::list_schedules))
                            .route(web::post().to(schedule::create_schedule)),
                    )
                    .service(
                        web::resource("/assignments")
                            .route(web::get().to(schedule::list_assignments))
                            .route(web::post().to(schedule::create_assignment)),
                    )
                    .service(
                        web::resource("/assignments/{id}")
                            .route(web::delete().to(schedule::delete_assignment)),
                    ),
            )
            .service(
                web::scope("/holidays")
                    .service(
                        web::resource("")
                            .route(web::get().to(holiday::list_holidays))
                            .route(web::post().to(holiday::create_holiday)),
                    )
                    .service(
                        web::resource("/{id}").route(web::delete().to(holiday::delete_holiday)),
                    ),
            )
            .service(
                web::resource("/break-types")
                    .route(web::get().to(break_type::list_break_types))
                    .route(web::post().to(break_type::create_break_type)),
            )
            .service(
                web::scope("/vacation")
                    .service(
                        web::resource("/policy")
                            .route(web::get().to(vacation::get_policy))
                            .route(web::put().to(vacation::put_policy)),
                    )
                    .service(
                        web::resource("/balances").route(web::get().to(vacation::list_balances)),
                    )
                    .service(
                        web::resource("/balances/recalculate")
                            .route(web::post().to(vacation::recalculate)),
                    ),
            )
            .service(
                web::resource("/company")
                    .route(web::get().to(company::get_company))
                    .route(web::put().to(company::update_company)),
            )
            .service(web::resource("/reports/{kind}").route(web::get().to(report::get_report))),
    );
}

// LOGIN
//  ├─ access_token (15 min)
//  └─ refresh_token (7 days)

// API REQUEST
//  └─ Authorization: Bearer access_token

// ACCESS EXPIRED
//  └─ POST /auth/refresh with refresh_token
//       └─ returns a new pair, old refresh token revoked

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_rate_still_builds_a_limiter() {
        assert!(build_limiter(0).is_ok());
        assert!(build_limiter(120_000).is_ok());
    }
}
