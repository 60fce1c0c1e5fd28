//! Server construction and route wiring.

pub mod config;

pub use config::{AppConfig, ConfigError, DetectConfig, TransportMode};

use actix_web::dev::{ServiceFactory, ServiceRequest, ServiceResponse};
use actix_web::{App, web};

#[cfg(debug_assertions)]
use utoipa::OpenApi;
#[cfg(debug_assertions)]
use utoipa_swagger_ui::SwaggerUi;

use crate::api::health::{HealthState, live, ready};
use crate::api::recognize::recognize;
use crate::api::sessions::{
    close_session, create_session, open_session, preclose_session, session_details,
};
#[cfg(debug_assertions)]
use crate::doc::ApiDoc;
use crate::domain::SessionWorkflow;
use crate::middleware::Trace;

/// Shared state handed to every worker's app instance.
#[derive(Clone)]
pub struct AppDependencies {
    pub health_state: web::Data<HealthState>,
    pub workflow: web::Data<SessionWorkflow>,
}

/// Assemble the application: tracing middleware, workflow endpoints, probes
/// and (in debug builds) the Swagger UI.
pub fn build_app(
    deps: AppDependencies,
) -> App<
    impl ServiceFactory<
        ServiceRequest,
        Config = (),
        Response = ServiceResponse,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    let AppDependencies {
        health_state,
        workflow,
    } = deps;

    #[cfg_attr(not(debug_assertions), allow(unused_mut))]
    let mut app = App::new()
        .app_data(health_state)
        .app_data(workflow)
        .wrap(Trace)
        .service(create_session)
        .service(open_session)
        .service(preclose_session)
        .service(close_session)
        .service(session_details)
        .service(recognize)
        .service(ready)
        .service(live);

    #[cfg(debug_assertions)]
    {
        app = app.service(SwaggerUi::new("/docs/{_:.*}").url("/api-docs/openapi.json", ApiDoc::openapi()));
    }

    app
}
