use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Cascara API",
        version = "0.1.0",
        description = "Bulk web content extraction with cascading fetch strategies."
    ),
    paths(
        crate::routes::create_job,
        crate::routes::list_jobs,
        crate::routes::get_job,
        crate::routes::start_job,
        crate::routes::pause_job,
        crate::routes::stop_job,
        crate::routes::get_progress,
        crate::routes::get_logs,
        crate::routes::list_urls,
        crate::routes::list_results,
        crate::routes::health,
    ),
    components(schemas(
        crate::dto::CreateJobBody,
        crate::dto::JobSettingsDto,
        crate::dto::RuleDto,
        crate::dto::CreateJobResponse,
        crate::dto::JobResponse,
        crate::dto::JobListResponse,
        crate::dto::ControlResponse,
        crate::dto::ProgressResponse,
        crate::dto::LogEventResponse,
        crate::dto::LogsResponse,
        crate::dto::UrlResponse,
        crate::dto::UrlListResponse,
        crate::dto::ResultResponse,
        crate::dto::ResultListResponse,
        crate::dto::HealthResponse,
        crate::dto::ErrorResponse,
    )),
    tags(
        (name = "jobs", description = "Extraction job management"),
        (name = "system", description = "Health and system status"),
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

/// Adds Bearer token security scheme to the OpenAPI spec.
struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer",
                utoipa::openapi::security::SecurityScheme::Http(
                    utoipa::openapi::security::HttpBuilder::new()
                        .scheme(utoipa::openapi::security::HttpAuthScheme::Bearer)
                        .bearer_format("token")
                        .description(Some(
                            "Admin API key. Set via CASCARA_SERVER_API_KEY environment variable.",
                        ))
                        .build(),
                ),
            );
        }
    }
}
