use actix_web::dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform};
use actix_web::{Error, HttpResponse};
use futures::future::{ready, LocalBoxFuture, Ready};
use once_cell::sync::Lazy;
use prometheus::{
    register_int_counter_vec, Encoder, HistogramOpts, HistogramVec, IntCounterVec, Opts,
    Registry, TextEncoder,
};
use std::rc::Rc;
use std::time::{Duration, Instant};

/// Like toggles by target kind and outcome (liked, unliked, race)
static LIKE_TOGGLES_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "engagement_like_toggles_total",
        "Like toggles processed, by target and outcome",
        &["target", "outcome"]
    )
    .expect("register engagement_like_toggles_total")
});

static COMMENT_OPERATIONS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "engagement_comment_operations_total",
        "Comment mutations, by operation",
        &["operation"]
    )
    .expect("register engagement_comment_operations_total")
});

/// Notification side effects by kind and outcome
/// (created, deduplicated, self_skipped, retracted, failed)
static NOTIFICATIONS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "engagement_notifications_total",
        "Notification side effects, by kind and outcome",
        &["kind", "outcome"]
    )
    .expect("register engagement_notifications_total")
});

static HTTP_METRICS: Lazy<HttpMetrics> = Lazy::new(|| {
    HttpMetrics::register(prometheus::default_registry())
        .expect("register engagement-service http metrics")
});

pub fn record_like_toggle(target: &str, outcome: &str) {
    LIKE_TOGGLES_TOTAL.with_label_values(&[target, outcome]).inc();
}

pub fn record_comment_operation(operation: &str) {
    COMMENT_OPERATIONS_TOTAL
        .with_label_values(&[operation])
        .inc();
}

pub fn record_notification(kind: &str, outcome: &str) {
    NOTIFICATIONS_TOTAL.with_label_values(&[kind, outcome]).inc();
}

/// Request count and latency, labelled by method, route template and status
#[derive(Clone)]
pub struct HttpMetrics {
    requests: IntCounterVec,
    latency: HistogramVec,
}

impl HttpMetrics {
    const LABELS: [&'static str; 3] = ["method", "route", "status"];

    pub fn register(registry: &Registry) -> prometheus::Result<Self> {
        let requests = IntCounterVec::new(
            Opts::new(
                "engagement_http_requests_total",
                "HTTP requests handled, by route and status",
            ),
            &Self::LABELS,
        )?;
        let latency = HistogramVec::new(
            HistogramOpts::new(
                "engagement_http_request_duration_seconds",
                "HTTP request latency, by route and status",
            )
            .buckets(vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5]),
            &Self::LABELS,
        )?;
        registry.register(Box::new(requests.clone()))?;
        registry.register(Box::new(latency.clone()))?;
        Ok(Self { requests, latency })
    }

    pub fn observe(&self, method: &str, route: &str, status: u16, elapsed: Duration) {
        let status = status.to_string();
        let labels = [method, route, status.as_str()];
        self.requests.with_label_values(&labels).inc();
        self.latency
            .with_label_values(&labels)
            .observe(elapsed.as_secs_f64());
    }
}

pub async fn serve_metrics() -> HttpResponse {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    if let Err(err) = encoder.encode(&prometheus::gather(), &mut buffer) {
        return HttpResponse::InternalServerError().body(err.to_string());
    }

    HttpResponse::Ok()
        .content_type(encoder.format_type())
        .body(buffer)
}

/// Records every request into [`HttpMetrics`]; the default instance
/// reports to the process-wide registry served at `/metrics`
#[derive(Clone)]
pub struct MetricsMiddleware {
    metrics: HttpMetrics,
}

impl MetricsMiddleware {
    pub fn new(metrics: HttpMetrics) -> Self {
        Self { metrics }
    }
}

impl Default for MetricsMiddleware {
    fn default() -> Self {
        Self::new(HTTP_METRICS.clone())
    }
}

impl<S, B> Transform<S, ServiceRequest> for MetricsMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Transform = MetricsMiddlewareService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(MetricsMiddlewareService {
            service: Rc::new(service),
            metrics: self.metrics.clone(),
        }))
    }
}

pub struct MetricsMiddlewareService<S> {
    service: Rc<S>,
    metrics: HttpMetrics,
}

impl<S, B> Service<ServiceRequest> for MetricsMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = self.service.clone();
        let metrics = self.metrics.clone();
        let start = Instant::now();
        let method = req.method().to_string();
        // Route template, so ids stay out of the label set
        let route = req
            .match_pattern()
            .unwrap_or_else(|| "unmatched".to_string());

        Box::pin(async move {
            let result = service.call(req).await;
            let status = match &result {
                Ok(res) => res.status(),
                Err(err) => err.as_response_error().status_code(),
            };
            metrics.observe(&method, &route, status.as_u16(), start.elapsed());
            result
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{test, web, App};

    fn sample_count(registry: &Registry, name: &str, route: &str, status: &str) -> u64 {
        registry
            .gather()
            .iter()
            .filter(|family| family.get_name() == name)
            .flat_map(|family| family.get_metric().iter())
            .filter(|metric| {
                let labels = metric.get_label();
                labels
                    .iter()
                    .any(|l| l.get_name() == "route" && l.get_value() == route)
                    && labels
                        .iter()
                        .any(|l| l.get_name() == "status" && l.get_value() == status)
            })
            .map(|metric| metric.get_counter().get_value() as u64)
            .sum()
    }

    #[core::prelude::v1::test]
    fn test_domain_counters_are_exported() {
        record_like_toggle("post", "liked");
        record_notification("POST_LIKE", "created");
        record_comment_operation("create");

        let names: Vec<String> = prometheus::gather()
            .iter()
            .map(|family| family.get_name().to_string())
            .collect();
        assert!(names.contains(&"engagement_like_toggles_total".to_string()));
        assert!(names.contains(&"engagement_notifications_total".to_string()));
        assert!(names.contains(&"engagement_comment_operations_total".to_string()));
    }

    #[actix_web::test]
    async fn test_requests_are_labelled_by_route_template() {
        let registry = Registry::new();
        let metrics = HttpMetrics::register(&registry).unwrap();
        let app = test::init_service(
            App::new()
                .wrap(MetricsMiddleware::new(metrics))
                .route(
                    "/items/{id}",
                    web::get().to(|| async { HttpResponse::Ok().finish() }),
                ),
        )
        .await;

        for id in ["a", "b"] {
            let req = test::TestRequest::get()
                .uri(&format!("/items/{}", id))
                .to_request();
            test::call_service(&app, req).await;
        }
        let req = test::TestRequest::get().uri("/nowhere").to_request();
        test::call_service(&app, req).await;

        let total = "engagement_http_requests_total";
        assert_eq!(sample_count(&registry, total, "/items/{id}", "200"), 2);
        assert_eq!(sample_count(&registry, total, "/items/a", "200"), 0);
        assert_eq!(sample_count(&registry, total, "unmatched", "404"), 1);
    }

    #[core::prelude::v1::test]
    fn test_http_metrics_register_once_per_registry() {
        let registry = Registry::new();
        assert!(HttpMetrics::register(&registry).is_ok());
        assert!(HttpMetrics::register(&registry).is_err());
    }
}
