use std::sync::Once;

use metrics::{Unit, describe_counter, describe_histogram};
use tracing::level_filters::LevelFilter;
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    EnvFilter, Registry, fmt,
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
};

use crate::config::{LogFormat, LoggingSettings};

use super::error::InfraError;

/// Directive overrides, e.g. `FOLIO_LOG=folio::http=debug`.
pub const FILTER_ENV: &str = "FOLIO_LOG";

const COUNTERS: [(&str, &str); 2] = [
    (
        "folio_views_recorded_total",
        "Total number of post views recorded.",
    ),
    (
        "folio_recommendations_served_total",
        "Total number of related-post lists computed.",
    ),
];

static METRIC_DESCRIPTIONS: Once = Once::new();

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Install the global subscriber. Fails if one is already installed.
pub fn init(logging: &LoggingSettings) -> Result<(), InfraError> {
    describe_metrics();

    tracing_subscriber::registry()
        .with(output_layer(logging.format))
        .with(ErrorLayer::default())
        .with(filter(logging.level))
        .try_init()
        .map_err(|err| InfraError::telemetry(err.to_string()))
}

fn filter(level: LevelFilter) -> EnvFilter {
    EnvFilter::builder()
        .with_default_directive(level.into())
        .with_env_var(FILTER_ENV)
        .from_env_lossy()
}

fn output_layer(format: LogFormat) -> BoxedLayer {
    match format {
        LogFormat::Json => fmt::layer()
            .json()
            .flatten_event(true)
            .with_current_span(true)
            .boxed(),
        LogFormat::Compact => fmt::layer().compact().with_target(true).boxed(),
    }
}

fn describe_metrics() {
    METRIC_DESCRIPTIONS.call_once(|| {
        for (name, description) in COUNTERS {
            describe_counter!(name, Unit::Count, description);
        }
        describe_histogram!(
            "folio_recommendation_rank_ms",
            Unit::Milliseconds,
            "Time spent loading and ranking related posts."
        );
    });
}
