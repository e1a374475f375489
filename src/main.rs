use std::{process, sync::Arc};

use folio::{
    application::{
        admin::AdminPostService,
        engagement::EngagementService,
        error::{AppError, error_chain},
        recommendations::RecommendationService,
        repos::{PostsRepo, PostsWriteRepo, ViewCountsRepo},
    },
    config,
    infra::{
        content::ContentStore,
        error::InfraError,
        http::{self, AdminState, HttpState},
        telemetry,
        views::ViewCounterStore,
    },
};
use serde::Serialize;
use tracing::{Dispatch, Level, dispatcher, error, info};
use tracing_subscriber::fmt as tracing_fmt;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error_chain(error), "application error");
        return;
    }

    let subscriber = tracing_fmt().with_max_level(Level::ERROR).finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error_chain(error), "application error");
    });
}

struct Services {
    posts: Arc<ContentStore>,
    engagement: EngagementService,
    recommendations: RecommendationService,
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli().map_err(|err| {
        InfraError::configuration(format!("failed to load configuration: {err}"))
    })?;

    let command = cli_args
        .command
        .unwrap_or(config::Command::Serve(Box::<config::ServeArgs>::default()));

    telemetry::init(&settings.logging)?;
    let services = build_services(&settings).await?;

    match command {
        config::Command::Serve(_) => run_serve(&settings, services).await,
        config::Command::List(args) => run_list(&services, args).await,
        config::Command::Related(args) => run_related(&services, args).await,
        config::Command::RecordView(args) => run_record_view(&services, args).await,
    }
}

async fn build_services(settings: &config::Settings) -> Result<Services, AppError> {
    let posts = Arc::new(ContentStore::new(settings.content.directory.clone()));
    let views = match settings.views.file.as_ref() {
        Some(path) => ViewCounterStore::open(path.clone()).await?,
        None => ViewCounterStore::in_memory(),
    };
    match views.file() {
        Some(path) => info!(path = %path.display(), "view counters persisted to file"),
        None => info!("view counters kept in memory only"),
    }

    let posts_repo: Arc<dyn PostsRepo> = posts.clone();
    let views_repo: Arc<dyn ViewCountsRepo> = Arc::new(views);
    let engagement = EngagementService::new(posts_repo, views_repo);
    let recommendations = RecommendationService::new(engagement.clone(), settings.recommendations)
        .with_draft_previews(settings.environment.admin_enabled());

    Ok(Services {
        posts,
        engagement,
        recommendations,
    })
}

async fn run_serve(settings: &config::Settings, services: Services) -> Result<(), AppError> {
    let admin = if settings.environment.admin_enabled() {
        let reader: Arc<dyn PostsRepo> = services.posts.clone();
        let writer: Arc<dyn PostsWriteRepo> = services.posts.clone();
        Some(AdminState {
            posts: AdminPostService::new(reader, writer),
        })
    } else {
        None
    };

    info!(
        content = %services.posts.root().display(),
        environment = ?settings.environment,
        admin = admin.is_some(),
        "starting folio"
    );

    let state = HttpState {
        engagement: services.engagement,
        recommendations: services.recommendations,
    };
    let router = http::build_router(state, admin);
    http::serve(settings.server.addr, router, settings.server.graceful_shutdown).await?;
    Ok(())
}

async fn run_list(services: &Services, args: config::ListArgs) -> Result<(), AppError> {
    let posts = if args.popular {
        services.engagement.popular(usize::MAX).await?
    } else {
        services.engagement.list(args.drafts).await?
    };
    print_json(&posts)
}

async fn run_related(services: &Services, args: config::RelatedArgs) -> Result<(), AppError> {
    let related = services.recommendations.related_scored(&args.slug).await?;
    print_json(&related)
}

async fn run_record_view(
    services: &Services,
    args: config::RecordViewArgs,
) -> Result<(), AppError> {
    let views = services.engagement.record_view(&args.slug).await?;
    print_json(&serde_json::json!({ "slug": args.slug, "views": views }))
}

fn print_json<T: Serialize>(value: &T) -> Result<(), AppError> {
    let rendered = serde_json::to_string_pretty(value)
        .map_err(|err| AppError::from(InfraError::from(std::io::Error::other(err))))?;
    println!("{rendered}");
    Ok(())
}
