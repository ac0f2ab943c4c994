pub mod api_routes;

use actix_web::{
  dev::ServerHandle,
  middleware,
  web::{get, Data},
  App, HttpResponse, HttpServer,
};
use clap::{Parser, Subcommand};
use loadhaul_api_utils::context::LoadhaulContext;
use loadhaul_db_schema::utils::build_db_pool;
use loadhaul_escrow::events::{job_event_channel, spawn_release_consumer};
use loadhaul_payment::{stripe::StripeGateway, PaymentGateway};
use loadhaul_routes::utils::scheduled_tasks;
use loadhaul_utils::{error::LoadhaulResult, settings::Settings, VERSION};
use mimalloc::MiMalloc;
use serde_json::json;
use std::sync::Arc;
use tokio::signal::unix::SignalKind;
use tracing_actix_web::{DefaultRootSpanBuilder, TracingLogger};

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[derive(Parser, Debug)]
#[command(
  version,
  about = "A freight-brokering backend with escrowed payments",
  long_about = "A freight-brokering backend with escrowed payments.\n\nThis is the Loadhaul API server. It will connect to a PostgreSQL database, run any pending migrations and start accepting API requests."
)]
pub struct CmdArgs {
  /// Don't run scheduled tasks.
  ///
  /// If you are running multiple Loadhaul server processes, you probably want to disable
  /// scheduled tasks on all but one of the processes, to avoid sweeping expired assignments
  /// more often than intended.
  #[arg(long, default_value_t = false, env = "LOADHAUL_DISABLE_SCHEDULED_TASKS")]
  disable_scheduled_tasks: bool,
  #[command(subcommand)]
  subcommand: Option<CmdSubcommand>,
}

#[derive(Subcommand, Debug)]
enum CmdSubcommand {
  /// Do something with migrations, then exit.
  Migration {
    #[command(subcommand)]
    subcommand: MigrationSubcommand,
    /// Stop after there's no remaining migrations.
    #[arg(long, default_value_t = false)]
    all: bool,
    /// Stop after the given number of migrations.
    #[arg(long, default_value_t = 1)]
    number: u64,
  },
}

#[derive(Subcommand, Debug)]
enum MigrationSubcommand {
  /// Run up.sql for pending migrations, oldest to newest.
  Run,
  /// Run down.sql for non-pending migrations, newest to oldest.
  Revert,
}

/// Placing the main function in lib.rs allows other crates to import and embed the server.
pub async fn start_loadhaul_server(args: CmdArgs) -> LoadhaulResult<()> {
  // Configuration is read and validated exactly once; a missing webhook
  // secret or payment key refuses to start here.
  let settings = Settings::init()?;

  if let Some(CmdSubcommand::Migration {
    subcommand,
    all,
    number,
  }) = args.subcommand
  {
    let mut options = match subcommand {
      MigrationSubcommand::Run => loadhaul_db_schema_setup::Options::default().run(),
      MigrationSubcommand::Revert => loadhaul_db_schema_setup::Options::default().revert(),
    }
    .print_output();

    if !all {
      options = options.limit(number);
    }

    loadhaul_db_schema_setup::run(options, &settings.database.url)?;

    return Ok(());
  }

  // Print version number to log
  println!("Starting Loadhaul v{VERSION}");

  loadhaul_db_schema_setup::run(
    loadhaul_db_schema_setup::Options::default().run(),
    &settings.database.url,
  )?;

  // Set up the connection pool
  let pool = build_db_pool(&settings.database)?;

  // The gateway is constructed from explicit settings and shared behind its
  // trait; nothing else in the process touches processor credentials.
  let gateway: Arc<dyn PaymentGateway> =
    Arc::new(StripeGateway::new(&settings.payment, &settings.hostname));

  // The capture-and-payout consumer lives for the whole process; senders keep
  // the channel open through the context.
  let (job_event_tx, job_event_rx) = job_event_channel();
  spawn_release_consumer(
    pool.clone(),
    gateway.clone(),
    settings.payment.currency.clone(),
    job_event_rx,
  );

  let context = LoadhaulContext::create(pool, gateway, settings.clone(), job_event_tx);

  if !args.disable_scheduled_tasks {
    let task_context = Data::new(context.clone());
    tokio::spawn(async move {
      scheduled_tasks::setup(task_context)
        .await
        .inspect_err(|e| tracing::error!("Scheduled tasks failed: {e}"))
        .ok();
    });
  }

  println!(
    "Starting HTTP server at {}:{}",
    settings.bind, settings.port
  );
  let server = create_http_server(context, settings)?;

  let mut interrupt = tokio::signal::unix::signal(SignalKind::interrupt())?;
  let mut terminate = tokio::signal::unix::signal(SignalKind::terminate())?;

  tokio::select! {
    _ = tokio::signal::ctrl_c() => {
      tracing::warn!("Received ctrl-c, shutting down gracefully...");
    }
    _ = interrupt.recv() => {
      tracing::warn!("Received interrupt, shutting down gracefully...");
    }
    _ = terminate.recv() => {
      tracing::warn!("Received terminate, shutting down gracefully...");
    }
  }
  server.stop(true).await;

  Ok(())
}

fn create_http_server(context: LoadhaulContext, settings: Settings) -> LoadhaulResult<ServerHandle> {
  let bind = (settings.bind, settings.port);
  let server = HttpServer::new(move || {
    App::new()
      .wrap(middleware::Logger::new(
        // This is the default log format save for the usage of %{r}a over %a to guarantee to
        // record the client's (forwarded) IP and not the last peer address, since the latter is
        // frequently just a reverse proxy
        "%{r}a '%r' %s %b '%{Referer}i' '%{User-Agent}i' %T",
      ))
      .wrap(middleware::Compress::default())
      .wrap(TracingLogger::<DefaultRootSpanBuilder>::new())
      .app_data(Data::new(context.clone()))
      .configure(api_routes::config)
      .route(
        "/health",
        get().to(|| async { HttpResponse::Ok().json(json!({ "status": "ok" })) }),
      )
  })
  .disable_signals()
  .bind(bind)?
  .run();
  let handle = server.handle();
  tokio::task::spawn(server);
  Ok(handle)
}
