use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use indy_replay::app::{App, DatasetRequest, IntegrationRequest, ProgressSink, ReplayOptions};
use indy_replay::config::{Settings, SettingsLoader};
use indy_replay::domain::PackageType;
use indy_replay::error::ReplayError;
use indy_replay::git::GitDatasetSource;
use indy_replay::indy::IndyHttpClient;
use indy_replay::output::{
    JsonOutput, LogSink, OutputMode, print_cleanup_summary, print_dataset_summary,
    print_integration_summary, print_replay_summary,
};
use indy_replay::pnc::PncHttpClient;

type HttpApp = App<IndyHttpClient, PncHttpClient, GitDatasetSource>;

#[derive(Parser)]
#[command(name = "indy-replay")]
#[command(about = "Replays recorded Indy build traffic against a target server")]
#[command(version)]
struct Cli {
    /// Settings file (JSON); defaults to ./indy-replay.json when present
    #[arg(long, global = true)]
    config: Option<String>,

    /// Print the run summary as JSON on stdout
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(
        about = "Replay a dataset build against another Indy and promote it into the build target"
    )]
    Migrate(MigrateArgs),
    #[command(
        name = "integrationtest",
        about = "Replay a dataset build, promote it and roll the promotion back"
    )]
    IntegrationTest(IntegrationArgs),
    #[command(
        name = "buildtest",
        about = "Replay a live folo tracking record into scratch repos"
    )]
    BuildTest(BuildTestArgs),
    #[command(about = "Generate a dataset entry from PNC and Indy")]
    Dataset(DatasetArgs),
    #[command(about = "Delete a scratch repository pair")]
    Cleanup(CleanupArgs),
}

#[derive(Args, Clone, Copy)]
struct RunFlags {
    /// Log repo creation, transfers, promotion and cleanup without doing them
    #[arg(long = "dryRun", short = 'd')]
    dry_run: bool,

    /// Drop cached dataset clones and upload sources first
    #[arg(long = "clearCache", short = 'c')]
    clear_cache: bool,

    /// Keep the scratch repos after the run
    #[arg(long = "keepPod", short = 'k')]
    keep_pod: bool,
}

#[derive(Args)]
struct MigrateArgs {
    indy_base_url: String,
    dataset_repo_url: String,
    build_id: String,
    migrate_target_indy: String,
    #[command(flatten)]
    flags: RunFlags,
}

#[derive(Args)]
struct IntegrationArgs {
    indy_base_url: String,
    dataset_repo_url: String,
    build_id: String,
    promote_target: Option<String>,
    #[command(flatten)]
    flags: RunFlags,
}

#[derive(Args)]
struct BuildTestArgs {
    original_indy: String,
    folo_id: String,
    target_indy: String,

    #[arg(long = "packageType", value_enum, default_value_t = PackageType::Maven)]
    package_type: PackageType,

    /// Concurrent transfer workers
    #[arg(long = "processNum")]
    process_num: Option<usize>,

    #[arg(long = "dryRun", short = 'd')]
    dry_run: bool,

    #[arg(long = "clearCache", short = 'c')]
    clear_cache: bool,
}

#[derive(Args)]
struct DatasetArgs {
    pnc_base_url: String,
    indy_base_url: String,
    build_id: String,

    #[arg(long = "groupBuild")]
    group_build: bool,
}

#[derive(Args)]
struct CleanupArgs {
    indy_base_url: String,
    build_name: String,

    #[arg(long = "packageType", value_enum, default_value_t = PackageType::Maven)]
    package_type: PackageType,

    #[arg(long = "dryRun", short = 'd')]
    dry_run: bool,
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let _ = err.print();
            // usage errors exit 1, --help and --version exit 0
            return if err.use_stderr() {
                ExitCode::from(1)
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    if let Err(report) = run(cli) {
        eprintln!("{report:?}");
        if let Some(error) = report.downcast_ref::<ReplayError>() {
            return ExitCode::from(map_exit_code(error));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &ReplayError) -> u8 {
    match error {
        ReplayError::DatasetNotFound(_) => 2,
        ReplayError::IndyHttp(_)
        | ReplayError::IndyStatus { .. }
        | ReplayError::PncHttp(_)
        | ReplayError::PncStatus { .. }
        | ReplayError::GitClone(_)
        | ReplayError::MissingTool(_) => 3,
        _ => 1,
    }
}

fn run(cli: Cli) -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let settings = SettingsLoader::resolve(cli.config.as_deref())?;
    let output_mode = if cli.json {
        OutputMode::Json
    } else {
        OutputMode::Human
    };
    let app = build_app(settings)?;

    match cli.command {
        Commands::Migrate(args) => run_integration(
            &app,
            IntegrationRequest {
                indy_base_url: args.indy_base_url,
                dataset_repo: args.dataset_repo_url,
                build_id: args.build_id,
                promote_target: None,
                migrate_target: Some(args.migrate_target_indy),
                dry_run: args.flags.dry_run,
                clear_cache: args.flags.clear_cache,
                keep_repos: args.flags.keep_pod,
            },
            output_mode,
        ),
        Commands::IntegrationTest(args) => run_integration(
            &app,
            IntegrationRequest {
                indy_base_url: args.indy_base_url,
                dataset_repo: args.dataset_repo_url,
                build_id: args.build_id,
                promote_target: args.promote_target,
                migrate_target: None,
                dry_run: args.flags.dry_run,
                clear_cache: args.flags.clear_cache,
                keep_repos: args.flags.keep_pod,
            },
            output_mode,
        ),
        Commands::BuildTest(args) => run_build_test(&app, args, output_mode),
        Commands::Dataset(args) => run_dataset(&app, args, output_mode),
        Commands::Cleanup(args) => run_cleanup(&app, args, output_mode),
    }
}

fn build_app(settings: Settings) -> Result<HttpApp, ReplayError> {
    let indy = IndyHttpClient::new(settings.http_timeout_secs)?;
    let pnc = PncHttpClient::new(settings.http_timeout_secs)?;
    let datasets = GitDatasetSource::new(settings.cache_dir.clone());
    Ok(App::new(settings, indy, pnc, datasets))
}

fn sink_for(output_mode: OutputMode) -> &'static dyn ProgressSink {
    match output_mode {
        OutputMode::Json => &JsonOutput,
        OutputMode::Human => &LogSink,
    }
}

fn run_integration(
    app: &HttpApp,
    request: IntegrationRequest,
    output_mode: OutputMode,
) -> miette::Result<()> {
    let result = app
        .integration_test(request, sink_for(output_mode))?;
    match output_mode {
        OutputMode::Json => JsonOutput::print_integration(&result).into_diagnostic(),
        OutputMode::Human => {
            print_integration_summary(&result);
            Ok(())
        }
    }
}

fn run_build_test(
    app: &HttpApp,
    args: BuildTestArgs,
    output_mode: OutputMode,
) -> miette::Result<()> {
    let options = ReplayOptions {
        dry_run: args.dry_run,
        clear_cache: args.clear_cache,
        workers: args
            .process_num
            .unwrap_or(app.settings().workers)
            .max(1),
    };
    let result = app
        .build_test(
            &args.original_indy,
            &args.folo_id,
            &args.target_indy,
            args.package_type,
            options,
            sink_for(output_mode),
        )?;
    match output_mode {
        OutputMode::Json => JsonOutput::print_replay(&result).into_diagnostic(),
        OutputMode::Human => {
            print_replay_summary(&result);
            Ok(())
        }
    }
}

fn run_dataset(app: &HttpApp, args: DatasetArgs, output_mode: OutputMode) -> miette::Result<()> {
    let request = DatasetRequest {
        pnc_base_url: args.pnc_base_url,
        indy_base_url: args.indy_base_url,
        build_id: args.build_id,
        group_build: args.group_build,
    };
    let result = app
        .generate_dataset(request, sink_for(output_mode))?;
    match output_mode {
        OutputMode::Json => JsonOutput::print_dataset(&result).into_diagnostic(),
        OutputMode::Human => {
            print_dataset_summary(&result);
            Ok(())
        }
    }
}

fn run_cleanup(app: &HttpApp, args: CleanupArgs, output_mode: OutputMode) -> miette::Result<()> {
    let result = app.cleanup(
        &args.indy_base_url,
        args.package_type,
        &args.build_name,
        args.dry_run,
    );
    match output_mode {
        OutputMode::Json => JsonOutput::print_cleanup(&result).into_diagnostic(),
        OutputMode::Human => {
            print_cleanup_summary(&result);
            Ok(())
        }
    }
}
