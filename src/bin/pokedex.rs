use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use miette::IntoDiagnostic;
use tracing::warn;
use tracing_subscriber::EnvFilter;

use pokedex_browser::aggregator::CatalogFetcher;
use pokedex_browser::app::{LoadOutcome, Session};
use pokedex_browser::config::{Config, ConfigLoader};
use pokedex_browser::error::PokedexError;
use pokedex_browser::output::{JsonOutput, OutputMode};
use pokedex_browser::pokeapi::PokeApiHttpClient;
use pokedex_browser::store::CatalogStore;
use pokedex_browser::tui::Tui;

#[derive(Parser)]
#[command(name = "pokedex")]
#[command(about = "Browse, filter and page through the Pokédex fetched from PokeAPI")]
#[command(version, author)]
struct Cli {
    #[arg(long, global = true)]
    non_interactive: bool,

    #[arg(long, global = true)]
    config: Option<String>,

    #[arg(long, global = true, help = "Number of pokemon to request from the list endpoint")]
    limit: Option<usize>,

    #[arg(long, global = true, help = "Language of the species description, e.g. en or es")]
    locale: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Print one page of the (optionally filtered) catalog as JSON")]
    List(ListArgs),
    #[command(about = "Print a single pokemon as JSON")]
    Show(ShowArgs),
}

#[derive(Args)]
struct ListArgs {
    #[arg(long)]
    search: Option<String>,

    #[arg(long, default_value_t = 1)]
    page: usize,

    #[arg(long)]
    per_page: Option<usize>,
}

#[derive(Args)]
struct ShowArgs {
    name: String,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(err) = report.downcast_ref::<PokedexError>() {
            return ExitCode::from(map_exit_code(err));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &PokedexError) -> u8 {
    match error {
        PokedexError::PokemonNotFound(_)
        | PokedexError::InvalidPageSize(_)
        | PokedexError::InvalidConfig(_)
        | PokedexError::ConfigRead(_)
        | PokedexError::ConfigParse(_) => 2,
        PokedexError::Network { .. } | PokedexError::Status { .. } | PokedexError::Parse { .. } => {
            3
        }
        _ => 1,
    }
}

fn run() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let output_mode = if cli.non_interactive {
        OutputMode::NonInteractive
    } else {
        OutputMode::Interactive
    };

    let mut session = build_session(&cli)?;

    match cli.command {
        Some(Commands::List(args)) => run_list(args, &mut session),
        Some(Commands::Show(args)) => run_show(args, &mut session),
        None => match output_mode {
            OutputMode::Interactive => Tui::new().run(&mut session),
            OutputMode::NonInteractive => Err(miette::Report::msg(
                "command required (try `pokedex --help`)",
            )),
        },
    }
}

fn build_session(cli: &Cli) -> miette::Result<Session<PokeApiHttpClient>> {
    let config = ConfigLoader::read(cli.config.as_deref())?;
    let config = Config {
        limit: cli.limit.or(config.limit),
        locale: cli.locale.clone().or(config.locale),
        ..config
    };
    let resolved = ConfigLoader::resolve_config(config)?;

    let client = PokeApiHttpClient::new(resolved.timeout)?;
    let fetcher = CatalogFetcher::new(client, resolved.fetch_settings());
    let store = CatalogStore::new(resolved.items_per_page)?;
    Ok(Session::new(fetcher, store))
}

fn load(session: &mut Session<PokeApiHttpClient>) -> miette::Result<()> {
    match session.load(&JsonOutput)? {
        LoadOutcome::Applied(_) => Ok(()),
        LoadOutcome::Discarded => Err(PokedexError::Cancelled.into()),
    }
}

fn run_list(args: ListArgs, session: &mut Session<PokeApiHttpClient>) -> miette::Result<()> {
    load(session)?;

    let store = session.store_mut();
    if let Some(per_page) = args.per_page {
        store.set_items_per_page(per_page)?;
    }
    if let Some(search) = args.search.as_deref() {
        store.set_search_text(search);
    }
    if args.page != 1 && !store.go_to_page(args.page) {
        warn!(
            page = args.page,
            total_pages = store.total_pages(),
            "page out of range, showing page 1"
        );
    }

    JsonOutput::print_list(&session.list()).into_diagnostic()
}

fn run_show(args: ShowArgs, session: &mut Session<PokeApiHttpClient>) -> miette::Result<()> {
    load(session)?;
    let result = session.show(&args.name)?;
    JsonOutput::print_show(&result).into_diagnostic()
}
