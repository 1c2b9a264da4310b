use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use tracing::info;

use tickets_tui::{
    app::{self, App, DeckSource},
    config::{Config, Overrides},
    convert,
    input::InputMapper,
    logging::{self, Verbosity},
    session::SessionStore,
    storage::FileStore,
    ui::{theme_of, ThemeKind},
    worker::{self, CacheStorage, CacheWorker},
};

// ---------------- CLI ----------------

#[derive(Debug, Clone, Parser)]
#[command(name = "tickets-tui", about = "Экзаменационные билеты в терминале", version)]
struct Cli {
    /// Источник данных: URL или каталог с tickets.json
    #[arg(long, global = true)]
    origin: Option<String>,

    /// Путь к tickets.toml
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Тема: dark | light
    #[arg(long, value_enum, global = true)]
    theme: Option<ThemeKind>,

    /// Не запускать офлайн-кэш
    #[arg(long = "no-cache", action = ArgAction::SetTrue, global = true)]
    no_cache: bool,

    /// Подробнее в журнале (-v, -vv)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Только ошибки
    #[arg(short, long, action = ArgAction::SetTrue, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Option<Cmd>,
}

#[derive(Debug, Clone, Subcommand)]
enum Cmd {
    /// Учить билеты (по умолчанию)
    Study,
    /// Преобразовать таблицу (xlsx/ods или CSV) в tickets.json
    Convert {
        input: PathBuf,
        #[arg(short, long, default_value = "tickets.json")]
        output: PathBuf,
        /// Разделитель столбцов; по умолчанию определяется по заголовку
        #[arg(long)]
        delimiter: Option<char>,
    },
    /// Сбросить сохранённый прогресс
    Reset,
    /// Управление офлайн-кэшем
    Cache {
        #[command(subcommand)]
        action: CacheCmd,
    },
}

#[derive(Debug, Clone, Copy, Subcommand)]
enum CacheCmd {
    /// Показать хранилища кэша
    Status,
    /// Удалить все хранилища кэша
    Clear,
    /// Заново загрузить ресурсы в текущее хранилище
    Refresh,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let verbosity = Verbosity::from_flags(cli.quiet, cli.verbose);
    let overrides = Overrides {
        origin: cli.origin.clone(),
        theme: cli.theme,
        no_cache: cli.no_cache,
    };

    match cli.command.clone().unwrap_or(Cmd::Study) {
        Cmd::Study => {
            let config = Config::load(cli.config.as_deref(), &overrides)
                .context("failed to load configuration")?;
            let log_path = config.log_path();
            logging::init_file_logging(verbosity, &log_path)
                .with_context(|| format!("failed to open log file {}", log_path.display()))?;
            study(&config)
        }
        Cmd::Convert {
            input,
            output,
            delimiter,
        } => {
            logging::init_logging(verbosity);
            let report = convert::convert_file(&input, &output, delimiter)
                .with_context(|| format!("failed to convert {}", input.display()))?;
            println!(
                "{}: {} билетов, столбцы: {}",
                report.output.display(),
                report.tickets,
                report.columns.join(", ")
            );
            Ok(())
        }
        Cmd::Reset => {
            logging::init_logging(verbosity);
            let config = Config::load(cli.config.as_deref(), &overrides)
                .context("failed to load configuration")?;
            let store = FileStore::open(&config.storage_path).with_context(|| {
                format!("failed to open storage {}", config.storage_path.display())
            })?;
            SessionStore::new(store)
                .clear()
                .context("failed to clear progress")?;
            println!("Прогресс сброшен");
            Ok(())
        }
        Cmd::Cache { action } => {
            logging::init_logging(verbosity);
            let config = Config::load(cli.config.as_deref(), &overrides)
                .context("failed to load configuration")?;
            cache(&config, action)
        }
    }
}

// ---------------- commands ----------------

fn study(config: &Config) -> Result<()> {
    let fetcher = if config.offline_cache {
        worker::register(&config.worker_config(), &config.origin)
    } else {
        config.origin.connect()
    }
    .with_context(|| format!("failed to connect to {}", config.origin))?;
    info!(origin = %config.origin, cache = config.offline_cache, "starting");

    let storage_path = config.storage_path.clone();
    let source = DeckSource::new(fetcher, config.data_file.clone(), move || {
        FileStore::open(&storage_path)
    });
    let input = InputMapper::new(config.keymap.clone(), config.swipe_threshold);
    let mut app = App::new(source, input, theme_of(config.theme));
    app::run(&mut app)
}

fn cache(config: &Config, action: CacheCmd) -> Result<()> {
    let caches = CacheStorage::new(&config.cache_dir);
    let names = caches
        .keys()
        .with_context(|| format!("failed to list caches in {}", config.cache_dir.display()))?;
    match action {
        CacheCmd::Status => {
            if names.is_empty() {
                println!("Кэш пуст ({})", config.cache_dir.display());
            }
            for name in names {
                let marker = if name == config.cache_name { "*" } else { " " };
                let entries = match caches.get(&name)? {
                    Some(cache) => cache.entries()?.len(),
                    None => 0,
                };
                println!("{marker} {name}  записей: {entries}");
            }
        }
        CacheCmd::Clear => {
            for name in names {
                caches
                    .delete(&name)
                    .with_context(|| format!("failed to delete cache {name}"))?;
                println!("удалён {name}");
            }
        }
        CacheCmd::Refresh => {
            let network = config
                .origin
                .connect()
                .with_context(|| format!("failed to connect to {}", config.origin))?;
            let worker = CacheWorker::new(
                config.cache_name.clone(),
                config.manifest.clone(),
                caches,
                network,
            );
            worker
                .install()
                .with_context(|| format!("failed to refresh cache {}", config.cache_name))?;
            for name in worker.activate()? {
                println!("удалён {name}");
            }
            println!("обновлён {}", config.cache_name);
        }
    }
    Ok(())
}
