use anyhow::Context;
use barn_allocator::config::{LogFormat, StorageBackend};
use barn_allocator::utils::error::ErrorSeverity;
use barn_allocator::utils::{logger, validation::Validate};
use barn_allocator::{
    adapters::csv_import, Allocator, AnimalId, AnimalStore, BarnStore, CliConfig, Color, Command,
    FarmConfig, JsonFileStore, MemoryStore, NewAnimal,
};
use clap::Parser;
use std::collections::HashMap;
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = CliConfig::parse();

    // 載入配置
    let mut config = match &cli.config {
        Some(path) => FarmConfig::from_file(path)
            .with_context(|| format!("Failed to load config file '{}'", path))?,
        None => FarmConfig::default(),
    };
    cli.apply_overrides(&mut config);

    // 初始化日誌
    match config.logging.format {
        LogFormat::Compact => logger::init_cli_logger(cli.verbose),
        LogFormat::Json => logger::init_json_logger(cli.verbose),
    }
    if cli.verbose {
        tracing::debug!("CLI config: {:?}", cli);
    }

    // 驗證配置
    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(1);
    }

    let capacity = config.barn_capacity();
    let outcome = match config.storage.backend {
        StorageBackend::Memory => {
            let store = MemoryStore::new();
            execute(&cli.command, store.clone(), store, capacity).await
        }
        StorageBackend::Json => {
            let store = Arc::new(JsonFileStore::open(&config.storage.path).await?);
            tracing::debug!("Opened data file {}", store.path().display());
            execute(&cli.command, store.clone(), store, capacity).await
        }
    };

    if let Err(e) = outcome {
        tracing::error!(
            "❌ Command failed: {} (Category: {:?}, Severity: {:?})",
            e,
            e.category(),
            e.severity()
        );
        eprintln!("❌ {}", e.user_friendly_message());
        eprintln!("💡 {}", e.recovery_suggestion());

        let exit_code = match e.severity() {
            ErrorSeverity::Low | ErrorSeverity::High => 1,
            ErrorSeverity::Medium => 2,
            ErrorSeverity::Critical => 3,
        };
        std::process::exit(exit_code);
    }

    Ok(())
}

async fn execute<A, B>(
    command: &Command,
    animals: A,
    barns: B,
    capacity: usize,
) -> barn_allocator::Result<()>
where
    A: AnimalStore,
    B: BarnStore,
{
    let allocator = Allocator::open(animals, barns, capacity).await?;

    match command {
        Command::Add { name, color } => {
            let color: Color = color.parse()?;
            let animal = allocator.add_animal(NewAnimal::new(name.clone(), color)).await?;
            println!(
                "✅ Admitted {} (id {}) into {}",
                animal.name,
                animal.id,
                barn_names(&allocator).await.get(&animal.placement.barn()).map_or("-", String::as_str)
            );
        }
        Command::Import { file } => {
            let batch = csv_import::read_animals(file)?;
            let admitted = allocator.add_animals(batch).await?;
            println!("✅ Admitted {} animals from {}", admitted.len(), file);
        }
        Command::Remove { ids } => {
            let ids: Vec<AnimalId> = ids.iter().copied().map(AnimalId).collect();
            allocator.remove_animals(&ids).await?;
            println!("✅ Removed {} animals", ids.len());
        }
        Command::List => {
            let names = barn_names(&allocator).await;
            let mut animals = allocator.find_all().await?;
            animals.sort_by_key(|a| (a.favorite_color, a.id));
            println!("{:>6}  {:<20} {:<8} {}", "ID", "NAME", "COLOR", "BARN");
            for animal in animals {
                println!(
                    "{:>6}  {:<20} {:<8} {}",
                    animal.id,
                    animal.name,
                    animal.favorite_color,
                    names.get(&animal.placement.barn()).map_or("-", String::as_str)
                );
            }
        }
        Command::Barns => {
            println!("{:<12} {:<8} {}", "BARN", "COLOR", "ANIMALS");
            for barn in allocator.occupancy().await {
                println!(
                    "{:<12} {:<8} {}/{}",
                    barn.name,
                    barn.color,
                    barn.members,
                    allocator.capacity()
                );
            }
        }
        Command::Clear => {
            allocator.delete_all().await?;
            println!("✅ Farm cleared");
        }
    }

    Ok(())
}

async fn barn_names<A: AnimalStore, B: BarnStore>(
    allocator: &Allocator<A, B>,
) -> HashMap<Option<barn_allocator::BarnId>, String> {
    allocator
        .occupancy()
        .await
        .into_iter()
        .map(|b| (Some(b.id), b.name))
        .collect()
}
