mod cli;

use std::sync::Arc;

use clap::Parser;

use blacktop_core::api::{router, AppState};
use blacktop_core::kernel::bootstrap::Console;
use blacktop_core::HostConfig;

use cli::{CliArgs, Commands, ModulesCommand, PluginCommand};
use overwatch_panel::OverwatchPanel;
use weather_feed::WeatherFeedPlugin;

#[tokio::main]
async fn main() {
    env_logger::init();
    let args = CliArgs::parse();

    let config = match HostConfig::load(&args.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    let mut console = match Console::new(config) {
        Ok(console) => console,
        Err(e) => {
            eprintln!("failed to bootstrap console: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = console.initialize().await {
        eprintln!("initialization failed: {}", e);
        std::process::exit(1);
    }
    if let Err(e) = console.start().await {
        eprintln!("startup failed: {}", e);
        std::process::exit(1);
    }

    register_bundled_modules(&console).await;

    let outcome = run_command(&console, &args).await;

    if let Err(e) = console.shutdown().await {
        eprintln!("shutdown failed: {}", e);
    }
    if let Err(message) = outcome {
        eprintln!("{}", message);
        std::process::exit(1);
    }
}

/// Register the modules that ship inside the binary: the overwatch panel
/// factory for the module store and the weather feed backend plugin.
async fn register_bundled_modules(console: &Console) {
    console
        .local_factories()
        .register("overwatch-panel", Arc::new(OverwatchPanel::shared))
        .await;
    console
        .module_store()
        .set_available(vec![overwatch_panel::catalog_entry()])
        .await;

    if let Err(e) = console
        .plugin_manager()
        .load_instance(Box::new(WeatherFeedPlugin::new()))
        .await
    {
        log::error!("failed to load bundled weather-feed plugin: {}", e);
    }
}

async fn run_command(console: &Console, args: &CliArgs) -> Result<(), String> {
    match &args.command {
        Commands::Serve { bind } => serve(console, bind.as_deref()).await,
        Commands::Plugin { command } => run_plugin_command(console, command).await,
        Commands::Modules { command } => run_modules_command(console, command).await,
    }
}

async fn serve(console: &Console, bind_override: Option<&str>) -> Result<(), String> {
    let bind_addr = bind_override
        .map(str::to_string)
        .unwrap_or_else(|| console.config().bind_addr.clone());

    let app = router(AppState {
        manager: console.plugin_manager().clone(),
        messaging: console.messaging().clone(),
    });

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .map_err(|e| format!("failed to bind {}: {}", bind_addr, e))?;
    log::info!("API listening on {}", bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            log::info!("shutdown signal received");
        })
        .await
        .map_err(|e| format!("server error: {}", e))
}

async fn run_plugin_command(console: &Console, command: &PluginCommand) -> Result<(), String> {
    let manager = console.plugin_manager();
    match command {
        PluginCommand::List => {
            let installed = manager.installed_plugins().await;
            let loaded = manager.loaded_plugins().await;
            println!("Installed plugins ({}):", installed.len());
            for m in &installed {
                println!("  {} v{} [{}]", m.id, m.version, m.module_type);
            }
            println!("Loaded plugins ({}):", loaded.len());
            for p in &loaded {
                let state = if p.enabled { "enabled" } else { "disabled" };
                println!("  {} v{} ({})", p.id, p.version, state);
            }
            Ok(())
        }
        PluginCommand::Install { source, version } => {
            let record = manager
                .install(source, version.as_deref())
                .await
                .map_err(|e| e.to_string())?;
            println!("installed {} v{} from {}", record.id, record.version, record.source);
            Ok(())
        }
        PluginCommand::Load { id } => {
            let info = manager.load(id).await.map_err(|e| e.to_string())?;
            println!("loaded {} v{}", info.id, info.version);
            Ok(())
        }
        PluginCommand::Unload { id } => {
            manager.unload(id).await.map_err(|e| e.to_string())?;
            println!("unloaded {}", id);
            Ok(())
        }
        PluginCommand::Enable { id } => {
            manager.enable(id).await.map_err(|e| e.to_string())?;
            println!("enabled {}", id);
            Ok(())
        }
        PluginCommand::Disable { id } => {
            manager.disable(id).await.map_err(|e| e.to_string())?;
            println!("disabled {}", id);
            Ok(())
        }
        PluginCommand::Uninstall { id } => {
            manager.uninstall(id).await.map_err(|e| e.to_string())?;
            println!("uninstalled {}", id);
            Ok(())
        }
    }
}

async fn run_modules_command(console: &Console, command: &ModulesCommand) -> Result<(), String> {
    match command {
        ModulesCommand::List => {
            let store = console.module_store();
            let available = store.available().await;
            println!("Available modules ({}):", available.len());
            for m in &available {
                let loaded = if store.is_loaded(&m.id).await { " [loaded]" } else { "" };
                println!("  {} v{} [{}]{}", m.id, m.version, m.module_type, loaded);
            }
            Ok(())
        }
    }
}
