use clap::Parser;
use leads_export::utils::error::{ExportError, ErrorSeverity};
use leads_export::utils::{logger, validation::Validate};
use leads_export::config::Command;
use leads_export::{app, CliConfig, ExportConfig};

fn report_and_exit(e: &ExportError) -> ! {
    tracing::error!(
        "❌ Export failed: {} (Category: {:?}, Severity: {:?})",
        e,
        e.category(),
        e.severity()
    );
    tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

    eprintln!("❌ {}", e.user_friendly_message());
    eprintln!("💡 {}", e.recovery_suggestion());

    let exit_code = match e.severity() {
        ErrorSeverity::Low => 0,
        ErrorSeverity::Medium => 2, // 可重試
        ErrorSeverity::High => 1,
        ErrorSeverity::Critical => 3,
    };
    std::process::exit(exit_code);
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env 是可選的
    let _ = dotenvy::dotenv();
    let cli = CliConfig::parse();

    if cli.log_json {
        logger::init_json_logger(cli.verbose);
    } else {
        logger::init_cli_logger(cli.verbose);
    }

    tracing::info!("Starting leads-export");
    tracing::debug!("CLI config: {:?}", cli.command);

    let mut config = match &cli.config {
        Some(path) => {
            tracing::info!("📁 Loading configuration from: {}", path);
            ExportConfig::from_file(path).unwrap_or_else(|e| report_and_exit(&e))
        }
        None => ExportConfig::default(),
    };
    cli.apply_to(&mut config);

    if let Err(e) = cli.validate().and_then(|_| config.validate()) {
        report_and_exit(&e);
    }

    if let Command::Locations { keywords } = &cli.command {
        match app::lookup_locations(&config, keywords).await {
            Ok(locations) if locations.is_empty() => {
                println!("No LinkedIn locations match \"{}\"", keywords)
            }
            Ok(locations) => {
                for location in &locations {
                    match &location.country {
                        Some(country) => println!("{}\t{} ({})", location.id, location.name, country),
                        None => println!("{}\t{}", location.id, location.name),
                    }
                }
            }
            Err(e) => report_and_exit(&e),
        }
        return Ok(());
    }

    if cli.monitor {
        tracing::info!("🔍 System monitoring enabled");
    }

    match app::run_export(&cli, &config).await {
        Ok(result) => {
            println!("✅ {}", result.summary());
            if let Some(url) = result.spreadsheet_url() {
                println!("📄 {}", url);
            }
            if cli.verbose {
                println!("{}", serde_json::to_string_pretty(&result)?);
            }
        }
        Err(e) => report_and_exit(&e),
    }

    Ok(())
}
