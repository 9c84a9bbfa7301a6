use clap::Parser;
use repo_miner::app::commands;
use repo_miner::utils::{logger, monitor::RunMonitor};
use repo_miner::CliConfig;

const EXIT_PARTIAL_FAILURE: i32 = 2;

#[tokio::main]
async fn main() {
    let cli = CliConfig::parse();

    // 初始化日誌
    if cli.json_logs {
        logger::init_json_logger(cli.verbose);
    } else {
        logger::init_cli_logger(cli.verbose);
    }

    tracing::info!("Starting repo-miner");
    tracing::debug!("CLI config: {:?}", cli);

    // 載入並驗證配置
    let config = match cli.resolve() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("❌ Configuration validation failed: {}", e);
            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 {}", e.recovery_suggestion());
            std::process::exit(e.exit_code());
        }
    };

    let monitor = RunMonitor::new(cli.monitor);
    if monitor.is_enabled() {
        tracing::info!("🔍 Run monitoring enabled");
        monitor.log_stats("Start");
    }

    let result = commands::execute(&cli, &config).await;
    monitor.log_final_stats();

    match result {
        Ok(report) => {
            if let Some(output) = &report.output {
                tracing::info!("📁 Output saved to: {}", output);
            }
            if report.is_success() {
                tracing::info!("✅ Done, {} processed", report.processed);
                eprintln!("✅ Done, {} processed", report.processed);
            } else {
                for failure in &report.failures {
                    eprintln!("❌ {}", failure);
                }
                eprintln!(
                    "⚠️ {} processed, {} failed",
                    report.processed,
                    report.failures.len()
                );
                std::process::exit(EXIT_PARTIAL_FAILURE);
            }
        }
        Err(e) => {
            tracing::error!(
                "❌ Run failed: {} (Category: {:?}, Severity: {:?})",
                e,
                e.category(),
                e.severity()
            );
            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 建議: {}", e.recovery_suggestion());

            let exit_code = e.exit_code();
            if exit_code > 0 {
                std::process::exit(exit_code);
            }
        }
    }
}
