use clap::Parser;
use sequential_planner::plugins::{EmailPluginFake, FunPluginFake, WriterPluginFake};
use sequential_planner::utils::error::ErrorSeverity;
use sequential_planner::utils::{logger, validation::Validate};
use sequential_planner::{
    initialize_kernel_with, retry, CliConfig, PlannerError, SequentialPlanner,
};
use std::sync::Arc;

fn exit_with(e: &PlannerError) -> ! {
    tracing::error!(
        "❌ {} (Category: {:?}, Severity: {:?})",
        e,
        e.category(),
        e.severity()
    );
    tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

    eprintln!("❌ {}", e.user_friendly_message());
    eprintln!("💡 {}", e.recovery_suggestion());

    let exit_code = match e.severity() {
        ErrorSeverity::Low => 0,
        ErrorSeverity::Medium => 2,
        ErrorSeverity::High => 1,
        ErrorSeverity::Critical => 3,
    };
    std::process::exit(exit_code);
}

fn init_logger(json: bool, verbose: bool) {
    if json {
        logger::init_json_logger();
    } else {
        logger::init_cli_logger(verbose);
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = CliConfig::parse();

    let config = match cli.resolve() {
        Ok(config) => config,
        Err(e) => {
            init_logger(cli.json_logs, cli.verbose);
            exit_with(&e)
        }
    };

    // 初始化日誌 (命令列旗標與設定檔 [logging] 合併後)
    init_logger(config.json_logs(), config.verbose());
    tracing::info!("🚀 Starting sequential-planner");

    if config.verbose() {
        tracing::debug!("Resolved config: {:?}", config);
    }

    // 驗證配置
    if let Err(e) = config.validate() {
        exit_with(&e);
    }

    let mut kernel = match initialize_kernel_with(&config.settings(), &config.kernel_options()) {
        Ok(kernel) => kernel,
        Err(e) => exit_with(&e),
    };
    kernel.import_plugin(EmailPluginFake, None)?;
    kernel.import_plugin(FunPluginFake, None)?;
    kernel.import_plugin(WriterPluginFake, Some("WriterPlugin"))?;
    let kernel = Arc::new(kernel);

    let planner = SequentialPlanner::new(kernel.clone(), Some(config.planner.clone()));
    let plan = match retry(&config.retry_policy(), || planner.create_plan(&cli.goal)).await {
        Ok(plan) => plan,
        Err(e) => exit_with(&e),
    };

    println!("{}", serde_json::to_string_pretty(&plan)?);

    if cli.execute {
        tracing::info!("▶️ Executing plan with {} steps", plan.steps().len());
        match plan.invoke(&kernel, &cli.input) {
            Ok(result) => {
                println!("{}", serde_json::to_string_pretty(&result)?);
            }
            Err(e) => exit_with(&e),
        }
    }

    Ok(())
}
