use clap::Parser;
use soil_monitor_setup::config::cli::LogFormat;
use soil_monitor_setup::core::provisioner::ProvisionPlan;
use soil_monitor_setup::utils::{logger, validation::Validate};
use soil_monitor_setup::{
    CliArgs, HttpProbe, LocalStorage, ProvisionContext, Provisioner, SetupConfig, SetupError,
    SystemRunner,
};
use std::sync::Arc;
use std::time::Duration;

#[tokio::main]
async fn main() {
    let args = CliArgs::parse();

    // 初始化日誌
    match args.log_format {
        LogFormat::Compact => logger::init_cli_logger(args.verbose),
        LogFormat::Json => logger::init_json_logger(args.verbose),
    }

    tracing::info!("🌱 Starting Soil Monitor setup");

    if let Err(e) = run(args).await {
        tracing::error!("❌ Setup failed: {}", e);
        tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

        eprintln!("❌ {}", e.user_friendly_message());
        eprintln!("💡 {}", e.recovery_suggestion());
        std::process::exit(e.exit_code());
    }
}

async fn run(args: CliArgs) -> Result<(), SetupError> {
    // 載入設定
    let mut config = SetupConfig::load(args.config.as_deref())?;
    args.apply_overrides(&mut config);

    if args.verbose {
        tracing::debug!("Setup config: {:?}", config);
    }

    // 驗證配置
    config.validate()?;
    tracing::info!("✅ Configuration loaded and validated");

    let probe = HttpProbe::new(Duration::from_secs(config.network.timeout_secs))?;
    let mut context = ProvisionContext::new(
        config,
        Arc::new(SystemRunner::new()),
        Arc::new(LocalStorage::system()),
        Arc::new(probe),
    );
    let provisioner = Provisioner::standard(args.only.clone(), args.skip.clone());

    if args.dry_run {
        tracing::info!("🔍 DRY RUN MODE - nothing will be changed");
        let plan = provisioner.plan(&mut context).await?;
        display_plan(&plan);
        return Ok(());
    }

    let results = provisioner.run(&mut context).await?;

    tracing::info!("✅ Setup completed ({} steps)", results.len());
    println!("✅ Soil Monitor setup completed successfully!");
    Ok(())
}

fn display_plan(plan: &ProvisionPlan) {
    println!("📋 Provisioning plan");
    println!("  User:    {} ({})", plan.host.user, plan.host.home.display());
    println!("  Python:  {}", plan.host.python);
    match &plan.profile {
        Some(profile) => println!(
            "  Profile: >= {} ({})",
            profile.min_version,
            profile.packages.join(", ")
        ),
        None => println!("  Profile: ⚠️ none matches this interpreter"),
    }
    println!();

    println!("⚙️ Steps:");
    for (index, (name, selected)) in plan.steps.iter().enumerate() {
        let marker = if *selected { "▶️" } else { "⏭️" };
        println!("  {:>2}. {} {}", index + 1, marker, name);
    }
    println!();

    match &plan.config_patch {
        Some(outcome) => println!("🔧 Config patch preview: {:?}", outcome.serial),
        None => println!(
            "🔧 {} does not exist yet; it will be patched after checkout",
            plan.layout.config_file.display()
        ),
    }
    println!();

    for file in &plan.files {
        println!("💾 {} (mode {:o})", file.path.display(), file.mode);
        for line in file.content.lines() {
            println!("    {}", line);
        }
        println!();
    }

    println!("✅ Dry run complete. Re-run without --dry-run to apply.");
}
