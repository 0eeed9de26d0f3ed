mod common;

use anyhow::Result;
use common::{Harness, StaticProbe, CONFIG_PY};
use soil_monitor_setup::config::{PythonProfile, RebootPolicy, UnrecognizedAction};
use soil_monitor_setup::{Provisioner, SetupError};
use std::sync::Arc;

fn provisioner() -> Provisioner {
    Provisioner::standard(vec![], vec![])
}

#[tokio::test]
async fn test_full_provisioning_writes_every_artifact() -> Result<()> {
    let harness = Harness::new();
    let mut context = harness.context(Harness::config());

    let results = provisioner().run(&mut context).await?;

    let names: Vec<&str> = results.iter().map(|r| r.step_name.as_str()).collect();
    assert_eq!(
        names,
        vec![
            "detect-host",
            "check-privileges",
            "check-network",
            "install-packages",
            "serial-access",
            "python-env",
            "fetch-repository",
            "patch-config",
            "launcher",
            "service-unit",
            "log-rotation",
            "schedule",
            "summary",
            "smoke-test",
            "reboot",
        ]
    );

    let unit = harness.read("/etc/systemd/system/soil-monitor.service");
    assert!(unit.contains("User=pi\n"));
    assert!(unit.contains("ExecStart=/home/pi/SoilMonitor/start_soil_monitor.sh\n"));
    assert!(unit.contains("Restart=always\n"));

    let config_py = harness.read("/home/pi/SoilMonitor/Config.py");
    assert!(config_py.contains("SERIAL_PORT = '/dev/ttyUSB0'"));
    assert_eq!(harness.read("/home/pi/SoilMonitor/Config.py.bak"), CONFIG_PY);

    assert!(harness.read("/home/pi/SoilMonitor/start_soil_monitor.sh").starts_with("#!/bin/bash"));
    assert!(harness.exists("/home/pi/SoilMonitor/logs"));
    assert!(harness.read("/etc/logrotate.d/soil-monitor").contains("copytruncate"));
    assert!(harness.read("/etc/cron.d/soil-monitor").contains("systemctl restart soil-monitor"));

    let runner = &harness.runner;
    assert!(runner.ran("sudo env DEBIAN_FRONTEND=noninteractive apt-get update"));
    assert!(runner.ran("sudo env DEBIAN_FRONTEND=noninteractive apt-get install -y python3"));
    assert!(runner.ran("sudo usermod -aG dialout pi"));
    assert!(runner.ran("python3 -m venv /home/pi/soil_monitor_env"));
    assert!(runner.ran("/home/pi/soil_monitor_env/bin/pip install pyserial==3.5 mysql-connector-python==8.3.0"));
    assert!(runner.ran("git clone https://github.com/DevTeam/SoilMonitor.git /home/pi/SoilMonitor"));
    assert!(runner.ran("sudo systemctl daemon-reload"));
    assert!(runner.ran("sudo systemctl enable soil-monitor.service"));
    assert!(!runner.ran("sudo reboot"));

    // 加入 dialout 群組的提醒
    assert!(context
        .warnings()
        .iter()
        .any(|(step, _)| step == "serial-access"));

    Ok(())
}

#[tokio::test]
async fn test_rerun_on_provisioned_host_succeeds() -> Result<()> {
    let harness = Harness::new();

    let mut first = harness.context(Harness::config());
    provisioner().run(&mut first).await?;
    harness.runner.clear_calls();

    let mut second = harness.context(Harness::config());
    let results = provisioner().run(&mut second).await?;
    assert_eq!(results.len(), 15);

    let runner = &harness.runner;
    // 已在群組內，不再 usermod
    assert!(!runner.ran("sudo usermod"));
    // 既有 checkout 改為 pull
    assert!(!runner.ran("git clone"));
    assert!(runner.ran("git -C /home/pi/SoilMonitor checkout -- Config.py"));
    assert!(runner.ran("git -C /home/pi/SoilMonitor pull --ff-only"));
    // 虛擬環境重建
    assert!(runner.ran("python3 -m venv /home/pi/soil_monitor_env"));
    let venv = second.get_result_by_name("python-env").unwrap();
    assert!(venv.report.summary.contains("(replaced)"));

    let config_py = harness.read("/home/pi/SoilMonitor/Config.py");
    assert_eq!(config_py.matches("/dev/ttyUSB0").count(), 1);

    Ok(())
}

#[tokio::test]
async fn test_rerun_keeps_local_config_edits() -> Result<()> {
    let harness = Harness::new();
    let config_path = "/home/pi/SoilMonitor/Config.py";

    provisioner().run(&mut harness.context(Harness::config())).await?;

    // 操作人員改用板載 UART 並填入真正的密碼
    let edited = harness
        .read(config_path)
        .replace("'/dev/ttyUSB0'", "'/dev/ttyAMA0'")
        .replace("\"DevTeam\"", "\"RealSecret\"");
    harness.write(config_path, &edited);

    provisioner().run(&mut harness.context(Harness::config())).await?;

    assert!(harness.runner.ran("git -C /home/pi/SoilMonitor pull --ff-only"));
    assert_eq!(harness.read(config_path), edited);
    // 沒有修改就不覆寫備份
    assert_eq!(harness.read("/home/pi/SoilMonitor/Config.py.bak"), CONFIG_PY);

    // 無法辨識的值同樣保留，只留下警告
    let unknown = edited.replace("'/dev/ttyAMA0'", "'/dev/ttyACM3'");
    harness.write(config_path, &unknown);

    let mut context = harness.context(Harness::config());
    provisioner().run(&mut context).await?;

    let config_py = harness.read(config_path);
    assert!(config_py.contains("SERIAL_PORT = '/dev/ttyACM3'"));
    assert!(config_py.contains("\"RealSecret\""));
    assert!(context
        .warnings()
        .iter()
        .any(|(step, warning)| step == "patch-config" && warning.contains("/dev/ttyACM3")));

    Ok(())
}

#[tokio::test]
async fn test_missing_source_files_abort_before_patching() {
    let harness = Harness::with_runner(|runner| {
        runner.repo_files.retain(|(name, _)| name != "SensorReader.py");
    });
    let mut context = harness.context(Harness::config());

    let err = provisioner().run(&mut context).await.unwrap_err();

    match err.root_cause() {
        SetupError::MissingSourceFiles { files, .. } => {
            assert_eq!(files, &vec!["SensorReader.py".to_string()]);
        }
        other => panic!("unexpected error: {:?}", other),
    }
    assert_eq!(err.exit_code(), 1);

    assert!(!harness.exists("/home/pi/SoilMonitor/Config.py.bak"));
    assert!(harness
        .read("/home/pi/SoilMonitor/Config.py")
        .contains("SERIAL_PORT = 'COM3'"));
    assert!(!harness.exists("/etc/systemd/system/soil-monitor.service"));
    assert!(!harness.runner.ran("sudo systemctl"));
}

#[tokio::test]
async fn test_root_invocation_is_rejected_first() {
    let harness = Harness::with_runner(|runner| runner.uid = "0".to_string());
    let mut context = harness.context(Harness::config());

    let err = provisioner().run(&mut context).await.unwrap_err();

    assert!(matches!(err.root_cause(), SetupError::WrongIdentity { .. }));
    assert_eq!(harness.runner.commands(), vec!["id -u".to_string()]);
}

#[tokio::test]
async fn test_missing_interpreter() {
    let harness = Harness::with_runner(|runner| runner.python_version = None);
    let mut context = harness.context(Harness::config());

    let err = provisioner().run(&mut context).await.unwrap_err();
    assert!(matches!(err.root_cause(), SetupError::InterpreterMissing { .. }));
}

#[tokio::test]
async fn test_sudo_unavailable() {
    let harness = Harness::with_runner(|runner| runner.sudo_ok = false);
    let mut context = harness.context(Harness::config());

    let err = provisioner().run(&mut context).await.unwrap_err();
    assert!(matches!(err.root_cause(), SetupError::PrivilegeUnavailable { .. }));
    assert!(!harness.runner.ran("sudo env DEBIAN_FRONTEND"));
}

#[tokio::test]
async fn test_old_interpreter_gets_matching_pins() -> Result<()> {
    let harness = Harness::with_runner(|runner| {
        runner.python_version = Some("Python 3.9.2".to_string());
    });
    let mut context = harness.context(Harness::config());

    provisioner().run(&mut context).await?;

    assert!(harness
        .runner
        .ran("/home/pi/soil_monitor_env/bin/pip install pyserial==3.5 mysql-connector-python==8.0.33 pandas==1.5.3"));
    assert_eq!(context.profile().unwrap().min_version, "3.9");

    Ok(())
}

#[tokio::test]
async fn test_smoke_test_failure_is_reported() {
    let harness = Harness::with_runner(|runner| runner.failing_imports = vec!["pandas".to_string()]);
    let mut context = harness.context(Harness::config());

    let err = provisioner().run(&mut context).await.unwrap_err();

    match err.root_cause() {
        SetupError::SmokeTestFailed { modules } => assert_eq!(modules, &vec!["pandas".to_string()]),
        other => panic!("unexpected error: {:?}", other),
    }
    assert_eq!(err.exit_code(), 3);
    assert!(harness.runner.ran("/home/pi/soil_monitor_env/bin/python -c import serial"));
}

#[tokio::test]
async fn test_profile_libraries_are_all_smoke_tested() {
    let harness = Harness::with_runner(|runner| runner.failing_imports = vec!["requests".to_string()]);
    let mut config = Harness::config();
    config.python.profiles = vec![PythonProfile {
        min_version: "3.7".to_string(),
        packages: vec![
            "pyserial==3.5".to_string(),
            "mysql-connector-python==8.3.0".to_string(),
            "pandas==2.2.2".to_string(),
            "requests==2.32.3".to_string(),
        ],
        smoke_modules: Vec::new(),
    }];
    let mut context = harness.context(config);

    let err = provisioner().run(&mut context).await.unwrap_err();

    match err.root_cause() {
        SetupError::SmokeTestFailed { modules } => assert_eq!(modules, &vec!["requests".to_string()]),
        other => panic!("unexpected error: {:?}", other),
    }
    assert!(harness.runner.ran("/home/pi/soil_monitor_env/bin/python -c import mysql.connector"));
}

#[tokio::test]
async fn test_unrecognized_serial_port_warns_or_fails() -> Result<()> {
    let custom = CONFIG_PY.replace("'COM3'", "'/dev/ttyACM0'");

    let harness = Harness::with_runner(|runner| runner.repo_files[0].1 = custom.clone());
    let mut context = harness.context(Harness::config());
    provisioner().run(&mut context).await?;

    assert_eq!(harness.read("/home/pi/SoilMonitor/Config.py"), custom);
    assert!(!harness.exists("/home/pi/SoilMonitor/Config.py.bak"));
    assert!(context
        .warnings()
        .iter()
        .any(|(step, warning)| step == "patch-config" && warning.contains("/dev/ttyACM0")));

    let harness = Harness::with_runner(|runner| runner.repo_files[0].1 = custom.clone());
    let mut config = Harness::config();
    config.app.serial.on_unrecognized = UnrecognizedAction::Fail;
    let mut context = harness.context(config);

    let err = provisioner().run(&mut context).await.unwrap_err();
    assert!(matches!(err.root_cause(), SetupError::UnrecognizedSerialPort { .. }));
    assert!(!harness.exists("/etc/systemd/system/soil-monitor.service"));

    Ok(())
}

#[tokio::test]
async fn test_network_check() -> Result<()> {
    let harness = Harness::new();
    let mut context = harness.context_with_probe(Harness::config(), Arc::new(StaticProbe(None)));

    let err = provisioner().run(&mut context).await.unwrap_err();
    assert!(matches!(err.root_cause(), SetupError::NetworkUnavailable { .. }));
    assert_eq!(err.exit_code(), 2);
    assert!(!harness.runner.ran("sudo env DEBIAN_FRONTEND"));

    let harness = Harness::new();
    let mut config = Harness::config();
    config.network.required = false;
    let mut context = harness.context_with_probe(config, Arc::new(StaticProbe(None)));

    provisioner().run(&mut context).await?;
    assert!(context
        .warnings()
        .iter()
        .any(|(step, _)| step == "check-network"));

    Ok(())
}

#[tokio::test]
async fn test_configured_user_resolves_paths() -> Result<()> {
    let harness = Harness::new();
    let mut config = Harness::config();
    config.target.user = Some("farmer".to_string());
    let mut context = harness.context(config);

    provisioner().run(&mut context).await?;

    // HOME 屬於 pi，不可沿用
    let unit = harness.read("/etc/systemd/system/soil-monitor.service");
    assert!(unit.contains("User=farmer\n"));
    assert!(unit.contains("WorkingDirectory=/home/farmer/SoilMonitor\n"));
    assert!(harness.exists("/home/farmer/SoilMonitor/Config.py"));

    Ok(())
}

#[tokio::test]
async fn test_database_overrides_are_applied() -> Result<()> {
    let harness = Harness::new();
    let mut config = Harness::config();
    config.app.database.host = Some("10.0.0.5".to_string());
    let mut context = harness.context(config);

    provisioner().run(&mut context).await?;

    let config_py = harness.read("/home/pi/SoilMonitor/Config.py");
    assert!(config_py.contains(r#"'host': "10.0.0.5""#));
    assert!(config_py.contains("SERIAL_PORT = '/dev/ttyUSB0'"));

    Ok(())
}

#[tokio::test]
async fn test_reboot_policies() -> Result<()> {
    let harness = Harness::new();
    let mut config = Harness::config();
    config.reboot.policy = RebootPolicy::Always;
    let mut context = harness.context(config);

    provisioner().run(&mut context).await?;
    assert!(harness.runner.ran("sudo reboot"));

    // 非互動環境下詢問模式不重開機
    let harness = Harness::new();
    let mut config = Harness::config();
    config.reboot.policy = RebootPolicy::Ask;
    let mut context = harness.context(config);

    provisioner().run(&mut context).await?;
    assert!(!harness.runner.ran("sudo reboot"));

    Ok(())
}

#[tokio::test]
async fn test_step_filter() -> Result<()> {
    let harness = Harness::new();
    let mut context = harness.context(Harness::config());

    let results = Provisioner::standard(vec![], vec!["check-network".to_string(), "install-packages".to_string()])
        .run(&mut context)
        .await?;

    assert_eq!(results.len(), 13);
    assert!(!harness.runner.ran("sudo env DEBIAN_FRONTEND"));

    let err = Provisioner::standard(vec!["deploy".to_string()], vec![])
        .run(&mut harness.context(Harness::config()))
        .await
        .unwrap_err();
    assert!(matches!(err, SetupError::InvalidConfigValueError { .. }));

    Ok(())
}

#[tokio::test]
async fn test_dry_run_changes_nothing() -> Result<()> {
    let harness = Harness::new();
    let mut context = harness.context(Harness::config());

    let plan = provisioner().plan(&mut context).await?;

    assert_eq!(plan.host.user, "pi");
    assert_eq!(plan.profile.as_ref().unwrap().min_version, "3.11");
    assert_eq!(plan.steps.len(), 15);
    assert_eq!(plan.files.len(), 4);
    assert!(plan.config_patch.is_none());
    assert!(plan.files[1].content.contains("User=pi"));

    assert_eq!(
        harness.runner.commands(),
        vec![
            "id -u".to_string(),
            "id -gn pi".to_string(),
            "python3 --version".to_string()
        ]
    );
    assert!(!harness.exists("/etc"));
    assert!(!harness.exists("/home"));

    Ok(())
}

#[tokio::test]
async fn test_home_with_whitespace_is_rejected() {
    let harness = Harness::new();
    let mut config = Harness::config();
    config.target.home = Some("/home/field pi".to_string());

    let err = provisioner().run(&mut harness.context(config)).await.unwrap_err();
    assert!(matches!(err.root_cause(), SetupError::InvalidConfigValueError { .. }));
    assert_eq!(harness.runner.commands(), vec!["id -u".to_string()]);

    // 偵測到的 HOME 也一樣
    let harness = Harness::new();
    let mut context = harness
        .context(Harness::config())
        .with_env([("USER", "pi"), ("HOME", "/home/field pi")]);

    let err = provisioner().run(&mut context).await.unwrap_err();
    assert!(matches!(err.root_cause(), SetupError::InvalidConfigValueError { .. }));
    assert!(!harness.exists("/etc/systemd/system/soil-monitor.service"));
}

#[tokio::test]
async fn test_primary_group_is_resolved() -> Result<()> {
    let harness = Harness::with_runner(|runner| runner.primary_group = Some("users".to_string()));
    let mut context = harness.context(Harness::config());

    provisioner().run(&mut context).await?;

    assert!(harness.runner.ran("id -gn pi"));
    let unit = harness.read("/etc/systemd/system/soil-monitor.service");
    assert!(unit.contains("User=pi\n"));
    assert!(unit.contains("Group=users\n"));
    assert!(harness
        .read("/etc/logrotate.d/soil-monitor")
        .contains("    su pi users\n"));

    Ok(())
}
