//! 產生啟動腳本、systemd 單元、logrotate 規則與 cron.d 排程的文字內容。
//!
//! 所有函式皆為純函式，輸入為已解析的路徑與設定。

use crate::config::SetupConfig;
use crate::domain::model::InstallLayout;

/// 啟動腳本：切換到 app 目錄並以虛擬環境的直譯器執行主程式
pub fn render_launcher(layout: &InstallLayout, config: &SetupConfig) -> String {
    format!(
        r#"#!/bin/bash
# Generated by soil-setup. Changes are overwritten on the next run.
set -e

cd "{app_dir}"
mkdir -p "{log_dir}"
exec "{python}" -u "{entry}"
"#,
        app_dir = layout.app_dir.display(),
        log_dir = layout.log_dir.display(),
        python = layout.venv_python().display(),
        entry = layout.app_dir.join(&config.app.entry_point).display(),
    )
}

pub fn render_service_unit(
    user: &str,
    group: &str,
    layout: &InstallLayout,
    config: &SetupConfig,
) -> String {
    format!(
        r#"# Generated by soil-setup. Changes are overwritten on the next run.
[Unit]
Description={description}
After=network-online.target
Wants=network-online.target

[Service]
Type=simple
User={user}
Group={group}
SupplementaryGroups={serial_group}
WorkingDirectory={app_dir}
ExecStart={launcher}
Restart=always
RestartSec={restart_sec}
StandardOutput=append:{log_file}
StandardError=append:{log_file}
NoNewPrivileges=true
PrivateTmp=true
ProtectSystem=full

[Install]
WantedBy=multi-user.target
"#,
        description = config.service.description,
        user = user,
        group = group,
        serial_group = config.system.serial_group,
        app_dir = layout.app_dir.display(),
        launcher = layout.launcher.display(),
        restart_sec = config.service.restart_sec,
        log_file = layout.log_file.display(),
    )
}

/// 服務以 append 模式寫日誌，因此用 copytruncate
pub fn render_logrotate(
    user: &str,
    group: &str,
    layout: &InstallLayout,
    config: &SetupConfig,
) -> String {
    format!(
        r#"# Generated by soil-setup. Changes are overwritten on the next run.
{log_file} {{
    {frequency}
    rotate {rotate}
    compress
    delaycompress
    missingok
    notifempty
    copytruncate
    su {user} {group}
}}
"#,
        log_file = layout.log_file.display(),
        frequency = config.logging.frequency,
        rotate = config.logging.rotate,
        user = user,
        group = group,
    )
}

/// cron.d 格式：分 時 日 月 週 使用者 指令
pub fn render_cron(user: &str, layout: &InstallLayout, config: &SetupConfig) -> String {
    let service = &config.target.service_name;
    format!(
        r#"# Generated by soil-setup. Changes are overwritten on the next run.
SHELL=/bin/sh
PATH=/usr/local/sbin:/usr/local/bin:/usr/sbin:/usr/bin:/sbin:/bin

# health check: restart {service} when it is not running
{health} root systemctl is-active --quiet {service} || systemctl restart {service}
# cleanup: drop rotated logs older than {days} days
{cleanup} {user} find {log_dir} -name '*.gz' -mtime +{days} -delete
"#,
        service = service,
        health = config.schedule.health_check,
        cleanup = config.schedule.cleanup,
        user = user,
        log_dir = layout.log_dir.display(),
        days = config.schedule.cleanup_days,
    )
}
