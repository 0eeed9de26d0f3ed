use crate::core::context::ProvisionContext;
use crate::core::sequence::ProvisionStep;
use crate::domain::model::{CommandSpec, HostContext, PythonVersion, StepReport};
use crate::utils::error::{Result, SetupError};
use crate::utils::system_info::HostFacts;
use crate::utils::validation;
use std::path::PathBuf;

/// 偵測目標使用者、家目錄與直譯器版本
pub struct DetectHostStep;

#[async_trait::async_trait]
impl ProvisionStep for DetectHostStep {
    fn name(&self) -> &str {
        "detect-host"
    }

    fn description(&self) -> &str {
        "Detecting user, home directory and interpreter"
    }

    async fn execute(&self, context: &mut ProvisionContext) -> Result<StepReport> {
        let host = detect_host(context).await?;
        host.facts.log_facts();

        let mut report = StepReport::new(format!(
            "user={} group={} home={} python={}",
            host.user,
            host.group,
            host.home.display(),
            host.python
        ));
        if !host.facts.is_raspberry_pi() {
            report = report.with_warning("board does not report itself as a Raspberry Pi");
        }

        context.add_shared_data("host", serde_json::to_value(&host)?);
        context.set_host(host);
        Ok(report)
    }
}

pub async fn detect_host(context: &ProvisionContext) -> Result<HostContext> {
    let uid = context
        .runner
        .run_checked(&CommandSpec::new("id").arg("-u"))
        .await?;
    if uid.stdout.trim() == "0" {
        return Err(SetupError::WrongIdentity {
            message: "do not run this installer as root or with sudo; run it as the device user"
                .to_string(),
        });
    }

    let user = resolve_user(context)?;
    let home = resolve_home(context, &user);
    validation::validate_home_path("home", &home.display().to_string())?;
    let group = primary_group(context, &user).await?;
    let python = detect_python(context).await?;
    tracing::debug!(
        "Detected user={} group={} home={} python={}",
        user,
        group,
        home.display(),
        python
    );

    Ok(HostContext {
        user,
        group,
        home,
        python,
        facts: HostFacts::collect(),
    })
}

fn resolve_user(context: &ProvisionContext) -> Result<String> {
    let user = context
        .config
        .target
        .user
        .clone()
        .or_else(|| context.env_var("SUDO_USER").map(str::to_string))
        .or_else(|| context.env_var("USER").map(str::to_string))
        .ok_or_else(|| SetupError::WrongIdentity {
            message: "cannot determine the invoking user (USER is not set)".to_string(),
        })?;

    if user == "root" {
        return Err(SetupError::WrongIdentity {
            message: "the target user must not be root".to_string(),
        });
    }
    Ok(user)
}

fn resolve_home(context: &ProvisionContext, user: &str) -> PathBuf {
    if let Some(home) = &context.config.target.home {
        return PathBuf::from(home);
    }
    // HOME 只在它屬於目標使用者時可信
    match (context.env_var("USER"), context.env_var("HOME")) {
        (Some(current), Some(home)) if current == user => PathBuf::from(home),
        _ => PathBuf::from("/home").join(user),
    }
}

async fn primary_group(context: &ProvisionContext, user: &str) -> Result<String> {
    let output = context
        .runner
        .run(&CommandSpec::new("id").args(["-gn", user]))
        .await?;
    let group = output.stdout.trim();
    if !output.success() || group.is_empty() {
        return Err(SetupError::WrongIdentity {
            message: format!("user '{}' does not exist on this host", user),
        });
    }
    Ok(group.to_string())
}

async fn detect_python(context: &ProvisionContext) -> Result<PythonVersion> {
    let interpreter = &context.config.python.interpreter;
    let missing = || SetupError::InterpreterMissing {
        program: interpreter.clone(),
    };

    let output = match context
        .runner
        .run(&CommandSpec::new(interpreter.as_str()).arg("--version"))
        .await
    {
        Ok(output) if output.success() => output,
        Ok(_) => return Err(missing()),
        Err(SetupError::IoError(e)) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(missing())
        }
        Err(e) => return Err(e),
    };

    // 舊版直譯器把版本印在 stderr
    let text = if output.stdout.trim().is_empty() {
        &output.stderr
    } else {
        &output.stdout
    };
    text.parse::<PythonVersion>()
        .map_err(|reason| SetupError::UnsupportedInterpreter {
            version: text.trim().to_string(),
            reason,
        })
}

/// 驗證 sudo 可用
pub struct CheckPrivilegesStep;

#[async_trait::async_trait]
impl ProvisionStep for CheckPrivilegesStep {
    fn name(&self) -> &str {
        "check-privileges"
    }

    fn description(&self) -> &str {
        "Validating sudo access"
    }

    async fn execute(&self, context: &mut ProvisionContext) -> Result<StepReport> {
        match context.runner.run(&CommandSpec::new("sudo").arg("-v")).await {
            Ok(output) if output.success() => Ok(StepReport::new("sudo access confirmed")),
            Ok(output) => Err(SetupError::PrivilegeUnavailable {
                message: output.stderr.trim().to_string(),
            }),
            Err(SetupError::IoError(e)) => Err(SetupError::PrivilegeUnavailable {
                message: format!("sudo could not be started: {}", e),
            }),
            Err(e) => Err(e),
        }
    }
}
