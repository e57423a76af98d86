//! # crispr
//!
//! 无界面宿主：解释脚本并以 JSON 输出 Action，或做静态检查与补全。
//!
//! ## 用法
//!
//! ```bash
//! crispr run script.crispr
//! crispr run script.crispr --chain-id 100 --account 0x…
//! crispr check scripts/a.crispr scripts/b.crispr
//! crispr complete script.crispr --line 3 --col 7
//! ```

mod config;

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::{Level, debug};

use crispr_runtime::{
    Completer, CrisprError, DiagnosticLevel, Interpreter, ModuleRegistry, OfflineClient, analyze_script,
};

use config::{CliConfig, DEFAULT_CONFIG_FILE};

#[derive(Parser)]
#[command(name = "crispr")]
#[command(about = "Interpret crispr scripts into executable actions")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// 配置文件（默认：crispr.json）
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// 日志详细程度（-v info，-vv debug，-vvv trace）
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// 解释脚本，输出 Action（JSON）
    Run {
        /// 脚本路径，`-` 表示标准输入
        script: PathBuf,

        /// 覆盖配置中的链 ID
        #[arg(long)]
        chain_id: Option<u64>,

        /// 覆盖配置中的账户
        #[arg(long)]
        account: Option<String>,
    },

    /// 静态检查脚本
    Check {
        #[arg(required = true)]
        scripts: Vec<PathBuf>,
    },

    /// 输出光标处的补全候选（JSON）
    Complete {
        script: PathBuf,

        /// 行号（从 1 开始）
        #[arg(long)]
        line: usize,

        /// 列号（从 0 开始）
        #[arg(long)]
        col: usize,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    match real_main(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("crispr error: {e:#}");
            ExitCode::from(1)
        }
    }
}

async fn real_main(cli: Cli) -> anyhow::Result<ExitCode> {
    let config_path = cli.config.unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));
    let config = CliConfig::load(&config_path)?;
    init_logging(cli.verbose, &config);
    debug!(config = ?config, "configuration loaded");

    match cli.command {
        Commands::Run {
            script,
            chain_id,
            account,
        } => {
            let client = OfflineClient::new(
                chain_id.unwrap_or(config.chain_id),
                account.unwrap_or(config.account),
            );
            run_script(&script, client).await
        }
        Commands::Check { scripts } => check_scripts(&scripts),
        Commands::Complete { script, line, col } => {
            let text = read_script(&script)?;
            let completer = Completer::new(Arc::new(ModuleRegistry::new()));
            let items = completer.complete(&text, line, col);
            println!("{}", serde_json::to_string_pretty(&items)?);
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn init_logging(verbose: u8, config: &CliConfig) {
    let level = match verbose {
        0 => config.level(),
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();
}

fn read_script(path: &Path) -> anyhow::Result<String> {
    if path.as_os_str() == "-" {
        return std::io::read_to_string(std::io::stdin()).context("failed to read script from stdin");
    }
    std::fs::read_to_string(path).with_context(|| format!("failed to read script {}", path.display()))
}

async fn run_script(path: &Path, client: OfflineClient) -> anyhow::Result<ExitCode> {
    let text = read_script(path)?;
    let mut interpreter = Interpreter::new(Arc::new(ModuleRegistry::new()), Arc::new(client));

    match interpreter.interpret(&text).await {
        Ok(actions) => {
            println!("{}", serde_json::to_string_pretty(&actions)?);
            Ok(ExitCode::SUCCESS)
        }
        Err(CrisprError::Parse(errors)) => {
            for error in &errors {
                eprintln!("{}:{error}", path.display());
            }
            Ok(ExitCode::from(1))
        }
        Err(CrisprError::Runtime(error)) => {
            match error.location() {
                Some(loc) => eprintln!("{}:{loc}: {error}", path.display()),
                None => eprintln!("{}: {error}", path.display()),
            }
            Ok(ExitCode::from(1))
        }
    }
}

fn check_scripts(paths: &[PathBuf]) -> anyhow::Result<ExitCode> {
    let mut errors = 0;
    let mut warnings = 0;
    for path in paths {
        let text = read_script(path)?;
        let result = analyze_script(&text);
        for diagnostic in &result.diagnostics {
            eprintln!("{}: {diagnostic}", path.display());
        }
        errors += result.error_count();
        warnings += result.warn_count();
        debug!(
            script = %path.display(),
            info = result.filter_by_level(DiagnosticLevel::Info).len(),
            "script checked"
        );
    }

    eprintln!("{} script(s): {errors} error(s), {warnings} warning(s)", paths.len());
    Ok(if errors > 0 {
        ExitCode::from(1)
    } else {
        ExitCode::SUCCESS
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_subcommands() {
        let cli = Cli::try_parse_from(["crispr", "-vv", "run", "a.crispr", "--chain-id", "100"]).unwrap();
        assert_eq!(cli.verbose, 2);
        assert!(matches!(cli.command, Commands::Run { chain_id: Some(100), .. }));

        let cli = Cli::try_parse_from(["crispr", "complete", "a.crispr", "--line", "2", "--col", "4"]).unwrap();
        assert!(matches!(cli.command, Commands::Complete { line: 2, col: 4, .. }));

        assert!(Cli::try_parse_from(["crispr", "check"]).is_err());
    }

    #[tokio::test]
    async fn test_run_script_writes_actions() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ok.crispr");
        std::fs::write(&path, "raw 0x44fA8E6f47987339850636F88629646662444217 0x 1\n").unwrap();

        let code = run_script(&path, OfflineClient::default()).await.unwrap();
        assert_eq!(code, ExitCode::SUCCESS);

        std::fs::write(&path, "print (4 / 0)\n").unwrap();
        let code = run_script(&path, OfflineClient::default()).await.unwrap();
        assert_eq!(code, ExitCode::from(1));
    }

    #[test]
    fn test_check_scripts_reports_errors() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("good.crispr");
        let bad = dir.path().join("bad.crispr");
        std::fs::write(&good, "print 1\n").unwrap();
        std::fs::write(&bad, "nope 1\n").unwrap();

        assert_eq!(check_scripts(&[good.clone()]).unwrap(), ExitCode::SUCCESS);
        assert_eq!(check_scripts(&[good, bad]).unwrap(), ExitCode::from(1));
        assert!(check_scripts(&[dir.path().join("missing.crispr")]).is_err());
    }
}
