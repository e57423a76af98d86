//! # xtask - 开发辅助工具
//!
//! 提供本地质量门禁与开发辅助命令。
//!
//! ## 命令
//!
//! - `check-all`: 运行 fmt、clippy、test
//! - `cov-runtime`: 运行 crispr-runtime 覆盖率
//! - `cov-workspace`: 运行 workspace 覆盖率
//! - `script-check`: 检查脚本文件（语法、命令、模块加载顺序）

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use walkdir::WalkDir;
use xshell::{Shell, cmd};

use crispr_runtime::{DiagnosticResult, analyze_script};

/// 脚本文件扩展名
const SCRIPT_EXTENSION: &str = "crispr";

#[derive(Parser)]
#[command(name = "xtask")]
#[command(about = "开发辅助工具")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 运行 fmt、clippy、test 门禁检查
    CheckAll,
    /// 运行 crispr-runtime 覆盖率报告
    CovRuntime,
    /// 运行 workspace 覆盖率报告
    CovWorkspace,
    /// 检查脚本文件
    ScriptCheck {
        /// 文件或目录（默认：scripts/）
        path: Option<PathBuf>,
    },
}

fn main() -> ExitCode {
    if let Err(e) = real_main() {
        eprintln!("xtask error: {e:#}");
        return ExitCode::from(1);
    }
    ExitCode::from(0)
}

fn real_main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let sh = Shell::new()?;

    match cli.command {
        Commands::CheckAll => {
            eprintln!("\n==> cargo fmt --all -- --check");
            cmd!(sh, "cargo fmt --all -- --check").run()?;

            eprintln!("\n==> cargo clippy --workspace --all-targets");
            cmd!(sh, "cargo clippy --workspace --all-targets").run()?;

            eprintln!("\n==> cargo test --workspace");
            cmd!(sh, "cargo test --workspace").run()?;
        }
        Commands::CovRuntime => {
            ensure_cargo_llvm_cov_available(&sh)?;
            cmd!(sh, "cargo llvm-cov -p crispr-runtime --all-features --html").run()?;
            eprintln!("\nCoverage HTML: target/llvm-cov/html/index.html");
        }
        Commands::CovWorkspace => {
            ensure_cargo_llvm_cov_available(&sh)?;
            // 排除 xtask，以免稀释信号
            cmd!(sh, "cargo llvm-cov --workspace --exclude xtask --all-features --html").run()?;
            eprintln!("\nCoverage HTML: target/llvm-cov/html/index.html");
        }
        Commands::ScriptCheck { path } => {
            script_check(path.as_deref())?;
        }
    }

    Ok(())
}

fn ensure_cargo_llvm_cov_available(sh: &Shell) -> anyhow::Result<()> {
    if cmd!(sh, "cargo llvm-cov --version").quiet().ignore_stdout().run().is_err() {
        anyhow::bail!(
            "cargo llvm-cov 不可用。\n\
请先安装：\n\
  - cargo install cargo-llvm-cov\n\
  - rustup component add llvm-tools-preview\n\
然后重试。"
        );
    }
    Ok(())
}

//=============================================================================
// script-check 命令实现
//=============================================================================

/// 执行脚本检查
fn script_check(path: Option<&Path>) -> anyhow::Result<()> {
    let root = path.map_or_else(|| PathBuf::from("scripts"), Path::to_path_buf);
    if !root.exists() {
        anyhow::bail!("路径不存在: {}", root.display());
    }

    let files = collect_script_files(&root);
    if files.is_empty() {
        eprintln!("未找到脚本文件（.{SCRIPT_EXTENSION}）");
        return Ok(());
    }

    eprintln!("==> 检查 {} 个脚本文件...\n", files.len());

    let mut total = DiagnosticResult::new();
    for file in &files {
        let content = std::fs::read_to_string(file)?;
        let result = analyze_script(&content);
        for diag in &result.diagnostics {
            eprintln!("{}: {diag}", file.display());
        }
        total.merge(result);
    }

    eprintln!("─────────────────────────────────────────────────────");
    let (errors, warnings) = (total.error_count(), total.warn_count());
    if errors > 0 {
        eprintln!("❌ {errors} 个错误, {warnings} 个警告");
        anyhow::bail!("脚本检查发现错误");
    } else if warnings > 0 {
        eprintln!("⚠️  0 个错误, {warnings} 个警告");
    } else {
        eprintln!("✅ 检查通过，无错误");
    }
    Ok(())
}

/// 收集脚本文件（单个文件直接返回）
fn collect_script_files(root: &Path) -> Vec<PathBuf> {
    if root.is_file() {
        return vec![root.to_path_buf()];
    }
    let mut files: Vec<PathBuf> = WalkDir::new(root)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| path.extension().is_some_and(|ext| ext == SCRIPT_EXTENSION))
        .collect();
    files.sort();
    files
}
