//! Magpie - Rust 任务路由智能体系统
//!
//! 入口：初始化日志、加载配置、创建 LLM 与 Supervisor，
//! 以简单 REPL 消费标准输入（UI 属外部薄壳，不在核心范围内）。

use std::io::{self, BufRead, Write};
use std::sync::Arc;

use magpie::agents::{AgentKind, Supervisor};
use magpie::config::{load_config, AppConfig};
use magpie::llm::create_llm_from_config;
use magpie::observability::{self, Observability};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 日志：默认 info，可通过 RUST_LOG 覆盖
    observability::init();

    let cfg = load_config(None).unwrap_or_else(|e| {
        tracing::warn!("Config load failed ({}), using defaults", e);
        AppConfig::default()
    });

    let llm = create_llm_from_config(&cfg);
    let obs = Arc::new(Observability::new());
    let supervisor = Supervisor::new(llm, obs.clone(), &cfg);

    println!("magpie 已就绪。直接输入请求；`@map`/`@music`/`@general` 前缀可指定 Agent；");
    println!("命令：/history /stats /export /quit");

    let stdin = io::stdin();
    loop {
        print!("> ");
        io::stdout().flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break; // EOF
        }
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        match line {
            "/quit" => break,
            "/history" => {
                for record in supervisor.task_history(10) {
                    println!(
                        "[{}] {} agent={} success={} {:.2}s",
                        record.task_id,
                        record.timestamp.format("%H:%M:%S"),
                        record.agent,
                        record.success,
                        record.execution_time_secs
                    );
                }
                continue;
            }
            "/stats" => {
                let stats = supervisor.statistics();
                println!(
                    "总任务数: {}  成功率: {:.1}%  平均耗时: {:.2}秒",
                    stats.total_tasks,
                    stats.success_rate * 100.0,
                    stats.avg_execution_time_secs
                );
                for (agent, count) in &stats.agent_usage {
                    println!("  {}: {}次", agent, count);
                }
                continue;
            }
            "/export" => {
                match obs.export_to_file(&cfg.observability.export_dir, None) {
                    Ok(path) => println!("已导出: {}", path.display()),
                    Err(e) => println!("导出失败: {}", e),
                }
                continue;
            }
            _ => {}
        }

        // `@map 查询...` 形式的显式指定；非法标签直接提示，不进入执行
        let (agent, input) = match line.strip_prefix('@') {
            Some(rest) => {
                let (label, rest) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));
                match label.parse::<AgentKind>() {
                    Ok(kind) => (Some(kind), rest.trim()),
                    Err(e) => {
                        println!("{}", e);
                        continue;
                    }
                }
            }
            None => (None, line),
        };
        if input.is_empty() {
            continue;
        }

        let result = supervisor.execute_task(input, agent).await;
        if result.success {
            println!("[{}] {}", result.agent, result.content);
        } else {
            println!("[{}] {}", result.agent, result.content);
            if let Some(err) = &result.error {
                tracing::debug!("error detail: {}", err);
            }
        }
    }

    Ok(())
}
