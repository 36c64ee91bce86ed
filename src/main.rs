//! duet - 双智能体问答助手
//!
//! 入口：加载 .env 与配置、初始化日志、创建 Assistant，然后在终端里逐行问答。
//! 用法：`duet [config.toml]`；输入 exit / quit 退出。

use std::path::PathBuf;

use anyhow::Context;
use duet::config::load_config;
use duet::core::RunOutcome;
use duet::memory::Message;
use duet::Assistant;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines, Stdin};

type InputLines = Lines<BufReader<Stdin>>;

async fn prompt_line(lines: &mut InputLines, prompt: &str) -> anyhow::Result<Option<String>> {
    let mut stdout = tokio::io::stdout();
    stdout.write_all(prompt.as_bytes()).await?;
    stdout.flush().await?;
    Ok(lines.next_line().await?)
}

/// 跑完一个问题；遇到人工检查点时在终端询问，直到得到有效选择
async fn ask(
    assistant: &Assistant,
    lines: &mut InputLines,
    query: &str,
    history: Vec<Message>,
) -> anyhow::Result<String> {
    let mut outcome = assistant.answer(query, history).await;
    loop {
        let paused = match outcome {
            RunOutcome::Completed(text) => return Ok(text),
            RunOutcome::Paused(paused) => paused,
        };
        println!("\n{}", paused.prompt);
        let Some(choice) = prompt_line(lines, "[yes/no] > ").await? else {
            // 输入结束：按 end 处理
            outcome = resume_or_degrade(assistant, paused, "end").await;
            continue;
        };
        outcome = match assistant.resume(paused.clone(), &choice).await {
            Ok(next) => next,
            Err(duet::AgentError::InvalidHumanChoice(bad)) => {
                println!("Unrecognised choice `{}`; please answer yes or no.", bad);
                RunOutcome::Paused(paused)
            }
            Err(e) => RunOutcome::Completed(duet::agent::degraded_answer(&e)),
        };
    }
}

async fn resume_or_degrade(
    assistant: &Assistant,
    paused: duet::core::PausedState,
    choice: &str,
) -> RunOutcome {
    assistant
        .resume(paused, choice)
        .await
        .unwrap_or_else(|e| RunOutcome::Completed(duet::agent::degraded_answer(&e)))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env 可选
    let _ = dotenvy::dotenv();
    duet::observability::init();

    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let cfg = load_config(config_path).context("Failed to load config")?;
    let assistant = Assistant::from_config(&cfg).context("Failed to create assistant")?;

    let history_len = cfg.app.history_turns * 2;
    let mut history: Vec<Message> = Vec::new();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    println!("duet ready. Ask a question (exit to quit).");
    while let Some(line) = prompt_line(&mut lines, "\n> ").await? {
        let query = line.trim();
        if query.is_empty() {
            continue;
        }
        if matches!(query, "exit" | "quit") {
            break;
        }

        let answer = ask(&assistant, &mut lines, query, history.clone()).await?;
        println!("\n{}", answer);

        history.push(Message::user(query));
        history.push(Message::assistant(answer));
        if history.len() > history_len {
            history.drain(..history.len() - history_len);
        }
        assistant.persist_memory();
    }

    assistant.persist_memory();
    Ok(())
}
