use crate::cli::Cli;
use colored::*;
use std::io::{IsTerminal, Write};
use wrtpilot::ai::self_heal::HealOutcome;
use wrtpilot::cancel::CancelToken;
use wrtpilot::config::Config;
use wrtpilot::error::Result;
use wrtpilot::pipeline::Pipeline;
use wrtpilot::plan::format_command;
use wrtpilot::ui::{spinner_if, ConfirmPrompt, Renderer};

/// 단발 실행: plan → validate → (confirm) → execute → (self-heal)
///
/// 종료 코드를 반환합니다. 실패한 명령어가 남아 있으면 1.
pub async fn run_once(cli: &Cli, config: Config, cancel: &CancelToken) -> Result<i32> {
    let renderer = Renderer::new(cli.json);
    let pipeline = Pipeline::from_config(config);
    let prompt = cli.prompt_text();

    let spinner = spinner_if(
        !cli.json && std::io::stderr().is_terminal(),
        &format!("Planning with {}...", pipeline.provider().name()),
    );
    let planned = pipeline.plan(&prompt, cancel).await;
    spinner.finish_and_clear();
    let plan = planned?;

    let mut stdout = std::io::stdout();
    renderer.render_plan(&mut stdout, &plan)?;
    stdout.flush()?;

    if plan.is_empty() {
        return Ok(0);
    }
    if pipeline.config().dry_run {
        if !cli.json {
            eprintln!(
                "\n{} Dry run mode - no execution. Use --execute to run.",
                "[i]".cyan()
            );
        }
        return Ok(0);
    }

    let confirm = ConfirmPrompt::new();
    let batch = if cli.confirm_each {
        pipeline
            .execute_selected(&plan, cancel, |index, cmd| {
                let accepted = confirm
                    .confirm_command(index, &format_command(&cmd.command))
                    .unwrap_or(false);
                if !accepted {
                    eprintln!("{}", "Skipped".yellow());
                }
                accepted
            })
            .await
    } else {
        if !pipeline.config().auto_approve && !confirm.confirm_plan(plan.commands.len())? {
            eprintln!("{}", "Cancelled".yellow());
            return Ok(0);
        }
        pipeline.execute(&plan, cancel).await
    };

    renderer.render_batch(&mut stdout, &batch)?;

    let mut remaining = batch.failed;
    if pipeline.config().auto_retry && batch.failed > 0 {
        eprintln!(
            "{} Asking {} to fix {} failed command(s)...",
            "[AI]".cyan(),
            pipeline.provider().name(),
            batch.failed
        );
        let reports = pipeline.heal(&batch, cancel).await;
        renderer.render_heal(&mut stdout, &reports)?;
        remaining -= reports
            .iter()
            .filter(|r| matches!(r.outcome, HealOutcome::Fixed { .. }))
            .count();
    }
    stdout.flush()?;

    Ok(if remaining > 0 { 1 } else { 0 })
}
