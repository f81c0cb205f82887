use crate::ai::self_heal::HealOutcome;
use crate::error::Result;
use crate::executor::ExecutionBatch;
use crate::pipeline::HealReport;
use crate::plan::{format_command, Plan};
use colored::*;
use serde::Serialize;
use std::io::Write;

/// 플랜과 실행 결과 출력 (텍스트 또는 JSON)
#[derive(Debug, Clone, Copy, Default)]
pub struct Renderer {
    json: bool,
}

impl Renderer {
    pub fn new(json: bool) -> Self {
        Self { json }
    }

    pub fn is_json(&self) -> bool {
        self.json
    }

    pub fn render_plan<W: Write>(&self, w: &mut W, plan: &Plan) -> Result<()> {
        if self.json {
            return write_json(w, plan);
        }

        if !plan.summary.trim().is_empty() {
            writeln!(w, "{} {}\n", "Summary:".bold(), plan.summary)?;
        }
        if plan.is_empty() {
            writeln!(w, "{}", "No commands to run.".dimmed())?;
        }
        for (i, cmd) in plan.commands.iter().enumerate() {
            let marker = if cmd.needs_root {
                format!(" {}", "[root]".yellow())
            } else {
                String::new()
            };
            writeln!(w, "[{}] {}{}", i + 1, format_command(&cmd.command).cyan(), marker)?;
            if !cmd.description.trim().is_empty() {
                writeln!(w, "    - {}", cmd.description)?;
            }
        }
        if !plan.warnings.is_empty() {
            writeln!(w, "\n{}", "Warnings:".yellow().bold())?;
            for warning in &plan.warnings {
                writeln!(w, "- {}", warning)?;
            }
        }
        Ok(())
    }

    pub fn render_batch<W: Write>(&self, w: &mut W, batch: &ExecutionBatch) -> Result<()> {
        if self.json {
            return write_json(w, batch);
        }

        for result in &batch.results {
            let status = if result.is_success() {
                "ok".green()
            } else {
                "error".red()
            };
            writeln!(
                w,
                "[{}] ({}, {:.2?}) {}",
                result.index + 1,
                status,
                result.elapsed,
                format_command(&result.command)
            )?;
            if !result.output.trim().is_empty() {
                writeln!(w, "{}", indent(&result.output, 2))?;
            }
            if let Some(err) = &result.error {
                writeln!(w, "  {} {}", "error:".red(), err)?;
            }
        }

        if batch.failed > 0 {
            writeln!(w, "\n{}", format!("{} command(s) failed.", batch.failed).red())?;
        } else {
            writeln!(w, "\n{}", "All commands executed successfully.".green())?;
        }
        Ok(())
    }

    pub fn render_heal<W: Write>(&self, w: &mut W, reports: &[HealReport]) -> Result<()> {
        if self.json {
            return write_json(w, &reports);
        }

        for report in reports {
            let header = format!("Self-healing [{}] {}:", report.index + 1, format_command(&report.command));
            match &report.outcome {
                HealOutcome::Fixed { attempts, plan, batch } => {
                    writeln!(w, "\n{} {}", header.bold(), format!("fixed after {} attempt(s)", attempts).green())?;
                    for cmd in &plan.commands {
                        writeln!(w, "  {}", format_command(&cmd.command).cyan())?;
                    }
                    self.render_batch(w, batch)?;
                }
                HealOutcome::Exhausted { attempts, last_error } => {
                    writeln!(w, "\n{} {}", header.bold(), format!("gave up after {} attempt(s)", attempts).red())?;
                    if !last_error.trim().is_empty() {
                        writeln!(w, "{}", indent(last_error, 2))?;
                    }
                }
                HealOutcome::Unsupported => {
                    writeln!(w, "\n{} {}", header.bold(), "provider does not support error fixes".yellow())?;
                }
            }
        }
        Ok(())
    }
}

fn write_json<W: Write, T: Serialize>(w: &mut W, value: &T) -> Result<()> {
    serde_json::to_writer_pretty(&mut *w, value)?;
    writeln!(w)?;
    Ok(())
}

fn indent(s: &str, n: usize) -> String {
    let pad = " ".repeat(n);
    s.trim_end_matches('\n')
        .lines()
        .map(|line| format!("{}{}", pad, line))
        .collect::<Vec<_>>()
        .join("\n")
}
