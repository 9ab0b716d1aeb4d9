//! 模型信息摘要
//!
//! 供 `describe` 子命令输出：模型概要、默认实验、按因果性过滤的变量表。

use std::fmt::Write;

use super::description::ModelDescription;
use super::variable::Causality;

const NAME_WIDTH: usize = 18;

/// 生成多行摘要文本
pub fn describe(md: &ModelDescription, platforms: &[String], causalities: &[Causality]) -> String {
    let mut fmi_types = Vec::new();
    if md.model_exchange.is_some() {
        fmi_types.push("Model Exchange");
    }
    if md.co_simulation.is_some() {
        fmi_types.push("Co-Simulation");
    }

    let mut out = String::new();
    // String 的 fmt::Write 不会失败
    let _ = writeln!(out, "Model Info\n");
    let _ = writeln!(out, "  FMI Version        {}", md.fmi_version);
    let _ = writeln!(out, "  FMI Type           {}", fmi_types.join(", "));
    let _ = writeln!(out, "  Model Name         {}", md.model_name);
    let _ = writeln!(
        out,
        "  Description        {}",
        md.description.as_deref().unwrap_or("")
    );
    let _ = writeln!(out, "  Platforms          {}", platforms.join(", "));
    let _ = writeln!(
        out,
        "  Continuous States  {}",
        md.number_of_continuous_states()
    );
    let _ = writeln!(out, "  Event Indicators   {}", md.number_of_event_indicators);
    let _ = writeln!(out, "  Variables          {}", md.model_variables.len());
    let _ = writeln!(
        out,
        "  Generation Tool    {}",
        md.generation_tool.as_deref().unwrap_or("")
    );
    let _ = writeln!(
        out,
        "  Generation Date    {}",
        md.generation_date_and_time.as_deref().unwrap_or("")
    );

    if let Some(exp) = &md.default_experiment {
        let _ = writeln!(out, "\nDefault Experiment\n");
        if let Some(v) = exp.start_time {
            let _ = writeln!(out, "  Start Time    {v}");
        }
        if let Some(v) = exp.stop_time {
            let _ = writeln!(out, "  Stop Time     {v}");
        }
        if let Some(v) = exp.tolerance {
            let _ = writeln!(out, "  Tolerance     {v}");
        }
        if let Some(v) = exp.step_size {
            let _ = writeln!(out, "  Step Size     {v}");
        }
    }

    let names: Vec<&str> = causalities.iter().map(Causality::as_str).collect();
    let _ = writeln!(out, "\nVariables ({})\n", names.join(", "));
    let _ = writeln!(
        out,
        "  {:<18} {:<10} {:<12} {:<8} Description",
        "Name", "Causality", "Start Value", "Unit"
    );
    for v in md
        .model_variables
        .iter()
        .filter(|v| causalities.contains(&v.causality))
    {
        let _ = writeln!(
            out,
            "  {:<18} {:<10} {:<12} {:<8} {}",
            truncate_name(&v.name),
            v.causality.as_str(),
            v.kind.start_text(),
            v.kind.unit_text(),
            v.description.as_deref().unwrap_or("")
        );
    }

    out
}

/// 过长的变量名保留尾部，前面加 `...`
fn truncate_name(name: &str) -> String {
    let chars: Vec<char> = name.chars().collect();
    if chars.len() <= NAME_WIDTH {
        return name.to_string();
    }
    let tail: String = chars[chars.len() - (NAME_WIDTH - 3)..].iter().collect();
    format!("...{tail}")
}
