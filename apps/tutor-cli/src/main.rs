use std::env;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use indicatif::{ProgressBar, ProgressStyle};
use tracing_subscriber::EnvFilter;

use tutor_answer::{AskOptions, Assistant};
use tutor_core::config::Config;
use tutor_core::Subject;

mod ingest;

const USAGE: &str = "Usage: tutor <command> [args...]

Commands:
  index <chunks.jsonl>   embed the chunks, rebuild the index and save it
  ask [--subject S] [--top-k N] <question...>
                         answer a question
  stats                  index statistics
  status                 full system status as JSON
  suggest [subject]      suggested questions (mathematics, physics, ...)";

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}

fn parse_args() -> (String, Vec<String>) {
    let mut args: Vec<String> = env::args().skip(1).collect();
    if args.is_empty() {
        eprintln!("{USAGE}");
        std::process::exit(1);
    }
    let cmd = args.remove(0);
    (cmd, args)
}

fn index(assistant: &Assistant, file: &Path) -> anyhow::Result<()> {
    let chunks = ingest::read_chunks(file)?;
    println!("Indexing {} chunks from {}", chunks.len(), file.display());

    let pb = ProgressBar::new(chunks.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} chunks ({percent}%)")?
            .progress_chars("#>-"),
    );
    let report = assistant.rebuild_with_progress(chunks, |done| pb.set_position(done as u64));
    pb.finish_and_clear();
    let report = report?;

    assistant.save()?;
    println!(
        "✅ Indexed {} chunks ({} skipped) in {:.2}s into {}",
        report.indexed,
        report.skipped,
        report.elapsed.as_secs_f64(),
        assistant.index_dir().display()
    );
    Ok(())
}

/// Split `--subject` and `--top-k` flags from the question words.
fn ask_args(args: &[String]) -> anyhow::Result<(String, AskOptions)> {
    let mut options = AskOptions::default();
    let mut words = Vec::new();
    let mut it = args.iter();
    while let Some(arg) = it.next() {
        match arg.as_str() {
            "--subject" => options.subject = Some(it.next().context("--subject needs a value")?.clone()),
            "--top-k" => {
                let n = it.next().context("--top-k needs a value")?;
                options.top_k = Some(n.parse().with_context(|| format!("invalid --top-k '{n}'"))?);
            }
            _ => words.push(arg.as_str()),
        }
    }
    Ok((words.join(" "), options))
}

fn ask(assistant: &Assistant, question: &str, options: &AskOptions) {
    let resp = assistant.ask_with(question, options);
    println!("{}\n", resp.answer);
    println!(
        "strategy={} subject={} confidence={:.2} time={:.3}s",
        resp.strategy_used,
        resp.subject,
        resp.confidence,
        resp.processing_time
    );
    if let Some(model) = &resp.model_used {
        println!("model={model}");
    }
    for (i, e) in resp.evidence.iter().enumerate() {
        println!("  {}. score={:.4} distance={:.4} source={}", i + 1, e.score, e.distance, e.chunk.source().unwrap_or("?"));
    }
}

fn main() -> anyhow::Result<()> {
    init_tracing();
    let (cmd, args) = parse_args();

    let config = Config::load().context("loading configuration")?;
    tracing::debug!(env = config.env_name(), "configuration loaded");
    let app = config.app()?;
    let assistant = Assistant::from_config(app, &PathBuf::from("."))?;

    match cmd.as_str() {
        "index" => {
            let Some(file) = args.first() else { bail!("Usage: tutor index <chunks.jsonl>") };
            index(&assistant, Path::new(file))?;
        }
        "ask" => {
            let (question, options) = ask_args(&args)?;
            if question.trim().is_empty() {
                bail!("Usage: tutor ask [--subject S] [--top-k N] \"<question>\"");
            }
            ask(&assistant, &question, &options);
        }
        "stats" => {
            let stats = assistant.stats();
            println!("📊 vectors:    {}", stats.total_vectors);
            println!("📊 documents:  {}", stats.total_documents);
            println!("📊 dimension:  {}", stats.dimension);
            println!("📊 embeddings: {}", stats.embeddings_model);
            println!("📊 index type: {}", stats.index_type);
            match stats.last_updated {
                Some(t) => println!("📊 updated:    {}", t.to_rfc3339()),
                None => println!("📊 updated:    never"),
            }
        }
        "status" => println!("{}", serde_json::to_string_pretty(&assistant.status())?),
        "suggest" => {
            let subject = match args.first() {
                Some(name) => Some(Subject::parse(name).with_context(|| format!("unknown subject '{name}'"))?),
                None => None,
            };
            for q in assistant.suggestions(subject) {
                println!("💡 {q}");
            }
        }
        _ => bail!("Unknown command: {cmd}\n\n{USAGE}"),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(args: &[&str]) -> Vec<String> {
        args.iter().map(|a| a.to_string()).collect()
    }

    #[test]
    fn ask_flags_are_split_from_the_question() {
        let (question, options) = ask_args(&strings(&["--subject", "Math", "what", "is", "--top-k", "2", "pi"])).unwrap();
        assert_eq!(question, "what is pi");
        assert_eq!(options.subject.as_deref(), Some("Math"));
        assert_eq!(options.top_k, Some(2));

        assert!(ask_args(&strings(&["--top-k", "many"])).is_err());
        assert!(ask_args(&strings(&["--subject"])).is_err());
    }
}
