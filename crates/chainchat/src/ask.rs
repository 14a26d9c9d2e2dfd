//! One-shot question command.

use anyhow::Result;
use futures::StreamExt;
use std::io::Write;
use std::sync::Arc;

use chainchat_core::prompt;

use crate::config::Config;
use crate::invoker::ChatClient;
use crate::retriever::ContextRetriever;

/// Ask a single question: retrieve context, assemble the prompt, invoke
/// the model, and print the answer.
///
/// With `stream = true` fragments are printed as they arrive; otherwise
/// the complete answer is printed at once.
pub async fn run_ask(
    config: &Config,
    question: &str,
    stream: bool,
    limit: Option<usize>,
) -> Result<()> {
    let config = Arc::new(config.clone());
    let retriever = ContextRetriever::new(config.clone());
    let chat = ChatClient::from_env(&config.model)?;

    let ranked = retriever.retrieve(question, limit).await;
    if ranked.is_empty() {
        println!("(no matching textbook context; answering from the model alone)");
    } else {
        println!("Context: {} chunk(s)", ranked.len());
        for sc in &ranked {
            println!("  {:.3}  {}", sc.score, sc.chunk.source);
        }
    }
    println!();

    let turns = prompt::assemble(
        &config.persona.text,
        &ranked,
        &[],
        question,
        config.persona.context_placement,
    );

    if stream {
        let mut fragments = chat.stream(&turns).await?;
        let mut stdout = std::io::stdout();
        while let Some(fragment) = fragments.next().await {
            write!(stdout, "{}", fragment?)?;
            stdout.flush()?;
        }
        writeln!(stdout)?;
    } else {
        let answer = chat.complete(&turns).await?;
        println!("{}", answer);
    }

    Ok(())
}
