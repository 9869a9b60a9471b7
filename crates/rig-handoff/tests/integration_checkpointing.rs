//! Integration tests for per-thread checkpointing
//!
//! - Checkpoint written after every step
//! - Resume keeps prior messages as a prefix
//! - File backend survives a fresh graph over the same directory

mod common;

use std::sync::Arc;

use futures::StreamExt;
use tokio_util::sync::CancellationToken;

use common::standard_llm;
use rig_handoff::agent::presets::{email_agent, math_agent};
use rig_handoff::{
    create_checkpointer, Checkpointer, CheckpointerConfig, CompiledGraph, DivisionByZeroPolicy,
    HandoffGraph, LLMProvider, MemoryCheckpointer, Message,
};

fn graph_with(llm: Arc<dyn LLMProvider>, checkpointer: Arc<dyn Checkpointer>) -> CompiledGraph {
    let description = HandoffGraph::new("assistant")
        .model(llm)
        .agent(math_agent(DivisionByZeroPolicy::Sentinel).expect("math agent"))
        .agent(email_agent())
        .build();
    CompiledGraph::compile(description, checkpointer).expect("graph compiles")
}

/// The stored checkpoint tracks the latest step of the run
#[tokio::test]
async fn test_checkpoint_after_every_step() {
    let checkpointer = Arc::new(MemoryCheckpointer::new());
    let graph = graph_with(Arc::new(standard_llm()), checkpointer.clone());

    let mut stream = graph.stream("steps", "What is 7 plus 5?", CancellationToken::new());
    let run_id = stream.run_id().to_string();

    while let Some(step) = stream.next().await {
        let step = step.expect("step succeeds");
        let checkpoint = checkpointer
            .get("steps")
            .await
            .unwrap()
            .expect("checkpoint written");
        assert_eq!(checkpoint.step, step.index);
        assert_eq!(checkpoint.node, step.node);
        assert_eq!(checkpoint.state, step.state);
        assert_eq!(checkpoint.metadata.get("run_id"), Some(&run_id));
    }

    assert_eq!(checkpointer.list().await.unwrap(), vec!["steps".to_string()]);
}

/// A second run on the same thread continues the conversation
#[tokio::test]
async fn test_resume_keeps_prior_messages_as_prefix() {
    let graph = graph_with(Arc::new(standard_llm()), Arc::new(MemoryCheckpointer::new()));

    let first = graph.invoke("resume", "What is 7 plus 5?").await.unwrap();
    let second = graph
        .invoke("resume", "Write an email to Bob about the result")
        .await
        .unwrap();

    assert!(second.len() > first.len());
    assert_eq!(&second.messages()[..first.len()], first.messages());
    assert_eq!(
        second.messages()[first.len()],
        Message::user("Write an email to Bob about the result")
    );
    assert!(second.final_response().unwrap().contains("Dear reader"));
}

/// Threads never see each other's history
#[tokio::test]
async fn test_threads_are_isolated() {
    let graph = graph_with(Arc::new(standard_llm()), Arc::new(MemoryCheckpointer::new()));

    graph.invoke("left", "What is 7 plus 5?").await.unwrap();
    let right = graph.invoke("right", "What is 2 plus 2?").await.unwrap();

    assert_eq!(right.messages()[0], Message::user("What is 2 plus 2?"));
    assert!(!right
        .messages()
        .iter()
        .any(|m| m.text().contains("7 plus 5")));
}

/// Checkpoints written through the file backend are visible to a new graph
#[tokio::test]
async fn test_file_checkpointer_resume_across_graphs() {
    let dir = tempfile::tempdir().unwrap();
    let config = CheckpointerConfig::File {
        path: dir.path().to_path_buf(),
        compression: true,
    };

    let first_graph = graph_with(
        Arc::new(standard_llm()),
        create_checkpointer(config.clone()).unwrap(),
    );
    let first = first_graph
        .invoke("user/42", "What is 7 plus 5?")
        .await
        .unwrap();
    assert_eq!(first.final_response(), Some("12"));

    let second_graph = graph_with(Arc::new(standard_llm()), create_checkpointer(config).unwrap());
    let stored = second_graph
        .get_state("user/42")
        .await
        .unwrap()
        .expect("state persisted");
    assert_eq!(stored, first);

    let second = second_graph
        .invoke("user/42", "What is 2 times 3?")
        .await
        .unwrap();
    assert_eq!(&second.messages()[..first.len()], first.messages());
    assert_eq!(second.final_response(), Some("6"));

    let threads = second_graph.checkpointer().list().await.unwrap();
    assert_eq!(threads, vec!["user/42".to_string()]);
}
