//! Conversation loop tests: context growth, exit handling and failure recovery.

use std::sync::Arc;
use std::time::Duration;

use pretty_assertions::assert_eq;

use e2e_tests::{session_with, FailingRetriever, SlowRetriever, TestHarness, CHATEAU_CSV};
use sommelier_chat::{ChatError, MockModel, SessionConfig, SessionState, TurnOutcome};

#[tokio::test]
async fn test_context_accumulates_three_turns() {
    let harness = TestHarness::with_csv(CHATEAU_CSV);
    let model = Arc::new(MockModel::scripted(["first answer", "second answer", "third answer"]));
    let (mut session, retriever) = harness.session(model.clone());

    let input = "bold reds?\nsomething from Napa\nwhich is oakier?\n";
    let mut out = Vec::new();
    session.run(input.as_bytes(), &mut out).await.unwrap();

    assert_eq!(session.state(), SessionState::Ended);
    assert_eq!(retriever.calls(), 3);
    assert_eq!(
        session.context().render(),
        "\nYou: bold reds?\nChatbot: first answer\
         \nYou: something from Napa\nChatbot: second answer\
         \nYou: which is oakier?\nChatbot: third answer"
    );

    // the third prompt carries the first two turns
    let prompts = model.prompts();
    assert_eq!(prompts.len(), 3);
    assert!(prompts[2].contains("Chatbot: first answer"));
    assert!(prompts[2].contains("Chatbot: second answer"));
    assert!(!prompts[2].contains("third answer"));
}

#[tokio::test]
async fn test_exit_sentinel_any_case() {
    for sentinel in ["exit", "EXIT", "Exit", "  exit  "] {
        let harness = TestHarness::with_csv(CHATEAU_CSV);
        let model = Arc::new(MockModel::new());
        let (mut session, retriever) = harness.session(model.clone());

        let input = format!("{}\nnever asked\n", sentinel);
        let mut out = Vec::new();
        session.run(input.as_bytes(), &mut out).await.unwrap();

        assert_eq!(retriever.calls(), 0, "sentinel {:?}", sentinel);
        assert_eq!(model.calls(), 0);
        assert!(session.context().is_empty());
        assert_eq!(
            session.transitions(),
            &[SessionState::AwaitingInput, SessionState::Ended]
        );
    }
}

#[tokio::test]
async fn test_scenario_prompt_and_output() {
    let harness = TestHarness::with_csv(CHATEAU_CSV);
    let model = Arc::new(MockModel::scripted(["Chateau A is your wine."]));
    let (mut session, _) = harness.session(model.clone());

    let mut out = Vec::new();
    session
        .run("Saint Emilion wine with bold tannins\n".as_bytes(), &mut out)
        .await
        .unwrap();

    let printed = String::from_utf8(out).unwrap();
    assert!(printed.starts_with("Welcome to the local wine chatbot! Type 'exit' to quit.\n"));
    assert!(printed.contains("Chateau A Saint Emilion score: 0.612"));
    assert!(printed.contains("Chatbot: Chateau A is your wine.\n"));

    let prompt = &model.prompts()[0];
    assert!(prompt.starts_with("You are a wine expert.\n\n"));
    assert!(prompt.contains("Here are the search results: Chateau A:\n\tscore: 0.612"));
    assert!(prompt.contains("Question: Saint Emilion wine with bold tannins\n\nAnswer:"));
}

#[tokio::test]
async fn test_failed_search_keeps_context_and_continues() {
    let model = Arc::new(MockModel::new());
    let mut session = session_with(
        Arc::new(FailingRetriever),
        model.clone(),
        SessionConfig::default(),
    );
    let mut out = Vec::new();

    let outcome = session.step(Some("anything"), &mut out).await.unwrap();
    assert!(matches!(outcome, TurnOutcome::SearchFailed(ChatError::Search(_))));
    assert_eq!(session.state(), SessionState::AwaitingInput);
    assert!(session.context().is_empty());
    assert_eq!(model.calls(), 0);
    let printed = String::from_utf8(out).unwrap();
    assert!(printed.starts_with("Error: Search failed: Collection not found: gone"));
}

#[tokio::test]
async fn test_search_timeout_is_distinct() {
    let config = SessionConfig {
        search_timeout: Duration::from_millis(20),
        ..SessionConfig::default()
    };
    let model = Arc::new(MockModel::new());
    let mut session = session_with(
        Arc::new(SlowRetriever(Duration::from_millis(300))),
        model.clone(),
        config,
    );

    let outcome = session.step(Some("slow"), &mut Vec::new()).await.unwrap();
    assert!(matches!(
        outcome,
        TurnOutcome::SearchFailed(ChatError::Timeout { operation: "search", .. })
    ));
    assert_eq!(model.calls(), 0);
}

#[tokio::test]
async fn test_failed_model_call_then_recovery() {
    let harness = TestHarness::with_csv(CHATEAU_CSV);
    let model = Arc::new(MockModel::new());
    model.push_failure("connection refused");
    model.push_answer("recovered");
    let (mut session, _) = harness.session(model.clone());

    let mut out = Vec::new();
    let first = session.step(Some("red?"), &mut out).await.unwrap();
    assert!(matches!(first, TurnOutcome::ModelFailed(ChatError::Model(_))));
    assert!(session.context().is_empty());

    let second = session.step(Some("red?"), &mut out).await.unwrap();
    assert!(matches!(second, TurnOutcome::Answered(ref a) if a == "recovered"));
    assert_eq!(session.context().len(), 1);

    let printed = String::from_utf8(out).unwrap();
    assert!(printed.starts_with("Error: Model error: API request failed: connection refused\n"));
}

#[tokio::test]
async fn test_model_timeout_keeps_context() {
    let harness = TestHarness::with_csv(CHATEAU_CSV);
    let model = Arc::new(MockModel::new().with_delay(Duration::from_millis(300)));
    let config = SessionConfig {
        model_timeout: Duration::from_millis(20),
        ..SessionConfig::default()
    };
    let retriever =
        sommelier_chat::StoreRetriever::new(Arc::new(harness.store()), e2e_tests::COLLECTION);
    let mut session = session_with(Arc::new(retriever), model, config);

    let outcome = session.step(Some("red?"), &mut Vec::new()).await.unwrap();
    assert!(matches!(
        outcome,
        TurnOutcome::ModelFailed(ChatError::Timeout { operation: "model call", .. })
    ));
    assert!(session.context().is_empty());
    assert_eq!(session.state(), SessionState::AwaitingInput);
}
