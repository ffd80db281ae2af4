use std::sync::Arc;

use fixmyrig_test_model::{PresetEvent, PresetResponse, TestModelProvider};
use futures_util::StreamExt;
use parking_lot::Mutex;

use super::*;
use crate::prompts::TROUBLESHOOTER_INSTRUCTIONS;

fn relay_with_log(
    provider: &TestModelProvider,
) -> (ChatRelay, Arc<Mutex<Vec<RelayState>>>) {
    let log = Arc::new(Mutex::new(vec![]));
    let relay = ChatRelayBuilder::with_model_provider(provider.clone())
        .on_state_change({
            let log = Arc::clone(&log);
            move |state| log.lock().push(state)
        })
        .build();
    (relay, log)
}

#[tokio::test]
async fn test_streams_fragments_in_order() {
    let provider = TestModelProvider::default();
    provider.add_response(PresetResponse::with_fragments([
        "Check ",
        "the ",
        "power ",
        "cable.",
    ]));
    let (mut relay, log) = relay_with_log(&provider);

    let stream = relay.send("My PC won't turn on").await.unwrap().unwrap();
    assert_eq!(*log.lock(), [RelayState::Sending]);

    let fragments: Vec<_> =
        stream.map(|fragment| fragment.unwrap()).collect().await;
    assert_eq!(fragments, ["Check ", "the ", "power ", "cable."]);
    assert_eq!(fragments.concat(), "Check the power cable.");
    assert_eq!(
        *log.lock(),
        [RelayState::Sending, RelayState::Streaming, RelayState::Idle]
    );
    assert_eq!(relay.state(), RelayState::Idle);

    let requests = provider.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].text, "My PC won't turn on");
    assert_eq!(requests[0].session.as_ref(), relay.session().current());
    assert_eq!(provider.sessions(), [TROUBLESHOOTER_INSTRUCTIONS]);
}

#[tokio::test]
async fn test_blank_message_is_ignored() {
    let provider = TestModelProvider::default();
    let (mut relay, log) = relay_with_log(&provider);

    assert!(relay.send("").await.unwrap().is_none());
    assert!(relay.send("   ").await.unwrap().is_none());
    assert!(relay.send("\n\t").await.unwrap().is_none());

    assert_eq!(relay.state(), RelayState::Idle);
    assert!(log.lock().is_empty());
    assert!(provider.requests().is_empty());
    assert!(provider.sessions().is_empty());
}

#[tokio::test]
async fn test_mid_stream_failure() {
    let provider = TestModelProvider::default();
    provider.add_response(PresetResponse::with_events([
        PresetEvent::MessageDelta("Try reseating ".to_owned()),
        PresetEvent::MessageDelta("the RAM".to_owned()),
        PresetEvent::Failure("connection reset".to_owned()),
        PresetEvent::MessageDelta("never delivered".to_owned()),
    ]));
    let (mut relay, log) = relay_with_log(&provider);

    let items: Vec<_> = relay
        .send("Beeping on boot")
        .await
        .unwrap()
        .unwrap()
        .collect()
        .await;
    assert_eq!(items.len(), 3);
    assert_eq!(items[0].as_ref().unwrap(), "Try reseating ");
    assert_eq!(items[1].as_ref().unwrap(), "the RAM");
    assert!(matches!(items[2], Err(RelayError::Transport(_))));

    assert_eq!(
        *log.lock(),
        [
            RelayState::Sending,
            RelayState::Streaming,
            RelayState::Failed,
            RelayState::Idle
        ]
    );
    assert_eq!(relay.state(), RelayState::Idle);
}

#[tokio::test]
async fn test_failure_before_streaming() {
    let provider = TestModelProvider::default();
    provider
        .add_response(PresetResponse::with_fragments(["ok"]).with_failures(1));
    let (mut relay, log) = relay_with_log(&provider);

    let items: Vec<_> =
        relay.send("Hello").await.unwrap().unwrap().collect().await;
    assert_eq!(items.len(), 1);
    assert!(items[0].is_err());
    assert_eq!(
        *log.lock(),
        [RelayState::Sending, RelayState::Failed, RelayState::Idle]
    );

    // The relay is usable again and keeps the session.
    let session = relay.session().current().cloned();
    let items: Vec<_> =
        relay.send("Hello").await.unwrap().unwrap().collect().await;
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].as_ref().unwrap(), "ok");
    assert_eq!(relay.session().current().cloned(), session);
    assert_eq!(provider.sessions().len(), 1);
}

#[tokio::test]
async fn test_rejects_overlapping_sends() {
    let provider = TestModelProvider::default();
    provider.add_response(PresetResponse::with_fragments(["First"]));
    provider.add_response(PresetResponse::with_fragments(["Second"]));
    let (mut relay, _) = relay_with_log(&provider);

    let mut stream = relay.send("one").await.unwrap().unwrap();
    assert!(matches!(relay.send("two").await, Err(RelayError::Busy)));
    assert_eq!(stream.next().await.unwrap().unwrap(), "First");
    assert_eq!(relay.state(), RelayState::Streaming);
    assert!(matches!(relay.send("two").await, Err(RelayError::Busy)));
    assert!(stream.next().await.is_none());

    let mut stream = relay.send("two").await.unwrap().unwrap();
    assert_eq!(stream.next().await.unwrap().unwrap(), "Second");
    assert_eq!(provider.requests().len(), 2);
}

#[tokio::test]
async fn test_reset_detaches_stream() {
    let provider = TestModelProvider::default();
    provider.add_response(PresetResponse::with_fragments([
        "Open ", "the ", "case.",
    ]));
    provider.add_response(PresetResponse::with_fragments(["Hi again."]));
    let (mut relay, log) = relay_with_log(&provider);

    let mut stream = relay.send("Overheating").await.unwrap().unwrap();
    assert_eq!(stream.next().await.unwrap().unwrap(), "Open ");
    let old_session = relay.session().current().cloned().unwrap();

    relay.reset();
    assert_eq!(relay.state(), RelayState::Idle);
    assert!(relay.session().current().is_none());
    assert!(stream.next().await.is_none());
    assert!(stream.next().await.is_none());
    drop(stream);
    assert_eq!(
        *log.lock(),
        [RelayState::Sending, RelayState::Streaming, RelayState::Idle]
    );

    let fragments: Vec<_> = relay
        .send("Hello")
        .await
        .unwrap()
        .unwrap()
        .map(|fragment| fragment.unwrap())
        .collect()
        .await;
    assert_eq!(fragments, ["Hi again."]);
    let new_session = relay.session().current().cloned().unwrap();
    assert_ne!(old_session, new_session);
    assert_eq!(
        provider.sessions(),
        [TROUBLESHOOTER_INSTRUCTIONS, TROUBLESHOOTER_INSTRUCTIONS]
    );
}

#[tokio::test]
async fn test_history_is_not_replayed() {
    let provider = TestModelProvider::default();
    for fragment in ["A", "B", "C"] {
        provider.add_response(PresetResponse::with_fragments([fragment]));
    }
    let mut relay = ChatRelayBuilder::with_model_provider(provider.clone())
        .with_instructions("Be brief.")
        .with_model("gemini-test")
        .build();

    for text in ["first", "second", "third"] {
        let stream = relay.send(text).await.unwrap().unwrap();
        let _: Vec<_> = stream.collect().await;
    }

    let requests = provider.requests();
    let texts: Vec<_> = requests.iter().map(|req| req.text.as_str()).collect();
    assert_eq!(texts, ["first", "second", "third"]);
    assert!(
        requests
            .iter()
            .all(|req| req.model.as_deref() == Some("gemini-test"))
    );
    assert!(requests.iter().all(|req| req.session == requests[0].session));
    assert_eq!(provider.sessions(), ["Be brief."]);
}

#[tokio::test]
async fn test_dropping_stream_frees_relay() {
    let provider = TestModelProvider::default();
    provider.add_response(PresetResponse::with_fragments(["Unused"]));
    provider.add_response(PresetResponse::with_fragments(["Used"]));
    let (mut relay, log) = relay_with_log(&provider);

    let stream = relay.send("one").await.unwrap().unwrap();
    assert_eq!(relay.state(), RelayState::Sending);
    drop(stream);
    assert_eq!(relay.state(), RelayState::Idle);
    assert_eq!(*log.lock(), [RelayState::Sending, RelayState::Idle]);

    let mut stream = relay.send("two").await.unwrap().unwrap();
    assert_eq!(stream.next().await.unwrap().unwrap(), "Used");
    assert_eq!(provider.requests().len(), 2);
}
