use duet_client::{NegotiationError, NegotiationPhase, Role};
use duet_core::PeerId;

use crate::integration::init_tracing;
use crate::utils::{MediaCall, TestPeer};

#[tokio::test]
async fn test_close_while_answer_is_pending() {
    init_tracing();

    let remote = PeerId::new();
    let TestPeer {
        mut negotiator,
        media,
        mut sent,
        ..
    } = TestPeer::new(PeerId::new(), Role::Responder, "b");
    let gate = media.hold_answers();
    let closer = negotiator.closer();

    let pending = tokio::spawn(async move {
        let result = negotiator
            .on_offer_received(remote, "offer".to_owned())
            .await;
        (negotiator, result)
    });

    media.answer_started().await;
    closer.close().await;
    assert!(closer.is_closed());
    gate.notify_one();

    let (negotiator, result) = pending.await.unwrap();
    assert!(matches!(result, Err(NegotiationError::Closed)));
    assert_eq!(negotiator.phase(), NegotiationPhase::Closed);
    assert!(sent.try_recv().is_err(), "answer must not be sent");
    assert_eq!(media.count(&MediaCall::Close), 1);
}

#[tokio::test]
async fn test_close_before_start() {
    init_tracing();

    let mut initiator = TestPeer::new(PeerId::new(), Role::Initiator, "a");
    initiator.negotiator.closer().close().await;

    let err = initiator.negotiator.start_negotiation().await.unwrap_err();
    assert!(matches!(err, NegotiationError::Closed));
    assert_eq!(initiator.negotiator.phase(), NegotiationPhase::Closed);
    assert_eq!(initiator.media.calls(), vec![MediaCall::Close]);
}
