use duet_client::{NegotiationError, NegotiationPhase, Role};
use duet_core::PeerId;

use crate::integration::init_tracing;
use crate::utils::{MediaCall, TestPeer};

#[tokio::test]
async fn test_unusable_offer_closes_negotiation() {
    init_tracing();

    let mut responder = TestPeer::new(PeerId::new(), Role::Responder, "b");
    responder.media.fail_remote_descriptions();

    let err = responder
        .negotiator
        .on_offer_received(PeerId::new(), "garbage".to_owned())
        .await
        .unwrap_err();

    assert!(matches!(err, NegotiationError::Media(_)));
    assert!(!err.is_benign());
    assert_eq!(responder.negotiator.phase(), NegotiationPhase::Closed);
    assert_eq!(responder.media.count(&MediaCall::CreateAnswer), 0);
    assert_eq!(responder.media.count(&MediaCall::Close), 1);
    assert!(responder.sent.try_recv().is_err());
}

#[tokio::test]
async fn test_unusable_answer_closes_negotiation() {
    init_tracing();

    let mut initiator = TestPeer::new(PeerId::new(), Role::Initiator, "a");
    initiator.negotiator.start_negotiation().await.unwrap();
    initiator.media.fail_remote_descriptions();

    let err = initiator
        .negotiator
        .on_answer_received(PeerId::new(), "garbage".to_owned())
        .await
        .unwrap_err();

    assert!(matches!(err, NegotiationError::Media(_)));
    assert_eq!(initiator.negotiator.phase(), NegotiationPhase::Closed);
}

#[tokio::test]
async fn test_dropped_transport_surfaces_on_send() {
    init_tracing();

    let TestPeer {
        mut negotiator,
        sent,
        ..
    } = TestPeer::new(PeerId::new(), Role::Initiator, "a");
    drop(sent);

    let err = negotiator.start_negotiation().await.unwrap_err();
    assert!(matches!(err, NegotiationError::TransportClosed));
}
