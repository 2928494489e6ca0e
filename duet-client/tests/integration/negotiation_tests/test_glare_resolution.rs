use duet_client::{NegotiationPhase, Role};

use crate::integration::init_tracing;
use crate::utils::{MediaCall, TestPeer, ordered_ids};

#[tokio::test]
async fn test_glare_lower_id_yields() {
    init_tracing();

    let (low, high) = ordered_ids();
    let mut polite = TestPeer::new(low, Role::Initiator, "low");
    let mut impolite = TestPeer::new(high, Role::Initiator, "high");
    assert!(polite.negotiator.is_polite_towards(&high));
    assert!(!impolite.negotiator.is_polite_towards(&low));

    polite.negotiator.start_negotiation().await.unwrap();
    impolite.negotiator.start_negotiation().await.unwrap();
    let polite_offer = polite.next_sdp();
    let impolite_offer = impolite.next_sdp();

    // Offers cross on the wire.
    let err = impolite
        .negotiator
        .on_offer_received(low, polite_offer)
        .await
        .unwrap_err();
    assert!(err.is_benign());
    assert_eq!(impolite.negotiator.phase(), NegotiationPhase::AwaitingAnswer);

    polite
        .negotiator
        .on_offer_received(high, impolite_offer)
        .await
        .unwrap();
    assert_eq!(polite.negotiator.phase(), NegotiationPhase::Connected);

    let answer = polite.next_sdp();
    assert_eq!(answer, "answer-from-low");
    impolite
        .negotiator
        .on_answer_received(low, answer)
        .await
        .unwrap();
    assert_eq!(impolite.negotiator.phase(), NegotiationPhase::Connected);

    let mut completed = [
        polite.negotiator.completed_as(),
        impolite.negotiator.completed_as(),
    ];
    completed.sort_by_key(|r| *r == Some(Role::Responder));
    assert_eq!(completed, [Some(Role::Initiator), Some(Role::Responder)]);
    assert_eq!(polite.negotiator.completed_as(), Some(Role::Responder));

    assert_eq!(polite.media.count(&MediaCall::Rollback), 1);
    assert_eq!(impolite.media.count(&MediaCall::Rollback), 0);
    assert_eq!(impolite.media.count(&MediaCall::CreateAnswer), 0);
}

#[tokio::test]
async fn test_glare_resolves_regardless_of_arrival_order() {
    init_tracing();

    let (low, high) = ordered_ids();
    let mut polite = TestPeer::new(low, Role::Initiator, "low");
    let mut impolite = TestPeer::new(high, Role::Initiator, "high");

    polite.negotiator.start_negotiation().await.unwrap();
    impolite.negotiator.start_negotiation().await.unwrap();
    let polite_offer = polite.next_sdp();
    let impolite_offer = impolite.next_sdp();

    polite
        .negotiator
        .on_offer_received(high, impolite_offer)
        .await
        .unwrap();
    let answer = polite.next_sdp();

    // The polite offer shows up late, after the impolite side already got
    // its answer.
    impolite
        .negotiator
        .on_answer_received(low, answer)
        .await
        .unwrap();
    let err = impolite
        .negotiator
        .on_offer_received(low, polite_offer)
        .await
        .unwrap_err();
    assert!(err.is_benign());

    assert_eq!(polite.negotiator.phase(), NegotiationPhase::Connected);
    assert_eq!(impolite.negotiator.phase(), NegotiationPhase::Connected);
    assert_eq!(impolite.negotiator.completed_as(), Some(Role::Initiator));
}
