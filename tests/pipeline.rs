//! Pipeline property tests
//!
//! Exercises the activity loops against a mock transport: ordering,
//! the quit sentinel, backpressure, drain-on-new-turn, and the
//! drop-when-not-ready paths.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio_test::{assert_pending, assert_ready};

use aria_live::pipeline::activities::{
    handle_line, run_capture_loop, run_receive_loop, run_send_loop,
};
use aria_live::pipeline::{OUTBOUND_QUEUE_CAPACITY, PlaybackQueue, SessionSlot};
use aria_live::{AudioChunk, Error, LiveTransport, ServerFragment};

mod common;
use common::{MockTransport, ScriptedFrames};

#[tokio::test]
async fn text_turns_reach_transport_in_submission_order() {
    let transport = Arc::new(MockTransport::with_turns(vec![]));
    let slot = SessionSlot::new();
    slot.bind(Arc::clone(&transport) as Arc<dyn LiveTransport>).expect("bind");

    assert!(handle_line("hello", &slot).await.expect("send").is_continue());
    assert!(handle_line("", &slot).await.expect("send").is_continue());
    assert!(
        handle_line("how are you", &slot)
            .await
            .expect("send")
            .is_continue()
    );

    // Empty input is normalized to a placeholder period
    assert_eq!(
        *transport.sent_texts.lock().unwrap(),
        vec!["hello", ".", "how are you"]
    );
}

#[tokio::test]
async fn quit_sentinel_terminates_without_sending() {
    let transport = Arc::new(MockTransport::with_turns(vec![]));
    let slot = SessionSlot::new();
    slot.bind(Arc::clone(&transport) as Arc<dyn LiveTransport>).expect("bind");

    assert!(handle_line("q", &slot).await.expect("quit").is_break());
    assert!(handle_line("Q", &slot).await.expect("quit").is_break());

    assert!(transport.sent_texts.lock().unwrap().is_empty());
}

#[tokio::test]
async fn unbound_session_drops_text_without_blocking() {
    let slot = SessionSlot::new();

    let flow = tokio::time::timeout(Duration::from_secs(1), handle_line("hello", &slot))
        .await
        .expect("no deadlock")
        .expect("drop is not an error");
    assert!(flow.is_continue());
}

#[tokio::test]
async fn unbound_session_drops_audio_without_blocking() {
    let slot = Arc::new(SessionSlot::new());
    let (tx, rx) = mpsc::channel(OUTBOUND_QUEUE_CAPACITY);

    tx.send(AudioChunk::pcm(vec![1])).await.expect("enqueue");
    tx.send(AudioChunk::pcm(vec![2])).await.expect("enqueue");
    drop(tx);

    // The sender drains and drops everything even though the session
    // never binds
    tokio::time::timeout(Duration::from_secs(1), run_send_loop(slot, rx))
        .await
        .expect("no deadlock")
        .expect("clean exit");
}

#[tokio::test]
async fn sender_forwards_chunks_one_at_a_time_in_order() {
    let transport = Arc::new(MockTransport::with_turns(vec![]));
    let slot = Arc::new(SessionSlot::new());
    slot.bind(Arc::clone(&transport) as Arc<dyn LiveTransport>).expect("bind");

    let (tx, rx) = mpsc::channel(OUTBOUND_QUEUE_CAPACITY);
    for byte in [1u8, 2, 3] {
        tx.send(AudioChunk::pcm(vec![byte])).await.expect("enqueue");
    }
    drop(tx);

    run_send_loop(slot, rx).await.expect("clean exit");

    let sent = transport.sent_audio.lock().unwrap();
    assert_eq!(sent.len(), 3);
    assert_eq!(sent[0].data, vec![1]);
    assert_eq!(sent[1].data, vec![2]);
    assert_eq!(sent[2].data, vec![3]);
    assert!(sent.iter().all(|c| c.mime_type == "audio/pcm"));
}

#[test]
fn sixth_enqueue_blocks_until_a_consumer_pops() {
    let (tx, mut rx) = mpsc::channel::<u32>(OUTBOUND_QUEUE_CAPACITY);
    for i in 0..OUTBOUND_QUEUE_CAPACITY {
        tx.try_send(u32::try_from(i).unwrap()).expect("queue has room");
    }

    let mut sixth = tokio_test::task::spawn(tx.send(99));
    assert_pending!(sixth.poll());

    // Removing one item unblocks the stalled producer
    assert_eq!(rx.try_recv().expect("first item"), 0);
    assert!(sixth.is_woken());
    assert_ready!(sixth.poll()).expect("send succeeds");
}

#[tokio::test]
async fn new_turn_discards_unplayed_audio_from_previous_turn() {
    // Turn 1 yields [A, B]; before the speaker consumes them, turn 2
    // yields [C]. Only C may reach the speaker.
    let transport = Arc::new(MockTransport::with_turns(vec![
        vec![
            ServerFragment::Audio(vec![0xAA]),
            ServerFragment::Audio(vec![0xBB]),
        ],
        vec![ServerFragment::Audio(vec![0xCC])],
    ]));
    let slot = Arc::new(SessionSlot::new());
    slot.bind(transport).expect("bind");
    let queue = Arc::new(PlaybackQueue::new());

    let result = run_receive_loop(slot, Arc::clone(&queue)).await;
    assert!(matches!(result, Err(Error::ConnectionClosed)));

    assert_eq!(queue.drain(), vec![vec![0xCC]]);
}

#[tokio::test]
async fn audio_within_a_turn_is_queued_in_arrival_order() {
    let transport = Arc::new(MockTransport::with_turns(vec![vec![
        ServerFragment::Audio(vec![1]),
        ServerFragment::Text("thinking".to_string()),
        ServerFragment::Audio(vec![2]),
        ServerFragment::Audio(vec![3]),
    ]]));
    let slot = Arc::new(SessionSlot::new());
    slot.bind(transport).expect("bind");
    let queue = Arc::new(PlaybackQueue::new());

    let result = run_receive_loop(slot, Arc::clone(&queue)).await;
    assert!(matches!(result, Err(Error::ConnectionClosed)));

    // Text goes to the console; audio keeps its relative order
    assert_eq!(queue.drain(), vec![vec![1], vec![2], vec![3]]);
}

#[tokio::test]
async fn receiver_idles_while_session_never_binds() {
    let slot = Arc::new(SessionSlot::new());
    let queue = Arc::new(PlaybackQueue::new());

    // Still polling after a while: no panic, no busy failure, no exit
    let idling =
        tokio::time::timeout(Duration::from_millis(250), run_receive_loop(slot, queue)).await;
    assert!(idling.is_err());
}

#[tokio::test]
async fn capture_overflow_loses_the_frame_and_continues() {
    let (tx, mut rx) = mpsc::channel(OUTBOUND_QUEUE_CAPACITY);
    let source = ScriptedFrames::new(vec![
        Ok(vec![1, 1]),
        Err(Error::CaptureOverflow),
        Ok(vec![2, 2]),
        Err(Error::Audio("stream ended".to_string())),
    ]);

    let worker = tokio::task::spawn_blocking(move || run_capture_loop(source, tx));

    // The overflowed read enqueues nothing; reads resume around it
    assert_eq!(rx.recv().await.expect("first frame").data, vec![1, 1]);
    assert_eq!(rx.recv().await.expect("second frame").data, vec![2, 2]);
    assert!(rx.recv().await.is_none());

    // Non-overflow device errors still propagate
    let result = worker.await.expect("join");
    assert!(matches!(result, Err(Error::Audio(_))));
}

#[tokio::test]
async fn capture_stops_cleanly_when_pipeline_is_gone() {
    let (tx, rx) = mpsc::channel(1);
    drop(rx);

    let source = ScriptedFrames::new(vec![Ok(vec![1, 1])]);
    let result = tokio::task::spawn_blocking(move || run_capture_loop(source, tx))
        .await
        .expect("join");

    assert!(result.is_ok());
}
