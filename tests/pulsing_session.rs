//! End-to-end tests for handshake-gated sessions driven by pulses.

use std::{
    sync::{Arc, Barrier},
    thread,
};

use pulseframe::{
    ConnectionId,
    Message,
    MessageDecoder,
    MessageRef,
    ProtocolSlot,
    PulsingSession,
    SendType,
    Session,
    SessionRegistry,
    State,
    config::SessionConfig,
    session::{PulseError, SessionCore},
};
use pulseframe_testing::{
    Chat,
    LoggerHandle,
    Ping,
    RecordingHandler,
    RecordingTransport,
    decode_chunked,
    demo_protocol,
    logger,
    pulsing_session,
};
use rstest::rstest;
use serial_test::serial;

fn written(transport: &RecordingTransport) -> Vec<MessageRef> {
    let protocol = demo_protocol("demo").expect("demo protocol");
    let mut decoder = MessageDecoder::new(ProtocolSlot::new(Arc::new(protocol)));
    let bytes = transport.bytes();
    decode_chunked(&mut decoder, &bytes, &[bytes.len().max(1)]).expect("written frames decode")
}

fn describe(message: &MessageRef) -> String {
    if let Some(ping) = message.downcast_ref::<Ping>() {
        return format!("ping {}", ping.0);
    }
    match message.downcast_ref::<Chat>() {
        Some(chat) => format!("chat {}", chat.text),
        None => format!("{}", message.message_type()),
    }
}

#[test]
fn handshake_then_flush() {
    let (session, transport) =
        pulsing_session(|session: &PulsingSession, message: MessageRef| {
            if message.downcast_ref::<Ping>() == Some(&Ping(1)) {
                session.set_state(State::Open);
                session
                    .send(Ping(100).into_ref())
                    .expect("open session writes");
            }
        })
        .expect("demo session");

    session
        .send_with(SendType::Force, Ping(0).into_ref())
        .expect("forced write");
    session
        .send(
            Chat {
                channel: 1,
                text: "welcome".into(),
            }
            .into_ref(),
        )
        .expect("queued");
    session
        .send_with(SendType::OpenOnly, Ping(7).into_ref())
        .expect("dropped silently");
    session.message_received(Ping(1).into_ref());

    let first = session.pulse().expect("pulse");
    assert_eq!(first.sent, 0, "outbound waits for Open at pulse start");
    assert_eq!(first.delivered, 1);
    assert_eq!(session.queued_outbound(), 1);

    let second = session.pulse().expect("pulse");
    assert_eq!(second.sent, 1);
    assert_eq!(session.queued_outbound(), 0);

    let wire: Vec<String> = written(&transport).iter().map(describe).collect();
    assert_eq!(wire, vec!["ping 0", "ping 100", "chat welcome"]);
}

#[test]
fn sessions_may_start_open() {
    let transport = RecordingTransport::new();
    let core = SessionCore::new(
        ConnectionId::new(9),
        Arc::new(demo_protocol("demo").expect("demo protocol")),
        transport.clone(),
    );
    let session = PulsingSession::with_config(
        core,
        RecordingHandler::default(),
        SessionConfig::default().initial_state(State::Open),
    );

    session
        .send_with(SendType::OpenOnly, Ping(5).into_ref())
        .expect("open session writes");

    assert_eq!(session.state(), State::Open);
    assert_eq!(transport.frame_count(), 1);
}

#[test]
fn concurrent_pulse_is_rejected() {
    let entered = Arc::new(Barrier::new(2));
    let release = Arc::new(Barrier::new(2));
    let (handler_entered, handler_release) = (entered.clone(), release.clone());
    let (session, _transport) =
        pulsing_session(move |_session: &PulsingSession, _message: MessageRef| {
            handler_entered.wait();
            handler_release.wait();
        })
        .expect("demo session");
    let session = Arc::new(session);
    session.message_received(Ping(1).into_ref());

    let worker = {
        let session = session.clone();
        thread::spawn(move || session.pulse())
    };
    entered.wait();
    assert_eq!(session.pulse().err(), Some(PulseError::InProgress));
    release.wait();

    let stats = worker
        .join()
        .expect("pulse thread")
        .expect("first pulse runs");
    assert_eq!(stats.delivered, 1);
}

#[test]
fn senders_on_other_threads_are_flushed_in_order() {
    let handler = RecordingHandler::default();
    let (session, transport) = pulsing_session(handler).expect("demo session");
    let session = Arc::new(session);

    let producer = {
        let session = session.clone();
        thread::spawn(move || {
            for n in 0..50 {
                session.send(Ping(n).into_ref()).expect("queued");
            }
        })
    };
    producer.join().expect("producer");
    session.set_state(State::Open);
    let stats = session.pulse().expect("pulse");

    assert_eq!(stats.sent, 50);
    let pings: Vec<u32> = written(&transport)
        .iter()
        .filter_map(|message| message.downcast_ref::<Ping>().map(|ping| ping.0))
        .collect();
    assert_eq!(pings, (0..50).collect::<Vec<_>>());
}

fn session_with_id(id: u64, handler: RecordingHandler) -> Arc<PulsingSession> {
    let core = SessionCore::new(
        ConnectionId::new(id),
        Arc::new(demo_protocol("demo").expect("demo protocol")),
        RecordingTransport::new(),
    );
    Arc::new(PulsingSession::new(core, handler))
}

#[test]
fn registry_pulses_live_sessions() {
    let registry = SessionRegistry::default();
    let live_handler = RecordingHandler::default();
    let live = session_with_id(1, live_handler.clone());
    let gone = session_with_id(2, RecordingHandler::default());
    registry.insert(&live);
    registry.insert(&gone);
    live.message_received(Ping(3).into_ref());
    drop(gone);

    let results = registry.pulse_all();

    assert_eq!(results.len(), 1);
    let (id, stats) = &results[0];
    assert_eq!(*id, live.id());
    assert_eq!(stats.as_ref().map(|stats| stats.delivered).ok(), Some(1));
    assert_eq!(live_handler.count(), 1);
    assert_eq!(registry.active_ids(), vec![ConnectionId::new(1)]);
}

#[rstest]
#[serial]
fn backwards_state_change_is_logged(mut logger: LoggerHandle) {
    let (session, _) = pulsing_session(RecordingHandler::default()).expect("demo session");
    session.set_state(State::Open);
    logger.clear();

    session.set_state(State::ExchangeHandshake);

    assert!(logger.contains("session state moved backwards"));
}
